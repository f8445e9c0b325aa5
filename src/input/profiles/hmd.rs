//! Head-mounted display devices. The Vive Pro profile adds the headset's
//! physical buttons when the runtime reports it on `/user/head`; the generic
//! profile guarantees exactly one HMD device exists for any headset.

use super::{AttachContext, BindContext, Bindings, DeviceBuilder, DeviceProfile};
use crate::{
    action::{Action, ActionSet},
    error::{ResultExt, XrError},
    face_tracker::FaceTracker,
    input::{
        device::{ButtonKind, Device, DeviceType},
        DeviceManager,
    },
    instance::Instance,
    path::Path,
    runtime::{ActionKind, Extension, Hand},
};
use std::sync::Arc;

fn attach_face_tracker(builder: &mut DeviceBuilder, ctx: &AttachContext) {
    let Some(session) = ctx.session else { return };
    if !ctx.config.facial_tracking.enabled()
        || !ctx.instance.supports(Extension::FacialTrackingHtc)
        || !ctx.system.map(|s| s.supports_facial_tracking).unwrap_or(false)
    {
        return;
    }
    match FaceTracker::new(ctx.instance.runtime().clone(), session.handle()) {
        Ok(tracker) => {
            builder.face_tracker(tracker);
        }
        Err(e) => log::warn!("facial tracking unavailable: {e}"),
    }
}

/// Vive Pro headset buttons, reported through `/user/head`.
pub struct ViveProHmd {
    path: Path,
    system: Option<Arc<Action>>,
    volume_up: Option<Arc<Action>>,
    volume_down: Option<Arc<Action>>,
    mute: Option<Arc<Action>>,
    device: Option<Arc<Device>>,
}

impl ViveProHmd {
    pub fn new(instance: &Arc<Instance>) -> Result<Self, XrError> {
        Ok(Self {
            path: instance.path("/interaction_profiles/htc/vive_pro")?,
            system: None,
            volume_up: None,
            volume_down: None,
            mute: None,
            device: None,
        })
    }
}

impl ViveProHmd {
    fn remove_device(&mut self, devices: &mut DeviceManager) {
        if let Some(device) = self.device.take() {
            let _ = devices.remove(&device);
        }
    }
}

impl DeviceProfile for ViveProHmd {
    fn name(&self) -> &'static str {
        "Vive Pro HMD"
    }

    fn create_actions(
        &mut self,
        _instance: &Arc<Instance>,
        set: &mut ActionSet,
    ) -> Result<(), XrError> {
        // Head-path inputs cannot reuse the hand-scoped shared actions.
        self.system = Some(set.add_action(
            ActionKind::BoolInput,
            "hmd_system",
            "Press System Button",
            &[],
        )?);
        self.volume_up = Some(set.add_action(
            ActionKind::BoolInput,
            "hmd_volume_up",
            "Press Volume Up",
            &[],
        )?);
        self.volume_down = Some(set.add_action(
            ActionKind::BoolInput,
            "hmd_volume_down",
            "Press Volume Down",
            &[],
        )?);
        self.mute = Some(set.add_action(
            ActionKind::BoolInput,
            "hmd_mute_mic",
            "Press Mute Microphone",
            &[],
        )?);
        Ok(())
    }

    fn suggest_bindings(&self, ctx: &BindContext) -> Result<(), XrError> {
        let (Some(system), Some(up), Some(down), Some(mute)) = (
            self.system.as_ref(),
            self.volume_up.as_ref(),
            self.volume_down.as_ref(),
            self.mute.as_ref(),
        ) else {
            return Ok(());
        };
        let mut bindings = Bindings::new(ctx.instance);
        bindings.add(system, "/user/head/input/system/click")?;
        bindings.add(up, "/user/head/input/volume_up/click")?;
        bindings.add(down, "/user/head/input/volume_down/click")?;
        bindings.add(mute, "/user/head/input/mute_mic/click")?;
        ctx.instance.suggest_bindings(&self.path, &bindings.finish())
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions)) = (ctx.session, ctx.actions) else {
            self.remove_device(ctx.devices);
            return Ok(());
        };
        if !session.is_attached() || !session.is_running() {
            self.remove_device(ctx.devices);
            return Ok(());
        }
        let current = ctx
            .instance
            .runtime()
            .current_interaction_profile(session.handle(), ctx.instance.head_path().handle())
            .or_xr("xrGetCurrentInteractionProfile")?;
        let matched = current == self.path.handle();
        match (matched, self.device.is_some()) {
            (true, false) => {
                let mut builder = DeviceBuilder::new(
                    ctx.instance,
                    session,
                    actions,
                    ctx.system,
                    Hand::Left,
                    DeviceType::Hmd,
                    "viveprohmd".to_owned(),
                    "Vive Pro HMD".to_owned(),
                );
                for (action, id, name) in [
                    (&self.system, "system", "System"),
                    (&self.volume_up, "volup", "Volume Up"),
                    (&self.volume_down, "voldown", "Volume Down"),
                    (&self.mute, "mute", "Mute Microphone"),
                ] {
                    if let Some(action) = action {
                        builder.raw_button(id, name, ButtonKind::Action, action.clone());
                    }
                }
                attach_face_tracker(&mut builder, ctx);
                let device = builder.build();
                ctx.devices.add(device.clone());
                self.device = Some(device);
            }
            (false, true) => self.remove_device(ctx.devices),
            _ => {}
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        self.remove_device(devices);
        self.system = None;
        self.volume_up = None;
        self.volume_down = None;
        self.mute = None;
    }
}

/// Fallback headset device: created whenever a session is running and no
/// more specific profile claimed the HMD. Registered right after the
/// specific HMD profiles so the ordering guarantee holds.
pub struct GenericHmd {
    device: Option<Arc<Device>>,
}

impl GenericHmd {
    pub fn new() -> Self {
        Self { device: None }
    }
}

impl Default for GenericHmd {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProfile for GenericHmd {
    fn name(&self) -> &'static str {
        "Generic HMD"
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions)) = (ctx.session, ctx.actions) else {
            self.clear_actions(ctx.devices);
            return Ok(());
        };
        if !session.is_attached() || !session.is_running() {
            self.clear_actions(ctx.devices);
            return Ok(());
        }
        let other_hmd = ctx.devices.iter().any(|d| {
            d.device_type() == DeviceType::Hmd
                && !self.device.as_ref().is_some_and(|own| Arc::ptr_eq(own, d))
        });
        match (other_hmd, self.device.is_some()) {
            (false, false) => {
                let mut builder = DeviceBuilder::new(
                    ctx.instance,
                    session,
                    actions,
                    ctx.system,
                    Hand::Left,
                    DeviceType::Hmd,
                    "hmd".to_owned(),
                    "HMD".to_owned(),
                );
                attach_face_tracker(&mut builder, ctx);
                let device = builder.build();
                ctx.devices.add(device.clone());
                self.device = Some(device);
            }
            (true, true) => self.clear_actions(ctx.devices),
            _ => {}
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        if let Some(device) = self.device.take() {
            let _ = devices.remove(&device);
        }
    }
}
