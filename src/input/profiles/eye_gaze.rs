use super::{AttachContext, BindContext, Bindings, DeviceBuilder, DeviceProfile};
use crate::{
    action::{Action, ActionSet},
    error::{ResultExt, XrError},
    input::{
        device::{Device, DeviceType},
        DeviceManager,
    },
    instance::Instance,
    path::Path,
    runtime::{ActionKind, Hand},
    space::Space,
};
use openxr as xr;
use std::sync::Arc;

/// Eye tracking surfaced as a poseable device, so gaze consumers use the
/// same polling path as any other tracked thing.
pub struct EyeGazeProfile {
    path: Path,
    user_path: Path,
    gaze: Option<Arc<Action>>,
    device: Option<Arc<Device>>,
}

impl EyeGazeProfile {
    pub fn new(instance: &Arc<Instance>) -> Result<Self, XrError> {
        Ok(Self {
            path: instance.path("/interaction_profiles/ext/eye_gaze_interaction")?,
            user_path: instance.path("/user/eyes_ext")?,
            gaze: None,
            device: None,
        })
    }
}

impl EyeGazeProfile {
    fn remove_device(&mut self, devices: &mut DeviceManager) {
        if let Some(device) = self.device.take() {
            let _ = devices.remove(&device);
        }
    }
}

impl DeviceProfile for EyeGazeProfile {
    fn name(&self) -> &'static str {
        "Eye Gaze"
    }

    fn create_actions(
        &mut self,
        _instance: &Arc<Instance>,
        set: &mut ActionSet,
    ) -> Result<(), XrError> {
        self.gaze = Some(set.add_action(ActionKind::PoseInput, "gaze_pose", "Gaze Pose", &[])?);
        Ok(())
    }

    fn suggest_bindings(&self, ctx: &BindContext) -> Result<(), XrError> {
        let Some(gaze) = self.gaze.as_ref() else {
            return Ok(());
        };
        let mut bindings = Bindings::new(ctx.instance);
        bindings.add(gaze, "/user/eyes_ext/input/gaze_ext/pose")?;
        ctx.instance.suggest_bindings(&self.path, &bindings.finish())
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions), Some(gaze)) =
            (ctx.session, ctx.actions, self.gaze.as_ref())
        else {
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
            .current_interaction_profile(session.handle(), self.user_path.handle())
            .or_xr("xrGetCurrentInteractionProfile")?;
        let matched = current == self.path.handle();
        match (matched, self.device.is_some()) {
            (true, false) => {
                let space = Space::action(
                    session.runtime().clone(),
                    session.handle(),
                    gaze,
                    &Path::empty(),
                    xr::Posef::IDENTITY,
                )?;
                let mut builder = DeviceBuilder::new(
                    ctx.instance,
                    session,
                    actions,
                    ctx.system,
                    Hand::Left,
                    DeviceType::EyeGaze,
                    "eyegaze".to_owned(),
                    "Eye Gaze".to_owned(),
                );
                builder.space(space).pose_action(gaze.clone());
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
        self.gaze = None;
    }
}
