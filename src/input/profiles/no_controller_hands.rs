use super::{AttachContext, DeviceBuilder, DeviceProfile};
use crate::{
    error::XrError,
    input::{
        device::{Device, DeviceType},
        DeviceManager,
    },
    runtime::{Extension, Hand},
};
use std::sync::Arc;

/// Fallback for bare hand tracking: synthesizes a hand device for any hand
/// no controller profile currently owns. Registered last, after every other
/// profile has claimed its devices, so "no device for this hand" is
/// authoritative by the time this runs.
pub struct NoControllerHands {
    devices: [Option<Arc<Device>>; 2],
}

impl NoControllerHands {
    pub fn new() -> Self {
        Self {
            devices: [None, None],
        }
    }
}

impl Default for NoControllerHands {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProfile for NoControllerHands {
    fn name(&self) -> &'static str {
        "Hand Tracking"
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions)) = (ctx.session, ctx.actions) else {
            self.clear_actions(ctx.devices);
            return Ok(());
        };
        let supported = ctx.instance.supports(Extension::HandTracking)
            && ctx.system.map(|s| s.supports_hand_tracking).unwrap_or(false);
        if !session.is_attached() || !session.is_running() || !supported {
            self.clear_actions(ctx.devices);
            return Ok(());
        }
        for (slot, hand) in self.devices.iter_mut().zip(Hand::BOTH) {
            let wanted_type = DeviceType::hand(hand);
            let claimed = ctx.devices.iter().any(|d| {
                d.device_type() == wanted_type
                    && !slot.as_ref().is_some_and(|own| Arc::ptr_eq(own, d))
            });
            match (claimed, slot.is_some()) {
                (false, false) => {
                    let (id, side) = match hand {
                        Hand::Left => ("handl", "Left"),
                        Hand::Right => ("handr", "Right"),
                    };
                    let mut builder = DeviceBuilder::new(
                        ctx.instance,
                        session,
                        actions,
                        ctx.system,
                        hand,
                        wanted_type,
                        id.to_owned(),
                        format!("Tracked Hand {side}"),
                    );
                    builder.hand_tracking(true)?;
                    let device = builder.build();
                    ctx.devices.add(device.clone());
                    *slot = Some(device);
                }
                (true, true) => {
                    if let Some(device) = slot.take() {
                        let _ = ctx.devices.remove(&device);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        for slot in &mut self.devices {
            if let Some(device) = slot.take() {
                let _ = devices.remove(&device);
            }
        }
    }
}
