use super::{Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder};
use crate::{action::InputActions, error::XrError};

pub struct DaydreamController;

impl ControllerModel for DaydreamController {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/google/daydream_controller"
    }

    fn name(&self) -> &'static str {
        "Daydream Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "dd_"
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/select/click")?;
        bindings.both(&actions.trackpad_press, "/input/trackpad/click")?;
        bindings.both(&actions.trackpad_touch, "/input/trackpad/touch")?;
        bindings.both(&actions.trackpad_analog, "/input/trackpad")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        device
            .button(ButtonSlot::Trigger, ButtonLabel::Trigger, false)
            .trackpad(true);
        Ok(())
    }
}
