use super::{Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder};
use crate::{action::InputActions, error::XrError};

pub struct OculusGo;

impl ControllerModel for OculusGo {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/oculus/go_controller"
    }

    fn name(&self) -> &'static str {
        "Oculus Go Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "go_"
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/trigger/click")?;
        bindings.both(&actions.button_primary_press, "/input/back/click")?;
        bindings.both(&actions.button_secondary_press, "/input/system/click")?;
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
            .button(ButtonSlot::Primary, ButtonLabel::Back, false)
            .button(ButtonSlot::Secondary, ButtonLabel::System, false)
            .trackpad(true);
        Ok(())
    }
}
