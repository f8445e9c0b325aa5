use super::{Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, TriggerParts};
use crate::{action::InputActions, error::XrError};

pub struct ViveController;

impl ControllerModel for ViveController {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/htc/vive_controller"
    }

    fn name(&self) -> &'static str {
        "Vive Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "vive_"
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/trigger/click")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_press, "/input/squeeze/click")?;
        bindings.both(&actions.button_primary_press, "/input/menu/click")?;
        bindings.both(&actions.button_secondary_press, "/input/system/click")?;
        bindings.both(&actions.trackpad_press, "/input/trackpad/click")?;
        bindings.both(&actions.trackpad_touch, "/input/trackpad/touch")?;
        bindings.both(&actions.trackpad_analog, "/input/trackpad")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        bindings.both(&actions.trigger_haptic, "/output/haptic")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        device
            .trigger(TriggerParts::default())
            .grip(super::GripParts {
                press: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, ButtonLabel::Menu, false)
            .button(ButtonSlot::Secondary, ButtonLabel::System, false)
            .trackpad(true)
            .haptic();
        Ok(())
    }
}
