use super::{Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder};
use crate::{action::InputActions, error::XrError};

/// Lowest common denominator: one select and one menu click per hand, no
/// analog controls.
pub struct SimpleController;

impl ControllerModel for SimpleController {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/khr/simple_controller"
    }

    fn name(&self) -> &'static str {
        "Simple Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "sc_"
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/select/click")?;
        bindings.both(&actions.button_primary_press, "/input/menu/click")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        bindings.both(&actions.trigger_haptic, "/output/haptic")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        device
            .button(ButtonSlot::Trigger, ButtonLabel::Trigger, false)
            .button(ButtonSlot::Primary, ButtonLabel::Menu, false)
            .haptic();
        Ok(())
    }
}
