use super::{
    Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, GripParts, TriggerParts,
};
use crate::{action::InputActions, error::XrError, runtime::{Extension, Hand}};

pub struct HpMixedReality;

impl ControllerModel for HpMixedReality {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/hp/mixed_reality_controller"
    }

    fn name(&self) -> &'static str {
        "HP Mixed Reality Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "hpmr_"
    }

    fn required_extension(&self) -> Option<Extension> {
        Some(Extension::HpMixedRealityController)
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.add(&actions.button_primary_press, "/user/hand/left/input/x/click")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/left/input/y/click")?;
        bindings.add(&actions.button_primary_press, "/user/hand/right/input/a/click")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/right/input/b/click")?;
        bindings.both(&actions.button_auxiliary1_press, "/input/menu/click")?;
        // Boolean actions on value paths rely on the runtime's threshold
        // conversion.
        bindings.both(&actions.trigger_press, "/input/trigger/value")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_press, "/input/squeeze/value")?;
        bindings.both(&actions.grip_squeeze, "/input/squeeze/value")?;
        bindings.both(&actions.joystick_press, "/input/thumbstick/click")?;
        bindings.both(&actions.joystick_analog, "/input/thumbstick")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        bindings.both(&actions.trigger_haptic, "/output/haptic")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        let (primary, secondary) = match device.hand() {
            Hand::Left => (ButtonLabel::X, ButtonLabel::Y),
            Hand::Right => (ButtonLabel::A, ButtonLabel::B),
        };
        device
            .trigger(TriggerParts::default())
            .grip(GripParts {
                press: true,
                squeeze: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, primary, false)
            .button(ButtonSlot::Secondary, secondary, false)
            .button(ButtonSlot::Auxiliary1, ButtonLabel::Menu, false)
            .joystick(false)
            .haptic();
        Ok(())
    }
}
