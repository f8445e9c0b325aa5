use super::{
    Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, GripParts, TriggerParts,
};
use crate::{action::InputActions, error::XrError, runtime::Hand};

pub struct OculusTouch;

impl ControllerModel for OculusTouch {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/oculus/touch_controller"
    }

    fn name(&self) -> &'static str {
        "Oculus Touch Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "oct_"
    }

    fn hand_tracking(&self) -> bool {
        true
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.add(&actions.button_primary_press, "/user/hand/left/input/x/click")?;
        bindings.add(&actions.button_primary_touch, "/user/hand/left/input/x/touch")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/left/input/y/click")?;
        bindings.add(&actions.button_secondary_touch, "/user/hand/left/input/y/touch")?;
        bindings.add(&actions.button_primary_press, "/user/hand/right/input/a/click")?;
        bindings.add(&actions.button_primary_touch, "/user/hand/right/input/a/touch")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/right/input/b/click")?;
        bindings.add(&actions.button_secondary_touch, "/user/hand/right/input/b/touch")?;
        bindings.add(&actions.button_auxiliary1_press, "/user/hand/left/input/menu/click")?;
        bindings.add(&actions.button_auxiliary1_press, "/user/hand/right/input/system/click")?;
        bindings.both(&actions.trigger_press, "/input/trigger/value")?;
        bindings.both(&actions.trigger_touch, "/input/trigger/touch")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_press, "/input/squeeze/value")?;
        bindings.both(&actions.grip_squeeze, "/input/squeeze/value")?;
        bindings.both(&actions.joystick_press, "/input/thumbstick/click")?;
        bindings.both(&actions.joystick_touch, "/input/thumbstick/touch")?;
        bindings.both(&actions.joystick_analog, "/input/thumbstick")?;
        bindings.both(&actions.thumbrest_touch, "/input/thumbrest/touch")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        bindings.both(&actions.trigger_haptic, "/output/haptic")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        let (primary, secondary, aux) = match device.hand() {
            Hand::Left => (ButtonLabel::X, ButtonLabel::Y, ButtonLabel::Menu),
            Hand::Right => (ButtonLabel::A, ButtonLabel::B, ButtonLabel::System),
        };
        device
            .trigger(TriggerParts {
                touch: true,
                ..Default::default()
            })
            .grip(GripParts {
                press: true,
                squeeze: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, primary, true)
            .button(ButtonSlot::Secondary, secondary, true)
            .button(ButtonSlot::Auxiliary1, aux, false)
            .joystick(true)
            .thumbrest(false, false)
            .haptic();
        Ok(())
    }
}
