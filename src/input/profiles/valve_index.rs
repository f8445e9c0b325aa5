use super::{
    Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, GripParts, TriggerParts,
};
use crate::{action::InputActions, error::XrError};

pub struct ValveIndex;

impl ControllerModel for ValveIndex {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/valve/index_controller"
    }

    fn name(&self) -> &'static str {
        "Valve Index Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "vi_"
    }

    fn hand_tracking(&self) -> bool {
        true
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.button_primary_press, "/input/a/click")?;
        bindings.both(&actions.button_primary_touch, "/input/a/touch")?;
        bindings.both(&actions.button_secondary_press, "/input/b/click")?;
        bindings.both(&actions.button_secondary_touch, "/input/b/touch")?;
        bindings.both(&actions.button_auxiliary1_press, "/input/system/click")?;
        bindings.both(&actions.button_auxiliary1_touch, "/input/system/touch")?;
        bindings.both(&actions.trigger_press, "/input/trigger/click")?;
        bindings.both(&actions.trigger_touch, "/input/trigger/touch")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_squeeze, "/input/squeeze/value")?;
        bindings.both(&actions.grip_grab, "/input/squeeze/force")?;
        bindings.both(&actions.grip_press, "/input/squeeze/force")?;
        bindings.both(&actions.joystick_press, "/input/thumbstick/click")?;
        bindings.both(&actions.joystick_touch, "/input/thumbstick/touch")?;
        bindings.both(&actions.joystick_analog, "/input/thumbstick")?;
        bindings.both(&actions.trackpad_touch, "/input/trackpad/touch")?;
        bindings.both(&actions.trackpad_press, "/input/trackpad/force")?;
        bindings.both(&actions.trackpad_analog, "/input/trackpad")?;
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        bindings.both(&actions.trigger_haptic, "/output/haptic")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        device
            .trigger(TriggerParts {
                touch: true,
                ..Default::default()
            })
            .grip(GripParts {
                press: true,
                grab: true,
                squeeze: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, ButtonLabel::A, true)
            .button(ButtonSlot::Secondary, ButtonLabel::B, true)
            .button(ButtonSlot::Auxiliary1, ButtonLabel::System, true)
            .joystick(true)
            .trackpad(true)
            .haptic();
        Ok(())
    }
}
