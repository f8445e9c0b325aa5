use super::{
    Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, GripParts, TriggerParts,
};
use crate::{action::InputActions, error::XrError, runtime::{Extension, Hand}};

pub struct ViveCosmos;

impl ControllerModel for ViveCosmos {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/htc/vive_cosmos_controller"
    }

    fn name(&self) -> &'static str {
        "Vive Cosmos Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "vcos_"
    }

    fn required_extension(&self) -> Option<Extension> {
        Some(Extension::ViveCosmosController)
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.add(&actions.button_primary_press, "/user/hand/left/input/x/click")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/left/input/y/click")?;
        bindings.add(&actions.button_primary_press, "/user/hand/right/input/a/click")?;
        bindings.add(&actions.button_secondary_press, "/user/hand/right/input/b/click")?;
        bindings.add(&actions.button_auxiliary1_press, "/user/hand/left/input/menu/click")?;
        bindings.add(&actions.button_auxiliary1_press, "/user/hand/right/input/system/click")?;
        bindings.both(&actions.button_auxiliary2_press, "/input/shoulder/click")?;
        bindings.both(&actions.trigger_press, "/input/trigger/click")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_press, "/input/squeeze/click")?;
        bindings.both(&actions.joystick_press, "/input/thumbstick/click")?;
        bindings.both(&actions.joystick_touch, "/input/thumbstick/touch")?;
        bindings.both(&actions.joystick_analog, "/input/thumbstick")?;
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
            .trigger(TriggerParts::default())
            .grip(GripParts {
                press: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, primary, false)
            .button(ButtonSlot::Secondary, secondary, false)
            .button(ButtonSlot::Auxiliary1, aux, false)
            .button(ButtonSlot::Auxiliary2, ButtonLabel::Shoulder, false)
            .joystick(true)
            .haptic();
        Ok(())
    }
}
