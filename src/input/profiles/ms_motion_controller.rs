use super::{
    Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, GripParts, TriggerParts,
};
use crate::{action::InputActions, error::XrError, runtime::Extension};

/// Windows Mixed Reality style controller. The Samsung Odyssey controller
/// reports its own interaction profile but is control-for-control the same
/// hardware layout, so one model covers both.
pub struct WmrController {
    path: &'static str,
    name: &'static str,
    prefix: &'static str,
    extension: Option<Extension>,
}

impl WmrController {
    pub fn motion_controller() -> Self {
        Self {
            path: "/interaction_profiles/microsoft/motion_controller",
            name: "Motion Controller",
            prefix: "wmr_",
            extension: None,
        }
    }

    pub fn samsung_odyssey() -> Self {
        Self {
            path: "/interaction_profiles/samsung/odyssey_controller",
            name: "Samsung Odyssey Controller",
            prefix: "ody_",
            extension: Some(Extension::SamsungOdysseyController),
        }
    }
}

impl ControllerModel for WmrController {
    fn profile_path(&self) -> &'static str {
        self.path
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn id_prefix(&self) -> &'static str {
        self.prefix
    }

    fn required_extension(&self) -> Option<Extension> {
        self.extension
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/trigger/value")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.grip_press, "/input/squeeze/click")?;
        bindings.both(&actions.button_primary_press, "/input/menu/click")?;
        bindings.both(&actions.joystick_press, "/input/thumbstick/click")?;
        bindings.both(&actions.joystick_analog, "/input/thumbstick")?;
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
            .grip(GripParts {
                press: true,
                ..Default::default()
            })
            .button(ButtonSlot::Primary, ButtonLabel::Menu, false)
            .joystick(false)
            .trackpad(true)
            .haptic();
        Ok(())
    }
}
