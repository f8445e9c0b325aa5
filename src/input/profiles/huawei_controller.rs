use super::{Bindings, ButtonLabel, ButtonSlot, ControllerModel, DeviceBuilder, TriggerParts};
use crate::{action::InputActions, error::XrError, runtime::Extension};

pub struct HuaweiController;

impl ControllerModel for HuaweiController {
    fn profile_path(&self) -> &'static str {
        "/interaction_profiles/huawei/controller"
    }

    fn name(&self) -> &'static str {
        "Huawei Controller"
    }

    fn id_prefix(&self) -> &'static str {
        "hw_"
    }

    fn required_extension(&self) -> Option<Extension> {
        Some(Extension::HuaweiController)
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        bindings.both(&actions.trigger_press, "/input/trigger/click")?;
        bindings.both(&actions.trigger_analog, "/input/trigger/value")?;
        bindings.both(&actions.button_primary_press, "/input/home/click")?;
        bindings.both(&actions.button_secondary_press, "/input/back/click")?;
        bindings.both(&actions.button_auxiliary1_press, "/input/volume_up/click")?;
        bindings.both(&actions.button_auxiliary2_press, "/input/volume_down/click")?;
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
            .button(ButtonSlot::Primary, ButtonLabel::Home, false)
            .button(ButtonSlot::Secondary, ButtonLabel::Back, false)
            .button(ButtonSlot::Auxiliary1, ButtonLabel::VolumeUp, false)
            .button(ButtonSlot::Auxiliary2, ButtonLabel::VolumeDown, false)
            .trackpad(true)
            .haptic();
        Ok(())
    }
}
