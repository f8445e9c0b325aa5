use super::{Bindings, ControllerModel, DeviceBuilder};
use crate::{action::InputActions, error::XrError, runtime::Extension};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Variant {
    Ext,
    Htc,
    Msft,
}

/// Gesture-based "virtual controller" profiles exposed by runtimes that
/// synthesize input from camera hand tracking. All three vendor variants
/// share the same device layout; only binding paths differ.
pub struct HandInteraction {
    variant: Variant,
}

impl HandInteraction {
    pub fn ext() -> Self {
        Self { variant: Variant::Ext }
    }

    pub fn htc() -> Self {
        Self { variant: Variant::Htc }
    }

    pub fn msft() -> Self {
        Self { variant: Variant::Msft }
    }
}

impl ControllerModel for HandInteraction {
    fn profile_path(&self) -> &'static str {
        match self.variant {
            Variant::Ext => "/interaction_profiles/ext/hand_interaction_ext",
            Variant::Htc => "/interaction_profiles/htc/hand_interaction",
            Variant::Msft => "/interaction_profiles/microsoft/hand_interaction",
        }
    }

    fn name(&self) -> &'static str {
        match self.variant {
            Variant::Ext => "Hand Interaction",
            Variant::Htc => "Vive Hand Interaction",
            Variant::Msft => "Microsoft Hand Interaction",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self.variant {
            Variant::Ext => "hi_",
            Variant::Htc => "hih_",
            Variant::Msft => "him_",
        }
    }

    fn required_extension(&self) -> Option<Extension> {
        Some(match self.variant {
            Variant::Ext => Extension::HandInteraction,
            Variant::Htc => Extension::HandInteractionHtc,
            Variant::Msft => Extension::HandInteractionMsft,
        })
    }

    fn hand_tracking(&self) -> bool {
        true
    }

    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError> {
        match self.variant {
            Variant::Ext => {
                bindings.both(&actions.trigger_press, "/input/pinch_ext/value")?;
                bindings.both(&actions.trigger_analog, "/input/pinch_ext/value")?;
                bindings.both(&actions.gesture_pinch, "/input/pinch_ext/value")?;
                bindings.both(&actions.gesture_aim, "/input/aim_activate_ext/value")?;
                bindings.both(&actions.gesture_grasp, "/input/grasp_ext/value")?;
                bindings.both(&actions.grip_press, "/input/grasp_ext/value")?;
            }
            Variant::Htc | Variant::Msft => {
                bindings.both(&actions.trigger_press, "/input/select/value")?;
                bindings.both(&actions.trigger_analog, "/input/select/value")?;
                bindings.both(&actions.gesture_pinch, "/input/select/value")?;
                bindings.both(&actions.gesture_grasp, "/input/squeeze/value")?;
                bindings.both(&actions.grip_press, "/input/squeeze/value")?;
            }
        }
        bindings.both(&actions.pose, "/input/grip/pose")?;
        bindings.both(&actions.pose_aim, "/input/aim/pose")?;
        Ok(())
    }

    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError> {
        device.gestures();
        Ok(())
    }
}
