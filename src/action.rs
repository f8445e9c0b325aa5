use crate::{
    error::{ResultExt, XrError},
    instance::Instance,
    path::Path,
    runtime::{ActionHandle, ActionKind, ActionSetHandle},
};
use openxr as xr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A typed input/output endpoint. Pure capability token: it carries
/// identity and the runtime handle, never polls anything itself.
pub struct Action {
    handle: ActionHandle,
    kind: ActionKind,
    name: String,
    localized_name: String,
    subaction_paths: Vec<Path>,
}

impl Action {
    pub fn handle(&self) -> ActionHandle {
        self.handle
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn localized_name(&self) -> &str {
        &self.localized_name
    }

    pub fn subaction_paths(&self) -> &[Path] {
        &self.subaction_paths
    }
}

/// A fixed collection of actions, attached to a session exactly once.
/// Insertion order is stable and significant (indices are used as lookup
/// keys by callers).
pub struct ActionSet {
    instance: Arc<Instance>,
    handle: ActionSetHandle,
    name: String,
    actions: Vec<Arc<Action>>,
    attached: AtomicBool,
}

impl ActionSet {
    pub fn new(
        instance: Arc<Instance>,
        name: &str,
        localized_name: &str,
    ) -> Result<Self, XrError> {
        let handle = instance
            .runtime()
            .create_action_set(name, localized_name)
            .or_xr("xrCreateActionSet")?;
        Ok(Self {
            instance,
            handle,
            name: name.to_owned(),
            actions: Vec::new(),
            attached: AtomicBool::new(false),
        })
    }

    pub fn handle(&self) -> ActionSetHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates and registers a new action. Fails with
    /// [`XrError::DuplicateActionName`] if the name is taken and with
    /// [`XrError::ActionSetAttached`] once the set has been attached to a
    /// session. Callers must register every action they will ever need
    /// during the single build phase before attaching.
    pub fn add_action(
        &mut self,
        kind: ActionKind,
        name: &str,
        localized_name: &str,
        subaction_paths: &[Path],
    ) -> Result<Arc<Action>, XrError> {
        if self.attached.load(Ordering::Acquire) {
            return Err(XrError::ActionSetAttached);
        }
        if self.actions.iter().any(|a| a.name == name) {
            return Err(XrError::DuplicateActionName(name.to_owned()));
        }
        let raw_paths: Vec<xr::Path> = subaction_paths.iter().map(|p| p.handle()).collect();
        let handle = self
            .instance
            .runtime()
            .create_action(self.handle, kind, name, localized_name, &raw_paths)
            .or_xr("xrCreateAction")?;
        let action = Arc::new(Action {
            handle,
            kind,
            name: name.to_owned(),
            localized_name: localized_name.to_owned(),
            subaction_paths: subaction_paths.to_vec(),
        });
        self.actions.push(action.clone());
        Ok(action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action_at(&self, index: usize) -> Option<&Arc<Action>> {
        self.actions.get(index)
    }

    pub(crate) fn mark_attached(&self) {
        self.attached.store(true, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl Drop for ActionSet {
    fn drop(&mut self) {
        // Destroying the set destroys every action registered in it.
        self.instance.runtime().destroy_action_set(self.handle);
    }
}

macro_rules! input_actions {
    ($($field:ident: $kind:ident, $name:literal, $localized:literal;)+) => {
        /// The shared, engine-neutral action vocabulary every controller
        /// profile binds into. Built exactly once per action-set build,
        /// before any profile suggests bindings.
        pub struct InputActions {
            $(pub $field: Arc<Action>,)+
        }

        impl InputActions {
            pub fn create(set: &mut ActionSet, hands: &[Path; 2]) -> Result<Self, XrError> {
                Ok(Self {
                    $($field: set.add_action(
                        ActionKind::$kind,
                        $name,
                        $localized,
                        hands,
                    )?,)+
                })
            }
        }
    };
}

input_actions! {
    trigger_press: BoolInput, "trigger_press", "Press Trigger";
    trigger_touch: BoolInput, "trigger_touch", "Touch Trigger";
    trigger_near: BoolInput, "trigger_near", "Near Trigger";
    trigger_analog: FloatInput, "trigger_analog", "Pull Trigger";
    trigger_force: FloatInput, "trigger_force", "Squeeze Trigger";
    trigger_curl: FloatInput, "trigger_curl", "Curl Trigger";
    trigger_slide: FloatInput, "trigger_slide", "Slide Trigger";
    trigger_haptic: VibrationOutput, "trigger_haptic", "Trigger Haptic";
    button_primary_press: BoolInput, "button_primary_press", "Press Primary Button";
    button_primary_touch: BoolInput, "button_primary_touch", "Touch Primary Button";
    button_secondary_press: BoolInput, "button_secondary_press", "Press Secondary Button";
    button_secondary_touch: BoolInput, "button_secondary_touch", "Touch Secondary Button";
    button_auxiliary1_press: BoolInput, "button_auxiliary1_press", "Press Auxiliary Button 1";
    button_auxiliary1_touch: BoolInput, "button_auxiliary1_touch", "Touch Auxiliary Button 1";
    button_auxiliary2_press: BoolInput, "button_auxiliary2_press", "Press Auxiliary Button 2";
    button_auxiliary2_touch: BoolInput, "button_auxiliary2_touch", "Touch Auxiliary Button 2";
    joystick_press: BoolInput, "joystick_press", "Press Joystick";
    joystick_touch: BoolInput, "joystick_touch", "Touch Joystick";
    joystick_analog: Vector2Input, "joystick_analog", "Move Joystick";
    trackpad_press: BoolInput, "trackpad_press", "Press TrackPad";
    trackpad_touch: BoolInput, "trackpad_touch", "Touch TrackPad";
    trackpad_analog: Vector2Input, "trackpad_analog", "Move TrackPad";
    thumbrest_press: BoolInput, "thumbrest_press", "Press Thumbrest";
    thumbrest_touch: BoolInput, "thumbrest_touch", "Touch Thumbrest";
    thumbrest_near: BoolInput, "thumbrest_near", "Near Thumbrest";
    thumbrest_haptic: VibrationOutput, "thumbrest_haptic", "Thumbrest Haptic";
    grip_press: BoolInput, "grip_press", "Press Grip";
    grip_touch: BoolInput, "grip_touch", "Touch Grip";
    grip_grab: FloatInput, "grip_grab", "Grab Grip";
    grip_squeeze: FloatInput, "grip_squeeze", "Squeeze Grip";
    grip_pinch: FloatInput, "grip_pinch", "Pinch Grip";
    grip_haptic: VibrationOutput, "grip_haptic", "Grip Haptic";
    gesture_pinch: FloatInput, "gesture_pinch", "Pinch Gesture";
    gesture_aim: FloatInput, "gesture_aim", "Aim Gesture";
    gesture_grasp: FloatInput, "gesture_grasp", "Grasp Gesture";
    pose: PoseInput, "pose", "Pose";
    pose_aim: PoseInput, "pose_aim", "Aim Pose";
}
