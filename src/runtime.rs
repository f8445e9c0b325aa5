//! The resolved-entry-points boundary to the OpenXR runtime.
//!
//! Everything this module talks to the runtime through is collected in the
//! [`XrRuntime`] trait: one immutable table of calls, resolved once by the
//! loader layer and injected into [`crate::instance::Instance`]. No other
//! code in the crate performs runtime calls. The test double in
//! [`fake`] implements the same trait with scriptable state.

use openxr as xr;
use std::fmt;

#[cfg(test)]
pub mod fake;

macro_rules! handles {
    ($($(#[$attr:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )+
    };
}

handles! {
    ActionSetHandle,
    ActionHandle,
    SessionHandle,
    SpaceHandle,
    SwapchainHandle,
    HandTrackerHandle,
    FaceTrackerHandle,
}

/// Decoded symbolic names for hard runtime error codes.
///
/// Qualified-success codes never show up here; boundary calls report those
/// through their return payloads (`None`, timeout flags, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeResult {
    ValidationFailure,
    RuntimeFailure,
    OutOfMemory,
    HandleInvalid,
    InstanceLost,
    SessionLost,
    SessionNotRunning,
    SessionNotReady,
    LimitReached,
    PathInvalid,
    PathFormatInvalid,
    PathUnsupported,
    ActionsetsAlreadyAttached,
    ActionsetNotAttached,
    NameDuplicated,
    NameInvalid,
    LocalizedNameDuplicated,
    ExtensionNotPresent,
    FeatureUnsupported,
    CallOrderInvalid,
    Other(i32),
}

impl fmt::Display for RuntimeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeResult::Other(raw) => write!(f, "XR error {raw}"),
            other => write!(f, "XR_ERROR_{other:?}"),
        }
    }
}

/// Which hand a handed device, sub-action path or tracker belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn user_path(self) -> &'static str {
        match self {
            Hand::Left => "/user/hand/left",
            Hand::Right => "/user/hand/right",
        }
    }
}

/// Instance extensions this subsystem cares about. The loader layer decides
/// what actually gets enabled; the boundary only answers "is it usable".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    HandTracking,
    EyeGazeInteraction,
    FacialTrackingHtc,
    ViveTrackerInteraction,
    XdevSpace,
    HandInteraction,
    HandInteractionHtc,
    HandInteractionMsft,
    ViveCosmosController,
    ViveFocus3Controller,
    HuaweiController,
    HpMixedRealityController,
    SamsungOdysseyController,
    TouchControllerPlus,
    TouchControllerPro,
}

/// Kinds of input/output endpoints an [`crate::action::Action`] can be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    BoolInput,
    FloatInput,
    Vector2Input,
    PoseInput,
    VibrationOutput,
}

/// Properties of the runtime's system (HMD) once one is present.
#[derive(Clone, Copy, Debug)]
pub struct SystemInfo {
    pub render_width: u32,
    pub render_height: u32,
    pub supports_hand_tracking: bool,
    pub supports_eye_gaze: bool,
    pub supports_facial_tracking: bool,
}

/// Events drained from the runtime's queue once per tick.
#[derive(Clone, Copy, Debug)]
pub enum RuntimeEvent {
    SessionStateChanged(xr::SessionState),
    InstanceLossPending,
    InteractionProfileChanged,
    ViveTrackerConnected { persistent_path: xr::Path },
}

/// Outcome of an action sync. `NotFocused` and `SessionLoss` are
/// qualified successes: no fresh data, re-poll next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncResult {
    Synced,
    NotFocused,
    SessionLoss,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameState {
    pub predicted_display_time: xr::Time,
    pub predicted_display_period: xr::Duration,
    pub should_render: bool,
}

/// Relation of one space to another at one point in time. Returned only
/// when the runtime marked the pose trackable; velocities are optional on
/// top of that.
#[derive(Clone, Copy, Debug)]
pub struct SpaceRelation {
    pub pose: xr::Posef,
    pub linear_velocity: Option<xr::Vector3f>,
    pub angular_velocity: Option<xr::Vector3f>,
}

#[derive(Clone, Copy, Debug)]
pub struct EyeView {
    pub pose: xr::Posef,
    pub fov: xr::Fovf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
}

#[derive(Clone, Copy, Debug)]
pub struct SwapchainCreateInfo {
    pub width: u32,
    pub height: u32,
    pub format: i64,
    pub sample_count: u32,
}

/// One projection layer eye entry for end-frame submission.
#[derive(Clone, Copy, Debug)]
pub struct EyeLayer {
    pub swapchain: SwapchainHandle,
    pub pose: xr::Posef,
    pub fov: xr::Fovf,
    pub width: u32,
    pub height: u32,
}

pub const HAND_JOINT_COUNT: usize = 26;

#[derive(Clone, Copy, Debug)]
pub struct HandJointLocation {
    pub pose: xr::Posef,
    pub radius: f32,
}

pub type HandJointLocations = [HandJointLocation; HAND_JOINT_COUNT];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FacialTrackerKind {
    Eye,
    Lip,
}

/// One connected vive-style tracker as reported by the runtime's
/// enumeration call. `role_path` is NULL while the runtime has not
/// assigned a role yet.
#[derive(Clone, Copy, Debug)]
pub struct TrackerConnection {
    pub persistent_path: xr::Path,
    pub role_path: xr::Path,
}

/// One runtime-enumerated external device ("xdev") that may expose its own
/// trackable space.
#[derive(Clone, Debug)]
pub struct XdevInfo {
    pub id: u64,
    pub name: String,
    pub serial: String,
    pub can_create_space: bool,
}

pub type CallResult<T> = Result<T, RuntimeResult>;

/// The resolved OpenXR entry points, one method per call this subsystem
/// issues. Implementations are expected to be internally synchronized; the
/// wait-frame thread and the main thread both go through this table.
pub trait XrRuntime: Send + Sync {
    // Instance level.
    fn string_to_path(&self, s: &str) -> CallResult<xr::Path>;
    fn path_to_string(&self, path: xr::Path) -> CallResult<String>;
    fn supports_extension(&self, extension: Extension) -> bool;
    fn poll_event(&self) -> CallResult<Option<RuntimeEvent>>;
    /// None while the runtime has no usable system (e.g. HMD not plugged in).
    fn system_info(&self) -> CallResult<Option<SystemInfo>>;

    // Action sets and actions.
    fn create_action_set(&self, name: &str, localized_name: &str) -> CallResult<ActionSetHandle>;
    fn destroy_action_set(&self, set: ActionSetHandle);
    fn create_action(
        &self,
        set: ActionSetHandle,
        kind: ActionKind,
        name: &str,
        localized_name: &str,
        subaction_paths: &[xr::Path],
    ) -> CallResult<ActionHandle>;
    fn suggest_bindings(
        &self,
        interaction_profile: xr::Path,
        bindings: &[SuggestedBinding],
    ) -> CallResult<()>;

    // Session lifecycle.
    fn create_session(&self) -> CallResult<SessionHandle>;
    fn destroy_session(&self, session: SessionHandle);
    fn begin_session(&self, session: SessionHandle) -> CallResult<()>;
    fn end_session(&self, session: SessionHandle) -> CallResult<()>;
    fn request_exit_session(&self, session: SessionHandle) -> CallResult<()>;
    fn attach_action_set(&self, session: SessionHandle, set: ActionSetHandle) -> CallResult<()>;
    fn sync_actions(&self, session: SessionHandle, set: ActionSetHandle) -> CallResult<SyncResult>;
    /// Interaction profile currently bound to a top-level user path;
    /// NULL when nothing is bound.
    fn current_interaction_profile(
        &self,
        session: SessionHandle,
        top_level: xr::Path,
    ) -> CallResult<xr::Path>;

    // Action state.
    fn get_bool(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<bool>>;
    fn get_float(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<f32>>;
    fn get_vector2(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<xr::Vector2f>>;
    fn apply_haptic_feedback(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
        duration: xr::Duration,
        frequency: f32,
        amplitude: f32,
    ) -> CallResult<()>;

    // Spaces.
    fn create_reference_space(
        &self,
        session: SessionHandle,
        ty: ReferenceSpaceType,
    ) -> CallResult<SpaceHandle>;
    fn create_action_space(
        &self,
        session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
        pose_in_action_space: xr::Posef,
    ) -> CallResult<SpaceHandle>;
    fn destroy_space(&self, space: SpaceHandle);
    /// `Ok(None)` when the runtime reports the relation untrackable at
    /// `time` (callers hold their previous value).
    fn locate_space(
        &self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: xr::Time,
    ) -> CallResult<Option<SpaceRelation>>;

    // Frame loop.
    fn wait_frame(&self, session: SessionHandle) -> CallResult<FrameState>;
    fn begin_frame(&self, session: SessionHandle) -> CallResult<()>;
    fn end_frame(
        &self,
        session: SessionHandle,
        display_time: xr::Time,
        layers: &[EyeLayer],
    ) -> CallResult<()>;
    /// `Ok(None)` when view tracking is unavailable at `time`.
    fn locate_views(
        &self,
        session: SessionHandle,
        time: xr::Time,
        base: SpaceHandle,
    ) -> CallResult<Option<[EyeView; 2]>>;

    // Swapchains.
    fn enumerate_swapchain_formats(&self, session: SessionHandle) -> CallResult<Vec<i64>>;
    fn create_swapchain(
        &self,
        session: SessionHandle,
        info: &SwapchainCreateInfo,
    ) -> CallResult<SwapchainHandle>;
    fn destroy_swapchain(&self, swapchain: SwapchainHandle);
    fn enumerate_swapchain_images(&self, swapchain: SwapchainHandle) -> CallResult<Vec<u64>>;
    fn acquire_swapchain_image(&self, swapchain: SwapchainHandle) -> CallResult<u32>;
    /// `Ok(false)` on wait timeout (caller retries next frame).
    fn wait_swapchain_image(&self, swapchain: SwapchainHandle) -> CallResult<bool>;
    fn release_swapchain_image(&self, swapchain: SwapchainHandle) -> CallResult<()>;

    // Hand tracking.
    fn create_hand_tracker(
        &self,
        session: SessionHandle,
        hand: Hand,
    ) -> CallResult<HandTrackerHandle>;
    fn destroy_hand_tracker(&self, tracker: HandTrackerHandle);
    /// `Ok(None)` when the joint set is inactive (hand not tracked).
    fn locate_hand_joints(
        &self,
        tracker: HandTrackerHandle,
        base: SpaceHandle,
        time: xr::Time,
    ) -> CallResult<Option<Box<HandJointLocations>>>;

    // Facial tracking.
    fn create_facial_tracker(
        &self,
        session: SessionHandle,
        kind: FacialTrackerKind,
    ) -> CallResult<FaceTrackerHandle>;
    fn destroy_facial_tracker(&self, tracker: FaceTrackerHandle);
    /// `Ok(None)` when expression data is inactive.
    fn get_expression_weights(
        &self,
        tracker: FaceTrackerHandle,
        time: xr::Time,
    ) -> CallResult<Option<Vec<f32>>>;

    // Tracker enumeration.
    fn enumerate_vive_trackers(&self) -> CallResult<Vec<TrackerConnection>>;
    fn enumerate_xdevs(&self, session: SessionHandle) -> CallResult<Vec<XdevInfo>>;
    fn create_xdev_space(&self, session: SessionHandle, id: u64) -> CallResult<SpaceHandle>;
}

/// One entry of a binding-suggestion batch.
#[derive(Clone, Copy, Debug)]
pub struct SuggestedBinding {
    pub action: ActionHandle,
    pub binding: xr::Path,
}
