use crate::runtime::RuntimeResult;
use thiserror::Error;

/// Hard errors surfaced by this module.
///
/// Qualified-success runtime codes (event queue empty, tracking loss,
/// frame discarded, session not focused) never appear here; callers get
/// those as `None`/unchanged-output results and re-poll next tick.
#[derive(Debug, Error)]
pub enum XrError {
    #[error("{call} failed: {result}")]
    Runtime {
        call: &'static str,
        result: RuntimeResult,
    },

    #[error("duplicate action name {0:?}")]
    DuplicateActionName(String),

    #[error("action set is already attached to a session")]
    ActionSetAttached,

    #[error("session already has an attached action set")]
    SessionAlreadyAttached,

    #[error("action set has not been attached to the session")]
    ActionSetNotAttached,

    #[error("action sync requires a focused session")]
    NotFocused,

    #[error("device index {index} out of range ({count} devices)")]
    DeviceIndexOutOfRange { index: usize, count: usize },

    #[error("{kind} index {index} out of range on device {device:?}")]
    ControlIndexOutOfRange {
        kind: &'static str,
        index: usize,
        device: String,
    },

    #[error("device not found in device manager")]
    DeviceNotFound,

    #[error("VR runtime is not started")]
    RuntimeNotStarted,

    #[error("no session")]
    NoSession,

    #[error("required feature unavailable: {0}")]
    FeatureUnavailable(&'static str),
}

impl XrError {
    /// Wraps a hard runtime error, logging it before it propagates.
    pub(crate) fn runtime(call: &'static str, result: RuntimeResult) -> Self {
        log::error!("{call} failed: {result}");
        XrError::Runtime { call, result }
    }
}

/// Shorthand for converting a boundary-level result into an [`XrError`],
/// tagging it with the originating call.
pub(crate) trait ResultExt<T> {
    fn or_xr(self, call: &'static str) -> Result<T, XrError>;
}

impl<T> ResultExt<T> for Result<T, RuntimeResult> {
    fn or_xr(self, call: &'static str) -> Result<T, XrError> {
        self.map_err(|result| XrError::runtime(call, result))
    }
}
