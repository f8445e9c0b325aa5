//! Facial expression sampling (eye + lip trackers).

use crate::{
    error::XrError,
    runtime::{FaceTrackerHandle, FacialTrackerKind, SessionHandle, XrRuntime},
};
use openxr as xr;
use std::sync::Arc;

pub const EYE_EXPRESSION_COUNT: usize = 14;
pub const LIP_EXPRESSION_COUNT: usize = 37;
pub const FACE_EXPRESSION_COUNT: usize = EYE_EXPRESSION_COUNT + LIP_EXPRESSION_COUNT;

/// Samples runtime facial trackers into one flat weight array the engine
/// polls by index: eye expressions first, lip expressions after.
pub struct FaceTracker {
    runtime: Arc<dyn XrRuntime>,
    eye: Option<FaceTrackerHandle>,
    lip: Option<FaceTrackerHandle>,
    weights: [f32; FACE_EXPRESSION_COUNT],
}

impl FaceTracker {
    /// Creates whichever trackers the runtime offers. At least one kind
    /// must be available, otherwise construction fails so the caller skips
    /// attaching a face tracker at all.
    pub fn new(runtime: Arc<dyn XrRuntime>, session: SessionHandle) -> Result<Self, XrError> {
        let create = |kind| match runtime.create_facial_tracker(session, kind) {
            Ok(handle) => Some(handle),
            Err(result) => {
                log::debug!("facial tracker {kind:?} unavailable: {result}");
                None
            }
        };
        let eye = create(FacialTrackerKind::Eye);
        let lip = create(FacialTrackerKind::Lip);
        if eye.is_none() && lip.is_none() {
            return Err(XrError::FeatureUnavailable("facial tracking"));
        }
        Ok(Self {
            runtime,
            eye,
            lip,
            weights: [0.0; FACE_EXPRESSION_COUNT],
        })
    }

    /// Refreshes the weight array. Inactive or failed queries hold the
    /// previous weights.
    pub fn sample(&mut self, time: xr::Time) {
        if let Some(eye) = self.eye {
            if let Ok(Some(weights)) = self.runtime.get_expression_weights(eye, time) {
                for (slot, value) in self.weights[..EYE_EXPRESSION_COUNT]
                    .iter_mut()
                    .zip(weights)
                {
                    *slot = value;
                }
            }
        }
        if let Some(lip) = self.lip {
            if let Ok(Some(weights)) = self.runtime.get_expression_weights(lip, time) {
                for (slot, value) in self.weights[EYE_EXPRESSION_COUNT..].iter_mut().zip(weights) {
                    *slot = value;
                }
            }
        }
    }

    pub fn expression_count(&self) -> usize {
        FACE_EXPRESSION_COUNT
    }

    pub fn expression(&self, index: usize) -> Option<f32> {
        self.weights.get(index).copied()
    }
}

impl Drop for FaceTracker {
    fn drop(&mut self) {
        if let Some(eye) = self.eye {
            self.runtime.destroy_facial_tracker(eye);
        }
        if let Some(lip) = self.lip {
            self.runtime.destroy_facial_tracker(lip);
        }
    }
}
