use crate::{
    action::Action,
    error::{ResultExt, XrError},
    path::Path,
    runtime::{ReferenceSpaceType, SessionHandle, SpaceHandle, XrRuntime},
};
use glam::{Mat4, Quat, Vec3};
use openxr as xr;
use std::sync::Arc;

/// The latest sampled pose of a trackable thing, in stage space. Fields are
/// deliberately plain so render code can read a cached snapshot without
/// touching the runtime.
#[derive(Clone, Copy, Debug)]
pub struct DevicePose {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for DevicePose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl DevicePose {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }
}

pub fn to_vec3(v: xr::Vector3f) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_quat(q: xr::Quaternionf) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

pub fn to_posef(position: Vec3, orientation: Quat) -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf {
            x: orientation.x,
            y: orientation.y,
            z: orientation.z,
            w: orientation.w,
        },
        position: xr::Vector3f {
            x: position.x,
            y: position.y,
            z: position.z,
        },
    }
}

/// A trackable reference frame: a runtime reference space, an action-bound
/// space, or a device-provided space handed out by an extension.
pub struct Space {
    runtime: Arc<dyn XrRuntime>,
    handle: SpaceHandle,
}

impl Space {
    pub fn reference(
        runtime: Arc<dyn XrRuntime>,
        session: SessionHandle,
        ty: ReferenceSpaceType,
    ) -> Result<Self, XrError> {
        let handle = runtime
            .create_reference_space(session, ty)
            .or_xr("xrCreateReferenceSpace")?;
        Ok(Self { runtime, handle })
    }

    pub fn action(
        runtime: Arc<dyn XrRuntime>,
        session: SessionHandle,
        action: &Action,
        subaction: &Path,
        pose_in_action_space: xr::Posef,
    ) -> Result<Self, XrError> {
        let handle = runtime
            .create_action_space(session, action.handle(), subaction.handle(), pose_in_action_space)
            .or_xr("xrCreateActionSpace")?;
        Ok(Self { runtime, handle })
    }

    /// Adopts a space handle created by the runtime on our behalf (xdev
    /// spaces); ownership transfers here, so it is destroyed on drop like
    /// any other space.
    pub fn from_handle(runtime: Arc<dyn XrRuntime>, handle: SpaceHandle) -> Self {
        Self { runtime, handle }
    }

    pub fn handle(&self) -> SpaceHandle {
        self.handle
    }

    /// Locates this space relative to `base` at `time`, writing the result
    /// into `pose`. When the runtime reports the relation untrackable the
    /// previous contents of `pose` are left untouched, so a transient
    /// tracking loss holds the last known pose instead of teleporting the
    /// device to the origin. Returns whether `pose` was updated.
    pub fn locate(
        &self,
        base: &Space,
        time: xr::Time,
        pose: &mut DevicePose,
    ) -> Result<bool, XrError> {
        let Some(relation) = self
            .runtime
            .locate_space(self.handle, base.handle, time)
            .or_xr("xrLocateSpace")?
        else {
            return Ok(false);
        };
        pose.position = to_vec3(relation.pose.position);
        pose.orientation = to_quat(relation.pose.orientation);
        if let Some(v) = relation.linear_velocity {
            pose.linear_velocity = to_vec3(v);
        }
        if let Some(v) = relation.angular_velocity {
            pose.angular_velocity = to_vec3(v);
        }
        Ok(true)
    }
}

impl Drop for Space {
    fn drop(&mut self) {
        self.runtime.destroy_space(self.handle);
    }
}
