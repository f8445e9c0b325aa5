//! Skeletal hand sampling and the derived per-finger scalars.

use crate::{
    error::{ResultExt, XrError},
    runtime::{Hand, HandTrackerHandle, SessionHandle, XrRuntime, HAND_JOINT_COUNT},
    space::{to_quat, to_vec3, DevicePose, Space},
};
use glam::{Quat, Vec3};
use openxr as xr;
use std::sync::Arc;

/// Joint indices as reported by the runtime's 26-joint hand model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum HandJoint {
    Palm = 0,
    Wrist = 1,
    ThumbMetacarpal = 2,
    ThumbProximal = 3,
    ThumbDistal = 4,
    ThumbTip = 5,
    IndexMetacarpal = 6,
    IndexProximal = 7,
    IndexIntermediate = 8,
    IndexDistal = 9,
    IndexTip = 10,
    MiddleMetacarpal = 11,
    MiddleProximal = 12,
    MiddleIntermediate = 13,
    MiddleDistal = 14,
    MiddleTip = 15,
    RingMetacarpal = 16,
    RingProximal = 17,
    RingIntermediate = 18,
    RingDistal = 19,
    RingTip = 20,
    LittleMetacarpal = 21,
    LittleProximal = 22,
    LittleIntermediate = 23,
    LittleDistal = 24,
    LittleTip = 25,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Finger {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Little = 4,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    fn proximal(self) -> usize {
        match self {
            Finger::Thumb => HandJoint::ThumbProximal as usize,
            Finger::Index => HandJoint::IndexProximal as usize,
            Finger::Middle => HandJoint::MiddleProximal as usize,
            Finger::Ring => HandJoint::RingProximal as usize,
            Finger::Little => HandJoint::LittleProximal as usize,
        }
    }

    fn distal(self) -> usize {
        match self {
            Finger::Thumb => HandJoint::ThumbDistal as usize,
            Finger::Index => HandJoint::IndexDistal as usize,
            Finger::Middle => HandJoint::MiddleDistal as usize,
            Finger::Ring => HandJoint::RingDistal as usize,
            Finger::Little => HandJoint::LittleDistal as usize,
        }
    }

    fn tip(self) -> usize {
        match self {
            Finger::Thumb => HandJoint::ThumbTip as usize,
            Finger::Index => HandJoint::IndexTip as usize,
            Finger::Middle => HandJoint::MiddleTip as usize,
            Finger::Ring => HandJoint::RingTip as usize,
            Finger::Little => HandJoint::LittleTip as usize,
        }
    }
}

/// One sampled bone, relative to the owning device's pose.
#[derive(Clone, Copy, Debug)]
pub struct BonePose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for BonePose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

// Flexion angle (radians) mapped to bend 0..1. Hand tuned per finger; may
// need recalibration against other runtimes.
const BEND_LIMITS: [(f32, f32); 5] = [
    (0.10, 0.95),
    (0.12, 2.20),
    (0.12, 2.30),
    (0.12, 2.30),
    (0.12, 2.20),
];

// Angle (radians) between adjacent proximal directions mapped to spread
// 0..1, pairs thumb-index through ring-little. Hand tuned.
const SPREAD_LIMITS: [(f32, f32); 4] = [(0.25, 0.90), (0.04, 0.30), (0.03, 0.25), (0.05, 0.35)];

// Thumb-tip to fingertip distance (meters) mapped to pinch strength 1..0.
const PINCH_NEAR: f32 = 0.015;
const PINCH_FAR: f32 = 0.07;

fn remap01(value: f32, lower: f32, upper: f32) -> f32 {
    ((value - lower) / (upper - lower)).clamp(0.0, 1.0)
}

/// Samples runtime hand joints into the engine's bone model and the derived
/// bend/spread/pinch scalars the axis layer reads.
pub struct HandTracker {
    runtime: Arc<dyn XrRuntime>,
    handle: HandTrackerHandle,
    hand: Hand,
    bones: [BonePose; HAND_JOINT_COUNT],
    bend: [f32; 5],
    spread: [f32; 4],
    pinch: [f32; 4],
    device_pose: DevicePose,
}

impl HandTracker {
    pub fn new(
        runtime: Arc<dyn XrRuntime>,
        session: SessionHandle,
        hand: Hand,
    ) -> Result<Self, XrError> {
        let handle = runtime
            .create_hand_tracker(session, hand)
            .or_xr("xrCreateHandTrackerEXT")?;
        Ok(Self {
            runtime,
            handle,
            hand,
            bones: [BonePose::default(); HAND_JOINT_COUNT],
            bend: [0.0; 5],
            spread: [0.0; 4],
            pinch: [0.0; 4],
            device_pose: DevicePose::default(),
        })
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// Samples all joints relative to `base` at `time` in one batched call.
    /// An inactive or failed query leaves every previously sampled value
    /// unchanged (hold-last, like space location).
    ///
    /// `owner_pose` is the owning device's pose when that device reports
    /// its own grip pose; pure hand-tracking devices pass `None` and get
    /// their pose derived from the wrist instead. Bones are stored relative
    /// to the resulting device pose either way, so hand-tracked virtual
    /// devices stay comparable to real controllers.
    pub fn locate(&mut self, base: &Space, time: xr::Time, owner_pose: Option<&DevicePose>) {
        let joints = match self.runtime.locate_hand_joints(self.handle, base.handle(), time) {
            Ok(Some(joints)) => joints,
            Ok(None) => return,
            Err(result) => {
                log::trace!("hand joint locate failed ({result}), holding last sample");
                return;
            }
        };

        let positions: Vec<Vec3> = joints.iter().map(|j| to_vec3(j.pose.position)).collect();
        let orientations: Vec<Quat> = joints
            .iter()
            .map(|j| to_quat(j.pose.orientation))
            .collect();

        let device_pose = match owner_pose {
            Some(pose) => *pose,
            None => {
                let wrist = HandJoint::Wrist as usize;
                let pose = derive_device_pose(positions[wrist], orientations[wrist]);
                self.device_pose = pose;
                pose
            }
        };

        let inv_rot = device_pose.orientation.inverse();
        for (bone, (position, orientation)) in self
            .bones
            .iter_mut()
            .zip(positions.iter().zip(orientations.iter()))
        {
            bone.position = inv_rot * (*position - device_pose.position);
            bone.orientation = inv_rot * *orientation;
        }

        for finger in Finger::ALL {
            let base_rot = orientations[finger.proximal()];
            let tip_rot = orientations[finger.distal()];
            let bent = (base_rot.inverse() * tip_rot) * Vec3::NEG_Z;
            let angle = bent.angle_between(Vec3::NEG_Z);
            let (lower, upper) = BEND_LIMITS[finger as usize];
            self.bend[finger as usize] = remap01(angle, lower, upper);
        }

        let wrist_pos = positions[HandJoint::Wrist as usize];
        for (i, pair) in Finger::ALL.windows(2).enumerate() {
            let a = (positions[pair[0].proximal()] - wrist_pos).normalize_or_zero();
            let b = (positions[pair[1].proximal()] - wrist_pos).normalize_or_zero();
            let (lower, upper) = SPREAD_LIMITS[i];
            self.spread[i] = remap01(a.angle_between(b), lower, upper);
        }

        let thumb_tip = positions[Finger::Thumb.tip()];
        for (i, finger) in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Little]
            .into_iter()
            .enumerate()
        {
            let distance = thumb_tip.distance(positions[finger.tip()]);
            self.pinch[i] = 1.0 - remap01(distance, PINCH_NEAR, PINCH_FAR);
        }
    }

    pub fn bone_count(&self) -> usize {
        HAND_JOINT_COUNT
    }

    pub fn bone_pose(&self, index: usize) -> Option<&BonePose> {
        self.bones.get(index)
    }

    pub fn bend(&self, finger: Finger) -> f32 {
        self.bend[finger as usize]
    }

    /// Spread between adjacent fingers; index 0 is thumb-index, 3 is
    /// ring-little.
    pub fn spread(&self, index: usize) -> f32 {
        self.spread[index]
    }

    /// Pinch strength of the thumb against finger `index` (0 = index
    /// finger .. 3 = little finger).
    pub fn pinch(&self, index: usize) -> f32 {
        self.pinch[index]
    }

    /// The wrist-derived pose for devices without their own pose action.
    pub fn device_pose(&self) -> DevicePose {
        self.device_pose
    }
}

impl Drop for HandTracker {
    fn drop(&mut self) {
        self.runtime.destroy_hand_tracker(self.handle);
    }
}

/// Aligns the wrist frame with the grip convention of real controllers so
/// hand-driven virtual devices pose like physical ones.
fn derive_device_pose(wrist_position: Vec3, wrist_orientation: Quat) -> DevicePose {
    let offset_rotation = Quat::from_rotation_x(-0.45);
    let offset_translation = Vec3::new(0.0, 0.01, 0.05);
    DevicePose {
        position: wrist_position + wrist_orientation * offset_translation,
        orientation: (wrist_orientation * offset_rotation).normalize(),
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{fake::FakeRuntime, HandJointLocation, HandJointLocations, ReferenceSpaceType};
    use std::f32::consts::FRAC_PI_2;

    fn joint_at(position: Vec3) -> HandJointLocation {
        HandJointLocation {
            pose: xr::Posef {
                orientation: xr::Quaternionf {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                },
                position: xr::Vector3f {
                    x: position.x,
                    y: position.y,
                    z: position.z,
                },
            },
            radius: 0.01,
        }
    }

    /// A synthetic hand with a known shape: wrist away from the origin,
    /// index finger curled 90 degrees and pinching the thumb, thumb spread
    /// wide, little finger far away.
    fn scripted_hand() -> Box<HandJointLocations> {
        let wrist = Vec3::new(0.1, 0.2, 0.3);
        let mut joints = Box::new([joint_at(Vec3::ZERO); HAND_JOINT_COUNT]);
        joints[HandJoint::Wrist as usize] = joint_at(wrist);
        joints[HandJoint::ThumbProximal as usize] = joint_at(wrist + Vec3::X);
        for proximal in [
            HandJoint::IndexProximal,
            HandJoint::MiddleProximal,
            HandJoint::RingProximal,
            HandJoint::LittleProximal,
        ] {
            joints[proximal as usize] = joint_at(wrist + Vec3::NEG_Z);
        }
        joints[HandJoint::IndexTip as usize] = joint_at(Vec3::new(0.01, 0.0, 0.0));
        joints[HandJoint::LittleTip as usize] = joint_at(Vec3::X);

        let curl = Quat::from_rotation_x(FRAC_PI_2);
        joints[HandJoint::IndexDistal as usize].pose.orientation = xr::Quaternionf {
            x: curl.x,
            y: curl.y,
            z: curl.z,
            w: curl.w,
        };
        joints
    }

    fn fixture() -> (Arc<FakeRuntime>, HandTracker, Space) {
        let runtime = Arc::new(FakeRuntime::with_hmd());
        let session = runtime.create_session().unwrap();
        let base = Space::reference(runtime.clone(), session, ReferenceSpaceType::Stage).unwrap();
        let tracker = HandTracker::new(runtime.clone(), session, Hand::Left).unwrap();
        (runtime, tracker, base)
    }

    #[test]
    fn derives_bend_spread_and_pinch() {
        let (runtime, mut tracker, base) = fixture();
        runtime.set_hand_joints(Hand::Left, Some(scripted_hand()));
        tracker.locate(&base, xr::Time::from_nanos(1), None);

        // Straight thumb, curled index.
        assert_eq!(tracker.bend(Finger::Thumb), 0.0);
        let index_bend = tracker.bend(Finger::Index);
        assert!((0.6..0.8).contains(&index_bend), "index bend {index_bend}");

        // Thumb splayed a quarter turn from the index, other fingers
        // parallel to each other.
        assert_eq!(tracker.spread(0), 1.0);
        assert_eq!(tracker.spread(1), 0.0);
        assert_eq!(tracker.spread(3), 0.0);

        // Index tip touches the thumb tip, little finger is a meter away.
        assert_eq!(tracker.pinch(0), 1.0);
        assert_eq!(tracker.pinch(3), 0.0);
    }

    #[test]
    fn untracked_joints_hold_the_last_sample() {
        let (runtime, mut tracker, base) = fixture();
        runtime.set_hand_joints(Hand::Left, Some(scripted_hand()));
        tracker.locate(&base, xr::Time::from_nanos(1), None);
        assert_eq!(tracker.pinch(0), 1.0);

        runtime.set_hand_joints(Hand::Left, None);
        tracker.locate(&base, xr::Time::from_nanos(2), None);
        assert_eq!(tracker.pinch(0), 1.0);
        assert_eq!(tracker.spread(0), 1.0);
    }

    #[test]
    fn device_pose_derives_from_the_wrist() {
        let (runtime, mut tracker, base) = fixture();
        runtime.set_hand_joints(Hand::Left, Some(scripted_hand()));
        tracker.locate(&base, xr::Time::from_nanos(1), None);

        let pose = tracker.device_pose();
        assert!((pose.position - Vec3::new(0.1, 0.21, 0.35)).length() < 1e-6);
        let expected = Quat::from_rotation_x(-0.45);
        assert!(pose.orientation.dot(expected).abs() > 0.999);
    }
}
