//! One engine-facing input device and its controls.
//!
//! Control lists are populated once at construction and immutable after
//! that; only the sampled values change, through atomics, so render code
//! can read snapshots while the main thread samples.

use super::{EventQueue, InputEvent, TrackContext};
use crate::{
    action::Action,
    error::{ResultExt, XrError},
    face_tracker::FaceTracker,
    hand_tracker::{Finger, HandTracker},
    path::Path,
    runtime::Hand,
    session::Session,
    space::{DevicePose, Space},
    AtomicF32,
};
use glam::Quat;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    Hmd,
    LeftHand,
    RightHand,
    Tracker,
    EyeGaze,
}

impl DeviceType {
    pub fn hand(hand: Hand) -> Self {
        match hand {
            Hand::Left => DeviceType::LeftHand,
            Hand::Right => DeviceType::RightHand,
        }
    }
}

/// Which skeletal model, if any, the device reports bone poses with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneConfiguration {
    None,
    Hand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonKind {
    Trigger,
    Action,
    Stick,
    Touchpad,
    Thumbrest,
    Shoulder,
    TwoFingerTrigger,
}

pub(crate) enum ButtonSource {
    Actions {
        press: Option<Arc<Action>>,
        touch: Option<Arc<Action>>,
        near: Option<Arc<Action>>,
    },
    /// Thumb-to-finger pinch from the device's hand tracker; `pair` 0 is
    /// thumb-index.
    HandPinch { pair: usize, threshold: f32 },
}

pub struct DeviceButton {
    id: String,
    name: String,
    kind: ButtonKind,
    source: ButtonSource,
    pressed: AtomicBool,
    touched: AtomicBool,
    near: AtomicBool,
}

impl DeviceButton {
    pub(crate) fn new(id: String, name: String, kind: ButtonKind, source: ButtonSource) -> Self {
        Self {
            id,
            name,
            kind,
            source,
            pressed: AtomicBool::new(false),
            touched: AtomicBool::new(false),
            near: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::Relaxed)
    }

    pub fn is_touched(&self) -> bool {
        self.touched.load(Ordering::Relaxed)
    }

    pub fn is_near(&self) -> bool {
        self.near.load(Ordering::Relaxed)
    }

    fn update_pressed(&self, value: bool, device: usize, button: usize, events: &EventQueue) {
        if self.pressed.swap(value, Ordering::Relaxed) != value {
            events.push(if value {
                InputEvent::ButtonPress { device, button }
            } else {
                InputEvent::ButtonRelease { device, button }
            });
        }
    }

    fn update_touched(&self, value: bool, device: usize, button: usize, events: &EventQueue) {
        if self.touched.swap(value, Ordering::Relaxed) != value {
            events.push(if value {
                InputEvent::ButtonTouch { device, button }
            } else {
                InputEvent::ButtonUntouch { device, button }
            });
        }
    }

    fn update_near(&self, value: bool, device: usize, button: usize, events: &EventQueue) {
        if self.near.swap(value, Ordering::Relaxed) != value {
            events.push(if value {
                InputEvent::ButtonApproach { device, button }
            } else {
                InputEvent::ButtonWithdraw { device, button }
            });
        }
    }

    fn track(&self, ctx: &TrackContext, device: &Device, button_index: usize) {
        let device_index = device.index();
        match &self.source {
            ButtonSource::Actions { press, touch, near } => {
                if let Some(value) = press.as_ref().and_then(|a| sample_bool(ctx, a, device)) {
                    self.update_pressed(value, device_index, button_index, ctx.events);
                }
                if let Some(value) = touch.as_ref().and_then(|a| sample_bool(ctx, a, device)) {
                    self.update_touched(value, device_index, button_index, ctx.events);
                }
                if let Some(value) = near.as_ref().and_then(|a| sample_bool(ctx, a, device)) {
                    self.update_near(value, device_index, button_index, ctx.events);
                }
            }
            ButtonSource::HandPinch { pair, threshold } => {
                let Some(tracker) = &device.hand_tracker else {
                    return;
                };
                let pinch = tracker.lock().unwrap().pinch(*pair);
                self.update_pressed(pinch >= *threshold, device_index, button_index, ctx.events);
                self.update_touched(
                    pinch >= *threshold * 0.5,
                    device_index,
                    button_index,
                    ctx.events,
                );
            }
        }
    }
}

/// Samples a boolean action for this device's sub-action path. An inactive
/// binding is "no change", never "released".
fn sample_bool(ctx: &TrackContext, action: &Action, device: &Device) -> Option<bool> {
    match ctx.session.runtime().get_bool(
        ctx.session.handle(),
        action.handle(),
        device.subaction.handle(),
    ) {
        Ok(state) if state.is_active => Some(state.current_state),
        Ok(_) => None,
        Err(result) => {
            log::trace!("boolean sample of {} failed: {result}", action.name());
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisKind {
    Trigger,
    TriggerForce,
    TriggerCurl,
    TriggerSlide,
    JoystickX,
    JoystickY,
    TrackpadX,
    TrackpadY,
    GripGrab,
    GripSqueeze,
    GripPinch,
    GesturePinch,
    GestureAim,
    GestureGrasp,
    FingerBend,
    FingerSpread,
    TwoFingerTrigger,
}

#[derive(Clone, Copy, Debug)]
pub enum Vec2Component {
    X,
    Y,
}

pub(crate) enum AxisSource {
    Float(Arc<Action>),
    Vector2(Arc<Action>, Vec2Component),
    HandBend(Finger),
    HandSpread(usize),
    HandPinch(usize),
}

pub struct DeviceAxis {
    id: String,
    name: String,
    kind: AxisKind,
    source: AxisSource,
    range: (f32, f32),
    center: f32,
    dead_zone: f32,
    resolution: f32,
    value: AtomicF32,
}

#[derive(Clone, Copy)]
pub(crate) struct AxisParams {
    pub range: (f32, f32),
    pub center: f32,
    pub dead_zone: f32,
    pub resolution: f32,
}

impl Default for AxisParams {
    fn default() -> Self {
        Self {
            range: (0.0, 1.0),
            center: -1.0,
            dead_zone: 0.0,
            resolution: 0.01,
        }
    }
}

impl DeviceAxis {
    pub(crate) fn new(
        id: String,
        name: String,
        kind: AxisKind,
        source: AxisSource,
        params: AxisParams,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            source,
            range: params.range,
            center: params.center,
            dead_zone: params.dead_zone,
            resolution: params.resolution,
            value: AtomicF32::new(params.center),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    /// Current value after remapping, always in `[-1, 1]`.
    pub fn value(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    fn raw_value(&self, ctx: &TrackContext, device: &Device) -> Option<f32> {
        match &self.source {
            AxisSource::Float(action) => match ctx.session.runtime().get_float(
                ctx.session.handle(),
                action.handle(),
                device.subaction.handle(),
            ) {
                Ok(state) if state.is_active => Some(state.current_state),
                Ok(_) => None,
                Err(result) => {
                    log::trace!("float sample of {} failed: {result}", action.name());
                    None
                }
            },
            AxisSource::Vector2(action, component) => match ctx.session.runtime().get_vector2(
                ctx.session.handle(),
                action.handle(),
                device.subaction.handle(),
            ) {
                Ok(state) if state.is_active => Some(match component {
                    Vec2Component::X => state.current_state.x,
                    Vec2Component::Y => state.current_state.y,
                }),
                Ok(_) => None,
                Err(result) => {
                    log::trace!("vector sample of {} failed: {result}", action.name());
                    None
                }
            },
            AxisSource::HandBend(finger) => {
                let tracker = device.hand_tracker.as_ref()?;
                Some(tracker.lock().unwrap().bend(*finger))
            }
            AxisSource::HandSpread(index) => {
                let tracker = device.hand_tracker.as_ref()?;
                Some(tracker.lock().unwrap().spread(*index))
            }
            AxisSource::HandPinch(pair) => {
                let tracker = device.hand_tracker.as_ref()?;
                Some(tracker.lock().unwrap().pinch(*pair))
            }
        }
    }

    fn track(&self, ctx: &TrackContext, device: &Device, axis_index: usize) {
        let Some(raw) = self.raw_value(ctx, device) else {
            return;
        };
        let (min, max) = self.range;
        let mut value = (-1.0 + 2.0 * (raw - min) / (max - min)).clamp(-1.0, 1.0);
        if (value - self.center).abs() < self.dead_zone {
            value = self.center;
        }
        let previous = self.value.load(Ordering::Relaxed);
        if (value - previous).abs() < self.resolution {
            return;
        }
        self.value.store(value, Ordering::Relaxed);
        ctx.events.push(InputEvent::AxisMove {
            device: device.index(),
            axis: axis_index,
            value,
        });
    }
}

pub struct DeviceFeedback {
    id: String,
    name: String,
    haptic: Arc<Action>,
    value: AtomicF32,
}

impl DeviceFeedback {
    pub(crate) fn new(id: String, name: String, haptic: Arc<Action>) -> Self {
        Self {
            id,
            name,
            haptic,
            value: AtomicF32::new(0.0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Generic,
    Trigger,
    Joystick,
    Trackpad,
    Thumbrest,
    Grip,
}

/// Pure metadata about a physical control group on the device.
pub struct DeviceComponent {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
}

pub(crate) struct DeviceInit {
    pub device_type: DeviceType,
    pub id: String,
    pub name: String,
    pub subaction: Path,
    pub pose_action: Option<Arc<Action>>,
    pub space: Option<Space>,
    pub rotation_offset: Quat,
    pub bone_config: BoneConfiguration,
    pub buttons: Vec<DeviceButton>,
    pub axes: Vec<DeviceAxis>,
    pub feedbacks: Vec<DeviceFeedback>,
    pub components: Vec<DeviceComponent>,
    pub hand_tracker: Option<HandTracker>,
    pub face_tracker: Option<FaceTracker>,
}

pub struct Device {
    index: AtomicUsize,
    device_type: DeviceType,
    id: String,
    name: String,
    subaction: Path,
    pose_action: Option<Arc<Action>>,
    space: Option<Space>,
    rotation_offset: Quat,
    bone_config: BoneConfiguration,
    buttons: Vec<DeviceButton>,
    axes: Vec<DeviceAxis>,
    feedbacks: Vec<DeviceFeedback>,
    components: Vec<DeviceComponent>,
    pose: Mutex<DevicePose>,
    hand_tracker: Option<Mutex<HandTracker>>,
    face_tracker: Option<Mutex<FaceTracker>>,
}

impl Device {
    pub(crate) fn new(init: DeviceInit) -> Arc<Self> {
        Arc::new(Self {
            index: AtomicUsize::new(0),
            device_type: init.device_type,
            id: init.id,
            name: init.name,
            subaction: init.subaction,
            pose_action: init.pose_action,
            space: init.space,
            rotation_offset: init.rotation_offset,
            bone_config: init.bone_config,
            buttons: init.buttons,
            axes: init.axes,
            feedbacks: init.feedbacks,
            components: init.components,
            pose: Mutex::new(DevicePose::default()),
            hand_tracker: init.hand_tracker.map(Mutex::new),
            face_tracker: init.face_tracker.map(Mutex::new),
        })
    }

    pub fn index(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    pub(crate) fn set_index(&self, index: usize) {
        self.index.store(index, Ordering::Relaxed);
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bone_configuration(&self) -> BoneConfiguration {
        self.bone_config
    }

    /// The action driving this device's pose, if any (the HMD and purely
    /// hand-tracked devices have none).
    pub fn pose_action(&self) -> Option<&Arc<Action>> {
        self.pose_action.as_ref()
    }

    pub fn pose(&self) -> DevicePose {
        *self.pose.lock().unwrap()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn button(&self, index: usize) -> Option<&DeviceButton> {
        self.buttons.get(index)
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis(&self, index: usize) -> Option<&DeviceAxis> {
        self.axes.get(index)
    }

    pub fn feedback_count(&self) -> usize {
        self.feedbacks.len()
    }

    pub fn feedback(&self, index: usize) -> Option<&DeviceFeedback> {
        self.feedbacks.get(index)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, index: usize) -> Option<&DeviceComponent> {
        self.components.get(index)
    }

    pub fn bone_count(&self) -> usize {
        match &self.hand_tracker {
            Some(tracker) => tracker.lock().unwrap().bone_count(),
            None => 0,
        }
    }

    pub fn bone_pose(&self, index: usize) -> Option<crate::hand_tracker::BonePose> {
        self.hand_tracker
            .as_ref()
            .and_then(|t| t.lock().unwrap().bone_pose(index).copied())
    }

    pub fn face_expression(&self, index: usize) -> Option<f32> {
        self.face_tracker
            .as_ref()
            .and_then(|t| t.lock().unwrap().expression(index))
    }

    pub fn face_expression_count(&self) -> usize {
        match &self.face_tracker {
            Some(tracker) => tracker.lock().unwrap().expression_count(),
            None => 0,
        }
    }

    /// Fires (or stops) the haptic feedback at `index` and records the set
    /// value for polling.
    pub fn set_feedback_value(
        &self,
        session: &Session,
        index: usize,
        value: f32,
    ) -> Result<(), XrError> {
        let feedback = self
            .feedbacks
            .get(index)
            .ok_or(XrError::ControlIndexOutOfRange {
                kind: "feedback",
                index,
                device: self.id.clone(),
            })?;
        feedback.value.store(value, Ordering::Relaxed);
        session
            .runtime()
            .apply_haptic_feedback(
                session.handle(),
                feedback.haptic.handle(),
                self.subaction.handle(),
                openxr::Duration::from_nanos(50_000_000),
                0.0, // unspecified frequency, the runtime picks
                value.clamp(0.0, 1.0),
            )
            .or_xr("xrApplyHapticFeedback")
    }

    /// Samples pose, then buttons and axes. Pose precedence: head tracking
    /// for the HMD, then the device's own space, then the hand-tracker
    /// derived wrist pose.
    pub(crate) fn track_state(&self, ctx: &TrackContext) {
        {
            let mut pose = self.pose.lock().unwrap();
            if self.device_type == DeviceType::Hmd {
                *pose = ctx.session.head_pose();
            } else if let Some(space) = &self.space {
                match space.locate(ctx.stage, ctx.time, &mut pose) {
                    Ok(updated) => {
                        if updated {
                            pose.orientation = (pose.orientation * self.rotation_offset).normalize();
                        }
                    }
                    Err(e) => log::trace!("pose sample of {} failed: {e}", self.id),
                }
            }
        }

        if let Some(tracker) = &self.hand_tracker {
            let mut tracker = tracker.lock().unwrap();
            if self.space.is_some() || self.device_type == DeviceType::Hmd {
                let pose = *self.pose.lock().unwrap();
                tracker.locate(ctx.stage, ctx.time, Some(&pose));
            } else {
                tracker.locate(ctx.stage, ctx.time, None);
                *self.pose.lock().unwrap() = tracker.device_pose();
            }
        }

        if let Some(tracker) = &self.face_tracker {
            tracker.lock().unwrap().sample(ctx.time);
        }

        for (i, button) in self.buttons.iter().enumerate() {
            button.track(ctx, self, i);
        }
        for (i, axis) in self.axes.iter().enumerate() {
            axis.track(ctx, self, i);
        }
    }
}
