//! Device profiles: one per interaction profile the runtime may report.
//!
//! Profiles implement a small capability set (create actions, suggest
//! bindings, re-check attachment, clear actions). The common "two-hand,
//! path-matched" policy lives in [`HandedProfile`]; enumerable hardware
//! (trackers) implements the protocol independently.

pub mod daydream_controller;
pub mod eye_gaze;
pub mod hand_interaction;
pub mod hmd;
pub mod hp_mixed_reality;
pub mod huawei_controller;
pub mod meta_touch_plus;
pub mod meta_touch_pro;
pub mod ms_motion_controller;
pub mod no_controller_hands;
pub mod oculus_go;
pub mod oculus_touch;
pub mod simple_controller;
pub mod valve_index;
pub mod vive_controller;
pub mod vive_cosmos;
pub mod vive_focus3;
pub mod vive_tracker;
pub mod xdev_tracker;

use super::{
    device::{
        AxisKind, AxisParams, AxisSource, BoneConfiguration, ButtonKind, ButtonSource, ComponentKind,
        Device, DeviceAxis, DeviceButton, DeviceComponent, DeviceFeedback, DeviceInit, DeviceType,
        Vec2Component,
    },
    DeviceManager,
};
use crate::{
    action::{Action, ActionSet, InputActions},
    error::{ResultExt, XrError},
    face_tracker::FaceTracker,
    hand_tracker::{Finger, HandTracker},
    instance::Instance,
    path::Path,
    runtime::{Extension, Hand, SuggestedBinding, SystemInfo},
    session::Session,
    space::Space,
    Config,
};
use glam::Quat;
use openxr as xr;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

/// Deferred session-restart flag, consumed at the top of the next tick's
/// event processing, never inside a profile callback. Per-unit requests are
/// debounced so misbehaving runtimes flapping a tracker connection cannot
/// force a restart storm.
pub struct RestartRequest {
    requested: bool,
    debounce: Duration,
    recent: HashMap<String, Instant>,
}

impl RestartRequest {
    pub fn new(debounce: Duration) -> Self {
        Self {
            requested: false,
            debounce,
            recent: HashMap::new(),
        }
    }

    pub fn request(&mut self, reason: &str) {
        if !self.requested {
            log::info!("session restart requested: {reason}");
        }
        self.requested = true;
    }

    /// Debounced per-unit variant for hot-pluggable hardware.
    pub fn request_for_unit(&mut self, serial: &str, reason: &str) {
        let now = Instant::now();
        if let Some(last) = self.recent.get(serial) {
            if now.duration_since(*last) < self.debounce {
                log::debug!("suppressing duplicate restart request for {serial}");
                return;
            }
        }
        self.recent.insert(serial.to_owned(), now);
        self.request(reason);
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }
}

/// Context for binding suggestion, between action-set build and attach.
pub struct BindContext<'a> {
    pub instance: &'a Arc<Instance>,
    pub actions: &'a InputActions,
}

/// Context for attachment re-checks and action teardown. `session`,
/// `actions` and `system` are populated whenever a session exists.
pub struct AttachContext<'a> {
    pub instance: &'a Arc<Instance>,
    pub session: Option<&'a Arc<Session>>,
    pub actions: Option<&'a InputActions>,
    pub system: Option<&'a SystemInfo>,
    pub devices: &'a mut DeviceManager,
    pub restart: &'a mut RestartRequest,
    pub config: &'a Config,
}

/// The capability set every profile implements.
pub trait DeviceProfile: Send {
    fn name(&self) -> &'static str;

    /// Called exactly once per action-set build, before the set is
    /// attached. Profiles with their own actions (trackers, eye gaze)
    /// register them here.
    fn create_actions(
        &mut self,
        _instance: &Arc<Instance>,
        _set: &mut ActionSet,
    ) -> Result<(), XrError> {
        Ok(())
    }

    /// Called exactly once, after all profiles created their actions and
    /// before attach. Submits the complete binding table for this profile
    /// in one call; tables cannot be amended afterwards.
    fn suggest_bindings(&self, _ctx: &BindContext) -> Result<(), XrError> {
        Ok(())
    }

    /// Re-evaluates which devices this profile should own. Called after
    /// every session state change and speculatively at a throttled interval
    /// while focused. Must be idempotent.
    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError>;

    /// Tears down owned devices before a session restart.
    fn clear_actions(&mut self, devices: &mut DeviceManager);
}

/// Accumulates one profile's path-to-action binding table.
pub struct Bindings<'a> {
    instance: &'a Arc<Instance>,
    list: Vec<SuggestedBinding>,
}

impl<'a> Bindings<'a> {
    pub fn new(instance: &'a Arc<Instance>) -> Self {
        Self {
            instance,
            list: Vec::new(),
        }
    }

    pub fn add(&mut self, action: &Action, path: &str) -> Result<(), XrError> {
        let path = self.instance.path(path)?;
        self.list.push(SuggestedBinding {
            action: action.handle(),
            binding: path.handle(),
        });
        Ok(())
    }

    /// Adds the same component binding for both hands.
    pub fn both(&mut self, action: &Action, component: &str) -> Result<(), XrError> {
        for hand in Hand::BOTH {
            self.add(action, &format!("{}{component}", hand.user_path()))?;
        }
        Ok(())
    }

    pub fn add_path(&mut self, action: &Action, path: &Path) {
        self.list.push(SuggestedBinding {
            action: action.handle(),
            binding: path.handle(),
        });
    }

    pub fn finish(self) -> Vec<SuggestedBinding> {
        self.list
    }
}

/// Standard button labels; `id` strings are what applications key on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonLabel {
    Trigger,
    A,
    B,
    X,
    Y,
    System,
    Home,
    Menu,
    Back,
    Shoulder,
    VolumeUp,
    VolumeDown,
}

impl ButtonLabel {
    fn id(self) -> &'static str {
        match self {
            ButtonLabel::Trigger => "trigger",
            ButtonLabel::A => "a",
            ButtonLabel::B => "b",
            ButtonLabel::X => "x",
            ButtonLabel::Y => "y",
            ButtonLabel::System => "system",
            ButtonLabel::Home => "home",
            ButtonLabel::Menu => "menu",
            ButtonLabel::Back => "back",
            ButtonLabel::Shoulder => "shoulder",
            ButtonLabel::VolumeUp => "volup",
            ButtonLabel::VolumeDown => "voldown",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ButtonLabel::Trigger => "Trigger",
            ButtonLabel::A => "A",
            ButtonLabel::B => "B",
            ButtonLabel::X => "X",
            ButtonLabel::Y => "Y",
            ButtonLabel::System => "System",
            ButtonLabel::Home => "Home",
            ButtonLabel::Menu => "Menu",
            ButtonLabel::Back => "Back",
            ButtonLabel::Shoulder => "Shoulder",
            ButtonLabel::VolumeUp => "Volume Up",
            ButtonLabel::VolumeDown => "Volume Down",
        }
    }
}

/// Which shared action pair a standalone button samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonSlot {
    Trigger,
    Primary,
    Secondary,
    Auxiliary1,
    Auxiliary2,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TriggerParts {
    pub touch: bool,
    pub force: bool,
    pub near: bool,
    pub curl: bool,
    pub slide: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GripParts {
    pub press: bool,
    pub touch: bool,
    pub grab: bool,
    pub squeeze: bool,
    pub pinch: bool,
}

/// Assembles one device in construction order: components and controls are
/// immutable once built, so everything is declared up front here.
pub struct DeviceBuilder<'a> {
    session: &'a Arc<Session>,
    actions: &'a InputActions,
    hand_tracking_supported: bool,
    hand: Hand,
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
    hand_tracker: Option<HandTracker>,
    face_tracker: Option<FaceTracker>,
}

impl<'a> DeviceBuilder<'a> {
    pub(crate) fn new(
        instance: &'a Arc<Instance>,
        session: &'a Arc<Session>,
        actions: &'a InputActions,
        system: Option<&'a SystemInfo>,
        hand: Hand,
        device_type: DeviceType,
        id: String,
        name: String,
    ) -> Self {
        let hand_tracking_supported = instance.supports(Extension::HandTracking)
            && system.map(|s| s.supports_hand_tracking).unwrap_or(false);
        Self {
            session,
            actions,
            hand_tracking_supported,
            hand,
            device_type,
            id,
            name,
            subaction: Path::empty(),
            pose_action: None,
            space: None,
            rotation_offset: Quat::IDENTITY,
            bone_config: BoneConfiguration::None,
            buttons: Vec::new(),
            axes: Vec::new(),
            feedbacks: Vec::new(),
            components: Vec::new(),
            hand_tracker: None,
            face_tracker: None,
        }
    }

    /// Starts a per-hand controller device: identifier `<prefix>cl`/`cr`,
    /// grip pose from the shared pose action restricted to this hand.
    pub(crate) fn controller(
        instance: &'a Arc<Instance>,
        session: &'a Arc<Session>,
        actions: &'a InputActions,
        system: Option<&'a SystemInfo>,
        hand: Hand,
        id_prefix: &str,
        name: &str,
    ) -> Result<Self, XrError> {
        let (suffix, side) = match hand {
            Hand::Left => ("cl", "Left"),
            Hand::Right => ("cr", "Right"),
        };
        let mut builder = Self::new(
            instance,
            session,
            actions,
            system,
            hand,
            DeviceType::hand(hand),
            format!("{id_prefix}{suffix}"),
            format!("{name} {side}"),
        );
        builder.subaction = instance.hand_path(hand).clone();
        builder.pose_action = Some(actions.pose.clone());
        builder.space = Some(Space::action(
            session.runtime().clone(),
            session.handle(),
            &actions.pose,
            &builder.subaction,
            xr::Posef::IDENTITY,
        )?);
        Ok(builder)
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn rotation_offset(&mut self, offset: Quat) -> &mut Self {
        self.rotation_offset = offset;
        self
    }

    pub(crate) fn space(&mut self, space: Space) -> &mut Self {
        self.space = Some(space);
        self
    }

    pub(crate) fn pose_action(&mut self, action: Arc<Action>) -> &mut Self {
        self.pose_action = Some(action);
        self
    }

    pub(crate) fn face_tracker(&mut self, tracker: FaceTracker) -> &mut Self {
        self.face_tracker = Some(tracker);
        self
    }

    fn slot_actions(&self, slot: ButtonSlot) -> (Arc<Action>, Arc<Action>) {
        let a = self.actions;
        match slot {
            ButtonSlot::Trigger => (a.trigger_press.clone(), a.trigger_touch.clone()),
            ButtonSlot::Primary => (a.button_primary_press.clone(), a.button_primary_touch.clone()),
            ButtonSlot::Secondary => (
                a.button_secondary_press.clone(),
                a.button_secondary_touch.clone(),
            ),
            ButtonSlot::Auxiliary1 => (
                a.button_auxiliary1_press.clone(),
                a.button_auxiliary1_touch.clone(),
            ),
            ButtonSlot::Auxiliary2 => (
                a.button_auxiliary2_press.clone(),
                a.button_auxiliary2_touch.clone(),
            ),
        }
    }

    /// Standalone labeled button fed by one of the shared action slots.
    pub fn button(&mut self, slot: ButtonSlot, label: ButtonLabel, touch: bool) -> &mut Self {
        let (press, touch_action) = self.slot_actions(slot);
        let kind = if slot == ButtonSlot::Trigger {
            ButtonKind::Trigger
        } else {
            ButtonKind::Action
        };
        self.buttons.push(DeviceButton::new(
            label.id().to_owned(),
            label.label().to_owned(),
            kind,
            ButtonSource::Actions {
                press: Some(press),
                touch: touch.then_some(touch_action),
                near: None,
            },
        ));
        self
    }

    /// Button backed by a profile-private press action instead of a shared
    /// slot (HMD hardware buttons).
    pub(crate) fn raw_button(
        &mut self,
        id: &str,
        name: &str,
        kind: ButtonKind,
        press: Arc<Action>,
    ) -> &mut Self {
        self.buttons.push(DeviceButton::new(
            id.to_owned(),
            name.to_owned(),
            kind,
            ButtonSource::Actions {
                press: Some(press),
                touch: None,
                near: None,
            },
        ));
        self
    }

    /// Analog trigger: component, press button, pull axis and whatever
    /// extra channels the hardware has.
    pub fn trigger(&mut self, parts: TriggerParts) -> &mut Self {
        let a = self.actions;
        self.components.push(DeviceComponent {
            id: "trigger".to_owned(),
            name: "Trigger".to_owned(),
            kind: ComponentKind::Trigger,
        });
        self.buttons.push(DeviceButton::new(
            "trigger".to_owned(),
            "Trigger".to_owned(),
            ButtonKind::Trigger,
            ButtonSource::Actions {
                press: Some(a.trigger_press.clone()),
                touch: parts.touch.then(|| a.trigger_touch.clone()),
                near: parts.near.then(|| a.trigger_near.clone()),
            },
        ));
        self.axes.push(DeviceAxis::new(
            "trig".to_owned(),
            "Trigger".to_owned(),
            AxisKind::Trigger,
            AxisSource::Float(a.trigger_analog.clone()),
            AxisParams::default(),
        ));
        if parts.force {
            self.axes.push(DeviceAxis::new(
                "trigf".to_owned(),
                "Trigger Force".to_owned(),
                AxisKind::TriggerForce,
                AxisSource::Float(a.trigger_force.clone()),
                AxisParams::default(),
            ));
        }
        if parts.curl {
            self.axes.push(DeviceAxis::new(
                "trigc".to_owned(),
                "Trigger Curl".to_owned(),
                AxisKind::TriggerCurl,
                AxisSource::Float(a.trigger_curl.clone()),
                AxisParams::default(),
            ));
        }
        if parts.slide {
            self.axes.push(DeviceAxis::new(
                "trigs".to_owned(),
                "Trigger Slide".to_owned(),
                AxisKind::TriggerSlide,
                AxisSource::Float(a.trigger_slide.clone()),
                AxisParams::default(),
            ));
        }
        self
    }

    fn stick_params() -> AxisParams {
        AxisParams {
            range: (-1.0, 1.0),
            center: 0.0,
            dead_zone: 0.01,
            resolution: 0.01,
        }
    }

    pub fn joystick(&mut self, touch: bool) -> &mut Self {
        let a = self.actions;
        self.components.push(DeviceComponent {
            id: "joystick".to_owned(),
            name: "Joystick".to_owned(),
            kind: ComponentKind::Joystick,
        });
        self.buttons.push(DeviceButton::new(
            "js".to_owned(),
            "Joystick".to_owned(),
            ButtonKind::Stick,
            ButtonSource::Actions {
                press: Some(a.joystick_press.clone()),
                touch: touch.then(|| a.joystick_touch.clone()),
                near: None,
            },
        ));
        for (id, name, component) in [
            ("jsx", "Joystick X", Vec2Component::X),
            ("jsy", "Joystick Y", Vec2Component::Y),
        ] {
            self.axes.push(DeviceAxis::new(
                id.to_owned(),
                name.to_owned(),
                if matches!(component, Vec2Component::X) {
                    AxisKind::JoystickX
                } else {
                    AxisKind::JoystickY
                },
                AxisSource::Vector2(a.joystick_analog.clone(), component),
                Self::stick_params(),
            ));
        }
        self
    }

    pub fn trackpad(&mut self, touch: bool) -> &mut Self {
        let a = self.actions;
        self.components.push(DeviceComponent {
            id: "trackpad".to_owned(),
            name: "TrackPad".to_owned(),
            kind: ComponentKind::Trackpad,
        });
        self.buttons.push(DeviceButton::new(
            "tp".to_owned(),
            "TrackPad".to_owned(),
            ButtonKind::Touchpad,
            ButtonSource::Actions {
                press: Some(a.trackpad_press.clone()),
                touch: touch.then(|| a.trackpad_touch.clone()),
                near: None,
            },
        ));
        for (id, name, component) in [
            ("tpx", "TrackPad X", Vec2Component::X),
            ("tpy", "TrackPad Y", Vec2Component::Y),
        ] {
            self.axes.push(DeviceAxis::new(
                id.to_owned(),
                name.to_owned(),
                if matches!(component, Vec2Component::X) {
                    AxisKind::TrackpadX
                } else {
                    AxisKind::TrackpadY
                },
                AxisSource::Vector2(a.trackpad_analog.clone(), component),
                Self::stick_params(),
            ));
        }
        self
    }

    pub fn grip(&mut self, parts: GripParts) -> &mut Self {
        let a = self.actions;
        self.components.push(DeviceComponent {
            id: "grip".to_owned(),
            name: "Grip".to_owned(),
            kind: ComponentKind::Grip,
        });
        if parts.press {
            self.buttons.push(DeviceButton::new(
                "grip".to_owned(),
                "Grip".to_owned(),
                ButtonKind::Action,
                ButtonSource::Actions {
                    press: Some(a.grip_press.clone()),
                    touch: parts.touch.then(|| a.grip_touch.clone()),
                    near: None,
                },
            ));
        }
        for (enabled, id, name, kind, action) in [
            (parts.grab, "gg", "Grip Grab", AxisKind::GripGrab, &a.grip_grab),
            (
                parts.squeeze,
                "gs",
                "Grip Squeeze",
                AxisKind::GripSqueeze,
                &a.grip_squeeze,
            ),
            (
                parts.pinch,
                "gp",
                "Grip Pinch",
                AxisKind::GripPinch,
                &a.grip_pinch,
            ),
        ] {
            if enabled {
                self.axes.push(DeviceAxis::new(
                    id.to_owned(),
                    name.to_owned(),
                    kind,
                    AxisSource::Float(action.clone()),
                    AxisParams::default(),
                ));
            }
        }
        self
    }

    pub fn thumbrest(&mut self, press: bool, near: bool) -> &mut Self {
        let a = self.actions;
        self.components.push(DeviceComponent {
            id: "thumbrest".to_owned(),
            name: "Thumbrest".to_owned(),
            kind: ComponentKind::Thumbrest,
        });
        self.buttons.push(DeviceButton::new(
            "tr".to_owned(),
            "Thumbrest".to_owned(),
            ButtonKind::Thumbrest,
            ButtonSource::Actions {
                press: press.then(|| a.thumbrest_press.clone()),
                touch: Some(a.thumbrest_touch.clone()),
                near: near.then(|| a.thumbrest_near.clone()),
            },
        ));
        self
    }

    /// Haptic output channel, bound through the shared trigger haptic
    /// action.
    pub fn haptic(&mut self) -> &mut Self {
        self.feedbacks.push(DeviceFeedback::new(
            "haptic".to_owned(),
            "Haptic".to_owned(),
            self.actions.trigger_haptic.clone(),
        ));
        self
    }

    /// Secondary haptic channel on the thumb rest, where the hardware has
    /// one.
    pub fn thumb_haptic(&mut self) -> &mut Self {
        self.feedbacks.push(DeviceFeedback::new(
            "thaptic".to_owned(),
            "Thumb Haptic".to_owned(),
            self.actions.thumbrest_haptic.clone(),
        ));
        self
    }

    /// Gesture value axes of the hand-interaction profiles.
    pub fn gestures(&mut self) -> &mut Self {
        let a = self.actions;
        for (id, name, kind, action) in [
            ("gpinch", "Pinch Gesture", AxisKind::GesturePinch, &a.gesture_pinch),
            ("gaim", "Aim Gesture", AxisKind::GestureAim, &a.gesture_aim),
            ("ggrasp", "Grasp Gesture", AxisKind::GestureGrasp, &a.gesture_grasp),
        ] {
            self.axes.push(DeviceAxis::new(
                id.to_owned(),
                name.to_owned(),
                kind,
                AxisSource::Float(action.clone()),
                AxisParams::default(),
            ));
        }
        self
    }

    /// Attaches skeletal hand tracking if the extension and system support
    /// it: the bone configuration, five bend and four spread axes, plus
    /// optional thumb-to-finger trigger simulation.
    pub fn hand_tracking(&mut self, two_finger_triggers: bool) -> Result<&mut Self, XrError> {
        if !self.hand_tracking_supported || self.hand_tracker.is_some() {
            return Ok(self);
        }
        let tracker = HandTracker::new(
            self.session.runtime().clone(),
            self.session.handle(),
            self.hand,
        )?;
        self.hand_tracker = Some(tracker);
        self.bone_config = BoneConfiguration::Hand;

        let hand_axis_params = AxisParams {
            range: (0.0, 1.0),
            center: -1.0,
            dead_zone: 0.0,
            resolution: 0.01,
        };
        for (i, (finger, name)) in [
            (Finger::Thumb, "Bend Thumb"),
            (Finger::Index, "Bend Index Finger"),
            (Finger::Middle, "Bend Middle Finger"),
            (Finger::Ring, "Bend Ring Finger"),
            (Finger::Little, "Bend Pinky Finger"),
        ]
        .into_iter()
        .enumerate()
        {
            self.axes.push(DeviceAxis::new(
                format!("fb{}", i + 1),
                name.to_owned(),
                AxisKind::FingerBend,
                AxisSource::HandBend(finger),
                hand_axis_params,
            ));
        }
        for (i, name) in [
            "Spread Thumb Index Finger",
            "Spread Index Middle Finger",
            "Spread Middle Ring Finger",
            "Spread Ring Pinky Finger",
        ]
        .iter()
        .enumerate()
        {
            self.axes.push(DeviceAxis::new(
                format!("fs{}", i + 1),
                (*name).to_owned(),
                AxisKind::FingerSpread,
                AxisSource::HandSpread(i),
                hand_axis_params,
            ));
        }
        if two_finger_triggers {
            for (i, name) in [
                "Index Finger Trigger",
                "Middle Finger Trigger",
                "Ring Finger Trigger",
                "Pinky Finger Trigger",
            ]
            .iter()
            .enumerate()
            {
                self.axes.push(DeviceAxis::new(
                    format!("tfi{}", i + 1),
                    (*name).to_owned(),
                    AxisKind::TwoFingerTrigger,
                    AxisSource::HandPinch(i),
                    hand_axis_params,
                ));
                self.buttons.push(DeviceButton::new(
                    format!("tf{}", i + 1),
                    (*name).to_owned(),
                    ButtonKind::TwoFingerTrigger,
                    ButtonSource::HandPinch {
                        pair: i,
                        threshold: 0.8,
                    },
                ));
            }
        }
        Ok(self)
    }

    pub(crate) fn build(self) -> Arc<Device> {
        Device::new(DeviceInit {
            device_type: self.device_type,
            id: self.id,
            name: self.name,
            subaction: self.subaction,
            pose_action: self.pose_action,
            space: self.space,
            rotation_offset: self.rotation_offset,
            bone_config: self.bone_config,
            buttons: self.buttons,
            axes: self.axes,
            feedbacks: self.feedbacks,
            components: self.components,
            hand_tracker: self.hand_tracker,
            face_tracker: self.face_tracker,
        })
    }
}

/// Data description of one two-hand controller family. [`HandedProfile`]
/// supplies the shared path-matched attach policy around it.
pub trait ControllerModel: Send + 'static {
    fn profile_path(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn id_prefix(&self) -> &'static str;
    fn required_extension(&self) -> Option<Extension> {
        None
    }
    fn rotation_offset(&self) -> Quat {
        Quat::IDENTITY
    }
    /// Whether to attach skeletal hand tracking to the built devices.
    fn hand_tracking(&self) -> bool {
        false
    }
    fn suggest(&self, bindings: &mut Bindings, actions: &InputActions) -> Result<(), XrError>;
    fn layout(&self, device: &mut DeviceBuilder) -> Result<(), XrError>;
}

/// The common two-hand policy: each hand's device exists iff the runtime
/// reports that hand currently bound to exactly this profile's path. This
/// handles users swapping controller types mid-session.
pub struct HandedProfile<M: ControllerModel> {
    model: M,
    path: Path,
    devices: [Option<Arc<Device>>; 2],
}

impl<M: ControllerModel> HandedProfile<M> {
    pub fn new(instance: &Arc<Instance>, model: M) -> Result<Self, XrError> {
        let path = instance.path(model.profile_path())?;
        Ok(Self {
            model,
            path,
            devices: [None, None],
        })
    }

    fn remove_all(&mut self, devices: &mut DeviceManager) {
        for slot in &mut self.devices {
            if let Some(device) = slot.take() {
                let _ = devices.remove(&device);
            }
        }
    }
}

impl<M: ControllerModel> DeviceProfile for HandedProfile<M> {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn suggest_bindings(&self, ctx: &BindContext) -> Result<(), XrError> {
        if let Some(ext) = self.model.required_extension() {
            if !ctx.instance.supports(ext) {
                return Ok(());
            }
        }
        let mut bindings = Bindings::new(ctx.instance);
        self.model.suggest(&mut bindings, ctx.actions)?;
        ctx.instance.suggest_bindings(&self.path, &bindings.finish())
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions)) = (ctx.session, ctx.actions) else {
            self.remove_all(ctx.devices);
            return Ok(());
        };
        if !session.is_attached() || !session.is_running() {
            self.remove_all(ctx.devices);
            return Ok(());
        }
        if let Some(ext) = self.model.required_extension() {
            if !ctx.instance.supports(ext) {
                return Ok(());
            }
        }
        for (slot, hand) in self.devices.iter_mut().zip(Hand::BOTH) {
            let current = ctx
                .instance
                .runtime()
                .current_interaction_profile(session.handle(), ctx.instance.hand_path(hand).handle())
                .or_xr("xrGetCurrentInteractionProfile")?;
            let matched = current == self.path.handle();
            match (matched, slot.is_some()) {
                (true, false) => {
                    let mut builder = DeviceBuilder::controller(
                        ctx.instance,
                        session,
                        actions,
                        ctx.system,
                        hand,
                        self.model.id_prefix(),
                        self.model.name(),
                    )?;
                    builder.rotation_offset(self.model.rotation_offset());
                    self.model.layout(&mut builder)?;
                    if self.model.hand_tracking() {
                        builder.hand_tracking(false)?;
                    }
                    let device = builder.build();
                    ctx.devices.add(device.clone());
                    *slot = Some(device);
                }
                (false, true) => {
                    if let Some(device) = slot.take() {
                        let _ = ctx.devices.remove(&device);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        self.remove_all(devices);
    }
}

/// Builds the full profile roster in negotiation order. The fallback hand
/// profile goes last so it sees every controller device the other profiles
/// own.
pub fn create_profiles(
    instance: &Arc<Instance>,
    config: &Config,
) -> Result<Vec<Box<dyn DeviceProfile>>, XrError> {
    let mut profiles: Vec<Box<dyn DeviceProfile>> = vec![
        Box::new(hmd::ViveProHmd::new(instance)?),
        Box::new(hmd::GenericHmd::new()),
    ];

    macro_rules! handed {
        ($($model:expr),+ $(,)?) => {
            $(profiles.push(Box::new(HandedProfile::new(instance, $model)?));)+
        };
    }
    handed!(
        simple_controller::SimpleController,
        daydream_controller::DaydreamController,
        hp_mixed_reality::HpMixedReality,
        vive_controller::ViveController,
        vive_cosmos::ViveCosmos,
        vive_focus3::ViveFocus3,
        huawei_controller::HuaweiController,
        ms_motion_controller::WmrController::motion_controller(),
        ms_motion_controller::WmrController::samsung_odyssey(),
        meta_touch_plus::MetaTouchPlus,
        meta_touch_pro::MetaTouchPro,
        oculus_go::OculusGo,
        oculus_touch::OculusTouch,
        valve_index::ValveIndex,
        hand_interaction::HandInteraction::ext(),
        hand_interaction::HandInteraction::htc(),
        hand_interaction::HandInteraction::msft(),
    );

    if config.eye_gaze.enabled() && instance.supports(Extension::EyeGazeInteraction) {
        profiles.push(Box::new(eye_gaze::EyeGazeProfile::new(instance)?));
    }
    if instance.supports(Extension::ViveTrackerInteraction) {
        profiles.push(Box::new(vive_tracker::ViveTrackerProfile::new(
            instance, config,
        )?));
    }
    if instance.supports(Extension::XdevSpace) {
        profiles.push(Box::new(xdev_tracker::XdevTrackerProfile::new()));
    }
    profiles.push(Box::new(no_controller_hands::NoControllerHands::new()));
    Ok(profiles)
}
