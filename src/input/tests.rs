use super::{device::DeviceType, InputEvent};
use crate::{
    action::ActionSet,
    error::XrError,
    face_tracker::{EYE_EXPRESSION_COUNT, FACE_EXPRESSION_COUNT, LIP_EXPRESSION_COUNT},
    instance::Instance,
    runtime::{
        fake::FakeRuntime, Extension, FacialTrackerKind, RuntimeEvent, SpaceRelation, SystemInfo,
        XdevInfo, XrRuntime,
    },
    session::Session,
    Config, FeatureLevel, XrModule,
};
use glam::Vec3;
use openxr as xr;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    runtime: Arc<FakeRuntime>,
    module: XrModule,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        crate::init_logging();
        Self {
            runtime: Arc::new(FakeRuntime::with_hmd()),
            module: XrModule::new(config),
        }
    }

    #[track_caller]
    fn start(&mut self) {
        self.module
            .start_runtime(self.runtime.clone())
            .expect("runtime startup");
    }

    #[track_caller]
    fn tick(&mut self) {
        self.module.process_events().expect("process_events");
    }

    /// Walks the session up to FOCUSED the way a runtime would, one state
    /// at a time, and processes the resulting events.
    fn run_until_focused(&mut self) {
        self.runtime.set_session_state(xr::SessionState::READY);
        self.tick();
        self.runtime
            .set_session_state(xr::SessionState::SYNCHRONIZED);
        self.runtime.set_session_state(xr::SessionState::VISIBLE);
        self.runtime.set_session_state(xr::SessionState::FOCUSED);
        self.tick();
    }

    fn drain_events(&mut self) -> Vec<InputEvent> {
        std::iter::from_fn(|| self.module.next_event()).collect()
    }

    #[track_caller]
    fn device_index(&self, id: &str) -> usize {
        self.module
            .find_device(id)
            .unwrap_or_else(|| panic!("no device {id}"))
            .index()
    }
}

fn relation_at(x: f32, y: f32, z: f32) -> SpaceRelation {
    SpaceRelation {
        pose: xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f { x, y, z },
        },
        linear_velocity: None,
        angular_velocity: None,
    }
}

#[test]
fn no_devices_until_session_runs() {
    let mut f = Fixture::new();
    f.start();
    assert_eq!(f.module.device_count(), 0);

    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.module.device_count(), 1);
    assert!(f.module.find_device("hmd").is_some());
    assert!(matches!(
        f.module.device(1),
        Err(XrError::DeviceIndexOutOfRange { index: 1, count: 1 })
    ));
}

#[test]
fn session_begin_and_end_follow_runtime_states() {
    let mut f = Fixture::new();
    f.start();
    assert_eq!(f.runtime.begin_session_count(), 0);

    f.run_until_focused();
    assert_eq!(f.runtime.begin_session_count(), 1);
    assert_eq!(f.runtime.end_session_count(), 0);

    f.runtime.set_session_state(xr::SessionState::STOPPING);
    f.tick();
    assert_eq!(f.runtime.end_session_count(), 1);
    // Every profile drops its devices once the session stops running.
    assert_eq!(f.module.device_count(), 0);
}

#[test]
fn sync_runs_only_while_focused() {
    let mut f = Fixture::new();
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    f.tick();
    // The fake panics on an early sync, so reaching this assert at all
    // proves no sync leaked through before focus.
    assert_eq!(f.runtime.sync_count(), 0);

    f.runtime
        .set_session_state(xr::SessionState::SYNCHRONIZED);
    f.runtime.set_session_state(xr::SessionState::VISIBLE);
    f.runtime.set_session_state(xr::SessionState::FOCUSED);
    f.tick();
    assert_eq!(f.runtime.sync_count(), 1);
}

#[test]
fn sync_outside_focus_is_a_hard_error() {
    crate::init_logging();
    let runtime = Arc::new(FakeRuntime::with_hmd());
    let instance = Instance::new(runtime.clone()).unwrap();
    let system = runtime.system_info().unwrap().unwrap();
    let session = Session::new(instance.runtime().clone(), &system).unwrap();
    let set = ActionSet::new(instance, "sync_guard", "Sync Guard").unwrap();

    session.attach_action_set(&set).unwrap();
    assert!(matches!(
        session.sync_actions(&set),
        Err(XrError::NotFocused)
    ));

    let other_session = {
        // An attached session cannot take a second set, so the unattached
        // guard needs its own session.
        let runtime = Arc::new(FakeRuntime::with_hmd());
        Session::new(runtime as Arc<dyn XrRuntime>, &system).unwrap()
    };
    other_session.set_focused(true);
    assert!(matches!(
        other_session.sync_actions(&set),
        Err(XrError::ActionSetNotAttached)
    ));
}

#[test]
fn duplicate_action_name_is_rejected() {
    crate::init_logging();
    let runtime = Arc::new(FakeRuntime::with_hmd());
    let instance = Instance::new(runtime).unwrap();
    let mut set = ActionSet::new(instance, "dups", "Dups").unwrap();

    set.add_action(crate::runtime::ActionKind::BoolInput, "jump", "Jump", &[])
        .unwrap();
    assert!(matches!(
        set.add_action(crate::runtime::ActionKind::FloatInput, "jump", "Jump Again", &[]),
        Err(XrError::DuplicateActionName(name)) if name == "jump"
    ));
    assert_eq!(set.len(), 1);
}

#[test]
fn paths_intern_to_stable_handles() {
    crate::init_logging();
    let runtime = Arc::new(FakeRuntime::with_hmd());
    let instance = Instance::new(runtime).unwrap();

    let a = instance.path("/user/hand/left").unwrap();
    let b = instance.path("/user/hand/left").unwrap();
    assert_eq!(a, b);
    assert_eq!(instance.path_from_handle(a.handle()).unwrap().name(), "/user/hand/left");
    assert!(instance.path("not-a-path").is_err());
}

#[test]
fn simple_controller_attaches_and_detaches() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.start();
    f.run_until_focused();

    assert_eq!(f.module.device_count(), 2);
    let device = f.module.find_device("sc_cl").expect("left controller");
    assert_eq!(device.device_type(), DeviceType::LeftHand);
    assert_eq!(device.button_count(), 2);
    assert_eq!(device.axis_count(), 0);
    assert_eq!(device.feedback_count(), 1);

    // However many devices arrive in one tick, the topology notification
    // is a single event.
    let events = f.drain_events();
    let changes = events
        .iter()
        .filter(|e| matches!(e, InputEvent::DevicesChanged))
        .count();
    assert_eq!(changes, 1);

    f.runtime.set_interaction_profile("/user/hand/left", None);
    f.tick();
    assert!(f.module.find_device("sc_cl").is_none());
    assert_eq!(f.module.device_count(), 1);
    assert_eq!(f.drain_events(), vec![InputEvent::DevicesChanged]);
}

#[test]
fn device_indices_stay_dense_after_removal() {
    let mut f = Fixture::new();
    for hand in ["/user/hand/left", "/user/hand/right"] {
        f.runtime
            .set_interaction_profile(hand, Some("/interaction_profiles/khr/simple_controller"));
    }
    f.start();
    f.run_until_focused();
    assert_eq!(f.module.device_count(), 3);

    f.runtime.set_interaction_profile("/user/hand/left", None);
    f.tick();
    assert_eq!(f.module.device_count(), 2);
    for index in 0..f.module.device_count() {
        assert_eq!(f.module.device(index).unwrap().index(), index);
    }
    assert_eq!(f.module.device(1).unwrap().id(), "sc_cr");
}

#[test]
fn repeated_rechecks_keep_devices_stable() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.start();
    f.run_until_focused();
    let before = f.module.find_device("sc_cl").unwrap().clone();
    f.drain_events();

    // Force full attachment re-checks; nothing changed, so the device
    // objects must survive untouched.
    for _ in 0..3 {
        f.runtime.push_event(RuntimeEvent::InteractionProfileChanged);
        f.tick();
    }
    let after = f.module.find_device("sc_cl").unwrap();
    assert!(Arc::ptr_eq(&before, after));
    assert!(f.drain_events().is_empty());
}

#[test]
fn binding_tables_are_suggested_per_profile() {
    let mut f = Fixture::new();
    f.start();

    let bindings =
        f.runtime.suggested_bindings("/interaction_profiles/khr/simple_controller");
    assert_eq!(bindings.len(), 10);
    for expected in [
        ("trigger_press", "/user/hand/left/input/select/click"),
        ("trigger_press", "/user/hand/right/input/select/click"),
        ("button_primary_press", "/user/hand/left/input/menu/click"),
        ("pose", "/user/hand/right/input/grip/pose"),
        ("pose_aim", "/user/hand/left/input/aim/pose"),
        ("trigger_haptic", "/user/hand/right/output/haptic"),
    ] {
        assert!(
            bindings.iter().any(|(n, p)| (n.as_str(), p.as_str()) == expected),
            "missing binding {expected:?} in {bindings:?}"
        );
    }
}

#[test]
fn buttons_emit_edges_and_hold_when_inactive() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.start();
    f.run_until_focused();
    f.drain_events();
    let device = f.device_index("sc_cl");

    f.runtime
        .set_bool_state("trigger_press", "/user/hand/left", true, true);
    f.tick();
    assert_eq!(
        f.drain_events(),
        vec![InputEvent::ButtonPress { device, button: 0 }]
    );
    assert!(f.module.device(device).unwrap().button(0).unwrap().is_pressed());

    // Unchanged state is not an edge.
    f.tick();
    assert!(f.drain_events().is_empty());

    // An inactive binding means "no data", never "released".
    f.runtime
        .set_bool_state("trigger_press", "/user/hand/left", true, false);
    f.tick();
    assert!(f.drain_events().is_empty());
    assert!(f.module.device(device).unwrap().button(0).unwrap().is_pressed());

    f.runtime
        .set_bool_state("trigger_press", "/user/hand/left", false, true);
    f.tick();
    assert_eq!(
        f.drain_events(),
        vec![InputEvent::ButtonRelease { device, button: 0 }]
    );
}

#[test]
fn axes_remap_and_suppress_noise() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/htc/vive_controller"),
    );
    f.start();
    f.run_until_focused();
    f.drain_events();
    let device = f.device_index("vive_cl");
    let trigger = 0; // axes: trig, tpx, tpy

    // Untouched: an analog trigger rests at the low end of its range.
    assert_eq!(f.module.device(device).unwrap().axis(trigger).unwrap().value(), -1.0);

    // Half pull on a [0, 1] input lands exactly at the remapped midpoint.
    f.runtime
        .set_float_state("trigger_analog", "/user/hand/left", 0.5, true);
    f.tick();
    assert_eq!(
        f.drain_events(),
        vec![InputEvent::AxisMove {
            device,
            axis: trigger,
            value: 0.0
        }]
    );

    // A wiggle below the resolution changes nothing.
    f.runtime
        .set_float_state("trigger_analog", "/user/hand/left", 0.504, true);
    f.tick();
    assert!(f.drain_events().is_empty());
    assert_eq!(f.module.device(device).unwrap().axis(trigger).unwrap().value(), 0.0);

    // Out-of-range raw values clamp.
    f.runtime
        .set_float_state("trigger_analog", "/user/hand/left", 1.5, true);
    f.tick();
    assert_eq!(
        f.drain_events(),
        vec![InputEvent::AxisMove {
            device,
            axis: trigger,
            value: 1.0
        }]
    );
}

#[test]
fn stick_dead_zone_snaps_to_center() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/htc/vive_controller"),
    );
    f.start();
    f.run_until_focused();
    f.drain_events();
    let device = f.device_index("vive_cl");
    let tpx = 1;

    f.runtime
        .set_vector2_state("trackpad_analog", "/user/hand/left", (0.3, 0.0), true);
    f.tick();
    let events = f.drain_events();
    assert_eq!(events.len(), 1);
    let InputEvent::AxisMove { axis, value, .. } = events[0] else {
        panic!("expected an axis event, got {events:?}");
    };
    assert_eq!(axis, tpx);
    assert!((value - 0.3).abs() < 1e-6);

    // Inside the dead zone the value becomes the exact center, so releasing
    // a stick never leaves a residual drift.
    f.runtime
        .set_vector2_state("trackpad_analog", "/user/hand/left", (0.005, 0.0), true);
    f.tick();
    assert_eq!(
        f.drain_events(),
        vec![InputEvent::AxisMove {
            device,
            axis: tpx,
            value: 0.0
        }]
    );
    assert_eq!(f.module.device(device).unwrap().axis(tpx).unwrap().value(), 0.0);
}

#[test]
fn poses_hold_their_last_sample() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.start();
    f.run_until_focused();
    let device = f.device_index("sc_cl");

    f.runtime
        .set_action_space_location("pose", "/user/hand/left", Some(relation_at(1.0, 2.0, 3.0)));
    f.tick();
    assert_eq!(
        f.module.device(device).unwrap().pose().position,
        Vec3::new(1.0, 2.0, 3.0)
    );

    // Tracking loss keeps the last known pose instead of snapping to origin.
    f.runtime
        .set_action_space_location("pose", "/user/hand/left", None);
    f.tick();
    assert_eq!(
        f.module.device(device).unwrap().pose().position,
        Vec3::new(1.0, 2.0, 3.0)
    );
}

#[test]
fn feedback_values_reach_the_runtime_path() {
    let mut f = Fixture::new();
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.start();
    f.run_until_focused();
    let device = f.device_index("sc_cl");

    f.module.set_feedback_value(device, 0, 0.75).unwrap();
    assert_eq!(
        f.module.device(device).unwrap().feedback(0).unwrap().value(),
        0.75
    );
    assert!(matches!(
        f.module.set_feedback_value(device, 7, 1.0),
        Err(XrError::ControlIndexOutOfRange { .. })
    ));
}

#[test]
fn tracked_hands_yield_to_controllers() {
    let mut f = Fixture::new();
    f.runtime.add_extension(Extension::HandTracking);
    f.start();
    f.run_until_focused();

    // No controller bound: bare hand tracking synthesizes both hands.
    assert!(f.module.find_device("handl").is_some());
    assert!(f.module.find_device("handr").is_some());
    assert_eq!(f.module.device_count(), 3);

    // A controller claims the left hand; the synthetic hand steps aside.
    f.runtime.set_interaction_profile(
        "/user/hand/left",
        Some("/interaction_profiles/khr/simple_controller"),
    );
    f.tick();
    assert!(f.module.find_device("handl").is_none());
    assert!(f.module.find_device("sc_cl").is_some());
    assert!(f.module.find_device("handr").is_some());

    f.runtime.set_interaction_profile("/user/hand/left", None);
    f.tick();
    assert!(f.module.find_device("handl").is_some());
}

#[test]
fn new_tracker_restarts_the_session_once_bound() {
    let mut f = Fixture::new();
    f.runtime.add_extension(Extension::ViveTrackerInteraction);
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 1);

    // First sight of a unit with a role: recorded, no device yet, and a
    // rebuild is requested for the next tick.
    f.runtime.connect_vive_tracker(
        "/trackers/aaa",
        "/user/vive_tracker_htcx/role/waist",
    );
    f.tick();
    assert!(f.module.find_device("tracker1").is_none());

    // The rebuild runs at the top of the next tick; the runtime then walks
    // the fresh session back up to running.
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 2);
    let tracker = f.module.find_device("tracker1").expect("tracker device");
    assert_eq!(tracker.device_type(), DeviceType::Tracker);

    // The rebuilt set carries the per-unit binding.
    let bindings =
        f.runtime.suggested_bindings("/interaction_profiles/htc/vive_tracker_htcx");
    assert!(bindings.iter().any(|(n, p)| {
        n == "tracker_pose_1" && p == "/user/vive_tracker_htcx/role/waist/input/grip/pose"
    }));

    // Unplugging removes the device on the next re-check, no restart
    // involved. Disconnection has no event of its own, so force one.
    f.runtime.disconnect_vive_tracker("/trackers/aaa");
    f.runtime.push_event(RuntimeEvent::InteractionProfileChanged);
    f.tick();
    assert!(f.module.find_device("tracker1").is_none());
    assert_eq!(f.runtime.begin_session_count(), 2);
}

#[test]
fn tracker_restarts_are_debounced_per_unit() {
    // Default window (500 ms): role churn right after a rebuild is absorbed.
    let mut f = Fixture::new();
    f.runtime.add_extension(Extension::ViveTrackerInteraction);
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    f.runtime
        .connect_vive_tracker("/trackers/ddd", "/user/vive_tracker_htcx/role/waist");
    f.tick();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 2);
    assert!(f.module.find_device("tracker1").is_some());

    f.runtime
        .connect_vive_tracker("/trackers/ddd", "/user/vive_tracker_htcx/role/chest");
    f.tick();
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 2);

    // With the window disabled the same churn rebuilds again, picking up
    // the new role binding.
    let mut f = Fixture::with_config(Config {
        tracker_restart_debounce: Duration::ZERO,
        ..Config::default()
    });
    f.runtime.add_extension(Extension::ViveTrackerInteraction);
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    f.runtime
        .connect_vive_tracker("/trackers/ddd", "/user/vive_tracker_htcx/role/waist");
    f.tick();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 2);

    f.runtime
        .connect_vive_tracker("/trackers/ddd", "/user/vive_tracker_htcx/role/chest");
    f.tick();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();
    assert_eq!(f.runtime.begin_session_count(), 3);
    let bindings =
        f.runtime.suggested_bindings("/interaction_profiles/htc/vive_tracker_htcx");
    assert!(bindings.iter().any(|(n, p)| {
        n == "tracker_pose_1" && p == "/user/vive_tracker_htcx/role/chest/input/grip/pose"
    }));
}

#[test]
fn roleless_tracker_does_not_restart() {
    let mut f = Fixture::new();
    f.runtime.add_extension(Extension::ViveTrackerInteraction);
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();

    f.runtime.connect_vive_tracker("/trackers/bbb", "");
    f.tick();
    f.tick();
    // Nothing can be bound for a role-less unit, so the session is left
    // alone until the runtime assigns a role.
    assert_eq!(f.runtime.begin_session_count(), 1);
    assert!(f.module.find_device("tracker1").is_none());
    assert!(f.module.find_device("hmd").is_some());
}

#[test]
fn xdev_trackers_keep_identity_across_id_churn() {
    let mut f = Fixture::new();
    f.runtime.add_extension(Extension::XdevSpace);
    f.runtime.set_xdevs(vec![XdevInfo {
        id: 1,
        name: "Tracking Puck".to_owned(),
        serial: "PUCK-001".to_owned(),
        can_create_space: true,
    }]);
    f.start();
    f.run_until_focused();

    // Xdev units need no bindings, so the first sight creates the device
    // directly with no session rebuild.
    let before = f
        .module
        .find_device("xdev_PUCK-001")
        .expect("xdev device")
        .clone();
    assert_eq!(before.device_type(), DeviceType::Tracker);
    assert_eq!(f.runtime.begin_session_count(), 1);
    f.drain_events();

    // A fresh enumeration may hand out new ids; the serial is the unit.
    f.runtime.set_xdevs(vec![XdevInfo {
        id: 2,
        name: "Tracking Puck".to_owned(),
        serial: "PUCK-001".to_owned(),
        can_create_space: true,
    }]);
    f.runtime.push_event(RuntimeEvent::InteractionProfileChanged);
    f.tick();
    let after = f.module.find_device("xdev_PUCK-001").expect("xdev device");
    assert!(Arc::ptr_eq(&before, after));
    assert!(f.drain_events().is_empty());

    f.runtime.set_xdevs(Vec::new());
    f.runtime.push_event(RuntimeEvent::InteractionProfileChanged);
    f.tick();
    assert!(f.module.find_device("xdev_PUCK-001").is_none());
    assert_eq!(f.drain_events(), vec![InputEvent::DevicesChanged]);
}

#[test]
fn face_expressions_sample_and_hold_when_inactive() {
    let mut f = Fixture::new();
    f.runtime.set_system(SystemInfo {
        render_width: 1280,
        render_height: 1440,
        supports_hand_tracking: false,
        supports_eye_gaze: false,
        supports_facial_tracking: true,
    });
    f.runtime.add_extension(Extension::FacialTrackingHtc);
    f.runtime.set_expression_weights(
        FacialTrackerKind::Eye,
        Some(vec![0.25; EYE_EXPRESSION_COUNT]),
    );
    f.runtime.set_expression_weights(
        FacialTrackerKind::Lip,
        Some(vec![0.5; LIP_EXPRESSION_COUNT]),
    );
    f.start();
    f.run_until_focused();

    let hmd = f.module.find_device("hmd").expect("hmd device").clone();
    assert_eq!(hmd.face_expression_count(), FACE_EXPRESSION_COUNT);
    assert_eq!(hmd.face_expression(0), Some(0.25));
    assert_eq!(hmd.face_expression(EYE_EXPRESSION_COUNT), Some(0.5));

    // One tracker going inactive holds its weights; the other keeps
    // updating.
    f.runtime.set_expression_weights(FacialTrackerKind::Eye, None);
    f.runtime.set_expression_weights(
        FacialTrackerKind::Lip,
        Some(vec![0.9; LIP_EXPRESSION_COUNT]),
    );
    f.tick();
    assert_eq!(hmd.face_expression(0), Some(0.25));
    assert_eq!(hmd.face_expression(EYE_EXPRESSION_COUNT), Some(0.9));
}

#[test]
fn frame_waits_advance_predicted_time() {
    let mut f = Fixture::new();
    f.start();
    f.runtime.set_session_state(xr::SessionState::READY);
    f.tick();

    f.module.start_frame_wait().unwrap();
    let first = f
        .module
        .finish_frame_wait(Duration::from_millis(100))
        .unwrap()
        .expect("frame state");
    f.module.start_frame_wait().unwrap();
    let second = f
        .module
        .finish_frame_wait(Duration::from_millis(100))
        .unwrap()
        .expect("frame state");
    assert!(second.predicted_display_time.as_nanos() > first.predicted_display_time.as_nanos());

    f.module.begin_frame().unwrap();
    f.module.end_frame().unwrap();
    assert_eq!(f.runtime.frame_call_counts(), (2, 1, 1));
}

#[test]
fn required_features_fail_startup_when_missing() {
    crate::init_logging();
    let runtime = Arc::new(FakeRuntime::with_hmd());
    let mut module = XrModule::new(Config {
        eye_gaze: FeatureLevel::Required,
        ..Config::default()
    });
    assert!(matches!(
        module.start_runtime(runtime),
        Err(XrError::FeatureUnavailable(_))
    ));
    assert!(!module.is_running());
}

#[test]
fn instance_loss_shuts_the_module_down() {
    let mut f = Fixture::new();
    f.start();
    f.run_until_focused();
    assert!(f.module.is_running());
    f.drain_events();

    f.runtime.push_event(RuntimeEvent::InstanceLossPending);
    f.tick();
    assert!(!f.module.is_running());
    assert_eq!(f.module.device_count(), 0);
    // The session is ended before its handle is destroyed.
    assert_eq!(f.runtime.end_session_count(), 1);
    assert!(!f.runtime.session_exists());
    // Consumers still observe the final topology change.
    assert_eq!(f.drain_events(), vec![InputEvent::DevicesChanged]);
}
