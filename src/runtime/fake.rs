//! Scriptable in-process runtime for tests.
//!
//! Besides returning scripted data, this runtime enforces call-order rules
//! the way the strictest real runtimes do: it panics on an action sync
//! outside focus, on a second action-set attach, and on action creation
//! after attach. Tests rely on those panics to prove the production guards
//! keep illegal calls from ever reaching the runtime.

use super::*;
use openxr as xr;
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

#[derive(Default)]
struct Counters {
    begin_session: u32,
    end_session: u32,
    sync: u32,
    wait_frame: u32,
    begin_frame: u32,
    end_frame: u32,
}

struct ActionData {
    set: ActionSetHandle,
    name: String,
    kind: ActionKind,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    paths: Vec<String>,
    extensions: Vec<Extension>,
    system: Option<SystemInfo>,
    events: VecDeque<RuntimeEvent>,

    action_sets: Vec<ActionSetHandle>,
    actions: HashMap<u64, ActionData>,
    attached_set: Option<ActionSetHandle>,
    suggested: HashMap<xr::Path, Vec<SuggestedBinding>>,

    session: Option<SessionHandle>,
    session_running: bool,
    session_state: Option<xr::SessionState>,

    interaction_profiles: HashMap<xr::Path, xr::Path>,
    bool_states: HashMap<(u64, xr::Path), (bool, bool)>,
    float_states: HashMap<(u64, xr::Path), (f32, bool)>,
    vec2_states: HashMap<(u64, xr::Path), (xr::Vector2f, bool)>,

    reference_spaces: HashMap<u64, ReferenceSpaceType>,
    action_spaces: HashMap<(u64, xr::Path), SpaceHandle>,
    space_locations: HashMap<u64, SpaceRelation>,

    frame_time: i64,
    views: Option<[EyeView; 2]>,
    swapchains: Vec<SwapchainHandle>,

    hand_trackers: HashMap<u64, Hand>,
    hand_joints: HashMap<Hand, Box<HandJointLocations>>,
    facial_trackers: HashMap<u64, FacialTrackerKind>,
    expression_weights: HashMap<FacialTrackerKind, Vec<f32>>,

    vive_trackers: Vec<TrackerConnection>,
    xdevs: Vec<XdevInfo>,

    counters: Counters,
}

impl State {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn intern(&mut self, s: &str) -> xr::Path {
        if let Some(i) = self.paths.iter().position(|p| p == s) {
            return xr::Path::from_raw(i as u64 + 1);
        }
        self.paths.push(s.to_owned());
        xr::Path::from_raw(self.paths.len() as u64)
    }

    fn action_by_name(&self, name: &str) -> Option<u64> {
        self.actions
            .iter()
            .find(|(_, a)| a.name == name)
            .map(|(h, _)| *h)
    }
}

pub struct FakeRuntime {
    state: Mutex<State>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// A runtime with an HMD present and hand tracking supported, the common
    /// fixture starting point.
    pub fn with_hmd() -> Self {
        let fake = Self::new();
        fake.set_system(SystemInfo {
            render_width: 1280,
            render_height: 1440,
            supports_hand_tracking: true,
            supports_eye_gaze: false,
            supports_facial_tracking: false,
        });
        fake
    }

    pub fn set_system(&self, system: SystemInfo) {
        self.state.lock().unwrap().system = Some(system);
    }

    pub fn add_extension(&self, extension: Extension) {
        self.state.lock().unwrap().extensions.push(extension);
    }

    pub fn push_event(&self, event: RuntimeEvent) {
        self.state.lock().unwrap().events.push_back(event);
    }

    /// Scripts a session state and queues the matching event, like a real
    /// runtime announcing the transition.
    pub fn set_session_state(&self, state: xr::SessionState) {
        let mut st = self.state.lock().unwrap();
        st.session_state = Some(state);
        st.events
            .push_back(RuntimeEvent::SessionStateChanged(state));
    }

    /// Binds (or unbinds, with `None`) an interaction profile to a top-level
    /// user path and queues the change event.
    pub fn set_interaction_profile(&self, top_level: &str, profile: Option<&str>) {
        let mut st = self.state.lock().unwrap();
        let top = st.intern(top_level);
        let profile = match profile {
            Some(p) => st.intern(p),
            None => xr::Path::NULL,
        };
        st.interaction_profiles.insert(top, profile);
        st.events.push_back(RuntimeEvent::InteractionProfileChanged);
    }

    pub fn set_bool_state(&self, action_name: &str, subaction: &str, value: bool, active: bool) {
        let mut st = self.state.lock().unwrap();
        let action = st
            .action_by_name(action_name)
            .unwrap_or_else(|| panic!("unknown action {action_name}"));
        let sub = st.intern(subaction);
        st.bool_states.insert((action, sub), (value, active));
    }

    pub fn set_float_state(&self, action_name: &str, subaction: &str, value: f32, active: bool) {
        let mut st = self.state.lock().unwrap();
        let action = st
            .action_by_name(action_name)
            .unwrap_or_else(|| panic!("unknown action {action_name}"));
        let sub = st.intern(subaction);
        st.float_states.insert((action, sub), (value, active));
    }

    pub fn set_vector2_state(
        &self,
        action_name: &str,
        subaction: &str,
        value: (f32, f32),
        active: bool,
    ) {
        let mut st = self.state.lock().unwrap();
        let action = st
            .action_by_name(action_name)
            .unwrap_or_else(|| panic!("unknown action {action_name}"));
        let sub = st.intern(subaction);
        st.vec2_states.insert(
            (action, sub),
            (
                xr::Vector2f {
                    x: value.0,
                    y: value.1,
                },
                active,
            ),
        );
    }

    /// Scripts the located pose of the space created from an action for one
    /// sub-action path. Panics if no such space exists yet.
    pub fn set_action_space_location(
        &self,
        action_name: &str,
        subaction: &str,
        relation: Option<SpaceRelation>,
    ) {
        let mut st = self.state.lock().unwrap();
        let action = st
            .action_by_name(action_name)
            .unwrap_or_else(|| panic!("unknown action {action_name}"));
        let sub = st.intern(subaction);
        let space = *st
            .action_spaces
            .get(&(action, sub))
            .unwrap_or_else(|| panic!("no space created for {action_name} on {subaction}"));
        match relation {
            Some(r) => st.space_locations.insert(space.0, r),
            None => st.space_locations.remove(&space.0),
        };
    }

    /// Scripts the located pose of a reference space (e.g. the view space,
    /// which drives the head pose).
    pub fn set_reference_space_location(
        &self,
        ty: ReferenceSpaceType,
        relation: Option<SpaceRelation>,
    ) {
        let mut st = self.state.lock().unwrap();
        let spaces: Vec<u64> = st
            .reference_spaces
            .iter()
            .filter(|(_, t)| **t == ty)
            .map(|(h, _)| *h)
            .collect();
        for space in spaces {
            match relation {
                Some(r) => {
                    st.space_locations.insert(space, r);
                }
                None => {
                    st.space_locations.remove(&space);
                }
            }
        }
    }

    pub fn set_views(&self, views: Option<[EyeView; 2]>) {
        self.state.lock().unwrap().views = views;
    }

    pub fn set_hand_joints(&self, hand: Hand, joints: Option<Box<HandJointLocations>>) {
        let mut st = self.state.lock().unwrap();
        match joints {
            Some(j) => {
                st.hand_joints.insert(hand, j);
            }
            None => {
                st.hand_joints.remove(&hand);
            }
        }
    }

    pub fn set_expression_weights(&self, kind: FacialTrackerKind, weights: Option<Vec<f32>>) {
        let mut st = self.state.lock().unwrap();
        match weights {
            Some(w) => {
                st.expression_weights.insert(kind, w);
            }
            None => {
                st.expression_weights.remove(&kind);
            }
        }
    }

    /// Connects a vive-style tracker and queues its announcement event.
    pub fn connect_vive_tracker(&self, persistent: &str, role: &str) {
        let mut st = self.state.lock().unwrap();
        let persistent_path = st.intern(persistent);
        let role_path = if role.is_empty() {
            xr::Path::NULL
        } else {
            st.intern(role)
        };
        st.vive_trackers.retain(|t| t.persistent_path != persistent_path);
        st.vive_trackers.push(TrackerConnection {
            persistent_path,
            role_path,
        });
        st.events.push_back(RuntimeEvent::ViveTrackerConnected { persistent_path });
    }

    pub fn disconnect_vive_tracker(&self, persistent: &str) {
        let mut st = self.state.lock().unwrap();
        let persistent_path = st.intern(persistent);
        st.vive_trackers.retain(|t| t.persistent_path != persistent_path);
    }

    pub fn set_xdevs(&self, xdevs: Vec<XdevInfo>) {
        self.state.lock().unwrap().xdevs = xdevs;
    }

    pub fn sync_count(&self) -> u32 {
        self.state.lock().unwrap().counters.sync
    }

    pub fn begin_session_count(&self) -> u32 {
        self.state.lock().unwrap().counters.begin_session
    }

    pub fn end_session_count(&self) -> u32 {
        self.state.lock().unwrap().counters.end_session
    }

    /// (wait_frame, begin_frame, end_frame) call counts.
    pub fn frame_call_counts(&self) -> (u32, u32, u32) {
        let st = self.state.lock().unwrap();
        (
            st.counters.wait_frame,
            st.counters.begin_frame,
            st.counters.end_frame,
        )
    }

    pub fn session_exists(&self) -> bool {
        self.state.lock().unwrap().session.is_some()
    }

    /// The bindings suggested for a profile, as (action name, path string)
    /// pairs, for binding-table verification.
    pub fn suggested_bindings(&self, profile: &str) -> Vec<(String, String)> {
        let mut st = self.state.lock().unwrap();
        let profile = st.intern(profile);
        let Some(bindings) = st.suggested.get(&profile) else {
            return Vec::new();
        };
        bindings
            .clone()
            .iter()
            .map(|b| {
                let name = st.actions[&b.action.0].name.clone();
                let path = st.paths[b.binding.into_raw() as usize - 1].clone();
                (name, path)
            })
            .collect()
    }
}

fn bool_state(value: bool, active: bool) -> xr::ActionState<bool> {
    xr::ActionState {
        current_state: value,
        changed_since_last_sync: false,
        last_change_time: xr::Time::from_nanos(0),
        is_active: active,
    }
}

impl XrRuntime for FakeRuntime {
    fn string_to_path(&self, s: &str) -> CallResult<xr::Path> {
        if !s.starts_with('/') {
            return Err(RuntimeResult::PathFormatInvalid);
        }
        Ok(self.state.lock().unwrap().intern(s))
    }

    fn path_to_string(&self, path: xr::Path) -> CallResult<String> {
        let st = self.state.lock().unwrap();
        st.paths
            .get(path.into_raw() as usize - 1)
            .cloned()
            .ok_or(RuntimeResult::PathInvalid)
    }

    fn supports_extension(&self, extension: Extension) -> bool {
        self.state.lock().unwrap().extensions.contains(&extension)
    }

    fn poll_event(&self) -> CallResult<Option<RuntimeEvent>> {
        Ok(self.state.lock().unwrap().events.pop_front())
    }

    fn system_info(&self) -> CallResult<Option<SystemInfo>> {
        Ok(self.state.lock().unwrap().system)
    }

    fn create_action_set(&self, _name: &str, _localized: &str) -> CallResult<ActionSetHandle> {
        let mut st = self.state.lock().unwrap();
        let handle = ActionSetHandle(st.handle());
        st.action_sets.push(handle);
        Ok(handle)
    }

    fn destroy_action_set(&self, set: ActionSetHandle) {
        let mut st = self.state.lock().unwrap();
        st.action_sets.retain(|s| *s != set);
        st.actions.retain(|_, a| a.set != set);
        if st.attached_set == Some(set) {
            st.attached_set = None;
        }
        st.suggested.clear();
    }

    fn create_action(
        &self,
        set: ActionSetHandle,
        kind: ActionKind,
        name: &str,
        _localized: &str,
        _subaction_paths: &[xr::Path],
    ) -> CallResult<ActionHandle> {
        let mut st = self.state.lock().unwrap();
        assert_ne!(
            st.attached_set,
            Some(set),
            "action {name:?} created after the set was attached"
        );
        if st.actions.values().any(|a| a.set == set && a.name == name) {
            return Err(RuntimeResult::NameDuplicated);
        }
        let handle = st.handle();
        st.actions.insert(
            handle,
            ActionData {
                set,
                name: name.to_owned(),
                kind,
            },
        );
        Ok(ActionHandle(handle))
    }

    fn suggest_bindings(
        &self,
        interaction_profile: xr::Path,
        bindings: &[SuggestedBinding],
    ) -> CallResult<()> {
        let mut st = self.state.lock().unwrap();
        assert!(
            st.attached_set.is_none(),
            "bindings suggested after the action set was attached"
        );
        st.suggested
            .insert(interaction_profile, bindings.to_vec());
        Ok(())
    }

    fn create_session(&self) -> CallResult<SessionHandle> {
        let mut st = self.state.lock().unwrap();
        assert!(st.session.is_none(), "second session without destroy");
        let handle = SessionHandle(st.handle());
        st.session = Some(handle);
        st.session_running = false;
        st.attached_set = None;
        Ok(handle)
    }

    fn destroy_session(&self, session: SessionHandle) {
        let mut st = self.state.lock().unwrap();
        assert_eq!(st.session, Some(session), "destroying unknown session");
        st.session = None;
        st.session_running = false;
        st.attached_set = None;
        st.action_spaces.clear();
        st.reference_spaces.clear();
    }

    fn begin_session(&self, _session: SessionHandle) -> CallResult<()> {
        let mut st = self.state.lock().unwrap();
        assert!(!st.session_running, "session begun twice");
        st.session_running = true;
        st.counters.begin_session += 1;
        Ok(())
    }

    fn end_session(&self, _session: SessionHandle) -> CallResult<()> {
        let mut st = self.state.lock().unwrap();
        assert!(st.session_running, "session ended while not running");
        st.session_running = false;
        st.counters.end_session += 1;
        Ok(())
    }

    fn request_exit_session(&self, _session: SessionHandle) -> CallResult<()> {
        Ok(())
    }

    fn attach_action_set(&self, _session: SessionHandle, set: ActionSetHandle) -> CallResult<()> {
        let mut st = self.state.lock().unwrap();
        assert!(
            st.attached_set.is_none(),
            "action set attached twice to one session"
        );
        st.attached_set = Some(set);
        Ok(())
    }

    fn sync_actions(&self, _session: SessionHandle, set: ActionSetHandle) -> CallResult<SyncResult> {
        let mut st = self.state.lock().unwrap();
        assert_eq!(
            st.session_state,
            Some(xr::SessionState::FOCUSED),
            "action sync while session is not focused"
        );
        assert_eq!(st.attached_set, Some(set), "sync with unattached set");
        st.counters.sync += 1;
        Ok(SyncResult::Synced)
    }

    fn current_interaction_profile(
        &self,
        _session: SessionHandle,
        top_level: xr::Path,
    ) -> CallResult<xr::Path> {
        let st = self.state.lock().unwrap();
        Ok(st
            .interaction_profiles
            .get(&top_level)
            .copied()
            .unwrap_or(xr::Path::NULL))
    }

    fn get_bool(
        &self,
        _session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<bool>> {
        let st = self.state.lock().unwrap();
        let (value, active) = st
            .bool_states
            .get(&(action.0, subaction))
            .copied()
            .unwrap_or((false, false));
        Ok(bool_state(value, active))
    }

    fn get_float(
        &self,
        _session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<f32>> {
        let st = self.state.lock().unwrap();
        let (value, active) = st
            .float_states
            .get(&(action.0, subaction))
            .copied()
            .unwrap_or((0.0, false));
        Ok(xr::ActionState {
            current_state: value,
            changed_since_last_sync: false,
            last_change_time: xr::Time::from_nanos(0),
            is_active: active,
        })
    }

    fn get_vector2(
        &self,
        _session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
    ) -> CallResult<xr::ActionState<xr::Vector2f>> {
        let st = self.state.lock().unwrap();
        let (value, active) = st
            .vec2_states
            .get(&(action.0, subaction))
            .copied()
            .unwrap_or((xr::Vector2f { x: 0.0, y: 0.0 }, false));
        Ok(xr::ActionState {
            current_state: value,
            changed_since_last_sync: false,
            last_change_time: xr::Time::from_nanos(0),
            is_active: active,
        })
    }

    fn apply_haptic_feedback(
        &self,
        _session: SessionHandle,
        _action: ActionHandle,
        _subaction: xr::Path,
        _duration: xr::Duration,
        _frequency: f32,
        _amplitude: f32,
    ) -> CallResult<()> {
        Ok(())
    }

    fn create_reference_space(
        &self,
        _session: SessionHandle,
        ty: ReferenceSpaceType,
    ) -> CallResult<SpaceHandle> {
        let mut st = self.state.lock().unwrap();
        let handle = st.handle();
        st.reference_spaces.insert(handle, ty);
        Ok(SpaceHandle(handle))
    }

    fn create_action_space(
        &self,
        _session: SessionHandle,
        action: ActionHandle,
        subaction: xr::Path,
        _pose_in_action_space: xr::Posef,
    ) -> CallResult<SpaceHandle> {
        let mut st = self.state.lock().unwrap();
        let handle = SpaceHandle(st.handle());
        st.action_spaces.insert((action.0, subaction), handle);
        Ok(handle)
    }

    fn destroy_space(&self, space: SpaceHandle) {
        let mut st = self.state.lock().unwrap();
        st.space_locations.remove(&space.0);
        st.reference_spaces.remove(&space.0);
        st.action_spaces.retain(|_, s| *s != space);
    }

    fn locate_space(
        &self,
        space: SpaceHandle,
        _base: SpaceHandle,
        _time: xr::Time,
    ) -> CallResult<Option<SpaceRelation>> {
        let st = self.state.lock().unwrap();
        Ok(st.space_locations.get(&space.0).copied())
    }

    fn wait_frame(&self, _session: SessionHandle) -> CallResult<FrameState> {
        let mut st = self.state.lock().unwrap();
        assert!(st.session_running, "frame wait while session not running");
        st.frame_time += 11_111_111;
        st.counters.wait_frame += 1;
        Ok(FrameState {
            predicted_display_time: xr::Time::from_nanos(st.frame_time),
            predicted_display_period: xr::Duration::from_nanos(11_111_111),
            should_render: true,
        })
    }

    fn begin_frame(&self, _session: SessionHandle) -> CallResult<()> {
        self.state.lock().unwrap().counters.begin_frame += 1;
        Ok(())
    }

    fn end_frame(
        &self,
        _session: SessionHandle,
        _display_time: xr::Time,
        _layers: &[EyeLayer],
    ) -> CallResult<()> {
        self.state.lock().unwrap().counters.end_frame += 1;
        Ok(())
    }

    fn locate_views(
        &self,
        _session: SessionHandle,
        _time: xr::Time,
        _base: SpaceHandle,
    ) -> CallResult<Option<[EyeView; 2]>> {
        Ok(self.state.lock().unwrap().views)
    }

    fn enumerate_swapchain_formats(&self, _session: SessionHandle) -> CallResult<Vec<i64>> {
        Ok(vec![0x8C43])
    }

    fn create_swapchain(
        &self,
        _session: SessionHandle,
        _info: &SwapchainCreateInfo,
    ) -> CallResult<SwapchainHandle> {
        let mut st = self.state.lock().unwrap();
        let handle = SwapchainHandle(st.handle());
        st.swapchains.push(handle);
        Ok(handle)
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        self.state
            .lock()
            .unwrap()
            .swapchains
            .retain(|s| *s != swapchain);
    }

    fn enumerate_swapchain_images(&self, swapchain: SwapchainHandle) -> CallResult<Vec<u64>> {
        Ok(vec![swapchain.0 * 100, swapchain.0 * 100 + 1])
    }

    fn acquire_swapchain_image(&self, _swapchain: SwapchainHandle) -> CallResult<u32> {
        Ok(0)
    }

    fn wait_swapchain_image(&self, _swapchain: SwapchainHandle) -> CallResult<bool> {
        Ok(true)
    }

    fn release_swapchain_image(&self, _swapchain: SwapchainHandle) -> CallResult<()> {
        Ok(())
    }

    fn create_hand_tracker(
        &self,
        _session: SessionHandle,
        hand: Hand,
    ) -> CallResult<HandTrackerHandle> {
        let mut st = self.state.lock().unwrap();
        if !st
            .system
            .map(|s| s.supports_hand_tracking)
            .unwrap_or(false)
        {
            return Err(RuntimeResult::FeatureUnsupported);
        }
        let handle = st.handle();
        st.hand_trackers.insert(handle, hand);
        Ok(HandTrackerHandle(handle))
    }

    fn destroy_hand_tracker(&self, tracker: HandTrackerHandle) {
        self.state.lock().unwrap().hand_trackers.remove(&tracker.0);
    }

    fn locate_hand_joints(
        &self,
        tracker: HandTrackerHandle,
        _base: SpaceHandle,
        _time: xr::Time,
    ) -> CallResult<Option<Box<HandJointLocations>>> {
        let st = self.state.lock().unwrap();
        let hand = st
            .hand_trackers
            .get(&tracker.0)
            .copied()
            .ok_or(RuntimeResult::HandleInvalid)?;
        Ok(st.hand_joints.get(&hand).cloned())
    }

    fn create_facial_tracker(
        &self,
        _session: SessionHandle,
        kind: FacialTrackerKind,
    ) -> CallResult<FaceTrackerHandle> {
        let mut st = self.state.lock().unwrap();
        if !st
            .system
            .map(|s| s.supports_facial_tracking)
            .unwrap_or(false)
        {
            return Err(RuntimeResult::FeatureUnsupported);
        }
        let handle = st.handle();
        st.facial_trackers.insert(handle, kind);
        Ok(FaceTrackerHandle(handle))
    }

    fn destroy_facial_tracker(&self, tracker: FaceTrackerHandle) {
        self.state
            .lock()
            .unwrap()
            .facial_trackers
            .remove(&tracker.0);
    }

    fn get_expression_weights(
        &self,
        tracker: FaceTrackerHandle,
        _time: xr::Time,
    ) -> CallResult<Option<Vec<f32>>> {
        let st = self.state.lock().unwrap();
        let kind = st
            .facial_trackers
            .get(&tracker.0)
            .copied()
            .ok_or(RuntimeResult::HandleInvalid)?;
        Ok(st.expression_weights.get(&kind).cloned())
    }

    fn enumerate_vive_trackers(&self) -> CallResult<Vec<TrackerConnection>> {
        Ok(self.state.lock().unwrap().vive_trackers.clone())
    }

    fn enumerate_xdevs(&self, _session: SessionHandle) -> CallResult<Vec<XdevInfo>> {
        Ok(self.state.lock().unwrap().xdevs.clone())
    }

    fn create_xdev_space(&self, _session: SessionHandle, id: u64) -> CallResult<SpaceHandle> {
        let mut st = self.state.lock().unwrap();
        if !st.xdevs.iter().any(|x| x.id == id && x.can_create_space) {
            return Err(RuntimeResult::ValidationFailure);
        }
        let handle = SpaceHandle(st.handle());
        // Xdev spaces come up trackable at the origin so tests see a pose
        // without extra scripting.
        st.space_locations.insert(
            handle.0,
            SpaceRelation {
                pose: xr::Posef::IDENTITY,
                linear_velocity: None,
                angular_velocity: None,
            },
        );
        Ok(handle)
    }
}
