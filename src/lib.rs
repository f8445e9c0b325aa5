//! OpenXR device and action binding layer.
//!
//! [`XrModule`] owns the whole subsystem: it drives the session state
//! machine the runtime dictates, negotiates controller bindings through
//! per-hardware profiles, and surfaces everything as index-addressable
//! devices with polled buttons, axes and poses plus an edge-triggered
//! event queue. The OpenXR entry points are injected behind the
//! [`runtime::XrRuntime`] trait, which is what makes the whole stack
//! testable without a headset.

pub mod action;
pub mod error;
pub mod face_tracker;
pub mod hand_tracker;
pub mod input;
pub mod instance;
pub mod path;
pub mod runtime;
pub mod session;
pub mod space;
pub mod tracker_db;

pub use error::XrError;
pub use input::InputEvent;
pub use session::Eye;
pub use space::DevicePose;

use action::{ActionSet, InputActions};
use error::ResultExt;
use input::{
    device::Device,
    profiles::{create_profiles, AttachContext, BindContext, DeviceProfile, RestartRequest},
    DeviceManager, EventQueue, TrackContext,
};
use instance::Instance;
use log::{debug, info, warn};
use openxr as xr;
use runtime::{Extension, FrameState, Hand, RuntimeEvent, SyncResult, SystemInfo, XrRuntime};
use session::{FrameWaiter, Session};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Once,
    },
    time::{Duration, Instant},
};

/// Installs the process-wide logger. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    });
}

/// f32 stored through its bit pattern; orderings apply to the underlying
/// u32.
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }

    pub fn swap(&self, value: f32, order: Ordering) -> f32 {
        f32::from_bits(self.0.swap(value.to_bits(), order))
    }
}

/// How hard to try for an optional runtime capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureLevel {
    Disabled,
    /// Use it when the runtime has it.
    Optional,
    /// Fail startup when the runtime lacks it.
    Required,
}

impl FeatureLevel {
    pub fn enabled(self) -> bool {
        self != FeatureLevel::Disabled
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub eye_gaze: FeatureLevel,
    pub facial_tracking: FeatureLevel,
    /// Run `xrWaitFrame` on a dedicated thread so the blocking call never
    /// stalls input processing.
    pub async_frame_wait: bool,
    /// Minimum spacing between session restarts caused by the same
    /// hot-plugged tracker unit.
    pub tracker_restart_debounce: Duration,
    /// Tracker identity persistence; in-memory only when `None`.
    pub tracker_db_path: Option<PathBuf>,
    /// Spacing of speculative attachment re-checks while focused.
    pub attach_recheck_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eye_gaze: FeatureLevel::Optional,
            facial_tracking: FeatureLevel::Optional,
            async_frame_wait: false,
            tracker_restart_debounce: Duration::from_millis(500),
            tracker_db_path: None,
            attach_recheck_interval: Duration::from_secs(1),
        }
    }
}

struct SessionBundle {
    session: Arc<Session>,
    action_set: ActionSet,
    actions: InputActions,
    waiter: Option<FrameWaiter>,
}

struct RuntimeState {
    instance: Arc<Instance>,
    system: SystemInfo,
    profiles: Vec<Box<dyn DeviceProfile>>,
    devices: DeviceManager,
    restart: RestartRequest,
    session: Option<SessionBundle>,
    last_recheck: Option<Instant>,
}

impl RuntimeState {
    fn recheck_all(&mut self, config: &Config) {
        let (session, actions) = match &self.session {
            Some(bundle) => (Some(&bundle.session), Some(&bundle.actions)),
            None => (None, None),
        };
        let mut ctx = AttachContext {
            instance: &self.instance,
            session,
            actions,
            system: Some(&self.system),
            devices: &mut self.devices,
            restart: &mut self.restart,
            config,
        };
        for profile in &mut self.profiles {
            if let Err(e) = profile.check_attached(&mut ctx) {
                warn!("attachment check failed for {}: {e}", profile.name());
            }
        }
        self.last_recheck = Some(Instant::now());
    }

    /// Builds the session, the action set and the binding tables, then
    /// attaches. No-op when a session already exists.
    fn ensure_session(&mut self, config: &Config) -> Result<(), XrError> {
        if self.session.is_some() {
            return Ok(());
        }
        let session = Arc::new(Session::new(
            self.instance.runtime().clone(),
            &self.system,
        )?);
        let mut set = ActionSet::new(self.instance.clone(), "engine", "Engine")?;
        let hands = [
            self.instance.hand_path(Hand::Left).clone(),
            self.instance.hand_path(Hand::Right).clone(),
        ];
        let actions = InputActions::create(&mut set, &hands)?;
        for profile in &mut self.profiles {
            profile.create_actions(&self.instance, &mut set)?;
        }
        {
            let ctx = BindContext {
                instance: &self.instance,
                actions: &actions,
            };
            for profile in &self.profiles {
                // A rejected table only loses that profile's bindings, not
                // the whole session.
                if let Err(e) = profile.suggest_bindings(&ctx) {
                    warn!("skipping bindings for {}: {e}", profile.name());
                }
            }
        }
        session.attach_action_set(&set)?;
        let waiter = if config.async_frame_wait {
            match FrameWaiter::spawn(session.clone()) {
                Ok(waiter) => Some(waiter),
                Err(e) => {
                    warn!("frame wait thread unavailable ({e}), waiting inline");
                    None
                }
            }
        } else {
            None
        };
        self.session = Some(SessionBundle {
            session,
            action_set: set,
            actions,
            waiter,
        });
        self.recheck_all(config);
        Ok(())
    }

    /// Drops every profile-owned device and the session itself, ending the
    /// session first if it is still running. Used for exit, instance loss,
    /// and the teardown half of a restart.
    fn teardown_session(&mut self) {
        for profile in &mut self.profiles {
            profile.clear_actions(&mut self.devices);
        }
        if let Some(bundle) = self.session.take() {
            if let Err(e) = bundle.session.end() {
                warn!("ending session during teardown: {e}");
            }
        }
    }

    /// Full rebuild: actions suggested in the torn-down session cannot be
    /// amended, so new per-unit bindings need a fresh session and set.
    fn restart_session(&mut self, config: &Config) -> Result<(), XrError> {
        info!("restarting session to rebuild action bindings");
        self.teardown_session();
        self.ensure_session(config)
    }
}

/// The facade the engine talks to. One instance per process.
pub struct XrModule {
    config: Config,
    // Kept outside RuntimeState so the final topology event of a shutdown
    // stays observable after the runtime state is gone.
    events: EventQueue,
    state: Option<RuntimeState>,
}

impl XrModule {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events: EventQueue::default(),
            state: None,
        }
    }

    /// Brings the subsystem up on the given entry points: instance-level
    /// state, the profile roster, and the initial session.
    pub fn start_runtime(&mut self, runtime: Arc<dyn XrRuntime>) -> Result<(), XrError> {
        self.stop_runtime();
        let instance = Instance::new(runtime.clone())?;
        let system = runtime
            .system_info()
            .or_xr("xrGetSystem")?
            .ok_or(XrError::FeatureUnavailable("head-mounted display"))?;

        if self.config.eye_gaze == FeatureLevel::Required
            && !(instance.supports(Extension::EyeGazeInteraction) && system.supports_eye_gaze)
        {
            return Err(XrError::FeatureUnavailable("eye gaze interaction"));
        }
        if self.config.facial_tracking == FeatureLevel::Required
            && !(instance.supports(Extension::FacialTrackingHtc)
                && system.supports_facial_tracking)
        {
            return Err(XrError::FeatureUnavailable("facial tracking"));
        }

        let profiles = create_profiles(&instance, &self.config)?;
        let mut state = RuntimeState {
            instance,
            system,
            profiles,
            devices: DeviceManager::default(),
            restart: RestartRequest::new(self.config.tracker_restart_debounce),
            session: None,
            last_recheck: None,
        };
        state.ensure_session(&self.config)?;
        self.state = Some(state);
        Ok(())
    }

    pub fn stop_runtime(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.teardown_session();
            state.devices.check_notify_attached_detached(&self.events);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// One tick of the subsystem: consume a deferred restart, drain runtime
    /// events, re-check attachments, sync and sample input, then emit the
    /// coalesced topology notification. Call once per frame.
    pub fn process_events(&mut self) -> Result<(), XrError> {
        let config = &self.config;
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        // Deferred restarts are consumed here and nowhere else, so no
        // profile callback ever observes a half-torn-down session.
        if state.restart.take() {
            state.restart_session(config)?;
        }

        let mut instance_lost = false;
        while let Some(event) = state
            .instance
            .runtime()
            .poll_event()
            .or_xr("xrPollEvent")?
        {
            match event {
                RuntimeEvent::SessionStateChanged(new_state) => {
                    debug!("session state changed: {new_state:?}");
                    if let Some(bundle) = &state.session {
                        bundle
                            .session
                            .set_focused(new_state == xr::SessionState::FOCUSED);
                    }
                    match new_state {
                        xr::SessionState::READY => {
                            if let Some(bundle) = &state.session {
                                bundle.session.begin()?;
                            }
                            state.recheck_all(config);
                        }
                        xr::SessionState::STOPPING => {
                            if let Some(bundle) = &state.session {
                                bundle.session.end()?;
                            }
                            state.recheck_all(config);
                        }
                        xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                            state.teardown_session();
                        }
                        _ => {}
                    }
                }
                RuntimeEvent::InstanceLossPending => {
                    warn!("instance loss pending, shutting down");
                    instance_lost = true;
                }
                RuntimeEvent::InteractionProfileChanged => {
                    debug!("interaction profile changed");
                    state.recheck_all(config);
                }
                RuntimeEvent::ViveTrackerConnected { .. } => {
                    state.recheck_all(config);
                }
            }
        }
        if instance_lost {
            state.teardown_session();
            state.devices.check_notify_attached_detached(&self.events);
            self.state = None;
            return Ok(());
        }

        // Attachment can change without an event on some runtimes, so poll
        // speculatively at a low rate while focused.
        let focused = state
            .session
            .as_ref()
            .is_some_and(|b| b.session.is_focused());
        if focused
            && state
                .last_recheck
                .map_or(true, |at| at.elapsed() >= config.attach_recheck_interval)
        {
            state.recheck_all(config);
        }

        if let Some(bundle) = &state.session {
            if bundle.session.is_focused() && bundle.session.is_attached() {
                match bundle.session.sync_actions(&bundle.action_set)? {
                    SyncResult::Synced => {
                        let ctx = TrackContext {
                            session: &bundle.session,
                            stage: bundle.session.stage_space(),
                            time: bundle.session.predicted_display_time(),
                            events: &self.events,
                        };
                        state.devices.track_device_states(&ctx);
                    }
                    SyncResult::NotFocused => {}
                    SyncResult::SessionLoss => {
                        warn!("session loss reported during action sync");
                    }
                }
            }
        }

        state.devices.check_notify_attached_detached(&self.events);
        Ok(())
    }

    fn bundle(&self) -> Result<&SessionBundle, XrError> {
        self.state
            .as_ref()
            .ok_or(XrError::RuntimeNotStarted)?
            .session
            .as_ref()
            .ok_or(XrError::NoSession)
    }

    // Device queries. Without a runtime these report an empty topology
    // instead of failing, so callers can poll unconditionally.

    pub fn device_count(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.devices.len())
    }

    pub fn device(&self, index: usize) -> Result<&Arc<Device>, XrError> {
        let count = self.device_count();
        self.state
            .as_ref()
            .and_then(|s| s.devices.get(index))
            .ok_or(XrError::DeviceIndexOutOfRange { index, count })
    }

    pub fn find_device(&self, id: &str) -> Option<&Arc<Device>> {
        self.state.as_ref().and_then(|s| s.devices.find_by_id(id))
    }

    pub fn next_event(&self) -> Option<InputEvent> {
        self.events.pop()
    }

    pub fn set_feedback_value(
        &self,
        device: usize,
        feedback: usize,
        value: f32,
    ) -> Result<(), XrError> {
        let bundle = self.bundle()?;
        self.device(device)?
            .set_feedback_value(&bundle.session, feedback, value)
    }

    // Frame pacing and submission.

    /// Kicks off the next frame wait when the frame-wait thread is in use;
    /// no-op otherwise.
    pub fn start_frame_wait(&self) -> Result<(), XrError> {
        let bundle = self.bundle()?;
        if let Some(waiter) = &bundle.waiter {
            waiter.start_wait();
        }
        Ok(())
    }

    /// Completes the frame wait. With the frame-wait thread, `Ok(None)`
    /// means the wait is still blocking after `timeout` and should be
    /// retried; inline waiting always produces a state or an error.
    pub fn finish_frame_wait(&self, timeout: Duration) -> Result<Option<FrameState>, XrError> {
        let bundle = self.bundle()?;
        match &bundle.waiter {
            Some(waiter) => waiter.wait_finished(timeout),
            None => bundle.session.wait_frame().map(Some),
        }
    }

    pub fn begin_frame(&self) -> Result<(), XrError> {
        self.bundle()?.session.begin_frame()
    }

    pub fn end_frame(&self) -> Result<(), XrError> {
        self.bundle()?.session.end_frame()
    }

    pub fn acquire_eye_image(&self, eye: Eye) -> Result<Option<u64>, XrError> {
        self.bundle()?.session.acquire_eye_image(eye)
    }

    pub fn release_eye_image(&self, eye: Eye) -> Result<(), XrError> {
        self.bundle()?.session.release_eye_image(eye)
    }

    pub fn render_size(&self) -> Result<(u32, u32), XrError> {
        Ok(self.bundle()?.session.render_size())
    }

    pub fn eye_fov(&self, eye: Eye) -> Result<xr::Fovf, XrError> {
        Ok(self.bundle()?.session.eye_fov(eye))
    }

    pub fn eye_view_matrix(&self, eye: Eye) -> Result<glam::Mat4, XrError> {
        Ok(self.bundle()?.session.eye_view_matrix(eye))
    }

    pub fn head_pose(&self) -> DevicePose {
        self.bundle()
            .map(|b| b.session.head_pose())
            .unwrap_or_default()
    }

    pub fn request_exit(&self) -> Result<(), XrError> {
        self.bundle()?.session.request_exit()
    }
}

impl Default for XrModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
