//! Session lifecycle, frame pacing and the per-eye submission surface.
//!
//! The session mirrors the runtime's authoritative state machine; it never
//! invents a transition locally. The one exception is teardown on instance
//! loss, where the runtime is about to become unusable and cannot be
//! queried for a clean final state.

use crate::{
    action::ActionSet,
    error::{ResultExt, XrError},
    runtime::{
        EyeLayer, EyeView, FrameState, ReferenceSpaceType, RuntimeResult, SessionHandle,
        SwapchainCreateInfo, SwapchainHandle, SyncResult, SystemInfo, XrRuntime,
    },
    space::{to_quat, to_vec3, DevicePose, Space},
};
use glam::Mat4;
use openxr as xr;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread,
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];
}

/// Field of view used until the first successful view locate. Tangents
/// match a wide headset so early frames are not clipped.
fn fallback_fov() -> xr::Fovf {
    xr::Fovf {
        angle_left: -1.39863f32.atan(),
        angle_right: 1.39863f32.atan(),
        angle_up: 1.47114f32.atan(),
        angle_down: -1.47114f32.atan(),
    }
}

struct FrameTiming {
    predicted_display_time: xr::Time,
    predicted_display_period: xr::Duration,
    should_render: bool,
}

struct ViewState {
    head: DevicePose,
    eyes: [EyeView; 2],
}

struct EyeSwapchain {
    runtime: Arc<dyn XrRuntime>,
    handle: SwapchainHandle,
    width: u32,
    height: u32,
    images: Vec<u64>,
}

impl EyeSwapchain {
    fn new(
        runtime: &Arc<dyn XrRuntime>,
        session: SessionHandle,
        width: u32,
        height: u32,
        format: i64,
    ) -> Result<Self, XrError> {
        let info = SwapchainCreateInfo {
            width,
            height,
            format,
            sample_count: 1,
        };
        let handle = runtime
            .create_swapchain(session, &info)
            .or_xr("xrCreateSwapchain")?;
        let mut chain = Self {
            runtime: runtime.clone(),
            handle,
            width,
            height,
            images: Vec::new(),
        };
        chain.images = chain
            .runtime
            .enumerate_swapchain_images(handle)
            .or_xr("xrEnumerateSwapchainImages")?;
        Ok(chain)
    }
}

impl Drop for EyeSwapchain {
    fn drop(&mut self) {
        self.runtime.destroy_swapchain(self.handle);
    }
}

/// Destroys the raw session handle last, after spaces and swapchains.
struct OwnedSession {
    runtime: Arc<dyn XrRuntime>,
    handle: SessionHandle,
}

impl Drop for OwnedSession {
    fn drop(&mut self) {
        self.runtime.destroy_session(self.handle);
    }
}

pub struct Session {
    runtime: Arc<dyn XrRuntime>,
    stage: Space,
    view_space: Space,
    local: Space,
    swapchains: [EyeSwapchain; 2],
    render_size: (u32, u32),
    running: AtomicBool,
    focused: AtomicBool,
    attached: AtomicBool,
    frame: Mutex<FrameTiming>,
    views: Mutex<ViewState>,
    // Declared last: dropped after everything that still holds the handle.
    owned: OwnedSession,
}

impl Session {
    pub fn new(runtime: Arc<dyn XrRuntime>, system: &SystemInfo) -> Result<Self, XrError> {
        let handle = runtime.create_session().or_xr("xrCreateSession")?;
        // From here on every acquired resource lives in a droppable owner,
        // so a failed step releases what was already created.
        let owned = OwnedSession {
            runtime: runtime.clone(),
            handle,
        };
        let stage = Space::reference(runtime.clone(), handle, ReferenceSpaceType::Stage)?;
        let view_space = Space::reference(runtime.clone(), handle, ReferenceSpaceType::View)?;
        let local = Space::reference(runtime.clone(), handle, ReferenceSpaceType::Local)?;

        let formats = runtime
            .enumerate_swapchain_formats(handle)
            .or_xr("xrEnumerateSwapchainFormats")?;
        let format = *formats
            .first()
            .ok_or(XrError::FeatureUnavailable("no swapchain formats"))?;
        let (w, h) = (system.render_width, system.render_height);
        let swapchains = [
            EyeSwapchain::new(&runtime, handle, w, h, format)?,
            EyeSwapchain::new(&runtime, handle, w, h, format)?,
        ];

        log::info!("session created, render target {w}x{h}");
        Ok(Self {
            runtime,
            stage,
            view_space,
            local,
            swapchains,
            render_size: (w, h),
            running: AtomicBool::new(false),
            focused: AtomicBool::new(false),
            attached: AtomicBool::new(false),
            frame: Mutex::new(FrameTiming {
                predicted_display_time: xr::Time::from_nanos(0),
                predicted_display_period: xr::Duration::from_nanos(0),
                should_render: false,
            }),
            views: Mutex::new(ViewState {
                head: DevicePose::default(),
                eyes: [
                    EyeView {
                        pose: xr::Posef::IDENTITY,
                        fov: fallback_fov(),
                    };
                    2
                ],
            }),
            owned,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.owned.handle
    }

    pub fn runtime(&self) -> &Arc<dyn XrRuntime> {
        &self.runtime
    }

    pub fn stage_space(&self) -> &Space {
        &self.stage
    }

    pub fn local_space(&self) -> &Space {
        &self.local
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::Acquire)
    }

    pub(crate) fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Release);
    }

    /// Begins the session. Idempotent: a second call while running is a
    /// no-op so the Ready handler can fire more than once safely.
    pub fn begin(&self) -> Result<(), XrError> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        self.runtime
            .begin_session(self.owned.handle)
            .or_xr("xrBeginSession")?;
        self.running.store(true, Ordering::Release);
        log::info!("session begun");
        Ok(())
    }

    /// Ends the session. Idempotent like [`Session::begin`].
    pub fn end(&self) -> Result<(), XrError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.focused.store(false, Ordering::Release);
        self.runtime
            .end_session(self.owned.handle)
            .or_xr("xrEndSession")?;
        log::info!("session ended");
        Ok(())
    }

    pub fn request_exit(&self) -> Result<(), XrError> {
        self.runtime
            .request_exit_session(self.owned.handle)
            .or_xr("xrRequestExitSession")
    }

    /// Attaches the action set. The runtime forbids re-attachment, so a
    /// second call is a domain error before it ever reaches the runtime.
    pub fn attach_action_set(&self, set: &ActionSet) -> Result<(), XrError> {
        if self.attached.load(Ordering::Acquire) {
            return Err(XrError::SessionAlreadyAttached);
        }
        self.runtime
            .attach_action_set(self.owned.handle, set.handle())
            .or_xr("xrAttachSessionActionSets")?;
        set.mark_attached();
        self.attached.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Synchronizes action state. Legal only while focused; some runtimes
    /// crash on an early sync instead of returning an error code, so the
    /// guard lives here and not in error handling.
    pub fn sync_actions(&self, set: &ActionSet) -> Result<SyncResult, XrError> {
        if !self.focused.load(Ordering::Acquire) {
            return Err(XrError::NotFocused);
        }
        if !self.attached.load(Ordering::Acquire) {
            return Err(XrError::ActionSetNotAttached);
        }
        self.runtime
            .sync_actions(self.owned.handle, set.handle())
            .or_xr("xrSyncActions")
    }

    pub(crate) fn wait_frame_boundary(&self) -> Result<FrameState, RuntimeResult> {
        let state = self.runtime.wait_frame(self.owned.handle)?;
        let mut frame = self.frame.lock().unwrap();
        frame.predicted_display_time = state.predicted_display_time;
        frame.predicted_display_period = state.predicted_display_period;
        frame.should_render = state.should_render;
        Ok(state)
    }

    /// Blocks until the runtime releases the next frame slot and records
    /// the predicted display timing.
    pub fn wait_frame(&self) -> Result<FrameState, XrError> {
        self.wait_frame_boundary().or_xr("xrWaitFrame")
    }

    /// Begins the frame and refreshes head and eye poses from the runtime.
    /// Untrackable views hold their previous values.
    pub fn begin_frame(&self) -> Result<(), XrError> {
        self.runtime
            .begin_frame(self.owned.handle)
            .or_xr("xrBeginFrame")?;
        let time = self.predicted_display_time();
        if let Some(eyes) = self
            .runtime
            .locate_views(self.owned.handle, time, self.stage.handle())
            .or_xr("xrLocateViews")?
        {
            self.views.lock().unwrap().eyes = eyes;
        }
        let mut head = self.views.lock().unwrap().head;
        self.view_space.locate(&self.stage, time, &mut head)?;
        self.views.lock().unwrap().head = head;
        Ok(())
    }

    /// Submits both eye layers for the frame begun last.
    pub fn end_frame(&self) -> Result<(), XrError> {
        let (time, should_render) = {
            let frame = self.frame.lock().unwrap();
            (frame.predicted_display_time, frame.should_render)
        };
        let layers: Vec<EyeLayer> = if should_render {
            let views = self.views.lock().unwrap();
            self.swapchains
                .iter()
                .zip(views.eyes.iter())
                .map(|(chain, eye)| EyeLayer {
                    swapchain: chain.handle,
                    pose: eye.pose,
                    fov: eye.fov,
                    width: chain.width,
                    height: chain.height,
                })
                .collect()
        } else {
            Vec::new()
        };
        self.runtime
            .end_frame(self.owned.handle, time, &layers)
            .or_xr("xrEndFrame")
    }

    pub fn predicted_display_time(&self) -> xr::Time {
        self.frame.lock().unwrap().predicted_display_time
    }

    pub fn predicted_display_period(&self) -> xr::Duration {
        self.frame.lock().unwrap().predicted_display_period
    }

    pub fn should_render(&self) -> bool {
        self.frame.lock().unwrap().should_render
    }

    pub fn render_size(&self) -> (u32, u32) {
        self.render_size
    }

    pub fn head_pose(&self) -> DevicePose {
        self.views.lock().unwrap().head
    }

    pub fn eye_fov(&self, eye: Eye) -> xr::Fovf {
        self.views.lock().unwrap().eyes[eye as usize].fov
    }

    /// World-to-eye matrix for the given eye, derived from the last located
    /// view pose in stage space.
    pub fn eye_view_matrix(&self, eye: Eye) -> Mat4 {
        let pose = self.views.lock().unwrap().eyes[eye as usize].pose;
        Mat4::from_rotation_translation(to_quat(pose.orientation), to_vec3(pose.position))
            .inverse()
    }

    /// Acquires and waits on the next image of an eye swapchain, returning
    /// the image handle to render into. `Ok(None)` on a wait timeout; the
    /// caller skips rendering this frame and retries.
    pub fn acquire_eye_image(&self, eye: Eye) -> Result<Option<u64>, XrError> {
        let chain = &self.swapchains[eye as usize];
        let index = self
            .runtime
            .acquire_swapchain_image(chain.handle)
            .or_xr("xrAcquireSwapchainImage")?;
        if !self
            .runtime
            .wait_swapchain_image(chain.handle)
            .or_xr("xrWaitSwapchainImage")?
        {
            return Ok(None);
        }
        Ok(chain.images.get(index as usize).copied())
    }

    pub fn release_eye_image(&self, eye: Eye) -> Result<(), XrError> {
        self.runtime
            .release_swapchain_image(self.swapchains[eye as usize].handle)
            .or_xr("xrReleaseSwapchainImage")
    }
}

enum WaitState {
    Idle,
    Requested,
    Done(Result<FrameState, RuntimeResult>),
    Exit,
}

struct WaiterShared {
    state: Mutex<WaitState>,
    cond: Condvar,
}

/// Runs the blocking frame-wait call on its own thread so vsync-dependent
/// blocking never stalls input polling on the main thread. Handoff is a
/// request/done signal pair over one condvar.
pub struct FrameWaiter {
    shared: Arc<WaiterShared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FrameWaiter {
    pub fn spawn(session: Arc<Session>) -> std::io::Result<Self> {
        let shared = Arc::new(WaiterShared {
            state: Mutex::new(WaitState::Idle),
            cond: Condvar::new(),
        });
        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name("xr-frame-wait".into())
            .spawn(move || loop {
                {
                    let mut state = thread_shared.state.lock().unwrap();
                    loop {
                        match *state {
                            WaitState::Requested => break,
                            WaitState::Exit => return,
                            _ => state = thread_shared.cond.wait(state).unwrap(),
                        }
                    }
                }
                let result = session.wait_frame_boundary();
                let mut state = thread_shared.state.lock().unwrap();
                if matches!(*state, WaitState::Exit) {
                    return;
                }
                *state = WaitState::Done(result);
                thread_shared.cond.notify_all();
            })?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Kicks off the next frame wait.
    pub fn start_wait(&self) {
        let mut state = self.shared.state.lock().unwrap();
        *state = WaitState::Requested;
        self.shared.cond.notify_all();
    }

    /// Waits for the pending frame wait to complete. `Ok(None)` means the
    /// timeout elapsed with the runtime still blocking; that is a retriable
    /// condition (something else in the engine ran long), distinct from a
    /// runtime error.
    pub fn wait_finished(&self, timeout: Duration) -> Result<Option<FrameState>, XrError> {
        let state = self.shared.state.lock().unwrap();
        let (mut state, wait) = self
            .shared
            .cond
            .wait_timeout_while(state, timeout, |s| {
                matches!(s, WaitState::Requested)
            })
            .unwrap();
        if wait.timed_out() {
            return Ok(None);
        }
        match std::mem::replace(&mut *state, WaitState::Idle) {
            WaitState::Done(result) => result.or_xr("xrWaitFrame").map(Some),
            other => {
                *state = other;
                Ok(None)
            }
        }
    }
}

impl Drop for FrameWaiter {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = WaitState::Exit;
            self.shared.cond.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
