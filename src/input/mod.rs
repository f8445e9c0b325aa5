//! The engine-facing input model: devices, their manager, and the event
//! queue the application drains once per tick.

pub mod device;
pub mod profiles;
#[cfg(test)]
mod tests;

use crate::{
    error::XrError,
    session::Session,
    space::Space,
};
use device::Device;
use openxr as xr;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Discrete input events, enqueued only on edges (button state changes,
/// axis movement beyond resolution, device topology changes).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    ButtonPress { device: usize, button: usize },
    ButtonRelease { device: usize, button: usize },
    ButtonTouch { device: usize, button: usize },
    ButtonUntouch { device: usize, button: usize },
    ButtonApproach { device: usize, button: usize },
    ButtonWithdraw { device: usize, button: usize },
    AxisMove { device: usize, axis: usize, value: f32 },
    DevicesChanged,
}

/// Shared event queue; devices push, the application pops.
#[derive(Default)]
pub struct EventQueue(Mutex<VecDeque<InputEvent>>);

impl EventQueue {
    pub fn push(&self, event: InputEvent) {
        self.0.lock().unwrap().push_back(event);
    }

    pub fn pop(&self) -> Option<InputEvent> {
        self.0.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Everything device sampling needs for one tick.
pub struct TrackContext<'a> {
    pub session: &'a Session,
    pub stage: &'a Space,
    pub time: xr::Time,
    pub events: &'a EventQueue,
}

/// The authoritative, order-stable device collection the application polls.
/// Indices always form a dense `0..len` range; removal re-numbers every
/// device after the removed position.
#[derive(Default)]
pub struct DeviceManager {
    devices: Vec<Arc<Device>>,
    topology_changed: bool,
}

impl DeviceManager {
    pub fn add(&mut self, device: Arc<Device>) {
        device.set_index(self.devices.len());
        log::info!(
            "input device attached: {} ({})",
            device.id(),
            device.name()
        );
        self.devices.push(device);
        self.topology_changed = true;
    }

    pub fn remove(&mut self, device: &Arc<Device>) -> Result<(), XrError> {
        let index = self
            .devices
            .iter()
            .position(|d| Arc::ptr_eq(d, device))
            .ok_or(XrError::DeviceNotFound)?;
        log::info!("input device detached: {}", device.id());
        self.devices.remove(index);
        for (i, d) in self.devices.iter().enumerate().skip(index) {
            d.set_index(i);
        }
        self.topology_changed = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Device>> {
        self.devices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter()
    }

    pub fn index_of(&self, device: &Arc<Device>) -> Option<usize> {
        self.devices.iter().position(|d| Arc::ptr_eq(d, device))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.id() == id)
    }

    /// Samples pose, buttons and axes of every device in index order into
    /// the polling-safe snapshots. Call right after a successful action
    /// sync so the snapshot reflects this tick's state.
    pub fn track_device_states(&self, ctx: &TrackContext) {
        for device in &self.devices {
            device.track_state(ctx);
        }
    }

    /// Emits at most one coalesced topology event for all add/remove churn
    /// since the last call. Must run once per tick, after the attachment
    /// re-check pass has fully finished.
    pub fn check_notify_attached_detached(&mut self, events: &EventQueue) {
        if self.topology_changed {
            self.topology_changed = false;
            events.push(InputEvent::DevicesChanged);
        }
    }
}
