//! Runtime-enumerated external devices ("xdevs") with their own spaces.
//!
//! Unlike vive-style trackers these need no binding table: the runtime
//! hands out a ready-made space per device, so hotplug works without an
//! action-set rebuild.

use super::{AttachContext, DeviceBuilder, DeviceProfile};
use crate::{
    error::{ResultExt, XrError},
    input::{
        device::{Device, DeviceType},
        DeviceManager,
    },
    runtime::Hand,
    space::Space,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Owned devices keyed by serial. Enumeration ids are scoped to one
/// listing generation and can change between calls for the same physical
/// unit; the serial is the stable identity.
pub struct XdevTrackerProfile {
    devices: HashMap<String, Arc<Device>>,
}

impl XdevTrackerProfile {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    fn remove_devices(&mut self, devices: &mut DeviceManager) {
        for (_, device) in self.devices.drain() {
            let _ = devices.remove(&device);
        }
    }
}

impl Default for XdevTrackerProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProfile for XdevTrackerProfile {
    fn name(&self) -> &'static str {
        "External Device"
    }

    fn check_attached(&mut self, ctx: &mut AttachContext) -> Result<(), XrError> {
        let (Some(session), Some(actions)) = (ctx.session, ctx.actions) else {
            self.remove_devices(ctx.devices);
            return Ok(());
        };
        if !session.is_attached() || !session.is_running() {
            self.remove_devices(ctx.devices);
            return Ok(());
        }

        let infos = ctx
            .instance
            .runtime()
            .enumerate_xdevs(session.handle())
            .or_xr("xrEnumerateXDevsMNDX")?;

        let mut seen = HashSet::new();
        for info in infos {
            if !info.can_create_space {
                continue;
            }
            seen.insert(info.serial.clone());
            if self.devices.contains_key(&info.serial) {
                continue;
            }
            let handle = ctx
                .instance
                .runtime()
                .create_xdev_space(session.handle(), info.id)
                .or_xr("xrCreateXDevSpaceMNDX")?;
            let space = Space::from_handle(session.runtime().clone(), handle);
            let mut builder = DeviceBuilder::new(
                ctx.instance,
                session,
                actions,
                ctx.system,
                Hand::Left,
                DeviceType::Tracker,
                format!("xdev_{}", info.serial),
                info.name.clone(),
            );
            builder.space(space);
            let device = builder.build();
            ctx.devices.add(device.clone());
            self.devices.insert(info.serial, device);
        }

        let gone: Vec<String> = self
            .devices
            .keys()
            .filter(|serial| !seen.contains(*serial))
            .cloned()
            .collect();
        for serial in gone {
            if let Some(device) = self.devices.remove(&serial) {
                let _ = ctx.devices.remove(&device);
            }
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        self.remove_devices(devices);
    }
}
