//! Serial-enumerated tracker pucks.
//!
//! Trackers are not path-matched like controllers: the runtime enumerates
//! connected units, each with a persistent path (its identity) and an
//! optional role. Bindings are per-unit actions named after the unit's
//! stable number, so a unit first seen mid-session cannot be bound until
//! the action set is rebuilt. First sight therefore records the unit and
//! requests a session restart instead of creating a device.

use super::{AttachContext, BindContext, Bindings, DeviceBuilder, DeviceProfile};
use crate::{
    action::{Action, ActionSet},
    error::{ResultExt, XrError},
    input::{
        device::{Device, DeviceType},
        DeviceManager,
    },
    instance::Instance,
    path::Path,
    runtime::{ActionKind, Hand},
    space::Space,
    tracker_db::TrackerDb,
    Config,
};
use openxr as xr;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

pub struct ViveTrackerProfile {
    path: Path,
    db: TrackerDb,
    /// Pose action per unit number, rebuilt on every action-set build from
    /// the records known at that time.
    actions: HashMap<u32, Arc<Action>>,
    /// Live devices keyed by persistent path string.
    devices: HashMap<String, Arc<Device>>,
}

impl ViveTrackerProfile {
    pub fn new(instance: &Arc<Instance>, config: &Config) -> Result<Self, XrError> {
        Ok(Self {
            path: instance.path("/interaction_profiles/htc/vive_tracker_htcx")?,
            db: TrackerDb::load(config.tracker_db_path.clone()),
            actions: HashMap::new(),
            devices: HashMap::new(),
        })
    }

    fn remove_devices(&mut self, devices: &mut DeviceManager) {
        for (_, device) in self.devices.drain() {
            let _ = devices.remove(&device);
        }
    }
}

impl DeviceProfile for ViveTrackerProfile {
    fn name(&self) -> &'static str {
        "Vive Tracker"
    }

    fn create_actions(
        &mut self,
        _instance: &Arc<Instance>,
        set: &mut ActionSet,
    ) -> Result<(), XrError> {
        for record in self.db.records() {
            if record.role.is_empty() {
                continue;
            }
            let action = set.add_action(
                ActionKind::PoseInput,
                &format!("tracker_pose_{}", record.number),
                &format!("Tracker Pose {}", record.number),
                &[],
            )?;
            self.actions.insert(record.number, action);
        }
        Ok(())
    }

    fn suggest_bindings(&self, ctx: &BindContext) -> Result<(), XrError> {
        let mut bindings = Bindings::new(ctx.instance);
        for record in self.db.records() {
            let Some(action) = self.actions.get(&record.number) else {
                continue;
            };
            bindings.add(action, &format!("{}/input/grip/pose", record.role))?;
        }
        let bindings = bindings.finish();
        if bindings.is_empty() {
            return Ok(());
        }
        ctx.instance.suggest_bindings(&self.path, &bindings)
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

        let connections = ctx
            .instance
            .runtime()
            .enumerate_vive_trackers()
            .or_xr("xrEnumerateViveTrackerPathsHTCX")?;

        let mut seen = HashSet::new();
        for connection in connections {
            let persistent = ctx.instance.path_from_handle(connection.persistent_path)?;
            let role = ctx.instance.path_from_handle(connection.role_path)?;
            seen.insert(persistent.name().to_owned());

            let known = self.db.find(persistent.name()).cloned();
            match known {
                None => {
                    // New unit: record it, bind on the next set build. A
                    // role-less unit cannot be bound yet, so no restart
                    // until the runtime assigns one.
                    self.db.upsert(persistent.name(), role.name());
                    if !role.is_empty() {
                        ctx.restart.request_for_unit(
                            persistent.name(),
                            &format!("new tracker {persistent}"),
                        );
                    }
                }
                Some(record) if record.role != role.name() => {
                    self.db.upsert(persistent.name(), role.name());
                    ctx.restart.request_for_unit(
                        persistent.name(),
                        &format!("tracker {persistent} changed role to {role}"),
                    );
                }
                Some(record) => {
                    let Some(action) = self.actions.get(&record.number) else {
                        continue;
                    };
                    if self.devices.contains_key(persistent.name()) {
                        continue;
                    }
                    let space = Space::action(
                        session.runtime().clone(),
                        session.handle(),
                        action,
                        &Path::empty(),
                        xr::Posef::IDENTITY,
                    )?;
                    let mut builder = DeviceBuilder::new(
                        ctx.instance,
                        session,
                        actions,
                        ctx.system,
                        Hand::Left,
                        DeviceType::Tracker,
                        format!("tracker{}", record.number),
                        format!("Vive Tracker {}", record.number),
                    );
                    builder.space(space).pose_action(action.clone());
                    let device = builder.build();
                    ctx.devices.add(device.clone());
                    self.devices.insert(persistent.name().to_owned(), device);
                }
            }
        }

        // Disconnected units lose their device immediately; the record stays
        // so reconnection is seamless.
        let gone: Vec<String> = self
            .devices
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();
        for path in gone {
            if let Some(device) = self.devices.remove(&path) {
                let _ = ctx.devices.remove(&device);
            }
        }
        Ok(())
    }

    fn clear_actions(&mut self, devices: &mut DeviceManager) {
        self.remove_devices(devices);
        self.actions.clear();
    }
}
