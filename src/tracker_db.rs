//! Persisted tracker identities.
//!
//! The runtime only reports tracker roles while a session is active, so
//! previously observed persistent-path/role assignments are stored on disk
//! to keep a tracker's number and role stable across application runs.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerRecord {
    /// Persistent path string, the stable serial of the physical unit.
    pub path: String,
    /// Last observed role path string; empty if never assigned.
    pub role: String,
    /// Stable per-unit number used in action names and device identifiers.
    pub number: u32,
}

/// Flat record store, loaded best-effort and saved after every change.
/// Without a backing file it degrades to an in-memory registry for the
/// lifetime of the process.
pub struct TrackerDb {
    file: Option<PathBuf>,
    records: Vec<TrackerRecord>,
}

impl TrackerDb {
    pub fn load(file: Option<PathBuf>) -> Self {
        let mut db = Self {
            file,
            records: Vec::new(),
        };
        let Some(path) = &db.file else {
            return db;
        };
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Vec<TrackerRecord>>(&contents) {
                Ok(records) => {
                    info!("loaded {} tracker records from {}", records.len(), path.display());
                    db.records = records;
                }
                Err(e) => warn!("ignoring malformed tracker database {}: {e}", path.display()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not read tracker database {}: {e}", path.display()),
        }
        db
    }

    pub fn records(&self) -> &[TrackerRecord] {
        &self.records
    }

    pub fn find(&self, path: &str) -> Option<&TrackerRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    fn next_number(&self) -> u32 {
        self.records.iter().map(|r| r.number + 1).max().unwrap_or(1)
    }

    /// Records a unit, updating its role if it already exists. Returns the
    /// unit's stable number.
    pub fn upsert(&mut self, path: &str, role: &str) -> u32 {
        if let Some(record) = self.records.iter_mut().find(|r| r.path == path) {
            let number = record.number;
            if record.role != role {
                record.role = role.to_owned();
                self.save();
            }
            return number;
        }
        let number = self.next_number();
        self.records.push(TrackerRecord {
            path: path.to_owned(),
            role: role.to_owned(),
            number,
        });
        self.save();
        number
    }

    fn save(&self) {
        let Some(path) = &self.file else {
            return;
        };
        let serialized = match serde_json::to_string_pretty(&self.records) {
            Ok(s) => s,
            Err(e) => {
                warn!("could not serialize tracker database: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(path, serialized) {
            warn!("could not write tracker database {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_assigns_stable_numbers() {
        let mut db = TrackerDb::load(None);
        let a = db.upsert("/trackers/aaa", "/user/vive_tracker_htcx/role/waist");
        let b = db.upsert("/trackers/bbb", "");
        assert_ne!(a, b);
        // Re-observing the same unit keeps its number, role change or not.
        assert_eq!(db.upsert("/trackers/aaa", "/user/vive_tracker_htcx/role/chest"), a);
        assert_eq!(db.find("/trackers/aaa").unwrap().role, "/user/vive_tracker_htcx/role/chest");
    }
}
