use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod geometry;
pub mod animator;
pub mod camera;
pub mod detection;
pub mod alerts;

pub use geometry::*;
pub use animator::*;
pub use camera::*;
pub use detection::*;
pub use alerts::*;

/// Latitude in `x`, longitude in `y`, both in degrees.
pub type Position = Point2<f64>;

/// Milliseconds on the pipeline clock.
pub type Millis = u64;

pub fn position(lat: f64, lon: f64) -> Position {
    Point2::new(lat, lon)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        VehicleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        VehicleId(id.to_string())
    }
}

/// One vehicle as reported by the feed, before it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleReport {
    pub id: VehicleId,
    pub position: Position,
    pub timestamp: Option<String>,
}

impl VehicleReport {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: VehicleId::new(id),
            position,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub last_known: Position,
    pub displayed: Position,
    pub timestamp: Option<String>,
    pub updated_at: Millis, // Local receipt time of the last report
}

impl Vehicle {
    /// Segment from the last reported position to where the vehicle is drawn.
    pub fn trail(&self) -> (Position, Position) {
        (self.last_known, self.displayed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreChange {
    Created,
    Moved { from: Position, to: Position },
}

#[derive(Debug, Clone, Default)]
pub struct BatchChange {
    pub created: Vec<VehicleId>,
    pub moved: Vec<(VehicleId, Position, Position)>,
    pub dropped: Vec<VehicleId>,
}

/// Authoritative vehicle table. `displayed` is only written by the animator.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    vehicles: BTreeMap<VehicleId, Vehicle>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_update(&mut self, report: &VehicleReport, now: Millis) -> StoreChange {
        match self.vehicles.get_mut(&report.id) {
            Some(vehicle) => {
                vehicle.last_known = report.position;
                vehicle.timestamp = report.timestamp.clone();
                vehicle.updated_at = now;
                StoreChange::Moved {
                    from: vehicle.displayed,
                    to: report.position,
                }
            }
            None => {
                log::debug!("Tracking new vehicle {} at ({:.6}, {:.6})",
                           report.id, report.position.x, report.position.y);
                self.vehicles.insert(report.id.clone(), Vehicle {
                    id: report.id.clone(),
                    last_known: report.position,
                    displayed: report.position,
                    timestamp: report.timestamp.clone(),
                    updated_at: now,
                });
                StoreChange::Created
            }
        }
    }

    /// Full resync: vehicles missing from `reports` are dropped.
    pub fn apply_batch(&mut self, reports: &[VehicleReport], now: Millis) -> BatchChange {
        let mut change = BatchChange::default();

        let keep: std::collections::HashSet<&VehicleId> = reports.iter().map(|r| &r.id).collect();
        change.dropped = self.vehicles.keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in &change.dropped {
            self.vehicles.remove(id);
        }

        for report in reports {
            match self.apply_update(report, now) {
                StoreChange::Created => change.created.push(report.id.clone()),
                StoreChange::Moved { from, to } => change.moved.push((report.id.clone(), from, to)),
            }
        }

        change
    }

    pub(crate) fn set_displayed(&mut self, id: &VehicleId, displayed: Position) -> Option<Position> {
        self.vehicles.get_mut(id).map(|vehicle| {
            std::mem::replace(&mut vehicle.displayed, displayed)
        })
    }

    pub fn remove(&mut self, id: &VehicleId) -> Option<Vehicle> {
        self.vehicles.remove(id)
    }

    pub fn get(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.vehicles.contains_key(id)
    }

    /// Vehicles in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn stale_ids(&self, now: Millis, max_age_ms: u64) -> Vec<VehicleId> {
        self.vehicles.values()
            .filter(|v| now.saturating_sub(v.updated_at) > max_age_ms)
            .map(|v| v.id.clone())
            .collect()
    }
}
