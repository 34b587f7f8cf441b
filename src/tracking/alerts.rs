use super::{Finding, Millis};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out strictly increasing alert ids for the life of the process.
#[derive(Debug, Clone)]
pub struct Sequence {
    next: u64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> AlertId {
        let id = AlertId(self.next);
        self.next += 1;
        id
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    pub created_at: Millis,
    pub finding: Finding,
}

impl Alert {
    pub fn age(&self, now: Millis) -> u64 {
        now.saturating_sub(self.created_at)
    }
}

pub fn describe(finding: &Finding) -> String {
    match finding {
        Finding::Proximity(f) => format!(
            "Vehicles {} and {} are within {}m of each other",
            f.pair.0, f.pair.1, f.distance_m.round()
        ),
        Finding::Intersection(f) => format!(
            "Path of vehicle {} intersects with vehicle {}",
            f.mover, f.other
        ),
    }
}

/// Active alert set. Repeated findings for the same pair raise repeated alerts.
#[derive(Debug, Clone)]
pub struct AlertManager {
    alerts: BTreeMap<AlertId, Alert>,
    sequence: Sequence,
    ttl_ms: u64,
}

impl AlertManager {
    pub fn new(ttl_ms: u64, sequence: Sequence) -> Self {
        Self {
            alerts: BTreeMap::new(),
            sequence,
            ttl_ms,
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn raise(&mut self, finding: Finding, now: Millis) -> Alert {
        let alert = Alert {
            id: self.sequence.next_id(),
            message: describe(&finding),
            created_at: now,
            finding,
        };
        log::info!("Alert {} raised: {}", alert.id, alert.message);
        self.alerts.insert(alert.id, alert.clone());
        alert
    }

    /// Unknown or already-dismissed ids are ignored.
    pub fn dismiss(&mut self, id: AlertId) -> Option<Alert> {
        let removed = self.alerts.remove(&id);
        if removed.is_some() {
            log::debug!("Alert {} dismissed", id);
        }
        removed
    }

    /// Removes every alert that has lived at least the TTL.
    pub fn sweep_expired(&mut self, now: Millis) -> Vec<Alert> {
        let ttl = self.ttl_ms;
        let expired: Vec<AlertId> = self.alerts.values()
            .filter(|alert| alert.age(now) >= ttl)
            .map(|alert| alert.id)
            .collect();

        let removed: Vec<Alert> = expired.iter()
            .filter_map(|id| self.alerts.remove(id))
            .collect();

        if !removed.is_empty() {
            log::debug!("Expired {} alert(s), {} still active", removed.len(), self.alerts.len());
        }
        removed
    }

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.get(&id)
    }

    /// Active alerts, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
