use crate::config::PipelineConfig;
use crate::feed::{parse_message, FeedError, FeedMessage, FeedResult};
use crate::tracking::{
    AlertId, AlertManager, Animator, CameraAnimator, CameraCommand, EntityStore, Finding,
    IntersectionDetector, Millis, Position, ProximityDetector, Sequence, StoreChange,
};

pub mod clock;
pub mod performance;
pub mod surface;
#[cfg(feature = "async")]
pub mod runtime;

pub use clock::*;
pub use performance::*;
pub use surface::*;
#[cfg(feature = "async")]
pub use runtime::*;

/// What one feed message did to the tracked set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub created: usize,
    pub moved: usize,
    pub dropped: usize,
    pub alerts: Vec<AlertId>,
}

/// The reactive core: feed messages in, animated positions and alerts out.
///
/// Everything is driven through `&mut self` with an explicit `now`, so one
/// owner serializes all mutation and tests can step time by hand.
pub struct Pipeline<S: Surface> {
    store: EntityStore,
    animator: Animator,
    camera: CameraAnimator,
    proximity: ProximityDetector,
    intersection: Option<IntersectionDetector>,
    alerts: AlertManager,
    surface: S,
    performance: PerformanceTracker,
    stale_after_ms: Option<u64>,
    connectivity: Option<Connectivity>,
}

impl<S: Surface> Pipeline<S> {
    pub fn new(config: &PipelineConfig, surface: S) -> Self {
        Self::with_sequence(config, surface, Sequence::new())
    }

    pub fn with_sequence(config: &PipelineConfig, surface: S, sequence: Sequence) -> Self {
        let intersection = config.detection.intersections.then(IntersectionDetector::new);

        Self {
            store: EntityStore::new(),
            animator: Animator::new(config.animation.vehicle_duration_ms),
            camera: CameraAnimator::new(&config.animation),
            proximity: ProximityDetector::new(config.detection.proximity_threshold_m),
            intersection,
            alerts: AlertManager::new(config.alerts.ttl_ms, sequence),
            surface,
            performance: PerformanceTracker::new(config.performance.timing_samples as usize),
            stale_after_ms: config.scheduler.stale_after_ms,
            connectivity: None,
        }
    }

    /// Parses and applies one raw feed frame. Bad frames are logged, counted
    /// and dropped; the error is returned for inspection only.
    pub fn ingest_text(&mut self, text: &str, now: Millis) -> FeedResult<IngestOutcome> {
        match parse_message(text) {
            Ok(message) => Ok(self.handle_message(message, now)),
            Err(e) => {
                self.performance.counters.messages_dropped += 1;
                match &e {
                    FeedError::UnknownType(kind) => log::warn!("Ignoring feed message of unknown type '{}'", kind),
                    _ => log::error!("Dropping malformed feed message ({}): {}", e, text),
                }
                Err(e)
            }
        }
    }

    pub fn handle_message(&mut self, message: FeedMessage, now: Millis) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        match message {
            FeedMessage::Batch { kind, vehicles } => {
                let change = self.store.apply_batch(&vehicles, now);

                for id in &change.dropped {
                    self.animator.cancel(id);
                    self.surface.remove_vehicle(id);
                }
                for (id, from, to) in &change.moved {
                    self.animator.start(id, *from, *to, now);
                }

                log::debug!("Applied {} batch: {} created, {} moved, {} dropped",
                           kind.as_str(), change.created.len(), change.moved.len(), change.dropped.len());

                outcome.created = change.created.len();
                outcome.moved = change.moved.len();
                outcome.dropped = change.dropped.len();
            }
            FeedMessage::Single(report) => {
                match self.store.apply_update(&report, now) {
                    StoreChange::Created => outcome.created = 1,
                    StoreChange::Moved { from, to } => {
                        self.animator.start(&report.id, from, to, now);
                        outcome.moved = 1;
                    }
                }
            }
        }

        self.performance.counters.messages_accepted += 1;

        // Proximity is checked once per settled update, on reported positions
        let findings = self.proximity.evaluate(&self.store, now);
        self.performance.counters.proximity_findings += findings.len() as u64;
        for finding in findings {
            outcome.alerts.push(self.raise(finding.into(), now));
        }

        outcome
    }

    /// One scheduler pass: advance animations, check path crossings, render.
    pub fn tick(&mut self, now: Millis) -> usize {
        self.performance.start_tick();

        let steps = self.animator.tick(&mut self.store, now);

        if let Some(detector) = &self.intersection {
            self.performance.start_detection();
            let findings: Vec<_> = steps.iter()
                .flat_map(|step| detector.evaluate(step, &self.store, now))
                .collect();
            self.performance.end_detection();

            self.performance.counters.intersection_findings += findings.len() as u64;
            for finding in findings {
                self.raise(finding.into(), now);
            }
        }

        for vehicle in self.store.iter() {
            self.surface.render_vehicle(&vehicle.id, vehicle.displayed);
        }

        self.performance.end_tick(self.store.len(), self.animator.active_count());
        steps.len()
    }

    /// Periodic housekeeping: expire alerts and, when configured, evict
    /// vehicles the feed has gone quiet on.
    pub fn sweep(&mut self, now: Millis) -> usize {
        let expired = self.alerts.sweep_expired(now);
        for alert in &expired {
            self.surface.retract_alert(alert.id);
        }
        self.performance.counters.alerts_retracted += expired.len() as u64;

        if let Some(max_age) = self.stale_after_ms {
            for id in self.store.stale_ids(now, max_age) {
                log::info!("Evicting vehicle {} after {}ms without updates", id, max_age);
                self.store.remove(&id);
                self.animator.cancel(&id);
                self.surface.remove_vehicle(&id);
            }
        }

        expired.len()
    }

    pub fn dismiss(&mut self, id: AlertId) -> bool {
        match self.alerts.dismiss(id) {
            Some(_) => {
                self.surface.retract_alert(id);
                self.performance.counters.alerts_retracted += 1;
                true
            }
            None => false,
        }
    }

    pub fn camera_command(&mut self, command: CameraCommand, now: Millis) {
        self.camera.apply(command, now);
    }

    /// Camera domain tick; scheduled independently of `tick`.
    pub fn camera_tick(&mut self, now: Millis) -> Position {
        let moving = self.camera.is_moving() || self.camera.is_held();
        let position = self.camera.tick(now);
        if moving {
            self.surface.render_camera(position);
        }
        position
    }

    pub fn set_connectivity(&mut self, state: Connectivity) {
        if self.connectivity != Some(state) {
            self.connectivity = Some(state);
            self.surface.connectivity_changed(state);
        }
    }

    fn raise(&mut self, finding: Finding, now: Millis) -> AlertId {
        let alert = self.alerts.raise(finding, now);
        self.surface.present_alert(&alert);
        self.performance.counters.alerts_raised += 1;
        alert.id
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn camera(&self) -> &CameraAnimator {
        &self.camera
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn connectivity(&self) -> Option<Connectivity> {
        self.connectivity
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}
