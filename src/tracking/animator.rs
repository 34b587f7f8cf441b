use super::{EntityStore, Millis, Position, VehicleId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    QuadInOut,
}

impl Easing {
    pub fn apply(self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Easing::Linear => p,
            Easing::QuadInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Position between `start` and `target` after easing `progress`.
///
/// Progress at or beyond 1 returns `target` bit-for-bit.
pub fn interpolate(start: Position, target: Position, progress: f64, easing: Easing) -> Position {
    if progress >= 1.0 {
        return target;
    }
    let eased = easing.apply(progress);
    Position::from(start.coords.lerp(&target.coords, eased))
}

#[derive(Debug, Clone)]
pub struct AnimationTask {
    pub start: Position,
    pub target: Position,
    pub started_at: Millis,
    pub duration_ms: u64,
    pub easing: Easing,
    pub generation: u64,
}

impl AnimationTask {
    pub fn progress(&self, now: Millis) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started_at) as f64;
        (elapsed / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    pub fn position_at(&self, now: Millis) -> Position {
        interpolate(self.start, self.target, self.progress(now), self.easing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub vehicle: VehicleId,
    pub generation: u64,
}

/// One tick of movement for one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStep {
    pub vehicle: VehicleId,
    pub from: Position,
    pub to: Position,
    pub finished: bool,
}

/// Feed-driven vehicle motion. One task per vehicle, advanced by `tick`.
#[derive(Debug, Clone)]
pub struct Animator {
    tasks: BTreeMap<VehicleId, AnimationTask>,
    duration_ms: u64,
    easing: Easing,
    next_generation: u64,
}

impl Animator {
    pub fn new(duration_ms: u64) -> Self {
        Self::with_easing(duration_ms, Easing::QuadInOut)
    }

    pub fn with_easing(duration_ms: u64, easing: Easing) -> Self {
        Self {
            tasks: BTreeMap::new(),
            duration_ms,
            easing,
            next_generation: 1,
        }
    }

    /// Starts moving `id` from `from` toward `target`, replacing any running task.
    pub fn start(&mut self, id: &VehicleId, from: Position, target: Position, now: Millis) -> TaskHandle {
        let generation = self.next_generation;
        self.next_generation += 1;

        let task = AnimationTask {
            start: from,
            target,
            started_at: now,
            duration_ms: self.duration_ms,
            easing: self.easing,
            generation,
        };

        if let Some(previous) = self.tasks.insert(id.clone(), task) {
            log::debug!("Vehicle {} retargeted mid-animation (task {} superseded by {})",
                       id, previous.generation, generation);
        }

        TaskHandle {
            vehicle: id.clone(),
            generation,
        }
    }

    pub fn cancel(&mut self, id: &VehicleId) -> bool {
        self.tasks.remove(id).is_some()
    }

    pub fn is_animating(&self, id: &VehicleId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn is_current(&self, handle: &TaskHandle) -> bool {
        self.tasks.get(&handle.vehicle)
            .map_or(false, |task| task.generation == handle.generation)
    }

    pub fn task(&self, id: &VehicleId) -> Option<&AnimationTask> {
        self.tasks.get(id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Advances every active task and writes the new displayed positions.
    pub fn tick(&mut self, store: &mut EntityStore, now: Millis) -> Vec<AnimationStep> {
        let mut steps = Vec::with_capacity(self.tasks.len());
        let mut finished = Vec::new();

        for (id, task) in &self.tasks {
            let progress = task.progress(now);
            let next = interpolate(task.start, task.target, progress, task.easing);

            let Some(previous) = store.set_displayed(id, next) else {
                // Vehicle left the store while animating
                finished.push(id.clone());
                continue;
            };

            let done = progress >= 1.0;
            if done {
                finished.push(id.clone());
            }

            steps.push(AnimationStep {
                vehicle: id.clone(),
                from: previous,
                to: next,
                finished: done,
            });
        }

        for id in finished {
            self.tasks.remove(&id);
        }

        steps
    }
}
