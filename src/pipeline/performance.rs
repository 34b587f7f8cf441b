use instant::Instant;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub tick_time: Duration,
    pub detection_time: Duration,
    pub tracked_vehicles: usize,
    pub animating_vehicles: usize,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            tick_time: Duration::ZERO,
            detection_time: Duration::ZERO,
            tracked_vehicles: 0,
            animating_vehicles: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub ticks: u64,
    pub messages_accepted: u64,
    pub messages_dropped: u64,
    pub proximity_findings: u64,
    pub intersection_findings: u64,
    pub alerts_raised: u64,
    pub alerts_retracted: u64,
}

#[derive(Debug)]
pub struct PerformanceTracker {
    samples: Vec<PerformanceMetrics>,
    max_samples: usize,
    current_tick_start: Option<Instant>,
    current_detection_start: Option<Instant>,
    pending_detection: Duration,
    first_tick: Option<Instant>,
    pub counters: Counters,
}

impl PerformanceTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            current_tick_start: None,
            current_detection_start: None,
            pending_detection: Duration::ZERO,
            first_tick: None,
            counters: Counters::default(),
        }
    }

    pub fn start_tick(&mut self) {
        let now = Instant::now();
        self.first_tick.get_or_insert(now);
        self.current_tick_start = Some(now);
        self.pending_detection = Duration::ZERO;
    }

    pub fn start_detection(&mut self) {
        self.current_detection_start = Some(Instant::now());
    }

    pub fn end_detection(&mut self) {
        if let Some(start) = self.current_detection_start.take() {
            self.pending_detection += start.elapsed();
        }
    }

    pub fn end_tick(&mut self, tracked_vehicles: usize, animating_vehicles: usize) {
        if let Some(start) = self.current_tick_start.take() {
            let metrics = PerformanceMetrics {
                tick_time: start.elapsed(),
                detection_time: self.pending_detection,
                tracked_vehicles,
                animating_vehicles,
            };

            if self.samples.len() >= self.max_samples {
                self.samples.remove(0);
            }
            self.samples.push(metrics);
            self.counters.ticks += 1;
        }
    }

    pub fn latest(&self) -> Option<&PerformanceMetrics> {
        self.samples.last()
    }

    pub fn average_tick_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.tick_time).sum();
        total / self.samples.len() as u32
    }

    pub fn average_detection_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.detection_time).sum();
        total / self.samples.len() as u32
    }

    /// Wall-clock tick rate since the first tick.
    pub fn ticks_per_second(&self) -> f32 {
        let Some(first) = self.first_tick else {
            return 0.0;
        };
        let elapsed = first.elapsed().as_secs_f32();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.counters.ticks as f32 / elapsed
    }
}
