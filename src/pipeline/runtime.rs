use super::{Clock, Connectivity, Pipeline, Surface, SystemClock};
use crate::config::PipelineConfig;
use crate::feed::FeedEvent;
use crate::tracking::CameraCommand;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Drives a `Pipeline` from a feed channel and its periodic timers on a
/// single task. Every timer lives inside `run`, so returning tears them down.
pub struct Runtime<S: Surface, C: Clock = SystemClock> {
    pipeline: Pipeline<S>,
    clock: C,
    config: PipelineConfig,
}

impl<S: Surface> Runtime<S, SystemClock> {
    pub fn new(config: PipelineConfig, surface: S) -> Self {
        Self::with_clock(config, surface, SystemClock::new())
    }
}

impl<S: Surface, C: Clock> Runtime<S, C> {
    pub fn with_clock(config: PipelineConfig, surface: S, clock: C) -> Self {
        Self {
            pipeline: Pipeline::new(&config, surface),
            clock,
            config,
        }
    }

    pub fn pipeline(&self) -> &Pipeline<S> {
        &self.pipeline
    }

    pub async fn run<F>(
        mut self,
        mut feed: mpsc::Receiver<FeedEvent>,
        mut camera: Option<mpsc::Receiver<CameraCommand>>,
        shutdown: F,
    ) -> Pipeline<S>
    where
        F: Future<Output = ()>,
    {
        let millis = Duration::from_millis;
        let mut tick = interval(millis(self.config.scheduler.tick_interval_ms));
        let mut sweep = interval(millis(self.config.alerts.sweep_interval_ms));
        let mut camera_tick = interval(millis(self.config.animation.camera_tick_ms));
        let mut status = interval(millis(self.config.performance.status_interval_ms));
        for timer in [&mut tick, &mut sweep, &mut camera_tick, &mut status] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        tokio::pin!(shutdown);
        let mut feed_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                event = feed.recv(), if feed_open => match event {
                    Some(FeedEvent::Connected) => self.pipeline.set_connectivity(Connectivity::Connected),
                    Some(FeedEvent::Message(text)) => {
                        // Errors were already logged and counted at the boundary
                        let _ = self.pipeline.ingest_text(&text, self.clock.now_ms());
                    }
                    Some(FeedEvent::Disconnected(reason)) => {
                        log::debug!("Feed reported disconnect: {}", reason);
                        self.pipeline.set_connectivity(Connectivity::Lost);
                    }
                    None => {
                        log::info!("Feed channel closed; keeping last known state");
                        self.pipeline.set_connectivity(Connectivity::Lost);
                        feed_open = false;
                    }
                },
                command = next_command(&mut camera) => match command {
                    Some(command) => self.pipeline.camera_command(command, self.clock.now_ms()),
                    None => camera = None,
                },
                _ = tick.tick() => {
                    self.pipeline.tick(self.clock.now_ms());
                }
                _ = camera_tick.tick() => {
                    self.pipeline.camera_tick(self.clock.now_ms());
                }
                _ = sweep.tick() => {
                    self.pipeline.sweep(self.clock.now_ms());
                }
                _ = status.tick() => self.log_status(),
            }
        }

        self.pipeline
    }

    fn log_status(&self) {
        let performance = self.pipeline.performance();
        let counters = performance.counters;
        log::debug!(
            "{} vehicles ({} animating), {} active alerts, {:.1} ticks/s, tick {:.2}ms, detection {:.2}ms, {} msgs ok / {} dropped",
            self.pipeline.store().len(),
            self.pipeline.animator().active_count(),
            self.pipeline.alerts().len(),
            performance.ticks_per_second(),
            performance.average_tick_time().as_secs_f64() * 1000.0,
            performance.average_detection_time().as_secs_f64() * 1000.0,
            counters.messages_accepted,
            counters.messages_dropped,
        );
    }
}

async fn next_command(camera: &mut Option<mpsc::Receiver<CameraCommand>>) -> Option<CameraCommand> {
    match camera {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
