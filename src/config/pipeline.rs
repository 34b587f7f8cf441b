use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub animation: AnimationParams,
    #[serde(default)]
    pub detection: DetectionParams,
    #[serde(default)]
    pub alerts: AlertParams,
    #[serde(default)]
    pub scheduler: SchedulerParams,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationParams {
    pub vehicle_duration_ms: u64,
    pub camera_duration_ms: u64,
    pub camera_repeat_ms: u64,
    pub camera_step_degrees: f64,
    pub camera_tick_ms: u64,
    pub camera_center: [f64; 2],
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            vehicle_duration_ms: 6000, // Matches the feed update interval
            camera_duration_ms: 200,
            camera_repeat_ms: 50,
            camera_step_degrees: 0.0001,
            camera_tick_ms: 16,
            camera_center: [13.132742830091999, 77.56889104945668],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionParams {
    pub proximity_threshold_m: f64,
    pub intersections: bool,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 50.0,
            intersections: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertParams {
    pub ttl_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for AlertParams {
    fn default() -> Self {
        Self {
            ttl_ms: 5000,
            sweep_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerParams {
    pub tick_interval_ms: u64,
    // Vehicles are only evicted by a batch resync unless this is set
    #[serde(default)]
    pub stale_after_ms: Option<u64>,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            stale_after_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    pub timing_samples: u32,
    pub status_interval_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            timing_samples: 120,
            status_interval_ms: 1000,
        }
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        let animation = &self.animation;
        if animation.vehicle_duration_ms == 0 || animation.camera_duration_ms == 0 {
            return Err(anyhow!("Animation durations must be positive"));
        }

        if animation.camera_repeat_ms == 0 || animation.camera_tick_ms == 0 {
            return Err(anyhow!("Camera repeat and tick intervals must be positive"));
        }

        if !animation.camera_step_degrees.is_finite() || animation.camera_step_degrees <= 0.0 {
            return Err(anyhow!("Camera step must be a positive number of degrees"));
        }

        let [lat, lon] = animation.camera_center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(anyhow!("Camera center ({}, {}) is outside valid latitude/longitude ranges", lat, lon));
        }

        let detection = &self.detection;
        if !detection.proximity_threshold_m.is_finite() || detection.proximity_threshold_m <= 0.0 {
            return Err(anyhow!("Proximity threshold must be positive"));
        }

        let alerts = &self.alerts;
        if alerts.ttl_ms == 0 || alerts.sweep_interval_ms == 0 {
            return Err(anyhow!("Alert TTL and sweep interval must be positive"));
        }

        let scheduler = &self.scheduler;
        if scheduler.tick_interval_ms == 0 {
            return Err(anyhow!("Tick interval must be positive"));
        }

        if scheduler.stale_after_ms == Some(0) {
            return Err(anyhow!("Staleness threshold must be positive when set"));
        }

        if self.performance.timing_samples == 0 {
            return Err(anyhow!("Timing samples must be greater than zero"));
        }

        if self.performance.status_interval_ms == 0 {
            return Err(anyhow!("Status interval must be positive"));
        }

        Ok(())
    }
}
