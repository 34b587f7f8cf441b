use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::collections::HashSet;
use super::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FeedConfig {
    pub feed: FeedSource,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_request_on_connect")]
    pub request_on_connect: bool,
    // Absent means the client gives up after the first disconnect
    #[serde(default)]
    pub reconnect_delay_ms: Option<u64>,
}

fn default_request_on_connect() -> bool {
    true
}

impl Default for FeedSource {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            url: "ws://localhost:8765".to_string(),
            request_on_connect: true,
            reconnect_delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    pub seed: Option<u64>,
    pub update_interval_ms: u64,
    pub duration_secs: f64,
    #[serde(default)]
    pub jitter_meters: f64,
    #[serde(default)]
    pub vehicles: Vec<SimVehicle>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            update_interval_ms: 3000,
            duration_secs: 60.0,
            jitter_meters: 0.0,
            vehicles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimVehicle {
    pub id: String,
    pub start: [f64; 2],
    pub waypoints: Vec<[f64; 2]>,
}

fn check_coordinate(label: &str, [lat, lon]: [f64; 2]) -> Result<()> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(anyhow!("{} has a non-finite coordinate", label));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(anyhow!("{} ({}, {}) is outside valid latitude/longitude ranges", label, lat, lon));
    }
    Ok(())
}

impl Validate for FeedConfig {
    fn validate(&self) -> Result<()> {
        let feed = &self.feed;
        if !feed.url.starts_with("ws://") && !feed.url.starts_with("wss://") {
            return Err(anyhow!("Feed url must use ws:// or wss://, got '{}'", feed.url));
        }

        if feed.reconnect_delay_ms == Some(0) {
            return Err(anyhow!("Reconnect delay must be positive when set"));
        }

        let sim = &self.simulator;
        if sim.update_interval_ms == 0 {
            return Err(anyhow!("Simulator update interval must be positive"));
        }

        if sim.duration_secs <= 0.0 {
            return Err(anyhow!("Simulator duration must be positive"));
        }

        if sim.jitter_meters < 0.0 {
            return Err(anyhow!("Simulator jitter must be non-negative"));
        }

        let mut seen = HashSet::new();
        for vehicle in &sim.vehicles {
            if !seen.insert(vehicle.id.as_str()) {
                return Err(anyhow!("Simulated vehicle '{}' is defined twice", vehicle.id));
            }
            check_coordinate(&format!("Start of vehicle '{}'", vehicle.id), vehicle.start)?;
            for (i, waypoint) in vehicle.waypoints.iter().enumerate() {
                check_coordinate(&format!("Waypoint {} of vehicle '{}'", i, vehicle.id), *waypoint)?;
            }
        }

        Ok(())
    }
}
