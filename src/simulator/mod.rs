use crate::config::SimulatorConfig;
use crate::feed::{BatchKind, FeedMessage};
use crate::tracking::{offset_meters, position, Position, VehicleId, VehicleReport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct SimRoute {
    id: VehicleId,
    start: Position,
    waypoints: Vec<Position>,
    next_index: usize,
}

impl SimRoute {
    fn advance(&mut self) -> Option<Position> {
        let waypoint = *self.waypoints.get(self.next_index)?;
        self.next_index = (self.next_index + 1) % self.waypoints.len();
        Some(waypoint)
    }
}

/// Stand-in feed server: vehicles hop along cyclic waypoint lists, one
/// randomly chosen vehicle per step.
pub struct FeedSimulator {
    routes: Vec<SimRoute>,
    current: BTreeMap<VehicleId, Position>,
    rng: StdRng,
    jitter: Option<Normal<f64>>,
    steps: u64,
}

impl FeedSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        let rng = if let Some(seed) = config.seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let jitter = if config.jitter_meters > 0.0 {
            Normal::new(0.0, config.jitter_meters).ok()
        } else {
            None
        };

        let routes = config.vehicles.iter()
            .map(|v| SimRoute {
                id: VehicleId::new(v.id.clone()),
                start: position(v.start[0], v.start[1]),
                waypoints: v.waypoints.iter().map(|w| position(w[0], w[1])).collect(),
                next_index: 0,
            })
            .collect();

        Self {
            routes,
            current: BTreeMap::new(),
            rng,
            jitter,
            steps: 0,
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.routes.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The resync a freshly connected client receives.
    pub fn initial_state(&mut self) -> FeedMessage {
        let starts: Vec<(VehicleId, Position)> = self.routes.iter()
            .map(|route| (route.id.clone(), route.start))
            .collect();
        let vehicles = starts.into_iter()
            .map(|(id, start)| self.report(id, start))
            .collect();

        FeedMessage::Batch {
            kind: BatchKind::InitialState,
            vehicles,
        }
    }

    /// Moves one random vehicle to its next waypoint and returns single
    /// updates for every vehicle that has moved so far.
    pub fn step(&mut self) -> Vec<FeedMessage> {
        if self.routes.is_empty() {
            return Vec::new();
        }

        let index = self.rng.gen_range(0..self.routes.len());
        let route = &mut self.routes[index];
        if let Some(waypoint) = route.advance() {
            log::debug!("Simulated vehicle {} heading to ({:.6}, {:.6})", route.id, waypoint.x, waypoint.y);
            self.current.insert(route.id.clone(), waypoint);
        }
        self.steps += 1;

        let current: Vec<(VehicleId, Position)> = self.current.iter()
            .map(|(id, p)| (id.clone(), *p))
            .collect();
        current.into_iter()
            .map(|(id, p)| FeedMessage::Single(self.report(id, p)))
            .collect()
    }

    fn report(&mut self, id: VehicleId, at: Position) -> VehicleReport {
        let at = match &self.jitter {
            Some(normal) => {
                let north = normal.sample(&mut self.rng);
                let east = normal.sample(&mut self.rng);
                offset_meters(at, north, east)
            }
            None => at,
        };

        VehicleReport {
            id,
            position: at,
            timestamp: Some(format!("sim+{}", self.steps)),
        }
    }
}
