use super::{distance_meters, segments_intersect, AnimationStep, EntityStore, Millis, Position, VehicleId};

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityFinding {
    /// Ascending id order; the pair is unordered.
    pub pair: (VehicleId, VehicleId),
    pub distance_m: f64,
    pub detected_at: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionFinding {
    pub mover: VehicleId,
    pub other: VehicleId,
    pub mover_segment: (Position, Position),
    pub other_segment: (Position, Position),
    pub detected_at: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Proximity(ProximityFinding),
    Intersection(IntersectionFinding),
}

impl Finding {
    pub fn vehicles(&self) -> (&VehicleId, &VehicleId) {
        match self {
            Finding::Proximity(f) => (&f.pair.0, &f.pair.1),
            Finding::Intersection(f) => (&f.mover, &f.other),
        }
    }

    pub fn detected_at(&self) -> Millis {
        match self {
            Finding::Proximity(f) => f.detected_at,
            Finding::Intersection(f) => f.detected_at,
        }
    }
}

impl From<ProximityFinding> for Finding {
    fn from(finding: ProximityFinding) -> Self {
        Finding::Proximity(finding)
    }
}

impl From<IntersectionFinding> for Finding {
    fn from(finding: IntersectionFinding) -> Self {
        Finding::Intersection(finding)
    }
}

/// Pairwise distance check over last reported positions.
///
/// Quadratic in the number of tracked vehicles. Fleets of tens of vehicles
/// are the expected load; there is no spatial index.
#[derive(Debug, Clone)]
pub struct ProximityDetector {
    threshold_m: f64,
}

impl ProximityDetector {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn evaluate(&self, store: &EntityStore, now: Millis) -> Vec<ProximityFinding> {
        let vehicles: Vec<_> = store.iter().collect();
        let mut findings = Vec::new();

        for (i, first) in vehicles.iter().enumerate() {
            for second in &vehicles[i + 1..] {
                let distance = distance_meters(first.last_known, second.last_known);
                if distance < self.threshold_m {
                    log::debug!("Vehicles {} and {} are {:.1}m apart (threshold {:.1}m)",
                               first.id, second.id, distance, self.threshold_m);
                    findings.push(ProximityFinding {
                        pair: (first.id.clone(), second.id.clone()),
                        distance_m: distance,
                        detected_at: now,
                    });
                }
            }
        }

        findings
    }
}

/// Tests one vehicle's latest micro-segment against every other vehicle's
/// trail (last reported position to displayed position).
#[derive(Debug, Clone, Default)]
pub struct IntersectionDetector;

impl IntersectionDetector {
    pub fn new() -> Self {
        IntersectionDetector
    }

    pub fn evaluate(&self, step: &AnimationStep, store: &EntityStore, now: Millis) -> Vec<IntersectionFinding> {
        let mut findings = Vec::new();

        for other in store.iter() {
            if other.id == step.vehicle {
                continue;
            }

            let (start, end) = other.trail();
            if segments_intersect(step.from, step.to, start, end) {
                log::debug!("Path of vehicle {} crosses vehicle {}", step.vehicle, other.id);
                findings.push(IntersectionFinding {
                    mover: step.vehicle.clone(),
                    other: other.id.clone(),
                    mover_segment: (step.from, step.to),
                    other_segment: (start, end),
                    detected_at: now,
                });
            }
        }

        findings
    }
}
