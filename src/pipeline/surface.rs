use crate::tracking::{Alert, AlertId, Finding, Position, VehicleId};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Connected,
    Lost,
}

/// Where the pipeline's output goes: vehicle markers and operator alerts.
pub trait Surface {
    fn render_vehicle(&mut self, id: &VehicleId, position: Position);
    fn present_alert(&mut self, alert: &Alert);
    fn retract_alert(&mut self, id: AlertId);

    fn remove_vehicle(&mut self, _id: &VehicleId) {}
    fn render_camera(&mut self, _position: Position) {}
    fn connectivity_changed(&mut self, _state: Connectivity) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Vehicle { id: String, position: [f64; 2] },
    VehicleRemoved { id: String },
    Alert { id: u64, kind: &'static str, vehicles: [String; 2], message: String, created_at: u64 },
    AlertRetracted { id: u64 },
    Camera { position: [f64; 2] },
    Connectivity { state: Connectivity },
}

impl SurfaceEvent {
    fn alert(alert: &Alert) -> Self {
        let kind = match alert.finding {
            Finding::Proximity(_) => "proximity",
            Finding::Intersection(_) => "intersection",
        };
        let (first, second) = alert.finding.vehicles();
        SurfaceEvent::Alert {
            id: alert.id.0,
            kind,
            vehicles: [first.to_string(), second.to_string()],
            message: alert.message.clone(),
            created_at: alert.created_at,
        }
    }
}

/// Keeps every event in memory. Used by tests and the offline simulator.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &SurfaceEvent> {
        self.events.iter().filter(|e| matches!(e, SurfaceEvent::Alert { .. }))
    }

    pub fn retracted(&self) -> Vec<u64> {
        self.events.iter()
            .filter_map(|e| match e {
                SurfaceEvent::AlertRetracted { id } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Rendered positions of one vehicle, in order.
    pub fn track(&self, id: &str) -> Vec<[f64; 2]> {
        self.events.iter()
            .filter_map(|e| match e {
                SurfaceEvent::Vehicle { id: vid, position } if vid == id => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Surface for RecordingSurface {
    fn render_vehicle(&mut self, id: &VehicleId, position: Position) {
        self.events.push(SurfaceEvent::Vehicle { id: id.to_string(), position: [position.x, position.y] });
    }

    fn present_alert(&mut self, alert: &Alert) {
        self.events.push(SurfaceEvent::alert(alert));
    }

    fn retract_alert(&mut self, id: AlertId) {
        self.events.push(SurfaceEvent::AlertRetracted { id: id.0 });
    }

    fn remove_vehicle(&mut self, id: &VehicleId) {
        self.events.push(SurfaceEvent::VehicleRemoved { id: id.to_string() });
    }

    fn render_camera(&mut self, position: Position) {
        self.events.push(SurfaceEvent::Camera { position: [position.x, position.y] });
    }

    fn connectivity_changed(&mut self, state: Connectivity) {
        self.events.push(SurfaceEvent::Connectivity { state });
    }
}

/// Writes alerts and connectivity through the `log` facade; vehicle frames
/// only at trace level.
#[derive(Debug, Clone, Default)]
pub struct LogSurface;

impl Surface for LogSurface {
    fn render_vehicle(&mut self, id: &VehicleId, position: Position) {
        log::trace!("vehicle {} at ({:.6}, {:.6})", id, position.x, position.y);
    }

    fn present_alert(&mut self, alert: &Alert) {
        log::warn!("ALERT {}: {}", alert.id, alert.message);
    }

    fn retract_alert(&mut self, id: AlertId) {
        log::info!("Alert {} cleared", id);
    }

    fn remove_vehicle(&mut self, id: &VehicleId) {
        log::info!("Vehicle {} no longer tracked", id);
    }

    fn render_camera(&mut self, position: Position) {
        log::debug!("camera at ({:.6}, {:.6})", position.x, position.y);
    }

    fn connectivity_changed(&mut self, state: Connectivity) {
        match state {
            Connectivity::Connected => log::info!("Feed connected"),
            Connectivity::Lost => log::warn!("Feed connectivity lost"),
        }
    }
}

/// One JSON object per line, for a downstream UI process.
pub struct JsonSurface<W: Write> {
    out: W,
}

impl<W: Write> JsonSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: SurfaceEvent) {
        let result = serde_json::to_writer(&mut self.out, &event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = result {
            log::error!("Failed to write surface event: {}", e);
        }
    }
}

impl JsonSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Surface for JsonSurface<W> {
    fn render_vehicle(&mut self, id: &VehicleId, position: Position) {
        self.emit(SurfaceEvent::Vehicle { id: id.to_string(), position: [position.x, position.y] });
    }

    fn present_alert(&mut self, alert: &Alert) {
        self.emit(SurfaceEvent::alert(alert));
    }

    fn retract_alert(&mut self, id: AlertId) {
        self.emit(SurfaceEvent::AlertRetracted { id: id.0 });
    }

    fn remove_vehicle(&mut self, id: &VehicleId) {
        self.emit(SurfaceEvent::VehicleRemoved { id: id.to_string() });
    }

    fn render_camera(&mut self, position: Position) {
        self.emit(SurfaceEvent::Camera { position: [position.x, position.y] });
    }

    fn connectivity_changed(&mut self, state: Connectivity) {
        self.emit(SurfaceEvent::Connectivity { state });
    }
}

/// Surface chosen at startup.
pub enum OutputSurface {
    Log(LogSurface),
    Json(JsonSurface<std::io::Stdout>),
    Recording(RecordingSurface),
}

impl Surface for OutputSurface {
    fn render_vehicle(&mut self, id: &VehicleId, position: Position) {
        match self {
            OutputSurface::Log(surface) => surface.render_vehicle(id, position),
            OutputSurface::Json(surface) => surface.render_vehicle(id, position),
            OutputSurface::Recording(surface) => surface.render_vehicle(id, position),
        }
    }

    fn present_alert(&mut self, alert: &Alert) {
        match self {
            OutputSurface::Log(surface) => surface.present_alert(alert),
            OutputSurface::Json(surface) => surface.present_alert(alert),
            OutputSurface::Recording(surface) => surface.present_alert(alert),
        }
    }

    fn retract_alert(&mut self, id: AlertId) {
        match self {
            OutputSurface::Log(surface) => surface.retract_alert(id),
            OutputSurface::Json(surface) => surface.retract_alert(id),
            OutputSurface::Recording(surface) => surface.retract_alert(id),
        }
    }

    fn remove_vehicle(&mut self, id: &VehicleId) {
        match self {
            OutputSurface::Log(surface) => surface.remove_vehicle(id),
            OutputSurface::Json(surface) => surface.remove_vehicle(id),
            OutputSurface::Recording(surface) => surface.remove_vehicle(id),
        }
    }

    fn render_camera(&mut self, position: Position) {
        match self {
            OutputSurface::Log(surface) => surface.render_camera(position),
            OutputSurface::Json(surface) => surface.render_camera(position),
            OutputSurface::Recording(surface) => surface.render_camera(position),
        }
    }

    fn connectivity_changed(&mut self, state: Connectivity) {
        match self {
            OutputSurface::Log(surface) => surface.connectivity_changed(state),
            OutputSurface::Json(surface) => surface.connectivity_changed(state),
            OutputSurface::Recording(surface) => surface.connectivity_changed(state),
        }
    }
}
