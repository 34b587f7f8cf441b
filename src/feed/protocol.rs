use super::{FeedError, FeedResult};
use crate::tracking::{position, VehicleId, VehicleReport};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    InitialState,
    PositionUpdate,
}

impl BatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchKind::InitialState => "initial_state",
            BatchKind::PositionUpdate => "position_update",
        }
    }

    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "initial_state" => Some(BatchKind::InitialState),
            "position_update" => Some(BatchKind::PositionUpdate),
            _ => None,
        }
    }
}

/// Inbound feed message. A batch replaces the tracked set; a single report
/// only upserts one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Batch {
        kind: BatchKind,
        vehicles: Vec<VehicleReport>,
    },
    Single(VehicleReport),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for VehicleId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => VehicleId(text),
            RawId::Number(number) => VehicleId(number.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVehicle {
    id: Option<RawId>,
    position: Option<Value>,
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<Value>,
    #[serde(flatten)]
    vehicle: RawVehicle,
}

fn parse_position(value: &Value) -> FeedResult<crate::tracking::Position> {
    let pair = value.as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| FeedError::InvalidPosition(format!("expected [lat, lon], got {}", value)))?;

    let lat = pair[0].as_f64()
        .ok_or_else(|| FeedError::InvalidPosition(format!("latitude is not a number: {}", pair[0])))?;
    let lon = pair[1].as_f64()
        .ok_or_else(|| FeedError::InvalidPosition(format!("longitude is not a number: {}", pair[1])))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(FeedError::InvalidPosition(format!("({}, {}) is out of range", lat, lon)));
    }

    Ok(position(lat, lon))
}

fn parse_timestamp(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl RawVehicle {
    fn into_report(self) -> FeedResult<VehicleReport> {
        let id = self.id.ok_or(FeedError::MissingField("id"))?;
        let position = self.position.as_ref().ok_or(FeedError::MissingField("position"))?;
        Ok(VehicleReport {
            id: id.into(),
            position: parse_position(position)?,
            timestamp: parse_timestamp(self.timestamp),
        })
    }
}

/// Classifies one inbound text frame by its shape.
pub fn parse_message(text: &str) -> FeedResult<FeedMessage> {
    let raw: RawMessage = serde_json::from_str(text)?;
    let batch_kind = raw.kind.as_deref().and_then(BatchKind::parse);

    if let (Some(kind), Some(Value::Array(entries))) = (batch_kind, raw.data) {
        // One bad entry rejects the whole resync
        let vehicles = entries.into_iter()
            .map(|entry| serde_json::from_value::<RawVehicle>(entry)?.into_report())
            .collect::<FeedResult<Vec<_>>>()?;
        return Ok(FeedMessage::Batch { kind, vehicles });
    }

    if raw.vehicle.id.is_some() && raw.vehicle.position.is_some() {
        return Ok(FeedMessage::Single(raw.vehicle.into_report()?));
    }

    match (raw.kind, batch_kind) {
        (Some(_), Some(kind)) => Err(FeedError::Malformed(format!("{} without a data array", kind.as_str()))),
        (Some(kind), None) => Err(FeedError::UnknownType(kind)),
        (None, _) if raw.vehicle.id.is_none() => Err(FeedError::MissingField("id")),
        (None, _) => Err(FeedError::MissingField("position")),
    }
}

fn report_json(report: &VehicleReport) -> Value {
    let mut value = json!({
        "id": report.id.as_str(),
        "position": [report.position.x, report.position.y],
    });
    if let Some(timestamp) = &report.timestamp {
        value["timestamp"] = json!(timestamp);
    }
    value
}

/// Wire form of a feed message, as a feed server would send it.
pub fn encode_message(message: &FeedMessage) -> String {
    let value = match message {
        FeedMessage::Batch { kind, vehicles } => json!({
            "type": kind.as_str(),
            "data": vehicles.iter().map(report_json).collect::<Vec<_>>(),
        }),
        FeedMessage::Single(report) => report_json(report),
    };
    value.to_string()
}

/// Sent once after every connect.
pub fn request_positions() -> String {
    json!({ "type": "request_positions" }).to_string()
}
