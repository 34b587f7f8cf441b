use fleet_monitor::{
    config::{MonitorConfig, PipelineConfig},
    feed::{encode_message, BatchKind, FeedMessage},
    pipeline::{Clock, Connectivity, JsonSurface, ManualClock, Pipeline, RecordingSurface, SurfaceEvent},
    tracking::{offset_meters, position, CameraCommand, Direction, VehicleId, VehicleReport},
};
use anyhow::Result;

fn recording_pipeline(config: &PipelineConfig) -> Pipeline<RecordingSurface> {
    Pipeline::new(config, RecordingSurface::new())
}

fn batch(kind: BatchKind, reports: Vec<VehicleReport>) -> String {
    encode_message(&FeedMessage::Batch { kind, vehicles: reports })
}

fn single(id: &str, lat: f64, lon: f64) -> String {
    encode_message(&FeedMessage::Single(VehicleReport::new(id, position(lat, lon))))
}

/// A reported move animates smoothly and settles on the reported position
#[test]
fn test_vehicle_glides_to_reported_position() -> Result<()> {
    let config = PipelineConfig::default();
    let mut pipeline = recording_pipeline(&config);

    // First sighting places the marker without animating it
    let created = pipeline.ingest_text(r#"{"type":"initial_state","data":[{"id":1,"position":[13.0,77.5]}]}"#, 0)?;
    assert_eq!((created.created, created.moved), (1, 0));
    assert!(!pipeline.animator().is_animating(&VehicleId::from("1")));
    let vehicle = pipeline.store().get(&VehicleId::from("1")).unwrap();
    assert_eq!(vehicle.displayed, vehicle.last_known);

    // Integer id 1 and text id "1" are the same vehicle
    let outcome = pipeline.ingest_text(r#"{"id":"1","position":[13.0001,77.5001]}"#, 0)?;
    assert_eq!((outcome.created, outcome.moved), (0, 1));
    assert_eq!(pipeline.store().len(), 1);

    let tick = config.scheduler.tick_interval_ms;
    let mut now = 0;
    while now < config.animation.vehicle_duration_ms {
        now += tick;
        pipeline.tick(now);
    }

    let track = pipeline.surface().track("1");
    println!("Rendered {} frames for vehicle 1", track.len());
    assert!(track.len() > 100);

    // Continuous: no frame moves more than a small share of the whole distance
    let total = 0.0001;
    for pair in track.windows(2) {
        let delta = pair[1][0] - pair[0][0];
        assert!(delta >= 0.0, "marker moved backwards");
        assert!(delta <= total * 0.01, "marker jumped by {}", delta);
    }

    // Settles exactly on the reported position and stops animating
    assert_eq!(track.last().copied(), Some([13.0001, 77.5001]));
    assert!(!pipeline.animator().is_animating(&VehicleId::from("1")));
    let vehicle = pipeline.store().get(&VehicleId::from("1")).unwrap();
    assert_eq!(vehicle.displayed, vehicle.last_known);
    Ok(())
}

/// Two vehicles 10 m apart raise exactly one proximity alert
#[test]
fn test_close_vehicles_raise_one_proximity_alert() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());
    let base = position(13.134407425677608, 77.56936729614509);

    let outcome = pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("1", base),
        VehicleReport::new("2", offset_meters(base, 10.0, 0.0)),
    ]), 0)?;

    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.alerts.len(), 1);

    let alerts: Vec<_> = pipeline.surface().alerts().cloned().collect();
    assert_eq!(alerts.len(), 1);
    match &alerts[0] {
        SurfaceEvent::Alert { kind, vehicles, message, .. } => {
            assert_eq!(*kind, "proximity");
            assert_eq!(vehicles, &["1".to_string(), "2".to_string()]);
            println!("✓ {}", message);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(pipeline.performance().counters.proximity_findings, 1);
    Ok(())
}

/// Vehicles far apart raise nothing
#[test]
fn test_far_apart_vehicles_stay_quiet() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());
    let base = position(13.0, 77.5);

    let outcome = pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("1", base),
        VehicleReport::new("2", offset_meters(base, 500.0, 0.0)),
    ]), 0)?;

    assert!(outcome.alerts.is_empty());
    assert!(pipeline.alerts().is_empty());
    Ok(())
}

/// Crossing paths raise one intersection alert
#[test]
fn test_crossing_paths_raise_intersection_alert() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());

    pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("A", position(13.0, 77.5)),
        VehicleReport::new("B", position(13.0005, 77.503)),
    ]), 0)?;
    // A heads north-east, B heads west across A's path
    pipeline.ingest_text(&single("A", 13.001, 77.501), 0)?;
    pipeline.ingest_text(&single("B", 13.0005, 77.499), 0)?;
    assert!(pipeline.alerts().is_empty());

    pipeline.tick(2900);
    assert!(pipeline.alerts().is_empty());

    pipeline.tick(3100);
    let counters = pipeline.performance().counters;
    assert_eq!(counters.intersection_findings, 1);

    let alert = pipeline.alerts().active().next().unwrap();
    assert_eq!(alert.message, "Path of vehicle A intersects with vehicle B");
    Ok(())
}

/// Intersection checks can be switched off
#[test]
fn test_intersections_can_be_disabled() -> Result<()> {
    let mut config = PipelineConfig::default();
    config.detection.intersections = false;
    let mut pipeline = recording_pipeline(&config);

    pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("A", position(13.0, 77.5)),
        VehicleReport::new("B", position(13.0005, 77.503)),
    ]), 0)?;
    pipeline.ingest_text(&single("A", 13.001, 77.501), 0)?;
    pipeline.ingest_text(&single("B", 13.0005, 77.499), 0)?;
    pipeline.tick(2900);
    pipeline.tick(3100);

    assert_eq!(pipeline.performance().counters.intersection_findings, 0);
    Ok(())
}

/// A batch removes vehicles it does not list
#[test]
fn test_batch_drops_vehicles_it_omits() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());

    pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("1", position(13.0, 77.5)),
        VehicleReport::new("2", position(13.01, 77.5)),
    ]), 0)?;
    pipeline.ingest_text(&single("2", 13.02, 77.5), 0)?;
    assert!(pipeline.animator().is_animating(&VehicleId::from("2")));

    let outcome = pipeline.ingest_text(&batch(BatchKind::PositionUpdate, vec![
        VehicleReport::new("1", position(13.0, 77.51)),
    ]), 100)?;

    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.moved, 1);
    assert!(!pipeline.store().contains(&VehicleId::from("2")));
    assert!(!pipeline.animator().is_animating(&VehicleId::from("2")));
    assert!(pipeline.surface().events.contains(&SurfaceEvent::VehicleRemoved { id: "2".to_string() }));
    Ok(())
}

/// A repeated id inside one batch applies in order, the later entry as a move
#[test]
fn test_duplicate_id_in_batch_applies_in_order() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());
    let first = position(13.0, 77.5);
    let second = position(13.001, 77.5);

    let outcome = pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("1", first),
        VehicleReport::new("1", second),
    ]), 0)?;

    assert_eq!((outcome.created, outcome.moved), (1, 1));
    assert_eq!(pipeline.store().len(), 1);

    let id = VehicleId::from("1");
    assert_eq!(pipeline.store().get(&id).map(|v| v.last_known), Some(second));
    assert!(pipeline.animator().is_animating(&id));
    let task = pipeline.animator().task(&id).unwrap();
    assert_eq!((task.start, task.target), (first, second));
    assert_eq!(task.duration_ms, pipeline.animator().duration_ms());
    Ok(())
}

/// Bad frames are counted and dropped without touching state
#[test]
fn test_bad_frames_are_dropped_and_pipeline_continues() -> Result<()> {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());
    pipeline.ingest_text(&single("1", 13.0, 77.5), 0)?;

    assert!(pipeline.ingest_text("{not json", 10).is_err());
    assert!(pipeline.ingest_text(r#"{"type":"heartbeat"}"#, 10).is_err());
    assert!(pipeline.ingest_text(r#"{"id":"1","position":[13.0]}"#, 10).is_err());

    let counters = pipeline.performance().counters;
    assert_eq!(counters.messages_dropped, 3);
    assert_eq!(counters.messages_accepted, 1);
    assert_eq!(pipeline.store().get(&VehicleId::from("1")).map(|v| v.last_known), Some(position(13.0, 77.5)));

    pipeline.ingest_text(&single("1", 13.001, 77.5), 20)?;
    assert!(pipeline.animator().is_animating(&VehicleId::from("1")));
    Ok(())
}

/// Alerts retract once, by dismissal or by sweep
#[test]
fn test_alerts_expire_on_sweep_and_dismiss_once() -> Result<()> {
    let config = PipelineConfig::default();
    let ttl = config.alerts.ttl_ms;
    let mut pipeline = recording_pipeline(&config);
    let base = position(13.0, 77.5);

    let first = pipeline.ingest_text(&batch(BatchKind::InitialState, vec![
        VehicleReport::new("1", base),
        VehicleReport::new("2", offset_meters(base, 5.0, 0.0)),
    ]), 0)?;
    let second = pipeline.ingest_text(&single("2", 13.0, 77.50001), 1000)?;
    assert_eq!(pipeline.alerts().len(), 2);

    assert!(pipeline.dismiss(second.alerts[0]));
    assert!(!pipeline.dismiss(second.alerts[0]));

    assert_eq!(pipeline.sweep(ttl - 1), 0);
    assert_eq!(pipeline.sweep(ttl), 1);
    assert!(pipeline.alerts().is_empty());

    let retracted = pipeline.surface().retracted();
    assert_eq!(retracted, vec![second.alerts[0].0, first.alerts[0].0]);
    assert_eq!(pipeline.performance().counters.alerts_retracted, 2);
    assert_eq!(pipeline.alerts().ttl_ms(), ttl);

    // Nothing left to retract
    pipeline.surface_mut().clear();
    assert_eq!(pipeline.sweep(ttl * 10), 0);
    assert!(pipeline.surface().events.is_empty());
    Ok(())
}

/// Stale vehicles are evicted only when a threshold is set
#[test]
fn test_quiet_vehicles_are_evicted_when_configured() -> Result<()> {
    let mut config = PipelineConfig::default();
    config.scheduler.stale_after_ms = Some(1000);
    let mut pipeline = recording_pipeline(&config);

    pipeline.ingest_text(&single("1", 13.0, 77.5), 0)?;
    pipeline.ingest_text(&single("2", 13.01, 77.5), 800)?;

    pipeline.sweep(1500);
    assert!(!pipeline.store().contains(&VehicleId::from("1")));
    assert!(pipeline.store().contains(&VehicleId::from("2")));

    // Without the setting nothing is evicted
    let mut keep_all = recording_pipeline(&PipelineConfig::default());
    keep_all.ingest_text(&single("1", 13.0, 77.5), 0)?;
    keep_all.sweep(1_000_000);
    assert_eq!(keep_all.store().len(), 1);
    Ok(())
}

/// Connectivity reaches the surface only when it changes
#[test]
fn test_connectivity_reported_on_change_only() {
    let mut pipeline = recording_pipeline(&PipelineConfig::default());

    pipeline.set_connectivity(Connectivity::Connected);
    pipeline.set_connectivity(Connectivity::Connected);
    pipeline.set_connectivity(Connectivity::Lost);

    let states: Vec<_> = pipeline.surface().events.iter()
        .filter_map(|e| match e {
            SurfaceEvent::Connectivity { state } => Some(*state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![Connectivity::Connected, Connectivity::Lost]);
    assert_eq!(pipeline.connectivity(), Some(Connectivity::Lost));
}

/// The camera is rendered only while it moves
#[test]
fn test_camera_renders_only_while_moving() {
    let config = PipelineConfig::default();
    let mut pipeline = recording_pipeline(&config);
    let center = pipeline.camera().position();

    pipeline.camera_tick(0);
    assert!(pipeline.surface().events.is_empty());

    pipeline.camera_command(CameraCommand::Nudge(Direction::Left), 0);
    let mut now = 0;
    while now < config.animation.camera_duration_ms {
        now += config.animation.camera_tick_ms;
        pipeline.camera_tick(now);
    }
    let frames = pipeline.surface().events.len();
    assert!(frames > 0);
    assert!(pipeline.camera().position().y < center.y);

    pipeline.camera_tick(now + 1000);
    assert_eq!(pipeline.surface().events.len(), frames);
}

/// The JSON surface writes one event object per line
#[test]
fn test_json_surface_writes_one_event_per_line() -> Result<()> {
    let mut pipeline = Pipeline::new(&PipelineConfig::default(), JsonSurface::new(Vec::new()));
    pipeline.ingest_text(&single("7", 13.0, 77.5), 0)?;
    pipeline.tick(16);
    pipeline.set_connectivity(Connectivity::Lost);

    let output = String::from_utf8(pipeline.into_surface().into_inner())?;
    let events: Vec<serde_json::Value> = output.lines()
        .map(|line| serde_json::from_str(line))
        .collect::<Result<_, _>>()?;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "vehicle");
    assert_eq!(events[0]["id"], "7");
    assert_eq!(events[0]["position"], serde_json::json!([13.0, 77.5]));
    assert_eq!(events[1], serde_json::json!({ "event": "connectivity", "state": "lost" }));
    Ok(())
}

/// The shipped configuration files load and validate
#[test]
fn test_shipped_configuration_loads() -> Result<()> {
    let config = MonitorConfig::load_from_files("feed.toml", "pipeline.toml")?;

    assert!(config.feed.feed.url.starts_with("ws://"));
    assert_eq!(config.feed.simulator.vehicles.len(), 5);
    assert_eq!(config.pipeline.animation.vehicle_duration_ms, 6000);
    assert_eq!(config.pipeline.detection.proximity_threshold_m, 50.0);
    assert_eq!(config.pipeline.alerts.ttl_ms, 5000);
    assert_eq!(config.pipeline.scheduler.stale_after_ms, None);
    Ok(())
}

/// Each tick records vehicle counts in the performance window
#[test]
fn test_tick_records_timing_and_counts() -> Result<()> {
    let config = PipelineConfig::default();
    let mut pipeline = recording_pipeline(&config);
    let clock = ManualClock::new(0);

    pipeline.ingest_text(&single("1", 13.0, 77.5), clock.now_ms())?;
    pipeline.ingest_text(&single("2", 13.01, 77.5), clock.now_ms())?;
    pipeline.ingest_text(&single("2", 13.02, 77.5), clock.now_ms())?;
    assert!(pipeline.performance().latest().is_none());

    pipeline.tick(clock.advance(config.scheduler.tick_interval_ms));
    let latest = pipeline.performance().latest().unwrap();
    assert_eq!((latest.tracked_vehicles, latest.animating_vehicles), (2, 1));

    // Jump straight past the end of the animation
    clock.set(config.animation.vehicle_duration_ms * 2);
    pipeline.tick(clock.now_ms());
    let latest = pipeline.performance().latest().unwrap();
    assert_eq!(latest.animating_vehicles, 0);
    assert_eq!(pipeline.performance().counters.ticks, 2);
    Ok(())
}
