use anyhow::Result;
use log::info;
use std::time::Instant;

use fleet_monitor::{
    config::MonitorConfig,
    feed::encode_message,
    pipeline::{Clock, LogSurface, ManualClock, Pipeline},
    simulator::FeedSimulator,
};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();
    info!("Starting Fleet Monitor (Simulated Feed)");

    // Load configuration
    let config = MonitorConfig::load_from_files("feed.toml", "pipeline.toml")?;
    let sim_config = &config.feed.simulator;
    info!("Loaded configuration: {} simulated vehicles, update every {}ms",
          sim_config.vehicles.len(),
          sim_config.update_interval_ms);

    let mut simulator = FeedSimulator::new(sim_config);
    let mut pipeline = Pipeline::new(&config.pipeline, LogSurface);

    let clock = ManualClock::new(0);
    let tick_ms = config.pipeline.scheduler.tick_interval_ms;
    let sweep_ms = config.pipeline.alerts.sweep_interval_ms;
    let update_ms = sim_config.update_interval_ms;
    let end_ms = (sim_config.duration_secs * 1000.0) as u64;

    // Frames go through the wire encoding so the parser sees what a server sends
    pipeline.ingest_text(&encode_message(&simulator.initial_state()), clock.now_ms())?;

    info!("Running simulated feed for {:.1} seconds...", sim_config.duration_secs);
    let wall_start = Instant::now();
    let mut next_update = update_ms;
    let mut next_sweep = sweep_ms;
    let mut next_status = 1000;

    while clock.now_ms() < end_ms {
        let now = clock.advance(tick_ms);

        if now >= next_update {
            for message in simulator.step() {
                if let Err(e) = pipeline.ingest_text(&encode_message(&message), now) {
                    log::debug!("Simulated frame rejected: {}", e);
                }
            }
            next_update += update_ms;
        }

        pipeline.tick(now);

        if now >= next_sweep {
            pipeline.sweep(now);
            next_sweep += sweep_ms;
        }

        // Print status every simulated second
        if now >= next_status {
            info!("t={:.1}s: {} vehicles, {} animating, {} active alerts, tick {:.3}ms",
                  now as f64 / 1000.0,
                  pipeline.store().len(),
                  pipeline.animator().active_count(),
                  pipeline.alerts().len(),
                  pipeline.performance().average_tick_time().as_secs_f64() * 1000.0);
            next_status += 1000;
        }
    }

    // Final statistics
    let counters = pipeline.performance().counters;
    info!("Simulation completed!");
    info!("Wall time: {:.2}s for {} ticks", wall_start.elapsed().as_secs_f64(), counters.ticks);
    info!("Feed steps: {}, messages: {} accepted / {} dropped",
          simulator.steps(), counters.messages_accepted, counters.messages_dropped);
    info!("Findings: {} proximity, {} intersection", counters.proximity_findings, counters.intersection_findings);
    info!("Alerts: {} raised, {} retracted, {} still active",
          counters.alerts_raised, counters.alerts_retracted, pipeline.alerts().len());

    Ok(())
}
