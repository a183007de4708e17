// src/main.rs

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use traffic_counter::replay::ReplayReader;
use traffic_counter::{Config, PipelineOrchestrator};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;
    let replay_path = args
        .next()
        .unwrap_or_else(|| config.video.replay_path.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("traffic_counter={}", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 Traffic counter starting");
    info!("✓ Configuration loaded from {}", config_path);

    let mut pipeline = PipelineOrchestrator::new(&config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for frame in ReplayReader::open(&replay_path)? {
        let frame = frame?;
        let snapshot = pipeline
            .process_frame(frame.frame, &frame.tracks, frame.lanes)
            .with_context(|| format!("processing frame {}", frame.frame))?;

        if config.output.show_counts {
            if config.lanes.enabled {
                info!(
                    "Frame #{}: {} | {} | Objects being tracked: {}",
                    snapshot.frame_number,
                    pipeline.counts_line(),
                    snapshot.crossing_status(),
                    snapshot.tracks_in_frame
                );
            } else {
                info!(
                    "Frame #{}: {} | Objects being tracked: {}",
                    snapshot.frame_number,
                    pipeline.counts_line(),
                    snapshot.tracks_in_frame
                );
            }
        }

        if config.output.emit_json {
            serde_json::to_writer(&mut out, &snapshot)?;
            writeln!(out)?;
        }

        for event in pipeline.drain_events() {
            debug!("{:?}", event);
        }
    }

    let report = pipeline.final_report();
    info!("\n✓ Stream finished");
    info!("  Frames processed: {}", report.metrics.total_frames);
    info!("  Overall traffic: {}", report.total_distinct_tracks);
    for (class, count) in &report.per_class_counts {
        info!("  {}: {}", class, count);
    }
    info!("  Line flips: {}", report.metrics.line_flips);
    info!("  Crossings: {}", report.metrics.crossings_started);
    info!("  Lane memberships held: {}", report.lane_memberships);
    if report.events_dropped > 0 {
        warn!("  Events dropped: {}", report.events_dropped);
    }
    if config.lanes.enabled && pipeline.lanes().is_none() {
        warn!("Lane detection was enabled but no lane geometry arrived during warm-up");
    }

    if config.output.emit_json {
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    }

    Ok(())
}
