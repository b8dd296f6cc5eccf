use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use dvrsched::engine::ScheduleManager;
use dvrsched::model::{ChannelId, ConflictInfo, ScheduleCandidate};
use dvrsched::notify::NotifyHub;
use dvrsched::snapshot::Snapshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("DVRSCHED_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    dvrsched::observability::init(metrics_port)?;

    let snapshot_path = std::env::var("DVRSCHED_SNAPSHOT").unwrap_or_else(|_| "./schedules.json".into());
    let watch_channel: Option<ChannelId> = std::env::var("DVRSCHED_WATCH_CHANNEL")
        .ok()
        .and_then(|s| s.parse().ok());

    let store = Arc::new(Snapshot::load(&PathBuf::from(&snapshot_path))?.into_store()?);
    info!("snapshot: {snapshot_path}");
    info!("  inputs: {}", store.input_count());
    info!("  schedules: {}", store.schedule_count());
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let notify = Arc::new(NotifyHub::new());
    let manager = ScheduleManager::new(store.clone(), store, notify);
    manager.initialize();

    for input_id in manager.input_ids() {
        let conflicts = manager.cached_conflicts(&input_id);
        println!("{input_id}: {} conflicting", conflicts.len());
        for c in &conflicts {
            println!("  {}", describe_conflict(c));
        }
    }

    if let Some(channel) = watch_channel {
        let broken = manager.conflicting_schedules_for_watching(channel);
        println!("watching channel {channel}: {} would not record", broken.len());
        for s in &broken {
            println!("  {}", describe(s));
        }
    }

    if metrics_port.is_some() {
        info!("serving metrics until ctrl-c");
        tokio::signal::ctrl_c().await?;
        info!("dvrsched stopped");
    }
    Ok(())
}

fn describe(s: &ScheduleCandidate) -> String {
    format!(
        "{} channel={} [{}, {}) priority={}",
        s.id, s.channel_id, s.span.start, s.span.end, s.priority
    )
}

fn describe_conflict(c: &ConflictInfo) -> String {
    let kind = if c.partial { "partial" } else { "full" };
    format!("{} {kind}", describe(&c.schedule))
}
