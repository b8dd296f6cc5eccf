use std::net::SocketAddr;

// ── Conflict engine ─────────────────────────────────────────────

/// Counter: per-input conflict recomputations. Labels: reason.
pub const RECOMPUTES_TOTAL: &str = "dvrsched_recomputes_total";

/// Histogram: wall time of one simulation run in seconds.
pub const SIMULATION_DURATION_SECONDS: &str = "dvrsched_simulation_duration_seconds";

/// Gauge: schedules currently conflicting. Labels: input.
pub const CONFLICTS_ACTIVE: &str = "dvrsched_conflicts_active";

/// Counter: conflict-state notifications published. Labels: direction.
pub const CONFLICT_EVENTS_TOTAL: &str = "dvrsched_conflict_events_total";

// ── Index ───────────────────────────────────────────────────────

/// Gauge: live schedules held in the per-input index.
pub const LIVE_SCHEDULES: &str = "dvrsched_live_schedules";

/// Counter: inputs dropped because they no longer resolve.
pub const INPUTS_DROPPED_TOTAL: &str = "dvrsched_inputs_dropped_total";

// ── Advisory queries ────────────────────────────────────────────

/// Counter: what-if conflict previews. Labels: query, status.
pub const PREVIEWS_TOTAL: &str = "dvrsched_previews_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
