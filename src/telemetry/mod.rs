//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    incr_cycle, init_metrics, record_cycle_duration, record_decision, record_report, set_gauge,
    CycleCounter, GaugeMetric,
};

use crate::config::TelemetryConfig;
use std::net::{Ipv4Addr, SocketAddr};

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if let Some(port) = config.metrics_port {
        init_metrics(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
    }

    Ok(())
}
