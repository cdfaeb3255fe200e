//! Prometheus metrics

use crate::decision::Action;
use crate::profitability::ProfitabilityReport;
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::time::Duration;

/// Portfolio gauge types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Realized plus unrealized P&L
    TotalPnl,
    /// Unrealized P&L
    UnrealizedPnl,
    /// Realized P&L
    RealizedPnl,
    /// Market value of marked positions
    TotalCurrentValue,
    /// Total return percentage
    TotalReturnPct,
    /// Open position count
    OpenPositions,
    /// Symbols that could not be marked
    DegradedSymbols,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::TotalPnl => "basket_total_pnl_usd",
            GaugeMetric::UnrealizedPnl => "basket_unrealized_pnl_usd",
            GaugeMetric::RealizedPnl => "basket_realized_pnl_usd",
            GaugeMetric::TotalCurrentValue => "basket_total_current_value_usd",
            GaugeMetric::TotalReturnPct => "basket_total_return_pct",
            GaugeMetric::OpenPositions => "basket_open_positions",
            GaugeMetric::DegradedSymbols => "basket_degraded_symbols",
        }
    }
}

/// Cycle lifecycle counters
#[derive(Debug, Clone, Copy)]
pub enum CycleCounter {
    Completed,
    /// Refused because another cycle was in flight
    Refused,
    /// Abandoned before emitting decisions
    Abandoned,
}

impl CycleCounter {
    fn name(self) -> &'static str {
        match self {
            CycleCounter::Completed => "basket_cycles_completed_total",
            CycleCounter::Refused => "basket_cycles_refused_total",
            CycleCounter::Abandoned => "basket_cycles_abandoned_total",
        }
    }
}

/// Install the Prometheus exporter on the given address
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter on {}: {}", addr, e))?;
    tracing::info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Increment a cycle counter
pub fn incr_cycle(counter: CycleCounter) {
    ::metrics::counter!(counter.name()).increment(1);
}

/// Count one emitted decision
pub fn record_decision(action: Action, degraded: bool) {
    ::metrics::counter!("basket_decisions_total", "action" => action.to_string()).increment(1);
    if degraded {
        ::metrics::counter!("basket_degraded_decisions_total").increment(1);
    }
}

/// Record how long a cycle took
pub fn record_cycle_duration(duration: Duration) {
    ::metrics::histogram!("basket_cycle_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Publish the portfolio gauges for a report
pub fn record_report(report: &ProfitabilityReport) {
    set_gauge(GaugeMetric::TotalPnl, to_f64(report.total_pnl));
    set_gauge(GaugeMetric::UnrealizedPnl, to_f64(report.total_unrealized_pnl));
    set_gauge(GaugeMetric::RealizedPnl, to_f64(report.total_realized_pnl));
    set_gauge(
        GaugeMetric::TotalCurrentValue,
        to_f64(report.total_current_value),
    );
    set_gauge(GaugeMetric::TotalReturnPct, to_f64(report.total_return_pct));
    set_gauge(GaugeMetric::OpenPositions, report.open_positions() as f64);
    set_gauge(
        GaugeMetric::DegradedSymbols,
        report.degraded_symbols.len() as f64,
    );
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
