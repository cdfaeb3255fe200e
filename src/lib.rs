//! basket-trader: multi-factor decisions and ledger-derived P&L for a fixed basket
//!
//! This library provides the core components for:
//! - Append-only trade ledger and position replay
//! - Portfolio profitability with benchmark-relative return
//! - Technical, sentiment and portfolio-risk scoring
//! - Decision fusion with an auditable explanation
//! - Hard risk-limit validation
//! - Periodic cycle orchestration with per-symbol fault isolation
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod decision;
pub mod ledger;
pub mod market;
pub mod orchestrator;
pub mod position;
pub mod profitability;
pub mod signal;
pub mod sink;
pub mod telemetry;
