//! Cycle execution and run loop

use super::{CycleError, CycleSummary, RunOutcome};
use crate::config::{Config, ConfigError};
use crate::decision::{Decision, DecisionFusion, DecisionValidator, ValidationContext};
use crate::ledger::{LedgerEntry, TradeLedger};
use crate::market::{BenchmarkProvider, MarketDataError, MarketSnapshot, MarketSnapshotProvider};
use crate::position::{Position, PositionCalculator, PositionError, PositionState};
use crate::profitability::{
    compute_portfolio_report, PerformanceSummary, ProfitabilityError, ProfitabilityReport,
    SymbolStatus,
};
use crate::signal::{RiskScorer, RiskTrigger, SignalScorer};
use crate::sink::DecisionSink;
use crate::telemetry::{self, CycleCounter};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type SnapshotResult = Result<MarketSnapshot, MarketDataError>;

/// Portfolio figures shared by every symbol's evaluation in one cycle
struct PortfolioView<'a> {
    report: &'a ProfitabilityReport,
    equity: Decimal,
    exposure_value: Decimal,
    total_quantity: Decimal,
    unresolved: Vec<String>,
    portfolio_stop: Option<Decimal>,
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic evaluation of the instrument universe
pub struct CycleOrchestrator {
    symbols: Vec<String>,
    capital: Decimal,
    cycle_interval: Duration,
    max_concurrency: usize,
    snapshot_timeout: Duration,

    ledger: Arc<dyn TradeLedger>,
    market: Arc<dyn MarketSnapshotProvider>,
    benchmark: Arc<dyn BenchmarkProvider>,
    sinks: Vec<Arc<dyn DecisionSink>>,

    calculator: PositionCalculator,
    scorer: SignalScorer,
    risk: RiskScorer,
    fusion: DecisionFusion,
    validator: DecisionValidator,

    in_flight: AtomicBool,
    stopped: AtomicBool,
}

impl CycleOrchestrator {
    /// Build an orchestrator from validated configuration
    pub fn new(
        config: &Config,
        ledger: Arc<dyn TradeLedger>,
        market: Arc<dyn MarketSnapshotProvider>,
        benchmark: Arc<dyn BenchmarkProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            symbols: config.universe.symbols.clone(),
            capital: config.universe.capital,
            cycle_interval: Duration::from_secs(config.orchestrator.cycle_interval_seconds),
            max_concurrency: config.orchestrator.max_concurrency,
            snapshot_timeout: Duration::from_millis(config.orchestrator.snapshot_timeout_ms),
            ledger,
            market,
            benchmark,
            sinks: Vec::new(),
            calculator: PositionCalculator::new(),
            scorer: SignalScorer::from_config(&config.scoring)?,
            risk: RiskScorer::from_config(&config.risk),
            fusion: DecisionFusion::from_config(&config.fusion)?,
            validator: DecisionValidator::from_config(&config.risk),
            in_flight: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Add a decision sink
    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Universe in evaluation order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Refuse all further cycles
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Whether a cycle is currently executing
    pub fn is_running_cycle(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle as of now
    pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with positions taken as of `as_of`
    ///
    /// Either every symbol gets a decision and all of them reach the sinks,
    /// or the cycle is abandoned and nothing is emitted.
    pub async fn run_cycle_at(&self, as_of: DateTime<Utc>) -> Result<CycleSummary, CycleError> {
        if self.is_stopped() {
            return Err(CycleError::Stopped);
        }
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Previous cycle still running, refusing new cycle");
            telemetry::incr_cycle(CycleCounter::Refused);
            return Err(CycleError::AlreadyRunning);
        };

        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            %cycle_id,
            as_of = %as_of,
            symbols = self.symbols.len(),
            "Cycle started"
        );

        let trades = match self.read_trades(as_of).await {
            Ok(trades) => trades,
            Err(e) => {
                tracing::warn!(%cycle_id, error = %e, "Ledger read failed, abandoning cycle");
                telemetry::incr_cycle(CycleCounter::Abandoned);
                return Err(e);
            }
        };

        let mut snapshots = self.fetch_snapshots().await;

        let positions: BTreeMap<String, Result<PositionState, PositionError>> = trades
            .iter()
            .map(|(symbol, entries)| {
                (
                    symbol.clone(),
                    self.calculator.replay(symbol, entries, as_of),
                )
            })
            .collect();

        let valid_positions: Vec<PositionState> = self
            .symbols
            .iter()
            .filter_map(|s| positions.get(s).and_then(|p| p.as_ref().ok()).cloned())
            .collect();

        let marks: BTreeMap<String, MarketSnapshot> = snapshots
            .iter()
            .filter_map(|(s, r)| r.as_ref().ok().map(|snap| (s.clone(), snap.clone())))
            .collect();

        let benchmark_return_pct = self.benchmark_return(&trades, as_of).await;
        let mut report =
            compute_portfolio_report(as_of, &valid_positions, &marks, benchmark_return_pct);
        for (symbol, result) in &positions {
            if let Err(e) = result {
                report.mark_unresolved(symbol, e.to_string());
            }
        }
        let performance = PerformanceSummary::from_positions(&valid_positions);
        let equity = report.equity(self.capital);

        let portfolio_stop = self.risk.portfolio_stop(&report);
        if let Some(pct) = portfolio_stop {
            tracing::warn!(
                %cycle_id,
                unrealized_pct = %pct.round_dp(2),
                "Portfolio stop-loss breached, exiting every position"
            );
        }
        let view = PortfolioView {
            report: &report,
            equity,
            exposure_value: report.exposure_value(),
            total_quantity: report.total_quantity(),
            unresolved: report.unresolved_symbols(),
            portfolio_stop,
        };

        let decisions: Vec<Decision> = self
            .symbols
            .iter()
            .map(|symbol| {
                let position = positions.get(symbol.as_str());
                let snapshot = snapshots.remove(symbol.as_str());
                self.evaluate(cycle_id, as_of, symbol, position, snapshot, &view)
            })
            .collect();

        self.emit(&decisions).await;

        let summary = CycleSummary {
            cycle_id,
            started_at: as_of,
            finished_at: Utc::now(),
            decisions,
            report,
            performance,
        };

        let elapsed = started.elapsed();
        telemetry::record_report(&summary.report);
        telemetry::record_cycle_duration(elapsed);
        telemetry::incr_cycle(CycleCounter::Completed);
        tracing::info!(
            %cycle_id,
            decisions = summary.decisions.len(),
            degraded = summary.degraded_count(),
            total_pnl = %summary.report.total_pnl,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cycle finished"
        );

        Ok(summary)
    }

    /// Run cycles on the configured interval until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) -> RunOutcome {
        self.run_for(shutdown, None).await
    }

    /// Run at most `max_cycles` cycles, or until `shutdown` fires
    ///
    /// Cancellation is observed between cycles only.
    pub async fn run_for(&self, shutdown: CancellationToken, max_cycles: Option<usize>) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        let mut interval = tokio::time::interval(self.cycle_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if max_cycles.is_some_and(|max| outcome.cycles_completed + outcome.cycles_failed >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {}
            }

            match self.run_cycle().await {
                Ok(summary) => {
                    outcome.cycles_completed += 1;
                    outcome.last_summary = Some(summary);
                }
                Err(CycleError::Stopped) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Cycle failed");
                    outcome.cycles_failed += 1;
                }
            }
        }

        self.stop();
        tracing::info!(
            completed = outcome.cycles_completed,
            failed = outcome.cycles_failed,
            "Orchestrator stopped"
        );
        outcome
    }

    /// One ledger read for the whole universe, grouped by symbol
    async fn read_trades(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<BTreeMap<String, Vec<LedgerEntry>>, CycleError> {
        let mut trades: BTreeMap<String, Vec<LedgerEntry>> = self
            .symbols
            .iter()
            .map(|symbol| (symbol.clone(), Vec::new()))
            .collect();
        for entry in self.ledger.trades_up_to(as_of).await? {
            if let Some(entries) = trades.get_mut(entry.trade.symbol.as_str()) {
                entries.push(entry);
            }
        }
        Ok(trades)
    }

    /// Fetch every snapshot concurrently, bounded by `max_concurrency`
    async fn fetch_snapshots(&self) -> BTreeMap<String, SnapshotResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let timeout_ms = self.snapshot_timeout.as_millis() as u64;
        let mut handles = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            let market = Arc::clone(&self.market);
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.clone();
            let timeout = self.snapshot_timeout;

            handles.push(tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => match tokio::time::timeout(timeout, market.snapshot(&symbol)).await {
                        Ok(result) => result,
                        Err(_) => Err(MarketDataError::Timeout {
                            symbol: symbol.clone(),
                            timeout_ms,
                        }),
                    },
                    Err(_) => Err(MarketDataError::NotAvailable(symbol.clone())),
                };
                (symbol, result)
            }));
        }

        let mut snapshots = BTreeMap::new();
        for handle in handles {
            match handle.await {
                Ok((symbol, result)) => {
                    snapshots.insert(symbol, result);
                }
                Err(e) => tracing::warn!(error = %e, "Snapshot task failed"),
            }
        }
        snapshots
    }

    /// Benchmark return from the first trade to `as_of`; faults leave it unset
    async fn benchmark_return(
        &self,
        trades: &BTreeMap<String, Vec<LedgerEntry>>,
        as_of: DateTime<Utc>,
    ) -> Option<Decimal> {
        let period_start = trades
            .values()
            .flatten()
            .map(|e| e.trade.timestamp)
            .min()
            .unwrap_or(as_of);

        match self.benchmark.benchmark_return(period_start, as_of).await {
            Ok(pct) => Some(pct),
            Err(e) => {
                tracing::warn!(error = %e, "Benchmark return unavailable");
                None
            }
        }
    }

    fn evaluate(
        &self,
        cycle_id: Uuid,
        as_of: DateTime<Utc>,
        symbol: &str,
        position: Option<&Result<PositionState, PositionError>>,
        snapshot: Option<SnapshotResult>,
        view: &PortfolioView<'_>,
    ) -> Decision {
        let position = match position {
            Some(Ok(state)) => state.position.clone(),
            Some(Err(e)) => return self.degraded(cycle_id, as_of, symbol, e.to_string()),
            None => Position::flat(symbol),
        };

        let snapshot = match snapshot {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                let reason = if position.is_open() {
                    format!(
                        "{}: {}",
                        ProfitabilityError::StaleSnapshot {
                            symbol: symbol.to_string()
                        },
                        e
                    )
                } else {
                    e.to_string()
                };
                return self.degraded(cycle_id, as_of, symbol, reason);
            }
            None => {
                let reason = MarketDataError::NotAvailable(symbol.to_string()).to_string();
                return self.degraded(cycle_id, as_of, symbol, reason);
            }
        };

        let entry = view.report.get(symbol);
        if let Some(SymbolStatus::Degraded { reason }) = entry.map(|e| &e.status) {
            return self.degraded(cycle_id, as_of, symbol, reason.clone());
        }

        let scores = self.scorer.score_snapshot(&snapshot);
        let risk = self.risk.score(entry, view.equity);

        let mut notes = Vec::new();
        let missing: Vec<String> = scores.missing().map(|k| k.to_string()).collect();
        if !missing.is_empty() {
            notes.push(format!("missing indicators: {}", missing.join(", ")));
        }
        if !matches!(risk.trigger, RiskTrigger::Concentration { .. }) {
            notes.push(format!("risk: {}", risk.trigger));
        }

        let mut fused = self
            .fusion
            .fuse(scores.technical, scores.sentiment, risk.score, &position);
        fused.explanation.notes.splice(0..0, notes);
        if let Some(pct) = view.portfolio_stop {
            let reason = format!("portfolio stop-loss at {:.2}% unrealized", pct);
            fused = self.fusion.force_exit(fused, &position, &reason);
        }

        let ctx = ValidationContext {
            symbol_value: entry.and_then(|e| e.market_value).unwrap_or(Decimal::ZERO),
            price: snapshot.close,
            snapshot_age_secs: snapshot.age_at(as_of),
            equity: view.equity,
            total_exposure_value: view.exposure_value,
            held_quantity: position.quantity,
            avg_cost: position.avg_cost,
            total_quantity: view.total_quantity,
            unresolved_symbols: view.unresolved.clone(),
            protective_exit: view.portfolio_stop.is_some()
                || matches!(risk.trigger, RiskTrigger::StopLoss { .. }),
        };
        let (result, outcome) = self.validator.validate(fused, &ctx);

        Decision {
            cycle_id,
            symbol: symbol.to_string(),
            timestamp: as_of,
            action: result.action,
            confidence: result.confidence,
            technical_score: scores.technical,
            sentiment_score: scores.sentiment,
            risk_score: risk.score,
            combined_score: result.combined_score,
            explanation: result.explanation,
            outcome,
        }
    }

    fn degraded(
        &self,
        cycle_id: Uuid,
        as_of: DateTime<Utc>,
        symbol: &str,
        reason: String,
    ) -> Decision {
        tracing::warn!(%cycle_id, symbol, reason = %reason, "Symbol degraded");
        Decision::degraded(cycle_id, symbol, as_of, reason)
    }

    /// Hand every decision to every sink, in universe order
    async fn emit(&self, decisions: &[Decision]) {
        for decision in decisions {
            telemetry::record_decision(decision.action, decision.is_degraded());
            for sink in &self.sinks {
                if let Err(e) = sink.on_decision(decision).await {
                    tracing::warn!(
                        cycle_id = %decision.cycle_id,
                        symbol = %decision.symbol,
                        error = %e,
                        "Decision sink failed"
                    );
                }
            }
        }
    }
}
