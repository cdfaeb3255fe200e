//! Trade performance statistics

use crate::position::PositionState;
use crate::signal::{checked_ratio, saturating_add};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Win/loss statistics over every realized sell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Number of sells replayed
    pub total_sells: usize,
    /// Sells with positive net P&L
    pub wins: usize,
    /// Sells with zero or negative net P&L
    pub losses: usize,
    /// wins / total_sells * 100
    pub win_rate_pct: Decimal,
    /// Sum of winning net P&L
    pub gross_wins: Decimal,
    /// Sum of losing net P&L (zero or negative)
    pub gross_losses: Decimal,
    /// gross_wins / |gross_losses|, absent without losing sells
    pub profit_factor: Option<Decimal>,
}

impl PerformanceSummary {
    /// Aggregate the realizations of every position
    pub fn from_positions(positions: &[PositionState]) -> Self {
        let mut summary = Self::default();

        for realization in positions.iter().flat_map(|p| p.realizations.iter()) {
            let net = realization.net_pnl();
            summary.total_sells += 1;
            if net > Decimal::ZERO {
                summary.wins += 1;
                summary.gross_wins = saturating_add(summary.gross_wins, net);
            } else {
                summary.losses += 1;
                summary.gross_losses = saturating_add(summary.gross_losses, net);
            }
        }

        if summary.total_sells > 0 {
            summary.win_rate_pct =
                Decimal::from(summary.wins) / Decimal::from(summary.total_sells) * dec!(100);
        }
        if summary.gross_losses < Decimal::ZERO {
            summary.profit_factor = checked_ratio(summary.gross_wins, summary.gross_losses.abs());
        }

        summary
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let profit_factor = self
            .profit_factor
            .map(|pf| format!("{:.2}", pf))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            r#"
TRADE PERFORMANCE
───────────────────────────────────────────────────────
Closed Sells:     {}
Wins / Losses:    {} / {}
Win Rate:         {:.1}%
Gross Wins:       {:+.2}
Gross Losses:     {:+.2}
Profit Factor:    {}
"#,
            self.total_sells,
            self.wins,
            self.losses,
            self.win_rate_pct,
            self.gross_wins,
            self.gross_losses,
            profit_factor,
        )
    }
}
