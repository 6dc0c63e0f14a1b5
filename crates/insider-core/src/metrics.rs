//! Pure metric computation over parsed transactions.
//!
//! [`compute`] derives per-transaction metrics and [`aggregate`] folds a
//! filing's transactions into its rollup row. Both are pure functions of
//! their inputs so re-ingesting a filing always reproduces the same derived
//! values.

use crate::types::{EnrichedTransaction, FilingAggregate, RawTransaction, TradeSide};

/// Rounds to two decimal places (currency values).
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to four decimal places (percentages).
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Derives trade value and ownership percentage for one transaction.
///
/// An unreported price yields a zero trade value rather than an error. The
/// ownership percentage is computed only when the outstanding share count is
/// a known positive number; otherwise it is `None` and the transaction is
/// persisted with degraded data.
#[must_use]
pub fn compute(
    transaction: &RawTransaction,
    shares_outstanding: Option<u64>,
) -> EnrichedTransaction {
    let trade_value = round2(transaction.shares * transaction.price_per_share);
    let ownership_pct = shares_outstanding
        .filter(|total| *total > 0)
        .map(|total| round4(transaction.shares_owned_after / total as f64 * 100.0));

    EnrichedTransaction {
        transaction: transaction.clone(),
        trade_value,
        ownership_pct,
    }
}

/// Folds a filing's transactions into its aggregate row.
///
/// Acquisitions add to the buy total and the net share change, disposals to
/// the sell total and against the net change. Transactions with an unknown
/// side count toward `transaction_count` only.
#[must_use]
pub fn aggregate(transactions: &[EnrichedTransaction]) -> FilingAggregate {
    let mut rollup = FilingAggregate::default();
    for enriched in transactions {
        rollup.transaction_count += 1;
        match enriched.transaction.code.side() {
            Some(TradeSide::Buy) => {
                rollup.total_buy_value += enriched.trade_value;
                rollup.net_share_change += enriched.transaction.shares;
            }
            Some(TradeSide::Sell) => {
                rollup.total_sell_value += enriched.trade_value;
                rollup.net_share_change -= enriched.transaction.shares;
            }
            None => {}
        }
    }
    rollup.total_buy_value = round2(rollup.total_buy_value);
    rollup.total_sell_value = round2(rollup.total_sell_value);
    rollup.net_share_change = round2(rollup.net_share_change);
    rollup
}
