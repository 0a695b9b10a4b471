//! Pure reductions over the assembled transaction list: monthly roll-ups and
//! counterparty heat tables. No rule logic lives here.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::model::{HeatRow, HeatSide, MonthlyAggregate, Transaction, TxnCategory, TxnFlag};

/// Sample coefficient of variation over positive values; 0 when fewer than
/// two values are available.
pub fn sample_cv(values: &[i64]) -> f64 {
    let clean: Vec<f64> = values.iter().filter(|v| **v > 0).map(|v| *v as f64).collect();
    if clean.len() < 2 {
        return 0.0;
    }
    let mean = clean.iter().sum::<f64>() / clean.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance =
        clean.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (clean.len() - 1) as f64;
    variance.sqrt() / mean
}

/// Group transactions by month and roll up review metrics.
pub fn monthly_aggregates(transactions: &[Transaction]) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for t in transactions {
        groups.entry(t.month.as_str()).or_default().push(t);
    }

    groups
        .into_iter()
        .map(|(month, rows)| {
            let credits: Vec<&&Transaction> = rows.iter().filter(|t| t.credit() > 0).collect();
            let debits: Vec<&&Transaction> = rows.iter().filter(|t| t.debit() > 0).collect();

            let cash_deposits_minor = credits
                .iter()
                .filter(|t| t.category == TxnCategory::Cash)
                .map(|t| t.credit())
                .sum();
            let cash_withdrawals_minor = debits
                .iter()
                .filter(|t| t.category == TxnCategory::Cash)
                .map(|t| t.debit())
                .sum();

            let penalty_charges = rows
                .iter()
                .filter(|t| t.flags.contains(&TxnFlag::Penalty))
                .count();
            let bounces = rows
                .iter()
                .filter(|t| t.category == TxnCategory::BounceReturn)
                .count();

            let balance_on_day = |day: u32| -> Option<i64> {
                rows.iter()
                    .find(|t| t.date.day() == day)
                    .and_then(|t| t.balance_minor)
            };

            let balance_on_last_minor = rows.iter().rev().find_map(|t| t.balance_minor);
            let overdrawn_days = rows
                .iter()
                .filter(|t| matches!(t.balance_minor, Some(b) if b < 0))
                .count();

            let credit_amounts: Vec<i64> = credits.iter().map(|t| t.credit()).collect();

            MonthlyAggregate {
                month: month.to_string(),
                credit_count: credits.len(),
                credit_total_minor: credits.iter().map(|t| t.credit()).sum(),
                debit_count: debits.len(),
                debit_total_minor: debits.iter().map(|t| t.debit()).sum(),
                cash_deposits_minor,
                cash_withdrawals_minor,
                penalty_charges,
                bounces,
                balance_on_10th_minor: balance_on_day(10),
                balance_on_20th_minor: balance_on_day(20),
                balance_on_last_minor,
                overdrawn_days,
                volatility_score: sample_cv(&credit_amounts),
            }
        })
        .collect()
}

/// Counterparty frequency-and-volume table for one side of the account.
/// Sorted by total descending, name ascending on ties.
pub fn heat_table(transactions: &[Transaction], side: HeatSide) -> Vec<HeatRow> {
    let amount = |t: &Transaction| match side {
        HeatSide::Credit => t.credit(),
        HeatSide::Debit => t.debit(),
    };

    let side_total: i64 = transactions.iter().map(amount).sum();
    if side_total == 0 {
        return Vec::new();
    }

    let mut buckets: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for t in transactions {
        let value = amount(t);
        if value <= 0 {
            continue;
        }
        let entry = buckets.entry(t.counterparty.as_str()).or_insert((0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut rows: Vec<HeatRow> = buckets
        .into_iter()
        .map(|(name, (total, count))| HeatRow {
            name: name.to_string(),
            total_minor: total,
            count,
            avg_minor: total / count.max(1) as i64,
            pct: (total as f64 / side_total as f64) * 100.0,
            side,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_minor
            .cmp(&a.total_minor)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

/// Category tag → indices into the transaction list.
pub fn category_index(transactions: &[Transaction]) -> BTreeMap<String, Vec<usize>> {
    let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, t) in transactions.iter().enumerate() {
        map.entry(t.category.to_string()).or_default().push(i);
    }
    map
}
