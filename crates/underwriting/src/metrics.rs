//! Bank cash-flow snapshot: every number the bank rule family compares
//! against, computed in one deterministic pass over date-sorted transactions.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::format::{format_inr, pct1};
use crate::gst::{volatility_bucket, VolatilityBucket};
use crate::model::{
    BankTransaction, CashVelocity, EvidenceTxn, HeatMapRow, PrivateLenderCompetition,
};
use crate::policy::PolicyTable;

#[derive(Debug, Clone)]
pub struct BankSnapshot {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub statement_days: i64,
    pub total_credits_minor: i64,
    pub total_debits_minor: i64,
    pub avg_daily_credits_minor: f64,
    pub avg_weekly_credits_minor: f64,
    pub avg_monthly_credits_minor: f64,
    pub avg_monthly_debits_minor: f64,
    pub avg_usable_balance_minor: f64,
    pub min_balance_minor: i64,
    pub credit_cv: f64,
    pub credit_volatility: VolatilityBucket,
    pub low_balance_threshold_minor: i64,
    pub low_balance_days: usize,
    pub low_balance_ratio: f64,
    pub penalty_charge_count: usize,
    pub bounce_return_count: usize,
    pub fixed_obligation_monthly_minor: i64,
    /// `YYYY-MM` → credits, for cross-verification.
    pub monthly_credits: BTreeMap<String, i64>,
    pub credit_heat: Vec<HeatMapRow>,
    pub debit_heat: Vec<HeatMapRow>,
    pub top_credit_pct: f64,
    pub top3_credit_pct: f64,
    pub lenders: PrivateLenderCompetition,
    pub velocity: CashVelocity,
}

/// Pull the most name-like token out of a narration: split on separators,
/// prefer the right-most part that is not a rail prefix (UPI/IMPS/NEFT).
pub fn extract_counterparty(narration: &str) -> String {
    let collapsed = narration.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "-".to_string();
    }
    let parts: Vec<&str> = collapsed
        .split(['/', '-', '|'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let best = parts.iter().rev().find(|p| {
        let up = p.to_uppercase();
        p.len() >= 3
            && p.chars().any(|c| c.is_ascii_alphabetic())
            && !up.starts_with("UPI")
            && !up.starts_with("IMPS")
            && !up.starts_with("NEFT")
    });
    let chosen = best
        .copied()
        .or(parts.last().copied())
        .unwrap_or(collapsed.as_str());
    chosen.chars().take(42).collect()
}

pub fn is_penalty_charge(narration: &str) -> bool {
    let t = narration.to_uppercase();
    t.contains("CHARGE") || t.contains("PENAL") || t.contains("FEE") || t.contains("SMS")
}

pub fn is_bounce_or_return(narration: &str) -> bool {
    let t = narration.to_uppercase();
    t.contains("BOUNCE") || t.contains("RETURN") || t.contains("REVERS") || t.contains("FAILED")
}

fn is_private_lender_keyword(narration: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "HAND LOAN", "H LOAN", "INTEREST", "INT ", "RETURN", "ROLL", "REPAY", "LOAN", "LENDER",
        "FINANCE", "DAILY", "WEEKLY", "COLLECT", "SETTLE",
    ];
    let t = narration.to_uppercase();
    KEYWORDS.iter().any(|k| t.contains(k))
}

/// Round thousands of rupees read as informal-lending tickets.
fn is_round_figure(amount_minor: i64) -> bool {
    amount_minor > 0 && amount_minor % 100_000 == 0
}

fn classify_credit_nature(counterparty: &str) -> &'static str {
    let t = counterparty.to_uppercase();
    if t.contains("SALARY") {
        "Salary"
    } else if t.contains("UPI") || t.contains("IMPS") || t.contains("NEFT") || t.contains("RTGS") {
        "Transfer"
    } else if t.contains("CASH") {
        "Cash deposit"
    } else {
        "Receipts"
    }
}

fn classify_debit_type(counterparty: &str) -> (&'static str, &'static str, &'static str) {
    let t = counterparty.to_uppercase();
    if t.contains("EMI") || t.contains("LOAN") || t.contains("INTEREST") || t.contains("FINANCE") {
        ("Existing lender", "High", "No")
    } else if t.contains("RENT") {
        ("Rent", "High", "No")
    } else if t.contains("SALARY") || t.contains("WAGE") {
        ("Payroll", "High", "No")
    } else if t.contains("GST") || t.contains("TDS") || t.contains("PF") {
        ("Statutory", "High", "No")
    } else if t.contains("CHARGE") || t.contains("PENAL") || t.contains("FEE") {
        ("Bank charges", "Medium", "No")
    } else {
        ("Supplier/ops", "Medium", "Maybe")
    }
}

fn stdev_sample(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Compute the full snapshot. Caller guarantees `transactions` is non-empty
/// and sorted by date.
pub fn bank_snapshot(transactions: &[BankTransaction], policy: &PolicyTable) -> BankSnapshot {
    let period_start = transactions.first().unwrap().date;
    let period_end = transactions.last().unwrap().date;
    let statement_days = (period_end - period_start).num_days().max(0) + 1;

    let total_credits_minor: i64 = transactions.iter().map(|t| t.credit_minor).sum();
    let total_debits_minor: i64 = transactions.iter().map(|t| t.debit_minor).sum();
    let avg_daily_credits_minor = total_credits_minor as f64 / statement_days as f64;
    let avg_daily_debits_minor = total_debits_minor as f64 / statement_days as f64;
    let avg_weekly_credits_minor = avg_daily_credits_minor * 7.0;
    let avg_monthly_credits_minor = avg_daily_credits_minor * 30.0;
    let avg_monthly_debits_minor = avg_daily_debits_minor * 30.0;

    let balances: Vec<i64> = transactions.iter().filter_map(|t| t.balance_minor).collect();
    let avg_usable_balance_minor = if balances.is_empty() {
        0.0
    } else {
        balances.iter().sum::<i64>() as f64 / balances.len() as f64
    };
    let min_balance_minor = balances.iter().copied().min().unwrap_or(0);

    // Per-day credit totals and minimum balances.
    let mut daily_credits: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut daily_debits: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut daily_min_balance: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut monthly_credits: BTreeMap<String, i64> = BTreeMap::new();
    for t in transactions {
        *daily_credits.entry(t.date).or_insert(0) += t.credit_minor;
        *daily_debits.entry(t.date).or_insert(0) += t.debit_minor;
        if let Some(b) = t.balance_minor {
            daily_min_balance
                .entry(t.date)
                .and_modify(|m| *m = (*m).min(b))
                .or_insert(b);
        }
        if t.credit_minor > 0 {
            *monthly_credits
                .entry(t.date.format("%Y-%m").to_string())
                .or_insert(0) += t.credit_minor;
        }
    }

    let positive_daily: Vec<f64> = daily_credits
        .values()
        .filter(|v| **v > 0)
        .map(|v| *v as f64)
        .collect();
    let daily_mean = if positive_daily.is_empty() {
        0.0
    } else {
        positive_daily.iter().sum::<f64>() / positive_daily.len() as f64
    };
    let credit_cv = if daily_mean > 0.0 {
        stdev_sample(&positive_daily) / daily_mean
    } else {
        0.0
    };
    let credit_volatility = volatility_bucket(
        credit_cv,
        policy.bank.volatility_medium_cv,
        policy.bank.volatility_high_cv,
    );

    let low_balance_threshold_minor = policy.bank.low_balance_floor_minor.max(
        (avg_monthly_credits_minor * policy.bank.low_balance_pct_of_monthly_credits).round() as i64,
    );
    let low_balance_days = daily_min_balance
        .values()
        .filter(|b| **b < low_balance_threshold_minor)
        .count();
    let low_balance_ratio = low_balance_days as f64 / statement_days as f64;

    let penalty_charge_count = transactions
        .iter()
        .filter(|t| is_penalty_charge(&t.narration))
        .count();
    let bounce_return_count = transactions
        .iter()
        .filter(|t| is_bounce_or_return(&t.narration))
        .count();

    let fixed_obligation_monthly_minor = fixed_obligations_monthly(
        transactions,
        statement_days,
        avg_monthly_credits_minor,
        policy,
    );

    let credit_heat = heat_map(transactions, total_credits_minor, true, policy);
    let debit_heat = heat_map(transactions, total_debits_minor, false, policy);
    let top_credit_pct = credit_heat.first().map(|r| r.pct_of_total).unwrap_or(0.0);
    let top3_credit_pct = credit_heat.iter().take(3).map(|r| r.pct_of_total).sum();

    let lenders = private_lender_competition(transactions, statement_days, policy);
    let velocity = cash_velocity(
        transactions,
        &daily_credits,
        &daily_debits,
        avg_usable_balance_minor,
        avg_monthly_credits_minor,
        credit_volatility,
    );

    BankSnapshot {
        period_start,
        period_end,
        statement_days,
        total_credits_minor,
        total_debits_minor,
        avg_daily_credits_minor,
        avg_weekly_credits_minor,
        avg_monthly_credits_minor,
        avg_monthly_debits_minor,
        avg_usable_balance_minor,
        min_balance_minor,
        credit_cv,
        credit_volatility,
        low_balance_threshold_minor,
        low_balance_days,
        low_balance_ratio,
        penalty_charge_count,
        bounce_return_count,
        fixed_obligation_monthly_minor,
        monthly_credits,
        credit_heat,
        debit_heat,
        top_credit_pct,
        top3_credit_pct,
        lenders,
        velocity,
    }
}

/// Recurring debit groups (same counterparty, near-identical amounts) scaled
/// to a monthly load, capped below total inflow.
fn fixed_obligations_monthly(
    transactions: &[BankTransaction],
    statement_days: i64,
    avg_monthly_credits_minor: f64,
    policy: &PolicyTable,
) -> i64 {
    if statement_days == 0 {
        return 0;
    }
    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.debit_minor > 0) {
        groups
            .entry(extract_counterparty(&t.narration))
            .or_default()
            .push(t.debit_minor);
    }

    let mut recurring_sum = 0.0;
    for amounts in groups.values().filter(|a| a.len() >= 2) {
        let mean = amounts.iter().sum::<i64>() as f64 / amounts.len() as f64;
        let max_dev = amounts
            .iter()
            .map(|a| (*a as f64 - mean).abs())
            .fold(0.0, f64::max)
            / mean.max(1.0);
        if max_dev <= policy.bank.recurring_amount_max_deviation {
            let sum: i64 = amounts.iter().sum();
            recurring_sum += sum as f64 / statement_days as f64 * 30.0;
        }
    }

    (recurring_sum.min(avg_monthly_credits_minor * 0.8)).round() as i64
}

fn heat_map(
    transactions: &[BankTransaction],
    side_total_minor: i64,
    credit_side: bool,
    policy: &PolicyTable,
) -> Vec<HeatMapRow> {
    if side_total_minor == 0 {
        return Vec::new();
    }
    let mut buckets: BTreeMap<String, (i64, usize)> = BTreeMap::new();
    for t in transactions {
        let amount = if credit_side { t.credit_minor } else { t.debit_minor };
        if amount <= 0 {
            continue;
        }
        let entry = buckets
            .entry(extract_counterparty(&t.narration))
            .or_insert((0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    let mut rows: Vec<(String, i64, usize)> = buckets
        .into_iter()
        .map(|(cp, (sum, freq))| (cp, sum, freq))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows.truncate(policy.bank.heat_rows_max);

    rows.into_iter()
        .map(|(cp, sum, freq)| {
            let pct_of_total = sum as f64 / side_total_minor as f64 * 100.0;
            if credit_side {
                let dependency = if pct_of_total >= 40.0 {
                    "High"
                } else if pct_of_total >= 20.0 {
                    "Medium"
                } else {
                    "Low"
                };
                HeatMapRow {
                    nature: classify_credit_nature(&cp).to_string(),
                    counterparty: cp,
                    freq,
                    avg_minor: sum / freq.max(1) as i64,
                    total_minor: sum,
                    pct_of_total,
                    dependency: Some(dependency.to_string()),
                    priority_level: None,
                    flexi: None,
                }
            } else {
                let (nature, priority, flexi) = classify_debit_type(&cp);
                HeatMapRow {
                    nature: nature.to_string(),
                    counterparty: cp,
                    freq,
                    avg_minor: sum / freq.max(1) as i64,
                    total_minor: sum,
                    pct_of_total,
                    dependency: None,
                    priority_level: Some(priority.to_string()),
                    flexi: Some(flexi.to_string()),
                }
            }
        })
        .collect()
}

/// Score narrations for informal-lender signatures: keyword hits, round
/// tickets, rollover pairing, and weekly collection cadence.
fn private_lender_competition(
    transactions: &[BankTransaction],
    statement_days: i64,
    policy: &PolicyTable,
) -> PrivateLenderCompetition {
    let mut by_cp: BTreeMap<String, usize> = BTreeMap::new();
    let mut evidence: Vec<EvidenceTxn> = Vec::new();
    let mut rollover_signals = 0usize;

    for (i, t) in transactions.iter().enumerate() {
        let amount = t.debit_minor.max(t.credit_minor);
        let direction = if t.debit_minor > 0 {
            "DEBIT"
        } else if t.credit_minor > 0 {
            "CREDIT"
        } else {
            "OTHER"
        };

        let ticket_band = amount >= policy.bank.lender_ticket_min_minor
            && amount <= policy.bank.lender_ticket_max_minor
            && amount % 500_000 == 0; // round ₹5,000 steps
        let score = if is_private_lender_keyword(&t.narration) { 2 } else { 0 }
            + usize::from(is_round_figure(amount))
            + usize::from(ticket_band);

        if score >= 2 && amount > 0 {
            *by_cp.entry(extract_counterparty(&t.narration)).or_insert(0) += 1;
            if evidence.len() < 30 {
                evidence.push(EvidenceTxn {
                    date: t.date,
                    narration: t.narration.chars().take(140).collect(),
                    direction: direction.to_string(),
                    amount_minor: amount,
                });
            }
        }

        // Rollover pairing: credit followed closely by a near-equal debit.
        if t.credit_minor > 0 {
            if let Some(next) = transactions.get(i + 1) {
                let gap = (next.date - t.date).num_days();
                if (0..=policy.bank.rollover_max_gap_days).contains(&gap) && next.debit_minor > 0 {
                    let delta = (next.debit_minor - t.credit_minor).abs() as f64
                        / t.credit_minor.max(1) as f64;
                    if delta <= policy.bank.rollover_amount_max_delta
                        && (is_private_lender_keyword(&next.narration)
                            || is_private_lender_keyword(&t.narration))
                    {
                        rollover_signals += 1;
                    }
                }
            }
        }
    }

    let estimated_lenders = by_cp.values().filter(|c| **c >= 2).count().min(12);

    let suspicious_debit_sum: i64 = evidence
        .iter()
        .filter(|e| e.direction == "DEBIT")
        .map(|e| e.amount_minor)
        .sum();
    let approx_monthly_debt_load_minor = if statement_days > 0 {
        (suspicious_debit_sum as f64 / statement_days as f64 * 30.0).round() as i64
    } else {
        suspicious_debit_sum
    };

    // Weekly collection cadence over debit dates.
    let debit_dates: Vec<NaiveDate> = transactions
        .iter()
        .filter(|t| t.debit_minor > 0)
        .map(|t| t.date)
        .collect();
    let weekly_gaps = debit_dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|g| {
            (policy.bank.weekly_gap_min_days..=policy.bank.weekly_gap_max_days).contains(g)
        })
        .count();
    let weekly_collections_detected = weekly_gaps >= policy.bank.weekly_gap_count_min;

    let mut summary = format!(
        "Estimated private lenders: {}. Approx monthly debt load: ₹{}.",
        estimated_lenders,
        format_inr(approx_monthly_debt_load_minor),
    );
    if weekly_collections_detected {
        summary.push_str(" Weekly collections pattern detected.");
    }
    if rollover_signals > 0 {
        summary.push_str(&format!(" Rollover/recycling signals: {rollover_signals}."));
    }

    PrivateLenderCompetition {
        estimated_lenders,
        approx_monthly_debt_load_minor,
        weekly_collections_detected,
        rollover_recycling_signals: rollover_signals,
        evidence,
        summary,
    }
}

fn cash_velocity(
    transactions: &[BankTransaction],
    daily_credits: &BTreeMap<NaiveDate, i64>,
    daily_debits: &BTreeMap<NaiveDate, i64>,
    avg_usable_balance_minor: f64,
    avg_monthly_credits_minor: f64,
    credit_volatility: VolatilityBucket,
) -> CashVelocity {
    let days: Vec<NaiveDate> = daily_credits.keys().copied().collect();

    let mut same_day = 0.0;
    let mut t_plus_one = 0.0;
    let mut credit_days = 0usize;
    for (i, day) in days.iter().enumerate() {
        let c = *daily_credits.get(day).unwrap_or(&0);
        if c <= 0 {
            continue;
        }
        credit_days += 1;
        let d = *daily_debits.get(day).unwrap_or(&0);
        same_day += (d as f64 / c as f64).min(1.0);
        if let Some(next) = days.get(i + 1) {
            let nd = *daily_debits.get(next).unwrap_or(&0);
            t_plus_one += (nd as f64 / c as f64).min(1.0);
        }
    }
    let same_day_spend_ratio = if credit_days > 0 {
        same_day / credit_days as f64
    } else {
        0.0
    };
    let t_plus_one_spend_ratio = if credit_days > 0 {
        t_plus_one / credit_days as f64
    } else {
        0.0
    };
    let idle_cash_retention_ratio = if avg_monthly_credits_minor > 0.0 {
        avg_usable_balance_minor / avg_monthly_credits_minor
    } else {
        0.0
    };

    let mut weekday_totals: BTreeMap<u32, i64> = BTreeMap::new();
    let mut month_day_totals: BTreeMap<u32, i64> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.credit_minor > 0) {
        *weekday_totals
            .entry(t.date.weekday().num_days_from_sunday())
            .or_insert(0) += t.credit_minor;
        *month_day_totals.entry(t.date.day()).or_insert(0) += t.credit_minor;
    }
    const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    let top_inflow_weekday = weekday_totals
        .iter()
        .max_by_key(|(day, total)| (**total, std::cmp::Reverse(**day)))
        .map(|(day, _)| WEEKDAYS[*day as usize])
        .unwrap_or("Mon")
        .to_string();
    let mut month_days: Vec<(u32, i64)> = month_day_totals.into_iter().collect();
    month_days.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_inflow_month_days: Vec<u32> = month_days.iter().take(3).map(|(d, _)| *d).collect();

    let borrower_type = if same_day_spend_ratio >= 0.85 && idle_cash_retention_ratio < 0.1 {
        "Pass-through operator (low control, thin margin)"
    } else if idle_cash_retention_ratio >= 0.25 {
        "Cash-retainer (higher control/retention)"
    } else if credit_volatility == VolatilityBucket::Low {
        "Stable earner / salary-like"
    } else {
        "Trader / variable inflow operator"
    }
    .to_string();

    let commentary = format!(
        "Same-day spend ratio {}; T+1 spend ratio {}; idle retention {}. Classified as: {}.",
        pct1(same_day_spend_ratio),
        pct1(t_plus_one_spend_ratio),
        pct1(idle_cash_retention_ratio),
        borrower_type,
    );

    CashVelocity {
        same_day_spend_ratio,
        t_plus_one_spend_ratio,
        idle_cash_retention_ratio,
        top_inflow_weekday,
        top_inflow_month_days,
        borrower_type,
        commentary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(date: &str, narration: &str, debit: i64, credit: i64, balance: Option<i64>) -> BankTransaction {
        BankTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            narration: narration.into(),
            debit_minor: debit,
            credit_minor: credit,
            balance_minor: balance,
        }
    }

    #[test]
    fn counterparty_extraction() {
        assert_eq!(extract_counterparty("UPI/9981123/ACME TRADERS/okaxis"), "okaxis");
        assert_eq!(extract_counterparty("NEFT-ACME LTD-000221"), "ACME LTD");
        assert_eq!(extract_counterparty(""), "-");
    }

    #[test]
    fn basic_snapshot_numbers() {
        // 31 inclusive days, ₹1,000 credit on each of two days
        let txns = vec![
            txn("2024-04-01", "NEFT ACME", 0, 100_000, Some(500_000)),
            txn("2024-04-15", "NEFT ACME", 0, 100_000, Some(600_000)),
            txn("2024-05-01", "VENDOR PAY", 50_000, 0, Some(550_000)),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert_eq!(snap.statement_days, 31);
        assert_eq!(snap.total_credits_minor, 200_000);
        assert_eq!(snap.total_debits_minor, 50_000);
        assert_eq!(snap.min_balance_minor, 500_000);
        assert_eq!(snap.monthly_credits.get("2024-04"), Some(&200_000));
        assert!(snap.monthly_credits.get("2024-05").is_none());
    }

    #[test]
    fn penalty_and_bounce_counts() {
        let txns = vec![
            txn("2024-04-01", "SMS CHARGES", 5_000, 0, None),
            txn("2024-04-02", "CHQ RETURN INSUFF", 50_000, 0, None),
            txn("2024-04-03", "NEFT ACME", 0, 100_000, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert_eq!(snap.penalty_charge_count, 1);
        assert_eq!(snap.bounce_return_count, 1);
    }

    #[test]
    fn recurring_debits_estimate_obligations() {
        // Same counterparty, near-identical amounts, over a 30-day window:
        // the whole group reads as a fixed obligation.
        let txns = vec![
            txn("2024-04-01", "BIG INFLOW CO", 0, 100_000_000, None),
            txn("2024-04-05", "ABC FINSERV EMI", 2_000_000, 0, None),
            txn("2024-04-15", "ABC FINSERV EMI", 2_000_000, 0, None),
            txn("2024-04-25", "ABC FINSERV EMI", 2_100_000, 0, None),
            txn("2024-04-30", "ONE OFF VENDOR", 900_000, 0, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        // 6.1L over 30 days scaled to 30-day month = 6.1L
        assert_eq!(snap.fixed_obligation_monthly_minor, 6_100_000);
    }

    #[test]
    fn heat_map_dependency_buckets() {
        let txns = vec![
            txn("2024-04-01", "NEFT-ANCHOR CLIENT", 0, 8_000_000, None),
            txn("2024-04-02", "NEFT-SMALL SHOP", 0, 2_000_000, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert_eq!(snap.credit_heat.len(), 2);
        assert_eq!(snap.credit_heat[0].counterparty, "ANCHOR CLIENT");
        assert_eq!(snap.credit_heat[0].dependency.as_deref(), Some("High"));
        assert_eq!(snap.credit_heat[1].dependency.as_deref(), Some("Medium"));
        assert_eq!(snap.top_credit_pct, 80.0);
    }

    #[test]
    fn lender_stacking_signals() {
        // Two distinct lender-like counterparties, each hit twice with
        // keyword + round-figure debits, collected on a weekly cadence.
        let txns = vec![
            txn("2024-04-01", "WEEKLY COLLECT-SHARK ONE", 2_500_000, 0, None),
            txn("2024-04-08", "WEEKLY COLLECT-SHARK ONE", 2_500_000, 0, None),
            txn("2024-04-15", "HAND LOAN REPAY-SHARK TWO", 3_000_000, 0, None),
            txn("2024-04-22", "HAND LOAN REPAY-SHARK TWO", 3_000_000, 0, None),
            txn("2024-04-29", "WEEKLY COLLECT-SHARK ONE", 2_500_000, 0, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert_eq!(snap.lenders.estimated_lenders, 2);
        assert!(snap.lenders.weekly_collections_detected);
        assert!(!snap.lenders.evidence.is_empty());
        assert!(snap.lenders.approx_monthly_debt_load_minor > 0);
    }

    #[test]
    fn rollover_pairing() {
        let txns = vec![
            txn("2024-04-01", "NEFT FRESH LOAN CREDIT", 0, 5_000_000, None),
            txn("2024-04-02", "REPAY OLD LENDER", 5_100_000, 0, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert_eq!(snap.lenders.rollover_recycling_signals, 1);
    }

    #[test]
    fn same_day_drain_velocity() {
        let txns = vec![
            txn("2024-04-01", "INFLOW", 0, 1_000_000, None),
            txn("2024-04-01", "OUTFLOW", 1_000_000, 0, None),
            txn("2024-04-02", "INFLOW", 0, 1_000_000, None),
            txn("2024-04-02", "OUTFLOW", 950_000, 0, None),
        ];
        let snap = bank_snapshot(&txns, &PolicyTable::default());
        assert!(snap.velocity.same_day_spend_ratio > 0.9);
        assert!(snap
            .velocity
            .borrower_type
            .starts_with("Pass-through operator"));
    }
}
