//! Money and date token parsing for extracted statement text.
//!
//! Amounts are minor units (paise). Parsers are lenient about grouping and
//! currency markers but strict about the result being a real number — any
//! ambiguity returns `None` and the row falls through to human review.

use chrono::NaiveDate;
use regex::Regex;

/// Amount token: optional sign, Indian or western digit grouping or a plain
/// digit run, optional 1-2 decimal places. Grouped form is tried first so
/// `1,23,456.78` is one token, while `1000` still matches whole.
const AMOUNT_PATTERN: &str = r"-?\d{1,3}(?:,\d{2,3})+(?:\.\d{1,2})?|-?\d+(?:\.\d{1,2})?";

/// Parse a money string into minor units.
///
/// Handles `1,23,456.78`, `-1,234.56`, `₹ 500`, and parenthesized negatives
/// like `(1,517.82)`.
pub fn parse_money_minor(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let paren_negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let inner = if paren_negative {
        trimmed.trim_start_matches('(').trim_end_matches(')')
    } else {
        trimmed
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, cleaned.as_str()),
    };
    if digits.is_empty() {
        return None;
    }

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || frac.len() > 2 {
        return None;
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().ok()?
    };
    let frac_value: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };

    let minor = whole_value.checked_mul(100)?.checked_add(frac_value)?;
    let signed = minor * sign * if paren_negative { -1 } else { 1 };
    Some(signed)
}

/// Normalize a date-bearing string to a calendar date.
///
/// Accepts `dd/mm/yy`, `dd-mm-yyyy` and ISO `yyyy-mm-dd` anywhere in the
/// string. Two-digit years map to 20yy. Tokens that look like dates but are
/// not real calendar dates (e.g. `45/13/24`) return `None`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let dmy = Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{2,4})").unwrap();
    if let Some(caps) = dmy.captures(s) {
        let dd: u32 = caps.get(1).unwrap().as_str().parse().ok()?;
        let mm: u32 = caps.get(2).unwrap().as_str().parse().ok()?;
        let year_str = caps.get(3).unwrap().as_str();
        let yyyy: i32 = match year_str.len() {
            2 => 2000 + year_str.parse::<i32>().ok()?,
            _ => year_str.parse().ok()?,
        };
        return NaiveDate::from_ymd_opt(yyyy, mm, dd);
    }

    let iso = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
    if let Some(caps) = iso.captures(s) {
        let yyyy: i32 = caps.get(1).unwrap().as_str().parse().ok()?;
        let mm: u32 = caps.get(2).unwrap().as_str().parse().ok()?;
        let dd: u32 = caps.get(3).unwrap().as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(yyyy, mm, dd);
    }

    None
}

/// Whether a date-shaped token is present at all. A line can be date-like
/// yet fail [`normalize_date`] — that gap is surfaced as an unmapped line.
pub fn date_like(raw: &str) -> bool {
    let re = Regex::new(r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}-\d{2}-\d{2}").unwrap();
    re.is_match(raw)
}

/// Fallback amount extraction from free row text when per-column candidates
/// are missing: the last number is read as balance and the two before it as
/// debit then credit, following statement column order. Date tokens are
/// removed first so their digit fragments never read as amounts.
pub fn extract_amounts_from_row(row_text: &str) -> (Option<i64>, Option<i64>, Option<i64>) {
    let date_re = Regex::new(r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}-\d{2}-\d{2}").unwrap();
    let without_dates = date_re.replace_all(row_text, " ");

    let re = Regex::new(AMOUNT_PATTERN).unwrap();
    let nums: Vec<i64> = re
        .find_iter(&without_dates)
        .filter_map(|m| parse_money_minor(m.as_str()))
        .collect();

    match nums.len() {
        0 => (None, None, None),
        1 => (None, None, Some(nums[0])),
        2 => (Some(nums[0]), None, Some(nums[1])),
        n => (Some(nums[n - 3]), Some(nums[n - 2]), Some(nums[n - 1])),
    }
}

/// Drop a leading date token from narration text.
pub fn strip_leading_date(narration: &str) -> String {
    let re = Regex::new(r"^\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}").unwrap();
    re.replace(narration.trim(), "").trim().to_string()
}

/// Remove date and amount tokens from free row text, leaving narration words.
pub fn strip_amounts(row_text: &str) -> String {
    let date_re = Regex::new(r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}-\d{2}-\d{2}").unwrap();
    let without_dates = date_re.replace_all(row_text, " ");
    let re = Regex::new(AMOUNT_PATTERN).unwrap();
    let stripped = re.replace_all(&without_dates, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
