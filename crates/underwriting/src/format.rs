//! Display helpers for reasons, commentary, and summaries.

/// Format minor units as whole rupees with Indian digit grouping
/// (`12,34,567`). Sign is dropped; callers state direction in prose.
pub fn format_inr(minor: i64) -> String {
    let rupees = (minor.abs() + 50) / 100; // round to nearest rupee
    let s = rupees.to_string();
    if s.len() <= 3 {
        return s;
    }
    let (head, last3) = s.split_at(s.len() - 3);
    let mut parts: Vec<String> = Vec::new();
    let mut rest = head.to_string();
    while rest.len() > 2 {
        parts.push(rest.split_off(rest.len() - 2));
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts.reverse();
    format!("{},{}", parts.join(","), last3)
}

/// Percentage with one decimal place, from a 0–1 ratio.
pub fn pct1(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Percentage with one decimal place, from a 0–100 value.
pub fn pct1_of_100(value: f64) -> String {
    format!("{:.1}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_grouping() {
        assert_eq!(format_inr(100), "1");
        assert_eq!(format_inr(12_345_600), "1,23,456");
        assert_eq!(format_inr(500_000_000), "50,00,000");
        assert_eq!(format_inr(10_000_000_000), "10,00,00,000");
        assert_eq!(format_inr(-12_345_600), "1,23,456");
    }

    #[test]
    fn rounding_to_rupee() {
        assert_eq!(format_inr(149), "1");
        assert_eq!(format_inr(151), "2");
    }

    #[test]
    fn percentages() {
        assert_eq!(pct1(0.8512), "85.1%");
        assert_eq!(pct1_of_100(33.333), "33.3%");
    }
}
