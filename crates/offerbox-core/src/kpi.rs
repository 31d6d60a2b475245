//! Dashboard KPI math shared by the `stats` command and mirrored by `dashboard.js`.

/// Offers per visitor as a percentage. `0.0` when there are no visitors.
pub fn conversion_rate(total_visitors: i64, total_offers: i64) -> f64 {
    if total_visitors <= 0 {
        return 0.0;
    }
    total_offers as f64 / total_visitors as f64 * 100.0
}

/// `"20.00%"` style rendering; a site without visitors renders `"0%"`.
pub fn format_conversion_rate(total_visitors: i64, total_offers: i64) -> String {
    if total_visitors <= 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", conversion_rate(total_visitors, total_offers))
}

/// `"2m 5s"` style rendering of a whole number of seconds.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}m {}s", seconds / 60, seconds % 60)
}
