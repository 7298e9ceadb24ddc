//! Display projections for raw server values. Everything here is pure: the same
//! input always renders the same string or category.

use crate::model::MarketSnapshot;

pub const NOT_AVAILABLE: &str = "N/A";

/// Visual treatment for assessment labels and signed metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Neutral,
    Positive,
}

/// Visual treatment for position priorities. Kept apart from [`Severity`] so the
/// two label families can be restyled independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityTone {
    Urgent,
    Elevated,
    Routine,
    Hedge,
}

/// Unit the server uses for a percentage-like value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PercentScale {
    /// Already expressed in percent (`65.2` means 65.2%).
    Percent,
    /// A fraction in `[0, 1]` that needs ×100 before display.
    Fraction,
}

/// Every percentage the dashboard shows, tagged with the unit it arrives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    ImpliedVol,
    RealizedVol,
    VolIndex,
    RiskPremium,
    Skew,
    FlowShare,
    ProjectedVol,
    IvRank,
    IvPercentile,
    WinProbability,
}

impl MetricKind {
    pub fn scale(self) -> PercentScale {
        match self {
            MetricKind::IvRank | MetricKind::IvPercentile | MetricKind::WinProbability => {
                PercentScale::Fraction
            }
            MetricKind::ImpliedVol
            | MetricKind::RealizedVol
            | MetricKind::VolIndex
            | MetricKind::RiskPremium
            | MetricKind::Skew
            | MetricKind::FlowShare
            | MetricKind::ProjectedVol => PercentScale::Percent,
        }
    }

    pub fn format(self, value: Option<f64>) -> String {
        format_scaled_percent(value, self.scale())
    }
}

pub fn format_currency(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) => format!("${}", group_thousands(value)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Currency with an explicit `+` on credits, as used for net credit/debit.
pub fn format_signed_currency(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) if value > 0.0 => format!("+{}", format_currency(Some(value))),
        other => format_currency(other),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) => format!("{value:.2}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_scaled_percent(value: Option<f64>, scale: PercentScale) -> String {
    let scaled = match scale {
        PercentScale::Percent => value,
        PercentScale::Fraction => value.map(|value| value * 100.0),
    };
    format_percent(scaled)
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value.filter(|value| value.is_finite()) {
        Some(value) => format!("{value:.2}x"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn label_or_na(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(label) if !label.is_empty() => label,
        _ => NOT_AVAILABLE,
    }
}

pub fn assessment_category(label: &str) -> Severity {
    match label.trim() {
        "EXPENSIVE" => Severity::Critical,
        "MODERATELY EXPENSIVE" => Severity::Warning,
        "FAIR VALUE" => Severity::Neutral,
        "CHEAP" => Severity::Positive,
        _ => Severity::Neutral,
    }
}

pub fn priority_category(label: &str) -> PriorityTone {
    match label.trim() {
        "HIGH" => PriorityTone::Urgent,
        "MEDIUM" => PriorityTone::Elevated,
        "LOW" => PriorityTone::Routine,
        "HEDGE" => PriorityTone::Hedge,
        _ => PriorityTone::Routine,
    }
}

/// Implied minus 30-day realised volatility; unknown when either side is.
pub fn vrp(snapshot: &MarketSnapshot) -> Option<f64> {
    Some(snapshot.eth_iv_deribit? - snapshot.eth_rv_30d?)
}

/// Positive values read as favourable, zero and negative as adverse.
pub fn signed_tone(value: Option<f64>) -> Severity {
    match value.filter(|value| value.is_finite()) {
        Some(value) if value > 0.0 => Severity::Positive,
        Some(_) => Severity::Critical,
        None => Severity::Neutral,
    }
}

/// A positive put bias is bearish flow.
pub fn put_bias_tone(value: Option<f64>) -> Severity {
    match value.filter(|value| value.is_finite()) {
        Some(value) if value > 0.0 => Severity::Critical,
        Some(_) => Severity::Positive,
        None => Severity::Neutral,
    }
}

// en-US grouping with at most three fraction digits, trailing zeros dropped.
fn group_thousands(value: f64) -> String {
    let rounded = format!("{value:.3}");
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let (negative, digits) = match int_part.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, int_part),
    };
    let fraction = frac_part.trim_end_matches('0');
    let is_zero = fraction.is_empty() && digits.chars().all(|ch| ch == '0');

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    if negative && !is_zero {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
