use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use clap::Parser;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api/eth";

#[derive(Parser, Clone, Debug)]
#[clap(about = "Terminal dashboard for ETH options volatility analysis")]
pub struct CliParams {
    /// Base URL of the dashboard API (market-data, analysis and ai-chat live below it)
    #[clap(
        long = "api-base",
        env = "VOL_DASHBOARD_API_BASE",
        default_value = DEFAULT_API_BASE
    )]
    pub api_base: String,

    /// Deadline for each request before it is treated as failed (e.g., 30s, 2m)
    #[clap(long = "timeout", value_name = "DURATION", default_value = "30s")]
    pub timeout: DurationSpec,

    /// Time zone used for "Last updated" (`local` or an IANA name such as Europe/London)
    #[clap(long = "timezone", env = "VOL_DASHBOARD_TZ", default_value = "local")]
    pub timezone: ConfiguredTimeZone,

    /// JSON-lines file that records failed requests
    #[clap(long = "error-log", value_name = "PATH", default_value = "dashboard_errors.jsonl")]
    pub error_log: PathBuf,

    /// Ask the server to analyse its cached market data instead of collecting fresh data
    #[clap(long = "use-cached-data")]
    pub use_cached_data: bool,

    /// Skip AI-generated narrative in analysis runs
    #[clap(long = "no-ai-insights")]
    pub no_ai_insights: bool,
}

impl CliParams {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: normalize_endpoint(&self.api_base),
            timeout: self.request_timeout(),
            use_cached_data: self.use_cached_data,
            include_ai_insights: !self.no_ai_insights,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout.as_duration()
    }
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub use_cached_data: bool,
    pub include_ai_insights: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for DurationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = parse_duration_spec(s)?;
        Ok(DurationSpec(duration))
    }
}

fn parse_duration_spec(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration spec cannot be empty (examples: 10s, 30s, 2m)".to_string());
    }
    let split_idx = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| "duration spec must end with a unit like ms, s, or m".to_string())?;
    if split_idx == 0 {
        return Err("duration spec must start with a number (examples: 30s, 2m)".to_string());
    }
    let (value_part, unit_part) = trimmed.split_at(split_idx);
    let value: f64 = value_part.parse().map_err(|_| {
        format!(
            "invalid numeric portion `{}` in duration spec `{}`",
            value_part, trimmed
        )
    })?;
    let unit = unit_part.trim().to_lowercase();
    let seconds_multiplier = match unit.as_str() {
        "ms" | "millis" | "milliseconds" => 0.001,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 60.0 * 60.0,
        other => {
            return Err(format!(
                "unsupported duration unit `{}` (use ms, s, m, or h)",
                other
            ));
        }
    };
    let seconds = value * seconds_multiplier;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("duration must be positive: `{}`", trimmed));
    }
    let max_seconds = Duration::MAX.as_secs_f64();
    if seconds > max_seconds {
        return Err(format!("duration `{}` is too large", trimmed));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn normalize_endpoint(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_BASE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConfiguredTimeZone {
    Local,
    Named(Tz),
}

impl ConfiguredTimeZone {
    pub fn format_datetime(&self, timestamp: DateTime<Utc>, fmt: &str) -> String {
        match self {
            ConfiguredTimeZone::Local => timestamp.with_timezone(&Local).format(fmt).to_string(),
            ConfiguredTimeZone::Named(tz) => timestamp.with_timezone(tz).format(fmt).to_string(),
        }
    }
}

impl FromStr for ConfiguredTimeZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("local") {
            return Ok(ConfiguredTimeZone::Local);
        }
        trimmed
            .parse::<Tz>()
            .map(ConfiguredTimeZone::Named)
            .map_err(|err| format!("unknown time zone `{trimmed}`: {err}"))
    }
}
