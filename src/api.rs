use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, ClientBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::model::{AnalysisResult, MarketSnapshot};

const MARKET_DATA_PATH: &str = "market-data";
const ANALYSIS_PATH: &str = "analysis";
const AI_CHAT_PATH: &str = "ai-chat";

/// Why a request produced nothing usable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("server reported failure: {0}")]
    Logical(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => "transport",
            FetchError::Payload(_) => "payload",
            FetchError::Logical(_) => "logical",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Payload(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketFetch {
    pub snapshot: MarketSnapshot,
    pub server_timestamp: Option<DateTime<Utc>>,
}

/// The three server capabilities the dashboard depends on.
pub trait DashboardApi: Send + Sync + 'static {
    fn fetch_market_data(&self) -> impl Future<Output = Result<MarketFetch, FetchError>> + Send;

    fn run_analysis(&self) -> impl Future<Output = Result<AnalysisResult, FetchError>> + Send;

    /// Callers must only pass questions that are non-empty once trimmed.
    fn ask_assistant(
        &self,
        question: String,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

pub struct HttpDashboardClient {
    http: Client,
    base_url: String,
    analysis_options: AnalysisRequest,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct AnalysisRequest {
    use_cached_data: bool,
    include_ai_insights: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

impl HttpDashboardClient {
    pub fn new(config: &ApiConfig) -> Result<Self, anyhow::Error> {
        Ok(HttpDashboardClient {
            http: ClientBuilder::new()
                .connect_timeout(Duration::from_secs(5).min(config.timeout))
                .read_timeout(config.timeout)
                .timeout(config.timeout)
                .build()?,
            base_url: config.base_url.clone(),
            analysis_options: AnalysisRequest {
                use_cached_data: config.use_cached_data,
                include_ai_insights: config.include_ai_insights,
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl DashboardApi for HttpDashboardClient {
    async fn fetch_market_data(&self) -> Result<MarketFetch, FetchError> {
        let response = self.http.get(self.url(MARKET_DATA_PATH)).send().await?;
        let body = read_body(response).await?;
        decode_market_data(&body)
    }

    async fn run_analysis(&self) -> Result<AnalysisResult, FetchError> {
        let response = self
            .http
            .post(self.url(ANALYSIS_PATH))
            .json(&self.analysis_options)
            .send()
            .await?;
        let body = read_body(response).await?;
        decode_analysis(&body)
    }

    async fn ask_assistant(&self, question: String) -> Result<String, FetchError> {
        let response = self
            .http
            .post(self.url(AI_CHAT_PATH))
            .json(&ChatRequest {
                question: &question,
            })
            .send()
            .await?;
        let body = read_body(response).await?;
        decode_chat_answer(&body)
    }
}

async fn read_body(response: Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = envelope_error(&body).unwrap_or_else(|| truncate(&body, 200));
        return Err(FetchError::Transport(format!("HTTP {status}: {detail}")));
    }
    Ok(response.text().await?)
}

pub fn decode_market_data(body: &str) -> Result<MarketFetch, FetchError> {
    let mut envelope = open_envelope(body)?;
    let snapshot = take_payload::<MarketSnapshot>(&mut envelope, "data")?;
    let server_timestamp = envelope
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_server_timestamp);
    Ok(MarketFetch {
        snapshot,
        server_timestamp,
    })
}

pub fn decode_analysis(body: &str) -> Result<AnalysisResult, FetchError> {
    let mut envelope = open_envelope(body)?;
    take_payload(&mut envelope, "analysis")
}

pub fn decode_chat_answer(body: &str) -> Result<String, FetchError> {
    let mut envelope = open_envelope(body)?;
    take_payload(&mut envelope, "response")
}

/// Accepts RFC 3339 and the offset-less ISO form the server emits, read as UTC.
pub fn parse_server_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn open_envelope(body: &str) -> Result<serde_json::Map<String, Value>, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| FetchError::Payload(format!("invalid JSON: {err}")))?;
    let Value::Object(envelope) = value else {
        return Err(FetchError::Payload("envelope is not a JSON object".to_string()));
    };
    match envelope.get("success") {
        Some(Value::Bool(true)) => Ok(envelope),
        Some(Value::Bool(false)) => {
            let detail = envelope
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("success=false")
                .to_string();
            Err(FetchError::Logical(detail))
        }
        Some(other) => Err(FetchError::Payload(format!(
            "`success` is not a boolean: {other}"
        ))),
        None => Err(FetchError::Payload("missing `success` flag".to_string())),
    }
}

fn take_payload<T: DeserializeOwned>(
    envelope: &mut serde_json::Map<String, Value>,
    field: &str,
) -> Result<T, FetchError> {
    let value = match envelope.remove(field) {
        Some(Value::Null) | None => {
            return Err(FetchError::Payload(format!("missing `{field}` payload")));
        }
        Some(value) => value,
    };
    serde_json::from_value(value)
        .map_err(|err| FetchError::Payload(format!("invalid `{field}` payload: {err}")))
}

fn envelope_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

fn truncate(value: &str, max_chars: usize) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut clipped: String = trimmed.chars().take(max_chars).collect();
    clipped.push('…');
    clipped
}
