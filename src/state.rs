//! The dashboard's view model. Everything the renderer reads lives here, and every
//! mutation is a transition on [`DashboardState`]: operations are started with
//! one of the `begin_*` guards and finished by [`DashboardState::apply`].

use chrono::{DateTime, Utc};

use crate::api::{FetchError, MarketFetch};
use crate::model::{AnalysisResult, MarketSnapshot, TradingPosition};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Refresh,
    Analyze,
    Ask,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Refresh => "refresh",
            Operation::Analyze => "analysis",
            Operation::Ask => "assistant",
        }
    }
}

/// Identifies one request. Only the completion carrying the current token of its
/// operation is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperationState {
    current: Option<RequestToken>,
}

impl OperationState {
    pub fn is_in_flight(&self) -> bool {
        self.current.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantTurn {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    InFlight,
    NoMarketData,
    EmptyQuestion,
}

impl Rejection {
    pub fn describe(&self, operation: Operation) -> String {
        match self {
            Rejection::InFlight => format!("{} already running", operation.label()),
            Rejection::NoMarketData => "load market data before running the analysis".to_string(),
            Rejection::EmptyQuestion => "type a question first".to_string(),
        }
    }
}

/// Result of a request, tagged with the token it was issued under.
#[derive(Clone, Debug)]
pub enum Completion {
    MarketData {
        token: RequestToken,
        result: Result<MarketFetch, FetchError>,
    },
    Analysis {
        token: RequestToken,
        result: Result<AnalysisResult, FetchError>,
    },
    Assistant {
        token: RequestToken,
        question: String,
        result: Result<String, FetchError>,
    },
}

impl Completion {
    pub fn operation(&self) -> Operation {
        match self {
            Completion::MarketData { .. } => Operation::Refresh,
            Completion::Analysis { .. } => Operation::Analyze,
            Completion::Assistant { .. } => Operation::Ask,
        }
    }

    pub fn token(&self) -> RequestToken {
        match self {
            Completion::MarketData { token, .. }
            | Completion::Analysis { token, .. }
            | Completion::Assistant { token, .. } => *token,
        }
    }

    /// Same request, failed. Used when the request never produced a result.
    pub fn failed(
        operation: Operation,
        token: RequestToken,
        question: String,
        error: FetchError,
    ) -> Self {
        match operation {
            Operation::Refresh => Completion::MarketData {
                token,
                result: Err(error),
            },
            Operation::Analyze => Completion::Analysis {
                token,
                result: Err(error),
            },
            Operation::Ask => Completion::Assistant {
                token,
                question,
                result: Err(error),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    Updated(Operation),
    Failed(Operation, FetchError),
    /// The completion belonged to a request that is no longer current.
    Stale(Operation),
}

#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    snapshot: Option<MarketSnapshot>,
    last_updated: Option<DateTime<Utc>>,
    analysis: Option<AnalysisResult>,
    assistant: Option<AssistantTurn>,
    refresh: OperationState,
    analyze: OperationState,
    ask: OperationState,
    next_token: u64,
}

impl DashboardState {
    pub fn new() -> Self {
        DashboardState::default()
    }

    pub fn snapshot(&self) -> Option<&MarketSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Positions of the last successful analysis; empty until one succeeds.
    pub fn positions(&self) -> &[TradingPosition] {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.trading_positions.as_slice())
            .unwrap_or(&[])
    }

    pub fn assistant(&self) -> Option<&AssistantTurn> {
        self.assistant.as_ref()
    }

    pub fn operation(&self, operation: Operation) -> OperationState {
        match operation {
            Operation::Refresh => self.refresh,
            Operation::Analyze => self.analyze,
            Operation::Ask => self.ask,
        }
    }

    pub fn is_in_flight(&self, operation: Operation) -> bool {
        self.operation(operation).is_in_flight()
    }

    pub fn any_in_flight(&self) -> bool {
        self.refresh.is_in_flight() || self.analyze.is_in_flight() || self.ask.is_in_flight()
    }

    pub fn can_analyze(&self) -> bool {
        self.snapshot.is_some() && !self.analyze.is_in_flight()
    }

    pub fn begin_refresh(&mut self) -> Result<RequestToken, Rejection> {
        self.begin(Operation::Refresh)
    }

    pub fn begin_analyze(&mut self) -> Result<RequestToken, Rejection> {
        if self.snapshot.is_none() {
            return Err(Rejection::NoMarketData);
        }
        self.begin(Operation::Analyze)
    }

    pub fn begin_ask(&mut self, question: &str) -> Result<RequestToken, Rejection> {
        if question.trim().is_empty() {
            return Err(Rejection::EmptyQuestion);
        }
        self.begin(Operation::Ask)
    }

    fn begin(&mut self, operation: Operation) -> Result<RequestToken, Rejection> {
        if self.is_in_flight(operation) {
            return Err(Rejection::InFlight);
        }
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.slot_mut(operation).current = Some(token);
        Ok(token)
    }

    /// Folds a finished request into the state. Entities are only replaced on
    /// success; the in-flight flag is cleared whenever the token is current.
    pub fn apply(&mut self, completion: Completion) -> Applied {
        let operation = completion.operation();
        let slot = self.slot_mut(operation);
        if slot.current != Some(completion.token()) {
            return Applied::Stale(operation);
        }
        slot.current = None;
        match completion {
            Completion::MarketData { result, .. } => match result {
                Ok(fetch) => {
                    self.snapshot = Some(fetch.snapshot);
                    self.last_updated = fetch.server_timestamp;
                    Applied::Updated(operation)
                }
                Err(err) => Applied::Failed(operation, err),
            },
            Completion::Analysis { result, .. } => match result {
                Ok(analysis) => {
                    self.analysis = Some(analysis);
                    Applied::Updated(operation)
                }
                Err(err) => Applied::Failed(operation, err),
            },
            Completion::Assistant {
                question, result, ..
            } => match result {
                Ok(answer) => {
                    self.assistant = Some(AssistantTurn { question, answer });
                    Applied::Updated(operation)
                }
                Err(err) => Applied::Failed(operation, err),
            },
        }
    }

    fn slot_mut(&mut self, operation: Operation) -> &mut OperationState {
        match operation {
            Operation::Refresh => &mut self.refresh,
            Operation::Analyze => &mut self.analyze,
            Operation::Ask => &mut self.ask,
        }
    }
}
