use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

use crate::api::{DashboardApi, FetchError};
use crate::state::{Applied, Completion, DashboardState, Operation, Rejection, RequestToken};

/// Owns the view state and runs the three dashboard operations against it.
///
/// Requests run on spawned tasks and report back through the completion channel;
/// the owner of the receiver feeds each message into [`Orchestrator::complete`]
/// so all state changes happen on one thread of control.
pub struct Orchestrator<A> {
    state: DashboardState,
    api: Arc<A>,
    tx: mpsc::UnboundedSender<Completion>,
    timeout: Duration,
}

impl<A: DashboardApi> Orchestrator<A> {
    pub fn new(api: Arc<A>, tx: mpsc::UnboundedSender<Completion>, timeout: Duration) -> Self {
        Orchestrator {
            state: DashboardState::new(),
            api,
            tx,
            timeout,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn refresh(&mut self) -> Result<RequestToken, Rejection> {
        let token = self.state.begin_refresh()?;
        let api = Arc::clone(&self.api);
        self.dispatch(Operation::Refresh, token, String::new(), async move {
            let result = api.fetch_market_data().await;
            Completion::MarketData { token, result }
        });
        Ok(token)
    }

    pub fn analyze(&mut self) -> Result<RequestToken, Rejection> {
        let token = self.state.begin_analyze()?;
        let api = Arc::clone(&self.api);
        self.dispatch(Operation::Analyze, token, String::new(), async move {
            let result = api.run_analysis().await;
            Completion::Analysis { token, result }
        });
        Ok(token)
    }

    pub fn ask(&mut self, question: &str) -> Result<RequestToken, Rejection> {
        let token = self.state.begin_ask(question)?;
        let question = question.trim().to_string();
        let api = Arc::clone(&self.api);
        let asked = question.clone();
        self.dispatch(Operation::Ask, token, question, async move {
            let result = api.ask_assistant(asked.clone()).await;
            Completion::Assistant {
                token,
                question: asked,
                result,
            }
        });
        Ok(token)
    }

    pub fn complete(&mut self, completion: Completion) -> Applied {
        self.state.apply(completion)
    }

    // A completion is always sent: timeouts abort the request and a panicking
    // request is reported as a transport failure.
    fn dispatch<F>(&self, operation: Operation, token: RequestToken, question: String, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let mut task = tokio::spawn(request);
            let completion = match time::timeout(timeout, &mut task).await {
                Ok(Ok(completion)) => completion,
                Ok(Err(join_err)) => Completion::failed(
                    operation,
                    token,
                    question,
                    FetchError::Transport(format!("request task failed: {join_err}")),
                ),
                Err(_) => {
                    task.abort();
                    Completion::failed(operation, token, question, FetchError::Timeout(timeout))
                }
            };
            let _ = tx.send(completion);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::Notify;

    use super::*;
    use crate::api::MarketFetch;
    use crate::api::fake::ScriptedApi;
    use crate::format::{self, Severity};
    use crate::model::{AnalysisResult, MarketSnapshot, TradingPosition};

    fn harness(
        api: ScriptedApi,
        timeout: Duration,
    ) -> (
        Arc<ScriptedApi>,
        Orchestrator<ScriptedApi>,
        mpsc::UnboundedReceiver<Completion>,
    ) {
        let api = Arc::new(api);
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(Arc::clone(&api), tx, timeout);
        (api, orchestrator, rx)
    }

    fn eth_market() -> MarketFetch {
        MarketFetch {
            snapshot: MarketSnapshot {
                eth_price: Some(3000.0),
                eth_iv_deribit: Some(65.2),
                eth_rv_30d: Some(58.0),
                ..MarketSnapshot::default()
            },
            server_timestamp: None,
        }
    }

    fn one_position_analysis() -> AnalysisResult {
        AnalysisResult {
            trading_positions: vec![TradingPosition {
                position_type: Some("Short Put Spread".to_string()),
                priority: Some("HIGH".to_string()),
                win_probability: Some(0.75),
                ..TradingPosition::default()
            }],
            ..AnalysisResult::default()
        }
    }

    async fn settle(
        orchestrator: &mut Orchestrator<ScriptedApi>,
        rx: &mut mpsc::UnboundedReceiver<Completion>,
    ) -> Applied {
        let completion = rx.recv().await.expect("a completion should be delivered");
        orchestrator.complete(completion)
    }

    #[tokio::test]
    async fn mount_refresh_renders_positive_vrp() {
        let api = ScriptedApi::default();
        api.push_market(Ok(eth_market()));
        let (api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.refresh().expect("refresh should start");
        assert!(orchestrator.state().is_in_flight(Operation::Refresh));
        let applied = settle(&mut orchestrator, &mut rx).await;

        assert_eq!(applied, Applied::Updated(Operation::Refresh));
        assert!(!orchestrator.state().is_in_flight(Operation::Refresh));
        assert_eq!(api.market_calls.load(Ordering::SeqCst), 1);
        let snapshot = orchestrator.state().snapshot().expect("snapshot loaded");
        let premium = format::vrp(snapshot);
        assert_eq!(format::format_percent(premium), "7.20%");
        assert_eq!(format::signed_tone(premium), Severity::Positive);
    }

    #[tokio::test]
    async fn analyze_without_snapshot_is_a_noop() {
        let (api, mut orchestrator, mut rx) =
            harness(ScriptedApi::default(), Duration::from_secs(5));

        assert_eq!(orchestrator.analyze(), Err(Rejection::NoMarketData));
        assert!(!orchestrator.state().is_in_flight(Operation::Analyze));
        tokio::task::yield_now().await;
        assert_eq!(api.analysis_calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_analysis_leaves_previous_result() {
        let api = ScriptedApi::default();
        api.push_market(Ok(eth_market()));
        api.push_analysis(Ok(one_position_analysis()));
        api.push_analysis(Err(FetchError::Logical("Analysis failed".to_string())));
        let (_api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.refresh().unwrap();
        settle(&mut orchestrator, &mut rx).await;
        orchestrator.analyze().unwrap();
        settle(&mut orchestrator, &mut rx).await;
        let analysis_before = orchestrator.state().analysis().cloned();
        let positions_before = orchestrator.state().positions().to_vec();
        assert_eq!(positions_before.len(), 1);

        orchestrator.analyze().unwrap();
        let applied = settle(&mut orchestrator, &mut rx).await;
        assert_eq!(
            applied,
            Applied::Failed(
                Operation::Analyze,
                FetchError::Logical("Analysis failed".to_string())
            )
        );
        assert_eq!(orchestrator.state().analysis().cloned(), analysis_before);
        assert_eq!(orchestrator.state().positions(), positions_before.as_slice());
        assert!(!orchestrator.state().is_in_flight(Operation::Analyze));
    }

    #[tokio::test]
    async fn blank_questions_never_reach_the_network() {
        let (api, mut orchestrator, mut rx) =
            harness(ScriptedApi::default(), Duration::from_secs(5));

        assert_eq!(orchestrator.ask(""), Err(Rejection::EmptyQuestion));
        assert_eq!(orchestrator.ask("   "), Err(Rejection::EmptyQuestion));
        tokio::task::yield_now().await;
        assert_eq!(api.ask_calls.load(Ordering::SeqCst), 0);
        assert!(orchestrator.state().assistant().is_none());
        assert!(!orchestrator.state().is_in_flight(Operation::Ask));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_question_is_rejected_while_first_is_pending() {
        let api = ScriptedApi {
            ask_gate: Some(Notify::new()),
            ..ScriptedApi::default()
        };
        api.push_answer(Ok("VRP is IV minus RV.".to_string()));
        let (api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.ask("  What is VRP?  ").expect("first question starts");
        assert_eq!(orchestrator.ask("What is skew?"), Err(Rejection::InFlight));
        api.ask_gate.as_ref().unwrap().notify_one();
        let applied = settle(&mut orchestrator, &mut rx).await;

        assert_eq!(applied, Applied::Updated(Operation::Ask));
        assert_eq!(api.ask_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*api.questions.lock().unwrap(), vec!["What is VRP?".to_string()]);
        let turn = orchestrator.state().assistant().expect("answer recorded");
        assert_eq!(turn.question, "What is VRP?");
        assert_eq!(turn.answer, "VRP is IV minus RV.");
    }

    #[tokio::test]
    async fn refresh_and_ask_overlap_and_finish_in_any_order() {
        let api = ScriptedApi {
            ask_gate: Some(Notify::new()),
            ..ScriptedApi::default()
        };
        api.push_market(Ok(eth_market()));
        api.push_answer(Ok("Skew favours puts.".to_string()));
        let (api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.ask("What is skew?").unwrap();
        orchestrator.refresh().unwrap();
        assert!(orchestrator.state().is_in_flight(Operation::Ask));
        assert!(orchestrator.state().is_in_flight(Operation::Refresh));

        // The refresh finishes first while the question is still parked.
        assert_eq!(
            settle(&mut orchestrator, &mut rx).await,
            Applied::Updated(Operation::Refresh)
        );
        assert!(orchestrator.state().is_in_flight(Operation::Ask));

        api.ask_gate.as_ref().unwrap().notify_one();
        assert_eq!(
            settle(&mut orchestrator, &mut rx).await,
            Applied::Updated(Operation::Ask)
        );
        assert!(!orchestrator.state().any_in_flight());
        assert!(orchestrator.state().snapshot().is_some());
        assert!(orchestrator.state().assistant().is_some());
    }

    #[tokio::test]
    async fn hung_request_times_out_and_clears_flag() {
        let api = ScriptedApi {
            hang_market: true,
            ..ScriptedApi::default()
        };
        let timeout = Duration::from_millis(50);
        let (_api, mut orchestrator, mut rx) = harness(api, timeout);

        orchestrator.refresh().unwrap();
        let applied = settle(&mut orchestrator, &mut rx).await;

        assert_eq!(
            applied,
            Applied::Failed(Operation::Refresh, FetchError::Timeout(timeout))
        );
        assert!(!orchestrator.state().is_in_flight(Operation::Refresh));
        assert!(orchestrator.state().snapshot().is_none());
        assert!(orchestrator.refresh().is_ok(), "user can re-trigger after a timeout");
    }

    #[tokio::test]
    async fn panicking_request_still_clears_flag() {
        let api = ScriptedApi {
            panic_on_analysis: true,
            ..ScriptedApi::default()
        };
        api.push_market(Ok(eth_market()));
        let (_api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.refresh().unwrap();
        settle(&mut orchestrator, &mut rx).await;
        orchestrator.analyze().unwrap();
        let applied = settle(&mut orchestrator, &mut rx).await;

        match applied {
            Applied::Failed(Operation::Analyze, err) => assert_eq!(err.kind(), "transport"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!orchestrator.state().is_in_flight(Operation::Analyze));
        assert!(orchestrator.state().analysis().is_none());
        assert!(orchestrator.state().positions().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_snapshot() {
        let api = ScriptedApi::default();
        api.push_market(Ok(eth_market()));
        api.push_market(Err(FetchError::Payload("invalid JSON".to_string())));
        let (_api, mut orchestrator, mut rx) = harness(api, Duration::from_secs(5));

        orchestrator.refresh().unwrap();
        settle(&mut orchestrator, &mut rx).await;
        orchestrator.refresh().unwrap();
        let applied = settle(&mut orchestrator, &mut rx).await;

        assert!(matches!(applied, Applied::Failed(Operation::Refresh, _)));
        assert_eq!(
            orchestrator.state().snapshot().and_then(|s| s.eth_price),
            Some(3000.0)
        );
    }
}
