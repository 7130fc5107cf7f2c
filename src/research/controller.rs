//! The research loop.
//!
//! The controller drives one run through
//! `Init -> Generating -> Researching -> Summarizing -> Reflecting` cycles
//! until the loop budget runs out, the reflector finds no gap, the caller
//! cancels, or a fatal stage failure occurs. Every collaborator failure is
//! classified here before the next stage is chosen.

use super::executor::ResearchExecutor;
use super::query::QueryGenerator;
use super::reflector::{GapVerdict, Reflector};
use super::state::{ResearchState, Stage};
use super::summarizer::Summarizer;
use super::verifier::{verify_sources, SourceVerifier};
use crate::config::ResearchSettings;
use crate::error::{FailureKind, ResearchError};
use crate::llm::parse::normalize_query;
use crate::llm::LanguageModel;
use crate::models::{RunStats, TerminationReason};
use crate::report::{Finalizer, RenderedReport, Renderer};
use crate::search::{PageFetcher, SearchClient, SearchHit};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Search transport calls per cycle (one retry).
const SEARCH_ATTEMPTS: usize = 2;

/// External services the controller talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchClient>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub verifier: Arc<dyn SourceVerifier>,
}

/// Receives a callback each time the controller enters a stage.
pub trait ProgressObserver: Send + Sync {
    fn on_stage(&self, stage: Stage, state: &ResearchState);
}

/// Outcome of a run.
pub struct ResearchRun {
    pub state: ResearchState,
    pub termination: TerminationReason,
    pub stats: RunStats,
    /// Present for every non-fatal termination unless rendering failed.
    pub report: Option<RenderedReport>,
    /// What ended the run early or prevented the report.
    pub error: Option<ResearchError>,
}

/// Why the cycle loop stopped early.
enum Halt {
    Cancelled,
    Fatal(FailureKind, ResearchError),
}

impl Halt {
    fn fatal(kind: FailureKind) -> impl FnOnce(ResearchError) -> Halt {
        move |error| Halt::Fatal(kind, error)
    }
}

pub struct ResearchController {
    settings: ResearchSettings,
    query_generator: QueryGenerator,
    executor: ResearchExecutor,
    summarizer: Summarizer,
    reflector: Reflector,
    verifier: Arc<dyn SourceVerifier>,
    finalizer: Finalizer,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ResearchController {
    pub fn new(settings: ResearchSettings, collaborators: Collaborators) -> Self {
        let strip = settings.strip_thinking_tokens;
        let timeout = settings.model_timeout;

        Self {
            query_generator: QueryGenerator::new(
                collaborators.model.clone(),
                strip,
                settings.refine_gap_queries,
                timeout,
            ),
            executor: ResearchExecutor::new(
                collaborators.search,
                collaborators.fetcher,
                settings.max_sources_per_loop,
                settings.fetch_full_page,
                settings.search_timeout,
                settings.fetch_timeout,
            ),
            summarizer: Summarizer::new(collaborators.model.clone(), strip, timeout),
            reflector: Reflector::new(collaborators.model, strip, timeout),
            verifier: collaborators.verifier,
            finalizer: Finalizer::new(
                collaborators.renderer,
                settings.output_format,
                settings.model_name.clone(),
                settings.max_loops,
            ),
            observer: None,
            settings,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Research `topic` until a termination condition is reached.
    ///
    /// Never returns an error: failures are reported through the run's
    /// termination reason and `error` field.
    pub async fn run(&self, topic: &str, cancel: &CancellationToken) -> ResearchRun {
        let started = Instant::now();
        let mut state = ResearchState::new(topic.trim(), self.settings.strategy);
        let mut stats = RunStats::default();

        info!(
            "Researching '{}' ({} strategy, up to {} cycles)",
            state.topic(),
            state.strategy(),
            self.settings.max_loops
        );
        self.notify(Stage::Init, &state);

        let mut interruption = None;
        let termination = match self.cycles(&mut state, &mut stats, cancel).await {
            Ok(reason) => reason,
            Err(Halt::Cancelled) => {
                let cancelled = ResearchError::CallerCancelled;
                info!("{} after {} cycles", cancelled, state.loop_count());
                interruption = Some(cancelled);
                TerminationReason::CallerCancelled
            }
            Err(Halt::Fatal(kind, error)) => {
                error!("Research failed: {}", error);
                return self.fail(state, stats, kind, error);
            }
        };

        self.notify(Stage::Finalizing, &state);

        if self.settings.enable_source_verification {
            let failures = verify_sources(self.verifier.as_ref(), state.sources_mut());
            stats.verifier_failures += failures;
        }

        match self
            .finalizer
            .finalize(&state, termination, &stats, started.elapsed())
        {
            Ok(report) => {
                state.terminate();
                ResearchRun {
                    state,
                    termination,
                    stats,
                    report: Some(report),
                    error: interruption,
                }
            }
            Err(error) => match error.fatal_kind() {
                Some(kind) => {
                    error!("Finalization failed: {}", error);
                    self.fail(state, stats, kind, error)
                }
                None => {
                    error!("Could not render report: {}", error);
                    state.terminate();
                    ResearchRun {
                        state,
                        termination,
                        stats,
                        report: None,
                        error: Some(error),
                    }
                }
            },
        }
    }

    async fn cycles(
        &self,
        state: &mut ResearchState,
        stats: &mut RunStats,
        cancel: &CancellationToken,
    ) -> Result<TerminationReason, Halt> {
        let mut previous_gap: Option<String> = None;

        loop {
            self.enter(Stage::Generating, state, cancel)?;
            self.query_generator
                .generate(state)
                .await
                .map_err(Halt::fatal(FailureKind::GenerationFailure))?;

            self.enter(Stage::Researching, state, cancel)?;
            let cycle = state.loop_count() + 1;
            let hits = self
                .search_with_retry(state.current_query(), stats)
                .await
                .map_err(Halt::fatal(FailureKind::SearchUnavailable))?;
            let batch = self.executor.collect(hits, cycle).await;
            stats.fetch_drops += batch.dropped;

            if cancel.is_cancelled() {
                debug!("Discarding {} fetched results", batch.records.len());
                return Err(Halt::Cancelled);
            }

            let outcome = state.merge_sources(batch.records);
            stats.duplicates_discarded += outcome.discarded;
            info!(
                "Cycle {}: {} new sources, {} duplicates ({} total)",
                cycle,
                outcome.accepted_count(),
                outcome.discarded,
                state.sources().len()
            );

            self.enter(Stage::Summarizing, state, cancel)?;
            let new_sources = &state.sources().records()[outcome.accepted.clone()];
            let summarized = self
                .summarizer
                .summarize(
                    state.topic(),
                    state.running_summary(),
                    new_sources,
                    outcome.accepted.start + 1,
                )
                .await;
            match summarized {
                Ok(Some(addition)) => state.extend_summary(&addition),
                Ok(None) => {}
                Err(e) => {
                    warn!("{}; keeping the previous summary", e);
                    stats.summarizer_failures += 1;
                }
            }

            state.complete_cycle(self.settings.max_loops);

            self.enter(Stage::Reflecting, state, cancel)?;
            if state.loop_count() >= self.settings.max_loops {
                info!("Loop budget of {} cycles exhausted", self.settings.max_loops);
                return Ok(TerminationReason::LoopBudgetExhausted);
            }

            let reflection = self
                .reflector
                .reflect(state.topic(), state.running_summary())
                .await;
            if reflection.fell_back {
                stats.reflection_fallbacks += 1;
            }

            match reflection.verdict {
                GapVerdict::NoGap => return Ok(TerminationReason::NoGapFound),
                GapVerdict::FollowUp(query) => {
                    let repeated = previous_gap
                        .as_deref()
                        .is_some_and(|prev| normalize_query(prev) == normalize_query(&query));
                    if repeated {
                        warn!("Reflector proposed '{}' twice in a row, stopping", query);
                        stats.stall_overrides += 1;
                        return Ok(TerminationReason::NoGapFound);
                    }
                    previous_gap = Some(query.clone());
                    state.set_pending_gap(query);
                }
            }
        }
    }

    async fn search_with_retry(
        &self,
        query: &str,
        stats: &mut RunStats,
    ) -> Result<Vec<SearchHit>, ResearchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            stats.search_attempts += 1;

            match self.executor.search(query).await {
                Ok(hits) => {
                    debug!("Search returned {} results", hits.len());
                    return Ok(hits);
                }
                Err(e) if attempt < SEARCH_ATTEMPTS => {
                    warn!(
                        "Search attempt {} failed: {}. Retrying in {:?}",
                        attempt, e, self.settings.search_retry_backoff
                    );
                    tokio::time::sleep(self.settings.search_retry_backoff).await;
                }
                Err(source) => {
                    return Err(ResearchError::SearchUnavailable {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    /// Announce `stage`, then honor a pending cancellation.
    fn enter(
        &self,
        stage: Stage,
        state: &ResearchState,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        self.notify(stage, state);
        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        debug!("Stage: {}", stage);
        Ok(())
    }

    fn notify(&self, stage: Stage, state: &ResearchState) {
        if let Some(observer) = &self.observer {
            observer.on_stage(stage, state);
        }
    }

    fn fail(
        &self,
        mut state: ResearchState,
        stats: RunStats,
        kind: FailureKind,
        error: ResearchError,
    ) -> ResearchRun {
        self.notify(Stage::Failed, &state);
        state.terminate();
        ResearchRun {
            state,
            termination: TerminationReason::FatalError(kind),
            stats,
            report: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CredibilityTier, OutputFormat, ResearchStrategy};
    use crate::report::finalizer::citation_markers;
    use crate::report::ReportRenderer;
    use crate::error::SearchError;
    use crate::llm::PromptRole;
    use crate::research::testing::{hit, Reply, StubFetcher, StubModel, StubSearch};
    use crate::research::verifier::DomainReputationVerifier;
    use std::sync::Mutex;
    use std::time::Duration;

    fn settings(max_loops: usize) -> ResearchSettings {
        ResearchSettings {
            model_name: "stub-model".to_string(),
            max_loops,
            strategy: ResearchStrategy::Broad,
            max_sources_per_loop: 3,
            fetch_full_page: false,
            enable_source_verification: false,
            refine_gap_queries: false,
            strip_thinking_tokens: true,
            output_format: OutputFormat::Markdown,
            model_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(1),
            search_retry_backoff: Duration::from_millis(1),
        }
    }

    fn collaborators(model: Arc<StubModel>, search: Arc<StubSearch>) -> Collaborators {
        Collaborators {
            model,
            search,
            fetcher: Arc::new(StubFetcher::default()),
            renderer: Arc::new(ReportRenderer::new()),
            verifier: Arc::new(DomainReputationVerifier::new()),
        }
    }

    fn gap(query: &str) -> Reply {
        Reply::Text(format!(
            r#"{{"knowledge_gap": "missing detail", "follow_up_query": "{}"}}"#,
            query
        ))
    }

    /// Records every stage entered, optionally cancelling on one of them.
    struct Recorder {
        stages: Mutex<Vec<(Stage, usize)>>,
        cancel_on: Option<(Stage, usize)>,
        token: CancellationToken,
    }

    impl Recorder {
        fn new(token: CancellationToken, cancel_on: Option<(Stage, usize)>) -> Self {
            Self {
                stages: Mutex::new(Vec::new()),
                cancel_on,
                token,
            }
        }

        fn entries(&self) -> Vec<(Stage, usize)> {
            self.stages.lock().unwrap().clone()
        }
    }

    impl ProgressObserver for Recorder {
        fn on_stage(&self, stage: Stage, state: &ResearchState) {
            self.stages
                .lock()
                .unwrap()
                .push((stage, state.running_summary().len()));
            if self.cancel_on == Some((stage, state.loop_count())) {
                self.token.cancel();
            }
        }
    }

    #[tokio::test]
    async fn test_solar_scenario_budget_exhausted() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::Reflector, gap("perovskite cells")));
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://nrel.gov/a", "A"), hit("https://energy.gov/b", "B")],
            vec![hit("https://NREL.gov/a/", "A again"), hit("https://pv.org/c", "C")],
        ]));
        let controller = ResearchController::new(settings(2), collaborators(model.clone(), search));

        let run = controller
            .run("solar panel efficiency", &CancellationToken::new())
            .await;

        assert_eq!(run.termination, TerminationReason::LoopBudgetExhausted);
        assert_eq!(run.state.sources().len(), 3);
        assert_eq!(run.state.loop_count(), 2);
        assert_eq!(run.stats.duplicates_discarded, 1);
        assert_eq!(run.state.sources().records()[0].title, "A");
        assert!(run.state.is_terminated());
        assert!(run.report.is_some());
        // The budget check skips the last reflection call
        assert_eq!(model.calls(PromptRole::Reflector), 1);
    }

    #[tokio::test]
    async fn test_search_unavailable_after_one_retry() {
        let model = Arc::new(StubModel::new());
        let search = Arc::new(StubSearch::failing());
        let controller =
            ResearchController::new(settings(3), collaborators(model.clone(), search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(
            run.termination,
            TerminationReason::FatalError(FailureKind::SearchUnavailable)
        );
        assert_eq!(search.attempts(), 2);
        assert_eq!(run.stats.search_attempts, 2);
        assert!(run.state.sources().is_empty());
        assert!(run.report.is_none());
        assert!(matches!(
            run.error,
            Some(ResearchError::SearchUnavailable { attempts: 2, .. })
        ));
        assert_eq!(model.calls(PromptRole::Summarizer), 0);
    }

    #[tokio::test]
    async fn test_search_recovers_on_retry() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::Reflector, gap("more")));
        let search = Arc::new(StubSearch::flaky(1, vec![vec![hit("https://nrel.gov/a", "A")]]));
        let controller =
            ResearchController::new(settings(1), collaborators(model.clone(), search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(run.termination, TerminationReason::LoopBudgetExhausted);
        assert_eq!(search.attempts(), 2);
        assert_eq!(run.stats.search_attempts, 2);
        assert_eq!(run.state.sources().len(), 1);
        assert!(run.report.is_some());
        assert!(run.error.is_none());
        assert_eq!(model.calls(PromptRole::Summarizer), 1);
    }

    #[tokio::test]
    async fn test_search_timeouts_count_as_failures() {
        let model = Arc::new(StubModel::new());
        let search = Arc::new(StubSearch::slow(
            Duration::from_secs(3),
            vec![vec![hit("https://nrel.gov/a", "A")]],
        ));
        let mut settings = settings(3);
        settings.search_timeout = Duration::from_millis(50);
        let controller =
            ResearchController::new(settings, collaborators(model.clone(), search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(
            run.termination,
            TerminationReason::FatalError(FailureKind::SearchUnavailable)
        );
        assert_eq!(search.attempts(), 2);
        assert!(run.report.is_none());
        assert!(matches!(
            run.error,
            Some(ResearchError::SearchUnavailable {
                attempts: 2,
                source: SearchError::Timeout(_),
            })
        ));
        assert_eq!(model.calls(PromptRole::Summarizer), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_first_cycle() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::Reflector, gap("more")));
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://a.org", "A"), hit("https://b.org", "B")],
            vec![hit("https://c.org", "C")],
        ]));
        let token = CancellationToken::new();
        let recorder = Arc::new(Recorder::new(token.clone(), Some((Stage::Generating, 1))));
        let controller = ResearchController::new(settings(5), collaborators(model, search.clone()))
            .with_observer(recorder.clone());

        let run = controller.run("solar", &token).await;

        assert_eq!(run.termination, TerminationReason::CallerCancelled);
        assert_eq!(run.state.loop_count(), 1);
        let urls: Vec<_> = run.state.sources().records().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.org", "https://b.org"]);
        assert_eq!(search.attempts(), 1);

        let report = run.report.expect("cancelled runs still report");
        assert_eq!(report.report.sources.len(), 2);
        assert_eq!(
            recorder.entries().last().map(|(stage, _)| *stage),
            Some(Stage::Finalizing)
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let search = Arc::new(StubSearch::with_batches(vec![]));
        let controller = ResearchController::new(
            settings(3),
            collaborators(Arc::new(StubModel::new()), search.clone()),
        );

        let run = controller.run("solar", &token).await;

        assert_eq!(run.termination, TerminationReason::CallerCancelled);
        assert_eq!(search.attempts(), 0);
        assert!(run.report.is_some());
        assert!(matches!(run.error, Some(ResearchError::CallerCancelled)));
    }

    #[tokio::test]
    async fn test_repeated_gap_stops_within_two_cycles() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::Reflector, gap("Same  Query")));
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://a.org", "A")],
            vec![hit("https://b.org", "B")],
            vec![hit("https://c.org", "C")],
        ]));
        let controller = ResearchController::new(settings(10), collaborators(model, search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(run.termination, TerminationReason::NoGapFound);
        assert_eq!(run.state.loop_count(), 2);
        assert_eq!(run.stats.stall_overrides, 1);
        assert_eq!(search.queries(), vec!["initial query", "Same  Query"]);
    }

    #[tokio::test]
    async fn test_loop_budget_bounds_cycles() {
        let model = Arc::new((0..10).fold(StubModel::new(), |model, i| {
            model.push(PromptRole::Reflector, gap(&format!("distinct follow-up {}", i)))
        }));
        let search = Arc::new(StubSearch::with_batches(vec![]));
        let controller =
            ResearchController::new(settings(4), collaborators(model.clone(), search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(run.termination, TerminationReason::LoopBudgetExhausted);
        assert_eq!(run.state.loop_count(), 4);
        assert_eq!(search.attempts(), 4);
        assert_eq!(model.calls(PromptRole::Reflector), 3);
    }

    #[tokio::test]
    async fn test_no_gap_ends_early() {
        let search = Arc::new(StubSearch::with_batches(vec![vec![hit("https://a.org", "A")]]));
        let controller = ResearchController::new(
            settings(5),
            collaborators(Arc::new(StubModel::new()), search),
        );

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(run.termination, TerminationReason::NoGapFound);
        assert_eq!(run.state.loop_count(), 1);
        assert_eq!(run.state.running_summary(), "Extension marker [1].");
    }

    #[tokio::test]
    async fn test_summary_only_grows() {
        let model = Arc::new(
            StubModel::new()
                .push(PromptRole::Summarizer, Reply::text("First [1]."))
                .push(PromptRole::Summarizer, Reply::Fail)
                .push(PromptRole::Summarizer, Reply::text("Third [3]."))
                .with_default(PromptRole::Reflector, gap("next"))
                .push(PromptRole::Reflector, gap("one"))
                .push(PromptRole::Reflector, gap("two")),
        );
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://a.org", "A")],
            vec![hit("https://b.org", "B")],
            vec![hit("https://c.org", "C")],
        ]));
        let token = CancellationToken::new();
        let recorder = Arc::new(Recorder::new(token.clone(), None));
        let controller = ResearchController::new(settings(3), collaborators(model, search))
            .with_observer(recorder.clone());

        let run = controller.run("solar", &token).await;

        assert_eq!(run.stats.summarizer_failures, 1);
        assert_eq!(run.state.running_summary(), "First [1].\n\nThird [3].");

        let lengths: Vec<usize> = recorder.entries().iter().map(|(_, len)| *len).collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_citations_resolve_in_rendered_report() {
        let model = Arc::new(
            StubModel::new()
                .push(PromptRole::Summarizer, Reply::text("Efficiency is 22% [1] [2]."))
                .push(PromptRole::Summarizer, Reply::text("Perovskites [3]."))
                .push(PromptRole::Reflector, gap("perovskite")),
        );
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://a.org", "A"), hit("https://b.org", "B")],
            vec![hit("https://c.org", "C")],
        ]));
        let controller = ResearchController::new(settings(2), collaborators(model, search));

        let run = controller.run("solar", &CancellationToken::new()).await;
        let report = run.report.expect("report");

        let markers = citation_markers(&report.report.summary);
        assert_eq!(markers, vec![1, 2, 3]);
        assert!(markers.iter().all(|&n| n >= 1 && n <= report.report.sources.len()));
    }

    #[tokio::test]
    async fn test_dangling_citation_fails_run() {
        let model = Arc::new(
            StubModel::new().push(PromptRole::Summarizer, Reply::text("Claim [7].")),
        );
        let search = Arc::new(StubSearch::with_batches(vec![vec![hit("https://a.org", "A")]]));
        let controller = ResearchController::new(settings(1), collaborators(model, search));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(
            run.termination,
            TerminationReason::FatalError(FailureKind::DanglingCitation)
        );
        assert!(run.report.is_none());
        assert!(run.state.is_terminated());
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::QueryWriter, Reply::Fail));
        let search = Arc::new(StubSearch::with_batches(vec![]));
        let controller = ResearchController::new(settings(3), collaborators(model, search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(
            run.termination,
            TerminationReason::FatalError(FailureKind::GenerationFailure)
        );
        assert_eq!(search.attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_search_results_flow_forward() {
        let model = Arc::new(StubModel::new());
        let search = Arc::new(StubSearch::with_batches(vec![]));
        let controller = ResearchController::new(settings(1), collaborators(model.clone(), search));

        let run = controller.run("solar", &CancellationToken::new()).await;

        assert_eq!(run.termination, TerminationReason::LoopBudgetExhausted);
        assert!(run.state.sources().is_empty());
        assert!(run.state.running_summary().is_empty());
        assert_eq!(model.calls(PromptRole::Summarizer), 0);
        assert!(run.report.is_some());
    }

    #[tokio::test]
    async fn test_reflection_failure_falls_back() {
        let model = Arc::new(StubModel::new().with_default(PromptRole::Reflector, Reply::Fail));
        let search = Arc::new(StubSearch::with_batches(vec![
            vec![hit("https://a.org", "A")],
            vec![hit("https://b.org", "B")],
        ]));
        let controller = ResearchController::new(settings(5), collaborators(model, search.clone()));

        let run = controller.run("solar", &CancellationToken::new()).await;

        // Second identical fallback trips the repeat guard
        assert_eq!(run.termination, TerminationReason::NoGapFound);
        assert_eq!(run.stats.reflection_fallbacks, 2);
        assert_eq!(search.queries()[1], "solar detailed analysis");
    }

    #[tokio::test]
    async fn test_verification_annotates_sources() {
        let search = Arc::new(StubSearch::with_batches(vec![vec![
            hit("https://nrel.gov/a", "Research study"),
            hit("http://blog.example.com", "Opinion"),
        ]]));
        let mut settings = settings(1);
        settings.enable_source_verification = true;
        let controller =
            ResearchController::new(settings, collaborators(Arc::new(StubModel::new()), search));

        let run = controller.run("solar", &CancellationToken::new()).await;

        let tiers: Vec<_> = run
            .state
            .sources()
            .records()
            .iter()
            .map(|s| s.credibility_tier)
            .collect();
        assert_eq!(tiers, vec![CredibilityTier::High, CredibilityTier::Low]);
        assert_eq!(run.stats.verifier_failures, 0);
    }
}
