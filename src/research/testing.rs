//! Deterministic stub collaborators for tests.

use crate::error::{FetchError, ModelError, SearchError};
use crate::llm::{LanguageModel, Prompt, PromptRole};
use crate::search::{PageFetcher, SearchClient, SearchHit};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

/// Language model answering from per-role scripts, then per-role defaults.
pub struct StubModel {
    scripted: Mutex<HashMap<PromptRole, VecDeque<Reply>>>,
    defaults: HashMap<PromptRole, Reply>,
    calls: Mutex<Vec<(PromptRole, Prompt)>>,
}

impl StubModel {
    pub fn new() -> Self {
        let defaults = HashMap::from([
            (PromptRole::QueryWriter, Reply::text(r#"{"query": "initial query"}"#)),
            (PromptRole::QueryRefiner, Reply::text(r#"{"query": "refined query"}"#)),
            (PromptRole::Summarizer, Reply::text("Extension marker [1].")),
            (
                PromptRole::Reflector,
                Reply::text(r#"{"knowledge_gap": "none", "follow_up_query": ""}"#),
            ),
        ]);
        Self {
            scripted: Mutex::new(HashMap::new()),
            defaults,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the script for `role` is exhausted.
    pub fn with_default(mut self, role: PromptRole, reply: Reply) -> Self {
        self.defaults.insert(role, reply);
        self
    }

    /// Queue a one-shot reply for `role`.
    pub fn push(self, role: PromptRole, reply: Reply) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self, role: PromptRole) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .count()
    }

    pub fn prompts(&self, role: PromptRole) -> Vec<Prompt> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, role: PromptRole, prompt: &Prompt) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push((role, prompt.clone()));

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(VecDeque::pop_front);
        let reply = scripted
            .or_else(|| self.defaults.get(&role).cloned())
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(ModelError::Unavailable("stub failure".to_string())),
        }
    }
}

pub fn hit(url: &str, title: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        snippet: format!("About {}", title),
        content: None,
    }
}

/// Search backend returning scripted batches, then empty results.
///
/// The first `failures` calls fail; with a `delay` every call sleeps first.
pub struct StubSearch {
    batches: Mutex<VecDeque<Vec<SearchHit>>>,
    failures: usize,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn with_batches(batches: Vec<Vec<SearchHit>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            failures: 0,
            delay: None,
            attempts: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::flaky(usize::MAX, Vec::new())
    }

    /// Fails the first `failures` calls, then serves `batches`.
    pub fn flaky(failures: usize, batches: Vec<Vec<SearchHit>>) -> Self {
        Self {
            failures,
            ..Self::with_batches(batches)
        }
    }

    /// Sleeps `delay` before answering every call.
    pub fn slow(delay: Duration, batches: Vec<Vec<SearchHit>>) -> Self {
        Self {
            delay: Some(delay),
            ..Self::with_batches(batches)
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if attempt < self.failures {
            return Err(SearchError::Transport("stub transport down".to_string()));
        }
        let mut batch = self.batches.lock().unwrap().pop_front().unwrap_or_default();
        batch.truncate(limit);
        Ok(batch)
    }
}

/// Page fetcher that fails for listed URLs and echoes the URL otherwise.
#[derive(Default)]
pub struct StubFetcher {
    failing: HashSet<String>,
    fetches: AtomicUsize,
}

impl StubFetcher {
    pub fn failing_for(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            Err(FetchError::Http(format!("{} returned 503", url)))
        } else {
            Ok(format!("Full text of {}", url))
        }
    }
}
