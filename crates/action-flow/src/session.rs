//! Engine session: collaborators, current index and failure counters
//!
//! One session drives one page for one run at a time. Everything a step needs
//! is reached through the session; nothing lives in globals.

use crate::{config::EngineConfig, errors::StepDiagnostics};
use action_gate::{ValidationScanner, Verifier};
use action_locator::{similar_keys, LocatorError, SemanticIndexer, TextResolver};
use action_primitives::{BrowserBackend, StructuredExtractor, WaitBudget};
use replay_core_types::{RunId, SemanticIndex};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const SIMILAR_ELEMENT_LIMIT: usize = 5;

/// Failure budget shared by every step of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounters {
    pub global_failures: u32,
    pub consecutive_failures: u32,
    pub consecutive_verification_failures: u32,
    pub last_successful_step: Option<String>,
}

impl FailureCounters {
    pub fn record_success(&mut self, step: &str) {
        self.consecutive_failures = 0;
        self.consecutive_verification_failures = 0;
        self.last_successful_step = Some(step.to_string());
    }

    pub fn record_failure(&mut self, verification_only: bool) {
        self.global_failures += 1;
        self.consecutive_failures += 1;
        if verification_only {
            self.consecutive_verification_failures += 1;
        }
    }
}

pub struct EngineSession {
    backend: Arc<dyn BrowserBackend>,
    extractor: Option<Arc<dyn StructuredExtractor>>,
    config: EngineConfig,
    indexer: SemanticIndexer,
    resolver: Arc<TextResolver>,
    verifier: Verifier,
    index: Option<SemanticIndex>,
    counters: FailureCounters,
    run_id: RunId,
}

impl EngineSession {
    pub fn new(backend: Arc<dyn BrowserBackend>, config: EngineConfig) -> Self {
        let indexer = SemanticIndexer::new(config.network_idle_timeout());
        let resolver = Arc::new(TextResolver::new(config.direct_probe_timeout()));
        let verifier = Verifier::new(
            SemanticIndexer::new(config.network_idle_timeout()),
            resolver.clone(),
        )
        .with_settle_delay(config.settle_delay())
        .with_strict_progression(config.strict_progression);

        Self {
            backend,
            extractor: None,
            config,
            indexer,
            resolver,
            verifier,
            index: None,
            counters: FailureCounters::default(),
            run_id: RunId::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn StructuredExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn backend(&self) -> &dyn BrowserBackend {
        self.backend.as_ref()
    }

    pub fn extractor(&self) -> Option<&dyn StructuredExtractor> {
        self.extractor.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TextResolver {
        &self.resolver
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn wait_budget(&self) -> WaitBudget {
        WaitBudget {
            primary: self.config.element_timeout(),
            fallback: self.config.fallback_timeout(),
        }
    }

    /// Last index built, if any.
    pub fn index(&self) -> Option<&SemanticIndex> {
        self.index.as_ref()
    }

    /// Rebuild the index from the live page and make it current.
    pub async fn refresh_index(&mut self) -> Result<&SemanticIndex, LocatorError> {
        let start = Instant::now();
        let index = self.indexer.build(self.backend.as_ref()).await?;
        debug!(
            run = %self.run_id,
            elements = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Index refreshed"
        );
        Ok(self.index.insert(index))
    }

    pub fn counters(&self) -> &FailureCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut FailureCounters {
        &mut self.counters
    }

    pub fn reset_counters(&mut self) {
        if self.counters != FailureCounters::default() {
            info!(run = %self.run_id, "Resetting failure counters");
        }
        self.counters = FailureCounters::default();
    }

    /// Page observations for a failure report; individual reads that fail are left empty.
    pub async fn diagnostics(&self, target: Option<&str>) -> StepDiagnostics {
        let backend = self.backend.as_ref();
        let mut diagnostics = StepDiagnostics::default();
        match backend.page_state().await {
            Ok(state) => {
                diagnostics.url = state.url;
                diagnostics.title = state.title;
            }
            Err(err) => warn!(error = %err, "Could not read page state for diagnostics"),
        }
        match ValidationScanner::default().scan(backend).await {
            Ok(messages) => diagnostics.validation_messages = messages,
            Err(err) => warn!(error = %err, "Could not scan validation messages"),
        }
        if let (Some(target), Some(index)) = (target, self.index.as_ref()) {
            diagnostics.similar_elements = similar_keys(index, target, SIMILAR_ELEMENT_LIMIT);
        }
        diagnostics
    }
}
