//! Text resolver with fallback chain orchestration

use crate::{errors::LocatorError, strategies::*, types::*};
use action_primitives::BrowserBackend;
use replay_core_types::SemanticIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves human-readable target text to one indexed element.
pub struct TextResolver {
    exact_strategy: Arc<ExactStrategy>,
    direct_strategy: Arc<DirectAttributeStrategy>,
    hierarchical_strategy: Arc<HierarchicalStrategy>,
    partial_strategy: Arc<PartialStrategy>,
    overlap_strategy: Arc<WordOverlapStrategy>,
}

impl Default for TextResolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl TextResolver {
    /// `direct_probe_timeout` bounds the live-page check of the attribute strategy.
    pub fn new(direct_probe_timeout: Duration) -> Self {
        Self {
            exact_strategy: Arc::new(ExactStrategy),
            direct_strategy: Arc::new(DirectAttributeStrategy::new(direct_probe_timeout)),
            hierarchical_strategy: Arc::new(HierarchicalStrategy),
            partial_strategy: Arc::new(PartialStrategy),
            overlap_strategy: Arc::new(WordOverlapStrategy),
        }
    }

    /// Get strategy by type
    fn get_strategy(&self, strategy_type: MatchStrategy) -> Arc<dyn Strategy> {
        match strategy_type {
            MatchStrategy::Exact => self.exact_strategy.clone(),
            MatchStrategy::DirectAttribute => self.direct_strategy.clone(),
            MatchStrategy::Hierarchical => self.hierarchical_strategy.clone(),
            MatchStrategy::Partial => self.partial_strategy.clone(),
            MatchStrategy::WordOverlap => self.overlap_strategy.clone(),
        }
    }

    /// Walk the strategy chain; the first strategy with candidates decides.
    ///
    /// Pure with respect to the page apart from the attribute strategy's
    /// read-only probes. Never clicks or types.
    pub async fn resolve(
        &self,
        backend: &dyn BrowserBackend,
        index: &SemanticIndex,
        target: &str,
        hints: &[String],
    ) -> Result<Resolution, LocatorError> {
        if target.trim().is_empty() {
            return Err(LocatorError::InvalidTarget(
                "target text is empty".to_string(),
            ));
        }
        let request = ResolveRequest::new(backend, index, target, hints);
        debug!(target, hints = ?hints, keys = index.len(), "Resolving target text");

        for strategy_type in MatchStrategy::fallback_chain() {
            let strategy = self.get_strategy(strategy_type);

            match strategy.resolve(&request).await {
                Ok(candidates) if !candidates.is_empty() => {
                    let resolution = select_best_candidate(candidates)?;
                    if resolution.tied > 1 {
                        warn!(
                            target,
                            strategy = strategy_type.name(),
                            tied = resolution.tied,
                            chosen = %resolution.descriptor.display_key,
                            "Ambiguous match; taking the first in page order"
                        );
                    }
                    info!(
                        target,
                        strategy = strategy_type.name(),
                        key = %resolution.descriptor.display_key,
                        score = resolution.score,
                        "Resolved target"
                    );
                    return Ok(resolution);
                }
                Ok(_) => {
                    debug!(strategy = strategy.name(), "Strategy returned no candidates");
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "Strategy failed");
                }
            }
        }

        Err(LocatorError::ElementNotFound(format!(
            "No element matches '{}'",
            target
        )))
    }
}

/// Highest score wins; ties go to the earliest candidate.
pub fn select_best_candidate(candidates: Vec<Candidate>) -> Result<Resolution, LocatorError> {
    let best_score = candidates
        .iter()
        .map(|c| c.score)
        .fold(f64::NEG_INFINITY, f64::max);
    let tied = candidates
        .iter()
        .filter(|c| (c.score - best_score).abs() < 1e-9)
        .count();
    let best = candidates
        .into_iter()
        .find(|c| (c.score - best_score).abs() < 1e-9)
        .ok_or_else(|| LocatorError::Internal("No candidates to select from".to_string()))?;
    Ok(Resolution {
        descriptor: best.descriptor,
        strategy: best.strategy,
        score: best.score,
        tied,
    })
}

/// Display keys closest to `target`, best first, for failure reports.
pub fn similar_keys(index: &SemanticIndex, target: &str, limit: usize) -> Vec<String> {
    let target_norm = normalize(target);
    let target_tokens = tokenize(target);
    let mut scored: Vec<(f64, usize, &str)> = index
        .iter()
        .enumerate()
        .filter_map(|(pos, d)| {
            let key = normalize(&d.display_key);
            let score = containment_ratio(&target_norm, &key)
                .max(containment_ratio(&target_norm, &normalize(&d.raw_text)))
                .max(best_overlap(&target_tokens, d));
            (score > 0.0).then_some((score, pos, d.display_key.as_str()))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, key)| key.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::SemanticIndexer;
    use action_primitives::fake::{FakeElement, FakePage};

    fn hints(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn index_of(page: &FakePage) -> SemanticIndex {
        SemanticIndexer::default().build(page).await.unwrap()
    }

    fn two_forms() -> FakePage {
        FakePage::new("https://forms.test/")
            .with(
                FakeElement::submit("Submit")
                    .id("personal-submit")
                    .within("form", Some("Personal Information"), None),
            )
            .with(
                FakeElement::submit("Submit")
                    .id("billing-submit")
                    .within("form", Some("Billing Information"), None),
            )
    }

    #[tokio::test]
    async fn container_hint_picks_the_right_form() {
        let page = two_forms();
        let index = index_of(&page).await;
        let resolver = TextResolver::default();

        let first = resolver
            .resolve(&page, &index, "Submit", &hints(&["Personal Information"]))
            .await
            .unwrap();
        assert_eq!(first.descriptor.primary_locator, "#personal-submit");
        assert_eq!(first.strategy, MatchStrategy::Hierarchical);

        let second = resolver
            .resolve(&page, &index, "Submit", &hints(&["Billing Information"]))
            .await
            .unwrap();
        assert_eq!(second.descriptor.primary_locator, "#billing-submit");
    }

    #[tokio::test]
    async fn display_key_resolves_exactly() {
        let page = two_forms();
        let index = index_of(&page).await;
        let resolution = TextResolver::default()
            .resolve(&page, &index, "submit (in billing information)", &[])
            .await
            .unwrap();
        assert_eq!(resolution.strategy, MatchStrategy::Exact);
        assert_eq!(resolution.descriptor.primary_locator, "#billing-submit");
        assert_eq!(resolution.tied, 1);
    }

    #[tokio::test]
    async fn duplicated_text_without_hints_is_ambiguous_but_deterministic() {
        let page = two_forms();
        let index = index_of(&page).await;
        let resolver = TextResolver::default();
        let a = resolver.resolve(&page, &index, "Submit", &[]).await.unwrap();
        let b = resolver.resolve(&page, &index, "Submit", &[]).await.unwrap();
        assert_eq!(a.tied, 2);
        assert_eq!(a.descriptor.display_key, b.descriptor.display_key);
        assert_eq!(a.descriptor.primary_locator, "#personal-submit");
    }

    #[tokio::test]
    async fn identifier_targets_use_attributes() {
        let page = FakePage::new("https://login.test/")
            .with(FakeElement::text_input("username").labelled("Your login"));
        let index = index_of(&page).await;
        let resolution = TextResolver::default()
            .resolve(&page, &index, "username", &[])
            .await
            .unwrap();
        assert_eq!(resolution.strategy, MatchStrategy::DirectAttribute);
        assert_eq!(resolution.descriptor.display_key, "Your login");
    }

    #[tokio::test]
    async fn identifier_not_in_index_is_probed_live() {
        let page = FakePage::new("https://login.test/");
        let index = index_of(&page).await;
        page.add(FakeElement::text_input("otp").id("otp"));
        let resolution = TextResolver::default()
            .resolve(&page, &index, "otp", &[])
            .await
            .unwrap();
        assert_eq!(resolution.descriptor.primary_locator, "#otp");
        assert!(resolution.descriptor.has_hint("direct_attribute"));
    }

    #[tokio::test]
    async fn camel_case_target_matches_spaced_label() {
        let page = FakePage::new("https://signup.test/")
            .with(FakeElement::text_input("mail").labelled("Email Address"))
            .with(FakeElement::text_input("phone").labelled("Phone Number"));
        let index = index_of(&page).await;
        let resolution = TextResolver::default()
            .resolve(&page, &index, "emailAddress", &[])
            .await
            .unwrap();
        assert_eq!(resolution.strategy, MatchStrategy::WordOverlap);
        assert_eq!(resolution.descriptor.display_key, "Email Address");
    }

    #[tokio::test]
    async fn partial_match_skips_misaligned_radio() {
        let page = FakePage::new("https://prefs.test/")
            .with(FakeElement::radio("frequency", "opt-1").labelled("Weekly digest"))
            .with(FakeElement::radio("frequency", "weekly").labelled("Weekly"));
        let index = index_of(&page).await;
        let resolution = TextResolver::default()
            .resolve(&page, &index, "the weekly digest", &[])
            .await
            .unwrap();
        assert_eq!(resolution.strategy, MatchStrategy::Partial);
        assert_eq!(
            resolution.descriptor.attributes.value.as_deref(),
            Some("weekly")
        );
    }

    #[tokio::test]
    async fn blank_target_is_rejected() {
        let page = FakePage::new("about:blank");
        let index = index_of(&page).await;
        let err = TextResolver::default()
            .resolve(&page, &index, "   ", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let page = two_forms();
        let index = index_of(&page).await;
        let err = TextResolver::default()
            .resolve(&page, &index, "Delete account forever", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::ElementNotFound(_)));
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let page = two_forms();
        let index = tokio_test::block_on(index_of(&page));
        let candidates: Vec<Candidate> = index
            .iter()
            .map(|d| Candidate::new(d.clone(), MatchStrategy::Partial, 0.5))
            .collect();
        let best = select_best_candidate(candidates).unwrap();
        assert_eq!(best.tied, 2);
        assert_eq!(best.descriptor.primary_locator, "#personal-submit");
        assert!(select_best_candidate(Vec::new()).is_err());
    }

    #[test]
    fn similar_keys_rank_by_closeness() {
        let page = FakePage::new("https://signup.test/")
            .with(FakeElement::text_input("first").labelled("First Name"))
            .with(FakeElement::text_input("last").labelled("Last Name"))
            .with(FakeElement::button("Cancel"));
        let index = tokio_test::block_on(index_of(&page));
        let keys = similar_keys(&index, "First name field", 5);
        assert_eq!(keys.first().map(String::as_str), Some("First Name"));
        assert!(!keys.contains(&"Cancel".to_string()));
    }
}
