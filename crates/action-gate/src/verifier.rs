//! Post-action verifier
//!
//! Runs after the settle delay. A newly-appeared validation message fails the
//! step before any action-specific check is consulted.

use crate::{
    errors::GateError,
    scanner::{newly_appeared, ValidationScanner},
    types::*,
    urls::same_page,
};
use action_locator::{SemanticIndexer, TextResolver};
use action_primitives::{BrowserBackend, ElementProbe};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static PROGRESSION_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(next|continue|submit|finish)\b").expect("valid progression regex")
});

/// Text of a button-like control that moves a flow forward.
pub fn implies_progression(text: &str) -> bool {
    PROGRESSION_TEXT.is_match(text)
}

pub struct Verifier {
    scanner: ValidationScanner,
    indexer: SemanticIndexer,
    resolver: Arc<TextResolver>,
    settle_delay: Duration,
    strict_progression: bool,
}

impl Verifier {
    pub fn new(indexer: SemanticIndexer, resolver: Arc<TextResolver>) -> Self {
        Self {
            scanner: ValidationScanner::default(),
            indexer,
            resolver,
            settle_delay: Duration::from_millis(500),
            strict_progression: false,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Require the next step's target to resolve after every progression click.
    pub fn with_strict_progression(mut self, strict: bool) -> Self {
        self.strict_progression = strict;
        self
    }

    pub fn with_scanner(mut self, scanner: ValidationScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Observations to compare against once the action has run.
    pub async fn capture_baseline(
        &self,
        backend: &dyn BrowserBackend,
    ) -> Result<PageBaseline, GateError> {
        Ok(PageBaseline {
            state: backend.page_state().await?,
            validation_messages: self.scanner.scan(backend).await?,
        })
    }

    pub async fn verify(
        &self,
        backend: &dyn BrowserBackend,
        check: &VerificationCheck,
        baseline: &PageBaseline,
    ) -> Result<GateResult, GateError> {
        let start = Instant::now();
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        if check.scans_validation() {
            let current = self.scanner.scan(backend).await?;
            let fresh = newly_appeared(&baseline.validation_messages, &current);
            if !fresh.is_empty() {
                warn!(check = check.name(), messages = ?fresh, "Validation errors after action");
                return Ok(GateResult::validation_error(fresh)
                    .with_latency(start.elapsed().as_millis() as u64));
            }
        }

        let result = match check {
            VerificationCheck::Toggle {
                locator,
                expect_checked,
            } => self.check_toggle(backend, locator, *expect_checked).await?,
            VerificationCheck::Progression {
                locator,
                next_target,
            } => {
                self.check_progression(backend, locator, next_target.as_ref(), baseline)
                    .await?
            }
            VerificationCheck::Click { locator } => {
                if backend.query_all(locator).await? > 0 {
                    GateResult::pass("Clicked element still present")
                } else {
                    GateResult::pass("Clicked element disappeared")
                }
            }
            VerificationCheck::Value { locator, expected } => {
                self.check_value(backend, locator, expected).await?
            }
            VerificationCheck::Navigate { url } => {
                let current = backend.current_url().await?;
                if same_page(&current, url) {
                    GateResult::pass(format!("At {}", current))
                } else {
                    GateResult::fail(format!("Expected {} but page is at {}", url, current))
                }
            }
            VerificationCheck::ValidationOnly => GateResult::pass("No validation errors"),
            VerificationCheck::None => GateResult::pass("Nothing to verify"),
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            check = check.name(),
            passed = result.passed(),
            latency_ms,
            reason = %result.summary(),
            "Verification finished"
        );
        Ok(result.with_latency(latency_ms))
    }

    async fn check_toggle(
        &self,
        backend: &dyn BrowserBackend,
        locator: &str,
        expect_checked: bool,
    ) -> Result<GateResult, GateError> {
        Ok(match backend.probe(locator).await? {
            Some(ElementProbe {
                checked: Some(checked),
                ..
            }) if checked == expect_checked => GateResult::pass(format!(
                "Element is {}",
                if checked { "checked" } else { "unchecked" }
            )),
            Some(ElementProbe {
                checked: Some(checked),
                ..
            }) => GateResult::fail(format!(
                "Expected checked={} but element reports checked={}",
                expect_checked, checked
            )),
            Some(_) => GateResult::fail(format!("'{}' has no checked state", locator)),
            None => GateResult::fail(format!("'{}' is no longer on the page", locator)),
        })
    }

    async fn check_value(
        &self,
        backend: &dyn BrowserBackend,
        locator: &str,
        expected: &str,
    ) -> Result<GateResult, GateError> {
        let Some(probe) = backend.probe(locator).await? else {
            return Ok(GateResult::fail(format!(
                "'{}' is no longer on the page",
                locator
            )));
        };
        let expected = expected.trim();
        let value = probe.value.as_deref().unwrap_or_default().trim();
        let selected = probe.selected_text.as_deref().map(str::trim);
        if value == expected || (probe.is_select() && selected == Some(expected)) {
            Ok(GateResult::pass(format!("Value is '{}'", expected)))
        } else {
            Ok(GateResult::fail(format!(
                "Expected value '{}' but found '{}'",
                expected,
                selected.filter(|_| probe.is_select()).unwrap_or(value)
            )))
        }
    }

    async fn check_progression(
        &self,
        backend: &dyn BrowserBackend,
        locator: &str,
        next_target: Option<&NextTarget>,
        baseline: &PageBaseline,
    ) -> Result<GateResult, GateError> {
        if let Some(next) = next_target {
            match self.next_target_resolves(backend, next).await {
                Ok(true) => {
                    info!(next = %next.text, "Next step target is resolvable after click");
                    return Ok(GateResult::pass(format!(
                        "Next target '{}' is resolvable",
                        next.text
                    )));
                }
                Ok(false) => {}
                Err(err) => debug!(error = %err, "Could not check next target"),
            }
            if self.strict_progression {
                return Ok(GateResult::fail(format!(
                    "Next target '{}' did not become resolvable",
                    next.text
                )));
            }
        }

        let after = backend.page_state().await?;
        if !same_page(&after.url, &baseline.state.url) {
            return Ok(GateResult::pass(format!("URL changed to {}", after.url)));
        }
        if after.title != baseline.state.title {
            return Ok(GateResult::pass(format!("Title changed to '{}'", after.title)));
        }
        match backend.probe(locator).await? {
            None => Ok(GateResult::pass("Clicked element disappeared")),
            Some(probe) if !probe.visible => Ok(GateResult::pass("Clicked element is hidden")),
            Some(probe) if probe.disabled => Ok(GateResult::pass("Clicked element is disabled")),
            Some(_) => Ok(GateResult::fail(
                "Click had no observable effect: element still visible and enabled, URL and title unchanged",
            )),
        }
    }

    async fn next_target_resolves(
        &self,
        backend: &dyn BrowserBackend,
        next: &NextTarget,
    ) -> Result<bool, GateError> {
        let index = self.indexer.build(backend).await?;
        Ok(self
            .resolver
            .resolve(backend, &index, &next.text, &next.hints)
            .await
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::fake::{FakeEffect, FakeElement, FakePage};

    fn verifier() -> Verifier {
        Verifier::new(SemanticIndexer::default(), Arc::new(TextResolver::default()))
            .with_settle_delay(Duration::ZERO)
    }

    #[test]
    fn progression_words() {
        assert!(implies_progression("Continue to payment"));
        assert!(implies_progression("SUBMIT"));
        assert!(!implies_progression("Nextdoor"));
        assert!(!implies_progression("Save"));
    }

    #[tokio::test]
    async fn validation_error_wins_over_passing_check() {
        let page = FakePage::new("https://pay.test/").with(
            FakeElement::button("Pay")
                .id("pay")
                .on_click(FakeEffect::ShowValidation("Card number is invalid".into())),
        );
        let v = verifier();
        let baseline = v.capture_baseline(&page).await.unwrap();
        page.click("#pay").await.unwrap();
        let result = v
            .verify(&page, &VerificationCheck::Click { locator: "#pay".into() }, &baseline)
            .await
            .unwrap();
        assert_eq!(result.outcome, GateOutcome::ValidationError);
        assert_eq!(result.validation_messages, vec!["Card number is invalid".to_string()]);
    }

    #[tokio::test]
    async fn navigate_check_ignores_validation_scan() {
        let page = FakePage::new("https://shop.test/cart/");
        let v = verifier();
        let baseline = v.capture_baseline(&page).await.unwrap();
        page.push_validation("Something is required");
        let result = v
            .verify(
                &page,
                &VerificationCheck::Navigate { url: "https://shop.test/cart#summary".into() },
                &baseline,
            )
            .await
            .unwrap();
        assert!(result.passed());
    }

    #[tokio::test]
    async fn progression_without_effect_fails() {
        let page = FakePage::new("https://wizard.test/")
            .with_title("Step 1")
            .with(FakeElement::button("Next").id("next"));
        let v = verifier();
        let baseline = v.capture_baseline(&page).await.unwrap();
        page.click("#next").await.unwrap();
        let check = VerificationCheck::Progression {
            locator: "#next".into(),
            next_target: None,
        };
        let result = v.verify(&page, &check, &baseline).await.unwrap();
        assert_eq!(result.outcome, GateOutcome::Failed);
    }

    #[tokio::test]
    async fn progression_passes_when_next_target_resolves() {
        let page = FakePage::new("https://wizard.test/")
            .with(FakeElement::button("Next").id("next"))
            .with(FakeElement::text_input("city").labelled("City"));
        let v = verifier();
        let baseline = v.capture_baseline(&page).await.unwrap();
        let check = VerificationCheck::Progression {
            locator: "#next".into(),
            next_target: Some(NextTarget::new("City", Vec::new())),
        };
        assert!(v.verify(&page, &check, &baseline).await.unwrap().passed());
    }

    #[tokio::test]
    async fn progression_passes_on_title_change() {
        let page = FakePage::new("https://wizard.test/").with_title("Step 1").with(
            FakeElement::button("Continue")
                .id("go")
                .on_click(FakeEffect::SetTitle("Step 2".into())),
        );
        let v = verifier();
        let baseline = v.capture_baseline(&page).await.unwrap();
        page.click("#go").await.unwrap();
        let check = VerificationCheck::Progression {
            locator: "#go".into(),
            next_target: Some(NextTarget::new("Shipping method", Vec::new())),
        };
        assert!(v.verify(&page, &check, &baseline).await.unwrap().passed());

        let strict = verifier().with_strict_progression(true);
        assert!(!strict.verify(&page, &check, &baseline).await.unwrap().passed());
    }

    #[tokio::test]
    async fn toggle_and_value_checks() {
        let page = FakePage::new("https://prefs.test/")
            .with(FakeElement::checkbox("news").id("news").checked())
            .with(FakeElement::text_input("q").id("q"))
            .with(FakeElement::select("country", &["Canada", "France"]).id("country"));
        page.fill("#q", "  abc ").await.unwrap();
        let v = verifier();
        let baseline = PageBaseline::default();

        let on = VerificationCheck::Toggle { locator: "#news".into(), expect_checked: true };
        assert!(v.verify(&page, &on, &baseline).await.unwrap().passed());
        let off = VerificationCheck::Toggle { locator: "#news".into(), expect_checked: false };
        assert!(!v.verify(&page, &off, &baseline).await.unwrap().passed());

        let value = VerificationCheck::Value { locator: "#q".into(), expected: "abc".into() };
        assert!(v.verify(&page, &value, &baseline).await.unwrap().passed());

        let select = VerificationCheck::Value { locator: "#country".into(), expected: "France".into() };
        assert!(!v.verify(&page, &select, &baseline).await.unwrap().passed());
        page.select_option("#country", "France").await.unwrap();
        assert!(v.verify(&page, &select, &baseline).await.unwrap().passed());
    }
}
