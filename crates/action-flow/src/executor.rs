//! Step executor
//!
//! Resolves a step's target, waits for it, performs the interaction and hands
//! back the check the verifier should run. Retrying is the governor's job.

use crate::{
    errors::StepFailure,
    inputs::wants_checked,
    session::EngineSession,
    types::*,
};
use action_gate::{implies_progression, same_page, NextTarget, VerificationCheck};
use action_locator::{normalize, LocatorError};
use action_primitives::{
    content_excerpt, locator, wait_for_first_visible, ActionError, BrowserBackend, ElementProbe,
};
use replay_core_types::{ElementDescriptor, ElementType, SemanticIndex};
use serde_json::Value;
use tracing::{debug, info, warn};

/// What a successful action did, and how to confirm it.
#[derive(Debug, Clone)]
pub struct StepEffect {
    pub summary: String,
    pub extracted: Option<Value>,
    pub check: VerificationCheck,
    pub warnings: Vec<ExecutionWarning>,
    pub locator: Option<String>,
}

impl StepEffect {
    pub fn new(summary: impl Into<String>, check: VerificationCheck) -> Self {
        Self {
            summary: summary.into(),
            extracted: None,
            check,
            warnings: Vec::new(),
            locator: None,
        }
    }

    fn at(mut self, locator: &str) -> Self {
        self.locator = Some(locator.to_string());
        self
    }

    fn with_warnings(mut self, warnings: Vec<ExecutionWarning>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// Target after resolution and the visibility wait
struct Located {
    locator: String,
    label: String,
    descriptor: Option<ElementDescriptor>,
    /// Elements tied for the best resolver score
    tied: usize,
}

impl Located {
    fn element_type(&self) -> Option<ElementType> {
        self.descriptor.as_ref().map(|d| d.element_type)
    }

    fn ambiguity(&self) -> Vec<ExecutionWarning> {
        match &self.descriptor {
            Some(d) if self.tied > 1 => vec![ExecutionWarning::AmbiguousElement {
                target: self.label.clone(),
                matches: self.tied,
                chosen: d.display_key.clone(),
            }],
            _ => Vec::new(),
        }
    }
}

fn execution(err: ActionError) -> StepFailure {
    match err {
        ActionError::AnchorNotFound(msg) => StepFailure::not_found(msg),
        other => StepFailure::execution(other.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepExecutor;

impl StepExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run one step against the session's page.
    ///
    /// `next` is the following step's target, used to confirm progression clicks.
    pub async fn execute(
        &self,
        session: &mut EngineSession,
        step: &WorkflowStep,
        next: Option<NextTarget>,
    ) -> Result<StepEffect, StepFailure> {
        match step {
            WorkflowStep::Navigate(s) => self.navigate(session, s).await,
            WorkflowStep::Click(s) => self.click(session, s, next).await,
            WorkflowStep::Input(s) => self.input(session, s).await,
            WorkflowStep::Select(s) => self.select(session, s).await,
            WorkflowStep::KeyPress(s) => self.key_press(session, s).await,
            WorkflowStep::Scroll(s) => self.scroll(session, s).await,
            WorkflowStep::Extract(s) => self.extract(session, s).await,
            WorkflowStep::Agent(_) | WorkflowStep::Unknown => {
                Err(StepFailure::unsupported(step.kind()))
            }
        }
    }

    async fn current_index<'s>(
        &self,
        session: &'s mut EngineSession,
    ) -> Result<&'s SemanticIndex, StepFailure> {
        if session.index().is_none() {
            session
                .refresh_index()
                .await
                .map_err(|err| StepFailure::execution(err.to_string()))?;
        }
        session
            .index()
            .ok_or_else(|| StepFailure::execution("semantic index unavailable"))
    }

    /// Target text through the resolver, else the recorded selectors; then wait.
    async fn locate(
        &self,
        session: &mut EngineSession,
        target: &StepTarget,
    ) -> Result<Located, StepFailure> {
        let legacy = target.legacy_locators();
        let label = target.identifier().unwrap_or("<no target>").to_string();
        let mut chain = Vec::new();
        let mut descriptor = None;
        let mut tied = 0;

        if let Some(text) = target.semantic_text() {
            self.current_index(session).await?;
            let index = session
                .index()
                .ok_or_else(|| StepFailure::execution("semantic index unavailable"))?;
            match session
                .resolver()
                .resolve(session.backend(), index, text, &target.hints())
                .await
            {
                Ok(resolution) => {
                    chain = resolution.descriptor.locator_chain();
                    tied = resolution.tied;
                    descriptor = Some(resolution.descriptor);
                }
                Err(LocatorError::ElementNotFound(msg)) if legacy.is_empty() => {
                    return Err(StepFailure::not_found(msg));
                }
                Err(err) if legacy.is_empty() => {
                    return Err(StepFailure::execution(err.to_string()));
                }
                Err(err) => {
                    info!(target = text, error = %err, "Falling back to recorded selector");
                }
            }
        }
        if chain.is_empty() {
            chain = legacy;
        }
        if chain.is_empty() {
            return Err(StepFailure::not_found(format!(
                "Step '{}' names no element to act on",
                label
            )));
        }

        let locator = wait_for_first_visible(session.backend(), &chain, session.wait_budget())
            .await
            .map_err(|err| {
                StepFailure::not_found(format!("'{}' did not become visible: {}", label, err))
            })?;
        Ok(Located {
            locator,
            label,
            descriptor,
            tied,
        })
    }

    async fn probe(
        &self,
        backend: &dyn BrowserBackend,
        locator: &str,
    ) -> Result<ElementProbe, StepFailure> {
        backend
            .probe(locator)
            .await
            .map_err(execution)?
            .ok_or_else(|| StepFailure::not_found(format!("'{}' vanished before acting", locator)))
    }

    async fn click(
        &self,
        session: &mut EngineSession,
        step: &ClickStep,
        next: Option<NextTarget>,
    ) -> Result<StepEffect, StepFailure> {
        let located = self.locate(session, &step.target).await?;
        let backend = session.backend();
        let probe = self.probe(backend, &located.locator).await?;

        if probe.is_checkbox() || probe.is_radio() {
            let current = probe.checked.unwrap_or(false);
            let desired = if probe.is_radio() { true } else { !current };
            let check = VerificationCheck::Toggle {
                locator: located.locator.clone(),
                expect_checked: desired,
            };
            if current == desired {
                return Ok(StepEffect::new(format!("'{}' already selected", located.label), check)
                    .at(&located.locator)
                    .with_warnings(located.ambiguity()));
            }
            set_toggle(backend, &located, probe.is_radio(), desired).await?;
            return Ok(StepEffect::new(
                format!(
                    "{} '{}'",
                    if desired { "Checked" } else { "Unchecked" },
                    located.label
                ),
                check,
            )
            .at(&located.locator)
            .with_warnings(located.ambiguity()));
        }

        let button_like = located.element_type() == Some(ElementType::Button)
            || probe.tag == "button"
            || locator::looks_like_button(&located.locator);
        let text = located
            .descriptor
            .as_ref()
            .map(|d| d.raw_text.clone())
            .filter(|t| !t.starts_with('['))
            .unwrap_or_else(|| probe.text.clone());

        let mut target = located.locator.clone();
        if button_like && !text.is_empty() && backend.query_all(&target).await.map_err(execution)? > 1 {
            let by_text = locator::text_equals_xpath(&probe.tag, &text);
            if backend.query_all(&by_text).await.map_err(execution)? == 1 {
                debug!(structural = %target, text = %by_text, "Clicking by visible text");
                target = by_text;
            }
        }

        let mut warnings = located.ambiguity();
        let live = backend.query_all(&target).await.map_err(execution)?;
        if live > 1 && warnings.is_empty() {
            warn!(locator = %target, matches = live, "Locator matches several elements; clicking the first");
            warnings.push(ExecutionWarning::AmbiguousElement {
                target: located.label.clone(),
                matches: live,
                chosen: target.clone(),
            });
        }

        backend.click(&target).await.map_err(execution)?;

        let link_like = located.element_type() == Some(ElementType::Link) || probe.tag == "a";
        let check = if (button_like || link_like) && implies_progression(&text) {
            VerificationCheck::Progression {
                locator: target.clone(),
                next_target: next,
            }
        } else {
            VerificationCheck::Click {
                locator: target.clone(),
            }
        };
        Ok(StepEffect::new(format!("Clicked '{}'", located.label), check)
            .at(&target)
            .with_warnings(warnings))
    }

    async fn input(
        &self,
        session: &mut EngineSession,
        step: &InputStep,
    ) -> Result<StepEffect, StepFailure> {
        let located = self.locate(session, &step.target).await?;
        let probe = self.probe(session.backend(), &located.locator).await?;

        if probe.is_select() || located.element_type() == Some(ElementType::Select) {
            debug!(target = %located.label, "Input on a dropdown is handled by the select step");
            return Ok(StepEffect::new(
                format!("Skipped input on dropdown '{}'", located.label),
                VerificationCheck::None,
            )
            .at(&located.locator));
        }

        if probe.is_radio() {
            return self.choose_radio(session, &located, &step.value).await;
        }

        let backend = session.backend();
        if probe.is_checkbox() {
            let desired = wants_checked(&step.value);
            let check = VerificationCheck::Toggle {
                locator: located.locator.clone(),
                expect_checked: desired,
            };
            if probe.checked == Some(desired) {
                info!(target = %located.label, desired, "Checkbox already in requested state");
                return Ok(StepEffect::new(
                    format!(
                        "'{}' already {}",
                        located.label,
                        if desired { "checked" } else { "unchecked" }
                    ),
                    check,
                )
                .at(&located.locator));
            }
            set_toggle(backend, &located, false, desired).await?;
            return Ok(StepEffect::new(
                format!(
                    "{} '{}'",
                    if desired { "Checked" } else { "Unchecked" },
                    located.label
                ),
                check,
            )
            .at(&located.locator)
            .with_warnings(located.ambiguity()));
        }

        backend
            .fill(&located.locator, &step.value)
            .await
            .map_err(execution)?;
        // Some widgets only commit composed input on a click.
        if let Err(err) = backend.click(&located.locator).await {
            debug!(locator = %located.locator, error = %err, "Commit click after fill failed");
        }
        Ok(StepEffect::new(
            format!("Entered '{}' into '{}'", step.value, located.label),
            VerificationCheck::Value {
                locator: located.locator.clone(),
                expected: step.value.clone(),
            },
        )
        .at(&located.locator)
        .with_warnings(located.ambiguity()))
    }

    /// Pick the option of the located radio's group whose value or label matches.
    async fn choose_radio(
        &self,
        session: &mut EngineSession,
        located: &Located,
        value: &str,
    ) -> Result<StepEffect, StepFailure> {
        let group = located
            .descriptor
            .as_ref()
            .and_then(|d| d.attributes.name.clone())
            .or_else(|| locator::attr_value(&located.locator, "name"));
        let wanted = normalize(value);

        let mut option = None;
        if let (Some(group), Some(index)) = (group.as_deref(), session.index()) {
            let same_container = |d: &ElementDescriptor| {
                located.descriptor.as_ref().map(|l| &l.container_context)
                    == Some(&d.container_context)
            };
            let mut matches: Vec<&ElementDescriptor> = index
                .iter()
                .filter(|d| {
                    d.element_type == ElementType::Radio
                        && d.attributes.name.as_deref() == Some(group)
                        && (d.attributes.value.as_deref().map(normalize) == Some(wanted.clone())
                            || normalize(&d.raw_text) == wanted)
                })
                .collect();
            matches.sort_by_key(|d| !same_container(d));
            option = matches.first().map(|d| d.primary_locator.clone());
        }
        if option.is_none() {
            if let Some(group) = group.as_deref() {
                let candidate = locator::radio_option(group, value);
                if session
                    .backend()
                    .query_all(&candidate)
                    .await
                    .map_err(execution)?
                    > 0
                {
                    option = Some(candidate);
                }
            }
        }
        let Some(option) = option else {
            return Err(StepFailure::not_found(format!(
                "No option '{}' in radio group '{}'",
                value,
                group.as_deref().unwrap_or(&located.label)
            )));
        };

        let backend = session.backend();
        let target = Located {
            locator: option.clone(),
            label: format!("{} = {}", located.label, value),
            descriptor: None,
            tied: 0,
        };
        let already = backend
            .probe(&option)
            .await
            .map_err(execution)?
            .and_then(|p| p.checked)
            .unwrap_or(false);
        if !already {
            set_toggle(backend, &target, true, true).await?;
        }
        Ok(StepEffect::new(
            format!("Selected '{}' for '{}'", value, located.label),
            VerificationCheck::Toggle {
                locator: option.clone(),
                expect_checked: true,
            },
        )
        .at(&option))
    }

    async fn select(
        &self,
        session: &mut EngineSession,
        step: &SelectStep,
    ) -> Result<StepEffect, StepFailure> {
        let located = self.locate(session, &step.target).await?;
        session
            .backend()
            .select_option(&located.locator, &step.selected_text)
            .await
            .map_err(execution)?;
        Ok(StepEffect::new(
            format!("Selected '{}' in '{}'", step.selected_text, located.label),
            VerificationCheck::Value {
                locator: located.locator.clone(),
                expected: step.selected_text.clone(),
            },
        )
        .at(&located.locator)
        .with_warnings(located.ambiguity()))
    }

    async fn key_press(
        &self,
        session: &mut EngineSession,
        step: &KeyPressStep,
    ) -> Result<StepEffect, StepFailure> {
        let located = self.locate(session, &step.target).await?;
        session
            .backend()
            .press(&located.locator, &step.key)
            .await
            .map_err(execution)?;
        Ok(StepEffect::new(
            format!("Pressed {} on '{}'", step.key, located.label),
            VerificationCheck::ValidationOnly,
        )
        .at(&located.locator)
        .with_warnings(located.ambiguity()))
    }

    async fn scroll(
        &self,
        session: &mut EngineSession,
        step: &ScrollStep,
    ) -> Result<StepEffect, StepFailure> {
        session
            .backend()
            .scroll_by(step.dx, step.dy)
            .await
            .map_err(execution)?;
        Ok(StepEffect::new(
            format!("Scrolled by ({}, {})", step.dx, step.dy),
            VerificationCheck::None,
        ))
    }

    async fn navigate(
        &self,
        session: &mut EngineSession,
        step: &NavigateStep,
    ) -> Result<StepEffect, StepFailure> {
        let backend = session.backend();
        let current = backend.current_url().await.map_err(execution)?;
        let summary = if same_page(&current, &step.url) {
            info!(url = %step.url, "Already on the requested page; skipping navigation");
            format!("Already at {}", step.url)
        } else {
            backend.navigate(&step.url).await.map_err(execution)?;
            format!("Navigated to {}", step.url)
        };
        // Index rebuild waits for the network to settle.
        session
            .refresh_index()
            .await
            .map_err(|err| StepFailure::execution(err.to_string()))?;
        Ok(StepEffect::new(
            summary,
            VerificationCheck::Navigate {
                url: step.url.clone(),
            },
        ))
    }

    async fn extract(
        &self,
        session: &mut EngineSession,
        step: &ExtractStep,
    ) -> Result<StepEffect, StepFailure> {
        let markup = session
            .backend()
            .rendered_content()
            .await
            .map_err(execution)?;

        let reason = match session.extractor() {
            Some(extractor) => match extractor.extract(&step.goal, &markup).await {
                Ok(text) => {
                    let payload = serde_json::from_str::<Value>(&text)
                        .unwrap_or_else(|_| Value::String(text.clone()));
                    info!(goal = %step.goal, chars = text.len(), "Extracted content");
                    let mut effect =
                        StepEffect::new(format!("Extracted: {}", step.goal), VerificationCheck::None);
                    effect.extracted = Some(payload);
                    return Ok(effect);
                }
                Err(err) => err.to_string(),
            },
            None => "no extraction backend configured".to_string(),
        };

        warn!(goal = %step.goal, reason = %reason, "Extraction degraded to raw page excerpt");
        let excerpt = content_excerpt(&markup, session.config().extract_excerpt_chars);
        let mut effect = StepEffect::new(
            format!("Extracted raw excerpt for: {}", step.goal),
            VerificationCheck::None,
        )
        .with_warnings(vec![ExecutionWarning::DegradedExtraction { reason }]);
        effect.extracted = Some(Value::String(excerpt));
        Ok(effect)
    }
}

/// Label click, then check/uncheck, then a plain click, until the state holds.
async fn set_toggle(
    backend: &dyn BrowserBackend,
    target: &Located,
    radio: bool,
    desired: bool,
) -> Result<(), StepFailure> {
    let locator = target.locator.as_str();
    let id = target
        .descriptor
        .as_ref()
        .and_then(|d| d.attributes.id.clone())
        .or_else(|| locator::id_of(locator))
        .or_else(|| locator::attr_value(locator, "id"));

    let mut last_error = None;
    let mut acted = false;

    if let Some(id) = id {
        let label = locator::label_for(&id);
        if backend.query_all(&label).await.map_err(execution)? > 0 {
            match backend.click(&label).await {
                Ok(()) => {
                    acted = true;
                    if toggle_state(backend, locator).await? == Some(desired) {
                        debug!(locator, "Toggled via label");
                        return Ok(());
                    }
                }
                Err(err) => last_error = Some(err),
            }
        }
    }

    let explicit = if desired || radio {
        backend.check(locator).await
    } else {
        backend.uncheck(locator).await
    };
    match explicit {
        Ok(()) => {
            acted = true;
            if toggle_state(backend, locator).await? == Some(desired) {
                return Ok(());
            }
        }
        Err(err) => last_error = Some(err),
    }

    match backend.click(locator).await {
        Ok(()) => acted = true,
        Err(err) => last_error = Some(err),
    }

    match last_error {
        Some(err) if !acted => Err(execution(err)),
        _ => Ok(()),
    }
}

async fn toggle_state(
    backend: &dyn BrowserBackend,
    locator: &str,
) -> Result<Option<bool>, StepFailure> {
    Ok(backend
        .probe(locator)
        .await
        .map_err(execution)?
        .and_then(|p| p.checked))
}
