use action_flow::{
    ClickStep, EngineConfig, EngineSession, ExecutionWarning, ExtractStep, FailureKind, FlowError,
    InputField, InputStep, InputType, KeyPressStep, NavigateStep, RunStatus, ScrollStep,
    SelectStep, StepTarget, WorkflowDefinition, WorkflowRunner, WorkflowStep,
};
use action_primitives::fake::{FakeEffect, FakeElement, FakePage};
use action_primitives::{ActionError, StructuredExtractor};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn fast_config(max_retries: u32) -> EngineConfig {
    EngineConfig {
        max_retries,
        settle_delay_ms: 0,
        retry_delay_ms: 0,
        ..EngineConfig::default()
    }
}

fn runner(page: &Arc<FakePage>, steps: Vec<WorkflowStep>, config: EngineConfig) -> WorkflowRunner {
    let session = EngineSession::new(page.clone(), config);
    WorkflowRunner::new(WorkflowDefinition::new("test", steps), session)
}

fn click(text: &str) -> WorkflowStep {
    WorkflowStep::Click(ClickStep {
        target: StepTarget::text(text),
        output: None,
    })
}

fn input(text: &str, value: &str) -> WorkflowStep {
    WorkflowStep::Input(InputStep {
        target: StepTarget::text(text),
        value: value.to_string(),
        output: None,
    })
}

fn navigate(url: &str) -> WorkflowStep {
    WorkflowStep::Navigate(NavigateStep {
        url: url.to_string(),
        description: None,
        output: None,
    })
}

fn select(text: &str, option: &str) -> WorkflowStep {
    WorkflowStep::Select(SelectStep {
        target: StepTarget::text(text),
        selected_text: option.to_string(),
        output: None,
    })
}

fn key_press(text: &str, key: &str) -> WorkflowStep {
    WorkflowStep::KeyPress(KeyPressStep {
        target: StepTarget::text(text),
        key: key.to_string(),
        output: None,
    })
}

fn no_inputs() -> Map<String, Value> {
    Map::new()
}

#[tokio::test]
async fn radio_group_input_checks_only_the_requested_option() {
    let page = Arc::new(
        FakePage::new("https://news.test/preferences")
            .with(FakeElement::radio("frequency", "daily").id("freq-daily").labelled("Daily"))
            .with(FakeElement::radio("frequency", "weekly").id("freq-weekly").labelled("Weekly"))
            .with(FakeElement::radio("frequency", "monthly").id("freq-monthly").labelled("Monthly")),
    );
    let mut runner = runner(&page, vec![input("frequency", "weekly")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert!(page.element_by_id("freq-weekly").unwrap().checked);
    assert!(!page.element_by_id("freq-daily").unwrap().checked);
    assert!(!page.element_by_id("freq-monthly").unwrap().checked);
    assert_eq!(page.count_ops("toggle:"), 1);
}

#[tokio::test]
async fn navigating_to_the_current_page_skips_the_browser_call() {
    let page = Arc::new(
        FakePage::new("https://shop.test/cart/").with(FakeElement::button("Checkout").id("checkout")),
    );
    let mut runner = runner(&page, vec![navigate("https://shop.test/cart#summary")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.count_ops("navigate:"), 0);
    assert!(output.step_results[0].summary.starts_with("Already at"));
    let index = runner.session().index().expect("index refreshed");
    assert!(index.get("Checkout").is_some());
}

#[tokio::test]
async fn navigation_to_another_page_is_performed() {
    let page = Arc::new(FakePage::new("about:blank"));
    let mut runner = runner(&page, vec![navigate("https://shop.test/")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.ops(), vec!["navigate:https://shop.test/".to_string()]);
}

#[tokio::test]
async fn progression_click_without_effect_fails_after_every_retry() {
    let page = Arc::new(
        FakePage::new("https://wizard.test/step-1")
            .with_title("Step 1")
            .with(FakeElement::button("Continue").id("continue")),
    );
    let mut runner = runner(&page, vec![click("Continue")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    let report = output.failure().expect("step should fail");
    assert_eq!(report.kind, FailureKind::VerificationFailed);
    assert_eq!(report.attempts, 4);
    assert_eq!(report.step_index, 0);
    assert_eq!(report.target_text.as_deref(), Some("Continue"));
    assert_eq!(page.count_ops("click:#continue"), 4);
    let diagnostics = report.diagnostics.as_ref().unwrap();
    assert_eq!(diagnostics.title, "Step 1");
    assert_eq!(diagnostics.similar_elements, vec!["Continue".to_string()]);
}

#[tokio::test]
async fn progression_click_passes_when_next_target_resolves() {
    let page = Arc::new(
        FakePage::new("https://wizard.test/step-1")
            .with(FakeElement::button("Continue").id("continue"))
            .with(FakeElement::text_input("card").id("card").labelled("Card number")),
    );
    let steps = vec![click("Continue"), input("Card number", "4242")];
    let mut runner = runner(&page, steps, fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(output.step_results[0].attempts, 1);
    assert_eq!(page.count_ops("click:#continue"), 1);
}

#[tokio::test]
async fn progression_click_passes_on_navigation() {
    let page = Arc::new(
        FakePage::new("https://wizard.test/step-1").with(
            FakeElement::button("Next").id("next").on_click(FakeEffect::Navigate {
                url: "https://wizard.test/step-2".into(),
                title: "Step 2".into(),
            }),
        ),
    );
    let mut runner = runner(&page, vec![click("Next")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(output.step_results[0].attempts, 1);
}

#[tokio::test]
async fn retries_are_bounded_by_configuration() {
    let page = Arc::new(
        FakePage::new("https://wizard.test/").with(FakeElement::button("Submit").id("submit")),
    );
    let mut runner = runner(&page, vec![click("Submit")], fast_config(1));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert_eq!(output.failure().unwrap().attempts, 2);
    assert_eq!(page.count_ops("click:#submit"), 2);
}

#[tokio::test]
async fn failure_budget_aborts_before_touching_the_page() {
    let page = Arc::new(
        FakePage::new("https://wizard.test/").with(FakeElement::button("Next").id("next")),
    );
    let mut runner = runner(&page, vec![click("Next")], fast_config(0));

    for _ in 0..3 {
        let err = runner.run_step(0, None).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::VerificationFailed);
    }
    assert_eq!(runner.session().counters().consecutive_failures, 3);

    page.clear_ops();
    let err = runner.run_step(0, None).await.unwrap_err();
    assert!(matches!(err, FlowError::SystemicFailure(_)), "{err}");
    assert!(page.ops().is_empty());
}

#[tokio::test]
async fn checkbox_already_in_requested_state_is_not_toggled() {
    let page = Arc::new(
        FakePage::new("https://news.test/signup")
            .with(FakeElement::checkbox("newsletter").id("newsletter").labelled("Send me news").checked()),
    );
    let mut runner = runner(&page, vec![input("Send me news", "yes")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.count_ops("toggle:"), 0);
    assert!(page.element_by_id("newsletter").unwrap().checked);
}

#[tokio::test]
async fn checkbox_is_toggled_through_its_label() {
    let page = Arc::new(
        FakePage::new("https://news.test/signup")
            .with(FakeElement::checkbox("terms").id("terms").labelled("I agree"))
            .with(FakeElement::label_for("terms", "I agree")),
    );
    let mut runner = runner(&page, vec![input("I agree", "on")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.count_ops("toggle:"), 1);
    assert_eq!(page.count_ops("click:label"), 1);
    assert_eq!(page.count_ops("check:"), 0);
    assert!(page.element_by_id("terms").unwrap().checked);
}

#[tokio::test]
async fn text_input_value_round_trips() {
    let page = Arc::new(
        FakePage::new("https://app.test/login")
            .with(FakeElement::text_input("username").id("username").labelled("Username")),
    );
    let mut runner = runner(&page, vec![input("Username", "abc")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.element_by_id("username").unwrap().value, "abc");
    assert_eq!(output.step_results[0].locator.as_deref(), Some("#username"));
}

#[tokio::test]
async fn rejected_input_fails_value_verification() {
    let page = Arc::new(
        FakePage::new("https://app.test/login").with(
            FakeElement::text_input("username")
                .id("username")
                .labelled("Username")
                .rejecting_input(),
        ),
    );
    let mut runner = runner(&page, vec![input("Username", "abc")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert_eq!(output.failure().unwrap().kind, FailureKind::VerificationFailed);
}

#[tokio::test]
async fn validation_messages_fail_the_step() {
    let page = Arc::new(
        FakePage::new("https://pay.test/").with(
            FakeElement::button("Pay")
                .id("pay")
                .on_click(FakeEffect::ShowValidation("Card number is required".into())),
        ),
    );
    let mut runner = runner(&page, vec![click("Pay")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    let report = output.failure().unwrap();
    assert_eq!(report.kind, FailureKind::ValidationErrorDetected);
    assert_eq!(
        report.diagnostics.as_ref().unwrap().validation_messages,
        vec!["Card number is required".to_string()]
    );
}

#[tokio::test]
async fn duplicate_targets_warn_but_succeed() {
    let page = Arc::new(
        FakePage::new("https://app.test/list")
            .with(FakeElement::button("Delete"))
            .with(FakeElement::button("Delete")),
    );
    let mut runner = runner(&page, vec![click("Delete")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert!(matches!(
        output.step_results[0].warnings.as_slice(),
        [ExecutionWarning::AmbiguousElement { matches: 2, .. }]
    ));
}

#[tokio::test]
async fn shared_structural_locator_is_clicked_by_text() {
    let page = Arc::new(
        FakePage::new("https://app.test/dialog")
            .with(FakeElement::button("Save").class("btn-action"))
            .with(FakeElement::button("Cancel").class("btn-action")),
    );
    let mut runner = runner(&page, vec![click("Cancel")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(
        page.ops(),
        vec!["click:xpath=//button[normalize-space(.)=\"Cancel\"]".to_string()]
    );
}

#[tokio::test]
async fn legacy_selector_is_used_when_text_does_not_resolve() {
    let page = Arc::new(FakePage::new("https://app.test/").with(FakeElement::button("⋯").id("menu")));
    let step = WorkflowStep::Click(ClickStep {
        target: StepTarget::text("Open settings menu").with_legacy_selector("#menu"),
        output: None,
    });
    let mut runner = runner(&page, vec![step], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(page.count_ops("click:#menu"), 1);
}

#[tokio::test]
async fn unknown_target_reports_element_not_found() {
    let page = Arc::new(FakePage::new("https://app.test/").with(FakeElement::button("Save")));
    let mut runner = runner(&page, vec![click("Delete account")], fast_config(1));

    let output = runner.run(no_inputs(), None).await.unwrap();

    let report = output.failure().unwrap();
    assert_eq!(report.kind, FailureKind::ElementNotFound);
    assert_eq!(report.attempts, 2);
    assert!(page.ops().is_empty());
}

#[tokio::test]
async fn inputs_are_validated_before_any_step() {
    let page = Arc::new(FakePage::new("https://app.test/"));
    let workflow = WorkflowDefinition::new("signup", vec![navigate("https://app.test/signup")])
        .with_input(InputField::new("email", InputType::String).required());
    let mut runner = WorkflowRunner::new(workflow, EngineSession::new(page.clone(), fast_config(0)));

    let err = runner.run(no_inputs(), None).await.unwrap_err();

    assert!(matches!(err, FlowError::InvalidInputs(_)));
    assert!(page.ops().is_empty());
}

#[tokio::test]
async fn placeholders_and_outputs_flow_through_the_context() {
    let page = Arc::new(
        FakePage::new("https://app.test/signup")
            .with(FakeElement::text_input("email").id("email").labelled("Email")),
    );
    page.set_content("<html><body><h1>Welcome</h1><p>Plan: Pro</p></body></html>");
    let steps = vec![
        input("Email", "{email}"),
        WorkflowStep::Extract(ExtractStep {
            goal: "plan name for {email}".into(),
            description: None,
            output: Some("plan".into()),
        }),
    ];
    let workflow = WorkflowDefinition::new("signup", steps)
        .with_input(InputField::new("email", InputType::String).required());
    let mut runner = WorkflowRunner::new(workflow, EngineSession::new(page.clone(), fast_config(0)));

    let mut inputs = Map::new();
    inputs.insert("email".into(), json!("ada@example.com"));
    let output = runner.run(inputs, None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(page.element_by_id("email").unwrap().value, "ada@example.com");
    assert_eq!(output.final_context.get("plan"), Some(&json!("Welcome Plan: Pro")));
    assert!(matches!(
        output.step_results[1].warnings.as_slice(),
        [ExecutionWarning::DegradedExtraction { .. }]
    ));
    assert_eq!(output.step_results[1].description, "extract: plan name for ada@example.com");
}

struct CannedExtractor(&'static str);

#[async_trait]
impl StructuredExtractor for CannedExtractor {
    async fn extract(&self, _goal: &str, _page_markup: &str) -> Result<String, ActionError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn extractor_payload_is_stored_as_json() {
    let page = Arc::new(FakePage::new("https://shop.test/order/7"));
    let steps = vec![WorkflowStep::Extract(ExtractStep {
        goal: "order total".into(),
        description: None,
        output: Some("total".into()),
    })];
    let session = EngineSession::new(page.clone(), fast_config(0))
        .with_extractor(Arc::new(CannedExtractor(r#"{"total": 42}"#)));
    let mut runner = WorkflowRunner::new(WorkflowDefinition::new("order", steps), session);

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert_eq!(output.final_context.get("total"), Some(&json!({"total": 42})));
    assert!(output.step_results[0].warnings.is_empty());
}

#[tokio::test]
async fn cancellation_is_observed_between_steps() {
    let page = Arc::new(FakePage::new("about:blank"));
    let token = CancellationToken::new();
    token.cancel();
    let mut runner = runner(&page, vec![navigate("https://shop.test/")], fast_config(0));

    let output = runner.run(no_inputs(), Some(token)).await.unwrap();

    assert!(matches!(output.status, RunStatus::Cancelled { at_step: 0 }));
    assert!(output.step_results.is_empty());
    assert!(page.ops().is_empty());
}

#[tokio::test]
async fn agent_steps_are_unsupported() {
    let page = Arc::new(FakePage::new("about:blank"));
    let workflow: WorkflowDefinition = serde_json::from_value(json!({
        "name": "mixed",
        "steps": [
            {"type": "navigation", "url": "https://shop.test/"},
            {"type": "agent", "task": "find the cheapest item"}
        ]
    }))
    .unwrap();
    let mut runner = WorkflowRunner::new(workflow, EngineSession::new(page.clone(), fast_config(3)));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert_eq!(output.step_results.len(), 1);
    let report = output.failure().unwrap();
    assert_eq!(report.kind, FailureKind::UnsupportedStepType);
    assert_eq!(report.step_index, 1);
}

#[tokio::test]
async fn run_step_rejects_out_of_range_index() {
    let page = Arc::new(FakePage::new("about:blank"));
    let mut runner = runner(&page, vec![navigate("https://shop.test/")], fast_config(0));

    let err = runner.run_step(3, None).await.unwrap_err();

    assert!(matches!(err, FlowError::StepOutOfRange { index: 3, len: 1 }));
}

#[tokio::test]
async fn container_hint_does_not_match_a_short_id_inside_it() {
    let page = Arc::new(
        FakePage::new("https://app.test/settings")
            .with(FakeElement::button("Save").id("s1").within("form", None, Some("in")))
            .with(
                FakeElement::button("Save")
                    .id("s2")
                    .within("form", Some("Billing Information"), None),
            ),
    );
    let step = WorkflowStep::Click(ClickStep {
        target: StepTarget::text("Save").with_container("Billing Information"),
        output: None,
    });
    let mut runner = runner(&page, vec![step], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(page.ops(), vec!["click:#s2".to_string()]);
}

#[tokio::test]
async fn select_step_picks_option_by_visible_label() {
    let page = Arc::new(
        FakePage::new("https://shop.test/address").with(
            FakeElement::select("country", &["Germany", "France", "Spain"])
                .id("country")
                .labelled("Country"),
        ),
    );
    let mut runner = runner(&page, vec![select("Country", "France")], fast_config(3));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(page.element_by_id("country").unwrap().value, "France");
    assert_eq!(page.count_ops("select:#country=France"), 1);
    assert_eq!(output.step_results[0].attempts, 1);
}

#[tokio::test]
async fn select_step_with_missing_option_fails_after_retries() {
    let page = Arc::new(
        FakePage::new("https://shop.test/address").with(
            FakeElement::select("country", &["Germany", "France"])
                .id("country")
                .labelled("Country"),
        ),
    );
    let mut runner = runner(&page, vec![select("Country", "Atlantis")], fast_config(2));

    let output = runner.run(no_inputs(), None).await.unwrap();

    let report = output.failure().expect("missing option should fail");
    assert_eq!(report.kind, FailureKind::ExecutionException);
    assert_eq!(report.attempts, 3);
    assert_eq!(page.count_ops("select:#country=Atlantis"), 3);
    assert_eq!(page.element_by_id("country").unwrap().value, "Germany");
    assert_eq!(runner.session().counters().global_failures, 1);
}

#[tokio::test]
async fn key_press_is_dispatched_to_the_resolved_field() {
    let page = Arc::new(
        FakePage::new("https://search.test/")
            .with(FakeElement::text_input("q").id("q").labelled("Search")),
    );
    let mut runner = runner(&page, vec![key_press("Search", "Enter")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success(), "{:?}", output.status);
    assert_eq!(page.ops(), vec!["press:#q=Enter".to_string()]);
}

#[tokio::test]
async fn key_press_raising_a_validation_message_fails() {
    let page = Arc::new(
        FakePage::new("https://search.test/").with(
            FakeElement::text_input("q")
                .id("q")
                .labelled("Search")
                .on_press(FakeEffect::ShowValidation("Query must be at least 3 characters".into())),
        ),
    );
    let mut runner = runner(&page, vec![key_press("Search", "Enter")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    let report = output.failure().unwrap();
    assert_eq!(report.kind, FailureKind::ValidationErrorDetected);
    assert_eq!(
        report.diagnostics.as_ref().unwrap().validation_messages,
        vec!["Query must be at least 3 characters".to_string()]
    );
}

#[tokio::test]
async fn scroll_step_applies_the_offset() {
    let page = Arc::new(FakePage::new("https://news.test/"));
    let step = WorkflowStep::Scroll(ScrollStep {
        dx: 0,
        dy: 300,
        description: None,
        output: None,
    });
    let mut runner = runner(&page, vec![step], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    assert_eq!(page.ops(), vec!["scroll:0,300".to_string()]);
    assert_eq!(output.step_results[0].summary, "Scrolled by (0, 300)");
}

#[tokio::test]
async fn navigation_waits_for_the_network_once_per_index_rebuild() {
    let page = Arc::new(FakePage::new("about:blank"));
    let mut runner = runner(&page, vec![navigate("https://shop.test/")], fast_config(0));

    let output = runner.run(no_inputs(), None).await.unwrap();

    assert!(output.is_success());
    // One rebuild before the step, one after the page changed.
    assert_eq!(page.idle_waits(), 2);
}
