mod common;

use common::{other_page, Harness};
use orbit_core::context::{ViewHandle, WebView};
use orbit_core::errors::{BackendError, ExtractionError};
use orbit_core::messages::Role;
use orbit_llm::mock::{MockBackend, MockResponse};

fn reply(text: &str) -> MockBackend {
    MockBackend::new(vec![MockResponse::text(text)])
}

#[tokio::test]
async fn successful_send_appends_user_then_assistant() {
    let h = Harness::attached(reply("Ownership moves values.")).await;
    h.controller.set_input("What is ownership?");
    h.controller.send_message().await;

    let state = h.controller.snapshot();
    let tail: Vec<(Role, &str)> = state
        .messages
        .iter()
        .map(|m| (m.role(), m.content()))
        .collect();
    assert_eq!(
        tail,
        vec![
            (Role::User, "What is ownership?"),
            (Role::Assistant, "Ownership moves values."),
        ]
    );
    assert_eq!(state.last_error, None);
    assert!(!state.is_loading);
    assert!(!state.is_refreshing_context);
}

#[tokio::test]
async fn chat_request_carries_history_model_and_fresh_context() {
    let h = Harness::attached(MockBackend::new(vec![
        MockResponse::text("first"),
        MockResponse::text("second"),
    ]))
    .await;
    h.controller.set_input("one");
    h.controller.send_message().await;

    h.provider.set_content(h.page.id(), "Updated body.");
    h.controller.set_input("two");
    h.controller.send_message().await;

    let recorded = h.backend.recorded();
    assert_eq!(recorded.len(), 2);
    let last = &recorded[1];
    let contents: Vec<&str> = last.history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "first", "two"]);
    assert_eq!(last.model, "llama3.2");
    let context = last.context.as_ref().unwrap();
    assert_eq!(context.title.as_deref(), Some("Docs"));
    assert_eq!(context.page_content.as_deref(), Some("Updated body."));
}

#[tokio::test]
async fn blank_input_is_a_no_op() {
    let h = Harness::attached(reply("unused")).await;
    for input in ["", "   ", "\n\t "] {
        h.controller.set_input(input);
        h.controller.send_message().await;
    }
    let state = h.controller.snapshot();
    assert!(state.messages.is_empty());
    assert_eq!(state.last_error, None);
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn backend_failure_keeps_user_message_and_sets_error() {
    let h = Harness::attached(MockBackend::new(vec![
        MockResponse::Error(BackendError::ModelNotFound("llama3.2".into())),
        MockResponse::text("recovered"),
    ]))
    .await;
    h.controller.set_input("hello");
    h.controller.send_message().await;

    let state = h.controller.snapshot();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].role(), Role::User);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Model 'llama3.2' not found. Please pull the model first: ollama pull llama3.2")
    );
    assert!(!state.is_loading);

    // Still usable, and a new send clears the error.
    h.controller.set_input("again");
    h.controller.send_message().await;
    let state = h.controller.snapshot();
    assert_eq!(state.last_error, None);
    assert_eq!(state.last_message().unwrap().content(), "recovered");
    assert_eq!(
        state.messages.iter().filter(|m| m.role() == Role::Assistant).count(),
        1
    );
}

#[tokio::test]
async fn every_backend_error_surfaces_its_description() {
    let errors = [
        BackendError::NotRunning,
        BackendError::StreamError("connection reset".into()),
        BackendError::InvalidResponse,
        BackendError::InvalidModelId("x".into()),
    ];
    for error in errors {
        let expected = error.to_string();
        let h = Harness::attached(MockBackend::new(vec![MockResponse::Error(error)])).await;
        h.controller.set_input("q");
        h.controller.send_message().await;
        let state = h.controller.snapshot();
        assert_eq!(state.last_error, Some(expected));
        assert_eq!(state.messages.len(), 1);
        assert!(!state.is_loading && !state.is_refreshing_context);
    }
}

#[tokio::test]
async fn clear_chat_keeps_context_model_and_connection() {
    let h = Harness::attached(
        MockBackend::new(vec![MockResponse::Error(BackendError::InvalidResponse)])
            .with_models(&["llama3.2", "mistral"]),
    )
    .await;
    h.controller.select_model("mistral");
    h.controller.set_input("hi");
    h.controller.send_message().await;
    let before = h.controller.snapshot();
    assert!(before.last_error.is_some());

    h.controller.clear_chat();
    let after = h.controller.snapshot();
    assert!(after.messages.is_empty());
    assert_eq!(after.last_error, None);
    assert_eq!(after.current_context, before.current_context);
    assert!(after.current_context.is_some());
    assert_eq!(after.selected_model, "mistral");
    assert_eq!(after.is_connected, before.is_connected);
}

#[tokio::test]
async fn summarize_scenario() {
    let h = Harness::attached(reply("This page is about X.")).await;
    h.finish_navigation(&h.page);
    h.controller.settle().await;
    let context = h.controller.snapshot().current_context.unwrap();
    assert_eq!(context.title.as_deref(), Some("Docs"));
    assert!(context.has_content());

    h.controller.summarize_page().await;
    let state = h.controller.snapshot();
    let n = state.messages.len();
    assert_eq!(state.messages[n - 2].role(), Role::User);
    assert_eq!(state.messages[n - 2].content(), "Please summarize this page.");
    assert_eq!(state.messages[n - 1].role(), Role::Assistant);
    assert_eq!(state.messages[n - 1].content(), "This page is about X.");
}

#[tokio::test]
async fn summarize_without_content_does_not_call_backend() {
    let h = Harness::detached(reply("unused")).await;
    h.controller.attach(ViewHandle::new(&h.page));
    h.controller.settle().await;

    h.controller.summarize_page().await;
    let state = h.controller.snapshot();
    assert_eq!(
        state.last_error.as_deref(),
        Some("No page content available to summarize")
    );
    assert!(state.messages.is_empty());
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn extraction_failure_falls_back_silently() {
    let h = Harness::attached(reply("ok")).await;
    h.provider
        .fail_extraction(h.page.id(), Some(ExtractionError::Script("blocked".into())));
    h.controller.refresh_context().await;

    let state = h.controller.snapshot();
    let context = state.current_context.unwrap();
    assert_eq!(context.title.as_deref(), Some("Docs"));
    assert!(!context.has_content());
    assert!(state.context_is_fallback);
    assert_eq!(state.last_error, None);
    assert!(!state.is_refreshing_context);

    // Degraded context still lets chat proceed.
    h.controller.set_input("anything?");
    h.controller.send_message().await;
    assert_eq!(h.controller.snapshot().last_message().unwrap().content(), "ok");
}

#[tokio::test]
async fn explain_prefers_cached_selection() {
    let h = Harness::attached(reply("It is a pointer.")).await;
    h.provider.set_selection(h.page.id(), Some("stale fetched text"));
    h.select(&h.page, "Box<T>");
    h.controller.explain_selection().await;

    let state = h.controller.snapshot();
    assert_eq!(state.messages[0].content(), "Please explain: \"Box<T>\"");
}

#[tokio::test]
async fn explain_falls_back_to_fetching_selection() {
    let h = Harness::attached(reply("ok")).await;
    h.provider.set_selection(h.page.id(), Some("lifetimes"));
    h.controller.explain_selection().await;
    assert_eq!(
        h.controller.snapshot().messages[0].content(),
        "Please explain: \"lifetimes\""
    );
}

#[tokio::test]
async fn explain_without_any_selection() {
    let h = Harness::attached(reply("unused")).await;
    h.controller.explain_selection().await;
    assert_eq!(h.controller.snapshot().last_error.as_deref(), Some("No text selected"));

    h.provider
        .fail_selection(h.page.id(), Some(ExtractionError::Timeout));
    h.controller.explain_selection().await;
    let state = h.controller.snapshot();
    assert!(state
        .last_error
        .unwrap()
        .starts_with("Failed to get selected text"));
    assert!(state.messages.is_empty());
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn ask_about_selection_templates() {
    let h = Harness::attached(MockBackend::new(vec![
        MockResponse::text("a"),
        MockResponse::text("b"),
    ]))
    .await;
    h.controller.ask_about_selection(None).await;
    assert_eq!(h.controller.snapshot().last_error.as_deref(), Some("No text selected"));

    h.select(&h.page, "RAII");
    h.controller.ask_about_selection(None).await;
    h.controller
        .ask_about_selection(Some("Give an example of"))
        .await;

    let contents: Vec<String> = h
        .controller
        .snapshot()
        .messages
        .iter()
        .filter(|m| m.role() == Role::User)
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(
        contents,
        vec![
            "Regarding this text: \"RAII\"".to_string(),
            "Give an example of: \"RAII\"".to_string(),
        ]
    );
}

#[tokio::test]
async fn empty_model_list_keeps_default() {
    let h = Harness::detached(MockBackend::new(vec![])).await;
    let state = h.controller.snapshot();
    assert!(state.is_connected);
    assert!(state.available_models.is_empty());
    assert_eq!(state.selected_model, "llama3.2");
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn missing_model_defaults_to_first_listed() {
    let h = Harness::detached(MockBackend::new(vec![]).with_models(&["qwen2.5", "mistral"])).await;
    let state = h.controller.snapshot();
    assert_eq!(state.available_models, vec!["qwen2.5", "mistral"]);
    assert_eq!(state.selected_model, "qwen2.5");

    h.controller.select_model("mistral");
    h.controller.check_connection().await;
    assert_eq!(h.controller.snapshot().selected_model, "mistral");
}

#[tokio::test]
async fn model_listing_failure_sets_error() {
    let backend = MockBackend::new(vec![]).with_model_error(BackendError::NotRunning);
    let h = Harness::detached(backend).await;
    let state = h.controller.snapshot();
    assert!(state.is_connected);
    assert!(state
        .last_error
        .unwrap()
        .starts_with("Failed to load models:"));
}

#[tokio::test]
async fn disconnected_backend_skips_listing() {
    let h = Harness::detached(
        MockBackend::new(vec![])
            .with_models(&["mistral"])
            .disconnected(),
    )
    .await;
    let state = h.controller.snapshot();
    assert!(!state.is_connected);
    assert!(state.available_models.is_empty());
    assert_eq!(state.selected_model, "llama3.2");

    h.backend.set_connected(true);
    h.controller.check_connection().await;
    assert!(h.controller.snapshot().is_connected);
}

#[tokio::test]
async fn detached_controller_reports_no_page() {
    let h = Harness::attached(reply("unused")).await;
    h.controller.detach();
    assert_eq!(h.controller.attached_view_id(), None);

    h.controller.refresh_context().await;
    assert_eq!(h.controller.snapshot().last_error.as_deref(), Some("No page attached"));

    h.controller.clear_chat();
    h.controller.summarize_page().await;
    assert_eq!(h.controller.snapshot().last_error.as_deref(), Some("No page attached"));
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn attaching_another_view_resets_page_state_only() {
    let h = Harness::attached(reply("kept")).await;
    h.select(&h.page, "selected");
    h.controller.set_input("hi");
    h.controller.send_message().await;

    let other = other_page();
    h.controller.attach(ViewHandle::new(&other));
    let state = h.controller.snapshot();
    assert_eq!(state.last_known_selected_text, None);
    assert_eq!(state.messages.len(), 2);

    h.controller.settle().await;
    let state = h.controller.snapshot();
    assert_eq!(state.current_context.unwrap().title.as_deref(), Some("News"));
    assert_eq!(h.controller.attached_view_id().as_ref(), Some(other.id()));
}

#[tokio::test]
async fn reattaching_same_view_keeps_selection() {
    let h = Harness::attached(reply("unused")).await;
    h.select(&h.page, "keep me");
    h.controller.attach(ViewHandle::new(&h.page));
    assert_eq!(
        h.controller.snapshot().last_known_selected_text.as_deref(),
        Some("keep me")
    );
}

#[tokio::test]
async fn snapshots_are_published() {
    let h = Harness::attached(reply("unused")).await;
    let mut rx = h.controller.subscribe();
    rx.borrow_and_update();
    h.controller.set_input("draft");
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().input, "draft");
    assert!(rx.borrow().can_send());
}
