use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Days;

use frontdesk::cli::{self, Command, Console};
use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::errors::AppError;
use frontdesk::models::{BookingKind, ConversationSession, ConversationState};
use frontdesk::services::ai::quota::QuotaTracker;
use frontdesk::services::ai::{LlmProvider, Message};
use frontdesk::services::documents::{self, DocumentIndex};
use frontdesk::services::hybrid::{AnswerSource, HybridQa};
use frontdesk::services::web::WebSearcher;
use frontdesk::state::AppState;

// ── Mock Providers ──

struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, _system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");

        // Deterministic answers keyed on the prompt text
        if last.starts_with("Comprehensively") {
            Ok("Blended answer from document and web.".to_string())
        } else if last.contains("warranty") {
            Ok("The warranty lasts two years.".to_string())
        } else {
            Ok("That is not mentioned in the text.".to_string())
        }
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        database_url: ":memory:".to_string(),
        gemini_api_key: String::new(),
        gemini_model: "gemini-1.5-flash".to_string(),
        gemini_daily_quota: 500,
        google_api_key: String::new(),
        google_cse_id: String::new(),
        web_daily_quota: 100,
    }
}

fn test_state() -> AppState {
    let conn = db::init_db(":memory:").unwrap();
    AppState::new(conn, test_config())
}

fn test_state_with_llm() -> AppState {
    test_state().with_llm(Arc::new(MockLlm))
}

/// Run one CLI command against scripted input and return everything printed.
async fn run_script(state: &AppState, command: Option<Command>, script: &str) -> String {
    let mut console = Console::new(script.as_bytes(), Vec::new());
    cli::run(state, command, &mut console).await.unwrap();
    String::from_utf8(console.into_output()).unwrap()
}

fn sample_index() -> DocumentIndex {
    DocumentIndex::build(vec![
        "The warranty covers manufacturing defects for two years.".to_string(),
        "Returns are accepted within thirty days with a receipt.".to_string(),
    ])
    .unwrap()
}

/// A searcher whose search endpoint refuses connections.
fn offline_searcher(quota: Arc<QuotaTracker>) -> WebSearcher {
    WebSearcher::new("key".to_string(), "cse".to_string(), Arc::new(MockLlm), quota)
        .with_search_url("http://127.0.0.1:9/customsearch/v1")
        .with_fetch_delay(Duration::ZERO)
}

// ── Dialogue Tests ──

#[tokio::test]
async fn test_call_request_end_to_end() {
    let state = test_state();
    let engine = state.dialogue_engine();
    let mut session = ConversationSession::new();

    let inputs = [
        "call me",
        "Jane Doe",
        "555-123-4567",
        "jane@example.com",
        "tomorrow",
        "yes",
    ];
    let turns: Vec<_> = inputs
        .iter()
        .map(|input| engine.advance(&mut session, input).unwrap())
        .collect();

    assert_eq!(turns.len(), 6);
    assert!(turns[4].reply.contains("Jane Doe"));
    assert!(turns[4].reply.contains("555-123-4567"));
    assert!(turns[..5].iter().all(|t| !t.completed));
    assert!(turns[5].completed);
    assert!(turns[5].reply.contains("call"));
    assert_eq!(session.state, ConversationState::Start);

    let store = state.booking_store();
    assert_eq!(store.count(BookingKind::CallRequest).unwrap(), 1);
    assert_eq!(store.count(BookingKind::Appointment).unwrap(), 0);

    let rows = store.recent(BookingKind::CallRequest, 10).unwrap();
    let tomorrow = engine.store().dates().today().checked_add_days(Days::new(1)).unwrap();
    assert_eq!(rows[0].name, "Jane Doe");
    assert_eq!(rows[0].email, "jane@example.com");
    assert_eq!(rows[0].date, tomorrow);
}

#[tokio::test]
async fn test_appointment_reprompts_on_bad_input() {
    let state = test_state();
    let engine = state.dialogue_engine();
    let mut session = ConversationSession::new();

    engine.advance(&mut session, "I'd like to book an appointment").unwrap();
    engine.advance(&mut session, "John Smith").unwrap();

    let turn = engine.advance(&mut session, "12345").unwrap();
    assert!(turn.reply.contains("Invalid phone number"));
    assert_eq!(session.state, ConversationState::AwaitingPhone);

    engine.advance(&mut session, "(555) 987-6543").unwrap();
    let turn = engine.advance(&mut session, "not-an-email").unwrap();
    assert!(turn.reply.contains("Invalid email"));

    engine.advance(&mut session, "john@example.com").unwrap();
    let turn = engine.advance(&mut session, "yesterday").unwrap();
    assert!(turn.reply.contains("future"));
    assert_eq!(session.state, ConversationState::AwaitingDate);

    let turn = engine.advance(&mut session, "someday maybe").unwrap();
    assert!(turn.reply.contains("couldn't understand"));

    engine.advance(&mut session, "in 3 days").unwrap();
    let turn = engine.advance(&mut session, "no").unwrap();
    assert_eq!(session.state, ConversationState::AwaitingDate);
    assert!(turn.reply.contains("try again"));

    engine.advance(&mut session, "next friday").unwrap();
    let turn = engine.advance(&mut session, "y").unwrap();
    assert!(turn.completed);
    assert!(turn.reply.contains("appointment"));
    assert_eq!(state.booking_store().count(BookingKind::Appointment).unwrap(), 1);
}

// ── CLI Tests ──

#[tokio::test]
async fn test_menu_books_appointment_then_exits() {
    let state = test_state();
    let script = "\
        book\n\
        book an appointment\n\
        John Smith\n\
        5551234567\n\
        john@example.com\n\
        in 2 weeks\n\
        yes\n\
        exit\n";

    let output = run_script(&state, None, script).await;

    assert!(output.contains("Welcome to the Assistant System!"));
    assert!(output.contains("Starting appointment booking system..."));
    assert!(output.contains("Assistant: All set! Your appointment is confirmed"));
    assert!(output.contains("Goodbye! Have a great day!"));
    assert_eq!(state.booking_store().count(BookingKind::Appointment).unwrap(), 1);
}

#[tokio::test]
async fn test_menu_exit_from_booking_saves_nothing() {
    let state = test_state();
    let script = "phone\ncall me\nJane Doe\nquit\nwhatever\nexit\n";

    let output = run_script(&state, None, script).await;

    assert!(output.contains("Starting call request system..."));
    assert!(output.contains("Returning to main menu..."));
    assert!(output.contains("I'm not sure what you need."));
    assert_eq!(state.booking_store().count(BookingKind::CallRequest).unwrap(), 0);
}

#[tokio::test]
async fn test_menu_stops_at_end_of_input() {
    let state = test_state();
    let output = run_script(&state, None, "\n\n").await;
    assert!(output.contains("How can I help you?"));
    assert!(!output.contains("Goodbye"));
}

#[tokio::test]
async fn test_book_command_runs_single_flow() {
    let state = test_state();
    let script = "call\nJane Doe\n555-123-4567\njane@example.com\ntomorrow\nyes\n";

    let output = run_script(&state, Some(Command::Book), script).await;

    assert!(output.contains("Hello! I'm your booking assistant."));
    assert!(output.contains("Your call is confirmed"));
    assert!(!output.contains("Welcome to the Assistant System!"));
}

#[tokio::test]
async fn test_records_command_lists_both_tables() {
    let state = test_state();
    let engine = state.dialogue_engine();
    let mut session = ConversationSession::new();
    for input in ["call me", "Ada Lovelace", "5551234567", "ada@example.com", "tomorrow", "yes"] {
        engine.advance(&mut session, input).unwrap();
    }

    let output = run_script(&state, Some(Command::Records { limit: 10 }), "").await;

    assert!(output.contains("Call Requests (1 of 1):"));
    assert!(output.contains("Ada Lovelace"));
    assert!(output.contains("ada@example.com"));
    assert!(output.contains("Appointments (0 of 0):"));
    assert!(output.contains("(none)"));
}

#[tokio::test]
async fn test_ask_command_answers_from_document() {
    let state = test_state_with_llm();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handbook.txt");
    std::fs::write(
        &path,
        "The warranty covers manufacturing defects for two years. \
         Returns are accepted within thirty days with a receipt.",
    )
    .unwrap();

    let output = run_script(
        &state,
        Some(Command::Ask { document: path }),
        "How long is the warranty?\nback\n",
    )
    .await;

    assert!(output.contains("Document processed. 1 chunks indexed."));
    assert!(output.contains("Answer: The warranty lasts two years."));
    assert!(output.contains("Gemini Quota: 1/500"));
    assert!(!output.contains("Web Quota"));
    assert!(output.contains("Returning to main menu..."));
}

#[tokio::test]
async fn test_ask_command_missing_file() {
    let state = test_state_with_llm();
    let output = run_script(
        &state,
        Some(Command::Ask {
            document: "/definitely/not/here.pdf".into(),
        }),
        "",
    )
    .await;
    assert!(output.contains("Error: File not found."));
}

#[tokio::test]
async fn test_document_flow_needs_api_key() {
    let state = test_state();
    let output = run_script(&state, None, "pdf\nexit\n").await;
    assert!(output.contains("GEMINI_API_KEY must be set"));
    assert!(output.contains("Goodbye!"));
}

#[tokio::test]
async fn test_menu_reuses_loaded_document() {
    let state = test_state_with_llm();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "The warranty covers parts and labour.").unwrap();

    let script = format!(
        "document\n{}\nwarranty?\nback\npdf\nwarranty again?\nback\nexit\n",
        path.display()
    );
    let output = run_script(&state, None, &script).await;

    assert_eq!(output.matches("Document processed.").count(), 1);
    assert_eq!(output.matches("Answer: The warranty lasts two years.").count(), 2);
    assert!(output.contains("Gemini Quota: 2/500"));
}

// ── Hybrid QA Tests ──

#[tokio::test]
async fn test_hybrid_answers_from_document() {
    let quota = Arc::new(QuotaTracker::new("Web", 5));
    let qa = HybridQa::new(Arc::new(MockLlm), Some(offline_searcher(Arc::clone(&quota))));

    let answer = qa.answer(&sample_index(), "What does the warranty cover?").await.unwrap();

    assert_eq!(answer.source, AnswerSource::Document);
    assert_eq!(answer.text, "The warranty lasts two years.");
    assert_eq!(quota.used(), 0);
}

#[tokio::test]
async fn test_hybrid_without_web_keeps_document_answer() {
    let qa = HybridQa::new(Arc::new(MockLlm), None);

    let answer = qa.answer(&sample_index(), "who is the ceo").await.unwrap();

    assert_eq!(answer.source, AnswerSource::Document);
    assert!(answer.text.contains("not mentioned"));
}

#[tokio::test]
async fn test_hybrid_falls_back_to_web() {
    let quota = Arc::new(QuotaTracker::new("Web", 5));
    let qa = HybridQa::new(Arc::new(MockLlm), Some(offline_searcher(Arc::clone(&quota))));

    let answer = qa.answer(&sample_index(), "who is the ceo").await.unwrap();

    assert_eq!(answer.source, AnswerSource::Web);
    assert_eq!(answer.text, "No search results found. Try a different query.");
    // A search with no hits leaves the budget untouched
    assert_eq!(quota.used(), 0);
}

#[tokio::test]
async fn test_hybrid_blends_entities() {
    let quota = Arc::new(QuotaTracker::new("Web", 5));
    let qa = HybridQa::new(Arc::new(MockLlm), Some(offline_searcher(Arc::clone(&quota))));

    let answer = qa
        .answer(&sample_index(), "Who founded Acme Rocket Works?")
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::Blended);
    assert_eq!(answer.text, "Blended answer from document and web.");
    assert_eq!(quota.used(), 0);
}

#[tokio::test]
async fn test_failed_searches_do_not_spend_web_quota() {
    let quota = Arc::new(QuotaTracker::new("Web", 3));
    let searcher = offline_searcher(Arc::clone(&quota));

    for _ in 0..4 {
        let digest = searcher.search_and_summarize("who is the ceo", 3).await.unwrap();
        assert_eq!(digest, "No search results found. Try a different query.");
    }
    assert_eq!(quota.used(), 0);
    assert_eq!(quota.remaining(), 3);
}

#[tokio::test]
async fn test_hybrid_web_quota_exhausted() {
    let quota = Arc::new(QuotaTracker::new("Web", 0));
    let qa = HybridQa::new(Arc::new(MockLlm), Some(offline_searcher(quota)));

    let err = qa.answer(&sample_index(), "who is the ceo").await.unwrap_err();
    assert!(err.downcast_ref::<AppError>().is_some_and(AppError::is_quota));
}

#[tokio::test]
async fn test_document_pipeline_round_trip() {
    let text = "Office hours are nine to five. The office is closed on public holidays. \
                Parking is available behind the building.";
    let chunks = documents::chunk_text(text, 8, 10);
    assert!(chunks.len() > 1);

    let index = DocumentIndex::build(chunks).unwrap();
    let context = index.retrieve("where can I find parking", 1);
    assert!(context.contains("Parking is available"));
}
