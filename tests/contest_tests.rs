// tests/contest_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use club_portal::{
    AppError, AppState,
    admin::{console::AdminConsole, generator::QuestionGenerator},
    config::{Config, GenAiConfig},
    contest::{
        anticheat::Document,
        countdown::SystemClock,
        machine::Phase,
        runner::{ContestView, Outcome, Snapshot, UserAction},
    },
    models::{contest::ContestRequest, user::User},
    notify::RecordingNotifier,
    session::MemoryStorage,
};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use validator::Validate;

#[derive(Clone)]
struct FakeContest {
    status: &'static str,
    failing_submits: Arc<AtomicUsize>,
    starts: Arc<AtomicUsize>,
    submissions: Arc<Mutex<Vec<Value>>>,
}

impl FakeContest {
    fn new(status: &'static str, failing_submits: usize) -> Self {
        Self {
            status,
            failing_submits: Arc::new(AtomicUsize::new(failing_submits)),
            starts: Arc::new(AtomicUsize::new(0)),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn questions() -> Value {
    json!([
        { "questionText": "2 + 2?", "options": ["3", "4", "5", "22"] },
        { "questionText": "Capital of France?", "options": ["Rome", "Paris", "Oslo", "Bern"] }
    ])
}

async fn contest(State(fake): State<FakeContest>, Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "_id": id,
        "title": "Weekly Sprint",
        "timer": 30,
        "status": fake.status,
        "questions": questions(),
        "startedAt": Utc::now(),
    }))
}

async fn start(State(fake): State<FakeContest>, Path(_id): Path<String>) -> Json<Value> {
    fake.starts.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "attemptId": "a1",
        "questions": questions(),
        "startedAt": Utc::now(),
        "timer": 30,
    }))
}

async fn submit(
    State(fake): State<FakeContest>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    fake.submissions.lock().unwrap().push(body.clone());
    let failed = fake
        .failing_submits
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failed {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "busy" }))).into_response();
    }
    Json(json!({
        "_id": "a1",
        "responses": body["responses"],
        "score": 2,
        "correctAnswers": 2,
        "wrongAnswers": 0,
        "rank": 1,
    }))
    .into_response()
}

async fn spawn_api(fake: FakeContest) -> String {
    let app = Router::new()
        .route("/quizzes/{id}", get(contest))
        .route("/quizzes/{id}/start", post(start))
        .route("/quizzes/{id}/submit", post(submit))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn student_state(address: &str) -> (AppState, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let state = AppState::new(
        Config::for_base_url(address).unwrap(),
        Arc::new(MemoryStorage::default()),
        Arc::new(notifier.clone()),
    )
    .unwrap();
    let user: User = serde_json::from_value(json!({
        "_id": "s1", "name": "Ada", "email": "ada@club.dev", "role": "student"
    }))
    .unwrap();
    state.session.sign_in("token".to_string(), user).await.unwrap();
    (state, notifier)
}

async fn wait_until(rx: &mut watch::Receiver<Snapshot>, done: impl FnMut(&Snapshot) -> bool) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(done))
        .await
        .expect("view did not reach the expected phase")
        .expect("view stopped publishing")
        .clone()
}

fn select(index: usize, option: &str) -> UserAction {
    UserAction::Select {
        index,
        option: option.to_string(),
    }
}

#[tokio::test]
async fn student_takes_and_submits_a_contest() {
    let fake = FakeContest::new("ongoing", 0);
    let address = spawn_api(fake.clone()).await;
    let (state, _notifier) = student_state(&address).await;

    let (actions, action_rx) = mpsc::channel(8);
    let (snapshot_tx, mut snapshots) = watch::channel(Snapshot::initial());
    let document = Document::new();
    let view = ContestView::new(Arc::new(state), Arc::new(SystemClock), "q1", snapshot_tx);

    let student = async {
        let started = wait_until(&mut snapshots, |s| s.phase == Phase::InProgress).await;
        assert_eq!(started.questions.len(), 2);
        assert!(!started.can_submit);
        assert_eq!(document.listener_count(), 6);

        actions.send(UserAction::Submit { confirmed: true }).await.unwrap();
        let refused = wait_until(&mut snapshots, |s| s.notice.is_some()).await;
        assert_eq!(
            refused.notice.as_deref(),
            Some("Answer every question before submitting.")
        );

        actions.send(select(0, "4")).await.unwrap();
        actions.send(select(1, "Paris")).await.unwrap();
        wait_until(&mut snapshots, |s| s.can_submit).await;
        actions.send(UserAction::Submit { confirmed: true }).await.unwrap();
        wait_until(&mut snapshots, |s| matches!(s.phase, Phase::Submitted(_))).await;
    };

    let (outcome, ()) = tokio::join!(view.run(&document, action_rx), student);

    let Outcome::Submitted(attempt) = outcome else {
        panic!("expected a submission, got {outcome:?}");
    };
    assert_eq!(attempt.score, 2);
    assert_eq!(fake.starts.load(Ordering::SeqCst), 1);
    assert_eq!(
        fake.submissions.lock().unwrap()[0],
        json!({ "responses": [{ "selectedOption": "4" }, { "selectedOption": "Paris" }] })
    );
    assert_eq!(document.listener_count(), 0);
}

#[tokio::test]
async fn failed_submission_keeps_answers_for_a_retry() {
    let fake = FakeContest::new("ongoing", 1);
    let address = spawn_api(fake.clone()).await;
    let (state, notifier) = student_state(&address).await;

    let (actions, action_rx) = mpsc::channel(8);
    let (snapshot_tx, mut snapshots) = watch::channel(Snapshot::initial());
    let document = Document::new();
    let view = ContestView::new(Arc::new(state), Arc::new(SystemClock), "q1", snapshot_tx);

    let student = async {
        wait_until(&mut snapshots, |s| s.phase == Phase::InProgress).await;
        actions.send(select(0, "5")).await.unwrap();
        actions.send(select(1, "Oslo")).await.unwrap();
        wait_until(&mut snapshots, |s| s.can_submit).await;
        actions.send(UserAction::Submit { confirmed: true }).await.unwrap();

        let failed = wait_until(&mut snapshots, |s| {
            matches!(s.phase, Phase::SubmitFailed { .. })
        })
        .await;
        assert_eq!(failed.answers, vec![Some("5".to_string()), Some("Oslo".to_string())]);

        actions.send(UserAction::Retry).await.unwrap();
        wait_until(&mut snapshots, |s| matches!(s.phase, Phase::Submitted(_))).await;
    };

    let (outcome, ()) = tokio::join!(view.run(&document, action_rx), student);

    assert!(matches!(outcome, Outcome::Submitted(_)));
    let submissions = fake.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0], submissions[1]);
    assert_eq!(notifier.errors().len(), 1);
}

#[tokio::test]
async fn upcoming_contest_waits_without_starting() {
    let fake = FakeContest::new("upcoming", 0);
    let address = spawn_api(fake.clone()).await;
    let (state, _notifier) = student_state(&address).await;

    let (actions, action_rx) = mpsc::channel(8);
    let (snapshot_tx, mut snapshots) = watch::channel(Snapshot::initial());
    let document = Document::new();
    let view = ContestView::new(Arc::new(state), Arc::new(SystemClock), "q1", snapshot_tx);

    let student = async {
        wait_until(&mut snapshots, |s| matches!(s.phase, Phase::NotStarted(_))).await;
        actions.send(select(0, "4")).await.unwrap();
        let refused = wait_until(&mut snapshots, |s| s.notice.is_some()).await;
        assert!(refused.answers.is_empty());
        actions.send(UserAction::Leave).await.unwrap();
    };

    let (outcome, ()) = tokio::join!(view.run(&document, action_rx), student);

    assert_eq!(outcome, Outcome::Left);
    assert_eq!(fake.starts.load(Ordering::SeqCst), 0);
    assert_eq!(document.listener_count(), 0);
}

async fn generate_content(Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    let text = if prompt.contains("lifetimes") {
        // Second question has only three options.
        "[{\"questionText\": \"What does 'static mean?\", \
          \"options\": [\"a\", \"b\", \"c\", \"d\"], \"correctAnswer\": \"a\"}, \
         {\"questionText\": \"Elided?\", \"options\": [\"x\", \"y\", \"z\"], \
          \"correctAnswer\": \"x\"}]"
    } else {
        "```json\n[{\"questionText\": \"Which trait enables `?` on Option?\", \
         \"options\": [\"Try\", \"From\", \"Into\", \"Deref\"], \
         \"correctAnswer\": \"Try\", \"points\": 2}]\n```"
    };
    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

async fn spawn_model() -> QuestionGenerator {
    let app = Router::new().route("/models/{call}", post(generate_content));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    QuestionGenerator::new(
        GenAiConfig {
            api_key: "test-key".to_string(),
            endpoint: format!("http://127.0.0.1:{port}"),
            model: "gemini-test".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn generator_accepts_fenced_model_output() {
    let generator = spawn_model().await;

    let generated = generator.generate("rust traits", 1).await.unwrap();
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].correct_answer.as_deref(), Some("Try"));
    assert_eq!(generated[0].points, 2);
}

#[tokio::test]
async fn generated_questions_land_in_the_contest_form_only_when_valid() {
    let generator = spawn_model().await;
    let notifier = RecordingNotifier::new();
    let state = AppState::new(
        Config::for_base_url("http://127.0.0.1:9").unwrap(),
        Arc::new(MemoryStorage::default()),
        Arc::new(notifier.clone()),
    )
    .unwrap();
    let admin: User = serde_json::from_value(json!({
        "_id": "a1", "name": "Grace", "email": "grace@club.dev", "role": "admin"
    }))
    .unwrap();
    state.session.sign_in("token".to_string(), admin).await.unwrap();
    let console = AdminConsole::open(&state).unwrap();

    let mut form = ContestRequest {
        title: "Rust night".to_string(),
        description: String::new(),
        timer: 20,
        questions: vec![],
        status: None,
    };

    let err = console
        .generate_questions(&generator, "rust lifetimes", 2, &mut form)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(form.questions.is_empty());
    assert_eq!(notifier.errors().len(), 1);

    let added = console
        .generate_questions(&generator, "rust traits", 1, &mut form)
        .await
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(form.questions.len(), 1);
    assert_eq!(form.questions[0].options.len(), 4);
    assert!(form.validate().is_ok());
}
