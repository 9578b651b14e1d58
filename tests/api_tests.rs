// tests/api_tests.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use club_portal::{
    AppError, AppState,
    admin::console::{AdminConsole, FormMode},
    api::{auth, badges},
    config::Config,
    models::{
        badge::BadgeRequest,
        user::{LoginRequest, RegisterRequest, Role},
    },
    notify::{Level, RecordingNotifier},
    session::{FileStorage, MemoryStorage},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

const GOOD_TOKEN: &str = "good-token";

/// Request log shared with the fake API.
#[derive(Clone, Default)]
struct Recorded {
    hits: Arc<Mutex<HashMap<String, usize>>>,
    bearer: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn hit(&self, route: &str, headers: &HeaderMap) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
        if let Some(value) = headers.get(header::AUTHORIZATION) {
            self.bearer
                .lock()
                .unwrap()
                .push(value.to_str().unwrap_or_default().to_string());
        }
    }

    fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    fn bearer(&self) -> Vec<String> {
        self.bearer.lock().unwrap().clone()
    }
}

fn user_json(role: &str) -> Value {
    json!({
        "_id": "u1",
        "name": "Ada Lovelace",
        "email": "ada@club.dev",
        "role": role,
        "isVerified": true,
        "badges": [{ "_id": "b1", "name": "First Blood", "points": 10 }]
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {GOOD_TOKEN}").as_str())
}

async fn login(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    rec.hit("login", &headers);
    match body["email"].as_str() {
        Some("unverified@club.dev") => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Please verify your email before logging in." })),
        )
            .into_response(),
        Some("admin@club.dev") => Json(json!({ "token": GOOD_TOKEN, "user": user_json("admin") })).into_response(),
        _ => Json(json!({ "token": GOOD_TOKEN, "user": user_json("student") })).into_response(),
    }
}

async fn register(State(rec): State<Recorded>, headers: HeaderMap) -> Json<Value> {
    rec.hit("register", &headers);
    Json(json!({ "message": "OTP sent" }))
}

async fn me(State(rec): State<Recorded>, headers: HeaderMap) -> Response {
    rec.hit("me", &headers);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token expired" }))).into_response();
    }
    let mut user = user_json("student");
    user["name"] = json!("Ada King");
    Json(user).into_response()
}

async fn list_badges(State(rec): State<Recorded>, headers: HeaderMap) -> Json<Value> {
    rec.hit("badges", &headers);
    Json(json!([{ "_id": "b1", "name": "First Blood", "points": 10 }]))
}

async fn create_badge(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    rec.hit("create_badge", &headers);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "_id": "b2", "name": body["name"], "points": body["points"] })).into_response()
}

async fn broken(State(rec): State<Recorded>, headers: HeaderMap) -> Response {
    rec.hit("students", &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "stack trace: boom at db.rs:42").into_response()
}

/// Spawns the fake API on a random port and returns its base URL.
async fn spawn_api(rec: Recorded) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/badges", get(list_badges).post(create_badge))
        .route("/students", get(broken))
        .layer(TraceLayer::new_for_http())
        .with_state(rec);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn client(address: &str) -> (AppState, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let config = Config::for_base_url(address).unwrap();
    let state = AppState::new(
        config,
        Arc::new(MemoryStorage::default()),
        Arc::new(notifier.clone()),
    )
    .unwrap();
    (state, notifier)
}

fn credentials(email: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: "secret123".to_string(),
    }
}

#[tokio::test]
async fn login_stores_session_and_sends_bearer() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, notifier) = client(&address).await;

    let user = auth::login(&state, &credentials("ada@club.dev")).await.unwrap();
    assert_eq!(user.role, Role::Student);
    assert!(state.session.is_authenticated());
    assert_eq!(state.session.token().as_deref(), Some(GOOD_TOKEN));
    assert_eq!(notifier.notices().last().unwrap().level, Level::Success);

    let refreshed = auth::refresh_user(&state).await.unwrap();
    assert_eq!(refreshed.name, "Ada King");
    assert_eq!(state.session.current_user().unwrap().name, "Ada King");
    assert_eq!(rec.bearer(), vec![format!("Bearer {GOOD_TOKEN}")]);
}

#[tokio::test]
async fn unverified_login_is_forbidden_and_announced() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, notifier) = client(&address).await;

    let err = auth::login(&state, &credentials("unverified@club.dev"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AppError::Forbidden("Please verify your email before logging in.".to_string())
    );
    assert!(!state.session.is_authenticated());
    assert_eq!(
        notifier.errors(),
        vec!["Please verify your email before logging in.".to_string()]
    );
}

#[tokio::test]
async fn mismatched_passwords_never_reach_the_api() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, notifier) = client(&address).await;

    let name = uuid::Uuid::new_v4().to_string()[..8].to_string();
    let form = RegisterRequest {
        name: name.clone(),
        email: format!("{name}@club.dev"),
        username: name,
        password: "secret123".to_string(),
        confirm_password: "secret124".to_string(),
    };

    let err = auth::register(&state, &form).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(rec.hits("register"), 0);
    assert_eq!(notifier.errors().len(), 1);
}

#[tokio::test]
async fn rejected_token_ends_the_session() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, _notifier) = client(&address).await;

    let user = serde_json::from_value(user_json("student")).unwrap();
    state.session.sign_in("stale-token".to_string(), user).await.unwrap();

    let err = auth::refresh_user(&state).await.unwrap_err();
    assert_eq!(err, AppError::AuthError("Token expired".to_string()));
    assert!(!state.session.is_authenticated());
    assert_eq!(rec.hits("me"), 1);
}

#[tokio::test]
async fn reads_are_cached_until_a_mutation_invalidates_them() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, _notifier) = client(&address).await;
    auth::login(&state, &credentials("admin@club.dev")).await.unwrap();

    badges::list_badges(&state).await.unwrap();
    badges::list_badges(&state).await.unwrap();
    assert_eq!(rec.hits("badges"), 1);

    let form = BadgeRequest {
        name: "Streak".to_string(),
        icon: None,
        points: 25,
        description: None,
    };
    let created = badges::create_badge(&state, &form).await.unwrap();
    assert_eq!(created.points, 25);

    badges::list_badges(&state).await.unwrap();
    assert_eq!(rec.hits("badges"), 2);
}

#[tokio::test]
async fn admin_console_refetches_after_saving() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, _notifier) = client(&address).await;

    auth::login(&state, &credentials("ada@club.dev")).await.unwrap();
    assert!(matches!(
        AdminConsole::open(&state),
        Err(AppError::Forbidden(_))
    ));

    auth::logout(&state).await.unwrap();
    auth::login(&state, &credentials("admin@club.dev")).await.unwrap();
    let console = AdminConsole::open(&state).unwrap();

    console.badges().await.unwrap();
    let form = BadgeRequest {
        name: "Mentor".to_string(),
        icon: Some("star".to_string()),
        points: 50,
        description: None,
    };
    console.save_badge(&FormMode::Create, &form).await.unwrap();
    assert_eq!(rec.hits("create_badge"), 1);
    assert_eq!(rec.hits("badges"), 2);
}

#[tokio::test]
async fn server_errors_hide_details_from_users() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let (state, _notifier) = client(&address).await;
    auth::login(&state, &credentials("ada@club.dev")).await.unwrap();

    let err = club_portal::api::students::list_students(&state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Server { status: 500, .. }));
    assert!(!err.user_message().contains("db.rs"));
}

#[tokio::test]
async fn session_survives_a_restart() {
    let rec = Recorded::default();
    let address = spawn_api(rec.clone()).await;
    let path = std::env::temp_dir().join(format!("club-session-{}.json", uuid::Uuid::new_v4()));

    let config = Config::for_base_url(&address).unwrap();
    let first = AppState::new(
        config.clone(),
        Arc::new(FileStorage::new(path.clone())),
        Arc::new(RecordingNotifier::new()),
    )
    .unwrap();
    auth::login(&first, &credentials("ada@club.dev")).await.unwrap();

    let second = AppState::new(
        config,
        Arc::new(FileStorage::new(path.clone())),
        Arc::new(RecordingNotifier::new()),
    )
    .unwrap();
    assert!(!second.session.is_authenticated());
    let restored = second.session.restore().await.unwrap().unwrap();
    assert_eq!(restored.email, "ada@club.dev");
    assert_eq!(second.session.token().as_deref(), Some(GOOD_TOKEN));

    auth::logout(&second).await.unwrap();
    assert!(!path.exists());
}
