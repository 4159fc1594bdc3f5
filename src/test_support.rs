use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{config::Settings, security, state::AppState, time::primitive_now_utc};
use crate::db;
use crate::db::models::{Exam, Question, User};
use crate::db::types::{DifficultyLevel, UserRole};
use crate::engine::{clock::SystemClock, store::SqliteStore, SessionEngine};
use crate::repositories;

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("EXAMDESK_ENV", "test");
    std::env::set_var("EXAMDESK_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", "test-secret");
    std::env::set_var("DATABASE_URL", "sqlite::memory:");
    std::env::remove_var("PROMETHEUS_ENABLED");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(|| {}).await
}

pub(crate) async fn setup_test_context_with(tweak_env: impl FnOnce()) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    tweak_env();

    let settings = Settings::load().expect("settings");
    let pool = db::init_pool(&settings).await.expect("pool");
    db::run_migrations(&pool).await.expect("migrations");

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let engine = SessionEngine::new(
        store.clone(),
        store,
        Arc::new(SystemClock),
        settings.engine().to_engine_config(),
    );

    let state = AppState::new(settings, pool, engine);
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    role: UserRole,
    password: &str,
) -> User {
    let hashed_password = security::hash_password(password).expect("hash password");
    repositories::users::create(
        pool,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            email: &format!("{username}@example.test"),
            full_name: &format!("Test {username}"),
            role,
            registration_number: None,
            phone: None,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert user")
}

pub(crate) async fn insert_exam(
    pool: &SqlitePool,
    title: &str,
    duration_seconds: i64,
    passing_score: f64,
) -> Exam {
    repositories::exams::create(
        pool,
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title,
            description: "test exam",
            subjects: serde_json::json!(["math", "physics"]),
            duration_seconds,
            passing_score,
            instructions: "",
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert exam")
}

pub(crate) async fn insert_question(
    pool: &SqlitePool,
    exam_id: &str,
    subject: &str,
    correct_option: &str,
) -> Question {
    let question = repositories::questions::create(
        pool,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            subject,
            prompt: "What is the answer?",
            option_a: "first",
            option_b: "second",
            option_c: "third",
            option_d: "fourth",
            correct_option,
            explanation: None,
            image_url: None,
            difficulty: DifficultyLevel::Easy,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert question");

    repositories::exams::refresh_question_count(pool, exam_id, primitive_now_utc())
        .await
        .expect("refresh question count");

    question
}

pub(crate) fn bearer_token(user_id: &str, settings: &Settings) -> String {
    security::create_access_token(user_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(crate) async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&body).expect("json body")
}
