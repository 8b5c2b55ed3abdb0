//! Tests against a real Postgres. `#[sqlx::test]` creates a fresh database per
//! test from `DATABASE_URL`; each test loads `sql/schema.sql` through the same
//! runner the `migrate` binary uses.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use moodmate_api::{
    app::build_router,
    auth::jwt::create_access_token,
    config::Config,
    error::is_unique_violation,
    migration::{run_statements, split_statements},
    models::user::UserRole,
    AppState,
};

struct TestUser {
    id: Uuid,
    anonymous_id: String,
    bearer: String,
}

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        db_max_connections: 5,
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:5173".into(),
        jwt_secret: "db-test-secret".into(),
        jwt_access_ttl_secs: 900,
        jwt_refresh_ttl_secs: 3600,
    }
}

async fn setup(pool: &PgPool) -> (Router, Arc<Config>) {
    let report = run_statements(pool, &split_statements(include_str!("../sql/schema.sql"))).await;
    assert_eq!(report.failed, 0, "schema did not apply cleanly");

    let config = Arc::new(test_config());
    let app = build_router(AppState::new(pool.clone(), config.clone()))
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    (app, config)
}

async fn insert_user(pool: &PgPool, config: &Config, email: &str, role: UserRole) -> TestUser {
    let id = Uuid::new_v4();
    let anonymous_id = format!("Anon-{}", &id.simple().to_string()[..4]);
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, anonymous_id) VALUES ($1, $2, 'x', $3, $4)",
    )
    .bind(id)
    .bind(email)
    .bind(role)
    .bind(&anonymous_id)
    .execute(pool)
    .await
    .unwrap();

    let token = create_access_token(id, email, config).unwrap();
    TestUser {
        id,
        anonymous_id,
        bearer: format!("Bearer {}", token),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, bearer: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, bearer)
        .body(Body::empty())
        .unwrap()
}

async fn create_log(app: &Router, user: &TestUser, mood_level: i32, note: &str) -> Uuid {
    let (status, body) = send(
        app,
        post_json(
            "/api/mood-logs",
            &user.bearer,
            json!({ "mood_level": mood_level, "note": note }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn active_sessions(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM video_chat_sessions WHERE status = 'active' AND (user_a = $1 OR user_b = $1)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = false)]
async fn analysis_runs_once_and_stores_three_ordered_recommendations(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let user = insert_user(&pool, &config, "ana@uni.edu", UserRole::Member).await;
    let log_id = create_log(&app, &user, 1, "exam stress all week").await;

    let request = json!({ "mood_log_id": log_id, "mood_level": 1, "note": "exam stress all week" });
    let (status, body) = send(&app, post_json("/functions/v1/analyze-mood", &user.bearer, request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["stress_level"], 5);
    assert_eq!(body["recommendations"], 3);

    let positions: Vec<i32> = sqlx::query_scalar(
        "SELECT position FROM recommendations WHERE mood_log_id = $1 ORDER BY position",
    )
    .bind(log_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(positions, vec![0, 1, 2]);

    let (status, body) = send(&app, post_json("/functions/v1/analyze-mood", &user.bearer, request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Mood log has already been analyzed");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recommendations WHERE mood_log_id = $1")
        .bind(log_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[sqlx::test(migrations = false)]
async fn analysis_uses_the_stored_note(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let user = insert_user(&pool, &config, "noah@uni.edu", UserRole::Member).await;
    let log_id = create_log(&app, &user, 3, "  deadline tomorrow  ").await;

    let (status, body) = send(
        &app,
        post_json(
            "/functions/v1/analyze-mood",
            &user.bearer,
            json!({ "mood_log_id": log_id, "mood_level": 3, "note": "feeling great" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "note does not match the stored mood log");

    let (status, body) = send(
        &app,
        post_json(
            "/functions/v1/analyze-mood",
            &user.bearer,
            json!({ "mood_log_id": log_id, "mood_level": 3, "note": "deadline tomorrow" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["stress_level"], 4);

    let sentiment: Option<String> = sqlx::query_scalar("SELECT sentiment FROM mood_logs WHERE id = $1")
        .bind(log_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(sentiment.unwrap().contains("stress or pressure"));
}

#[sqlx::test(migrations = false)]
async fn analysis_rejects_someone_elses_log(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let owner = insert_user(&pool, &config, "owner@uni.edu", UserRole::Member).await;
    let other = insert_user(&pool, &config, "other@uni.edu", UserRole::Member).await;
    let log_id = create_log(&app, &owner, 2, "").await;

    let (status, body) = send(
        &app,
        post_json(
            "/functions/v1/analyze-mood",
            &other.bearer,
            json!({ "mood_log_id": log_id, "mood_level": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Mood log not found");
}

#[sqlx::test(migrations = false)]
async fn matchmaking_pairs_two_users_and_queues_the_third(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let a = insert_user(&pool, &config, "a@uni.edu", UserRole::Member).await;
    let b = insert_user(&pool, &config, "b@uni.edu", UserRole::Member).await;
    let c = insert_user(&pool, &config, "c@uni.edu", UserRole::Member).await;

    let (_, body) = send(&app, post_json("/api/matchmaking/join", &a.bearer, json!({}))).await;
    assert_eq!(body["state"], "waiting");

    let (status, body) = send(&app, post_json("/api/matchmaking/join", &b.bearer, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "matched");
    assert_eq!(body["session"]["partner_anonymous_id"], a.anonymous_id);

    // Joining again returns the same session instead of pairing anew
    let session_id = body["session"]["session_id"].clone();
    let (_, body) = send(&app, post_json("/api/matchmaking/join", &b.bearer, json!({}))).await;
    assert_eq!(body["session"]["session_id"], session_id);

    let (_, body) = send(&app, post_json("/api/matchmaking/join", &c.bearer, json!({}))).await;
    assert_eq!(body["state"], "waiting");

    let (_, body) = send(&app, get("/api/matchmaking/status", &a.bearer)).await;
    assert_eq!(body["session"]["partner_anonymous_id"], b.anonymous_id);

    for user in [&a, &b] {
        assert_eq!(active_sessions(&pool, user.id).await, 1);
    }
    assert_eq!(active_sessions(&pool, c.id).await, 0);
}

#[sqlx::test(migrations = false)]
async fn join_waits_for_an_in_flight_pairing_of_the_same_user(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let b = insert_user(&pool, &config, "b@uni.edu", UserRole::Member).await;
    let c = insert_user(&pool, &config, "c@uni.edu", UserRole::Member).await;
    let d = insert_user(&pool, &config, "d@uni.edu", UserRole::Member).await;

    let (_, body) = send(&app, post_json("/api/matchmaking/join", &b.bearer, json!({}))).await;
    assert_eq!(body["state"], "waiting");

    // C pairs with B in a transaction that stays open across the next joins
    let mut pairing = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(vec![b.id, c.id])
        .execute(&mut *pairing)
        .await
        .unwrap();
    let b_entry: Uuid = sqlx::query_scalar(
        "SELECT id FROM matchmaking_queue WHERE user_id = $1 AND status = 'waiting' FOR UPDATE",
    )
    .bind(b.id)
    .fetch_one(&mut *pairing)
    .await
    .unwrap();

    // B's row is taken, so D queues instead of claiming it
    let (_, body) = send(&app, post_json("/api/matchmaking/join", &d.bearer, json!({}))).await;
    assert_eq!(body["state"], "waiting");

    let rejoin = {
        let app = app.clone();
        let bearer = b.bearer.clone();
        tokio::spawn(async move {
            send(&app, post_json("/api/matchmaking/join", &bearer, json!({}))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!rejoin.is_finished(), "rejoin should block on the pairing in flight");

    sqlx::query("UPDATE matchmaking_queue SET status = 'matched' WHERE id = $1")
        .bind(b_entry)
        .execute(&mut *pairing)
        .await
        .unwrap();
    sqlx::query("INSERT INTO video_chat_sessions (user_a, user_b) VALUES ($1, $2)")
        .bind(b.id)
        .bind(c.id)
        .execute(&mut *pairing)
        .await
        .unwrap();
    pairing.commit().await.unwrap();

    let (status, body) = rejoin.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "matched");
    assert_eq!(body["session"]["partner_anonymous_id"], c.anonymous_id);

    assert_eq!(active_sessions(&pool, b.id).await, 1);
    assert_eq!(active_sessions(&pool, d.id).await, 0);
    let (_, body) = send(&app, get("/api/matchmaking/status", &d.bearer)).await;
    assert_eq!(body["state"], "waiting");
}

#[sqlx::test(migrations = false)]
async fn ending_a_session_lets_both_users_queue_again(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let a = insert_user(&pool, &config, "a@uni.edu", UserRole::Member).await;
    let b = insert_user(&pool, &config, "b@uni.edu", UserRole::Member).await;

    send(&app, post_json("/api/matchmaking/join", &a.bearer, json!({}))).await;
    let (_, body) = send(&app, post_json("/api/matchmaking/join", &b.bearer, json!({}))).await;
    let session_id = body["session"]["session_id"].as_str().unwrap().to_string();

    let uri = format!("/api/chat-sessions/{}/end", session_id);
    let (status, body) = send(&app, post_json(&uri, &a.bearer, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");

    let (status, _) = send(&app, post_json(&uri, &b.bearer, json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, post_json("/api/matchmaking/join", &a.bearer, json!({}))).await;
    assert_eq!(body["state"], "waiting");
}

#[sqlx::test(migrations = false)]
async fn migration_runner_continues_past_a_failing_statement(pool: PgPool) {
    let statements = split_statements(
        "CREATE TABLE scratch (id int);\nCREATE TABLE scratch (id int);\nINSERT INTO scratch VALUES (1);",
    );
    let report = run_statements(&pool, &statements).await;

    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total(), 3);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[sqlx::test(migrations = false)]
async fn admin_dashboard_is_forbidden_for_members(pool: PgPool) {
    let (app, config) = setup(&pool).await;
    let member = insert_user(&pool, &config, "member@uni.edu", UserRole::Member).await;
    let admin = insert_user(&pool, &config, "admin@uni.edu", UserRole::Admin).await;
    create_log(&app, &member, 4, "").await;

    let (status, body) = send(&app, get("/api/admin/dashboard", &member.bearer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 403);

    let (status, body) = send(&app, get("/api/admin/dashboard?days=7", &admin.bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["total_mood_logs"], 1);
    assert_eq!(body["mood_distribution"]["4"], 1);
}

#[sqlx::test(migrations = false)]
async fn register_reports_duplicate_email_as_conflict(pool: PgPool) {
    let (app, _) = setup(&pool).await;
    let payload = json!({ "email": "Sam@Uni.edu", "password": "correct horse" });

    let register = || {
        Request::post("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    };

    let (status, body) = send(&app, register()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (status, body) = send(&app, register()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Email already registered");
}

#[sqlx::test(migrations = false)]
async fn duplicate_email_insert_is_a_unique_violation(pool: PgPool) {
    setup(&pool).await;
    let insert = || {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, anonymous_id) VALUES ($1, 'dup@uni.edu', 'x', 'Anon-0001')",
        )
        .bind(Uuid::new_v4())
        .execute(&pool)
    };

    insert().await.unwrap();
    let err = insert().await.unwrap_err();
    assert!(is_unique_violation(&err));
}
