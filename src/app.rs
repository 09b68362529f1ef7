//! HTTP surface: the axum router and handlers wiring user triggers to the
//! flows. Each handler resolves the caller's session, runs one flow and
//! reports the outcome as JSON; slow external calls run on the blocking
//! pool.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::compute::{self, ComputeOutcome};
use crate::feedback::{self, FeedbackDraft, FeedbackOutcome, FeedbackReason};
use crate::gateway::ComputeGateway;
use crate::mailer::NotificationGateway;
use crate::session::{Session, SessionRegistry};
use crate::upload;

const SESSION_COOKIE: &str = "sca_session";

pub struct AppState {
    pub sessions: SessionRegistry,
    pub compute: Arc<dyn ComputeGateway>,
    pub notifier: Arc<dyn NotificationGateway>,
}

#[derive(Deserialize)]
struct ComputeParams {
    n_clicks: i64,
    #[serde(default)]
    root_id: String,
}

#[derive(Deserialize)]
struct OpenParams {
    n_clicks: i64,
}

#[derive(Deserialize)]
struct CloseParams {
    n_clicks: i64,
    wwid: Option<String>,
    reason: Option<FeedbackReason>,
    comment: Option<String>,
}

pub async fn run(state: Arc<AppState>, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/", get(serve_landing))
        .route("/api/state", get(get_state))
        .route("/api/upload", post(upload_file))
        .route("/api/compute", post(compute_and_download))
        .route("/api/feedback/open", post(feedback_open))
        .route("/api/feedback/close", post(feedback_close))
        .route("/api/session/end", post(end_session))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Resolve the caller's session from the cookie, minting a new session (and
/// cookie) on first contact.
fn resolve_session(
    state: &AppState,
    jar: CookieJar,
) -> (CookieJar, Uuid, Arc<Mutex<Session>>) {
    let known = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok());
    match known {
        Some(id) => {
            let session = state.sessions.get_or_create(id);
            (jar, id, session)
        }
        None => {
            let id = Uuid::new_v4();
            let session = state.sessions.get_or_create(id);
            let jar = jar.add(Cookie::new(SESSION_COOKIE, id.to_string()));
            (jar, id, session)
        }
    }
}

async fn get_state(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, _, session) = resolve_session(&state, jar);
    let mut session = session.lock().unwrap();
    let dirty = session.store.take_dirty();
    (jar, Json(json!({ "dirty": dirty, "tree": session.store.root() })))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (jar, _, session) = resolve_session(&state, jar);

    let mut file_data = Vec::new();
    let mut filename = String::new();
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            file_data = field.bytes().await.unwrap_or_default().to_vec();
        }
    }

    if file_data.is_empty() {
        return error_json(&jar, "No file data received");
    }

    let mut session = session.lock().unwrap();
    match upload::on_upload(&mut session.store, &file_data, &filename) {
        Ok(outcome) => (jar, Json(json!({ "status": "ok", "outcome": format!("{outcome:?}") })))
            .into_response(),
        Err(e) => error_json(&jar, &e.to_string()),
    }
}

async fn compute_and_download(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(params): Json<ComputeParams>,
) -> Response {
    let (jar, _, session) = resolve_session(&state, jar);
    let gateway = Arc::clone(&state.compute);

    let outcome = tokio::task::spawn_blocking(move || {
        compute::on_compute_clicked(&session, gateway.as_ref(), params.n_clicks, &params.root_id)
    })
    .await;

    match outcome {
        Ok(Ok(ComputeOutcome::Download(payload))) => {
            (jar, Json(json!({ "status": "ok", "download": payload }))).into_response()
        }
        Ok(Ok(ComputeOutcome::NoOp)) => noop_json(&jar),
        Ok(Err(e)) => error_json(&jar, &e.to_string()),
        Err(e) => error_json(&jar, &e.to_string()),
    }
}

async fn feedback_open(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(params): Json<OpenParams>,
) -> Response {
    let (jar, _, session) = resolve_session(&state, jar);
    let mut session = session.lock().unwrap();
    match feedback::on_open_clicked(&mut session.store, params.n_clicks) {
        Ok(FeedbackOutcome::Opened) => {
            (jar, Json(json!({ "status": "ok", "modal": "open" }))).into_response()
        }
        Ok(_) => noop_json(&jar),
        Err(e) => error_json(&jar, &e.to_string()),
    }
}

async fn feedback_close(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(params): Json<CloseParams>,
) -> Response {
    let (jar, _, session) = resolve_session(&state, jar);

    // Missing fields never reach the flow, same as an invalid draft.
    let reason = match params.reason {
        Some(reason) => reason,
        None => return noop_json(&jar),
    };
    let n_clicks = params.n_clicks;
    let draft = FeedbackDraft {
        wwid: params.wwid.unwrap_or_default(),
        reason,
        comment: params.comment.unwrap_or_default(),
    };
    let notifier = Arc::clone(&state.notifier);

    let outcome = tokio::task::spawn_blocking(move || {
        feedback::on_close_clicked(&session, notifier.as_ref(), n_clicks, &draft)
    })
    .await;

    match outcome {
        Ok(Ok(FeedbackOutcome::Closed)) => {
            (jar, Json(json!({ "status": "ok", "modal": "closed" }))).into_response()
        }
        Ok(Ok(_)) => noop_json(&jar),
        Ok(Err(e)) => error_json(&jar, &e.to_string()),
        Err(e) => error_json(&jar, &e.to_string()),
    }
}

async fn end_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let id = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok());
    if let Some(id) = id {
        state.sessions.remove(id);
    }
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, Json(json!({ "status": "ok" }))).into_response()
}

fn noop_json(jar: &CookieJar) -> Response {
    (jar.clone(), Json(json!({ "status": "noop" }))).into_response()
}

fn error_json(jar: &CookieJar, message: &str) -> Response {
    (
        jar.clone(),
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}
