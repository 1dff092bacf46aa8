//! HTTP Server for the Fieldmap API.
//!
//! Serves one shared import session. Every state-changing endpoint answers
//! with the full session view.
//!
//! # API Endpoints
//!
//! | Method | Path                    | Description                          |
//! |--------|-------------------------|--------------------------------------|
//! | GET    | `/health`               | Health check                         |
//! | GET    | `/api/session`          | Current session view                 |
//! | POST   | `/api/upload`           | Import a CSV file (multipart `file`) |
//! | PUT    | `/api/mapping/{field}`  | Bind a field to a column             |
//! | DELETE | `/api/mapping`          | Unmap every field                    |
//! | POST   | `/api/mapping/open`     | Reopen the mapping editor            |
//! | POST   | `/api/mapping/confirm`  | Validate and commit the dataset      |
//! | POST   | `/api/mapping/cancel`   | Close the editor                     |
//! | POST   | `/api/submit`           | Send the dataset to the endpoint     |
//! | GET    | `/api/logs`             | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post, put},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, fmt::Display, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, MappingRequest, SessionView};
use crate::config::Config;
use crate::error::{ConfigError, ImportError, ImportResult, MappingError, PipelineError, ServerResult, SubmitError};
use crate::models::SubmissionOutcome;
use crate::parser::{check_size, decode_bytes};
use crate::session::{Session, SubmitTicket, NO_DATA_MESSAGE};
use crate::submit::Submitter;

/// Multipart framing allowance on top of the file size limit
const BODY_OVERHEAD: usize = 64 * 1024;

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<SessionView>, ApiError>;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub submitter: Submitter,
    pub max_file_size: u64,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            session: Arc::new(Mutex::new(Session::new())),
            submitter: Submitter::from_config(config)?,
            max_file_size: config.max_file_size,
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = usize::try_from(state.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/session", get(get_session))
        .route("/api/upload", post(upload_csv))
        .route("/api/mapping", axum::routing::delete(reset_mapping))
        .route("/api/mapping/open", post(open_editor))
        .route("/api/mapping/confirm", post(confirm_mapping))
        .route("/api/mapping/cancel", post(cancel_mapping))
        .route("/api/mapping/{field}", put(set_mapping))
        .route("/api/submit", post(submit))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> ServerResult<()> {
    let state = AppState::new(&config).map_err(PipelineError::from)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Fieldmap server running on http://localhost:{}", config.port);
    tracing::info!("Submissions go to {}", config.endpoint);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn view(session: &Session) -> Json<SessionView> {
    Json(SessionView::from(session))
}

fn api_error(status: StatusCode, message: impl Display) -> ApiError {
    (status, Json(error_response(&message.to_string())))
}

/// Error body that also carries the session view after the failed transition.
fn session_error(status: StatusCode, message: impl Display, session: &Session) -> ApiError {
    let mut body = error_response(&message.to_string());
    body["session"] = serde_json::to_value(SessionView::from(session)).unwrap_or_default();
    (status, Json(body))
}

fn import_status(err: &ImportError) -> StatusCode {
    match err {
        ImportError::Upload(_) => StatusCode::BAD_REQUEST,
        ImportError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ImportError::ImportInProgress => StatusCode::CONFLICT,
        ImportError::Encoding(_) | ImportError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fieldmap",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "session": "GET /api/session",
            "upload": "POST /api/upload",
            "mapping": "PUT /api/mapping/{field}",
            "submit": "POST /api/submit",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    view(&*state.session.lock().await)
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
///
/// The session lock is not held while the body is received.
async fn upload_csv(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    state
        .session
        .lock()
        .await
        .begin_import()
        .map_err(|e| api_error(StatusCode::CONFLICT, e))?;

    let decoded = receive_file(&mut multipart, state.max_file_size)
        .await
        .and_then(|bytes| decode_bytes(&bytes));

    let mut session = state.session.lock().await;
    match session.finish_import(decoded).map(|_| ()) {
        Ok(()) => Ok(view(&session)),
        Err(e) => Err(session_error(import_status(&e), &e, &session)),
    }
}

async fn receive_file(multipart: &mut Multipart, limit: u64) -> ImportResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("unknown").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ImportError::Upload(e.to_string()))?;
        check_size(bytes.len() as u64, limit)?;

        log_info(format!("New upload: {} ({} bytes)", file_name, bytes.len()));
        return Ok(bytes.to_vec());
    }

    Err(ImportError::Upload("No file provided".to_string()))
}

async fn set_mapping(
    State(state): State<AppState>,
    Path(field): Path<String>,
    Json(request): Json<MappingRequest>,
) -> ApiResult {
    let mut session = state.session.lock().await;
    match session.set_mapping_named(&field, &request.header).map(|_| ()) {
        Ok(()) => Ok(view(&session)),
        Err(e) => {
            let status = match e {
                MappingError::UnknownField(_) => StatusCode::NOT_FOUND,
                MappingError::UnknownHeader(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            Err(session_error(status, &e, &session))
        }
    }
}

async fn reset_mapping(State(state): State<AppState>) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.reset_mapping();
    view(&session)
}

async fn open_editor(State(state): State<AppState>) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.open_editor();
    view(&session)
}

async fn cancel_mapping(State(state): State<AppState>) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.cancel_mapping();
    view(&session)
}

async fn confirm_mapping(State(state): State<AppState>) -> ApiResult {
    let mut session = state.session.lock().await;
    match session.confirm_mapping().map(|_| ()) {
        Ok(()) => Ok(view(&session)),
        Err(e) => Err(session_error(StatusCode::UNPROCESSABLE_ENTITY, &e, &session)),
    }
}

/// Submit endpoint
///
/// The lock is released while the request is out, so other endpoints keep
/// answering. A second submit in the meantime gets 409.
async fn submit(State(state): State<AppState>) -> ApiResult {
    let ticket = {
        let mut session = state.session.lock().await;
        match session.begin_submit() {
            Ok(ticket) => ticket,
            Err(SubmitError::NoDataToSubmit) => {
                return Err(session_error(StatusCode::UNPROCESSABLE_ENTITY, NO_DATA_MESSAGE, &session));
            }
            Err(e) => return Err(session_error(StatusCode::CONFLICT, &e, &session)),
        }
    };

    // Detached so a client disconnect cannot leave the session in flight
    let outcome = tokio::spawn(send_and_record(state.clone(), ticket))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let session = state.session.lock().await;
    match outcome {
        SubmissionOutcome::Failed(e) => Err(session_error(StatusCode::BAD_GATEWAY, e.detail(), &session)),
        _ => Ok(view(&session)),
    }
}

async fn send_and_record(state: AppState, ticket: SubmitTicket) -> SubmissionOutcome {
    let outcome = state.submitter.submit(&ticket.dataset).await;
    let mut session = state.session.lock().await;
    session.finish_submit(&ticket, outcome).clone()
}
