use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::identity::{AuthError, Token, parse_bearer};
use crate::session::{EditorError, RefineError, SessionError};
use crate::state::AppState;

mod admin;
mod bio;
mod session;

pub fn router(state: AppState) -> Router {
    assert!(
        state.start_time.elapsed() < Duration::from_secs(86_400),
        "Application uptime exceeds 24 hours before router creation"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let api_router = Router::new()
        .merge(session::router())
        .merge(bio::router())
        .nest("/admin", admin::router())
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health_live))
        .nest("/api", api_router)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let uptime = state.start_time.elapsed().as_secs();
    assert!(
        uptime <= 31_536_000,
        "Uptime exceeds one year without restart"
    );
    let controller = state.controller.lock().await;
    let response = HealthResponse {
        status: "live",
        uptime_seconds: uptime,
        view: controller.session().location(),
        link_count: controller.links().len(),
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    view: &'static str,
    link_count: usize,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<Token, HttpError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| HttpError::new(StatusCode::UNAUTHORIZED, "Admin token required".to_string()))?
        .to_str()
        .map_err(|_| HttpError::new(StatusCode::UNAUTHORIZED, "Malformed authorization header".to_string()))?;
    parse_bearer(header).map_err(|err| HttpError::new(StatusCode::UNAUTHORIZED, err.to_string()))
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        Self { status, message }
    }
}

impl From<SessionError> for HttpError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidTransition { .. } => {
                HttpError::new(StatusCode::CONFLICT, err.to_string())
            }
            SessionError::Unauthorized => HttpError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            // Both login failure kinds look the same from the outside.
            SessionError::Auth(AuthError::InvalidCredentials)
            | SessionError::Auth(AuthError::BackendUnavailable(_)) => {
                HttpError::new(StatusCode::UNAUTHORIZED, "Login failed".to_string())
            }
            SessionError::Auth(AuthError::Unsupported(_)) => {
                HttpError::new(StatusCode::NOT_IMPLEMENTED, err.to_string())
            }
        }
    }
}

impl From<EditorError> for HttpError {
    fn from(err: EditorError) -> Self {
        let status = match err {
            EditorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EditorError::DuplicateLinkId(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EditorError::UnknownLink(_) => StatusCode::NOT_FOUND,
        };
        HttpError::new(status, err.to_string())
    }
}

impl From<RefineError> for HttpError {
    fn from(err: RefineError) -> Self {
        let status = match err {
            RefineError::EmptyTraits | RefineError::TraitsTooLong => StatusCode::BAD_REQUEST,
            RefineError::AlreadyGenerating | RefineError::NotPublic(_) => StatusCode::CONFLICT,
        };
        HttpError::new(status, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!("HTTP error: {}", self.message);
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}
