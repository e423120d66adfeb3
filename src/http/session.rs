use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::models::view::{
    AdminPage, LoginResponse, PublicPage, TransitionResponse, ViewSnapshot,
};
use crate::session::{Controller, RouteTable, SessionError, ViewState};
use crate::state::AppState;

use super::{HttpError, bearer_token};

const MAX_PATH_LEN: usize = 2048;
const MAX_CREDENTIAL_LEN: usize = 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/open", post(open_page))
        .route("/view", get(current_view))
        .route("/view/admin-access", post(request_admin_access))
        .route("/view/uplink", post(toggle_uplink))
        .route("/login", post(login))
        .route("/login/abort", post(abort_login))
        .route("/logout", post(logout))
        .route("/disconnect", post(disconnect))
}

pub(super) fn snapshot(controller: &Controller) -> ViewSnapshot {
    let session = controller.session();
    let view = session.view();
    let public = (view == ViewState::Public).then(|| PublicPage {
        profile: controller.profile().clone(),
        links: controller.public_links(),
        refiner_open: session.refiner_open(),
        is_generating: session.is_generating(),
    });
    let admin = (view == ViewState::Admin).then(|| AdminPage {
        profile: controller.profile().clone(),
        links: controller.links().clone(),
    });
    ViewSnapshot {
        view,
        location: session.location(),
        login_error: session.login_error(),
        public,
        admin,
    }
}

fn transition(view: ViewState) -> Json<TransitionResponse> {
    Json(TransitionResponse {
        view,
        location: RouteTable::path_for(view),
    })
}

/// Leaving admin needs the admin's own token so visitors cannot end the session.
fn authorize_admin(controller: &Controller, headers: &HeaderMap) -> Result<(), HttpError> {
    let token = bearer_token(headers)?;
    if !controller.session().holds(&token) {
        return Err(SessionError::Unauthorized.into());
    }
    Ok(())
}

/// Reloading over a live admin session ends it, so it needs the admin token.
async fn open_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OpenRequest>,
) -> Result<Json<ViewSnapshot>, HttpError> {
    if payload.path.len() > MAX_PATH_LEN {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            format!("Path exceeds {MAX_PATH_LEN} byte limit"),
        ));
    }
    let mut controller = state.controller.lock().await;
    if controller.session().view() == ViewState::Admin {
        authorize_admin(&controller, &headers)?;
    }
    controller.open(&payload.path);
    Ok(Json(snapshot(&controller)))
}

async fn current_view(State(state): State<AppState>) -> Result<Json<ViewSnapshot>, HttpError> {
    let controller = state.controller.lock().await;
    Ok(Json(snapshot(&controller)))
}

async fn request_admin_access(
    State(state): State<AppState>,
) -> Result<Json<TransitionResponse>, HttpError> {
    let view = state.controller.lock().await.request_admin_access()?;
    Ok(transition(view))
}

async fn toggle_uplink(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TransitionResponse>, HttpError> {
    let mut controller = state.controller.lock().await;
    if controller.session().view() == ViewState::Admin {
        authorize_admin(&controller, &headers)?;
    }
    let view = controller.toggle_uplink()?;
    Ok(transition(view))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    if payload.id.len() > MAX_CREDENTIAL_LEN || payload.secret.len() > MAX_CREDENTIAL_LEN {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            "Credentials exceed length limit".to_string(),
        ));
    }
    let outcome = state
        .controller
        .lock()
        .await
        .login(&payload.id, &payload.secret)
        .await?;
    Ok(Json(LoginResponse {
        view: outcome.view,
        location: RouteTable::path_for(outcome.view),
        token: outcome.token.as_str().to_string(),
    }))
}

async fn abort_login(
    State(state): State<AppState>,
) -> Result<Json<TransitionResponse>, HttpError> {
    let view = state.controller.lock().await.abort_login()?;
    Ok(transition(view))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TransitionResponse>, HttpError> {
    let mut controller = state.controller.lock().await;
    authorize_admin(&controller, &headers)?;
    let view = controller.sign_out().await?;
    Ok(transition(view))
}

async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TransitionResponse>, HttpError> {
    let mut controller = state.controller.lock().await;
    authorize_admin(&controller, &headers)?;
    let view = controller.disconnect()?;
    Ok(transition(view))
}

#[derive(Debug, Deserialize)]
struct OpenRequest {
    path: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    id: String,
    secret: String,
}
