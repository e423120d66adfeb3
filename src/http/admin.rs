use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::profile::{LinkCollection, Profile, SocialLink};
use crate::session::LinkDraft;
use crate::state::AppState;

use super::{HttpError, bearer_token};

const MAX_DOCUMENT_LINKS: usize = 256;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", put(update_profile))
        .route("/links", put(replace_links).post(add_link))
        .route("/links/{id}", put(edit_link).delete(remove_link))
        .route("/links/{id}/move", post(move_link))
        .route("/links/{id}/visibility", post(set_visibility))
        .route("/password", post(change_password))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<Profile>,
) -> Result<Json<Profile>, HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let mut editor = controller.editor(&token)?;
    let updated = editor.update_profile(profile)?.clone();
    Ok(Json(updated))
}

async fn replace_links(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(links): Json<LinkCollection>,
) -> Result<Json<LinkCollection>, HttpError> {
    let token = bearer_token(&headers)?;
    if links.len() > MAX_DOCUMENT_LINKS {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            format!("Link collection exceeds {MAX_DOCUMENT_LINKS} entries"),
        ));
    }
    let mut controller = state.controller.lock().await;
    let mut editor = controller.editor(&token)?;
    let updated = editor.update_links(links)?.clone();
    Ok(Json(updated))
}

async fn add_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<LinkDraft>,
) -> Result<(StatusCode, Json<SocialLink>), HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let mut editor = controller.editor(&token)?;
    if editor.links().len() >= MAX_DOCUMENT_LINKS {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            format!("Link collection exceeds {MAX_DOCUMENT_LINKS} entries"),
        ));
    }
    let link = editor.add_link(draft)?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn edit_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(draft): Json<LinkDraft>,
) -> Result<Json<SocialLink>, HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let link = controller.editor(&token)?.edit_link(&id, draft)?;
    Ok(Json(link))
}

async fn remove_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SocialLink>, HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let link = controller.editor(&token)?.remove_link(&id)?;
    Ok(Json(link))
}

async fn move_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let index = controller.editor(&token)?.move_link(&id, payload.to)?;
    Ok(Json(MoveResponse { id, index }))
}

async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<SocialLink>, HttpError> {
    let token = bearer_token(&headers)?;
    let mut controller = state.controller.lock().await;
    let link = controller
        .editor(&token)?
        .set_link_visibility(&id, payload.visible)?;
    Ok(Json(link))
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PasswordRequest>,
) -> Result<StatusCode, HttpError> {
    let token = bearer_token(&headers)?;
    if payload.new_secret.trim().is_empty() {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            "New secret cannot be empty".to_string(),
        ));
    }
    info!("Admin requested a password change");
    state
        .controller
        .lock()
        .await
        .change_password(&token, &payload.new_secret)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    to: usize,
}

#[derive(Debug, Serialize)]
struct MoveResponse {
    id: String,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct VisibilityRequest {
    visible: bool,
}

#[derive(Debug, Deserialize)]
struct PasswordRequest {
    new_secret: String,
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{Value, json};

    use super::super::tests::{call, login, test_app};
    use super::*;

    fn link_ids(view: &Value, section: &str) -> Vec<String> {
        view[section]["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|link| link["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn editing_requires_admin_token() {
        let app = test_app();
        let profile = json!({"name": "N", "username": "U", "bio": "B", "avatar": "A"});
        let (status, _) = call(&app, Method::PUT, "/api/admin/profile", None, Some(profile.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let forged = "ab".repeat(32);
        let (status, _) = call(&app, Method::PUT, "/api/admin/profile", Some(&forged), Some(profile)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_replacement_shows_publicly_after_disconnect() {
        let app = test_app();
        let token = login(&app).await;
        let profile = json!({
            "name": "ADA",
            "username": "ada_l",
            "bio": "analytical engines",
            "avatar": "https://img.example/ada.png"
        });
        let (status, body) = call(&app, Method::PUT, "/api/admin/profile", Some(&token), Some(profile)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bio"], "analytical engines");

        call(&app, Method::POST, "/api/disconnect", Some(&token), None).await;
        let (_, view) = call(&app, Method::GET, "/api/view", None, None).await;
        assert_eq!(view["view"], "public");
        assert_eq!(view["public"]["profile"]["name"], "ADA");
    }

    #[tokio::test]
    async fn link_lifecycle_through_editor() {
        let app = test_app();
        let token = login(&app).await;

        let links = json!([
            {"id": "a", "name": "A", "url": "https://a", "icon": "globe", "color": "#fff", "visible": true},
            {"id": "b", "name": "B", "url": "not a url", "icon": "globe", "color": "#fff", "visible": false}
        ]);
        let (status, _) = call(&app, Method::PUT, "/api/admin/links", Some(&token), Some(links)).await;
        assert_eq!(status, StatusCode::OK);

        let draft = json!({"name": "C", "url": "https://c", "icon": "mail", "color": "#000"});
        let (status, added) = call(&app, Method::POST, "/api/admin/links", Some(&token), Some(draft)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(added["visible"], true);
        let new_id = added["id"].as_str().unwrap().to_string();

        let (status, moved) = call(
            &app,
            Method::POST,
            &format!("/api/admin/links/{new_id}/move"),
            Some(&token),
            Some(json!({"to": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["index"], 0);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/admin/links/b/visibility",
            Some(&token),
            Some(json!({"visible": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, Method::DELETE, "/api/admin/links/a", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, view) = call(&app, Method::GET, "/api/view", None, None).await;
        assert_eq!(link_ids(&view, "admin"), vec![new_id.clone(), "b".to_string()]);

        call(&app, Method::POST, "/api/logout", Some(&token), None).await;
        let (_, view) = call(&app, Method::GET, "/api/view", None, None).await;
        assert_eq!(link_ids(&view, "public"), vec![new_id, "b".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_ids_and_unknown_links_are_rejected() {
        let app = test_app();
        let token = login(&app).await;
        let links = json!([
            {"id": "x", "name": "X", "url": "u", "icon": "i", "color": "c", "visible": true},
            {"id": "x", "name": "Y", "url": "u", "icon": "i", "color": "c", "visible": true}
        ]);
        let (status, _) = call(&app, Method::PUT, "/api/admin/links", Some(&token), Some(links)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, Method::DELETE, "/api/admin/links/missing", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn password_change_is_not_supported() {
        let app = test_app();
        let token = login(&app).await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/admin/password",
            Some(&token),
            Some(json!({"new_secret": "next"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }
}
