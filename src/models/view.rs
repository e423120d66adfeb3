use serde::Serialize;

use crate::models::profile::{LinkCollection, Profile, SocialLink};
use crate::session::ViewState;

/// What a client needs to render the current state, including the path it
/// should show in its address bar.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub view: ViewState,
    pub location: &'static str,
    pub login_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<PublicPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicPage {
    pub profile: Profile,
    pub links: Vec<SocialLink>,
    pub refiner_open: bool,
    pub is_generating: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminPage {
    pub profile: Profile,
    pub links: LinkCollection,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub view: ViewState,
    pub location: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub view: ViewState,
    pub location: &'static str,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineResponse {
    pub bio: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinerToggleResponse {
    pub refiner_open: bool,
}
