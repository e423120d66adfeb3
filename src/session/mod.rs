//! View/session state machine for the single page.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::identity::Token;

mod controller;
mod editor;

pub use controller::{Controller, LoginOutcome, RefineError, RefineOutcome, SessionError, SharedController, refine_bio};
pub use editor::{Editor, EditorError, LinkDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Public,
    Login,
    Admin,
}

/// Explicit state/path mapping consulted for location reflection.
pub struct RouteTable;

impl RouteTable {
    const ROUTES: [(ViewState, &'static str); 3] = [
        (ViewState::Public, "/"),
        (ViewState::Login, "/login"),
        (ViewState::Admin, "/admin"),
    ];

    pub fn path_for(state: ViewState) -> &'static str {
        Self::ROUTES
            .iter()
            .find(|(candidate, _)| *candidate == state)
            .map(|(_, path)| *path)
            .unwrap_or("/")
    }

    /// Initial state for a page opened at `path`.
    ///
    /// Any path ending in `/admin` lands on the login form: a fresh page never
    /// starts in admin, whatever the token slot holds.
    pub fn initial_state(path: &str) -> ViewState {
        let trimmed = path.trim_end_matches('/');
        if trimmed.ends_with("/admin") {
            ViewState::Login
        } else {
            ViewState::Public
        }
    }
}

/// Transient per-page session. Never persisted; the gateway owns the durable token slot.
#[derive(Debug)]
pub struct Session {
    view: ViewState,
    token: Option<Token>,
    login_error: Arc<AtomicBool>,
    refiner_open: bool,
    is_generating: bool,
    login_form: LoginForm,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub id: String,
    pub secret: String,
}

impl LoginForm {
    pub fn clear(&mut self) {
        self.id.clear();
        self.secret.clear();
    }
}

// The secret never reaches logs.
impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Session {
    pub fn new(initial: ViewState) -> Self {
        assert!(
            initial != ViewState::Admin,
            "A session cannot start in admin without a token"
        );
        Self {
            view: initial,
            token: None,
            login_error: Arc::new(AtomicBool::new(false)),
            refiner_open: false,
            is_generating: false,
            login_form: LoginForm::default(),
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn location(&self) -> &'static str {
        RouteTable::path_for(self.view)
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn login_error(&self) -> bool {
        self.login_error.load(Ordering::SeqCst)
    }

    pub fn refiner_open(&self) -> bool {
        self.refiner_open
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn login_form(&self) -> &LoginForm {
        &self.login_form
    }

    pub(crate) fn login_form_mut(&mut self) -> &mut LoginForm {
        &mut self.login_form
    }

    pub(crate) fn login_error_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.login_error)
    }

    pub(crate) fn set_login_error(&self, value: bool) {
        self.login_error.store(value, Ordering::SeqCst);
    }

    pub(crate) fn set_refiner_open(&mut self, open: bool) {
        self.refiner_open = open;
    }

    pub(crate) fn set_generating(&mut self, generating: bool) {
        self.is_generating = generating;
    }

    pub(crate) fn show_public(&mut self) {
        self.view = ViewState::Public;
    }

    pub(crate) fn show_login(&mut self) {
        self.view = ViewState::Login;
    }

    /// The only way into admin: a token must be handed over.
    pub(crate) fn establish(&mut self, token: Token) {
        self.token = Some(token);
        self.view = ViewState::Admin;
    }

    pub(crate) fn teardown(&mut self) {
        self.token = None;
        self.view = ViewState::Public;
    }

    pub(crate) fn reset(&mut self, initial: ViewState) {
        assert!(
            initial != ViewState::Admin,
            "A session cannot restart in admin"
        );
        self.view = initial;
        self.token = None;
        self.refiner_open = false;
        self.login_form.clear();
        self.set_login_error(false);
    }

    pub fn holds(&self, token: &Token) -> bool {
        self.view == ViewState::Admin && self.token.as_ref() == Some(token)
    }
}
