use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::identity::{AuthError, IdentityGateway, Token};
use crate::models::profile::{LinkCollection, Profile, SocialLink};
use crate::refine::{BioRefiner, GenerationError, MAX_TRAITS_LEN, normalize_bio};
use crate::store::{DocumentStore, StoreError};

use super::{Editor, RouteTable, Session, ViewState};

pub type SharedController = Arc<Mutex<Controller>>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} from the {from:?} view")]
    InvalidTransition {
        from: ViewState,
        action: &'static str,
    },
    #[error("admin session required")]
    Unauthorized,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefineError {
    #[error("traits must not be empty")]
    EmptyTraits,
    #[error("traits exceed {MAX_TRAITS_LEN} characters")]
    TraitsTooLong,
    #[error("a bio refinement is already in progress")]
    AlreadyGenerating,
    #[error("bio refinement is only available from the public view, not {0:?}")]
    NotPublic(ViewState),
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: Token,
    pub view: ViewState,
}

/// Result of a finished refinement. `error` carries the failure text when the
/// previous bio was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineOutcome {
    pub bio: String,
    pub applied: bool,
    pub error: Option<String>,
}

/// Owns the session and the in-memory documents for the page.
pub struct Controller {
    session: Session,
    profile: Profile,
    links: LinkCollection,
    documents: DocumentStore,
    gateway: Arc<dyn IdentityGateway>,
    error_reset: Duration,
}

impl Controller {
    /// Loads both documents, falling back to defaults when a stored value is
    /// unreadable, and writes them back once so first runs are seeded.
    pub fn bootstrap(
        documents: DocumentStore,
        gateway: Arc<dyn IdentityGateway>,
        error_reset: Duration,
        initial_path: &str,
    ) -> Result<Self, StoreError> {
        assert!(!error_reset.is_zero(), "Login error reset must be positive");
        let profile = recover_default(documents.load_profile(), "profile")?;
        let links = recover_default(documents.load_links(), "links")?;
        documents.save_profile(&profile)?;
        documents.save_links(&links)?;
        info!(
            "Page documents ready: {} links ({} visible)",
            links.len(),
            links.visible().len()
        );

        Ok(Self {
            session: Session::new(RouteTable::initial_state(initial_path)),
            profile,
            links,
            documents,
            gateway,
            error_reset,
        })
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn links(&self) -> &LinkCollection {
        &self.links
    }

    pub fn public_links(&self) -> Vec<SocialLink> {
        self.links.visible()
    }

    /// A page load at `path`. Clears transient session state; a live admin
    /// session is torn down first, token slot included.
    pub fn open(&mut self, path: &str) -> ViewState {
        let initial = RouteTable::initial_state(path);
        if self.session.view() == ViewState::Admin {
            self.drop_token();
            self.session.teardown();
            info!("Admin session closed by page reload");
        }
        self.session.reset(initial);
        debug!("Page opened at {path:?}, view {:?}", initial);
        initial
    }

    pub fn request_admin_access(&mut self) -> Result<ViewState, SessionError> {
        match self.session.view() {
            ViewState::Public | ViewState::Login => {
                self.session.show_login();
                Ok(ViewState::Login)
            }
            from => Err(SessionError::InvalidTransition {
                from,
                action: "request admin access",
            }),
        }
    }

    /// Footer control: disconnects from admin, otherwise asks for the login form.
    pub fn toggle_uplink(&mut self) -> Result<ViewState, SessionError> {
        if self.session.view() == ViewState::Admin {
            self.disconnect()
        } else {
            self.request_admin_access()
        }
    }

    pub fn abort_login(&mut self) -> Result<ViewState, SessionError> {
        self.expect_view(ViewState::Login, "abort login")?;
        self.session.show_public();
        Ok(ViewState::Public)
    }

    pub async fn login(&mut self, id: &str, secret: &str) -> Result<LoginOutcome, SessionError> {
        self.expect_view(ViewState::Login, "log in")?;
        let form = self.session.login_form_mut();
        form.id = id.to_string();
        form.secret = secret.to_string();

        let verified = self.gateway.verify(id, secret).await;
        let token = match verified.and_then(|token| {
            self.gateway.set_token(Some(&token))?;
            Ok(token)
        }) {
            Ok(token) => token,
            Err(err) => {
                match &err {
                    AuthError::InvalidCredentials => info!("Login rejected: invalid credentials"),
                    other => warn!("Login failed: {other}"),
                }
                self.flag_login_error();
                return Err(SessionError::Auth(err));
            }
        };

        self.session.establish(token.clone());
        self.session.login_form_mut().clear();
        self.session.set_login_error(false);
        info!("Admin session established");
        Ok(LoginOutcome {
            token,
            view: ViewState::Admin,
        })
    }

    /// Best-effort sign-out. The view always returns to public and the token is
    /// always dropped; backend failures are only logged.
    pub async fn sign_out(&mut self) -> Result<ViewState, SessionError> {
        self.expect_view(ViewState::Admin, "sign out")?;
        if let Err(err) = self.gateway.sign_out().await {
            warn!("Sign-out failed, leaving admin anyway: {err}");
        }
        self.drop_token();
        self.session.teardown();
        info!("Admin signed out");
        Ok(ViewState::Public)
    }

    pub fn disconnect(&mut self) -> Result<ViewState, SessionError> {
        self.expect_view(ViewState::Admin, "disconnect")?;
        self.drop_token();
        self.session.teardown();
        info!("Admin disconnected");
        Ok(ViewState::Public)
    }

    /// Editor bound to the live documents; only for the current admin token.
    pub fn editor(&mut self, token: &Token) -> Result<Editor<'_>, SessionError> {
        if !self.session.holds(token) {
            return Err(SessionError::Unauthorized);
        }
        Ok(Editor::new(
            &mut self.profile,
            &mut self.links,
            &self.documents,
        ))
    }

    pub async fn change_password(
        &mut self,
        token: &Token,
        new_secret: &str,
    ) -> Result<(), SessionError> {
        if !self.session.holds(token) {
            return Err(SessionError::Unauthorized);
        }
        self.gateway.change_password(new_secret).await?;
        Ok(())
    }

    pub fn toggle_refiner(&mut self) -> Result<bool, RefineError> {
        self.expect_public()?;
        let open = !self.session.refiner_open();
        self.session.set_refiner_open(open);
        Ok(open)
    }

    /// Validates traits and marks a refinement as in flight. Returns the trimmed traits.
    pub fn begin_refinement(&mut self, traits: &str) -> Result<String, RefineError> {
        self.expect_public()?;
        let trimmed = traits.trim();
        if trimmed.is_empty() {
            return Err(RefineError::EmptyTraits);
        }
        if trimmed.chars().count() > MAX_TRAITS_LEN {
            return Err(RefineError::TraitsTooLong);
        }
        if self.session.is_generating() {
            return Err(RefineError::AlreadyGenerating);
        }
        self.session.set_generating(true);
        Ok(trimmed.to_string())
    }

    /// Merges a refinement result. Always clears the in-flight flag and closes
    /// the refiner panel; a failure keeps the previous bio.
    pub fn finish_refinement(&mut self, result: Result<String, GenerationError>) -> RefineOutcome {
        self.session.set_generating(false);
        self.session.set_refiner_open(false);

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Bio refinement failed, keeping previous bio: {err}");
                return self.kept_bio(err.to_string());
            }
        };

        let bio = normalize_bio(&raw);
        if bio.is_empty() {
            warn!("Bio refinement produced only whitespace, keeping previous bio");
            return self.kept_bio(GenerationError::EmptyResponse.to_string());
        }

        let updated = self.profile.with_bio(bio);
        if let Err(err) = self.documents.save_profile(&updated) {
            error!("Failed to persist refined bio: {err}");
            return self.kept_bio(err.to_string());
        }
        self.profile = updated;
        info!("Bio refined ({} chars)", self.profile.bio.chars().count());
        RefineOutcome {
            bio: self.profile.bio.clone(),
            applied: true,
            error: None,
        }
    }

    fn kept_bio(&self, error: String) -> RefineOutcome {
        RefineOutcome {
            bio: self.profile.bio.clone(),
            applied: false,
            error: Some(error),
        }
    }

    fn expect_view(&self, expected: ViewState, action: &'static str) -> Result<(), SessionError> {
        let from = self.session.view();
        if from != expected {
            return Err(SessionError::InvalidTransition { from, action });
        }
        Ok(())
    }

    fn expect_public(&self) -> Result<(), RefineError> {
        match self.session.view() {
            ViewState::Public => Ok(()),
            other => Err(RefineError::NotPublic(other)),
        }
    }

    fn drop_token(&self) {
        if let Err(err) = self.gateway.set_token(None) {
            warn!("Failed to clear stored admin token: {err}");
        }
    }

    /// Raises the login error flag and schedules its reset. Overlapping resets
    /// all write `false`, so they never need cancelling.
    fn flag_login_error(&self) {
        self.session.set_login_error(true);
        let flag = self.session.login_error_flag();
        let delay = self.error_reset;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(false, std::sync::atomic::Ordering::SeqCst);
        });
    }
}

/// Runs one refinement against `refiner` and merges the result.
///
/// The call runs on its own task: if the caller goes away, the result still
/// lands in the profile and the in-flight flag is still released.
pub async fn refine_bio(
    controller: &SharedController,
    refiner: Arc<dyn BioRefiner>,
    traits: &str,
) -> Result<RefineOutcome, RefineError> {
    let traits = controller.lock().await.begin_refinement(traits)?;
    debug!("Bio refinement started");

    let shared = Arc::clone(controller);
    let task = tokio::spawn(async move {
        let result = refiner.refine(&traits).await;
        shared.lock().await.finish_refinement(result)
    });

    match task.await {
        Ok(outcome) => Ok(outcome),
        Err(join_err) => {
            error!("Bio refinement task aborted: {join_err}");
            let outcome = controller
                .lock()
                .await
                .finish_refinement(Err(GenerationError::Request(
                    "refinement task aborted".to_string(),
                )));
            Ok(outcome)
        }
    }
}

fn recover_default<T: Default>(
    loaded: Result<T, StoreError>,
    label: &str,
) -> Result<T, StoreError> {
    match loaded {
        Ok(value) => Ok(value),
        Err(err @ StoreError::Malformed { .. }) => {
            warn!("Stored {label} unreadable, using defaults: {err}");
            Ok(T::default())
        }
        Err(err) => Err(err),
    }
}
