//! Credential verification and admin token lifecycle.
//!
//! The controller only talks to [`IdentityGateway`]; the concrete backend can
//! be swapped without touching the view flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::store::KeyValueStore;

mod token;

pub use token::{Token, parse_bearer};

pub const TOKEN_SLOT_KEY: &str = "lumina_admin_token";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("operation not supported by this identity backend: {0}")]
    Unsupported(&'static str),
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn verify(&self, id: &str, secret: &str) -> Result<Token, AuthError>;

    /// Clears any stored token. Callers treat failure as best-effort.
    async fn sign_out(&self) -> Result<(), AuthError>;

    fn is_authenticated(&self) -> bool;

    fn set_token(&self, token: Option<&Token>) -> Result<(), AuthError>;

    async fn change_password(&self, new_secret: &str) -> Result<(), AuthError>;
}

/// Gateway accepting exactly one configured id/secret pair.
///
/// Stands in for a real identity provider. The pair defaults to
/// `admin`/`admin`, which is a placeholder and not meant for deployment.
pub struct FixedCredentialGateway {
    admin_id: String,
    admin_secret: String,
    latency: Duration,
    slot: Arc<dyn KeyValueStore>,
}

impl FixedCredentialGateway {
    pub fn new(config: &AuthConfig, slot: Arc<dyn KeyValueStore>) -> Self {
        assert!(!config.admin_id.is_empty(), "Admin id must be configured");
        assert!(
            !config.admin_secret.is_empty(),
            "Admin secret must be configured"
        );
        if config.uses_default_credentials() {
            warn!("Identity gateway is using the built-in admin/admin credential");
        }
        Self {
            admin_id: config.admin_id.clone(),
            admin_secret: config.admin_secret.clone(),
            latency: config.simulated_latency(),
            slot,
        }
    }

    async fn simulate_round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl IdentityGateway for FixedCredentialGateway {
    async fn verify(&self, id: &str, secret: &str) -> Result<Token, AuthError> {
        self.simulate_round_trip().await;
        if id == self.admin_id && secret == self.admin_secret {
            debug!("Fixed credential accepted");
            Ok(Token::generate())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.simulate_round_trip().await;
        self.slot
            .remove(TOKEN_SLOT_KEY)
            .map_err(|err| AuthError::BackendUnavailable(err.to_string()))
    }

    fn is_authenticated(&self) -> bool {
        match self.slot.get(TOKEN_SLOT_KEY) {
            Ok(value) => value.is_some_and(|token| !token.is_empty()),
            Err(err) => {
                warn!("Token slot unreadable: {err}");
                false
            }
        }
    }

    fn set_token(&self, token: Option<&Token>) -> Result<(), AuthError> {
        let result = match token {
            Some(token) => self.slot.set(TOKEN_SLOT_KEY, token.as_str()),
            None => self.slot.remove(TOKEN_SLOT_KEY),
        };
        result.map_err(|err| AuthError::BackendUnavailable(err.to_string()))
    }

    async fn change_password(&self, _new_secret: &str) -> Result<(), AuthError> {
        info!("Password change attempted against the fixed credential gateway");
        Err(AuthError::Unsupported("change_password"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn gateway() -> (MemoryStore, FixedCredentialGateway) {
        let slot = MemoryStore::new();
        let gateway = FixedCredentialGateway::new(&AuthConfig::default(), Arc::new(slot.clone()));
        (slot, gateway)
    }

    #[tokio::test]
    async fn default_pair_verifies() {
        let (_, gateway) = gateway();
        let token = gateway.verify("admin", "admin").await.expect("admin/admin accepted");
        assert_eq!(token.as_str().len(), 64);
    }

    #[tokio::test]
    async fn any_other_pair_is_rejected() {
        let (_, gateway) = gateway();
        for (id, secret) in [("admin", "Admin"), ("root", "admin"), ("", ""), ("admin ", "admin")] {
            assert_eq!(
                gateway.verify(id, secret).await.unwrap_err(),
                AuthError::InvalidCredentials,
                "{id:?}/{secret:?} must be rejected"
            );
        }
    }

    #[tokio::test]
    async fn token_slot_lifecycle() {
        let (slot, gateway) = gateway();
        assert!(!gateway.is_authenticated());

        let token = gateway.verify("admin", "admin").await.unwrap();
        gateway.set_token(Some(&token)).unwrap();
        assert!(gateway.is_authenticated());
        assert_eq!(slot.get(TOKEN_SLOT_KEY).unwrap().as_deref(), Some(token.as_str()));

        gateway.sign_out().await.unwrap();
        assert!(!gateway.is_authenticated());

        gateway.set_token(Some(&token)).unwrap();
        gateway.set_token(None).unwrap();
        assert!(!gateway.is_authenticated());
    }

    #[tokio::test]
    async fn configured_pair_replaces_default() {
        let config = AuthConfig {
            admin_id: "owner".to_string(),
            admin_secret: "s3cret".to_string(),
            simulated_latency_ms: 0,
        };
        let gateway = FixedCredentialGateway::new(&config, Arc::new(MemoryStore::new()));
        assert!(gateway.verify("owner", "s3cret").await.is_ok());
        assert!(gateway.verify("admin", "admin").await.is_err());
    }

    #[tokio::test]
    async fn change_password_is_unsupported() {
        let (_, gateway) = gateway();
        assert_eq!(
            gateway.change_password("new").await.unwrap_err(),
            AuthError::Unsupported("change_password")
        );
    }
}
