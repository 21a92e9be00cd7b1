//! Session authentication behind a narrow validator interface.
//!
//! The dispatcher calls the validator with the handshake token under a short
//! deadline; an unreachable validator is resolved by the configured
//! fail-open/fail-closed policy.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Hard ceiling on token size; larger handshakes are closed outright.
pub const MAX_TOKEN_LEN: usize = 4096;
/// Budget for one validator round trip.
pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("validator unavailable")]
    Unavailable,
}

/// Identity attached to a validated session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthIdentity {
    pub bot_id: Option<String>,
    pub owner_id: Option<String>,
}

#[async_trait]
pub trait AuthValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<AuthIdentity, AuthError>;
}

/// In-memory token table. Small deployments and tests configure tokens
/// directly; anything larger plugs in its own validator.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, AuthIdentity>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, identity: AuthIdentity) {
        self.tokens.insert(token.into(), identity);
    }
}

#[async_trait]
impl AuthValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Outcome of the handshake-time auth step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow(AuthIdentity),
    Deny,
}

/// Run the validator under [`VALIDATE_TIMEOUT`] and fold the result through
/// the fail-open policy. `None` validator means auth is not configured and
/// every token is accepted without identity.
pub async fn check_token(
    validator: Option<&dyn AuthValidator>,
    token: &str,
    fail_open: bool,
) -> AuthDecision {
    if token.len() > MAX_TOKEN_LEN {
        return AuthDecision::Deny;
    }
    let Some(validator) = validator else {
        return AuthDecision::Allow(AuthIdentity::default());
    };
    let result = tokio::time::timeout(VALIDATE_TIMEOUT, validator.validate(token)).await;
    match result {
        Ok(Ok(identity)) => AuthDecision::Allow(identity),
        Ok(Err(AuthError::InvalidToken)) => AuthDecision::Deny,
        Ok(Err(AuthError::Unavailable)) | Err(_) => {
            if fail_open {
                tracing::warn!("auth validator unavailable, admitting session (fail-open)");
                AuthDecision::Allow(AuthIdentity::default())
            } else {
                tracing::warn!("auth validator unavailable, closing session (fail-closed)");
                AuthDecision::Deny
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    #[async_trait]
    impl AuthValidator for Unavailable {
        async fn validate(&self, _token: &str) -> Result<AuthIdentity, AuthError> {
            Err(AuthError::Unavailable)
        }
    }

    struct Hung;

    #[async_trait]
    impl AuthValidator for Hung {
        async fn validate(&self, _token: &str) -> Result<AuthIdentity, AuthError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(AuthIdentity::default())
        }
    }

    #[tokio::test]
    async fn static_table_accepts_known_tokens() {
        let mut v = StaticTokenValidator::new();
        v.insert(
            "tok-1",
            AuthIdentity { bot_id: Some("abc".into()), owner_id: Some("team".into()) },
        );
        let decision = check_token(Some(&v), "tok-1", false).await;
        match decision {
            AuthDecision::Allow(id) => {
                assert_eq!(id.bot_id.as_deref(), Some("abc"));
                assert_eq!(id.owner_id.as_deref(), Some("team"));
            }
            AuthDecision::Deny => panic!("token should be accepted"),
        }
        assert_eq!(check_token(Some(&v), "nope", false).await, AuthDecision::Deny);
    }

    #[tokio::test]
    async fn unavailable_respects_fail_policy() {
        assert_eq!(check_token(Some(&Unavailable), "t", false).await, AuthDecision::Deny);
        assert_eq!(
            check_token(Some(&Unavailable), "t", true).await,
            AuthDecision::Allow(AuthIdentity::default())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_validator_hits_the_deadline() {
        assert_eq!(check_token(Some(&Hung), "t", false).await, AuthDecision::Deny);
    }

    #[tokio::test]
    async fn oversized_token_is_always_denied() {
        let token = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(check_token(None, &token, true).await, AuthDecision::Deny);
    }

    #[tokio::test]
    async fn no_validator_admits_without_identity() {
        assert_eq!(
            check_token(None, "anything", false).await,
            AuthDecision::Allow(AuthIdentity::default())
        );
    }
}
