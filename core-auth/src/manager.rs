//! # Authentication Manager
//!
//! Session orchestrator for the dashboard's e-mail/password sign-in.
//!
//! ## Overview
//!
//! `AuthManager` drives the [`IdentityGateway`], tracks the current session
//! behind a lock, and emits auth events to the application's event bus.
//! There is exactly one operator session at a time; signing in replaces any
//! previous session.
//!
//! Credential failures are surfaced as one generic error with no distinction
//! between "wrong password" and "no such user" - the backend knows, the
//! caller does not.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::AuthManager;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//!
//! let manager = AuthManager::new(gateway, EventBus::default());
//! let session = manager.sign_in("operator@example.com", "secret").await?;
//! assert!(manager.current_session().await.is_some());
//! ```

use crate::error::{AuthError, Result};
use crate::gateway::IdentityGateway;
use crate::types::Session;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Unified authentication manager for the signage dashboard.
pub struct AuthManager {
    /// Identity backend implementation
    gateway: Arc<dyn IdentityGateway>,
    /// Event bus for emitting auth events
    event_bus: EventBus,
    /// Currently active session
    current_session: Arc<RwLock<Option<Session>>>,
    /// Serializes concurrent sign-in attempts
    sign_in_lock: Arc<Mutex<()>>,
}

impl AuthManager {
    /// Creates a new authentication manager.
    pub fn new(gateway: Arc<dyn IdentityGateway>, event_bus: EventBus) -> Self {
        Self {
            gateway,
            event_bus,
            current_session: Arc::new(RwLock::new(None)),
            sign_in_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sign in with an e-mail/password pair.
    ///
    /// Replaces any existing session on success. Concurrent calls are
    /// serialized; the later caller observes the earlier one's outcome
    /// replaced by its own.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for any credential failure
    /// - [`AuthError::GatewayUnavailable`] when the backend cannot be reached
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let _guard = self.sign_in_lock.lock().await;

        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::SigningIn {
                email: email.to_string(),
            }))
            .ok();

        match self.gateway.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Operator signed in");

                self.event_bus
                    .emit(CoreEvent::Auth(AuthEvent::SignedIn {
                        user_id: session.user_id.clone(),
                        email: session.email.clone(),
                    }))
                    .ok();

                let mut current = self.current_session.write().await;
                *current = Some(session.clone());
                Ok(session)
            }
            Err(err) => {
                // The generic message is deliberate; details stay at debug level.
                debug!("Sign-in rejected by gateway: {}", err);
                warn!("Sign-in failed for {}", email);

                self.event_bus
                    .emit(CoreEvent::Auth(AuthEvent::AuthError {
                        message: AuthError::InvalidCredentials.to_string(),
                    }))
                    .ok();

                match err {
                    AuthError::GatewayUnavailable(_) => Err(err),
                    _ => Err(AuthError::InvalidCredentials),
                }
            }
        }
    }

    /// Sign out the current operator, if any.
    pub async fn sign_out(&self) {
        let previous = {
            let mut current = self.current_session.write().await;
            current.take()
        };

        if let Some(session) = previous {
            info!(user_id = %session.user_id, "Operator signed out");
            self.event_bus
                .emit(CoreEvent::Auth(AuthEvent::SignedOut {
                    user_id: session.user_id,
                }))
                .ok();
        }
    }

    /// Returns the current session, if an operator is signed in.
    pub async fn current_session(&self) -> Option<Session> {
        self.current_session.read().await.clone()
    }

    /// Returns the current bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] when no operator is signed in.
    pub async fn id_token(&self) -> Result<String> {
        self.current_session
            .read()
            .await
            .as_ref()
            .map(|s| s.id_token.clone())
            .ok_or(AuthError::NotAuthenticated)
    }
}
