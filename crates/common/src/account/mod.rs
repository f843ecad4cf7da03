//! Login and registration
//!
//! Both operations return the caller's email and a freshly issued token.
//! Failed logins get one message whatever the cause, so the response never
//! reveals whether an email is registered.

use crate::auth::{blocking, verify_absent_account, TokenService};
use crate::dto::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::errors::{AppError, Result};
use crate::identity::{IdentityStore, NewUser, Role};
use crate::metrics;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenService>,
    default_role: Role,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityStore>, tokens: Arc<dyn TokenService>, default_role: Role) -> Self {
        Self {
            identity,
            tokens,
            default_role,
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let Some(user) = self.identity.find_by_email(&request.email).await? else {
            let password = request.password.clone();
            blocking(move || verify_absent_account(&password)).await?;
            warn!("Login rejected: unknown email");
            metrics::record_login(false);
            return Err(AppError::invalid_credentials());
        };

        if !self.identity.check_password(&user, &request.password).await? {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            metrics::record_login(false);
            return Err(AppError::invalid_credentials());
        }

        let token = self.tokens.create_token(&user)?;
        metrics::record_login(true);
        info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            email: user.email,
            token,
        })
    }

    /// Create an account. A taken email is reported before the password is checked.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        if self.identity.find_by_email(&request.email).await?.is_some() {
            warn!("Registration rejected: email already exists");
            metrics::record_registration("duplicate");
            return Err(AppError::DuplicateEmail {
                email: request.email,
            });
        }

        let new_user = NewUser {
            email: request.email,
            password: request.password,
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            phone_number: request.phone_number.filter(|p| !p.trim().is_empty()),
        };
        let created = self
            .identity
            .create_with_role(new_user, self.default_role)
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                let outcome = match e {
                    AppError::DuplicateEmail { .. } => "duplicate",
                    AppError::PasswordPolicy { .. } => "weak_password",
                    _ => "error",
                };
                metrics::record_registration(outcome);
                return Err(e);
            }
        };

        let token = self.tokens.create_token(&user)?;
        metrics::record_registration("created");
        info!(user_id = %user.id, role = %self.default_role, "User registered");

        Ok(AuthResponse {
            email: user.email,
            token,
        })
    }

    /// Profile of an authenticated user
    pub async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.identity.find_by_id(user_id).await?.map(UserProfile::from))
    }
}
