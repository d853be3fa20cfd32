use crate::domain::error::{AppError, Result};
use crate::domain::user::{AuthSession, User};
use crate::infrastructure::db::users::UserRepository;
use crate::infrastructure::security::password::{
    generate_token, hash_password, new_salt, verify_password,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

/// Login body; both fields are checked for presence by the use case
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct AuthUseCase {
    users: Arc<UserRepository>,
}

impl AuthUseCase {
    pub fn new(users: Arc<UserRepository>) -> Self {
        Self { users }
    }

    pub async fn register(&self, mut request: RegisterRequest) -> Result<AuthSession> {
        // A blank email is the same as none
        if request
            .email
            .as_deref()
            .map_or(false, |email| email.trim().is_empty())
        {
            request.email = None;
        }

        request
            .validate()
            .map_err(|e| AppError::ValidationError(validation_message(&e)))?;
        if !USERNAME_PATTERN.is_match(&request.username) {
            return Err(AppError::ValidationError(
                "Username may contain only letters, digits and @/./+/-/_ characters.".to_string(),
            ));
        }

        let salt = new_salt();
        let hash = hash_password(&request.password, &salt);
        let email = request.email.as_deref().unwrap_or("");
        let user = self
            .users
            .insert_user(&request.username, email, &hash, &salt)
            .await?;
        let token = self
            .users
            .get_or_create_token(user.id, &generate_token())
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(AuthSession { user, token })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let (username, password) = match (request.username, request.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
            _ => {
                return Err(AppError::ValidationError(
                    "Please provide both username and password".to_string(),
                ))
            }
        };

        let credentials = self
            .users
            .find_credentials(&username)
            .await?
            .filter(|c| verify_password(&password, &c.password_salt, &c.password_hash))
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let token = self
            .users
            .get_or_create_token(credentials.user.id, &generate_token())
            .await?;

        info!(user_id = credentials.user.id, "User logged in");
        Ok(AuthSession {
            user: credentials.user,
            token,
        })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let removed = self.users.delete_token(token).await?;
        info!(removed, "User logged out");
        Ok(())
    }

    /// The user owning `token`; unknown tokens are rejected
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        self.users
            .find_user_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))
    }
}

/// Flatten field errors into one sentence list, ordered by field name
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("Invalid value for {}.", field),
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
