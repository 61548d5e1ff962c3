use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use triplicity_core::notify::NotificationDispatcher;
use triplicity_shared::pii::redact_email;
use uuid::Uuid;

use crate::error::{AccountError, AccountResult};
use crate::messages;
use crate::password::{hash_password, validate_password, verify_password};
use crate::repository::UserRepository;
use crate::user::{NewUser, ProfileUpdate, User};
use crate::verification::EmailVerificationCode;

const MAX_NAME_LENGTH: usize = 30;

#[derive(Debug, Clone)]
pub struct AccountsConfig {
    pub brand_name: String,
    pub verification_code_ttl: Duration,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            brand_name: "Triplicity".to_string(),
            verification_code_ttl: Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Registration, login and profile management on top of a [`UserRepository`].
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    notifications: NotificationDispatcher,
    config: AccountsConfig,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifications: NotificationDispatcher,
        config: AccountsConfig,
    ) -> Self {
        Self {
            users,
            notifications,
            config,
        }
    }

    pub async fn register(&self, registration: Registration) -> AccountResult<User> {
        // 1. Validate input
        let email = normalize_email(&registration.email)?;
        let first_name = required_name("First name", &registration.first_name)?;
        let last_name = required_name("Last name", &registration.last_name)?;
        validate_password(&registration.password)?;
        if registration.password != registration.password_confirm {
            return Err(AccountError::Validation(
                "The two password fields didn't match.".to_string(),
            ));
        }

        // 2. Email is the login identity
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        // 3. Persist
        let user = self
            .users
            .create_user(NewUser {
                email,
                password_hash: hash_password(&registration.password)?,
                first_name,
                last_name,
            })
            .await?;

        // 4. Welcome mail carries the first verification code
        let code = self.issue_code(user.id).await?;
        self.notifications
            .dispatch(messages::welcome_email(&self.config.brand_name, &user, &code));

        info!("User registered: {} ({})", user.id, redact_email(&user.email));
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AccountResult<User> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> AccountResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(user_id.to_string()))
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> AccountResult<User> {
        let mut user = self.get_user(user_id).await?;

        if let Some(first_name) = &update.first_name {
            required_name("First name", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            required_name("Last name", last_name)?;
        }

        update.apply(&mut user);
        user.first_name = user.first_name.trim().to_string();
        user.last_name = user.last_name.trim().to_string();
        self.users.update_user(&user).await?;
        Ok(user)
    }

    /// Issue a fresh code and mail it.
    pub async fn request_verification(&self, user_id: Uuid) -> AccountResult<()> {
        let user = self.get_user(user_id).await?;
        if user.is_email_verified {
            return Err(AccountError::Validation("Email is already verified".to_string()));
        }

        let code = self.issue_code(user.id).await?;
        self.notifications
            .dispatch(messages::verification_email(&self.config.brand_name, &user, &code));
        Ok(())
    }

    pub async fn verify_email(&self, user_id: Uuid, candidate: &str) -> AccountResult<User> {
        let mut user = self.get_user(user_id).await?;
        if user.is_email_verified {
            return Ok(user);
        }

        let code = self
            .users
            .latest_verification_code(user_id)
            .await?
            .ok_or_else(|| AccountError::Validation("No verification code was issued".to_string()))?;

        if !code.redeems(candidate, Utc::now()) {
            return Err(AccountError::Validation(
                "Invalid or expired verification code".to_string(),
            ));
        }

        self.users.mark_code_used(code.id).await?;
        user.mark_email_verified();
        self.users.update_user(&user).await?;

        info!("Email verified for user {}", user.id);
        Ok(user)
    }

    async fn issue_code(&self, user_id: Uuid) -> AccountResult<EmailVerificationCode> {
        let code = EmailVerificationCode::generate(user_id, self.config.verification_code_ttl);
        self.users.save_verification_code(&code).await?;
        Ok(code)
    }
}

/// Trims and lowercases an address and checks it has the `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> AccountResult<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || AccountError::Validation("Enter a valid email address.".to_string());

    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

fn required_name(field: &str, value: &str) -> AccountResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(AccountError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(value.to_string())
}
