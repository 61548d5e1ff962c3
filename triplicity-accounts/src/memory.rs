use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use triplicity_core::{BoxError, DuplicateKey};
use uuid::Uuid;

use crate::repository::UserRepository;
use crate::user::{NewUser, User};
use crate::verification::EmailVerificationCode;

/// A thread-safe in-memory account store for development mode and tests.
#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    /// Newest code per user
    codes: Arc<RwLock<HashMap<Uuid, EmailVerificationCode>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, BoxError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DuplicateKey::boxed(format!("email {}", user.email)));
        }
        let user = user.into_user(Uuid::new_v4());
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, BoxError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), BoxError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(format!("user {} does not exist", user.id).into()),
        }
    }

    async fn save_verification_code(&self, code: &EmailVerificationCode) -> Result<(), BoxError> {
        let mut codes = self.codes.write().await;
        match codes.get(&code.user_id) {
            Some(current) if current.created_at > code.created_at => {}
            _ => {
                codes.insert(code.user_id, code.clone());
            }
        }
        Ok(())
    }

    async fn latest_verification_code(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EmailVerificationCode>, BoxError> {
        Ok(self.codes.read().await.get(&user_id).cloned())
    }

    async fn mark_code_used(&self, code_id: Uuid) -> Result<(), BoxError> {
        let mut codes = self.codes.write().await;
        if let Some(code) = codes.values_mut().find(|c| c.id == code_id) {
            code.is_used = true;
        }
        Ok(())
    }
}
