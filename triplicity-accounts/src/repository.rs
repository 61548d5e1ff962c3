use async_trait::async_trait;
use triplicity_core::BoxError;
use uuid::Uuid;

use crate::user::{NewUser, User};
use crate::verification::EmailVerificationCode;

/// Repository trait for user accounts and their verification codes
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, BoxError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, BoxError>;

    async fn update_user(&self, user: &User) -> Result<(), BoxError>;

    async fn save_verification_code(&self, code: &EmailVerificationCode) -> Result<(), BoxError>;

    /// Newest code issued to the user, if any
    async fn latest_verification_code(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EmailVerificationCode>, BoxError>;

    async fn mark_code_used(&self, code_id: Uuid) -> Result<(), BoxError>;
}
