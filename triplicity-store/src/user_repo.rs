use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use triplicity_accounts::{EmailVerificationCode, NewUser, User, UserRepository};
use triplicity_core::BoxError;
use uuid::Uuid;

use crate::database::unique_violation;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, address, city, \
     state, country, postal_code, date_of_birth, preferred_destinations, travel_interests, \
     budget_range, is_email_verified, created_at, updated_at";

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postal_code: Option<String>,
    date_of_birth: Option<NaiveDate>,
    preferred_destinations: Vec<String>,
    travel_interests: Vec<String>,
    budget_range: Option<String>,
    is_email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            country: row.country,
            postal_code: row.postal_code,
            date_of_birth: row.date_of_birth,
            preferred_destinations: row.preferred_destinations,
            travel_interests: row.travel_interests,
            budget_range: row.budget_range,
            is_email_verified: row.is_email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CodeRow {
    id: Uuid,
    user_id: Uuid,
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_used: bool,
}

impl From<CodeRow> for EmailVerificationCode {
    fn from(row: CodeRow) -> Self {
        EmailVerificationCode {
            id: row.id,
            user_id: row.user_id,
            code: row.code,
            created_at: row.created_at,
            expires_at: row.expires_at,
            is_used: row.is_used,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, BoxError> {
        let user = user.into_user(Uuid::new_v4());
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, is_email_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_email_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &format!("email {}", user.email)))?;

        Ok(row.into())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, BoxError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> Result<(), BoxError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, phone = $4, address = $5, city = $6, state = $7,
                country = $8, postal_code = $9, date_of_birth = $10, preferred_destinations = $11,
                travel_interests = $12, budget_range = $13, is_email_verified = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.country)
        .bind(&user.postal_code)
        .bind(user.date_of_birth)
        .bind(&user.preferred_destinations)
        .bind(&user.travel_interests)
        .bind(&user.budget_range)
        .bind(user.is_email_verified)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("user {} does not exist", user.id).into());
        }
        Ok(())
    }

    async fn save_verification_code(&self, code: &EmailVerificationCode) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO email_verification_codes (id, user_id, code, created_at, expires_at, is_used)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(code.id)
        .bind(code.user_id)
        .bind(&code.code)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.is_used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_verification_code(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EmailVerificationCode>, BoxError> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT id, user_id, code, created_at, expires_at, is_used
            FROM email_verification_codes
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailVerificationCode::from))
    }

    async fn mark_code_used(&self, code_id: Uuid) -> Result<(), BoxError> {
        sqlx::query("UPDATE email_verification_codes SET is_used = TRUE WHERE id = $1")
            .bind(code_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
