use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

/// One-time code mailed to a user to confirm ownership of their email address.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailVerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl EmailVerificationCode {
    pub fn generate(user_id: Uuid, ttl: Duration) -> Self {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            code,
            created_at: now,
            expires_at: now + ttl,
            is_used: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// A code redeems only if it is unused, unexpired and matches exactly.
    pub fn redeems(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired(now) && self.code == candidate.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..50 {
            let code = EmailVerificationCode::generate(Uuid::new_v4(), Duration::minutes(10));
            assert_eq!(code.code.len(), 6);
            assert!(code.code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_redeems() {
        let code = EmailVerificationCode::generate(Uuid::new_v4(), Duration::minutes(10));
        let now = Utc::now();
        assert!(code.redeems(&code.code, now));
        assert!(code.redeems(&format!(" {} ", code.code), now));
        assert!(!code.redeems("abcdef", now));
        assert!(!code.redeems(&code.code, now + Duration::minutes(11)));

        let mut used = code.clone();
        used.is_used = true;
        assert!(!used.redeems(&code.code, now));
    }
}
