use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for secrets and personal data that masks its value in Debug and Display output.
///
/// Serialization passes the real value through; the wrapper only guards against
/// accidental leakage through `tracing` fields and `{:?}` formatting.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Partially redacts an email address for log lines: `jane@example.com` -> `j***@example.com`.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_debug_and_display() {
        let secret = Masked::new("sk_live_123".to_string());
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(format!("{}", secret), "********");
        assert_eq!(secret.expose(), "sk_live_123");
    }

    #[test]
    fn test_masked_round_trips_through_serde() {
        let secret: Masked<String> = serde_json::from_str("\"whsec_abc\"").unwrap();
        assert_eq!(secret.expose(), "whsec_abc");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"whsec_abc\"");
    }

    #[test]
    fn test_redact_email() {
        assert_eq!(redact_email("jane@example.com"), "j***@example.com");
        assert_eq!(redact_email("not-an-email"), "***");
    }
}
