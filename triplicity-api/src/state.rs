use std::sync::Arc;
use triplicity_accounts::AccountService;
use triplicity_booking::BookingFlow;
use triplicity_catalog::CatalogService;
use triplicity_core::notify::NotificationDispatcher;
use triplicity_shared::Masked;
use triplicity_store::RedisClient;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Masked<String>,
    pub expiration: u64,
    /// Lowercased
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn role_for(&self, email: &str) -> &'static str {
        let email = email.to_lowercase();
        if self.admin_emails.iter().any(|admin| *admin == email) {
            "ADMIN"
        } else {
            "CUSTOMER"
        }
    }
}

#[derive(Clone)]
pub struct PaymentSettings {
    /// Handed to the browser alongside each client secret
    pub publishable_key: Option<String>,
    /// `None` disables the webhook endpoint
    pub webhook_secret: Option<Masked<String>>,
    pub webhook_tolerance_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub catalog: CatalogService,
    pub bookings: Arc<BookingFlow>,
    pub notifications: NotificationDispatcher,
    /// Rate limiting is off without Redis
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit_per_minute: i64,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
    pub payment: PaymentSettings,
}
