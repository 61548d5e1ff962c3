pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod mailer;
pub mod redis_repo;
pub mod stripe;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use mailer::SmtpNotifier;
pub use redis_repo::RedisClient;
pub use stripe::StripePaymentAdapter;
pub use user_repo::PgUserRepository;
