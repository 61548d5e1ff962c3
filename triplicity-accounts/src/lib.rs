pub mod error;
pub mod memory;
pub mod messages;
pub mod password;
pub mod repository;
pub mod service;
pub mod user;
pub mod verification;

pub use error::AccountError;
pub use memory::InMemoryUserRepository;
pub use repository::UserRepository;
pub use service::{AccountService, AccountsConfig, Registration};
pub use user::{NewUser, ProfileUpdate, User};
pub use verification::EmailVerificationCode;
