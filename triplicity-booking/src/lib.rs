pub mod confirmation;
pub mod error;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod repository;

pub use error::BookingError;
pub use memory::InMemoryBookingRepository;
pub use models::{Booking, BookingStatus, IntentState, NewBooking};
pub use orchestrator::{BookingConfig, BookingFlow, InitiatedBooking};
pub use repository::BookingRepository;
