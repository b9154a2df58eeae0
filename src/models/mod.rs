pub mod booking;
pub mod conversation;

pub use booking::{BookingKind, BookingRecord, NewBooking};
pub use conversation::{CollectedFields, ConversationSession, ConversationState};
