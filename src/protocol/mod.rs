//! Wire protocol: message types, value types, validation, and room-code
//! generation.

pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use messages::{ClientMessage, ServerMessage};
pub use types::{
    ClockSnapshot, Color, MoveRecord, ParseTimeControlError, RoomId, SessionId, TimeControl,
    TimeControlTag,
};
