//! Frame-delimited JSON wire protocol shared between clients, the edge
//! proxy, and the server.
//!
//! Every frame carries a `type` field; unknown frames deserialize to an
//! `Unknown` variant instead of failing, so a connection survives a
//! mismatched client version (see [`messages::ClientFrame`]).

pub mod errors;
pub mod messages;

pub use errors::SerializationError;
pub use messages::{
    ClientFrame, ErrorCode, PlayerSummary, RoomContext, ServerFrame, decode_card, encode_card,
};
