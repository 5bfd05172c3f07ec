//! Bridge between the game host and Discord.
//!
//! ## Module Structure
//!
//! - `channels`: Communication channel structures
//! - `filter`: Echo and world-save detection for broadcasts
//! - `inbound`: Discord -> game relay
//! - `outbound`: Game -> Discord relay
//! - `orchestrator`: Main bridge orchestrator (`Bridge` struct)

pub mod channels;
pub mod filter;
pub mod inbound;
pub mod orchestrator;
pub mod outbound;

pub use channels::ChannelBundle;
pub use orchestrator::{Action, Bridge};
