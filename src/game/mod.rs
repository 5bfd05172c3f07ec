//! Game host side of the bridge.
//!
//! This module contains:
//! - Template formatting with `$placeholder` substitution
//! - Text transforms (item tags, emoticons, line breaks, truncation)
//! - Hook subscriptions for join/leave/chat/broadcast events
//! - The host link server and the TShock REST client

pub mod formatter;
pub mod hooks;
pub mod link;
pub mod rest;
pub mod transform;

pub use hooks::HookRegistry;
pub use link::HostLink;
pub use rest::RestClient;
