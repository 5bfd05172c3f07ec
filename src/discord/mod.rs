//! Discord bot integration.
//!
//! This module provides the Discord side of the relay: the gateway client,
//! event handling, commands, topic updates and mention resolution.

pub mod client;
pub mod commands;
pub mod handler;
pub mod resolver;
pub mod sink;
pub mod topic;

// Re-export main types for external use
pub use client::{DiscordBotBuilder, DiscordChannels};
