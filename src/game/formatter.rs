//! Message formatting for display.
//!
//! Templates carry `$name` placeholders. Game events use `$player_name`,
//! `$group_name` and `$message`; Discord chat uses `$user_name` and
//! `$message`; the channel topic uses `$player_count`, `$player_slots`,
//! `$server_name`, `$uptime` and `$current_time`.
//!
//! Substitution is a single left-to-right pass over the template, so a
//! value that itself contains `$message` is never expanded again.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::Local;
use fancy_regex::Regex;

use crate::common::logging::is_valid_timestamp_format;
use crate::config::types::DEFAULT_TIMESTAMP_FORMAT;

static RE_PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// `$name` placeholder; group 1 is the name.
pub fn placeholder_pattern() -> &'static Regex {
    RE_PLACEHOLDER.get_or_init(|| Regex::new(r"\$([a-z_]+)").unwrap())
}

/// Message formatter that substitutes placeholders in a template.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    template: String,
}

impl MessageFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Fill the template. Unknown placeholders are kept as written.
    pub fn format(&self, ctx: &FormatContext) -> String {
        placeholder_pattern()
            .replace_all(&self.template, |caps: &fancy_regex::Captures| -> String {
                match ctx.get(&caps[1]) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .to_string()
    }

}

/// Placeholder values for one template fill.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    values: Vec<(&'static str, String)>,
}

impl FormatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a game player event.
    pub fn player(player: impl Into<String>) -> Self {
        Self::new().with("player_name", player)
    }

    /// Context for a Discord user's chat line.
    pub fn user(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new()
            .with("user_name", user)
            .with("message", message)
    }

    /// Set a placeholder value.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    pub fn with_group(self, group: impl Into<String>) -> Self {
        self.with("group_name", group)
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with("message", message)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Render an elapsed duration as
/// `D day(s), H hour(s), M minute(s), and S second(s)`.
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    format!(
        "{} day(s), {} hour(s), {} minute(s), and {} second(s)",
        days, hours, minutes, seconds
    )
}

/// Current local time in the given strftime format.
///
/// Falls back to the default format if `format` cannot be rendered.
pub fn current_time(format: &str) -> String {
    let format = if is_valid_timestamp_format(format) {
        format
    } else {
        DEFAULT_TIMESTAMP_FORMAT
    };
    Local::now().format(format).to_string()
}
