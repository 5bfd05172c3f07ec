//! Broadcast filtering.
//!
//! Lines the bridge broadcasts into the game come back as server
//! broadcasts. The echo filter recognises them by the shape of the bridge's
//! own templates so they are not posted to Discord a second time. This is a
//! heuristic: a genuine broadcast that happens to have the same shape is
//! dropped too.

use fancy_regex::Regex;
use tracing::warn;

use crate::config::types::Config;
use crate::game::formatter::placeholder_pattern;

/// A compiled regex pattern with its original template for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

/// Suppresses broadcasts that echo the bridge's own messages.
#[derive(Debug, Clone)]
pub struct EchoFilter {
    patterns: Vec<CompiledPattern>,
    world_save: Regex,
}

impl EchoFilter {
    /// Build patterns from the `chat_to_game` and `chat` templates.
    pub fn new(config: &Config) -> Self {
        let templates = [&config.messages.chat_to_game, &config.messages.chat];

        Self {
            patterns: templates
                .into_iter()
                .filter_map(|template| compile_template(template))
                .collect(),
            world_save: Regex::new(
                r"(?i)^\s*(saving world|world saved|backing up world|world backed up)",
            )
            .unwrap(),
        }
    }

    /// Returns true if `text` looks like one of the bridge's own messages.
    pub fn is_echo(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.regex.is_match(text).unwrap_or_else(|e| {
                warn!("Regex match error for template '{}': {}", p.original, e);
                false
            })
        })
    }

    /// Returns true if `text` is a world save or backup notice.
    pub fn is_world_save(&self, text: &str) -> bool {
        self.world_save.is_match(text).unwrap_or(false)
    }
}

/// Turn a template into an anchored regex: literal text is escaped and each
/// placeholder matches anything.
///
/// Templates with no literal text would match every line and are skipped.
fn compile_template(template: &str) -> Option<CompiledPattern> {
    let mut pattern = String::from("(?s)^");
    let mut literal_len = 0;
    let mut last = 0;

    for found in placeholder_pattern().find_iter(template) {
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to scan template '{}': {}", template, e);
                return None;
            }
        };
        let literal = &template[last..found.start()];
        literal_len += literal.trim().len();
        pattern.push_str(&fancy_regex::escape(literal));
        pattern.push_str(".*?");
        last = found.end();
    }
    let tail = &template[last..];
    literal_len += tail.trim().len();
    pattern.push_str(&fancy_regex::escape(tail));
    pattern.push('$');

    if literal_len == 0 {
        warn!(
            "Template '{}' has no fixed text, echo filtering disabled for it",
            template
        );
        return None;
    }

    match Regex::new(&pattern) {
        Ok(regex) => Some(CompiledPattern {
            original: template.to_string(),
            regex,
        }),
        Err(e) => {
            warn!("Failed to compile echo pattern for '{}': {}", template, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_broadcast_is_echo() {
        let filter = EchoFilter::new(&Config::for_tests());
        assert!(filter.is_echo("<Bob@Discord> hello there"));
        assert!(filter.is_echo("**<Alice>** hi"));
    }

    #[test]
    fn test_regular_broadcast_passes() {
        let filter = EchoFilter::new(&Config::for_tests());
        assert!(!filter.is_echo("The Eye of Cthulhu has awoken!"));
        assert!(!filter.is_echo("Bob@Discord said hi"));
    }

    #[test]
    fn test_template_metacharacters_are_literal() {
        let mut config = Config::for_tests();
        config.messages.chat_to_game = "[D] ($user_name) $message?".to_string();
        let filter = EchoFilter::new(&config);

        assert!(filter.is_echo("[D] (Bob) anyone?"));
        assert!(!filter.is_echo("D Bob anyone"));
    }

    #[test]
    fn test_placeholder_only_template_is_skipped() {
        let mut config = Config::for_tests();
        config.messages.chat_to_game = "$message".to_string();
        config.messages.chat = "$player_name $message".to_string();
        let filter = EchoFilter::new(&config);

        assert!(!filter.is_echo("anything at all"));
    }

    #[test]
    fn test_world_save() {
        let filter = EchoFilter::new(&Config::for_tests());
        assert!(filter.is_world_save("Saving world..."));
        assert!(filter.is_world_save("World saved."));
        assert!(!filter.is_world_save("Alice saved the world"));
    }
}
