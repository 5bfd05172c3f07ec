//! Mention and emote resolution.
//!
//! Game chat uses plain `#channel`, `@name` and `"@name with spaces"`
//! tokens; Discord uses `<#id>`, `<@id>` and `<@&id>`. The resolver
//! converts between the two against a [`MentionDirectory`] snapshot of the
//! relay channel's guild.

use fancy_regex::Regex;
use serenity::cache::Cache;
use serenity::model::id::ChannelId;
use serenity::model::user::User;

/// A named channel or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    pub id: u64,
    pub name: String,
}

/// A guild member, or a user mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedUser {
    pub id: u64,
    /// Nickname, global name or username, whichever is set first.
    pub display_name: String,
    pub username: String,
}

/// Names in the relay channel's guild, sorted by id.
#[derive(Debug, Clone, Default)]
pub struct MentionDirectory {
    pub channels: Vec<Named>,
    pub roles: Vec<Named>,
    pub users: Vec<NamedUser>,
}

impl MentionDirectory {
    /// Snapshot the guild owning `channel_id` from the cache.
    ///
    /// `extra_users` (usually a message's mention list) are added when they
    /// are not guild members in the cache.
    pub fn from_cache(cache: &Cache, channel_id: ChannelId, extra_users: &[User]) -> Self {
        let mut directory = Self::default();

        for guild_id in cache.guilds() {
            if let Some(guild) = cache.guild(guild_id) {
                if !guild.channels.contains_key(&channel_id) {
                    continue;
                }

                directory.channels = guild
                    .channels
                    .iter()
                    .map(|(id, channel)| Named {
                        id: id.get(),
                        name: channel.name.clone(),
                    })
                    .collect();

                directory.roles = guild
                    .roles
                    .iter()
                    .filter(|(_, role)| role.name != "@everyone")
                    .map(|(id, role)| Named {
                        id: id.get(),
                        name: role.name.clone(),
                    })
                    .collect();

                directory.users = guild
                    .members
                    .iter()
                    .map(|(id, member)| NamedUser {
                        id: id.get(),
                        display_name: member.display_name().to_string(),
                        username: member.user.name.clone(),
                    })
                    .collect();
                break;
            }
        }

        for user in extra_users {
            if !directory.users.iter().any(|u| u.id == user.id.get()) {
                directory.users.push(NamedUser {
                    id: user.id.get(),
                    display_name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
                    username: user.name.clone(),
                });
            }
        }

        directory.sort();
        directory
    }

    /// Sort every list by id so lookups are deterministic.
    pub fn sort(&mut self) {
        self.channels.sort_by_key(|c| c.id);
        self.roles.sort_by_key(|r| r.id);
        self.users.sort_by_key(|u| u.id);
    }

    fn channel_by_name(&self, name: &str) -> Option<u64> {
        let name = name.to_lowercase();
        self.channels
            .iter()
            .find(|c| c.name.to_lowercase() == name)
            .map(|c| c.id)
    }

    /// `<@id>` or `<@&id>` for a user or role name.
    ///
    /// Users are tried by display name, then username, then roles.
    fn mention_for(&self, name: &str) -> Option<String> {
        let name = name.to_lowercase();

        if let Some(user) = self
            .users
            .iter()
            .find(|u| u.display_name.to_lowercase() == name)
            .or_else(|| self.users.iter().find(|u| u.username.to_lowercase() == name))
        {
            return Some(format!("<@{}>", user.id));
        }

        self.roles
            .iter()
            .find(|r| r.name.to_lowercase() == name)
            .map(|r| format!("<@&{}>", r.id))
    }

    fn user(&self, id: u64) -> Option<&NamedUser> {
        self.users.iter().find(|u| u.id == id)
    }

    fn role(&self, id: u64) -> Option<&Named> {
        self.roles.iter().find(|r| r.id == id)
    }

    fn channel(&self, id: u64) -> Option<&Named> {
        self.channels.iter().find(|c| c.id == id)
    }
}

/// Mention resolver for game <-> Discord message translation.
#[derive(Debug, Clone)]
pub struct MentionResolver {
    /// Plain `#channel` token.
    channel_tag: Regex,
    /// Quoted tag: "@name with spaces".
    quoted_tag: Regex,
    /// Simple tag: @name.
    simple_tag: Regex,
    /// Discord user mention (<@123> or <@!123>).
    mention_pattern: Regex,
    /// Discord channel mention (<#123>).
    channel_pattern: Regex,
    /// Discord role mention (<@&123>).
    role_pattern: Regex,
    /// Discord custom emote (<:name:id> or <a:name:id>).
    emote_pattern: Regex,
}

impl Default for MentionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MentionResolver {
    pub fn new() -> Self {
        Self {
            channel_tag: Regex::new(r"(?<![<\w])#([\w\-]+)").unwrap(),
            quoted_tag: Regex::new(r#""@(.+?)""#).unwrap(),
            simple_tag: Regex::new(r"(?<![<\w])@([\w\-]+(?:\.[\w\-]+)*)").unwrap(),
            mention_pattern: Regex::new(r"<@!?(\d+)>").unwrap(),
            channel_pattern: Regex::new(r"<#(\d+)>").unwrap(),
            role_pattern: Regex::new(r"<@&(\d+)>").unwrap(),
            emote_pattern: Regex::new(r"<a?:(\w+):\d+>").unwrap(),
        }
    }

    /// Convert plain tags in game chat to Discord mentions.
    ///
    /// Names that match nothing are left as typed.
    pub fn to_mentions(&self, message: &str, directory: &MentionDirectory) -> String {
        let result = self
            .channel_tag
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                match directory.channel_by_name(&caps[1]) {
                    Some(id) => format!("<#{}>", id),
                    None => caps[0].to_string(),
                }
            })
            .to_string();

        let result = self
            .quoted_tag
            .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                directory
                    .mention_for(&caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string();

        self.simple_tag
            .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                directory
                    .mention_for(&caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    /// Convert Discord mentions to plain names for the game.
    pub fn to_names(&self, message: &str, directory: &MentionDirectory) -> String {
        let result = self
            .role_pattern
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                caps[1]
                    .parse::<u64>()
                    .ok()
                    .and_then(|id| directory.role(id))
                    .map(|role| format!("@{}", role.name))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string();

        let result = self
            .mention_pattern
            .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                caps[1]
                    .parse::<u64>()
                    .ok()
                    .and_then(|id| directory.user(id))
                    .map(|user| format!("@{}", user.username))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string();

        self.channel_pattern
            .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                caps[1]
                    .parse::<u64>()
                    .ok()
                    .and_then(|id| directory.channel(id))
                    .map(|channel| format!("#{}", channel.name))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    /// Convert custom emotes to `:name:`.
    pub fn simplify_emotes(&self, message: &str) -> String {
        self.emote_pattern.replace_all(message, ":$1:").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> MentionDirectory {
        let mut directory = MentionDirectory {
            channels: vec![
                Named {
                    id: 20,
                    name: "general".to_string(),
                },
                Named {
                    id: 10,
                    name: "terraria".to_string(),
                },
            ],
            roles: vec![
                Named {
                    id: 30,
                    name: "Admin".to_string(),
                },
                Named {
                    id: 31,
                    name: "Bob".to_string(),
                },
            ],
            users: vec![
                NamedUser {
                    id: 42,
                    display_name: "Bob".to_string(),
                    username: "bob_the_builder".to_string(),
                },
                NamedUser {
                    id: 41,
                    display_name: "Jane Doe".to_string(),
                    username: "jane".to_string(),
                },
            ],
        };
        directory.sort();
        directory
    }

    #[test]
    fn test_to_mentions() {
        let resolver = MentionResolver::new();
        let directory = directory();

        assert_eq!(
            resolver.to_mentions("see #Terraria @admin", &directory),
            "see <#10> <@&30>"
        );
        assert_eq!(
            resolver.to_mentions(r#"hey "@Jane Doe" and @bob_the_builder"#, &directory),
            "hey <@41> and <@42>"
        );
    }

    #[test]
    fn test_users_win_over_roles() {
        let resolver = MentionResolver::new();
        assert_eq!(resolver.to_mentions("@bob", &directory()), "<@42>");
    }

    #[test]
    fn test_unknown_names_untouched() {
        let resolver = MentionResolver::new();
        let directory = directory();
        let text = "mail me at a@b.com, #nowhere @ghost";

        assert_eq!(resolver.to_mentions(text, &directory), text);
    }

    #[test]
    fn test_to_names() {
        let resolver = MentionResolver::new();
        let directory = directory();

        assert_eq!(
            resolver.to_names("<@42> <@!41> <@&30> <#20> <@99>", &directory),
            "@bob_the_builder @jane @Admin #general <@99>"
        );
    }

    #[test]
    fn test_simplify_emotes() {
        let resolver = MentionResolver::new();
        assert_eq!(
            resolver.simplify_emotes("gg <:pog:123> <a:dance:456>"),
            "gg :pog: :dance:"
        );
    }
}
