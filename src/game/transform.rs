//! Text transforms applied to relayed messages.
//!
//! None of these fail: anything that cannot be converted is passed through
//! unchanged.

use fancy_regex::Regex;

use crate::common::resources::ItemLookup;
use crate::common::types::AttachmentInfo;
use crate::config::types::EmoticonMapping;

/// Longest emoji sequence (in chars) tried when naming stray emoji.
const MAX_EMOJI_CHARS: usize = 10;

/// Emoji presentation selector.
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// BMP characters drawn as emoji without a variation selector.
const EMOJI_PRESENTATION_BMP: &[(char, char)] = &[
    ('\u{231A}', '\u{231B}'),
    ('\u{23E9}', '\u{23EC}'),
    ('\u{23F0}', '\u{23F0}'),
    ('\u{23F3}', '\u{23F3}'),
    ('\u{25FD}', '\u{25FE}'),
    ('\u{2614}', '\u{2615}'),
    ('\u{2648}', '\u{2653}'),
    ('\u{267F}', '\u{267F}'),
    ('\u{2693}', '\u{2693}'),
    ('\u{26A1}', '\u{26A1}'),
    ('\u{26AA}', '\u{26AB}'),
    ('\u{26BD}', '\u{26BE}'),
    ('\u{26C4}', '\u{26C5}'),
    ('\u{26CE}', '\u{26CE}'),
    ('\u{26D4}', '\u{26D4}'),
    ('\u{26EA}', '\u{26EA}'),
    ('\u{26F2}', '\u{26F3}'),
    ('\u{26F5}', '\u{26F5}'),
    ('\u{26FA}', '\u{26FA}'),
    ('\u{26FD}', '\u{26FD}'),
    ('\u{2705}', '\u{2705}'),
    ('\u{270A}', '\u{270B}'),
    ('\u{2728}', '\u{2728}'),
    ('\u{274C}', '\u{274C}'),
    ('\u{274E}', '\u{274E}'),
    ('\u{2753}', '\u{2755}'),
    ('\u{2757}', '\u{2757}'),
    ('\u{2795}', '\u{2797}'),
    ('\u{27B0}', '\u{27B0}'),
    ('\u{27BF}', '\u{27BF}'),
    ('\u{2B1B}', '\u{2B1C}'),
    ('\u{2B50}', '\u{2B50}'),
    ('\u{2B55}', '\u{2B55}'),
];

/// Item tag conversion.
///
/// Chat item tags have the shapes `[i:ID]`, `[i/pP:ID]`, `[i/sS:ID]` and
/// `[i/pP/sS:ID]` where `P` is a prefix id and `S` a stack size.
#[derive(Debug, Clone)]
pub struct TextTransform {
    item_pattern: Regex,
}

impl Default for TextTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTransform {
    pub fn new() -> Self {
        Self {
            item_pattern: Regex::new(r"\[i(?:/p(\d+))?(?:/s(\d+))?:(\d+)\]").unwrap(),
        }
    }

    /// Replace item tags with bold item names.
    ///
    /// `[i/p81/s2:757]` becomes `**[Legendary Terra Blade (2)]**`. Tags for
    /// unknown items are left as written; an unknown prefix is dropped.
    pub fn convert_items(&self, text: &str, items: &dyn ItemLookup) -> String {
        let converted = self
            .item_pattern
            .replace_all(text, |caps: &fancy_regex::Captures| -> String {
                let name = caps[3].parse().ok().and_then(|id| items.item_name(id));
                let Some(name) = name else {
                    return caps[0].to_string();
                };

                let prefix = caps
                    .get(1)
                    .and_then(|p| p.as_str().parse().ok())
                    .and_then(|id| items.prefix_name(id));

                let mut label = match prefix {
                    Some(prefix) => format!("{} {}", prefix, name),
                    None => name.to_string(),
                };
                if let Some(stack) = caps.get(2) {
                    label.push_str(&format!(" ({})", stack.as_str()));
                }

                format!("**[{}]**", label)
            })
            .to_string();

        converted.replace("]****[", "]** **[")
    }
}

/// Replace each configured emoticon with its emoji, in declaration order.
///
/// A `:shortcode:` emoji is resolved to its Unicode form first.
pub fn convert_emoticons(text: &str, emoticons: &[EmoticonMapping]) -> String {
    emoticons
        .iter()
        .filter(|mapping| !mapping.emoticon.is_empty())
        .fold(text.to_string(), |acc, mapping| {
            acc.replace(&mapping.emoticon, &resolve_emoji(&mapping.emoji))
        })
}

/// Reverse of [`convert_emoticons`] for text headed into the game.
///
/// Configured emoji become their emoticons. Any other emoji the game
/// cannot draw becomes its `:shortcode:`.
pub fn emoji_to_emoticons(text: &str, emoticons: &[EmoticonMapping]) -> String {
    let reversed = emoticons
        .iter()
        .filter(|mapping| !mapping.emoji.is_empty())
        .fold(text.to_string(), |acc, mapping| {
            acc.replace(&resolve_emoji(&mapping.emoji), &mapping.emoticon)
        });

    name_stray_emoji(&reversed)
}

fn resolve_emoji(emoji: &str) -> String {
    emoji
        .strip_prefix(':')
        .and_then(|s| s.strip_suffix(':'))
        .and_then(emojis::get_by_shortcode)
        .map(|e| e.as_str().to_string())
        .unwrap_or_else(|| emoji.to_string())
}

/// Whether `sequence` renders as an emoji rather than a text symbol.
///
/// Symbols such as `™`, `©` or `↔` only count when followed by U+FE0F.
fn is_emoji_presentation(sequence: &str) -> bool {
    let Some(first) = sequence.chars().next() else {
        return false;
    };

    sequence.contains(VARIATION_SELECTOR)
        || first >= '\u{1F000}'
        || EMOJI_PRESENTATION_BMP
            .iter()
            .any(|(low, high)| (*low..=*high).contains(&first))
}

fn name_stray_emoji(text: &str) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let mut matched = None;

        if !c.is_ascii() {
            let longest = MAX_EMOJI_CHARS.min(chars.len() - i);
            for len in (1..=longest).rev() {
                let end = chars.get(i + len).map(|(pos, _)| *pos).unwrap_or(text.len());
                let sequence = &text[start..end];
                if !is_emoji_presentation(sequence) {
                    continue;
                }
                if let Some(shortcode) = emojis::get(sequence).and_then(|e| e.shortcode()) {
                    matched = Some((len, shortcode));
                    break;
                }
            }
        }

        match matched {
            Some((len, shortcode)) => {
                out.push(':');
                out.push_str(shortcode);
                out.push(':');
                i += len;
            }
            None => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Collapse line breaks into single spaces.
pub fn fix_multiline(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Cut `text` to at most `max_length` chars. `0` means no limit.
pub fn truncate(text: &str, max_length: usize) -> String {
    if max_length == 0 {
        return text.to_string();
    }
    text.chars().take(max_length).collect()
}

/// Append the first attachment as `[filename] url`.
pub fn annotate_attachment(text: &str, attachments: &[AttachmentInfo]) -> String {
    match attachments.first() {
        Some(attachment) => format!("{} [{}] {}", text, attachment.filename, attachment.url)
            .trim()
            .to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::resources::ItemTable;
    use crate::config::types::default_emoticons;

    fn items() -> ItemTable {
        ItemTable::from_entries(
            [
                (189, "Mana Potion".to_string()),
                (757, "Terra Blade".to_string()),
            ],
            [(81, "Legendary".to_string())],
        )
    }

    #[test]
    fn test_item_tag_shapes() {
        let transform = TextTransform::new();
        let items = items();

        assert_eq!(transform.convert_items("[i:189]", &items), "**[Mana Potion]**");
        assert_eq!(
            transform.convert_items("[i/p81:757]", &items),
            "**[Legendary Terra Blade]**"
        );
        assert_eq!(
            transform.convert_items("[i/s5:189]", &items),
            "**[Mana Potion (5)]**"
        );
        assert_eq!(
            transform.convert_items("look [i/p81/s2:757]!", &items),
            "look **[Legendary Terra Blade (2)]**!"
        );
    }

    #[test]
    fn test_unknown_item_and_prefix() {
        let transform = TextTransform::new();
        let items = items();

        assert_eq!(transform.convert_items("[i:1]", &items), "[i:1]");
        assert_eq!(transform.convert_items("[i/p99:189]", &items), "**[Mana Potion]**");
    }

    #[test]
    fn test_adjacent_tags_are_spaced() {
        let transform = TextTransform::new();
        assert_eq!(
            transform.convert_items("[i:189][i:757]", &items()),
            "**[Mana Potion]** **[Terra Blade]**"
        );
    }

    #[test]
    fn test_item_conversion_is_idempotent() {
        let transform = TextTransform::new();
        let items = items();

        for input in ["[i:189][i/p81/s3:757] and [i:1]", "no tags", "[i/s2:189]"] {
            let once = transform.convert_items(input, &items);
            assert_eq!(transform.convert_items(&once, &items), once);
        }
    }

    #[test]
    fn test_convert_emoticons() {
        let mappings = default_emoticons();
        assert_eq!(convert_emoticons("hi :) <3", &mappings), "hi 🙂 ❤️");

        let shortcode = vec![EmoticonMapping::new(":+1", ":thumbsup:")];
        assert_eq!(convert_emoticons("ok :+1", &shortcode), "ok 👍");
    }

    #[test]
    fn test_emoticons_without_matches_are_identity() {
        let mappings = default_emoticons();
        let text = "nothing to see here";
        assert_eq!(convert_emoticons(text, &mappings), text);
        assert_eq!(convert_emoticons(text, &[]), text);
        assert_eq!(emoji_to_emoticons(text, &[]), text);
    }

    #[test]
    fn test_emoji_to_emoticons() {
        let mappings = default_emoticons();
        assert_eq!(emoji_to_emoticons("hi 🙂", &mappings), "hi :)");
        assert_eq!(emoji_to_emoticons("go 🚀", &mappings), "go :rocket:");
        assert_eq!(emoji_to_emoticons("on ⚡ now", &mappings), "on :zap: now");
    }

    #[test]
    fn test_text_symbols_are_not_named() {
        let mappings = default_emoticons();
        for text in ["Café ™ 2024", "Copyright © me", "arrows ↔ ok", "‼ wow", "5 × 3 ≠ 16"] {
            assert_eq!(emoji_to_emoticons(text, &mappings), text);
        }

        assert_eq!(
            emoji_to_emoticons("Copyright \u{00A9}\u{FE0F} me", &mappings),
            "Copyright :copyright: me"
        );
    }

    #[test]
    fn test_fix_multiline() {
        assert_eq!(fix_multiline("a\r\nb\nc\rd"), "a b c d");
        let once = fix_multiline("x\n\ny");
        assert_eq!(once, "x  y");
        assert_eq!(fix_multiline(&once), once);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 0), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("héllo wörld", 4), "héll");
        for max in 0..8 {
            assert!(truncate("abcdef", max).chars().count() <= 6);
        }
    }

    #[test]
    fn test_annotate_attachment() {
        let attachments = vec![
            AttachmentInfo {
                filename: "shot.png".to_string(),
                url: "https://cdn.example/shot.png".to_string(),
            },
            AttachmentInfo {
                filename: "ignored.png".to_string(),
                url: "https://cdn.example/ignored.png".to_string(),
            },
        ];

        assert_eq!(
            annotate_attachment("look", &attachments),
            "look [shot.png] https://cdn.example/shot.png"
        );
        assert_eq!(
            annotate_attachment("", &attachments),
            "[shot.png] https://cdn.example/shot.png"
        );
        assert_eq!(annotate_attachment("plain", &[]), "plain");
    }
}
