// Entity normalizer - turns an inbound platform message into a `Message`.

use super::moderation_models::{InboundMessage, Message};
use super::moderation_service::ModerationError;
use super::templates::RichContent;

/// Invisible characters spammers use to defeat duplicate detection.
const ZERO_WIDTH_CHARS: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{200E}', '\u{200F}', '\u{FEFF}',
];

pub fn strip_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !ZERO_WIDTH_CHARS.contains(c))
        .collect()
}

/// Build the normalized record for `inbound`.
///
/// Blank text falls back to a flattened rendering of the first rich-content
/// payload. A message with neither, or whose payload doesn't parse, is
/// rejected with `InvalidContent`.
pub fn normalize(
    inbound: &InboundMessage,
    delete_zero_width_chars: bool,
) -> Result<Message, ModerationError> {
    let content = match inbound.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => {
            let payload = inbound.rich_content.first().ok_or_else(|| {
                ModerationError::InvalidContent(format!(
                    "message {} has no text and no rich content",
                    inbound.id
                ))
            })?;

            let embed: RichContent = serde_json::from_value(payload.clone()).map_err(|e| {
                ModerationError::InvalidContent(format!(
                    "message {} has malformed rich content: {}",
                    inbound.id, e
                ))
            })?;

            embed.to_plain_text()
        }
    };

    let content = if delete_zero_width_chars {
        strip_zero_width(&content)
    } else {
        content
    };

    Ok(Message {
        id: inbound.id,
        channel_id: inbound.channel_id,
        guild_id: inbound.guild_id,
        author_id: inbound.author.id,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::test_support::{inbound_message, AUTHOR_ID, MESSAGE_ID};
    use serde_json::json;

    #[test]
    fn test_text_message() {
        let message = normalize(&inbound_message("Hello world!"), true).unwrap();

        assert_eq!(message.content, "Hello world!");
        assert_eq!(message.id, MESSAGE_ID);
        assert_eq!(message.author_id, AUTHOR_ID);
    }

    #[test]
    fn test_blank_without_rich_content_is_invalid() {
        for text in [None, Some("   "), Some("")] {
            let mut inbound = inbound_message("");
            inbound.text = text.map(str::to_string);

            let err = normalize(&inbound, true).unwrap_err();
            assert!(matches!(err, ModerationError::InvalidContent(_)));
        }
    }

    #[test]
    fn test_blank_text_falls_back_to_first_embed() {
        let mut inbound = inbound_message(" ");
        inbound.rich_content = vec![
            json!({
                "title": "Free nitro",
                "description": "click here",
                "footer": {"text": "totally legit"},
                "fields": [{"name": "Step 1", "value": "log in"}]
            }),
            json!({"title": "ignored"}),
        ];

        let message = normalize(&inbound, true).unwrap();

        assert_eq!(
            message.content,
            "Free nitro\nclick here\ntotally legit\nStep 1\nlog in"
        );
    }

    #[test]
    fn test_malformed_embed_is_invalid() {
        let mut inbound = inbound_message("");
        inbound.rich_content = vec![json!("not an embed")];

        let err = normalize(&inbound, true).unwrap_err();
        assert!(matches!(err, ModerationError::InvalidContent(_)));
    }

    #[test]
    fn test_zero_width_chars_stripped_when_enabled() {
        let inbound = inbound_message("s\u{200B}p\u{200D}a\u{FEFF}m");

        assert_eq!(normalize(&inbound, true).unwrap().content, "spam");
        assert_eq!(
            normalize(&inbound, false).unwrap().content,
            "s\u{200B}p\u{200D}a\u{FEFF}m"
        );
    }
}
