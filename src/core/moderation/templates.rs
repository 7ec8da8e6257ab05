// Template engine for user-facing notifications.
//
// A configured message is either plain text with `$TOKEN` placeholders or a
// rich-content (embed) spec whose text fields carry the same placeholders.
// Substitution is "safe": unknown tokens stay in the output untouched.

use super::moderation_models::InboundMessage;
use super::moderation_options::MessageTemplate;
use super::moderation_service::ModerationError;
use super::ports::{BotUser, ChatClient, GuildInfo};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// `$$` escape, `$NAME` or `${NAME}`.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})")
        .expect("token pattern is a valid regex")
});

/// `icon_url` values that may be templated. Anything else is passed through.
const ICON_PLACEHOLDERS: [&str; 3] = ["$USERAVATAR", "$BOTAVATAR", "$GUILDICON"];

const RICH_KIND: &str = "rich";

// ============================================================================
// RICH CONTENT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichFooter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichAuthor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichField {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

/// Structured message payload (an embed).
///
/// Unknown keys in the source (thumbnails, images, urls) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<RichFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<RichAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RichField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(
        default,
        alias = "colour",
        deserialize_with = "deserialize_colour",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<u32>,
    #[serde(rename = "type", default = "rich_kind", deserialize_with = "deserialize_kind")]
    pub kind: String,
}

fn rich_kind() -> String {
    RICH_KIND.to_string()
}

impl Default for RichContent {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            footer: None,
            author: None,
            fields: Vec::new(),
            timestamp: None,
            color: None,
            kind: rich_kind(),
        }
    }
}

/// Platform payloads send `"type": null` on some embeds.
fn deserialize_kind<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(rich_kind))
}

/// Accepts `65280`, `0x00FF00`, `"0x00FF00"`, `"#00FF00"` or `"65280"`.
fn deserialize_colour<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ColourLiteral {
        Number(u32),
        Text(String),
    }

    match Option::<ColourLiteral>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ColourLiteral::Number(value)) => Ok(Some(value)),
        Some(ColourLiteral::Text(text)) => {
            let trimmed = text.trim();
            let parsed = if let Some(hex) = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .or_else(|| trimmed.strip_prefix('#'))
            {
                u32::from_str_radix(hex, 16)
            } else {
                trimmed.parse::<u32>()
            };
            parsed
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid colour `{}`", text)))
        }
    }
}

impl RichContent {
    /// Flatten into plain text, one line per present section:
    /// title, description, footer text, author name, then each field's
    /// name and value.
    pub fn to_plain_text(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();

        if let Some(title) = &self.title {
            lines.push(title);
        }
        if let Some(description) = &self.description {
            lines.push(description);
        }
        if let Some(text) = self.footer.as_ref().and_then(|f| f.text.as_ref()) {
            lines.push(text);
        }
        if let Some(name) = self.author.as_ref().and_then(|a| a.name.as_ref()) {
            lines.push(name);
        }
        for field in &self.fields {
            lines.push(&field.name);
            lines.push(&field.value);
        }

        lines.join("\n")
    }
}

/// Output of the template engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedMessage {
    Text(String),
    Rich(RichContent),
}

impl From<String> for RenderedMessage {
    fn from(value: String) -> Self {
        RenderedMessage::Text(value)
    }
}

impl From<&str> for RenderedMessage {
    fn from(value: &str) -> Self {
        RenderedMessage::Text(value.to_string())
    }
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

/// Token values for one render call.
#[derive(Debug, Clone)]
pub struct SubstitutionContext {
    values: HashMap<&'static str, String>,
    message_created_at: DateTime<Utc>,
}

impl SubstitutionContext {
    pub fn new(
        message: &InboundMessage,
        bot: &BotUser,
        guild: &GuildInfo,
        warn_count: u32,
        kick_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let author = &message.author;
        let values = HashMap::from([
            ("MENTIONUSER", author.mention()),
            ("USERNAME", author.name.clone()),
            ("USERID", author.id.to_string()),
            ("USERAVATAR", author.avatar_url.clone().unwrap_or_default()),
            ("BOTNAME", bot.name.clone()),
            ("BOTID", bot.id.to_string()),
            ("BOTAVATAR", bot.avatar_url.clone().unwrap_or_default()),
            ("GUILDID", guild.id.to_string()),
            ("GUILDNAME", guild.name.clone()),
            ("GUILDICON", guild.icon_url.clone().unwrap_or_default()),
            (
                "TIMESTAMPNOW",
                now.format("%I:%M:%S %p, %d/%m/%Y").to_string(),
            ),
            ("TIMESTAMPTODAY", now.format("%d/%m/%Y").to_string()),
            ("WARNCOUNT", warn_count.to_string()),
            ("KICKCOUNT", kick_count.to_string()),
        ]);

        Self {
            values,
            message_created_at: message.created_at,
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    /// Replace every known `$TOKEN` / `${TOKEN}` in `text`.
    pub fn substitute(&self, text: &str) -> String {
        TOKEN_PATTERN
            .replace_all(text, |caps: &Captures| {
                if caps.get(1).is_some() {
                    return "$".to_string();
                }
                let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
                match name.and_then(|n| self.get(n)) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn substitute_opt(&self, text: Option<String>) -> Option<String> {
        text.map(|t| self.substitute(&t))
    }

    fn substitute_icon(&self, icon_url: Option<String>) -> Option<String> {
        icon_url.map(|url| {
            if ICON_PLACEHOLDERS.contains(&url.as_str()) {
                self.substitute(&url)
            } else {
                url
            }
        })
    }

    /// Substitute every text field of `spec`.
    pub fn render_rich_content(&self, spec: RichContent) -> RichContent {
        RichContent {
            title: self.substitute_opt(spec.title),
            description: self.substitute_opt(spec.description),
            footer: spec.footer.map(|footer| RichFooter {
                text: self.substitute_opt(footer.text),
                icon_url: self.substitute_icon(footer.icon_url),
            }),
            author: spec.author.map(|author| RichAuthor {
                name: self.substitute_opt(author.name),
                icon_url: self.substitute_icon(author.icon_url),
            }),
            fields: spec
                .fields
                .into_iter()
                .map(|field| RichField {
                    name: self.substitute(&field.name),
                    value: self.substitute(&field.value),
                    inline: Some(field.inline.unwrap_or(true)),
                })
                .collect(),
            timestamp: spec
                .timestamp
                .map(|_| self.message_created_at.to_rfc3339()),
            color: spec.color,
            kind: rich_kind(),
        }
    }

    /// Render a raw configuration string: `{`-prefixed strings are parsed as
    /// a rich-content literal, anything else is plain text.
    ///
    /// Literals are JSON5, so single quotes, bare keys and hex numbers like
    /// `{'colour': 0x00FF00}` are accepted alongside strict JSON.
    pub fn render_input(&self, raw: &str) -> Result<RenderedMessage, ModerationError> {
        if raw.starts_with('{') {
            let spec: RichContent = json5::from_str(raw)
                .map_err(|e| ModerationError::TemplateParse(e.to_string()))?;
            Ok(RenderedMessage::Rich(self.render_rich_content(spec)))
        } else {
            Ok(RenderedMessage::Text(self.substitute(raw)))
        }
    }

    pub fn render_template(
        &self,
        template: &MessageTemplate,
    ) -> Result<RenderedMessage, ModerationError> {
        match template {
            MessageTemplate::Text(raw) => self.render_input(raw),
            MessageTemplate::Rich(value) => {
                let spec: RichContent = serde_json::from_value(value.clone())
                    .map_err(|e| ModerationError::TemplateParse(e.to_string()))?;
                Ok(RenderedMessage::Rich(self.render_rich_content(spec)))
            }
        }
    }
}

/// Resolve guild and bot details for `message` and build its context.
pub async fn build_context<C: ChatClient + ?Sized>(
    client: &C,
    message: &InboundMessage,
    warn_count: u32,
    kick_count: u32,
) -> Result<SubstitutionContext, ModerationError> {
    let guild_id = message.guild_id.ok_or_else(|| {
        ModerationError::RenderContextUnavailable("message was not sent in a guild".to_string())
    })?;

    let guild = client.fetch_guild(guild_id).await.map_err(|e| {
        ModerationError::RenderContextUnavailable(format!("guild {}: {}", guild_id, e))
    })?;

    Ok(SubstitutionContext::new(
        message,
        &client.current_user(),
        &guild,
        warn_count,
        kick_count,
        Utc::now(),
    ))
}

// ============================================================================
// TESTS
// ============================================================================
