// Conversions between serenity types and the platform-agnostic core types.

use crate::core::moderation::{
    ClientError, InboundMessage, MessageAuthor, RenderedMessage, RichContent,
};
use chrono::{DateTime, TimeZone, Utc};
use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage};
use serenity::http::HttpError;
use serenity::model::channel::{Embed, Message};
use serenity::model::Timestamp;

/// Map an HTTP status to one of the remote failure kinds.
pub fn classify_status(status: u16) -> ClientError {
    match status {
        401 => ClientError::Unauthorized,
        403 => ClientError::Forbidden,
        404 => ClientError::NotFound,
        429 => ClientError::RateLimited,
        500..=599 => ClientError::InternalServerError,
        other => ClientError::Other(format!("unexpected status {}", other)),
    }
}

pub fn classify_error(error: &serenity::Error) -> ClientError {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            classify_status(response.status_code.as_u16())
        }
        other => ClientError::Other(other.to_string()),
    }
}

/// Raw JSON for each embed, in the shape `normalize` parses.
pub fn embed_values(embeds: &[Embed], message_id: u64) -> Vec<serde_json::Value> {
    embeds
        .iter()
        .filter_map(|embed| match serde_json::to_value(embed) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(message_id, "Skipping unserializable embed: {}", e);
                None
            }
        })
        .collect()
}

pub fn inbound_from_serenity(msg: &Message) -> InboundMessage {
    InboundMessage {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|id| id.get()),
        author: MessageAuthor {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            is_bot: msg.author.bot,
            avatar_url: msg.author.avatar_url(),
        },
        text: Some(msg.content.clone()),
        rich_content: embed_values(&msg.embeds, msg.id.get()),
        created_at: to_utc(msg.timestamp),
    }
}

fn to_utc(timestamp: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp.unix_timestamp(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn rich_content_to_embed(content: &RichContent) -> CreateEmbed {
    let mut embed = CreateEmbed::new();

    if let Some(title) = &content.title {
        embed = embed.title(title);
    }
    if let Some(description) = &content.description {
        embed = embed.description(description);
    }
    if let Some(footer) = &content.footer {
        let mut builder = CreateEmbedFooter::new(footer.text.clone().unwrap_or_default());
        if let Some(icon_url) = footer.icon_url.as_deref().filter(|url| !url.is_empty()) {
            builder = builder.icon_url(icon_url);
        }
        embed = embed.footer(builder);
    }
    if let Some(author) = &content.author {
        let mut builder = CreateEmbedAuthor::new(author.name.clone().unwrap_or_default());
        if let Some(icon_url) = author.icon_url.as_deref().filter(|url| !url.is_empty()) {
            builder = builder.icon_url(icon_url);
        }
        embed = embed.author(builder);
    }
    for field in &content.fields {
        embed = embed.field(&field.name, &field.value, field.inline.unwrap_or(true));
    }
    if let Some(timestamp) = content.timestamp.as_deref() {
        match Timestamp::parse(timestamp) {
            Ok(parsed) => embed = embed.timestamp(parsed),
            Err(e) => tracing::debug!("Dropping unparsable embed timestamp {}: {}", timestamp, e),
        }
    }
    if let Some(color) = content.color {
        embed = embed.colour(color);
    }

    embed
}

pub fn to_create_message(content: &RenderedMessage) -> CreateMessage {
    match content {
        RenderedMessage::Text(text) => CreateMessage::new().content(text),
        RenderedMessage::Rich(rich) => CreateMessage::new().embed(rich_content_to_embed(rich)),
    }
}
