//! Relay channel operations.

use std::sync::Arc;

use serenity::all::{
    ChannelId, Colour, CreateAllowedMentions, CreateEmbed, CreateEmbedFooter, CreateMessage,
    EditChannel, Http, Timestamp,
};
use serenity::async_trait;

use crate::common::error::DiscordResult;
use crate::common::messages::{CommandReply, ReplyTone};

/// Footer shown on command replies.
pub fn footer_text() -> String {
    format!("terralink {}", env!("CARGO_PKG_VERSION"))
}

/// Everything the bridge does to the relay channel.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    async fn say(&self, text: &str) -> DiscordResult<()>;
    async fn set_topic(&self, topic: &str) -> DiscordResult<()>;
    async fn typing(&self) -> DiscordResult<()>;
    async fn embed(&self, reply: &CommandReply) -> DiscordResult<()>;
}

/// Sink backed by the Discord REST API.
#[derive(Clone)]
pub struct HttpSink {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl HttpSink {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

/// User and role mentions ping; @everyone and @here never do.
fn allowed_mentions() -> CreateAllowedMentions {
    CreateAllowedMentions::new().all_users(true).all_roles(true)
}

fn tone_colour(tone: ReplyTone) -> Colour {
    match tone {
        ReplyTone::Info => Colour::BLUE,
        ReplyTone::Success => Colour::DARK_GREEN,
        ReplyTone::Failure => Colour::RED,
    }
}

#[async_trait]
impl ChannelSink for HttpSink {
    async fn say(&self, text: &str) -> DiscordResult<()> {
        let message = CreateMessage::new()
            .content(text)
            .allowed_mentions(allowed_mentions());
        self.channel_id.send_message(&self.http, message).await?;
        Ok(())
    }

    async fn set_topic(&self, topic: &str) -> DiscordResult<()> {
        self.channel_id
            .edit(&self.http, EditChannel::new().topic(topic))
            .await?;
        Ok(())
    }

    async fn typing(&self) -> DiscordResult<()> {
        self.channel_id.broadcast_typing(&self.http).await?;
        Ok(())
    }

    async fn embed(&self, reply: &CommandReply) -> DiscordResult<()> {
        let embed = CreateEmbed::new()
            .title(&reply.title)
            .description(&reply.description)
            .colour(tone_colour(reply.tone))
            .footer(CreateEmbedFooter::new(footer_text()))
            .timestamp(Timestamp::now());

        let message = CreateMessage::new()
            .embed(embed)
            .allowed_mentions(allowed_mentions());
        self.channel_id.send_message(&self.http, message).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// What a [`RecordingSink`] was asked to do.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SinkCall {
        Say(String),
        Topic(String),
        Typing,
        Embed(CommandReply),
    }

    /// Sink that records every call.
    #[derive(Default)]
    pub struct RecordingSink {
        calls: Mutex<Vec<SinkCall>>,
    }

    impl RecordingSink {
        pub fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: SinkCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ChannelSink for RecordingSink {
        async fn say(&self, text: &str) -> DiscordResult<()> {
            self.record(SinkCall::Say(text.to_string()));
            Ok(())
        }

        async fn set_topic(&self, topic: &str) -> DiscordResult<()> {
            self.record(SinkCall::Topic(topic.to_string()));
            Ok(())
        }

        async fn typing(&self) -> DiscordResult<()> {
            self.record(SinkCall::Typing);
            Ok(())
        }

        async fn embed(&self, reply: &CommandReply) -> DiscordResult<()> {
            self.record(SinkCall::Embed(reply.clone()));
            Ok(())
        }
    }
}
