// Delivers giveaway notifications to Discord channels.
use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage};
use serenity::http::Http;
use serenity::model::Timestamp;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, MessageId, UserId};
use tracing::{info, warn};

use crate::commands::giveaway::formatters::{
    DefaultGiveawayFormatter, FormattedMessage, GiveawayFormatter, JOIN_EMOJI,
};
use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::{Giveaway, Participant};
use crate::commands::giveaway::notifier::{GiveawayEvent, GiveawayNotifier};
use crate::error::{Error, Result};

pub const ANNOUNCEMENT_COLOUR: u32 = 0xFF1493;
pub const COMPLETED_COLOUR: u32 = 0x00FF00;
pub const EMPTY_COLOUR: u32 = 0xFFA500;
pub const CANCELLED_COLOUR: u32 = 0xFF0000;

pub fn build_embed(message: &FormattedMessage, colour: u32) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(&message.title)
        .description(&message.description)
        .colour(colour)
        .timestamp(Timestamp::now());

    match message.footer {
        Some(ref footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

// Channel identifiers are stored as text; `0` or garbage means "no channel".
pub fn parse_channel_id(value: &str) -> Option<ChannelId> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(ChannelId::new(id)),
    }
}

// Discord returns at most 100 reaction users per request.
const REACTION_PAGE_SIZE: u8 = 100;

/// Collects everybody who currently reacts with the join emoji to the
/// giveaway announcement, bots included.
pub async fn fetch_entrants(http: &Http, giveaway: &Giveaway) -> Result<Vec<Participant>> {
    let location = giveaway.location();
    let channel = parse_channel_id(&location.channel_id).ok_or_else(|| {
        Error::Giveaway(format!(
            "The giveaway {} refers to an unknown channel `{}`.",
            giveaway.id(),
            location.channel_id
        ))
    })?;
    let message = match giveaway.id().parse::<u64>() {
        Ok(id) if id != 0 => MessageId::new(id),
        _ => {
            let message = format!("The giveaway {} has no announcement message.", giveaway.id());
            return Err(Error::Giveaway(message));
        }
    };

    let mut entrants = Vec::new();
    let mut after: Option<UserId> = None;
    loop {
        let users = channel
            .reaction_users(
                http,
                message,
                ReactionType::Unicode(JOIN_EMOJI.to_string()),
                Some(REACTION_PAGE_SIZE),
                after,
            )
            .await?;

        let page_size = users.len();
        after = users.last().map(|user| user.id);
        entrants.extend(users.into_iter().map(Participant::from));
        if page_size < REACTION_PAGE_SIZE as usize {
            break;
        }
    }
    Ok(entrants)
}

// Rebuilds participants of every active giveaway from the announcement
// reactions. Giveaways whose reactions can't be read keep what was stored.
pub async fn restore_entrants(http: &Http, manager: &GiveawayManager) {
    for giveaway in manager.list_active() {
        match fetch_entrants(http, &giveaway).await {
            Ok(entrants) => {
                if let Some(count) = manager.restore_participants(giveaway.id(), &entrants) {
                    info!("Restored {} participant(s) of the giveaway {}", count, giveaway.id());
                }
            }
            Err(err) => warn!(
                "Can't restore participants of the giveaway {}: {}",
                giveaway.id(),
                err
            ),
        }
    }
}

pub struct DiscordNotifier {
    http: Arc<Http>,
    log_channel: Option<ChannelId>,
    formatter: Box<dyn GiveawayFormatter + Send + Sync>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>, log_channel: Option<ChannelId>) -> Self {
        DiscordNotifier {
            http,
            log_channel,
            formatter: Box::new(DefaultGiveawayFormatter::new()),
        }
    }

    // Mirrors the line into the log channel when one is configured.
    async fn send_log(&self, line: &str) {
        info!("{}", line);

        if let Some(channel) = self.log_channel {
            if let Err(err) = channel.say(self.http.as_ref(), line).await {
                warn!("Can't send the message to the log channel: {}", err);
            }
        }
    }

    fn colour(event: &GiveawayEvent) -> u32 {
        match event {
            GiveawayEvent::Created { .. } => ANNOUNCEMENT_COLOUR,
            GiveawayEvent::Completed { .. } => COMPLETED_COLOUR,
            GiveawayEvent::CompletedEmpty { .. } => EMPTY_COLOUR,
            GiveawayEvent::Cancelled { .. } => CANCELLED_COLOUR,
        }
    }
}

#[async_trait]
impl GiveawayNotifier for DiscordNotifier {
    async fn notify(&self, event: GiveawayEvent) -> Result<()> {
        let line = self.formatter.log_line(&event);

        // The announcement itself is posted by the create command.
        if let GiveawayEvent::Created { .. } = event {
            self.send_log(&line).await;
            return Ok(());
        }

        let location = event.giveaway().location();
        let channel = parse_channel_id(&location.channel_id).ok_or_else(|| {
            Error::Giveaway(format!(
                "The giveaway {} refers to an unknown channel `{}`.",
                event.giveaway().id(),
                location.channel_id
            ))
        })?;

        let embed = build_embed(&self.formatter.result(&event), Self::colour(&event));
        channel
            .send_message(self.http.as_ref(), CreateMessage::new().embed(embed))
            .await?;
        self.send_log(&line).await;
        Ok(())
    }
}
