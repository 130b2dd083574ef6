use std::future::Future;

use poise::CreateReply;
use serenity::builder::CreateMessage;
use serenity::model::channel::{GuildChannel, ReactionType};
use tracing::{info, warn};

use crate::commands::context::Context;
use crate::commands::giveaway::discord::{build_embed, ANNOUNCEMENT_COLOUR};
use crate::commands::giveaway::formatters::JOIN_EMOJI;
use crate::commands::giveaway::models::{now_millis, Giveaway, LocationRef, NewGiveaway};
use crate::commands::giveaway::parser::parse_duration;
use crate::error::{Error, Result};

async fn reply(ctx: Context<'_>, content: impl Into<String>) -> Result<()> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

// Awaits `step`, running `rollback` only when it fails.
async fn or_rollback<T, S, R>(step: S, rollback: R) -> Result<T>
where
    S: Future<Output = Result<T>>,
    R: Future<Output = ()>,
{
    match step.await {
        Ok(value) => Ok(value),
        Err(err) => {
            rollback.await;
            Err(err)
        }
    }
}

/// Commands for managing giveaways
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands(
        "create_giveaway",
        "list_giveaways",
        "end_giveaway",
        "cancel_giveaway",
        "giveaway_stats"
    ),
    subcommand_required
)]
pub async fn giveaway(_ctx: Context<'_>) -> Result<()> {
    Ok(())
}

/// Start a new giveaway
#[poise::command(slash_command, guild_only, rename = "create")]
pub async fn create_giveaway(
    ctx: Context<'_>,
    #[description = "What the winners get"] prize: String,
    #[description = "How long it runs, e.g. 2h, 90m or 1d12h"] duration: String,
    #[description = "Number of winners"]
    #[min = 1]
    winners: u32,
    #[description = "Channel for the announcement"] channel: Option<GuildChannel>,
) -> Result<()> {
    let data = ctx.data();
    let guild_id = match ctx.guild_id() {
        Some(guild_id) => guild_id,
        None => return reply(ctx, "Giveaways can be started only on a server.").await,
    };

    let parsed = match parse_duration(&duration) {
        Ok(parsed) => parsed,
        Err(err) => return reply(ctx, err.to_string()).await,
    };

    let channel_id = match channel.map(|channel| channel.id).or(data.default_channel) {
        Some(channel_id) => channel_id,
        None => {
            let message = "Pick a channel, there is no default giveaway channel configured.";
            return reply(ctx, message).await;
        }
    };

    let mut request = NewGiveaway {
        id: None,
        prize,
        duration_ms: parsed.millis,
        winner_count: winners,
        location: LocationRef::new(&guild_id.to_string(), &channel_id.to_string()),
        created_by: ctx.author().id.to_string(),
    };
    if let Err(err) = request.validate(data.coordinator.config()) {
        return reply(ctx, err.to_string()).await;
    }

    // The announcement id becomes the giveaway id, so it has to be posted first.
    let preview = Giveaway::new(
        "",
        request.location.clone(),
        request.prize.trim(),
        request.winner_count,
        now_millis() + request.duration_ms,
        &request.created_by,
    );
    let message = data.formatter.announcement(&preview, &parsed.label);
    let announcement = channel_id
        .send_message(
            ctx.http(),
            CreateMessage::new().embed(build_embed(&message, ANNOUNCEMENT_COLOUR)),
        )
        .await?;
    // Either the giveaway is registered or its announcement goes away.
    let register = async {
        let reaction = ReactionType::Unicode(JOIN_EMOJI.to_string());
        match announcement.react(ctx.http(), reaction).await {
            Ok(_) => {
                request.id = Some(announcement.id.to_string());
                data.coordinator.create(request).await
            }
            Err(err) => Err(Error::from(err)),
        }
    };
    let remove_announcement = async {
        if let Err(err) = announcement.delete(ctx.http()).await {
            warn!("Can't remove the orphaned announcement: {}", err);
        }
    };

    match or_rollback(register, remove_announcement).await {
        Ok(giveaway) => {
            info!(
                "Giveaway {} created by {} in the channel {}",
                giveaway.id(),
                ctx.author().name,
                channel_id
            );
            let content = format!(
                "Giveaway created in <#{}>! Its id is `{}`.",
                channel_id,
                giveaway.id()
            );
            reply(ctx, content).await
        }
        Err(err) => reply(ctx, err.to_string()).await,
    }
}

/// Get a list of active giveaways
#[poise::command(slash_command, guild_only, rename = "list")]
pub async fn list_giveaways(ctx: Context<'_>) -> Result<()> {
    let data = ctx.data();
    let guild_id = ctx.guild_id().map(|guild_id| guild_id.to_string());
    let now = now_millis();

    let giveaways = data
        .coordinator
        .list_active()
        .iter()
        .filter(|active| Some(&active.giveaway.location().guild_id) == guild_id.as_ref())
        .enumerate()
        .map(|(index, active)| data.formatter.list_entry(index + 1, active, now))
        .collect::<Vec<String>>();

    let content = match giveaways.len() {
        0 => "There are no active giveaways.".to_string(),
        _ => giveaways.join("\n"),
    };
    reply(ctx, content).await
}

/// End a giveaway right now and draw its winners
#[poise::command(slash_command, guild_only, rename = "end")]
pub async fn end_giveaway(
    ctx: Context<'_>,
    #[description = "Giveaway id"] id: String,
) -> Result<()> {
    let guild_id = ctx.guild_id().map(|guild_id| guild_id.to_string()).unwrap_or_default();
    match ctx.data().coordinator.force_end_in(&guild_id, id.trim()).await {
        Ok(summary) => {
            let content = match summary.has_winners() {
                true => format!(
                    "The giveaway `{}` has ended, {} winner(s) were drawn.",
                    summary.giveaway.id(),
                    summary.winners.len()
                ),
                false => format!(
                    "The giveaway `{}` has ended without participants.",
                    summary.giveaway.id()
                ),
            };
            reply(ctx, content).await
        }
        Err(err) => reply(ctx, err.to_string()).await,
    }
}

/// Cancel a giveaway without drawing winners
#[poise::command(slash_command, guild_only, rename = "cancel")]
pub async fn cancel_giveaway(
    ctx: Context<'_>,
    #[description = "Giveaway id"] id: String,
) -> Result<()> {
    let guild_id = ctx.guild_id().map(|guild_id| guild_id.to_string()).unwrap_or_default();
    match ctx.data().coordinator.cancel_in(&guild_id, id.trim()).await {
        Ok(giveaway) => {
            let content = format!("The giveaway `{}` was cancelled.", giveaway.id());
            reply(ctx, content).await
        }
        Err(err) => reply(ctx, err.to_string()).await,
    }
}

/// Show giveaway statistics
#[poise::command(slash_command, guild_only, rename = "stats")]
pub async fn giveaway_stats(ctx: Context<'_>) -> Result<()> {
    let stats = ctx.data().coordinator.stats();
    let content = format!(
        "**Giveaway statistics**\nCreated: {}\nCompleted: {}\nCancelled: {}\nParticipants: {}",
        stats.total_created, stats.total_completed, stats.total_cancelled, stats.total_participants,
    );
    reply(ctx, content).await
}
