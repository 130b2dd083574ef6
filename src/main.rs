pub mod commands;
pub mod config;
pub mod error;
pub mod storage;

use std::sync::Arc;

use poise::serenity_prelude::GatewayIntents;
use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::{Reaction, ReactionType};
use serenity::model::gateway::Ready;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::UserData;
use crate::commands::giveaway::coordinator::LifecycleCoordinator;
use crate::commands::giveaway::discord::{restore_entrants, DiscordNotifier};
use crate::commands::giveaway::formatters::JOIN_EMOJI;
use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::{JoinOutcome, Participant};
use crate::commands::giveaway::scheduler::ExpiryScheduler;
use crate::commands::giveaway::store::JsonFileStore;
use crate::commands::giveaway::strategies::UniformDrawStrategy;
use crate::config::BotConfig;
use crate::error::Error;
use crate::storage::GiveawayStorage;

fn is_join_emoji(emoji: &ReactionType) -> bool {
    match emoji {
        ReactionType::Unicode(name) => name == JOIN_EMOJI,
        _ => false,
    }
}

async fn get_coordinator(ctx: &Context) -> Option<Arc<LifecycleCoordinator>> {
    let coordinator = ctx.data.read().await.get::<GiveawayStorage>().cloned();
    if coordinator.is_none() {
        error!("Expected LifecycleCoordinator in ShareMap.");
    }
    coordinator
}

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn reaction_add(&self, ctx: Context, add_reaction: Reaction) {
        if !is_join_emoji(&add_reaction.emoji) {
            return;
        }

        let coordinator = match get_coordinator(&ctx).await {
            Some(coordinator) => coordinator,
            None => return,
        };
        let giveaway_id = add_reaction.message_id.to_string();
        if coordinator.manager().find_active(&giveaway_id).is_none() {
            return;
        }

        // The full user is needed to tell bots apart.
        let user = match add_reaction.user(&ctx).await {
            Ok(user) => user,
            Err(err) => {
                error!("Can't get the user who reacted: {}", err.to_string());
                return;
            }
        };

        match coordinator.join(&giveaway_id, &Participant::from(user.clone())) {
            JoinOutcome::Joined => info!("{} joined the giveaway {}", user.name, giveaway_id),
            JoinOutcome::AlreadyJoined => {
                debug!("{} is already in the giveaway {}", user.name, giveaway_id)
            }
            JoinOutcome::Ineligible => debug!("Ignored the reaction of the bot {}", user.name),
            JoinOutcome::GiveawayNotActive => (),
        }
    }

    async fn reaction_remove(&self, ctx: Context, removed_reaction: Reaction) {
        if !is_join_emoji(&removed_reaction.emoji) {
            return;
        }

        let user_id = match removed_reaction.user_id {
            Some(user_id) => user_id.to_string(),
            None => return,
        };
        let coordinator = match get_coordinator(&ctx).await {
            Some(coordinator) => coordinator,
            None => return,
        };

        let giveaway_id = removed_reaction.message_id.to_string();
        if coordinator.leave(&giveaway_id, &user_id) {
            info!("{} left the giveaway {}", user_id, giveaway_id);
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return;
        }
    };

    let http = Arc::new(Http::new(&config.token));
    let store = JsonFileStore::new(&config.store_path);
    let manager = Arc::new(GiveawayManager::new(Box::new(store)));
    let notifier = Arc::new(DiscordNotifier::new(http.clone(), config.log_channel));
    let coordinator = Arc::new(LifecycleCoordinator::new(
        manager,
        Box::new(UniformDrawStrategy::new()),
        notifier,
        config.engine_config(),
    ));
    let scheduler = ExpiryScheduler::new(coordinator.clone(), config.sweep_interval);

    let user_data_coordinator = coordinator.clone();
    let default_channel = config.default_channel;
    let framework = poise::Framework::<UserData, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::giveaway::giveaway(), commands::help::help()],
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(UserData::new(user_data_coordinator, default_channel))
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged();
    let mut client = match Client::builder(&config.token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!("Cannot create a Discord client: {:?}", err);
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<GiveawayStorage>(coordinator.clone());
    }

    // Reactions added while the bot was offline never reach the handler.
    restore_entrants(&http, coordinator.manager()).await;
    scheduler.start();
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
    scheduler.stop().await;
    coordinator.manager().flush();
}
