use std::sync::Arc;

use poise::Context as PoiseContext;
use serenity::model::id::ChannelId;

use crate::commands::giveaway::coordinator::LifecycleCoordinator;
use crate::commands::giveaway::formatters::{DefaultGiveawayFormatter, GiveawayFormatter};

// User data, which is stored and accessible in all command invocations
pub struct UserData {
    pub coordinator: Arc<LifecycleCoordinator>,
    pub formatter: Box<dyn GiveawayFormatter + Send + Sync>,
    // Used by `/giveaway create` when no channel is given.
    pub default_channel: Option<ChannelId>,
}

impl UserData {
    pub fn new(coordinator: Arc<LifecycleCoordinator>, default_channel: Option<ChannelId>) -> Self {
        UserData {
            coordinator,
            formatter: Box::new(DefaultGiveawayFormatter::new()),
            default_channel,
        }
    }
}

// Generic context available across Poise commands
pub type Context<'a> = PoiseContext<'a, UserData, crate::error::Error>;
