use std::sync::Arc;

use serenity::prelude::TypeMapKey;

use crate::commands::giveaway::coordinator::LifecycleCoordinator;

// Lets the gateway event handler reach the same engine as the slash commands.
pub struct GiveawayStorage;

impl TypeMapKey for GiveawayStorage {
    type Value = Arc<LifecycleCoordinator>;
}
