pub mod coordinator;
pub mod discord;
pub mod formatters;
pub mod handlers;
pub mod manager;
pub mod models;
pub mod notifier;
pub mod parser;
pub mod participants;
pub mod scheduler;
pub mod store;
pub mod strategies;

pub use crate::commands::giveaway::handlers::{
    cancel_giveaway, create_giveaway, end_giveaway, giveaway, giveaway_stats, list_giveaways,
};
