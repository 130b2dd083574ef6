use crate::commands::giveaway::models::{ActiveGiveaway, Giveaway};
use crate::commands::giveaway::notifier::GiveawayEvent;

/// Platform-neutral message content, turned into an embed by the caller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FormattedMessage {
    pub title: String,
    pub description: String,
    pub footer: Option<String>,
}

pub trait GiveawayFormatter {
    // The message members react to when the giveaway starts.
    fn announcement(&self, giveaway: &Giveaway, duration_label: &str) -> FormattedMessage;
    // Stylized output of the final state in the giveaway channel.
    fn result(&self, event: &GiveawayEvent) -> FormattedMessage;
    // A single line for the log channel.
    fn log_line(&self, event: &GiveawayEvent) -> String;
    // An entry of the active giveaways list.
    fn list_entry(&self, index: usize, active: &ActiveGiveaway, now: i64) -> String;
}
