pub mod announcement;
pub mod base;

pub use crate::commands::giveaway::formatters::announcement::{
    format_time_remaining, DefaultGiveawayFormatter, JOIN_EMOJI,
};
pub use crate::commands::giveaway::formatters::base::{FormattedMessage, GiveawayFormatter};
