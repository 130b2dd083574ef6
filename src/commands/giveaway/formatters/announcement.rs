// Default texts for giveaway announcements, results and logs.
use crate::commands::giveaway::formatters::base::{FormattedMessage, GiveawayFormatter};
use crate::commands::giveaway::models::{
    ActiveGiveaway, Giveaway, MILLIS_PER_HOUR, MILLIS_PER_MINUTE,
};
use crate::commands::giveaway::notifier::GiveawayEvent;

pub const JOIN_EMOJI: &str = "🎉";

// Returns `Xh Ym` / `Ym` until the deadline, or `Ended` once it has passed.
pub fn format_time_remaining(deadline: i64, now: i64) -> String {
    let remaining = deadline - now;
    if remaining <= 0 {
        return "Ended".to_string();
    }

    let hours = remaining / MILLIS_PER_HOUR;
    let minutes = (remaining % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    match hours > 0 {
        true => format!("{}h {}m", hours, minutes),
        false => format!("{}m", minutes),
    }
}

fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

pub struct DefaultGiveawayFormatter;

impl DefaultGiveawayFormatter {
    pub fn new() -> Self {
        DefaultGiveawayFormatter {}
    }

    fn mentions(&self, winners: &[String]) -> String {
        winners
            .iter()
            .map(|winner| mention(winner))
            .collect::<Vec<String>>()
            .join(", ")
    }
}

impl GiveawayFormatter for DefaultGiveawayFormatter {
    fn announcement(&self, giveaway: &Giveaway, duration_label: &str) -> FormattedMessage {
        FormattedMessage {
            title: format!("{} GIVEAWAY!", JOIN_EMOJI),
            description: format!(
                "React with {} to participate!\n\n**Prize:** {}\n**Winners:** {}\n**Duration:** {}\n**Ends:** <t:{}:R>",
                JOIN_EMOJI,
                giveaway.prize(),
                giveaway.winner_count(),
                duration_label,
                giveaway.deadline() / 1000,
            ),
            footer: Some(format!("{} winner(s) | Ends", giveaway.winner_count())),
        }
    }

    fn result(&self, event: &GiveawayEvent) -> FormattedMessage {
        match event {
            GiveawayEvent::Created { giveaway } => FormattedMessage {
                title: format!("{} GIVEAWAY!", JOIN_EMOJI),
                description: format!("**Prize:** {}", giveaway.prize()),
                footer: None,
            },
            GiveawayEvent::Completed {
                giveaway,
                winners,
                participant_count,
            } => FormattedMessage {
                title: format!("{} GIVEAWAY ENDED!", JOIN_EMOJI),
                description: format!(
                    "**Prize:** {}\n\n**Winner(s):** {}",
                    giveaway.prize(),
                    self.mentions(winners)
                ),
                footer: Some(format!("{} participant(s) in total", participant_count)),
            },
            GiveawayEvent::CompletedEmpty { giveaway } => FormattedMessage {
                title: format!("{} GIVEAWAY ENDED!", JOIN_EMOJI),
                description: format!(
                    "**Prize:** {}\n\nNobody took part in the giveaway.",
                    giveaway.prize()
                ),
                footer: None,
            },
            GiveawayEvent::Cancelled { giveaway } => FormattedMessage {
                title: "GIVEAWAY CANCELLED".to_string(),
                description: format!(
                    "**Prize:** {}\n\nThe giveaway was cancelled, no winners were drawn.",
                    giveaway.prize()
                ),
                footer: None,
            },
        }
    }

    fn log_line(&self, event: &GiveawayEvent) -> String {
        match event {
            GiveawayEvent::Created { giveaway } => format!(
                "🎁 **New giveaway created**\nBy: {}\nPrize: {}\nWinners: {}\nEnds: <t:{}:f>",
                mention(giveaway.created_by()),
                giveaway.prize(),
                giveaway.winner_count(),
                giveaway.deadline() / 1000,
            ),
            GiveawayEvent::Completed {
                giveaway,
                winners,
                participant_count,
            } => format!(
                "{} **Giveaway ended**\nPrize: {}\nWinners: {}\nParticipants: {}",
                JOIN_EMOJI,
                giveaway.prize(),
                self.mentions(winners),
                participant_count,
            ),
            GiveawayEvent::CompletedEmpty { giveaway } => format!(
                "{} **Giveaway ended without participants**\nPrize: {}",
                JOIN_EMOJI,
                giveaway.prize(),
            ),
            GiveawayEvent::Cancelled { giveaway } => format!(
                "🚫 **Giveaway cancelled**\nPrize: {}",
                giveaway.prize()
            ),
        }
    }

    fn list_entry(&self, index: usize, active: &ActiveGiveaway, now: i64) -> String {
        format!(
            "{}. {} [id: `{}`, winners: {}, participants: {}, ends in: {}]",
            index,
            active.giveaway.prize(),
            active.giveaway.id(),
            active.giveaway.winner_count(),
            active.participant_count,
            format_time_remaining(active.giveaway.deadline(), now),
        )
    }
}
