use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serenity::model::user::User as DiscordUser;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_WINNERS: u32 = 20;
pub const DEFAULT_MAX_DURATION_HOURS: u64 = 720;
pub const MILLIS_PER_MINUTE: i64 = 60 * 1000;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Participant {
    user_id: String,
    username: String,
    bot: bool,
}

impl Participant {
    pub fn new(user_id: &str, username: &str) -> Self {
        Participant {
            user_id: user_id.to_string(),
            username: username.to_string(),
            bot: false,
        }
    }

    // Marks the participant as an automated (bot or system) account.
    pub fn with_bot(mut self, bot: bool) -> Self {
        self.bot = bot;
        self
    }

    // Returns a unique identifier in Discord
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    // Returns a username in the Discord room
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_bot(&self) -> bool {
        self.bot
    }
}

impl From<DiscordUser> for Participant {
    fn from(discord_user: DiscordUser) -> Self {
        Participant {
            user_id: discord_user.id.get().to_string(),
            username: discord_user.name,
            bot: discord_user.bot,
        }
    }
}

/// Where the giveaway announcement lives.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    pub guild_id: String,
    pub channel_id: String,
}

impl LocationRef {
    pub fn new(guild_id: &str, channel_id: &str) -> Self {
        LocationRef {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiveawayStatus {
    // Accepting participants until the deadline.
    #[default]
    Active,
    // Winners were drawn (possibly none).
    Completed,
    // Stopped by an operator, nobody wins.
    Cancelled,
}

impl GiveawayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiveawayStatus::Active => "Active",
            GiveawayStatus::Completed => "Completed",
            GiveawayStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != GiveawayStatus::Active
    }
}

/// A single timed drawing. Field names on disk follow the legacy
/// `config.json` layout so older files keep loading.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Giveaway {
    // Announcement message identifier, doubles as the giveaway id.
    #[serde(rename = "message_id")]
    id: String,
    #[serde(flatten)]
    location: LocationRef,
    prize: String,
    #[serde(rename = "winners")]
    winner_count: u32,
    // Epoch milliseconds after which the giveaway can be completed.
    #[serde(rename = "end_time")]
    deadline: i64,
    created_by: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    status: GiveawayStatus,
}

impl Giveaway {
    pub fn new(
        id: &str,
        location: LocationRef,
        prize: &str,
        winner_count: u32,
        deadline: i64,
        created_by: &str,
    ) -> Self {
        Giveaway {
            id: id.to_string(),
            location,
            prize: prize.to_string(),
            winner_count,
            deadline,
            created_by: created_by.to_string(),
            created_at: 0,
            status: GiveawayStatus::Active,
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> &LocationRef {
        &self.location
    }

    pub fn prize(&self) -> &str {
        &self.prize
    }

    pub fn winner_count(&self) -> u32 {
        self.winner_count
    }

    pub fn deadline(&self) -> i64 {
        self.deadline
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn status(&self) -> GiveawayStatus {
        self.status
    }

    // Moves the giveaway into one of the terminal states.
    pub(crate) fn set_status(&mut self, status: GiveawayStatus) {
        self.status = status;
    }

    // Checks that the deadline has passed at the given moment.
    pub fn is_due(&self, now: i64) -> bool {
        self.deadline <= now
    }
}

/// Process-wide counters, only ever incremented.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub total_created: u64,
    pub total_completed: u64,
    pub total_cancelled: u64,
    pub total_participants: u64,
}

/// The single unit of durability: everything the bot has to remember.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreRoot {
    pub giveaways: Vec<Giveaway>,
    pub participants: BTreeMap<String, BTreeSet<String>>,
    pub stats: Stats,
}

impl StoreRoot {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.giveaways.iter().position(|giveaway| giveaway.id() == id)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    GiveawayNotActive,
    // Bots and system accounts can't take part.
    Ineligible,
}

/// Parameters of the create command, before an identifier and a deadline
/// are assigned.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewGiveaway {
    pub id: Option<String>,
    pub prize: String,
    pub duration_ms: i64,
    pub winner_count: u32,
    pub location: LocationRef,
    pub created_by: String,
}

impl NewGiveaway {
    pub fn validate(&self, config: &EngineConfig) -> Result<()> {
        if self.prize.trim().is_empty() {
            let message = "The prize can't be empty.".to_string();
            return Err(Error::Validation(message));
        }

        if self.winner_count == 0 || self.winner_count > config.max_winners {
            let message = format!(
                "The number of winners must be between 1 and {}.",
                config.max_winners
            );
            return Err(Error::Validation(message));
        }

        if self.duration_ms <= 0 || self.duration_ms > config.max_duration_ms {
            let message = format!(
                "The duration must be positive and not longer than {}h.",
                config.max_duration_ms / MILLIS_PER_HOUR
            );
            return Err(Error::Validation(message));
        }

        Ok(())
    }
}

/// Limits applied to every new giveaway.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    pub max_duration_ms: i64,
    pub max_winners: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_duration_ms: DEFAULT_MAX_DURATION_HOURS as i64 * MILLIS_PER_HOUR,
            max_winners: DEFAULT_MAX_WINNERS,
        }
    }
}

/// The outcome of a completed giveaway.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Summary {
    pub giveaway: Giveaway,
    pub winners: Vec<String>,
    pub participant_count: usize,
}

impl Summary {
    pub fn has_winners(&self) -> bool {
        !self.winners.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActiveGiveaway {
    pub giveaway: Giveaway,
    pub participant_count: usize,
}

#[cfg(test)]
mod tests {
    use serenity::model::id::UserId;
    use serenity::model::user::{CurrentUser, User as DiscordUser};

    use crate::commands::giveaway::models::{
        EngineConfig, Giveaway, GiveawayStatus, LocationRef, NewGiveaway, Participant, StoreRoot,
        MILLIS_PER_HOUR,
    };
    use crate::error::Error;

    fn get_user(user_id: u64, username: &str, bot: bool) -> DiscordUser {
        let mut current_user = CurrentUser::default();
        current_user.id = UserId::new(user_id);
        current_user.name = username.to_owned();
        current_user.bot = bot;
        DiscordUser::from(current_user)
    }

    fn get_request() -> NewGiveaway {
        NewGiveaway {
            id: None,
            prize: "50".to_string(),
            duration_ms: MILLIS_PER_HOUR,
            winner_count: 1,
            location: LocationRef::new("1", "2"),
            created_by: "3".to_string(),
        }
    }

    #[test]
    fn test_participant_from_discord_user() {
        let participant = Participant::from(get_user(7, "Test", false));

        assert_eq!(participant.user_id(), "7");
        assert_eq!(participant.username(), "Test");
        assert_eq!(participant.is_bot(), false);
    }

    #[test]
    fn test_participant_from_discord_bot() {
        let participant = Participant::from(get_user(8, "Robot", true));
        assert_eq!(participant.is_bot(), true);
    }

    #[test]
    fn test_giveaway_is_due_at_deadline() {
        let giveaway = Giveaway::new("1", LocationRef::default(), "50", 1, 1_000, "2");

        assert_eq!(giveaway.is_due(999), false);
        assert_eq!(giveaway.is_due(1_000), true);
        assert_eq!(giveaway.is_due(1_001), true);
    }

    #[test]
    fn test_load_legacy_record_without_status() {
        let raw = r#"{
            "giveaways": [{
                "message_id": "100",
                "channel_id": "200",
                "guild_id": "300",
                "prize": "50",
                "winners": 2,
                "end_time": 1700000000000,
                "created_by": "400"
            }]
        }"#;
        let root: StoreRoot = serde_json::from_str(raw).unwrap();

        assert_eq!(root.giveaways.len(), 1);
        let giveaway = &root.giveaways[0];
        assert_eq!(giveaway.id(), "100");
        assert_eq!(giveaway.location(), &LocationRef::new("300", "200"));
        assert_eq!(giveaway.winner_count(), 2);
        assert_eq!(giveaway.deadline(), 1_700_000_000_000);
        assert_eq!(giveaway.status(), GiveawayStatus::Active);
        assert_eq!(root.participants.is_empty(), true);
        assert_eq!(root.stats.total_created, 0);
    }

    #[test]
    fn test_status_is_terminal() {
        assert_eq!(GiveawayStatus::Active.is_terminal(), false);
        assert_eq!(GiveawayStatus::Completed.is_terminal(), true);
        assert_eq!(GiveawayStatus::Cancelled.is_terminal(), true);
    }

    #[test]
    fn test_validate_new_giveaway() {
        assert_eq!(get_request().validate(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn test_get_error_for_empty_prize() {
        let mut request = get_request();
        request.prize = "   ".to_string();

        let result = request.validate(&EngineConfig::default());
        assert_eq!(
            result.unwrap_err(),
            Error::Validation("The prize can't be empty.".to_string())
        );
    }

    #[test]
    fn test_get_error_for_too_many_winners() {
        let mut request = get_request();
        request.winner_count = 21;

        let result = request.validate(&EngineConfig::default());
        assert_eq!(
            result.unwrap_err(),
            Error::Validation("The number of winners must be between 1 and 20.".to_string())
        );
    }

    #[test]
    fn test_get_error_for_duration_above_ceiling() {
        let mut request = get_request();
        request.duration_ms = 721 * MILLIS_PER_HOUR;

        let result = request.validate(&EngineConfig::default());
        assert_eq!(
            result.unwrap_err(),
            Error::Validation(
                "The duration must be positive and not longer than 720h.".to_string()
            )
        );
    }

    #[test]
    fn test_get_error_for_zero_duration() {
        let mut request = get_request();
        request.duration_ms = 0;

        assert_eq!(request.validate(&EngineConfig::default()).is_err(), true);
    }
}
