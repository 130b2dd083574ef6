use serenity::async_trait;

use crate::commands::giveaway::models::{Giveaway, Summary};
use crate::error::Result;

/// Side-effect requests emitted by the engine. Rendering and delivery belong
/// to the notifier implementation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GiveawayEvent {
    Created {
        giveaway: Giveaway,
    },
    Completed {
        giveaway: Giveaway,
        winners: Vec<String>,
        participant_count: usize,
    },
    CompletedEmpty {
        giveaway: Giveaway,
    },
    Cancelled {
        giveaway: Giveaway,
    },
}

impl GiveawayEvent {
    pub fn giveaway(&self) -> &Giveaway {
        match self {
            GiveawayEvent::Created { giveaway }
            | GiveawayEvent::Completed { giveaway, .. }
            | GiveawayEvent::CompletedEmpty { giveaway }
            | GiveawayEvent::Cancelled { giveaway } => giveaway,
        }
    }
}

impl From<Summary> for GiveawayEvent {
    fn from(summary: Summary) -> Self {
        match summary.has_winners() {
            true => GiveawayEvent::Completed {
                giveaway: summary.giveaway,
                winners: summary.winners,
                participant_count: summary.participant_count,
            },
            false => GiveawayEvent::CompletedEmpty {
                giveaway: summary.giveaway,
            },
        }
    }
}

#[async_trait]
pub trait GiveawayNotifier: Send + Sync {
    // Delivers the event to the chat. Errors are logged by the caller and
    // never undo the transition that produced the event.
    async fn notify(&self, event: GiveawayEvent) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use serenity::async_trait;

    use crate::commands::giveaway::notifier::{GiveawayEvent, GiveawayNotifier};
    use crate::error::{Error, Result};

    // Keeps every received event, optionally stalling or failing on the way.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<GiveawayEvent>>,
        stalled_prize: Option<String>,
        failing: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            RecordingNotifier::default()
        }

        // Events for giveaways with this prize never finish delivering.
        pub fn stalling_on(prize: &str) -> Self {
            RecordingNotifier {
                stalled_prize: Some(prize.to_string()),
                ..RecordingNotifier::default()
            }
        }

        pub fn failing() -> Self {
            RecordingNotifier {
                failing: true,
                ..RecordingNotifier::default()
            }
        }

        pub fn events(&self) -> Vec<GiveawayEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GiveawayNotifier for RecordingNotifier {
        async fn notify(&self, event: GiveawayEvent) -> Result<()> {
            if self.stalled_prize.as_deref() == Some(event.giveaway().prize()) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            self.events.lock().unwrap().push(event);
            match self.failing {
                true => Err(Error::SerenityError("Missing Access".to_string())),
                false => Ok(()),
            }
        }
    }
}
