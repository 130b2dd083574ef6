// Participant tracking for active giveaways.
use std::collections::BTreeSet;

use tracing::debug;

use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::{JoinOutcome, Participant};

impl GiveawayManager {
    // Registers the participant in the giveaway. Joining twice is reported
    // distinctly but changes nothing.
    pub fn join(&self, giveaway_id: &str, participant: &Participant) -> JoinOutcome {
        let mut root = self.state();

        if root.position(giveaway_id).is_none() {
            return JoinOutcome::GiveawayNotActive;
        }

        if participant.is_bot() {
            return JoinOutcome::Ineligible;
        }

        let inserted = root
            .participants
            .entry(giveaway_id.to_string())
            .or_default()
            .insert(participant.user_id().to_string());

        match inserted {
            true => {
                self.persist(&root);
                debug!(
                    "{} ({}) joined the giveaway {}",
                    participant.username(),
                    participant.user_id(),
                    giveaway_id
                );
                JoinOutcome::Joined
            }
            false => JoinOutcome::AlreadyJoined,
        }
    }

    // Withdraws the participant. Returns false when nothing was removed.
    pub fn leave(&self, giveaway_id: &str, user_id: &str) -> bool {
        let mut root = self.state();

        if root.position(giveaway_id).is_none() {
            return false;
        }

        let removed = match root.participants.get_mut(giveaway_id) {
            Some(participants) => participants.remove(user_id),
            None => false,
        };

        if removed {
            self.persist(&root);
            debug!("{} left the giveaway {}", user_id, giveaway_id);
        }
        removed
    }

    /// Replaces the participants of an active giveaway with the given
    /// entrants, skipping bots. Used to catch up with reactions that were
    /// added or removed while the bot was offline.
    ///
    /// Returns the new participant count, or `None` when the giveaway is no
    /// longer active.
    pub fn restore_participants(
        &self,
        giveaway_id: &str,
        entrants: &[Participant],
    ) -> Option<usize> {
        let mut root = self.state();
        root.position(giveaway_id)?;

        let restored = entrants
            .iter()
            .filter(|entrant| !entrant.is_bot())
            .map(|entrant| entrant.user_id().to_string())
            .collect::<BTreeSet<String>>();
        let count = restored.len();

        let previous = root.participants.insert(giveaway_id.to_string(), restored);
        if previous.as_ref() != root.participants.get(giveaway_id) {
            self.persist(&root);
        }
        Some(count)
    }

    pub fn count(&self, giveaway_id: &str) -> usize {
        self.state()
            .participants
            .get(giveaway_id)
            .map(|participants| participants.len())
            .unwrap_or(0)
    }

    // Returns a copy of the registered user identifiers.
    pub fn participants(&self, giveaway_id: &str) -> BTreeSet<String> {
        self.state()
            .participants
            .get(giveaway_id)
            .cloned()
            .unwrap_or_default()
    }
}
