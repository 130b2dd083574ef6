use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commands::giveaway::manager::GiveawayManager;
use crate::commands::giveaway::models::{
    now_millis, ActiveGiveaway, EngineConfig, Giveaway, GiveawayStatus, JoinOutcome, NewGiveaway,
    Participant, Stats, Summary,
};
use crate::commands::giveaway::notifier::{GiveawayEvent, GiveawayNotifier};
use crate::commands::giveaway::strategies::{DrawOptions, GiveawayStrategy};
use crate::error::{Error, Result};

/// Result of one expiry pass.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub completed: Vec<Summary>,
    // One detached delivery per completed giveaway.
    pub notifications: Vec<JoinHandle<()>>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    // Waits until every notification of the pass was delivered.
    pub async fn wait(self) -> Vec<Summary> {
        for handle in self.notifications {
            if let Err(err) = handle.await {
                error!("Giveaway notification task failed: {}", err);
            }
        }
        self.completed
    }
}

/// Drives giveaways from `Active` into `Completed` or `Cancelled`. The
/// scheduler and the manual commands share the same finalize path.
pub struct LifecycleCoordinator {
    manager: Arc<GiveawayManager>,
    strategy: Arc<Box<dyn GiveawayStrategy>>,
    notifier: Arc<dyn GiveawayNotifier>,
    config: EngineConfig,
    sweeping: AtomicCell<bool>,
}

impl LifecycleCoordinator {
    pub fn new(
        manager: Arc<GiveawayManager>,
        strategy: Box<dyn GiveawayStrategy>,
        notifier: Arc<dyn GiveawayNotifier>,
        config: EngineConfig,
    ) -> Self {
        LifecycleCoordinator {
            manager,
            strategy: Arc::new(strategy),
            notifier,
            config,
            sweeping: AtomicCell::new(false),
        }
    }

    pub fn manager(&self) -> &Arc<GiveawayManager> {
        &self.manager
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn create(&self, request: NewGiveaway) -> Result<Giveaway> {
        request.validate(&self.config)?;

        let now = now_millis();
        let id = match request.id {
            Some(ref id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        };
        let deadline = now.checked_add(request.duration_ms).ok_or_else(|| {
            Error::Validation("The duration is too long.".to_string())
        })?;
        let giveaway = Giveaway::new(
            &id,
            request.location.clone(),
            request.prize.trim(),
            request.winner_count,
            deadline,
            &request.created_by,
        )
        .with_created_at(now);

        let giveaway = self.manager.create(giveaway)?;
        deliver(
            &self.notifier,
            GiveawayEvent::Created {
                giveaway: giveaway.clone(),
            },
        )
        .await;
        Ok(giveaway)
    }

    // Returns active giveaways in the creation order with live participant counts.
    pub fn list_active(&self) -> Vec<ActiveGiveaway> {
        self.manager
            .list_active()
            .into_iter()
            .map(|giveaway| {
                let participant_count = self.manager.count(giveaway.id());
                ActiveGiveaway {
                    giveaway,
                    participant_count,
                }
            })
            .collect()
    }

    pub fn join(&self, id: &str, participant: &Participant) -> JoinOutcome {
        self.manager.join(id, participant)
    }

    pub fn leave(&self, id: &str, user_id: &str) -> bool {
        self.manager.leave(id, user_id)
    }

    pub fn stats(&self) -> Stats {
        self.manager.stats()
    }

    /// Claims the giveaway and draws its winners.
    ///
    /// Returns `None` when the giveaway is no longer active, so at most one
    /// caller ever gets a summary for a given identifier. Delivering the
    /// result is left to the caller.
    pub fn complete(&self, id: &str) -> Option<Summary> {
        let (giveaway, participants) = self.manager.take_active(id, GiveawayStatus::Completed)?;

        let winners = match participants.is_empty() {
            true => Vec::new(),
            false => {
                let options = DrawOptions::new(&participants, giveaway.winner_count() as usize);
                self.strategy.draw(&options)
            }
        };

        info!(
            "Giveaway {} completed (prize: {}, participants: {}, winners: {})",
            giveaway.id(),
            giveaway.prize(),
            participants.len(),
            winners.len()
        );
        Some(Summary {
            giveaway,
            winners,
            participant_count: participants.len(),
        })
    }

    // Ends the giveaway right now, no matter the deadline.
    pub async fn force_end(&self, id: &str) -> Result<Summary> {
        let summary = self
            .complete(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        deliver(&self.notifier, GiveawayEvent::from(summary.clone())).await;
        Ok(summary)
    }

    // Same as `force_end`, but only for a giveaway announced in the guild.
    pub async fn force_end_in(&self, guild_id: &str, id: &str) -> Result<Summary> {
        self.ensure_in_guild(guild_id, id)?;
        self.force_end(id).await
    }

    // Same as `cancel`, but only for a giveaway announced in the guild.
    pub async fn cancel_in(&self, guild_id: &str, id: &str) -> Result<Giveaway> {
        self.ensure_in_guild(guild_id, id)?;
        self.cancel(id).await
    }

    // Giveaways of other guilds are reported as missing.
    fn ensure_in_guild(&self, guild_id: &str, id: &str) -> Result<()> {
        match self.manager.find_active(id) {
            Some(ref giveaway) if giveaway.location().guild_id == guild_id => Ok(()),
            _ => Err(Error::NotFound(id.to_string())),
        }
    }

    pub async fn cancel(&self, id: &str) -> Result<Giveaway> {
        let (giveaway, participants) = self
            .manager
            .take_active(id, GiveawayStatus::Cancelled)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        info!(
            "Giveaway {} cancelled (prize: {}, participants: {})",
            giveaway.id(),
            giveaway.prize(),
            participants.len()
        );
        deliver(
            &self.notifier,
            GiveawayEvent::Cancelled {
                giveaway: giveaway.clone(),
            },
        )
        .await;
        Ok(giveaway)
    }

    /// Completes every giveaway whose deadline is not after `now`.
    ///
    /// Each notification runs as its own task, so a stuck delivery never
    /// holds back other giveaways or the next pass. Must be called from
    /// within a tokio runtime.
    pub fn sweep(&self, now: i64) -> SweepReport {
        if self.sweeping.compare_exchange(false, true).is_err() {
            warn!("Previous giveaway sweep is still running, skipping");
            return SweepReport::default();
        }

        self.manager.flush();

        let mut report = SweepReport::default();
        for id in self.manager.due_ids(now) {
            // Might have been ended manually since the ids were collected.
            let summary = match self.complete(&id) {
                Some(summary) => summary,
                None => continue,
            };

            let notifier = self.notifier.clone();
            let event = GiveawayEvent::from(summary.clone());
            report.notifications.push(tokio::spawn(async move {
                deliver(&notifier, event).await;
            }));
            report.completed.push(summary);
        }

        self.sweeping.store(false);
        report
    }
}

async fn deliver(notifier: &Arc<dyn GiveawayNotifier>, event: GiveawayEvent) {
    let id = event.giveaway().id().to_string();
    if let Err(err) = notifier.notify(event).await {
        error!("Can't deliver the notification for giveaway {}: {}", id, err);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::commands::giveaway::coordinator::LifecycleCoordinator;
    use crate::commands::giveaway::manager::GiveawayManager;
    use crate::commands::giveaway::models::{
        EngineConfig, Giveaway, JoinOutcome, LocationRef, NewGiveaway, Participant,
        MILLIS_PER_HOUR,
    };
    use crate::commands::giveaway::notifier::GiveawayEvent;
    use crate::commands::giveaway::notifier::testing::RecordingNotifier;
    use crate::commands::giveaway::store::testing::MemoryStore;
    use crate::commands::giveaway::strategies::UniformDrawStrategy;
    use crate::error::Error;

    fn get_coordinator(notifier: RecordingNotifier) -> (Arc<LifecycleCoordinator>, Arc<RecordingNotifier>) {
        let manager = Arc::new(GiveawayManager::new(Box::new(MemoryStore::new())));
        let notifier = Arc::new(notifier);
        let coordinator = LifecycleCoordinator::new(
            manager,
            Box::new(UniformDrawStrategy::with_seed(11)),
            notifier.clone(),
            EngineConfig::default(),
        );
        (Arc::new(coordinator), notifier)
    }

    fn get_request(id: &str, winner_count: u32) -> NewGiveaway {
        NewGiveaway {
            id: Some(id.to_string()),
            prize: "50".to_string(),
            duration_ms: MILLIS_PER_HOUR,
            winner_count,
            location: LocationRef::new("1", "2"),
            created_by: "99".to_string(),
        }
    }

    // Registers an already expired giveaway, bypassing duration checks.
    fn add_expired(coordinator: &LifecycleCoordinator, id: &str, prize: &str) {
        let giveaway = Giveaway::new(id, LocationRef::new("1", "2"), prize, 1, 0, "99");
        coordinator.manager().create(giveaway).unwrap();
    }

    fn join_users(coordinator: &LifecycleCoordinator, id: &str, count: usize) {
        for index in 1..=count {
            let participant = Participant::new(&index.to_string(), "Test");
            assert_eq!(coordinator.join(id, &participant), JoinOutcome::Joined);
        }
    }

    #[tokio::test]
    async fn test_create_giveaway() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());

        let giveaway = coordinator.create(get_request("1", 3)).await.unwrap();
        assert_eq!(giveaway.deadline() - giveaway.created_at(), MILLIS_PER_HOUR);
        assert_eq!(coordinator.list_active().len(), 1);
        assert_eq!(coordinator.stats().total_created, 1);
        assert_eq!(notifier.events(), vec![GiveawayEvent::Created { giveaway }]);
    }

    #[tokio::test]
    async fn test_create_giveaway_with_generated_identifier() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());
        let mut request = get_request("1", 1);
        request.id = None;

        let first = coordinator.create(request.clone()).await.unwrap();
        let second = coordinator.create(request).await.unwrap();
        assert_eq!(first.id().is_empty(), false);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_get_error_for_invalid_request() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());

        let result = coordinator.create(get_request("1", 0)).await;
        assert_eq!(result.is_err(), true);
        assert_eq!(coordinator.list_active().is_empty(), true);
        assert_eq!(coordinator.stats().total_created, 0);
        assert_eq!(notifier.events().is_empty(), true);
    }

    #[tokio::test]
    async fn test_list_active_with_participant_counts() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();
        coordinator.create(get_request("2", 1)).await.unwrap();
        join_users(&coordinator, "2", 3);

        let active = coordinator.list_active();
        assert_eq!(active[0].giveaway.id(), "1");
        assert_eq!(active[0].participant_count, 0);
        assert_eq!(active[1].giveaway.id(), "2");
        assert_eq!(active[1].participant_count, 3);
    }

    #[tokio::test]
    async fn test_force_end_draws_distinct_winners() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 3)).await.unwrap();
        join_users(&coordinator, "1", 5);

        let summary = coordinator.force_end("1").await.unwrap();
        let winners = summary.winners.iter().cloned().collect::<BTreeSet<String>>();
        assert_eq!(summary.winners.len(), 3);
        assert_eq!(winners.len(), 3);
        assert_eq!(winners.iter().all(|id| (1..=5).any(|n| n.to_string() == *id)), true);
        assert_eq!(summary.participant_count, 5);

        let stats = coordinator.stats();
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.total_participants, 5);
        assert_eq!(coordinator.list_active().is_empty(), true);

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            GiveawayEvent::Completed {
                giveaway: summary.giveaway.clone(),
                winners: summary.winners.clone(),
                participant_count: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_force_end_twice() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();
        join_users(&coordinator, "1", 2);

        assert_eq!(coordinator.force_end("1").await.is_ok(), true);
        let result = coordinator.force_end("1").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("1".to_string()));
        assert_eq!(coordinator.stats().total_completed, 1);
        assert_eq!(coordinator.stats().total_participants, 2);
        assert_eq!(notifier.events().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_giveaway_with_participants() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();
        join_users(&coordinator, "1", 4);

        let giveaway = coordinator.cancel("1").await.unwrap();
        assert_eq!(coordinator.list_active().is_empty(), true);

        let stats = coordinator.stats();
        assert_eq!(stats.total_cancelled, 1);
        assert_eq!(stats.total_completed, 0);
        assert_eq!(stats.total_participants, 0);
        assert_eq!(notifier.events()[1], GiveawayEvent::Cancelled { giveaway });
    }

    #[tokio::test]
    async fn test_cancel_after_end_is_not_found() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();
        coordinator.force_end("1").await.unwrap();

        let result = coordinator.cancel("1").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("1".to_string()));
        assert_eq!(coordinator.stats().total_cancelled, 0);
    }

    #[tokio::test]
    async fn test_force_end_in_another_guild_is_not_found() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();
        join_users(&coordinator, "1", 2);

        let result = coordinator.force_end_in("5", "1").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("1".to_string()));
        assert_eq!(coordinator.list_active().len(), 1);
        assert_eq!(coordinator.stats().total_completed, 0);
        assert_eq!(notifier.events().len(), 1);

        let summary = coordinator.force_end_in("1", "1").await.unwrap();
        assert_eq!(summary.participant_count, 2);
        assert_eq!(coordinator.list_active().is_empty(), true);
    }

    #[tokio::test]
    async fn test_cancel_in_another_guild_is_not_found() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());
        coordinator.create(get_request("1", 1)).await.unwrap();

        let result = coordinator.cancel_in("5", "1").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("1".to_string()));
        assert_eq!(coordinator.stats().total_cancelled, 0);

        assert_eq!(coordinator.cancel_in("1", "1").await.is_ok(), true);
        assert_eq!(coordinator.stats().total_cancelled, 1);
    }

    #[tokio::test]
    async fn test_unknown_giveaway_in_guild_is_not_found() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());

        let result = coordinator.force_end_in("1", "404").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("404".to_string()));
    }

    #[tokio::test]
    async fn test_get_error_for_overflowing_deadline() {
        let manager = Arc::new(GiveawayManager::new(Box::new(MemoryStore::new())));
        let config = EngineConfig {
            max_duration_ms: i64::MAX,
            max_winners: 20,
        };
        let coordinator = LifecycleCoordinator::new(
            manager,
            Box::new(UniformDrawStrategy::with_seed(11)),
            Arc::new(RecordingNotifier::new()),
            config,
        );

        let mut request = get_request("1", 1);
        request.duration_ms = i64::MAX;
        let result = coordinator.create(request).await;
        assert_eq!(
            result.unwrap_err(),
            Error::Validation("The duration is too long.".to_string())
        );
        assert_eq!(coordinator.list_active().is_empty(), true);
    }

    #[tokio::test]
    async fn test_sweep_completes_only_due_giveaways() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::new());
        let pending = coordinator.create(get_request("1", 1)).await.unwrap();
        add_expired(&coordinator, "2", "50");

        let completed = coordinator.sweep(pending.deadline() - 1).wait().await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].giveaway.id(), "2");
        assert_eq!(coordinator.list_active().len(), 1);

        let completed = coordinator.sweep(pending.deadline()).wait().await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].giveaway.id(), "1");
    }

    #[tokio::test]
    async fn test_sweep_completes_empty_giveaway() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        add_expired(&coordinator, "1", "50");

        let completed = coordinator.sweep(1).wait().await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].winners.is_empty(), true);

        let stats = coordinator.stats();
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.total_participants, 0);
        assert_eq!(
            notifier.events(),
            vec![GiveawayEvent::CompletedEmpty {
                giveaway: completed[0].giveaway.clone()
            }]
        );
    }

    #[tokio::test]
    async fn test_manual_end_after_sweep_is_not_found() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        add_expired(&coordinator, "1", "50");
        join_users(&coordinator, "1", 2);

        coordinator.sweep(1).wait().await;
        let result = coordinator.force_end("1").await;
        assert_eq!(result.unwrap_err(), Error::NotFound("1".to_string()));
        assert_eq!(coordinator.stats().total_completed, 1);
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_sweep_and_manual_commands_finalize_once() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::new());
        add_expired(&coordinator, "1", "50");
        join_users(&coordinator, "1", 3);

        let mut tasks = Vec::new();
        for index in 0..6 {
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                match index % 3 {
                    0 => coordinator.force_end("1").await.is_ok(),
                    1 => coordinator.cancel("1").await.is_ok(),
                    _ => !coordinator.sweep(1).wait().await.is_empty(),
                }
            }));
        }

        let mut finalized = 0;
        for task in tasks {
            if task.await.unwrap() {
                finalized += 1;
            }
        }

        let stats = coordinator.stats();
        assert_eq!(finalized, 1);
        assert_eq!(stats.total_completed + stats.total_cancelled, 1);
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_stalled_notification_does_not_block_other_giveaways() {
        let (coordinator, notifier) = get_coordinator(RecordingNotifier::stalling_on("slow"));
        add_expired(&coordinator, "1", "slow");
        add_expired(&coordinator, "2", "fast");

        let report = coordinator.sweep(1);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(coordinator.list_active().is_empty(), true);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].giveaway().prize(), "fast");

        for handle in report.notifications {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_giveaway_finalized() {
        let (coordinator, _) = get_coordinator(RecordingNotifier::failing());
        add_expired(&coordinator, "1", "50");

        let summary = coordinator.force_end("1").await.unwrap();
        assert_eq!(summary.giveaway.id(), "1");
        assert_eq!(coordinator.list_active().is_empty(), true);
        assert_eq!(coordinator.stats().total_completed, 1);
    }
}
