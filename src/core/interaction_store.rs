// Append-only log of everything the user did
//
// Readers get a snapshot (an Arc of the log as it was), so a prediction
// never sees a half-applied append. Writers serialize on the lock and
// copy the log only when a snapshot is still alive.

use crate::db::{Database, UserInteraction};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Immutable view of the log at one point in time
pub type Snapshot = Arc<Vec<UserInteraction>>;

#[derive(Clone, Default)]
pub struct InteractionStore {
    log: Arc<RwLock<Snapshot>>,
    db: Option<Arc<Database>>,
}

impl InteractionStore {
    /// Memory-only store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that also writes every interaction to `db`
    pub fn with_database(db: Arc<Database>) -> Self {
        Self {
            log: Arc::default(),
            db: Some(db),
        }
    }

    /// Rebuild the store from persisted history
    pub async fn rehydrate(db: Arc<Database>) -> Result<Self> {
        let interactions = db.load_interactions().await?;
        tracing::info!(count = interactions.len(), "rehydrated interaction store");

        Ok(Self {
            log: Arc::new(RwLock::new(Arc::new(interactions))),
            db: Some(db),
        })
    }

    /// Append an interaction. No dedup.
    ///
    /// Out-of-range fields are clamped first. With a database attached the
    /// row is written before the in-memory append, so a failed write leaves
    /// both untouched.
    pub async fn save(&self, interaction: UserInteraction) -> Result<()> {
        let interaction = interaction.clamped();
        let mut log = self.log.write().await;

        if let Some(db) = &self.db {
            db.insert_interaction(&interaction).await?;
        }

        tracing::debug!(
            workflow = interaction.workflow_id.as_deref().unwrap_or("-"),
            hour = interaction.context.hour_of_day,
            "saved interaction"
        );
        Arc::make_mut(&mut *log).push(interaction);

        Ok(())
    }

    /// Everything recorded so far, oldest first
    pub async fn snapshot(&self) -> Snapshot {
        Arc::clone(&*self.log.read().await)
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }

    pub async fn by_workflow(&self, workflow_id: &str) -> Vec<UserInteraction> {
        filter_by_workflow(&self.snapshot().await, workflow_id)
            .cloned()
            .collect()
    }

    /// Interactions within `tolerance` hours of `hour`, wrapping at midnight
    pub async fn at_hour(&self, hour: u32, tolerance: u32) -> Vec<UserInteraction> {
        self.snapshot()
            .await
            .iter()
            .filter(|i| hour_distance(i.context.hour_of_day, hour) <= tolerance)
            .cloned()
            .collect()
    }

    pub async fn since(&self, cutoff: DateTime<Utc>) -> Vec<UserInteraction> {
        self.snapshot()
            .await
            .iter()
            .filter(|i| i.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Last `limit` interactions, newest first
    pub async fn recent(&self, limit: usize) -> Vec<UserInteraction> {
        self.snapshot()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

pub(crate) fn filter_by_workflow<'a>(
    interactions: &'a [UserInteraction],
    workflow_id: &'a str,
) -> impl Iterator<Item = &'a UserInteraction> + 'a {
    interactions
        .iter()
        .filter(move |i| i.workflow_id.as_deref() == Some(workflow_id))
}

/// Distance between two hours on a 24h clock
pub fn hour_distance(a: u32, b: u32) -> u32 {
    let diff = (a % 24).abs_diff(b % 24);
    diff.min(24 - diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::InteractionContext;
    use chrono::Duration;

    fn run(workflow: &str, hour: u32) -> UserInteraction {
        UserInteraction::workflow_run(workflow, InteractionContext::at_hour(hour))
    }

    #[tokio::test]
    async fn test_save_appends_without_dedup() {
        let store = InteractionStore::new();

        store.save(run("deploy", 9)).await.unwrap();
        store.save(run("deploy", 9)).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.by_workflow("deploy").await.len(), 2);
    }

    #[test]
    fn test_hour_distance_against_seeded_store() {
        let store = InteractionStore::new();
        tokio_test::block_on(async {
            store.save(run("backup", 0)).await.unwrap();
            store.save(run("backup", 12)).await.unwrap();
        });

        assert_eq!(hour_distance(0, 23), 1);
        assert_eq!(hour_distance(12, 0), 12);
        assert_eq!(tokio_test::block_on(store.at_hour(23, 1)).len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_appends() {
        let store = InteractionStore::new();
        store.save(run("deploy", 9)).await.unwrap();

        let before = store.snapshot().await;
        store.save(run("lint", 10)).await.unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_at_hour_wraps_midnight() {
        let store = InteractionStore::new();
        store.save(run("backup", 23)).await.unwrap();
        store.save(run("backup", 0)).await.unwrap();
        store.save(run("backup", 12)).await.unwrap();

        let around_midnight = store.at_hour(0, 1).await;
        assert_eq!(around_midnight.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_and_since() {
        let store = InteractionStore::new();
        let old = Utc::now() - Duration::days(30);

        store
            .save(run("old-report", 8).with_timestamp(old))
            .await
            .unwrap();
        store.save(run("deploy", 9)).await.unwrap();

        let recent = store.recent(1).await;
        assert_eq!(recent[0].workflow_id.as_deref(), Some("deploy"));

        let last_week = store.since(Utc::now() - Duration::days(7)).await;
        assert_eq!(last_week.len(), 1);
    }

    #[tokio::test]
    async fn test_rehydrate_from_database() {
        let db = Arc::new(Database::in_memory().await.unwrap());

        let store = InteractionStore::with_database(Arc::clone(&db));
        store.save(run("deploy", 9)).await.unwrap();
        store.save(run("lint", 14)).await.unwrap();

        let restored = InteractionStore::rehydrate(db).await.unwrap();
        let snapshot = restored.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].workflow_id.as_deref(), Some("lint"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_are_not_lost() {
        let store = InteractionStore::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save(run("deploy", i % 24)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 16);
    }

    #[test]
    fn test_hour_distance() {
        assert_eq!(hour_distance(23, 1), 2);
        assert_eq!(hour_distance(9, 15), 6);
        assert_eq!(hour_distance(0, 12), 12);
        assert_eq!(hour_distance(5, 5), 0);
    }
}
