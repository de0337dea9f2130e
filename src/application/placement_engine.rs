use crate::application::activity_store::{ActivityStore, LoadSummary};
use crate::domain::models::{ActivityId, Placement, ScheduleState, Transition};
use crate::infrastructure::activity_client::ActivityBackend;
use crate::infrastructure::activity_mapper::encode_placement_update;
use crate::infrastructure::config::{FailurePolicy, RetryPolicy, SchedulerConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::{Notification, Notifier};
use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type WriteFuture = Pin<Box<dyn Future<Output = WriteOutcome> + Send + 'static>>;

/// Result of one remote placement write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub activity_id: ActivityId,
    pub sequence: u64,
    pub transition: Transition,
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Remote write issued by a transition whose local mutation already happened.
///
/// Nothing is sent until the write is awaited.
pub struct PendingWrite {
    activity_id: ActivityId,
    sequence: u64,
    transition: Transition,
    future: WriteFuture,
}

impl PendingWrite {
    pub fn activity_id(&self) -> ActivityId {
        self.activity_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrite")
            .field("activity_id", &self.activity_id)
            .field("sequence", &self.sequence)
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}

impl IntoFuture for PendingWrite {
    type Output = WriteOutcome;
    type IntoFuture = WriteFuture;

    fn into_future(self) -> Self::IntoFuture {
        self.future
    }
}

/// Applies placement transitions to the store and persists them.
///
/// Local state changes synchronously inside [`PlacementEngine::apply`]; the remote write is
/// handed back to the caller. A failed write is never rolled back locally. Under
/// [`FailurePolicy::Reload`] settling a failed write that is still the newest for its activity
/// reloads the collection instead.
pub struct PlacementEngine<B, N>
where
    B: ActivityBackend + ?Sized + 'static,
    N: Notifier + ?Sized + 'static,
{
    store: ActivityStore,
    backend: Arc<B>,
    notifier: Arc<N>,
    failure_policy: FailurePolicy,
    retry_policy: RetryPolicy,
    next_sequence: u64,
    latest_writes: HashMap<ActivityId, u64>,
}

impl<B, N> PlacementEngine<B, N>
where
    B: ActivityBackend + ?Sized + 'static,
    N: Notifier + ?Sized + 'static,
{
    pub fn new(store: ActivityStore, backend: Arc<B>, notifier: Arc<N>) -> Self {
        Self {
            store,
            backend,
            notifier,
            failure_policy: FailurePolicy::default(),
            retry_policy: RetryPolicy::default(),
            next_sequence: 0,
            latest_writes: HashMap::new(),
        }
    }

    pub fn from_config(config: &SchedulerConfig, backend: Arc<B>, notifier: Arc<N>) -> Self {
        Self::new(ActivityStore::new(config.default_duration_minutes), backend, notifier)
            .with_failure_policy(config.failure_policy)
            .with_retry_policy(config.load_retry)
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ActivityStore {
        &mut self.store
    }

    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub async fn load(&mut self) -> Result<LoadSummary, InfraError> {
        self.store.load(self.backend.as_ref(), self.retry_policy).await
    }

    /// Mutates the store for `transition` and returns the remote write to run.
    ///
    /// Returns `None` when the transition is dropped: unknown activity id, or a resize of an
    /// activity that is not on the calendar. Dropped transitions never reach the backend.
    pub fn apply(&mut self, transition: Transition) -> Option<PendingWrite> {
        let activity_id = transition.activity_id();
        let default_minutes = self.store.default_duration_minutes();
        let Some(activity) = self.store.get(activity_id) else {
            info!(
                %activity_id,
                transition = transition.as_str(),
                "transition dropped: unknown activity"
            );
            return None;
        };
        let title = activity.display_title().to_string();

        let placement = match transition {
            Transition::Assign { start_time, .. } | Transition::Move { start_time, .. } => {
                // A calendar event keeps its current length, zero included.
                let duration_minutes = match activity.schedule_state(default_minutes) {
                    ScheduleState::Scheduled {
                        duration_minutes, ..
                    } => duration_minutes,
                    ScheduleState::Unscheduled => activity.effective_duration_minutes(default_minutes),
                };
                Placement::scheduled(start_time, duration_minutes)
            }
            Transition::Resize {
                duration_minutes, ..
            } => {
                let Some(start_time) = activity.scheduled_start() else {
                    warn!(%activity_id, "resize dropped: activity is not scheduled");
                    return None;
                };
                Placement::scheduled(start_time, duration_minutes)
            }
            Transition::Unassign { .. } => Placement::unscheduled(
                activity
                    .placement
                    .as_ref()
                    .and_then(|placement| placement.duration_minutes),
            ),
        };

        self.store.apply_placement(activity_id, Some(placement));
        info!(
            %activity_id,
            transition = transition.as_str(),
            start_time = ?placement.start_time.map(|start| start.to_string()),
            duration_minutes = ?placement.duration_minutes,
            "placement applied locally"
        );
        self.notifier
            .notify(Notification::success(success_message(&transition, &title)));

        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.latest_writes.insert(activity_id, sequence);

        let update = encode_placement_update(&placement, default_minutes);
        let backend = Arc::clone(&self.backend);
        let notifier = Arc::clone(&self.notifier);
        let future: WriteFuture = Box::pin(async move {
            let result = backend.update_placement(activity_id, &update).await;
            let error = match result {
                Ok(()) => {
                    info!(%activity_id, sequence, transition = transition.as_str(), "placement persisted");
                    None
                }
                Err(error) => {
                    error!(
                        %activity_id,
                        sequence,
                        transition = transition.as_str(),
                        %error,
                        "placement write failed"
                    );
                    notifier.notify(Notification::error(format!(
                        "Could not save changes to '{title}': {error}"
                    )));
                    Some(error.to_string())
                }
            };
            WriteOutcome {
                activity_id,
                sequence,
                transition,
                error,
            }
        });

        Some(PendingWrite {
            activity_id,
            sequence,
            transition,
            future,
        })
    }

    /// Whether no later transition on the same activity has been applied since this write.
    pub fn is_latest_write(&self, outcome: &WriteOutcome) -> bool {
        self.latest_writes.get(&outcome.activity_id) == Some(&outcome.sequence)
    }

    /// Whether a finished write should be followed by a reload from the backend.
    /// Only the newest failed write of an activity qualifies, and only under `Reload`.
    pub fn needs_reload(&self, outcome: &WriteOutcome) -> bool {
        self.failure_policy == FailurePolicy::Reload
            && !outcome.is_success()
            && self.is_latest_write(outcome)
    }
}

fn success_message(transition: &Transition, title: &str) -> String {
    match transition {
        Transition::Assign { .. } => format!("'{title}' added to the calendar"),
        Transition::Move { .. } => format!("'{title}' moved"),
        Transition::Resize { .. } => format!("'{title}' resized"),
        Transition::Unassign { .. } => format!("'{title}' removed from the calendar"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::activity_store::ActivitySnapshot;
    use crate::domain::local_time::{self, LocalTimestamp};
    use crate::domain::models::{Activity, ScheduleState, rounded_duration_minutes};
    use crate::infrastructure::activity_mapper::{
        ActivityRecord, ActivityTypeRecord, PlacementUpdateRecord,
    };
    use crate::infrastructure::in_memory_backend::InMemoryActivityBackend;
    use crate::infrastructure::notifier::{InMemoryNotifier, NotificationLevel};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeActivityBackend {
        inner: InMemoryActivityBackend,
        fail_updates: AtomicBool,
        update_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl FakeActivityBackend {
        fn new(records: Vec<ActivityRecord>) -> Self {
            Self {
                inner: InMemoryActivityBackend::with_records(records, Vec::new()),
                fail_updates: AtomicBool::new(false),
                update_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            }
        }

        fn failing(self) -> Self {
            self.fail_updates.store(true, Ordering::SeqCst);
            self
        }

        fn update_calls(&self) -> usize {
            self.update_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActivityBackend for FakeActivityBackend {
        async fn list_activities(&self) -> Result<Vec<ActivityRecord>, InfraError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_activities().await
        }

        async fn list_activity_types(&self) -> Result<Vec<ActivityTypeRecord>, InfraError> {
            self.inner.list_activity_types().await
        }

        async fn update_placement(
            &self,
            activity_id: ActivityId,
            update: &PlacementUpdateRecord,
        ) -> Result<(), InfraError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(InfraError::Http("activity api error: http 500".to_string()));
            }
            self.inner.update_placement(activity_id, update).await
        }
    }

    fn record(id: i64, start_time: Option<&str>, duration_minutes: Option<f64>) -> ActivityRecord {
        ActivityRecord {
            id,
            name: Some(format!("Activity {id}")),
            description: None,
            topic: None,
            type_id: None,
            start_time: start_time.map(str::to_string),
            duration_minutes,
        }
    }

    fn seed_records() -> Vec<ActivityRecord> {
        vec![
            record(7, None, None),
            record(8, Some("2024-05-01T09:00:00"), Some(45.0)),
            record(9, None, Some(30.0)),
        ]
    }

    fn timestamp(value: &str) -> LocalTimestamp {
        LocalTimestamp::parse(value).expect("valid timestamp")
    }

    async fn loaded_engine(
        backend: FakeActivityBackend,
    ) -> (
        PlacementEngine<FakeActivityBackend, InMemoryNotifier>,
        Arc<FakeActivityBackend>,
        Arc<InMemoryNotifier>,
    ) {
        let backend = Arc::new(backend);
        let notifier = Arc::new(InMemoryNotifier::default());
        let mut engine = PlacementEngine::new(
            ActivityStore::default(),
            Arc::clone(&backend),
            Arc::clone(&notifier),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 1,
        });
        engine.load().await.expect("initial load");
        notifier.drain();
        (engine, backend, notifier)
    }

    fn state_of(engine: &PlacementEngine<FakeActivityBackend, InMemoryNotifier>, id: i64) -> ScheduleState {
        engine
            .store()
            .get(ActivityId(id))
            .expect("known activity")
            .schedule_state(120)
    }

    #[tokio::test]
    async fn assign_uses_default_duration_and_persists() {
        let (mut engine, backend, notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        let dropped_at = chrono_tz::Europe::Paris
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid local time");

        let pending = engine
            .apply(Transition::Assign {
                activity_id: ActivityId(7),
                start_time: local_time::encode(&dropped_at),
            })
            .expect("write issued");
        assert_eq!(
            state_of(&engine, 7),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T09:00:00"),
                duration_minutes: 120,
            }
        );
        assert_eq!(backend.update_calls(), 0);

        let outcome = pending.await;
        assert!(outcome.is_success());
        assert_eq!(
            backend.inner.updates().expect("updates"),
            vec![(
                ActivityId(7),
                PlacementUpdateRecord {
                    start_time: Some("2024-05-01T09:00:00".to_string()),
                    duration_minutes: 120,
                }
            )]
        );
        assert_eq!(engine.store().scheduled_ids(), &[ActivityId(8), ActivityId(7)]);
        assert_eq!(notifier.snapshot()[0].level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn assign_reuses_last_known_duration() {
        let (mut engine, _backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        engine
            .apply(Transition::Assign {
                activity_id: ActivityId(9),
                start_time: timestamp("2024-05-02T14:00:00"),
            })
            .expect("write issued")
            .await;
        assert_eq!(
            state_of(&engine, 9),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-02T14:00:00"),
                duration_minutes: 30,
            }
        );
    }

    #[tokio::test]
    async fn move_preserves_duration() {
        let (mut engine, _backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-01T11:00:00"),
            })
            .expect("write issued")
            .await;
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T11:00:00"),
                duration_minutes: 45,
            }
        );
    }

    #[tokio::test]
    async fn move_after_resize_to_zero_keeps_zero_duration() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        engine
            .apply(Transition::Resize {
                activity_id: ActivityId(8),
                duration_minutes: 0,
            })
            .expect("resize issued")
            .await;
        engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-01T10:00:00"),
            })
            .expect("move issued")
            .await;

        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T10:00:00"),
                duration_minutes: 0,
            }
        );
        let stored = backend.inner.get(ActivityId(8)).expect("get").expect("exists");
        assert_eq!(stored.start_time.as_deref(), Some("2024-05-01T10:00:00"));
        assert_eq!(stored.duration_minutes, Some(0.0));
    }

    #[tokio::test]
    async fn move_of_scheduled_activity_without_duration_uses_displayed_default() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(vec![
            record(10, Some("2024-05-01T13:00:00"), None),
            record(11, Some("2024-05-01T15:00:00"), Some(0.0)),
        ]))
        .await;
        assert_eq!(
            state_of(&engine, 10),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T13:00:00"),
                duration_minutes: 120,
            }
        );

        engine
            .apply(Transition::Move {
                activity_id: ActivityId(10),
                start_time: timestamp("2024-05-01T14:00:00"),
            })
            .expect("move issued")
            .await;
        engine
            .apply(Transition::Move {
                activity_id: ActivityId(11),
                start_time: timestamp("2024-05-01T16:00:00"),
            })
            .expect("move issued")
            .await;

        assert_eq!(
            state_of(&engine, 10),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T14:00:00"),
                duration_minutes: 120,
            }
        );
        assert_eq!(
            state_of(&engine, 11),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T16:00:00"),
                duration_minutes: 0,
            }
        );
        let updates = backend.inner.updates().expect("updates");
        assert_eq!(updates[0].1.duration_minutes, 120);
        assert_eq!(updates[1].1.duration_minutes, 0);
    }

    #[tokio::test]
    async fn assign_on_zero_length_event_keeps_zero_duration() {
        let (mut engine, _backend, _notifier) = loaded_engine(FakeActivityBackend::new(vec![record(
            11,
            Some("2024-05-01T15:00:00"),
            Some(0.0),
        )]))
        .await;
        engine
            .apply(Transition::Assign {
                activity_id: ActivityId(11),
                start_time: timestamp("2024-05-02T08:00:00"),
            })
            .expect("assign issued")
            .await;
        assert_eq!(
            state_of(&engine, 11),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-02T08:00:00"),
                duration_minutes: 0,
            }
        );
    }

    #[tokio::test]
    async fn resize_rounds_and_preserves_start() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        let minutes = rounded_duration_minutes(44_600 * 60);
        assert_eq!(minutes, 45);
        engine
            .apply(Transition::Resize {
                activity_id: ActivityId(8),
                duration_minutes: minutes,
            })
            .expect("write issued")
            .await;
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T09:00:00"),
                duration_minutes: 45,
            }
        );
        let stored = backend.inner.get(ActivityId(8)).expect("get").expect("exists");
        assert_eq!(stored.duration_minutes, Some(45.0));
    }

    #[tokio::test]
    async fn resize_of_unscheduled_activity_is_dropped() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        assert!(engine
            .apply(Transition::Resize {
                activity_id: ActivityId(7),
                duration_minutes: 30,
            })
            .is_none());
        assert_eq!(state_of(&engine, 7), ScheduleState::Unscheduled);
        assert_eq!(backend.update_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_activity_changes_nothing_and_skips_backend() {
        let (mut engine, backend, notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        let before = engine.store().clone();
        assert!(engine
            .apply(Transition::Assign {
                activity_id: ActivityId(999),
                start_time: timestamp("2024-05-01T09:00:00"),
            })
            .is_none());
        assert_eq!(engine.store(), &before);
        assert_eq!(backend.update_calls(), 0);
        assert!(notifier.snapshot().is_empty());
    }

    #[tokio::test]
    async fn assign_then_unassign_returns_to_pool_and_keeps_duration() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        engine
            .apply(Transition::Assign {
                activity_id: ActivityId(7),
                start_time: timestamp("2024-05-01T09:00:00"),
            })
            .expect("assign")
            .await;
        engine
            .apply(Transition::Unassign {
                activity_id: ActivityId(7),
            })
            .expect("unassign")
            .await;

        let activity = engine.store().get(ActivityId(7)).expect("known");
        assert_eq!(activity.schedule_state(120), ScheduleState::Unscheduled);
        assert_eq!(activity.last_known_duration(), Some(120));
        assert!(engine.store().unscheduled_ids().contains(&ActivityId(7)));
        let updates = backend.inner.updates().expect("updates");
        assert_eq!(updates[1].1.start_time, None);
    }

    #[tokio::test]
    async fn failed_write_notifies_and_keeps_local_state() {
        let (mut engine, backend, notifier) =
            loaded_engine(FakeActivityBackend::new(seed_records()).failing()).await;
        let outcome = engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-03T08:00:00"),
            })
            .expect("write issued")
            .await;

        assert!(!outcome.is_success());
        assert!(!engine.needs_reload(&outcome));
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-03T08:00:00"),
                duration_minutes: 45,
            }
        );
        assert_eq!(notifier.errors().len(), 1);
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_policy_restores_backend_state_after_failure() {
        let (engine, backend, _notifier) =
            loaded_engine(FakeActivityBackend::new(seed_records()).failing()).await;
        let mut engine = engine.with_failure_policy(FailurePolicy::Reload);
        let outcome = engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-03T08:00:00"),
            })
            .expect("write issued")
            .await;

        assert!(engine.needs_reload(&outcome));
        engine.load().await.expect("reload");
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T09:00:00"),
                duration_minutes: 45,
            }
        );
    }

    #[tokio::test]
    async fn out_of_order_completion_keeps_last_local_mutation() {
        let (engine, backend, _notifier) =
            loaded_engine(FakeActivityBackend::new(seed_records()).failing()).await;
        let mut engine = engine.with_failure_policy(FailurePolicy::Reload);
        let first = engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-01T10:00:00"),
            })
            .expect("first write");
        let second = engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-01T12:00:00"),
            })
            .expect("second write");
        assert!(first.sequence() < second.sequence());

        let late = first.await;
        assert!(!engine.is_latest_write(&late));
        assert!(!engine.needs_reload(&late));
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T12:00:00"),
                duration_minutes: 45,
            }
        );

        let newest = second.await;
        assert!(engine.is_latest_write(&newest));
    }

    #[tokio::test]
    async fn writes_reach_backend_in_completion_order() {
        let (mut engine, backend, _notifier) = loaded_engine(FakeActivityBackend::new(seed_records())).await;
        let first = engine
            .apply(Transition::Move {
                activity_id: ActivityId(8),
                start_time: timestamp("2024-05-01T10:00:00"),
            })
            .expect("first write");
        let second = engine
            .apply(Transition::Resize {
                activity_id: ActivityId(8),
                duration_minutes: 90,
            })
            .expect("second write");

        second.await;
        first.await;

        // The backend ends up with the stale write; the local view is not reconciled.
        let stored = backend.inner.get(ActivityId(8)).expect("get").expect("exists");
        assert_eq!(stored.duration_minutes, Some(45.0));
        assert_eq!(
            state_of(&engine, 8),
            ScheduleState::Scheduled {
                start_time: timestamp("2024-05-01T10:00:00"),
                duration_minutes: 90,
            }
        );
    }

    fn transition_strategy() -> impl Strategy<Value = Transition> {
        let id = 6i64..11;
        prop_oneof![
            (id.clone(), 1u32..28, 0u32..24).prop_map(|(id, day, hour)| Transition::Assign {
                activity_id: ActivityId(id),
                start_time: timestamp(&format!("2024-05-{day:02}T{hour:02}:00:00")),
            }),
            (id.clone(), 1u32..28, 0u32..24).prop_map(|(id, day, hour)| Transition::Move {
                activity_id: ActivityId(id),
                start_time: timestamp(&format!("2024-06-{day:02}T{hour:02}:30:00")),
            }),
            (id.clone(), 0u32..480).prop_map(|(id, minutes)| Transition::Resize {
                activity_id: ActivityId(id),
                duration_minutes: minutes,
            }),
            id.prop_map(|id| Transition::Unassign {
                activity_id: ActivityId(id),
            }),
        ]
    }

    fn store_with(activities: Vec<Activity>) -> ActivityStore {
        let mut store = ActivityStore::default();
        store.replace_all(ActivitySnapshot {
            activities,
            activity_types: Vec::new(),
        });
        store
    }

    // The views stay a partition of the known activities, resize keeps the start and move
    // keeps the length of an event already on the calendar.
    proptest! {
        #[test]
        fn transitions_preserve_partition(transitions in proptest::collection::vec(transition_strategy(), 0..30)) {
            let backend = Arc::new(FakeActivityBackend::new(Vec::new()));
            let notifier = Arc::new(InMemoryNotifier::default());
            let mut records = seed_records();
            records.push(record(6, Some("2024-05-01T07:00:00"), Some(0.0)));
            records.push(record(10, Some("2024-05-01T13:00:00"), None));
            let activities = records
                .into_iter()
                .map(crate::infrastructure::activity_mapper::decode_activity)
                .collect();
            let mut engine = PlacementEngine::new(store_with(activities), backend, notifier);

            for transition in transitions {
                let before = engine
                    .store()
                    .get(transition.activity_id())
                    .map(|activity| activity.schedule_state(120));
                let issued = engine.apply(transition).is_some();
                let after = engine
                    .store()
                    .get(transition.activity_id())
                    .map(|activity| activity.schedule_state(120));

                match (transition, issued, before, after) {
                    (
                        Transition::Resize { .. },
                        true,
                        Some(ScheduleState::Scheduled { start_time: before, .. }),
                        Some(ScheduleState::Scheduled { start_time: after, .. }),
                    ) => prop_assert_eq!(before, after),
                    (
                        Transition::Move { .. },
                        true,
                        Some(ScheduleState::Scheduled { duration_minutes: before, .. }),
                        Some(ScheduleState::Scheduled { duration_minutes: after, .. }),
                    ) => prop_assert_eq!(before, after),
                    (Transition::Resize { .. } | Transition::Move { .. }, true, _, after) => {
                        prop_assert!(matches!(after, Some(ScheduleState::Scheduled { .. })), "expected Scheduled state after accepted resize/move");
                    }
                    _ => {}
                }

                let store = engine.store();
                let mut seen: Vec<ActivityId> = store
                    .scheduled_ids()
                    .iter()
                    .chain(store.unscheduled_ids())
                    .copied()
                    .collect();
                seen.sort();
                prop_assert_eq!(
                    seen,
                    vec![ActivityId(6), ActivityId(7), ActivityId(8), ActivityId(9), ActivityId(10)]
                );
                for id in store.scheduled_ids() {
                    prop_assert!(store.get(*id).is_some_and(Activity::is_scheduled));
                }
            }
        }
    }
}
