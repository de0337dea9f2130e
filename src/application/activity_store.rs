use crate::domain::models::{Activity, ActivityId, ActivityType, DEFAULT_DURATION_MINUTES, Placement};
use crate::infrastructure::activity_client::ActivityBackend;
use crate::infrastructure::activity_mapper::{decode_activity, decode_activity_type};
use crate::infrastructure::config::RetryPolicy;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::signal_mapper::{CalendarEntry, encode_calendar_entry};
use chrono::TimeZone;
use std::collections::BTreeMap;
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{debug, info, warn};

/// Everything one `load` pulls from the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySnapshot {
    pub activities: Vec<Activity>,
    pub activity_types: Vec<ActivityType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub scheduled: usize,
    pub unscheduled: usize,
    pub activity_types: usize,
}

/// Owned collection of activities split into the calendar view and the pool view.
///
/// Every known activity sits in exactly one of the two views. Views keep backend order after a
/// load; an activity whose placement changes is appended to the end of its new view.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityStore {
    activities: BTreeMap<ActivityId, Activity>,
    activity_types: BTreeMap<i64, ActivityType>,
    scheduled: Vec<ActivityId>,
    unscheduled: Vec<ActivityId>,
    load_error: Option<String>,
    default_duration_minutes: u32,
}

impl Default for ActivityStore {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MINUTES)
    }
}

impl ActivityStore {
    pub fn new(default_duration_minutes: u32) -> Self {
        Self {
            activities: BTreeMap::new(),
            activity_types: BTreeMap::new(),
            scheduled: Vec::new(),
            unscheduled: Vec::new(),
            load_error: None,
            default_duration_minutes,
        }
    }

    pub fn default_duration_minutes(&self) -> u32 {
        self.default_duration_minutes
    }

    pub async fn load<B>(&mut self, backend: &B, retry_policy: RetryPolicy) -> Result<LoadSummary, InfraError>
    where
        B: ActivityBackend + ?Sized,
    {
        let fetched = fetch_snapshot(backend, retry_policy).await;
        self.apply_load_result(fetched)
    }

    /// Installs a fetched snapshot, or records the failure and keeps the last partition.
    pub fn apply_load_result(
        &mut self,
        fetched: Result<ActivitySnapshot, InfraError>,
    ) -> Result<LoadSummary, InfraError> {
        match fetched {
            Ok(snapshot) => {
                let summary = self.replace_all(snapshot);
                info!(
                    scheduled = summary.scheduled,
                    unscheduled = summary.unscheduled,
                    activity_types = summary.activity_types,
                    "activities loaded"
                );
                Ok(summary)
            }
            Err(error) => {
                warn!(%error, "activity load failed; keeping last known views");
                self.load_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub fn replace_all(&mut self, snapshot: ActivitySnapshot) -> LoadSummary {
        let mut activities = BTreeMap::new();
        let mut ordered = Vec::with_capacity(snapshot.activities.len());
        for activity in snapshot.activities {
            if activities.contains_key(&activity.id) {
                warn!(activity_id = %activity.id, "duplicate activity in snapshot ignored");
                continue;
            }
            activities.insert(activity.id, activity.clone());
            ordered.push(activity);
        }
        let (scheduled, unscheduled) = partition(&ordered);
        self.activities = activities;
        self.activity_types = snapshot
            .activity_types
            .into_iter()
            .map(|activity_type| (activity_type.id, activity_type))
            .collect();
        self.scheduled = scheduled;
        self.unscheduled = unscheduled;
        self.load_error = None;
        LoadSummary {
            scheduled: self.scheduled.len(),
            unscheduled: self.unscheduled.len(),
            activity_types: self.activity_types.len(),
        }
    }

    /// Sets an activity's placement and moves it to the matching view.
    ///
    /// Returns `false` for an id the store does not know; nothing changes in that case.
    pub fn apply_placement(&mut self, activity_id: ActivityId, placement: Option<Placement>) -> bool {
        let Some(activity) = self.activities.get_mut(&activity_id) else {
            debug!(%activity_id, "placement ignored for unknown activity");
            return false;
        };
        activity.placement = placement;
        let scheduled = activity.is_scheduled();

        self.scheduled.retain(|id| *id != activity_id);
        self.unscheduled.retain(|id| *id != activity_id);
        if scheduled {
            self.scheduled.push(activity_id);
        } else {
            self.unscheduled.push(activity_id);
        }
        true
    }

    pub fn get(&self, activity_id: ActivityId) -> Option<&Activity> {
        self.activities.get(&activity_id)
    }

    pub fn contains(&self, activity_id: ActivityId) -> bool {
        self.activities.contains_key(&activity_id)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activity_type(&self, type_id: i64) -> Option<&ActivityType> {
        self.activity_types.get(&type_id)
    }

    pub fn scheduled_ids(&self) -> &[ActivityId] {
        &self.scheduled
    }

    pub fn unscheduled_ids(&self) -> &[ActivityId] {
        &self.unscheduled
    }

    pub fn scheduled(&self) -> Vec<&Activity> {
        self.resolve(&self.scheduled)
    }

    /// Pool view: activities waiting to be dragged onto the calendar.
    pub fn unscheduled(&self) -> Vec<&Activity> {
        self.resolve(&self.unscheduled)
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Scheduled activities rendered for the widget in `zone`.
    ///
    /// Start times that fall into a DST gap of `zone` are skipped with a warning.
    pub fn calendar_entries<Tz>(&self, zone: &Tz) -> Vec<CalendarEntry>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.scheduled()
            .into_iter()
            .filter_map(|activity| {
                let activity_type = activity.type_id.and_then(|type_id| self.activity_type(type_id));
                match encode_calendar_entry(activity, activity_type, zone, self.default_duration_minutes) {
                    Ok(entry) => entry,
                    Err(error) => {
                        warn!(activity_id = %activity.id, %error, "activity not rendered");
                        None
                    }
                }
            })
            .collect()
    }

    fn resolve(&self, ids: &[ActivityId]) -> Vec<&Activity> {
        ids.iter().filter_map(|id| self.activities.get(id)).collect()
    }
}

/// Splits activities into `(scheduled, unscheduled)` ids, preserving input order.
pub fn partition(activities: &[Activity]) -> (Vec<ActivityId>, Vec<ActivityId>) {
    let mut scheduled = Vec::new();
    let mut unscheduled = Vec::new();
    for activity in activities {
        if activity.is_scheduled() {
            scheduled.push(activity.id);
        } else {
            unscheduled.push(activity.id);
        }
    }
    (scheduled, unscheduled)
}

/// Reads activities and activity types, retrying transport failures with exponential backoff.
pub async fn fetch_snapshot<B>(backend: &B, retry_policy: RetryPolicy) -> Result<ActivitySnapshot, InfraError>
where
    B: ActivityBackend + ?Sized,
{
    let max_attempts = retry_policy.max_attempts.max(1);
    let mut attempt: u8 = 0;

    loop {
        match fetch_once(backend).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(error) if error.is_retryable() && attempt + 1 < max_attempts => {
                let delay = retry_policy
                    .base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt as u32));
                debug!(%error, attempt, delay_ms = delay, "retrying activity load");
                sleep(TokioDuration::from_millis(delay)).await;
                attempt = attempt.saturating_add(1);
            }
            Err(error) => return Err(error),
        }
    }
}

async fn fetch_once<B>(backend: &B) -> Result<ActivitySnapshot, InfraError>
where
    B: ActivityBackend + ?Sized,
{
    let activities = backend.list_activities().await?;
    let activity_types = backend.list_activity_types().await?;
    Ok(ActivitySnapshot {
        activities: activities.into_iter().map(decode_activity).collect(),
        activity_types: activity_types.into_iter().map(decode_activity_type).collect(),
    })
}
