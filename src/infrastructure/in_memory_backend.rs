use crate::domain::models::ActivityId;
use crate::infrastructure::activity_client::ActivityBackend;
use crate::infrastructure::activity_mapper::{
    ActivityRecord, ActivityTypeRecord, PlacementUpdateRecord,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Backend kept in process memory, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct InMemoryActivityBackend {
    activities: Mutex<BTreeMap<i64, ActivityRecord>>,
    activity_types: Mutex<Vec<ActivityTypeRecord>>,
    updates: Mutex<Vec<(ActivityId, PlacementUpdateRecord)>>,
}

impl InMemoryActivityBackend {
    pub fn with_records(
        activities: Vec<ActivityRecord>,
        activity_types: Vec<ActivityTypeRecord>,
    ) -> Self {
        Self {
            activities: Mutex::new(
                activities
                    .into_iter()
                    .map(|record| (record.id, record))
                    .collect(),
            ),
            activity_types: Mutex::new(activity_types),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, activity_id: ActivityId) -> Result<Option<ActivityRecord>, InfraError> {
        let activities = self.activities.lock().map_err(lock_error)?;
        Ok(activities.get(&activity_id.0).cloned())
    }

    /// Every placement update accepted so far, oldest first.
    pub fn updates(&self) -> Result<Vec<(ActivityId, PlacementUpdateRecord)>, InfraError> {
        let updates = self.updates.lock().map_err(lock_error)?;
        Ok(updates.clone())
    }
}

fn lock_error<T>(error: std::sync::PoisonError<T>) -> InfraError {
    InfraError::InvalidConfig(format!("in-memory backend lock poisoned: {error}"))
}

#[async_trait]
impl ActivityBackend for InMemoryActivityBackend {
    async fn list_activities(&self) -> Result<Vec<ActivityRecord>, InfraError> {
        let activities = self.activities.lock().map_err(lock_error)?;
        Ok(activities.values().cloned().collect())
    }

    async fn list_activity_types(&self) -> Result<Vec<ActivityTypeRecord>, InfraError> {
        let activity_types = self.activity_types.lock().map_err(lock_error)?;
        Ok(activity_types.clone())
    }

    async fn update_placement(
        &self,
        activity_id: ActivityId,
        update: &PlacementUpdateRecord,
    ) -> Result<(), InfraError> {
        {
            let mut activities = self.activities.lock().map_err(lock_error)?;
            let Some(record) = activities.get_mut(&activity_id.0) else {
                return Err(InfraError::Http(format!(
                    "activity api error: http 404; body=activity {activity_id} not found"
                )));
            };
            record.start_time = update.start_time.clone();
            record.duration_minutes = Some(f64::from(update.duration_minutes));
        }
        let mut updates = self.updates.lock().map_err(lock_error)?;
        updates.push((activity_id, update.clone()));
        Ok(())
    }
}
