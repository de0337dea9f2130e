use crate::domain::local_time::LocalTimestamp;
use crate::domain::models::{Activity, ActivityId, ActivityType, Placement};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Activity row as the admin REST API returns it. Placement fields sit flat on the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(rename = "typeId", default)]
    pub type_id: Option<i64>,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "durationMinutes", default)]
    pub duration_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityTypeRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Body of the placement PATCH. `startTime: null` unschedules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacementUpdateRecord {
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: u32,
}

pub fn decode_activity(record: ActivityRecord) -> Activity {
    let start_time = record
        .start_time
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| match LocalTimestamp::parse(value) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                debug!(activity_id = record.id, %error, "ignoring unparsable startTime");
                None
            }
        });
    let duration_minutes = record
        .duration_minutes
        .filter(|minutes| minutes.is_finite() && *minutes >= 0.0)
        .map(|minutes| minutes.round().min(u32::MAX as f64) as u32);

    let placement = if start_time.is_none() && duration_minutes.is_none() {
        None
    } else {
        Some(Placement {
            start_time,
            duration_minutes,
        })
    };

    Activity {
        id: ActivityId(record.id),
        name: record.name.map(|value| value.trim().to_string()).unwrap_or_default(),
        description: non_blank(record.description),
        topic: non_blank(record.topic),
        type_id: record.type_id,
        placement,
    }
}

pub fn decode_activity_type(record: ActivityTypeRecord) -> ActivityType {
    ActivityType {
        id: record.id,
        name: record
            .name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("type-{}", record.id)),
        color: non_blank(record.color),
    }
}

pub fn encode_placement_update(placement: &Placement, default_minutes: u32) -> PlacementUpdateRecord {
    PlacementUpdateRecord {
        start_time: placement.start_time.map(|value| value.to_string()),
        duration_minutes: placement.duration_minutes.unwrap_or(default_minutes),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
