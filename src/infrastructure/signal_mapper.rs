use crate::domain::local_time::{self, LocalTimestamp};
use crate::domain::models::{
    Activity, ActivityId, ActivityType, Transition, rounded_duration_minutes,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Duration, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const KEY_ACTIVITY_ID: &str = "activityId";
const KEY_TYPE_ID: &str = "typeId";
const KEY_TITLE: &str = "title";

/// Element attributes the widget copies off a dragged pool item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DraggedElement {
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

/// Calendar event as the widget hands it back in move/resize/click callbacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SurfaceEvent {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(rename = "extendedProps", default)]
    pub extended_props: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceSignal {
    /// A pool item landed on the grid.
    Drop {
        date: String,
        #[serde(rename = "draggedEl", default)]
        dragged: DraggedElement,
    },
    EventDrop {
        event: SurfaceEvent,
    },
    EventResize {
        event: SurfaceEvent,
    },
    EventClick {
        event: SurfaceEvent,
    },
}

impl SurfaceSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop { .. } => "drop",
            Self::EventDrop { .. } => "event_drop",
            Self::EventResize { .. } => "event_resize",
            Self::EventClick { .. } => "event_click",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalIntent {
    Transition(Transition),
    RemovalRequested {
        activity_id: ActivityId,
        title: String,
    },
}

/// Scheduled activity in the shape the widget renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub extended_props: HashMap<String, serde_json::Value>,
}

pub fn decode_signal<Tz: TimeZone>(signal: &SurfaceSignal, zone: &Tz) -> Result<SignalIntent, InfraError> {
    match signal {
        SurfaceSignal::Drop { date, dragged } => {
            let activity_id = dragged
                .data
                .get(KEY_ACTIVITY_ID)
                .map(parse_activity_id)
                .transpose()?
                .ok_or_else(|| {
                    InfraError::InvalidSignal("drop payload carries no activityId".to_string())
                })?;
            let start = parse_surface_date(date, zone, "drop.date")?;
            Ok(SignalIntent::Transition(Transition::Assign {
                activity_id,
                start_time: local_time::encode(&start),
            }))
        }
        SurfaceSignal::EventDrop { event } => {
            let activity_id = event_activity_id(event)?;
            let start = required_date(event.start.as_deref(), zone, "event.start")?;
            Ok(SignalIntent::Transition(Transition::Move {
                activity_id,
                start_time: local_time::encode(&start),
            }))
        }
        SurfaceSignal::EventResize { event } => {
            let activity_id = event_activity_id(event)?;
            let start = required_date(event.start.as_deref(), zone, "event.start")?;
            let end = required_date(event.end.as_deref(), zone, "event.end")?;
            let elapsed = end.signed_duration_since(start).num_milliseconds();
            Ok(SignalIntent::Transition(Transition::Resize {
                activity_id,
                duration_minutes: rounded_duration_minutes(elapsed),
            }))
        }
        SurfaceSignal::EventClick { event } => {
            let activity_id = event_activity_id(event)?;
            let title = event
                .title
                .as_deref()
                .or_else(|| {
                    event
                        .extended_props
                        .get(KEY_TITLE)
                        .and_then(serde_json::Value::as_str)
                })
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or("this activity")
                .to_string();
            Ok(SignalIntent::RemovalRequested { activity_id, title })
        }
    }
}

pub fn encode_calendar_entry<Tz: TimeZone>(
    activity: &Activity,
    activity_type: Option<&ActivityType>,
    zone: &Tz,
    default_minutes: u32,
) -> Result<Option<CalendarEntry>, InfraError>
where
    Tz::Offset: std::fmt::Display,
{
    let Some(start_time) = activity.scheduled_start() else {
        return Ok(None);
    };
    let start = local_time::decode(&start_time, zone)?;
    let minutes = activity
        .placement
        .as_ref()
        .and_then(|placement| placement.duration_minutes)
        .unwrap_or(default_minutes);
    let end = start.clone() + Duration::minutes(i64::from(minutes));

    let mut extended_props = HashMap::new();
    extended_props.insert(KEY_ACTIVITY_ID.to_string(), serde_json::json!(activity.id.0));
    if let Some(type_id) = activity.type_id {
        extended_props.insert(KEY_TYPE_ID.to_string(), serde_json::json!(type_id));
    }

    Ok(Some(CalendarEntry {
        id: activity.id.to_string(),
        title: activity.display_title().to_string(),
        start: start.to_rfc3339(),
        end: end.to_rfc3339(),
        color: activity_type.and_then(|value| value.color.clone()),
        extended_props,
    }))
}

fn event_activity_id(event: &SurfaceEvent) -> Result<ActivityId, InfraError> {
    event
        .extended_props
        .get(KEY_ACTIVITY_ID)
        .or(event.id.as_ref())
        .map(parse_activity_id)
        .transpose()?
        .ok_or_else(|| InfraError::InvalidSignal("event carries no activityId".to_string()))
}

fn parse_activity_id(value: &serde_json::Value) -> Result<ActivityId, InfraError> {
    match value {
        serde_json::Value::Number(number) => number.as_i64().map(ActivityId).ok_or_else(|| {
            InfraError::InvalidSignal(format!("activityId {number} is not an integer"))
        }),
        serde_json::Value::String(raw) => raw.trim().parse::<i64>().map(ActivityId).map_err(|error| {
            InfraError::InvalidSignal(format!("invalid activityId '{raw}': {error}"))
        }),
        other => Err(InfraError::InvalidSignal(format!(
            "activityId must be a number or string, got {other}"
        ))),
    }
}

fn required_date<Tz: TimeZone>(
    value: Option<&str>,
    zone: &Tz,
    field_name: &str,
) -> Result<DateTime<Tz>, InfraError> {
    let value = value.ok_or_else(|| InfraError::InvalidSignal(format!("{field_name} is missing")))?;
    parse_surface_date(value, zone, field_name)
}

/// Offset-carrying dates are viewed in `zone`; bare wall-clock strings already are.
fn parse_surface_date<Tz: TimeZone>(
    value: &str,
    zone: &Tz,
    field_name: &str,
) -> Result<DateTime<Tz>, InfraError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(zone));
    }
    let wall_clock = LocalTimestamp::parse(trimmed)
        .map_err(|error| InfraError::InvalidSignal(format!("invalid {field_name}: {error}")))?;
    local_time::decode(&wall_clock, zone)
}
