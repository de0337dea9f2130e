use crate::domain::local_time::LocalTimestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DURATION_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub i64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ActivityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub start_time: Option<LocalTimestamp>,
    pub duration_minutes: Option<u32>,
}

impl Placement {
    pub fn scheduled(start_time: LocalTimestamp, duration_minutes: u32) -> Self {
        Self {
            start_time: Some(start_time),
            duration_minutes: Some(duration_minutes),
        }
    }

    /// Keeps the duration so a later drag from the pool reuses it.
    pub fn unscheduled(duration_minutes: Option<u32>) -> Self {
        Self {
            start_time: None,
            duration_minutes,
        }
    }

    pub fn valid_start(&self) -> Option<LocalTimestamp> {
        self.start_time.filter(LocalTimestamp::is_after_epoch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub type_id: Option<i64>,
    pub placement: Option<Placement>,
}

impl Activity {
    pub fn scheduled_start(&self) -> Option<LocalTimestamp> {
        self.placement.as_ref().and_then(Placement::valid_start)
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start().is_some()
    }

    /// Last duration the backend or a transition recorded, if it is usable.
    pub fn last_known_duration(&self) -> Option<u32> {
        self.placement
            .as_ref()
            .and_then(|placement| placement.duration_minutes)
            .filter(|minutes| *minutes > 0)
    }

    pub fn effective_duration_minutes(&self, default_minutes: u32) -> u32 {
        self.last_known_duration().unwrap_or(default_minutes)
    }

    pub fn schedule_state(&self, default_minutes: u32) -> ScheduleState {
        match self.scheduled_start() {
            Some(start_time) => ScheduleState::Scheduled {
                start_time,
                duration_minutes: self
                    .placement
                    .as_ref()
                    .and_then(|placement| placement.duration_minutes)
                    .unwrap_or(default_minutes),
            },
            None => ScheduleState::Unscheduled,
        }
    }

    pub fn display_title(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Untitled activity"
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Unscheduled,
    Scheduled {
        start_time: LocalTimestamp,
        duration_minutes: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityType {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Assign {
        activity_id: ActivityId,
        start_time: LocalTimestamp,
    },
    Move {
        activity_id: ActivityId,
        start_time: LocalTimestamp,
    },
    Resize {
        activity_id: ActivityId,
        duration_minutes: u32,
    },
    Unassign {
        activity_id: ActivityId,
    },
}

impl Transition {
    pub fn activity_id(&self) -> ActivityId {
        match self {
            Self::Assign { activity_id, .. }
            | Self::Move { activity_id, .. }
            | Self::Resize { activity_id, .. }
            | Self::Unassign { activity_id } => *activity_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Move { .. } => "move",
            Self::Resize { .. } => "resize",
            Self::Unassign { .. } => "unassign",
        }
    }
}

/// Whole minutes between two instants, rounded to nearest and never negative.
pub fn rounded_duration_minutes(elapsed_milliseconds: i64) -> u32 {
    let minutes = (elapsed_milliseconds as f64 / 60_000.0).round();
    if minutes <= 0.0 {
        0
    } else if minutes >= u32::MAX as f64 {
        u32::MAX
    } else {
        minutes as u32
    }
}

/// `HH:mm` for a minute count; hours are not wrapped at 24.
pub fn format_duration_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
