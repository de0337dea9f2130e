use crate::application::placement_engine::{PendingWrite, PlacementEngine};
use crate::domain::models::{ActivityId, Transition};
use crate::infrastructure::activity_client::ActivityBackend;
use crate::infrastructure::calendar_surface::CalendarSurface;
use crate::infrastructure::notifier::Notifier;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemovalState {
    #[default]
    Idle,
    PendingConfirmation {
        activity_id: ActivityId,
        title: String,
    },
}

#[derive(Debug)]
pub enum RemovalOutcome {
    /// Resolved while nothing was pending.
    NothingPending,
    Cancelled {
        activity_id: ActivityId,
    },
    Removed {
        activity_id: ActivityId,
        write: Option<PendingWrite>,
    },
}

/// Two-step removal of an activity from the calendar.
#[derive(Debug, Default)]
pub struct RemovalFlow {
    state: RemovalState,
}

pub fn confirmation_message(title: &str) -> String {
    format!("Remove '{title}' from the calendar?")
}

impl RemovalFlow {
    pub fn state(&self) -> &RemovalState {
        &self.state
    }

    /// Enters `PendingConfirmation`, replacing any earlier pending request.
    /// Returns the message to show in the prompt.
    pub fn request(&mut self, activity_id: ActivityId, title: impl Into<String>) -> String {
        let title = title.into();
        if let RemovalState::PendingConfirmation {
            activity_id: previous,
            ..
        } = &self.state
        {
            debug!(%previous, "replacing pending removal request");
        }
        let message = confirmation_message(&title);
        self.state = RemovalState::PendingConfirmation { activity_id, title };
        message
    }

    pub fn resolve<B, N, S>(
        &mut self,
        confirmed: bool,
        engine: &mut PlacementEngine<B, N>,
        surface: &S,
    ) -> RemovalOutcome
    where
        B: ActivityBackend + ?Sized + 'static,
        N: Notifier + ?Sized + 'static,
        S: CalendarSurface + ?Sized,
    {
        let RemovalState::PendingConfirmation { activity_id, .. } = std::mem::take(&mut self.state) else {
            return RemovalOutcome::NothingPending;
        };
        if !confirmed {
            info!(%activity_id, "removal cancelled");
            return RemovalOutcome::Cancelled { activity_id };
        }

        let write = engine.apply(Transition::Unassign { activity_id });
        surface.remove_event(activity_id);
        RemovalOutcome::Removed { activity_id, write }
    }
}
