use crate::application::activity_store::fetch_snapshot;
use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::application::drag_source::{DragSourceAdapter, draggable_item};
use crate::application::placement_engine::{PendingWrite, PlacementEngine};
use crate::application::removal_flow::{RemovalFlow, RemovalOutcome};
use crate::domain::models::{Activity, ActivityId};
use crate::infrastructure::activity_client::{ActivityBackend, ReqwestActivityBackend};
use crate::infrastructure::calendar_surface::{
    CalendarSurface, DraggableItem, InMemoryCalendarSurface,
};
use crate::infrastructure::config::SchedulerConfig;
use crate::infrastructure::confirmation::{ConfirmationPrompt, StaticConfirmation};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::notifier::{Notifier, TracingNotifier};
use crate::infrastructure::signal_mapper::{
    CalendarEntry, SignalIntent, SurfaceSignal, decode_signal,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const UNTITLED_REMOVAL_TARGET: &str = "this activity";

type Engine = PlacementEngine<dyn ActivityBackend, dyn Notifier>;

/// Host-provided implementations of the outer capabilities.
pub struct Collaborators {
    pub backend: Arc<dyn ActivityBackend>,
    pub notifier: Arc<dyn Notifier>,
    pub surface: Arc<dyn CalendarSurface>,
    pub prompt: Arc<dyn ConfirmationPrompt>,
}

pub struct AppState {
    config: SchedulerConfig,
    config_dir: PathBuf,
    logs_dir: PathBuf,
    engine: Mutex<Engine>,
    drag_source: Mutex<DragSourceAdapter<dyn CalendarSurface>>,
    removal: Mutex<RemovalFlow>,
    surface: Arc<dyn CalendarSurface>,
    prompt: Arc<dyn ConfirmationPrompt>,
    _log_guard: Option<WorkerGuard>,
}

impl AppState {
    /// Bootstraps `workspace_root`, installs file logging and talks to the configured API.
    ///
    /// Without a host UI the surface only records commands and every removal prompt is
    /// declined.
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let log_guard = init_logging(&bootstrap.logs_dir, &bootstrap.config.log_level)?;
        let backend = ReqwestActivityBackend::new(&bootstrap.config.api_base_url)?;

        let mut state = Self::with_collaborators(
            bootstrap,
            Collaborators {
                backend: Arc::new(backend),
                notifier: Arc::new(TracingNotifier),
                surface: Arc::new(InMemoryCalendarSurface::default()),
                prompt: Arc::new(StaticConfirmation::always(false)),
            },
        );
        state._log_guard = Some(log_guard);
        info!(
            workspace_root = %workspace_root.display(),
            api_base_url = %state.config.api_base_url,
            display_timezone = %state.config.display_timezone,
            "scheduler state initialized"
        );
        Ok(state)
    }

    pub fn with_collaborators(bootstrap: BootstrapResult, collaborators: Collaborators) -> Self {
        let config = bootstrap.config;
        let engine = PlacementEngine::from_config(&config, collaborators.backend, collaborators.notifier);
        let drag_source = DragSourceAdapter::new(
            Arc::clone(&collaborators.surface),
            config.default_duration_minutes,
        );
        Self {
            config,
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            engine: Mutex::new(engine),
            drag_source: Mutex::new(drag_source),
            removal: Mutex::new(RemovalFlow::default()),
            surface: collaborators.surface,
            prompt: collaborators.prompt,
            _log_guard: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        error!(command, "{message}");
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadActivitiesResponse {
    pub scheduled: Vec<CalendarEntry>,
    pub pool: Vec<DraggableItem>,
    pub activity_types: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovalPromptResponse {
    pub activity_id: ActivityId,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignalResponse {
    pub signal: &'static str,
    pub transition: Option<&'static str>,
    pub activity_id: ActivityId,
    /// Whether the local views changed.
    pub applied: bool,
    /// `None` when no remote write was issued.
    pub persisted: Option<bool>,
    pub removal: Option<RemovalPromptResponse>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStatus {
    NothingPending,
    Cancelled,
    Removed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    pub status: RemovalStatus,
    pub activity_id: Option<ActivityId>,
    pub persisted: Option<bool>,
}

pub async fn load_activities_impl(state: &AppState) -> Result<LoadActivitiesResponse, InfraError> {
    let (backend, retry_policy) = {
        let engine = lock_engine(state)?;
        (engine.backend(), engine.retry_policy())
    };
    let fetched = fetch_snapshot(backend.as_ref(), retry_policy).await;
    let summary = {
        let mut engine = lock_engine(state)?;
        engine.store_mut().apply_load_result(fetched)?
    };

    let pool = refresh_pool(state)?;
    let scheduled = list_scheduled_impl(state)?;
    state.log_info(
        "load_activities",
        &format!(
            "loaded scheduled={} unscheduled={} activity_types={}",
            summary.scheduled, summary.unscheduled, summary.activity_types
        ),
    );
    Ok(LoadActivitiesResponse {
        scheduled,
        pool,
        activity_types: summary.activity_types,
    })
}

pub fn list_pool_impl(state: &AppState) -> Result<Vec<DraggableItem>, InfraError> {
    let engine = lock_engine(state)?;
    let default_minutes = engine.store().default_duration_minutes();
    Ok(engine
        .store()
        .unscheduled()
        .into_iter()
        .map(|activity| draggable_item(activity, default_minutes))
        .collect())
}

pub fn list_scheduled_impl(state: &AppState) -> Result<Vec<CalendarEntry>, InfraError> {
    let engine = lock_engine(state)?;
    Ok(engine.store().calendar_entries(&state.config.display_timezone))
}

/// Routes one widget callback. Malformed payloads are rejected; everything past decoding is
/// reported through the response instead of an error.
pub async fn handle_calendar_signal_impl(
    state: &AppState,
    signal: SurfaceSignal,
) -> Result<SignalResponse, InfraError> {
    let intent = decode_signal(&signal, &state.config.display_timezone)?;
    match intent {
        SignalIntent::Transition(transition) => {
            let pending = {
                let mut engine = lock_engine(state)?;
                engine.apply(transition)
            };
            let applied = pending.is_some();
            if applied {
                refresh_pool(state)?;
            }
            let persisted = match pending {
                Some(write) => Some(settle_write(state, write).await?),
                None => None,
            };
            Ok(SignalResponse {
                signal: signal.as_str(),
                transition: Some(transition.as_str()),
                activity_id: transition.activity_id(),
                applied,
                persisted,
                removal: None,
            })
        }
        SignalIntent::RemovalRequested { activity_id, title } => {
            let removal = request_removal_impl(state, activity_id.0, Some(title))?;
            Ok(SignalResponse {
                signal: signal.as_str(),
                transition: None,
                activity_id,
                applied: false,
                persisted: None,
                removal: Some(removal),
            })
        }
    }
}

pub fn request_removal_impl(
    state: &AppState,
    activity_id: i64,
    title: Option<String>,
) -> Result<RemovalPromptResponse, InfraError> {
    let activity_id = ActivityId(activity_id);
    let title = match title.map(|value| value.trim().to_string()).filter(|value| !value.is_empty()) {
        Some(title) => title,
        None => {
            let engine = lock_engine(state)?;
            engine
                .store()
                .get(activity_id)
                .map(Activity::display_title)
                .unwrap_or(UNTITLED_REMOVAL_TARGET)
                .to_string()
        }
    };

    let message = {
        let mut removal = lock_removal(state)?;
        removal.request(activity_id, title.clone())
    };
    state.log_info(
        "request_removal",
        &format!("removal pending activity_id={activity_id}"),
    );
    Ok(RemovalPromptResponse {
        activity_id,
        title,
        message,
    })
}

pub async fn resolve_removal_impl(
    state: &AppState,
    confirmed: bool,
) -> Result<RemovalResponse, InfraError> {
    let outcome = {
        let mut removal = lock_removal(state)?;
        let mut engine = lock_engine(state)?;
        removal.resolve(confirmed, &mut *engine, state.surface.as_ref())
    };

    match outcome {
        RemovalOutcome::NothingPending => Ok(RemovalResponse {
            status: RemovalStatus::NothingPending,
            activity_id: None,
            persisted: None,
        }),
        RemovalOutcome::Cancelled { activity_id } => Ok(RemovalResponse {
            status: RemovalStatus::Cancelled,
            activity_id: Some(activity_id),
            persisted: None,
        }),
        RemovalOutcome::Removed { activity_id, write } => {
            refresh_pool(state)?;
            let persisted = match write {
                Some(write) => Some(settle_write(state, write).await?),
                None => None,
            };
            state.log_info(
                "resolve_removal",
                &format!("removed activity_id={activity_id} persisted={persisted:?}"),
            );
            Ok(RemovalResponse {
                status: RemovalStatus::Removed,
                activity_id: Some(activity_id),
                persisted,
            })
        }
    }
}

/// Requests removal, asks the configured prompt and resolves with its answer.
pub async fn confirm_and_remove_impl(
    state: &AppState,
    activity_id: i64,
    title: Option<String>,
) -> Result<RemovalResponse, InfraError> {
    let request = request_removal_impl(state, activity_id, title)?;
    let confirmed = state.prompt.open(&request.message).await;
    resolve_removal_impl(state, confirmed).await
}

/// Runs a write to completion and applies the failure policy. Returns whether it persisted.
async fn settle_write(state: &AppState, write: PendingWrite) -> Result<bool, InfraError> {
    let outcome = write.await;
    let reload_from = {
        let engine = lock_engine(state)?;
        engine
            .needs_reload(&outcome)
            .then(|| (engine.backend(), engine.retry_policy()))
    };
    if let Some((backend, retry_policy)) = reload_from {
        info!(activity_id = %outcome.activity_id, "reloading after failed write");
        let fetched = fetch_snapshot(backend.as_ref(), retry_policy).await;
        let reloaded = {
            let mut engine = lock_engine(state)?;
            engine.store_mut().apply_load_result(fetched)
        };
        match reloaded {
            Ok(_) => {
                refresh_pool(state)?;
            }
            Err(error) => warn!(%error, "reload after failed write did not complete"),
        }
    }
    Ok(outcome.is_success())
}

fn refresh_pool(state: &AppState) -> Result<Vec<DraggableItem>, InfraError> {
    let pool: Vec<Activity> = {
        let engine = lock_engine(state)?;
        engine.store().unscheduled().into_iter().cloned().collect()
    };
    let mut drag_source = lock(&state.drag_source, "drag source")?;
    Ok(drag_source.initialize(&pool).to_vec())
}

fn lock_engine(state: &AppState) -> Result<MutexGuard<'_, Engine>, InfraError> {
    lock(&state.engine, "engine")
}

fn lock_removal(state: &AppState) -> Result<MutexGuard<'_, RemovalFlow>, InfraError> {
    lock(&state.removal, "removal")
}

fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, InfraError> {
    mutex
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("{name} lock poisoned: {error}")))
}
