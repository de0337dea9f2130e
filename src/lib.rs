pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    confirm_and_remove_impl, handle_calendar_signal_impl, list_pool_impl, list_scheduled_impl,
    load_activities_impl, request_removal_impl, resolve_removal_impl,
};
use serde::Serialize;
use std::path::PathBuf;

pub use application::activity_store::{ActivitySnapshot, ActivityStore, LoadSummary};
pub use application::commands::{
    AppState, Collaborators, LoadActivitiesResponse, RemovalPromptResponse, RemovalResponse,
    RemovalStatus, SignalResponse,
};
pub use application::drag_source::{DragRegistration, DragSourceAdapter};
pub use application::placement_engine::{PendingWrite, PlacementEngine, WriteOutcome};
pub use application::removal_flow::{RemovalFlow, RemovalOutcome, RemovalState};
pub use domain::local_time::{LocalTimestamp, decode, encode};
pub use domain::models::{Activity, ActivityId, ActivityType, Placement, ScheduleState, Transition};
pub use infrastructure::calendar_surface::{CalendarSurface, DraggableItem};
pub use infrastructure::error::InfraError;
pub use infrastructure::signal_mapper::{CalendarEntry, SurfaceSignal};

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub workspace_root: String,
    pub config_dir: String,
    pub logs_dir: String,
}

pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        config_dir: result.config_dir.display().to_string(),
        logs_dir: result.logs_dir.display().to_string(),
    })
}

pub async fn load_activities(state: &AppState) -> Result<LoadActivitiesResponse, String> {
    load_activities_impl(state)
        .await
        .map_err(|error| state.command_error("load_activities", &error))
}

pub fn list_pool(state: &AppState) -> Result<Vec<DraggableItem>, String> {
    list_pool_impl(state).map_err(|error| state.command_error("list_pool", &error))
}

pub fn list_scheduled(state: &AppState) -> Result<Vec<CalendarEntry>, String> {
    list_scheduled_impl(state).map_err(|error| state.command_error("list_scheduled", &error))
}

pub async fn handle_calendar_signal(
    state: &AppState,
    signal: SurfaceSignal,
) -> Result<SignalResponse, String> {
    handle_calendar_signal_impl(state, signal)
        .await
        .map_err(|error| state.command_error("handle_calendar_signal", &error))
}

pub fn request_removal(
    state: &AppState,
    activity_id: i64,
    title: Option<String>,
) -> Result<RemovalPromptResponse, String> {
    request_removal_impl(state, activity_id, title)
        .map_err(|error| state.command_error("request_removal", &error))
}

pub async fn resolve_removal(state: &AppState, confirmed: bool) -> Result<RemovalResponse, String> {
    resolve_removal_impl(state, confirmed)
        .await
        .map_err(|error| state.command_error("resolve_removal", &error))
}

pub async fn confirm_and_remove(
    state: &AppState,
    activity_id: i64,
    title: Option<String>,
) -> Result<RemovalResponse, String> {
    confirm_and_remove_impl(state, activity_id, title)
        .await
        .map_err(|error| state.command_error("confirm_and_remove", &error))
}
