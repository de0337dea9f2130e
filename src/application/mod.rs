pub mod activity_store;
pub mod bootstrap;
pub mod commands;
pub mod drag_source;
pub mod placement_engine;
pub mod removal_flow;
