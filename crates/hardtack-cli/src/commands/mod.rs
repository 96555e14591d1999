//! CLI command handlers

pub mod agent;
pub mod recipe;
pub mod search;
pub mod status;
pub mod tools;
