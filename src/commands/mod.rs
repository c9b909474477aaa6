//! Workflows behind the CLI commands. Each returns the JSON to print.

pub mod auth;
pub mod dlg;
pub mod job;
pub mod locale;
pub mod nlu;
pub mod project;
pub mod sys;
