//! Client core for the Mix conversational AI platform API
//!
//! Token lifecycle management for every API call, plus polling and waiting
//! on the long-running jobs that model builds, imports and training start.

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod job;
pub mod session;
