//! anihub — onboarding core for the anime/manga streaming front-end.

pub mod backend;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod server;
