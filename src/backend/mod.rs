//! Profile backend — the hosted service that owns profiles, usernames, and
//! onboarding completion.

pub mod memory;
pub mod rest;
pub mod traits;

pub use memory::InMemoryBackend;
pub use rest::RestBackend;
pub use traits::{CompletionError, CompletionResponse, ProfileBackend, ProfileStatus};
