//! The per-project sandbox container.
//!
//! Container state is never tracked locally: every operation asks the
//! engine what exists, then issues the commands needed to reach the
//! requested state.

mod env;
mod error;
mod image;
mod lifecycle;
mod mounts;

pub use error::SandboxError;
pub(crate) use lifecycle::{down_target, ContainerState, Controller, SandboxInfo};
