//! Dockyard protocol types
//!
//! This crate defines the resources exchanged over the platform API, the
//! backend error taxonomy, and the [`Backend`] contract every front door
//! calls into.

pub mod backend;
pub mod errors;
pub mod resources;

pub use backend::{Backend, BackendResult};
pub use errors::{BackendError, ValidationError};
pub use resources::{
    AccessToken, App, ConfigPatch, ConfigVars, Deploy, Dyno, DynoRelease, Formation,
    FormationUpdate, Release, ReleaseUser, SlugRef, User, Version,
};

/// Version of the platform API spoken by the front doors
pub const API_VERSION: u32 = 3;
