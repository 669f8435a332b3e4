pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{NexusError, NexusResult};
pub use types::{Event, EventScope, Project, TrackedUser};
