#![warn(clippy::unwrap_used)]

pub mod auth;
pub mod error;
pub mod rest;
pub mod retention_rest;
pub mod server;
pub mod swagger;

pub use auth::{SessionResolver, StaticSessions};
pub use server::ApiServer;
pub use swagger::ApiDoc;
