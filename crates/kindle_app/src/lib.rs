//! ToKindle app: HTTP front door and process start-up.
pub mod logging;
pub mod server;
