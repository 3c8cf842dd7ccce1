//! ToKindle core: pure ingestion state machine and request validation.
mod effect;
mod msg;
mod outcome;
mod request;
mod state;
mod update;

pub use effect::Effect;
pub use msg::Msg;
pub use outcome::IngestOutcome;
pub use request::{parse_resend_flag, IngestRequest, ParseFlagError};
pub use state::{RunStage, RunState};
pub use update::{update, STORE_SETTINGS_MISSING};
