//! ToKindle engine: ledger, staging, conversion and delivery behind the core state machine.
mod config;
mod convert;
mod deliver;
mod filename;
mod persist;
mod pipeline;
mod staging;
mod store;
mod types;

pub use config::{
    ConverterSettings, EngineConfig, LedgerSettings, MailSettings, DEFAULT_CONVERTER,
    DEFAULT_OUTPUT_EXTENSION, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, MAIL_BODY, MAIL_SUBJECT,
};
pub use convert::{filter_diagnostics, ConvertError, ExternalConverter, PackageConverter, BENIGN_WARNING};
pub use deliver::{build_message, Deliverer, DeliveryError, MailCredentials, SmtpDeliverer};
pub use filename::sanitize_file_name;
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, RunId};
pub use staging::{StagingArea, StagingError};
pub use store::{FileLedger, LedgerError, MemoryLedger, UrlLedger, UrlRecord, COLLECTION_ID, DATABASE_ID};
pub use types::{ConversionOutcome, StagedJob};
