/// Externally visible result of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Processing ran; `delivered` is false when the converter produced nothing.
    Accepted { delivered: bool },
    /// One or more of `link`/`html`/`title` was empty.
    MissingContent { fields: Vec<&'static str> },
    /// The URL is already in the dedup ledger.
    AlreadyReported,
    /// Request or service configuration is unusable.
    Rejected(String),
    /// Staging, conversion, delivery or the ledger failed.
    Failed(String),
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }
}
