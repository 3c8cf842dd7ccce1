use crate::IngestRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A request arrived. `store_configured` is false when the dedup store settings are absent.
    Submitted {
        request: IngestRequest,
        store_configured: bool,
    },
    /// Result of the ledger check-and-record.
    DedupChecked { seen: bool },
    /// Source file written.
    Staged,
    /// Converter finished; success is judged by output presence only.
    Converted { output_exists: bool },
    /// Attachment sent.
    Delivered,
    /// Any step failed with the given message.
    StepFailed { message: String },
    /// Scratch files removed (best-effort).
    CleanedUp,
}
