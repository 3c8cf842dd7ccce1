use crate::IngestOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Query the dedup ledger and record the URL when it is new.
    CheckAndRecord { url: String },
    /// Write the page to the scratch directory.
    StageContent { title: String, html: String },
    Convert,
    Deliver,
    /// Remove the staged source and converter output.
    Cleanup,
    /// The run is over; report this to the caller.
    Finish(IngestOutcome),
}
