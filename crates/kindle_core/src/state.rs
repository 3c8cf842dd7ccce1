use crate::IngestRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStage {
    #[default]
    Received,
    Validated,
    DedupChecked,
    Staged,
    Converted,
    Delivered,
    CleanedUp,
    Rejected,
    AlreadyDelivered,
    Failed,
}

impl RunStage {
    /// No further message changes a terminal run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStage::Rejected | RunStage::AlreadyDelivered | RunStage::CleanedUp
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    stage: RunStage,
    pending: Option<IngestRequest>,
    staging_started: bool,
    delivered: bool,
    failure: Option<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn delivered(&self) -> bool {
        self.delivered
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub(crate) fn set_stage(&mut self, stage: RunStage) {
        self.stage = stage;
    }

    pub(crate) fn hold(&mut self, request: IngestRequest) {
        self.pending = Some(request);
    }

    /// Takes the held request and marks staging as started.
    pub(crate) fn start_staging(&mut self) -> Option<IngestRequest> {
        self.staging_started = true;
        self.pending.take()
    }

    pub(crate) fn staging_started(&self) -> bool {
        self.staging_started
    }

    pub(crate) fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.stage = RunStage::Failed;
        self.failure = Some(message);
    }
}
