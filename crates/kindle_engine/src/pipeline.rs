use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use kindle_core::{update, Effect, IngestOutcome, IngestRequest, Msg, RunState};

use crate::config::EngineConfig;
use crate::convert::{ExternalConverter, PackageConverter};
use crate::deliver::{Deliverer, SmtpDeliverer};
use crate::staging::StagingArea;
use crate::store::{FileLedger, LedgerError, UrlLedger};
use crate::StagedJob;

pub type RunId = u64;

/// Executes the effects of the core state machine against the real collaborators.
pub struct Pipeline {
    ledger: Option<Arc<dyn UrlLedger>>,
    staging: StagingArea,
    converter: Arc<dyn PackageConverter>,
    deliverer: Arc<dyn Deliverer>,
    next_run: AtomicU64,
}

impl Pipeline {
    /// `ledger` is `None` when the store is not configured; every request is then rejected.
    pub fn new(
        ledger: Option<Arc<dyn UrlLedger>>,
        staging: StagingArea,
        converter: Arc<dyn PackageConverter>,
        deliverer: Arc<dyn Deliverer>,
    ) -> Self {
        Self {
            ledger,
            staging,
            converter,
            deliverer,
            next_run: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, LedgerError> {
        let ledger = match &config.ledger {
            Some(settings) => {
                let ledger = FileLedger::from_settings(settings)?;
                engine_info!(
                    "Dedup ledger at {:?} (auto-provision: {})",
                    ledger.collection_path(),
                    settings.create_database
                );
                Some(Arc::new(ledger) as Arc<dyn UrlLedger>)
            }
            None => {
                engine_warn!("CreateDatabase/CosmosDBConnection not set; requests will be rejected");
                None
            }
        };

        Ok(Self::new(
            ledger,
            StagingArea::new(
                config.scratch_dir.clone(),
                config.converter.output_extension.clone(),
            ),
            Arc::new(ExternalConverter::from_settings(&config.converter)),
            Arc::new(SmtpDeliverer::new(config.mail.clone())),
        ))
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Runs one request to completion and returns what the caller should see.
    pub async fn process(&self, request: IngestRequest) -> IngestOutcome {
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        engine_info!(
            "run={} received url={} title_len={} html_len={} force_resend={}",
            run_id,
            request.url,
            request.title.len(),
            request.html.len(),
            request.force_resend
        );

        let (mut state, effects) = update(
            RunState::new(),
            Msg::Submitted {
                request,
                store_configured: self.ledger.is_some(),
            },
        );
        let mut queue: VecDeque<Effect> = effects.into();
        let mut job = StagedFiles::new(&self.staging, run_id);

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::Finish(outcome) => {
                    engine_info!(
                        "run={} finished at {:?}: {:?}",
                        run_id,
                        state.stage(),
                        outcome
                    );
                    return outcome;
                }
                Effect::CheckAndRecord { url } => self.check_and_record(run_id, &url).await,
                Effect::StageContent { title, html } => {
                    self.stage(run_id, title, html, &mut job).await
                }
                Effect::Convert => self.convert(run_id, job.get()).await,
                Effect::Deliver => self.deliver(run_id, job.get()).await,
                Effect::Cleanup => {
                    job.clean();
                    Msg::CleanedUp
                }
            };
            let (next, effects) = update(state, msg);
            state = next;
            queue.extend(effects);
        }

        engine_warn!("run={} stopped at {:?} without an outcome", run_id, state.stage());
        IngestOutcome::Failed(format!("run stopped at {:?}", state.stage()))
    }

    async fn check_and_record(&self, run_id: RunId, url: &str) -> Msg {
        let Some(ledger) = self.ledger.as_ref() else {
            return failed(run_id, "dedup ledger is not configured");
        };
        match ledger.check_and_record(url).await {
            Ok(seen) => {
                engine_debug!("run={} dedup seen={}", run_id, seen);
                Msg::DedupChecked { seen }
            }
            Err(err) => failed(run_id, err),
        }
    }

    async fn stage(
        &self,
        run_id: RunId,
        title: String,
        html: String,
        job: &mut StagedFiles<'_>,
    ) -> Msg {
        // Known before writing so a partial write is still cleaned up.
        job.set(self.staging.job_for(&title));
        let staging = self.staging.clone();
        let written = tokio::task::spawn_blocking(move || staging.stage(&title, &html)).await;
        match written {
            Ok(Ok(staged)) => {
                job.set(staged);
                Msg::Staged
            }
            Ok(Err(err)) => failed(run_id, err),
            Err(err) => failed(run_id, err),
        }
    }

    async fn convert(&self, run_id: RunId, job: Option<&StagedJob>) -> Msg {
        let Some(staged) = job else {
            return failed(run_id, "nothing staged to convert");
        };
        match self.converter.convert(staged).await {
            Ok(outcome) => {
                for line in &outcome.diagnostics {
                    engine_info!("run={} converter: {}", run_id, line);
                }
                if !outcome.output_exists {
                    engine_warn!(
                        "run={} converter produced no {:?}; skipping delivery",
                        run_id,
                        staged.output_path
                    );
                }
                Msg::Converted {
                    output_exists: outcome.output_exists,
                }
            }
            Err(err) => failed(run_id, err),
        }
    }

    async fn deliver(&self, run_id: RunId, job: Option<&StagedJob>) -> Msg {
        let Some(staged) = job else {
            return failed(run_id, "nothing staged to deliver");
        };
        match self.deliverer.deliver(&staged.output_path).await {
            Ok(()) => Msg::Delivered,
            Err(err) => failed(run_id, err),
        }
    }
}

fn failed(run_id: RunId, err: impl std::fmt::Display) -> Msg {
    let message = err.to_string();
    engine_warn!("run={} failed: {}", run_id, message);
    Msg::StepFailed { message }
}

/// Scratch files of one run. Removed on drop if the run never reached its
/// cleanup step, e.g. when the caller stops awaiting `process`.
struct StagedFiles<'a> {
    staging: &'a StagingArea,
    run_id: RunId,
    job: Option<StagedJob>,
}

impl<'a> StagedFiles<'a> {
    fn new(staging: &'a StagingArea, run_id: RunId) -> Self {
        Self {
            staging,
            run_id,
            job: None,
        }
    }

    fn set(&mut self, job: StagedJob) {
        self.job = Some(job);
    }

    fn get(&self) -> Option<&StagedJob> {
        self.job.as_ref()
    }

    fn clean(&mut self) {
        if let Some(job) = self.job.take() {
            self.staging.cleanup(&job);
        }
    }
}

impl Drop for StagedFiles<'_> {
    fn drop(&mut self) {
        if self.job.is_some() {
            engine_warn!("run={} abandoned before cleanup; removing scratch files", self.run_id);
            self.clean();
        }
    }
}
