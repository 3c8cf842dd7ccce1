use crate::{Effect, IngestOutcome, IngestRequest, Msg, RunStage, RunState};

/// Rejection message when the dedup store settings are absent.
pub const STORE_SETTINGS_MISSING: &str = "no setting found for CreateDatabase and CosmosDBConnection environment variables, set them in the service environment.";

/// Pure update function: applies a message to a run and returns the effects to perform next.
///
/// Messages that do not fit the current stage leave the run untouched.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    if state.stage().is_terminal() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Submitted {
            request,
            store_configured,
        } => {
            if state.stage() != RunStage::Received {
                return (state, Vec::new());
            }
            // Store settings are checked before the content fields.
            if !store_configured {
                state.set_stage(RunStage::Rejected);
                return (
                    state,
                    vec![Effect::Finish(IngestOutcome::Rejected(
                        STORE_SETTINGS_MISSING.to_string(),
                    ))],
                );
            }
            let missing = request.missing_fields();
            if !missing.is_empty() {
                state.set_stage(RunStage::Rejected);
                return (
                    state,
                    vec![Effect::Finish(IngestOutcome::MissingContent { fields: missing })],
                );
            }

            state.set_stage(RunStage::Validated);
            if request.force_resend {
                state.hold(request);
                stage_content(&mut state)
            } else {
                let url = request.url.clone();
                state.hold(request);
                vec![Effect::CheckAndRecord { url }]
            }
        }
        Msg::DedupChecked { seen } => {
            if state.stage() != RunStage::Validated || state.staging_started() {
                return (state, Vec::new());
            }
            if seen {
                state.set_stage(RunStage::AlreadyDelivered);
                vec![Effect::Finish(IngestOutcome::AlreadyReported)]
            } else {
                state.set_stage(RunStage::DedupChecked);
                stage_content(&mut state)
            }
        }
        Msg::Staged => {
            let ready = matches!(state.stage(), RunStage::Validated | RunStage::DedupChecked);
            if !ready || !state.staging_started() {
                return (state, Vec::new());
            }
            state.set_stage(RunStage::Staged);
            vec![Effect::Convert]
        }
        Msg::Converted { output_exists } => {
            if state.stage() != RunStage::Staged {
                return (state, Vec::new());
            }
            state.set_stage(RunStage::Converted);
            if output_exists {
                vec![Effect::Deliver]
            } else {
                // No package, nothing to send; still clean up.
                vec![Effect::Cleanup]
            }
        }
        Msg::Delivered => {
            if state.stage() != RunStage::Converted {
                return (state, Vec::new());
            }
            state.set_stage(RunStage::Delivered);
            state.mark_delivered();
            vec![Effect::Cleanup]
        }
        Msg::StepFailed { message } => {
            let in_flight = matches!(
                state.stage(),
                RunStage::Validated | RunStage::DedupChecked | RunStage::Staged | RunStage::Converted
            );
            if !in_flight {
                return (state, Vec::new());
            }
            state.fail(message.clone());
            if state.staging_started() {
                vec![Effect::Cleanup]
            } else {
                vec![Effect::Finish(IngestOutcome::Failed(message))]
            }
        }
        Msg::CleanedUp => {
            let cleanable = matches!(
                state.stage(),
                RunStage::Converted | RunStage::Delivered | RunStage::Failed
            );
            if !cleanable || !state.staging_started() {
                return (state, Vec::new());
            }
            let outcome = match state.failure() {
                Some(message) => IngestOutcome::Failed(message.to_string()),
                None => IngestOutcome::Accepted {
                    delivered: state.delivered(),
                },
            };
            state.set_stage(RunStage::CleanedUp);
            vec![Effect::Finish(outcome)]
        }
    };

    (state, effects)
}

fn stage_content(state: &mut RunState) -> Vec<Effect> {
    match state.start_staging() {
        Some(IngestRequest { title, html, .. }) => vec![Effect::StageContent { title, html }],
        None => Vec::new(),
    }
}
