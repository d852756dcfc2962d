//! Callback-relay orchestrator.

use crate::Orchestrator;
use async_trait::async_trait;
use cascade_harness::{MockStageService, StageCallback, StageHandle};
use cascade_types::{ApiCallback, CascadeResult, Completion, Stage, StateToken};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// Drives the workflow the way a callback-chained caller would: every stage
/// begin registers a continuation, each continuation relays its completed
/// handle into a channel, and a single driver loop ends stages as the
/// handles arrive. B and C complete in arbitrary order on arbitrary worker
/// threads; an arrival count reaching 2 gates the branch decision so it is
/// taken exactly once.
pub struct RelayOrchestrator {
    service: Arc<MockStageService>,
}

impl RelayOrchestrator {
    pub fn new(service: Arc<MockStageService>) -> Self {
        RelayOrchestrator { service }
    }

    fn relay(tx: &mpsc::UnboundedSender<StageHandle>) -> Option<StageCallback> {
        let tx = tx.clone();
        Some(Box::new(move |handle| {
            let _ = tx.send(handle);
        }))
    }

    fn finalize(signal: &Completion, on_complete: Option<ApiCallback>, value: i64) {
        signal.complete(value);
        if let Some(callback) = on_complete {
            callback(signal.clone());
        }
    }

    async fn drive(
        service: Arc<MockStageService>,
        signal: Completion,
        mut on_complete: Option<ApiCallback>,
    ) -> CascadeResult<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        service.begin_a(Self::relay(&tx), None)?;

        let mut b_result = None;
        let mut c_result = None;
        let mut arrivals = 0u32;

        while let Some(handle) = rx.recv().await {
            match handle.stage() {
                Stage::A => {
                    let a = service.end_a(handle).await?;
                    service.begin_b(a, Self::relay(&tx), None)?;
                    service.begin_c(a, Self::relay(&tx), None)?;
                }
                Stage::B => {
                    b_result = Some(service.end_b(handle).await?);
                    arrivals += 1;
                }
                Stage::C => {
                    c_result = Some(service.end_c(handle).await?);
                    arrivals += 1;
                }
                Stage::D => {
                    let value = service.end_d(handle).await?;
                    Self::finalize(&signal, on_complete.take(), value);
                    return Ok(());
                }
            }

            // The join barrier: only the second of B/C to arrive takes the
            // branch decision.
            if arrivals == 2 {
                arrivals += 1;
                if let (Some(b), Some(c)) = (b_result, c_result) {
                    if b > c {
                        service.begin_d(b, c, Self::relay(&tx), None)?;
                    } else {
                        Self::finalize(&signal, on_complete.take(), c);
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Orchestrator for RelayOrchestrator {
    fn begin_api(
        &self,
        on_complete: Option<ApiCallback>,
        state: Option<StateToken>,
    ) -> Completion {
        let call = Completion::new(state);
        let signal = call.clone();
        let service = Arc::clone(&self.service);

        tokio::spawn(async move {
            if let Err(err) = Self::drive(service, signal, on_complete).await {
                error!(%err, "workflow run aborted");
            }
        });

        call
    }
}
