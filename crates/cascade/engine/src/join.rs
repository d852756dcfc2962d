//! Futures-composition orchestrator.

use crate::Orchestrator;
use async_trait::async_trait;
use cascade_harness::MockStageService;
use cascade_types::{ApiCallback, CascadeResult, Completion, StateToken};
use std::sync::Arc;
use tracing::error;

/// Drives the workflow as one straight-line async block: await A, issue both
/// fan-out begins before awaiting either end, join with `try_join!`, then
/// branch. The business logic reads top to bottom.
pub struct JoinOrchestrator {
    service: Arc<MockStageService>,
}

impl JoinOrchestrator {
    pub fn new(service: Arc<MockStageService>) -> Self {
        JoinOrchestrator { service }
    }

    async fn drive(service: Arc<MockStageService>) -> CascadeResult<i64> {
        let a = service.end_a(service.begin_a(None, None)?).await?;

        // Both begins are issued before either end is awaited; B and C run
        // concurrently and the join waits for both.
        let b_handle = service.begin_b(a, None, None)?;
        let c_handle = service.begin_c(a, None, None)?;
        let (b, c) = tokio::try_join!(service.end_b(b_handle), service.end_c(c_handle))?;

        if b > c {
            let d_handle = service.begin_d(b, c, None, None)?;
            service.end_d(d_handle).await
        } else {
            Ok(c)
        }
    }
}

#[async_trait]
impl Orchestrator for JoinOrchestrator {
    fn begin_api(
        &self,
        on_complete: Option<ApiCallback>,
        state: Option<StateToken>,
    ) -> Completion {
        let call = Completion::new(state);
        let signal = call.clone();
        let service = Arc::clone(&self.service);

        tokio::spawn(async move {
            match Self::drive(service).await {
                Ok(value) => {
                    signal.complete(value);
                    if let Some(callback) = on_complete {
                        callback(signal);
                    }
                }
                Err(err) => error!(%err, "workflow run aborted"),
            }
        });

        call
    }
}
