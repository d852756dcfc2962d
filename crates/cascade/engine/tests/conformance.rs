//! Conformance suite every orchestrator must pass, run against both
//! shipped implementations.

use cascade_engine::{JoinOrchestrator, Orchestrator, RelayOrchestrator};
use cascade_harness::MockStageService;
use cascade_types::{Completion, StateToken};
use std::sync::Arc;
use std::time::Duration;

const PLENTY_OF_TIME: Duration = Duration::from_secs(10);

type Factory = fn(Arc<MockStageService>) -> Box<dyn Orchestrator>;

fn join_style(service: Arc<MockStageService>) -> Box<dyn Orchestrator> {
    Box::new(JoinOrchestrator::new(service))
}

fn relay_style(service: Arc<MockStageService>) -> Box<dyn Orchestrator> {
    Box::new(RelayOrchestrator::new(service))
}

struct ServiceTester {
    service: Arc<MockStageService>,
    orchestrator: Box<dyn Orchestrator>,
}

impl ServiceTester {
    fn new(factory: Factory) -> Self {
        let service = Arc::new(MockStageService::new().expect("marker file available"));
        let orchestrator = factory(Arc::clone(&service));
        ServiceTester {
            service,
            orchestrator,
        }
    }

    async fn run_to_completion(&self) -> i64 {
        let call = self.orchestrator.begin_api(None, None);
        assert!(
            call.wait_timeout(PLENTY_OF_TIME).await.is_some(),
            "workflow never finalized"
        );
        self.orchestrator.end_api(&call).await
    }

    async fn when_d_required(&self) {
        self.service.set_d_should_be_called(true);
        let result = self.run_to_completion().await;
        self.service.validate(true).unwrap();
        assert_eq!(self.service.expected_result(), result);
    }

    async fn when_d_not_required(&self) {
        self.service.set_d_should_be_called(false);
        let result = self.run_to_completion().await;
        self.service.validate(true).unwrap();
        assert_eq!(self.service.expected_result(), result);
    }

    async fn callback_fires_exactly_once_after_completion(&self) {
        let (tx, rx) = tokio::sync::oneshot::channel::<Completion>();
        let call = self
            .orchestrator
            .begin_api(Some(Box::new(move |done| drop(tx.send(done)))), None);

        let delivered = tokio::time::timeout(PLENTY_OF_TIME, rx)
            .await
            .expect("callback never fired")
            .unwrap();
        assert!(delivered.is_complete());
        assert_eq!(delivered.result(), Some(self.orchestrator.end_api(&call).await));
    }

    async fn state_token_preserved_by_identity(&self) {
        let token: StateToken = Arc::new("opaque caller state".to_string());
        let (tx, rx) = tokio::sync::oneshot::channel::<Completion>();
        let call = self.orchestrator.begin_api(
            Some(Box::new(move |done| drop(tx.send(done)))),
            Some(Arc::clone(&token)),
        );

        assert!(call.wait_timeout(PLENTY_OF_TIME).await.is_some());
        let delivered = rx.await.unwrap();
        let seen = delivered.state().expect("state token dropped");
        assert!(Arc::ptr_eq(seen, &token));
    }
}

// ── JoinOrchestrator ─────────────────────────────────────────────────

#[tokio::test]
async fn join_style_runs_the_d_branch() {
    ServiceTester::new(join_style).when_d_required().await;
}

#[tokio::test]
async fn join_style_skips_d_when_not_required() {
    ServiceTester::new(join_style).when_d_not_required().await;
}

#[tokio::test]
async fn join_style_invokes_the_callback() {
    ServiceTester::new(join_style)
        .callback_fires_exactly_once_after_completion()
        .await;
}

#[tokio::test]
async fn join_style_preserves_the_state_token() {
    ServiceTester::new(join_style)
        .state_token_preserved_by_identity()
        .await;
}

// ── RelayOrchestrator ────────────────────────────────────────────────

#[tokio::test]
async fn relay_style_runs_the_d_branch() {
    ServiceTester::new(relay_style).when_d_required().await;
}

#[tokio::test]
async fn relay_style_skips_d_when_not_required() {
    ServiceTester::new(relay_style).when_d_not_required().await;
}

#[tokio::test]
async fn relay_style_invokes_the_callback() {
    ServiceTester::new(relay_style)
        .callback_fires_exactly_once_after_completion()
        .await;
}

#[tokio::test]
async fn relay_style_preserves_the_state_token() {
    ServiceTester::new(relay_style)
        .state_token_preserved_by_identity()
        .await;
}

// ── Unforced runs ────────────────────────────────────────────────────

#[tokio::test]
async fn both_styles_satisfy_an_unforced_run() {
    for factory in [join_style as Factory, relay_style as Factory] {
        let tester = ServiceTester::new(factory);
        let result = tester.run_to_completion().await;
        tester.service.validate(true).unwrap();
        assert_eq!(tester.service.expected_result(), result);
    }
}
