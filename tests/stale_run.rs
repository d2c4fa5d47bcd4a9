use std::sync::Arc;
use std::time::Duration;

use generation_provider::GenerationProvider;
use generation_provider_mock::{MockProvider, MockReply};
use mutation_wheel::{tokenize, RequestState, SessionController, SessionParams};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

/// Session whose provider lets superseded calls run to completion.
fn late_resolving_session(replies: Vec<MockReply>) -> SessionController {
    let provider = MockProvider::new(replies)
        .ignoring_cancellation()
        .with_fallback_delay(Duration::from_secs(60));
    let params = SessionParams {
        interval_ms: 10_000,
        words_per_tick: 1,
        seed_text: "seed".to_string(),
        ..SessionParams::default()
    };
    SessionController::new(Arc::new(provider) as Arc<dyn GenerationProvider>, params)
}

#[tokio::test(start_paused = true)]
async fn superseded_call_resolving_last_is_ignored() {
    let session = late_resolving_session(vec![
        MockReply::content("alpha").with_delay(Duration::from_millis(300)),
        MockReply::content("beta").with_delay(Duration::from_millis(100)),
    ]);

    session.start().expect("start A");
    sleep(Duration::from_millis(50)).await;
    session.start().expect("restart with B");

    sleep(Duration::from_millis(350)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.target_text, "beta");
    assert_eq!(tokenize(&snapshot.target_text), tokenize("beta"));
    assert_eq!(snapshot.cycle_count, 1);
    assert_eq!(snapshot.last_latency_ms, Some(100));

    session.stop();
}

#[tokio::test(start_paused = true)]
async fn superseded_call_resolving_first_is_ignored() {
    let session = late_resolving_session(vec![
        MockReply::content("alpha").with_delay(Duration::from_millis(100)),
        MockReply::content("beta").with_delay(Duration::from_millis(300)),
    ]);

    session.start().expect("start A");
    sleep(Duration::from_millis(50)).await;
    session.start().expect("restart with B");

    sleep(Duration::from_millis(150)).await;
    let between = session.snapshot();
    assert_eq!(between.target_text, "seed");
    assert_eq!(between.cycle_count, 0);
    assert!(between.in_flight());

    sleep(Duration::from_millis(200)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.target_text, "beta");
    assert_eq!(snapshot.cycle_count, 1);

    session.stop();
}

#[tokio::test(start_paused = true)]
async fn result_arriving_after_stop_is_ignored() {
    let session = late_resolving_session(vec![
        MockReply::content("alpha").with_delay(Duration::from_millis(200)),
    ]);

    session.start().expect("start");
    sleep(Duration::from_millis(50)).await;
    session.stop();

    sleep(Duration::from_millis(300)).await;

    let snapshot = session.snapshot();
    assert!(!snapshot.running);
    assert_eq!(snapshot.target_text, "seed");
    assert_eq!(snapshot.display_text, "seed");
    assert_eq!(snapshot.cycle_count, 0);
    assert_eq!(snapshot.request_state, RequestState::Aborted);
}

#[tokio::test(start_paused = true)]
async fn superseded_failure_does_not_surface() {
    let session = late_resolving_session(vec![
        MockReply::failure("HTTP 429 rate limited").with_delay(Duration::from_millis(200)),
        MockReply::content("beta").with_delay(Duration::from_millis(50)),
    ]);

    session.start().expect("start A");
    sleep(Duration::from_millis(20)).await;
    session.start().expect("restart with B");

    sleep(Duration::from_millis(300)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.target_text, "beta");
    assert_eq!(snapshot.request_state, RequestState::Completed);
}
