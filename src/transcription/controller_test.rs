use super::*;
use crate::events::tests::MockEventEmitter;
use crate::transcription::engine::tests::{EngineProbe, MockEngineAdapter};
use crate::transcription::permission::{PromptPermissionGate, StaticPermissionGate};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::time::{sleep, sleep_until, Instant};

/// Paused-clock timers land on the millisecond tick at or after the deadline
fn assert_elapsed(start: Instant, expected_ms: u64) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(expected_ms)
            && elapsed < Duration::from_millis(expected_ms + 5),
        "expected ~{}ms, got {:?}",
        expected_ms,
        elapsed
    );
}

/// Yield to the controller task until the condition holds
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

fn granted_controller(probe: &Arc<EngineProbe>) -> TranscriptionController {
    TranscriptionController::builder(
        Arc::new(StaticPermissionGate::granted()),
        Arc::new(MockEngineAdapter::new(probe.clone())),
    )
    .spawn()
}

fn prompt_gate(prompt_result: Result<(), PermissionError>) -> Arc<PromptPermissionGate> {
    Arc::new(PromptPermissionGate::new(Box::new(move || prompt_result.clone())))
}

fn recording_sink() -> (ResultSink, Arc<Mutex<Vec<TranscriptionOutcome>>>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let store = delivered.clone();
    let sink = ResultSink::new(move |outcome| store.lock().unwrap().push(outcome));
    (sink, delivered)
}

/// Start a session and wait until its engine is running
async fn start_listening(
    controller: &TranscriptionController,
    probe: &Arc<EngineProbe>,
) -> oneshot::Receiver<TranscriptionOutcome> {
    let starts = probe.start_count();
    let (sink, rx) = ResultSink::channel();
    controller.transcript_with_sink(sink);
    wait_for(|| probe.start_count() > starts).await;
    rx
}

fn partial(text: &str) -> RecognitionEvent {
    RecognitionEvent::PartialResult(text.to_string())
}

#[tokio::test(start_paused = true)]
async fn test_final_result_is_delivered() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;
    assert!(controller.is_active());

    let engine = probe.latest_sender();
    engine.send(RecognitionEvent::Ready);
    engine.send(partial("hello"));
    engine.send(RecognitionEvent::FinalResult("hello world".to_string()));

    assert_eq!(rx.await.unwrap(), Ok("hello world".to_string()));
    assert!(!controller.is_active());
    assert_eq!(probe.destroy_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_silence_window_rearms_on_each_partial() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let mut rx = start_listening(&controller, &probe).await;
    let engine = probe.latest_sender();
    let start = Instant::now();

    engine.send(partial("h"));
    sleep(Duration::from_millis(500)).await;
    engine.send(partial("he"));
    sleep(Duration::from_millis(500)).await;
    engine.send(partial("hel"));

    sleep_until(start + Duration::from_millis(2499)).await;
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    assert_eq!(rx.await.unwrap(), Ok("hel".to_string()));
    assert_elapsed(start, 2500);
}

#[tokio::test(start_paused = true)]
async fn test_no_partials_ends_at_hard_timeout() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let start = Instant::now();
    let rx = start_listening(&controller, &probe).await;

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::Timeout));
    assert_elapsed(start, 15000);
}

#[tokio::test(start_paused = true)]
async fn test_hard_deadline_dominates_continuous_partials() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let mut rx = start_listening(&controller, &probe).await;
    let engine = probe.latest_sender();
    let start = Instant::now();

    for k in 0..15u64 {
        sleep_until(start + Duration::from_millis(500 + 1000 * k)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        engine.send(partial(&format!("part {}", k)));
    }

    assert_eq!(rx.await.unwrap(), Ok("part 14".to_string()));
    assert_elapsed(start, 15000);
}

#[tokio::test(start_paused = true)]
async fn test_final_result_wins_over_pending_silence() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;
    let engine = probe.latest_sender();

    engine.send(partial("hel"));
    sleep(Duration::from_millis(1000)).await;
    engine.send(RecognitionEvent::FinalResult("hello".to_string()));

    assert_eq!(rx.await.unwrap(), Ok("hello".to_string()));

    // Nothing fires once the session is finalized
    sleep(Duration::from_millis(20_000)).await;
    assert_eq!(probe.destroy_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_engine_error_without_partial() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    probe.latest_sender().send(RecognitionEvent::Error(7));

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::EngineError(7)));
    assert_eq!(probe.cancel_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_engine_error_recovers_partial() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;
    let engine = probe.latest_sender();

    engine.send(partial("turn on"));
    engine.send(RecognitionEvent::Error(6));

    assert_eq!(rx.await.unwrap(), Ok("turn on".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_no_speech_event() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    probe.latest_sender().send(RecognitionEvent::NoSpeech);

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::NoSpeechDetected));
}

#[tokio::test(start_paused = true)]
async fn test_second_request_rejected_while_listening() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    let (sink, delivered) = recording_sink();
    controller.transcript_with_sink(sink);
    // Rejection is delivered before transcript_with_sink returns
    assert_eq!(
        *delivered.lock().unwrap(),
        vec![Err(TranscriptionError::AlreadyInProgress)]
    );

    probe.latest_sender().send(RecognitionEvent::FinalResult("first".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("first".to_string()));
    assert_eq!(probe.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_request_rejected_while_awaiting_permission() {
    let probe = EngineProbe::new();
    let gate = prompt_gate(Ok(()));
    let controller =
        TranscriptionController::builder(gate.clone(), Arc::new(MockEngineAdapter::new(probe.clone())))
            .spawn();

    let (sink, rx) = ResultSink::channel();
    controller.transcript_with_sink(sink);
    wait_for(|| gate.is_pending()).await;

    let second = controller.transcript().await;
    assert_eq!(second, Err(TranscriptionError::AlreadyInProgress));

    assert!(gate.on_permission_result(true));
    wait_for(|| probe.start_count() == 1).await;
    probe.latest_sender().send(RecognitionEvent::FinalResult("granted".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("granted".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_never_starts_engine() {
    let probe = EngineProbe::new();
    let gate = prompt_gate(Ok(()));
    let controller =
        TranscriptionController::builder(gate.clone(), Arc::new(MockEngineAdapter::new(probe.clone())))
            .spawn();

    let (sink, rx) = ResultSink::channel();
    controller.transcript_with_sink(sink);
    wait_for(|| gate.is_pending()).await;
    gate.on_permission_result(false);

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::PermissionDenied));
    assert_eq!(probe.start_count(), 0);
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_static_denied_gate() {
    let probe = EngineProbe::new();
    let controller = TranscriptionController::builder(
        Arc::new(StaticPermissionGate::denied()),
        Arc::new(MockEngineAdapter::new(probe.clone())),
    )
    .spawn();

    assert_eq!(controller.transcript().await, Err(TranscriptionError::PermissionDenied));
    assert_eq!(probe.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prompt_unavailable_is_environment_error() {
    let probe = EngineProbe::new();
    let controller = TranscriptionController::builder(
        prompt_gate(Err(PermissionError::EnvironmentUnavailable)),
        Arc::new(MockEngineAdapter::new(probe.clone())),
    )
    .spawn();

    assert_eq!(
        controller.transcript().await,
        Err(TranscriptionError::EnvironmentUnavailable)
    );
    assert_eq!(probe.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_engine_start_failure() {
    let probe = EngineProbe::new();
    probe.fail_starts("recognizer not available");
    let controller = granted_controller(&probe);

    let outcome = controller.transcript().await;
    assert_eq!(
        outcome,
        Err(TranscriptionError::EngineUnavailable(
            "recognizer not available".to_string()
        ))
    );
    assert_eq!(
        outcome.unwrap_err().to_string(),
        "Failed to start recognition: recognizer not available"
    );
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_request_uses_configured_locale() {
    let probe = EngineProbe::new();
    let controller = TranscriptionController::builder(
        Arc::new(StaticPermissionGate::granted()),
        Arc::new(MockEngineAdapter::new(probe.clone())),
    )
    .with_config(TranscriptionConfig {
        locale: Some("de-DE".to_string()),
        ..TranscriptionConfig::default()
    })
    .spawn();

    let _rx = start_listening(&controller, &probe).await;
    let requests = probe.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].locale.as_deref(), Some("de-DE"));
    assert!(requests[0].partial_results);
}

#[tokio::test(start_paused = true)]
async fn test_stale_generation_events_are_dropped() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);

    let rx = start_listening(&controller, &probe).await;
    let first_engine = probe.latest_sender();
    first_engine.send(RecognitionEvent::FinalResult("one".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("one".to_string()));

    let rx = start_listening(&controller, &probe).await;
    let second_engine = probe.latest_sender();
    assert_ne!(first_engine.generation(), second_engine.generation());

    // A late callback from the first engine must not touch the new session
    first_engine.send(RecognitionEvent::FinalResult("stale".to_string()));
    first_engine.send(RecognitionEvent::Error(5));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(controller.is_active());

    second_engine.send(RecognitionEvent::FinalResult("two".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("two".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_new_session_after_finalize() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);

    let rx = start_listening(&controller, &probe).await;
    probe.latest_sender().send(RecognitionEvent::Error(7));
    assert!(rx.await.unwrap().is_err());

    let rx = start_listening(&controller, &probe).await;
    probe.latest_sender().send(RecognitionEvent::FinalResult("again".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("again".to_string()));
    assert_eq!(probe.start_count(), 2);
    assert_eq!(probe.destroy_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reset_finalizes_live_session() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    controller.reset().await;

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::EnvironmentUnavailable));
    assert_eq!(probe.stops.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(probe.destroy_count(), 1);
    assert!(!controller.is_active());

    // Still usable after a reset
    let rx = start_listening(&controller, &probe).await;
    probe.latest_sender().send(RecognitionEvent::FinalResult("back".to_string()));
    assert_eq!(rx.await.unwrap(), Ok("back".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_idle_is_noop() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    controller.reset().await;
    assert!(!controller.is_active());
    assert_eq!(probe.destroy_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_finalizes_and_rejects_later_requests() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    controller.shutdown().await;

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::EnvironmentUnavailable));
    assert_eq!(probe.destroy_count(), 1);
    assert_eq!(
        controller.transcript().await,
        Err(TranscriptionError::EnvironmentUnavailable)
    );
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_permission_prompt() {
    let probe = EngineProbe::new();
    let gate = prompt_gate(Ok(()));
    let controller =
        TranscriptionController::builder(gate.clone(), Arc::new(MockEngineAdapter::new(probe.clone())))
            .spawn();

    let (sink, rx) = ResultSink::channel();
    controller.transcript_with_sink(sink);
    wait_for(|| gate.is_pending()).await;

    controller.shutdown().await;
    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::EnvironmentUnavailable));

    // The aborted request no longer counts as pending
    wait_for(|| !gate.is_pending()).await;
    assert!(!gate.on_permission_result(true));
    assert_eq!(probe.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_request_queued_behind_shutdown_is_answered() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);

    // Shutdown is queued before the task has run, the request right behind it
    controller
        .mailbox
        .send(ControllerMessage::Shutdown { done: None })
        .unwrap();
    let (sink, delivered) = recording_sink();
    controller.transcript_with_sink(sink);

    wait_for(|| !delivered.lock().unwrap().is_empty()).await;
    assert_eq!(
        *delivered.lock().unwrap(),
        vec![Err(TranscriptionError::EnvironmentUnavailable)]
    );
    assert!(!controller.is_active());
    assert_eq!(probe.start_count(), 0);

    // Entry after the task is gone fails fast too
    assert_eq!(
        controller.transcript().await,
        Err(TranscriptionError::EnvironmentUnavailable)
    );
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_empty_final_result_is_delivered() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;
    let engine = probe.latest_sender();

    engine.send(partial("hel"));
    engine.send(RecognitionEvent::FinalResult("   ".to_string()));

    assert_eq!(rx.await.unwrap(), Ok(String::new()));
    assert!(!controller.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_drop_finalizes_live_session() {
    let probe = EngineProbe::new();
    let controller = granted_controller(&probe);
    let rx = start_listening(&controller, &probe).await;

    drop(controller);

    assert_eq!(rx.await.unwrap(), Err(TranscriptionError::EnvironmentUnavailable));
    assert_eq!(probe.destroy_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events_emitted() {
    let probe = EngineProbe::new();
    let emitter = Arc::new(MockEventEmitter::new());
    let controller = TranscriptionController::builder(
        Arc::new(StaticPermissionGate::granted()),
        Arc::new(MockEngineAdapter::new(probe.clone())),
    )
    .with_emitter(emitter.clone())
    .spawn();

    let rx = start_listening(&controller, &probe).await;
    probe.latest_sender().send(partial("lights"));
    assert_eq!(rx.await.unwrap(), Ok("lights".to_string()));

    let started = emitter.started_events.lock().unwrap().clone();
    let completed = emitter.completed_events.lock().unwrap().clone();
    assert_eq!(started.len(), 1);
    assert_eq!(completed.len(), 1);
    assert_eq!(started[0].session_id, completed[0].session_id);
    assert_eq!(completed[0].text, "lights");
    assert_eq!(completed[0].reason, FinishReason::SilenceTimeout);
    assert!((1500..1505).contains(&completed[0].duration_ms));

    let rx = start_listening(&controller, &probe).await;
    probe.latest_sender().send(RecognitionEvent::Error(2));
    assert!(rx.await.unwrap().is_err());

    let errors = emitter.error_events.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error, "Speech error: 2");
    assert_eq!(errors[0].reason, FinishReason::EngineError);
}
