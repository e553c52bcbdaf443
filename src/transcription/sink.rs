// Single-use result callback for a transcription session

use super::error::TranscriptionOutcome;
use tokio::sync::oneshot;

/// Single-use callback through which the session outcome reaches the caller
///
/// Consuming `deliver` takes `self`, so a sink can never be invoked twice.
pub struct ResultSink {
    callback: Box<dyn FnOnce(TranscriptionOutcome) + Send + 'static>,
}

impl ResultSink {
    /// Wrap an arbitrary callback
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(TranscriptionOutcome) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a sink paired with a receiver for async callers
    pub fn channel() -> (Self, oneshot::Receiver<TranscriptionOutcome>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self::new(move |outcome| {
            // Receiver dropped means the caller stopped waiting
            if tx.send(outcome).is_err() {
                crate::debug!("Transcription caller went away before the result arrived");
            }
        });
        (sink, rx)
    }

    /// Invoke the callback with the outcome
    pub fn deliver(self, outcome: TranscriptionOutcome) {
        (self.callback)(outcome)
    }
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
