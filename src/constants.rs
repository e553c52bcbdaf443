//! Centralized constants for the bridge capabilities.
//!
//! Timing values for the transcription session and default voice settings
//! for speech synthesis. Config structs fall back to these values.

use std::time::Duration;

// =============================================================================
// TRANSCRIPTION TIMING
// =============================================================================

/// Silence timeout after the most recent non-empty partial (milliseconds).
///
/// Re-armed on every non-empty partial result. When it fires, the session
/// finalizes with the latest partial as the recognised text.
pub const SILENCE_TIMEOUT_MS: u64 = 1500;

/// Hard deadline for a listening session (milliseconds).
///
/// Measured from the moment the recognition engine is started. Bounds the
/// worst-case session length regardless of how often partials arrive.
pub const HARD_TIMEOUT_MS: u64 = 15000;

/// Whether engines are asked for partial hypotheses by default.
///
/// Silence detection depends on partials, so this is only turned off for
/// engines that cannot produce them.
pub const DEFAULT_PARTIAL_RESULTS: bool = true;

// =============================================================================
// SPEECH SYNTHESIS
// =============================================================================

/// Default speech rate multiplier (1.0 = engine normal).
pub const DEFAULT_SPEECH_RATE: f32 = 1.1;

/// Default pitch multiplier (1.0 = engine normal).
pub const DEFAULT_SPEECH_PITCH: f32 = 1.2;

/// Prefix for synthesis utterance ids. The suffix is a millisecond timestamp.
pub const UTTERANCE_ID_PREFIX: &str = "utt-";

// =============================================================================
// TEXT ANSWERING
// =============================================================================

/// Reply used by the fallback answer backend when no model is wired in.
pub const DEFAULT_FALLBACK_ANSWER: &str =
    "No language model is available on this device.";

/// Silence timeout as a [`Duration`].
pub fn silence_timeout() -> Duration {
    Duration::from_millis(SILENCE_TIMEOUT_MS)
}

/// Hard timeout as a [`Duration`].
pub fn hard_timeout() -> Duration {
    Duration::from_millis(HARD_TIMEOUT_MS)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod tests;
