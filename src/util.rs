use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Check whether a cancellation flag has been raised.
#[must_use]
pub fn cancel_requested(cancel: &AtomicBool) -> bool {
    cancel.load(Ordering::SeqCst)
}

/// Monotonic request token used to discard responses that were overtaken by a newer request.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    /// Start a new request and return its token.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate every in-flight request without starting a new one.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }
}

/// Highest event sequence number applied so far by one state slice.
#[derive(Debug, Default)]
pub struct SequenceWatermark(AtomicU64);

impl SequenceWatermark {
    /// Record `seq` and report whether it is newer than everything seen before.
    pub fn advance(&self, seq: u64) -> bool {
        self.0.fetch_max(seq, Ordering::SeqCst) < seq
    }
}

/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Clamp a reported progress value into `[0, 1]`; NaN counts as no progress.
#[must_use]
pub fn clamp_fraction(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
