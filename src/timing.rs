//! Pipeline phase timing.

use std::time::{Duration, Instant};

/// Wall-clock time of one pipeline phase: a module operation, staging or a
/// formatter run. Printed as `  [12.3s] phase` when finished.
pub struct Timer {
    phase: String,
    started: Instant,
}

impl Timer {
    pub fn start(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        println!("  [{}] {}", format_elapsed(elapsed), self.phase);
        tracing::debug!(phase = %self.phase, ?elapsed, "phase finished");
        elapsed
    }
}

/// Seconds with one decimal under a minute, `XmYYs` above it.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
