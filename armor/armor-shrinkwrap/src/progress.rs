//! Progress reporting and cooperative cancellation for long fits.
//!
//! # Example
//!
//! ```
//! use armor_shrinkwrap::{CancelToken, Progress};
//!
//! let progress = Progress::new(|fraction, message| {
//!     println!("[{:>3.0}%] {message}", fraction * 100.0);
//! });
//! progress.report(0.5, "Shrinkwrap iteration 5/10");
//!
//! let cancel = CancelToken::new();
//! let handle = cancel.clone();
//! handle.cancel();
//! assert!(cancel.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A progress sink that receives updates between fitting iterations.
///
/// The callback receives:
/// - `fraction`: Completed share of the work in `[0, 1]`
/// - `message`: Description of the current stage
pub struct Progress {
    callback: Box<dyn Fn(f64, &str) + Send + Sync>,
}

impl Progress {
    /// Create a progress sink from a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f64, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress. The fraction is clamped to `[0, 1]`.
    #[inline]
    pub fn report(&self, fraction: f64, message: &str) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (self.callback)(fraction, message);
    }

    /// A sink that discards all updates.
    #[must_use]
    pub fn none() -> Self {
        Self::new(|_, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// Shared flag a host sets to stop a fit between iterations.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn report_clamps_fraction() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |f, m| {
            if let Ok(mut v) = sink.lock() {
                v.push((f, m.to_string()));
            }
        });

        progress.report(1.5, "over");
        progress.report(f64::NAN, "nan");
        progress.report(0.25, "quarter");

        let seen = seen.lock().map(|v| v.clone()).unwrap_or_default();
        assert_eq!(seen.len(), 3);
        assert!((seen[0].0 - 1.0).abs() < f64::EPSILON);
        assert!(seen[1].0.abs() < f64::EPSILON);
        assert_eq!(seen[2].1, "quarter");
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }
}
