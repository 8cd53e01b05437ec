//! Iterative shrinkwrap fitting for armor meshes.
//!
//! Deforms a source mesh (armor) until its surface hugs a target surface
//! (avatar body or a hull cut from it), keeping the result smooth and the
//! per-iteration motion bounded.
//!
//! Each iteration runs `Sample -> Project -> Damp & Clamp -> Smooth`:
//!
//! 1. A deterministic subset of vertices is chosen ([`FittingParameters::sample_rate`])
//! 2. Each is projected onto the target along the ray toward the target's
//!    centroid; vertices found inside are pushed out
//! 3. The displacement is scaled by the step size and clamped
//! 4. Displacements spread over hop-limited neighborhoods with Gaussian
//!    falloff, are clamped again and applied
//!
//! The fit stops when the mean displacement falls below
//! [`FittingParameters::convergence_epsilon`] or after the configured
//! number of iterations.
//!
//! # Example
//!
//! ```
//! use armor_shrinkwrap::{fit_to_mesh, CancelToken, FitOutcome, FittingParameters, Progress};
//! use armor_types::{subdivided_box, uv_sphere, Point3};
//!
//! let body = uv_sphere(Point3::origin(), 1.0, 32, 16);
//! let mut armor = subdivided_box(Point3::origin(), 1.0, 6);
//!
//! let params = FittingParameters::default().with_target_offset(0.01);
//! let report = fit_to_mesh(&mut armor, &body, &params, &Progress::none(), &CancelToken::new())
//!     .unwrap();
//!
//! assert_ne!(report.outcome, FitOutcome::Cancelled);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod fit;
mod neighborhood;
mod params;
mod progress;

pub use error::{FitError, FitResult};
pub use fit::{FitOutcome, FitReport, IterationStats, Shrinkwrap, fit_shrinkwrap, fit_to_mesh};
pub use params::FittingParameters;
pub use progress::{CancelToken, Progress};
