//! Light collision correction for fitted armor.
//!
//! A cheaper alternative to a full shrinkwrap when the armor is already
//! close to the avatar and only needs small corrections:
//!
//! - [`detect_collisions`] - Probe armor vertices for shallow penetrations
//! - [`resolve_collisions`] - Push them out, dragging nearby vertices along
//! - [`smooth`] - Laplacian pass to even out the result
//!
//! Pushes are bounded: recorded depths are clamped to
//! [`CollisionParams::max_depth`] and total motion per vertex to
//! [`CollisionParams::max_total_displacement`].
//!
//! # Example
//!
//! ```
//! use armor_collision::{detect_collisions, resolve_collisions, smooth, CollisionParams};
//! use armor_types::{uv_sphere, Point3};
//!
//! let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
//! let mut armor = uv_sphere(Point3::origin(), 0.995, 24, 12);
//! let params = CollisionParams::default();
//!
//! let hits = detect_collisions(&body, &armor, &params).unwrap();
//! resolve_collisions(&mut armor, &hits, 2, &params).unwrap();
//! smooth(&mut armor, 0.1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod detect;
mod error;
mod params;
mod resolve;
mod smooth;

pub use detect::{CollisionPoint, detect_collisions, detect_collisions_with_index};
pub use error::{CollisionError, CollisionResult};
pub use params::CollisionParams;
pub use resolve::{ResolveReport, resolve_collisions};
pub use smooth::{smooth, smooth_iterations};
