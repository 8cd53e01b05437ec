//! Skin-weight transfer for fitted armor.
//!
//! Binds a static mesh (armor, after fitting) to the skeleton of a skinned
//! avatar so the armor follows the avatar's animation:
//!
//! - [`transfer_weights`] - Resolve weights per target vertex and bind
//! - [`TransferOptions`] - Search distances and falloff
//! - [`TransferReport`] - How many vertices each strategy resolved
//!
//! Every vertex ends up with at most four weights summing to 1; vertices no
//! strategy can reach bind to the root bone.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use armor_skinning::{transfer_weights, TransferOptions};
//! use armor_types::{subdivided_box, BoneDef, Point3, Skeleton, SkinInfluence, SkinnedMesh};
//!
//! let skeleton = Arc::new(
//!     Skeleton::new(vec![
//!         BoneDef::at("Hips", None, [0.0, 0.0, 0.0]),
//!         BoneDef::at("Spine", Some(0), [0.0, 0.5, 0.0]),
//!     ])
//!     .unwrap(),
//! );
//! let body = subdivided_box(Point3::new(0.0, 0.5, 0.0), 0.5, 4);
//! let influences = body
//!     .positions
//!     .iter()
//!     .map(|p| SkinInfluence::from_pairs(&[(1, p.y), (0, 1.0 - p.y)]))
//!     .collect();
//! let avatar = SkinnedMesh::new(body, influences, skeleton).unwrap();
//!
//! let armor = subdivided_box(Point3::new(0.0, 0.5, 0.0), 0.55, 4);
//! let output = transfer_weights(&avatar, &armor, &TransferOptions::default()).unwrap();
//! assert_eq!(output.report.root_fallback, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod options;
mod result;
mod transfer;

pub use error::{TransferError, TransferResult};
pub use options::TransferOptions;
pub use result::{TransferOutput, TransferReport, TransferStrategy};
pub use transfer::transfer_weights;
