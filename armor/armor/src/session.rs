//! Fit, correct and bind one armor piece.

use armor_collision::{
    CollisionParams, ResolveReport, detect_collisions_with_index, resolve_collisions,
};
use armor_shrinkwrap::{CancelToken, FitReport, FittingParameters, Progress, fit_shrinkwrap};
use armor_skinning::{TransferOptions, TransferReport, transfer_weights};
use armor_spatial::SpatialIndex;
use armor_types::{Mesh, SkinnedMesh};
use tracing::info;

use crate::{FitTargetKind, SessionError, SessionResult, build_target};

/// Where an armor piece is in the fitting workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStatus {
    /// Untouched since creation or the last reset.
    #[default]
    Unfit,
    /// Reshaped by a fit or collision pass.
    Fitted,
    /// Bound to a skeleton; geometry is frozen until reset.
    Bound,
}

/// One armor piece moving through fit, correct and bind.
///
/// The session owns the armor mesh and a snapshot of it as supplied. Every
/// mutating call takes `&mut self`, so two fits can never interleave on the
/// same piece. Once bound, reshaping calls fail with
/// [`SessionError::AlreadyBound`] until [`reset`](Self::reset).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use armor::prelude::*;
/// use armor::types::{subdivided_box, uv_sphere, BoneDef, Point3, Skeleton, SkinInfluence};
///
/// let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Spine", None, [0.0; 3])]).unwrap());
/// let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
/// let influences = vec![SkinInfluence::single(0); body.vertex_count()];
/// let avatar = SkinnedMesh::new(body, influences, skeleton).unwrap();
///
/// let mut session = FittingSession::new(subdivided_box(Point3::origin(), 1.2, 4));
/// session
///     .fit_to_avatar(
///         &avatar,
///         FitTargetKind::FullBody,
///         &FittingParameters::default().with_target_offset(0.01),
///         &Progress::none(),
///         &CancelToken::new(),
///     )
///     .unwrap();
/// assert_eq!(session.status(), FitStatus::Fitted);
///
/// session.bind(&avatar, &TransferOptions::default()).unwrap();
/// assert_eq!(session.status(), FitStatus::Bound);
/// assert!(session.skinned().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FittingSession {
    mesh: Mesh,
    original: Mesh,
    status: FitStatus,
    skinned: Option<SkinnedMesh>,
    last_fit: Option<FitReport>,
}

impl FittingSession {
    /// Start a session on `mesh`.
    #[must_use]
    pub fn new(mesh: Mesh) -> Self {
        Self {
            original: mesh.clone(),
            mesh,
            status: FitStatus::Unfit,
            skinned: None,
            last_fit: None,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> FitStatus {
        self.status
    }

    /// Armor geometry as currently shaped.
    #[must_use]
    pub const fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Armor geometry as supplied.
    #[must_use]
    pub const fn original(&self) -> &Mesh {
        &self.original
    }

    /// Bound armor, once [`bind`](Self::bind) has succeeded.
    #[must_use]
    pub const fn skinned(&self) -> Option<&SkinnedMesh> {
        self.skinned.as_ref()
    }

    /// Report of the most recent fit.
    #[must_use]
    pub const fn last_fit(&self) -> Option<&FitReport> {
        self.last_fit.as_ref()
    }

    /// Shrinkwrap the armor onto `target`.
    ///
    /// The status becomes [`FitStatus::Fitted`] once at least one iteration
    /// has run; a fit cancelled before its first iteration changes nothing.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyBound`] if the armor is bound
    /// - [`SessionError::Fit`] for invalid parameters or target
    pub fn fit(
        &mut self,
        target: &SpatialIndex,
        params: &FittingParameters,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> SessionResult<&FitReport> {
        self.ensure_unbound()?;
        let report = fit_shrinkwrap(&mut self.mesh, target, params, progress, cancel)?;
        if report.iterations > 0 {
            self.status = FitStatus::Fitted;
        }
        Ok(self.last_fit.insert(report))
    }

    /// Build the target selected by `kind` from `avatar` and fit onto it.
    ///
    /// # Errors
    ///
    /// As [`fit`](Self::fit), plus [`SessionError::Spatial`] if the avatar
    /// has no usable triangles.
    pub fn fit_to_avatar(
        &mut self,
        avatar: &SkinnedMesh,
        kind: FitTargetKind,
        params: &FittingParameters,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> SessionResult<&FitReport> {
        self.ensure_unbound()?;
        let target = build_target(avatar, kind)?;
        self.fit(&target, params, progress, cancel)
    }

    /// Detect shallow penetrations into `avatar` and push them out.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyBound`] if the armor is bound
    /// - [`SessionError::Collision`] for invalid parameters
    pub fn resolve_collisions(
        &mut self,
        avatar: &SpatialIndex,
        iterations: usize,
        params: &CollisionParams,
    ) -> SessionResult<ResolveReport> {
        self.ensure_unbound()?;
        let collisions = detect_collisions_with_index(avatar, &self.mesh, params)?;
        let report = resolve_collisions(&mut self.mesh, &collisions, iterations, params)?;
        if report.moved > 0 {
            self.status = FitStatus::Fitted;
        }
        Ok(report)
    }

    /// Bind the armor to the skeleton of `avatar`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyBound`] if the armor is bound
    /// - [`SessionError::Transfer`] if the avatar has no skeleton or surface
    pub fn bind(
        &mut self,
        avatar: &SkinnedMesh,
        options: &TransferOptions,
    ) -> SessionResult<TransferReport> {
        self.ensure_unbound()?;
        let output = transfer_weights(avatar, &self.mesh, options)?;
        self.skinned = Some(output.skinned);
        self.status = FitStatus::Bound;
        info!(
            vertices = self.mesh.vertex_count(),
            root_fallback = output.report.root_fallback,
            "Armor bound"
        );
        Ok(output.report)
    }

    /// Restore the armor as supplied and drop any binding.
    pub fn reset(&mut self) {
        self.mesh = self.original.clone();
        self.skinned = None;
        self.last_fit = None;
        self.status = FitStatus::Unfit;
    }

    /// Take the current geometry.
    #[must_use]
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    /// Take the bound armor, if any.
    #[must_use]
    pub fn into_skinned(self) -> Option<SkinnedMesh> {
        self.skinned
    }

    fn ensure_unbound(&self) -> SessionResult<()> {
        if self.status == FitStatus::Bound {
            return Err(SessionError::AlreadyBound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use armor_types::{BoneDef, Point3, Skeleton, SkinInfluence, subdivided_box, uv_sphere};
    use std::sync::Arc;

    fn avatar() -> SkinnedMesh {
        let skeleton = Arc::new(Skeleton::new(vec![BoneDef::at("Spine", None, [0.0; 3])]).unwrap());
        let body = uv_sphere(Point3::origin(), 1.0, 24, 12);
        let influences = vec![SkinInfluence::single(0); body.vertex_count()];
        SkinnedMesh::new(body, influences, skeleton).unwrap()
    }

    fn params() -> FittingParameters {
        FittingParameters::default().with_parallel(false)
    }

    #[test]
    fn fit_then_bind_then_reject_refit() {
        let avatar = avatar();
        let target = SpatialIndex::build(&avatar).unwrap();
        let mut session = FittingSession::new(subdivided_box(Point3::origin(), 1.2, 4));
        assert_eq!(session.status(), FitStatus::Unfit);

        session.fit(&target, &params(), &Progress::none(), &CancelToken::new()).unwrap();
        assert_eq!(session.status(), FitStatus::Fitted);
        assert!(session.last_fit().is_some());

        session.bind(&avatar, &TransferOptions::default()).unwrap();
        assert_eq!(session.status(), FitStatus::Bound);

        let err = session
            .fit(&target, &params(), &Progress::none(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyBound));
        let err = session.bind(&avatar, &TransferOptions::default()).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyBound));
        let err = session
            .resolve_collisions(&target, 1, &CollisionParams::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyBound));
    }

    #[test]
    fn reset_restores_the_original() {
        let avatar = avatar();
        let target = SpatialIndex::build(&avatar).unwrap();
        let armor = subdivided_box(Point3::origin(), 1.2, 4);
        let mut session = FittingSession::new(armor.clone());

        session.fit(&target, &params(), &Progress::none(), &CancelToken::new()).unwrap();
        session.bind(&avatar, &TransferOptions::default()).unwrap();
        assert_ne!(session.mesh().positions, armor.positions);

        session.reset();
        assert_eq!(session.status(), FitStatus::Unfit);
        assert_eq!(session.mesh().positions, armor.positions);
        assert!(session.skinned().is_none());
        assert!(session.last_fit().is_none());
    }

    #[test]
    fn cancelled_before_start_stays_unfit() {
        let target = SpatialIndex::build(&avatar()).unwrap();
        let mut session = FittingSession::new(subdivided_box(Point3::origin(), 1.2, 4));
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = session.fit(&target, &params(), &Progress::none(), &cancel).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(session.status(), FitStatus::Unfit);
    }

    #[test]
    fn collision_pass_marks_fitted() {
        let target = SpatialIndex::build(&avatar()).unwrap();
        let mut session = FittingSession::new(uv_sphere(Point3::origin(), 0.99, 24, 12));

        let report = session
            .resolve_collisions(&target, 2, &CollisionParams::default())
            .unwrap();
        assert!(report.moved > 0);
        assert_eq!(session.status(), FitStatus::Fitted);
    }
}
