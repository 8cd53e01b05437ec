//! The shrinkwrap iteration.
//!
//! Each iteration samples vertices, projects them onto the target along the
//! ray toward its centroid, damps and clamps the resulting displacement,
//! spreads it over hop-limited neighborhoods and applies it once.

use armor_spatial::{SpatialError, SpatialIndex, TriangleSource};
use armor_types::{Mesh, Point3, Vector3};
use hashbrown::HashSet;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::neighborhood::Neighborhood;
use crate::{CancelToken, FitError, FitResult, FittingParameters, Progress};

/// Sampled vertex count below which projection stays on one thread.
const PARALLEL_THRESHOLD: usize = 512;

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// Mean displacement dropped below `convergence_epsilon`.
    Converged,
    /// Ran the configured number of iterations.
    MaxIterationsReached,
    /// Stopped by a [`CancelToken`]; the mesh holds the last completed iteration.
    Cancelled,
}

/// Measurements from one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IterationStats {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Mean distance from projected vertices to their target point, before moving.
    pub mean_target_distance: f64,
    /// Mean length of the applied displacements.
    pub mean_displacement: f64,
    /// Longest applied displacement.
    pub max_displacement: f64,
    /// Vertices projected onto a front face.
    pub projected: usize,
    /// Vertices found inside the target and pushed out.
    pub pushed_out: usize,
    /// Sampled vertices whose rays found nothing.
    pub missed: usize,
    /// Vertices that moved.
    pub moved: usize,
}

/// Summary of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// How the fit ended.
    pub outcome: FitOutcome,
    /// Iterations completed.
    pub iterations: usize,
    /// Mean target distance per iteration.
    pub target_distance_history: Vec<f64>,
    /// Mean applied displacement per iteration.
    pub displacement_history: Vec<f64>,
    /// Longest displacement applied in any iteration.
    pub max_displacement: f64,
    /// Front-face projections over all iterations.
    pub projected: usize,
    /// Inside push-outs over all iterations.
    pub pushed_out: usize,
    /// Missed projections over all iterations.
    pub missed: usize,
    /// Vertices restored to their pre-fit position by interior push-back.
    pub restored: usize,
    /// Vertices held fixed as openings.
    pub fixed_vertices: usize,
    /// Vertices treated as sharp features.
    pub feature_vertices: usize,
}

impl FitReport {
    /// Whether the fit converged early.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.outcome == FitOutcome::Converged
    }

    /// Mean target distance measured in the last iteration.
    #[must_use]
    pub fn final_target_distance(&self) -> Option<f64> {
        self.target_distance_history.last().copied()
    }
}

/// Where a vertex wants to go.
#[derive(Debug, Clone, Copy)]
enum Projection {
    /// Outside the target; front-face hit.
    Surface(Point3<f64>),
    /// Inside the target; exit point behind the vertex.
    Inside(Point3<f64>),
    Miss,
}

fn is_finite_point(p: &Point3<f64>) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}

fn clamp_length(v: Vector3<f64>, max: f64) -> Vector3<f64> {
    let len = v.norm();
    if len > max { v * (max / len) } else { v }
}

fn project(target: &SpatialIndex, p: &Point3<f64>, offset: f64) -> Projection {
    let Some(inward) = (target.centroid() - p).try_normalize(1e-12) else {
        return Projection::Miss;
    };
    let cast = |dir: Vector3<f64>| match target.query_ray(*p, dir, 0.0, f64::INFINITY) {
        Ok(hit) => hit,
        Err(e) => {
            debug!(error = %e, "Projection ray rejected");
            None
        }
    };

    if let Some(hit) = cast(inward).filter(|h| h.front_face) {
        let desired = hit.point + hit.normal * offset;
        return if is_finite_point(&desired) {
            Projection::Surface(desired)
        } else {
            Projection::Miss
        };
    }

    match cast(-inward) {
        Some(hit) if !hit.front_face => {
            let desired = hit.point + hit.normal * offset;
            if is_finite_point(&desired) {
                Projection::Inside(desired)
            } else {
                Projection::Miss
            }
        }
        _ => Projection::Miss,
    }
}

/// Depth below the target surface, if `p` is inside.
fn interior_depth(target: &SpatialIndex, p: &Point3<f64>) -> Option<f64> {
    if !target.is_inside(p) {
        return None;
    }
    let outward = (p - target.centroid()).try_normalize(1e-12)?;
    match target.query_ray(*p, outward, 0.0, f64::INFINITY) {
        Ok(Some(hit)) if !hit.front_face => Some(hit.t),
        _ => None,
    }
}

/// A fit in progress, advanced one iteration per [`step`](Self::step).
///
/// Hosts that need to stay responsive call `step` between frames; everything
/// else uses [`fit_shrinkwrap`]. The stepper holds the source mesh mutably,
/// so no other fit can touch it until [`finish`](Self::finish).
///
/// # Example
///
/// ```
/// use armor_shrinkwrap::{FittingParameters, Shrinkwrap};
/// use armor_spatial::SpatialIndex;
/// use armor_types::{subdivided_box, uv_sphere, Point3};
///
/// let target = SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 24, 12)).unwrap();
/// let mut armor = subdivided_box(Point3::origin(), 1.2, 4);
/// let params = FittingParameters::default();
///
/// let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();
/// while let Some(stats) = fit.step() {
///     assert!(stats.max_displacement <= params.max_displacement + 1e-12);
/// }
/// let report = fit.finish();
/// assert!(report.iterations > 0);
/// ```
#[derive(Debug)]
pub struct Shrinkwrap<'a> {
    mesh: &'a mut Mesh,
    target: &'a SpatialIndex,
    params: &'a FittingParameters,
    neighborhood: Neighborhood,
    receive_scale: Vec<f64>,
    fixed: Vec<bool>,
    original: Vec<Point3<f64>>,
    iteration: usize,
    outcome: Option<FitOutcome>,
    history: Vec<IterationStats>,
    feature_vertices: usize,
}

impl<'a> Shrinkwrap<'a> {
    /// Validate parameters and precompute connectivity.
    ///
    /// # Errors
    ///
    /// - [`FitError::InvalidParams`] if a parameter is out of range
    /// - [`FitError::InvalidTarget`] if the target has no triangles
    pub fn new(
        mesh: &'a mut Mesh,
        target: &'a SpatialIndex,
        params: &'a FittingParameters,
    ) -> FitResult<Self> {
        params.validate()?;
        if target.triangle_count() == 0 {
            return Err(FitError::invalid_target("target has no triangles"));
        }

        let n = mesh.vertex_count();
        let adjacency = mesh.vertex_neighbors();
        let neighborhood = Neighborhood::build(&adjacency, params.smoothing_radius, params.parallel);

        let mut feature_vertices = 0;
        let receive_scale = if params.preserve_features {
            mesh.max_dihedral_angles(&adjacency)
                .into_iter()
                .map(|angle| {
                    if angle > params.feature_angle_threshold {
                        feature_vertices += 1;
                        params.feature_smoothing_factor
                    } else {
                        1.0
                    }
                })
                .collect()
        } else {
            vec![1.0; n]
        };

        let mut fixed = vec![false; n];
        if params.preserve_openings {
            let openings: HashSet<u32> = params
                .opening_vertices
                .clone()
                .unwrap_or_else(|| adjacency.boundary_vertices());
            for v in openings {
                if let Some(slot) = fixed.get_mut(v as usize) {
                    *slot = true;
                }
            }
        }

        info!(
            vertices = n,
            max_hop = neighborhood.max_hop(),
            fixed = fixed.iter().filter(|&&f| f).count(),
            features = feature_vertices,
            "Shrinkwrap initialized"
        );

        Ok(Self {
            original: mesh.positions.clone(),
            mesh,
            target,
            params,
            neighborhood,
            receive_scale,
            fixed,
            iteration: 0,
            outcome: None,
            history: Vec::new(),
            feature_vertices,
        })
    }

    /// Run one iteration. Returns `None` once the fit has ended.
    pub fn step(&mut self) -> Option<IterationStats> {
        if self.outcome.is_some() {
            return None;
        }
        if self.iteration >= self.params.iterations {
            self.outcome = Some(FitOutcome::MaxIterationsReached);
            return None;
        }

        let stats = self.run_iteration();
        self.iteration += 1;
        self.history.push(stats);

        debug!(
            iteration = stats.iteration,
            distance = stats.mean_target_distance,
            displacement = stats.mean_displacement,
            projected = stats.projected,
            pushed_out = stats.pushed_out,
            missed = stats.missed,
            "Shrinkwrap iteration"
        );

        if stats.mean_displacement < self.params.convergence_epsilon {
            self.outcome = Some(FitOutcome::Converged);
        } else if self.iteration >= self.params.iterations {
            self.outcome = Some(FitOutcome::MaxIterationsReached);
        }
        Some(stats)
    }

    /// Stop before the next iteration.
    pub fn cancel(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(FitOutcome::Cancelled);
        }
    }

    /// Whether no further iteration will run.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Iterations completed so far.
    #[must_use]
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    /// Per-iteration measurements so far.
    #[must_use]
    pub fn history(&self) -> &[IterationStats] {
        &self.history
    }

    /// The mesh being fitted.
    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    /// End the fit, run interior push-back if enabled, and summarize.
    ///
    /// Push-back is skipped for a cancelled fit.
    #[must_use]
    pub fn finish(mut self) -> FitReport {
        let outcome = self.outcome.unwrap_or(FitOutcome::MaxIterationsReached);
        let restored = if self.params.push_back_interior && outcome != FitOutcome::Cancelled {
            self.push_back()
        } else {
            0
        };

        FitReport {
            outcome,
            iterations: self.iteration,
            target_distance_history: self.history.iter().map(|s| s.mean_target_distance).collect(),
            displacement_history: self.history.iter().map(|s| s.mean_displacement).collect(),
            max_displacement: self.history.iter().map(|s| s.max_displacement).fold(0.0, f64::max),
            projected: self.history.iter().map(|s| s.projected).sum(),
            pushed_out: self.history.iter().map(|s| s.pushed_out).sum(),
            missed: self.history.iter().map(|s| s.missed).sum(),
            restored,
            fixed_vertices: self.fixed.iter().filter(|&&f| f).count(),
            feature_vertices: self.feature_vertices,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample(&self) -> Vec<u32> {
        let n = self.mesh.vertex_count();
        let stride = if self.params.sample_rate >= 1.0 {
            1
        } else {
            ((1.0 / self.params.sample_rate).ceil() as usize).max(1)
        };
        // Rotate so every vertex is visited once per `stride` iterations
        let offset = self.iteration % stride;
        (offset..n)
            .step_by(stride)
            .filter(|&v| !self.fixed[v])
            .map(|v| v as u32)
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn run_iteration(&mut self) -> IterationStats {
        let n = self.mesh.vertex_count();
        let world = self.mesh.world_positions();
        let sampled = self.sample();

        let target = self.target;
        let offset = self.params.target_offset;
        let project_one = |&v: &u32| (v, project(target, &world[v as usize], offset));
        let projections: Vec<(u32, Projection)> =
            if self.params.parallel && sampled.len() >= PARALLEL_THRESHOLD {
                sampled.par_iter().map(project_one).collect()
            } else {
                sampled.iter().map(project_one).collect()
            };

        let step = self.params.step_size;
        let max = self.params.max_displacement;
        let mut stats = IterationStats {
            iteration: self.iteration + 1,
            ..IterationStats::default()
        };

        // Damp & clamp
        let mut distance_sum = 0.0;
        let mut own: Vec<(u32, Vector3<f64>)> = Vec::with_capacity(projections.len());
        for (v, projection) in projections {
            let (desired, scale) = match projection {
                Projection::Surface(desired) => {
                    stats.projected += 1;
                    (desired, step)
                }
                Projection::Inside(desired) => {
                    stats.pushed_out += 1;
                    (desired, (2.0 * step).min(1.0))
                }
                Projection::Miss => {
                    stats.missed += 1;
                    continue;
                }
            };
            let delta = desired - world[v as usize];
            distance_sum += delta.norm();
            own.push((v, clamp_length(delta * scale, max)));
        }

        // Smooth: a vertex keeps its own displacement at full weight and takes
        // in neighbors' at their hop weight times the smoothing strength
        let strength = self.params.smoothing_strength;
        let mut sum_d = vec![Vector3::zeros(); n];
        let mut sum_w = vec![0.0_f64; n];
        for &(s, d) in &own {
            for &(r, w) in self.neighborhood.of(s as usize) {
                let r = r as usize;
                if self.fixed[r] {
                    continue;
                }
                let c = if r == s as usize {
                    1.0
                } else {
                    strength * w * self.receive_scale[r]
                };
                if c > 0.0 {
                    sum_d[r] += d * c;
                    sum_w[r] += c;
                }
            }
        }

        let mut total = 0.0;
        for r in 0..n {
            if sum_w[r] <= 0.0 {
                continue;
            }
            let d = clamp_length(sum_d[r] / sum_w[r], max);
            if !d.iter().all(|c| c.is_finite()) {
                continue;
            }
            let len = d.norm();
            let local = self.mesh.to_local_vector(&d);
            self.mesh.positions[r] += local;
            total += len;
            stats.moved += 1;
            stats.max_displacement = stats.max_displacement.max(len);
        }
        self.mesh.recompute_normals();

        let reached = stats.projected + stats.pushed_out;
        if reached == 0 && !sampled.is_empty() {
            warn!(sampled = sampled.len(), "No sampled vertex reached the target");
        }
        stats.mean_target_distance = if reached > 0 {
            distance_sum / reached as f64
        } else {
            0.0
        };
        stats.mean_displacement = if stats.moved > 0 {
            total / stats.moved as f64
        } else {
            0.0
        };
        stats
    }

    /// Restore vertices left inside the target. Returns how many moved back.
    fn push_back(&mut self) -> usize {
        let tolerance = self.params.convergence_epsilon;
        let inside: Vec<usize> = (0..self.mesh.vertex_count())
            .filter(|&v| !self.fixed[v])
            .filter(|&v| {
                interior_depth(self.target, &self.mesh.world_position(v))
                    .is_some_and(|depth| depth > tolerance)
            })
            .collect();

        for &v in &inside {
            self.mesh.positions[v] = self.original[v];
        }
        if !inside.is_empty() {
            self.mesh.recompute_normals();
            warn!(restored = inside.len(), "Restored vertices left inside the target");
        }
        inside.len()
    }
}

/// Fit `source` onto the surface indexed by `target`.
///
/// Runs up to `params.iterations` iterations, reporting progress after each
/// and checking `cancel` before each. On cancellation the mesh keeps the
/// result of the last completed iteration.
///
/// # Errors
///
/// - [`FitError::InvalidParams`] if a parameter is out of range
/// - [`FitError::InvalidTarget`] if the target has no triangles
///
/// # Example
///
/// ```
/// use armor_shrinkwrap::{fit_shrinkwrap, CancelToken, FittingParameters, Progress};
/// use armor_spatial::SpatialIndex;
/// use armor_types::{subdivided_box, uv_sphere, Point3};
///
/// let target = SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 32, 16)).unwrap();
/// let mut armor = subdivided_box(Point3::origin(), 1.0, 6);
///
/// let report = fit_shrinkwrap(
///     &mut armor,
///     &target,
///     &FittingParameters::default(),
///     &Progress::none(),
///     &CancelToken::new(),
/// )
/// .unwrap();
/// assert!(report.final_target_distance().unwrap() < report.target_distance_history[0]);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn fit_shrinkwrap(
    source: &mut Mesh,
    target: &SpatialIndex,
    params: &FittingParameters,
    progress: &Progress,
    cancel: &CancelToken,
) -> FitResult<FitReport> {
    info!(
        vertices = source.vertex_count(),
        target_triangles = target.triangle_count(),
        iterations = params.iterations,
        "Starting shrinkwrap fit"
    );

    let total = params.iterations.max(1) as f64;
    let mut fit = Shrinkwrap::new(source, target, params)?;
    loop {
        if cancel.is_cancelled() {
            fit.cancel();
            break;
        }
        let Some(stats) = fit.step() else {
            break;
        };
        progress.report(
            stats.iteration as f64 / total,
            &format!("Shrinkwrap iteration {}/{}", stats.iteration, params.iterations),
        );
    }

    let report = fit.finish();
    info!(
        outcome = ?report.outcome,
        iterations = report.iterations,
        distance = report.final_target_distance().unwrap_or(0.0),
        restored = report.restored,
        "Shrinkwrap fit finished"
    );
    Ok(report)
}

/// Build an index over `target` and fit `source` onto it.
///
/// # Errors
///
/// Returns [`FitError::InvalidTarget`] if the target has no usable triangles,
/// otherwise as [`fit_shrinkwrap`].
pub fn fit_to_mesh<S: TriangleSource + ?Sized>(
    source: &mut Mesh,
    target: &S,
    params: &FittingParameters,
    progress: &Progress,
    cancel: &CancelToken,
) -> FitResult<FitReport> {
    let index = SpatialIndex::build(target).map_err(|e| match e {
        SpatialError::BuildError { details } => FitError::invalid_target(details),
        other => FitError::from(other),
    })?;
    fit_shrinkwrap(source, &index, params, progress, cancel)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use armor_types::{subdivided_box, uv_sphere};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_sphere_target() -> SpatialIndex {
        SpatialIndex::build(&uv_sphere(Point3::origin(), 1.0, 48, 24)).unwrap()
    }

    /// Mean distance from each vertex to the target along the centroid ray.
    fn mean_surface_distance(mesh: &Mesh, target: &SpatialIndex) -> f64 {
        let (sum, count) = mesh
            .world_positions()
            .iter()
            .filter_map(|p| match project(target, p, 0.0) {
                Projection::Surface(q) | Projection::Inside(q) => Some((q - p).norm()),
                Projection::Miss => None,
            })
            .fold((0.0, 0usize), |(s, c), d| (s + d, c + 1));
        sum / count as f64
    }

    fn serial() -> FittingParameters {
        FittingParameters::default().with_parallel(false)
    }

    #[test]
    fn cube_converges_onto_sphere() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.0, 8);
        let before = mean_surface_distance(&armor, &target);

        let params = serial().with_iterations(10).with_step_size(0.5).with_target_offset(0.0);
        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();

        let after = mean_surface_distance(&armor, &target);
        assert!(before > 0.1, "{before}");
        assert!(after < 0.01, "mean distance {after}");
        assert!(report.iterations <= 10);
        assert_eq!(report.missed, 0);
    }

    #[test]
    fn distance_does_not_increase() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 6);
        let params = serial().with_convergence_epsilon(0.0);
        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();

        assert_eq!(report.outcome, FitOutcome::MaxIterationsReached);
        for pair in report.target_distance_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9, "{pair:?}");
        }
    }

    #[test]
    fn no_vertex_exceeds_max_displacement() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 2.0, 4);
        let params = serial()
            .with_step_size(1.0)
            .with_max_displacement(0.05)
            .with_convergence_epsilon(0.0);

        let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();
        let mut previous = fit.mesh().world_positions();
        while fit.step().is_some() {
            let current = fit.mesh().world_positions();
            for (a, b) in previous.iter().zip(&current) {
                assert!((b - a).norm() <= 0.05 + 1e-12);
            }
            previous = current;
        }
        assert_eq!(fit.iteration(), 10);
    }

    #[test]
    fn displacement_bound_holds_under_world_transform() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.0, 4)
            .with_world(armor_types::Matrix4::new_scaling(2.0))
            .unwrap();
        let params = serial().with_max_displacement(0.1).with_iterations(3);

        let before = armor.world_positions();
        let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();
        let stats = fit.step().unwrap();
        assert!(stats.max_displacement <= 0.1 + 1e-12);
        let after = fit.mesh().world_positions();
        for (a, b) in before.iter().zip(&after) {
            assert!((b - a).norm() <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn vertices_inside_are_pushed_out() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 0.3, 4);
        let params = serial().with_iterations(1);
        let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();
        let stats = fit.step().unwrap();
        assert_eq!(stats.pushed_out, fit.mesh().vertex_count());
        assert_eq!(stats.projected, 0);
    }

    #[test]
    fn opening_vertices_stay_put() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let original = armor.positions.clone();
        let openings: HashSet<u32> = (0..10).collect();
        let params = serial().with_opening_vertices(openings.clone());

        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();

        assert_eq!(report.fixed_vertices, 10);
        for v in openings {
            assert_eq!(armor.positions[v as usize], original[v as usize]);
        }
        assert!(armor.positions[20] != original[20]);
    }

    #[test]
    fn boundary_is_the_default_opening() {
        let target = create_sphere_target();
        let cube = subdivided_box(Point3::origin(), 1.5, 4);
        // Remove the top face to open the mesh
        let faces: Vec<[u32; 3]> = cube
            .faces()
            .filter(|f| !f.iter().all(|&v| cube.positions[v as usize].y > 1.49))
            .collect();
        let mut armor = Mesh::new(cube.positions.clone(), Some(faces), None).unwrap();
        let boundary = armor.boundary_vertices();
        assert!(!boundary.is_empty());

        let params = serial().with_opening_preservation(true);
        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();

        assert_eq!(report.fixed_vertices, boundary.len());
        for v in boundary {
            assert_eq!(armor.positions[v as usize], cube.positions[v as usize]);
        }
    }

    #[test]
    fn push_back_restores_interior_vertices() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 0.3, 2);
        let original = armor.positions.clone();
        // A tiny step leaves everything inside after one iteration
        let params = serial()
            .with_iterations(1)
            .with_step_size(0.01)
            .with_push_back_interior(true);

        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();

        assert_eq!(report.restored, armor.vertex_count());
        assert_eq!(armor.positions, original);
    }

    #[test]
    fn cancelled_fit_leaves_mesh_untouched() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let original = armor.positions.clone();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = fit_shrinkwrap(&mut armor, &target, &serial(), &Progress::none(), &cancel).unwrap();
        assert_eq!(report.outcome, FitOutcome::Cancelled);
        assert_eq!(report.iterations, 0);
        assert_eq!(armor.positions, original);
    }

    #[test]
    fn progress_is_reported_once_per_iteration() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |fraction, _| {
            assert!((0.0..=1.0).contains(&fraction));
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let params = serial().with_iterations(4).with_convergence_epsilon(0.0);
        let report = fit_shrinkwrap(&mut armor, &target, &params, &progress, &CancelToken::new()).unwrap();
        assert_eq!(report.iterations, 4);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn sparse_sampling_still_moves_every_vertex() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let original = armor.positions.clone();
        let params = serial()
            .with_sample_rate(0.25)
            .with_iterations(4)
            .with_convergence_epsilon(0.0);

        fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new()).unwrap();
        for (a, b) in original.iter().zip(&armor.positions) {
            assert!((b - a).norm() > 0.0);
        }
    }

    #[test]
    fn axis_rays_through_grid_planes_reach_a_box_target() {
        let target = SpatialIndex::build(&subdivided_box(Point3::origin(), 1.0, 4)).unwrap();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let params = serial().with_iterations(1);

        let mut fit = Shrinkwrap::new(&mut armor, &target, &params).unwrap();
        let stats = fit.step().unwrap();
        assert_eq!(stats.missed, 0);
        assert_eq!(stats.projected, 98);
        assert_eq!(stats.pushed_out, 0);
    }

    #[test]
    fn feature_vertices_are_detected() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 4);
        let params = serial().with_feature_preservation(true);
        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();
        // Cube edges and corners: 12 edges * 3 interior + 8 corners
        assert_eq!(report.feature_vertices, 44);
    }

    #[test]
    fn empty_target_is_invalid() {
        let degenerate = Mesh::new(vec![Point3::origin(); 3], Some(vec![[0, 1, 2]]), None).unwrap();
        let mut armor = subdivided_box(Point3::origin(), 1.0, 2);
        let err = fit_to_mesh(
            &mut armor,
            &degenerate,
            &serial(),
            &Progress::none(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::InvalidTarget { .. }));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.0, 2);
        let params = serial().with_step_size(0.0);
        assert!(matches!(
            Shrinkwrap::new(&mut armor, &target, &params),
            Err(FitError::InvalidParams(_))
        ));
    }

    #[test]
    fn zero_iterations_changes_nothing() {
        let target = create_sphere_target();
        let mut armor = subdivided_box(Point3::origin(), 1.5, 2);
        let original = armor.positions.clone();
        let params = serial().with_iterations(0);
        let report =
            fit_shrinkwrap(&mut armor, &target, &params, &Progress::none(), &CancelToken::new())
                .unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.outcome, FitOutcome::MaxIterationsReached);
        assert_eq!(armor.positions, original);
    }
}
