//! Scale distribution function (SDF) and the pressure extrapolated from it.
//!
//! For every particle the estimator finds the smallest scale factor `x` such
//! that shrinking some pair separation `r` to `(1 - x) r` produces an
//! overlap, and histograms those minima. Separations are taken raw and every
//! periodic image that can come within range is scanned; minimum-image
//! wrapping is deliberately not applied so that small boxes, where a particle
//! can collide with its own image, are measured correctly. This differs from
//! the free-volume estimator, which uses minimum-image separations.

use hpmc_core::{
    ConfigurationProvider, Dimensions, ErrorInfo, HpmcError, OverlapOracle, Pose, Shape,
};
use nalgebra::{UnitQuaternion, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::{bin_count, SdfConfig};
use crate::dispatch;
use crate::fit::{polyfit, polyval};

/// Degree of the polynomial fitted to the histogram for the `x -> 0` limit.
pub const PRESSURE_FIT_DEGREE: usize = 5;

/// Scale distribution histogram over `x` in `[0, xmax)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdfHistogram {
    /// Upper end of the tracked range.
    pub xmax: f64,
    /// Bin width.
    pub dx: f64,
    /// Raw per-bin counts; bin `k` covers `[k dx, (k + 1) dx)`.
    pub counts: Vec<u64>,
    /// Probability density per bin, `count / n_particles / dx`.
    pub density: Vec<f64>,
    /// Number of particles in the configuration.
    pub n_particles: usize,
    /// Box volume (area in 2D) at the time of the measurement.
    pub box_volume: f64,
    /// Dimensionality of the system.
    pub dimensions: Dimensions,
}

impl SdfHistogram {
    /// Builds a histogram from raw counts.
    pub fn from_counts(
        xmax: f64,
        dx: f64,
        counts: Vec<u64>,
        n_particles: usize,
        box_volume: f64,
        dimensions: Dimensions,
    ) -> Self {
        let norm = if n_particles > 0 {
            1.0 / (n_particles as f64 * dx)
        } else {
            f64::NAN
        };
        let density = counts.iter().map(|&c| c as f64 * norm).collect();
        Self {
            xmax,
            dx,
            counts,
            density,
            n_particles,
            box_volume,
            dimensions,
        }
    }

    /// Builds a histogram directly from densities, leaving the counts at zero.
    pub fn from_density(
        xmax: f64,
        dx: f64,
        density: Vec<f64>,
        n_particles: usize,
        box_volume: f64,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            xmax,
            dx,
            counts: vec![0; density.len()],
            density,
            n_particles,
            box_volume,
            dimensions,
        }
    }

    /// Histogram standing for a measurement that was not taken here.
    pub fn undefined(xmax: f64, dx: f64, dimensions: Dimensions) -> Self {
        let bins = bin_count(xmax, dx);
        Self::from_density(
            xmax,
            dx,
            vec![f64::NAN; bins],
            0,
            f64::NAN,
            dimensions,
        )
    }

    /// Returns true when at least one density entry is finite.
    pub fn is_defined(&self) -> bool {
        self.density.iter().any(|v| v.is_finite())
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.density.len()
    }

    /// Returns true for a histogram without bins.
    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    /// Bin centres `k dx + dx / 2`.
    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.density.len())
            .map(|k| k as f64 * self.dx + self.dx / 2.0)
            .collect()
    }

    /// Integral of the density over the tracked range, skipping undefined bins.
    pub fn integral(&self) -> f64 {
        self.density
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| v * self.dx)
            .sum()
    }

    /// Pressure `beta P = rho (1 + s(0+) / (2 d))` from a degree-5 fit of the density.
    ///
    /// Returns `None` when the histogram holds no finite entries, when the box
    /// volume is unknown, or when the fit cannot be solved.
    pub fn beta_p(&self) -> Option<f64> {
        let (x, y): (Vec<f64>, Vec<f64>) = self
            .bin_centers()
            .into_iter()
            .zip(self.density.iter().copied())
            .filter(|(_, v)| v.is_finite())
            .unzip();
        if x.is_empty() || !(self.box_volume.is_finite() && self.box_volume > 0.0) {
            return None;
        }
        let degree = PRESSURE_FIT_DEGREE.min(x.len() - 1);
        let coefficients = polyfit(&x, &y, degree).ok()?;
        let s0 = polyval(&coefficients, 0.0);
        let rho = self.n_particles as f64 / self.box_volume;
        Some(rho * (1.0 + s0 / (2.0 * self.dimensions.as_f64())))
    }
}

/// Placed neighbour candidate used by the per-particle search.
struct Neighbour<'a> {
    separation: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    shape: &'a Shape,
}

/// Scale distribution function estimator.
#[derive(Debug, Clone)]
pub struct Sdf {
    config: SdfConfig,
}

impl Sdf {
    /// Creates an estimator after validating the histogram range.
    pub fn new(config: SdfConfig) -> Result<Self, HpmcError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &SdfConfig {
        &self.config
    }

    /// Accumulates a fresh histogram for the current configuration.
    #[instrument(skip_all, fields(xmax = self.config.xmax, dx = self.config.dx))]
    pub fn compute<P, O>(&self, system: &P, oracle: &O) -> Result<SdfHistogram, HpmcError>
    where
        P: ConfigurationProvider + ?Sized,
        O: OverlapOracle + ?Sized,
    {
        let sim_box = *system.sim_box();
        let dims = sim_box.dimensions;
        let xmax = self.config.xmax;
        let dx = self.config.dx;
        let bins = self.config.bin_count();
        let n_particles = system.particle_count();

        let mut shapes: Vec<Option<&Shape>> = vec![None; system.type_count()];
        let mut max_radius: f64 = 0.0;
        for index in 0..n_particles {
            let type_id = system.type_of(index);
            if shapes[type_id].is_none() {
                let shape = system.require_shape(type_id)?;
                shape.validate(dims)?;
                max_radius = max_radius.max(shape.circumsphere_radius());
                shapes[type_id] = Some(shape);
            }
        }
        for a in shapes.iter().flatten() {
            for b in shapes.iter().flatten() {
                if !oracle.supports(a.kind(), b.kind(), dims) {
                    return Err(HpmcError::UnsupportedCombination(
                        ErrorInfo::new("no-overlap-test", "oracle cannot test the pair")
                            .with_context("a", a.kind().as_str())
                            .with_context("b", b.kind().as_str()),
                    ));
                }
            }
        }

        let cutoff = 2.0 * max_radius / (1.0 - xmax);
        let offsets = sim_box.image_offsets(cutoff);
        debug!(images = offsets.len(), cutoff, "scanning periodic images");

        let search = SearchParams {
            xmax,
            dx,
            bins,
            dims,
        };
        let mut particles = Vec::with_capacity(n_particles);
        for index in 0..n_particles {
            let type_id = system.type_of(index);
            let shape = shapes[type_id].ok_or_else(|| HpmcError::missing_shape(type_id))?;
            particles.push((
                system.position(index),
                system.orientation(index),
                type_id,
                shape,
            ));
        }
        let n_types = system.type_count();
        let interacts: Vec<Vec<bool>> = (0..n_types)
            .map(|a| (0..n_types).map(|b| system.interacts(a, b)).collect())
            .collect();

        let minima: Vec<Option<usize>> = dispatch::install(self.config.threads, || {
            (0..n_particles)
                .into_par_iter()
                .map(|i| -> Result<Option<usize>, HpmcError> {
                    let (pos_i, orient_i, type_i, shape_i) = particles[i];
                    let pose_i = Pose::new(Vector3::zeros(), orient_i);
                    let reach_i = shape_i.circumsphere_radius();
                    let mut best: Option<usize> = None;
                    for (j, &(pos_j, orient_j, type_j, shape_j)) in particles.iter().enumerate() {
                        if !interacts[type_i][type_j] {
                            continue;
                        }
                        let reach = (reach_i + shape_j.circumsphere_radius()) / (1.0 - xmax);
                        for (image, offset) in offsets.iter().enumerate() {
                            if i == j && image == 0 {
                                continue;
                            }
                            let separation = pos_j + offset - pos_i;
                            if separation.norm() >= reach {
                                continue;
                            }
                            let neighbour = Neighbour {
                                separation,
                                orientation: orient_j,
                                shape: shape_j,
                            };
                            if let Some(bin) =
                                search.min_bin(oracle, shape_i, &pose_i, &neighbour, best)?
                            {
                                best = Some(bin);
                            }
                            if best == Some(0) {
                                return Ok(best);
                            }
                        }
                    }
                    Ok(best)
                })
                .collect::<Result<Vec<_>, HpmcError>>()
        })??;

        let mut counts = vec![0u64; bins];
        for bin in minima.into_iter().flatten() {
            counts[bin] += 1;
        }
        let histogram =
            SdfHistogram::from_counts(xmax, dx, counts, n_particles, sim_box.volume(), dims);
        info!(
            particles = n_particles,
            integral = histogram.integral(),
            "sdf accumulated"
        );
        Ok(histogram)
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchParams {
    xmax: f64,
    dx: f64,
    bins: usize,
    dims: Dimensions,
}

impl SearchParams {
    /// Upper edge of bin `k`, clipped to `xmax`.
    fn edge(&self, k: usize) -> f64 {
        ((k + 1) as f64 * self.dx).min(self.xmax)
    }

    /// Smallest bin at which the pair overlaps, if it is below `best`.
    fn min_bin<O: OverlapOracle + ?Sized>(
        &self,
        oracle: &O,
        shape_i: &Shape,
        pose_i: &Pose,
        neighbour: &Neighbour<'_>,
        best: Option<usize>,
    ) -> Result<Option<usize>, HpmcError> {
        let limit = best.unwrap_or(self.bins);
        if limit == 0 {
            return Ok(None);
        }

        if let (Shape::Sphere { diameter: di }, Shape::Sphere { diameter: dj }) =
            (shape_i, neighbour.shape)
        {
            let sigma = (di + dj) / 2.0;
            let r = neighbour.separation.norm();
            let x = if r <= sigma { 0.0 } else { 1.0 - sigma / r };
            if x >= self.xmax {
                return Ok(None);
            }
            let bin = ((x / self.dx).floor() as usize).min(self.bins - 1);
            return Ok((bin < limit).then_some(bin));
        }

        let overlaps_at = |x: f64| -> Result<bool, HpmcError> {
            let pose_j = Pose::new(neighbour.separation * (1.0 - x), neighbour.orientation);
            oracle.overlaps(shape_i, pose_i, neighbour.shape, &pose_j, self.dims)
        };

        // the pair must already overlap at the upper edge of the last useful bin
        let mut hi = limit - 1;
        if !overlaps_at(self.edge(hi))? {
            return Ok(None);
        }
        let mut lo = 0;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if overlaps_at(self.edge(mid))? {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(Some(lo))
    }
}
