//! Minimum-curvature surface fitting.
//!
//! The surface minimises the discrete curvature energy
//! `sum(z_xx^2 + z_yy^2 + 2 z_xy^2)` over the lattice while holding the
//! nodes nearest to each data point fixed. The problem is solved on a
//! pyramid of lattices, coarsest first, each level seeded by bilinear
//! interpolation of the one before. The coarsest level starts from the
//! least-squares plane through the data.

use super::{blockmedian, Grid, Gridder, GriddingError};
use crate::params::{Region, Spacing};
use crate::utils::XyzPoint;

/// Coarsest level keeps at least this many intervals along each axis.
const MIN_LEVEL_INTERVALS: usize = 4;

/// Residual norm, relative to the data range, treated as converged outright.
const RESIDUAL_FLOOR: f64 = 1.0e-10;

#[derive(Debug, Clone)]
pub struct MinimumCurvature {
    max_iterations: usize,
    convergence_limit: f64,
}

impl MinimumCurvature {
    /// `convergence_limit` is the residual reduction each level must reach,
    /// relative to the residual it starts from.
    pub fn new(max_iterations: usize, convergence_limit: f64) -> Self {
        Self {
            max_iterations,
            convergence_limit,
        }
    }
}

impl Default for MinimumCurvature {
    fn default() -> Self {
        Self::new(2000, 1.0e-6)
    }
}

/// A data point in fine-lattice units: `u` columns east and `v` rows north of the origin.
#[derive(Debug, Clone, Copy)]
struct Constraint {
    u: f64,
    v: f64,
    z: f64,
}

/// Least-squares plane `z = z0 + bu (u - cu) + bv (v - cv)`.
#[derive(Debug, Clone, Copy)]
struct Plane {
    z0: f64,
    cu: f64,
    cv: f64,
    bu: f64,
    bv: f64,
}

impl Plane {
    fn fit(constraints: &[Constraint]) -> Result<Self, GriddingError> {
        let n = constraints.len() as f64;
        let cu = constraints.iter().map(|c| c.u).sum::<f64>() / n;
        let cv = constraints.iter().map(|c| c.v).sum::<f64>() / n;
        let z0 = constraints.iter().map(|c| c.z).sum::<f64>() / n;

        let (mut suu, mut svv, mut suv, mut suz, mut svz) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for c in constraints {
            let du = c.u - cu;
            let dv = c.v - cv;
            let dz = c.z - z0;
            suu += du * du;
            svv += dv * dv;
            suv += du * dv;
            suz += du * dz;
            svz += dv * dz;
        }

        let det = suu * svv - suv * suv;
        let scale = (suu + svv) * (suu + svv);
        if scale == 0.0 || det <= 1.0e-12 * scale {
            return Err(GriddingError::Collinear);
        }
        Ok(Self {
            z0,
            cu,
            cv,
            bu: (suz * svv - svz * suv) / det,
            bv: (svz * suu - suz * suv) / det,
        })
    }

    #[inline]
    fn at(&self, u: f64, v: f64) -> f64 {
        self.z0 + self.bu * (u - self.cu) + self.bv * (v - self.cv)
    }
}

/// One pyramid level: a lattice whose node spacing is `factor` fine nodes.
struct Lattice {
    nx: usize,
    ny: usize,
    factor: usize,
    z: Vec<f64>,
    fixed: Vec<bool>,
}

impl Lattice {
    fn new(fine_nx: usize, fine_ny: usize, factor: usize) -> Self {
        let nx = (fine_nx - 1).div_ceil(factor) + 1;
        let ny = (fine_ny - 1).div_ceil(factor) + 1;
        Self {
            nx,
            ny,
            factor,
            z: vec![0.0; nx * ny],
            fixed: vec![false; nx * ny],
        }
    }

    /// Bilinear sample at lattice coordinates `(s, t)`, clamped to the edges.
    fn sample(&self, s: f64, t: f64) -> f64 {
        let i0 = (s.max(0.0).floor() as usize).min(self.nx.saturating_sub(2));
        let j0 = (t.max(0.0).floor() as usize).min(self.ny.saturating_sub(2));
        let i1 = (i0 + 1).min(self.nx - 1);
        let j1 = (j0 + 1).min(self.ny - 1);
        let fs = (s - i0 as f64).clamp(0.0, 1.0);
        let ft = (t - j0 as f64).clamp(0.0, 1.0);

        let z00 = self.z[j0 * self.nx + i0];
        let z10 = self.z[j0 * self.nx + i1];
        let z01 = self.z[j1 * self.nx + i0];
        let z11 = self.z[j1 * self.nx + i1];
        (1.0 - ft) * ((1.0 - fs) * z00 + fs * z10) + ft * ((1.0 - fs) * z01 + fs * z11)
    }

    fn seed_from_plane(&mut self, plane: &Plane) {
        let f = self.factor as f64;
        for j in 0..self.ny {
            for i in 0..self.nx {
                self.z[j * self.nx + i] = plane.at(i as f64 * f, j as f64 * f);
            }
        }
    }

    fn seed_from_coarser(&mut self, coarser: &Lattice) {
        let ratio = self.factor as f64 / coarser.factor as f64;
        for j in 0..self.ny {
            for i in 0..self.nx {
                self.z[j * self.nx + i] = coarser.sample(i as f64 * ratio, j as f64 * ratio);
            }
        }
    }

    /// Fixes the node nearest to each constraint. Values are moved to the
    /// node along the trend plane and averaged when several share a node.
    fn fix_constraints(&mut self, constraints: &[Constraint], plane: &Plane) -> usize {
        let f = self.factor as f64;
        let mut sum = vec![0.0; self.nx * self.ny];
        let mut count = vec![0u32; self.nx * self.ny];
        for c in constraints {
            let i = ((c.u / f).round().max(0.0) as usize).min(self.nx - 1);
            let j = ((c.v / f).round().max(0.0) as usize).min(self.ny - 1);
            let k = j * self.nx + i;
            sum[k] += c.z + plane.bu * (i as f64 * f - c.u) + plane.bv * (j as f64 * f - c.v);
            count[k] += 1;
        }

        let mut fixed = 0;
        for k in 0..sum.len() {
            if count[k] > 0 {
                self.z[k] = sum[k] / f64::from(count[k]);
                self.fixed[k] = true;
                fixed += 1;
            }
        }
        fixed
    }

    /// `out = A p`, where `A` is the Hessian (halved) of the curvature energy.
    fn apply(&self, p: &[f64], out: &mut [f64]) {
        let (nx, ny) = (self.nx, self.ny);
        out.fill(0.0);

        for j in 0..ny {
            for i in 1..nx.saturating_sub(1) {
                let k = j * nx + i;
                let d = p[k - 1] - 2.0 * p[k] + p[k + 1];
                out[k - 1] += d;
                out[k] -= 2.0 * d;
                out[k + 1] += d;
            }
        }

        for j in 1..ny.saturating_sub(1) {
            for i in 0..nx {
                let k = j * nx + i;
                let d = p[k - nx] - 2.0 * p[k] + p[k + nx];
                out[k - nx] += d;
                out[k] -= 2.0 * d;
                out[k + nx] += d;
            }
        }

        for j in 0..ny.saturating_sub(1) {
            for i in 0..nx.saturating_sub(1) {
                let k = j * nx + i;
                let d = 2.0 * (p[k + nx + 1] - p[k + 1] - p[k + nx] + p[k]);
                out[k + nx + 1] += d;
                out[k + 1] -= d;
                out[k + nx] -= d;
                out[k] += d;
            }
        }
    }

    /// Conjugate gradients on the free nodes. Returns the iteration count.
    ///
    /// Stops once the residual norm has fallen to `tolerance` times its
    /// starting value, or below `floor`, or after `max_iterations`.
    fn relax(&mut self, max_iterations: usize, tolerance: f64, floor: f64) -> usize {
        let n = self.z.len();
        let mut r = vec![0.0; n];
        let mut ap = vec![0.0; n];

        self.apply(&self.z, &mut r);
        for k in 0..n {
            r[k] = if self.fixed[k] { 0.0 } else { -r[k] };
        }
        let mut p = r.clone();
        let mut rr = dot(&r, &r);
        let target = (tolerance * tolerance * rr).max(floor * floor);

        for iteration in 0..max_iterations {
            if rr <= target {
                return iteration;
            }
            self.apply(&p, &mut ap);
            for (value, &fixed) in ap.iter_mut().zip(&self.fixed) {
                if fixed {
                    *value = 0.0;
                }
            }
            let pap = dot(&p, &ap);
            if pap <= 0.0 {
                return iteration;
            }

            let alpha = rr / pap;
            for k in 0..n {
                self.z[k] += alpha * p[k];
                r[k] -= alpha * ap[k];
            }

            let rr_next = dot(&r, &r);
            let beta = rr_next / rr;
            for k in 0..n {
                p[k] = r[k] + beta * p[k];
            }
            rr = rr_next;
        }
        log::debug!(
            "Surface level stopped at the iteration cap, residual {:.3e}",
            rr.sqrt()
        );
        max_iterations
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl MinimumCurvature {
    /// Fits the surface to `points` without the block-median pre-filter.
    pub fn fit(&self, points: &[XyzPoint], region: &Region, spacing: Spacing) -> Result<Grid, GriddingError> {
        let mut grid = Grid::from_region(region, spacing)?;
        let (nx, ny) = (grid.width(), grid.height());

        let constraints: Vec<Constraint> = points
            .iter()
            .filter(|p| region.contains(p.x, p.y))
            .map(|p| Constraint {
                u: (p.x - region.west) / spacing.x_inc,
                v: (p.y - region.south) / spacing.y_inc,
                z: p.z,
            })
            .collect();
        if constraints.len() < 3 {
            return Err(GriddingError::TooFewPoints {
                found: constraints.len(),
                required: 3,
            });
        }
        let plane = Plane::fit(&constraints)?;

        let (zmin, zmax) = constraints
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.z), hi.max(c.z)));
        // residuals below this are rounding noise for data of this range
        let floor = RESIDUAL_FLOOR * (zmax - zmin);

        let mut factor = 1;
        while (nx - 1) / (factor * 2) >= MIN_LEVEL_INTERVALS && (ny - 1) / (factor * 2) >= MIN_LEVEL_INTERVALS {
            factor *= 2;
        }

        let mut coarser: Option<Lattice> = None;
        let lattice = loop {
            let mut lattice = Lattice::new(nx, ny, factor);
            match &coarser {
                Some(prev) => lattice.seed_from_coarser(prev),
                None => lattice.seed_from_plane(&plane),
            }
            let fixed = lattice.fix_constraints(&constraints, &plane);
            let iterations = lattice.relax(self.max_iterations, self.convergence_limit, floor);
            log::debug!(
                "Surface level 1/{}: {} x {} nodes, {} fixed, {} iterations",
                factor,
                lattice.nx,
                lattice.ny,
                fixed,
                iterations
            );
            if factor == 1 {
                break lattice;
            }
            factor /= 2;
            coarser = Some(lattice);
        };

        for (out, z) in grid.values_mut().iter_mut().zip(&lattice.z) {
            *out = *z as f32;
        }
        Ok(grid)
    }
}

impl Gridder for MinimumCurvature {
    fn name(&self) -> &'static str {
        "minimum curvature"
    }

    fn grid(&self, points: &[XyzPoint], region: &Region, spacing: Spacing) -> Result<Grid, GriddingError> {
        let filtered = blockmedian(points, region, spacing)?;
        self.fit(&filtered, region, spacing)
    }
}
