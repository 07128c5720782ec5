// Shared geometry, density and model interfaces

use std::ops::{Add, Div, Mul, Sub};

use crate::crw_batch::{BatchContext, BatchCriteria, ExpContext};
use crate::crw_error::ModelResult;
use crate::crw_quadrature::Quadrature;
use crate::crw_stats::BatchRow;

/// Time series of a single metric, one value per collection interval
pub type Series = Vec<f64>;

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vector3D {
    type Output = Vector3D;

    fn add(self, rhs: Vector3D) -> Vector3D {
        Vector3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3D {
    type Output = Vector3D;

    fn sub(self, rhs: Vector3D) -> Vector3D {
        Vector3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3D {
    type Output = Vector3D;

    fn mul(self, rhs: f64) -> Vector3D {
        Vector3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vector3D {
    type Output = Vector3D;

    fn div(self, rhs: f64) -> Vector3D {
        Vector3D::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Axis-aligned region of the arena, stored as lower-left corner + dimensions.
///
/// Dimensions are never negative: `from_corners` orders the corners first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaExtent {
    ll: Vector3D,
    dims: Vector3D,
}

impl ArenaExtent {
    pub fn new(dims: Vector3D, ll: Vector3D) -> Self {
        let ur = ll + dims;
        Self::from_corners(ll, ur)
    }

    pub fn from_corners(ll: Vector3D, ur: Vector3D) -> Self {
        let lo = Vector3D::new(ll.x.min(ur.x), ll.y.min(ur.y), ll.z.min(ur.z));
        let hi = Vector3D::new(ll.x.max(ur.x), ll.y.max(ur.y), ll.z.max(ur.z));
        Self {
            ll: lo,
            dims: hi - lo,
        }
    }

    pub fn ll(&self) -> Vector3D {
        self.ll
    }

    pub fn ur(&self) -> Vector3D {
        self.ll + self.dims
    }

    pub fn center(&self) -> Vector3D {
        self.ll + self.dims / 2.0
    }

    pub fn xsize(&self) -> f64 {
        self.dims.x
    }

    pub fn ysize(&self) -> f64 {
        self.dims.y
    }

    pub fn zsize(&self) -> f64 {
        self.dims.z
    }

    pub fn area(&self) -> f64 {
        self.dims.x * self.dims.y
    }

    /// Inclusive containment test in the XY plane
    pub fn contains(&self, pt: Vector3D) -> bool {
        let ur = self.ur();
        pt.x >= self.ll.x && pt.x <= ur.x && pt.y >= self.ll.y && pt.y <= ur.y
    }
}

// ============================================================================
// Density
// ============================================================================

/// A non-negative 2D density over an arena region.
///
/// `at_point(Some(x), Some(y))` is the density itself. Omitting one
/// coordinate asks for the marginal along the other axis, obtained by
/// integrating out the omitted dimension over the density's support.
pub trait Density {
    /// Density at a point
    fn density(&self, x: f64, y: f64) -> f64;

    /// Region outside of which the density is zero
    fn support(&self) -> ArenaExtent;

    fn quadrature(&self) -> &Quadrature;

    fn at_point(&self, x: Option<f64>, y: Option<f64>) -> f64 {
        let support = self.support();
        match (x, y) {
            (Some(x), Some(y)) => self.density(x, y),
            (Some(x), None) => self.marginal_x(x, support.ll().y, support.ur().y),
            (None, Some(y)) => self.marginal_y(y, support.ll().x, support.ur().x),
            (None, None) => self.for_region(support.ll(), support.ur()),
        }
    }

    /// Cumulative probability within the rectangle [ll, ur]
    fn for_region(&self, ll: Vector3D, ur: Vector3D) -> f64 {
        self.quadrature()
            .integrate_2d(|x, y| self.density(x, y), (ll.x, ur.x), (ll.y, ur.y))
            .value
    }

    /// Marginal density in X at `x`, integrating Y over [y0, y1]
    fn marginal_x(&self, x: f64, y0: f64, y1: f64) -> f64 {
        self.quadrature()
            .integrate_inner(|y| self.density(x, y), y0, y1)
            .value
    }

    /// Marginal density in Y at `y`, integrating X over [x0, x1]
    fn marginal_y(&self, y: f64, x0: f64, x1: f64) -> f64 {
        self.quadrature()
            .integrate_inner(|x| self.density(x, y), x0, x1)
            .value
    }

    /// Expected X coordinate of the density mass within [ll, ur]
    fn evx_for_region(&self, ll: Vector3D, ur: Vector3D) -> f64 {
        self.quadrature()
            .integrate(|x| x * self.marginal_x(x, ll.y, ur.y), ll.x, ur.x)
            .value
    }

    /// Expected Y coordinate of the density mass within [ll, ur]
    fn evy_for_region(&self, ll: Vector3D, ur: Vector3D) -> f64 {
        self.quadrature()
            .integrate(|y| y * self.marginal_y(y, ll.x, ur.x), ll.y, ur.y)
            .value
    }
}

// ============================================================================
// Models
// ============================================================================

/// A model producing per-interval predictions for a single experiment.
///
/// Kernels live as free functions next to each implementation so they can be
/// called without any stored experiment output; `run` only gathers
/// arguments and applies them.
pub trait IntraExpModel {
    fn name(&self) -> &'static str;

    fn run_for_exp(&self, criteria: &dyn BatchCriteria, exp_num: usize) -> bool;

    fn target_csv_stems(&self) -> Vec<&'static str>;

    fn legend_names(&self) -> Vec<&'static str>;

    /// One series per target stem
    fn run(&self, ctx: &ExpContext<'_>, criteria: &dyn BatchCriteria) -> ModelResult<Vec<Series>>;
}

/// A model producing one steady-state datapoint per experiment in a batch
pub trait InterExpModel {
    fn name(&self) -> &'static str;

    fn run_for_batch(&self, criteria: &dyn BatchCriteria) -> bool;

    fn target_csv_stems(&self) -> Vec<&'static str>;

    fn legend_names(&self) -> Vec<&'static str>;

    /// One row per target stem
    fn run(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<Vec<BatchRow>>;
}

/// Which family of models a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCategory {
    Intra,
    Inter,
}
