// Adjusted distance from arena points to the nest
//
// Robots drop blocks as soon as they enter the nest, not at its center, so
// the raw distance to the center overestimates travel. `nest_factor` is the
// average distance from the nest center to where robots actually stop.

use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::Vector3D;
use crate::crw_quadrature::Quadrature;
use crate::crw_representation::Nest;
use crate::crw_scenario::BlockDistribution;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMeasure2D {
    center: Vector3D,
    nest_factor: f64,
}

impl DistanceMeasure2D {
    pub fn new(dist: BlockDistribution, nest: &Nest, quadrature: &Quadrature) -> ModelResult<Self> {
        let nest_factor = match dist {
            BlockDistribution::Random | BlockDistribution::PowerLaw => {
                // Mean distance from the center of a square to a uniformly
                // random point inside it
                let edge = nest.extent.xsize() / 2.0;
                let sqrt2 = std::f64::consts::SQRT_2;
                edge / 6.0 * (sqrt2 + (1.0 + sqrt2).ln())
            }
            // Robots approach from one side only, along a thin wedge; the
            // wedge is approximated as half of its bounding rectangle.
            BlockDistribution::SingleSource => wedge_factor(nest, 32.0, quadrature),
            BlockDistribution::DualSource => wedge_factor(nest, 16.0, quadrature),
            BlockDistribution::QuadSource => {
                return Err(ModelError::unsupported("distance measure", dist));
            }
        };

        Ok(Self {
            center: nest.center(),
            nest_factor,
        })
    }

    pub fn nest_factor(&self) -> f64 {
        self.nest_factor
    }

    /// Distance from `pt` to the nest, minus the nest factor. May be negative
    /// for points inside the nest; callers floor it where needed.
    pub fn to_nest(&self, pt: Vector3D) -> f64 {
        let pt = Vector3D::planar(pt.x, pt.y);
        let center = Vector3D::planar(self.center.x, self.center.y);
        (center - pt).length() - self.nest_factor
    }
}

fn wedge_factor(nest: &Nest, y_divisor: f64, quadrature: &Quadrature) -> f64 {
    let center = nest.center();
    let xmin = center.x;
    let xmax = center.x + nest.extent.xsize() / 2.0;
    let ymin = center.y - nest.extent.ysize() / y_divisor;
    let ymax = center.y + nest.extent.ysize() / y_divisor;

    let eff_area = (xmax - xmin) * (ymax - ymin) / 2.0;
    if eff_area <= 0.0 {
        return 0.0;
    }

    let total = quadrature
        .integrate_2d(
            |x, y| (Vector3D::planar(center.x, center.y) - Vector3D::planar(x, y)).length(),
            (xmin, xmax),
            (ymin, ymax),
        )
        .value;
    total / eff_area
}
