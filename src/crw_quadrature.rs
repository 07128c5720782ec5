// Adaptive Gauss-Kronrod quadrature (G7/K15, global bisection)
//
// Every density integral in the crate goes through here. The interval with
// the largest error estimate is bisected until the tolerance is met or the
// subdivision limit is reached; exhausting the limit is logged, not fatal.

use log::{trace, warn};
use serde::Deserialize;

// Kronrod abscissae; odd indices are shared with the 7-point Gauss rule
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

const EPMACH: f64 = f64::EPSILON;
const UFLOW: f64 = f64::MIN_POSITIVE;

/// Result of one integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadResult {
    pub value: f64,
    /// Estimated absolute error
    pub abserr: f64,
    /// Number of subintervals used
    pub intervals: usize,
    /// False if the subdivision limit was hit before the tolerance was met
    pub converged: bool,
}

/// Quadrature settings shared by all densities of a model run
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Quadrature {
    /// Maximum number of subintervals
    pub limit: usize,
    pub epsabs: f64,
    pub epsrel: f64,
}

impl Default for Quadrature {
    fn default() -> Self {
        Self {
            limit: 100,
            epsabs: 1.49e-8,
            epsrel: 1.49e-8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    err: f64,
}

impl Quadrature {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            ..Self::default()
        }
    }

    /// Integrate `f` over [a, b], warning if the subdivision limit is exhausted
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> QuadResult {
        let res = self.qag(&f, a, b);
        if !res.converged {
            warn!(
                "Quadrature hit subdivision limit {} on [{}, {}]: value={} abserr={}",
                self.limit, a, b, res.value, res.abserr
            );
        }
        res
    }

    /// Same as `integrate`, but limit exhaustion is only traced.
    ///
    /// Used for the inner integral of nested integrations, which is evaluated
    /// hundreds of times per outer integral.
    pub fn integrate_inner<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> QuadResult {
        let res = self.qag(&f, a, b);
        if !res.converged {
            trace!(
                "Inner quadrature hit subdivision limit on [{}, {}]: abserr={}",
                a,
                b,
                res.abserr
            );
        }
        res
    }

    /// Integrate `f(x, y)` over the rectangle, outer over y and inner over x
    pub fn integrate_2d<F: Fn(f64, f64) -> f64>(
        &self,
        f: F,
        xrange: (f64, f64),
        yrange: (f64, f64),
    ) -> QuadResult {
        let (x0, x1) = xrange;
        let (y0, y1) = yrange;
        let inner = |y: f64| self.integrate_inner(|x| f(x, y), x0, x1).value;
        self.integrate(inner, y0, y1)
    }

    fn qag<F: Fn(f64) -> f64>(&self, f: &F, a: f64, b: f64) -> QuadResult {
        if a == b {
            return QuadResult {
                value: 0.0,
                abserr: 0.0,
                intervals: 0,
                converged: true,
            };
        }
        if a > b {
            let res = self.qag(f, b, a);
            return QuadResult {
                value: -res.value,
                ..res
            };
        }

        let limit = self.limit.max(1);
        let (value, err) = gk15(f, a, b);
        let mut segments = vec![Segment { a, b, value, err }];

        let tolerance = |v: f64| self.epsabs.max(self.epsrel * v.abs());
        if err <= tolerance(value) {
            return QuadResult {
                value,
                abserr: err,
                intervals: 1,
                converged: true,
            };
        }

        loop {
            let total: f64 = segments.iter().map(|s| s.value).sum();
            let total_err: f64 = segments.iter().map(|s| s.err).sum();

            if total_err <= tolerance(total) || !total_err.is_finite() {
                return QuadResult {
                    value: total,
                    abserr: total_err,
                    intervals: segments.len(),
                    converged: total_err.is_finite(),
                };
            }
            if segments.len() >= limit {
                return QuadResult {
                    value: total,
                    abserr: total_err,
                    intervals: segments.len(),
                    converged: false,
                };
            }

            // Bisect the worst interval
            let mut worst = 0;
            for (i, s) in segments.iter().enumerate() {
                if s.err > segments[worst].err {
                    worst = i;
                }
            }
            let seg = segments.swap_remove(worst);
            let mid = 0.5 * (seg.a + seg.b);
            if mid <= seg.a || mid >= seg.b {
                // Interval cannot be split any further in floating point
                segments.push(seg);
                let total: f64 = segments.iter().map(|s| s.value).sum();
                let total_err: f64 = segments.iter().map(|s| s.err).sum();
                return QuadResult {
                    value: total,
                    abserr: total_err,
                    intervals: segments.len(),
                    converged: false,
                };
            }

            let (v1, e1) = gk15(f, seg.a, mid);
            let (v2, e2) = gk15(f, mid, seg.b);
            segments.push(Segment {
                a: seg.a,
                b: mid,
                value: v1,
                err: e1,
            });
            segments.push(Segment {
                a: mid,
                b: seg.b,
                value: v2,
                err: e2,
            });
        }
    }
}

/// One 15-point Kronrod evaluation: (value, abserr)
fn gk15<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> (f64, f64) {
    let centr = 0.5 * (a + b);
    let hlgth = 0.5 * (b - a);
    let dhlgth = hlgth.abs();

    let fc = f(centr);
    let mut resg = fc * WG[3];
    let mut resk = fc * WGK[7];
    let mut resabs = resk.abs();
    let mut fv1 = [0.0; 7];
    let mut fv2 = [0.0; 7];

    for j in 0..3 {
        let jtw = 2 * j + 1;
        let absc = hlgth * XGK[jtw];
        let f1 = f(centr - absc);
        let f2 = f(centr + absc);
        fv1[jtw] = f1;
        fv2[jtw] = f2;
        let fsum = f1 + f2;
        resg += WG[j] * fsum;
        resk += WGK[jtw] * fsum;
        resabs += WGK[jtw] * (f1.abs() + f2.abs());
    }

    for j in 0..4 {
        let jtwm1 = 2 * j;
        let absc = hlgth * XGK[jtwm1];
        let f1 = f(centr - absc);
        let f2 = f(centr + absc);
        fv1[jtwm1] = f1;
        fv2[jtwm1] = f2;
        let fsum = f1 + f2;
        resk += WGK[jtwm1] * fsum;
        resabs += WGK[jtwm1] * (f1.abs() + f2.abs());
    }

    let reskh = resk * 0.5;
    let mut resasc = WGK[7] * (fc - reskh).abs();
    for j in 0..7 {
        resasc += WGK[j] * ((fv1[j] - reskh).abs() + (fv2[j] - reskh).abs());
    }

    let result = resk * hlgth;
    resabs *= dhlgth;
    resasc *= dhlgth;
    let mut abserr = ((resk - resg) * hlgth).abs();

    if resasc != 0.0 && abserr != 0.0 {
        abserr = resasc * (200.0 * abserr / resasc).powf(1.5).min(1.0);
    }
    if resabs > UFLOW / (50.0 * EPMACH) {
        abserr = abserr.max(EPMACH * 50.0 * resabs);
    }

    (result, abserr)
}
