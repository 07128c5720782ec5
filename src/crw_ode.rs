// Coupled ODE model of a foraging swarm
//
// Each robot is in one of four states. Transitions:
//
//   Searching ──alpha_b·B/B0──▶ Homing ──1/tau_h──▶ Searching
//       │  ▲                      │  ▲
//  alpha_ca  1/tau_av        alpha_ca  1/tau_av
//       ▼  │                      ▼  │
//   AvoidingWhileSearching    AvoidingWhileHoming
//
// The block count B falls with every acquisition and is replenished when a
// homing robot drops its block at the nest.

use std::ops::{Add, Mul};

use log::debug;

use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::Series;

/// Largest expected state change (as a fraction of the rate) per RK4 step
const MAX_RATE_STEP: f64 = 0.1;

/// Rate and duration parameters of one ODE solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrwParams {
    pub n_robots: f64,
    /// Length of the integration horizon, in timesteps
    pub duration: f64,
    /// Mean time a robot spends avoiding a collision
    pub tau_av: f64,
    /// Mean time a robot takes to return to the nest
    pub tau_h: f64,
    /// Per-robot block acquisition rate
    pub alpha_b: f64,
    /// Per-robot rate of entering collision avoidance
    pub alpha_ca: f64,
    /// Number of reported points, evenly spaced over `[0, duration]`
    pub n_datapoints: usize,
}

impl CrwParams {
    pub fn validate(&self) -> ModelResult<()> {
        let positive = [("tau_av", self.tau_av), ("tau_h", self.tau_h)];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidParameter { name, value });
            }
        }

        let non_negative = [
            ("n_robots", self.n_robots),
            ("duration", self.duration),
            ("alpha_b", self.alpha_b),
            ("alpha_ca", self.alpha_ca),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    /// Sum of every transition rate; bounds how fast any state can change
    fn max_rate(&self) -> f64 {
        self.alpha_b + self.alpha_ca + 1.0 / self.tau_av + 1.0 / self.tau_h
    }
}

/// Robot counts per state plus the number of free blocks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OdeState {
    pub searching: f64,
    pub homing: f64,
    pub avoiding_searching: f64,
    pub avoiding_homing: f64,
    pub blocks: f64,
}

impl OdeState {
    /// Whole swarm searching, nobody carrying or avoiding
    pub fn all_searching(n_robots: f64, blocks: f64) -> Self {
        Self {
            searching: n_robots,
            blocks,
            ..Self::default()
        }
    }

    pub fn n_robots(&self) -> f64 {
        self.searching + self.homing + self.avoiding_searching + self.avoiding_homing
    }
}

impl Add for OdeState {
    type Output = OdeState;

    fn add(self, rhs: OdeState) -> OdeState {
        OdeState {
            searching: self.searching + rhs.searching,
            homing: self.homing + rhs.homing,
            avoiding_searching: self.avoiding_searching + rhs.avoiding_searching,
            avoiding_homing: self.avoiding_homing + rhs.avoiding_homing,
            blocks: self.blocks + rhs.blocks,
        }
    }
}

impl Mul<f64> for OdeState {
    type Output = OdeState;

    fn mul(self, rhs: f64) -> OdeState {
        OdeState {
            searching: self.searching * rhs,
            homing: self.homing * rhs,
            avoiding_searching: self.avoiding_searching * rhs,
            avoiding_homing: self.avoiding_homing * rhs,
            blocks: self.blocks * rhs,
        }
    }
}

/// Trajectory of an ODE solve, one state per reported time
#[derive(Debug, Clone, PartialEq)]
pub struct OdeSolution {
    pub n_robots: f64,
    pub times: Vec<f64>,
    pub states: Vec<OdeState>,
}

impl OdeSolution {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn searching(&self) -> Series {
        self.states.iter().map(|s| s.searching).collect()
    }

    pub fn homing(&self) -> Series {
        self.states.iter().map(|s| s.homing).collect()
    }

    /// Robots neither searching nor homing. Taken as the residual of the
    /// swarm size, not from the integrated avoidance states, so a poorly fit
    /// parameter set shows up here as an inconsistent (even negative) count.
    pub fn avoiding(&self) -> Series {
        self.states
            .iter()
            .map(|s| self.n_robots - s.searching - s.homing)
            .collect()
    }
}

// ============================================================================
// Solver
// ============================================================================

pub struct CrwSolver {
    params: CrwParams,
    min_substeps: usize,
}

impl CrwSolver {
    pub fn new(params: CrwParams, min_substeps: usize) -> ModelResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            min_substeps: min_substeps.max(1),
        })
    }

    pub fn params(&self) -> &CrwParams {
        &self.params
    }

    /// Time derivative of `z`; `b0` is the initial block count
    pub fn derivative(&self, z: &OdeState, b0: f64) -> OdeState {
        let p = &self.params;
        let block_frac = if b0 > 0.0 { (z.blocks / b0).max(0.0) } else { 0.0 };
        let acq = p.alpha_b * z.searching * block_frac;
        let drop = z.homing / p.tau_h;

        OdeState {
            searching: -acq - p.alpha_ca * z.searching + z.avoiding_searching / p.tau_av + drop,
            homing: acq - p.alpha_ca * z.homing + z.avoiding_homing / p.tau_av - drop,
            avoiding_searching: p.alpha_ca * z.searching - z.avoiding_searching / p.tau_av,
            avoiding_homing: p.alpha_ca * z.homing - z.avoiding_homing / p.tau_av,
            blocks: -acq + drop,
        }
    }

    fn rk4_step(&self, z: &OdeState, h: f64, b0: f64) -> OdeState {
        let k1 = self.derivative(z, b0);
        let k2 = self.derivative(&(*z + k1 * (h / 2.0)), b0);
        let k3 = self.derivative(&(*z + k2 * (h / 2.0)), b0);
        let k4 = self.derivative(&(*z + k3 * h), b0);
        *z + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
    }

    /// Integrate from `z0` and report the state at `n_datapoints` evenly
    /// spaced times over `[0, duration]`
    pub fn solve(&self, z0: OdeState) -> OdeSolution {
        let p = &self.params;
        let times = linspace(0.0, p.duration, p.n_datapoints);
        let mut states = Vec::with_capacity(times.len());

        if let Some(&t0) = times.first() {
            debug!(
                "Solving CRW ODE: N={} T={} points={} from t={}",
                p.n_robots,
                p.duration,
                times.len(),
                t0
            );
            states.push(z0);
        }

        let mut z = z0;
        for w in times.windows(2) {
            let dt = w[1] - w[0];
            let substeps = self.substeps_for(dt);
            let h = dt / substeps as f64;
            for _ in 0..substeps {
                z = self.rk4_step(&z, h, z0.blocks);
            }
            states.push(z);
        }

        OdeSolution {
            n_robots: p.n_robots,
            times,
            states,
        }
    }

    fn substeps_for(&self, dt: f64) -> usize {
        let needed = (dt * self.params.max_rate() / MAX_RATE_STEP).ceil();
        if needed.is_finite() && needed > self.min_substeps as f64 {
            needed as usize
        } else {
            self.min_substeps
        }
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
