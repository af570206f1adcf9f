//! # Integration Driver
//!
//! Produces a [`Trajectory`] for a single feed-rate value. The driver owns no
//! numerics of its own: it parameterizes RustedSciThe's `UniversalODESolver`
//! with the symbolic right-hand side from
//! [`super::bioreactor_model::rhs_expressions`], runs it over the span of the
//! [`TimeGrid`], and resamples the adaptive solver mesh onto the fixed grid.
//!
//! Solver failures are surfaced as
//! [`BioreactorError::IntegrationFailure`] carrying the furthest time reached.
//! A single retry with tightened tolerances is attempted before the failure
//! propagates; there is no silent truncation and no indefinite retrying.

use super::bioreactor_model::{
    BioreactorError, FeedParameters, KineticParameters, STATE_VARIABLES, StateVector,
    rhs_expressions,
};
use RustedSciThe::numerical::ODE_api2::{SolverParam, SolverType, UniversalODESolver};
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

/// Relative slack when checking that the solver mesh reached the grid end
const SPAN_TOLERANCE: f64 = 1e-6;

/// Ordered, strictly increasing sequence of sample times
///
/// Fixed across all sweep runs; every trajectory carries one state per grid
/// point.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    /// Uniform grid of `n` points over `[t_start, t_end]` (nominally 300 over [0, 30])
    pub fn linspace(t_start: f64, t_end: f64, n: usize) -> Result<Self, BioreactorError> {
        if n < 2 {
            return Err(BioreactorError::InvalidConfiguration(format!(
                "time grid needs at least 2 points, got {}",
                n
            )));
        }
        if !(t_end > t_start) {
            return Err(BioreactorError::InvalidConfiguration(format!(
                "time grid span must be positive, got [{}, {}]",
                t_start, t_end
            )));
        }
        let h = (t_end - t_start) / (n - 1) as f64;
        let mut points: Vec<f64> = (0..n).map(|i| t_start + h * i as f64).collect();
        // last sample is the requested endpoint, not an accumulated value
        points[n - 1] = t_end;
        Ok(Self { points })
    }

    /// Grid from explicit sample times; must be strictly increasing
    pub fn from_points(points: Vec<f64>) -> Result<Self, BioreactorError> {
        if points.len() < 2 {
            return Err(BioreactorError::InvalidConfiguration(format!(
                "time grid needs at least 2 points, got {}",
                points.len()
            )));
        }
        for pair in points.windows(2) {
            if !(pair[1] > pair[0]) {
                return Err(BioreactorError::InvalidConfiguration(format!(
                    "time grid must be strictly increasing, got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn t_start(&self) -> f64 {
        self.points[0]
    }

    pub fn t_end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }
}

/// Solution of one integration run: one state per time-grid point
#[derive(Debug, Clone)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<StateVector>,
}

impl Trajectory {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Terminal sample, the quantity the sweep records
    pub fn terminal(&self) -> &StateVector {
        &self.states[self.states.len() - 1]
    }
}

/// Driver for a single-feed-rate integration
///
/// Wraps the external IVP-solve capability. Defaults to the RK45 adaptive
/// solver; the system is non-stiff for the nominal parameter range, and a
/// stiff-capable backend (BDF, Radau) can be selected for extreme feeds.
pub struct IntegrationDriver {
    solver_type: SolverType,
    solver_params: HashMap<String, SolverParam>,
    retry_on_failure: bool,
}

impl Default for IntegrationDriver {
    fn default() -> Self {
        Self::new(SolverType::NonStiff("RK45".to_owned()))
    }
}

impl IntegrationDriver {
    pub fn new(solver_type: SolverType) -> Self {
        let solver_params = HashMap::from([
            ("step_size".to_owned(), SolverParam::Float(1e-3)),
            ("tolerance".to_owned(), SolverParam::Float(1e-6)),
            ("max_iterations".to_owned(), SolverParam::Int(100000)),
            ("rtol".to_owned(), SolverParam::Float(1e-6)),
            ("atol".to_owned(), SolverParam::Float(1e-8)),
            ("max_step".to_owned(), SolverParam::Float(0.1)),
            ("first_step".to_owned(), SolverParam::OptionalFloat(None)),
            ("vectorized".to_owned(), SolverParam::Bool(false)),
            ("jac_sparsity".to_owned(), SolverParam::OptionalMatrix(None)),
            ("parallel".to_owned(), SolverParam::Bool(false)),
        ]);
        Self {
            solver_type,
            solver_params,
            retry_on_failure: true,
        }
    }

    pub fn set_solver_params(&mut self, params: HashMap<String, SolverParam>) {
        self.solver_params = params;
    }

    /// Disable the tightened-tolerance retry, making the first failure final
    pub fn set_retry_on_failure(&mut self, retry: bool) {
        self.retry_on_failure = retry;
    }

    /// Integrate the reactor from `initial` over `grid` for one feed-rate value
    ///
    /// Guarantees on success: the trajectory has exactly `grid.len()` entries,
    /// entry 0 equals `initial`, and sample times match the grid.
    pub fn integrate(
        &self,
        initial: &StateVector,
        grid: &TimeGrid,
        feed: &FeedParameters,
        kinetics: &KineticParameters,
    ) -> Result<Trajectory, BioreactorError> {
        kinetics.validate()?;
        feed.validate()?;
        initial.validate_initial()?;

        let mesh = match self.run_solver(initial, grid, feed, kinetics, &self.solver_params) {
            Ok(mesh) => mesh,
            Err(first_failure) if self.retry_on_failure => {
                warn!(
                    "integration for F = {} failed ({}), retrying with tightened tolerances",
                    feed.F, first_failure
                );
                self.run_solver(initial, grid, feed, kinetics, &self.tightened_params())?
            }
            Err(e) => return Err(e),
        };
        let (mesh_t, mesh_y) = mesh;
        info!(
            "integration for F = {} done, {} solver steps over [{}, {}]",
            feed.F,
            mesh_t.len(),
            grid.t_start(),
            grid.t_end()
        );
        resample_onto_grid(initial, grid, &mesh_t, &mesh_y)
    }

    /// One solver invocation; returns the raw adaptive mesh and solution matrix
    fn run_solver(
        &self,
        initial: &StateVector,
        grid: &TimeGrid,
        feed: &FeedParameters,
        kinetics: &KineticParameters,
        params: &HashMap<String, SolverParam>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), BioreactorError> {
        let eq_system = rhs_expressions(feed, kinetics);
        let unknowns: Vec<String> = STATE_VARIABLES.iter().map(|s| s.to_string()).collect();
        let y0 = initial.to_dvector();

        let mut ode = UniversalODESolver::new(
            eq_system,
            unknowns,
            "t".to_owned(),
            self.solver_type.clone(),
            grid.t_start(),
            y0,
            grid.t_end(),
        );
        ode.set_parameters(params.clone());
        ode.initialize();
        ode.solve();

        let (t, y) = ode.get_result();
        let t = t.ok_or_else(|| BioreactorError::IntegrationFailure {
            t_reached: grid.t_start(),
            details: "solver returned no time mesh".to_string(),
        })?;
        let y = y.ok_or_else(|| BioreactorError::IntegrationFailure {
            t_reached: grid.t_start(),
            details: "solver returned no solution matrix".to_string(),
        })?;
        if t.len() < 2 {
            return Err(BioreactorError::IntegrationFailure {
                t_reached: grid.t_start(),
                details: format!("solver mesh has only {} point(s)", t.len()),
            });
        }

        // solution comes back as (steps x vars); transpose if the backend
        // returned it the other way around
        let n_vars = STATE_VARIABLES.len();
        let y = if y.ncols() == n_vars { y } else { y.transpose() };
        if y.nrows() != t.len() || y.ncols() != n_vars {
            return Err(BioreactorError::IntegrationFailure {
                t_reached: t[t.len() - 1],
                details: format!(
                    "solution matrix shape {}x{} does not match mesh of {} points",
                    y.nrows(),
                    y.ncols(),
                    t.len()
                ),
            });
        }

        let t_reached = t[t.len() - 1];
        let span = (grid.t_end() - grid.t_start()).max(1.0);
        if t_reached < grid.t_end() - SPAN_TOLERANCE * span {
            return Err(BioreactorError::IntegrationFailure {
                t_reached,
                details: format!(
                    "solver stopped at t = {} before the grid end t = {}",
                    t_reached,
                    grid.t_end()
                ),
            });
        }
        for (i, value) in y.iter().enumerate() {
            if !value.is_finite() {
                let step = i % y.nrows();
                return Err(BioreactorError::IntegrationFailure {
                    t_reached: t[step],
                    details: "solution contains non-finite values".to_string(),
                });
            }
        }

        Ok((t, y))
    }

    /// Retry parameters: two orders tighter tolerances, ten times smaller max step
    fn tightened_params(&self) -> HashMap<String, SolverParam> {
        let mut params = self.solver_params.clone();
        for key in ["rtol", "atol", "tolerance"] {
            if let Some(SolverParam::Float(value)) = params.get(key) {
                let tightened = value / 100.0;
                params.insert(key.to_owned(), SolverParam::Float(tightened));
            }
        }
        if let Some(SolverParam::Float(h)) = params.get("max_step") {
            let tightened = h / 10.0;
            params.insert("max_step".to_owned(), SolverParam::Float(tightened));
        }
        params
    }
}

/// Linear interpolation of the adaptive solver mesh onto the fixed time grid
///
/// Entry 0 is the initial state itself, per the trajectory contract.
fn resample_onto_grid(
    initial: &StateVector,
    grid: &TimeGrid,
    mesh_t: &DVector<f64>,
    mesh_y: &DMatrix<f64>,
) -> Result<Trajectory, BioreactorError> {
    let n_mesh = mesh_t.len();
    let mut states = Vec::with_capacity(grid.len());
    states.push(*initial);

    let mut k = 0usize;
    for &tp in grid.points().iter().skip(1) {
        while k + 1 < n_mesh - 1 && mesh_t[k + 1] < tp {
            k += 1;
        }
        let (t_left, t_right) = (mesh_t[k], mesh_t[k + 1]);
        let weight = if t_right > t_left {
            ((tp - t_left) / (t_right - t_left)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let interp = |j: usize| mesh_y[(k, j)] + weight * (mesh_y[(k + 1, j)] - mesh_y[(k, j)]);
        states.push(StateVector {
            X: interp(0),
            S: interp(1),
            P: interp(2),
            V: interp(3),
        });
    }

    Ok(Trajectory {
        times: grid.points().to_vec(),
        states,
    })
}
