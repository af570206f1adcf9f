//! # Bioreactor State & Parameter Model
//!
//! Data definitions for the fed-batch reactor together with the mass-balance
//! derivative function. The original positional state tuple (X, S, P, V) is
//! replaced by the named-field [`StateVector`] so that no positional-order bug
//! can creep into the balances.
//!
//! The derivative is provided in two equivalent forms:
//! - [`derivative`]: pure numeric evaluation, used by tests and by any caller
//!   that wants point values
//! - [`rhs_expressions`]: the same system as symbolic expressions for the
//!   RustedSciThe IVP solver

use RustedSciThe::symbolic::symbolic_engine::Expr;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order of the unknowns as handed to the IVP solver.
pub const STATE_VARIABLES: [&str; 4] = ["X", "S", "P", "V"];

/// Error taxonomy of the simulation core
#[derive(Debug, Error)]
pub enum BioreactorError {
    /// Nonsensical kinetic/feed/initial-state input, rejected before integration
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Malformed time grid or sweep configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Zero reactor volume, the dilution term F/V is undefined
    #[error("Division undefined: {0}")]
    DivisionUndefined(String),
    /// The external IVP solver did not converge; `t_reached` is the furthest
    /// integration time obtained before the failure
    #[error("Integration failure at t = {t_reached}: {details}")]
    IntegrationFailure { t_reached: f64, details: String },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Reactor state: concentrations and volume
///
/// Physically valid states have all components non-negative and V strictly
/// positive. The model does not clamp: an integration run with extreme
/// parameters may produce negative concentrations, which is a correctness
/// signal for the caller, not a crash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct StateVector {
    /// Biomass concentration (g/L)
    pub X: f64,
    /// Substrate concentration (g/L)
    pub S: f64,
    /// Product concentration (g/L)
    pub P: f64,
    /// Reactor volume (L)
    pub V: f64,
}

impl StateVector {
    pub fn new(X: f64, S: f64, P: f64, V: f64) -> Self {
        Self { X, S, P, V }
    }

    /// State as a solver vector, ordered as [`STATE_VARIABLES`]
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.X, self.S, self.P, self.V])
    }

    /// Validate as an initial condition for integration
    ///
    /// Negative components are rejected and `V` must be strictly positive:
    /// the derivative function divides by the volume.
    pub fn validate_initial(&self) -> Result<(), BioreactorError> {
        if self.X < 0.0 || self.S < 0.0 || self.P < 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "initial state has a negative component: X = {}, S = {}, P = {}",
                self.X, self.S, self.P
            )));
        }
        if self.V <= 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "initial volume must be positive, got V = {}",
                self.V
            )));
        }
        Ok(())
    }
}

/// Monod kinetic parameters, immutable for the duration of one simulation run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct KineticParameters {
    /// Maximum specific growth rate (1/hr)
    pub mu_max: f64,
    /// Half-saturation constant (g/L)
    pub Ks: f64,
    /// Biomass-per-substrate yield coefficient (gX/gS)
    pub Yxs: f64,
    /// Product-to-biomass yield (gP/gX)
    pub alpha: f64,
}

impl KineticParameters {
    pub fn new(mu_max: f64, Ks: f64, Yxs: f64, alpha: f64) -> Self {
        Self { mu_max, Ks, Yxs, alpha }
    }

    pub fn validate(&self) -> Result<(), BioreactorError> {
        if self.mu_max <= 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "mu_max must be positive, got {}",
                self.mu_max
            )));
        }
        if self.Ks <= 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "Ks must be positive, got {}",
                self.Ks
            )));
        }
        if self.Yxs <= 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "Yxs must be positive, got {}",
                self.Yxs
            )));
        }
        if self.alpha < 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Feed parameters: the swept feed rate and the (sweep-constant) feed substrate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct FeedParameters {
    /// Feed flow rate (L/hr), the independent variable of the experiment
    pub F: f64,
    /// Substrate concentration in the feed (g/L)
    pub Sf: f64,
}

impl FeedParameters {
    pub fn new(F: f64, Sf: f64) -> Self {
        Self { F, Sf }
    }

    pub fn validate(&self) -> Result<(), BioreactorError> {
        if self.F < 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "feed rate F must be non-negative, got {}",
                self.F
            )));
        }
        if self.Sf < 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "feed substrate Sf must be non-negative, got {}",
                self.Sf
            )));
        }
        Ok(())
    }
}

/// Monod saturation law: mu = mu_max * S / (Ks + S)
///
/// mu -> mu_max as S -> infinity and mu = 0 exactly at S = 0.
pub fn monod_rate(kinetics: &KineticParameters, S: f64) -> f64 {
    kinetics.mu_max * S / (kinetics.Ks + S)
}

/// Instantaneous derivative of the reactor state
///
/// Pure function of its inputs; no clamping of unphysical values. Precondition
/// V != 0 (the driver guarantees V0 > 0 at entry and dV/dt = F >= 0 keeps the
/// volume away from zero along the trajectory).
#[allow(non_snake_case)]
pub fn derivative(
    state: &StateVector,
    feed: &FeedParameters,
    kinetics: &KineticParameters,
) -> Result<StateVector, BioreactorError> {
    if state.V == 0.0 {
        return Err(BioreactorError::DivisionUndefined(
            "reactor volume is zero, dilution term F/V is undefined".to_string(),
        ));
    }
    let mu = monod_rate(kinetics, state.S);
    let dilution = feed.F / state.V;
    Ok(StateVector {
        X: mu * state.X - dilution * state.X,
        S: dilution * (feed.Sf - state.S) - mu * state.X / kinetics.Yxs,
        P: kinetics.alpha * mu * state.X - dilution * state.P,
        V: feed.F,
    })
}

/// The mass-balance system as symbolic right-hand sides for the IVP solver
///
/// Returns one expression per unknown, ordered as [`STATE_VARIABLES`]. Kinetic
/// and feed parameters are baked in as constants, so each sweep point gets its
/// own system and no ambient state is shared between integrations.
#[allow(non_snake_case)]
pub fn rhs_expressions(feed: &FeedParameters, kinetics: &KineticParameters) -> Vec<Expr> {
    let X = Expr::Var("X".to_string());
    let S = Expr::Var("S".to_string());
    let P = Expr::Var("P".to_string());
    let V = Expr::Var("V".to_string());

    let mu = Expr::Const(kinetics.mu_max) * S.clone() / (Expr::Const(kinetics.Ks) + S.clone());
    let dilution = Expr::Const(feed.F) / V;

    let dX = mu.clone() * X.clone() - dilution.clone() * X.clone();
    let dS = dilution.clone() * (Expr::Const(feed.Sf) - S)
        - mu.clone() * X.clone() / Expr::Const(kinetics.Yxs);
    let dP = Expr::Const(kinetics.alpha) * mu * X - dilution * P;
    let dV = Expr::Const(feed.F);

    vec![dX.simplify_(), dS.simplify_(), dP.simplify_(), dV]
}

/////////////////////////////////////////TESTS/////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nominal_kinetics() -> KineticParameters {
        KineticParameters::new(0.4, 0.5, 0.5, 0.1)
    }

    #[test]
    fn monod_rate_saturates_at_mu_max() {
        let kinetics = nominal_kinetics();

        assert_eq!(monod_rate(&kinetics, 0.0), 0.0);
        // hyperbolic saturation: monotone in S, bounded by mu_max
        let mut previous = 0.0;
        for s in [0.1, 0.5, 1.0, 10.0, 100.0, 1e6] {
            let mu = monod_rate(&kinetics, s);
            assert!(mu > previous, "mu must grow with S");
            assert!(mu < kinetics.mu_max, "mu must never exceed mu_max");
            previous = mu;
        }
        assert_relative_eq!(monod_rate(&kinetics, 1e12), kinetics.mu_max, epsilon = 1e-9);
        // at S = Ks the rate is exactly half of mu_max
        assert_relative_eq!(
            monod_rate(&kinetics, kinetics.Ks),
            0.5 * kinetics.mu_max,
            epsilon = 1e-12
        );
    }

    #[test]
    fn derivative_matches_balances() {
        let kinetics = nominal_kinetics();
        let feed = FeedParameters::new(1.0, 100.0);
        let state = StateVector::new(0.1, 20.0, 0.0, 100.0);

        let d = derivative(&state, &feed, &kinetics).unwrap();
        let mu = 0.4 * 20.0 / (0.5 + 20.0);
        let dilution = 1.0 / 100.0;

        assert_relative_eq!(d.X, mu * 0.1 - dilution * 0.1, epsilon = 1e-12);
        assert_relative_eq!(
            d.S,
            dilution * (100.0 - 20.0) - mu * 0.1 / 0.5,
            epsilon = 1e-12
        );
        assert_relative_eq!(d.P, 0.1 * mu * 0.1, epsilon = 1e-12);
        assert_eq!(d.V, 1.0);
    }

    #[test]
    fn zero_feed_reduces_to_closed_batch() {
        let kinetics = nominal_kinetics();
        let feed = FeedParameters::new(0.0, 100.0);
        let state = StateVector::new(0.5, 5.0, 0.2, 100.0);

        let d = derivative(&state, &feed, &kinetics).unwrap();
        let mu = monod_rate(&kinetics, state.S);

        // with F = 0 all dilution terms vanish
        assert_eq!(d.V, 0.0);
        assert_relative_eq!(d.X, mu * state.X, epsilon = 1e-12);
        assert_relative_eq!(d.S, -mu * state.X / kinetics.Yxs, epsilon = 1e-12);
        assert_relative_eq!(d.P, kinetics.alpha * mu * state.X, epsilon = 1e-12);
        assert!(d.S <= 0.0, "substrate must not grow in a closed batch");
    }

    #[test]
    fn zero_volume_is_division_undefined() {
        let kinetics = nominal_kinetics();
        let feed = FeedParameters::new(1.0, 100.0);
        let state = StateVector::new(0.1, 20.0, 0.0, 0.0);

        let result = derivative(&state, &feed, &kinetics);
        assert!(matches!(result, Err(BioreactorError::DivisionUndefined(_))));
    }

    #[test]
    fn kinetic_parameter_validation() {
        assert!(KineticParameters::new(0.4, 0.5, 0.5, 0.1).validate().is_ok());
        assert!(KineticParameters::new(0.0, 0.5, 0.5, 0.1).validate().is_err());
        assert!(KineticParameters::new(0.4, -0.5, 0.5, 0.1).validate().is_err());
        assert!(KineticParameters::new(0.4, 0.5, 0.0, 0.1).validate().is_err());
        assert!(KineticParameters::new(0.4, 0.5, 0.5, -0.1).validate().is_err());
        // alpha = 0 is a legal no-product reactor
        assert!(KineticParameters::new(0.4, 0.5, 0.5, 0.0).validate().is_ok());
    }

    #[test]
    fn feed_and_state_validation() {
        assert!(FeedParameters::new(0.0, 100.0).validate().is_ok());
        assert!(FeedParameters::new(-1.0, 100.0).validate().is_err());
        assert!(FeedParameters::new(1.0, -1.0).validate().is_err());

        assert!(StateVector::new(0.1, 20.0, 0.0, 100.0).validate_initial().is_ok());
        assert!(StateVector::new(-0.1, 20.0, 0.0, 100.0).validate_initial().is_err());
        assert!(StateVector::new(0.1, 20.0, 0.0, 0.0).validate_initial().is_err());
    }

    #[test]
    fn rhs_expressions_cover_all_unknowns() {
        let kinetics = nominal_kinetics();
        let feed = FeedParameters::new(1.0, 100.0);

        let rhs = rhs_expressions(&feed, &kinetics);
        assert_eq!(rhs.len(), STATE_VARIABLES.len());

        // the biomass balance must reference both X and V (growth and dilution)
        let dx_str = format!("{:?}", rhs[0]);
        assert!(dx_str.contains("Var(\"X\")"));
        assert!(dx_str.contains("Var(\"V\")"));
        // the volume balance is the constant feed rate
        assert_eq!(rhs[3], Expr::Const(1.0));
    }
}
