//! # Fed-Batch Bioreactor Sweep Module
//!
//! This module simulates a fed-batch bioreactor under Monod growth kinetics and
//! sweeps the feed flow rate F as the independent variable of a numerical
//! experiment, recording the terminal state (biomass, substrate, product,
//! volume) for each swept value.
//!
//! ## Mathematical Model
//!
//! Specific growth rate follows the Monod saturation law:
//!
//! ```text
//! mu = mu_max * S / (Ks + S)
//! ```
//!
//! Mass balances for a fed-batch reactor (feed inflow, no outflow):
//!
//! ```text
//! dV/dt = F
//! dX/dt = mu*X - (F/V)*X
//! dS/dt = (F/V)*(Sf - S) - (1/Yxs)*mu*X
//! dP/dt = alpha*mu*X - (F/V)*P
//! ```
//!
//! ## Main Structures
//!
//! - [`bioreactor_model::StateVector`]: named-field reactor state (X, S, P, V)
//! - [`bioreactor_model::KineticParameters`]: Monod kinetics (mu_max, Ks, Yxs, alpha)
//! - [`bioreactor_model::FeedParameters`]: feed rate F and feed substrate Sf
//! - [`integration_driver::IntegrationDriver`]: runs one integration over a fixed
//!   [`integration_driver::TimeGrid`], delegating the stepping to RustedSciThe
//! - [`sweep_engine::ParameterSweepEngine`]: iterates the feed-rate sequence and
//!   assembles a [`sweep_engine::ResultSet`] of terminal-state records
//!
//! Numerical time-stepping itself is an external capability: the driver hands a
//! symbolic right-hand side to `RustedSciThe::numerical::ODE_api2::UniversalODESolver`
//! and only enforces the trajectory contract on what comes back.
#[allow(non_snake_case)]
pub mod bioreactor_model;
#[allow(non_snake_case)]
pub mod integration_driver;
#[allow(non_snake_case)]
pub mod sweep_engine;

mod fed_batch_sweep_tests;
