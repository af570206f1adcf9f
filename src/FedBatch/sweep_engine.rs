//! # Parameter Sweep Engine
//!
//! Drives the experiment: one integration per feed-rate value, terminal-state
//! extraction, assembly into a [`ResultSet`]. Every sweep point starts from
//! the same initial state with the same kinetics, time grid and feed substrate
//! concentration; no state carries over between points.
//!
//! The [`ResultSet`] is the boundary to external reporting/plotting: a
//! read-only ordered sequence of records exposing per-field accessor views,
//! a pretty-printed summary table and JSON export.

use super::bioreactor_model::{
    BioreactorError, FeedParameters, KineticParameters, StateVector,
};
use super::integration_driver::{IntegrationDriver, TimeGrid};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do when one sweep point fails to integrate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailurePolicy {
    /// Record a failure marker for the affected feed rate and continue
    Record,
    /// Abort the whole sweep on the first failure (parity with the original
    /// study script, which had no per-point error handling)
    Abort,
}

/// Terminal state of one converged sweep point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct SweepRecord {
    /// Feed rate this record was computed for (L/hr)
    pub F: f64,
    pub X_final: f64,
    pub S_final: f64,
    pub P_final: f64,
    pub V_final: f64,
}

impl SweepRecord {
    fn from_terminal(F: f64, terminal: &StateVector) -> Self {
        Self {
            F,
            X_final: terminal.X,
            S_final: terminal.S,
            P_final: terminal.P,
            V_final: terminal.V,
        }
    }
}

/// One entry of the result set: a terminal-state record or a failure marker
#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
pub enum SweepEntry {
    Converged(SweepRecord),
    Failed { F: f64, reason: String },
}

impl SweepEntry {
    pub fn feed_rate(&self) -> f64 {
        match self {
            SweepEntry::Converged(record) => record.F,
            SweepEntry::Failed { F, .. } => *F,
        }
    }

    pub fn record(&self) -> Option<&SweepRecord> {
        match self {
            SweepEntry::Converged(record) => Some(record),
            SweepEntry::Failed { .. } => None,
        }
    }
}

/// Ordered, read-only collection of sweep results
///
/// Record order matches the order of the swept feed rates exactly: one entry
/// per input value, duplicates included, no reordering.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    entries: Vec<SweepEntry>,
}

impl ResultSet {
    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered feed rates, one per entry including failed points
    pub fn feed_rates(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.feed_rate()).collect()
    }

    /// Ordered terminal biomass values; `None` marks a failed point
    pub fn x_final(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.record().map(|r| r.X_final)).collect()
    }

    pub fn s_final(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.record().map(|r| r.S_final)).collect()
    }

    pub fn p_final(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.record().map(|r| r.P_final)).collect()
    }

    pub fn v_final(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.record().map(|r| r.V_final)).collect()
    }

    /// Converged records in sweep order
    pub fn converged(&self) -> impl Iterator<Item = &SweepRecord> {
        self.entries.iter().filter_map(|e| e.record())
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.record().is_none()).count()
    }

    pub fn to_json(&self) -> Result<String, BioreactorError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Write the result set as JSON for the external reporting collaborator
    pub fn save_to_file(&self, path: &Path) -> Result<(), BioreactorError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Tabular summary of F versus terminal state, one row per sweep point
    pub fn pretty_print(&self) {
        use prettytable::{Table, row};

        println!("\n=== FEED RATE SWEEP RESULTS ===");
        let mut table = Table::new();
        table.add_row(row![
            "F (L/hr)",
            "X_final (g/L)",
            "S_final (g/L)",
            "P_final (g/L)",
            "V_final (L)"
        ]);
        for entry in &self.entries {
            match entry {
                SweepEntry::Converged(r) => {
                    table.add_row(row![
                        format!("{:.3}", r.F),
                        format!("{:.4}", r.X_final),
                        format!("{:.4}", r.S_final),
                        format!("{:.4}", r.P_final),
                        format!("{:.2}", r.V_final)
                    ]);
                }
                SweepEntry::Failed { F, reason } => {
                    table.add_row(row![format!("{:.3}", F), "FAILED", reason, "-", "-"]);
                }
            }
        }
        table.printstd();
        println!("=== END SWEEP RESULTS ===\n");
    }
}

/// Runs the feed-rate sweep
///
/// Sweep points are independent pure computations over disjoint data; only the
/// assembly into the [`ResultSet`] must preserve input order, which the
/// sequential loop satisfies by construction.
pub struct ParameterSweepEngine {
    driver: IntegrationDriver,
    policy: FailurePolicy,
}

impl Default for ParameterSweepEngine {
    fn default() -> Self {
        Self::new(IntegrationDriver::default())
    }
}

impl ParameterSweepEngine {
    pub fn new(driver: IntegrationDriver) -> Self {
        Self {
            driver,
            policy: FailurePolicy::Record,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one integration per feed-rate value, in the given order
    ///
    /// Shared-input validation failures (kinetics, initial state, Sf) abort
    /// before any integration starts. Per-point failures are handled per
    /// [`FailurePolicy`]: recorded as markers (default) or propagated.
    #[allow(non_snake_case)]
    pub fn run_sweep(
        &self,
        feed_rates: &[f64],
        initial: &StateVector,
        grid: &TimeGrid,
        Sf: f64,
        kinetics: &KineticParameters,
    ) -> Result<ResultSet, BioreactorError> {
        kinetics.validate()?;
        initial.validate_initial()?;
        if Sf < 0.0 {
            return Err(BioreactorError::InvalidParameter(format!(
                "feed substrate Sf must be non-negative, got {}",
                Sf
            )));
        }
        if feed_rates.is_empty() {
            warn!("empty feed-rate sequence, sweep produces no records");
        }
        info!(
            "starting feed-rate sweep: {} point(s), grid of {} samples over [{}, {}]",
            feed_rates.len(),
            grid.len(),
            grid.t_start(),
            grid.t_end()
        );

        let mut entries = Vec::with_capacity(feed_rates.len());
        for (index, &F) in feed_rates.iter().enumerate() {
            let feed = FeedParameters::new(F, Sf);
            let point = feed
                .validate()
                .and_then(|_| self.driver.integrate(initial, grid, &feed, kinetics));
            match point {
                Ok(trajectory) => {
                    let record = SweepRecord::from_terminal(F, trajectory.terminal());
                    info!(
                        "sweep point {} (F = {}): X_final = {:.4}, S_final = {:.4}, V_final = {:.2}",
                        index, F, record.X_final, record.S_final, record.V_final
                    );
                    entries.push(SweepEntry::Converged(record));
                }
                Err(failure) => match self.policy {
                    FailurePolicy::Abort => {
                        warn!("sweep point {} (F = {}) failed, aborting sweep: {}", index, F, failure);
                        return Err(failure);
                    }
                    FailurePolicy::Record => {
                        warn!("sweep point {} (F = {}) failed, recording marker: {}", index, F, failure);
                        entries.push(SweepEntry::Failed {
                            F,
                            reason: failure.to_string(),
                        });
                    }
                },
            }
        }

        Ok(ResultSet { entries })
    }
}
