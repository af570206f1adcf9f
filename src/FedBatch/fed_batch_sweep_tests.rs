#[cfg(test)]
mod tests {
    use crate::FedBatch::bioreactor_model::{KineticParameters, StateVector};
    use crate::FedBatch::integration_driver::{IntegrationDriver, TimeGrid};
    use crate::FedBatch::sweep_engine::ParameterSweepEngine;
    use approx::assert_relative_eq;

    // nominal study setup: mu_max = 0.4 1/hr, Ks = 0.5 g/L, Yxs = 0.5 gX/gS,
    // alpha = 0.1 gP/gX, Sf = 100 g/L, 30 hours sampled at 300 points
    fn nominal_kinetics() -> KineticParameters {
        KineticParameters::new(0.4, 0.5, 0.5, 0.1)
    }

    fn nominal_initial() -> StateVector {
        StateVector::new(0.1, 20.0, 0.0, 100.0)
    }

    fn nominal_grid() -> TimeGrid {
        TimeGrid::linspace(0.0, 30.0, 300).unwrap()
    }

    #[test]
    fn nominal_run_grows_biomass_and_consumes_substrate() {
        let driver = IntegrationDriver::default();
        let trajectory = driver
            .integrate(
                &nominal_initial(),
                &nominal_grid(),
                &crate::FedBatch::bioreactor_model::FeedParameters::new(1.0, 100.0),
                &nominal_kinetics(),
            )
            .unwrap();

        let terminal = trajectory.terminal();
        assert!(terminal.X > 0.1, "net growth must occur, X_final = {}", terminal.X);
        assert!(terminal.S < 20.0, "net consumption must occur, S_final = {}", terminal.S);
        assert_relative_eq!(terminal.V, 130.0, epsilon = 1e-2);
        assert!(terminal.P > 0.0, "product must form with alpha > 0");
    }

    #[test]
    fn sweep_points_are_independent() {
        let engine = ParameterSweepEngine::default();
        let initial = nominal_initial();
        let grid = nominal_grid();
        let kinetics = nominal_kinetics();

        let alone = engine.run_sweep(&[1.0], &initial, &grid, 100.0, &kinetics).unwrap();
        let swept = engine
            .run_sweep(&[0.5, 1.0, 2.0], &initial, &grid, 100.0, &kinetics)
            .unwrap();

        let single = alone.converged().next().unwrap();
        let middle = swept.converged().nth(1).unwrap();
        assert_eq!(middle.F, 1.0);
        assert_relative_eq!(single.X_final, middle.X_final, max_relative = 1e-6);
        assert_relative_eq!(single.S_final, middle.S_final, max_relative = 1e-6);
        assert_relative_eq!(single.P_final, middle.P_final, max_relative = 1e-6);
        assert_relative_eq!(single.V_final, middle.V_final, max_relative = 1e-6);
    }

    #[test]
    fn full_nominal_sweep_converges_everywhere() {
        let engine = ParameterSweepEngine::default();
        let feed_rates = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0];

        let result = engine
            .run_sweep(&feed_rates, &nominal_initial(), &nominal_grid(), 100.0, &nominal_kinetics())
            .unwrap();

        assert_eq!(result.len(), feed_rates.len());
        assert_eq!(result.failure_count(), 0);
        assert_eq!(result.feed_rates(), feed_rates.to_vec());

        // terminal volume follows V0 + F*t_end for every point
        for (record, feed_rate) in result.converged().zip(feed_rates) {
            assert_relative_eq!(record.V_final, 100.0 + feed_rate * 30.0, max_relative = 1e-4);
        }
    }
}
