//! Iterative solver of the canopy energy balance
//!
//! The linear Penman-Monteith equations are solved for fixed component temperatures. Since
//! surface and boundary resistances depend on those temperatures, the solve is repeated with
//! relaxed temperatures until they settle. Optionally, the aerodynamic resistance is then
//! corrected for atmospheric stability following Webber et al. (2016), Environmental Modelling
//! & Software 77, 143-155.

use crate::canopy::Canopy;
use crate::component::ComponentKind;
use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::FloatValue;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Factor applied to the neutral aerodynamic resistance when the stability correction fails
/// under unstable conditions.
pub const UNSTABLE_AERODYNAMIC_RESISTANCE_FACTOR: FloatValue = 1.2;
/// Same as [`UNSTABLE_AERODYNAMIC_RESISTANCE_FACTOR`] under stable or neutral conditions.
pub const STABLE_AERODYNAMIC_RESISTANCE_FACTOR: FloatValue = 0.8;

/// Factor applied to the neutral aerodynamic resistance once the stability correction has
/// failed, given the sensible heat flux left by its last iteration.
pub fn calc_forced_aerodynamic_resistance_factor(sensible_heat_flux: FloatValue) -> FloatValue {
    if sensible_heat_flux > 0.0 {
        UNSTABLE_AERODYNAMIC_RESISTANCE_FACTOR
    } else {
        STABLE_AERODYNAMIC_RESISTANCE_FACTOR
    }
}

/// Energy balance of a single component at convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOutputs {
    pub kind: ComponentKind,
    pub index: i32,
    pub leaf_area_index: FloatValue,
    /// K
    pub temperature: FloatValue,
    pub net_radiation: FloatValue,
    pub heat_flux: FloatValue,
    pub available_energy: FloatValue,
    pub latent_heat_flux: FloatValue,
    pub sensible_heat_flux: FloatValue,
    /// $\text{h m}^{-1}$
    pub surface_resistance: FloatValue,
    /// $\text{h m}^{-1}$
    pub boundary_resistance: FloatValue,
}

/// Energy balance of the whole canopy at convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanopyOutputs {
    /// Air temperature at the mean source height (K)
    pub source_temperature: FloatValue,
    pub net_radiation: FloatValue,
    pub heat_flux: FloatValue,
    pub available_energy: FloatValue,
    pub latent_heat_flux: FloatValue,
    pub sensible_heat_flux: FloatValue,
    /// $R_n - (\lambda E + H + G)$
    pub energy_balance_residual: FloatValue,
    /// $\text{h m}^{-1}$
    pub aerodynamic_resistance: FloatValue,
    /// $\text{m h}^{-1}$
    pub friction_velocity: FloatValue,
    /// m, `None` under neutral conditions
    pub monin_obukhov_length: Option<FloatValue>,
    pub richardson_number: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutputs {
    pub canopy: CanopyOutputs,
    pub components: Vec<ComponentOutputs>,
    /// Temperature iterations of the last energy balance solve
    pub iterations_number: usize,
    pub stability_iterations_number: usize,
    /// Whether the aerodynamic resistance was forced after a failed stability correction
    pub is_forced_aerodynamic_resistance: bool,
}

/// Solves the energy balance of a [`Canopy`].
#[derive(Debug)]
pub struct Solver {
    pub canopy: Canopy,
    iterations_number: usize,
    stability_iterations_number: usize,
    is_forced_aerodynamic_resistance: bool,
}

impl Solver {
    pub fn new(canopy: Canopy) -> Self {
        Self {
            canopy,
            iterations_number: 0,
            stability_iterations_number: 0,
            is_forced_aerodynamic_resistance: false,
        }
    }

    /// Solves the energy balance, with or without correction for atmospheric stability.
    pub fn run(mut self, correct_stability: bool) -> CropEnergyBalanceResult<SolverOutputs> {
        if self.canopy.components.is_empty() {
            return Err(CropEnergyBalanceError::InvalidInput(
                "the canopy has no component".to_string(),
            ));
        }
        self.canopy.initialize();
        self.solve_energy_balance()?;

        if correct_stability {
            self.correct_stability()?;
        }
        Ok(self.outputs())
    }

    /// Iterates over component temperatures until their total change falls below the
    /// acceptable error.
    fn solve_energy_balance(&mut self) -> CropEnergyBalanceResult<()> {
        let numerical_resolution = self.canopy.params.numerical_resolution.clone();
        let mut error = FloatValue::INFINITY;

        for iteration in 1..=numerical_resolution.maximum_iteration_number {
            self.canopy.update_resistances()?;
            self.canopy.update_available_energy();
            self.canopy.update_evaporative_energies();
            self.canopy.update_source_temperature();
            error = self.canopy.update_temperatures();

            debug!(
                "iteration={} error={:.6} K residual={:.6} W m-2",
                iteration,
                error,
                self.canopy.state.energy_balance_residual()
            );

            if error <= numerical_resolution.acceptable_temperature_error {
                self.iterations_number = iteration;
                return Ok(());
            }
        }
        Err(CropEnergyBalanceError::NotConverged {
            iterations: numerical_resolution.maximum_iteration_number,
            error,
        })
    }

    fn correct_stability(&mut self) -> CropEnergyBalanceResult<()> {
        let numerical_resolution = self.canopy.params.numerical_resolution.clone();
        let mut previous_sensible_heat_flux = self.canopy.state.sensible_heat_flux;

        for iteration in 1..=numerical_resolution.maximum_stability_iteration_number {
            self.stability_iterations_number = iteration;
            let Canopy { inputs, params, state, .. } = &mut self.canopy;
            state.update_stability(inputs, params);

            match self.solve_energy_balance() {
                Ok(()) => {}
                Err(CropEnergyBalanceError::NotConverged { .. }) => break,
                Err(e) => return Err(e),
            }

            let sensible_heat_flux = self.canopy.state.sensible_heat_flux;
            debug!(
                "stability iteration={} sensible heat={:.4} W m-2 aerodynamic resistance={:.6} h m-1",
                iteration, sensible_heat_flux, self.canopy.state.aerodynamic_resistance
            );
            if (sensible_heat_flux - previous_sensible_heat_flux).abs()
                <= numerical_resolution.acceptable_sensible_heat_error
            {
                return Ok(());
            }
            previous_sensible_heat_flux = sensible_heat_flux;
        }

        let factor = calc_forced_aerodynamic_resistance_factor(self.canopy.state.sensible_heat_flux);
        warn!(
            "Stability correction did not converge after {} iterations, the aerodynamic resistance \
             is forced to {} times its neutral value",
            self.stability_iterations_number, factor
        );
        self.canopy.state.force_aerodynamic_resistance(factor);
        self.is_forced_aerodynamic_resistance = true;
        self.solve_energy_balance()
    }

    fn outputs(&self) -> SolverOutputs {
        let state = &self.canopy.state;
        let components = self
            .canopy
            .components
            .iter()
            .map(|c| {
                let fluxes = c.fluxes();
                ComponentOutputs {
                    kind: c.kind(),
                    index: c.index(),
                    leaf_area_index: c.leaf_area_index(),
                    temperature: fluxes.temperature,
                    net_radiation: fluxes.net_radiation,
                    heat_flux: fluxes.heat_flux,
                    available_energy: fluxes.available_energy,
                    latent_heat_flux: fluxes.evaporative_energy,
                    sensible_heat_flux: fluxes.sensible_heat_flux,
                    surface_resistance: fluxes.surface_resistance,
                    boundary_resistance: fluxes.boundary_resistance,
                }
            })
            .collect();

        SolverOutputs {
            canopy: CanopyOutputs {
                source_temperature: state.source_temperature,
                net_radiation: state.net_radiation,
                heat_flux: state.heat_flux,
                available_energy: state.available_energy,
                latent_heat_flux: state.total_penman_monteith_evaporative_energy,
                sensible_heat_flux: state.sensible_heat_flux,
                energy_balance_residual: state.energy_balance_residual(),
                aerodynamic_resistance: state.aerodynamic_resistance,
                friction_velocity: state.friction_velocity,
                monin_obukhov_length: Some(state.monin_obukhov_length)
                    .filter(|length| length.is_finite()),
                richardson_number: state.richardson_number,
            },
            components,
            iterations_number: self.iterations_number,
            stability_iterations_number: self.stability_iterations_number,
            is_forced_aerodynamic_resistance: self.is_forced_aerodynamic_resistance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canopy::CanopyContext;
    use crate::component::{Component, ComponentFluxes};
    use crate::inputs::tests::example_inputs;
    use crate::params::Params;
    use is_close::is_close;

    /// A wet surface with fixed resistances absorbing a fixed amount of radiation.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct WetSurface {
        net_radiation: FloatValue,
        surface_resistance: FloatValue,
        boundary_resistance: FloatValue,
        fluxes: ComponentFluxes,
    }

    #[typetag::serde]
    impl Component for WetSurface {
        fn kind(&self) -> ComponentKind {
            ComponentKind::LumpedLeaves
        }
        fn index(&self) -> i32 {
            0
        }
        fn fluxes(&self) -> &ComponentFluxes {
            &self.fluxes
        }
        fn fluxes_mut(&mut self) -> &mut ComponentFluxes {
            &mut self.fluxes
        }
        fn calc_net_radiation(&self, _context: &CanopyContext) -> (FloatValue, FloatValue) {
            (self.net_radiation, 0.0)
        }
        fn update_resistances(&mut self, _context: &CanopyContext) -> CropEnergyBalanceResult<()> {
            self.fluxes.surface_resistance = self.surface_resistance;
            self.fluxes.boundary_resistance = self.boundary_resistance;
            Ok(())
        }
    }

    fn canopy_with(surfaces: Vec<WetSurface>) -> Canopy {
        let mut canopy = Canopy::new(example_inputs(), Params::default()).unwrap();
        for surface in surfaces {
            canopy.add_component(Box::new(surface));
        }
        canopy
    }

    fn surface(net_radiation: FloatValue, surface_resistance: FloatValue) -> WetSurface {
        WetSurface {
            net_radiation,
            surface_resistance,
            boundary_resistance: 0.01,
            fluxes: ComponentFluxes::default(),
        }
    }

    #[test]
    fn test_empty_canopy_is_rejected() {
        let solver = Solver::new(canopy_with(vec![]));
        assert!(matches!(
            solver.run(false),
            Err(CropEnergyBalanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_energy_balance_closes() {
        let outputs = Solver::new(canopy_with(vec![surface(400.0, 0.02), surface(50.0, 0.5)]))
            .run(false)
            .unwrap();
        assert!(outputs.canopy.energy_balance_residual.abs() < 1e-6);
        assert!(is_close!(outputs.canopy.net_radiation, 450.0));

        let sum_latent_heat: FloatValue = outputs.components.iter().map(|c| c.latent_heat_flux).sum();
        assert!((sum_latent_heat - outputs.canopy.latent_heat_flux).abs() < 1e-6);
        let sum_sensible_heat: FloatValue =
            outputs.components.iter().map(|c| c.sensible_heat_flux).sum();
        assert!((sum_sensible_heat - outputs.canopy.sensible_heat_flux).abs() < 1e-6);
    }

    #[test]
    fn test_closed_stomata_evaporate_less() {
        let open = Solver::new(canopy_with(vec![surface(400.0, 0.01)]))
            .run(false)
            .unwrap();
        let closed = Solver::new(canopy_with(vec![surface(400.0, 1.0)]))
            .run(false)
            .unwrap();
        assert!(open.canopy.latent_heat_flux > closed.canopy.latent_heat_flux);
        assert!(open.components[0].temperature < closed.components[0].temperature);
    }

    #[test]
    fn test_not_converged() {
        let mut canopy = canopy_with(vec![surface(400.0, 0.02)]);
        canopy.params.numerical_resolution.maximum_iteration_number = 1;
        canopy.params.numerical_resolution.acceptable_temperature_error = 1e-12;
        let result = Solver::new(canopy).run(false);
        assert!(matches!(
            result,
            Err(CropEnergyBalanceError::NotConverged { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_stability_correction() {
        let neutral = Solver::new(canopy_with(vec![surface(150.0, 0.5)]))
            .run(false)
            .unwrap();
        let corrected = Solver::new(canopy_with(vec![surface(150.0, 0.5)]))
            .run(true)
            .unwrap();

        assert!(neutral.canopy.sensible_heat_flux > 0.0);
        assert!(neutral.canopy.monin_obukhov_length.is_none());
        assert!(corrected.stability_iterations_number >= 1);
        assert!(!corrected.is_forced_aerodynamic_resistance);
        assert!(corrected.canopy.aerodynamic_resistance < neutral.canopy.aerodynamic_resistance);
        assert!(corrected.canopy.energy_balance_residual.abs() < 1e-6);
    }

    #[test]
    fn test_forced_aerodynamic_resistance_factor() {
        assert_eq!(calc_forced_aerodynamic_resistance_factor(261.4), 1.2);
        assert_eq!(calc_forced_aerodynamic_resistance_factor(0.0), 0.8);
        assert_eq!(calc_forced_aerodynamic_resistance_factor(-35.0), 0.8);
    }

    fn run_with_failing_stability_correction(surface: WetSurface) -> (SolverOutputs, SolverOutputs) {
        let neutral = Solver::new(canopy_with(vec![surface.clone()]))
            .run(false)
            .unwrap();
        let mut canopy = canopy_with(vec![surface]);
        canopy.params.numerical_resolution.maximum_stability_iteration_number = 1;
        canopy.params.numerical_resolution.acceptable_sensible_heat_error = 1e-12;
        let forced = Solver::new(canopy).run(true).unwrap();
        (neutral, forced)
    }

    #[test]
    fn test_unstable_fallback_increases_aerodynamic_resistance() {
        let (neutral, forced) = run_with_failing_stability_correction(surface(400.0, 0.02));
        assert!(forced.is_forced_aerodynamic_resistance);
        assert_eq!(forced.stability_iterations_number, 1);
        assert!(forced.canopy.sensible_heat_flux > 0.0);
        assert!(is_close!(
            forced.canopy.aerodynamic_resistance / neutral.canopy.aerodynamic_resistance,
            1.2
        ));
        assert!(forced.canopy.energy_balance_residual.abs() < 1e-6);
    }

    #[test]
    fn test_stable_fallback_decreases_aerodynamic_resistance() {
        let (neutral, forced) = run_with_failing_stability_correction(surface(-60.0, 0.5));
        assert!(neutral.canopy.sensible_heat_flux < 0.0);
        assert!(forced.is_forced_aerodynamic_resistance);
        assert!(forced.canopy.sensible_heat_flux < 0.0);
        assert!(is_close!(
            forced.canopy.aerodynamic_resistance / neutral.canopy.aerodynamic_resistance,
            0.8
        ));
        assert!(forced.canopy.energy_balance_residual.abs() < 1e-6);
    }

    #[test]
    fn test_outputs_serialize() {
        let outputs = Solver::new(canopy_with(vec![surface(400.0, 0.02)]))
            .run(false)
            .unwrap();
        let serialized = serde_json::to_string(&outputs).unwrap();
        let deserialized: SolverOutputs = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.components.len(), 1);
        assert_eq!(deserialized.iterations_number, outputs.iterations_number);
    }
}
