//! A canopy: its components and the canopy-scale state linking them

use crate::aerodynamics;
use crate::component::Component;
use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::inputs::Inputs;
use crate::params::Params;
use crate::state::CanopyState;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Read-only view handed to components while they refresh themselves.
#[derive(Debug, Clone, Copy)]
pub struct CanopyContext<'a> {
    pub inputs: &'a Inputs,
    pub params: &'a Params,
    pub state: &'a CanopyState,
}

impl CanopyContext<'_> {
    /// Air temperature (K)
    pub fn air_temperature(&self) -> FloatValue {
        self.inputs.air_temperature_in_kelvin(&self.params.constants)
    }

    /// Converts absorbed photosynthetically active radiation into net shortwave radiation.
    pub fn to_shortwave(&self, absorbed_par: FloatValue) -> FloatValue {
        crate::utils::convert_photosynthetically_active_radiation_into_global_radiation(
            absorbed_par,
            self.params.constants.par_fraction_of_global_radiation,
        )
    }
}

/// The components of a canopy together with the inputs and parameters they are solved for.
///
/// Components are stored soil first, then leaves from the uppermost layer downwards.
#[derive(Debug, Serialize, Deserialize)]
pub struct Canopy {
    pub inputs: Inputs,
    pub params: Params,
    pub state: CanopyState,
    pub components: Vec<Box<dyn Component>>,
}

impl Canopy {
    /// Creates a canopy without any component, in a neutral atmosphere.
    pub fn new(inputs: Inputs, params: Params) -> CropEnergyBalanceResult<Self> {
        inputs.validate()?;
        params.validate()?;
        if params.simulation.stomatal_sensibility.requires_soil_water_potential()
            && inputs.soil_water_potential.is_none()
        {
            return Err(CropEnergyBalanceError::MissingSoilWaterPotential {
                model: params.simulation.stomatal_sensibility.name().to_string(),
            });
        }
        let state = CanopyState::new(&inputs, &params)?;
        Ok(Self {
            inputs,
            params,
            state,
            components: vec![],
        })
    }

    pub fn add_component(&mut self, component: Box<dyn Component>) {
        self.components.push(component);
    }

    pub fn context(&self) -> CanopyContext<'_> {
        CanopyContext {
            inputs: &self.inputs,
            params: &self.params,
            state: &self.state,
        }
    }

    fn split_mut(&mut self) -> (CanopyContext<'_>, &mut Vec<Box<dyn Component>>) {
        (
            CanopyContext {
                inputs: &self.inputs,
                params: &self.params,
                state: &self.state,
            },
            &mut self.components,
        )
    }

    /// Puts every component at air temperature and computes the radiation terms.
    pub fn initialize(&mut self) {
        let (context, components) = self.split_mut();
        let air_temperature = context.air_temperature();
        components
            .iter_mut()
            .for_each(|c| c.initialize(&context, air_temperature));

        self.state.source_temperature = air_temperature;
        self.update_radiation_totals();
    }

    fn update_radiation_totals(&mut self) {
        self.state.net_radiation = self.components.iter().map(|c| c.fluxes().net_radiation).sum();
        self.state.heat_flux = self.components.iter().map(|c| c.fluxes().heat_flux).sum();
        self.state.available_energy = self.state.net_radiation - self.state.heat_flux;
    }

    /// Refreshes surface, boundary and composed resistances of every component.
    pub fn update_resistances(&mut self) -> CropEnergyBalanceResult<()> {
        let (context, components) = self.split_mut();
        for component in components.iter_mut() {
            component.update_resistances(&context)?;
            component.update_composed_resistance(&context);
        }
        self.state.sum_inverse_composed_resistances = self
            .components
            .iter()
            .map(|c| 1.0 / c.fluxes().composed_resistance)
            .sum();
        Ok(())
    }

    /// Recomputes the heat flux of the components (which depends on their net radiation only)
    /// and the canopy available energy.
    pub fn update_available_energy(&mut self) {
        let (context, components) = self.split_mut();
        for component in components.iter_mut() {
            let heat_flux = component.calc_heat_flux(&context);
            let fluxes = component.fluxes_mut();
            fluxes.heat_flux = heat_flux;
            fluxes.available_energy = crate::component::calc_available_energy(
                fluxes.net_shortwave_radiation,
                fluxes.net_longwave_radiation,
                heat_flux,
            );
        }
        self.update_radiation_totals();
    }

    /// Penman and Penman-Monteith energies of the canopy, then the evaporative energy of every
    /// component.
    pub fn update_evaporative_energies(&mut self) {
        let air_volumetric_heat_capacity = self.params.constants.air_volumetric_heat_capacity();
        self.state.penman_evaporative_energy = aerodynamics::calc_penman_evaporative_energy(
            self.state.aerodynamic_resistance,
            self.state.available_energy,
            self.inputs.vapor_pressure_deficit(),
            self.state.vapor_pressure_slope,
            self.state.psychrometric_constant,
            air_volumetric_heat_capacity,
        );

        let (context, components) = self.split_mut();
        components
            .iter_mut()
            .for_each(|c| c.update_composed_conductance(&context));

        let composed_terms: Vec<(FloatValue, FloatValue, FloatValue)> = self
            .components
            .iter()
            .map(|c| {
                let fluxes = c.fluxes();
                (
                    fluxes.composed_conductance,
                    fluxes.available_energy,
                    fluxes.boundary_resistance,
                )
            })
            .collect();
        self.state.total_penman_monteith_evaporative_energy =
            aerodynamics::calc_penman_monteith_evaporative_energy(
                self.state.lumped_aerodynamic_resistance,
                self.state.penman_evaporative_energy,
                &composed_terms,
                self.state.vapor_pressure_slope,
                self.state.psychrometric_constant,
            );

        let (context, components) = self.split_mut();
        components
            .iter_mut()
            .for_each(|c| c.update_evaporative_energy(&context));
    }

    /// Source temperature and sensible heat flux of the canopy.
    pub fn update_source_temperature(&mut self) {
        let air_temperature = self.context().air_temperature();
        let air_volumetric_heat_capacity = self.params.constants.air_volumetric_heat_capacity();
        self.state.source_temperature = aerodynamics::calc_source_temperature(
            air_temperature,
            self.state.aerodynamic_resistance,
            self.state.available_energy,
            self.state.total_penman_monteith_evaporative_energy,
            air_volumetric_heat_capacity,
        );
        self.state.sensible_heat_flux = aerodynamics::calc_sensible_heat_flux(
            self.state.source_temperature,
            air_temperature,
            self.state.aerodynamic_resistance,
            air_volumetric_heat_capacity,
        );
    }

    /// Moves component temperatures towards the ones implied by the current fluxes.
    ///
    /// Returns the sum over all components of the absolute temperature change (K).
    pub fn update_temperatures(&mut self) -> FloatValue {
        let (context, components) = self.split_mut();
        components
            .iter_mut()
            .map(|c| c.update_temperature(&context))
            .sum()
    }

    /// Sum of the evaporative energies of all components ($\text{W m}^{-2}$)
    pub fn sum_evaporative_energies(&self) -> FloatValue {
        self.components
            .iter()
            .map(|c| c.fluxes().evaporative_energy)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::tests::example_inputs;
    use crate::leaf::StomatalSensibility;

    #[test]
    fn test_new_requires_soil_water_potential_when_needed() {
        let mut params = Params::default();
        params.simulation.stomatal_sensibility = StomatalSensibility::Tuzet {
            sensitivity_parameter: 4.9,
            reference_potential: -0.12,
        };
        let result = Canopy::new(example_inputs(), params.clone());
        assert!(matches!(
            result,
            Err(CropEnergyBalanceError::MissingSoilWaterPotential { .. })
        ));

        let mut inputs = example_inputs();
        inputs.soil_water_potential = Some(-0.5);
        assert!(Canopy::new(inputs, params).is_ok());
    }

    #[test]
    fn test_new_rejects_invalid_inputs() {
        let mut inputs = example_inputs();
        inputs.leaf_layers.clear();
        assert!(Canopy::new(inputs, Params::default()).is_err());
    }

    #[test]
    fn test_empty_canopy() {
        let mut canopy = Canopy::new(example_inputs(), Params::default()).unwrap();
        canopy.initialize();
        assert_eq!(canopy.state.net_radiation, 0.0);
        assert_eq!(canopy.update_temperatures(), 0.0);
        assert_eq!(canopy.sum_evaporative_energies(), 0.0);
    }
}
