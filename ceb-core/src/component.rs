//! Canopy components and the component-level terms of the multi-component Penman-Monteith equation
//!
//! Lhomme et al. (2013), Evaporation from multi-component canopies: Generalized formulations,
//! Journal of Hydrology 486, 315-320.

use crate::canopy::CanopyContext;
use crate::constants::PRECISION;
use crate::errors::CropEnergyBalanceResult;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Total boundary resistance under both forced and free convection ($\text{h m}^{-1}$).
pub fn calc_boundary_layer_resistance(
    forced_convection_resistance: FloatValue,
    free_convection_resistance: FloatValue,
) -> FloatValue {
    1.0 / (1.0 / forced_convection_resistance.max(PRECISION)
        + 1.0 / free_convection_resistance.max(PRECISION))
}

/// Composed boundary and surface resistance $R_i$ (Lhomme et al., 2013, Eq. 8).
pub fn calc_composed_resistance(
    surface_resistance: FloatValue,
    boundary_layer_resistance: FloatValue,
    vapor_pressure_slope: FloatValue,
    psychrometric_constant: FloatValue,
    stomatal_density_factor: FloatValue,
) -> FloatValue {
    surface_resistance
        + boundary_layer_resistance
            * (stomatal_density_factor + vapor_pressure_slope / psychrometric_constant)
}

/// Composed boundary and surface conductance $P_i$ (Lhomme et al., 2013, Eq. 13).
///
/// `sum_inverse_composed_resistances` is $\sum_j 1/R_j$ over every component of the canopy.
pub fn calc_composed_conductance(
    composed_resistance: FloatValue,
    sum_inverse_composed_resistances: FloatValue,
    lumped_aerodynamic_resistance: FloatValue,
) -> FloatValue {
    1.0 / (composed_resistance
        * (1.0 + lumped_aerodynamic_resistance * sum_inverse_composed_resistances))
}

/// Evaporative energy of a component ($\text{W m}^{-2}$ ground), Lhomme et al. (2013), Eq. 11.
#[allow(clippy::too_many_arguments)]
pub fn calc_evaporative_energy(
    available_energy: FloatValue,
    boundary_layer_resistance: FloatValue,
    composed_resistance: FloatValue,
    lumped_aerodynamic_resistance: FloatValue,
    penman_evaporative_energy: FloatValue,
    penman_monteith_evaporative_energy: FloatValue,
    vapor_pressure_slope: FloatValue,
    psychrometric_constant: FloatValue,
) -> FloatValue {
    let energy_driven = lumped_aerodynamic_resistance
        * (penman_evaporative_energy - penman_monteith_evaporative_energy);
    let radiation_driven = boundary_layer_resistance * available_energy * vapor_pressure_slope
        / psychrometric_constant;
    (energy_driven + radiation_driven) / composed_resistance
}

/// Temperature of a component (K) given the air temperature at the source height.
pub fn calc_temperature(
    source_temperature: FloatValue,
    boundary_layer_resistance: FloatValue,
    available_energy: FloatValue,
    evaporative_energy: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
) -> FloatValue {
    source_temperature
        + boundary_layer_resistance * (available_energy - evaporative_energy)
            / air_volumetric_heat_capacity
}

/// Available energy of a component ($\text{W m}^{-2}$ ground).
pub fn calc_available_energy(
    net_shortwave_radiation: FloatValue,
    net_longwave_radiation: FloatValue,
    heat_flux: FloatValue,
) -> FloatValue {
    net_shortwave_radiation + net_longwave_radiation - heat_flux
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Soil,
    LumpedLeaves,
    SunlitLeaves,
    ShadedLeaves,
}

/// Energy balance terms of a single component.
///
/// Fluxes are per unit ground area, temperatures in K and resistances in $\text{h m}^{-1}$.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentFluxes {
    pub temperature: FloatValue,
    /// Temperature obtained at the last iteration, before relaxation
    pub candidate_temperature: FloatValue,
    pub net_shortwave_radiation: FloatValue,
    pub net_longwave_radiation: FloatValue,
    pub net_radiation: FloatValue,
    /// Heat flux into the soil (zero for leaves)
    pub heat_flux: FloatValue,
    pub available_energy: FloatValue,
    pub surface_resistance: FloatValue,
    pub boundary_resistance: FloatValue,
    pub composed_resistance: FloatValue,
    pub composed_conductance: FloatValue,
    pub evaporative_energy: FloatValue,
    pub sensible_heat_flux: FloatValue,
}

/// A part of the canopy exchanging energy with the air at the mean source height.
///
/// Implementors only provide what differs between soil and leaves: radiation, resistances and
/// heat flux. The Penman-Monteith bookkeeping is shared through the provided methods.
#[typetag::serde(tag = "type")]
pub trait Component: Debug + Send + Sync {
    fn kind(&self) -> ComponentKind;

    /// Layer index (-1 for the soil)
    fn index(&self) -> i32;

    /// Leaf area index carried by the component ($\text{m}^2$ leaf $\text{m}^{-2}$ ground)
    fn leaf_area_index(&self) -> FloatValue {
        0.0
    }

    fn fluxes(&self) -> &ComponentFluxes;

    fn fluxes_mut(&mut self) -> &mut ComponentFluxes;

    /// Net shortwave and longwave radiation, both independent of the component temperature.
    fn calc_net_radiation(&self, context: &CanopyContext) -> (FloatValue, FloatValue);

    /// Refreshes surface and boundary resistances from the current component and canopy temperatures.
    fn update_resistances(&mut self, context: &CanopyContext) -> CropEnergyBalanceResult<()>;

    /// Heat flux into the ground ($\text{W m}^{-2}$).
    fn calc_heat_flux(&self, _context: &CanopyContext) -> FloatValue {
        0.0
    }

    /// 1 for amphistomatal leaves and the soil, 2 for hypostomatal leaves
    fn stomatal_density_factor(&self) -> FloatValue {
        1.0
    }

    /// Sets the component to `temperature` and computes its radiation terms.
    fn initialize(&mut self, context: &CanopyContext, temperature: FloatValue) {
        let (shortwave, longwave) = self.calc_net_radiation(context);
        let heat_flux = {
            let fluxes = self.fluxes_mut();
            fluxes.temperature = temperature;
            fluxes.candidate_temperature = temperature;
            fluxes.net_shortwave_radiation = shortwave;
            fluxes.net_longwave_radiation = longwave;
            fluxes.net_radiation = shortwave + longwave;
            self.calc_heat_flux(context)
        };
        let fluxes = self.fluxes_mut();
        fluxes.heat_flux = heat_flux;
        fluxes.available_energy = calc_available_energy(shortwave, longwave, heat_flux);
    }

    fn update_composed_resistance(&mut self, context: &CanopyContext) {
        let stomatal_density_factor = self.stomatal_density_factor();
        let state = context.state;
        let fluxes = self.fluxes_mut();
        fluxes.composed_resistance = calc_composed_resistance(
            fluxes.surface_resistance,
            fluxes.boundary_resistance,
            state.vapor_pressure_slope,
            state.psychrometric_constant,
            stomatal_density_factor,
        );
    }

    fn update_composed_conductance(&mut self, context: &CanopyContext) {
        let state = context.state;
        let fluxes = self.fluxes_mut();
        fluxes.composed_conductance = calc_composed_conductance(
            fluxes.composed_resistance,
            state.sum_inverse_composed_resistances,
            state.lumped_aerodynamic_resistance,
        );
    }

    fn update_evaporative_energy(&mut self, context: &CanopyContext) {
        let state = context.state;
        let fluxes = self.fluxes_mut();
        fluxes.evaporative_energy = calc_evaporative_energy(
            fluxes.available_energy,
            fluxes.boundary_resistance,
            fluxes.composed_resistance,
            state.lumped_aerodynamic_resistance,
            state.penman_evaporative_energy,
            state.total_penman_monteith_evaporative_energy,
            state.vapor_pressure_slope,
            state.psychrometric_constant,
        );
        fluxes.sensible_heat_flux = fluxes.available_energy - fluxes.evaporative_energy;
    }

    /// Computes the new component temperature and moves the current one a `step_fraction` of
    /// the way towards it.
    ///
    /// Returns the absolute difference between the new and the previous temperature.
    fn update_temperature(&mut self, context: &CanopyContext) -> FloatValue {
        let state = context.state;
        let air_volumetric_heat_capacity = context.params.constants.air_volumetric_heat_capacity();
        let step_fraction = context.params.numerical_resolution.step_fraction;
        let fluxes = self.fluxes_mut();
        fluxes.candidate_temperature = calc_temperature(
            state.source_temperature,
            fluxes.boundary_resistance,
            fluxes.available_energy,
            fluxes.evaporative_energy,
            air_volumetric_heat_capacity,
        );
        let error = (fluxes.candidate_temperature - fluxes.temperature).abs();
        fluxes.temperature += crate::utils::calc_temperature_step(
            fluxes.temperature,
            fluxes.candidate_temperature,
            step_fraction,
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{follows_trend, Trend};
    use is_close::is_close;

    #[test]
    fn test_calc_boundary_layer_resistance() {
        assert!(is_close!(calc_boundary_layer_resistance(2.0, 2.0), 1.0));
        assert!(is_close!(
            calc_boundary_layer_resistance(0.0, 10.0),
            calc_boundary_layer_resistance(PRECISION, 10.0)
        ));
        assert!(calc_boundary_layer_resistance(1.0, FloatValue::INFINITY) <= 1.0);
    }

    #[test]
    fn test_calc_composed_resistance() {
        assert!(is_close!(
            calc_composed_resistance(1.0, 0.5, 0.066, 0.066, 1.0),
            2.0
        ));
        let values: Vec<FloatValue> = (0..10)
            .map(|i| calc_composed_resistance(1.0, 0.1 * i as FloatValue, 0.2, 0.066, 2.0))
            .collect();
        assert!(follows_trend(&values, Trend::Increasing));
    }

    #[test]
    fn test_calc_composed_conductance() {
        assert!(is_close!(calc_composed_conductance(2.0, 0.0, 1.0), 0.5));
        assert!(is_close!(calc_composed_conductance(2.0, 1.0, 1.0), 0.25));
    }

    #[test]
    fn test_calc_evaporative_energy() {
        assert_eq!(
            calc_evaporative_energy(0.0, 0.1, 1.0, 0.2, 300.0, 300.0, 0.2, 0.066),
            0.0
        );
        assert!(is_close!(
            calc_evaporative_energy(100.0, 0.1, 1.0, 0.2, 300.0, 200.0, 0.066, 0.066),
            0.2 * 100.0 + 0.1 * 100.0
        ));
    }

    #[test]
    fn test_calc_temperature() {
        assert_eq!(calc_temperature(300.0, 0.01, 200.0, 200.0, 0.3318), 300.0);
        assert!(calc_temperature(300.0, 0.01, 200.0, 100.0, 0.3318) > 300.0);
        assert!(calc_temperature(300.0, 0.01, 100.0, 200.0, 0.3318) < 300.0);
    }

    #[test]
    fn test_calc_available_energy() {
        assert_eq!(calc_available_energy(300.0, -50.0, 25.0), 225.0);
    }

    #[test]
    fn test_component_evaporative_energies_sum_to_canopy_energy() {
        use crate::aerodynamics::calc_penman_monteith_evaporative_energy;

        let (slope, gamma, r0, penman) = (0.19, 0.066, 0.05, 320.0);
        // (surface resistance, boundary resistance, available energy)
        let components = [(0.5, 0.02, 250.0), (2.0, 0.01, 80.0), (0.05, 0.3, 60.0)];
        let composed: Vec<FloatValue> = components
            .iter()
            .map(|(rs, rb, _)| calc_composed_resistance(*rs, *rb, slope, gamma, 1.0))
            .collect();
        let sum_inverse: FloatValue = composed.iter().map(|r| 1.0 / r).sum();
        let terms: Vec<(FloatValue, FloatValue, FloatValue)> = components
            .iter()
            .zip(composed.iter())
            .map(|((_, rb, a), r)| (calc_composed_conductance(*r, sum_inverse, r0), *a, *rb))
            .collect();
        let canopy = calc_penman_monteith_evaporative_energy(r0, penman, &terms, slope, gamma);

        let total: FloatValue = components
            .iter()
            .zip(composed.iter())
            .map(|((_, rb, a), r)| {
                calc_evaporative_energy(*a, *rb, *r, r0, penman, canopy, slope, gamma)
            })
            .sum();
        assert!(is_close!(total, canopy));
    }
}
