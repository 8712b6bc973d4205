//! Canopy-scale state shared by every component during a solve

use crate::aerodynamics;
use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::inputs::Inputs;
use crate::irradiance::ExtinctionCoefficients;
use crate::params::Params;
use crate::weather;
use crate::FloatValue;
use log::warn;
use serde::{Deserialize, Serialize};

/// Canopy-scale quantities.
///
/// The aerodynamic part is computed once under neutral conditions and only changes when the
/// atmospheric stability is corrected. The energy terms are refreshed at every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanopyState {
    /// m
    pub zero_displacement_height: FloatValue,
    /// m
    pub roughness_length_for_momentum: FloatValue,
    /// m
    pub roughness_length_for_heat: FloatValue,
    /// $\text{m h}^{-1}$
    pub wind_speed_at_canopy_height: FloatValue,
    /// Aerodynamic resistance under neutral conditions ($\text{h m}^{-1}$)
    pub neutral_aerodynamic_resistance: FloatValue,
    /// $\text{h m}^{-1}$
    pub aerodynamic_resistance: FloatValue,
    /// Slope of the saturated vapor pressure curve at air temperature ($\text{kPa K}^{-1}$)
    pub vapor_pressure_slope: FloatValue,
    /// $\text{kPa K}^{-1}$
    pub psychrometric_constant: FloatValue,
    /// $R_0$ ($\text{h m}^{-1}$)
    pub lumped_aerodynamic_resistance: FloatValue,
    /// $\sum_i 1/R_i$ over all components ($\text{m h}^{-1}$)
    pub sum_inverse_composed_resistances: FloatValue,
    /// $\text{W m}^{-2}$
    pub penman_evaporative_energy: FloatValue,
    /// $\text{W m}^{-2}$
    pub total_penman_monteith_evaporative_energy: FloatValue,
    /// Air temperature at the mean source height (K)
    pub source_temperature: FloatValue,
    pub available_energy: FloatValue,
    pub net_radiation: FloatValue,
    pub heat_flux: FloatValue,
    pub sensible_heat_flux: FloatValue,
    /// Net longwave radiation above the canopy ($\text{W m}^{-2}$, negative for a loss)
    pub net_longwave_radiation: FloatValue,
    /// $\text{m h}^{-1}$
    pub friction_velocity: FloatValue,
    /// m, infinite under neutral conditions
    pub monin_obukhov_length: FloatValue,
    pub richardson_number: FloatValue,
    pub stability_correction_for_momentum: FloatValue,
    pub stability_correction_for_heat: FloatValue,
    pub extinction_coefficients: ExtinctionCoefficients,
}

impl CanopyState {
    /// Initialises the canopy under neutral conditions, with the source height at air temperature.
    pub fn new(inputs: &Inputs, params: &Params) -> CropEnergyBalanceResult<Self> {
        let constants = &params.constants;
        let simulation = &params.simulation;
        let leaf_area_index = inputs.total_leaf_area_index();
        let air_temperature = inputs.air_temperature_in_kelvin(constants);

        let zero_displacement_height = aerodynamics::calc_zero_displacement_height(
            inputs.canopy_height,
            leaf_area_index,
            simulation.drag_coefficient,
        );
        let roughness_length_for_momentum =
            aerodynamics::calc_roughness_length_for_momentum_transfer(
                simulation.soil_roughness_length_for_momentum,
                zero_displacement_height,
                inputs.canopy_height,
                leaf_area_index,
                simulation.drag_coefficient,
            );
        let roughness_length_for_heat = aerodynamics::calc_roughness_length_for_heat_transfer(
            roughness_length_for_momentum,
            simulation.ratio_heat_to_momentum_canopy_roughness_lengths,
        );
        if zero_displacement_height >= inputs.canopy_height || roughness_length_for_momentum <= 0.0
        {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "leaf area index {} is too dense for a canopy of {} m: zero displacement height \
                 ({} m) reaches the canopy top",
                leaf_area_index, inputs.canopy_height, zero_displacement_height
            )));
        }
        if inputs.measurement_height - zero_displacement_height <= roughness_length_for_momentum {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "measurement height ({} m) must lie above the zero displacement height plus the \
                 roughness length ({} m)",
                inputs.measurement_height,
                zero_displacement_height + roughness_length_for_momentum
            )));
        }

        let wind_speed = inputs.bounded_wind_speed();
        let wind_speed_at_canopy_height = aerodynamics::calc_wind_speed_at_canopy_height(
            wind_speed,
            inputs.canopy_height,
            inputs.measurement_height,
            zero_displacement_height,
            roughness_length_for_momentum,
        );
        let friction_velocity = aerodynamics::calc_friction_velocity(
            wind_speed,
            inputs.measurement_height,
            zero_displacement_height,
            roughness_length_for_momentum,
            0.0,
            constants.von_karman,
        );
        let neutral_aerodynamic_resistance = aerodynamics::calc_aerodynamic_resistance(
            0.0,
            friction_velocity,
            inputs.measurement_height,
            zero_displacement_height,
            roughness_length_for_heat,
            0.0,
            0.0,
            simulation.free_convection_richardson_number,
            simulation.free_convection_shape_parameter,
            constants.air_volumetric_heat_capacity(),
            constants.von_karman,
        );

        let vapor_pressure_slope = weather::calc_vapor_pressure_slope(inputs.air_temperature);
        let psychrometric_constant = inputs.psychrometric_constant(constants);
        let atmospheric_emissivity = weather::calc_atmospheric_emissivity(
            simulation.atmospheric_emissivity_model,
            inputs.vapor_pressure(),
            air_temperature,
        );

        Ok(Self {
            zero_displacement_height,
            roughness_length_for_momentum,
            roughness_length_for_heat,
            wind_speed_at_canopy_height,
            neutral_aerodynamic_resistance,
            aerodynamic_resistance: neutral_aerodynamic_resistance,
            vapor_pressure_slope,
            psychrometric_constant,
            lumped_aerodynamic_resistance: aerodynamics::calc_lumped_aerodynamic_resistance(
                neutral_aerodynamic_resistance,
                vapor_pressure_slope,
                psychrometric_constant,
            ),
            sum_inverse_composed_resistances: 0.0,
            penman_evaporative_energy: 0.0,
            total_penman_monteith_evaporative_energy: 0.0,
            source_temperature: air_temperature,
            available_energy: 0.0,
            net_radiation: 0.0,
            heat_flux: 0.0,
            sensible_heat_flux: 0.0,
            net_longwave_radiation: aerodynamics::calc_net_longwave_radiation(
                air_temperature,
                atmospheric_emissivity,
                constants.stefan_boltzmann,
            ),
            friction_velocity,
            monin_obukhov_length: FloatValue::INFINITY,
            richardson_number: 0.0,
            stability_correction_for_momentum: 0.0,
            stability_correction_for_heat: 0.0,
            extinction_coefficients: ExtinctionCoefficients::new(
                inputs.solar_inclination,
                leaf_area_index,
                simulation.leaf_scattering_coefficient,
                simulation.canopy_reflectance_to_diffuse_irradiance,
                simulation.leaves_to_sun_average_projection,
                simulation.sky_sectors_number,
                simulation.sky_type,
            ),
        })
    }

    fn set_aerodynamic_resistance(&mut self, aerodynamic_resistance: FloatValue) {
        self.aerodynamic_resistance = aerodynamic_resistance;
        self.lumped_aerodynamic_resistance = aerodynamics::calc_lumped_aerodynamic_resistance(
            aerodynamic_resistance,
            self.vapor_pressure_slope,
            self.psychrometric_constant,
        );
    }

    /// Corrects the aerodynamic resistance for the atmospheric stability implied by the current
    /// sensible heat flux and source temperature.
    pub fn update_stability(&mut self, inputs: &Inputs, params: &Params) {
        let constants = &params.constants;
        let simulation = &params.simulation;
        let wind_speed = inputs.bounded_wind_speed();
        let air_temperature = inputs.air_temperature_in_kelvin(constants);

        self.monin_obukhov_length = aerodynamics::calc_monin_obukhov_length(
            self.source_temperature,
            self.friction_velocity,
            self.sensible_heat_flux,
            constants.air_volumetric_heat_capacity(),
            constants.von_karman,
            constants.gravitational_acceleration,
        );
        let stability_parameter = aerodynamics::calc_stability_parameter(
            inputs.measurement_height,
            self.zero_displacement_height,
            self.monin_obukhov_length,
        );
        self.richardson_number = aerodynamics::calc_richardson_number(
            inputs.measurement_height,
            self.zero_displacement_height,
            self.monin_obukhov_length,
        );
        let (for_momentum, for_heat) = aerodynamics::calc_stability_correction_functions(
            stability_parameter,
            self.richardson_number,
            simulation.free_convection_richardson_number,
        );
        self.stability_correction_for_momentum = for_momentum;
        self.stability_correction_for_heat = for_heat;

        self.friction_velocity = aerodynamics::calc_friction_velocity(
            wind_speed,
            inputs.measurement_height,
            self.zero_displacement_height,
            self.roughness_length_for_momentum,
            for_momentum,
            constants.von_karman,
        );
        let aerodynamic_resistance = aerodynamics::calc_aerodynamic_resistance(
            self.richardson_number,
            self.friction_velocity,
            inputs.measurement_height,
            self.zero_displacement_height,
            self.roughness_length_for_heat,
            for_heat,
            self.source_temperature - air_temperature,
            simulation.free_convection_richardson_number,
            simulation.free_convection_shape_parameter,
            constants.air_volumetric_heat_capacity(),
            constants.von_karman,
        );

        if aerodynamic_resistance.is_finite() && aerodynamic_resistance > 0.0 {
            self.set_aerodynamic_resistance(aerodynamic_resistance);
        } else {
            warn!(
                "Stability-corrected aerodynamic resistance is not usable ({}), the neutral one is kept",
                aerodynamic_resistance
            );
            self.set_aerodynamic_resistance(self.neutral_aerodynamic_resistance);
        }
    }

    /// Sets the aerodynamic resistance to `factor` times its neutral value.
    pub fn force_aerodynamic_resistance(&mut self, factor: FloatValue) {
        self.set_aerodynamic_resistance(factor * self.neutral_aerodynamic_resistance);
    }

    /// Energy balance residual $R_n - (\lambda E + H + G)$ ($\text{W m}^{-2}$).
    pub fn energy_balance_residual(&self) -> FloatValue {
        self.net_radiation
            - (self.total_penman_monteith_evaporative_energy
                + self.sensible_heat_flux
                + self.heat_flux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::tests::example_inputs;
    use is_close::is_close;

    #[test]
    fn test_new_is_neutral() {
        let inputs = example_inputs();
        let params = Params::default();
        let state = CanopyState::new(&inputs, &params).unwrap();

        assert!(state.monin_obukhov_length.is_infinite());
        assert_eq!(state.richardson_number, 0.0);
        assert_eq!(
            state.aerodynamic_resistance,
            state.neutral_aerodynamic_resistance
        );
        assert!(state.aerodynamic_resistance > 0.0);
        assert!(state.wind_speed_at_canopy_height < inputs.wind_speed);
        assert!(is_close!(state.source_temperature, 298.15));
        assert!(state.net_longwave_radiation < 0.0);
        assert!(is_close!(
            state.lumped_aerodynamic_resistance,
            (1.0 + state.vapor_pressure_slope / state.psychrometric_constant)
                * state.aerodynamic_resistance
        ));
    }

    #[test]
    fn test_measurement_height_must_be_above_canopy_roughness() {
        let mut inputs = example_inputs();
        inputs.measurement_height = 0.7;
        let result = CanopyState::new(&inputs, &Params::default());
        assert!(matches!(result, Err(CropEnergyBalanceError::InvalidInput(_))));
    }

    #[test]
    fn test_dense_canopy_is_rejected() {
        let mut inputs = example_inputs();
        inputs.leaf_layers = std::collections::BTreeMap::from([(0, 10.0), (1, 10.0), (2, 10.0)]);
        assert!(inputs.validate().is_ok());
        let result = CanopyState::new(&inputs, &Params::default());
        assert!(matches!(result, Err(CropEnergyBalanceError::InvalidInput(_))));
    }

    #[test]
    fn test_stability_correction_direction() {
        let inputs = example_inputs();
        let params = Params::default();

        let mut unstable = CanopyState::new(&inputs, &params).unwrap();
        unstable.sensible_heat_flux = 100.0;
        unstable.source_temperature += 2.0;
        unstable.update_stability(&inputs, &params);
        assert!(unstable.monin_obukhov_length < 0.0);
        assert!(unstable.aerodynamic_resistance < unstable.neutral_aerodynamic_resistance);

        let mut stable = CanopyState::new(&inputs, &params).unwrap();
        stable.sensible_heat_flux = -20.0;
        stable.source_temperature -= 1.0;
        stable.update_stability(&inputs, &params);
        assert!(stable.monin_obukhov_length > 0.0);
        assert!(stable.aerodynamic_resistance > stable.neutral_aerodynamic_resistance);
    }

    #[test]
    fn test_force_aerodynamic_resistance() {
        let mut state = CanopyState::new(&example_inputs(), &Params::default()).unwrap();
        state.force_aerodynamic_resistance(1.2);
        assert!(is_close!(
            state.aerodynamic_resistance,
            1.2 * state.neutral_aerodynamic_resistance
        ));
    }
}
