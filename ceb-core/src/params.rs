//! Simulation parameters
//!
//! Every field has a default so that a configuration file only needs to list the values it
//! overrides. Configurations are read from TOML or JSON.

use crate::constants::Constants;
use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::irradiance::SkyType;
use crate::leaf::StomatalSensibility;
use crate::weather::AtmosphericEmissivityModel;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Physiological and physical parameters of the crop and its environment.
///
/// # Default Values
///
/// Defaults describe a wheat-like crop with amphistomatal leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Stomatal response to water status.
    /// Default: Leuning with $D_0$ = 2 kPa
    pub stomatal_sensibility: StomatalSensibility,

    /// Shape parameter of the soil aerodynamic resistance (Choudhury and Monteith, 1988).
    /// Default: 2.5
    pub soil_aerodynamic_resistance_shape_parameter: FloatValue,

    /// Soil roughness length for momentum (m).
    /// Default: 0.01
    pub soil_roughness_length_for_momentum: FloatValue,

    /// Leaf characteristic length in the direction of the wind (m).
    /// Default: 0.01
    pub leaf_characteristic_length: FloatValue,

    /// Shape parameter of the leaf boundary-layer conductance ($\text{m s}^{-1/2}$).
    /// Default: 0.01
    pub leaf_boundary_layer_shape_parameter: FloatValue,

    /// Extinction coefficient of wind speed inside the canopy.
    /// Default: 0.5
    pub wind_speed_extinction_coefficient: FloatValue,

    /// Maximum stomatal conductance ($\text{m h}^{-1}$).
    /// Default: 39.6
    pub maximum_stomatal_conductance: FloatValue,

    /// Residual stomatal conductance of fully closed stomata ($\text{m h}^{-1}$).
    /// Default: 4.0
    pub residual_stomatal_conductance: FloatValue,

    /// Absorbed irradiance at which the stomatal response to light is halved ($\text{W m}^{-2}$ leaf).
    /// Default: 105
    pub absorbed_par_50: FloatValue,

    /// First shape parameter of the soil surface resistance (Sellers et al., 1992).
    /// Default: 8.206
    pub soil_resistance_to_vapor_shape_parameter_1: FloatValue,

    /// Second shape parameter of the soil surface resistance (Sellers et al., 1992).
    /// Default: 4.255
    pub soil_resistance_to_vapor_shape_parameter_2: FloatValue,

    /// Whether stomata are found on both sides of the blade.
    /// Default: true
    pub amphistomatal_leaves: bool,

    /// Leaf scattering coefficient of photosynthetically active radiation.
    /// Default: 0.15
    pub leaf_scattering_coefficient: FloatValue,

    /// Canopy reflectance to diffuse irradiance.
    /// Default: 0.057
    pub canopy_reflectance_to_diffuse_irradiance: FloatValue,

    /// Average projection of leaves on the plane normal to the solar beam.
    /// Default: 0.5 (spherical leaf angle distribution)
    pub leaves_to_sun_average_projection: FloatValue,

    /// Sky radiance distribution used for the diffuse extinction coefficient.
    /// Default: standard overcast sky
    pub sky_type: SkyType,

    /// Number of sky sectors used for the diffuse extinction coefficient.
    /// Default: 3
    pub sky_sectors_number: usize,

    /// Mean drag coefficient of leaves (Choudhury and Monteith, 1988).
    /// Default: 0.2
    pub drag_coefficient: FloatValue,

    /// Ratio of the canopy roughness length for heat to the one for momentum.
    /// Default: 0.1
    pub ratio_heat_to_momentum_canopy_roughness_lengths: FloatValue,

    /// Richardson number below which free convection prevails.
    /// Default: -0.8
    pub free_convection_richardson_number: FloatValue,

    /// Shape parameter of the aerodynamic resistance under free convection.
    /// Default: 1.52
    pub free_convection_shape_parameter: FloatValue,

    /// Default: Brutsaert (1975)
    pub atmospheric_emissivity_model: AtmosphericEmissivityModel,

    /// Fraction of the soil net radiation conducted into the ground by day.
    /// Default: 0.1
    pub daytime_soil_heat_flux_fraction: FloatValue,

    /// Fraction of the soil net radiation conducted into the ground by night.
    /// Default: 0.5
    pub nighttime_soil_heat_flux_fraction: FloatValue,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            stomatal_sensibility: StomatalSensibility::default(),
            soil_aerodynamic_resistance_shape_parameter: 2.5,
            soil_roughness_length_for_momentum: 0.01,
            leaf_characteristic_length: 0.01,
            leaf_boundary_layer_shape_parameter: 0.01,
            wind_speed_extinction_coefficient: 0.5,
            maximum_stomatal_conductance: 39.6,
            residual_stomatal_conductance: 4.0,
            absorbed_par_50: 105.0,
            soil_resistance_to_vapor_shape_parameter_1: 8.206,
            soil_resistance_to_vapor_shape_parameter_2: 4.255,
            amphistomatal_leaves: true,
            leaf_scattering_coefficient: 0.15,
            canopy_reflectance_to_diffuse_irradiance: 0.057,
            leaves_to_sun_average_projection: 0.5,
            sky_type: SkyType::Soc,
            sky_sectors_number: 3,
            drag_coefficient: 0.2,
            ratio_heat_to_momentum_canopy_roughness_lengths: 0.1,
            free_convection_richardson_number: -0.8,
            free_convection_shape_parameter: 1.52,
            atmospheric_emissivity_model: AtmosphericEmissivityModel::default(),
            daytime_soil_heat_flux_fraction: 0.1,
            nighttime_soil_heat_flux_fraction: 0.5,
        }
    }
}

/// Settings of the iterative solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalResolution {
    /// Number of sublayers used to integrate the surface conductance of a leaf layer.
    /// Default: 100
    pub sublayers_number: usize,

    /// Fraction of the temperature step kept at each iteration, in (0, 1].
    /// Default: 0.5
    pub step_fraction: FloatValue,

    /// Sum over all components of the absolute temperature change between two iterations
    /// below which the solve has converged (K).
    /// Default: 0.02
    pub acceptable_temperature_error: FloatValue,

    /// Default: 100
    pub maximum_iteration_number: usize,

    /// Change of the canopy sensible heat flux between two stability iterations below which
    /// the stability correction has converged ($\text{W m}^{-2}$).
    /// Default: 0.01
    pub acceptable_sensible_heat_error: FloatValue,

    /// Default: 100
    pub maximum_stability_iteration_number: usize,
}

impl Default for NumericalResolution {
    fn default() -> Self {
        Self {
            sublayers_number: 100,
            step_fraction: 0.5,
            acceptable_temperature_error: 0.02,
            maximum_iteration_number: 100,
            acceptable_sensible_heat_error: 0.01,
            maximum_stability_iteration_number: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub constants: Constants,
    pub simulation: SimulationParameters,
    pub numerical_resolution: NumericalResolution,
}

impl Params {
    pub fn from_toml_str(content: &str) -> CropEnergyBalanceResult<Self> {
        let params: Self =
            toml::from_str(content).map_err(|e| CropEnergyBalanceError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(content: &str) -> CropEnergyBalanceResult<Self> {
        let params: Self = serde_json::from_str(content)
            .map_err(|e| CropEnergyBalanceError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Reads parameters from a `.toml` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> CropEnergyBalanceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(CropEnergyBalanceError::Config(format!(
                "unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> CropEnergyBalanceResult<()> {
        let simulation = &self.simulation;
        let numerical_resolution = &self.numerical_resolution;

        simulation.stomatal_sensibility.validate()?;

        let positive = [
            (
                "leaf_characteristic_length",
                simulation.leaf_characteristic_length,
            ),
            (
                "wind_speed_extinction_coefficient",
                simulation.wind_speed_extinction_coefficient,
            ),
            ("absorbed_par_50", simulation.absorbed_par_50),
            (
                "soil_aerodynamic_resistance_shape_parameter",
                simulation.soil_aerodynamic_resistance_shape_parameter,
            ),
            (
                "soil_roughness_length_for_momentum",
                simulation.soil_roughness_length_for_momentum,
            ),
            (
                "leaves_to_sun_average_projection",
                simulation.leaves_to_sun_average_projection,
            ),
            ("drag_coefficient", simulation.drag_coefficient),
            (
                "ratio_heat_to_momentum_canopy_roughness_lengths",
                simulation.ratio_heat_to_momentum_canopy_roughness_lengths,
            ),
            (
                "free_convection_shape_parameter",
                simulation.free_convection_shape_parameter,
            ),
            (
                "acceptable_temperature_error",
                numerical_resolution.acceptable_temperature_error,
            ),
            (
                "acceptable_sensible_heat_error",
                numerical_resolution.acceptable_sensible_heat_error,
            ),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, value)| *value <= 0.0) {
            return Err(CropEnergyBalanceError::invalid_parameter(
                name,
                format!("must be positive, got {}", value),
            ));
        }

        if !(0.0..1.0).contains(&simulation.leaf_scattering_coefficient) {
            return Err(CropEnergyBalanceError::invalid_parameter(
                "leaf_scattering_coefficient",
                "must lie within [0, 1)",
            ));
        }
        if numerical_resolution.step_fraction <= 0.0 || numerical_resolution.step_fraction > 1.0 {
            return Err(CropEnergyBalanceError::invalid_parameter(
                "step_fraction",
                format!(
                    "must lie within (0, 1], got {}",
                    numerical_resolution.step_fraction
                ),
            ));
        }
        if numerical_resolution.sublayers_number == 0 {
            return Err(CropEnergyBalanceError::invalid_parameter(
                "sublayers_number",
                "at least one sublayer is required",
            ));
        }
        if simulation.sky_sectors_number == 0 {
            return Err(CropEnergyBalanceError::invalid_parameter(
                "sky_sectors_number",
                "at least one sky sector is required",
            ));
        }
        Ok(())
    }

    pub fn stomatal_density_factor(&self) -> FloatValue {
        crate::utils::calc_stomatal_density_factor(self.simulation.amphistomatal_leaves) as FloatValue
    }
}
