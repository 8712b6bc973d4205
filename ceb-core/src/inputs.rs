//! Micrometeorological and canopy inputs of a single energy balance solve

use crate::constants::Constants;
use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::irradiance::IncidentIrradiance;
use crate::weather;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Layer index reserved for the soil.
pub const SOIL_INDEX: i32 = -1;

/// Lowest wind speed ($\text{m h}^{-1}$) seen by the solver.
///
/// Below it the aerodynamic resistance grows so large that surface temperatures run away.
pub const MINIMUM_WIND_SPEED: FloatValue = 2400.0;

/// Inputs describing the canopy and the weather above it.
///
/// Values are stored in the units they are provided in. Derived quantities (temperatures in K,
/// vapor pressures, psychrometric constant...) are exposed through methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    /// Height at which the weather variables are measured (m)
    pub measurement_height: FloatValue,
    /// Height of the canopy (m)
    pub canopy_height: FloatValue,
    /// Ratio of actual to potential volumetric water content in the soil
    pub soil_saturation_ratio: FloatValue,
    /// Air temperature (°C)
    pub air_temperature: FloatValue,
    /// Wind speed ($\text{m h}^{-1}$)
    pub wind_speed: FloatValue,
    /// Relative humidity of the air (%)
    pub relative_humidity: FloatValue,
    /// Atmospheric pressure (kPa)
    pub atmospheric_pressure: FloatValue,
    /// Soil water potential (MPa)
    #[serde(default)]
    pub soil_water_potential: Option<FloatValue>,
    /// Angle between the solar beam and the horizon (rad)
    pub solar_inclination: FloatValue,
    /// Leaf area index per layer ($\text{m}^2$ leaf $\text{m}^{-2}$ ground).
    ///
    /// The uppermost layer has the highest index.
    pub leaf_layers: BTreeMap<i32, FloatValue>,
    /// Incident photosynthetically active radiation ($\text{W}_{PAR}\text{ m}^{-2}$ ground)
    pub incident_photosynthetically_active_radiation: IncidentIrradiance,
}

impl Inputs {
    /// Reads inputs from a JSON file and validates them.
    pub fn from_path(path: impl AsRef<Path>) -> CropEnergyBalanceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> CropEnergyBalanceResult<Self> {
        let inputs: Self = serde_json::from_str(content)
            .map_err(|e| CropEnergyBalanceError::Config(e.to_string()))?;
        inputs.validate()?;
        Ok(inputs)
    }

    pub fn validate(&self) -> CropEnergyBalanceResult<()> {
        if self.leaf_layers.is_empty() {
            return Err(CropEnergyBalanceError::InvalidInput(
                "at least one leaf layer is required".to_string(),
            ));
        }
        if self.leaf_layers.contains_key(&SOIL_INDEX) {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "layer index {} is reserved for the soil",
                SOIL_INDEX
            )));
        }
        if let Some((index, value)) = self
            .leaf_layers
            .iter()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "leaf area index of layer {} must be positive, got {}",
                index, value
            )));
        }
        if !(0.0..=100.0).contains(&self.relative_humidity) {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "relative humidity must lie within [0, 100] %, got {}",
                self.relative_humidity
            )));
        }
        if self.canopy_height <= 0.0 {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "canopy height must be positive, got {}",
                self.canopy_height
            )));
        }
        if self.measurement_height <= self.canopy_height {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "measurement height ({} m) must be above canopy height ({} m)",
                self.measurement_height, self.canopy_height
            )));
        }
        if self.atmospheric_pressure <= 0.0 {
            return Err(CropEnergyBalanceError::InvalidInput(format!(
                "atmospheric pressure must be positive, got {}",
                self.atmospheric_pressure
            )));
        }
        let irradiance = &self.incident_photosynthetically_active_radiation;
        if irradiance.direct < 0.0 || irradiance.diffuse < 0.0 {
            return Err(CropEnergyBalanceError::InvalidInput(
                "incident irradiance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Air temperature (K)
    pub fn air_temperature_in_kelvin(&self, constants: &Constants) -> FloatValue {
        crate::utils::convert_celsius_to_kelvin(self.air_temperature, constants.absolute_zero)
    }

    /// Wind speed floored at [`MINIMUM_WIND_SPEED`] ($\text{m h}^{-1}$)
    pub fn bounded_wind_speed(&self) -> FloatValue {
        self.wind_speed.max(MINIMUM_WIND_SPEED)
    }

    /// Actual vapor pressure of the air (kPa)
    pub fn vapor_pressure(&self) -> FloatValue {
        weather::calc_air_vapor_pressure(self.air_temperature, self.relative_humidity)
    }

    /// Vapor pressure deficit of the air (kPa)
    pub fn vapor_pressure_deficit(&self) -> FloatValue {
        weather::calc_vapor_pressure_deficit(
            self.air_temperature,
            self.air_temperature,
            self.relative_humidity,
        )
    }

    /// Psychrometric constant ($\text{kPa K}^{-1}$) at the current atmospheric pressure
    pub fn psychrometric_constant(&self, constants: &Constants) -> FloatValue {
        weather::calc_psychrometric_constant(
            self.atmospheric_pressure,
            constants.air_specific_heat_capacity,
            constants.latent_heat_for_vaporization,
            constants.vapor_to_dry_air_molecular_weight,
        )
    }

    /// Leaf area index of the whole canopy
    pub fn total_leaf_area_index(&self) -> FloatValue {
        self.leaf_layers.values().sum()
    }

    pub fn is_daylight(&self) -> bool {
        self.incident_photosynthetically_active_radiation.total() > 0.0
    }

    /// Leaf layers from the uppermost to the lowermost, with their cumulative leaf area index
    /// bounds counted downwards from the top of the canopy.
    ///
    /// Yields `(index, leaf_area_index, upper_cumulative, lower_cumulative)`.
    pub fn leaf_layers_from_top(&self) -> Vec<(i32, FloatValue, FloatValue, FloatValue)> {
        let mut cumulative = 0.0;
        self.leaf_layers
            .iter()
            .rev()
            .map(|(index, leaf_area_index)| {
                let upper = cumulative;
                cumulative += leaf_area_index;
                (*index, *leaf_area_index, upper, cumulative)
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use is_close::is_close;

    pub(crate) fn example_inputs() -> Inputs {
        Inputs {
            measurement_height: 2.0,
            canopy_height: 1.0,
            soil_saturation_ratio: 0.5,
            air_temperature: 25.0,
            wind_speed: 3600.0,
            relative_humidity: 50.0,
            atmospheric_pressure: 101.3,
            soil_water_potential: None,
            solar_inclination: 0.8,
            leaf_layers: BTreeMap::from([(0, 1.0), (1, 1.0), (2, 1.0)]),
            incident_photosynthetically_active_radiation: IncidentIrradiance {
                direct: 300.0,
                diffuse: 100.0,
            },
        }
    }

    #[test]
    fn test_derived_values() {
        let inputs = example_inputs();
        let constants = Constants::default();
        assert!(is_close!(inputs.air_temperature_in_kelvin(&constants), 298.15));
        assert!(is_close!(inputs.total_leaf_area_index(), 3.0));
        assert!(is_close!(
            inputs.vapor_pressure() + inputs.vapor_pressure_deficit(),
            weather::calc_saturated_air_vapor_pressure(25.0)
        ));
        assert!(inputs.is_daylight());
    }

    #[test]
    fn test_wind_speed_is_floored() {
        let mut inputs = example_inputs();
        inputs.wind_speed = 0.0;
        assert_eq!(inputs.bounded_wind_speed(), MINIMUM_WIND_SPEED);
        assert_eq!(MINIMUM_WIND_SPEED, 2400.0);
        inputs.wind_speed = 7200.0;
        assert_eq!(inputs.bounded_wind_speed(), 7200.0);
    }

    #[test]
    fn test_leaf_layers_from_top() {
        let mut inputs = example_inputs();
        inputs.leaf_layers = BTreeMap::from([(0, 0.5), (1, 1.0), (2, 1.5)]);
        let layers = inputs.leaf_layers_from_top();
        assert_eq!(layers[0], (2, 1.5, 0.0, 1.5));
        assert_eq!(layers[1], (1, 1.0, 1.5, 2.5));
        assert_eq!(layers[2], (0, 0.5, 2.5, 3.0));
    }

    #[test]
    fn test_validation() {
        assert!(example_inputs().validate().is_ok());

        let mut inputs = example_inputs();
        inputs.leaf_layers.clear();
        assert!(matches!(
            inputs.validate(),
            Err(CropEnergyBalanceError::InvalidInput(_))
        ));

        let mut inputs = example_inputs();
        inputs.leaf_layers.insert(SOIL_INDEX, 1.0);
        assert!(inputs.validate().is_err());

        let mut inputs = example_inputs();
        inputs.leaf_layers.insert(3, -1.0);
        assert!(inputs.validate().is_err());

        let mut inputs = example_inputs();
        inputs.relative_humidity = 120.0;
        assert!(inputs.validate().is_err());

        let mut inputs = example_inputs();
        inputs.measurement_height = 0.5;
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn test_measurement_height_at_canopy_height_is_rejected() {
        let mut inputs = example_inputs();
        inputs.measurement_height = 1.0;
        inputs.canopy_height = 1.0;
        assert!(matches!(
            inputs.validate(),
            Err(CropEnergyBalanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_json_str() {
        let content = r#"{
            "measurement_height": 2.0,
            "canopy_height": 1.0,
            "soil_saturation_ratio": 0.5,
            "air_temperature": 25.0,
            "wind_speed": 3600.0,
            "relative_humidity": 50.0,
            "atmospheric_pressure": 101.3,
            "solar_inclination": 0.8,
            "leaf_layers": {"0": 1.0, "1": 1.0, "2": 1.0},
            "incident_photosynthetically_active_radiation": {"direct": 300.0, "diffuse": 100.0}
        }"#;
        let inputs = Inputs::from_json_str(content).unwrap();
        assert_eq!(inputs, example_inputs());

        assert!(matches!(
            Inputs::from_json_str("{}"),
            Err(CropEnergyBalanceError::Config(_))
        ));
    }
}
