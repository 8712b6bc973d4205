//! Air humidity and atmospheric radiation formalisms

use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Calculates the psychrometric constant ($\text{kPa K}^{-1}$).
///
/// Allen et al. (1998), FAO Irrigation and Drainage Paper No. 56, Eq. 8.
///
/// # Arguments
///
/// * `atmospheric_pressure` - kPa
/// * `air_specific_heat_capacity` - W h g-1 K-1
/// * `latent_heat_for_vaporization` - W h g-1
/// * `vapor_to_dry_air_molecular_weight` - dimensionless
pub fn calc_psychrometric_constant(
    atmospheric_pressure: FloatValue,
    air_specific_heat_capacity: FloatValue,
    latent_heat_for_vaporization: FloatValue,
    vapor_to_dry_air_molecular_weight: FloatValue,
) -> FloatValue {
    air_specific_heat_capacity * atmospheric_pressure
        / (vapor_to_dry_air_molecular_weight * latent_heat_for_vaporization)
}

/// Saturated vapor pressure of the air (kPa) at `temperature` (°C).
///
/// Allen et al. (1998), Eq. 11.
pub fn calc_saturated_air_vapor_pressure(temperature: FloatValue) -> FloatValue {
    0.6108 * (17.27 * temperature / (temperature + 237.3)).exp()
}

/// Slope of the saturation vapor pressure curve ($\text{kPa K}^{-1}$) at `temperature` (°C).
///
/// Allen et al. (1998), Eq. 13.
pub fn calc_vapor_pressure_slope(temperature: FloatValue) -> FloatValue {
    4098.0 * calc_saturated_air_vapor_pressure(temperature) / (temperature + 237.3).powi(2)
}

/// Actual vapor pressure of the air (kPa).
pub fn calc_air_vapor_pressure(air_temperature: FloatValue, relative_humidity: FloatValue) -> FloatValue {
    calc_saturated_air_vapor_pressure(air_temperature) * relative_humidity / 100.0
}

/// Vapor pressure deficit (kPa) between a surface at `leaf_temperature` and the air.
///
/// Both temperatures are in °C and `relative_humidity` is in %.
pub fn calc_vapor_pressure_deficit(
    air_temperature: FloatValue,
    leaf_temperature: FloatValue,
    relative_humidity: FloatValue,
) -> FloatValue {
    calc_saturated_air_vapor_pressure(leaf_temperature)
        - calc_air_vapor_pressure(air_temperature, relative_humidity)
}

/// Clear-sky emissivity models of the atmosphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AtmosphericEmissivityModel {
    /// Brutsaert (1975), Water Resources Research 11, 742-744.
    #[default]
    Brutsaert1975,
    /// Brunt (1932), Quarterly Journal of the Royal Meteorological Society 58, 389-420.
    Brunt1932,
}

/// Calculates the atmospheric emissivity (dimensionless).
///
/// # Arguments
///
/// * `model` - emissivity model
/// * `air_vapor_pressure` - kPa
/// * `air_temperature` - K
pub fn calc_atmospheric_emissivity(
    model: AtmosphericEmissivityModel,
    air_vapor_pressure: FloatValue,
    air_temperature: FloatValue,
) -> FloatValue {
    // both models are formulated with the vapor pressure in hPa
    let air_vapor_pressure = 10.0 * air_vapor_pressure;
    match model {
        AtmosphericEmissivityModel::Brutsaert1975 => {
            1.24 * (air_vapor_pressure / air_temperature).powf(1.0 / 7.0)
        }
        AtmosphericEmissivityModel::Brunt1932 => 0.52 + 0.065 * air_vapor_pressure.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{follows_trend, Trend};

    fn round3(value: FloatValue) -> FloatValue {
        (value * 1000.0).round() / 1000.0
    }

    #[test]
    fn test_calc_psychrometric_constant() {
        // Allen et al. (1998), table 2.2
        assert_eq!(round3(calc_psychrometric_constant(101.3, 2.8e-4, 0.678, 0.622)), 0.067);
        assert_eq!(round3(calc_psychrometric_constant(81.8, 2.8e-4, 0.678, 0.622)), 0.054);
    }

    #[test]
    fn test_calc_saturated_air_vapor_pressure() {
        // Allen et al. (1998), table 2.3
        assert_eq!(round3(calc_saturated_air_vapor_pressure(1.0)), 0.657);
        assert_eq!(round3(calc_saturated_air_vapor_pressure(20.0)), 2.338);
    }

    #[test]
    fn test_calc_vapor_pressure_slope() {
        // Allen et al. (1998), table 2.4
        assert_eq!(round3(calc_vapor_pressure_slope(1.0)), 0.047);
        assert_eq!(round3(calc_vapor_pressure_slope(10.0)), 0.082);
        assert_eq!(round3(calc_vapor_pressure_slope(20.0)), 0.145);
        assert_eq!(round3(calc_vapor_pressure_slope(30.0)), 0.243);
    }

    #[test]
    fn test_calc_vapor_pressure_deficit() {
        assert_eq!(calc_vapor_pressure_deficit(25.0, 25.0, 100.0), 0.0);
        assert!(calc_vapor_pressure_deficit(25.0, 25.0, 50.0) > 0.0);

        let deficits: Vec<FloatValue> = (0..=10)
            .map(|i| calc_vapor_pressure_deficit(25.0, 15.0 + i as FloatValue, 50.0))
            .collect();
        assert!(follows_trend(&deficits, Trend::Increasing));
    }

    #[test]
    fn test_calc_atmospheric_emissivity() {
        for model in [
            AtmosphericEmissivityModel::Brutsaert1975,
            AtmosphericEmissivityModel::Brunt1932,
        ] {
            let with_vapor_pressure: Vec<FloatValue> = (1..=20)
                .map(|i| calc_atmospheric_emissivity(model, 0.2 * i as FloatValue, 298.15))
                .collect();
            assert!(follows_trend(&with_vapor_pressure, Trend::Increasing));

            let with_temperature: Vec<FloatValue> = (0..=20)
                .map(|i| calc_atmospheric_emissivity(model, 2.0, 273.15 + 2.0 * i as FloatValue))
                .collect();
            assert!(follows_trend(&with_temperature, Trend::Decreasing));

            assert!(with_vapor_pressure.iter().all(|e| *e > 0.0 && *e < 1.0));
        }
    }
}
