//! Physical constants
//!
//! All constants are expressed with the hour as time unit, so that
//! resistances come out in $\text{h m}^{-1}$ and conductances in $\text{m h}^{-1}$.

use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Floor applied to resistances before they are inverted.
pub const PRECISION: FloatValue = 1.0e-6;

/// Physical constants used throughout the energy balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    /// Gravitational acceleration ($\text{m h}^{-2}$).
    pub gravitational_acceleration: FloatValue,
    /// von Karman constant (dimensionless).
    pub von_karman: FloatValue,
    /// Stefan-Boltzmann constant ($\text{W m}^{-2}\text{ K}^{-4}$).
    pub stefan_boltzmann: FloatValue,
    /// Temperature at absolute zero (°C).
    pub absolute_zero: FloatValue,
    /// Latent heat for vaporization ($\text{W h g}^{-1}$).
    pub latent_heat_for_vaporization: FloatValue,
    /// Psychrometric constant at sea level ($\text{kPa K}^{-1}$).
    pub psychrometric_constant: FloatValue,
    /// Specific heat capacity of the air under a constant pressure ($\text{W h g}^{-1}\text{ K}^{-1}$).
    ///
    /// Allen et al. (1998), FAO Irrigation and Drainage Paper No. 56, Eq. 8.
    pub air_specific_heat_capacity: FloatValue,
    /// Ratio of the molecular weights of water vapor to dry air (dimensionless).
    pub vapor_to_dry_air_molecular_weight: FloatValue,
    /// Dry air density ($\text{g m}^{-3}$).
    pub air_density: FloatValue,
    /// Fraction of global radiation carried by the photosynthetically active band.
    pub par_fraction_of_global_radiation: FloatValue,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            gravitational_acceleration: 9.81 * 3600.0_f64.powi(2),
            von_karman: 0.41,
            stefan_boltzmann: 5.67e-8,
            absolute_zero: -273.15,
            latent_heat_for_vaporization: 0.678,
            psychrometric_constant: 0.066,
            air_specific_heat_capacity: 2.8e-4,
            vapor_to_dry_air_molecular_weight: 0.622,
            air_density: 1185.0,
            par_fraction_of_global_radiation: 0.48,
        }
    }
}

impl Constants {
    /// Volumetric heat capacity of the air, $\rho c_p$ ($\text{W h m}^{-3}\text{ K}^{-1}$).
    pub fn air_volumetric_heat_capacity(&self) -> FloatValue {
        self.air_density * self.air_specific_heat_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravitational_acceleration_in_hours() {
        let constants = Constants::default();
        assert!((constants.gravitational_acceleration - 1.271376e8).abs() < 1.0);
    }

    #[test]
    fn test_air_volumetric_heat_capacity() {
        let constants = Constants::default();
        assert!((constants.air_volumetric_heat_capacity() - 0.3318).abs() < 1e-10);
    }
}
