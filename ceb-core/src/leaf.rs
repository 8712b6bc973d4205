//! Leaf-scale formalisms shared by every leaf component

use crate::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Boundary layer conductance of a single leaf, for both sides of the blade ($\text{m h}^{-1}$).
///
/// # Arguments
///
/// * `wind_speed` - local wind speed in the vicinity of the leaf ($\text{m s}^{-1}$)
/// * `characteristic_length` - leaf length in the direction of the wind (m)
/// * `shape_parameter` - empirical shape parameter ($\text{m s}^{-1/2}$)
pub fn calc_leaf_boundary_conductance(
    wind_speed: FloatValue,
    characteristic_length: FloatValue,
    shape_parameter: FloatValue,
) -> FloatValue {
    3600.0 * shape_parameter * (wind_speed.max(0.0) / characteristic_length).sqrt()
}

/// Response of stomata to the water status of the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum StomatalSensibility {
    /// Closure driven by the leaf-to-air vapor pressure deficit.
    ///
    /// Leuning (1995), Plant, Cell and Environment 18, 339-355.
    Leuning {
        /// Empirical shape parameter (kPa)
        d_0: FloatValue,
    },
    /// Closure driven by the soil water potential.
    ///
    /// Tuzet et al. (2003), Plant, Cell and Environment 26, 1097-1116.
    Tuzet {
        /// Sensitivity parameter ($\text{MPa}^{-1}$)
        sensitivity_parameter: FloatValue,
        /// Reference water potential (MPa)
        reference_potential: FloatValue,
    },
    /// Closure driven by the soil water potential.
    ///
    /// Misson et al. (2004), Tree Physiology 24, 529-541.
    Misson {
        /// Water potential at which stomatal conductance is halved (MPa)
        psi_half_aperture: FloatValue,
        steepness: FloatValue,
    },
}

impl Default for StomatalSensibility {
    fn default() -> Self {
        Self::Leuning { d_0: 2.0 }
    }
}

impl StomatalSensibility {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Leuning { .. } => "leuning",
            Self::Tuzet { .. } => "tuzet",
            Self::Misson { .. } => "misson",
        }
    }

    pub fn requires_soil_water_potential(&self) -> bool {
        !matches!(self, Self::Leuning { .. })
    }

    pub fn validate(&self) -> CropEnergyBalanceResult<()> {
        match self {
            Self::Leuning { d_0 } if *d_0 == 0.0 => Err(CropEnergyBalanceError::invalid_parameter(
                "stomatal_sensibility.d_0",
                "the shape parameter must not be zero",
            )),
            Self::Misson {
                psi_half_aperture, ..
            } if *psi_half_aperture == 0.0 => Err(CropEnergyBalanceError::invalid_parameter(
                "stomatal_sensibility.psi_half_aperture",
                "the half-aperture water potential must not be zero",
            )),
            _ => Ok(()),
        }
    }

    /// Fraction of the maximum stomatal conductance left open by the water status, in [0, 1].
    ///
    /// # Arguments
    ///
    /// * `vapor_pressure_deficit` - leaf-to-air vapor pressure deficit (kPa)
    /// * `soil_water_potential` - soil water potential (MPa)
    pub fn calc(
        &self,
        vapor_pressure_deficit: FloatValue,
        soil_water_potential: Option<FloatValue>,
    ) -> CropEnergyBalanceResult<FloatValue> {
        self.validate()?;
        let soil_water_potential = || {
            soil_water_potential.ok_or_else(|| {
                CropEnergyBalanceError::MissingSoilWaterPotential {
                    model: self.name().to_string(),
                }
            })
        };
        let value = match *self {
            Self::Leuning { d_0 } => 1.0 / (1.0 + vapor_pressure_deficit.max(0.0) / d_0),
            Self::Tuzet {
                sensitivity_parameter,
                reference_potential,
            } => {
                let psi = soil_water_potential()?;
                (1.0 + (sensitivity_parameter * reference_potential).exp())
                    / (1.0 + (sensitivity_parameter * (reference_potential - psi)).exp())
            }
            Self::Misson {
                psi_half_aperture,
                steepness,
            } => {
                let psi = soil_water_potential()?;
                1.0 / (1.0 + (psi / psi_half_aperture).max(0.0).powf(steepness))
            }
        };
        Ok(value.clamp(0.0, 1.0))
    }
}

/// Stomatal conductance of a leaf ($\text{m h}^{-1}$) responding to absorbed irradiance.
///
/// # Arguments
///
/// * `residual_stomatal_conductance` - conductance of closed stomata ($\text{m h}^{-1}$)
/// * `maximum_stomatal_conductance` - $\text{m h}^{-1}$
/// * `absorbed_irradiance` - $\text{W m}^{-2}$ leaf
/// * `absorbed_par_50` - absorbed irradiance at which the response is halved ($\text{W m}^{-2}$ leaf)
/// * `stomatal_sensibility` - water status factor in [0, 1]
pub fn calc_stomatal_conductance(
    residual_stomatal_conductance: FloatValue,
    maximum_stomatal_conductance: FloatValue,
    absorbed_irradiance: FloatValue,
    absorbed_par_50: FloatValue,
    stomatal_sensibility: FloatValue,
) -> FloatValue {
    let absorbed_irradiance = absorbed_irradiance.max(0.0);
    residual_stomatal_conductance
        + maximum_stomatal_conductance * stomatal_sensibility * absorbed_irradiance
            / (absorbed_par_50 + absorbed_irradiance)
}
