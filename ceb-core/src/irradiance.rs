//! Radiation transfer of photosynthetically active radiation through a uniform canopy
//!
//! Sunlit and shaded leaves are treated following de Pury and Farquhar (1997),
//! Plant, Cell and Environment 20, 537-557. Cumulative leaf area indices are counted
//! downwards from the top of the canopy.

use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Smallest solar inclination (rad) used when deriving extinction coefficients.
///
/// Keeps the direct extinction coefficient finite when the sun is at or below the horizon.
pub const MINIMUM_SOLAR_INCLINATION: FloatValue = 0.01;

/// Angular distribution of the diffuse irradiance over the sky vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkyType {
    /// Standard overcast sky, brighter at the zenith.
    #[default]
    Soc,
    /// Uniform overcast sky.
    Uoc,
}

/// Which leaves of a layer a quantity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafShading {
    /// All the leaves of the layer
    Lumped,
    Sunlit,
    Shaded,
}

/// Photosynthetically active irradiance incident at the top of the canopy ($\text{W m}^{-2}$ ground).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IncidentIrradiance {
    pub direct: FloatValue,
    pub diffuse: FloatValue,
}

impl IncidentIrradiance {
    pub fn total(&self) -> FloatValue {
        self.direct + self.diffuse
    }
}

/// Extinction and reflection coefficients of the canopy for a given sun position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtinctionCoefficients {
    /// Extinction coefficient of direct irradiance through black leaves, $k_b'$
    pub direct_black: FloatValue,
    /// Extinction coefficient of direct irradiance, $k_b$
    pub direct: FloatValue,
    /// Extinction coefficient of diffuse irradiance through black leaves, $k_d'$
    pub diffuse_black: FloatValue,
    /// Extinction coefficient of diffuse irradiance, $k_d$
    pub diffuse: FloatValue,
    /// Leaf scattering coefficient, $\sigma$
    pub leaf_scattering_coefficient: FloatValue,
    /// Canopy reflectance to direct irradiance, $\rho_{cb}$
    pub canopy_reflectance_to_direct_irradiance: FloatValue,
    /// Canopy reflectance to diffuse irradiance, $\rho_{cd}$
    pub canopy_reflectance_to_diffuse_irradiance: FloatValue,
}

impl ExtinctionCoefficients {
    /// Derives all coefficients from the sun position and the total leaf area index of the canopy.
    pub fn new(
        solar_inclination: FloatValue,
        leaf_area_index: FloatValue,
        leaf_scattering_coefficient: FloatValue,
        canopy_reflectance_to_diffuse_irradiance: FloatValue,
        leaf_projection: FloatValue,
        sky_sectors_number: usize,
        sky_type: SkyType,
    ) -> Self {
        let direct_black =
            calc_direct_black_extinction_coefficient(solar_inclination, leaf_projection);
        let diffuse_black = calc_diffuse_black_extinction_coefficient(
            leaf_area_index,
            sky_sectors_number,
            sky_type,
            leaf_projection,
        );
        Self {
            direct_black,
            direct: calc_direct_extinction_coefficient(direct_black, leaf_scattering_coefficient),
            diffuse_black,
            diffuse: calc_diffuse_extinction_coefficient(
                diffuse_black,
                leaf_scattering_coefficient,
            ),
            leaf_scattering_coefficient,
            canopy_reflectance_to_direct_irradiance: calc_canopy_reflectance_to_direct_irradiance(
                direct_black,
                leaf_scattering_coefficient,
            ),
            canopy_reflectance_to_diffuse_irradiance,
        }
    }
}

/// Extinction coefficient of direct irradiance through black leaves ($\text{m}^2$ ground $\text{m}^{-2}$ leaf).
///
/// `leaf_projection` is the average projection of leaves on the plane normal to the beam
/// (0.5 for a spherical leaf angle distribution).
pub fn calc_direct_black_extinction_coefficient(
    solar_inclination: FloatValue,
    leaf_projection: FloatValue,
) -> FloatValue {
    leaf_projection / solar_inclination.max(MINIMUM_SOLAR_INCLINATION).sin()
}

pub fn calc_direct_extinction_coefficient(
    direct_black_extinction_coefficient: FloatValue,
    leaf_scattering_coefficient: FloatValue,
) -> FloatValue {
    direct_black_extinction_coefficient * (1.0 - leaf_scattering_coefficient).sqrt()
}

/// Extinction coefficient of diffuse irradiance through black leaves.
///
/// The sky vault is split into `sky_sectors_number` sectors of equal angular width, each
/// sector radiating from its central elevation with a weight set by `sky_type`.
pub fn calc_diffuse_black_extinction_coefficient(
    leaf_area_index: FloatValue,
    sky_sectors_number: usize,
    sky_type: SkyType,
    leaf_projection: FloatValue,
) -> FloatValue {
    let sky_sectors_number = sky_sectors_number.max(1);
    let sector_width = FRAC_PI_2 / sky_sectors_number as FloatValue;

    let sectors: Vec<(FloatValue, FloatValue)> = (0..sky_sectors_number)
        .map(|i| {
            let elevation = (i as FloatValue + 0.5) * sector_width;
            let weight = match sky_type {
                SkyType::Soc => (1.0 + 2.0 * elevation.sin()) * elevation.sin() * elevation.cos(),
                SkyType::Uoc => elevation.sin() * elevation.cos(),
            };
            let extinction = calc_direct_black_extinction_coefficient(elevation, leaf_projection);
            (weight, extinction)
        })
        .collect();
    let total_weight: FloatValue = sectors.iter().map(|(w, _)| w).sum();

    if leaf_area_index <= 0.0 {
        return sectors.iter().map(|(w, k)| w * k).sum::<FloatValue>() / total_weight;
    }

    let transmitted: FloatValue = sectors
        .iter()
        .map(|(w, k)| w / total_weight * (-k * leaf_area_index).exp())
        .sum();
    -transmitted.ln() / leaf_area_index
}

pub fn calc_diffuse_extinction_coefficient(
    diffuse_black_extinction_coefficient: FloatValue,
    leaf_scattering_coefficient: FloatValue,
) -> FloatValue {
    diffuse_black_extinction_coefficient * (1.0 - leaf_scattering_coefficient).sqrt()
}

/// Canopy reflectance to direct irradiance for a spherical leaf angle distribution.
pub fn calc_canopy_reflectance_to_direct_irradiance(
    direct_black_extinction_coefficient: FloatValue,
    leaf_scattering_coefficient: FloatValue,
) -> FloatValue {
    let horizontal_leaves_reflectance = (1.0 - (1.0 - leaf_scattering_coefficient).sqrt())
        / (1.0 + (1.0 - leaf_scattering_coefficient).sqrt());
    1.0 - (-2.0 * horizontal_leaves_reflectance * direct_black_extinction_coefficient
        / (1.0 + direct_black_extinction_coefficient))
        .exp()
}

/// Fraction of sunlit leaves at a given depth.
pub fn calc_sunlit_fraction(
    cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    (-direct_black_extinction_coefficient * cumulative_leaf_area_index).exp()
}

pub fn calc_shaded_fraction(
    cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    1.0 - calc_sunlit_fraction(cumulative_leaf_area_index, direct_black_extinction_coefficient)
}

/// Fraction of `shading` leaves at a given depth (1 for lumped leaves).
pub fn calc_leaf_fraction(
    shading: LeafShading,
    cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    match shading {
        LeafShading::Lumped => 1.0,
        LeafShading::Sunlit => {
            calc_sunlit_fraction(cumulative_leaf_area_index, direct_black_extinction_coefficient)
        }
        LeafShading::Shaded => {
            calc_shaded_fraction(cumulative_leaf_area_index, direct_black_extinction_coefficient)
        }
    }
}

/// Direct irradiance absorbed by sunlit leaves, per unit leaf area (depth-independent).
pub fn calc_absorbed_direct_irradiance(
    incident_direct_irradiance: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    incident_direct_irradiance
        * (1.0 - coefficients.leaf_scattering_coefficient)
        * coefficients.direct_black
}

/// Diffuse irradiance absorbed at a given depth, per unit leaf area.
pub fn calc_absorbed_diffuse_irradiance_at_given_depth(
    incident_diffuse_irradiance: FloatValue,
    cumulative_leaf_area_index: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    incident_diffuse_irradiance
        * (1.0 - coefficients.canopy_reflectance_to_diffuse_irradiance)
        * coefficients.diffuse
        * (-coefficients.diffuse * cumulative_leaf_area_index).exp()
}

/// Scattered component of the direct beam absorbed at a given depth, per unit leaf area.
pub fn calc_absorbed_scattered_irradiance_at_given_depth(
    incident_direct_irradiance: FloatValue,
    cumulative_leaf_area_index: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    incident_direct_irradiance
        * ((1.0 - coefficients.canopy_reflectance_to_direct_irradiance)
            * coefficients.direct
            * (-coefficients.direct * cumulative_leaf_area_index).exp()
            - (1.0 - coefficients.leaf_scattering_coefficient)
                * coefficients.direct_black
                * (-coefficients.direct_black * cumulative_leaf_area_index).exp())
}

/// Irradiance absorbed at a given depth per unit leaf area of `shading` leaves.
///
/// Lumped leaves absorb the depth-averaged mix of sunlit and shaded leaves.
pub fn calc_absorbed_irradiance_at_given_depth(
    shading: LeafShading,
    incident_irradiance: &IncidentIrradiance,
    cumulative_leaf_area_index: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    let diffuse = calc_absorbed_diffuse_irradiance_at_given_depth(
        incident_irradiance.diffuse,
        cumulative_leaf_area_index,
        coefficients,
    );
    let scattered = calc_absorbed_scattered_irradiance_at_given_depth(
        incident_irradiance.direct,
        cumulative_leaf_area_index,
        coefficients,
    );
    match shading {
        LeafShading::Sunlit => {
            calc_absorbed_direct_irradiance(incident_irradiance.direct, coefficients)
                + diffuse
                + scattered
        }
        LeafShading::Shaded => diffuse + scattered,
        LeafShading::Lumped => {
            incident_irradiance.direct
                * (1.0 - coefficients.canopy_reflectance_to_direct_irradiance)
                * coefficients.direct
                * (-coefficients.direct * cumulative_leaf_area_index).exp()
                + diffuse
        }
    }
}

/// Difference `exp(-k L1) - exp(-k L2)`.
fn attenuation(
    extinction_coefficient: FloatValue,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
) -> FloatValue {
    (-extinction_coefficient * upper_cumulative_leaf_area_index).exp()
        - (-extinction_coefficient * lower_cumulative_leaf_area_index).exp()
}

/// Irradiance absorbed by the leaves of the layer lying between two cumulative leaf area
/// indices ($\text{W m}^{-2}$ ground).
pub fn calc_absorbed_irradiance_by_leaf_layer(
    shading: LeafShading,
    incident_irradiance: &IncidentIrradiance,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    let (l1, l2) = (
        upper_cumulative_leaf_area_index,
        lower_cumulative_leaf_area_index,
    );
    let c = coefficients;
    let lumped = || {
        incident_irradiance.direct
            * (1.0 - c.canopy_reflectance_to_direct_irradiance)
            * attenuation(c.direct, l1, l2)
            + incident_irradiance.diffuse
                * (1.0 - c.canopy_reflectance_to_diffuse_irradiance)
                * attenuation(c.diffuse, l1, l2)
    };
    let sunlit = || {
        let direct = incident_irradiance.direct
            * (1.0 - c.leaf_scattering_coefficient)
            * attenuation(c.direct_black, l1, l2);
        let diffuse = incident_irradiance.diffuse
            * (1.0 - c.canopy_reflectance_to_diffuse_irradiance)
            * c.diffuse
            / (c.diffuse + c.direct_black)
            * attenuation(c.diffuse + c.direct_black, l1, l2);
        let scattered = incident_irradiance.direct
            * ((1.0 - c.canopy_reflectance_to_direct_irradiance) * c.direct
                / (c.direct + c.direct_black)
                * attenuation(c.direct + c.direct_black, l1, l2)
                - (1.0 - c.leaf_scattering_coefficient) / 2.0
                    * attenuation(2.0 * c.direct_black, l1, l2));
        direct + diffuse + scattered
    };
    match shading {
        LeafShading::Lumped => lumped(),
        LeafShading::Sunlit => sunlit(),
        LeafShading::Shaded => lumped() - sunlit(),
    }
}

/// Irradiance reaching the soil below a canopy of total `leaf_area_index` ($\text{W m}^{-2}$ ground).
pub fn calc_absorbed_irradiance_by_soil(
    incident_irradiance: &IncidentIrradiance,
    leaf_area_index: FloatValue,
    coefficients: &ExtinctionCoefficients,
) -> FloatValue {
    incident_irradiance.direct
        * (1.0 - coefficients.canopy_reflectance_to_direct_irradiance)
        * (-coefficients.direct * leaf_area_index).exp()
        + incident_irradiance.diffuse
            * (1.0 - coefficients.canopy_reflectance_to_diffuse_irradiance)
            * (-coefficients.diffuse * leaf_area_index).exp()
}
