//! Canopy-level formalisms
//!
//! Turbulent transfer between the mean canopy source height and the reference (measurement)
//! height, plus the canopy-scale terms of the Penman-Monteith equation. Heights are in m,
//! wind speeds in $\text{m h}^{-1}$ and resistances in $\text{h m}^{-1}$.

use crate::constants::PRECISION;
use crate::FloatValue;
use std::f64::consts::FRAC_PI_2;

/// Lowest canopy height (m) used when extrapolating the wind profile.
pub const MINIMUM_CANOPY_HEIGHT: FloatValue = 0.1;

/// Richardson number above which the atmosphere is considered too stable for the
/// stability correction functions to apply.
pub const RICHARDSON_NUMBER_UPPER_LIMIT: FloatValue = 0.2;

/// Zero displacement height (m).
///
/// Choudhury and Monteith (1988), Quarterly Journal of the Royal Meteorological Society 114, 373-398.
pub fn calc_zero_displacement_height(
    canopy_height: FloatValue,
    leaf_area_index: FloatValue,
    drag_coefficient: FloatValue,
) -> FloatValue {
    let x = drag_coefficient * leaf_area_index;
    1.1 * canopy_height * (1.0 + x.powf(0.25)).ln()
}

/// Canopy roughness length for momentum transfer (m).
///
/// Choudhury and Monteith (1988). Not monotonic with leaf area index.
pub fn calc_roughness_length_for_momentum_transfer(
    soil_roughness_length_for_momentum: FloatValue,
    zero_displacement_height: FloatValue,
    canopy_height: FloatValue,
    leaf_area_index: FloatValue,
    drag_coefficient: FloatValue,
) -> FloatValue {
    let x = drag_coefficient * leaf_area_index;
    if x < 0.2 {
        soil_roughness_length_for_momentum + 0.3 * canopy_height * x.sqrt()
    } else {
        0.3 * canopy_height * (1.0 - zero_displacement_height / canopy_height)
    }
}

/// Canopy roughness length for heat transfer (m).
pub fn calc_roughness_length_for_heat_transfer(
    roughness_length_for_momentum: FloatValue,
    heat_to_momentum_ratio: FloatValue,
) -> FloatValue {
    heat_to_momentum_ratio * roughness_length_for_momentum
}

/// Wind speed at the top of the canopy, from a logarithmic profile fitted to the wind speed
/// measured at `measurement_height`.
pub fn calc_wind_speed_at_canopy_height(
    wind_speed: FloatValue,
    canopy_height: FloatValue,
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    roughness_length_for_momentum: FloatValue,
) -> FloatValue {
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    let wind_speed_at_canopy_height = wind_speed
        * ((canopy_height - zero_displacement_height) / roughness_length_for_momentum).ln()
        / ((measurement_height - zero_displacement_height) / roughness_length_for_momentum).ln();
    // `max` also discards the NaN of a displacement height above the canopy
    wind_speed_at_canopy_height.max(PRECISION)
}

/// Friction velocity ($\text{m h}^{-1}$).
pub fn calc_friction_velocity(
    wind_speed: FloatValue,
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    roughness_length_for_momentum: FloatValue,
    stability_correction_for_momentum: FloatValue,
    von_karman: FloatValue,
) -> FloatValue {
    von_karman * wind_speed
        / (((measurement_height - zero_displacement_height) / roughness_length_for_momentum).ln()
            - stability_correction_for_momentum)
}

/// Monin-Obukhov length (m).
///
/// Infinite under neutral conditions (no sensible heat) and zero without friction.
pub fn calc_monin_obukhov_length(
    surface_temperature: FloatValue,
    friction_velocity: FloatValue,
    sensible_heat: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
    von_karman: FloatValue,
    gravitational_acceleration: FloatValue,
) -> FloatValue {
    if friction_velocity == 0.0 {
        return 0.0;
    }
    if sensible_heat == 0.0 {
        return FloatValue::INFINITY;
    }
    -air_volumetric_heat_capacity * surface_temperature * friction_velocity.powi(3)
        / (von_karman * gravitational_acceleration * sensible_heat)
}

/// Dimensionless height $\zeta = (z_r - d) / L$.
pub fn calc_stability_parameter(
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    monin_obukhov_length: FloatValue,
) -> FloatValue {
    let height = measurement_height - zero_displacement_height;
    if height == 0.0 || monin_obukhov_length.is_infinite() {
        0.0
    } else if monin_obukhov_length == 0.0 {
        FloatValue::NEG_INFINITY
    } else {
        height / monin_obukhov_length
    }
}

/// Richardson number, approximated from the Monin-Obukhov length.
pub fn calc_richardson_number(
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    monin_obukhov_length: FloatValue,
) -> FloatValue {
    let zeta = calc_stability_parameter(
        measurement_height,
        zero_displacement_height,
        monin_obukhov_length,
    );
    if zeta < 0.0 {
        zeta
    } else {
        zeta / (1.0 + 5.0 * zeta)
    }
}

/// Stability correction functions for momentum and heat, $(\psi_m, \psi_h)$.
///
/// Paulson (1970) under unstable conditions, Webb (1970) under stable conditions. Both vanish
/// under free convection (`richardson_number <= free_convection_richardson_number`) and under
/// strongly stable conditions.
pub fn calc_stability_correction_functions(
    stability_parameter: FloatValue,
    richardson_number: FloatValue,
    free_convection_richardson_number: FloatValue,
) -> (FloatValue, FloatValue) {
    if richardson_number <= free_convection_richardson_number
        || richardson_number >= RICHARDSON_NUMBER_UPPER_LIMIT
    {
        (0.0, 0.0)
    } else if stability_parameter < 0.0 {
        let x = (1.0 - 16.0 * stability_parameter).powf(0.25);
        let for_momentum = 2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x.powi(2)) / 2.0).ln()
            - 2.0 * x.atan()
            + FRAC_PI_2;
        let for_heat = 2.0 * ((1.0 + x.powi(2)) / 2.0).ln();
        (for_momentum, for_heat)
    } else {
        (-5.0 * stability_parameter, -5.0 * stability_parameter)
    }
}

/// Aerodynamic resistance between the source height and the measurement height ($\text{h m}^{-1}$).
///
/// Under free convection the resistance only depends on the temperature difference between the
/// source height and the air.
#[allow(clippy::too_many_arguments)]
pub fn calc_aerodynamic_resistance(
    richardson_number: FloatValue,
    friction_velocity: FloatValue,
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    roughness_length_for_heat_transfer: FloatValue,
    stability_correction_for_heat: FloatValue,
    source_to_air_temperature_difference: FloatValue,
    free_convection_richardson_number: FloatValue,
    free_convection_shape_parameter: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
    von_karman: FloatValue,
) -> FloatValue {
    if richardson_number <= free_convection_richardson_number {
        air_volumetric_heat_capacity
            / (free_convection_shape_parameter
                * source_to_air_temperature_difference
                    .abs()
                    .max(PRECISION)
                    .powf(1.0 / 3.0))
    } else {
        (((measurement_height - zero_displacement_height) / roughness_length_for_heat_transfer)
            .ln()
            - stability_correction_for_heat)
            / (von_karman * friction_velocity)
    }
}

/// Net longwave radiation above the canopy ($\text{W m}^{-2}$), negative for a loss.
pub fn calc_net_longwave_radiation(
    air_temperature: FloatValue,
    atmospheric_emissivity: FloatValue,
    stefan_boltzmann: FloatValue,
) -> FloatValue {
    -(1.0 - atmospheric_emissivity) * stefan_boltzmann * air_temperature.powi(4)
}

/// Sensible heat flux between the source height and the air ($\text{W m}^{-2}$).
pub fn calc_sensible_heat_flux(
    source_temperature: FloatValue,
    air_temperature: FloatValue,
    aerodynamic_resistance: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
) -> FloatValue {
    air_volumetric_heat_capacity * (source_temperature - air_temperature) / aerodynamic_resistance
}

/// Penman evaporative energy of the canopy ($\text{W m}^{-2}$).
pub fn calc_penman_evaporative_energy(
    aerodynamic_resistance: FloatValue,
    available_energy: FloatValue,
    vapor_pressure_deficit: FloatValue,
    vapor_pressure_slope: FloatValue,
    psychrometric_constant: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
) -> FloatValue {
    (vapor_pressure_slope * available_energy
        + air_volumetric_heat_capacity * vapor_pressure_deficit / aerodynamic_resistance)
        / (vapor_pressure_slope + psychrometric_constant)
}

/// Lumped aerodynamic resistance $R_0$ ($\text{h m}^{-1}$).
pub fn calc_lumped_aerodynamic_resistance(
    aerodynamic_resistance: FloatValue,
    vapor_pressure_slope: FloatValue,
    psychrometric_constant: FloatValue,
) -> FloatValue {
    (1.0 + vapor_pressure_slope / psychrometric_constant) * aerodynamic_resistance
}

/// Penman-Monteith evaporative energy of the whole canopy ($\text{W m}^{-2}$).
///
/// Lhomme et al. (2013), Eq. 12. `composed_terms` holds, per component, the composed conductance
/// $P_i$, the available energy $A_i$ and the boundary resistance $r_i$.
pub fn calc_penman_monteith_evaporative_energy(
    lumped_aerodynamic_resistance: FloatValue,
    penman_evaporative_energy: FloatValue,
    composed_terms: &[(FloatValue, FloatValue, FloatValue)],
    vapor_pressure_slope: FloatValue,
    psychrometric_constant: FloatValue,
) -> FloatValue {
    let sum_conductances: FloatValue = composed_terms.iter().map(|(p, _, _)| p).sum();
    let sum_weighted_energy: FloatValue = composed_terms.iter().map(|(p, a, r)| p * a * r).sum();
    lumped_aerodynamic_resistance * penman_evaporative_energy * sum_conductances
        + vapor_pressure_slope / psychrometric_constant * sum_weighted_energy
}

/// Air temperature at the mean canopy source height (K).
pub fn calc_source_temperature(
    air_temperature: FloatValue,
    aerodynamic_resistance: FloatValue,
    available_energy: FloatValue,
    evaporative_energy: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
) -> FloatValue {
    air_temperature
        + aerodynamic_resistance * (available_energy - evaporative_energy)
            / air_volumetric_heat_capacity
}
