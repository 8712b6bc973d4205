//! Geometry and stomatal response shared by every leaf layer component

use ceb_core::canopy::CanopyContext;
use ceb_core::errors::CropEnergyBalanceResult;
use ceb_core::irradiance::{calc_absorbed_irradiance_at_given_depth, calc_leaf_fraction, LeafShading};
use ceb_core::leaf::calc_stomatal_conductance;
use ceb_core::utils::{convert_kelvin_to_celsius, sublayer_midpoints};
use ceb_core::weather::calc_vapor_pressure_deficit;
use ceb_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Floor applied to leaf layer conductances before they are inverted ($\text{m h}^{-1}$).
pub const MINIMUM_CONDUCTANCE: FloatValue = 1.0e-6;

/// Position of a leaf layer inside the canopy.
///
/// Cumulative leaf area indices are counted downwards from the top of the canopy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafLayer {
    pub index: i32,
    pub leaf_area_index: FloatValue,
    pub upper_cumulative_leaf_area_index: FloatValue,
    pub lower_cumulative_leaf_area_index: FloatValue,
}

/// Inverse of a conductance, floored at [`MINIMUM_CONDUCTANCE`].
pub fn calc_resistance(conductance: FloatValue) -> FloatValue {
    1.0 / conductance.max(MINIMUM_CONDUCTANCE)
}

/// Bulk surface conductance of the `shading` leaves of a layer ($\text{m h}^{-1}$).
///
/// Leaf stomatal conductance is integrated over `sublayers_number` sublayers using the
/// irradiance absorbed at the middle of each of them, weighted by the fraction of `shading`
/// leaves found there.
pub fn calc_leaf_layer_surface_conductance_to_vapor(
    shading: LeafShading,
    layer: &LeafLayer,
    context: &CanopyContext,
    stomatal_sensibility: FloatValue,
) -> FloatValue {
    let simulation = &context.params.simulation;
    let coefficients = &context.state.extinction_coefficients;
    let incident = &context.inputs.incident_photosynthetically_active_radiation;
    let (midpoints, thickness) = sublayer_midpoints(
        layer.upper_cumulative_leaf_area_index,
        layer.lower_cumulative_leaf_area_index,
        context.params.numerical_resolution.sublayers_number,
    );

    midpoints
        .mapv(|depth| {
            let absorbed_irradiance =
                calc_absorbed_irradiance_at_given_depth(shading, incident, depth, coefficients);
            calc_stomatal_conductance(
                simulation.residual_stomatal_conductance,
                simulation.maximum_stomatal_conductance,
                absorbed_irradiance,
                simulation.absorbed_par_50,
                stomatal_sensibility,
            ) * calc_leaf_fraction(shading, depth, coefficients.direct_black)
        })
        .sum()
        * thickness
}

/// Stomatal sensibility to water status of leaves at `leaf_temperature` (K).
pub fn calc_stomatal_sensibility(
    context: &CanopyContext,
    leaf_temperature: FloatValue,
) -> CropEnergyBalanceResult<FloatValue> {
    let absolute_zero = context.params.constants.absolute_zero;
    let vapor_pressure_deficit = calc_vapor_pressure_deficit(
        context.inputs.air_temperature,
        convert_kelvin_to_celsius(leaf_temperature, absolute_zero),
        context.inputs.relative_humidity,
    );
    context
        .params
        .simulation
        .stomatal_sensibility
        .calc(vapor_pressure_deficit, context.inputs.soil_water_potential)
}

/// Wind speed at the top of the canopy in $\text{m s}^{-1}$, as expected by leaf formalisms.
pub fn wind_speed_at_canopy_height_in_meters_per_second(context: &CanopyContext) -> FloatValue {
    context.state.wind_speed_at_canopy_height / 3600.0
}
