//! Numerical helpers and unit conversions.

use crate::FloatValue;
use ndarray::Array1;

/// Calculates the temperature step between two consecutive energy balance iterations.
///
/// Only `step_fraction` of the whole step (`actual_value - previous_value`) is kept, which damps
/// oscillations of the fixed-point iteration.
pub fn calc_temperature_step(
    previous_value: FloatValue,
    actual_value: FloatValue,
    step_fraction: FloatValue,
) -> FloatValue {
    step_fraction * (actual_value - previous_value)
}

/// Midpoints of `sublayers_number` sublayers of equal thickness between two cumulative leaf area indices.
///
/// Returns the midpoints together with the sublayer thickness.
pub fn sublayer_midpoints(
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    sublayers_number: usize,
) -> (Array1<FloatValue>, FloatValue) {
    let sublayers_number = sublayers_number.max(1);
    let thickness = (lower_cumulative_leaf_area_index - upper_cumulative_leaf_area_index)
        / sublayers_number as FloatValue;
    let midpoints = Array1::from_shape_fn(sublayers_number, |i| {
        upper_cumulative_leaf_area_index + (i as FloatValue + 0.5) * thickness
    });
    (midpoints, thickness)
}

/// 1 for amphistomatal leaves (stomata on both sides of the blade), otherwise 2.
pub fn calc_stomatal_density_factor(amphistomatal_leaf: bool) -> u8 {
    if amphistomatal_leaf {
        1
    } else {
        2
    }
}

pub fn convert_celsius_to_kelvin(temperature: FloatValue, absolute_zero: FloatValue) -> FloatValue {
    temperature - absolute_zero
}

pub fn convert_kelvin_to_celsius(temperature: FloatValue, absolute_zero: FloatValue) -> FloatValue {
    temperature + absolute_zero
}

/// Converts photosynthetically active radiation into global radiation.
pub fn convert_photosynthetically_active_radiation_into_global_radiation(
    value: FloatValue,
    par_fraction: FloatValue,
) -> FloatValue {
    value / par_fraction
}
