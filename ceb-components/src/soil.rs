//! The soil surface beneath the canopy

use ceb_core::aerodynamics::MINIMUM_CANOPY_HEIGHT;
use ceb_core::canopy::CanopyContext;
use ceb_core::component::{calc_boundary_layer_resistance, Component, ComponentFluxes, ComponentKind};
use ceb_core::constants::PRECISION;
use ceb_core::errors::CropEnergyBalanceResult;
use ceb_core::inputs::SOIL_INDEX;
use ceb_core::irradiance::calc_absorbed_irradiance_by_soil;
use ceb_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Eddy diffusivity at the top of the canopy ($\text{m}^2\text{ h}^{-1}$).
pub fn calc_eddy_diffusivity(
    wind_speed: FloatValue,
    canopy_height: FloatValue,
    measurement_height: FloatValue,
    zero_displacement_height: FloatValue,
    roughness_length_for_momentum: FloatValue,
    von_karman: FloatValue,
) -> FloatValue {
    von_karman.powi(2) * wind_speed * (canopy_height - zero_displacement_height)
        / ((measurement_height - zero_displacement_height) / roughness_length_for_momentum).ln()
}

/// Soil boundary resistance under forced convection ($\text{h m}^{-1}$).
///
/// Choudhury and Monteith (1988), Quarterly Journal of the Royal Meteorological Society 114, 373-398.
pub fn calc_forced_convection_resistance(
    canopy_height: FloatValue,
    eddy_diffusivity: FloatValue,
    zero_displacement_height: FloatValue,
    roughness_length_for_momentum: FloatValue,
    soil_roughness_length_for_momentum: FloatValue,
    shape_parameter: FloatValue,
) -> FloatValue {
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    let scaling_factor = (-shape_parameter * soil_roughness_length_for_momentum / canopy_height)
        .exp()
        - (-shape_parameter * (zero_displacement_height + roughness_length_for_momentum)
            / canopy_height)
            .exp();
    canopy_height * shape_parameter.exp() / (shape_parameter * eddy_diffusivity.max(PRECISION))
        * scaling_factor
}

/// Soil boundary resistance under free convection ($\text{h m}^{-1}$), driven by the difference
/// between soil and source temperatures.
pub fn calc_free_convection_resistance(
    soil_temperature: FloatValue,
    source_temperature: FloatValue,
    shape_parameter: FloatValue,
    air_volumetric_heat_capacity: FloatValue,
) -> FloatValue {
    air_volumetric_heat_capacity
        / (shape_parameter
            * (soil_temperature - source_temperature)
                .abs()
                .max(PRECISION)
                .powf(1.0 / 3.0))
}

/// Soil surface resistance to vapor ($\text{h m}^{-1}$).
///
/// Sellers et al. (1992), Journal of Geophysical Research 97, 19033-19059.
pub fn calc_surface_resistance(
    soil_saturation_ratio: FloatValue,
    shape_parameter_1: FloatValue,
    shape_parameter_2: FloatValue,
) -> FloatValue {
    (shape_parameter_1 - shape_parameter_2 * soil_saturation_ratio).exp() / 3600.0
}

/// Heat flux into the soil ($\text{W m}^{-2}$) as a fraction of its net radiation.
pub fn calc_heat_flux(
    net_radiation: FloatValue,
    is_daylight: bool,
    daytime_fraction: FloatValue,
    nighttime_fraction: FloatValue,
) -> FloatValue {
    if is_daylight {
        daytime_fraction * net_radiation
    } else {
        nighttime_fraction * net_radiation
    }
}

/// Net longwave radiation at the soil surface ($\text{W m}^{-2}$).
///
/// Leuning et al. (1995), Plant, Cell and Environment 18, 1183-1200.
pub fn calc_net_longwave_radiation(
    canopy_top_net_longwave_radiation: FloatValue,
    leaf_area_index: FloatValue,
    diffuse_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    canopy_top_net_longwave_radiation * (-diffuse_black_extinction_coefficient * leaf_area_index).exp()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Soil {
    fluxes: ComponentFluxes,
}

impl Soil {
    pub fn new() -> Self {
        Self::default()
    }
}

#[typetag::serde]
impl Component for Soil {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Soil
    }

    fn index(&self) -> i32 {
        SOIL_INDEX
    }

    fn fluxes(&self) -> &ComponentFluxes {
        &self.fluxes
    }

    fn fluxes_mut(&mut self) -> &mut ComponentFluxes {
        &mut self.fluxes
    }

    fn calc_net_radiation(&self, context: &CanopyContext) -> (FloatValue, FloatValue) {
        let leaf_area_index = context.inputs.total_leaf_area_index();
        let coefficients = &context.state.extinction_coefficients;
        let absorbed_par = calc_absorbed_irradiance_by_soil(
            &context.inputs.incident_photosynthetically_active_radiation,
            leaf_area_index,
            coefficients,
        );
        (
            context.to_shortwave(absorbed_par),
            calc_net_longwave_radiation(
                context.state.net_longwave_radiation,
                leaf_area_index,
                coefficients.diffuse_black,
            ),
        )
    }

    fn update_resistances(&mut self, context: &CanopyContext) -> CropEnergyBalanceResult<()> {
        let inputs = context.inputs;
        let state = context.state;
        let simulation = &context.params.simulation;
        let constants = &context.params.constants;

        let eddy_diffusivity = calc_eddy_diffusivity(
            inputs.bounded_wind_speed(),
            inputs.canopy_height.max(MINIMUM_CANOPY_HEIGHT),
            inputs.measurement_height,
            state.zero_displacement_height,
            state.roughness_length_for_momentum,
            constants.von_karman,
        );
        let forced = calc_forced_convection_resistance(
            inputs.canopy_height,
            eddy_diffusivity,
            state.zero_displacement_height,
            state.roughness_length_for_momentum,
            simulation.soil_roughness_length_for_momentum,
            simulation.soil_aerodynamic_resistance_shape_parameter,
        );
        let free = calc_free_convection_resistance(
            self.fluxes.temperature,
            state.source_temperature,
            simulation.free_convection_shape_parameter,
            constants.air_volumetric_heat_capacity(),
        );

        self.fluxes.boundary_resistance = calc_boundary_layer_resistance(forced, free);
        self.fluxes.surface_resistance = calc_surface_resistance(
            inputs.soil_saturation_ratio,
            simulation.soil_resistance_to_vapor_shape_parameter_1,
            simulation.soil_resistance_to_vapor_shape_parameter_2,
        );
        Ok(())
    }

    fn calc_heat_flux(&self, context: &CanopyContext) -> FloatValue {
        let simulation = &context.params.simulation;
        calc_heat_flux(
            self.fluxes.net_radiation,
            context.inputs.is_daylight(),
            simulation.daytime_soil_heat_flux_fraction,
            simulation.nighttime_soil_heat_flux_fraction,
        )
    }
}
