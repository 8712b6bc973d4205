//! Leaf layers split into sunlit and shaded leaves
//!
//! Shaded quantities are obtained as the difference between the lumped layer and its sunlit
//! leaves.

use crate::leaf_layer::{
    calc_leaf_layer_surface_conductance_to_vapor, calc_resistance, calc_stomatal_sensibility,
    wind_speed_at_canopy_height_in_meters_per_second, LeafLayer,
};
use crate::lumped_leaves::{layer_boundary_conductance, layer_net_longwave_radiation};
use ceb_core::canopy::CanopyContext;
use ceb_core::component::{Component, ComponentFluxes, ComponentKind};
use ceb_core::errors::CropEnergyBalanceResult;
use ceb_core::irradiance::{calc_absorbed_irradiance_by_leaf_layer, LeafShading};
use ceb_core::leaf::calc_leaf_boundary_conductance;
use ceb_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Bulk boundary layer conductance of the sunlit leaves of a layer ($\text{m h}^{-1}$).
pub fn calc_sunlit_leaf_layer_boundary_conductance(
    wind_speed_at_canopy_height: FloatValue,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
    wind_speed_extinction_coefficient: FloatValue,
    characteristic_length: FloatValue,
    shape_parameter: FloatValue,
) -> FloatValue {
    let leaf_boundary_conductance = calc_leaf_boundary_conductance(
        wind_speed_at_canopy_height,
        characteristic_length,
        shape_parameter,
    );
    let extinction_coefficient =
        0.5 * wind_speed_extinction_coefficient + direct_black_extinction_coefficient;
    let scaling_factor = ((-extinction_coefficient * upper_cumulative_leaf_area_index).exp()
        - (-extinction_coefficient * lower_cumulative_leaf_area_index).exp())
        / extinction_coefficient;
    leaf_boundary_conductance * scaling_factor
}

/// Mean fraction of sunlit leaves over a layer.
pub fn calc_sunlit_leaf_fraction(
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    let thickness = lower_cumulative_leaf_area_index - upper_cumulative_leaf_area_index;
    if thickness <= 0.0 {
        return (-direct_black_extinction_coefficient * upper_cumulative_leaf_area_index).exp();
    }
    ((-direct_black_extinction_coefficient * upper_cumulative_leaf_area_index).exp()
        - (-direct_black_extinction_coefficient * lower_cumulative_leaf_area_index).exp())
        / (direct_black_extinction_coefficient * thickness)
}

/// Mean fraction of `shading` leaves over a layer.
pub fn calc_leaf_layer_fraction(
    shading: LeafShading,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    let sunlit = calc_sunlit_leaf_fraction(
        upper_cumulative_leaf_area_index,
        lower_cumulative_leaf_area_index,
        direct_black_extinction_coefficient,
    );
    match shading {
        LeafShading::Lumped => 1.0,
        LeafShading::Sunlit => sunlit,
        LeafShading::Shaded => 1.0 - sunlit,
    }
}

/// Net longwave radiation of the sunlit leaves of a layer ($\text{W m}^{-2}$ ground).
pub fn calc_sunlit_leaf_layer_net_longwave_radiation(
    canopy_top_net_longwave_radiation: FloatValue,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    direct_black_extinction_coefficient: FloatValue,
    diffuse_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    let extinction_coefficient =
        diffuse_black_extinction_coefficient + direct_black_extinction_coefficient;
    canopy_top_net_longwave_radiation * diffuse_black_extinction_coefficient
        / extinction_coefficient
        * ((-extinction_coefficient * upper_cumulative_leaf_area_index).exp()
            - (-extinction_coefficient * lower_cumulative_leaf_area_index).exp())
}

/// The sunlit or the shaded leaves of a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunlitShadedLeaves {
    shading: LeafShading,
    layer: LeafLayer,
    leaf_fraction: FloatValue,
    stomatal_density_factor: FloatValue,
    fluxes: ComponentFluxes,
}

impl SunlitShadedLeaves {
    /// The sunlit leaves of `layer`, given the sun position through the extinction coefficient
    /// of direct irradiance by black leaves.
    pub fn sunlit(
        layer: LeafLayer,
        direct_black_extinction_coefficient: FloatValue,
        stomatal_density_factor: FloatValue,
    ) -> Self {
        Self::new(
            LeafShading::Sunlit,
            layer,
            direct_black_extinction_coefficient,
            stomatal_density_factor,
        )
    }

    pub fn shaded(
        layer: LeafLayer,
        direct_black_extinction_coefficient: FloatValue,
        stomatal_density_factor: FloatValue,
    ) -> Self {
        Self::new(
            LeafShading::Shaded,
            layer,
            direct_black_extinction_coefficient,
            stomatal_density_factor,
        )
    }

    fn new(
        shading: LeafShading,
        layer: LeafLayer,
        direct_black_extinction_coefficient: FloatValue,
        stomatal_density_factor: FloatValue,
    ) -> Self {
        Self {
            shading,
            layer,
            leaf_fraction: calc_leaf_layer_fraction(
                shading,
                layer.upper_cumulative_leaf_area_index,
                layer.lower_cumulative_leaf_area_index,
                direct_black_extinction_coefficient,
            ),
            stomatal_density_factor,
            fluxes: ComponentFluxes::default(),
        }
    }

    pub fn shading(&self) -> LeafShading {
        self.shading
    }

    fn sunlit_boundary_conductance(&self, context: &CanopyContext) -> FloatValue {
        let simulation = &context.params.simulation;
        calc_sunlit_leaf_layer_boundary_conductance(
            wind_speed_at_canopy_height_in_meters_per_second(context),
            self.layer.upper_cumulative_leaf_area_index,
            self.layer.lower_cumulative_leaf_area_index,
            context.state.extinction_coefficients.direct_black,
            simulation.wind_speed_extinction_coefficient,
            simulation.leaf_characteristic_length,
            simulation.leaf_boundary_layer_shape_parameter,
        )
    }

    fn sunlit_net_longwave_radiation(&self, context: &CanopyContext) -> FloatValue {
        let coefficients = &context.state.extinction_coefficients;
        calc_sunlit_leaf_layer_net_longwave_radiation(
            context.state.net_longwave_radiation,
            self.layer.upper_cumulative_leaf_area_index,
            self.layer.lower_cumulative_leaf_area_index,
            coefficients.direct_black,
            coefficients.diffuse_black,
        )
    }
}

#[typetag::serde]
impl Component for SunlitShadedLeaves {
    fn kind(&self) -> ComponentKind {
        match self.shading {
            LeafShading::Shaded => ComponentKind::ShadedLeaves,
            _ => ComponentKind::SunlitLeaves,
        }
    }

    fn index(&self) -> i32 {
        self.layer.index
    }

    /// Leaf area index of the layer times the mean fraction of `shading` leaves
    fn leaf_area_index(&self) -> FloatValue {
        self.layer.leaf_area_index * self.leaf_fraction
    }

    fn fluxes(&self) -> &ComponentFluxes {
        &self.fluxes
    }

    fn fluxes_mut(&mut self) -> &mut ComponentFluxes {
        &mut self.fluxes
    }

    fn stomatal_density_factor(&self) -> FloatValue {
        self.stomatal_density_factor
    }

    fn calc_net_radiation(&self, context: &CanopyContext) -> (FloatValue, FloatValue) {
        let absorbed_par = calc_absorbed_irradiance_by_leaf_layer(
            self.shading,
            &context.inputs.incident_photosynthetically_active_radiation,
            self.layer.upper_cumulative_leaf_area_index,
            self.layer.lower_cumulative_leaf_area_index,
            &context.state.extinction_coefficients,
        );
        let sunlit_longwave = self.sunlit_net_longwave_radiation(context);
        let longwave = match self.shading {
            LeafShading::Shaded => layer_net_longwave_radiation(&self.layer, context) - sunlit_longwave,
            _ => sunlit_longwave,
        };
        (context.to_shortwave(absorbed_par), longwave)
    }

    fn update_resistances(&mut self, context: &CanopyContext) -> CropEnergyBalanceResult<()> {
        let stomatal_sensibility = calc_stomatal_sensibility(context, self.fluxes.temperature)?;
        let sunlit_boundary_conductance = self.sunlit_boundary_conductance(context);
        let boundary_conductance = match self.shading {
            LeafShading::Shaded => {
                layer_boundary_conductance(&self.layer, context) - sunlit_boundary_conductance
            }
            _ => sunlit_boundary_conductance,
        };
        self.fluxes.boundary_resistance = calc_resistance(boundary_conductance);
        self.fluxes.surface_resistance = calc_resistance(calc_leaf_layer_surface_conductance_to_vapor(
            self.shading,
            &self.layer,
            context,
            stomatal_sensibility,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lumped_leaves::{calc_leaf_layer_boundary_conductance, calc_leaf_layer_net_longwave_radiation};
    use crate::testing::{example_canopy, top_layer};
    use crate::testing::{follows_trend, Trend};
    use is_close::is_close;

    #[test]
    fn test_boundary_conductances_decrease_with_wind_extinction() {
        let sunlit: Vec<FloatValue> = (1..10)
            .map(|i| {
                calc_sunlit_leaf_layer_boundary_conductance(
                    2.0,
                    0.5,
                    1.5,
                    0.7,
                    0.2 * i as FloatValue,
                    0.01,
                    0.01,
                )
            })
            .collect();
        let shaded: Vec<FloatValue> = (1..10)
            .map(|i| {
                let wind_extinction = 0.2 * i as FloatValue;
                calc_leaf_layer_boundary_conductance(2.0, 0.5, 1.5, wind_extinction, 0.01, 0.01)
                    - calc_sunlit_leaf_layer_boundary_conductance(
                        2.0,
                        0.5,
                        1.5,
                        0.7,
                        wind_extinction,
                        0.01,
                        0.01,
                    )
            })
            .collect();
        assert!(follows_trend(&sunlit, Trend::Decreasing));
        assert!(follows_trend(&shaded, Trend::Decreasing));
        assert!(shaded.iter().all(|g| *g > 0.0));
    }

    #[test]
    fn test_leaf_fractions() {
        let sunlit = calc_leaf_layer_fraction(LeafShading::Sunlit, 0.0, 1.0, 0.7);
        let shaded = calc_leaf_layer_fraction(LeafShading::Shaded, 0.0, 1.0, 0.7);
        assert!(is_close!(sunlit + shaded, 1.0));
        assert!(is_close!(sunlit, (1.0 - (-0.7_f64).exp()) / 0.7));
        assert_eq!(calc_leaf_layer_fraction(LeafShading::Lumped, 0.0, 1.0, 0.7), 1.0);
        assert_eq!(calc_sunlit_leaf_fraction(0.0, 0.0, 0.7), 1.0);

        let deeper: Vec<FloatValue> = (0..5)
            .map(|i| calc_sunlit_leaf_fraction(i as FloatValue, i as FloatValue + 1.0, 0.7))
            .collect();
        assert!(follows_trend(&deeper, Trend::Decreasing));
    }

    #[test]
    fn test_sunlit_longwave_is_part_of_the_layer() {
        let lumped = calc_leaf_layer_net_longwave_radiation(-80.0, 0.5, 1.5, 0.8);
        let sunlit = calc_sunlit_leaf_layer_net_longwave_radiation(-80.0, 0.5, 1.5, 0.7, 0.8);
        assert!(sunlit < 0.0);
        assert!(sunlit > lumped);
    }

    #[test]
    fn test_sunlit_and_shaded_components_split_the_layer() {
        let canopy = example_canopy();
        let context = canopy.context();
        let layer = top_layer(&canopy);
        let direct_black = canopy.state.extinction_coefficients.direct_black;

        let mut sunlit = SunlitShadedLeaves::sunlit(layer, direct_black, 1.0);
        let mut shaded = SunlitShadedLeaves::shaded(layer, direct_black, 1.0);
        for leaves in [&mut sunlit, &mut shaded] {
            leaves.initialize(&context, context.air_temperature());
            leaves.update_resistances(&context).unwrap();
        }
        assert_eq!(sunlit.kind(), ComponentKind::SunlitLeaves);
        assert_eq!(shaded.kind(), ComponentKind::ShadedLeaves);

        let mut lumped = crate::lumped_leaves::LumpedLeaves::new(layer, 1.0);
        lumped.initialize(&context, context.air_temperature());

        assert!(is_close!(
            sunlit.fluxes().net_radiation + shaded.fluxes().net_radiation,
            lumped.fluxes().net_radiation
        ));
        assert!(sunlit.fluxes().net_shortwave_radiation > shaded.fluxes().net_shortwave_radiation);
        assert!(shaded.fluxes().boundary_resistance > 0.0);
        assert!(is_close!(
            sunlit.leaf_area_index() + shaded.leaf_area_index(),
            layer.leaf_area_index
        ));
    }
}
