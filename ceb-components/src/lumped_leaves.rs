//! Leaf layers whose sunlit and shaded leaves are lumped together

use crate::leaf_layer::{
    calc_leaf_layer_surface_conductance_to_vapor, calc_resistance, calc_stomatal_sensibility,
    wind_speed_at_canopy_height_in_meters_per_second, LeafLayer,
};
use ceb_core::canopy::CanopyContext;
use ceb_core::component::{Component, ComponentFluxes, ComponentKind};
use ceb_core::errors::CropEnergyBalanceResult;
use ceb_core::irradiance::{calc_absorbed_irradiance_by_leaf_layer, LeafShading};
use ceb_core::leaf::calc_leaf_boundary_conductance;
use ceb_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Bulk boundary layer conductance of a leaf layer, for both sides of the leaves ($\text{m h}^{-1}$).
///
/// Wind speed decays exponentially inside the canopy, hence the leaf boundary conductance
/// decays with half its extinction coefficient.
pub fn calc_leaf_layer_boundary_conductance(
    wind_speed_at_canopy_height: FloatValue,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    wind_speed_extinction_coefficient: FloatValue,
    characteristic_length: FloatValue,
    shape_parameter: FloatValue,
) -> FloatValue {
    let leaf_boundary_conductance = calc_leaf_boundary_conductance(
        wind_speed_at_canopy_height,
        characteristic_length,
        shape_parameter,
    );
    let scaling_factor = 2.0 / wind_speed_extinction_coefficient
        * ((-0.5 * wind_speed_extinction_coefficient * upper_cumulative_leaf_area_index).exp()
            - (-0.5 * wind_speed_extinction_coefficient * lower_cumulative_leaf_area_index).exp());
    leaf_boundary_conductance * scaling_factor
}

/// Net longwave radiation of a leaf layer ($\text{W m}^{-2}$ ground).
pub fn calc_leaf_layer_net_longwave_radiation(
    canopy_top_net_longwave_radiation: FloatValue,
    upper_cumulative_leaf_area_index: FloatValue,
    lower_cumulative_leaf_area_index: FloatValue,
    diffuse_black_extinction_coefficient: FloatValue,
) -> FloatValue {
    canopy_top_net_longwave_radiation
        * ((-diffuse_black_extinction_coefficient * upper_cumulative_leaf_area_index).exp()
            - (-diffuse_black_extinction_coefficient * lower_cumulative_leaf_area_index).exp())
}

/// Boundary conductance of the layer at the current wind speed.
pub(crate) fn layer_boundary_conductance(layer: &LeafLayer, context: &CanopyContext) -> FloatValue {
    let simulation = &context.params.simulation;
    calc_leaf_layer_boundary_conductance(
        wind_speed_at_canopy_height_in_meters_per_second(context),
        layer.upper_cumulative_leaf_area_index,
        layer.lower_cumulative_leaf_area_index,
        simulation.wind_speed_extinction_coefficient,
        simulation.leaf_characteristic_length,
        simulation.leaf_boundary_layer_shape_parameter,
    )
}

pub(crate) fn layer_net_longwave_radiation(layer: &LeafLayer, context: &CanopyContext) -> FloatValue {
    calc_leaf_layer_net_longwave_radiation(
        context.state.net_longwave_radiation,
        layer.upper_cumulative_leaf_area_index,
        layer.lower_cumulative_leaf_area_index,
        context.state.extinction_coefficients.diffuse_black,
    )
}

/// All the leaves of a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpedLeaves {
    layer: LeafLayer,
    stomatal_density_factor: FloatValue,
    fluxes: ComponentFluxes,
}

impl LumpedLeaves {
    pub fn new(layer: LeafLayer, stomatal_density_factor: FloatValue) -> Self {
        Self {
            layer,
            stomatal_density_factor,
            fluxes: ComponentFluxes::default(),
        }
    }

    pub fn layer(&self) -> &LeafLayer {
        &self.layer
    }
}

#[typetag::serde]
impl Component for LumpedLeaves {
    fn kind(&self) -> ComponentKind {
        ComponentKind::LumpedLeaves
    }

    fn index(&self) -> i32 {
        self.layer.index
    }

    fn leaf_area_index(&self) -> FloatValue {
        self.layer.leaf_area_index
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
            LeafShading::Lumped,
            &context.inputs.incident_photosynthetically_active_radiation,
            self.layer.upper_cumulative_leaf_area_index,
            self.layer.lower_cumulative_leaf_area_index,
            &context.state.extinction_coefficients,
        );
        (
            context.to_shortwave(absorbed_par),
            layer_net_longwave_radiation(&self.layer, context),
        )
    }

    fn update_resistances(&mut self, context: &CanopyContext) -> CropEnergyBalanceResult<()> {
        let stomatal_sensibility = calc_stomatal_sensibility(context, self.fluxes.temperature)?;
        self.fluxes.boundary_resistance =
            calc_resistance(layer_boundary_conductance(&self.layer, context));
        self.fluxes.surface_resistance = calc_resistance(calc_leaf_layer_surface_conductance_to_vapor(
            LeafShading::Lumped,
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
    use crate::testing::{example_canopy, top_layer};
    use crate::testing::{follows_trend, Trend};
    use is_close::is_close;

    #[test]
    fn test_boundary_conductance_of_the_whole_canopy() {
        // an infinitely deep canopy integrates to 2/k_u times the top leaf conductance
        let top = calc_leaf_boundary_conductance(2.0, 0.01, 0.01);
        let deep = calc_leaf_layer_boundary_conductance(2.0, 0.0, 1000.0, 0.5, 0.01, 0.01);
        assert!(is_close!(deep, top * 4.0));
    }

    #[test]
    fn test_boundary_conductance_decreases_with_depth() {
        let values: Vec<FloatValue> = (0..5)
            .map(|i| {
                let upper = i as FloatValue;
                calc_leaf_layer_boundary_conductance(2.0, upper, upper + 1.0, 0.5, 0.01, 0.01)
            })
            .collect();
        assert!(follows_trend(&values, Trend::Decreasing));
    }

    #[test]
    fn test_boundary_conductance_decreases_with_wind_extinction() {
        let values: Vec<FloatValue> = (1..10)
            .map(|i| {
                calc_leaf_layer_boundary_conductance(2.0, 0.5, 1.5, 0.2 * i as FloatValue, 0.01, 0.01)
            })
            .collect();
        assert!(follows_trend(&values, Trend::Decreasing));
    }

    #[test]
    fn test_net_longwave_radiation() {
        assert_eq!(calc_leaf_layer_net_longwave_radiation(-80.0, 1.0, 1.0, 0.8), 0.0);
        let whole = calc_leaf_layer_net_longwave_radiation(-80.0, 0.0, 3.0, 0.8);
        let split = calc_leaf_layer_net_longwave_radiation(-80.0, 0.0, 1.0, 0.8)
            + calc_leaf_layer_net_longwave_radiation(-80.0, 1.0, 3.0, 0.8);
        assert!(is_close!(whole, split));
        assert!(whole < 0.0);
    }

    #[test]
    fn test_lumped_leaves_component() {
        let canopy = example_canopy();
        let context = canopy.context();
        let mut leaves = LumpedLeaves::new(top_layer(&canopy), 1.0);
        leaves.initialize(&context, context.air_temperature());
        leaves.update_resistances(&context).unwrap();

        assert_eq!(leaves.kind(), ComponentKind::LumpedLeaves);
        assert_eq!(leaves.index(), 2);
        let fluxes = leaves.fluxes();
        assert!(fluxes.net_shortwave_radiation > 0.0);
        assert!(fluxes.net_longwave_radiation < 0.0);
        assert_eq!(fluxes.heat_flux, 0.0);
        assert!(fluxes.surface_resistance > 0.0);
        assert!(fluxes.boundary_resistance > 0.0);
    }
}
