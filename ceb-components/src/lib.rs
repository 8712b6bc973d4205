//! Components of a uniform crop canopy
//!
//! The soil and the leaf layers implement [`ceb_core::component::Component`], either with the
//! leaves of each layer lumped together or split into sunlit and shaded leaves. [`crop::Crop`]
//! assembles them into a canopy ready to be solved.

pub mod crop;
pub mod leaf_layer;
pub mod lumped_leaves;
pub mod soil;
pub mod sunlit_shaded_leaves;

#[cfg(test)]
pub(crate) mod testing {
    use crate::leaf_layer::LeafLayer;
    use ceb_core::canopy::Canopy;
    use ceb_core::inputs::Inputs;
    use ceb_core::irradiance::IncidentIrradiance;
    use ceb_core::params::Params;
    use ceb_core::FloatValue;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Trend {
        Increasing,
        Decreasing,
    }

    /// Checks that `values` are monotonic in the direction of `trend`.
    pub(crate) fn follows_trend(values: &[FloatValue], trend: Trend) -> bool {
        values.windows(2).all(|w| match trend {
            Trend::Increasing => w[0] <= w[1],
            Trend::Decreasing => w[0] >= w[1],
        })
    }

    pub(crate) fn example_inputs() -> Inputs {
        Inputs {
            measurement_height: 2.0,
            canopy_height: 1.0,
            soil_saturation_ratio: 0.5,
            air_temperature: 25.0,
            wind_speed: 3600.0,
            relative_humidity: 50.0,
            atmospheric_pressure: 101.3,
            soil_water_potential: None,
            solar_inclination: 0.8,
            leaf_layers: BTreeMap::from([(0, 1.0), (1, 1.0), (2, 1.0)]),
            incident_photosynthetically_active_radiation: IncidentIrradiance {
                direct: 300.0,
                diffuse: 100.0,
            },
        }
    }

    pub(crate) fn example_canopy() -> Canopy {
        Canopy::new(example_inputs(), Params::default()).unwrap()
    }

    /// Uppermost leaf layer of the example canopy
    pub(crate) fn top_layer(canopy: &Canopy) -> LeafLayer {
        let (index, leaf_area_index, upper, lower) = canopy.inputs.leaf_layers_from_top()[0];
        LeafLayer {
            index,
            leaf_area_index,
            upper_cumulative_leaf_area_index: upper,
            lower_cumulative_leaf_area_index: lower,
        }
    }
}
