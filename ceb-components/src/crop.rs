//! Assembly of a crop canopy out of soil and leaf layer components

use crate::leaf_layer::LeafLayer;
use crate::lumped_leaves::LumpedLeaves;
use crate::soil::Soil;
use crate::sunlit_shaded_leaves::SunlitShadedLeaves;
use ceb_core::canopy::Canopy;
use ceb_core::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
use ceb_core::inputs::Inputs;
use ceb_core::params::Params;
use ceb_core::solver::{Solver, SolverOutputs};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the leaves of every layer are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeavesCategory {
    /// One component per layer
    #[default]
    Lumped,
    /// A sunlit and a shaded component per layer
    SunlitShaded,
}

impl FromStr for LeavesCategory {
    type Err = CropEnergyBalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lumped" => Ok(Self::Lumped),
            "sunlit-shaded" => Ok(Self::SunlitShaded),
            other => Err(CropEnergyBalanceError::InvalidInput(format!(
                "unknown leaves category '{other}', expected 'lumped' or 'sunlit-shaded'"
            ))),
        }
    }
}

impl fmt::Display for LeavesCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lumped => write!(f, "lumped"),
            Self::SunlitShaded => write!(f, "sunlit-shaded"),
        }
    }
}

/// A uniform crop: the soil underneath and its leaf layers.
///
/// Components are added soil first, then leaf layers from the uppermost (highest index) to the
/// lowermost. A canopy described by a single layer is solved as a big leaf.
#[derive(Debug)]
pub struct Crop {
    leaves_category: LeavesCategory,
    canopy: Canopy,
}

impl Crop {
    pub fn new(
        leaves_category: LeavesCategory,
        inputs: Inputs,
        params: Params,
    ) -> CropEnergyBalanceResult<Self> {
        let mut canopy = Canopy::new(inputs, params)?;
        let stomatal_density_factor = canopy.params.stomatal_density_factor();
        let direct_black = canopy.state.extinction_coefficients.direct_black;

        canopy.add_component(Box::new(Soil::new()));
        for (index, leaf_area_index, upper, lower) in canopy.inputs.leaf_layers_from_top() {
            let layer = LeafLayer {
                index,
                leaf_area_index,
                upper_cumulative_leaf_area_index: upper,
                lower_cumulative_leaf_area_index: lower,
            };
            match leaves_category {
                LeavesCategory::Lumped => {
                    canopy.add_component(Box::new(LumpedLeaves::new(layer, stomatal_density_factor)))
                }
                LeavesCategory::SunlitShaded => {
                    canopy.add_component(Box::new(SunlitShadedLeaves::sunlit(
                        layer,
                        direct_black,
                        stomatal_density_factor,
                    )));
                    canopy.add_component(Box::new(SunlitShadedLeaves::shaded(
                        layer,
                        direct_black,
                        stomatal_density_factor,
                    )));
                }
            }
        }
        debug!(
            "Built a {} crop with {} components",
            leaves_category,
            canopy.components.len()
        );

        Ok(Self {
            leaves_category,
            canopy,
        })
    }

    pub fn leaves_category(&self) -> LeavesCategory {
        self.leaves_category
    }

    pub fn canopy(&self) -> &Canopy {
        &self.canopy
    }

    pub fn into_canopy(self) -> Canopy {
        self.canopy
    }

    /// Solves the energy balance of the crop, optionally correcting the aerodynamic resistance
    /// for atmospheric stability.
    pub fn solve(self, correct_stability: bool) -> CropEnergyBalanceResult<SolverOutputs> {
        Solver::new(self.canopy).run(correct_stability)
    }
}
