//! Energy balance of uniform crop canopies
//!
//! The canopy is split into soil and leaf components whose latent heat, sensible heat and
//! temperature are solved with the multi-component Penman-Monteith formulation of
//! Lhomme et al. (2013). Leaves are either lumped per layer or split into sunlit and shaded
//! leaves.
//!
//! ```no_run
//! use crop_energy_balance::{Inputs, LeavesCategory, Params, Simulation};
//!
//! let inputs = Inputs::from_path("inputs.json").unwrap();
//! let outputs = Simulation::new(LeavesCategory::SunlitShaded, inputs, Params::default())
//!     .run()
//!     .unwrap();
//! println!("{}", outputs.canopy.latent_heat_flux);
//! ```

pub use ceb_components::crop::{Crop, LeavesCategory};
pub use ceb_core::errors::{CropEnergyBalanceError, CropEnergyBalanceResult};
pub use ceb_core::inputs::Inputs;
pub use ceb_core::params::Params;
pub use ceb_core::solver::{CanopyOutputs, ComponentOutputs, SolverOutputs};
pub use ceb_core::FloatValue;

pub use ceb_components;
pub use ceb_core;

use serde::{Deserialize, Serialize};

#[cfg(feature = "python")]
pub mod python;

/// Everything needed to solve the energy balance of a crop once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    #[serde(default)]
    pub leaves_category: LeavesCategory,
    pub inputs: Inputs,
    #[serde(default)]
    pub params: Params,
    /// Corrects the aerodynamic resistance for atmospheric stability
    #[serde(default)]
    pub correct_stability: bool,
}

impl Simulation {
    pub fn new(leaves_category: LeavesCategory, inputs: Inputs, params: Params) -> Self {
        Self {
            leaves_category,
            inputs,
            params,
            correct_stability: false,
        }
    }

    pub fn with_stability_correction(mut self, correct_stability: bool) -> Self {
        self.correct_stability = correct_stability;
        self
    }

    pub fn run(self) -> CropEnergyBalanceResult<SolverOutputs> {
        Crop::new(self.leaves_category, self.inputs, self.params)?.solve(self.correct_stability)
    }
}
