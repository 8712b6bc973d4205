//! Core functionality for solving the energy balance of uniform crop canopies.
//!
//! The canopy is resolved into components (the soil and the leaves, either lumped per layer or
//! split into sunlit and shaded fractions). Each component is coupled to the air at the mean
//! canopy source height following the generalized multi-component Penman-Monteith formulation of
//! Lhomme et al. (2013), Agricultural and Forest Meteorology 168, 50-62.
//!
//! Concrete components live in the `ceb-components` crate. This crate provides the [`component::Component`]
//! trait they implement, the canopy-level formalisms and the iterative [`solver::Solver`].

pub mod aerodynamics;
pub mod canopy;
pub mod component;
pub mod constants;
pub mod errors;
pub mod inputs;
pub mod irradiance;
pub mod leaf;
pub mod params;
pub mod solver;
pub mod state;
#[cfg(test)]
pub(crate) mod testing;
pub mod utils;
pub mod weather;

/// Floating point type used for every physical quantity.
pub type FloatValue = f64;
