use thiserror::Error;

/// Error type for invalid inputs, parameters and failed solves.
#[derive(Error, Debug)]
pub enum CropEnergyBalanceError {
    #[error("Invalid inputs: {0}")]
    InvalidInput(String),
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("The `{model}` stomatal sensibility model requires the soil water potential, which is missing from the inputs")]
    MissingSoilWaterPotential { model: String },
    #[error("Energy balance did not converge after {iterations} iterations (last temperature error={error} K)")]
    NotConverged { iterations: usize, error: f64 },
    #[error("Could not parse configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CropEnergyBalanceError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, CropEnergyBalanceError>`.
pub type CropEnergyBalanceResult<T> = Result<T, CropEnergyBalanceError>;
