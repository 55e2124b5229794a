pub mod assumptions;
pub mod collaborators;
pub mod debt;
pub mod error;
pub mod model;
pub mod returns;
pub mod revenue;
pub mod statements;
pub mod tax;
pub mod time_value;
pub mod types;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use error::BessFinanceError;
pub use types::*;

pub use assumptions::input::ModelInput;
pub use collaborators::{ConstantsLookup, QuoteLookup};
pub use model::estimators::{estimate_dscr, estimate_levered_irr};
pub use model::orchestrator::{generate_model, generate_model_with_rates};

#[cfg(feature = "sensitivity")]
pub use sensitivity::analyzer::{generate_sensitivity, generate_sensitivity_with_rates};

/// Standard result type for all bess-finance operations
pub type BessFinanceResult<T> = Result<T, BessFinanceError>;
