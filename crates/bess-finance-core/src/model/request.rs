use serde::{Deserialize, Serialize};

use crate::assumptions::input::ModelInput;
use crate::assumptions::market_rates::MarketRateTable;
use crate::collaborators::{BatteryConstants, QuoteSource};
use crate::model::orchestrator::{generate_model_with_rates, ModelResult};
use crate::types::ComputationOutput;
use crate::BessFinanceResult;

/// Serializable bundle of a model input and the in-process collaborators,
/// for callers that cannot pass trait objects (CLI, bindings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub input: ModelInput,
    #[serde(default)]
    pub quote: QuoteSource,
    #[serde(default)]
    pub constants: BatteryConstants,
    #[serde(default)]
    pub market_rates: Option<MarketRateTable>,
}

impl ModelRequest {
    pub fn rates(&self) -> MarketRateTable {
        self.market_rates.clone().unwrap_or_default()
    }

    pub fn run(&self) -> BessFinanceResult<ComputationOutput<ModelResult>> {
        generate_model_with_rates(&self.input, &self.quote, &self.constants, &self.rates())
    }
}
