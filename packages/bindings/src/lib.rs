use napi::Result as NapiResult;
use napi_derive::napi;

use bess_finance_core::model::estimators::{self, QuickEstimateInput};
use bess_finance_core::model::request::ModelRequest;
use bess_finance_core::sensitivity::analyzer::SensitivityRequest;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Full model
// ---------------------------------------------------------------------------

/// `request_json` is a model request: `{ input, quote?, constants?, market_rates? }`.
#[napi]
pub fn generate_model(request_json: String) -> NapiResult<String> {
    let request: ModelRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output = request.run().map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_sensitivity(request_json: String) -> NapiResult<String> {
    let request: SensitivityRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output = request.run().map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Quick estimates
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_dscr(input_json: String) -> NapiResult<String> {
    let input: QuickEstimateInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = estimators::estimate_dscr(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn estimate_levered_irr(input_json: String) -> NapiResult<String> {
    let input: QuickEstimateInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = estimators::estimate_levered_irr(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
