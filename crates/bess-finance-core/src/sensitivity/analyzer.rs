use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::assumptions::configuration::ModelConfiguration;
use crate::assumptions::input::ModelInput;
use crate::assumptions::market_rates::MarketRateTable;
use crate::collaborators::{fetch_quote, ConstantsLookup, QuoteLookup, QuoteRequest, ScaledQuote};
use crate::error::BessFinanceError;
use crate::model::orchestrator::run_model;
use crate::model::request::ModelRequest;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::BessFinanceResult;

/// ±20% and ±10% around the base case.
pub const DEFAULT_PERTURBATIONS: [Rate; 5] = [dec!(-0.20), dec!(-0.10), dec!(0), dec!(0.10), dec!(0.20)];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Model input varied by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    ElectricityRate,
    Capex,
    InterestRate,
    Degradation,
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensitivityParameter::ElectricityRate => "electricity_rate",
            SensitivityParameter::Capex => "capex",
            SensitivityParameter::InterestRate => "interest_rate",
            SensitivityParameter::Degradation => "degradation",
        };
        f.write_str(name)
    }
}

/// A permutation that could not be modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationFailure {
    pub perturbation: Rate,
    pub reason: String,
}

/// Results for one parameter, index-aligned with `perturbations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSensitivity {
    pub parameter: SensitivityParameter,
    pub perturbations: Vec<Rate>,
    /// Parameter value at each perturbation
    pub values: Vec<Decimal>,
    /// `None` when the run failed or the IRR did not converge
    pub levered_irr: Vec<Option<Rate>>,
    pub npv: Vec<Option<Money>>,
    pub minimum_dscr: Vec<Option<Multiple>>,
    pub failures: Vec<PermutationFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub parameters: Vec<ParameterSensitivity>,
}

/// Serializable sweep request for the CLI and bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRequest {
    pub model: ModelRequest,
    pub parameters: Vec<SensitivityParameter>,
    #[serde(default)]
    pub perturbations: Option<Vec<Rate>>,
}

impl SensitivityRequest {
    pub fn run(&self) -> BessFinanceResult<ComputationOutput<SensitivityResult>> {
        generate_sensitivity_with_rates(
            &self.model.input,
            &self.parameters,
            self.perturbations.as_deref(),
            &self.model.quote,
            &self.model.constants,
            &self.model.rates(),
        )
    }
}

struct PermutationMetrics {
    levered_irr: Option<Rate>,
    npv: Money,
    minimum_dscr: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// Re-run the full model for each parameter × perturbation with the built-in
/// market rate table.
pub fn generate_sensitivity(
    input: &ModelInput,
    parameters: &[SensitivityParameter],
    perturbations: Option<&[Rate]>,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
) -> BessFinanceResult<ComputationOutput<SensitivityResult>> {
    generate_sensitivity_with_rates(
        input,
        parameters,
        perturbations,
        quotes,
        constants,
        &MarketRateTable::default(),
    )
}

/// Re-run the full model for each parameter × perturbation.
///
/// Perturbations are relative (`0.1` = +10%). Runs execute on the rayon pool
/// and are gathered in parameter order. A failing permutation leaves `None`
/// in its slot and is recorded in `failures` and the envelope warnings.
pub fn generate_sensitivity_with_rates(
    input: &ModelInput,
    parameters: &[SensitivityParameter],
    perturbations: Option<&[Rate]>,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
    rates: &MarketRateTable,
) -> BessFinanceResult<ComputationOutput<SensitivityResult>> {
    let start = Instant::now();
    let perturbations = perturbations.unwrap_or(&DEFAULT_PERTURBATIONS);
    validate_sweep(parameters, perturbations)?;

    let base = ModelConfiguration::resolve(input)?;
    let base_capex = if parameters.contains(&SensitivityParameter::Capex) {
        fetch_quote(quotes, &QuoteRequest::from(&base))?.total_capex
    } else {
        Decimal::ZERO
    };

    let jobs: Vec<(SensitivityParameter, Rate)> = parameters
        .iter()
        .flat_map(|p| perturbations.iter().map(move |d| (*p, *d)))
        .collect();
    log::debug!("Sensitivity sweep: {} permutations", jobs.len());

    let outcomes: Vec<BessFinanceResult<PermutationMetrics>> = jobs
        .par_iter()
        .map(|(parameter, delta)| run_permutation(&base, *parameter, *delta, quotes, constants, rates))
        .collect();

    let mut warnings = Vec::new();
    let mut results = Vec::with_capacity(parameters.len());
    let mut outcomes = outcomes.into_iter();

    for parameter in parameters {
        let base_value = match parameter {
            SensitivityParameter::ElectricityRate => base.electricity_rate,
            SensitivityParameter::Capex => base_capex,
            SensitivityParameter::InterestRate => base.interest_rate,
            SensitivityParameter::Degradation => base.degradation_rate,
        };
        let mut entry = ParameterSensitivity {
            parameter: *parameter,
            perturbations: perturbations.to_vec(),
            values: Vec::with_capacity(perturbations.len()),
            levered_irr: Vec::with_capacity(perturbations.len()),
            npv: Vec::with_capacity(perturbations.len()),
            minimum_dscr: Vec::with_capacity(perturbations.len()),
            failures: Vec::new(),
        };

        for delta in perturbations {
            entry.values.push(base_value * (Decimal::ONE + *delta));
            match outcomes.next() {
                Some(Ok(metrics)) => {
                    entry.levered_irr.push(metrics.levered_irr);
                    entry.npv.push(Some(metrics.npv));
                    entry.minimum_dscr.push(metrics.minimum_dscr);
                }
                Some(Err(e)) => {
                    log::warn!("Sensitivity {parameter} at {delta} failed: {e}");
                    warnings.push(format!("{parameter} at {delta} failed: {e}"));
                    entry.failures.push(PermutationFailure {
                        perturbation: *delta,
                        reason: e.to_string(),
                    });
                    entry.levered_irr.push(None);
                    entry.npv.push(None);
                    entry.minimum_dscr.push(None);
                }
                None => {
                    return Err(BessFinanceError::degenerate(
                        "sensitivity sweep returned fewer results than permutations",
                    ))
                }
            }
        }
        results.push(entry);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-way sensitivity (full model re-run per permutation)",
        &serde_json::json!({
            "parameters": parameters,
            "perturbations": perturbations.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
            "project_name": base.project_name,
        }),
        warnings,
        elapsed,
        SensitivityResult { parameters: results },
    ))
}

fn validate_sweep(parameters: &[SensitivityParameter], perturbations: &[Rate]) -> BessFinanceResult<()> {
    if parameters.is_empty() {
        return Err(BessFinanceError::invalid(
            "parameters",
            "At least one sensitivity parameter is required",
        ));
    }
    if perturbations.is_empty() {
        return Err(BessFinanceError::invalid(
            "perturbations",
            "At least one perturbation is required",
        ));
    }
    if let Some(bad) = perturbations.iter().find(|d| **d <= dec!(-1)) {
        return Err(BessFinanceError::invalid(
            "perturbations",
            format!("Perturbation {bad} would make the parameter non-positive"),
        ));
    }
    Ok(())
}

fn run_permutation(
    base: &ModelConfiguration,
    parameter: SensitivityParameter,
    delta: Rate,
    quotes: &dyn QuoteLookup,
    constants: &dyn ConstantsLookup,
    rates: &MarketRateTable,
) -> BessFinanceResult<PermutationMetrics> {
    let factor = Decimal::ONE + delta;
    let mut config = base.clone();
    let scaled = ScaledQuote {
        inner: quotes,
        factor: if parameter == SensitivityParameter::Capex {
            factor
        } else {
            Decimal::ONE
        },
    };

    match parameter {
        SensitivityParameter::ElectricityRate => config.electricity_rate *= factor,
        SensitivityParameter::InterestRate => config.interest_rate *= factor,
        SensitivityParameter::Degradation => config.degradation_rate *= factor,
        SensitivityParameter::Capex => {}
    }
    config.validate()?;

    let mut discarded = Vec::new();
    let result = run_model(&config, None, &scaled, constants, rates, &mut discarded)?;
    let summary = result.summary;
    Ok(PermutationMetrics {
        levered_irr: summary.levered_irr.rate(),
        npv: summary.npv,
        minimum_dscr: summary.minimum_dscr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::input::{AssumptionOverrides, RevenueStreamSelection};
    use crate::assumptions::market_rates::MarketRegion;
    use crate::collaborators::{BatteryConstants, EquipmentQuote, QuoteSource};

    fn sample_input() -> ModelInput {
        ModelInput {
            project_name: None,
            storage_size_mw: dec!(1),
            duration_hours: dec!(4),
            solar_mw: None,
            wind_mw: None,
            location: "Sacramento, CA".into(),
            region: MarketRegion::Caiso,
            electricity_rate: dec!(0.18),
            demand_charge: None,
            revenue_streams: RevenueStreamSelection::all(),
            assumptions: AssumptionOverrides::default(),
            financial_close_date: None,
        }
    }

    struct StaticQuote;

    impl QuoteLookup for StaticQuote {
        fn quote(&self, _request: &QuoteRequest) -> BessFinanceResult<EquipmentQuote> {
            Ok(EquipmentQuote {
                total_capex: dec!(1500000),
            })
        }
    }

    #[test]
    fn test_default_sweep_shape() {
        let out = generate_sensitivity(
            &sample_input(),
            &[SensitivityParameter::ElectricityRate, SensitivityParameter::Capex],
            None,
            &QuoteSource::default(),
            &BatteryConstants::default(),
        )
        .unwrap();
        let params = &out.result.parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].parameter, SensitivityParameter::ElectricityRate);
        assert_eq!(params[0].perturbations.len(), 5);
        assert_eq!(params[0].values[2], dec!(0.18));
        assert_eq!(params[1].values[4], dec!(1860000));
        assert!(params.iter().all(|p| p.failures.is_empty()));
    }

    #[test]
    fn test_higher_capex_lowers_npv() {
        let out = generate_sensitivity(
            &sample_input(),
            &[SensitivityParameter::Capex],
            Some(&[dec!(-0.1), dec!(0.1)]),
            &StaticQuote,
            &BatteryConstants::default(),
        )
        .unwrap();
        let npv = &out.result.parameters[0].npv;
        assert!(npv[0].unwrap() > npv[1].unwrap());
    }

    #[test]
    fn test_failed_permutation_is_isolated() {
        let mut input = sample_input();
        input.assumptions.interest_rate = Some(dec!(0.9));
        let out = generate_sensitivity(
            &input,
            &[SensitivityParameter::InterestRate],
            Some(&[dec!(0), dec!(0.2)]),
            &QuoteSource::default(),
            &BatteryConstants::default(),
        )
        .unwrap();
        let entry = &out.result.parameters[0];
        assert!(entry.npv[0].is_some());
        // 0.9 × 1.2 is not a valid rate
        assert!(entry.npv[1].is_none());
        assert_eq!(entry.failures.len(), 1);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_rejects_empty_parameters() {
        let err = generate_sensitivity(
            &sample_input(),
            &[],
            None,
            &QuoteSource::default(),
            &BatteryConstants::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BessFinanceError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_rejects_minus_one_perturbation() {
        assert!(generate_sensitivity(
            &sample_input(),
            &[SensitivityParameter::Degradation],
            Some(&[dec!(-1)]),
            &QuoteSource::default(),
            &BatteryConstants::default(),
        )
        .is_err());
    }
}
