#![cfg(feature = "sensitivity")]

use bess_finance_core::assumptions::input::{ModelInput, RevenueStreamSelection};
use bess_finance_core::assumptions::market_rates::MarketRegion;
use bess_finance_core::collaborators::{BatteryConstants, QuoteSource};
use bess_finance_core::sensitivity::analyzer::{
    generate_sensitivity, SensitivityParameter, SensitivityRequest, DEFAULT_PERTURBATIONS,
};
use bess_finance_core::BessFinanceError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ercot_input() -> ModelInput {
    let mut streams = RevenueStreamSelection::none();
    streams.energy_arbitrage = true;
    streams.frequency_regulation = true;

    ModelInput {
        project_name: None,
        storage_size_mw: dec!(5),
        duration_hours: dec!(2),
        solar_mw: None,
        wind_mw: None,
        location: "Austin, TX".into(),
        region: MarketRegion::Ercot,
        electricity_rate: dec!(0.12),
        demand_charge: None,
        revenue_streams: streams,
        assumptions: Default::default(),
        financial_close_date: None,
    }
}

#[test]
fn test_sweep_preserves_parameter_and_perturbation_order() {
    let parameters = [
        SensitivityParameter::Degradation,
        SensitivityParameter::ElectricityRate,
        SensitivityParameter::InterestRate,
    ];
    let out = generate_sensitivity(
        &ercot_input(),
        &parameters,
        None,
        &QuoteSource::default(),
        &BatteryConstants::default(),
    )
    .unwrap();

    let order: Vec<SensitivityParameter> =
        out.result.parameters.iter().map(|p| p.parameter).collect();
    assert_eq!(order, parameters.to_vec());

    for entry in &out.result.parameters {
        assert_eq!(entry.perturbations, DEFAULT_PERTURBATIONS.to_vec());
        assert_eq!(entry.values.len(), 5);
        assert_eq!(entry.npv.len(), 5);
        assert!(entry.failures.is_empty(), "{}: {:?}", entry.parameter, entry.failures);
        for pair in entry.values.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }
}

#[test]
fn test_higher_electricity_rate_raises_npv() {
    let out = generate_sensitivity(
        &ercot_input(),
        &[SensitivityParameter::ElectricityRate],
        Some(&[dec!(-0.10), dec!(0), dec!(0.10)]),
        &QuoteSource::default(),
        &BatteryConstants::default(),
    )
    .unwrap();

    let npvs: Vec<Decimal> = out.result.parameters[0]
        .npv
        .iter()
        .map(|v| v.expect("permutation should succeed"))
        .collect();
    assert!(npvs[0] < npvs[1] && npvs[1] < npvs[2], "{npvs:?}");
}

#[test]
fn test_zero_perturbation_matches_base_model() {
    let input = ercot_input();
    let base = bess_finance_core::generate_model(
        &input,
        &QuoteSource::default(),
        &BatteryConstants::default(),
    )
    .unwrap();
    let out = generate_sensitivity(
        &input,
        &[SensitivityParameter::Capex],
        Some(&[Decimal::ZERO]),
        &QuoteSource::default(),
        &BatteryConstants::default(),
    )
    .unwrap();

    let entry = &out.result.parameters[0];
    assert_eq!(entry.values[0], base.result.summary.total_capex);
    assert_eq!(entry.npv[0], Some(base.result.summary.npv));
    assert_eq!(entry.minimum_dscr[0], base.result.summary.minimum_dscr);
}

#[test]
fn test_failing_permutation_does_not_abort_sweep() {
    let mut input = ercot_input();
    input.assumptions.interest_rate = Some(dec!(0.9));

    // 0.9 × 1.2 pushes the rate above 100%
    let out = generate_sensitivity(
        &input,
        &[SensitivityParameter::InterestRate],
        Some(&[dec!(-0.5), dec!(0.2)]),
        &QuoteSource::default(),
        &BatteryConstants::default(),
    )
    .unwrap();

    let entry = &out.result.parameters[0];
    assert!(entry.npv[0].is_some());
    assert_eq!(entry.npv[1], None);
    assert_eq!(entry.failures.len(), 1);
    assert_eq!(entry.failures[0].perturbation, dec!(0.2));
    assert!(out.warnings.iter().any(|w| w.contains("interest_rate")));
}

#[test]
fn test_request_from_json() {
    let json = r#"{
        "model": {
            "input": {
                "storage_size_mw": "2",
                "duration_hours": "4",
                "location": "Boston, MA",
                "region": "ISO-NE",
                "electricity_rate": "0.20"
            },
            "quote": { "source": "fixed", "total_capex": "2500000" }
        },
        "parameters": ["capex", "electricity_rate"],
        "perturbations": ["-0.1", "0.1"]
    }"#;
    let request: SensitivityRequest = serde_json::from_str(json).unwrap();
    let out = request.run().unwrap();

    let capex = &out.result.parameters[0];
    assert_eq!(capex.parameter, SensitivityParameter::Capex);
    assert_eq!(capex.values, vec![dec!(2250000), dec!(2750000)]);
    assert!(capex.npv[0].unwrap() > capex.npv[1].unwrap());
}

#[test]
fn test_sweep_rejects_invalid_requests() {
    let input = ercot_input();
    let quotes = QuoteSource::default();
    let constants = BatteryConstants::default();

    let err = generate_sensitivity(&input, &[], None, &quotes, &constants).unwrap_err();
    assert!(matches!(err, BessFinanceError::InvalidConfiguration { .. }));

    let err = generate_sensitivity(
        &input,
        &[SensitivityParameter::Capex],
        Some(&[]),
        &quotes,
        &constants,
    )
    .unwrap_err();
    assert!(matches!(err, BessFinanceError::InvalidConfiguration { .. }));
}
