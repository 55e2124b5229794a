use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Yearly columns shown in the model pro-forma table.
const PRO_FORMA_COLUMNS: [(&str, &str); 7] = [
    ("income_statements", "revenue"),
    ("income_statements", "ebitda"),
    ("income_statements", "interest_expense"),
    ("income_statements", "net_income"),
    ("debt_schedule", "debt_service"),
    ("debt_schedule", "dscr"),
    ("cash_flows", "free_cash_flow_to_equity"),
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                if let Some(Value::Object(summary)) = result.get("summary") {
                    print_field_table(summary);
                    print_pro_forma(result);
                } else if let Some(Value::Array(params)) = result.get("parameters") {
                    print_sensitivity(params);
                } else {
                    print_field_table(result);
                }
                print_envelope_notes(map);
            }
            _ => print_field_table(map),
        },
        _ => println!("{}", value),
    }
}

fn print_field_table(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_pro_forma(result: &Map<String, Value>) {
    let years = match result.get("income_statements") {
        Some(Value::Array(rows)) => rows.len(),
        _ => return,
    };

    let mut builder = Builder::default();
    let mut header = vec!["year".to_string()];
    header.extend(PRO_FORMA_COLUMNS.iter().map(|(_, field)| field.to_string()));
    builder.push_record(header);

    for idx in 0..years {
        let mut row = vec![(idx + 1).to_string()];
        for (section, field) in PRO_FORMA_COLUMNS {
            let cell = result
                .get(section)
                .and_then(|rows| rows.get(idx))
                .and_then(|r| r.get(field))
                .map(format_value)
                .unwrap_or_default();
            row.push(cell);
        }
        builder.push_record(row);
    }
    println!("\n{}", Table::from(builder));
}

fn print_sensitivity(params: &[Value]) {
    for param in params {
        let name = param.get("parameter").map(format_value).unwrap_or_default();
        let mut builder = Builder::default();
        builder.push_record(["perturbation", "value", "levered_irr", "npv", "minimum_dscr"]);

        let column = |key: &str, idx: usize| {
            param
                .get(key)
                .and_then(|v| v.get(idx))
                .map(format_value)
                .unwrap_or_default()
        };
        let count = param
            .get("perturbations")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        for idx in 0..count {
            builder.push_record([
                column("perturbations", idx),
                column("values", idx),
                column("levered_irr", idx),
                column("npv", idx),
                column("minimum_dscr", idx),
            ]);
        }
        println!("\n{}\n{}", name, Table::from(builder));
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) => match (map.get("status").and_then(Value::as_str), map.get("rate")) {
            (Some("converged"), Some(rate)) => format_value(rate),
            (Some("not_converged"), _) => "not converged".to_string(),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}
