use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Model runs emit one row per operating year, sensitivity sweeps one row per
/// permutation, and anything else a two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value.get("result").unwrap_or(value);
    match result {
        Value::Object(map) if map.contains_key("income_statements") => {
            write_yearly_csv(&mut wtr, map);
        }
        Value::Object(map) if map.contains_key("parameters") => {
            if let Some(Value::Array(params)) = map.get("parameters") {
                write_sensitivity_csv(&mut wtr, params);
            }
        }
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in map {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

/// Join income statement, debt schedule and cash flow rows by year.
fn write_yearly_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Map<String, Value>) {
    let sections = ["income_statements", "debt_schedule", "cash_flows"];
    let rows: Vec<&[Value]> = sections
        .iter()
        .map(|s| match result.get(*s) {
            Some(Value::Array(arr)) => arr.as_slice(),
            _ => &[] as &[Value],
        })
        .collect();

    let mut headers: Vec<String> = Vec::new();
    for section in &rows {
        if let Some(Value::Object(first)) = section.first() {
            for key in first.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }
    let _ = wtr.write_record(&headers);

    let years = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    for idx in 0..years {
        let record: Vec<String> = headers
            .iter()
            .map(|h| {
                rows.iter()
                    .find_map(|section| section.get(idx).and_then(|r| r.get(h.as_str())))
                    .map(format_csv_value)
                    .unwrap_or_default()
            })
            .collect();
        let _ = wtr.write_record(&record);
    }
}

fn write_sensitivity_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, params: &[Value]) {
    let columns = ["perturbations", "values", "levered_irr", "npv", "minimum_dscr"];
    let _ = wtr.write_record(["parameter", "perturbation", "value", "levered_irr", "npv", "minimum_dscr"]);

    for param in params {
        let name = param.get("parameter").map(format_csv_value).unwrap_or_default();
        let count = param
            .get("perturbations")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        for idx in 0..count {
            let mut record = vec![name.clone()];
            for col in columns {
                record.push(
                    param
                        .get(col)
                        .and_then(|v| v.get(idx))
                        .map(format_csv_value)
                        .unwrap_or_default(),
                );
            }
            let _ = wtr.write_record(&record);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
