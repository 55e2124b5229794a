use serde_json::Value;

/// Print just the headline number from the output.
///
/// Full model runs report from `summary`; otherwise the result object is
/// searched for well-known fields before falling back to its first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let result_obj = result_obj.get("summary").unwrap_or(result_obj);

    let priority_keys = ["levered_irr", "dscr", "npv", "parameters"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // IRR outcomes: {"status": "converged", "rate": ...}
        Value::Object(map) => match (map.get("status").and_then(Value::as_str), map.get("rate")) {
            (Some("converged"), Some(rate)) => format_minimal(rate),
            (Some("not_converged"), _) => "not converged".to_string(),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_converged_irr_prints_rate() {
        let outcome = json!({ "status": "converged", "rate": "0.1234", "iterations": 4 });
        assert_eq!(format_minimal(&outcome), "0.1234");
    }

    #[test]
    fn test_unconverged_irr_hides_last_iterate() {
        let outcome = json!({ "status": "not_converged", "last_rate": "-0.99", "iterations": 2 });
        assert_eq!(format_minimal(&outcome), "not converged");
    }
}
