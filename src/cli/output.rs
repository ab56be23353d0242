use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::OutputMode;
use crate::models::result::OperationResult;

pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

pub fn print_table<T: Tabled>(data: &[T]) {
    if data.is_empty() {
        println!("No results.");
        return;
    }
    let table = Table::new(data).with(Style::rounded()).to_string();
    println!("{}", table);
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "FIELD")]
    field: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

fn join_or_dash(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}

fn result_rows(result: &OperationResult) -> Vec<FieldRow> {
    vec![
        FieldRow {
            field: "RESULT",
            value: result.result_code.as_str().to_string(),
        },
        FieldRow {
            field: "MESSAGE",
            value: result.message.clone(),
        },
        FieldRow {
            field: "ATTEMPTS",
            value: result.attempts.to_string(),
        },
        FieldRow {
            field: "LIGHTS",
            value: result.total_lights.to_string(),
        },
        FieldRow {
            field: "FAILED",
            value: join_or_dash(&result.failed_lights),
        },
        FieldRow {
            field: "SKIPPED",
            value: join_or_dash(&result.skipped_lights),
        },
        FieldRow {
            field: "ELAPSED",
            value: format!("{:.2}s", result.elapsed_seconds),
        },
    ]
}

pub fn print_result(result: &OperationResult, mode: &OutputMode) {
    match mode {
        OutputMode::Json => {
            print_json(&serde_json::to_value(result).unwrap_or_default());
        }
        OutputMode::Table => print_table(&result_rows(result)),
    }
}

pub fn print_error(err: &crate::error::AppError) {
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&err.to_json()).unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::ResultCode;

    #[test]
    fn test_result_rows() {
        let result = OperationResult::new(ResultCode::Failed, "Failed after 3 attempts. Remaining: light.a")
            .with_attempts(3)
            .with_lights(2, vec!["light.a".into()], vec![])
            .with_elapsed(6.004);
        let rows = result_rows(&result);
        assert_eq!(rows[0].value, "failed");
        assert_eq!(rows[4].value, "light.a");
        assert_eq!(rows[5].value, "-");
        assert_eq!(rows[6].value, "6.00s");
    }
}
