//! Tabular results of an executeQueries call

use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,

    /// Type reported by the service, if any
    #[serde(default, rename = "dataType", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// First table of the first result of a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

/// Shape overview of a [`QueryResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    /// Column name to type, reported or inferred
    pub data_types: Map<String, Value>,
}

impl QueryResult {
    /// Parse an executeQueries response body.
    ///
    /// Column names default to `Column_{i}`. When the table carries no
    /// `columns` they are taken from the keys of the first row. Rows may be
    /// objects keyed by column name or positional arrays.
    pub fn from_response(body: &Value) -> ServiceResult<Self> {
        let result = body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .ok_or_else(|| malformed("response has no results"))?;

        if let Some(error) = result.get("error") {
            return Err(ServiceError::DaxSyntax {
                details: error.clone(),
            });
        }

        let table = result
            .get("tables")
            .and_then(Value::as_array)
            .and_then(|tables| tables.first())
            .ok_or_else(|| malformed("result has no tables"))?;

        let raw_rows: &[Value] = table
            .get("rows")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let columns = match table.get("columns").and_then(Value::as_array) {
            Some(columns) => columns
                .iter()
                .enumerate()
                .map(|(i, column)| ResultColumn {
                    name: column
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Column_{}", i)),
                    data_type: column
                        .get("dataType")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .collect(),
            None => columns_from_first_row(raw_rows.first()),
        };

        let rows = raw_rows
            .iter()
            .map(|row| row_values(row, &columns))
            .collect::<ServiceResult<Vec<_>>>()?;

        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Header line followed by one line per row
    pub fn to_csv(&self) -> ServiceResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(self.columns.iter().map(|c| c.name.as_str()))
            .map_err(csv_error)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(csv_field))
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| malformed(&format!("could not finish CSV: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| malformed(&format!("CSV is not UTF-8: {}", e)))
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, value)| (column.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Pretty-printed JSON array of records
    pub fn to_json(&self) -> ServiceResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn summary(&self) -> ResultSummary {
        let data_types = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let data_type = column
                    .data_type
                    .clone()
                    .unwrap_or_else(|| infer_type(self.rows.iter().filter_map(|r| r.get(i))));
                (column.name.clone(), Value::String(data_type))
            })
            .collect();

        ResultSummary {
            rows: self.rows.len(),
            columns: self.columns.len(),
            column_names: self.column_names(),
            data_types,
        }
    }
}

fn columns_from_first_row(first: Option<&Value>) -> Vec<ResultColumn> {
    match first {
        Some(Value::Object(map)) => map
            .keys()
            .map(|key| ResultColumn {
                name: key.clone(),
                data_type: None,
            })
            .collect(),
        Some(Value::Array(values)) => (0..values.len())
            .map(|i| ResultColumn {
                name: format!("Column_{}", i),
                data_type: None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn row_values(row: &Value, columns: &[ResultColumn]) -> ServiceResult<Vec<Value>> {
    match row {
        Value::Object(map) => Ok(columns
            .iter()
            .map(|c| map.get(&c.name).cloned().unwrap_or(Value::Null))
            .collect()),
        Value::Array(values) => Ok((0..columns.len())
            .map(|i| values.get(i).cloned().unwrap_or(Value::Null))
            .collect()),
        other => Err(malformed(&format!("unexpected row shape: {}", other))),
    }
}

/// Power BI style type name for a column's non-null values
fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    let mut seen: Option<&'static str> = None;
    for value in values {
        let kind = match value {
            Value::Null => continue,
            Value::Bool(_) => "Boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "Int64",
            Value::Number(_) => "Double",
            Value::String(_) => "String",
            Value::Array(_) | Value::Object(_) => "Variant",
        };
        seen = match seen {
            None => Some(kind),
            Some(previous) if previous == kind => Some(kind),
            Some("Int64") if kind == "Double" => Some("Double"),
            Some("Double") if kind == "Int64" => Some("Double"),
            Some(_) => Some("Variant"),
        };
    }
    seen.unwrap_or("Unknown").to_string()
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_error(e: csv::Error) -> ServiceError {
    malformed(&format!("could not write CSV: {}", e))
}

fn malformed(message: &str) -> ServiceError {
    ServiceError::MalformedResponse(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_rows() -> Value {
        json!({
            "results": [{
                "tables": [{
                    "rows": [
                        {"Product[Name]": "Widget", "[Revenue]": 1200.5, "[Units]": 3},
                        {"Product[Name]": "Gadget", "[Revenue]": null, "[Units]": 7}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_columns_derived_from_first_row() {
        let result = QueryResult::from_response(&object_rows()).unwrap();
        assert_eq!(
            result.column_names(),
            vec!["Product[Name]", "[Revenue]", "[Units]"]
        );
        assert_eq!(result.rows[1], vec![json!("Gadget"), Value::Null, json!(7)]);
    }

    #[test]
    fn test_positional_rows_with_default_names() {
        let body = json!({
            "results": [{"tables": [{
                "columns": [{"name": "Region", "dataType": "String"}, {}],
                "rows": [["West", 10], ["East"]]
            }]}]
        });
        let result = QueryResult::from_response(&body).unwrap();
        assert_eq!(result.column_names(), vec!["Region", "Column_1"]);
        assert_eq!(result.rows[1], vec![json!("East"), Value::Null]);

        let summary = result.summary();
        assert_eq!(summary.data_types["Region"], "String");
        assert_eq!(summary.data_types["Column_1"], "Int64");
    }

    #[test]
    fn test_summary_infers_types() {
        let summary = QueryResult::from_response(&object_rows()).unwrap().summary();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 3);
        assert_eq!(summary.data_types["Product[Name]"], "String");
        assert_eq!(summary.data_types["[Revenue]"], "Double");
        assert_eq!(summary.data_types["[Units]"], "Int64");
    }

    #[test]
    fn test_csv_and_json_output() {
        let result = QueryResult::from_response(&object_rows()).unwrap();
        let csv = result.to_csv().unwrap();
        assert_eq!(
            csv,
            "Product[Name],[Revenue],[Units]\nWidget,1200.5,3\nGadget,,7\n"
        );

        let records: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(records[0]["Product[Name]"], "Widget");
        assert_eq!(records[1]["[Revenue]"], Value::Null);
    }

    #[test]
    fn test_empty_table() {
        let body = json!({"results": [{"tables": [{"rows": []}]}]});
        let result = QueryResult::from_response(&body).unwrap();
        assert!(result.is_empty());
        assert!(result.columns.is_empty());
        assert_eq!(result.summary().rows, 0);
    }

    #[test]
    fn test_missing_results_is_malformed() {
        assert!(matches!(
            QueryResult::from_response(&json!({})),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_result_level_error() {
        let body = json!({"results": [{"error": {"code": "DatasetExecuteQueriesError"}}]});
        assert!(matches!(
            QueryResult::from_response(&body),
            Err(ServiceError::DaxSyntax { .. })
        ));
    }
}
