//! Table name resolution from leaf paths.

use crate::container::base_name;
use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Frame, Value};

/// Column added to every row of a frame whose path mentions a run.
pub const RUN_NUMBER_COLUMN: &str = "run_number";

/// Path markers that route leaves to fixed tables.
///
/// Markers are plain substrings of the leaf path; the final-profile marker wins over the history
/// marker when a path carries both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRules {
    /// Substring routing a leaf to [`Self::final_profile_table`].
    pub final_profile_marker: String,
    pub final_profile_table: String,
    /// Substring routing a leaf to [`Self::history_table`].
    pub history_marker: String,
    pub history_table: String,
    /// Substring that makes the path's digits a run number.
    pub run_marker: String,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            final_profile_marker: "final_profile1".to_string(),
            final_profile_table: "final_profile".to_string(),
            history_marker: "history1".to_string(),
            history_table: "history".to_string(),
            run_marker: "run".to_string(),
        }
    }
}

/// Where a leaf lands: the base table name (before versioning) and its run number, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub table: String,
    pub run_number: Option<i64>,
}

impl TableTarget {
    /// Add (or overwrite) the `run_number` column when this target carries one.
    pub fn apply(&self, frame: &mut Frame) {
        if let Some(run) = self.run_number {
            frame.set_constant_column(RUN_NUMBER_COLUMN, Value::Int64(run), DataType::Int64);
        }
    }
}

impl NamingRules {
    /// Resolve the table and run number for the leaf at `path`.
    ///
    /// ```
    /// use h5_ingest::tables::NamingRules;
    ///
    /// let rules = NamingRules::default();
    /// let t = rules.resolve("shot/final_profile1/run3").unwrap();
    /// assert_eq!(t.table, "final_profile");
    /// // Digits of the whole path: the marker's `1`, then `3`.
    /// assert_eq!(t.run_number, Some(13));
    ///
    /// assert_eq!(rules.resolve("calib/gain").unwrap().run_number, None);
    /// ```
    pub fn resolve(&self, path: &str) -> IngestionResult<TableTarget> {
        let table = if path.contains(&self.final_profile_marker) {
            self.final_profile_table.clone()
        } else if path.contains(&self.history_marker) {
            self.history_table.clone()
        } else {
            base_name(path).to_string()
        };

        let run_number = if path.contains(&self.run_marker) {
            Some(extract_run_number(path)?)
        } else {
            None
        };

        Ok(TableTarget { table, run_number })
    }
}

/// Every ASCII digit in `path`, concatenated in order and parsed as one integer.
///
/// This is a whole-path scan: `group7/run3` gives `73`, not `3`.
pub fn extract_run_number(path: &str) -> IngestionResult<i64> {
    let digits: String = path.chars().filter(char::is_ascii_digit).collect();
    digits.parse().map_err(|_| IngestionError::RunNumber {
        path: path.to_string(),
        digits,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_run_number, NamingRules, TableTarget};
    use crate::error::IngestionError;
    use crate::types::{DataType, Field, Frame, Schema, Value};

    #[test]
    fn markers_take_precedence_over_leaf_name() {
        let rules = NamingRules::default();
        assert_eq!(rules.resolve("a/final_profile1/temps").unwrap().table, "final_profile");
        assert_eq!(rules.resolve("a/history1/temps").unwrap().table, "history");
        assert_eq!(
            rules.resolve("history1/final_profile1/x").unwrap().table,
            "final_profile"
        );
        assert_eq!(rules.resolve("a/b/temps").unwrap().table, "temps");
        // `history2` is not the marker.
        assert_eq!(rules.resolve("a/history2/temps").unwrap().table, "temps");
    }

    #[test]
    fn run_number_concatenates_all_path_digits() {
        assert_eq!(extract_run_number("group7/run3").unwrap(), 73);
        assert_eq!(extract_run_number("run3History1/x").unwrap(), 31);
        let t = NamingRules::default().resolve("expA/run2").unwrap();
        assert_eq!(t, TableTarget { table: "run2".into(), run_number: Some(2) });
    }

    #[test]
    fn run_without_digits_is_an_error() {
        let err = NamingRules::default().resolve("g/runs/data").unwrap_err();
        assert!(matches!(err, IngestionError::RunNumber { .. }));
        assert!(extract_run_number("run99999999999999999999").is_err());
    }

    #[test]
    fn apply_overwrites_existing_run_number_column() {
        let mut frame = Frame::new(
            Schema::new(vec![
                Field::new("x", DataType::Float64),
                Field::new("run_number", DataType::Utf8),
            ]),
            vec![vec![Value::Float64(1.0), Value::Utf8("old".into())]],
        );
        TableTarget { table: "t".into(), run_number: Some(5) }.apply(&mut frame);
        assert_eq!(frame.column_count(), 2);
        assert_eq!(frame.schema.fields[1].data_type, DataType::Int64);
        assert_eq!(frame.rows[0][1], Value::Int64(5));

        TableTarget { table: "t".into(), run_number: None }.apply(&mut frame);
        assert_eq!(frame.rows[0][1], Value::Int64(5));
    }
}
