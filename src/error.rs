//! Error and warning types shared by the loader, the pipeline stages and the charts

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the reporting pipeline.
///
/// Every variant names the table and/or column involved so the caller can tell
/// the user which input is wrong without inspecting the data.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("table `{table}` has no column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("cannot parse `{value}` in column `{column}` as a timestamp")]
    Parse { column: &'static str, value: String },

    #[error("table `{table}` has a missing or non-numeric `{column}` at row {row}")]
    NullValue {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl<E> From<DrawingAreaErrorKind<E>> for PipelineError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PipelineError::Render(err.to_string())
    }
}

/// Non-fatal conditions noticed while building a report.
///
/// Aggregations tolerate empty inputs and return empty outputs; these warnings
/// let the presentation layer explain why a view is blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    EmptyTable { table: &'static str },
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataWarning::EmptyTable { table } => write!(f, "table `{table}` has no rows"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_table_and_column() {
        let err = PipelineError::MissingColumn {
            table: "orders",
            column: "customer_id",
        };
        assert_eq!(err.to_string(), "table `orders` has no column `customer_id`");

        let err = PipelineError::Parse {
            column: "order_purchase_timestamp",
            value: "yesterday".to_string(),
        };
        assert!(err.to_string().contains("yesterday"));
        assert!(err.to_string().contains("order_purchase_timestamp"));
    }

    #[test]
    fn test_warning_display() {
        let warning = DataWarning::EmptyTable { table: "review_product" };
        assert_eq!(warning.to_string(), "table `review_product` has no rows");
    }
}
