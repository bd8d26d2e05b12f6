//! Raw table rows and CSV loading using Polars

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PipelineError;

pub const ORDERS_TABLE: &str = "orders";
pub const ORDER_ITEMS_TABLE: &str = "order_items";
pub const REVIEW_PRODUCT_TABLE: &str = "review_product";

/// One row of the orders table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    /// Kept as read; parsing happens in the pipeline
    pub order_purchase_timestamp: String,
    pub order_status: Option<String>,
}

/// One row of the order items table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub order_id: String,
    pub order_item_id: Option<i64>,
    pub product_id: Option<String>,
    pub price: f64,
    pub freight_value: Option<f64>,
}

/// One reviewed product with its English category name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewProduct {
    pub product_category_name_english: String,
    pub review_score: f64,
}

/// The three input tables of a report run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub review_products: Vec<ReviewProduct>,
}

/// Locations of the three CSV files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub orders: PathBuf,
    pub order_items: PathBuf,
    pub review_products: PathBuf,
}

impl DataPaths {
    /// Standard file names inside a data directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            orders: dir.join("orders_dataset.csv"),
            order_items: dir.join("order_items_dataset.csv"),
            review_products: dir.join("review_product_df.csv"),
        }
    }
}

/// Load all three tables.
///
/// # Arguments
/// * `paths` - Locations of the orders, order items and review CSV files
///
/// # Returns
/// The typed tables. Fails on the first missing file, missing required column
/// or null required value.
pub fn load_tables(paths: &DataPaths) -> crate::Result<Tables> {
    Ok(Tables {
        orders: load_orders(&paths.orders)?,
        order_items: load_order_items(&paths.order_items)?,
        review_products: load_review_products(&paths.review_products)?,
    })
}

pub fn load_orders(path: &Path) -> crate::Result<Vec<Order>> {
    let df = read_csv(path)?;
    let t = ORDERS_TABLE;

    let order_ids = required(t, "order_id", text_column(&df, t, "order_id")?)?;
    let customer_ids = required(t, "customer_id", text_column(&df, t, "customer_id")?)?;
    let timestamps = required(
        t,
        "order_purchase_timestamp",
        text_column(&df, t, "order_purchase_timestamp")?,
    )?;
    let statuses = optional_text_column(&df, "order_status")?;

    let orders: Vec<Order> = order_ids
        .into_iter()
        .zip(customer_ids)
        .zip(timestamps)
        .zip(statuses)
        .map(|(((order_id, customer_id), order_purchase_timestamp), order_status)| Order {
            order_id,
            customer_id,
            order_purchase_timestamp,
            order_status,
        })
        .collect();

    info!(table = t, rows = orders.len(), path = %path.display(), "loaded table");
    Ok(orders)
}

pub fn load_order_items(path: &Path) -> crate::Result<Vec<OrderItem>> {
    let df = read_csv(path)?;
    let t = ORDER_ITEMS_TABLE;

    let order_ids = required(t, "order_id", text_column(&df, t, "order_id")?)?;
    let prices = required(t, "price", float_column(&df, t, "price")?)?;
    let item_ids = optional_int_column(&df, "order_item_id")?;
    let product_ids = optional_text_column(&df, "product_id")?;
    let freight = optional_float_column(&df, "freight_value")?;

    let items: Vec<OrderItem> = order_ids
        .into_iter()
        .zip(prices)
        .zip(item_ids)
        .zip(product_ids)
        .zip(freight)
        .map(
            |((((order_id, price), order_item_id), product_id), freight_value)| OrderItem {
                order_id,
                order_item_id,
                product_id,
                price,
                freight_value,
            },
        )
        .collect();

    info!(table = t, rows = items.len(), path = %path.display(), "loaded table");
    Ok(items)
}

/// Rows without a category or a score are skipped; grouping and counting ignore them
pub fn load_review_products(path: &Path) -> crate::Result<Vec<ReviewProduct>> {
    let df = read_csv(path)?;
    let t = REVIEW_PRODUCT_TABLE;

    let categories = text_column(&df, t, "product_category_name_english")?;
    let scores = float_column(&df, t, "review_score")?;

    let total = categories.len();
    let reviews: Vec<ReviewProduct> = categories
        .into_iter()
        .zip(scores)
        .filter_map(|(category, score)| match (category, score) {
            (Some(product_category_name_english), Some(review_score)) => Some(ReviewProduct {
                product_category_name_english,
                review_score,
            }),
            _ => None,
        })
        .collect();

    if reviews.len() < total {
        debug!(
            table = t,
            skipped = total - reviews.len(),
            "skipped rows without category or score"
        );
    }
    info!(table = t, rows = reviews.len(), path = %path.display(), "loaded table");
    Ok(reviews)
}

/// Every column is read as text; typed columns are cast afterwards so ids keep
/// leading zeros and a late decimal cannot break inference.
fn read_csv(path: &Path) -> crate::Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn column<'a>(df: &'a DataFrame, table: &'static str, name: &'static str) -> crate::Result<&'a Series> {
    df.column(name)
        .map_err(|_| PipelineError::MissingColumn { table, column: name })
}

fn text_column(df: &DataFrame, table: &'static str, name: &'static str) -> crate::Result<Vec<Option<String>>> {
    let series = column(df, table, name)?.cast(&DataType::String)?;
    Ok(series.str()?.into_iter().map(|v| v.map(str::to_owned)).collect())
}

fn float_column(df: &DataFrame, table: &'static str, name: &'static str) -> crate::Result<Vec<Option<f64>>> {
    let series = column(df, table, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn optional_text_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    match df.column(name) {
        Ok(series) => {
            let series = series.cast(&DataType::String)?;
            Ok(series.str()?.into_iter().map(|v| v.map(str::to_owned)).collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn optional_int_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    match df.column(name) {
        Ok(series) => {
            let series = series.cast(&DataType::Int64)?;
            Ok(series.i64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn optional_float_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(series) => {
            let series = series.cast(&DataType::Float64)?;
            Ok(series.f64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

/// Reject nulls in a column the pipeline cannot do without
fn required<T>(table: &'static str, column: &'static str, values: Vec<Option<T>>) -> crate::Result<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| PipelineError::NullValue { table, column, row }))
        .collect()
}
