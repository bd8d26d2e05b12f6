//! Recency, frequency and monetary (RFM) features over the most recent purchases,
//! and the best-customer leaderboard derived from them.

use std::cmp::Ordering;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::join::JoinedOrder;
use crate::stats::{self, HistogramBin};
use crate::timeline::{self, CUSTOMER_ID, MILLIS_PER_DAY, ORDER_ID, PRICE, PURCHASED_AT};

/// RFM features of one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRow {
    pub customer_id: String,
    /// Whole days between the window's latest purchase and the customer's latest purchase
    pub recency: i64,
    /// Item rows purchased in the window
    pub frequency: usize,
    /// Sum of item prices in the window
    pub monetary: f64,
}

/// Leaderboard rows share the RFM shape
pub type BestCustomerRow = RfmRow;

/// Cut-offs a customer has to meet on all three measures to count as a best customer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RfmThresholds {
    pub recency_p25: f64,
    pub frequency_p75: f64,
    pub monetary_p75: f64,
}

impl RfmThresholds {
    /// Quartile cut-offs of a population, `None` when it is empty
    pub fn from_population(rfm: &[RfmRow]) -> Option<Self> {
        let (recency, frequency, monetary) = columns(rfm);
        Some(Self {
            recency_p25: stats::quantile(&recency, 0.25)?,
            frequency_p75: stats::quantile(&frequency, 0.75)?,
            monetary_p75: stats::quantile(&monetary, 0.75)?,
        })
    }

    pub fn admits(&self, row: &RfmRow) -> bool {
        row.recency as f64 <= self.recency_p25
            && row.frequency as f64 >= self.frequency_p75
            && row.monetary >= self.monetary_p75
    }
}

/// Histograms of the three RFM measures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RfmDistributions {
    pub recency: Vec<HistogramBin>,
    pub frequency: Vec<HistogramBin>,
    pub monetary: Vec<HistogramBin>,
}

impl RfmDistributions {
    pub fn from_population(rfm: &[RfmRow], bins: usize) -> Self {
        let (recency, frequency, monetary) = columns(rfm);
        Self {
            recency: stats::histogram(&recency, bins),
            frequency: stats::histogram(&frequency, bins),
            monetary: stats::histogram(&monetary, bins),
        }
    }
}

fn columns(rfm: &[RfmRow]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let recency = rfm.iter().map(|r| r.recency as f64).collect();
    let frequency = rfm.iter().map(|r| r.frequency as f64).collect();
    let monetary = rfm.iter().map(|r| r.monetary).collect();
    (recency, frequency, monetary)
}

/// Per-customer RFM over the last `months` calendar months of purchases.
///
/// # Arguments
/// * `joined` - Joined order rows with raw purchase timestamps
/// * `months` - Length of the trailing window in calendar months
///
/// # Returns
/// One row per customer with purchases in the window, ordered by customer id.
/// Recency is measured in whole days against the latest purchase inside the
/// window.
pub fn build_rfm(joined: &[JoinedOrder], months: u32) -> crate::Result<Vec<RfmRow>> {
    let purchases = timeline::purchase_frame(joined)?;
    let Some(max_date) = timeline::latest(&purchases)? else {
        return Ok(Vec::new());
    };
    let one_month_ago = timeline::window_start(max_date, months);

    let recent = timeline::since(purchases, one_month_ago)?;
    let Some(window_max) = timeline::latest(&recent)? else {
        return Ok(Vec::new());
    };
    debug!(start = %one_month_ago, end = %window_max, rows = recent.height(), "rfm window");

    let rfm_df = recent
        .lazy()
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(PURCHASED_AT).max().alias("last_purchase"),
            col(ORDER_ID).count().alias("frequency"),
            col(PRICE).sum().alias("monetary"),
        ])
        .with_columns([
            ((lit(timeline::to_millis(window_max)) - col("last_purchase")) / lit(MILLIS_PER_DAY))
                .cast(DataType::Int64)
                .alias("recency"),
        ])
        .collect()?;

    let mut rows = rfm_rows(&rfm_df)?;
    rows.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    Ok(rows)
}

fn rfm_rows(df: &DataFrame) -> crate::Result<Vec<RfmRow>> {
    let customer_ids: Vec<&str> = df.column(CUSTOMER_ID)?.str()?.into_no_null_iter().collect();
    let recency: Vec<i64> = df.column("recency")?.i64()?.into_no_null_iter().collect();
    let frequency: Vec<i64> = df
        .column("frequency")?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();
    let monetary: Vec<f64> = df.column("monetary")?.f64()?.into_no_null_iter().collect();

    Ok(customer_ids
        .into_iter()
        .zip(recency)
        .zip(frequency)
        .zip(monetary)
        .map(|(((customer_id, recency), frequency), monetary)| RfmRow {
            customer_id: customer_id.to_string(),
            recency,
            frequency: frequency as usize,
            monetary,
        })
        .collect())
}

/// Customers in the top quartile of all three measures, best first, at most `limit`.
///
/// Quartiles come from the whole input population before filtering. Ordering is
/// monetary descending, then frequency descending, then recency ascending.
pub fn select_best_customers(rfm: &[RfmRow], limit: usize) -> Vec<BestCustomerRow> {
    let Some(thresholds) = RfmThresholds::from_population(rfm) else {
        return Vec::new();
    };

    let mut best: Vec<BestCustomerRow> = rfm
        .iter()
        .filter(|row| thresholds.admits(row))
        .cloned()
        .collect();

    best.sort_by(compare_best);
    best.truncate(limit);
    best
}

fn compare_best(a: &RfmRow, b: &RfmRow) -> Ordering {
    b.monetary
        .total_cmp(&a.monetary)
        .then_with(|| b.frequency.cmp(&a.frequency))
        .then_with(|| a.recency.cmp(&b.recency))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order_id: &str, customer_id: &str, ts: &str, price: f64) -> JoinedOrder {
        JoinedOrder {
            order_id: order_id.to_string(),
            customer_id: customer_id.to_string(),
            order_purchase_timestamp: ts.to_string(),
            order_status: None,
            order_item_id: None,
            product_id: None,
            price,
            freight_value: None,
        }
    }

    fn rfm(customer_id: &str, recency: i64, frequency: usize, monetary: f64) -> RfmRow {
        RfmRow {
            customer_id: customer_id.to_string(),
            recency,
            frequency,
            monetary,
        }
    }

    #[test]
    fn test_build_rfm() {
        let joined = vec![
            row("o1", "c1", "2018-08-29 10:00:00", 10.0),
            row("o1", "c1", "2018-08-29 10:00:00", 5.0),
            row("o2", "c2", "2018-08-10 09:00:00", 40.0),
            row("o3", "c2", "2018-08-20 23:00:00", 1.0),
            row("o4", "c3", "2018-06-01 00:00:00", 99.0),
        ];

        let out = build_rfm(&joined, 1).unwrap();
        assert_eq!(out, vec![rfm("c1", 0, 2, 15.0), rfm("c2", 8, 2, 41.0)]);
    }

    #[test]
    fn test_recency_truncates_partial_days() {
        let joined = vec![
            row("o1", "c1", "2018-08-29 10:00:00", 1.0),
            row("o2", "c2", "2018-08-27 10:00:01", 1.0),
        ];

        let out = build_rfm(&joined, 1).unwrap();
        assert_eq!(out[1].recency, 1);
        assert!(out.iter().all(|r| r.recency >= 0 && r.frequency >= 1));
    }

    #[test]
    fn test_window_start_is_inclusive() {
        // 2018-08-29 10:00 minus one month is 2018-07-29 10:00
        let joined = vec![
            row("o1", "latest", "2018-08-29 10:00:00", 1.0),
            row("o2", "start", "2018-07-29 10:00:00", 3.0),
            row("o3", "early", "2018-07-29 09:59:59", 7.0),
        ];

        let out = build_rfm(&joined, 1).unwrap();
        assert_eq!(out, vec![rfm("latest", 0, 1, 1.0), rfm("start", 31, 1, 3.0)]);
    }

    #[test]
    fn test_build_rfm_empty() {
        assert!(build_rfm(&[], 1).unwrap().is_empty());
    }

    #[test]
    fn test_only_top_monetary_clears_threshold() {
        let population = vec![
            rfm("a", 0, 1, 10.0),
            rfm("b", 0, 1, 20.0),
            rfm("c", 0, 1, 30.0),
            rfm("d", 0, 1, 40.0),
        ];

        let thresholds = RfmThresholds::from_population(&population).unwrap();
        assert_eq!(thresholds.monetary_p75, 32.5);

        let best = select_best_customers(&population, 5);
        assert_eq!(best, vec![rfm("d", 0, 1, 40.0)]);
    }

    #[test]
    fn test_leaderboard_order_and_limit() {
        let mut population: Vec<RfmRow> = (0..12).map(|i| rfm(&format!("low{i}"), 0, 3, 1.0)).collect();
        population.extend([
            rfm("a", 0, 3, 100.0),
            rfm("b", 0, 3, 100.0),
            rfm("c", 0, 4, 100.0),
            rfm("d", 0, 3, 200.0),
            rfm("e", 0, 3, 150.0),
            rfm("f", 0, 3, 120.0),
            rfm("g", 0, 3, 110.0),
        ]);

        let thresholds = RfmThresholds::from_population(&population).unwrap();
        assert_eq!(thresholds.monetary_p75, 100.0);
        assert_eq!(thresholds.frequency_p75, 3.0);

        let best = select_best_customers(&population, 5);
        let ids: Vec<&str> = best.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "e", "f", "g", "c"]);
    }

    #[test]
    fn test_recency_breaks_remaining_ties() {
        let mut population = vec![rfm("older", 1, 2, 50.0), rfm("recent", 0, 2, 50.0)];
        population.extend((0..6).map(|i| rfm(&format!("idle{i}"), 5, 1, 1.0)));

        let best = select_best_customers(&population, 5);
        let ids: Vec<&str> = best.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["recent", "older"]);
    }

    #[test]
    fn test_every_selected_row_meets_thresholds() {
        let population: Vec<RfmRow> = (0..40)
            .map(|i| rfm(&format!("c{i}"), (i % 7) as i64, 1 + i % 4, (i * 13 % 50) as f64))
            .collect();
        let thresholds = RfmThresholds::from_population(&population).unwrap();

        let best = select_best_customers(&population, 5);
        assert!(best.len() <= 5);
        assert!(best.iter().all(|r| thresholds.admits(r) && population.contains(r)));
        assert!(best.windows(2).all(|w| compare_best(&w[0], &w[1]) != Ordering::Greater));
    }

    #[test]
    fn test_select_from_empty_population() {
        assert!(select_best_customers(&[], 5).is_empty());
        assert_eq!(RfmThresholds::from_population(&[]), None);
    }

    #[test]
    fn test_distributions_cover_population() {
        let population = vec![rfm("a", 0, 1, 10.0), rfm("b", 3, 2, 20.0), rfm("c", 9, 1, 5.0)];
        let dist = RfmDistributions::from_population(&population, 30);
        assert_eq!(dist.recency.len(), 30);
        assert_eq!(dist.monetary.iter().map(|b| b.count).sum::<usize>(), 3);
    }
}
