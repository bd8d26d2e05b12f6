//! Product categories ranked by average review score

use std::cmp::Ordering;

use polars::prelude::*;
use serde::Serialize;

use crate::data::ReviewProduct;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRankRow {
    pub category: String,
    pub average_review_score: f64,
    pub total_reviews: usize,
}

/// Rank categories by mean review score and keep the first `limit`.
///
/// Ties on the mean go to the category with more reviews, then to the
/// alphabetically smaller name.
pub fn rank_categories(reviews: &[ReviewProduct], limit: usize) -> crate::Result<Vec<CategoryRankRow>> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }

    let scores = df!(
        "category" => reviews
            .iter()
            .map(|r| r.product_category_name_english.as_str())
            .collect::<Vec<_>>(),
        "review_score" => reviews.iter().map(|r| r.review_score).collect::<Vec<f64>>()
    )?;

    let grouped = scores
        .lazy()
        .group_by([col("category")])
        .agg([
            col("review_score").mean().alias("average_review_score"),
            col("review_score").count().alias("total_reviews"),
        ])
        .collect()?;

    let categories: Vec<&str> = grouped.column("category")?.str()?.into_no_null_iter().collect();
    let averages: Vec<f64> = grouped
        .column("average_review_score")?
        .f64()?
        .into_no_null_iter()
        .collect();
    let totals: Vec<i64> = grouped
        .column("total_reviews")?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();

    let mut ranked: Vec<CategoryRankRow> = categories
        .into_iter()
        .zip(averages)
        .zip(totals)
        .map(|((category, average_review_score), total_reviews)| CategoryRankRow {
            category: category.to_string(),
            average_review_score,
            total_reviews: total_reviews as usize,
        })
        .collect();

    ranked.sort_by(compare_rank);
    ranked.truncate(limit);
    Ok(ranked)
}

fn compare_rank(a: &CategoryRankRow, b: &CategoryRankRow) -> Ordering {
    b.average_review_score
        .total_cmp(&a.average_review_score)
        .then_with(|| b.total_reviews.cmp(&a.total_reviews))
        .then_with(|| a.category.cmp(&b.category))
}
