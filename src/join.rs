//! Inner join of orders and order items

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::data::{Order, OrderItem};

/// An (order, item) pair sharing the same `order_id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedOrder {
    pub order_id: String,
    pub customer_id: String,
    pub order_purchase_timestamp: String,
    pub order_status: Option<String>,
    pub order_item_id: Option<i64>,
    pub product_id: Option<String>,
    pub price: f64,
    pub freight_value: Option<f64>,
}

impl JoinedOrder {
    fn new(order: &Order, item: &OrderItem) -> Self {
        Self {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            order_purchase_timestamp: order.order_purchase_timestamp.clone(),
            order_status: order.order_status.clone(),
            order_item_id: item.order_item_id,
            product_id: item.product_id.clone(),
            price: item.price,
            freight_value: item.freight_value,
        }
    }
}

/// Join orders with their items on `order_id`.
///
/// Rows follow the orders' order, then the items' order within each order.
/// Orders without items and items without a known order are dropped.
pub fn join_orders(orders: &[Order], items: &[OrderItem]) -> crate::Result<Vec<JoinedOrder>> {
    let order_keys = df!(
        "order_row" => (0..orders.len() as i64).collect::<Vec<_>>(),
        "order_id" => orders.iter().map(|o| o.order_id.as_str()).collect::<Vec<_>>()
    )?;
    let item_keys = df!(
        "item_row" => (0..items.len() as i64).collect::<Vec<_>>(),
        "order_id" => items.iter().map(|i| i.order_id.as_str()).collect::<Vec<_>>()
    )?;

    let pairs = order_keys
        .lazy()
        .inner_join(item_keys.lazy(), col("order_id"), col("order_id"))
        .collect()?;

    let order_rows: Vec<i64> = pairs.column("order_row")?.i64()?.into_no_null_iter().collect();
    let item_rows: Vec<i64> = pairs.column("item_row")?.i64()?.into_no_null_iter().collect();
    let mut matched: Vec<(usize, usize)> = order_rows
        .into_iter()
        .zip(item_rows)
        .map(|(order_row, item_row)| (order_row as usize, item_row as usize))
        .collect();
    matched.sort_unstable();

    let joined: Vec<JoinedOrder> = matched
        .into_iter()
        .map(|(order_row, item_row)| JoinedOrder::new(&orders[order_row], &items[item_row]))
        .collect();

    debug!(
        orders = orders.len(),
        items = items.len(),
        joined = joined.len(),
        "joined orders with items"
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn order(id: &str, customer: &str) -> Order {
        Order {
            order_id: id.to_string(),
            customer_id: customer.to_string(),
            order_purchase_timestamp: "2024-01-05 00:00:00".to_string(),
            order_status: None,
        }
    }

    fn item(order_id: &str, price: f64) -> OrderItem {
        OrderItem {
            order_id: order_id.to_string(),
            order_item_id: None,
            product_id: None,
            price,
            freight_value: None,
        }
    }

    #[test]
    fn test_single_match() {
        let joined = join_orders(&[order("o1", "c1")], &[item("o1", 100.0)]).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].customer_id, "c1");
        assert_eq!(joined[0].price, 100.0);
    }

    #[test]
    fn test_orphans_dropped_on_both_sides() {
        let orders = vec![order("o1", "c1"), order("o2", "c2"), order("o3", "c3")];
        let items = vec![item("o1", 10.0), item("o9", 5.0), item("o1", 20.0), item("o3", 7.0)];

        let joined = join_orders(&orders, &items).unwrap();

        let order_ids: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        let item_ids: HashSet<&str> = items.iter().map(|i| i.order_id.as_str()).collect();
        assert!(joined
            .iter()
            .all(|row| order_ids.contains(row.order_id.as_str()) && item_ids.contains(row.order_id.as_str())));

        let ids: Vec<&str> = joined.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o1", "o3"]);
        assert_eq!(joined[1].price, 20.0);
    }

    #[test]
    fn test_ids_are_matched_as_text() {
        let orders = vec![order("012", "c1"), order("12", "c2")];
        let items = vec![item("12", 1.0), item("012", 2.0)];

        let joined = join_orders(&orders, &items).unwrap();
        let pairs: Vec<(&str, f64)> = joined.iter().map(|r| (r.customer_id.as_str(), r.price)).collect();
        assert_eq!(pairs, vec![("c1", 2.0), ("c2", 1.0)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(join_orders(&[], &[item("o1", 1.0)]).unwrap().is_empty());
        assert!(join_orders(&[order("o1", "c1")], &[]).unwrap().is_empty());
    }
}
