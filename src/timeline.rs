//! Purchase timeline built from joined order rows
//!
//! Parsing never rewrites the joined table: each stage asks for its own
//! timeline and gets a fresh frame with the parsed time next to the ids.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::PipelineError;
use crate::join::JoinedOrder;

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
/// Purchase time in milliseconds since the Unix epoch
pub const PURCHASED_AT: &str = "purchased_at";
/// Calendar month as `year * 12 + month0`
pub const MONTH: &str = "month";
pub const PRICE: &str = "price";

pub const MILLIS_PER_DAY: i64 = 86_400_000;

const TIMESTAMP_COLUMN: &str = "order_purchase_timestamp";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a purchase timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, the `T`-separated form, both with optional
/// fractional seconds, RFC 3339 (converted to its naive UTC time) and bare dates.
pub fn parse_timestamp(raw: &str) -> crate::Result<NaiveDateTime> {
    let trimmed = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.naive_utc());
    }
    if let Some(ts) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }

    Err(PipelineError::Parse {
        column: TIMESTAMP_COLUMN,
        value: raw.to_string(),
    })
}

/// Parse every joined row into a purchase frame.
///
/// # Arguments
/// * `joined` - Joined order rows; left untouched
///
/// # Returns
/// One row per item with `order_id`, `customer_id`, `purchased_at`, `month`
/// and `price`. The first unparseable timestamp aborts.
pub fn purchase_frame(joined: &[JoinedOrder]) -> crate::Result<DataFrame> {
    let purchased_at = joined
        .iter()
        .map(|row| parse_timestamp(&row.order_purchase_timestamp))
        .collect::<crate::Result<Vec<_>>>()?;

    let frame = df!(
        ORDER_ID => joined.iter().map(|row| row.order_id.as_str()).collect::<Vec<_>>(),
        CUSTOMER_ID => joined.iter().map(|row| row.customer_id.as_str()).collect::<Vec<_>>(),
        PURCHASED_AT => purchased_at.iter().map(|ts| to_millis(*ts)).collect::<Vec<i64>>(),
        MONTH => purchased_at.iter().map(|ts| month_key(*ts)).collect::<Vec<i32>>(),
        PRICE => joined.iter().map(|row| row.price).collect::<Vec<f64>>()
    )?;
    Ok(frame)
}

/// Latest purchase time of a purchase frame, `None` when it has no rows
pub fn latest(purchases: &DataFrame) -> crate::Result<Option<NaiveDateTime>> {
    Ok(purchases.column(PURCHASED_AT)?.i64()?.max().map(from_millis))
}

/// Purchases at or after `start`
pub fn since(purchases: DataFrame, start: NaiveDateTime) -> crate::Result<DataFrame> {
    let recent = purchases
        .lazy()
        .filter(col(PURCHASED_AT).gt_eq(lit(to_millis(start))))
        .collect()?;
    Ok(recent)
}

pub fn to_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub fn from_millis(millis: i64) -> NaiveDateTime {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .unwrap_or(NaiveDateTime::MIN)
}

pub fn month_key(ts: NaiveDateTime) -> i32 {
    ts.year() * 12 + ts.month0() as i32
}

/// (`year`, `month`) of a month key, month counted from 1
pub fn month_of_key(key: i32) -> (i32, u32) {
    (key.div_euclid(12), key.rem_euclid(12) as u32 + 1)
}

/// Start of a trailing window of `months` calendar months ending at `latest`.
///
/// The day of month clamps to the end of a shorter month (31 March minus one
/// month is 28 or 29 February).
pub fn window_start(latest: NaiveDateTime, months: u32) -> NaiveDateTime {
    latest
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Last calendar day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = next_month(date.year(), date.month());
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Calendar month following (`year`, `month`)
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDate::from_ymd_opt(2018, 3, 7)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        assert_eq!(ts("2018-03-07 14:05:09"), expected);
        assert_eq!(ts("2018-03-07T14:05:09"), expected);
        assert_eq!(ts("2018-03-07T14:05:09Z"), expected);
        assert_eq!(ts(" 2018-03-07 14:05:09 "), expected);
        assert_eq!(
            ts("2018-03-07"),
            NaiveDate::from_ymd_opt(2018, 3, 7).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_error_keeps_value() {
        let err = parse_timestamp("not a date").unwrap_err();
        match err {
            PipelineError::Parse { column, value } => {
                assert_eq!(column, "order_purchase_timestamp");
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_window_start_clamps_day() {
        assert_eq!(window_start(ts("2018-03-31 12:00:00"), 1), ts("2018-02-28 12:00:00"));
        assert_eq!(window_start(ts("2018-08-31 00:00:00"), 6), ts("2018-02-28 00:00:00"));
        assert_eq!(window_start(ts("2018-09-03 09:00:00"), 6), ts("2018-03-03 09:00:00"));
    }

    fn joined(order_id: &str, ts: &str, price: f64) -> JoinedOrder {
        JoinedOrder {
            order_id: order_id.to_string(),
            customer_id: "c1".to_string(),
            order_purchase_timestamp: ts.to_string(),
            order_status: None,
            order_item_id: None,
            product_id: None,
            price,
            freight_value: None,
        }
    }

    #[test]
    fn test_purchase_frame() {
        let rows = vec![
            joined("o1", "2018-03-07 14:05:09", 10.0),
            joined("o2", "2018-04-01 00:00:00", 2.5),
        ];

        let frame = purchase_frame(&rows).unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(latest(&frame).unwrap(), Some(ts("2018-04-01 00:00:00")));

        let months: Vec<i32> = frame.column(MONTH).unwrap().i32().unwrap().into_no_null_iter().collect();
        assert_eq!(months.iter().map(|k| month_of_key(*k)).collect::<Vec<_>>(), vec![(2018, 3), (2018, 4)]);

        // the input rows keep their raw text
        assert_eq!(rows[0].order_purchase_timestamp, "2018-03-07 14:05:09");
    }

    #[test]
    fn test_empty_frame_has_no_latest() {
        let frame = purchase_frame(&[]).unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(latest(&frame).unwrap(), None);
    }

    #[test]
    fn test_since_keeps_start() {
        let rows = vec![
            joined("before", "2018-02-28 11:59:59", 1.0),
            joined("start", "2018-02-28 12:00:00", 1.0),
        ];

        let recent = since(purchase_frame(&rows).unwrap(), ts("2018-02-28 12:00:00")).unwrap();
        let ids: Vec<&str> = recent.column(ORDER_ID).unwrap().str().unwrap().into_no_null_iter().collect();
        assert_eq!(ids, vec!["start"]);
    }

    #[test]
    fn test_millis_round_trip() {
        let at = ts("2018-03-07 14:05:09.250");
        assert_eq!(from_millis(to_millis(at)), at);
        assert_eq!(month_of_key(month_key(ts("2023-12-31 23:59:59"))), (2023, 12));
    }

    #[test]
    fn test_month_end() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(month_end(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(month_end(date(2023, 12, 1)), date(2023, 12, 31));
        assert_eq!(month_end(date(2024, 4, 30)), date(2024, 4, 30));
    }
}
