use data_ingestion::fetcher::PriceBar;
use log::debug;
use polars::prelude::*;

use crate::error::FeatureError;
use crate::misc::{DAILY_RETURN, FIVE_DAY_MOVING_AVG, FeatureRow, THIRTY_DAY_MOVING_AVG};
use crate::scaler::MinMaxScaler;

const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 30;

/// Rows lost at the head of every series to the longest rolling window.
pub const WARMUP_ROWS: usize = LONG_WINDOW - 1;

#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub rows: Vec<FeatureRow>,
    /// Present when the rows were scaled.
    pub scaler: Option<MinMaxScaler>,
}

/// Computes daily return and moving averages, drops warm-up rows and
/// optionally min-max scales every feature column.
pub fn prepare_features(bars: &[PriceBar], scale: bool) -> Result<PreparedFeatures, FeatureError> {
    let rows = engineer_features(bars)?;
    debug!("{} bars produced {} feature rows", bars.len(), rows.len());

    if !scale || rows.is_empty() {
        return Ok(PreparedFeatures { rows, scaler: None });
    }

    let scaler = MinMaxScaler::fit(&rows)?;
    let rows = rows.iter().map(|row| scaler.transform(row)).collect();
    Ok(PreparedFeatures {
        rows,
        scaler: Some(scaler),
    })
}

/// Unscaled feature rows. Fewer than 30 bars yields no rows.
pub fn engineer_features(bars: &[PriceBar]) -> Result<Vec<FeatureRow>, FeatureError> {
    if bars.len() < LONG_WINDOW {
        return Ok(Vec::new());
    }

    let df = extract_features(to_dataframe(bars)?)?;

    let row_idx = df.column("row")?.i64()?;
    let open = df.column("open")?.f64()?;
    let high = df.column("high")?.f64()?;
    let low = df.column("low")?.f64()?;
    let close = df.column("close")?.f64()?;
    let volume = df.column("volume")?.f64()?;
    let daily_return = df.column(DAILY_RETURN)?.f64()?;
    let five_day = df.column(FIVE_DAY_MOVING_AVG)?.f64()?;
    let thirty_day = df.column(THIRTY_DAY_MOVING_AVG)?.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (
            Some(idx),
            Some(open),
            Some(high),
            Some(low),
            Some(close),
            Some(volume),
            Some(ret),
            Some(five),
            Some(thirty),
        ) = (
            row_idx.get(i),
            open.get(i),
            high.get(i),
            low.get(i),
            close.get(i),
            volume.get(i),
            daily_return.get(i),
            five_day.get(i),
            thirty_day.get(i),
        )
        else {
            continue;
        };

        rows.push(FeatureRow {
            date: bars.get(idx as usize).map(|bar| bar.date),
            open,
            high,
            low,
            close,
            volume,
            daily_return: ret,
            five_day_moving_avg: five,
            thirty_day_moving_avg: thirty,
        });
    }

    Ok(rows)
}

fn to_dataframe(bars: &[PriceBar]) -> PolarsResult<DataFrame> {
    let row: Vec<i64> = (0..bars.len() as i64).collect();
    let column = |f: fn(&PriceBar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();

    DataFrame::new(vec![
        Series::new("row", row),
        Series::new("open", column(|b| b.open)),
        Series::new("high", column(|b| b.high)),
        Series::new("low", column(|b| b.low)),
        Series::new("close", column(|b| b.close)),
        Series::new("volume", column(|b| b.volume as f64)),
    ])
}

fn rolling_window(size: usize) -> RollingOptions {
    RollingOptions {
        window_size: Duration::parse(&format!("{size}i")),
        min_periods: size,
        ..Default::default()
    }
}

fn extract_features(df: DataFrame) -> PolarsResult<DataFrame> {
    df.lazy()
        .with_columns([
            col("close").pct_change(lit(1)).alias(DAILY_RETURN),
            col("close")
                .rolling_mean(rolling_window(SHORT_WINDOW))
                .alias(FIVE_DAY_MOVING_AVG),
            col("close")
                .rolling_mean(rolling_window(LONG_WINDOW))
                .alias(THIRTY_DAY_MOVING_AVG),
        ])
        // Drop null values created by window operations
        .drop_nulls(None)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as Days, NaiveDate};

    fn bars(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3;
                PriceBar {
                    date: start + Days::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000 + (i as i64 * 37) % 500,
                }
            })
            .collect()
    }

    #[test]
    fn warmup_rows_are_dropped() {
        for n in [30, 31, 45, 120] {
            let rows = engineer_features(&bars(n)).unwrap();
            assert_eq!(rows.len(), n - WARMUP_ROWS, "n = {n}");
        }
    }

    #[test]
    fn short_history_yields_no_rows() {
        assert!(engineer_features(&bars(29)).unwrap().is_empty());
        assert!(engineer_features(&[]).unwrap().is_empty());
        assert!(prepare_features(&bars(10), true).unwrap().rows.is_empty());
    }

    #[test]
    fn daily_return_matches_previous_close() {
        let input = bars(40);
        let rows = engineer_features(&input).unwrap();

        for (offset, row) in rows.iter().enumerate() {
            let i = offset + WARMUP_ROWS;
            let expected = (input[i].close - input[i - 1].close) / input[i - 1].close;
            assert!((row.daily_return - expected).abs() < 1e-12);
            assert_eq!(row.date, Some(input[i].date));
        }
    }

    #[test]
    fn price_columns_follow_their_bars() {
        let input = bars(33);
        let rows = engineer_features(&input).unwrap();

        for (offset, row) in rows.iter().enumerate() {
            let bar = &input[offset + WARMUP_ROWS];
            assert_eq!(row.open, bar.open);
            assert_eq!(row.high, bar.high);
            assert_eq!(row.low, bar.low);
            assert_eq!(row.close, bar.close);
            assert_eq!(row.volume, bar.volume as f64);
        }
    }

    #[test]
    fn zero_close_cannot_be_scaled() {
        let mut input = bars(40);
        input[34].close = 0.0;

        assert!(matches!(
            prepare_features(&input, true),
            Err(FeatureError::NonFiniteValue { column: "daily_return", .. })
        ));
    }

    #[test]
    fn moving_averages_cover_trailing_windows() {
        let input = bars(35);
        let rows = engineer_features(&input).unwrap();

        let last = rows.last().unwrap();
        let closes: Vec<f64> = input.iter().map(|b| b.close).collect();
        let five: f64 = closes[30..35].iter().sum::<f64>() / 5.0;
        let thirty: f64 = closes[5..35].iter().sum::<f64>() / 30.0;

        assert!((last.five_day_moving_avg - five).abs() < 1e-9);
        assert!((last.thirty_day_moving_avg - thirty).abs() < 1e-9);
    }

    #[test]
    fn scaled_rows_carry_scaler() {
        let input = bars(60);
        let prepared = prepare_features(&input, true).unwrap();
        let scaler = prepared.scaler.expect("scaler");

        for row in &prepared.rows {
            for value in row.values() {
                assert!((0.0..=1.0).contains(&value));
            }
        }

        let unscaled = engineer_features(&input).unwrap();
        let restored = scaler.inverse_transform(&prepared.rows[3]);
        assert!((restored.close - unscaled[3].close).abs() < 1e-9);
    }
}
