//! Derived tables: long-form user-type reshapes, hourly means and descriptive statistics

use crate::data::{DailyRecord, DayType, HourlyRecord};
use chrono::{Datelike, NaiveDate};
use polars::df;
use polars::prelude::*;
use std::fmt;

/// Casual vs registered riders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UserType {
    Casual,
    Registered,
}

impl UserType {
    pub const ALL: [UserType; 2] = [UserType::Casual, UserType::Registered];

    pub fn label(&self) -> &'static str {
        match self {
            UserType::Casual => "casual",
            UserType::Registered => "registered",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One long-form row: a date, a user type and that type's count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTypeCount {
    pub date: NaiveDate,
    pub user_type: UserType,
    pub count: u64,
}

/// Long-form row of counts summed per (date, day type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTypeUsage {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub user_type: UserType,
    pub count: u64,
}

/// Mean rentals for one hour-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyMean {
    pub hour: u8,
    pub mean: f64,
}

/// Mean-by-hour curve for one group (day type, weather situation, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile<K> {
    pub key: K,
    pub means: Vec<HourlyMean>,
}

/// Reshape casual/registered into one row per date and user type.
///
/// Yields `2 * records.len()` rows: every casual row in input order, then
/// every registered row.
pub fn melt_user_types(records: &[DailyRecord]) -> Vec<UserTypeCount> {
    UserType::ALL
        .iter()
        .flat_map(|&user_type| {
            records.iter().map(move |r| UserTypeCount {
                date: r.date,
                user_type,
                count: u64::from(match user_type {
                    UserType::Casual => r.casual,
                    UserType::Registered => r.registered,
                }),
            })
        })
        .collect()
}

/// Sum casual/registered per (date, day type), then reshape to long form.
///
/// Groups come out sorted by date then day type; every casual row precedes
/// every registered row.
pub fn usage_by_day_type(records: &[DailyRecord]) -> crate::Result<Vec<DayTypeUsage>> {
    let dates: Vec<i32> = records.iter().map(|r| r.date.num_days_from_ce()).collect();
    let day_types: Vec<u32> = records
        .iter()
        .map(|r| r.day_type() as u32)
        .collect();
    let casual: Vec<u64> = records.iter().map(|r| u64::from(r.casual)).collect();
    let registered: Vec<u64> = records.iter().map(|r| u64::from(r.registered)).collect();

    let long = df!(
        "dteday" => dates,
        "day_type" => day_types,
        "casual" => casual,
        "registered" => registered
    )?
    .lazy()
    .group_by([col("dteday"), col("day_type")])
    .agg([col("casual").sum(), col("registered").sum()])
    .sort(["dteday", "day_type"], SortMultipleOptions::default())
    .unpivot(UnpivotArgsDSL {
        on: vec!["casual".into(), "registered".into()],
        index: vec!["dteday".into(), "day_type".into()],
        variable_name: Some("user_type".into()),
        value_name: Some("count".into()),
    })
    .collect()?;

    let dates = long.column("dteday")?.as_materialized_series().i32()?;
    let day_types = long.column("day_type")?.as_materialized_series().u32()?;
    let user_types = long.column("user_type")?.as_materialized_series().str()?;
    let counts = long.column("count")?.as_materialized_series().u64()?;

    let usage = dates
        .into_iter()
        .zip(day_types)
        .zip(user_types)
        .zip(counts)
        .filter_map(|(((date, day_type), user_type), count)| {
            Some(DayTypeUsage {
                date: NaiveDate::from_num_days_from_ce_opt(date?)?,
                day_type: *DayType::ALL.get(day_type? as usize)?,
                user_type: *UserType::ALL.iter().find(|u| Some(u.label()) == user_type)?,
                count: count?,
            })
        })
        .collect();

    Ok(usage)
}

/// Mean count per hour of day across all rows
pub fn mean_by_hour(records: &[HourlyRecord]) -> crate::Result<Vec<HourlyMean>> {
    let profiles = hourly_profiles(records, |_| ())?;
    Ok(profiles
        .into_iter()
        .next()
        .map(|profile| profile.means)
        .unwrap_or_default())
}

/// Mean count per hour of day, one curve per distinct key.
///
/// Keys are returned in ascending order; a group only contains the hours
/// for which it has rows.
pub fn hourly_profiles<K, F>(records: &[HourlyRecord], key: F) -> crate::Result<Vec<HourlyProfile<K>>>
where
    K: Copy + Ord,
    F: Fn(&HourlyRecord) -> K,
{
    let keys: Vec<K> = records.iter().map(&key).collect();
    let mut distinct = keys.clone();
    distinct.sort();
    distinct.dedup();

    let group: Vec<i32> = keys
        .iter()
        .map(|k| distinct.binary_search(k).map_or(-1, |idx| idx as i32))
        .collect();
    let hours: Vec<i32> = records.iter().map(|r| i32::from(r.hour)).collect();
    let counts: Vec<f64> = records.iter().map(|r| f64::from(r.count)).collect();

    let aggregated = df!(
        "group" => group,
        "hr" => hours,
        "cnt" => counts
    )?
    .lazy()
    .group_by([col("group"), col("hr")])
    .agg([col("cnt").mean().alias("mean")])
    .sort(["group", "hr"], SortMultipleOptions::default())
    .collect()?;

    let groups = aggregated.column("group")?.as_materialized_series().i32()?;
    let hours = aggregated.column("hr")?.as_materialized_series().i32()?;
    let means = aggregated.column("mean")?.as_materialized_series().f64()?;

    let mut profiles: Vec<HourlyProfile<K>> = distinct
        .iter()
        .map(|&key| HourlyProfile {
            key,
            means: Vec::new(),
        })
        .collect();

    for ((group, hour), mean) in groups.into_iter().zip(hours).zip(means) {
        if let (Some(group), Some(hour), Some(mean)) = (group, hour, mean) {
            profiles[group as usize].means.push(HourlyMean {
                hour: hour as u8,
                mean,
            });
        }
    }

    Ok(profiles)
}

/// Summary statistics in the shape of a `describe()` table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single value
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Row names of a `describe()` table, in order
pub const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

fn statistic_exprs(name: &str) -> [Expr; 8] {
    let quantile = |q: f64| col(name).quantile(lit(q), QuantileMethod::Linear);
    [
        col(name).count(),
        col(name).mean(),
        col(name).std(1),
        col(name).min(),
        quantile(0.25),
        quantile(0.5),
        quantile(0.75),
        col(name).max(),
    ]
}

/// Describe every column in `columns`, `None` when the frame has no rows
pub fn describe(frame: LazyFrame, columns: &[&str]) -> crate::Result<Option<Vec<Summary>>> {
    let exprs: Vec<Expr> = columns
        .iter()
        .flat_map(|&name| {
            statistic_exprs(name)
                .into_iter()
                .zip(STATISTICS)
                .map(move |(expr, stat)| expr.cast(DataType::Float64).alias(format!("{name}/{stat}")))
        })
        .collect();
    let row = frame.select(exprs).collect()?;

    let mut summaries = Vec::with_capacity(columns.len());
    for name in columns {
        let value = |stat: &str| -> PolarsResult<f64> {
            Ok(row
                .column(&format!("{name}/{stat}"))?
                .as_materialized_series()
                .f64()?
                .get(0)
                .unwrap_or(f64::NAN))
        };

        let count = value("count")?;
        if count.is_nan() || count < 1.0 {
            return Ok(None);
        }
        summaries.push(Summary {
            count: count as usize,
            mean: value("mean")?,
            std: value("std")?,
            min: value("min")?,
            q25: value("25%")?,
            median: value("50%")?,
            q75: value("75%")?,
            max: value("max")?,
        });
    }

    Ok(Some(summaries))
}

/// Pearson correlation of `(x, y)` pairs, `None` when undefined
pub fn correlation(points: &[(f64, f64)]) -> crate::Result<Option<f64>> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();

    let out = df!("x" => xs, "y" => ys)?
        .lazy()
        .select([pearson_corr(col("x"), col("y")).alias("r")])
        .collect()?;

    let r = out.column("r")?.as_materialized_series().f64()?.get(0);
    Ok(r.filter(|r| r.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WeatherSituation;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2011, 1, day).unwrap()
    }

    fn day(d: u32, casual: u32, registered: u32, weekday: i64) -> DailyRecord {
        DailyRecord {
            date: date(d),
            count: casual + registered,
            casual,
            registered,
            temp: 0.3,
            atemp: 0.3,
            humidity: 0.5,
            windspeed: 0.2,
            weekday,
            weather: WeatherSituation::Clear,
        }
    }

    fn hour(h: u8, count: u32, weekday: i64, weather: WeatherSituation) -> HourlyRecord {
        HourlyRecord {
            date: date(1),
            hour: h,
            count,
            casual: 0,
            registered: count,
            temp: 0.3,
            atemp: 0.3,
            humidity: 0.5,
            windspeed: 0.2,
            weekday,
            weather,
        }
    }

    #[test]
    fn test_melt_preserves_rows_and_totals() {
        let records = vec![day(1, 30, 70, 6), day(2, 12, 400, 0), day(3, 5, 900, 3)];
        let melted = melt_user_types(&records);

        assert_eq!(melted.len(), 2 * records.len());
        let melted_sum: u64 = melted.iter().map(|r| r.count).sum();
        let input_sum: u64 = records
            .iter()
            .map(|r| u64::from(r.casual) + u64::from(r.registered))
            .sum();
        assert_eq!(melted_sum, input_sum);
        assert_eq!(
            melted.iter().filter(|r| r.user_type == UserType::Casual).count(),
            records.len()
        );
    }

    #[test]
    fn test_usage_by_day_type_sums_duplicate_dates() {
        let records = vec![day(1, 10, 20, 6), day(1, 1, 2, 6), day(3, 5, 9, 2)];
        let usage = usage_by_day_type(&records).unwrap();

        assert_eq!(usage.len(), 4);
        assert_eq!(
            usage[0],
            DayTypeUsage {
                date: date(1),
                day_type: DayType::Weekend,
                user_type: UserType::Casual,
                count: 11,
            }
        );
        assert_eq!(usage[1].day_type, DayType::Weekday);
        assert_eq!(usage[3].count, 9);
    }

    #[test]
    fn test_mean_by_hour_is_arithmetic_mean() {
        let records = vec![
            hour(8, 100, 1, WeatherSituation::Clear),
            hour(8, 300, 2, WeatherSituation::Clear),
            hour(8, 50, 0, WeatherSituation::MistCloudy),
            hour(17, 10, 3, WeatherSituation::Clear),
        ];
        let means = mean_by_hour(&records).unwrap();

        assert_eq!(
            means,
            vec![
                HourlyMean { hour: 8, mean: 150.0 },
                HourlyMean { hour: 17, mean: 10.0 },
            ]
        );
    }

    #[test]
    fn test_mean_by_hour_empty() {
        assert!(mean_by_hour(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_profiles_by_day_type() {
        let records = vec![
            hour(0, 10, 0, WeatherSituation::Clear),
            hour(0, 30, 6, WeatherSituation::Clear),
            hour(0, 4, 2, WeatherSituation::Clear),
            hour(1, 8, 3, WeatherSituation::Clear),
        ];
        let profiles = hourly_profiles(&records, HourlyRecord::day_type).unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].key, DayType::Weekday);
        assert_eq!(
            profiles[0].means,
            vec![HourlyMean { hour: 0, mean: 4.0 }, HourlyMean { hour: 1, mean: 8.0 }]
        );
        assert_eq!(profiles[1].key, DayType::Weekend);
        assert_eq!(profiles[1].means, vec![HourlyMean { hour: 0, mean: 20.0 }]);
    }

    #[test]
    fn test_profiles_by_weather_skip_absent_codes() {
        let records = vec![
            hour(3, 2, 1, WeatherSituation::Clear),
            hour(3, 6, 1, WeatherSituation::LightPrecipitation),
        ];
        let profiles = hourly_profiles(&records, |r| r.weather).unwrap();

        let keys: Vec<_> = profiles.iter().map(|p| p.key).collect();
        assert_eq!(
            keys,
            vec![WeatherSituation::Clear, WeatherSituation::LightPrecipitation]
        );
    }

    #[test]
    fn test_usage_by_day_type_long_form_order() {
        let records = vec![day(2, 3, 4, 3), day(1, 1, 2, 0)];
        let usage = usage_by_day_type(&records).unwrap();

        let order: Vec<_> = usage.iter().map(|u| (u.date, u.user_type, u.count)).collect();
        assert_eq!(
            order,
            vec![
                (date(1), UserType::Casual, 1),
                (date(2), UserType::Casual, 3),
                (date(1), UserType::Registered, 2),
                (date(2), UserType::Registered, 4),
            ]
        );
        assert!(usage_by_day_type(&[]).unwrap().is_empty());
    }

    fn values(values: &[f64]) -> LazyFrame {
        df!("v" => values.to_vec()).unwrap().lazy()
    }

    #[test]
    fn test_describe() {
        let summary = describe(values(&[4.0, 1.0, 3.0, 2.0]), &["v"]).unwrap().unwrap()[0];

        assert_eq!(summary.count, 4);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.std - 1.2909944487358056).abs() < 1e-12);
        assert_eq!((summary.min, summary.max), (1.0, 4.0));
        assert!((summary.q25 - 1.75).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.q75 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_describe_several_columns() {
        let frame = df!("a" => [1.0, 3.0], "b" => [10.0, 10.0]).unwrap().lazy();
        let summaries = describe(frame, &["a", "b"]).unwrap().unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].median, 2.0);
        assert_eq!(summaries[1].std, 0.0);
        assert_eq!(summaries[1].q75, 10.0);
    }

    #[test]
    fn test_describe_single_and_empty() {
        let single = describe(values(&[7.0]), &["v"]).unwrap().unwrap()[0];
        assert_eq!(single.count, 1);
        assert!(single.std.is_nan());
        assert_eq!(single.median, 7.0);

        assert!(describe(values(&[]), &["v"]).unwrap().is_none());
    }

    #[test]
    fn test_correlation() {
        let perfect = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!((correlation(&perfect).unwrap().unwrap() - 1.0).abs() < 1e-12);

        let inverse = [(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)];
        assert!((correlation(&inverse).unwrap().unwrap() + 1.0).abs() < 1e-12);

        let flat = [(1.0, 5.0), (2.0, 5.0)];
        assert!(correlation(&flat).unwrap().is_none());
    }
}
