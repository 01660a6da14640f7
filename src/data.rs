//! Data loading for the daily and hourly usage tables using Polars

use crate::error::LoadError;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DAILY_TABLE: &str = "daily";
const HOURLY_TABLE: &str = "hourly";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Columns shared by both tables
const USAGE_COLUMNS: [&str; 10] = [
    "dteday",
    "weekday",
    "weathersit",
    "temp",
    "atemp",
    "hum",
    "windspeed",
    "casual",
    "registered",
    "cnt",
];

/// Weekend vs Weekday, derived from the weekday ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub const ALL: [DayType; 2] = [DayType::Weekday, DayType::Weekend];

    /// Ordinals 0 and 6 are the weekend, everything else is a weekday.
    pub fn from_weekday(weekday: i64) -> Self {
        match weekday {
            0 | 6 => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayType::Weekday => "Weekday",
            DayType::Weekend => "Weekend",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Weather severity bin, encoded 1..=4 in the source tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeatherSituation {
    Clear,
    MistCloudy,
    LightPrecipitation,
    HeavyPrecipitation,
}

impl WeatherSituation {
    pub const ALL: [WeatherSituation; 4] = [
        WeatherSituation::Clear,
        WeatherSituation::MistCloudy,
        WeatherSituation::LightPrecipitation,
        WeatherSituation::HeavyPrecipitation,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(WeatherSituation::Clear),
            2 => Some(WeatherSituation::MistCloudy),
            3 => Some(WeatherSituation::LightPrecipitation),
            4 => Some(WeatherSituation::HeavyPrecipitation),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            WeatherSituation::Clear => 1,
            WeatherSituation::MistCloudy => 2,
            WeatherSituation::LightPrecipitation => 3,
            WeatherSituation::HeavyPrecipitation => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherSituation::Clear => "Clear",
            WeatherSituation::MistCloudy => "Mist + Cloudy",
            WeatherSituation::LightPrecipitation => "Light Snow / Light Rain",
            WeatherSituation::HeavyPrecipitation => "Heavy Rain / Ice Pellets",
        }
    }
}

impl fmt::Display for WeatherSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the daily table
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Total rentals, expected to equal `casual + registered`
    pub count: u32,
    pub casual: u32,
    pub registered: u32,
    /// Normalized temperature
    pub temp: f64,
    /// Normalized felt temperature
    pub atemp: f64,
    pub humidity: f64,
    pub windspeed: f64,
    /// Opaque weekday ordinal as supplied by the source
    pub weekday: i64,
    pub weather: WeatherSituation,
}

impl DailyRecord {
    pub fn day_type(&self) -> DayType {
        DayType::from_weekday(self.weekday)
    }
}

/// One row of the hourly table
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRecord {
    pub date: NaiveDate,
    /// Hour of day in `0..=23`
    pub hour: u8,
    pub count: u32,
    pub casual: u32,
    pub registered: u32,
    pub temp: f64,
    pub atemp: f64,
    pub humidity: f64,
    pub windspeed: f64,
    pub weekday: i64,
    pub weather: WeatherSituation,
}

impl HourlyRecord {
    pub fn day_type(&self) -> DayType {
        DayType::from_weekday(self.weekday)
    }
}

/// Both tables, loaded once per session and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct BikeData {
    pub daily: Vec<DailyRecord>,
    pub hourly: Vec<HourlyRecord>,
}

impl BikeData {
    /// Daily rows whose total differs from `casual + registered`.
    ///
    /// The relationship is assumed by every view but never enforced, so the
    /// loader only reports these.
    pub fn total_mismatches(&self) -> Vec<&DailyRecord> {
        self.daily
            .iter()
            .filter(|r| u64::from(r.count) != u64::from(r.casual) + u64::from(r.registered))
            .collect()
    }
}

/// Session-scoped cache of the loaded tables.
///
/// The first successful [`DataCache::get`] parses both files; every later call
/// returns the same data. Dropping the cache is the only way to invalidate it.
#[derive(Debug)]
pub struct DataCache {
    day_path: PathBuf,
    hour_path: PathBuf,
    data: OnceCell<BikeData>,
}

impl DataCache {
    pub fn new(day_path: impl Into<PathBuf>, hour_path: impl Into<PathBuf>) -> Self {
        Self {
            day_path: day_path.into(),
            hour_path: hour_path.into(),
            data: OnceCell::new(),
        }
    }

    /// Cache that is already populated, never touching the filesystem
    pub fn preloaded(data: BikeData) -> Self {
        Self {
            day_path: PathBuf::new(),
            hour_path: PathBuf::new(),
            data: OnceCell::with_value(data),
        }
    }

    pub fn get(&self) -> Result<&BikeData, LoadError> {
        self.data
            .get_or_try_init(|| load_data(&self.day_path, &self.hour_path))
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }
}

/// Load both tables
///
/// # Arguments
/// * `day_path` - Path to the daily CSV
/// * `hour_path` - Path to the hourly CSV
///
/// # Returns
/// * `BikeData` with parsed records; any malformed input aborts the load
pub fn load_data(day_path: &Path, hour_path: &Path) -> Result<BikeData, LoadError> {
    let daily = load_daily(day_path)?;
    let hourly = load_hourly(hour_path)?;
    let data = BikeData { daily, hourly };

    let mismatches = data.total_mismatches();
    if !mismatches.is_empty() {
        warn!(
            rows = mismatches.len(),
            first = %mismatches[0].date,
            "daily totals differ from casual + registered"
        );
    }

    Ok(data)
}

/// Load the daily table
pub fn load_daily(path: &Path) -> Result<Vec<DailyRecord>, LoadError> {
    let df = read_table(DAILY_TABLE, path, &USAGE_COLUMNS)?;
    let usage = UsageColumns::extract(&Columns::new(DAILY_TABLE, &df))?;

    let records: Vec<DailyRecord> = (0..df.height())
        .map(|i| DailyRecord {
            date: usage.dates[i],
            count: usage.count[i],
            casual: usage.casual[i],
            registered: usage.registered[i],
            temp: usage.temp[i],
            atemp: usage.atemp[i],
            humidity: usage.humidity[i],
            windspeed: usage.windspeed[i],
            weekday: usage.weekdays[i],
            weather: usage.weather[i],
        })
        .collect();

    debug!(rows = records.len(), path = %path.display(), "loaded daily table");
    Ok(records)
}

/// Load the hourly table
pub fn load_hourly(path: &Path) -> Result<Vec<HourlyRecord>, LoadError> {
    let mut columns = USAGE_COLUMNS.to_vec();
    columns.push("hr");

    let df = read_table(HOURLY_TABLE, path, &columns)?;
    let table = Columns::new(HOURLY_TABLE, &df);
    let usage = UsageColumns::extract(&table)?;
    let hours = table.integers("hr", 0, 23)?;

    let records: Vec<HourlyRecord> = (0..df.height())
        .map(|i| HourlyRecord {
            date: usage.dates[i],
            hour: hours[i] as u8,
            count: usage.count[i],
            casual: usage.casual[i],
            registered: usage.registered[i],
            temp: usage.temp[i],
            atemp: usage.atemp[i],
            humidity: usage.humidity[i],
            windspeed: usage.windspeed[i],
            weekday: usage.weekdays[i],
            weather: usage.weather[i],
        })
        .collect();

    debug!(rows = records.len(), path = %path.display(), "loaded hourly table");
    Ok(records)
}

/// Scan a CSV lazily and project the required columns
fn read_table(
    table: &'static str,
    path: &Path,
    columns: &[&'static str],
) -> Result<DataFrame, LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            table,
            path: path.to_path_buf(),
        });
    }

    let csv_error = |source: PolarsError| LoadError::Csv { table, source };

    let mut frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()
        .map_err(csv_error)?;

    let schema = frame.collect_schema().map_err(csv_error)?;
    if let Some(column) = columns
        .iter()
        .copied()
        .find(|column| schema.get(column).is_none())
    {
        return Err(LoadError::MissingColumn { table, column });
    }

    frame
        .select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>())
        .collect()
        .map_err(csv_error)
}

/// Typed column access over a loaded frame, reporting 1-based data rows
struct Columns<'a> {
    table: &'static str,
    df: &'a DataFrame,
}

impl<'a> Columns<'a> {
    fn new(table: &'static str, df: &'a DataFrame) -> Self {
        Self { table, df }
    }

    fn malformed(&self, index: usize, column: &'static str, reason: impl Into<String>) -> LoadError {
        LoadError::MalformedRow {
            table: self.table,
            row: index + 1,
            column,
            reason: reason.into(),
        }
    }

    fn series(&self, column: &'static str, dtype: &DataType) -> Result<Series, LoadError> {
        let table = self.table;
        self.df
            .column(column)
            .map_err(|_| LoadError::MissingColumn { table, column })?
            .as_materialized_series()
            .cast(dtype)
            .map_err(|source| LoadError::Csv { table, source })
    }

    fn floats(&self, column: &'static str) -> Result<Vec<f64>, LoadError> {
        let series = self.series(column, &DataType::Float64)?;
        let values = series.f64().map_err(|source| LoadError::Csv {
            table: self.table,
            source,
        })?;

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(self.malformed(i, column, "missing or non-numeric value")),
            })
            .collect()
    }

    /// Whole numbers within `min..=max`
    fn integers(&self, column: &'static str, min: i64, max: i64) -> Result<Vec<i64>, LoadError> {
        self.floats(column)?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                if v.fract() != 0.0 {
                    return Err(self.malformed(i, column, format!("{v} is not a whole number")));
                }
                let v = v as i64;
                if v < min || v > max {
                    return Err(self.malformed(
                        i,
                        column,
                        format!("{v} is outside {min}..={max}"),
                    ));
                }
                Ok(v)
            })
            .collect()
    }

    fn counts(&self, column: &'static str) -> Result<Vec<u32>, LoadError> {
        Ok(self
            .integers(column, 0, i64::from(u32::MAX))?
            .into_iter()
            .map(|v| v as u32)
            .collect())
    }

    fn dates(&self, column: &'static str) -> Result<Vec<NaiveDate>, LoadError> {
        let series = self.series(column, &DataType::String)?;
        let values = series.str().map_err(|source| LoadError::Csv {
            table: self.table,
            source,
        })?;

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let raw = value.ok_or_else(|| self.malformed(i, column, "missing date"))?;
                NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                    .map_err(|e| self.malformed(i, column, format!("invalid date '{raw}': {e}")))
            })
            .collect()
    }
}

/// Parsed columns common to the daily and hourly tables
struct UsageColumns {
    dates: Vec<NaiveDate>,
    weekdays: Vec<i64>,
    weather: Vec<WeatherSituation>,
    temp: Vec<f64>,
    atemp: Vec<f64>,
    humidity: Vec<f64>,
    windspeed: Vec<f64>,
    casual: Vec<u32>,
    registered: Vec<u32>,
    count: Vec<u32>,
}

impl UsageColumns {
    fn extract(columns: &Columns<'_>) -> Result<Self, LoadError> {
        let weather = columns
            .integers("weathersit", i64::MIN, i64::MAX)?
            .into_iter()
            .enumerate()
            .map(|(i, code)| {
                WeatherSituation::from_code(code).ok_or_else(|| {
                    columns.malformed(i, "weathersit", format!("unknown weather code {code}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dates: columns.dates("dteday")?,
            weekdays: columns.integers("weekday", i64::MIN, i64::MAX)?,
            weather,
            temp: columns.floats("temp")?,
            atemp: columns.floats("atemp")?,
            humidity: columns.floats("hum")?,
            windspeed: columns.floats("windspeed")?,
            casual: columns.counts("casual")?,
            registered: columns.counts("registered")?,
            count: columns.counts("cnt")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DAY_HEADER: &str =
        "instant,dteday,season,yr,mnth,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";
    const HOUR_HEADER: &str =
        "instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn create_day_csv() -> NamedTempFile {
        write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,2,0.344167,0.363625,0.805833,0.160446,331,654,985",
            "2,2011-01-02,1,0,1,0,0,0,2,0.363478,0.353739,0.696087,0.248539,131,670,801",
            "3,2011-01-03,1,0,1,0,1,1,1,0.196364,0.189405,0.437273,0.248309,120,1229,1349",
        ])
    }

    fn create_hour_csv() -> NamedTempFile {
        write_csv(&[
            HOUR_HEADER,
            "1,2011-01-01,1,0,1,0,0,6,0,1,0.24,0.2879,0.81,0,3,13,16",
            "2,2011-01-01,1,0,1,1,0,6,0,1,0.22,0.2727,0.8,0,8,32,40",
            "3,2011-01-01,1,0,1,2,0,6,0,1,0.22,0.2727,0.8,0,5,27,32",
        ])
    }

    #[test]
    fn test_load_daily() {
        let file = create_day_csv();
        let records = load_daily(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
        assert_eq!((first.count, first.casual, first.registered), (985, 331, 654));
        assert_eq!(first.weekday, 6);
        assert_eq!(first.weather, WeatherSituation::MistCloudy);
        assert!((first.humidity - 0.805833).abs() < 1e-9);
        assert_eq!(records[2].weather, WeatherSituation::Clear);
    }

    #[test]
    fn test_load_hourly() {
        let file = create_hour_csv();
        let records = load_hourly(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.hour).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(records[1].count, 40);
        assert_eq!(records[1].day_type(), DayType::Weekend);
    }

    #[test]
    fn test_missing_file() {
        let result = load_daily(Path::new("/nonexistent/day.csv"));
        assert!(matches!(result, Err(LoadError::MissingFile { table: "daily", .. })));
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv(&[
            "dteday,weekday,weathersit,temp,atemp,hum,windspeed,casual,registered",
            "2011-01-01,6,2,0.34,0.36,0.80,0.16,331,654",
        ]);

        let result = load_daily(file.path());
        assert!(matches!(
            result,
            Err(LoadError::MissingColumn { column: "cnt", .. })
        ));
    }

    #[test]
    fn test_invalid_date_is_malformed() {
        let file = write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,2,0.34,0.36,0.80,0.16,331,654,985",
            "2,2011-02-30,1,0,1,0,0,0,2,0.36,0.35,0.69,0.24,131,670,801",
        ]);

        match load_daily(file.path()) {
            Err(LoadError::MalformedRow { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "dteday");
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_hour_out_of_range_is_malformed() {
        let file = write_csv(&[
            HOUR_HEADER,
            "1,2011-01-01,1,0,1,24,0,6,0,1,0.24,0.2879,0.81,0,3,13,16",
        ]);

        assert!(matches!(
            load_hourly(file.path()),
            Err(LoadError::MalformedRow { column: "hr", .. })
        ));
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let file = write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,2,0.34,0.36,0.80,0.16,-1,654,653",
        ]);

        assert!(matches!(
            load_daily(file.path()),
            Err(LoadError::MalformedRow { column: "casual", .. })
        ));
    }

    #[test]
    fn test_unknown_weather_code_is_malformed() {
        let file = write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,7,0.34,0.36,0.80,0.16,331,654,985",
        ]);

        assert!(matches!(
            load_daily(file.path()),
            Err(LoadError::MalformedRow { column: "weathersit", .. })
        ));
    }

    #[test]
    fn test_day_type_from_weekday() {
        assert_eq!(DayType::from_weekday(0), DayType::Weekend);
        assert_eq!(DayType::from_weekday(6), DayType::Weekend);
        for weekday in 1..=5 {
            assert_eq!(DayType::from_weekday(weekday), DayType::Weekday);
        }
        // Opaque ordinal: anything outside 0/6 counts as a weekday
        assert_eq!(DayType::from_weekday(7), DayType::Weekday);
        assert_eq!(DayType::from_weekday(-1), DayType::Weekday);
    }

    #[test]
    fn test_weekday_outside_week_loads_as_weekday() {
        let file = write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,-1,0,2,0.34,0.36,0.80,0.16,331,654,985",
            "2,2011-01-02,1,0,1,0,300,0,2,0.36,0.35,0.69,0.24,131,670,801",
        ]);

        let records = load_daily(file.path()).unwrap();
        assert_eq!(records[0].weekday, -1);
        assert_eq!(records[0].day_type(), DayType::Weekday);
        assert_eq!(records[1].weekday, 300);
        assert_eq!(records[1].day_type(), DayType::Weekday);
    }

    #[test]
    fn test_total_mismatches_flags_only_bad_rows() {
        let file = write_csv(&[
            DAY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,2,0.34,0.36,0.80,0.16,331,654,985",
            "2,2011-01-02,1,0,1,0,0,0,2,0.36,0.35,0.69,0.24,131,670,900",
        ]);

        let data = BikeData {
            daily: load_daily(file.path()).unwrap(),
            hourly: Vec::new(),
        };
        let mismatches = data.total_mismatches();

        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].date, NaiveDate::from_ymd_opt(2011, 1, 2).unwrap());
    }

    #[test]
    fn test_cache_loads_once() {
        let day = create_day_csv();
        let hour = create_hour_csv();
        let cache = DataCache::new(day.path(), hour.path());

        assert!(!cache.is_loaded());
        let first = cache.get().unwrap() as *const BikeData;
        assert!(cache.is_loaded());
        let second = cache.get().unwrap() as *const BikeData;

        assert_eq!(first, second);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let hour = create_hour_csv();
        let cache = DataCache::new("/nonexistent/day.csv", hour.path());

        assert!(cache.get().is_err());
        assert!(!cache.is_loaded());
    }
}
