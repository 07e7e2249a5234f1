use crate::error::{AppError, Result};
use crate::models::StationRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use tracing::{debug, warn};

const NAME_COLUMN: &str = "Station_Names";
const LATITUDE_COLUMN: &str = "LATITUDE";
const LONGITUDE_COLUMN: &str = "LONGITUDE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub empty_rows: usize,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of non-empty rows that were dropped for missing required fields.
    pub fn rejection_rate(&self) -> f64 {
        let non_empty = self.total_rows - self.empty_rows;
        if non_empty > 0 {
            self.rejected as f64 / non_empty as f64
        } else {
            0.0
        }
    }
}

/// Maps header names to column positions so rows can be read in any column order.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self { index }
    }

    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn cell<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| row.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub struct Parser;

impl Parser {
    /// Parse an uploaded station CSV into records, in input order.
    ///
    /// Rows without a station name or without numeric coordinates are skipped.
    /// Every other numeric cell is best-effort and becomes `None` when malformed.
    /// Content that is not UTF-8 text fails as a whole.
    pub fn parse_csv(content: impl AsRef<[u8]>) -> Result<(Vec<StationRecord>, ParseStats)> {
        let text = std::str::from_utf8(content.as_ref())
            .map_err(|e| AppError::Parse(format!("CSV is not valid UTF-8 text: {}", e)))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = Columns::from_headers(&headers);

        for required in [NAME_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            if !columns.has(required) {
                warn!(
                    "CSV header has no '{}' column, every row will be skipped",
                    required
                );
            }
        }

        let mut records = Vec::new();
        let mut stats = ParseStats::new();

        for (row_num, row) in reader.records().enumerate() {
            let row = row?;
            stats.total_rows += 1;

            if row.iter().all(|cell| cell.trim().is_empty()) {
                stats.empty_rows += 1;
                continue;
            }

            match Self::parse_row(&columns, &row) {
                Ok(record) => {
                    records.push(record);
                    stats.accepted += 1;
                }
                Err(e) => {
                    stats.rejected += 1;
                    // Header is line 1, so data rows start at line 2
                    debug!("Skipping CSV row {}: {}", row_num + 2, e);
                }
            }
        }

        Ok((records, stats))
    }

    fn parse_row(columns: &Columns, row: &StringRecord) -> Result<StationRecord> {
        let name = columns
            .cell(row, NAME_COLUMN)
            .ok_or_else(|| AppError::InvalidData("missing station name".to_string()))?;
        let latitude = parse_coordinate(columns.cell(row, LATITUDE_COLUMN), LATITUDE_COLUMN)?;
        let longitude = parse_coordinate(columns.cell(row, LONGITUDE_COLUMN), LONGITUDE_COLUMN)?;

        let float = |column: &str| parse_optional_float(columns.cell(row, column));
        let int = |column: &str| parse_optional_int(columns.cell(row, column));

        Ok(StationRecord {
            name: name.to_string(),
            year: int("Year"),
            month: int("Month"),
            max_temp: float("Max_Temp"),
            min_temp: float("Min_Temp"),
            rainfall: float("Rainfall"),
            relative_humidity: float("Relative_Humidity"),
            wind_speed: float("Wind_Speed"),
            cloud_coverage: float("Cloud_Coverage"),
            bright_sunshine: float("Bright_Sunshine"),
            station_number: int("Station_Number"),
            x_cor: float("X_COR"),
            y_cor: float("Y_COR"),
            latitude,
            longitude,
            alt: float("ALT"),
            period: float("Period"),
        })
    }
}

fn parse_coordinate(s: Option<&str>, column: &str) -> Result<f64> {
    let s = s.ok_or_else(|| AppError::InvalidData(format!("missing {}", column)))?;
    parse_optional_float(Some(s))
        .ok_or_else(|| AppError::Parse(format!("{} '{}' is not a number", column, s)))
}

fn parse_optional_float(s: Option<&str>) -> Option<f64> {
    s.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite())
}

/// Integer cells also accept decimal text, truncated toward zero.
fn parse_optional_int(s: Option<&str>) -> Option<i32> {
    s.and_then(|s| {
        s.parse::<i32>().ok().or_else(|| {
            let val = parse_optional_float(Some(s))?;
            if val >= i32::MIN as f64 && val <= i32::MAX as f64 {
                Some(val.trunc() as i32)
            } else {
                None
            }
        })
    })
}
