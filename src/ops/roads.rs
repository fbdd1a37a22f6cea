//! Geographic and timestamp mappers for road-traffic tables.
//!
//! Coordinates are `[longitude, latitude]` lists in degrees. Timestamps are
//! text in the compact `20171020T112237.427000` form (fraction optional) or
//! ISO 8601 with separators, and carry no time zone.

use crate::error::{PipelineError, Result};
use crate::operators::{Mapper, Rows, once_row};
use crate::Row;
use anyhow::anyhow;
use chrono::{NaiveDateTime, Timelike};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y%m%dT%H%M%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

fn timestamp(row: &Row, column: &str) -> Result<NaiveDateTime> {
    let text = row.require_str(column)?;
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| anyhow!("column `{column}`: unrecognized timestamp `{text}`").into())
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    delta
        .num_microseconds()
        .map_or(delta.num_seconds() as f64, |us| us as f64 / 1_000_000.0)
}

/// `(longitude, latitude)` in radians.
fn coordinates(row: &Row, column: &str) -> Result<(f64, f64)> {
    let value = row.require(column)?;
    match value.as_list() {
        Some([lon, lat]) => match (lon.as_f64(), lat.as_f64()) {
            (Some(lon), Some(lat)) => Ok((lon.to_radians(), lat.to_radians())),
            _ => Err(PipelineError::type_mismatch(column, "coordinate pair", value)),
        },
        _ => Err(PipelineError::type_mismatch(column, "coordinate pair", value)),
    }
}

/// How [`SphericalLength`] measures the great-circle distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Formula {
    #[default]
    Haversine,
    /// Spherical law of cosines; less accurate for very short edges.
    CosineLaw,
}

/// Great-circle distance in kilometres between two coordinate columns.
#[derive(Clone, Debug)]
pub struct SphericalLength {
    start: String,
    end: String,
    result: String,
    formula: Formula,
}

impl SphericalLength {
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            result: result.into(),
            formula: Formula::Haversine,
        }
    }

    #[must_use]
    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = formula;
        self
    }
}

impl Mapper for SphericalLength {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let (l1, f1) = coordinates(&row, &self.start)?;
        let (l2, f2) = coordinates(&row, &self.end)?;
        let angle = match self.formula {
            Formula::Haversine => {
                let dlat = ((f2 - f1) / 2.0).sin();
                let dlon = ((l2 - l1) / 2.0).sin();
                2.0 * (dlat * dlat + f1.cos() * f2.cos() * dlon * dlon).sqrt().asin()
            }
            Formula::CosineLaw => (f1.sin() * f2.sin() + f1.cos() * f2.cos() * (l2 - l1).cos())
                .clamp(-1.0, 1.0)
                .acos(),
        };
        row.insert(self.result.as_str(), EARTH_RADIUS_KM * angle);
        Ok(once_row(row))
    }
}

/// Abbreviated weekday (`Mon`..`Sun`) and hour of a timestamp column.
#[derive(Clone, Debug)]
pub struct WeekdayHour {
    timestamp: String,
    weekday: String,
    hour: String,
}

impl WeekdayHour {
    #[must_use]
    pub fn new(
        timestamp: impl Into<String>,
        weekday: impl Into<String>,
        hour: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            weekday: weekday.into(),
            hour: hour.into(),
        }
    }
}

impl Mapper for WeekdayHour {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let at = timestamp(&row, &self.timestamp)?;
        row.insert(self.weekday.as_str(), at.format("%a").to_string());
        row.insert(self.hour.as_str(), at.hour());
        Ok(once_row(row))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Seconds,
    Hours,
}

/// Time elapsed from one timestamp column to another, as a float.
#[derive(Clone, Debug)]
pub struct TimeDiff {
    start: String,
    end: String,
    result: String,
    unit: Unit,
}

impl TimeDiff {
    #[must_use]
    pub fn seconds(start: impl Into<String>, end: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            result: result.into(),
            unit: Unit::Seconds,
        }
    }

    #[must_use]
    pub fn hours(start: impl Into<String>, end: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            unit: Unit::Hours,
            ..Self::seconds(start, end, result)
        }
    }
}

impl Mapper for TimeDiff {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let seconds = seconds_between(timestamp(&row, &self.start)?, timestamp(&row, &self.end)?);
        let elapsed = match self.unit {
            Unit::Seconds => seconds,
            Unit::Hours => seconds / 3600.0,
        };
        row.insert(self.result.as_str(), elapsed);
        Ok(once_row(row))
    }
}

/// Weekday and hour of entering an edge plus seconds spent on it.
#[derive(Clone, Debug)]
pub struct TravelTime {
    enter: String,
    leave: String,
    duration: String,
    weekday: String,
    hour: String,
}

impl TravelTime {
    #[must_use]
    pub fn new(
        enter: impl Into<String>,
        leave: impl Into<String>,
        duration: impl Into<String>,
        weekday: impl Into<String>,
        hour: impl Into<String>,
    ) -> Self {
        Self {
            enter: enter.into(),
            leave: leave.into(),
            duration: duration.into(),
            weekday: weekday.into(),
            hour: hour.into(),
        }
    }
}

impl Mapper for TravelTime {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let enter = timestamp(&row, &self.enter)?;
        let leave = timestamp(&row, &self.leave)?;
        row.insert(self.weekday.as_str(), enter.format("%a").to_string());
        row.insert(self.hour.as_str(), enter.hour());
        row.insert(self.duration.as_str(), seconds_between(enter, leave));
        Ok(once_row(row))
    }
}

/// Speed in km/h from a length in kilometres and a duration in seconds.
#[derive(Clone, Debug)]
pub struct Speed {
    length: String,
    duration: String,
    result: String,
}

impl Speed {
    #[must_use]
    pub fn new(
        length: impl Into<String>,
        duration: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            length: length.into(),
            duration: duration.into(),
            result: result.into(),
        }
    }
}

impl Mapper for Speed {
    fn map(&self, mut row: Row) -> Result<Rows> {
        let km = row.require_f64(&self.length)?;
        let seconds = row.require_f64(&self.duration)?;
        if seconds == 0.0 {
            return Err(anyhow!("zero duration in `{}`", self.duration).into());
        }
        row.insert(self.result.as_str(), km / seconds * 3600.0);
        Ok(once_row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Value, row};

    fn point(lon: f64, lat: f64) -> Value {
        Value::List(vec![Value::float(lon), Value::float(lat)])
    }

    fn mapped(mapper: &impl Mapper, row: Row) -> Result<Row> {
        mapper
            .map(row)?
            .next()
            .unwrap_or_else(|| Err(anyhow!("no row").into()))
    }

    #[test]
    fn one_degree_of_equator() -> Result<()> {
        let edge = row! { "start" => point(0.0, 0.0), "end" => point(1.0, 0.0) };
        for formula in [Formula::Haversine, Formula::CosineLaw] {
            let mapper = SphericalLength::new("start", "end", "length").with_formula(formula);
            let km = mapped(&mapper, edge.clone())?.require_f64("length")?;
            assert!((km - EARTH_RADIUS_KM.to_radians()).abs() < 1e-9, "{formula:?}: {km}");
        }
        Ok(())
    }

    #[test]
    fn identical_points_are_zero_apart() -> Result<()> {
        let edge = row! { "start" => point(37.5, 55.7), "end" => point(37.5, 55.7) };
        let mapper = SphericalLength::new("start", "end", "length");
        assert_eq!(mapped(&mapper, edge)?.require_f64("length")?, 0.0);
        Ok(())
    }

    #[test]
    fn fraction_is_optional() -> Result<()> {
        let r = row! { "a" => "20171020T112237", "b" => "20171020T112238.5" };
        let out = mapped(&TimeDiff::seconds("a", "b", "t"), r)?;
        assert_eq!(out.require_f64("t")?, 1.5);
        Ok(())
    }

    #[test]
    fn bad_inputs_are_reported() {
        let err = mapped(
            &WeekdayHour::new("at", "weekday", "hour"),
            row! { "at" => "yesterday" },
        )
        .unwrap_err();
        assert!(err.to_string().contains("yesterday"), "{err}");

        let err = mapped(
            &SphericalLength::new("start", "end", "length"),
            row! { "start" => 1, "end" => point(0.0, 0.0) },
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::TypeMismatch { .. }));

        let err = mapped(&Speed::new("km", "s", "v"), row! { "km" => 1.0, "s" => 0 }).unwrap_err();
        assert!(matches!(err, PipelineError::Operator(_)));
    }
}
