//! Typed stored-procedure calls.
//!
//! Every subset procedure on the service takes the same eleven positional
//! arguments. [`StoredProcCall`] fixes that order so call sites cannot get it
//! wrong.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::query::QueryParams;

/// Space-time-depth window of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub dt1: String,
    pub dt2: String,
    pub lat1: f64,
    pub lat2: f64,
    pub lon1: f64,
    pub lon2: f64,
    pub depth1: f64,
    pub depth2: f64,
}

impl BoundingBox {
    /// Global window between two dates, surface only.
    pub fn new(dt1: impl Into<String>, dt2: impl Into<String>) -> Self {
        Self {
            dt1: dt1.into(),
            dt2: dt2.into(),
            lat1: -90.0,
            lat2: 90.0,
            lon1: -180.0,
            lon2: 180.0,
            depth1: 0.0,
            depth2: 0.0,
        }
    }

    pub fn lat(mut self, lat1: f64, lat2: f64) -> Self {
        self.lat1 = lat1;
        self.lat2 = lat2;
        self
    }

    pub fn lon(mut self, lon1: f64, lon2: f64) -> Self {
        self.lon1 = lon1;
        self.lon2 = lon2;
        self
    }

    pub fn depth(mut self, depth1: f64, depth2: f64) -> Self {
        self.depth1 = depth1;
        self.depth2 = depth2;
        self
    }

    /// Checks that every pair of bounds is ordered and that dates parse.
    pub fn validate(&self) -> Result<()> {
        let t1 = parse_time(&self.dt1)?;
        let t2 = parse_time(&self.dt2)?;
        if t1 > t2 {
            return Err(Error::invalid(format!(
                "dt1 ({}) must not be after dt2 ({})",
                self.dt1, self.dt2
            )));
        }
        ordered("lat", self.lat1, self.lat2)?;
        ordered("lon", self.lon1, self.lon2)?;
        ordered("depth", self.depth1, self.depth2)?;
        Ok(())
    }

    pub(crate) fn push_params(&self, params: QueryParams) -> QueryParams {
        params
            .push("dt1", self.dt1.as_str())
            .push("dt2", self.dt2.as_str())
            .push("lat1", self.lat1)
            .push("lat2", self.lat2)
            .push("lon1", self.lon1)
            .push("lon2", self.lon2)
            .push("depth1", self.depth1)
            .push("depth2", self.depth2)
    }
}

fn ordered(name: &str, lo: f64, hi: f64) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(Error::invalid(format!("{} bounds must be finite", name)));
    }
    if lo > hi {
        return Err(Error::invalid(format!(
            "{name}1 ({lo}) must not exceed {name}2 ({hi})"
        )));
    }
    Ok(())
}

fn parse_time(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| Error::invalid(format!("unrecognized date/time: {:?}", s)))
}

/// Temporal aggregation of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    /// The dataset's own resolution.
    Native,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Interval {
    pub fn procedure(self) -> SubsetProcedure {
        match self {
            Interval::Native => SubsetProcedure::TimeSeries,
            Interval::Weekly => SubsetProcedure::Weekly,
            Interval::Monthly => SubsetProcedure::Monthly,
            Interval::Quarterly => SubsetProcedure::Quarterly,
            Interval::Annual => SubsetProcedure::Annual,
        }
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Interval::Native),
            "w" | "week" | "weekly" => Ok(Interval::Weekly),
            "m" | "month" | "monthly" => Ok(Interval::Monthly),
            "q" | "s" | "season" | "seasonal" | "seasonality" | "quarterly" => {
                Ok(Interval::Quarterly)
            }
            "y" | "a" | "year" | "yearly" | "annual" => Ok(Interval::Annual),
            other => Err(Error::invalid(format!(
                "unrecognized time series interval {:?} (expected '', weekly, monthly, quarterly or annual)",
                other
            ))),
        }
    }
}

/// Maps a free-text interval token to its binning procedure name.
pub fn interval_to_usp_name(interval: &str) -> Result<&'static str> {
    Ok(interval.parse::<Interval>()?.procedure().name())
}

/// Server-side subset procedures sharing the eleven-argument signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsetProcedure {
    SpaceTime,
    TimeSeries,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
    DepthProfile,
    Section,
}

impl SubsetProcedure {
    pub fn name(self) -> &'static str {
        match self {
            SubsetProcedure::SpaceTime => "uspSpaceTime",
            SubsetProcedure::TimeSeries => "uspTimeSeries",
            SubsetProcedure::Weekly => "uspWeekly",
            SubsetProcedure::Monthly => "uspMonthly",
            SubsetProcedure::Quarterly => "uspQuarterly",
            SubsetProcedure::Annual => "uspAnnual",
            SubsetProcedure::DepthProfile => "uspDepthProfile",
            SubsetProcedure::Section => "uspSectionMap",
        }
    }
}

impl fmt::Display for SubsetProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredProcCall {
    pub procedure: SubsetProcedure,
    pub table: String,
    pub variable: String,
    pub bbox: BoundingBox,
}

impl StoredProcCall {
    pub fn new(
        procedure: SubsetProcedure,
        table: impl Into<String>,
        variable: impl Into<String>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            procedure,
            table: table.into(),
            variable: variable.into(),
            bbox,
        }
    }

    /// Validated parameters in wire order:
    /// `tableName, fields, dt1, dt2, lat1, lat2, lon1, lon2, depth1, depth2, spName`.
    pub fn to_params(&self) -> Result<QueryParams> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid("table name must not be empty"));
        }
        if self.variable.trim().is_empty() {
            return Err(Error::invalid("variable name must not be empty"));
        }
        self.bbox.validate()?;

        let params = QueryParams::new()
            .push("tableName", self.table.as_str())
            .push("fields", self.variable.as_str());
        Ok(self
            .bbox
            .push_params(params)
            .push("spName", self.procedure.name()))
    }
}
