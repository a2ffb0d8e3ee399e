//! Colocation ("match") requests.
//!
//! A match joins a source dataset to one or more target datasets. Each target
//! carries its own temporal, latitude, longitude and depth tolerance; the join
//! itself runs on the server.

use tracing::debug;

use crate::client::{Client, STORED_PROC_ROUTE};
use crate::error::{Error, ErrorKind, Result};
use crate::procedure::BoundingBox;
use crate::query::QueryParams;
use crate::table::Table;

pub const MATCH_PROCEDURE: &str = "uspMatch";
/// Source table used when matching along a cruise track.
pub const CRUISE_TRAJECTORY_TABLE: &str = "tblCruise_Trajectory";

const LIST_SEPARATOR: &str = ",";

/// Per-target match window.
///
/// `temporal` is in days, or months when the target is a monthly climatology;
/// the server decides which.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub temporal: f64,
    pub lat: f64,
    pub lon: f64,
    /// Meters.
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub table: String,
    pub variable: String,
    pub tolerance: Tolerance,
}

/// Target tables, variables and tolerances as independent, position-aligned lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetLists {
    pub tables: Vec<String>,
    pub variables: Vec<String>,
    pub temporal_tolerance: Vec<f64>,
    pub lat_tolerance: Vec<f64>,
    pub lon_tolerance: Vec<f64>,
    pub depth_tolerance: Vec<f64>,
}

impl TargetLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one aligned entry to every list.
    pub fn target(
        mut self,
        table: impl Into<String>,
        variable: impl Into<String>,
        tolerance: Tolerance,
    ) -> Self {
        self.tables.push(table.into());
        self.variables.push(variable.into());
        self.temporal_tolerance.push(tolerance.temporal);
        self.lat_tolerance.push(tolerance.lat);
        self.lon_tolerance.push(tolerance.lon);
        self.depth_tolerance.push(tolerance.depth);
        self
    }

    /// Zips the lists into targets. All six lists must have the same non-zero
    /// length and every tolerance must be finite and non-negative.
    pub fn zip(&self) -> Result<Vec<Target>> {
        let n = self.tables.len();
        let lens = [
            ("targetVariables", self.variables.len()),
            ("temporalTolerance", self.temporal_tolerance.len()),
            ("latTolerance", self.lat_tolerance.len()),
            ("lonTolerance", self.lon_tolerance.len()),
            ("depthTolerance", self.depth_tolerance.len()),
        ];

        if n == 0 {
            return Err(Error::invalid("at least one target required"));
        }
        if let Some((name, len)) = lens.iter().find(|(_, len)| *len != n) {
            return Err(Error::invalid(format!(
                "mismatched target specification length: targetTables has {} entries, {} has {}",
                n, name, len
            )));
        }

        let mut targets = Vec::with_capacity(n);
        for i in 0..n {
            let tolerance = Tolerance {
                temporal: self.temporal_tolerance[i],
                lat: self.lat_tolerance[i],
                lon: self.lon_tolerance[i],
                depth: self.depth_tolerance[i],
            };
            for (name, v) in [
                ("temporal", tolerance.temporal),
                ("lat", tolerance.lat),
                ("lon", tolerance.lon),
                ("depth", tolerance.depth),
            ] {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::invalid(format!(
                        "tolerance must be numeric and non-negative ({} tolerance of target {} is {})",
                        name, i, v
                    )));
                }
            }
            targets.push(Target {
                table: identifier("target table", &self.tables[i])?,
                variable: identifier("target variable", &self.variables[i])?,
                tolerance,
            });
        }
        Ok(targets)
    }
}

// Targets travel as comma-joined lists, so names must not contain the separator.
fn identifier(what: &str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() || v.contains(LIST_SEPARATOR) {
        return Err(Error::invalid(format!(
            "{} {:?} must be non-empty and contain no {:?}",
            what, value, LIST_SEPARATOR
        )));
    }
    Ok(v.to_string())
}

/// A validated match request.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub source_table: String,
    pub source_variable: String,
    pub bbox: BoundingBox,
    pub targets: Vec<Target>,
}

impl MatchRequest {
    pub fn new(
        source_table: &str,
        source_variable: &str,
        bbox: BoundingBox,
        targets: &TargetLists,
    ) -> Result<Self> {
        let targets = targets.zip()?;
        bbox.validate()?;
        Ok(Self {
            source_table: identifier("source table", source_table)?,
            source_variable: identifier("source variable", source_variable)?,
            bbox,
            targets,
        })
    }

    /// Parameters for the match procedure. Per-target values are joined
    /// positionally, so entry `i` of every list belongs to target `i`.
    pub fn to_params(&self) -> QueryParams {
        let params = QueryParams::new()
            .push("sourceTable", self.source_table.as_str())
            .push("sourceVar", self.source_variable.as_str())
            .push("targetTables", joined(&self.targets, |t| t.table.clone()))
            .push("targetVars", joined(&self.targets, |t| t.variable.clone()));

        let temporal = joined(&self.targets, |t| t.tolerance.temporal.to_string());
        let lat = joined(&self.targets, |t| t.tolerance.lat.to_string());
        let lon = joined(&self.targets, |t| t.tolerance.lon.to_string());
        let depth = joined(&self.targets, |t| t.tolerance.depth.to_string());

        self.bbox
            .push_params(params)
            .push("temporalTolerance", temporal)
            .push("latTolerance", lat)
            .push("lonTolerance", lon)
            .push("depthTolerance", depth)
            .push("spName", MATCH_PROCEDURE)
    }
}

fn joined(targets: &[Target], f: impl Fn(&Target) -> String) -> String {
    targets
        .iter()
        .map(f)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

impl Client {
    /// Colocates `source_variable` of `source_table` with every target.
    ///
    /// All lists are validated before anything is sent.
    pub fn r#match(
        &self,
        source_table: &str,
        source_variable: &str,
        bbox: &BoundingBox,
        targets: &TargetLists,
    ) -> Result<Table> {
        let request = MatchRequest::new(source_table, source_variable, bbox.clone(), targets)?;
        self.match_request(&request)
    }

    pub fn match_request(&self, request: &MatchRequest) -> Result<Table> {
        debug!(
            source = %request.source_table,
            targets = request.targets.len(),
            "dispatching match"
        );
        self.request(STORED_PROC_ROUTE, &request.to_params())
    }

    /// Colocates the targets with a cruise track, using the cruise's own
    /// space-time extent and the given depth range.
    pub fn along_track(
        &self,
        cruise: &str,
        targets: &TargetLists,
        depth1: f64,
        depth2: f64,
    ) -> Result<Table> {
        targets.zip()?;

        let id = self.cruise_id(cruise)?;
        let bounds = self.query(&format!("EXEC uspCruiseBounds {}", id))?;

        let missing = |col: &str| {
            Error::new(ErrorKind::DataUnavailable(format!(
                "cruise bounds for {} lack {}",
                cruise, col
            )))
        };
        let text = |col: &str| bounds.get_string(0, col).ok_or_else(|| missing(col));
        let num = |col: &str| bounds.get_f64(0, col).ok_or_else(|| missing(col));

        let bbox = BoundingBox {
            dt1: text("dt1")?,
            dt2: text("dt2")?,
            lat1: num("lat1")?,
            lat2: num("lat2")?,
            lon1: num("lon1")?,
            lon2: num("lon2")?,
            depth1,
            depth2,
        };

        self.r#match(CRUISE_TRAJECTORY_TABLE, &id.to_string(), &bbox, targets)
    }
}
