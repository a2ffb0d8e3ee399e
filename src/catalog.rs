//! Catalog, dataset and variable lookups.

use serde::Deserialize;
use tracing::info;

use crate::client::Client;
use crate::error::{Error, ErrorKind, Result};
use crate::table::Table;
use crate::util::sql_literal;

/// Largest dataset `get_dataset` will download in one piece.
pub const MAX_DATASET_ROWS: u64 = 2_000_000;

pub const DEFAULT_HEAD_ROWS: usize = 5;

/// Naming-convention check for climatological datasets (monthly or seasonal
/// means rather than time-stamped observations).
pub fn is_climatology_name(table: &str) -> bool {
    table.to_ascii_lowercase().contains("climatology")
}

#[derive(Debug, Deserialize)]
struct DatasetStats {
    #[serde(default)]
    lat: Option<FieldStats>,
}

#[derive(Debug, Deserialize)]
struct FieldStats {
    #[serde(default)]
    count: Option<f64>,
}

impl Client {
    /// The full variable catalog.
    pub fn get_catalog(&self) -> Result<Table> {
        self.query("EXEC uspCatalog")
    }

    /// Catalog entries matching space separated keywords.
    pub fn search_catalog(&self, keywords: &str) -> Result<Table> {
        self.query(&format!("EXEC uspSearchCatalog {}", sql_literal(keywords)))
    }

    pub fn datasets(&self) -> Result<Table> {
        self.query("EXEC uspDatasets")
    }

    /// First `rows` records of a table.
    pub fn head(&self, table: &str, rows: usize) -> Result<Table> {
        self.query(&format!("EXEC uspHead {}, '{}'", sql_literal(table), rows))
    }

    pub fn columns(&self, table: &str) -> Result<Table> {
        self.query(&format!("EXEC uspColumns {}", sql_literal(table)))
    }

    /// Dataset ID owning `table`; exactly one must match.
    #[allow(non_snake_case)]
    pub fn get_dataset_ID(&self, table: &str) -> Result<i64> {
        let t = self.query(&format!(
            "SELECT DISTINCT(Dataset_ID) FROM dbo.tblVariables WHERE Table_Name={}",
            sql_literal(table)
        ))?;
        match t.len() {
            0 => Err(Error::new(ErrorKind::NotFound(format!(
                "invalid table name: {}",
                table
            )))),
            1 => t.get_i64(0, "Dataset_ID").ok_or_else(|| {
                Error::new(ErrorKind::DataUnavailable(format!(
                    "no Dataset_ID returned for {}",
                    table
                )))
            }),
            n => Err(Error::new(ErrorKind::AmbiguousLookup(format!(
                "{} datasets found for table {}; provide a more specific name",
                n, table
            )))),
        }
    }

    /// Downloads a whole table after checking the precomputed row estimate.
    ///
    /// Fails with [`ErrorKind::RowLimitExceeded`] above [`MAX_DATASET_ROWS`] and
    /// with [`ErrorKind::DataUnavailable`] when no estimate exists.
    pub fn get_dataset(&self, table: &str) -> Result<Table> {
        let dataset_id = self.get_dataset_ID(table)?;
        let rows = self.dataset_row_estimate(dataset_id)?;
        info!(table, dataset_id, rows, limit = MAX_DATASET_ROWS, "row count estimate");

        if rows > MAX_DATASET_ROWS {
            return Err(Error::new(ErrorKind::RowLimitExceeded {
                rows,
                limit: MAX_DATASET_ROWS,
                hint: format!(
                    "Retrieve a subset of {} with space_time (or time_series/depth_profile) instead",
                    table
                ),
            }));
        }

        self.query(&format!("SELECT * FROM {}", table))
    }

    fn dataset_row_estimate(&self, dataset_id: i64) -> Result<u64> {
        let unavailable = || {
            Error::new(ErrorKind::DataUnavailable(format!(
                "no row count estimate for dataset {}",
                dataset_id
            )))
        };

        let t = self.query(&format!(
            "SELECT JSON_stats FROM tblDataset_Stats WHERE Dataset_ID={}",
            dataset_id
        ))?;
        let raw = t.get_string(0, "JSON_stats").ok_or_else(unavailable)?;
        let stats: DatasetStats = serde_json::from_str(&raw).map_err(|e| {
            Error::with_source(
                ErrorKind::DataUnavailable(format!(
                    "unreadable statistics for dataset {}",
                    dataset_id
                )),
                e,
            )
        })?;

        let count = stats
            .lat
            .and_then(|f| f.count)
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(unavailable)?;
        Ok(count as u64)
    }

    pub fn get_dataset_metadata(&self, table: &str) -> Result<Table> {
        self.query(&format!(
            "SELECT * FROM dbo.udfDatasetMetadata({})",
            sql_literal(table)
        ))
    }

    /// The variable's row in `tblVariables`.
    pub fn get_var(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "SELECT * FROM tblVariables WHERE Table_Name={} AND Short_Name={}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }

    pub fn get_var_catalog(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "SELECT * FROM [dbo].udfCatalog() WHERE Table_Name={} AND Variable={}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }

    pub fn get_var_long_name(&self, table: &str, variable: &str) -> Result<String> {
        let t = self.variable_row("Long_Name", table, variable)?;
        Ok(t.get_string(0, "Long_Name").unwrap_or_default())
    }

    /// Unit of a variable; empty for dimensionless variables.
    pub fn get_unit(&self, table: &str, variable: &str) -> Result<String> {
        let t = self.variable_row("Unit", table, variable)?;
        Ok(t.get_string(0, "Unit").unwrap_or_default())
    }

    fn variable_row(&self, field: &str, table: &str, variable: &str) -> Result<Table> {
        let t = self.query(&format!(
            "SELECT {}, Short_Name FROM tblVariables WHERE Table_Name={} AND Short_Name={}",
            field,
            sql_literal(table),
            sql_literal(variable)
        ))?;
        if t.is_empty() {
            return Err(Error::new(ErrorKind::NotFound(format!(
                "variable {} not found in {}",
                variable, table
            ))));
        }
        Ok(t)
    }

    pub fn get_var_resolution(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "EXEC uspVariableResolution {}, {}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }

    pub fn get_var_coverage(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "EXEC uspVariableCoverage {}, {}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }

    pub fn get_var_stat(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "EXEC uspVariableStat {}, {}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }

    /// True if `table` has a column named `variable`.
    pub fn has_field(&self, table: &str, variable: &str) -> Result<bool> {
        let t = self.query(&format!(
            "SELECT COL_LENGTH({}, {}) AS RESULT",
            sql_literal(table),
            sql_literal(variable)
        ))?;
        Ok(t.get_string(0, "RESULT").is_some())
    }

    /// True if the variable is on a regular grid, false if irregularly sampled.
    pub fn is_grid(&self, table: &str, variable: &str) -> Result<bool> {
        let t = self.query(&format!(
            "SELECT RTRIM(LTRIM(Spatial_Resolution)) AS Spatial_Resolution FROM tblVariables \
             JOIN tblSpatial_Resolutions ON [tblVariables].Spatial_Res_ID=[tblSpatial_Resolutions].ID \
             WHERE Table_Name={} AND Short_Name={}",
            sql_literal(table),
            sql_literal(variable)
        ))?;
        let res = t.get_string(0, "Spatial_Resolution").ok_or_else(|| {
            Error::new(ErrorKind::NotFound(format!(
                "variable {} not found in {}",
                variable, table
            )))
        })?;
        Ok(!res.eq_ignore_ascii_case("irregular"))
    }

    /// Server-side climatology flag of the dataset owning `table`.
    pub fn is_climatology(&self, table: &str) -> Result<bool> {
        let t = self.query(&format!(
            "SELECT DISTINCT(d.Climatology) AS Climatology FROM tblDatasets d \
             JOIN tblVariables v ON d.ID=v.Dataset_ID WHERE v.Table_Name={}",
            sql_literal(table)
        ))?;
        if t.is_empty() {
            return Err(Error::new(ErrorKind::NotFound(format!(
                "invalid table name: {}",
                table
            ))));
        }
        let flag = t
            .get_string(0, "Climatology")
            .unwrap_or_default()
            .to_ascii_lowercase();
        Ok(flag == "1" || flag == "true")
    }

    /// Reference list of a dataset.
    pub fn get_references(&self, dataset_id: i64) -> Result<Vec<String>> {
        let t = self.query(&format!(
            "SELECT Reference FROM dbo.udfDatasetReferences({})",
            dataset_id
        ))?;
        Ok((0..t.len())
            .filter_map(|row| t.get_string(row, "Reference"))
            .collect())
    }

    /// Variable and dataset metadata for one variable.
    pub fn get_metadata(&self, table: &str, variable: &str) -> Result<Table> {
        self.query(&format!(
            "EXEC uspVariableMetaData {}, {}",
            sql_literal(table),
            sql_literal(variable)
        ))
    }
}
