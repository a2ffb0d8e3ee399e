//! Space-time subsets: raw windows, binned time series, depth profiles and sections.

use crate::catalog::is_climatology_name;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::procedure::{BoundingBox, Interval, StoredProcCall, SubsetProcedure};
use crate::table::Table;

impl Client {
    /// Observations of `variable` inside `bbox`, ordered by time, lat, lon, depth.
    pub fn space_time(&self, table: &str, variable: &str, bbox: &BoundingBox) -> Result<Table> {
        self.subset(SubsetProcedure::SpaceTime, table, variable, bbox)
    }

    /// Spatially averaged time series, optionally re-binned.
    ///
    /// `interval` is one of the tokens accepted by [`Interval`]'s `FromStr`
    /// (`""` keeps the dataset's own resolution). Climatological datasets only
    /// support their native interval.
    pub fn time_series(
        &self,
        table: &str,
        variable: &str,
        bbox: &BoundingBox,
        interval: &str,
    ) -> Result<Table> {
        let interval: Interval = interval.parse()?;
        if interval != Interval::Native && is_climatology_name(table) {
            return Err(Error::invalid(format!(
                "{} is a climatology dataset; custom time series binning ({:?}) is not supported",
                table, interval
            )));
        }
        self.subset(interval.procedure(), table, variable, bbox)
    }

    /// Horizontally averaged profile against depth.
    pub fn depth_profile(&self, table: &str, variable: &str, bbox: &BoundingBox) -> Result<Table> {
        self.subset(SubsetProcedure::DepthProfile, table, variable, bbox)
    }

    /// Vertical section inside `bbox`.
    pub fn section(&self, table: &str, variable: &str, bbox: &BoundingBox) -> Result<Table> {
        self.subset(SubsetProcedure::Section, table, variable, bbox)
    }

    fn subset(
        &self,
        procedure: SubsetProcedure,
        table: &str,
        variable: &str,
        bbox: &BoundingBox,
    ) -> Result<Table> {
        let call = StoredProcCall::new(procedure, table, variable, bbox.clone());
        self.stored_proc(&call)
    }
}
