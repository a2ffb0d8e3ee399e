//! Cruise lookups.

use crate::client::Client;
use crate::error::{Error, ErrorKind, Result};
use crate::table::Table;
use crate::util::sql_literal;

impl Client {
    /// All cruises in the database.
    pub fn cruises(&self) -> Result<Table> {
        self.query("EXEC uspCruises")
    }

    /// The single cruise whose name or alias matches `name`.
    ///
    /// Zero matches fail with [`ErrorKind::NotFound`], several with
    /// [`ErrorKind::AmbiguousLookup`].
    pub fn cruise_by_name(&self, name: &str) -> Result<Table> {
        let t = self.query(&format!("EXEC uspCruiseByName {}", sql_literal(name)))?;
        match t.len() {
            0 => Err(Error::new(ErrorKind::NotFound(format!(
                "unknown cruise: {}",
                name
            )))),
            1 => Ok(t),
            n => Err(Error::new(ErrorKind::AmbiguousLookup(format!(
                "{} cruises match {:?}; be more specific",
                n, name
            )))),
        }
    }

    /// Space-time extent of a cruise (`dt1, dt2, lat1, lat2, lon1, lon2`).
    pub fn cruise_bounds(&self, name: &str) -> Result<Table> {
        let id = self.cruise_id(name)?;
        self.query(&format!("EXEC uspCruiseBounds {}", id))
    }

    pub fn cruise_trajectory(&self, name: &str) -> Result<Table> {
        let id = self.cruise_id(name)?;
        self.query(&format!("EXEC uspCruiseTrajectory {}", id))
    }

    /// Variables measured during a cruise.
    pub fn cruise_variables(&self, name: &str) -> Result<Table> {
        let id = self.cruise_id(name)?;
        self.query(&format!("SELECT * FROM dbo.udfCruiseVariables({})", id))
    }

    pub(crate) fn cruise_id(&self, name: &str) -> Result<i64> {
        self.cruise_by_name(name)?.get_i64(0, "ID").ok_or_else(|| {
            Error::new(ErrorKind::DataUnavailable(format!(
                "cruise record for {} has no ID",
                name
            )))
        })
    }
}
