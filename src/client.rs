use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{ClientConfig, Credential, load_config};
use crate::error::{Error, ErrorKind, Result, server_error};
use crate::procedure::StoredProcCall;
use crate::query::QueryParams;
use crate::store::{FileKeyStore, KeyStore};
use crate::table::Table;
use crate::transport::{HttpTransport, RetryingTransport, Transport};

/// Generic parameterized-query endpoint.
pub const QUERY_ROUTE: &str = "/api/data/query";
/// Stored-procedure endpoint.
pub const STORED_PROC_ROUTE: &str = "/api/data/sp";

const AUTH_HEADER: &str = "Authorization";
const AUTH_PREFIX: &str = "Api-Key ";

/// Blocking client for the CMAP data service.
///
/// Every call performs exactly one GET (plus any lookups the operation needs)
/// and returns a freshly decoded [`Table`]; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    api_key: Credential,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client from `CMAP_API_KEY` / `CMAP_API_URL`, falling back to
    /// the key stored in `~/.cmapapirc`.
    ///
    /// This is equivalent to `Client::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `api_key`/`url` arguments
    /// - environment variables `CMAP_API_KEY` / `CMAP_API_URL`
    /// - the key file (`CMAP_RC` or `~/.cmapapirc`)
    pub fn new(api_key: Option<String>, url: Option<String>) -> Result<Self> {
        let store = FileKeyStore::new()?;
        Self::with_store(api_key, url, &store)
    }

    /// Like [`Client::new`], with an explicit fallback key store.
    pub fn with_store(
        api_key: Option<String>,
        url: Option<String>,
        store: &dyn KeyStore,
    ) -> Result<Self> {
        let cfg = load_config(api_key, url, store)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&cfg)?);
        Ok(Self::with_transport(cfg, transport))
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(cfg: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: cfg.url,
            api_key: cfg.api_key,
            transport,
        }
    }

    /// Wraps the transport in a bounded retry policy for transient failures.
    pub fn with_retry(mut self, retry_max: usize, sleep_max: Duration) -> Self {
        self.transport = Arc::new(RetryingTransport::new(
            self.transport,
            retry_max,
            sleep_max,
        ));
        self
    }

    /// Replaces the in-memory API key used by subsequent requests.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Credential::new(key);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs a raw SQL query against the generic query endpoint.
    pub fn query(&self, sql: &str) -> Result<Table> {
        self.request(QUERY_ROUTE, &QueryParams::new().push("query", sql))
    }

    /// Executes one subset stored procedure.
    pub fn stored_proc(&self, call: &StoredProcCall) -> Result<Table> {
        let params = call.to_params()?;
        self.request(STORED_PROC_ROUTE, &params)
    }

    /// Performs one authenticated GET and decodes the body.
    ///
    /// Non-success statuses fail with [`ErrorKind::ServerError`]; the body is
    /// not decoded in that case.
    #[instrument(skip(self, params))]
    pub(crate) fn request(&self, route: &str, params: &QueryParams) -> Result<Table> {
        if self.api_key.is_empty() {
            return Err(Error::new(ErrorKind::MissingCredential(
                "API key is empty; set CMAP_API_KEY or call set_api_key".into(),
            )));
        }

        let url = self.build_url(route, params)?;
        let auth = format!("{}{}", AUTH_PREFIX, self.api_key.expose());

        debug!(url = %url, params = params.len(), "sending request");
        let resp = self.transport.get(url.as_str(), &[(AUTH_HEADER, auth.as_str())])?;

        if !resp.is_success() {
            warn!(status = resp.status, url = %url, "non-success response");
            return Err(server_error(resp.status, url.as_str(), &resp.body));
        }

        let table = Table::from_csv(&resp.body)?;
        debug!(rows = table.len(), columns = table.columns().len(), "response decoded");
        Ok(table)
    }

    fn build_url(&self, route: &str, params: &QueryParams) -> Result<Url> {
        let base = self.url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, route))?;
        let query = params.encode()?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}
