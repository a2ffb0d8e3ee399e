use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cmapapi::{
    BoundingBox, Client, ClientConfig, ErrorKind, HttpResponse, Result, TargetLists, Tolerance,
    Transport,
};
use url::Url;

/// Replays canned responses in order and records every URL requested.
#[derive(Debug, Default)]
struct StubTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    urls: Mutex<Vec<Url>>,
}

impl StubTransport {
    fn new(bodies: &[(u16, &str)]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                bodies
                    .iter()
                    .map(|(status, body)| HttpResponse::new(*status, *body))
                    .collect(),
            ),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    fn url(&self, i: usize) -> Url {
        self.urls.lock().unwrap()[i].clone()
    }
}

impl Transport for StubTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        assert!(
            headers
                .iter()
                .any(|(k, v)| *k == "Authorization" && *v == "Api-Key test-key")
        );
        self.urls.lock().unwrap().push(Url::parse(url).unwrap());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request"))
    }
}

fn client(stub: &Arc<StubTransport>) -> Client {
    let cfg = ClientConfig::new("test-key").with_url("https://cmap.test");
    Client::with_transport(cfg, stub.clone())
}

fn pairs(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn param(url: &Url, key: &str) -> String {
    pairs(url)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("missing {key}"))
}

fn tol() -> Tolerance {
    Tolerance {
        temporal: 1.0,
        lat: 0.25,
        lon: 0.25,
        depth: 5.0,
    }
}

fn two_targets() -> TargetLists {
    TargetLists::new()
        .target("tblSST_AVHRR_OI_NRT", "sst", tol())
        .target("tblPisces_NRT", "Fe", tol())
}

#[test]
fn space_time_dispatches_one_stored_procedure_call() {
    let body = "time,lat,lon,depth,sst\n\
        2016-04-30,10.125,-179.875,0,27.1\n\
        2016-04-30,10.125,-179.625,0,27.3\n\
        2016-04-30,10.375,-179.875,0,27.0\n";
    let stub = StubTransport::new(&[(200, body)]);
    let bbox = BoundingBox::new("2016-04-30", "2016-04-30")
        .lat(10.0, 70.0)
        .lon(-180.0, -80.0)
        .depth(0.0, 0.0);

    let t = client(&stub)
        .space_time("tblsst_AVHRR_OI_NRT", "sst", &bbox)
        .unwrap();

    assert_eq!(stub.calls(), 1);
    let url = stub.url(0);
    assert_eq!(url.path(), "/api/data/sp");
    assert_eq!(
        pairs(&url),
        vec![
            ("tableName".to_string(), "tblsst_AVHRR_OI_NRT".to_string()),
            ("fields".into(), "sst".into()),
            ("dt1".into(), "2016-04-30".into()),
            ("dt2".into(), "2016-04-30".into()),
            ("lat1".into(), "10".into()),
            ("lat2".into(), "70".into()),
            ("lon1".into(), "-180".into()),
            ("lon2".into(), "-80".into()),
            ("depth1".into(), "0".into()),
            ("depth2".into(), "0".into()),
            ("spName".into(), "uspSpaceTime".into()),
        ]
    );
    assert!(!url.query().unwrap().ends_with('&'));

    assert_eq!(t.len(), 3);
    let key = |row| {
        (
            t.get_string(row, "time").unwrap(),
            t.get_f64(row, "lat").unwrap(),
            t.get_f64(row, "lon").unwrap(),
            t.get_f64(row, "depth").unwrap(),
        )
    };
    for row in 1..t.len() {
        assert!(key(row - 1) <= key(row), "rows not ordered at {row}");
    }
}

#[test]
fn non_success_status_is_a_server_error() {
    let stub = StubTransport::new(&[(500, "a,b\n1,2\n")]);
    let err = client(&stub).datasets().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ServerError { status: 500, .. }));

    let stub = StubTransport::new(&[(401, "Unauthorized")]);
    let err = client(&stub).get_catalog().unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn cruise_by_name_requires_exactly_one_match() {
    let stub = StubTransport::new(&[
        (200, "ID,Name,Nickname\n"),
        (200, "ID,Name,Nickname\n589,KM1906,Gradients 3\n"),
        (200, "ID,Name,Nickname\n589,KM1906,G3\n590,KM1906b,G3b\n"),
    ]);
    let c = client(&stub);

    let err = c.cruise_by_name("nowhere").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));

    let t = c.cruise_by_name("KM1906").unwrap();
    assert_eq!(t.get_i64(0, "ID"), Some(589));

    let err = c.cruise_by_name("KM19").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AmbiguousLookup(_)));

    assert_eq!(
        param(&stub.url(1), "query"),
        "EXEC uspCruiseByName 'KM1906'"
    );
}

#[test]
fn cruise_bounds_use_resolved_id() {
    let stub = StubTransport::new(&[
        (200, "ID,Name\n589,KM1906\n"),
        (200, "dt1,dt2,lat1,lat2,lon1,lon2\n2019-04-10,2019-05-01,21.3,42.3,-158.3,-156.9\n"),
    ]);
    let t = client(&stub).cruise_bounds("KM1906").unwrap();
    assert_eq!(t.get_f64(0, "lat2"), Some(42.3));
    assert_eq!(param(&stub.url(1), "query"), "EXEC uspCruiseBounds 589");
}

#[test]
fn get_dataset_refuses_above_row_limit() {
    let stub = StubTransport::new(&[
        (200, "Dataset_ID\n7\n"),
        (200, "JSON_stats\n\"{\"\"lat\"\":{\"\"count\"\":2000001}}\"\n"),
    ]);
    let err = client(&stub).get_dataset("tblBig").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::RowLimitExceeded {
            rows: 2_000_001,
            limit: 2_000_000,
            ..
        }
    ));
    assert!(err.to_string().contains("space_time"));
    assert_eq!(stub.calls(), 2);
}

#[test]
fn get_dataset_proceeds_at_row_limit() {
    let stub = StubTransport::new(&[
        (200, "Dataset_ID\n7\n"),
        (200, "JSON_stats\n\"{\"\"lat\"\":{\"\"count\"\":2000000}}\"\n"),
        (200, "time,lat,lon,x\n2016-01-01,1,2,3\n"),
    ]);
    let t = client(&stub).get_dataset("tblOk").unwrap();
    assert_eq!(t.len(), 1);
    assert_eq!(stub.calls(), 3);
    assert_eq!(param(&stub.url(2), "query"), "SELECT * FROM tblOk");
}

#[test]
fn get_dataset_without_estimate_is_unavailable() {
    let stub = StubTransport::new(&[(200, "Dataset_ID\n7\n"), (200, "JSON_stats\n")]);
    let err = client(&stub).get_dataset("tblNoStats").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DataUnavailable(_)));
    assert_eq!(stub.calls(), 2);
}

#[test]
fn time_series_binning_on_climatology() {
    let bbox = BoundingBox::new("2016-01-01", "2016-12-31");
    let stub = StubTransport::new(&[(200, "month,lat,lon,NO3\n1,0,0,1.5\n")]);
    let c = client(&stub);

    let err = c
        .time_series("tblDarwin_Nutrient_Climatology", "NO3", &bbox, "m")
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidParameter(_)));
    assert_eq!(stub.calls(), 0);

    c.time_series("tblDarwin_Nutrient_Climatology", "NO3", &bbox, "")
        .unwrap();
    assert_eq!(stub.calls(), 1);
    assert_eq!(param(&stub.url(0), "spName"), "uspTimeSeries");
}

#[test]
fn time_series_selects_binning_procedure() {
    let bbox = BoundingBox::new("2016-01-01", "2016-12-31");
    let stub = StubTransport::new(&[(200, "time,sst\n2016-01-01,20\n")]);
    let c = client(&stub);

    let err = c
        .time_series("tblsst_AVHRR_OI_NRT", "sst", &bbox, "fortnightly")
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidParameter(_)));

    c.time_series("tblsst_AVHRR_OI_NRT", "sst", &bbox, "seasonal")
        .unwrap();
    assert_eq!(stub.calls(), 1);
    assert_eq!(param(&stub.url(0), "spName"), "uspQuarterly");
}

#[test]
fn match_with_misaligned_lists_never_dispatches() {
    let bbox = BoundingBox::new("2016-04-20", "2016-05-03").depth(0.0, 100.0);
    let stub = StubTransport::new(&[]);
    let c = client(&stub);

    let mut short = two_targets();
    short.temporal_tolerance.pop();
    let mut long = two_targets();
    long.lon_tolerance.push(0.5);

    for lists in [short, long] {
        let err = c
            .r#match("tblSeaFlow", "prochloro_abundance", &bbox, &lists)
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidParameter(_)));

        let err = c.along_track("KM1906", &lists, 0.0, 100.0).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidParameter(_)));
    }
    assert_eq!(stub.calls(), 0);
}

#[test]
fn match_sends_positional_target_lists() {
    let bbox = BoundingBox::new("2016-04-20", "2016-05-03")
        .lat(21.0, 45.0)
        .lon(-161.0, -155.0)
        .depth(0.0, 100.0);
    let stub = StubTransport::new(&[(200, "time,lat,lon,depth,prochloro_abundance,sst,Fe\n")]);

    let t = client(&stub)
        .r#match("tblSeaFlow", "prochloro_abundance", &bbox, &two_targets())
        .unwrap();
    assert!(t.is_empty());

    let url = stub.url(0);
    assert_eq!(url.path(), "/api/data/sp");
    assert_eq!(param(&url, "spName"), "uspMatch");
    assert_eq!(param(&url, "targetTables"), "tblSST_AVHRR_OI_NRT,tblPisces_NRT");
    assert_eq!(param(&url, "targetVars"), "sst,Fe");
    assert_eq!(param(&url, "latTolerance"), "0.25,0.25");
}

#[test]
fn along_track_matches_against_cruise_extent() {
    let stub = StubTransport::new(&[
        (200, "ID,Name\n589,KM1906\n"),
        (200, "dt1,dt2,lat1,lat2,lon1,lon2\n2019-04-10,2019-05-01,21.3,42.3,-158.3,-156.9\n"),
        (200, "time,lat,lon,depth,sst\n"),
    ]);

    client(&stub)
        .along_track("KM1906", &two_targets(), 0.0, 5.0)
        .unwrap();

    assert_eq!(stub.calls(), 3);
    let url = stub.url(2);
    assert_eq!(param(&url, "sourceTable"), "tblCruise_Trajectory");
    assert_eq!(param(&url, "sourceVar"), "589");
    assert_eq!(param(&url, "dt1"), "2019-04-10");
    assert_eq!(param(&url, "lat2"), "42.3");
    assert_eq!(param(&url, "depth2"), "5");
}

#[test]
fn along_track_unknown_cruise() {
    let stub = StubTransport::new(&[(200, "ID,Name\n")]);
    let err = client(&stub)
        .along_track("nowhere", &two_targets(), 0.0, 5.0)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));
    assert_eq!(stub.calls(), 1);
}

#[test]
fn along_track_ambiguous_cruise() {
    let stub = StubTransport::new(&[(200, "ID,Name\n589,KM1906\n590,KM1906b\n")]);
    let err = client(&stub)
        .along_track("KM1906", &two_targets(), 0.0, 5.0)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AmbiguousLookup(_)));
    assert_eq!(stub.calls(), 1);
}

#[test]
fn variable_lookups() {
    let stub = StubTransport::new(&[
        (200, "Unit,Short_Name\nC,sst\n"),
        (200, "Long_Name,Short_Name\n"),
        (200, "Spatial_Resolution\nIrregular\n"),
        (200, "RESULT\n\n"),
        (200, "RESULT\n8\n"),
        (200, "Reference\nref one\n\nref two\n"),
    ]);
    let c = client(&stub);

    assert_eq!(c.get_unit("tblsst_AVHRR_OI_NRT", "sst").unwrap(), "C");
    let err = c.get_var_long_name("tblsst_AVHRR_OI_NRT", "nope").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));
    assert!(!c.is_grid("tblSeaFlow", "prochloro_abundance").unwrap());
    assert!(!c.has_field("tblSeaFlow", "nope").unwrap());
    assert!(c.has_field("tblSeaFlow", "prochloro_abundance").unwrap());
    assert_eq!(
        c.get_references(12).unwrap(),
        vec!["ref one".to_string(), "ref two".to_string()]
    );
}

#[test]
fn quotes_in_names_are_escaped() {
    let stub = StubTransport::new(&[(200, "a\n")]);
    client(&stub).search_catalog("o'brien sst").unwrap();
    assert_eq!(
        param(&stub.url(0), "query"),
        "EXEC uspSearchCatalog 'o''brien sst'"
    );
}
