use mockito::Server;
use nse_eod_sync::session::cookie_cache::CookieCache;
use nse_eod_sync::{
    Config, CookieJar, DateTracker, EodScraper, NseArchive, SessionClient, StoredCookie, SyncError,
    SyncService,
};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 标记为 2024-01-04（周四），并预置有效 Cookie，避免预热请求
fn prepare(server: &Server, dir: &Path) -> Config {
    let config = Config::new().with_data_dir(dir).with_base_url(&server.url());
    fs::write(config.marker_path(), "2024-01-04T00:00:00").unwrap();
    CookieCache::new(config.cookie_path())
        .store(&CookieJar::new(vec![StoredCookie::new(
            "nsit", "a", "127.0.0.1", "/", None,
        )]))
        .unwrap();
    config
}

fn archive_for(server: &Server) -> Box<dyn EodScraper> {
    Box::new(NseArchive::new(
        "TEST",
        &format!("{}/archives/eod_{{date}}.csv", server.url()),
    ))
}

#[test]
fn successful_sync_advances_marker() {
    let mut server = Server::new();
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(&server, dir.path());

    let archive = server
        .mock("GET", "/archives/eod_20240105.csv")
        .with_status(200)
        .with_body("SYMBOL,CLOSE\nINFY,1500\n")
        .expect(1)
        .create();

    let mut tracker = DateTracker::new(&config).unwrap();
    let session = SessionClient::new(&config).unwrap();
    let service = SyncService::new(vec![archive_for(&server)]);

    let outcome = service.sync_next(&mut tracker, &session).unwrap();

    archive.assert();
    assert_eq!(outcome.date, ymd(2024, 1, 5));
    assert_eq!(outcome.files, vec![dir.path().join("eod_20240105.csv")]);
    assert_eq!(tracker.marker(), ymd(2024, 1, 5));
    assert_eq!(
        fs::read_to_string(config.marker_path()).unwrap(),
        "2024-01-05T00:00:00"
    );
}

#[test]
fn http_failure_leaves_marker_untouched() {
    let mut server = Server::new();
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(&server, dir.path());

    let _archive = server
        .mock("GET", "/archives/eod_20240105.csv")
        .with_status(503)
        .create();

    let mut tracker = DateTracker::new(&config).unwrap();
    let session = SessionClient::new(&config).unwrap();
    let service = SyncService::new(vec![archive_for(&server)]);

    let err = service.sync_next(&mut tracker, &session).unwrap_err();

    assert_eq!(err.to_string(), "503: Service Unavailable");
    assert_eq!(tracker.marker(), ymd(2024, 1, 4));
    assert_eq!(
        fs::read_to_string(config.marker_path()).unwrap(),
        "2024-01-04T00:00:00"
    );
}

#[test]
fn marker_waits_for_every_archive() {
    let mut server = Server::new();
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(&server, dir.path());

    let _first = server
        .mock("GET", "/archives/eod_20240105.csv")
        .with_status(200)
        .with_body("ok")
        .create();
    let _second = server
        .mock("GET", "/delivery/dlv_05012024.csv")
        .with_status(404)
        .create();

    let mut tracker = DateTracker::new(&config).unwrap();
    let session = SessionClient::new(&config).unwrap();
    let service = SyncService::new(vec![
        archive_for(&server),
        Box::new(NseArchive::new(
            "DELIVERY",
            &format!("{}/delivery/dlv_{{ddmmyyyy}}.csv", server.url()),
        )),
    ]);

    let err = service.sync_next(&mut tracker, &session).unwrap_err();
    assert!(matches!(err, SyncError::Http { status: 404, .. }));
    assert_eq!(tracker.marker(), ymd(2024, 1, 4));
}

#[test]
fn catch_up_skips_the_weekend_and_honours_day_limit() {
    let mut server = Server::new();
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(&server, dir.path());

    let friday = server
        .mock("GET", "/archives/eod_20240105.csv")
        .with_status(200)
        .with_body("fri")
        .expect(1)
        .create();
    let monday = server
        .mock("GET", "/archives/eod_20240108.csv")
        .with_status(200)
        .with_body("mon")
        .expect(1)
        .create();
    let saturday = server
        .mock("GET", "/archives/eod_20240106.csv")
        .expect(0)
        .create();

    let mut tracker = DateTracker::new(&config).unwrap();
    let session = SessionClient::new(&config).unwrap();
    let service = SyncService::new(vec![archive_for(&server)]);

    let outcomes = service
        .sync_until_current(&mut tracker, &session, Some(2))
        .unwrap();

    friday.assert();
    monday.assert();
    saturday.assert();
    let dates: Vec<NaiveDate> = outcomes.iter().map(|o| o.date).collect();
    assert_eq!(dates, vec![ymd(2024, 1, 5), ymd(2024, 1, 8)]);
    assert_eq!(
        fs::read_to_string(config.marker_path()).unwrap(),
        "2024-01-08T00:00:00"
    );
}

#[test]
fn up_to_date_marker_halts_without_requests() {
    let mut server = Server::new();
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(&server, dir.path());
    fs::write(config.marker_path(), "2999-01-01T00:00:00").unwrap();

    let archive = server.mock("GET", mockito::Matcher::Any).expect(0).create();

    let mut tracker = DateTracker::new(&config).unwrap();
    let session = SessionClient::new(&config).unwrap();
    let service = SyncService::new(vec![archive_for(&server)]);

    let err = service
        .sync_until_current(&mut tracker, &session, None)
        .unwrap_err();

    archive.assert();
    assert!(err.is_up_to_date());
    assert_eq!(err.to_string(), "All Up To Date");
    assert_eq!(
        fs::read_to_string(config.marker_path()).unwrap(),
        "2999-01-01T00:00:00"
    );
}
