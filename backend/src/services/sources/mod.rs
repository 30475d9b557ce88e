//! # Data source services
//!
//! All routes live under `/api/sources/{source}`, where `{source}` must be
//! one of the configured data sources.
//!
//! ## Sub-modules:
//! - `records`: the working table (load, save, cached view, CSV export,
//!   report, read-only query console).
//! - `backups`: dated snapshots (take now, import, browse, job status,
//!   database export).
//! - `audit`: the source's action log and the live feed built by the log
//!   poller.

mod audit;
mod backups;
pub(crate) mod form;
mod records;

use actix_web::web::{get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/sources/{source}";

/// Configures and returns the Actix `Scope` for every per-source route.
///
/// Literal backup paths are registered before `/backups/{date}` so that
/// `status` is never parsed as a date.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/records", get().to(records::get::process))
        .route("/records", put().to(records::save::process))
        .route("/records/upload", put().to(records::upload::process))
        .route("/records/export", get().to(records::export::process))
        .route("/view", get().to(records::view::process))
        .route("/report", get().to(records::report::process))
        .route("/query", post().to(records::query::process))
        .route("/backups", post().to(backups::snapshot::process))
        .route("/backups", get().to(backups::list::process))
        .route("/backups/import", post().to(backups::import::process))
        .route("/backups/upload", post().to(backups::upload::process))
        .route("/backups/export", post().to(backups::export::process))
        .route("/backups/status", get().to(backups::status::process))
        .route("/backups/{date}", get().to(backups::get::process))
        .route("/audit", get().to(audit::tail::process))
        .route("/audit", post().to(audit::record::process))
        .route("/audit/feed", get().to(audit::feed::process))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionState;
    use crate::job_controller::state::{AuditFeed, DataViews, JobsState};
    use crate::services::test_support::*;
    use crate::services::SESSION_HEADER;
    use actix_web::{test, web, App};
    use common::model::audit::AuditEntry;
    use common::model::failure::{ErrorKind, Failure};
    use common::model::record::{CellValue, RecordSet};
    use common::model::snapshot::{Snapshot, SnapshotReceipt, SnapshotSummary};
    use common::model::user::{Role, SourcePermissions};
    use serde_json::json;
    use tokio::sync::mpsc;

    macro_rules! app {
        ($dir:expr, $sessions:expr) => {{
            let (tx, _rx) = mpsc::channel(4);
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config_in($dir)))
                    .app_data(web::Data::new($sessions.clone()))
                    .app_data(web::Data::new(JobsState::new(tx)))
                    .app_data(web::Data::new(AuditFeed::default()))
                    .app_data(web::Data::new(DataViews::default()))
                    .service(configure_routes()),
            )
            .await
        }};
    }

    fn sample() -> RecordSet {
        RecordSet::with_rows(
            vec!["item".into(), "qty".into()],
            vec![
                vec![CellValue::from("apple"), CellValue::from(3i64)],
                vec![CellValue::from("pear"), CellValue::from(5i64)],
            ],
        )
    }

    #[actix_web::test]
    async fn save_backup_and_audit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("admin-token", Some(Role::Admin))).await;
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::put()
            .uri("/api/sources/test1/records")
            .insert_header((SESSION_HEADER, "admin-token"))
            .set_json(json!({ "records": sample() }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/records")
            .insert_header((SESSION_HEADER, "admin-token"))
            .to_request();
        let loaded: RecordSet = test::call_and_read_body_json(&app, req).await;
        assert_eq!(loaded, sample());

        let req = test::TestRequest::post()
            .uri("/api/sources/test1/backups")
            .insert_header((SESSION_HEADER, "admin-token"))
            .to_request();
        let receipt: SnapshotReceipt = test::call_and_read_body_json(&app, req).await;
        assert_eq!(receipt.rows, 2);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/backups")
            .insert_header((SESSION_HEADER, "admin-token"))
            .to_request();
        let listed: Vec<SnapshotSummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/sources/test1/backups/{}", listed[0].date))
            .insert_header((SESSION_HEADER, "admin-token"))
            .to_request();
        let snapshot: Snapshot = test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot.records.len(), 2);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/audit")
            .insert_header((SESSION_HEADER, "admin-token"))
            .to_request();
        let entries: Vec<AuditEntry> = test::call_and_read_body_json(&app, req).await;
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["Saved to Database", "Saved to Backup"]);
    }

    #[actix_web::test]
    async fn viewer_cannot_save() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(viewer("view-token", "test1")).await;
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::put()
            .uri("/api/sources/test1/records")
            .insert_header((SESSION_HEADER, "view-token"))
            .set_json(json!({ "records": sample() }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
        let failure: Failure = test::read_body_json(resp).await;
        assert_eq!(failure.kind, ErrorKind::Denied);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/records")
            .insert_header((SESSION_HEADER, "view-token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn unknown_source_and_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("tok", None)).await;
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::get()
            .uri("/api/sources/nope/records")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/records")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn status_is_not_mistaken_for_a_date() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("tok", None)).await;
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/backups/status")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/backups/not-a-date")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn write_queries_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("tok", None)).await;
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::post()
            .uri("/api/sources/test1/query")
            .insert_header((SESSION_HEADER, "tok"))
            .set_json(json!({ "sql": "SELECT 1 + 1 AS two" }))
            .to_request();
        let result: RecordSet = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result.value(0, "two"), Some(&CellValue::Integer(2)));

        let req = test::TestRequest::post()
            .uri("/api/sources/test1/query")
            .insert_header((SESSION_HEADER, "tok"))
            .set_json(json!({ "sql": "DELETE FROM audit_log" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn spreadsheet_upload_replaces_the_working_table() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("tok", None)).await;
        let app = app!(dir.path(), sessions);

        let (content_type, body) = form::encode(&[("file", "item;qty\r\napple;3\r\npear;5")]);
        let req = test::TestRequest::put()
            .uri("/api/sources/test1/records/upload")
            .insert_header((SESSION_HEADER, "tok"))
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/records")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let loaded: RecordSet = test::call_and_read_body_json(&app, req).await;
        assert_eq!(loaded, sample());

        let (content_type, body) = form::encode(&[("taken_at", "2024-01-01")]);
        let req = test::TestRequest::put()
            .uri("/api/sources/test1/records/upload")
            .insert_header((SESSION_HEADER, "tok"))
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/audit")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let entries: Vec<AuditEntry> = test::call_and_read_body_json(&app, req).await;
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["Saved to Database"]);
    }

    #[actix_web::test]
    async fn repeated_exports_succeed_and_leave_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        sessions.insert(session("tok", None)).await;
        let app = app!(dir.path(), sessions);

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/sources/test1/backups/export")
                .insert_header((SESSION_HEADER, "tok"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            let body = test::read_body(resp).await;
            assert!(body.starts_with(b"SQLite format 3"));
        }

        let mut leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with("test1.db"))
            .collect();
        leftovers.sort();
        assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);

        let req = test::TestRequest::get()
            .uri("/api/sources/test1/audit")
            .insert_header((SESSION_HEADER, "tok"))
            .to_request();
        let entries: Vec<AuditEntry> = test::call_and_read_body_json(&app, req).await;
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["Downloaded Backup", "Downloaded Backup"]);
    }

    #[actix_web::test]
    async fn manual_snapshot_needs_delete_permission() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionState::default();
        for (token, can_delete) in [("keeper", false), ("pruner", true)] {
            let mut user = session(token, Some(Role::User));
            user.permissions.insert(
                "test1".into(),
                SourcePermissions {
                    can_view: true,
                    can_delete,
                    buttons: vec!["backup".into()],
                    ..SourcePermissions::default()
                },
            );
            sessions.insert(user).await;
        }
        let app = app!(dir.path(), sessions);

        let req = test::TestRequest::post()
            .uri("/api/sources/test1/backups")
            .insert_header((SESSION_HEADER, "keeper"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/sources/test1/backups")
            .insert_header((SESSION_HEADER, "pruner"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
