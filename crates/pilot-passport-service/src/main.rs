use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use pilot_passport_api::{
    PassportConfig, PassportError, PilotPassportApi, RosterEntry, ServiceRecord,
    API_CONTRACT_VERSION,
};
use pilot_passport_core::SortieSummary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";

#[derive(Debug, Clone)]
struct ServiceState {
    api: PilotPassportApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    service_contract_version: &'static str,
    code: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    database_configured: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DescriptorQuery {
    desc: Option<String>,
}

#[derive(Debug, Parser)]
#[command(name = "pilot-passport-service")]
#[command(about = "Local HTTP service for IL-2 pilot passports")]
struct Args {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Game installation root.
    #[arg(long)]
    game_path: Option<PathBuf>,
    /// Career database, when not under the game path.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Stock resource directory.
    #[arg(long)]
    static_root: Option<PathBuf>,
    /// Mod rank override directory.
    #[arg(long)]
    mod_ranks_dir: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl Args {
    fn passport_config(&self) -> Result<PassportConfig> {
        let file = match self.config.as_deref() {
            Some(path) => PassportConfig::load(path)?,
            None => PassportConfig::default(),
        };
        Ok(file.merge(PassportConfig {
            game_path: self.game_path.clone(),
            db_path: self.db.clone(),
            static_root: self.static_root.clone(),
            mod_ranks_dir: self.mod_ranks_dir.clone(),
        }))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl ServiceError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            code,
            error: message.into(),
        }
    }

    fn missing_descriptor() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", "missing desc query parameter")
    }
}

impl From<PassportError> for ServiceError {
    fn from(err: PassportError) -> Self {
        let status = match &err {
            PassportError::NotFound(_) => StatusCode::NOT_FOUND,
            PassportError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PassportError::Lineage(_) | PassportError::Store(_) => {
                error!(error = %err, "passport request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/pilots", get(pilots))
        .route("/v1/service-record", get(service_record))
        .route("/v1/stats", get(stats))
        .route("/v1/sorties", get(sorties))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let paths = args.passport_config()?.resolve();
    info!(
        db = ?paths.db_path,
        static_root = %paths.static_root.display(),
        mod_ranks_dir = ?paths.mod_ranks_dir,
        bind = %args.bind,
        "starting pilot passport service"
    );
    let state = ServiceState { api: PilotPassportApi::new(paths) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Database work is synchronous; keep it off the async workers.
async fn run_blocking<T, F>(state: ServiceState, operation: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&PilotPassportApi) -> Result<T, PassportError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(&state.api))
        .await
        .map_err(|err| {
            error!(error = %err, "passport worker task failed");
            ServiceError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
        })?
        .map_err(ServiceError::from)
}

fn descriptor(query: DescriptorQuery) -> Result<String, ServiceError> {
    query.desc.filter(|desc| !desc.is_empty()).ok_or_else(ServiceError::missing_descriptor)
}

async fn health(State(state): State<ServiceState>) -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse {
        status: "ok",
        database_configured: state.api.paths().db_path.is_some(),
    }))
}

async fn pilots(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<RosterEntry>>>, ServiceError> {
    let roster = run_blocking(state, PilotPassportApi::resolve_pilot_roster).await?;
    Ok(Json(envelope(roster)))
}

async fn service_record(
    State(state): State<ServiceState>,
    Query(query): Query<DescriptorQuery>,
) -> Result<Json<ServiceEnvelope<ServiceRecord>>, ServiceError> {
    let desc = descriptor(query)?;
    let record = run_blocking(state, move |api| api.resolve_service_record(&desc)).await?;
    Ok(Json(envelope(record)))
}

async fn stats(
    State(state): State<ServiceState>,
    Query(query): Query<DescriptorQuery>,
) -> Result<Json<ServiceEnvelope<Map<String, Value>>>, ServiceError> {
    let desc = descriptor(query)?;
    let report = run_blocking(state, move |api| api.resolve_stats(&desc)).await?;
    Ok(Json(envelope(report)))
}

async fn sorties(
    State(state): State<ServiceState>,
    Query(query): Query<DescriptorQuery>,
) -> Result<Json<ServiceEnvelope<Vec<SortieSummary>>>, ServiceError> {
    let desc = descriptor(query)?;
    let sorties = run_blocking(state, move |api| api.resolve_sorties(&desc)).await?;
    Ok(Json(envelope(sorties)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use http::Request;
    use pilot_passport_api::PassportPaths;
    use pilot_passport_store_sqlite::fixture::{CareerDbFixture, FixtureSchema, PilotSeed};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const ANNA: &str = "fullname=Anna%20Lee&birthCountryInfo=103&birthDate=1921.6.30";

    fn fixture_state() -> (TempDir, ServiceState) {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create tempdir: {err}"));
        let db_path = dir.path().join("cp.db");
        let seeded = CareerDbFixture::create(&db_path, FixtureSchema::Current).and_then(|db| {
            db.career(1, -1, 7)?.pilot(&PilotSeed {
                id: 7,
                description: ANNA.to_string(),
                stats: vec![("sorties", 4.0), ("goodSorties", 3.0)],
                ..PilotSeed::default()
            })?;
            Ok(())
        });
        if let Err(err) = seeded {
            panic!("failed to seed fixture database: {err:#}");
        }
        let api = PilotPassportApi::new(PassportPaths::new(db_path, dir.path().join("static")));
        (dir, ServiceState { api })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = match router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .method("GET")
                    .body(axum::body::Body::empty())
                    .unwrap_or_else(|err| panic!("failed to build request: {err}")),
            )
            .await
        {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        };
        let status = response.status();
        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        match serde_json::from_str(&body) {
            Ok(value) => (status, value),
            Err(err) => panic!("response body is not JSON: {err}; body={body}"),
        }
    }

    fn encoded(desc: &str) -> String {
        desc.replace('%', "%25").replace('&', "%26").replace('=', "%3D")
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (_dir, state) = fixture_state();
        let (status, value) = get_json(app(state), "/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value.get("service_contract_version").and_then(Value::as_str),
            Some(SERVICE_CONTRACT_VERSION)
        );
        assert_eq!(value.pointer("/data/database_configured"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn pilots_endpoint_lists_roster() {
        let (_dir, state) = fixture_state();
        let (status, value) = get_json(app(state), "/v1/pilots").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value.pointer("/data/0/display").and_then(Value::as_str), Some("Anna Lee"));
        assert_eq!(
            value.pointer("/data/0/country").and_then(Value::as_str),
            Some("United States of America")
        );
        assert_eq!(value.pointer("/data/0/desc").and_then(Value::as_str), Some(ANNA));
    }

    #[tokio::test]
    async fn stats_endpoint_preserves_report_order() {
        let (_dir, state) = fixture_state();
        let uri = format!("/v1/stats?desc={}", encoded(ANNA));
        let (status, value) = get_json(app(state), &uri).await;
        assert_eq!(status, StatusCode::OK);

        let keys = value
            .get("data")
            .and_then(Value::as_object)
            .map(|data| data.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(keys, vec!["Good Sorties", "Sorties", "Success Rate"]);
        assert_eq!(value.pointer("/data/Success Rate").and_then(Value::as_str), Some("75.0%"));
    }

    #[tokio::test]
    async fn service_record_and_sorties_resolve_by_descriptor() {
        let (_dir, state) = fixture_state();
        let uri = format!("/v1/service-record?desc={}", encoded(ANNA));
        let (status, value) = get_json(app(state.clone()), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value.pointer("/data/pilot_info/last_name").and_then(Value::as_str), Some("Lee"));
        assert_eq!(value.pointer("/data/promotions"), Some(&serde_json::json!([])));

        let uri = format!("/v1/sorties?desc={}", encoded(ANNA));
        let (status, value) = get_json(app(state), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value.get("data"), Some(&serde_json::json!([])));
    }

    #[tokio::test]
    async fn unknown_descriptor_maps_to_not_found() {
        let (_dir, state) = fixture_state();
        let (status, value) = get_json(app(state), "/v1/stats?desc=fullname%3DNobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value.get("code").and_then(Value::as_str), Some("not_found"));
    }

    #[tokio::test]
    async fn missing_descriptor_is_bad_request() {
        let (_dir, state) = fixture_state();
        let (status, value) = get_json(app(state), "/v1/sorties").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value.get("code").and_then(Value::as_str), Some("invalid_request"));
    }

    #[tokio::test]
    async fn missing_database_maps_to_service_unavailable() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create tempdir: {err}"));
        let api = PilotPassportApi::new(PassportPaths::new(
            dir.path().join("absent.db"),
            dir.path().join("static"),
        ));
        let (status, value) = get_json(app(ServiceState { api }), "/v1/pilots").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value.get("code").and_then(Value::as_str), Some("source_unavailable"));
    }
}
