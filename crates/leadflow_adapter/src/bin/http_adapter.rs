#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use leadflow_adapter::{
    bearer_token, error_message, http_status_for, AdapterRuntime, ClaimBody, ErrorResponse,
    ListParams, ProcessCsvBody, StatusPatchBody, UploadCsvBody,
};
use leadflow_os::error::OpError;

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("LEADFLOW_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let runtime = Arc::new(Mutex::new(AdapterRuntime::default_from_env()?));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/leads", get(list_leads))
        .route("/leads/claim", post(claim_lead))
        .route("/leads/export", get(export_leads))
        .route("/leads/:id", get(get_lead).patch(patch_lead))
        .route("/admin/upload-csv", post(upload_csv))
        .route("/admin/process-csv", post(process_csv))
        .route("/admin/metrics", get(metrics))
        .with_state(runtime);

    println!("leadflow_adapter_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn token_of(headers: &HeaderMap) -> Option<&str> {
    bearer_token(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
}

fn error_response(e: &OpError) -> Response {
    let status =
        StatusCode::from_u16(http_status_for(e)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: error_message(e),
        }),
    )
        .into_response()
}

fn lock_poisoned() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "adapter runtime lock poisoned".to_string(),
        }),
    )
        .into_response()
}

async fn healthz(State(runtime): State<SharedRuntime>) -> Response {
    match runtime.lock() {
        Ok(runtime) => (StatusCode::OK, Json(runtime.health_report())).into_response(),
        Err(_) => lock_poisoned(),
    }
}

async fn list_leads(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.list(token_of(&headers), &params) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_lead(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.get_lead(token_of(&headers), &id) {
        Ok(lead) => (StatusCode::OK, Json(lead)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn claim_lead(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(body): Json<ClaimBody>,
) -> Response {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.claim(token_of(&headers), &body) {
        Ok(lead) => (StatusCode::OK, Json(lead)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn patch_lead(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusPatchBody>,
) -> Response {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.set_status(token_of(&headers), &id, &body) {
        Ok(lead) => (StatusCode::OK, Json(lead)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn upload_csv(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(body): Json<UploadCsvBody>,
) -> Response {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.upload_csv(token_of(&headers), &body) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn process_csv(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(body): Json<ProcessCsvBody>,
) -> Response {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.process_csv(token_of(&headers), &body) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn metrics(State(runtime): State<SharedRuntime>, headers: HeaderMap) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.metrics(token_of(&headers)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn export_leads(State(runtime): State<SharedRuntime>, headers: HeaderMap) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return lock_poisoned(),
    };
    match runtime.export_csv(token_of(&headers)) {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"leads-export.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
