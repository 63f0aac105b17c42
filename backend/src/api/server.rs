//! HTTP Server for the hunterload API.
//!
//! Provides REST endpoints for uploading a registry file and converting it.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/convert`    | Upload a registry file and convert   |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::ConvertResponse;
use crate::error::{ServerError, ServerResult};
use crate::output::REPORT_FILE;
use crate::transform::pipeline::{ConvertOptions, Converter};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Reference files the server uses for every job.
///
/// Uploaded options cannot point the server at arbitrary paths.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub admin_dir: Option<PathBuf>,
    pub category_dir: Option<PathBuf>,
}

/// Build the router
pub fn router(config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/convert", post(convert_upload))
        .route("/api/logs", get(sse_logs))
        // Room for the multipart framing around a maximum-size file
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Hunterload server running on http://localhost:{}", port);
    println!("   POST /api/convert - Upload and convert a registry file");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "hunterload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers drop the missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(MAX_UPLOAD_BYTES)
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", e))
    }
}

/// Strip any directory part a client sent with the file name.
fn upload_file_name(name: Option<&str>) -> String {
    name.and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload.xlsx".to_string())
}

/// Conversion endpoint
async fn convert_upload(
    State(config): State<Arc<ServerConfig>>,
    mut multipart: Multipart,
) -> ServerResult<Json<ConvertResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut options = ConvertOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "file" => {
                let name = upload_file_name(field.file_name());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(ServerError::PayloadTooLarge(bytes.len()));
                }
                upload = Some((name, bytes.to_vec()));
            }
            "options" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    options = serde_json::from_str(&text)
                        .map_err(|e| ServerError::BadRequest(format!("Invalid options: {}", e)))?;
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    options.administrative_directory_path = config.admin_dir.clone();
    options.category_directory_path = config.category_dir.clone();

    let job_id = Uuid::new_v4().to_string();
    log_info(format!("Job {}: {} ({} bytes)", job_id, file_name, bytes.len()));

    let job_dir = std::env::temp_dir().join(format!("hunterload-{}", job_id));
    let result = run_job(&job_dir, &file_name, &bytes, options).await;
    if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
        tracing::debug!(error = %e, dir = %job_dir.display(), "job folder not removed");
    }

    let (output, report) = result.map_err(|e| {
        log_error(format!("Job {}: {}", job_id, e));
        e
    })?;
    Ok(Json(ConvertResponse::new(job_id, output, report)))
}

async fn run_job(
    job_dir: &Path,
    file_name: &str,
    bytes: &[u8],
    options: ConvertOptions,
) -> ServerResult<(crate::transform::ConversionOutput, Option<String>)> {
    let input_dir = job_dir.join("input");
    let output_dir = job_dir.join("output");
    tokio::fs::create_dir_all(&input_dir)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    let input = input_dir.join(file_name);
    tokio::fs::write(&input, bytes)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    let output = Converter::new(options).run(&input, &output_dir).await?;
    let report = match &output.report_path {
        Some(_) => tokio::fs::read_to_string(output_dir.join(REPORT_FILE)).await.ok(),
        None => None,
    };
    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_file_name_strips_directories() {
        assert_eq!(upload_file_name(Some("../../etc/registry.csv")), "registry.csv");
        assert_eq!(upload_file_name(Some("реестр.xlsx")), "реестр.xlsx");
        assert_eq!(upload_file_name(None), "upload.xlsx");
    }

    #[tokio::test]
    async fn test_run_job_converts_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "surname;hunter_name;series_ticket;number_ticket\nИванов;Иван;АБ 12;3456\n";
        let options = ConvertOptions {
            create_report: true,
            ..Default::default()
        };

        let (output, report) = run_job(dir.path(), "registry.csv", csv.as_bytes(), options)
            .await
            .unwrap();

        assert_eq!(output.rows.hunters.len(), 1);
        assert_eq!(output.rows.tickets[0].series, "АБ12");
        assert!(report.unwrap().contains("ОТЧЕТ О КОНВЕРТАЦИИ"));
    }

    #[tokio::test]
    async fn test_run_job_missing_headers_fails() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_job(dir.path(), "empty.csv", b"", ConvertOptions::default()).await;

        assert!(matches!(result, Err(ServerError::Convert(_))));
    }
}
