use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const LABELS: [&str; 5] = [
    "healthy",
    "leaf_blast",
    "brown_spot",
    "bacterial_blight",
    "aphids",
];

/// A stored analysis, in the shape the history and lookup routes return.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub id: String,
    pub prediction: String,
    pub confidence: f64,
    pub image_url: String,
    pub heatmap_url: Option<String>,
    pub diagnosis: String,
    pub timestamp: u64,
    pub crop_name: Option<String>,
}

/// Body returned by `POST /api/upload`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub prediction: String,
    pub confidence: f64,
    pub image_url: String,
    pub heatmap_url: Option<String>,
    pub diagnosis: String,
}

/// Detections in insertion order, oldest first.
pub type Db = Arc<RwLock<Vec<Detection>>>;

type Rejection = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with(Db::default())
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/history", get(history))
        .route("/api/detections/{id}", get(get_detection))
        .route("/api/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Crop Disease Detection API is running",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": now_secs() }))
}

async fn history(State(db): State<Db>) -> Json<Vec<Detection>> {
    let detections = db.read().await;
    Json(detections.iter().rev().cloned().collect())
}

async fn get_detection(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Detection>, Rejection> {
    let detections = db.read().await;
    detections
        .iter()
        .find(|d| d.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Detection not found"))
}

async fn upload(
    State(db): State<Db>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, Rejection> {
    let mut file: Option<Vec<u8>> = None;
    let mut crop_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.body_text()))?;
                file = Some(bytes.to_vec());
            }
            Some("crop_name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.body_text()))?;
                crop_name = Some(text);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| detail(StatusCode::UNPROCESSABLE_ENTITY, "file is required"))?;
    let detection = analyze(&file, crop_name);
    tracing::info!(id = %detection.id, prediction = %detection.prediction, "stored detection");

    let response = UploadResponse {
        id: detection.id.clone(),
        prediction: detection.prediction.clone(),
        confidence: detection.confidence,
        image_url: detection.image_url.clone(),
        heatmap_url: detection.heatmap_url.clone(),
        diagnosis: detection.diagnosis.clone(),
    };
    db.write().await.push(detection);
    Ok(Json(response))
}

/// Deterministic stand-in for model inference: the same bytes always get the
/// same label and confidence.
fn analyze(file: &[u8], crop_name: Option<String>) -> Detection {
    let checksum = file.iter().fold(0u32, |acc, b| acc.wrapping_add(u32::from(*b)));
    let prediction = LABELS[checksum as usize % LABELS.len()].to_string();
    let confidence = 0.5 + f64::from(checksum % 50) / 100.0;
    let id = Uuid::new_v4().to_string();
    let percent = confidence * 100.0;
    let diagnosis = match &crop_name {
        Some(crop) => format!("{prediction} detected on {crop} with {percent:.0}% confidence"),
        None => format!("{prediction} detected with {percent:.0}% confidence"),
    };
    Detection {
        image_url: format!("/storage/images/{id}.jpg"),
        id,
        prediction,
        confidence,
        heatmap_url: None,
        diagnosis,
        timestamp: now_secs(),
        crop_name,
    }
}

fn detail(status: StatusCode, message: &str) -> Rejection {
    (status, Json(json!({ "detail": message })))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
