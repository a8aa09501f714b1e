//! HTTP plumbing around the extraction and decision cores.
//!
//! API endpoints:
//! - GET  /        - health status
//! - GET  /warmup  - dummy prediction to warm the classifier
//! - POST /predict - multipart audio upload -> classification JSON
//!
//! The core pipeline (decode -> extract -> infer) is synchronous and runs on
//! a blocking thread per request; the engine is immutable and shared, so
//! in-flight requests never contend on it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;
use voxgender_classify::{DecisionEngine, Prediction};
use voxgender_features::{extract, FeatureError, FeatureSelection};

/// Upload size cap, enforced before the handler reads the body.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Extensions accepted for upload, checked before any decoding work.
const ALLOWED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "m4a"];

#[derive(Clone)]
struct AppState {
    engine: Option<Arc<DecisionEngine>>,
    upload_dir: PathBuf,
}

/// Starts the HTTP server. `engine` is `None` when the classifier artifact
/// failed to load at startup.
pub async fn serve(
    addr: &str,
    engine: Option<Arc<DecisionEngine>>,
    upload_dir: PathBuf,
) -> Result<()> {
    let state = AppState { engine, upload_dir };

    let app = Router::new()
        .route("/", get(health))
        .route("/warmup", get(warmup))
        .route("/predict", post(predict))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = addr.parse()?;
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// JSON error body with an HTTP status, mirroring `{"error": ...}` payloads.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn model_unavailable() -> Self {
        Self::internal("model not loaded")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<FeatureError> for ApiError {
    fn from(e: FeatureError) -> Self {
        match e {
            // Unreadable audio is a client-input problem, not a server fault.
            FeatureError::Decode(_) => ApiError::bad_request(format!("error processing audio: {e}")),
            other => ApiError::internal(format!("error processing audio: {other}")),
        }
    }
}

impl From<voxgender_classify::ClassifyError> for ApiError {
    fn from(e: voxgender_classify::ClassifyError) -> Self {
        ApiError::internal(format!("error processing audio: {e}"))
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "model_loaded": state.engine.is_some(),
        "message": "voice gender classification service",
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

async fn warmup(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone().ok_or_else(ApiError::model_unavailable)?;

    tokio::task::spawn_blocking(move || engine.warmup())
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
        .map_err(|e| ApiError::internal(format!("warm-up failed: {e}")))?;

    Ok(Json(serde_json::json!({
        "status": "warmed_up",
        "message": "service ready for predictions",
    })))
}

async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>, ApiError> {
    let started = Instant::now();

    let engine = state.engine.clone().ok_or_else(ApiError::model_unavailable)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: e.status(),
        message: format!("malformed upload: {e}"),
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|e| ApiError {
                status: e.status(),
                message: format!("cannot read upload: {e}"),
            })?;
            upload = Some((filename, data));
            break;
        }
    }

    let Some((filename, data)) = upload else {
        return Err(ApiError::bad_request("no audio file provided"));
    };
    if filename.is_empty() {
        return Err(ApiError::bad_request("no file selected"));
    }
    if !allowed_file(&filename) {
        return Err(ApiError::bad_request(
            "invalid file type; allowed: wav, mp3, flac, m4a",
        ));
    }

    let temp = TempUpload::create(&state.upload_dir, &filename, &data)
        .map_err(|e| ApiError::internal(format!("cannot store upload: {e}")))?;

    // Full decode-extract-infer pass, blocking, one per request.
    let prediction = tokio::task::spawn_blocking(move || -> Result<Prediction, ApiError> {
        let features = extract(temp.path(), &FeatureSelection::mel_only())?;
        Ok(engine.decide(&features, started)?)
    })
    .await
    .map_err(|e| ApiError::internal(format!("worker failed: {e}")))??;

    Ok(Json(prediction))
}

async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "endpoint not found".into(),
    }
}

/// True when the filename carries one of the accepted audio extensions.
fn allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Uploaded bytes parked on disk for the decoder.
///
/// The file is removed when the guard drops, on success and failure alike;
/// the core itself never deletes files.
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    fn create(dir: &Path, original_name: &str, data: &[u8]) -> std::io::Result<Self> {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let path = dir.join(name);
        std::fs::write(&path, data)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("cannot remove temp upload {}: {e}", self.path.display());
        }
    }
}

/// Flattens a client-supplied filename to a safe single path component,
/// keeping the extension intact.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::sync::Arc;
    use voxgender_classify::{
        Activation, Confidence, DenseLayer, DenseModel, DenseSpec, Gender,
    };
    use voxgender_features::ANALYSIS_RATE;

    #[test]
    fn allowed_file_checks_extension() {
        assert!(allowed_file("clip.wav"));
        assert!(allowed_file("clip.MP3"));
        assert!(allowed_file("nested.name.flac"));
        assert!(allowed_file("clip.m4a"));
        assert!(!allowed_file("clip.ogg"));
        assert!(!allowed_file("clip"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn sanitize_flattens_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("my clip.wav"), "my_clip.wav");
        assert_eq!(sanitize_filename("voice.wav"), "voice.wav");
    }

    #[test]
    fn temp_upload_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let temp = TempUpload::create(dir.path(), "clip.wav", b"data").unwrap();
            path = temp.path().to_path_buf();
            assert!(path.exists());
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.ends_with("_clip.wav"));
        }
        assert!(!path.exists());
    }

    /// Builds a minimal PCM16 mono WAV file in memory.
    fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    /// Known 3-second tone through the full extract-then-decide pipeline
    /// against fixed classifier weights.
    #[test]
    fn end_to_end_golden_triple() {
        let n = 3 * ANALYSIS_RATE as usize;
        let samples: Vec<i16> = (0..n)
            .map(|i| {
                let t = i as f64 / ANALYSIS_RATE as f64;
                (12000.0 * (220.0 * 2.0 * PI * t).sin()) as i16
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("golden.wav");
        std::fs::write(&wav_path, wav_bytes(&samples, ANALYSIS_RATE)).unwrap();

        let features = extract(&wav_path, &FeatureSelection::mel_only()).unwrap();
        assert_eq!(features.len(), 128);

        // Zero weights pin the output at sigmoid(1.5) regardless of content.
        let spec = DenseSpec {
            layers: vec![DenseLayer {
                weights: vec![vec![0.0; 128]],
                bias: vec![1.5],
                activation: Activation::Sigmoid,
            }],
        };
        let engine = DecisionEngine::new(Arc::new(DenseModel::from_spec(spec).unwrap()));
        let pred = engine.decide(&features, Instant::now()).unwrap();

        // sigmoid(1.5) = 0.8175745
        assert!((pred.male_probability - 0.817_574_5).abs() < 1e-5);
        assert_eq!(pred.gender, Gender::Male);
        assert_eq!(pred.confidence, Confidence::High);
        assert_eq!(pred.female_probability, 1.0 - pred.male_probability);

        // Same file, same selection: extraction must be repeatable.
        let again = extract(&wav_path, &FeatureSelection::mel_only()).unwrap();
        assert_eq!(features, again);
    }
}
