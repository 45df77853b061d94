use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    DetectionResponse, EvaluateRequest, EvaluateResponse, HealthResponse, MessageResponse,
};
use crate::domain::{errors::DomainError, matching::MatchParams};

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

fn domain_error(e: DomainError) -> Response {
    let status = match &e {
        DomainError::InvalidInput(_) | DomainError::InvalidAnnotations(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Petición rechazada ({}): {}", status, e);
    error_response(status, e.to_string())
}

pub async fn read_root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Welcome to the Document Layout Detector API".into(),
    })
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "model_path": st.inference.model.onnx_path,
        "params": st.inference.params,
        "evaluation": MatchParams::default(),
    }))
}

/// Imagen subida en el campo `file`.
struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
}

/// Campos de un formulario multipart de detección/evaluación.
#[derive(Default)]
struct UploadForm {
    image: Option<Upload>,
    annotations: Option<Vec<u8>>,
    iou_threshold: Option<String>,
    require_label_match: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, Response> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Multipart inválido: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let is_image = field.content_type().is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(error_response(StatusCode::BAD_REQUEST, "File provided is not an image."));
                }
                let file_name = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
                form.image = Some(Upload { bytes: bytes.to_vec(), file_name });
            }
            "annotations" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
                form.annotations = Some(bytes.to_vec());
            }
            "iou_threshold" | "require_label_match" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
                if name == "iou_threshold" {
                    form.iou_threshold = Some(text);
                } else {
                    form.require_label_match = Some(text);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

impl UploadForm {
    fn match_params(&self) -> Result<MatchParams, Response> {
        let mut params = MatchParams::default();
        if let Some(raw) = &self.iou_threshold {
            params.iou_threshold = raw.trim().parse().map_err(|_| {
                error_response(StatusCode::BAD_REQUEST, format!("iou_threshold inválido: {raw}"))
            })?;
        }
        if let Some(raw) = &self.require_label_match {
            params.require_label_match = raw.trim().parse().map_err(|_| {
                error_response(StatusCode::BAD_REQUEST, format!("require_label_match inválido: {raw}"))
            })?;
        }
        Ok(params)
    }
}

pub async fn detect_layout(State(st): State<HttpState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let Some(upload) = form.image else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'file' field.");
    };

    match st.layout.detect(&upload.bytes).await {
        Ok(dets) => Json(DetectionResponse::from_detections(&dets)).into_response(),
        Err(DomainError::InvalidInput(_)) => {
            error_response(StatusCode::BAD_REQUEST, "Could not decode image.")
        }
        Err(e) => domain_error(e),
    }
}

pub async fn evaluate_upload(State(st): State<HttpState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let params = match form.match_params() {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let (Some(upload), Some(annotations)) = (form.image, form.annotations) else {
        return error_response(StatusCode::BAD_REQUEST, "Se requieren los campos 'file' y 'annotations'.");
    };

    match st
        .evaluation
        .detect_and_evaluate(&upload.bytes, &annotations, upload.file_name.as_deref(), &params)
        .await
    {
        Ok((dets, metrics)) => Json(EvaluateResponse {
            detections: Some(DetectionResponse::from_detections(&dets).detections),
            metrics,
        })
        .into_response(),
        Err(e) => domain_error(e),
    }
}

pub async fn evaluate_json(State(st): State<HttpState>, Json(req): Json<EvaluateRequest>) -> Response {
    let annotations = match serde_json::to_vec(&req.annotations) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match st.evaluation.evaluate_predictions(
        &req.predictions,
        &annotations,
        req.image_filename.as_deref(),
        &req.match_params(),
    ) {
        Ok(metrics) => Json(EvaluateResponse { detections: None, metrics }).into_response(),
        Err(e) => domain_error(e),
    }
}
