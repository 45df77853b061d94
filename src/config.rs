use anyhow::{Context, Result};
use std::str::FromStr;

use crate::domain::model::{DetectorParams, InferenceConfig, ModelId};

/// Configuración del servicio, leída de variables de entorno.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    pub inference: InferenceConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente arbitraria (útil en tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = DetectorParams::default();

        let labels = match lookup("LAYOUT_LABELS") {
            Some(raw) => {
                let labels: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect();
                anyhow::ensure!(!labels.is_empty(), "LAYOUT_LABELS no contiene etiquetas");
                labels
            }
            None => defaults.labels,
        };

        let params = DetectorParams {
            input_size: parse_or(&lookup, "LAYOUT_INPUT_SIZE", defaults.input_size)?,
            score_threshold: parse_or(&lookup, "LAYOUT_SCORE_THRESHOLD", defaults.score_threshold)?,
            nms_iou_threshold: parse_or(&lookup, "LAYOUT_NMS_IOU", defaults.nms_iou_threshold)?,
            max_detections: parse_or(&lookup, "LAYOUT_MAX_DETECTIONS", defaults.max_detections)?,
            labels,
        };
        anyhow::ensure!(params.input_size > 0, "LAYOUT_INPUT_SIZE debe ser > 0");

        Ok(Self {
            addr: lookup("LAYOUT_ADDR").unwrap_or_else(|| "0.0.0.0:8090".to_string()),
            inference: InferenceConfig {
                model: ModelId {
                    name: lookup("LAYOUT_MODEL_NAME").unwrap_or_else(|| "publaynet-layout".to_string()),
                    onnx_path: lookup("LAYOUT_MODEL_PATH").unwrap_or_else(|| "models/layout.onnx".to_string()),
                },
                params,
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("valor inválido para {key}: {raw:?}")),
        None => Ok(default),
    }
}
