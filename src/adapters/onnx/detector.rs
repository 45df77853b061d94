use async_trait::async_trait;
use image::RgbImage;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::adapters::onnx::layout_engine::OnnxLayoutEngine;
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::InferenceConfig,
};

/// Detector de layout respaldado por ONNX.
///
/// El modelo se carga en la primera petición y se comparte entre todas las
/// siguientes. La inferencia es bloqueante y corre en `spawn_blocking`.
pub struct OnnxLayoutDetector {
    config: InferenceConfig,
    engine: OnceCell<Arc<Mutex<OnnxLayoutEngine>>>,
}

impl OnnxLayoutDetector {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
        }
    }

    async fn engine(&self) -> DomainResult<Arc<Mutex<OnnxLayoutEngine>>> {
        self.engine
            .get_or_try_init(|| async {
                let path = self.config.model.onnx_path.clone();
                info!("Cargando modelo de layout desde {}", path);
                let engine = tokio::task::spawn_blocking(move || OnnxLayoutEngine::load(&path))
                    .await
                    .map_err(|e| DomainError::OperationFailed(format!("Tarea de carga abortada: {e}")))?
                    .map_err(|e| {
                        error!("Error cargando modelo de layout: {:?}", e);
                        DomainError::OperationFailed(format!("No se pudo cargar el modelo: {e}"))
                    })?;
                Ok::<_, DomainError>(Arc::new(Mutex::new(engine)))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl DetectorPort for OnnxLayoutDetector {
    async fn detect(&self, image: RgbImage) -> DomainResult<Vec<Detection>> {
        let engine = self.engine().await?;
        let params = self.config.params.clone();

        tokio::task::spawn_blocking(move || -> DomainResult<Vec<Detection>> {
            let mut eng = engine
                .lock()
                .map_err(|_| DomainError::OperationFailed("Lock del motor fallido".into()))?;
            let t_infer_start = std::time::Instant::now();
            let detections = eng
                .infer(&image, &params)
                .map_err(|e| DomainError::OperationFailed(format!("Inferencia fallida: {e}")))?;
            info!(
                "Inferencia {}x{} en {:.1} ms",
                image.width(),
                image.height(),
                t_infer_start.elapsed().as_secs_f32() * 1000.0
            );
            Ok(detections)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("Tarea de inferencia abortada: {e}")))?
    }
}
