use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    application::ports::{DetectorPort, ModelCatalogPort},
    domain::{
        annotations::parse_annotations,
        detection::{summarize_detections, Detection, GroundTruth},
        errors::{DomainError, DomainResult},
        evaluation::{evaluate, EvaluationResult},
        matching::MatchParams,
        model::ModelId,
    },
};

/// Servicio de detección: decodifica la imagen subida y la pasa al detector.
#[derive(Clone)]
pub struct LayoutService {
    detector: Arc<dyn DetectorPort>,
    model_catalog: Arc<dyn ModelCatalogPort>,
    model: ModelId,
}

impl LayoutService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        model_catalog: Arc<dyn ModelCatalogPort>,
        model: ModelId,
    ) -> Self {
        Self {
            detector,
            model_catalog,
            model,
        }
    }

    /// Valida el modelo antes de atender peticiones.
    pub async fn check_model(&self) -> DomainResult<()> {
        self.model_catalog.validate_model(&self.model).await
    }

    pub async fn detect(&self, image_bytes: &[u8]) -> DomainResult<Vec<Detection>> {
        let rgb = image::load_from_memory(image_bytes)
            .map_err(|e| DomainError::InvalidInput(format!("Could not decode image. ({e})")))?
            .to_rgb8();
        debug!("Imagen decodificada: {}x{}", rgb.width(), rgb.height());

        let detections = self.detector.detect(rgb).await?;
        info!("Detección: {} elementos [{}]", detections.len(), summarize_detections(&detections));
        Ok(detections)
    }
}

/// Caso de uso de evaluación. No guarda estado: cada llamada es independiente.
#[derive(Clone)]
pub struct EvaluationService {
    layout: Arc<LayoutService>,
}

impl EvaluationService {
    pub fn new(layout: Arc<LayoutService>) -> Self {
        Self { layout }
    }

    /// Evalúa predicciones ya calculadas contra un payload de anotaciones.
    pub fn evaluate_predictions(
        &self,
        predictions: &[Detection],
        annotations: &[u8],
        image_filename: Option<&str>,
        params: &MatchParams,
    ) -> DomainResult<EvaluationResult> {
        check_params(params)?;
        let ground_truths = parse_annotations(annotations, image_filename)?;
        Ok(score(predictions, &ground_truths, params))
    }

    /// Detecta sobre la imagen y puntúa el resultado contra las anotaciones.
    pub async fn detect_and_evaluate(
        &self,
        image_bytes: &[u8],
        annotations: &[u8],
        image_filename: Option<&str>,
        params: &MatchParams,
    ) -> DomainResult<(Vec<Detection>, EvaluationResult)> {
        // Parámetros y anotaciones se validan antes de gastar una inferencia.
        check_params(params)?;
        let ground_truths = parse_annotations(annotations, image_filename)?;
        let detections = self.layout.detect(image_bytes).await?;
        let result = score(&detections, &ground_truths, params);
        Ok((detections, result))
    }
}

fn check_params(params: &MatchParams) -> DomainResult<()> {
    if !(0.0..=1.0).contains(&params.iou_threshold) {
        return Err(DomainError::InvalidInput(format!(
            "iou_threshold fuera de [0, 1]: {}",
            params.iou_threshold
        )));
    }
    Ok(())
}

fn score(predictions: &[Detection], ground_truths: &[GroundTruth], params: &MatchParams) -> EvaluationResult {
    let result = evaluate(predictions, ground_truths, params);
    info!(
        "Evaluación: {} predicciones vs {} ground truths -> tp={} fp={} fn={} f1={:.3} ap50={:.3}",
        predictions.len(),
        ground_truths.len(),
        result.tp,
        result.fp,
        result.fn_,
        result.f1,
        result.ap50
    );
    result
}
