use std::sync::Arc;
use crate::application::services::{EvaluationService, LayoutService};
use crate::domain::model::InferenceConfig;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Servicio de detección de layout sobre imágenes subidas.
    pub layout: Arc<LayoutService>,
    /// Servicio que puntúa detecciones contra anotaciones de referencia.
    pub evaluation: Arc<EvaluationService>,
    /// Modelo y parámetros activos, expuestos en `/api/config`.
    pub inference: InferenceConfig,
}
