mod domain;
mod application;
mod adapters;
mod config;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use crate::application::services::{EvaluationService, LayoutService};
use crate::adapters::{
    onnx::{detector::OnnxLayoutDetector, model_catalog::OnnxModelCatalog},
    http::{state::HttpState, router},
};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env()?;
    tracing::info!("🔧 Configuración: modelo {} en {}", cfg.inference.model.name, cfg.inference.model.onnx_path);

    // 2. Adaptadores. El modelo se carga en la primera petición de detección.
    let detector = Arc::new(OnnxLayoutDetector::new(cfg.inference.clone()));
    let model_cat = Arc::new(OnnxModelCatalog::new());

    // 3. Servicios (casos de uso)
    let layout_service = Arc::new(LayoutService::new(detector, model_cat, cfg.inference.model.clone()));
    if let Err(e) = layout_service.check_model().await {
        // /evaluate/json sigue funcionando sin modelo.
        tracing::warn!("⚠️ Modelo no disponible todavía: {}", e);
    }
    let evaluation_service = Arc::new(EvaluationService::new(layout_service.clone()));

    // 4. Estado de la API y router
    let state = HttpState {
        layout: layout_service,
        evaluation: evaluation_service,
        inference: cfg.inference,
    };
    let app = router(state);

    // 5. Lanzar el servidor
    tracing::info!("🚀 Document Layout Detector API en http://{}", cfg.addr);
    let listener = tokio::net::TcpListener::bind(&cfg.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
