pub mod detector;
pub mod layout_engine;
pub mod model_catalog;
