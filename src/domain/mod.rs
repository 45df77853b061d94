pub mod annotations;
pub mod detection;
pub mod errors;
pub mod evaluation;
pub mod geometry;
pub mod matching;
pub mod metrics;
pub mod model;
