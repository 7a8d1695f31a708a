pub mod diversify;
pub mod fallback;
pub mod model_cache;
pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod text;
pub mod vectorizer;

pub use model_cache::ModelCache;
pub use recommendations::{EngineSettings, ModelStatus, RecommendationEngine};
