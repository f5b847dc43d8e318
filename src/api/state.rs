use std::sync::Arc;

use crate::application::RagPipeline;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, config: AppConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }
}
