use std::sync::Arc;
use std::time::Instant;

use crate::refine::BioRefiner;
use crate::session::SharedController;

#[derive(Clone)]
pub struct AppState {
    pub controller: SharedController,
    pub refiner: Arc<dyn BioRefiner>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(controller: SharedController, refiner: Arc<dyn BioRefiner>) -> Self {
        assert!(
            Arc::strong_count(&controller) >= 1,
            "Controller must be shared"
        );
        Self {
            controller,
            refiner,
            start_time: Instant::now(),
        }
    }
}
