use crate::survey::Survey;
use fhe_provider::sealed::SealedProvider;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared application state.
///
/// The whole survey sits behind a single mutex: every admin call and every
/// submission runs as one serialized, totally ordered transaction, which is
/// exactly the execution model the core's invariants assume.
#[derive(Clone)]
pub struct AppState {
    survey: Arc<Mutex<Survey<SealedProvider>>>,
}

impl AppState {
    pub fn new(survey: Survey<SealedProvider>) -> Self {
        Self {
            survey: Arc::new(Mutex::new(survey)),
        }
    }

    pub async fn survey(&self) -> MutexGuard<'_, Survey<SealedProvider>> {
        self.survey.lock().await
    }
}
