use axum::{routing::get, Router};
use std::sync::Arc;

use crate::recorder::ClickRecorder;

use super::handlers::{track_click, RedirectState};

pub fn create_redirect_router(recorder: Arc<ClickRecorder>, destination_url: String) -> Router {
    let state = Arc::new(RedirectState {
        recorder,
        destination_url,
    });

    Router::new()
        .route("/track/{tracking_id}", get(track_click))
        .with_state(state)
}
