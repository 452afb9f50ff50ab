use std::sync::Arc;

use crate::resolver::LinkPreviewResolver;

/// Shared application state passed to all handlers.
/// The resolver is built once at startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<LinkPreviewResolver>,
}
