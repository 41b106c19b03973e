use crate::error::SessionError;
use crate::media::{MediaConstraints, MediaSource, MediaStream};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

type Acquisition = Shared<BoxFuture<'static, Result<MediaStream, SessionError>>>;

/// Lazily acquired local stream shared by every peer of a session.
///
/// Concurrent callers share one acquisition. A success is kept for the life
/// of the session; a failure reaches every caller waiting on it and the next
/// call tries again.
pub struct LocalMedia {
    source: Arc<dyn MediaSource>,
    constraints: MediaConstraints,
    pending: Mutex<Option<Acquisition>>,
}

impl LocalMedia {
    pub fn new(source: Arc<dyn MediaSource>, constraints: MediaConstraints) -> Self {
        Self {
            source,
            constraints,
            pending: Mutex::new(None),
        }
    }

    pub async fn stream(&self) -> Result<MediaStream, SessionError> {
        let acquisition = self.acquisition().await;
        let result = acquisition.clone().await;

        if let Err(e) = &result {
            let mut pending = self.pending.lock().await;
            if pending
                .as_ref()
                .is_some_and(|current| current.ptr_eq(&acquisition))
            {
                warn!("Local media acquisition failed: {}", e);
                *pending = None;
            }
        }
        result
    }

    async fn acquisition(&self) -> Acquisition {
        let mut pending = self.pending.lock().await;
        if let Some(acquisition) = pending.as_ref() {
            // A finished failure may still be parked here until its callers
            // clear it; it must not be handed out again.
            if !matches!(acquisition.peek(), Some(Err(_))) {
                return acquisition.clone();
            }
        }

        let source = self.source.clone();
        let constraints = self.constraints.clone();
        let acquisition = async move {
            let stream = source
                .acquire(&constraints)
                .await
                .map_err(|e| SessionError::MediaAcquisition(Arc::new(e)))?;
            info!("Local media acquired: {}", stream.id());
            Ok(stream)
        }
        .boxed()
        .shared();

        *pending = Some(acquisition.clone());
        acquisition
    }
}
