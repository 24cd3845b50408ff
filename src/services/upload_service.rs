use crate::api::error::AppError;
use crate::models::{ProgressEvent, StoredFile};
use crate::services::notifier::{NotifyError, ProgressHub};
use crate::services::progress::{ProgressSink, ProgressStream};
use crate::services::storage::LocalStorage;
use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::Instrument;
use uuid::Uuid;

/// Lifecycle of one upload request once it has passed the auth gate.
///
/// Unauthenticated requests never get here; the gate answers them with a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

/// Wires an instrumented request body to storage and to the progress hub.
pub struct UploadService {
    storage: Arc<LocalStorage>,
    hub: ProgressHub,
    sample_interval: Duration,
}

impl UploadService {
    pub fn new(storage: Arc<LocalStorage>, hub: ProgressHub, sample_interval: Duration) -> Self {
        Self {
            storage,
            hub,
            sample_interval,
        }
    }

    /// Wraps a raw request body so reading it publishes progress to every observer.
    ///
    /// `declared_length` is the request's Content-Length; without it no progress is
    /// reported.
    pub fn instrument_body(&self, body: Body, declared_length: Option<u64>) -> Body {
        let hub = self.hub.clone();
        let sink: ProgressSink = Arc::new(move |event: ProgressEvent| {
            hub.publish(event);
            Ok::<(), NotifyError>(())
        });

        Body::from_stream(ProgressStream::new(
            body.into_data_stream(),
            declared_length,
            self.sample_interval,
            sink,
        ))
    }

    /// Stores the first file field of the multipart body and returns it.
    ///
    /// On failure the partially written file is removed.
    pub async fn ingest(&self, mut multipart: Multipart) -> Result<StoredFile, AppError> {
        let upload_id = Uuid::new_v4();
        let span = tracing::info_span!("upload", id = %upload_id);

        async move {
            let mut state = UploadState::Idle;
            advance(&mut state, UploadState::Streaming);

            match self.receive(&mut multipart).await {
                Ok(file) => {
                    advance(&mut state, UploadState::Completed);
                    tracing::info!("📦 Stored {} ({} bytes)", file.name, file.size);
                    Ok(file)
                }
                Err(e) => {
                    advance(&mut state, UploadState::Failed);
                    tracing::error!("Upload failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn receive(&self, multipart: &mut Multipart) -> Result<StoredFile, AppError> {
        let mut stored = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let original_name = match field.file_name() {
                Some(name) if !name.is_empty() => name.to_string(),
                // Plain form fields and empty file inputs are skipped.
                _ => continue,
            };
            if stored.is_some() {
                tracing::debug!("Ignoring extra file field {:?}", field.name());
                continue;
            }

            let field_name = field
                .name()
                .filter(|n| !n.is_empty())
                .unwrap_or("file")
                .to_string();
            stored = Some(self.write_field(&field_name, &original_name, field).await?);
        }

        stored.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))
    }

    async fn write_field(
        &self,
        field_name: &str,
        original_name: &str,
        mut field: Field<'_>,
    ) -> Result<StoredFile, AppError> {
        let dest = self.storage.resolve_destination(field_name, original_name)?;
        let file = self.storage.create_destination(&dest).await?;
        tracing::info!("Receiving {:?} into {}", original_name, dest.name);

        let mut writer = BufWriter::new(file);
        let mut size: u64 = 0;

        let result: Result<(), AppError> = async {
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                size += chunk.len() as u64;
                writer.write_all(&chunk).await.map_err(|e| {
                    AppError::Internal(format!("Write to {} failed: {}", dest.name, e))
                })?;
            }
            writer.flush().await.map_err(|e| {
                AppError::Internal(format!("Flush of {} failed: {}", dest.name, e))
            })?;
            Ok(())
        }
        .await;

        // Closes the handle before any cleanup below.
        drop(writer);

        match result {
            Ok(()) => Ok(StoredFile {
                name: dest.name,
                size,
            }),
            Err(e) => {
                self.storage.discard(&dest.name).await;
                Err(e)
            }
        }
    }
}

fn advance(state: &mut UploadState, next: UploadState) {
    tracing::debug!("Upload state {:?} -> {:?}", state, next);
    *state = next;
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}
