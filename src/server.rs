//! HTTP surface over [`RemoteFileSync`].

use crate::error::SyncError;
use crate::remote::RemoteTransferClient;
use crate::sync::{OperationResult, RemoteFileSync};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Form fields accepted by the transfer endpoints. Absent fields are empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferForm {
    pub local_path: String,
    pub remote_path: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = OperationResult::failure(&self);
        if status.is_server_error() {
            error!("request failed: {}", body.message);
        }
        (status, Json(body)).into_response()
    }
}

/// Build the router for the transfer endpoints.
pub fn create_router<C: RemoteTransferClient>(sync: Arc<RemoteFileSync<C>>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/fileupload/upload", post(upload_handler::<C>))
        .route("/api/fileupload/replace", post(replace_handler::<C>))
        .route("/api/fileupload/delete", post(delete_handler::<C>))
        .with_state(sync)
}

async fn upload_handler<C: RemoteTransferClient>(
    State(sync): State<Arc<RemoteFileSync<C>>>,
    Form(form): Form<TransferForm>,
) -> Result<Json<OperationResult>, SyncError> {
    let message = sync.upload(&form.local_path, &form.remote_path).await?;
    Ok(Json(OperationResult::success(message)))
}

async fn replace_handler<C: RemoteTransferClient>(
    State(sync): State<Arc<RemoteFileSync<C>>>,
    Form(form): Form<TransferForm>,
) -> Result<Json<OperationResult>, SyncError> {
    let message = sync.replace(&form.local_path, &form.remote_path).await?;
    Ok(Json(OperationResult::success(message)))
}

async fn delete_handler<C: RemoteTransferClient>(
    State(sync): State<Arc<RemoteFileSync<C>>>,
    Form(form): Form<TransferForm>,
) -> Result<Json<OperationResult>, SyncError> {
    let message = sync.delete(&form.remote_path).await?;
    Ok(Json(OperationResult::success(message)))
}

/// Serve the API until Ctrl+C.
pub async fn run_server<C: RemoteTransferClient>(
    sync: Arc<RemoteFileSync<C>>,
    bind: &str,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(sync))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received - shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
