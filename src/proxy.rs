//! Backend-for-frontend: serves the `/todo` routes and forwards them to a
//! `TaskStore`, so the content store credential stays on this side.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::StoreError;
use crate::store::{CreatedResponse, ListResponse, TaskStore};
use crate::task::{NewTask, Task, TaskPatch};

/// Store failures as HTTP responses, in the content store's `{message}` shape.
#[derive(Debug)]
pub struct ProxyError(StoreError);

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Status { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            StoreError::InvalidEndpoint(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "upstream failure");
        }
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}

pub fn router<S: TaskStore + 'static>(store: Arc<S>) -> Router {
    Router::new()
        .route("/todo", get(list_tasks::<S>).post(create_task::<S>))
        .route("/todo/{id}", patch(update_task::<S>).delete(delete_task::<S>))
        .with_state(store)
}

async fn list_tasks<S: TaskStore>(
    State(store): State<Arc<S>>,
) -> Result<Json<ListResponse<Task>>, ProxyError> {
    let tasks = store.list().await?;
    let count = tasks.len();
    Ok(Json(ListResponse {
        contents: tasks,
        total_count: count,
        offset: 0,
        limit: count,
    }))
}

async fn create_task<S: TaskStore>(
    State(store): State<Arc<S>>,
    Json(task): Json<NewTask>,
) -> Result<(StatusCode, Json<CreatedResponse>), ProxyError> {
    let id = store.create(&task).await?;
    tracing::info!(id = %id, "proxied create");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn update_task<S: TaskStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<CreatedResponse>, ProxyError> {
    if patch.is_empty() {
        return Err(ProxyError(StoreError::Status {
            status: 400,
            message: "update body has no fields".to_string(),
        }));
    }
    store.update(&id, &patch).await?;
    tracing::info!(id = %id, "proxied update");
    Ok(Json(CreatedResponse { id }))
}

async fn delete_task<S: TaskStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ProxyError> {
    store.delete(&id).await?;
    tracing::info!(id = %id, "proxied delete");
    Ok(StatusCode::NO_CONTENT)
}

/// Serve the proxy on `addr` until Ctrl-C.
pub async fn serve<S: TaskStore + 'static>(store: Arc<S>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind proxy on {addr}"))?;
    let local = listener
        .local_addr()
        .context("Failed to get proxy address")?;
    tracing::info!(addr = %local, "proxy listening");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down proxy");
        })
        .await
        .context("Proxy server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::Status;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn seeded() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_tasks(vec![Task {
            id: "1".into(),
            task: "buy milk".into(),
            create_date: "2024-05-01T09:30:00.000Z".into(),
            status: Status::Todo,
            explanation: None,
        }]))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_uses_the_content_envelope() {
        let app = router(seeded());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/todo?fields=id,task&limit=100")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["contents"][0]["task"], "buy milk");
        assert_eq!(body["contents"][0]["status"], json!(["todo"]));
    }

    #[tokio::test]
    async fn create_returns_the_new_id() {
        let store = seeded();
        let app = router(store.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/todo",
                json!({ "task": "walk dog", "status": ["todo"], "createDate": "2024-05-02T00:00:00.000Z" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].id, id);
    }

    #[tokio::test]
    async fn status_patch_moves_the_task() {
        let store = seeded();
        let response = router(store.clone())
            .oneshot(json_request("PATCH", "/todo/1", json!({ "status": ["done"] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.list().await.unwrap()[0].status, Status::Done);
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let response = router(seeded())
            .oneshot(json_request("PATCH", "/todo/1", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_ids_are_404_with_a_message() {
        let response = router(seeded())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/todo/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn delete_answers_no_content() {
        let store = seeded();
        let response = router(store.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/todo/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.list().await.unwrap().is_empty());
    }
}
