//! HTTP/JSON ingress: `GET /cmd/:key`, `DELETE /cmd/:key`, `POST|PUT /cmd`,
//! plus `/healthz` as an ambient operational surface. `State` extraction,
//! `Path` extraction, and a custom `IntoResponse` error type returning
//! `(StatusCode, Json(...))`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ramdb_store::{execute, Command, KvStore, StoreEngine, StoreError};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::ProtocolError;

#[derive(Debug, Deserialize)]
struct CmdBody {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize)]
struct CmdResponse {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::KeyNotFound(_) => StatusCode::BAD_REQUEST,
            StoreError::WalWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

async fn run(store: &StoreEngine, cmd: Command) -> Result<CmdResponse, ApiError> {
    let key = cmd.key().to_string();
    let body = execute(&cmd, store).await?;
    Ok(CmdResponse { key, value: body })
}

async fn get_cmd(State(store): State<Arc<StoreEngine>>, Path(key): Path<String>) -> axum::response::Result<impl IntoResponse> {
    let cmd = Command::get(&key).ok_or_else(|| ApiError::from(ProtocolError::parse(&key)))?;
    Ok(Json(run(&store, cmd).await?))
}

async fn del_cmd(State(store): State<Arc<StoreEngine>>, Path(key): Path<String>) -> axum::response::Result<impl IntoResponse> {
    let cmd = Command::del(&key).ok_or_else(|| ApiError::from(ProtocolError::parse(&key)))?;
    Ok(Json(run(&store, cmd).await?))
}

async fn set_cmd(State(store): State<Arc<StoreEngine>>, Json(body): Json<CmdBody>) -> axum::response::Result<impl IntoResponse> {
    let raw = format!("SET {} {}", body.key, body.value);
    let cmd = Command::set(&body.key, &body.value).ok_or_else(|| ApiError::from(ProtocolError::parse(&raw)))?;
    Ok(Json(run(&store, cmd).await?))
}

async fn healthz(State(store): State<Arc<StoreEngine>>) -> impl IntoResponse {
    if store.is_healthy() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "closed")
    }
}

pub fn router(store: Arc<StoreEngine>) -> Router {
    Router::new()
        .route("/cmd/:key", get(get_cmd).delete(del_cmd))
        .route("/cmd", post(set_cmd).put(set_cmd))
        .route("/healthz", get(healthz))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramdb_store::MapOnlyStore;

    fn store() -> StoreEngine {
        StoreEngine::Map(MapOnlyStore::new())
    }

    #[test]
    fn body_and_response_use_the_expected_json_shape() {
        let body: CmdBody = serde_json::from_str(r#"{"Key":"a","Value":"1"}"#).unwrap();
        assert_eq!(body.key, "a");
        assert_eq!(body.value, "1");

        let resp = CmdResponse { key: "a".into(), value: "1".into() };
        assert_eq!(serde_json::to_string(&resp).unwrap(), r#"{"Key":"a","Value":"1"}"#);
    }

    #[tokio::test]
    async fn run_set_then_get_round_trips() {
        let store = store();
        let set = Command::set("a", "1").unwrap();
        let resp = run(&store, set).await.unwrap();
        assert_eq!(resp.key, "a");
        assert_eq!(resp.value, "OK");

        let get = Command::get("a").unwrap();
        let resp = run(&store, get).await.unwrap();
        assert_eq!(resp.value, "1");
    }

    #[tokio::test]
    async fn run_maps_key_not_found_to_bad_request() {
        let store = store();
        let get = Command::get("missing").unwrap();
        let err = run(&store, get).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_maps_closed_store_to_service_unavailable() {
        let store = store();
        store.close().await.unwrap();
        let set = Command::set("a", "1").unwrap();
        let err = run(&store, set).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn healthz_reflects_store_close() {
        let store = store();
        assert!(store.is_healthy());
        store.close().await.unwrap();
        assert!(!store.is_healthy());
    }
}
