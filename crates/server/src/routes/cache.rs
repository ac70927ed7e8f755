use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use service::domain::{self, RemoveRequest, SetRequest};

use super::AppState;
use crate::errors::JsonApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub message: String,
    pub key: String,
    pub value: Value,
    pub found: bool,
}

/// First `key` parameter of the query string, or `""` when absent.
/// Repeated `key` parameters are allowed; later ones are ignored.
fn first_key(params: Vec<(String, String)>) -> String {
    params
        .into_iter()
        .find_map(|(name, value)| (name == "key").then_some(value))
        .unwrap_or_default()
}

pub async fn hello() -> &'static str {
    "Hello from GDB!"
}

/// Body is decoded whatever the Content-Type says.
pub async fn set_value(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SetResponse>), JsonApiError> {
    let req: SetRequest = domain::decode(&body)
        .map_err(|e| JsonApiError::from_service(e, "Malformed request"))?;
    let entry = state
        .service
        .set(req)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to persist data to file"))?;

    Ok((
        StatusCode::CREATED,
        Json(SetResponse { message: "Added successfully".into(), key: entry.key, value: entry.value }),
    ))
}

pub async fn get_value(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<GetResponse>) {
    let lookup = state.service.get(first_key(params)).await;
    let found = lookup.found();
    let (status, message) = if found {
        (StatusCode::OK, "Cache found")
    } else {
        (StatusCode::NOT_FOUND, "Cache not found")
    };
    (
        status,
        Json(GetResponse {
            message: message.into(),
            key: lookup.key,
            value: lookup.value.unwrap_or(Value::Null),
            found,
        }),
    )
}

pub async fn remove_value(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, JsonApiError> {
    let req: RemoveRequest = domain::decode(&body)
        .map_err(|e| JsonApiError::from_service(e, "Malformed request"))?;
    state
        .service
        .remove(req)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to delete data"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_key_wins_and_missing_is_empty() {
        assert_eq!(first_key(params(&[("key", "a"), ("key", "b")])), "a");
        assert_eq!(first_key(params(&[("other", "x"), ("key", "b")])), "b");
        assert_eq!(first_key(params(&[("other", "x")])), "");
    }
}
