//! Items CRUD.

use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ApiPath, ValidatedJson},
    middleware::CurrentSession,
    response::ApiResponse,
};
use tidepool_core::items::{Item, ItemChanges, ItemError, NewItem};

/// Creates the items router, mounted at `/api/items`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/{id}", get(get_item).put(update_item).delete(delete_item))
}

/// Body of `POST /api/items`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    /// Item name.
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    /// Optional description.
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Body of `PUT /api/items/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    /// New name.
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    /// New description.
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Listing payload.
#[derive(Debug, Serialize)]
pub struct ItemList {
    /// All items.
    pub items: Vec<Item>,
    /// Number of items.
    pub total: usize,
}

async fn list_items(State(state): State<AppState>) -> ApiResult<ApiResponse<ItemList>> {
    let items = state.items.list().await?;
    let total = items.len();
    Ok(ApiResponse::ok(ItemList { items, total }))
}

async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Item>> {
    let item = state
        .items
        .find_by_id(id)
        .await?
        .ok_or(ItemError::NotFound(id))?;
    Ok(ApiResponse::ok(item))
}

async fn create_item(
    State(state): State<AppState>,
    session: CurrentSession,
    ValidatedJson(body): ValidatedJson<CreateItemRequest>,
) -> ApiResult<ApiResponse<Item>> {
    let item = state
        .items
        .create(NewItem {
            name: body.name,
            description: body.description,
            user_id: session.user_id(),
        })
        .await?;
    info!(item_id = %item.id, "item created");
    Ok(ApiResponse::created(item))
}

async fn update_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateItemRequest>,
) -> ApiResult<ApiResponse<Item>> {
    let changes = ItemChanges {
        name: body.name,
        description: body.description,
    };
    let item = state
        .items
        .update(id, changes)
        .await?
        .ok_or(ItemError::NotFound(id))?;
    Ok(ApiResponse::ok(item))
}

async fn delete_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    if !state.items.delete(id).await? {
        return Err(ItemError::NotFound(id).into());
    }
    info!(item_id = %id, "item deleted");
    Ok(ApiResponse::ok(json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{TestApp, body_json, get, json_request};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};

    async fn create(app: &TestApp, body: &Value) -> Value {
        let response = app.send(json_request("POST", "/api/items", body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }

    #[tokio::test]
    async fn test_crud_flow() {
        let app = TestApp::local();
        let item = create(&app, &json!({ "name": "Kelp", "description": "green" })).await;
        let id = item["id"].as_str().unwrap().to_string();
        assert_eq!(item["name"], "Kelp");
        assert!(item["userId"].is_null());

        let body = body_json(app.send(get("/api/items")).await).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["id"], id.as_str());

        let response = app
            .send(json_request(
                "PUT",
                &format!("/api/items/{id}"),
                &json!({ "name": "Bull kelp" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await["data"].clone();
        assert_eq!(updated["name"], "Bull kelp");
        assert_eq!(updated["description"], "green");

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/items/{id}"))
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.send(request).await).await;
        assert_eq!(body["data"]["deleted"], true);

        let response = app.send(get(&format!("/api/items/{id}"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ITEM_NOT_FOUND");
        assert_eq!(
            body["error"]["message"],
            format!("Item with id {id} not found")
        );
    }

    #[tokio::test]
    async fn test_item_owned_by_session_user() {
        let app = TestApp::local();
        let cookie = app.sign_up("items@example.com").await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/items")
            .header("content-type", "application/json")
            .header("cookie", cookie)
            .body(Body::from(r#"{"name":"Anemone"}"#))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(body_json(response).await["data"]["userId"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let app = TestApp::local();
        let long = "x".repeat(101);
        let response = app
            .send(json_request("POST", "/api/items", &json!({ "name": long })))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"]["name"].is_array());

        let response = app
            .send(json_request("POST", "/api/items", &json!({ "description": "no name" })))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_non_uuid_id_rejected() {
        let app = TestApp::local();
        let response = app.send(get("/api/items/not-a-uuid")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let app = TestApp::local();
        let response = app
            .send(json_request(
                "PUT",
                &format!("/api/items/{}", uuid::Uuid::new_v4()),
                &json!({ "name": "x" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
