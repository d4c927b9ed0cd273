//! HTTP routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use worldforge_domain::{CharacterConfig, Objectives, SceneConfig, World, WorldId};

use crate::app::App;
use crate::use_cases::management::ManagementError;
use crate::use_cases::scene::{GenerateSceneError, GenerationStatus};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/worlds", get(list_worlds).post(create_world))
        .route("/api/worlds/{id}", get(get_world))
        .route("/api/worlds/{id}/score", patch(update_score))
        .route("/api/worlds/{id}/scene", delete(reset_scene))
        .route("/api/generate-scene", post(generate_scene))
}

async fn health() -> &'static str {
    "OK"
}

fn parse_world_id(raw: &str) -> Result<WorldId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid world ID".to_string()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// =============================================================================
// Worlds
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateWorldRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct WorldResponse {
    world: World,
}

#[derive(Debug, Serialize)]
struct WorldListResponse {
    worlds: Vec<World>,
}

async fn list_worlds(State(app): State<Arc<App>>) -> Result<Json<WorldListResponse>, ApiError> {
    let worlds = app.use_cases.management.world.list().await?;
    Ok(Json(WorldListResponse { worlds }))
}

async fn create_world(
    State(app): State<Arc<App>>,
    body: Result<Json<CreateWorldRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let request = json_body(body)?;
    let world = app
        .use_cases
        .management
        .world
        .create(
            request.name.unwrap_or_default(),
            request.description.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "World created successfully", "world": world })),
    ))
}

async fn get_world(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<WorldResponse>, ApiError> {
    let world = app
        .use_cases
        .management
        .world
        .get(parse_world_id(&id)?)
        .await?;
    Ok(Json(WorldResponse { world }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreUpdateRequest {
    score_change: i64,
    objectives: Objectives,
}

async fn update_score(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
    body: Result<Json<ScoreUpdateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let world_id = parse_world_id(&id)?;
    let request = json_body(body)?;

    let score = app
        .use_cases
        .management
        .world
        .record_progress(world_id, request.score_change, request.objectives)
        .await?;

    Ok(Json(json!({ "message": "Score updated", "score": score })))
}

async fn reset_scene(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.use_cases
        .management
        .world
        .reset_scene(parse_world_id(&id)?)
        .await?;
    Ok(Json(json!({ "message": "Scene cleared" })))
}

// =============================================================================
// Scene generation
// =============================================================================

#[derive(Debug, Deserialize)]
struct GenerateSceneRequest {
    #[serde(rename = "worldId", default)]
    world_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateSceneResponse {
    message: &'static str,
    scene_config: SceneConfig,
    character_config: CharacterConfig,
    objectives: Objectives,
}

async fn generate_scene(
    State(app): State<Arc<App>>,
    body: Result<Json<GenerateSceneRequest>, JsonRejection>,
) -> Result<Json<GenerateSceneResponse>, ApiError> {
    let request = json_body(body)?;
    let raw_id = request
        .world_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("World ID is required".to_string()))?;
    let world_id = parse_world_id(&raw_id)?;

    let outcome = app.use_cases.scene.generate.execute(world_id).await?;

    let message = match outcome.status {
        GenerationStatus::Generated => "Scene generated successfully",
        GenerationStatus::AlreadyGenerated => "Scene already exists",
    };

    Ok(Json(GenerateSceneResponse {
        message,
        scene_config: outcome.scene.scene_config,
        character_config: outcome.scene.character_config,
        objectives: outcome.scene.objectives,
    }))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// Generation failures surface their message to the client.
    Generation(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Generation(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ManagementError> for ApiError {
    fn from(e: ManagementError) -> Self {
        match e {
            ManagementError::NotFound => ApiError::NotFound(e.to_string()),
            ManagementError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ManagementError::Repo(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<GenerateSceneError> for ApiError {
    fn from(e: GenerateSceneError) -> Self {
        match e {
            GenerateSceneError::NotFound(_) => ApiError::NotFound(e.to_string()),
            GenerateSceneError::Provider(_)
            | GenerateSceneError::Extraction
            | GenerateSceneError::Schema(_)
            | GenerateSceneError::Parse(_) => ApiError::Generation(e.to_string()),
            GenerateSceneError::Repo(_) | GenerateSceneError::Domain(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}
