//! HTTP handlers for the tasks service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use axum_helpers::{bearer_auth_middleware, JwtAuth, JwtClaims, ValidatedJson};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::TaskError;
use crate::models::{
    CreateComment, CreateTask, Page, PageQuery, Task, TaskComment, TaskFilter, TaskHistory,
    UpdateTask,
};
use crate::service::TaskService;

#[derive(Clone)]
pub struct TasksState {
    pub service: Arc<TaskService>,
}

/// Build the tasks service router. Every route requires a bearer token.
pub fn router(service: Arc<TaskService>, jwt: JwtAuth) -> Router {
    let state = TasksState { service };

    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/history", get(task_history))
        .route(
            "/tasks/{id}/comments",
            get(task_comments).post(add_comment),
        )
        .layer(middleware::from_fn_with_state(jwt, bearer_auth_middleware))
        .with_state(state)
}

fn claims_user_id(claims: &JwtClaims) -> Result<Uuid, TaskError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| TaskError::Validation("Invalid user id in token".to_string()))
}

#[utoipa::path(post, path = "/tasks", request_body = CreateTask,
    responses((status = 201, body = Task)))]
async fn create_task(
    State(state): State<TasksState>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(input): ValidatedJson<CreateTask>,
) -> Result<(StatusCode, Json<Task>), TaskError> {
    let owner = claims_user_id(&claims)?;
    let task = state.service.create_task(owner, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(get, path = "/tasks", params(TaskFilter),
    responses((status = 200, body = [Task])))]
async fn list_tasks(
    State(state): State<TasksState>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Task>>, TaskError> {
    let tasks = state.service.list_tasks(filter).await?;
    Ok(Json(tasks))
}

#[utoipa::path(get, path = "/tasks/{id}",
    responses((status = 200, body = Task), (status = 404)))]
async fn get_task(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, TaskError> {
    let task = state.service.get_task(id).await?;
    Ok(Json(task))
}

#[utoipa::path(patch, path = "/tasks/{id}", request_body = UpdateTask,
    responses((status = 200, body = Task), (status = 404)))]
async fn update_task(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(input): ValidatedJson<UpdateTask>,
) -> Result<Json<Task>, TaskError> {
    let user_id = claims_user_id(&claims)?;
    let task = state.service.update_task(id, user_id, input).await?;
    Ok(Json(task))
}

#[utoipa::path(delete, path = "/tasks/{id}",
    responses((status = 204), (status = 404)))]
async fn delete_task(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, TaskError> {
    state.service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/tasks/{id}/history", params(PageQuery),
    responses((status = 200, body = Page<TaskHistory>), (status = 404)))]
async fn task_history(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<TaskHistory>>, TaskError> {
    let page = state.service.task_history(id, page).await?;
    Ok(Json(page))
}

#[utoipa::path(get, path = "/tasks/{id}/comments", params(PageQuery),
    responses((status = 200, body = Page<TaskComment>), (status = 404)))]
async fn task_comments(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<TaskComment>>, TaskError> {
    let page = state.service.task_comments(id, page).await?;
    Ok(Json(page))
}

#[utoipa::path(post, path = "/tasks/{id}/comments", request_body = CreateComment,
    responses((status = 201, body = TaskComment), (status = 404)))]
async fn add_comment(
    State(state): State<TasksState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(input): ValidatedJson<CreateComment>,
) -> Result<(StatusCode, Json<TaskComment>), TaskError> {
    let user_id = claims_user_id(&claims)?;
    let comment = state.service.add_comment(id, user_id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
