//! Category API Handlers

use axum::{Json, extract::State};

use crate::auth::Actor;
use crate::core::ServerState;
use shared::models::{Category, CategoryCreate};
use shared::util::now_millis;
use shared::{AppError, AppResult};

/// GET /api/categories - list all categories
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.storage.list_categories()?;
    Ok(Json(categories))
}

/// POST /api/categories - create a category (elevated)
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    if !actor.is_elevated() {
        return Err(AppError::forbidden("Only staff may manage categories"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Category name is required"));
    }
    if let Some(parent) = &payload.parent
        && state.storage.get_category(parent)?.is_none()
    {
        return Err(AppError::not_found(format!("Category {parent}")));
    }

    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        parent: payload.parent,
        created_at: now_millis(),
    };
    state.storage.save_category(&category)?;
    Ok(Json(category))
}
