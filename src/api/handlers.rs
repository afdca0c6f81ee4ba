use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{Film, FilmDraft, FilmId, User, UserDraft, UserId};

use super::{AppJson, AppState};

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct UpdateFilmRequest {
    pub id: FilmId,
    #[serde(flatten)]
    pub film: FilmDraft,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    #[serde(flatten)]
    pub user: UserDraft,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub count: Option<i64>,
}

/// Outcome of a relation mutation
#[derive(Debug, Serialize)]
pub struct RelationResponse {
    pub message: String,
    /// `false` when the request left the relation as it was
    pub changed: bool,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Get all films
pub async fn list_films(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.catalog.list_films().await?))
}

/// Create a new film
pub async fn create_film(
    State(state): State<AppState>,
    AppJson(request): AppJson<FilmDraft>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state.catalog.create_film(request).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

/// Replace a film; the id comes from the body
pub async fn update_film(
    State(state): State<AppState>,
    AppJson(request): AppJson<UpdateFilmRequest>,
) -> AppResult<Json<Film>> {
    let film = state.catalog.update_film(request.id, request.film).await?;
    Ok(Json(film))
}

/// Get a single film
pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<FilmId>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.catalog.get_film(id).await?))
}

/// Most liked films
pub async fn popular_films(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let count = params.count.unwrap_or(state.popular_films_default_count);
    Ok(Json(state.catalog.top_films(count).await?))
}

/// Record that a user likes a film
pub async fn like_film(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<Json<RelationResponse>> {
    let added = state.catalog.like_film(film_id, user_id).await?;
    let message = if added {
        format!("User {} now likes film {}", user_id, film_id)
    } else {
        format!("User {} already likes film {}", user_id, film_id)
    };
    Ok(Json(RelationResponse {
        message,
        changed: added,
    }))
}

/// Withdraw a like
pub async fn unlike_film(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<Json<RelationResponse>> {
    state.catalog.unlike_film(film_id, user_id).await?;
    Ok(Json(RelationResponse {
        message: format!("User {} no longer likes film {}", user_id, film_id),
        changed: true,
    }))
}

/// Get all users
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.catalog.list_users().await?))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<UserDraft>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.catalog.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Replace a user; the id comes from the body
pub async fn update_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let user = state.catalog.update_user(request.id, request.user).await?;
    Ok(Json(user))
}

/// Get a single user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> AppResult<Json<User>> {
    Ok(Json(state.catalog.get_user(id).await?))
}

/// Make two users friends
pub async fn add_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<RelationResponse>> {
    let added = state.catalog.add_friend(user_id, friend_id).await?;
    let message = if added {
        format!("Users {} and {} are now friends", user_id, friend_id)
    } else {
        format!("Users {} and {} are already friends", user_id, friend_id)
    };
    Ok(Json(RelationResponse {
        message,
        changed: added,
    }))
}

/// End a friendship
pub async fn remove_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<RelationResponse>> {
    state.catalog.remove_friend(user_id, friend_id).await?;
    Ok(Json(RelationResponse {
        message: format!("Users {} and {} are no longer friends", user_id, friend_id),
        changed: true,
    }))
}

/// A user's friends
pub async fn friends_of(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.catalog.friends_of(user_id).await?))
}

/// Friends shared by two users
pub async fn common_friends(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.catalog.common_friends(user_id, other_id).await?))
}
