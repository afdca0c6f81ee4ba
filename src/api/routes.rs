use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(film_routes())
        .merge(user_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

fn film_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/films",
            get(handlers::list_films)
                .post(handlers::create_film)
                .put(handlers::update_film),
        )
        .route("/films/popular", get(handlers::popular_films))
        .route("/films/:id", get(handlers::get_film))
        .route(
            "/films/:id/like/:user_id",
            put(handlers::like_film).delete(handlers::unlike_film),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users)
                .post(handlers::create_user)
                .put(handlers::update_user),
        )
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/friends", get(handlers::friends_of))
        .route(
            "/users/:id/friends/:friend_id",
            put(handlers::add_friend).delete(handlers::remove_friend),
        )
        .route(
            "/users/:id/friends/common/:other_id",
            get(handlers::common_friends),
        )
}
