use std::sync::Arc;

use crate::{
    db::{FilmStore, FriendshipGraph, LikeIndex, Storage, UserStore},
    error::{AppError, AppResult},
    models::{Film, FilmDraft, FilmId, User, UserDraft, UserId},
};

/// Entry point for every catalog operation
///
/// Validates input and resolves referenced ids against the entity stores
/// before any relation is touched. When an operation references several
/// entities they are checked in a fixed order (film before user, requesting
/// user before the other user), so the reported error is deterministic.
#[derive(Clone)]
pub struct Catalog {
    films: Arc<dyn FilmStore>,
    users: Arc<dyn UserStore>,
    friendships: Arc<dyn FriendshipGraph>,
    likes: Arc<dyn LikeIndex>,
}

impl Catalog {
    pub fn new(
        films: Arc<dyn FilmStore>,
        users: Arc<dyn UserStore>,
        friendships: Arc<dyn FriendshipGraph>,
        likes: Arc<dyn LikeIndex>,
    ) -> Self {
        Self {
            films,
            users,
            friendships,
            likes,
        }
    }

    /// Wires every concern to the same backend
    pub fn with_storage<S>(storage: Arc<S>) -> Self
    where
        S: Storage + 'static,
    {
        Self::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            storage,
        )
    }

    // Films

    pub async fn create_film(&self, draft: FilmDraft) -> AppResult<Film> {
        draft.validate()?;
        let film = self.films.create_film(draft).await?;
        tracing::info!(film_id = film.id, name = %film.name, "Film created");
        Ok(film)
    }

    pub async fn update_film(&self, id: FilmId, draft: FilmDraft) -> AppResult<Film> {
        draft.validate()?;
        self.ensure_film(id).await?;
        let film = self.films.replace_film(id, draft).await?;
        tracing::info!(film_id = film.id, name = %film.name, "Film updated");
        Ok(film)
    }

    pub async fn get_film(&self, id: FilmId) -> AppResult<Film> {
        self.films.get_film(id).await
    }

    pub async fn list_films(&self) -> AppResult<Vec<Film>> {
        self.films.list_films().await
    }

    // Users

    pub async fn create_user(&self, draft: UserDraft) -> AppResult<User> {
        draft.validate()?;
        let user = self.users.create_user(draft).await?;
        tracing::info!(user_id = user.id, login = %user.login, "User created");
        Ok(user)
    }

    pub async fn update_user(&self, id: UserId, draft: UserDraft) -> AppResult<User> {
        draft.validate()?;
        self.ensure_user(id).await?;
        let user = self.users.replace_user(id, draft).await?;
        tracing::info!(user_id = user.id, login = %user.login, "User updated");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<User> {
        self.users.get_user(id).await
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.users.list_users().await
    }

    // Likes

    /// Returns `true` if the like is new, `false` if the user already liked the film
    pub async fn like_film(&self, film: FilmId, user: UserId) -> AppResult<bool> {
        self.ensure_film(film).await?;
        self.ensure_user(user).await?;

        let added = self.likes.add_like(film, user).await?;
        tracing::info!(film_id = film, user_id = user, added, "Like recorded");
        Ok(added)
    }

    /// Fails with `NotFound` when the user did not like the film
    pub async fn unlike_film(&self, film: FilmId, user: UserId) -> AppResult<()> {
        self.ensure_film(film).await?;
        self.ensure_user(user).await?;

        if !self.likes.remove_like(film, user).await? {
            return Err(AppError::NotFound(format!(
                "user {} has not liked film {}",
                user, film
            )));
        }

        tracing::info!(film_id = film, user_id = user, "Like removed");
        Ok(())
    }

    pub async fn like_count(&self, film: FilmId) -> AppResult<usize> {
        self.ensure_film(film).await?;
        self.likes.like_count(film).await
    }

    /// The `count` most liked films; ties go to the lower id
    pub async fn top_films(&self, count: i64) -> AppResult<Vec<Film>> {
        if count <= 0 {
            return Err(AppError::Validation(format!(
                "count must be positive, got {}",
                count
            )));
        }
        let limit = usize::try_from(count).unwrap_or(usize::MAX);

        tracing::debug!(count, "Ranking films by likes");
        self.likes.top_films(limit).await
    }

    // Friendships

    /// Returns `true` if the friendship is new, `false` if it already existed
    pub async fn add_friend(&self, user: UserId, friend: UserId) -> AppResult<bool> {
        Self::reject_self_reference(user, friend)?;
        self.ensure_user(user).await?;
        self.ensure_user(friend).await?;

        let added = self.friendships.add_friendship(user, friend).await?;
        tracing::info!(user_id = user, friend_id = friend, added, "Friendship recorded");
        Ok(added)
    }

    /// Fails with `NotFound` when the two users are not friends
    pub async fn remove_friend(&self, user: UserId, friend: UserId) -> AppResult<()> {
        Self::reject_self_reference(user, friend)?;
        self.ensure_user(user).await?;
        self.ensure_user(friend).await?;

        if !self.friendships.remove_friendship(user, friend).await? {
            return Err(AppError::NotFound(format!(
                "users {} and {} are not friends",
                user, friend
            )));
        }

        tracing::info!(user_id = user, friend_id = friend, "Friendship removed");
        Ok(())
    }

    pub async fn friends_of(&self, user: UserId) -> AppResult<Vec<User>> {
        self.ensure_user(user).await?;
        self.friendships.friends_of(user).await
    }

    pub async fn common_friends(&self, user: UserId, other: UserId) -> AppResult<Vec<User>> {
        self.ensure_user(user).await?;
        self.ensure_user(other).await?;
        self.friendships.common_friends(user, other).await
    }

    async fn ensure_film(&self, id: FilmId) -> AppResult<()> {
        if self.films.film_exists(id).await? {
            Ok(())
        } else {
            Err(AppError::film_not_found(id))
        }
    }

    async fn ensure_user(&self, id: UserId) -> AppResult<()> {
        if self.users.user_exists(id).await? {
            Ok(())
        } else {
            Err(AppError::user_not_found(id))
        }
    }

    fn reject_self_reference(user: UserId, friend: UserId) -> AppResult<()> {
        if user == friend {
            return Err(AppError::Validation(format!(
                "user {} cannot befriend themself",
                user
            )));
        }
        Ok(())
    }
}
