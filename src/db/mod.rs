//! Storage abstraction for the catalog
//!
//! The entity stores, the friendship graph and the like index are separate
//! traits so the facade can be wired against any backend. Two backends are
//! provided: [`MemoryStorage`] and [`PgStorage`]. Both implement every trait.

use crate::{
    error::AppResult,
    models::{Film, FilmDraft, FilmId, User, UserDraft, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::{create_pool, PgStorage};

/// Film records keyed by id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmStore: Send + Sync {
    /// Stores a new film under the next free id
    async fn create_film(&self, draft: FilmDraft) -> AppResult<Film>;

    /// Replaces an existing film's fields, keeping its likes
    ///
    /// Fails with `NotFound` if the id is absent.
    async fn replace_film(&self, id: FilmId, draft: FilmDraft) -> AppResult<Film>;

    /// Fails with `NotFound` if the id is absent
    async fn get_film(&self, id: FilmId) -> AppResult<Film>;

    /// All films ordered by id
    async fn list_films(&self) -> AppResult<Vec<Film>>;

    async fn film_exists(&self, id: FilmId) -> AppResult<bool>;
}

/// User records keyed by id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Stores a new user under the next free id
    async fn create_user(&self, draft: UserDraft) -> AppResult<User>;

    /// Replaces an existing user's fields, keeping its friends
    ///
    /// Fails with `NotFound` if the id is absent.
    async fn replace_user(&self, id: UserId, draft: UserDraft) -> AppResult<User>;

    /// Fails with `NotFound` if the id is absent
    async fn get_user(&self, id: UserId) -> AppResult<User>;

    /// All users ordered by id
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn user_exists(&self, id: UserId) -> AppResult<bool>;
}

/// Symmetric friendship relation between users
///
/// Implementations write and remove both directions in one critical section,
/// and build each read from a single snapshot, so a returned friend's own
/// friend set always agrees with the relation being queried. Callers are
/// expected to have checked that both users exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FriendshipGraph: Send + Sync {
    /// Returns `true` if the friendship was newly created
    async fn add_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool>;

    /// Returns `true` if a friendship existed and was removed
    async fn remove_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool>;

    /// Friends of `user`, ordered by id
    async fn friends_of(&self, user: UserId) -> AppResult<Vec<User>>;

    /// Users that are friends of both, ordered by id
    async fn common_friends(&self, user: UserId, other: UserId) -> AppResult<Vec<User>>;
}

/// Which users like which films
///
/// Callers are expected to have checked that the film and user exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LikeIndex: Send + Sync {
    /// Returns `true` if the like was newly added
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<bool>;

    /// Returns `true` if the like existed and was removed
    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<bool>;

    async fn like_count(&self, film: FilmId) -> AppResult<usize>;

    /// Up to `limit` films, by like count descending then id ascending
    async fn top_films(&self, limit: usize) -> AppResult<Vec<Film>>;
}

/// A backend that provides every storage concern
pub trait Storage: FilmStore + UserStore + FriendshipGraph + LikeIndex {}

impl<T> Storage for T where T: FilmStore + UserStore + FriendshipGraph + LikeIndex {}
