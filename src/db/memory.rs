use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{FilmStore, FriendshipGraph, LikeIndex, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{Film, FilmDraft, FilmId, User, UserDraft, UserId},
};

/// In-memory backend
///
/// All state lives behind a single lock. Every mutation takes the write lock
/// once, so both directions of a friendship (or a film's like set) change
/// together, and readers never see a half-applied update.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    films: BTreeMap<FilmId, Film>,
    users: BTreeMap<UserId, User>,
    last_film_id: FilmId,
    last_user_id: UserId,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStorageInner {
    fn film_mut(&mut self, id: FilmId) -> AppResult<&mut Film> {
        self.films
            .get_mut(&id)
            .ok_or_else(|| AppError::film_not_found(id))
    }

    fn user(&self, id: UserId) -> AppResult<&User> {
        self.users.get(&id).ok_or_else(|| AppError::user_not_found(id))
    }

    /// Clones the users behind `ids`, which must already be in ascending order
    fn users_by_id<'a>(&self, ids: impl Iterator<Item = &'a UserId>) -> Vec<User> {
        ids.filter_map(|id| self.users.get(id)).cloned().collect()
    }

    fn user_mut(&mut self, id: UserId) -> AppResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| AppError::user_not_found(id))
    }
}

#[async_trait::async_trait]
impl FilmStore for MemoryStorage {
    async fn create_film(&self, draft: FilmDraft) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        inner.last_film_id += 1;
        let film = Film::from_draft(inner.last_film_id, draft);
        inner.films.insert(film.id, film.clone());
        tracing::debug!(film_id = film.id, "Stored film");
        Ok(film)
    }

    async fn replace_film(&self, id: FilmId, draft: FilmDraft) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        let film = inner.film_mut(id)?;
        film.apply(draft);
        Ok(film.clone())
    }

    async fn get_film(&self, id: FilmId) -> AppResult<Film> {
        let inner = self.inner.read().await;
        inner
            .films
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::film_not_found(id))
    }

    async fn list_films(&self) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(inner.films.values().cloned().collect())
    }

    async fn film_exists(&self, id: FilmId) -> AppResult<bool> {
        Ok(self.inner.read().await.films.contains_key(&id))
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStorage {
    async fn create_user(&self, draft: UserDraft) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.last_user_id += 1;
        let user = User::from_draft(inner.last_user_id, draft);
        inner.users.insert(user.id, user.clone());
        tracing::debug!(user_id = user.id, "Stored user");
        Ok(user)
    }

    async fn replace_user(&self, id: UserId, draft: UserDraft) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.apply(draft);
        Ok(user.clone())
    }

    async fn get_user(&self, id: UserId) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner.user(id).cloned()
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn user_exists(&self, id: UserId) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains_key(&id))
    }
}

#[async_trait::async_trait]
impl FriendshipGraph for MemoryStorage {
    async fn add_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        // Both users are resolved before either side is touched
        inner.user(user)?;
        inner.user(friend)?;

        let forward = inner.user_mut(user)?.friends.insert(friend);
        let backward = inner.user_mut(friend)?.friends.insert(user);
        Ok(forward || backward)
    }

    async fn remove_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        inner.user(user)?;
        inner.user(friend)?;

        let forward = inner.user_mut(user)?.friends.remove(&friend);
        let backward = inner.user_mut(friend)?.friends.remove(&user);
        Ok(forward || backward)
    }

    async fn friends_of(&self, user: UserId) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        let friends = &inner.user(user)?.friends;
        Ok(inner.users_by_id(friends.iter()))
    }

    async fn common_friends(&self, user: UserId, other: UserId) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        let left = &inner.user(user)?.friends;
        let right = &inner.user(other)?.friends;
        Ok(inner.users_by_id(left.intersection(right)))
    }
}

#[async_trait::async_trait]
impl LikeIndex for MemoryStorage {
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        inner.film_mut(film)?;
        inner.user(user)?;
        Ok(inner.film_mut(film)?.likes.insert(user))
    }

    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.film_mut(film)?.likes.remove(&user))
    }

    async fn like_count(&self, film: FilmId) -> AppResult<usize> {
        let inner = self.inner.read().await;
        inner
            .films
            .get(&film)
            .map(Film::like_count)
            .ok_or_else(|| AppError::film_not_found(film))
    }

    async fn top_films(&self, limit: usize) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let mut ranked: Vec<&Film> = inner.films.values().collect();
        ranked.sort_by_key(|film| (Reverse(film.like_count()), film.id));
        Ok(ranked.into_iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mpa;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn film_draft(name: &str) -> FilmDraft {
        FilmDraft {
            name: name.to_string(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(1999, 3, 31).unwrap(),
            duration: 136,
            mpa: Mpa::R,
            genres: BTreeSet::new(),
        }
    }

    fn user_draft(login: &str) -> UserDraft {
        UserDraft {
            email: format!("{}@example.com", login),
            login: login.to_string(),
            name: None,
            birthday: NaiveDate::from_ymd_opt(1985, 7, 3).unwrap(),
        }
    }

    async fn friend_ids(storage: &MemoryStorage, user: UserId) -> Vec<UserId> {
        storage
            .friends_of(user)
            .await
            .unwrap()
            .iter()
            .map(|friend| friend.id)
            .collect()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let storage = MemoryStorage::new();
        let first = tokio_test::block_on(storage.create_film(film_draft("A"))).unwrap();
        let second = tokio_test::block_on(storage.create_film(film_draft("B"))).unwrap();
        let user = tokio_test::block_on(storage.create_user(user_draft("alice"))).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        // Each entity kind has its own sequence
        assert_eq!(user.id, 1);
    }

    #[test]
    fn test_replace_unknown_film_is_not_found() {
        let storage = MemoryStorage::new();
        let err = tokio_test::block_on(storage.replace_film(5, film_draft("A"))).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_replace_film_keeps_likes() {
        let storage = MemoryStorage::new();
        let film = storage.create_film(film_draft("Matrix")).await.unwrap();
        let user = storage.create_user(user_draft("neo")).await.unwrap();
        storage.add_like(film.id, user.id).await.unwrap();

        let replaced = storage
            .replace_film(film.id, film_draft("The Matrix"))
            .await
            .unwrap();

        assert_eq!(replaced.name, "The Matrix");
        assert_eq!(replaced.likes, BTreeSet::from([user.id]));
    }

    #[tokio::test]
    async fn test_friendship_is_written_both_ways() {
        let storage = MemoryStorage::new();
        let alice = storage.create_user(user_draft("alice")).await.unwrap();
        let bob = storage.create_user(user_draft("bob")).await.unwrap();

        assert!(storage.add_friendship(alice.id, bob.id).await.unwrap());
        assert!(!storage.add_friendship(bob.id, alice.id).await.unwrap());

        assert_eq!(friend_ids(&storage, alice.id).await, vec![bob.id]);
        assert_eq!(friend_ids(&storage, bob.id).await, vec![alice.id]);

        assert!(storage.remove_friendship(bob.id, alice.id).await.unwrap());
        assert!(storage.friends_of(alice.id).await.unwrap().is_empty());
        assert!(storage.friends_of(bob.id).await.unwrap().is_empty());
        assert!(!storage.remove_friendship(alice.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_friendship_with_unknown_user_changes_nothing() {
        let storage = MemoryStorage::new();
        let alice = storage.create_user(user_draft("alice")).await.unwrap();

        let err = storage.add_friendship(alice.id, 99).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(storage.friends_of(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_common_friends_is_an_intersection() {
        let storage = MemoryStorage::new();
        let mut ids = Vec::new();
        for login in ["a", "b", "c", "d"] {
            ids.push(storage.create_user(user_draft(login)).await.unwrap().id);
        }
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

        storage.add_friendship(a, c).await.unwrap();
        storage.add_friendship(b, c).await.unwrap();
        storage.add_friendship(a, d).await.unwrap();

        let common = storage.common_friends(a, b).await.unwrap();
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].id, c);
        assert_eq!(common[0].friends, BTreeSet::from([a, b]));
        assert_eq!(storage.common_friends(c, d).await.unwrap()[0].id, a);
        assert!(storage.common_friends(b, d).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_like_is_idempotent() {
        let storage = MemoryStorage::new();
        let film = storage.create_film(film_draft("Heat")).await.unwrap();
        let user = storage.create_user(user_draft("vincent")).await.unwrap();

        assert!(storage.add_like(film.id, user.id).await.unwrap());
        assert!(!storage.add_like(film.id, user.id).await.unwrap());
        assert_eq!(storage.like_count(film.id).await.unwrap(), 1);

        assert!(storage.remove_like(film.id, user.id).await.unwrap());
        assert!(!storage.remove_like(film.id, user.id).await.unwrap());
        assert_eq!(storage.like_count(film.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_top_films_orders_by_likes_then_id() {
        let storage = MemoryStorage::new();
        let f1 = storage.create_film(film_draft("f1")).await.unwrap().id;
        let f2 = storage.create_film(film_draft("f2")).await.unwrap().id;
        let f3 = storage.create_film(film_draft("f3")).await.unwrap().id;
        let f4 = storage.create_film(film_draft("f4")).await.unwrap().id;
        let u1 = storage.create_user(user_draft("u1")).await.unwrap().id;
        let u2 = storage.create_user(user_draft("u2")).await.unwrap().id;

        storage.add_like(f1, u1).await.unwrap();
        storage.add_like(f2, u1).await.unwrap();
        storage.add_like(f2, u2).await.unwrap();
        storage.add_like(f4, u2).await.unwrap();

        let top: Vec<FilmId> = storage
            .top_films(10)
            .await
            .unwrap()
            .iter()
            .map(|film| film.id)
            .collect();
        assert_eq!(top, vec![f2, f1, f4, f3]);

        let top_two = storage.top_films(2).await.unwrap();
        assert_eq!(top_two.len(), 2);
        assert_eq!(top_two[0].id, f2);
    }

    #[tokio::test]
    async fn test_concurrent_friendships_stay_symmetric() {
        let storage = MemoryStorage::new();
        let mut ids = Vec::new();
        for i in 0..8 {
            let login = format!("user{}", i);
            ids.push(storage.create_user(user_draft(&login)).await.unwrap().id);
        }

        let mut tasks = Vec::new();
        for &user in &ids {
            for &friend in &ids {
                if user != friend {
                    let storage = storage.clone();
                    tasks.push(tokio::spawn(async move {
                        storage.add_friendship(user, friend).await
                    }));
                }
            }
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        for &user in &ids {
            for friend in friend_ids(&storage, user).await {
                assert!(friend_ids(&storage, friend).await.contains(&user));
            }
            assert_eq!(storage.friends_of(user).await.unwrap().len(), ids.len() - 1);
        }
    }

    #[tokio::test]
    async fn test_friend_records_agree_with_the_relation_under_churn() {
        let storage = MemoryStorage::new();
        let a = storage.create_user(user_draft("a")).await.unwrap().id;
        let b = storage.create_user(user_draft("b")).await.unwrap().id;

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    storage.add_friendship(a, b).await.unwrap();
                    tokio::task::yield_now().await;
                    storage.remove_friendship(b, a).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            for friend in storage.friends_of(a).await.unwrap() {
                assert_eq!(friend.id, b);
                assert!(friend.friends.contains(&a));
            }
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
