use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, Transaction};

use super::{FilmStore, FriendshipGraph, LikeIndex, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{Film, FilmDraft, FilmId, Genre, Mpa, User, UserDraft, UserId},
};

/// Tables and reference rows, safe to apply on every start
const SCHEMA: &str = include_str!("../../schema.sql");

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL backend
///
/// Friendships are stored one row per direction; both rows are written or
/// removed in a single transaction. Reads that assemble a record from several
/// tables run inside one `REPEATABLE READ` transaction, so every statement
/// sees the same snapshot. Likes rely on the `(film_id, user_id)`
/// primary key, and duplicate inserts are absorbed with `ON CONFLICT DO NOTHING`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: FilmId,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa_id: i32,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    login: String,
    name: String,
    birthday: NaiveDate,
}

impl FilmRow {
    fn into_film(self, genres: BTreeSet<Genre>, likes: BTreeSet<UserId>) -> AppResult<Film> {
        let mpa = Mpa::from_id(self.mpa_id).ok_or_else(|| {
            AppError::Internal(format!(
                "film {} references unknown mpa id {}",
                self.id, self.mpa_id
            ))
        })?;

        Ok(Film {
            id: self.id,
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            mpa,
            genres,
            likes,
        })
    }
}

impl UserRow {
    fn into_user(self, friends: BTreeSet<UserId>) -> User {
        User {
            id: self.id,
            email: self.email,
            login: self.login,
            name: self.name,
            birthday: self.birthday,
            friends,
        }
    }
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates missing tables and seeds the MPA and genre reference rows
    pub async fn init_schema(&self) -> AppResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a read-only transaction whose statements share one snapshot
    async fn snapshot(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Attaches genres and likes to film rows, preserving row order
    async fn hydrate_films(conn: &mut PgConnection, rows: Vec<FilmRow>) -> AppResult<Vec<Film>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<FilmId> = rows.iter().map(|row| row.id).collect();

        let genre_rows: Vec<(FilmId, i32)> =
            sqlx::query_as("SELECT film_id, genre_id FROM film_genres WHERE film_id = ANY($1)")
                .bind(&ids[..])
                .fetch_all(&mut *conn)
                .await?;

        let like_rows: Vec<(FilmId, UserId)> =
            sqlx::query_as("SELECT film_id, user_id FROM likes WHERE film_id = ANY($1)")
                .bind(&ids[..])
                .fetch_all(&mut *conn)
                .await?;

        let mut genres: HashMap<FilmId, BTreeSet<Genre>> = HashMap::new();
        for (film_id, genre_id) in genre_rows {
            let genre = Genre::from_id(genre_id).ok_or_else(|| {
                AppError::Internal(format!(
                    "film {} references unknown genre id {}",
                    film_id, genre_id
                ))
            })?;
            genres.entry(film_id).or_default().insert(genre);
        }

        let mut likes: HashMap<FilmId, BTreeSet<UserId>> = HashMap::new();
        for (film_id, user_id) in like_rows {
            likes.entry(film_id).or_default().insert(user_id);
        }

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                row.into_film(
                    genres.remove(&id).unwrap_or_default(),
                    likes.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Attaches friend sets to user rows, preserving row order
    async fn hydrate_users(conn: &mut PgConnection, rows: Vec<UserRow>) -> AppResult<Vec<User>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<UserId> = rows.iter().map(|row| row.id).collect();

        let friend_rows: Vec<(UserId, UserId)> =
            sqlx::query_as("SELECT user_id, friend_id FROM friendships WHERE user_id = ANY($1)")
                .bind(&ids[..])
                .fetch_all(&mut *conn)
                .await?;

        let mut friends: HashMap<UserId, BTreeSet<UserId>> = HashMap::new();
        for (user_id, friend_id) in friend_rows {
            friends.entry(user_id).or_default().insert(friend_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_user(friends.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn write_genres(
        tx: &mut Transaction<'_, Postgres>,
        film: FilmId,
        genres: &BTreeSet<Genre>,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM film_genres WHERE film_id = $1")
            .bind(film)
            .execute(&mut **tx)
            .await?;

        for genre in genres {
            sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2)")
                .bind(film)
                .bind(genre.id())
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl FilmStore for PgStorage {
    async fn create_film(&self, draft: FilmDraft) -> AppResult<Film> {
        let mut tx = self.pool.begin().await?;

        let id: FilmId = sqlx::query_scalar(
            r#"
            INSERT INTO films (name, description, release_date, duration, mpa_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.release_date)
        .bind(draft.duration)
        .bind(draft.mpa.id())
        .fetch_one(&mut *tx)
        .await?;

        Self::write_genres(&mut tx, id, &draft.genres).await?;
        tx.commit().await?;

        tracing::debug!(film_id = id, "Inserted film");
        Ok(Film::from_draft(id, draft))
    }

    async fn replace_film(&self, id: FilmId, draft: FilmDraft) -> AppResult<Film> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE films
            SET name = $1, description = $2, release_date = $3, duration = $4, mpa_id = $5
            WHERE id = $6
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.release_date)
        .bind(draft.duration)
        .bind(draft.mpa.id())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::film_not_found(id));
        }

        Self::write_genres(&mut tx, id, &draft.genres).await?;
        tx.commit().await?;

        tracing::debug!(film_id = id, "Updated film");
        self.get_film(id).await
    }

    async fn get_film(&self, id: FilmId) -> AppResult<Film> {
        let mut tx = self.snapshot().await?;
        let row: Option<FilmRow> = sqlx::query_as(
            "SELECT id, name, description, release_date, duration, mpa_id FROM films WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or_else(|| AppError::film_not_found(id))?;
        let film = Self::hydrate_films(&mut *tx, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::film_not_found(id))?;
        tx.commit().await?;
        Ok(film)
    }

    async fn list_films(&self) -> AppResult<Vec<Film>> {
        let mut tx = self.snapshot().await?;
        let rows: Vec<FilmRow> = sqlx::query_as(
            "SELECT id, name, description, release_date, duration, mpa_id FROM films ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let films = Self::hydrate_films(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(films)
    }

    async fn film_exists(&self, id: FilmId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM films WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl UserStore for PgStorage {
    async fn create_user(&self, draft: UserDraft) -> AppResult<User> {
        let id: UserId = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, login, name, birthday)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&draft.email)
        .bind(&draft.login)
        .bind(draft.display_name())
        .bind(draft.birthday)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(user_id = id, "Inserted user");
        Ok(User::from_draft(id, draft))
    }

    async fn replace_user(&self, id: UserId, draft: UserDraft) -> AppResult<User> {
        let updated = sqlx::query(
            "UPDATE users SET email = $1, login = $2, name = $3, birthday = $4 WHERE id = $5",
        )
        .bind(&draft.email)
        .bind(&draft.login)
        .bind(draft.display_name())
        .bind(draft.birthday)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::user_not_found(id));
        }

        tracing::debug!(user_id = id, "Updated user");
        self.get_user(id).await
    }

    async fn get_user(&self, id: UserId) -> AppResult<User> {
        let mut tx = self.snapshot().await?;
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, login, name, birthday FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let row = row.ok_or_else(|| AppError::user_not_found(id))?;
        let user = Self::hydrate_users(&mut *tx, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::user_not_found(id))?;
        tx.commit().await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut tx = self.snapshot().await?;
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, login, name, birthday FROM users ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;

        let users = Self::hydrate_users(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(users)
    }

    async fn user_exists(&self, id: UserId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl FriendshipGraph for PgStorage {
    async fn add_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Writing both rows also repairs a pair left with a single direction
        let inserted = sqlx::query(
            r#"
            INSERT INTO friendships (user_id, friend_id)
            VALUES ($1, $2), ($2, $1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user)
        .bind(friend)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::debug!(user_id = user, friend_id = friend, inserted, "Wrote friendship");
        Ok(inserted > 0)
    }

    async fn remove_friendship(&self, user: UserId, friend: UserId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM friendships
            WHERE (user_id = $1 AND friend_id = $2)
               OR (user_id = $2 AND friend_id = $1)
            "#,
        )
        .bind(user)
        .bind(friend)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::debug!(user_id = user, friend_id = friend, deleted, "Removed friendship");
        Ok(deleted > 0)
    }

    async fn friends_of(&self, user: UserId) -> AppResult<Vec<User>> {
        let mut tx = self.snapshot().await?;
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.login, u.name, u.birthday
            FROM friendships AS f
            JOIN users AS u ON u.id = f.friend_id
            WHERE f.user_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        let friends = Self::hydrate_users(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(friends)
    }

    async fn common_friends(&self, user: UserId, other: UserId) -> AppResult<Vec<User>> {
        let mut tx = self.snapshot().await?;
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.login, u.name, u.birthday
            FROM friendships AS a
            JOIN friendships AS b ON b.friend_id = a.friend_id
            JOIN users AS u ON u.id = a.friend_id
            WHERE a.user_id = $1 AND b.user_id = $2
            ORDER BY u.id
            "#,
        )
        .bind(user)
        .bind(other)
        .fetch_all(&mut *tx)
        .await?;

        let friends = Self::hydrate_users(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(friends)
    }
}

#[async_trait::async_trait]
impl LikeIndex for PgStorage {
    async fn add_like(&self, film: FilmId, user: UserId) -> AppResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO likes (film_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(film)
        .bind(user)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::debug!(film_id = film, user_id = user, inserted, "Wrote like");
        Ok(inserted > 0)
    }

    async fn remove_like(&self, film: FilmId, user: UserId) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM likes WHERE film_id = $1 AND user_id = $2")
            .bind(film)
            .bind(user)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(film_id = film, user_id = user, deleted, "Removed like");
        Ok(deleted > 0)
    }

    async fn like_count(&self, film: FilmId) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE film_id = $1")
            .bind(film)
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn top_films(&self, limit: usize) -> AppResult<Vec<Film>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut tx = self.snapshot().await?;
        let rows: Vec<FilmRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.description, f.release_date, f.duration, f.mpa_id
            FROM films AS f
            LEFT JOIN likes AS l ON l.film_id = f.id
            GROUP BY f.id
            ORDER BY COUNT(l.user_id) DESC, f.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let films = Self::hydrate_films(&mut *tx, rows).await?;
        tx.commit().await?;
        Ok(films)
    }
}
