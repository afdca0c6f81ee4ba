use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{FilmId, Genre, Mpa, UserId};
use crate::error::{AppError, AppResult};

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Date of the first public film screening; releases must be strictly later
pub fn first_screening() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

/// A film in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Duration in minutes
    pub duration: i32,
    pub mpa: Mpa,
    pub genres: BTreeSet<Genre>,
    /// Users who like this film
    pub likes: BTreeSet<UserId>,
}

/// Client-supplied film fields, used for both creation and replacement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilmDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa: Mpa,
    #[serde(default)]
    pub genres: BTreeSet<Genre>,
}

impl FilmDraft {
    /// Checks the domain rules a film must satisfy before it is stored
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("film name must not be blank".to_string()));
        }

        let description_len = self.description.chars().count();
        if description_len > MAX_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "film description must be at most {} characters, got {}",
                MAX_DESCRIPTION_CHARS, description_len
            )));
        }

        let bound = first_screening();
        if self.release_date <= bound {
            return Err(AppError::Validation(format!(
                "film release date must be after {}, got {}",
                bound, self.release_date
            )));
        }

        if self.duration <= 0 {
            return Err(AppError::Validation(format!(
                "film duration must be positive, got {}",
                self.duration
            )));
        }

        Ok(())
    }
}

impl Film {
    /// Builds a stored film from a draft; the like set starts empty
    pub fn from_draft(id: FilmId, draft: FilmDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            release_date: draft.release_date,
            duration: draft.duration,
            mpa: draft.mpa,
            genres: draft.genres,
            likes: BTreeSet::new(),
        }
    }

    /// Replaces the client-editable fields, keeping id and likes
    pub fn apply(&mut self, draft: FilmDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.release_date = draft.release_date;
        self.duration = draft.duration;
        self.mpa = draft.mpa;
        self.genres = draft.genres;
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}
