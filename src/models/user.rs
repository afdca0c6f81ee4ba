use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::UserId;
use crate::error::{AppError, AppResult};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
    /// Ids of this user's friends; maintained by the friendship graph
    pub friends: BTreeSet<UserId>,
}

/// Client-supplied user fields, used for both creation and replacement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDraft {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: NaiveDate,
}

impl UserDraft {
    pub fn validate(&self) -> AppResult<()> {
        self.validate_at(Utc::now().date_naive())
    }

    /// Validates against an explicit "today", so the birthday rule is testable
    pub fn validate_at(&self, today: NaiveDate) -> AppResult<()> {
        if !is_email_shaped(&self.email) {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        if self.login.is_empty() {
            return Err(AppError::Validation("login must not be blank".to_string()));
        }
        if self.login.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "login must not contain whitespace".to_string(),
            ));
        }

        if self.birthday > today {
            return Err(AppError::Validation(format!(
                "birthday {} is in the future",
                self.birthday
            )));
        }

        Ok(())
    }

    /// Display name to store: the given name, or the login when blank
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.login.clone(),
        }
    }
}

impl User {
    /// Builds a stored user from a draft; the friend set starts empty
    pub fn from_draft(id: UserId, draft: UserDraft) -> Self {
        let name = draft.display_name();
        Self {
            id,
            email: draft.email,
            login: draft.login,
            name,
            birthday: draft.birthday,
            friends: BTreeSet::new(),
        }
    }

    /// Replaces the client-editable fields, keeping id and friends
    pub fn apply(&mut self, draft: UserDraft) {
        self.name = draft.display_name();
        self.email = draft.email;
        self.login = draft.login;
        self.birthday = draft.birthday;
    }
}

fn is_email_shaped(email: &str) -> bool {
    if email.trim().is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
