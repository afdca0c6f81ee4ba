pub mod film;
pub mod reference;
pub mod user;

pub use film::{Film, FilmDraft, MAX_DESCRIPTION_CHARS};
pub use reference::{Genre, Mpa};
pub use user::{User, UserDraft};

/// Identifier of a film, assigned by the store on creation
pub type FilmId = i64;

/// Identifier of a user, assigned by the store on creation
pub type UserId = i64;
