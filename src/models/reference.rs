use serde::{Deserialize, Serialize};

/// Wire shape of a reference value on input; only the id is read
#[derive(Debug, Deserialize)]
pub struct ReferenceId {
    pub id: i32,
}

/// Wire shape of a reference value on output
#[derive(Debug, Serialize)]
pub struct ReferenceView {
    pub id: i32,
    pub name: &'static str,
}

/// A reference id outside the fixed MPA or genre table
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} id {id}")]
pub struct UnknownReference {
    kind: &'static str,
    id: i32,
}

/// MPA film rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "ReferenceId", into = "ReferenceView")]
pub enum Mpa {
    G,
    Pg,
    Pg13,
    R,
    Nc17,
}

impl Mpa {
    pub const ALL: [Mpa; 5] = [Mpa::G, Mpa::Pg, Mpa::Pg13, Mpa::R, Mpa::Nc17];

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|mpa| mpa.id() == id)
    }

    pub fn id(self) -> i32 {
        match self {
            Mpa::G => 1,
            Mpa::Pg => 2,
            Mpa::Pg13 => 3,
            Mpa::R => 4,
            Mpa::Nc17 => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mpa::G => "G",
            Mpa::Pg => "PG",
            Mpa::Pg13 => "PG-13",
            Mpa::R => "R",
            Mpa::Nc17 => "NC-17",
        }
    }
}

impl TryFrom<ReferenceId> for Mpa {
    type Error = UnknownReference;

    fn try_from(value: ReferenceId) -> Result<Self, Self::Error> {
        Mpa::from_id(value.id).ok_or(UnknownReference {
            kind: "mpa",
            id: value.id,
        })
    }
}

impl From<Mpa> for ReferenceView {
    fn from(mpa: Mpa) -> Self {
        ReferenceView {
            id: mpa.id(),
            name: mpa.name(),
        }
    }
}

/// Film genre. Ordering follows the genre id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "ReferenceId", into = "ReferenceView")]
pub enum Genre {
    Comedy,
    Drama,
    Animation,
    Thriller,
    Documentary,
    Action,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Comedy,
        Genre::Drama,
        Genre::Animation,
        Genre::Thriller,
        Genre::Documentary,
        Genre::Action,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|genre| genre.id() == id)
    }

    pub fn id(self) -> i32 {
        match self {
            Genre::Comedy => 1,
            Genre::Drama => 2,
            Genre::Animation => 3,
            Genre::Thriller => 4,
            Genre::Documentary => 5,
            Genre::Action => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Genre::Comedy => "Comedy",
            Genre::Drama => "Drama",
            Genre::Animation => "Animation",
            Genre::Thriller => "Thriller",
            Genre::Documentary => "Documentary",
            Genre::Action => "Action",
        }
    }
}

impl TryFrom<ReferenceId> for Genre {
    type Error = UnknownReference;

    fn try_from(value: ReferenceId) -> Result<Self, Self::Error> {
        Genre::from_id(value.id).ok_or(UnknownReference {
            kind: "genre",
            id: value.id,
        })
    }
}

impl From<Genre> for ReferenceView {
    fn from(genre: Genre) -> Self {
        ReferenceView {
            id: genre.id(),
            name: genre.name(),
        }
    }
}
