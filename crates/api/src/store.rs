// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The profile store holds the `students`, `teams` and `admins` collections,
//! each keyed by the owning identity's id.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Admin, Student, Team, UnknownTag};

mod memory;
mod postgres;

pub use memory::MemoryProfileStore;
pub use postgres::PgProfileStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Failed to get a database connection: {0}")]
    Pool(String),
    #[error("Stored document is corrupt: {0}")]
    Corrupt(#[from] UnknownTag),
    #[error("Profile store is unavailable")]
    Unavailable,
    #[error("Team {0} does not exist")]
    MissingTeam(Uuid),
}

/// Which students a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSelector {
    All,
    Matched,
    Unmatched,
    MatchedTo(Uuid),
}

impl StudentSelector {
    pub fn admits(&self, student: &Student) -> bool {
        match self {
            StudentSelector::All => true,
            StudentSelector::Matched => student.is_matched(),
            StudentSelector::Unmatched => !student.is_matched(),
            StudentSelector::MatchedTo(team_id) => student.matched_team_id() == Some(*team_id),
        }
    }
}

/// Document store contract. Every write touches exactly one document, except
/// [`ProfileStore::delete_team`] which releases the team's students in the
/// same operation.
///
/// Queries return documents ordered by `(created_at, id)` so repeated
/// queries yield the same order.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, StoreError>;
    async fn get_team(&self, id: Uuid) -> Result<Option<Team>, StoreError>;
    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError>;

    /// Creates or fully replaces a student document.
    async fn put_student(&self, student: &Student) -> Result<(), StoreError>;
    async fn put_team(&self, team: &Team) -> Result<(), StoreError>;
    async fn put_admin(&self, admin: &Admin) -> Result<(), StoreError>;

    /// Updates only the match reference of a student. Returns the updated
    /// document, or `None` if the student does not exist. A reference to a
    /// team that is not stored fails with [`StoreError::MissingTeam`], also
    /// when the team is deleted concurrently.
    async fn set_student_match(
        &self,
        id: Uuid,
        team_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Option<Student>, StoreError>;

    async fn set_team_active(
        &self,
        id: Uuid,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Team>, StoreError>;

    async fn query_students(&self, selector: StudentSelector) -> Result<Vec<Student>, StoreError>;
    async fn list_teams(&self) -> Result<Vec<Team>, StoreError>;
    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError>;

    /// Deletes a team and clears `matched_team_id` on every student that
    /// referenced it. Returns the number of released students, or `None`
    /// if the team does not exist.
    async fn delete_team(&self, id: Uuid) -> Result<Option<usize>, StoreError>;
    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError>;
}
