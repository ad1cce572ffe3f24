// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Manual student/team matching.
//!
//! A match is the `matched_team_id` reference on a student. Teams carry no
//! back-reference; a roster is always recomputed by querying students. Every
//! operation except [`MatchingEngine::delete_team`] writes a single student
//! or team document, and concurrent writes to one student resolve as last
//! write wins in the store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    model::{EntityKind, MatchRecord, Student, Team},
    store::{ProfileStore, StudentSelector},
};

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    pub students: usize,
    pub teams: usize,
    pub matched_students: usize,
    pub active_teams: usize,
}

#[derive(Clone)]
pub struct MatchingEngine {
    store: Arc<dyn ProfileStore>,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Points the student at the team, replacing any previous match.
    ///
    /// Both documents must exist. Nothing is written when either is missing.
    pub async fn create_match(&self, student_id: Uuid, team_id: Uuid) -> Result<Student> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or(Error::not_found(EntityKind::Student, student_id))?;
        if self.store.get_team(team_id).await?.is_none() {
            return Err(Error::not_found(EntityKind::Team, team_id));
        }
        if let Some(previous) = student.matched_team_id().filter(|p| *p != team_id) {
            tracing::info!(
                student_id = %student_id,
                previous_team_id = %previous,
                "Replacing existing match"
            );
        }
        let updated = self
            .store
            .set_student_match(student_id, Some(team_id), Utc::now())
            .await?
            // Deleted between the existence check and the write.
            .ok_or(Error::not_found(EntityKind::Student, student_id))?;
        tracing::info!(student_id = %student_id, team_id = %team_id, "Created match");
        Ok(updated)
    }

    /// Clears the student's match if it currently points at `team_id`.
    /// The team itself does not have to exist any more.
    pub async fn remove_match(&self, student_id: Uuid, team_id: Uuid) -> Result<Student> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or(Error::not_found(EntityKind::Student, student_id))?;
        if student.matched_team_id() != Some(team_id) {
            tracing::debug!(
                student_id = %student_id,
                team_id = %team_id,
                "Student is not matched to this team, nothing to remove"
            );
            return Ok(student);
        }
        let updated = self
            .store
            .set_student_match(student_id, None, Utc::now())
            .await?
            .ok_or(Error::not_found(EntityKind::Student, student_id))?;
        tracing::info!(student_id = %student_id, team_id = %team_id, "Removed match");
        Ok(updated)
    }

    /// Students whose match points at `team_id`, in store order.
    pub async fn get_team_roster(&self, team_id: Uuid) -> Result<Vec<Student>> {
        Ok(self
            .store
            .query_students(StudentSelector::MatchedTo(team_id))
            .await?)
    }

    /// The team a student is matched to. A reference to a team that no
    /// longer exists reads as no match.
    pub async fn get_student_match(&self, student_id: Uuid) -> Result<Option<Team>> {
        let student = self
            .store
            .get_student(student_id)
            .await?
            .ok_or(Error::not_found(EntityKind::Student, student_id))?;
        let Some(team_id) = student.matched_team_id() else {
            return Ok(None);
        };
        let team = self.store.get_team(team_id).await?;
        if team.is_none() {
            tracing::warn!(
                student_id = %student_id,
                team_id = %team_id,
                "Student references a team that does not exist"
            );
        }
        Ok(team)
    }

    /// Every current match, most recently registered student first.
    pub async fn list_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut students = self.store.query_students(StudentSelector::Matched).await?;
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let mut matches = Vec::with_capacity(students.len());
        for student in students {
            let Some(team_id) = student.matched_team_id() else {
                continue;
            };
            match self.store.get_team(team_id).await? {
                Some(team) => matches.push(MatchRecord { student, team }),
                None => tracing::warn!(
                    student_id = %student.id,
                    team_id = %team_id,
                    "Skipping match with a missing team"
                ),
            }
        }
        Ok(matches)
    }

    /// Deletes a team and releases its students. Returns how many students
    /// were released.
    pub async fn delete_team(&self, team_id: Uuid) -> Result<usize> {
        let released = self
            .store
            .delete_team(team_id)
            .await?
            .ok_or(Error::not_found(EntityKind::Team, team_id))?;
        tracing::info!(team_id = %team_id, released, "Deleted team");
        Ok(released)
    }

    pub async fn set_team_active(&self, team_id: Uuid, active: bool) -> Result<Team> {
        let team = self
            .store
            .set_team_active(team_id, active, Utc::now())
            .await?
            .ok_or(Error::not_found(EntityKind::Team, team_id))?;
        tracing::info!(team_id = %team_id, active, "Changed team status");
        Ok(team)
    }

    pub async fn stats(&self) -> Result<MatchStats> {
        let students = self.store.query_students(StudentSelector::All).await?;
        let teams = self.store.list_teams().await?;
        Ok(MatchStats {
            students: students.len(),
            teams: teams.len(),
            matched_students: students.iter().filter(|s| s.is_matched()).count(),
            active_teams: teams.iter().filter(|t| t.is_active).count(),
        })
    }
}
