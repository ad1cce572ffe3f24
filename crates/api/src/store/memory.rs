// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ProfileStore, StoreError, StudentSelector};
use crate::model::{Admin, Student, Team};

/// Profile store kept in process memory.
///
/// Used by tests and local development. It can be switched unavailable to
/// simulate a store outage.
#[derive(Default)]
pub struct MemoryProfileStore {
    students: DashMap<Uuid, Student>,
    teams: DashMap<Uuid, Team>,
    admins: DashMap<Uuid, Admin>,
    // Serializes team deletion against match writes and the student sweep.
    cascade: Mutex<()>,
    unavailable: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

fn sorted<T: Clone>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (DateTime<Utc>, Uuid),
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        self.check()?;
        Ok(self.students.get(&id).map(|s| s.clone()))
    }

    async fn get_team(&self, id: Uuid) -> Result<Option<Team>, StoreError> {
        self.check()?;
        Ok(self.teams.get(&id).map(|t| t.clone()))
    }

    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError> {
        self.check()?;
        Ok(self.admins.get(&id).map(|a| a.clone()))
    }

    async fn put_student(&self, student: &Student) -> Result<(), StoreError> {
        self.check()?;
        self.students.insert(student.id, student.clone());
        Ok(())
    }

    async fn put_team(&self, team: &Team) -> Result<(), StoreError> {
        self.check()?;
        self.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn put_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        self.check()?;
        self.admins.insert(admin.id, admin.clone());
        Ok(())
    }

    async fn set_student_match(
        &self,
        id: Uuid,
        team_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Option<Student>, StoreError> {
        self.check()?;
        let _guard = self.cascade.lock().await;
        if let Some(team_id) = team_id.filter(|t| !self.teams.contains_key(t)) {
            return Err(StoreError::MissingTeam(team_id));
        }
        Ok(self.students.get_mut(&id).map(|mut student| {
            student.assign_team(team_id, at);
            student.clone()
        }))
    }

    async fn set_team_active(
        &self,
        id: Uuid,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Team>, StoreError> {
        self.check()?;
        Ok(self.teams.get_mut(&id).map(|mut team| {
            team.is_active = active;
            team.updated_at = at;
            team.clone()
        }))
    }

    async fn query_students(&self, selector: StudentSelector) -> Result<Vec<Student>, StoreError> {
        self.check()?;
        Ok(sorted(
            self.students
                .iter()
                .filter(|s| selector.admits(s.value()))
                .map(|s| s.value().clone()),
            |s| (s.created_at, s.id),
        ))
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        self.check()?;
        Ok(sorted(
            self.teams.iter().map(|t| t.value().clone()),
            |t| (t.created_at, t.id),
        ))
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError> {
        self.check()?;
        Ok(sorted(
            self.admins.iter().map(|a| a.value().clone()),
            |a| (a.created_at, a.id),
        ))
    }

    async fn delete_team(&self, id: Uuid) -> Result<Option<usize>, StoreError> {
        self.check()?;
        let _guard = self.cascade.lock().await;
        if self.teams.remove(&id).is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        let mut released = 0;
        for mut student in self.students.iter_mut() {
            if student.matched_team_id() == Some(id) {
                student.assign_team(None, now);
                released += 1;
            }
        }
        Ok(Some(released))
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.admins.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::fixtures;

    #[tokio::test]
    async fn test_queries_are_ordered_by_creation() {
        let store = MemoryProfileStore::new();
        let now = Utc::now();
        let late = fixtures::student("Late", now);
        let early = fixtures::student("Early", now - Duration::days(2));
        store.put_student(&late).await.unwrap();
        store.put_student(&early).await.unwrap();

        let all = store.query_students(StudentSelector::All).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Early", "Late"]
        );
    }

    #[tokio::test]
    async fn test_delete_team_releases_students() {
        let store = MemoryProfileStore::new();
        let now = Utc::now();
        let team = fixtures::team("Gear Grinders", now);
        let other = fixtures::team("Circuit Breakers", now);
        store.put_team(&team).await.unwrap();
        store.put_team(&other).await.unwrap();
        let a = fixtures::student("A", now);
        let b = fixtures::student("B", now);
        store.put_student(&a).await.unwrap();
        store.put_student(&b).await.unwrap();
        store.set_student_match(a.id, Some(team.id), now).await.unwrap();
        store.set_student_match(b.id, Some(other.id), now).await.unwrap();

        assert_eq!(store.delete_team(team.id).await.unwrap(), Some(1));
        assert!(!store.get_student(a.id).await.unwrap().unwrap().is_matched());
        assert!(store.get_student(b.id).await.unwrap().unwrap().is_matched());
        assert_eq!(store.delete_team(team.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_match_to_deleted_team_is_rejected() {
        let store = MemoryProfileStore::new();
        let now = Utc::now();
        let team = fixtures::team("Gear Grinders", now);
        let student = fixtures::student("Ada", now);
        store.put_team(&team).await.unwrap();
        store.put_student(&student).await.unwrap();
        store.delete_team(team.id).await.unwrap();

        assert!(matches!(
            store.set_student_match(student.id, Some(team.id), now).await,
            Err(StoreError::MissingTeam(id)) if id == team.id
        ));
        assert!(!store.get_student(student.id).await.unwrap().unwrap().is_matched());
        // Clearing a match never needs the team.
        assert!(store.set_student_match(student.id, None, now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryProfileStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get_student(Uuid::now_v7()).await,
            Err(StoreError::Unavailable)
        ));
        store.set_unavailable(false);
        assert!(store.get_student(Uuid::now_v7()).await.unwrap().is_none());
    }
}
