// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use uuid::Uuid;

use crate::{
    error::Result,
    matching::MatchingEngine,
    model::{MatchRecord, Profile},
};

/// Finds the profile owned by an identity. Admins are checked first, then
/// students, then teams.
pub async fn profile_of(engine: &MatchingEngine, id: Uuid) -> Result<Option<Profile>> {
    let store = engine.store();
    if let Some(admin) = store.get_admin(id).await? {
        return Ok(Some(Profile::Admin(admin)));
    }
    if let Some(student) = store.get_student(id).await? {
        return Ok(Some(Profile::Student(student)));
    }
    Ok(store.get_team(id).await?.map(Profile::Team))
}

/// The matches visible to the owner of `profile`: a student sees its own
/// match, a team its roster, an admin nothing.
pub async fn matches_for(engine: &MatchingEngine, profile: &Profile) -> Result<Vec<MatchRecord>> {
    match profile {
        Profile::Admin(_) => Ok(Vec::new()),
        Profile::Student(student) => Ok(engine
            .get_student_match(student.id)
            .await?
            .map(|team| MatchRecord {
                student: student.clone(),
                team,
            })
            .into_iter()
            .collect()),
        Profile::Team(team) => Ok(engine
            .get_team_roster(team.id)
            .await?
            .into_iter()
            .map(|student| MatchRecord {
                student,
                team: team.clone(),
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::{
        model::{AccountKind, Admin, fixtures},
        store::{MemoryProfileStore, ProfileStore},
    };

    #[tokio::test]
    async fn test_profile_lookup_and_matches() {
        let store = Arc::new(MemoryProfileStore::new());
        let engine = MatchingEngine::new(store.clone());
        let now = Utc::now();
        let student = fixtures::student("Ada", now);
        let team = fixtures::team("Gear Grinders", now);
        let admin = Admin {
            id: Uuid::now_v7(),
            email: "admin@example.org".to_string(),
            name: "Admin".to_string(),
            role: "admin".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.put_student(&student).await.unwrap();
        store.put_team(&team).await.unwrap();
        store.put_admin(&admin).await.unwrap();
        engine.create_match(student.id, team.id).await.unwrap();

        let as_student = profile_of(&engine, student.id).await.unwrap().unwrap();
        assert_eq!(as_student.kind(), AccountKind::Student);
        let as_team = profile_of(&engine, team.id).await.unwrap().unwrap();
        assert_eq!(as_team.kind(), AccountKind::Team);
        let as_admin = profile_of(&engine, admin.id).await.unwrap().unwrap();
        assert_eq!(as_admin.email(), "admin@example.org");
        assert!(profile_of(&engine, Uuid::now_v7()).await.unwrap().is_none());

        let seen_by_student = matches_for(&engine, &as_student).await.unwrap();
        assert_eq!(seen_by_student.len(), 1);
        assert_eq!(seen_by_student[0].team.id, team.id);
        let seen_by_team = matches_for(&engine, &as_team).await.unwrap();
        assert_eq!(seen_by_team[0].student.id, student.id);
        assert!(matches_for(&engine, &as_admin).await.unwrap().is_empty());
    }
}
