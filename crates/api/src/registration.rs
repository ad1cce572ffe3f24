// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Student and team sign-up.
//!
//! Registration validates the payload, creates the identity, uploads the
//! optional resume and writes the profile. A failed profile write deletes
//! the identity and the uploaded resume again, so no half-registered account
//! is left behind.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::Result,
    identity::{IdentityProvider, normalize_email},
    model::{Area, FirstLevel, Quality, Student, Team},
    store::ProfileStore,
    uploads::{ObjectStore, RESUME_FOLDER, store_with_timeout, unique_object_path},
    validation::{AccountFields, StudentFields, TeamFields, validate_student, validate_team},
};

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StudentRegistration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub school: String,
    pub zip_code: String,
    pub grade: i32,
    pub first_level: FirstLevel,
    pub areas_of_interest: BTreeSet<Area>,
    pub time_commitment: i32,
    pub impressive_things: String,
    pub why_join_team: String,
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone)]
pub struct TeamRegistration {
    pub email: String,
    pub password: String,
    pub team_name: String,
    pub zip_code: String,
    pub first_level: FirstLevel,
    pub areas_of_need: BTreeSet<Area>,
    pub grade_range_min: i32,
    pub grade_range_max: i32,
    pub time_commitment: i32,
    pub qualities: BTreeSet<Quality>,
    pub is_school_team: bool,
    pub school_name: Option<String>,
    pub team_awards: String,
}

pub struct RegistrationService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    objects: Arc<dyn ObjectStore>,
    upload_timeout: Duration,
}

impl RegistrationService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
        objects: Arc<dyn ObjectStore>,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            store,
            objects,
            upload_timeout,
        }
    }

    pub async fn register_student(&self, input: StudentRegistration) -> Result<Student> {
        validate_student(&StudentFields {
            account: AccountFields {
                email: &input.email,
                password: &input.password,
            },
            name: &input.name,
            school: &input.school,
            zip_code: &input.zip_code,
            grade: input.grade,
            areas_of_interest: &input.areas_of_interest,
            time_commitment: input.time_commitment,
            impressive_things: &input.impressive_things,
            why_join_team: &input.why_join_team,
        })?;

        let id = self
            .identity
            .create_identity(&input.email, &input.password)
            .await?;
        let resume_path = match &input.resume {
            Some(resume) => self.upload_resume(id, resume).await,
            None => None,
        };

        let now = Utc::now();
        let student = Student {
            id,
            email: normalize_email(&input.email),
            name: input.name.trim().to_string(),
            school: input.school.trim().to_string(),
            zip_code: input.zip_code.trim().to_string(),
            grade: input.grade,
            first_level: input.first_level,
            areas_of_interest: input.areas_of_interest,
            time_commitment: input.time_commitment,
            impressive_things: input.impressive_things.trim().to_string(),
            why_join_team: input.why_join_team.trim().to_string(),
            resume_path,
            matched_team_id: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.store.put_student(&student).await {
            self.roll_back(id, student.resume_path.as_deref()).await;
            return Err(e.into());
        }
        tracing::info!(student_id = %id, "Registered student");
        self.send_verification(id).await;
        Ok(student)
    }

    pub async fn register_team(&self, input: TeamRegistration) -> Result<Team> {
        validate_team(&TeamFields {
            account: AccountFields {
                email: &input.email,
                password: &input.password,
            },
            team_name: &input.team_name,
            zip_code: &input.zip_code,
            is_school_team: input.is_school_team,
            school_name: input.school_name.as_deref(),
            areas_of_need: &input.areas_of_need,
            grade_range_min: input.grade_range_min,
            grade_range_max: input.grade_range_max,
            time_commitment: input.time_commitment,
            team_awards: &input.team_awards,
            qualities: &input.qualities,
        })?;

        let id = self
            .identity
            .create_identity(&input.email, &input.password)
            .await?;
        let now = Utc::now();
        let team = Team {
            id,
            team_name: input.team_name.trim().to_string(),
            email: normalize_email(&input.email),
            zip_code: input.zip_code.trim().to_string(),
            first_level: input.first_level,
            areas_of_need: input.areas_of_need,
            grade_range_min: input.grade_range_min,
            grade_range_max: input.grade_range_max,
            time_commitment: input.time_commitment,
            qualities: input.qualities,
            is_school_team: input.is_school_team,
            school_name: input
                .school_name
                .filter(|_| input.is_school_team)
                .map(|s| s.trim().to_string()),
            team_awards: input.team_awards.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.store.put_team(&team).await {
            self.roll_back(id, None).await;
            return Err(e.into());
        }
        tracing::info!(team_id = %id, "Registered team");
        self.send_verification(id).await;
        Ok(team)
    }

    /// Uploads the resume. Failures and timeouts are logged and the student
    /// is registered without one.
    async fn upload_resume(&self, id: Uuid, resume: &ResumeUpload) -> Option<String> {
        let path = unique_object_path(RESUME_FOLDER, &resume.file_name);
        match store_with_timeout(
            self.objects.as_ref(),
            resume.bytes.clone(),
            &path,
            self.upload_timeout,
        )
        .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(student_id = %id, "Resume upload failed, continuing without it: {e}");
                None
            }
        }
    }

    async fn roll_back(&self, id: Uuid, resume_path: Option<&str>) {
        tracing::warn!(identity_id = %id, "Profile write failed, rolling back registration");
        if let Some(path) = resume_path {
            if let Err(e) = self.objects.delete(path).await {
                tracing::warn!(identity_id = %id, "Failed to remove uploaded resume {path}: {e}");
            }
        }
        if let Err(e) = self.identity.delete_identity(id).await {
            tracing::error!(identity_id = %id, "Failed to delete identity during rollback: {e}");
        }
    }

    async fn send_verification(&self, id: Uuid) {
        if let Err(e) = self.identity.send_verification_email(id).await {
            tracing::warn!(identity_id = %id, "Failed to send verification email: {e}");
        }
    }
}
