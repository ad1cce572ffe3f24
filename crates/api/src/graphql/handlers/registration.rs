// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use base64::prelude::*;
use juniper::{FieldResult, GraphQLInputObject};

use crate::{
    error::{Error, ValidationErrors},
    graphql::{Context, OrFieldError},
    model::{Area, FirstLevel, Quality, Student, Team},
    registration::{ResumeUpload, StudentRegistration, TeamRegistration},
};

const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

#[derive(GraphQLInputObject)]
pub struct ResumeInput {
    pub file_name: String,
    /// File contents, standard base64.
    pub content_base64: String,
}

#[derive(GraphQLInputObject)]
pub struct StudentRegistrationInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub school: String,
    pub zip_code: String,
    pub grade: i32,
    pub first_level: FirstLevel,
    pub areas_of_interest: Vec<Area>,
    pub time_commitment: i32,
    pub impressive_things: String,
    pub why_join_team: String,
    pub resume: Option<ResumeInput>,
}

#[derive(GraphQLInputObject)]
pub struct TeamRegistrationInput {
    pub email: String,
    pub password: String,
    pub team_name: String,
    pub zip_code: String,
    pub first_level: FirstLevel,
    pub areas_of_need: Vec<Area>,
    pub grade_range_min: i32,
    pub grade_range_max: i32,
    pub time_commitment: i32,
    pub qualities: Vec<Quality>,
    pub is_school_team: bool,
    pub school_name: Option<String>,
    pub team_awards: String,
}

fn decode_resume(resume: ResumeInput) -> Result<ResumeUpload, Error> {
    let mut errors = ValidationErrors::default();
    match BASE64_STANDARD.decode(resume.content_base64.trim()) {
        Ok(bytes) if bytes.len() > MAX_RESUME_BYTES => {
            errors.add("resume", "Resume must be smaller than 5 MB");
        }
        Ok(bytes) => {
            return Ok(ResumeUpload {
                file_name: resume.file_name,
                bytes,
            });
        }
        Err(_) => errors.add("resume", "Resume could not be read"),
    }
    Err(errors.into())
}

pub async fn register_student(
    context: &Context,
    input: StudentRegistrationInput,
) -> FieldResult<Student> {
    let resume = input.resume.map(decode_resume).transpose().or_field_error()?;
    context
        .services()
        .registration
        .register_student(StudentRegistration {
            email: input.email,
            password: input.password,
            name: input.name,
            school: input.school,
            zip_code: input.zip_code,
            grade: input.grade,
            first_level: input.first_level,
            areas_of_interest: input.areas_of_interest.into_iter().collect(),
            time_commitment: input.time_commitment,
            impressive_things: input.impressive_things,
            why_join_team: input.why_join_team,
            resume,
        })
        .await
        .or_field_error()
}

pub async fn register_team(context: &Context, input: TeamRegistrationInput) -> FieldResult<Team> {
    context
        .services()
        .registration
        .register_team(TeamRegistration {
            email: input.email,
            password: input.password,
            team_name: input.team_name,
            zip_code: input.zip_code,
            first_level: input.first_level,
            areas_of_need: input.areas_of_need.into_iter().collect(),
            grade_range_min: input.grade_range_min,
            grade_range_max: input.grade_range_max,
            time_commitment: input.time_commitment,
            qualities: input.qualities.into_iter().collect(),
            is_school_team: input.is_school_team,
            school_name: input.school_name,
            team_awards: input.team_awards,
        })
        .await
        .or_field_error()
}

pub async fn resend_verification_email(context: &Context) -> FieldResult<bool> {
    let user = context.require_authentication()?;
    context
        .services()
        .identity
        .send_verification_email(user.identity_id)
        .await
        .or_field_error()?;
    Ok(true)
}

pub async fn confirm_email(context: &Context, token: String) -> FieldResult<bool> {
    context
        .services()
        .identity
        .confirm_email(&token)
        .await
        .or_field_error()?;
    Ok(true)
}

/// Always succeeds for well-formed addresses, whether or not an account
/// exists.
pub async fn request_password_reset(context: &Context, email: String) -> FieldResult<bool> {
    context
        .services()
        .identity
        .send_password_reset(&email)
        .await
        .or_field_error()?;
    Ok(true)
}

pub async fn reset_password(
    context: &Context,
    token: String,
    new_password: String,
) -> FieldResult<bool> {
    context
        .services()
        .identity
        .reset_password(&token, &new_password)
        .await
        .or_field_error()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graphql::testing::app, identity::testing::token_from, store::ProfileStore};

    fn student_input() -> StudentRegistrationInput {
        StudentRegistrationInput {
            email: "ada@example.org".to_string(),
            password: "Sprockets42".to_string(),
            name: "Ada Lovelace".to_string(),
            school: "Lincoln High".to_string(),
            zip_code: "97201".to_string(),
            grade: 11,
            first_level: FirstLevel::FirstTechChallenge,
            areas_of_interest: vec![Area::Software, Area::Outreach],
            time_commitment: 6,
            impressive_things: "Led the school coding club".to_string(),
            why_join_team: "I want to build real robots".to_string(),
            resume: Some(ResumeInput {
                file_name: "resume.pdf".to_string(),
                content_base64: BASE64_STANDARD.encode(b"%PDF-1.7"),
            }),
        }
    }

    #[tokio::test]
    async fn test_register_and_confirm_student() {
        let app = app();
        let ctx = app.context(None);
        let student = register_student(&ctx, student_input()).await.unwrap();
        assert!(student.resume_path.is_some());
        assert!(app.store.get_student(student.id).await.unwrap().is_some());

        let token = token_from(&app.outbox.sent()[0].body);
        assert!(confirm_email(&ctx, token).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_resume_is_a_field_violation() {
        let app = app();
        let mut input = student_input();
        input.resume = Some(ResumeInput {
            file_name: "resume.pdf".to_string(),
            content_base64: "not base64!".to_string(),
        });
        let err = register_student(&app.context(None), input)
            .await
            .unwrap_err();
        let fields = err
            .extensions()
            .as_object_value()
            .and_then(|o| o.get_field_value("fields"))
            .and_then(|f| f.as_list_value())
            .map(|f| f.len());
        assert_eq!(fields, Some(1));
        assert_eq!(app.credentials.identity_count(), 0);
    }

    #[tokio::test]
    async fn test_password_reset_for_unknown_email_succeeds() {
        let app = app();
        assert!(
            request_password_reset(&app.context(None), "ghost@example.org".to_string())
                .await
                .unwrap()
        );
        assert!(app.outbox.sent().is_empty());
    }
}
