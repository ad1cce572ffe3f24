// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::{FieldResult, graphql_object};

use crate::{
    graphql::handlers::{
        self,
        registration::{StudentRegistrationInput, TeamRegistrationInput},
        sessions::SessionCredentials,
    },
    model::{Student, Team},
};

use super::Context;

pub struct Mutation;

#[graphql_object]
#[graphql(
    context = Context,
)]
impl Mutation {
    async fn register_student(
        context: &Context,
        input: StudentRegistrationInput,
    ) -> FieldResult<Student> {
        handlers::registration::register_student(context, input).await
    }

    async fn register_team(context: &Context, input: TeamRegistrationInput) -> FieldResult<Team> {
        handlers::registration::register_team(context, input).await
    }

    async fn login(
        context: &Context,
        email: String,
        password: String,
    ) -> FieldResult<SessionCredentials> {
        handlers::sessions::login(context, email, password).await
    }

    async fn refresh_session(
        context: &Context,
        refresh_token: String,
    ) -> FieldResult<SessionCredentials> {
        handlers::sessions::refresh_session(context, refresh_token).await
    }

    async fn end_session(context: &Context, refresh_token: String) -> FieldResult<bool> {
        handlers::sessions::end_session(context, refresh_token).await
    }

    async fn resend_verification_email(context: &Context) -> FieldResult<bool> {
        handlers::registration::resend_verification_email(context).await
    }

    async fn confirm_email(context: &Context, token: String) -> FieldResult<bool> {
        handlers::registration::confirm_email(context, token).await
    }

    async fn request_password_reset(context: &Context, email: String) -> FieldResult<bool> {
        handlers::registration::request_password_reset(context, email).await
    }

    async fn reset_password(
        context: &Context,
        token: String,
        new_password: String,
    ) -> FieldResult<bool> {
        handlers::registration::reset_password(context, token, new_password).await
    }

    /// Matches a student to a team, replacing any previous match.
    async fn create_match(
        context: &Context,
        student_id: String,
        team_id: String,
    ) -> FieldResult<Student> {
        handlers::matches::create_match(context, student_id, team_id).await
    }

    async fn remove_match(
        context: &Context,
        student_id: String,
        team_id: String,
    ) -> FieldResult<Student> {
        handlers::matches::remove_match(context, student_id, team_id).await
    }

    async fn set_team_active(
        context: &Context,
        team_id: String,
        active: bool,
    ) -> FieldResult<Team> {
        handlers::matches::set_team_active(context, team_id, active).await
    }

    /// Deletes a team and returns how many students were unmatched.
    async fn delete_team(context: &Context, team_id: String) -> FieldResult<i32> {
        handlers::matches::delete_team(context, team_id).await
    }
}
