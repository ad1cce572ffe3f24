// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::{FieldResult, graphql_object};

use super::{
    Context,
    handlers::{
        self,
        matches::DashboardStats,
        profiles::{ProfileObject, StudentFilter, TeamFilter},
    },
};
use crate::{
    config::Branding,
    model::{MatchRecord, Student, Team},
};

pub struct Query;

#[graphql_object]
#[graphql(context = Context)]
impl Query {
    fn is_authenticated(context: &Context) -> bool {
        context.is_authenticated()
    }

    /// Regional branding for the front end.
    fn app_config(context: &Context) -> Branding {
        context.services().branding.clone()
    }

    async fn me(context: &Context) -> FieldResult<Option<ProfileObject>> {
        handlers::profiles::get_current_profile(context).await
    }

    /// A student's team, or a team's roster.
    async fn my_matches(context: &Context) -> FieldResult<Vec<MatchRecord>> {
        handlers::profiles::get_my_matches(context).await
    }

    async fn students(context: &Context, filter: Option<StudentFilter>) -> FieldResult<Vec<Student>> {
        handlers::profiles::get_students(context, filter).await
    }

    async fn teams(context: &Context, filter: Option<TeamFilter>) -> FieldResult<Vec<Team>> {
        handlers::profiles::get_teams(context, filter).await
    }

    async fn student(context: &Context, id: String) -> FieldResult<Option<Student>> {
        handlers::profiles::get_student(context, id).await
    }

    async fn team(context: &Context, id: String) -> FieldResult<Option<Team>> {
        handlers::profiles::get_team(context, id).await
    }

    async fn team_roster(context: &Context, team_id: String) -> FieldResult<Vec<Student>> {
        handlers::matches::get_team_roster(context, team_id).await
    }

    /// Null when the student is unmatched or its team no longer exists.
    async fn student_match(context: &Context, student_id: String) -> FieldResult<Option<Team>> {
        handlers::matches::get_student_match(context, student_id).await
    }

    async fn matches(context: &Context) -> FieldResult<Vec<MatchRecord>> {
        handlers::matches::get_matches(context).await
    }

    async fn stats(context: &Context) -> FieldResult<DashboardStats> {
        handlers::matches::get_stats(context).await
    }
}
