// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use juniper::{FieldResult, GraphQLObject};

use crate::{
    graphql::{Context, OrFieldError, parse_id},
    matching::MatchStats,
    model::{MatchRecord, Student, Team},
};

#[derive(GraphQLObject, Clone, Debug, PartialEq)]
pub struct DashboardStats {
    pub students: i32,
    pub teams: i32,
    pub matched_students: i32,
    pub unmatched_students: i32,
    pub active_teams: i32,
}

impl From<MatchStats> for DashboardStats {
    fn from(stats: MatchStats) -> Self {
        let count = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        DashboardStats {
            students: count(stats.students),
            teams: count(stats.teams),
            matched_students: count(stats.matched_students),
            unmatched_students: count(stats.students - stats.matched_students),
            active_teams: count(stats.active_teams),
        }
    }
}

#[cached::proc_macro::cached(time = 30, key = "()", convert = "{ }", result = true)]
async fn cached_stats(context: &Context) -> FieldResult<DashboardStats> {
    context
        .engine()
        .stats()
        .await
        .map(DashboardStats::from)
        .or_field_error()
}

pub async fn get_stats(context: &Context) -> FieldResult<DashboardStats> {
    context.require_admin()?;
    cached_stats(context).await
}

pub async fn create_match(
    context: &Context,
    student_id: String,
    team_id: String,
) -> FieldResult<Student> {
    context.require_admin()?;
    let (student_id, team_id) = (parse_id(&student_id)?, parse_id(&team_id)?);
    context
        .engine()
        .create_match(student_id, team_id)
        .await
        .or_field_error()
}

pub async fn remove_match(
    context: &Context,
    student_id: String,
    team_id: String,
) -> FieldResult<Student> {
    context.require_admin()?;
    let (student_id, team_id) = (parse_id(&student_id)?, parse_id(&team_id)?);
    context
        .engine()
        .remove_match(student_id, team_id)
        .await
        .or_field_error()
}

pub async fn set_team_active(context: &Context, team_id: String, active: bool) -> FieldResult<Team> {
    context.require_admin()?;
    context
        .engine()
        .set_team_active(parse_id(&team_id)?, active)
        .await
        .or_field_error()
}

/// Returns the number of students that lost their match.
pub async fn delete_team(context: &Context, team_id: String) -> FieldResult<i32> {
    context.require_admin()?;
    let released = context
        .engine()
        .delete_team(parse_id(&team_id)?)
        .await
        .or_field_error()?;
    Ok(i32::try_from(released).unwrap_or(i32::MAX))
}

pub async fn get_team_roster(context: &Context, team_id: String) -> FieldResult<Vec<Student>> {
    let team_id = parse_id(&team_id)?;
    context.require_admin_or_owner(team_id)?;
    context
        .engine()
        .get_team_roster(team_id)
        .await
        .or_field_error()
}

pub async fn get_student_match(context: &Context, student_id: String) -> FieldResult<Option<Team>> {
    let student_id = parse_id(&student_id)?;
    context.require_admin_or_owner(student_id)?;
    context
        .engine()
        .get_student_match(student_id)
        .await
        .or_field_error()
}

pub async fn get_matches(context: &Context) -> FieldResult<Vec<MatchRecord>> {
    context.require_admin()?;
    context.engine().list_matches().await.or_field_error()
}
