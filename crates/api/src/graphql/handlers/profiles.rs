// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::{FieldResult, GraphQLInputObject, GraphQLUnion, graphql_object};

use crate::{
    graphql::{Context, OrFieldError, parse_id},
    listing::{ListQuery, SortKey, StatusToggles},
    model::{Admin, Area, FirstLevel, MatchRecord, Profile, Quality, Student, Team},
    profile::{matches_for, profile_of},
    store::StudentSelector,
};

#[graphql_object]
#[graphql(context = Context)]
impl Student {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn school(&self) -> &str {
        &self.school
    }

    pub fn zip_code(&self) -> &str {
        &self.zip_code
    }

    pub fn grade(&self) -> i32 {
        self.grade
    }

    pub fn first_level(&self) -> FirstLevel {
        self.first_level
    }

    pub fn areas_of_interest(&self) -> Vec<Area> {
        self.areas_of_interest.iter().copied().collect()
    }

    /// Hours per week.
    pub fn time_commitment(&self) -> i32 {
        self.time_commitment
    }

    pub fn impressive_things(&self) -> &str {
        &self.impressive_things
    }

    pub fn why_join_team(&self) -> &str {
        &self.why_join_team
    }

    /// Download link for the uploaded resume, if there is one.
    pub async fn resume_url(&self, ctx: &Context) -> Option<String> {
        let path = self.resume_path.as_deref()?;
        match ctx.services().objects.retrieval_url(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(student_id = %self.id, "Could not resolve resume {path}: {e}");
                None
            }
        }
    }

    #[graphql(name = "isMatched")]
    pub fn matched(&self) -> bool {
        self.is_matched()
    }

    #[graphql(name = "matchedTeamId")]
    pub fn matched_team_ref(&self) -> Option<String> {
        self.matched_team_id().map(|id| id.to_string())
    }

    pub async fn matched_team(&self, ctx: &Context) -> FieldResult<Option<Team>> {
        ctx.engine().get_student_match(self.id).await.or_field_error()
    }

    pub fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }

    pub fn updated_at(&self) -> String {
        self.updated_at.to_rfc3339()
    }
}

#[graphql_object]
#[graphql(context = Context)]
impl Team {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn zip_code(&self) -> &str {
        &self.zip_code
    }

    pub fn first_level(&self) -> FirstLevel {
        self.first_level
    }

    pub fn areas_of_need(&self) -> Vec<Area> {
        self.areas_of_need.iter().copied().collect()
    }

    pub fn grade_range_min(&self) -> i32 {
        self.grade_range_min
    }

    pub fn grade_range_max(&self) -> i32 {
        self.grade_range_max
    }

    pub fn time_commitment(&self) -> i32 {
        self.time_commitment
    }

    pub fn qualities(&self) -> Vec<Quality> {
        self.qualities.iter().copied().collect()
    }

    pub fn is_school_team(&self) -> bool {
        self.is_school_team
    }

    pub fn school_name(&self) -> Option<&str> {
        self.school_name.as_deref()
    }

    pub fn team_awards(&self) -> &str {
        &self.team_awards
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Matched students. Visible to admins and the team itself.
    pub async fn roster(&self, ctx: &Context) -> FieldResult<Vec<Student>> {
        ctx.require_admin_or_owner(self.id)?;
        ctx.engine().get_team_roster(self.id).await.or_field_error()
    }

    pub fn created_at(&self) -> String {
        self.created_at.to_rfc3339()
    }

    pub fn updated_at(&self) -> String {
        self.updated_at.to_rfc3339()
    }
}

#[graphql_object]
#[graphql(context = Context)]
impl Admin {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

#[graphql_object]
#[graphql(context = Context)]
impl MatchRecord {
    pub fn student(&self) -> &Student {
        &self.student
    }

    pub fn team(&self) -> &Team {
        &self.team
    }
}

#[derive(GraphQLUnion)]
#[graphql(context = Context, name = "Profile")]
pub enum ProfileObject {
    Admin(Admin),
    Student(Student),
    Team(Team),
}

impl From<Profile> for ProfileObject {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Admin(a) => ProfileObject::Admin(a),
            Profile::Student(s) => ProfileObject::Student(s),
            Profile::Team(t) => ProfileObject::Team(t),
        }
    }
}

#[derive(GraphQLInputObject, Default)]
pub struct StudentFilter {
    /// Part of the name or email, case-insensitive.
    pub search: Option<String>,
    pub zip_code: Option<String>,
    pub first_level: Option<FirstLevel>,
    pub only_matched: Option<bool>,
    pub only_unmatched: Option<bool>,
    pub sort: Option<SortKey>,
}

impl From<StudentFilter> for ListQuery {
    fn from(filter: StudentFilter) -> Self {
        ListQuery {
            search: filter.search,
            location: filter.zip_code,
            first_level: filter.first_level,
            status: StatusToggles::from_flags(
                filter.only_matched.unwrap_or(false),
                filter.only_unmatched.unwrap_or(false),
            ),
            sort: filter.sort.unwrap_or_default(),
        }
    }
}

#[derive(GraphQLInputObject, Default)]
pub struct TeamFilter {
    pub search: Option<String>,
    pub zip_code: Option<String>,
    pub first_level: Option<FirstLevel>,
    pub only_active: Option<bool>,
    pub only_inactive: Option<bool>,
    pub sort: Option<SortKey>,
}

impl From<TeamFilter> for ListQuery {
    fn from(filter: TeamFilter) -> Self {
        ListQuery {
            search: filter.search,
            location: filter.zip_code,
            first_level: filter.first_level,
            status: StatusToggles::from_flags(
                filter.only_active.unwrap_or(false),
                filter.only_inactive.unwrap_or(false),
            ),
            sort: filter.sort.unwrap_or_default(),
        }
    }
}

pub async fn get_students(
    context: &Context,
    filter: Option<StudentFilter>,
) -> FieldResult<Vec<Student>> {
    context.require_admin()?;
    let students = context
        .engine()
        .store()
        .query_students(StudentSelector::All)
        .await
        .or_field_error()?;
    Ok(ListQuery::from(filter.unwrap_or_default()).apply(students))
}

pub async fn get_teams(context: &Context, filter: Option<TeamFilter>) -> FieldResult<Vec<Team>> {
    context.require_admin()?;
    let teams = context
        .engine()
        .store()
        .list_teams()
        .await
        .or_field_error()?;
    Ok(ListQuery::from(filter.unwrap_or_default()).apply(teams))
}

pub async fn get_student(context: &Context, id: String) -> FieldResult<Option<Student>> {
    let id = parse_id(&id)?;
    context.require_admin_or_owner(id)?;
    context
        .engine()
        .store()
        .get_student(id)
        .await
        .or_field_error()
}

pub async fn get_team(context: &Context, id: String) -> FieldResult<Option<Team>> {
    let id = parse_id(&id)?;
    context.require_admin_or_owner(id)?;
    context.engine().store().get_team(id).await.or_field_error()
}

pub async fn get_current_profile(context: &Context) -> FieldResult<Option<ProfileObject>> {
    let user = context.require_authentication()?;
    Ok(profile_of(context.engine(), user.identity_id)
        .await
        .or_field_error()?
        .map(ProfileObject::from))
}

pub async fn get_my_matches(context: &Context) -> FieldResult<Vec<MatchRecord>> {
    let user = context.require_authentication()?;
    let Some(profile) = profile_of(context.engine(), user.identity_id)
        .await
        .or_field_error()?
    else {
        return Err(juniper::FieldError::new(
            "Profile not found. Please complete your registration.",
            juniper::Value::null(),
        ));
    };
    matches_for(context.engine(), &profile).await.or_field_error()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        graphql::testing::app,
        model::{AccountKind, fixtures},
        store::ProfileStore,
    };

    #[tokio::test]
    async fn test_student_list_requires_admin() {
        let app = app();
        let ctx = app.as_kind(AccountKind::Student, uuid::Uuid::now_v7());
        assert!(get_students(&ctx, None).await.is_err());
        assert!(get_students(&app.context(None), None).await.is_err());
    }

    #[tokio::test]
    async fn test_student_list_filters_and_sorts() {
        let app = app();
        let now = Utc::now();
        let older = fixtures::student("Older", now - Duration::days(2));
        let newer = fixtures::student("Newer", now);
        let team = fixtures::team("Gear Grinders", now);
        app.store.put_student(&older).await.unwrap();
        app.store.put_student(&newer).await.unwrap();
        app.store.put_team(&team).await.unwrap();
        app.base
            .services
            .engine
            .create_match(older.id, team.id)
            .await
            .unwrap();

        let ctx = app.as_kind(AccountKind::Admin, uuid::Uuid::now_v7());
        let all = get_students(&ctx, None).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        let unmatched = get_students(
            &ctx,
            Some(StudentFilter {
                only_matched: Some(true),
                only_unmatched: Some(true),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            unmatched.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![newer.id]
        );
    }

    #[tokio::test]
    async fn test_owner_can_read_own_profile_only() {
        let app = app();
        let student = fixtures::student("Ada", Utc::now());
        app.store.put_student(&student).await.unwrap();

        let own = app.as_kind(AccountKind::Student, student.id);
        assert!(
            get_student(&own, student.id.to_string())
                .await
                .unwrap()
                .is_some()
        );
        let other = app.as_kind(AccountKind::Student, uuid::Uuid::now_v7());
        assert!(get_student(&other, student.id.to_string()).await.is_err());
        assert!(matches!(
            get_current_profile(&own).await.unwrap(),
            Some(ProfileObject::Student(_))
        ));
    }
}
