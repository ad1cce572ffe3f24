// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, scoped_futures::ScopedFutureExt,
};
use uuid::Uuid;

use super::{ProfileStore, StoreError, StudentSelector};
use crate::{
    db::{
        DbPool,
        models::{AdminRow, StudentRow, TeamRow},
        schema::{admins, students, teams},
    },
    model::{Admin, Student, Team},
};

/// Profile store backed by the `students`, `teams` and `admins` tables.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: DbPool,
}

impl PgProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn get_db_conn(
        &self,
    ) -> Result<diesel_async::pooled_connection::bb8::PooledConnection<'_, AsyncPgConnection>, StoreError>
    {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

fn into_students(rows: Vec<StudentRow>) -> Result<Vec<Student>, StoreError> {
    rows.into_iter()
        .map(|row| Student::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        let row = students::table
            .find(id)
            .select(StudentRow::as_select())
            .first(&mut self.get_db_conn().await?)
            .await
            .optional()?;
        Ok(row.map(Student::try_from).transpose()?)
    }

    async fn get_team(&self, id: Uuid) -> Result<Option<Team>, StoreError> {
        let row = teams::table
            .find(id)
            .select(TeamRow::as_select())
            .first(&mut self.get_db_conn().await?)
            .await
            .optional()?;
        Ok(row.map(Team::try_from).transpose()?)
    }

    async fn get_admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError> {
        let row = admins::table
            .find(id)
            .select(AdminRow::as_select())
            .first(&mut self.get_db_conn().await?)
            .await
            .optional()?;
        Ok(row.map(Admin::from))
    }

    async fn put_student(&self, student: &Student) -> Result<(), StoreError> {
        let row = StudentRow::from(student);
        diesel::insert_into(students::table)
            .values(&row)
            .on_conflict(students::id)
            .do_update()
            .set(&row)
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(())
    }

    async fn put_team(&self, team: &Team) -> Result<(), StoreError> {
        let row = TeamRow::from(team);
        diesel::insert_into(teams::table)
            .values(&row)
            .on_conflict(teams::id)
            .do_update()
            .set(&row)
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(())
    }

    async fn put_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        let row = AdminRow::from(admin);
        diesel::insert_into(admins::table)
            .values(&row)
            .on_conflict(admins::id)
            .do_update()
            .set(&row)
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(())
    }

    async fn set_student_match(
        &self,
        id: Uuid,
        team_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Option<Student>, StoreError> {
        let row = diesel::update(students::table.find(id))
            .set((
                students::matched_team_id.eq(team_id),
                students::updated_at.eq(at),
            ))
            .returning(StudentRow::as_returning())
            .get_result(&mut self.get_db_conn().await?)
            .await
            .optional()
            .map_err(|e| match (e, team_id) {
                (DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _), Some(team_id)) => {
                    StoreError::MissingTeam(team_id)
                }
                (other, _) => other.into(),
            })?;
        Ok(row.map(Student::try_from).transpose()?)
    }

    async fn set_team_active(
        &self,
        id: Uuid,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Team>, StoreError> {
        let row = diesel::update(teams::table.find(id))
            .set((teams::is_active.eq(active), teams::updated_at.eq(at)))
            .returning(TeamRow::as_returning())
            .get_result(&mut self.get_db_conn().await?)
            .await
            .optional()?;
        Ok(row.map(Team::try_from).transpose()?)
    }

    async fn query_students(&self, selector: StudentSelector) -> Result<Vec<Student>, StoreError> {
        let mut query = students::table
            .select(StudentRow::as_select())
            .order_by((students::created_at.asc(), students::id.asc()))
            .into_boxed();
        query = match selector {
            StudentSelector::All => query,
            StudentSelector::Matched => query.filter(students::matched_team_id.is_not_null()),
            StudentSelector::Unmatched => query.filter(students::matched_team_id.is_null()),
            StudentSelector::MatchedTo(team_id) => {
                query.filter(students::matched_team_id.eq(team_id))
            }
        };
        let rows = query
            .load::<StudentRow>(&mut self.get_db_conn().await?)
            .await?;
        into_students(rows)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        let rows = teams::table
            .select(TeamRow::as_select())
            .order_by((teams::created_at.asc(), teams::id.asc()))
            .load::<TeamRow>(&mut self.get_db_conn().await?)
            .await?;
        rows.into_iter()
            .map(|row| Team::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError> {
        let rows = admins::table
            .select(AdminRow::as_select())
            .order_by((admins::created_at.asc(), admins::id.asc()))
            .load::<AdminRow>(&mut self.get_db_conn().await?)
            .await?;
        Ok(rows.into_iter().map(Admin::from).collect())
    }

    async fn delete_team(&self, id: Uuid) -> Result<Option<usize>, StoreError> {
        let mut conn = self.get_db_conn().await?;
        let released = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let released = diesel::update(
                        students::table.filter(students::matched_team_id.eq(id)),
                    )
                    .set((
                        students::matched_team_id.eq(None::<Uuid>),
                        students::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;
                    let deleted = diesel::delete(teams::table.find(id)).execute(conn).await?;
                    Ok((deleted > 0).then_some(released))
                }
                .scope_boxed()
            })
            .await?;
        Ok(released)
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = diesel::delete(admins::table.find(id))
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(deleted > 0)
    }
}
