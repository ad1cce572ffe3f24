// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::*;
use crate::model::{
    Admin, FirstLevel, Student, Team, UnknownTag, parse_tags, tags_to_strings,
};

/* =========================
 * IDENTITIES
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = identities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = identities)]
pub struct NewIdentity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/* =========================
 * SESSIONS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = sessions)]
#[diesel(belongs_to(Identity))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<ipnet::IpNet>,
    pub session_token: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<ipnet::IpNet>,
    pub session_token: String,
}

/* =========================
 * STUDENTS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct StudentRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub school: String,
    pub zip_code: String,
    pub grade: i32,
    pub first_level: FirstLevel,
    pub areas_of_interest: Vec<String>,
    pub time_commitment: i32,
    pub impressive_things: String,
    pub why_join_team: String,
    pub resume_path: Option<String>,
    pub matched_team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StudentRow> for Student {
    type Error = UnknownTag;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Student {
            id: row.id,
            email: row.email,
            name: row.name,
            school: row.school,
            zip_code: row.zip_code,
            grade: row.grade,
            first_level: row.first_level,
            areas_of_interest: parse_tags(&row.areas_of_interest)?,
            time_commitment: row.time_commitment,
            impressive_things: row.impressive_things,
            why_join_team: row.why_join_team,
            resume_path: row.resume_path,
            matched_team_id: row.matched_team_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Student> for StudentRow {
    fn from(student: &Student) -> Self {
        StudentRow {
            id: student.id,
            email: student.email.clone(),
            name: student.name.clone(),
            school: student.school.clone(),
            zip_code: student.zip_code.clone(),
            grade: student.grade,
            first_level: student.first_level,
            areas_of_interest: tags_to_strings(&student.areas_of_interest),
            time_commitment: student.time_commitment,
            impressive_things: student.impressive_things.clone(),
            why_join_team: student.why_join_team.clone(),
            resume_path: student.resume_path.clone(),
            matched_team_id: student.matched_team_id,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

/* =========================
 * TEAMS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TeamRow {
    pub id: Uuid,
    pub team_name: String,
    pub email: String,
    pub zip_code: String,
    pub first_level: FirstLevel,
    pub areas_of_need: Vec<String>,
    pub grade_range_min: i32,
    pub grade_range_max: i32,
    pub time_commitment: i32,
    pub qualities: Vec<String>,
    pub is_school_team: bool,
    pub school_name: Option<String>,
    pub team_awards: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TeamRow> for Team {
    type Error = UnknownTag;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        Ok(Team {
            id: row.id,
            team_name: row.team_name,
            email: row.email,
            zip_code: row.zip_code,
            first_level: row.first_level,
            areas_of_need: parse_tags(&row.areas_of_need)?,
            grade_range_min: row.grade_range_min,
            grade_range_max: row.grade_range_max,
            time_commitment: row.time_commitment,
            qualities: parse_tags(&row.qualities)?,
            is_school_team: row.is_school_team,
            school_name: row.school_name,
            team_awards: row.team_awards,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        TeamRow {
            id: team.id,
            team_name: team.team_name.clone(),
            email: team.email.clone(),
            zip_code: team.zip_code.clone(),
            first_level: team.first_level,
            areas_of_need: tags_to_strings(&team.areas_of_need),
            grade_range_min: team.grade_range_min,
            grade_range_max: team.grade_range_max,
            time_commitment: team.time_commitment,
            qualities: tags_to_strings(&team.qualities),
            is_school_team: team.is_school_team,
            school_name: team.school_name.clone(),
            team_awards: team.team_awards.clone(),
            is_active: team.is_active,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

/* =========================
 * ADMINS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Admin> for AdminRow {
    fn from(admin: &Admin) -> Self {
        AdminRow {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role.clone(),
            created_at: admin.created_at,
            updated_at: admin.updated_at,
        }
    }
}
