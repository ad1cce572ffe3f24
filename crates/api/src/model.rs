// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Profile documents held by the profile store.
//!
//! A student references at most one team through `matched_team_id`; the
//! matched state is always derived from that reference.

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Program tier a student wants to join or a team competes in.
#[derive(
    diesel_derive_enum::DbEnum,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Ord,
    PartialOrd,
    GraphQLEnum,
)]
#[DbValueStyle = "kebab-case"]
#[ExistingTypePath = "crate::db::schema::sql_types::FirstLevel"]
#[serde(rename_all = "kebab-case")]
pub enum FirstLevel {
    JrFirstLegoLeague,
    FirstLegoLeague,
    FirstTechChallenge,
    FirstRoboticsCompetition,
}

impl FirstLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FirstLevel::JrFirstLegoLeague => "Jr. FIRST Lego League",
            FirstLevel::FirstLegoLeague => "FIRST Lego League",
            FirstLevel::FirstTechChallenge => "FIRST Tech Challenge",
            FirstLevel::FirstRoboticsCompetition => "FIRST Robotics Competition",
        }
    }
}

/// Error returned when a stored tag does not name a known catalog entry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $tag:literal, $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, PartialEq, Eq, Hash, Clone, Copy, Ord, PartialOrd, Deserialize, Serialize, GraphQLEnum,
        )]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    other => Err(UnknownTag {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tag_enum!(
    /// Area a student is interested in, or a team needs help with.
    Area, "area" {
        Hardware => "hardware", "Hardware",
        Software => "software", "Software",
        Outreach => "outreach", "Outreach",
    }
);

tag_enum!(
    /// Qualities a team looks for in new members. Teams pick up to three.
    Quality, "quality" {
        Teamwork => "teamwork", "Teamwork & Collaboration",
        ProblemSolving => "problem-solving", "Problem Solving",
        Creativity => "creativity", "Creativity & Innovation",
        Leadership => "leadership", "Leadership",
        Communication => "communication", "Communication Skills",
        TechnicalSkills => "technical-skills", "Technical Skills",
        Perseverance => "perseverance", "Perseverance & Resilience",
        Mentorship => "mentorship", "Mentorship & Teaching",
        Organization => "organization", "Organization & Planning",
        Sportsmanship => "sportsmanship", "Gracious Professionalism",
    }
);

/// Parses stored tags into a set, failing on the first unknown one.
pub fn parse_tags<T: FromStr<Err = UnknownTag> + Ord>(
    tags: &[String],
) -> Result<BTreeSet<T>, UnknownTag> {
    tags.iter().map(|t| t.parse()).collect()
}

pub fn tags_to_strings<T: fmt::Display>(tags: &BTreeSet<T>) -> Vec<String> {
    tags.iter().map(ToString::to_string).collect()
}

/// Which collection an identity's profile lives in.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize, GraphQLEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Student,
    Team,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Team,
    Admin,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Student => "student",
            EntityKind::Team => "team",
            EntityKind::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub school: String,
    pub zip_code: String,
    pub grade: i32,
    pub first_level: FirstLevel,
    pub areas_of_interest: BTreeSet<Area>,
    pub time_commitment: i32,
    pub impressive_things: String,
    pub why_join_team: String,
    /// Object store path of the uploaded resume, if any.
    pub resume_path: Option<String>,
    pub(crate) matched_team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn matched_team_id(&self) -> Option<Uuid> {
        self.matched_team_id
    }

    pub fn is_matched(&self) -> bool {
        self.matched_team_id.is_some()
    }

    pub(crate) fn assign_team(&mut self, team_id: Option<Uuid>, at: DateTime<Utc>) {
        self.matched_team_id = team_id;
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Uuid,
    pub team_name: String,
    pub email: String,
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The profile document owned by an identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Admin(Admin),
    Student(Student),
    Team(Team),
}

impl Profile {
    pub fn kind(&self) -> AccountKind {
        match self {
            Profile::Admin(_) => AccountKind::Admin,
            Profile::Student(_) => AccountKind::Student,
            Profile::Team(_) => AccountKind::Team,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Profile::Admin(a) => &a.email,
            Profile::Student(s) => &s.email,
            Profile::Team(t) => &t.email,
        }
    }
}

/// A student paired with the team it is matched to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub student: Student,
    pub team: Team,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn student(name: &str, created_at: DateTime<Utc>) -> Student {
        Student {
            id: Uuid::now_v7(),
            email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
            name: name.to_string(),
            school: "Lincoln High School".to_string(),
            zip_code: "97201".to_string(),
            grade: 10,
            first_level: FirstLevel::FirstTechChallenge,
            areas_of_interest: BTreeSet::from([Area::Software]),
            time_commitment: 10,
            impressive_things: "Built a line-following robot".to_string(),
            why_join_team: "I want to compete with a real team".to_string(),
            resume_path: None,
            matched_team_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn team(name: &str, created_at: DateTime<Utc>) -> Team {
        Team {
            id: Uuid::now_v7(),
            team_name: name.to_string(),
            email: format!("{}@robots.example.org", name.to_lowercase().replace(' ', "-")),
            zip_code: "97201".to_string(),
            first_level: FirstLevel::FirstTechChallenge,
            areas_of_need: BTreeSet::from([Area::Hardware, Area::Software]),
            grade_range_min: 9,
            grade_range_max: 12,
            time_commitment: 12,
            qualities: BTreeSet::from([Quality::Teamwork]),
            is_school_team: false,
            school_name: None,
            team_awards: "Inspire Award at the state championship".to_string(),
            is_active: true,
            created_at,
            updated_at: created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_and_display() {
        for quality in Quality::ALL {
            assert_eq!(quality.as_str().parse::<Quality>().unwrap(), *quality);
        }
        assert_eq!("problem-solving".parse::<Quality>(), Ok(Quality::ProblemSolving));
        assert_eq!(Area::Outreach.to_string(), "outreach");
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = parse_tags::<Area>(&["hardware".to_string(), "marketing".to_string()])
            .unwrap_err();
        assert_eq!(err.kind, "area");
        assert_eq!(err.value, "marketing");
    }

    #[test]
    fn test_matched_state_follows_team_reference() {
        let mut student = fixtures::student("Sarah Chen", Utc::now());
        assert!(!student.is_matched());
        let team_id = Uuid::now_v7();
        student.assign_team(Some(team_id), Utc::now());
        assert!(student.is_matched());
        assert_eq!(student.matched_team_id(), Some(team_id));
        student.assign_team(None, Utc::now());
        assert!(!student.is_matched());
    }
}
