// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Field rules for registration payloads.
//!
//! Every check runs; the caller gets the full list of violations in form
//! order rather than the first failure.

use std::collections::BTreeSet;

use crate::{
    error::ValidationErrors,
    model::{Area, Quality},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_GRADE: i32 = 1;
pub const MAX_GRADE: i32 = 12;
pub const MIN_HOURS: i32 = 1;
pub const MAX_HOURS: i32 = 30;
pub const MIN_ESSAY_LENGTH: usize = 10;
pub const MAX_QUALITIES: usize = 3;

/// `local@domain.tld` with no whitespace and a non-empty label on each side
/// of the last dot.
pub fn is_well_formed_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Fields shared by both registration forms.
pub struct AccountFields<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

pub struct StudentFields<'a> {
    pub account: AccountFields<'a>,
    pub name: &'a str,
    pub school: &'a str,
    pub zip_code: &'a str,
    pub grade: i32,
    pub areas_of_interest: &'a BTreeSet<Area>,
    pub time_commitment: i32,
    pub impressive_things: &'a str,
    pub why_join_team: &'a str,
}

pub struct TeamFields<'a> {
    pub account: AccountFields<'a>,
    pub team_name: &'a str,
    pub zip_code: &'a str,
    pub is_school_team: bool,
    pub school_name: Option<&'a str>,
    pub areas_of_need: &'a BTreeSet<Area>,
    pub grade_range_min: i32,
    pub grade_range_max: i32,
    pub time_commitment: i32,
    pub team_awards: &'a str,
    pub qualities: &'a BTreeSet<Quality>,
}

fn check_account(account: &AccountFields<'_>, errors: &mut ValidationErrors) {
    if !is_well_formed_email(account.email.trim()) {
        errors.add("email", "Please enter a valid email address");
    }
    if !is_strong_password(account.password) {
        errors.add(
            "password",
            "Password must be at least 8 characters and contain an uppercase letter and a number",
        );
    }
}

fn check_hours(hours: i32, errors: &mut ValidationErrors) {
    if !(MIN_HOURS..=MAX_HOURS).contains(&hours) {
        errors.add(
            "timeCommitment",
            format!("Please enter between {MIN_HOURS} and {MAX_HOURS} hours per week"),
        );
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn long_enough(value: &str) -> bool {
    value.trim().chars().count() >= MIN_ESSAY_LENGTH
}

pub fn validate_student(fields: &StudentFields<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if is_blank(fields.name) {
        errors.add("name", "Please enter your name");
    }
    check_account(&fields.account, &mut errors);
    if is_blank(fields.school) {
        errors.add("school", "Please enter your school");
    }
    let zip_len = fields.zip_code.trim().chars().count();
    if !(5..=10).contains(&zip_len) {
        errors.add("zipCode", "Please enter a valid ZIP code");
    }
    if !(MIN_GRADE..=MAX_GRADE).contains(&fields.grade) {
        errors.add("grade", "Please enter a valid grade (1-12)");
    }
    if fields.areas_of_interest.is_empty() {
        errors.add("areasOfInterest", "Please select at least one area of interest");
    }
    check_hours(fields.time_commitment, &mut errors);
    if !long_enough(fields.impressive_things) {
        errors.add(
            "impressiveThings",
            "Please tell us a bit more (at least 10 characters)",
        );
    }
    if !long_enough(fields.why_join_team) {
        errors.add(
            "whyJoinTeam",
            "Please tell us a bit more (at least 10 characters)",
        );
    }
    errors.into_result()
}

pub fn validate_team(fields: &TeamFields<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if is_blank(fields.team_name) {
        errors.add("teamName", "Please enter your team name");
    }
    check_account(&fields.account, &mut errors);
    if fields.zip_code.trim().chars().count() < 5 {
        errors.add("zipCode", "Please enter a valid ZIP code");
    }
    if fields.is_school_team && fields.school_name.is_none_or(is_blank) {
        errors.add("schoolName", "Please enter the school name");
    }
    if fields.areas_of_need.is_empty() {
        errors.add("areasOfNeed", "Please select at least one area of need");
    }
    let grades = MIN_GRADE..=MAX_GRADE;
    if !grades.contains(&fields.grade_range_min) {
        errors.add("gradeRangeMin", "Please enter a valid grade (1-12)");
    }
    if !grades.contains(&fields.grade_range_max) {
        errors.add("gradeRangeMax", "Please enter a valid grade (1-12)");
    } else if fields.grade_range_min > fields.grade_range_max {
        errors.add(
            "gradeRangeMax",
            "Maximum grade must be greater than or equal to minimum grade",
        );
    }
    check_hours(fields.time_commitment, &mut errors);
    if !long_enough(fields.team_awards) {
        errors.add(
            "teamAwards",
            "Please tell us a bit more (at least 10 characters)",
        );
    }
    if fields.qualities.is_empty() || fields.qualities.len() > MAX_QUALITIES {
        errors.add("qualities", "Please select between 1 and 3 qualities");
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student<'a>(areas: &'a BTreeSet<Area>) -> StudentFields<'a> {
        StudentFields {
            account: AccountFields {
                email: "robo@example.org",
                password: "Sprockets42",
            },
            name: "Ada",
            school: "Lincoln High",
            zip_code: "97201",
            grade: 10,
            areas_of_interest: areas,
            time_commitment: 8,
            impressive_things: "Built a line follower",
            why_join_team: "I want to compete at worlds",
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_well_formed_email("a@b.co"));
        assert!(is_well_formed_email("first.last+tag@mail.example.org"));
        assert!(!is_well_formed_email("a@b"));
        assert!(!is_well_formed_email("a b@c.org"));
        assert!(!is_well_formed_email("@c.org"));
        assert!(!is_well_formed_email("a@@c.org"));
        assert!(!is_well_formed_email("a@.org"));
        assert!(!is_well_formed_email("a@c."));
    }

    #[test]
    fn test_password_policy() {
        assert!(is_strong_password("Abcdefg1"));
        assert!(!is_strong_password("Abcdef1"));
        assert!(!is_strong_password("abcdefg1"));
        assert!(!is_strong_password("Abcdefgh"));
    }

    #[test]
    fn test_valid_student_passes() {
        let areas = BTreeSet::from([Area::Software]);
        assert!(validate_student(&student(&areas)).is_ok());
    }

    #[test]
    fn test_student_grade_13_rejected() {
        let areas = BTreeSet::from([Area::Software]);
        let mut fields = student(&areas);
        fields.grade = 13;
        let errors = validate_student(&fields).unwrap_err();
        assert_eq!(errors.fields(), vec!["grade"]);
    }

    #[test]
    fn test_student_reports_every_field() {
        let areas = BTreeSet::new();
        let mut fields = student(&areas);
        fields.account.email = "nope";
        fields.account.password = "short";
        fields.grade = 0;
        fields.time_commitment = 31;
        fields.why_join_team = "fun";
        let errors = validate_student(&fields).unwrap_err();
        assert_eq!(
            errors.fields(),
            vec![
                "email",
                "password",
                "grade",
                "areasOfInterest",
                "timeCommitment",
                "whyJoinTeam"
            ]
        );
    }

    #[test]
    fn test_team_rules() {
        let areas = BTreeSet::from([Area::Hardware]);
        let qualities = BTreeSet::from([
            Quality::Teamwork,
            Quality::Creativity,
            Quality::Leadership,
            Quality::Mentorship,
        ]);
        let fields = TeamFields {
            account: AccountFields {
                email: "team@example.org",
                password: "Sprockets42",
            },
            team_name: "Gear Grinders",
            zip_code: "97201",
            is_school_team: true,
            school_name: Some("  "),
            areas_of_need: &areas,
            grade_range_min: 11,
            grade_range_max: 9,
            time_commitment: 10,
            team_awards: "Inspire Award 2024",
            qualities: &qualities,
        };
        let errors = validate_team(&fields).unwrap_err();
        assert_eq!(errors.fields(), vec!["schoolName", "gradeRangeMax", "qualities"]);
    }
}
