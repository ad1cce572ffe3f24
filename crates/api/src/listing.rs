// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Filtering and sorting for the admin student and team lists.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use uuid::Uuid;

use crate::model::{FirstLevel, Student, Team};

/// A profile that can appear in an admin list.
pub trait Listable {
    fn id(&self) -> Uuid;
    fn display_name(&self) -> &str;
    fn email(&self) -> &str;
    fn location(&self) -> &str;
    fn first_level(&self) -> FirstLevel;
    /// Matched for students, active for teams.
    fn status(&self) -> bool;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Listable for Student {
    fn id(&self) -> Uuid {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn location(&self) -> &str {
        &self.zip_code
    }

    fn first_level(&self) -> FirstLevel {
        self.first_level
    }

    fn status(&self) -> bool {
        self.is_matched()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Listable for Team {
    fn id(&self) -> Uuid {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.team_name
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn location(&self) -> &str {
        &self.zip_code
    }

    fn first_level(&self) -> FirstLevel {
        self.first_level
    }

    fn status(&self) -> bool {
        self.is_active
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Two mutually exclusive "only" toggles. Turning one on turns the other
/// off; with both off every status is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusToggles {
    only_on: bool,
    only_off: bool,
}

impl StatusToggles {
    /// Applies the two flags in order, so `only_off` wins if both are set.
    pub fn from_flags(only_on: bool, only_off: bool) -> Self {
        let mut toggles = Self::default();
        toggles.set_only_on(only_on);
        toggles.set_only_off(only_off);
        toggles
    }

    pub fn set_only_on(&mut self, enabled: bool) {
        self.only_on = enabled;
        if enabled {
            self.only_off = false;
        }
    }

    pub fn set_only_off(&mut self, enabled: bool) {
        self.only_off = enabled;
        if enabled {
            self.only_on = false;
        }
    }

    pub fn only_on(&self) -> bool {
        self.only_on
    }

    pub fn only_off(&self) -> bool {
        self.only_off
    }

    pub fn admits(&self, status: bool) -> bool {
        (!self.only_on || status) && (!self.only_off || !status)
    }
}

#[derive(GraphQLEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Name,
    Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring of the name or email.
    pub search: Option<String>,
    /// Exact location; `None` means all.
    pub location: Option<String>,
    /// Exact program tier; `None` means all.
    pub first_level: Option<FirstLevel>,
    pub status: StatusToggles,
    pub sort: SortKey,
}

impl ListQuery {
    pub fn admits<T: Listable>(&self, item: &T) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                item.display_name().to_lowercase().contains(&needle)
                    || item.email().to_lowercase().contains(&needle)
            }
        };
        search_ok
            && self
                .location
                .as_deref()
                .is_none_or(|location| item.location() == location)
            && self.first_level.is_none_or(|level| item.first_level() == level)
            && self.status.admits(item.status())
    }

    fn compare<T: Listable>(&self, a: &T, b: &T) -> Ordering {
        let primary = match self.sort {
            SortKey::Newest => b.created_at().cmp(&a.created_at()),
            SortKey::Oldest => a.created_at().cmp(&b.created_at()),
            SortKey::Name => a
                .display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase()),
            SortKey::Location => a.location().cmp(b.location()),
        };
        primary.then_with(|| a.id().cmp(&b.id()))
    }

    /// Filters and sorts `items`. Ties are broken by id so repeated calls
    /// return the same order.
    pub fn apply<T: Listable>(&self, items: Vec<T>) -> Vec<T> {
        let mut items: Vec<T> = items.into_iter().filter(|i| self.admits(i)).collect();
        items.sort_by(|a, b| self.compare(a, b));
        items
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::fixtures;

    fn students() -> Vec<Student> {
        let now = Utc::now();
        let mut ada = fixtures::student("Ada Lovelace", now - Duration::days(3));
        ada.zip_code = "97035".to_string();
        let mut grace = fixtures::student("grace hopper", now - Duration::days(1));
        grace.first_level = FirstLevel::FirstRoboticsCompetition;
        grace.assign_team(Some(Uuid::now_v7()), now);
        let mut alan = fixtures::student("Alan Turing", now - Duration::days(1));
        alan.created_at = grace.created_at;
        vec![ada, grace, alan]
    }

    fn names(list: &[Student]) -> Vec<&str> {
        list.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_toggles_are_exclusive() {
        let mut toggles = StatusToggles::default();
        toggles.set_only_on(true);
        toggles.set_only_off(true);
        assert!(!toggles.only_on());
        assert!(toggles.only_off());
        toggles.set_only_on(true);
        assert!(toggles.only_on());
        assert!(!toggles.only_off());
        assert_eq!(StatusToggles::from_flags(true, true), {
            let mut t = StatusToggles::default();
            t.set_only_off(true);
            t
        });
        assert!(StatusToggles::default().admits(true));
        assert!(StatusToggles::default().admits(false));
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_and_email() {
        let query = ListQuery {
            search: Some("GRACE".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&query.apply(students())), vec!["grace hopper"]);
        let query = ListQuery {
            search: Some("alan.turing@".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&query.apply(students())), vec!["Alan Turing"]);
    }

    #[test]
    fn test_filters_combine() {
        let query = ListQuery {
            location: Some("97201".to_string()),
            status: StatusToggles::from_flags(false, true),
            ..Default::default()
        };
        assert_eq!(names(&query.apply(students())), vec!["Alan Turing"]);
        let query = ListQuery {
            first_level: Some(FirstLevel::FirstRoboticsCompetition),
            status: StatusToggles::from_flags(true, false),
            ..Default::default()
        };
        assert_eq!(names(&query.apply(students())), vec!["grace hopper"]);
    }

    #[test]
    fn test_sorting_is_total_and_repeatable() {
        let by_name = ListQuery {
            sort: SortKey::Name,
            ..Default::default()
        };
        assert_eq!(
            names(&by_name.apply(students())),
            vec!["Ada Lovelace", "Alan Turing", "grace hopper"]
        );

        let fixture = students();
        let ids = |list: Vec<Student>| list.iter().map(|s| s.id).collect::<Vec<_>>();
        let newest = ListQuery::default();
        let first = newest.apply(fixture.clone());
        assert_eq!(first[2].name, "Ada Lovelace");
        assert_eq!(ids(newest.apply(fixture.clone())), ids(first.clone()));
        // Alan and Grace share a timestamp; the id decides.
        let mut reversed = fixture;
        reversed.reverse();
        assert_eq!(ids(newest.apply(reversed)), ids(first));

        let by_location = ListQuery {
            sort: SortKey::Location,
            ..Default::default()
        };
        assert_eq!(by_location.apply(students())[0].name, "Ada Lovelace");
    }

    #[test]
    fn test_teams_filter_on_active_flag() {
        let now = Utc::now();
        let active = fixtures::team("Gear Grinders", now);
        let mut inactive = fixtures::team("Circuit Breakers", now);
        inactive.is_active = false;
        let query = ListQuery {
            status: StatusToggles::from_flags(false, true),
            ..Default::default()
        };
        let result = query.apply(vec![active, inactive]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].team_name, "Circuit Breakers");
    }
}
