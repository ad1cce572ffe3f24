// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod admins;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod identity;
pub mod listing;
pub mod mailer;
pub mod matching;
pub mod model;
pub mod profile;
pub mod registration;
pub mod store;
pub mod uploads;
pub mod validation;
