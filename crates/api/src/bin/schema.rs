// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

fn main() {
    let result = teammatch_api::graphql::schema().as_sdl();

    std::fs::write("schema.gql", result).expect("Unable to write schema file");
}
