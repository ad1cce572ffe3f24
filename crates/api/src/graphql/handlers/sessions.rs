// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use juniper::GraphQLObject;

use crate::{
    auth::{
        ACCESS_AUDIENCE, AuthJwtPayload, JwtPayload, REFRESH_AUDIENCE, RefreshJwtPayload,
        generate_jwt, parse_and_validate_jwt_for,
    },
    graphql::{Context, OrFieldError},
    identity::IssuedSession,
    model::AccountKind,
    profile::profile_of,
};

const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 60);

#[derive(GraphQLObject)]
pub struct SessionCredentials {
    pub refresh_token: String,
    pub access_token: String,
    pub kind: AccountKind,
}

// Access tokens carry the account kind, so a session is only kept once the
// identity has a profile.
async fn issue_credentials(
    ctx: &Context,
    session: IssuedSession,
) -> juniper::FieldResult<SessionCredentials> {
    let profile = match profile_of(ctx.engine(), session.identity_id).await {
        Ok(Some(profile)) => profile,
        lookup => {
            if let Err(e) = ctx
                .services()
                .identity
                .destroy_session(session.session_id)
                .await
            {
                tracing::warn!(session_id = %session.session_id, "Could not drop session: {e}");
            }
            lookup.or_field_error()?;
            return Err(juniper::FieldError::new(
                "Profile not found. Please complete your registration.",
                juniper::Value::null(),
            ));
        }
    };
    let access_token = generate_jwt(
        &JwtPayload::new_with_duration(
            session.identity_id,
            vec![ACCESS_AUDIENCE.to_string()],
            AuthJwtPayload {
                kind: profile.kind(),
                email: session.email,
            },
            ACCESS_TOKEN_LIFETIME,
        ),
        ctx.get_signing_key(),
    )?;
    Ok(SessionCredentials {
        refresh_token: session.refresh_token,
        access_token,
        kind: profile.kind(),
    })
}

pub async fn login(
    ctx: &Context,
    email: String,
    password: String,
) -> juniper::FieldResult<SessionCredentials> {
    let identity = &ctx.services().identity;
    let identity_id = identity
        .verify_credentials(&email, &password)
        .await
        .or_field_error()?;
    let session = identity
        .open_session(identity_id, &ctx.client_info())
        .await
        .or_field_error()?;
    issue_credentials(ctx, session).await
}

pub async fn refresh_session(
    ctx: &Context,
    refresh_token: String,
) -> juniper::FieldResult<SessionCredentials> {
    let session = ctx
        .services()
        .identity
        .refresh_session(&refresh_token, &ctx.client_info())
        .await
        .or_field_error()?;
    issue_credentials(ctx, session).await
}

pub async fn end_session(ctx: &Context, refresh_token: String) -> juniper::FieldResult<bool> {
    let jwt_payload = parse_and_validate_jwt_for::<RefreshJwtPayload>(
        &refresh_token,
        &ctx.get_signing_key().verifying_key(),
        REFRESH_AUDIENCE,
    )?;
    ctx.services()
        .identity
        .destroy_session(jwt_payload.custom_fields.session_id)
        .await
        .or_field_error()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        auth::parse_and_validate_jwt,
        graphql::testing::app,
        model::{Student, fixtures},
        store::ProfileStore,
    };

    async fn registered_student(app: &crate::graphql::testing::TestApp) -> Student {
        let id = app
            .base
            .services
            .identity
            .create_identity("ada@example.org", "Sprockets42")
            .await
            .unwrap();
        let mut student = fixtures::student("Ada", Utc::now());
        student.id = id;
        student.email = "ada@example.org".to_string();
        app.store.put_student(&student).await.unwrap();
        student
    }

    #[tokio::test]
    async fn test_login_issues_access_token_with_kind() {
        let app = app();
        let student = registered_student(&app).await;
        let ctx = app.context(None);

        let credentials = login(&ctx, "ada@example.org".into(), "Sprockets42".into())
            .await
            .unwrap();
        assert_eq!(credentials.kind, AccountKind::Student);
        let access = parse_and_validate_jwt::<AuthJwtPayload>(
            &credentials.access_token,
            &ctx.get_signing_key().verifying_key(),
        )
        .unwrap();
        assert_eq!(access.sub, student.id);
        assert!(access.has_audience(ACCESS_AUDIENCE));
        assert_eq!(access.custom_fields.kind, AccountKind::Student);
    }

    #[tokio::test]
    async fn test_refresh_then_end_session() {
        let app = app();
        registered_student(&app).await;
        let ctx = app.context(None);
        let first = login(&ctx, "ada@example.org".into(), "Sprockets42".into())
            .await
            .unwrap();

        let second = refresh_session(&ctx, first.refresh_token.clone())
            .await
            .unwrap();
        assert!(refresh_session(&ctx, first.refresh_token).await.is_err());
        assert!(end_session(&ctx, second.refresh_token.clone()).await.unwrap());
        assert!(refresh_session(&ctx, second.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_login_without_profile_is_rejected() {
        let app = app();
        app.base
            .services
            .identity
            .create_identity("orphan@example.org", "Sprockets42")
            .await
            .unwrap();
        let ctx = app.context(None);
        assert!(
            login(&ctx, "orphan@example.org".into(), "Sprockets42".into())
                .await
                .is_err()
        );
        assert_eq!(app.credentials.session_count(), 0);
    }
}
