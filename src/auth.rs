use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// The authenticated caller, resolved from the private session cookie.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

const AUTH_COOKIE: &str = "user";

/// Cookie payload is "<login_session_id>:<user_id>".
pub(crate) fn parse_auth_cookie_value(value: &str) -> Option<(Uuid, Uuid)> {
    let (session_part, user_part) = value.split_once(':')?;
    let session_id = Uuid::parse_str(session_part).ok()?;
    let user_id = Uuid::parse_str(user_part).ok()?;
    Some((session_id, user_id))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let Some(cookie) = req.cookies().get_private(AUTH_COOKIE) else {
            return Outcome::Error((Status::Unauthorized, AppError::InvalidCredentials));
        };
        let Some((session_id, user_id)) = parse_auth_cookie_value(cookie.value()) else {
            return Outcome::Error((Status::Unauthorized, AppError::InvalidCredentials));
        };

        let Some(pool) = req.rocket().state::<PgPool>() else {
            return Outcome::Error((Status::InternalServerError, AppError::Unauthorized));
        };
        let repo = PostgresRepository { pool: pool.clone() };

        match repo.get_active_login_user(&session_id, &user_id).await {
            Ok(Some(user)) => {
                let current_user = CurrentUser {
                    id: user.id,
                    email: user.email,
                };
                req.local_cache(|| Some(current_user.clone()));
                Outcome::Success(current_user)
            }
            Ok(None) => {
                // Stale or revoked session, drop the row so it cannot linger
                let _ = repo.delete_login_session_if_expired(&session_id).await;
                Outcome::Error((Status::Unauthorized, AppError::InvalidCredentials))
            }
            Err(err) => Outcome::Error((Status::InternalServerError, err)),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Session cookie issued by POST /api/users/login.".to_string()),
            data: SecuritySchemeData::ApiKey {
                name: AUTH_COOKIE.to_string(),
                location: "cookie".to_string(),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("cookieAuth".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("cookieAuth".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: "Unauthorized - Authentication required".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_auth_cookie_value;
    use uuid::Uuid;

    #[test]
    fn parses_well_formed_cookie() {
        let session_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let parsed = parse_auth_cookie_value(&format!("{session_id}:{user_id}"));
        assert_eq!(parsed, Some((session_id, user_id)));
    }

    #[test]
    fn rejects_malformed_uuid() {
        assert!(parse_auth_cookie_value("not-a-uuid:also-not").is_none());
    }

    #[test]
    fn rejects_missing_delimiter() {
        assert!(parse_auth_cookie_value("0f1e2d3c").is_none());
    }

    #[test]
    fn rejects_trailing_garbage() {
        let session_id = Uuid::new_v4();
        assert!(parse_auth_cookie_value(&format!("{session_id}:")).is_none());
    }
}
