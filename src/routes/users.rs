use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{json, with_status};
use warp::Filter;

use super::rejection::{Context, Rejection};
use super::response::SuccessResponse;
use super::{authenticated, reply, with_env, Route, RouteResult};
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::normalization::normalize_email;
use crate::policy;
use crate::user::{AdminUserUpdate, Login, ProfileUpdate, Registration, User, UserRole};

/// Registration payload used by administrators, which may additionally
/// assign a platform role.
#[derive(Debug, Deserialize)]
pub struct AdminRegistration {
    #[serde(flatten)]
    pub registration: Registration,
    pub role: Option<UserRole>,
}

pub fn make_register_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(register)
        .boxed()
}

pub fn make_login_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(login)
        .boxed()
}

pub fn make_profile_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(profile)
        .boxed()
}

pub fn make_update_profile_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(warp::put())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(update_profile)
        .boxed()
}

pub fn make_admin_register_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path("admin"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(admin_register)
        .boxed()
}

pub fn make_list_users_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(list_users)
        .boxed()
}

pub fn make_get_user_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(get_user)
        .boxed()
}

pub fn make_update_user_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::put())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(update_user)
        .boxed()
}

pub fn make_delete_user_route(environment: Environment) -> Route {
    warp::path("users")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(delete_user)
        .boxed()
}

async fn register(environment: Environment, registration: Registration) -> RouteResult {
    let email = normalize_email(&registration.email);
    let error_handler = |e: BackendError| Rejection::new(Context::register(email.clone()), e);

    let user = create_account(&environment, registration, UserRole::User)
        .await
        .map_err(error_handler)?;
    let token = environment
        .auth
        .issue_token(&user.id)
        .map_err(error_handler)?;

    reply(with_status(
        json(&SuccessResponse::Session { token, user }),
        StatusCode::CREATED,
    ))
}

async fn login(environment: Environment, login: Login) -> RouteResult {
    let email = normalize_email(&login.email);
    let error_handler = |e: BackendError| Rejection::new(Context::login(email.clone()), e);

    let user = environment
        .db
        .user_by_email(email.clone())
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::unauthenticated("Invalid credentials"))
        .map_err(error_handler)?;

    let matches = verify_password(&login.password, &user.password_hash).map_err(error_handler)?;
    if !matches {
        return Err(
            error_handler(BackendError::unauthenticated("Invalid credentials")).into(),
        );
    }

    let token = environment
        .auth
        .issue_token(&user.id)
        .map_err(error_handler)?;

    reply(json(&SuccessResponse::Session { token, user }))
}

async fn profile(user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::profile(user.id.to_string()), e);

    let profile = environment
        .db
        .user_by_id(user.id)
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("User"))
        .map_err(error_handler)?;

    reply(json(&profile))
}

async fn update_profile(
    user: AuthUser,
    environment: Environment,
    update: ProfileUpdate,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::profile(user.id.to_string()), e);

    update.validate().map_err(error_handler)?;

    let mut profile = environment
        .db
        .user_by_id(user.id)
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("User"))
        .map_err(error_handler)?;

    profile.apply_profile_update(update, OffsetDateTime::now_utc());
    environment
        .db
        .update_user(profile.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&profile))
}

async fn admin_register(
    admin: AuthUser,
    environment: Environment,
    registration: AdminRegistration,
) -> RouteResult {
    let email = normalize_email(&registration.registration.email);
    let error_handler = |e: BackendError| Rejection::new(Context::register(email.clone()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;

    let role = registration.role.unwrap_or(UserRole::User);
    let user = create_account(&environment, registration.registration, role)
        .await
        .map_err(error_handler)?;

    reply(with_status(json(&user), StatusCode::CREATED))
}

async fn list_users(admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::users(), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    let users = environment.db.list_users().await.map_err(error_handler)?;

    reply(json(&users))
}

async fn get_user(id: Uuid, admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::user(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    let user = environment
        .db
        .user_by_id(id)
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("User"))
        .map_err(error_handler)?;

    reply(json(&user))
}

async fn update_user(
    id: Uuid,
    admin: AuthUser,
    environment: Environment,
    update: AdminUserUpdate,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::user(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    update.profile.validate().map_err(error_handler)?;

    let mut user = environment
        .db
        .user_by_id(id)
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("User"))
        .map_err(error_handler)?;

    user.apply_admin_update(update, OffsetDateTime::now_utc());
    environment
        .db
        .update_user(user.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&user))
}

async fn delete_user(id: Uuid, admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::user(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    environment.db.delete_user(id).await.map_err(error_handler)?;

    reply(with_status(warp::reply(), StatusCode::NO_CONTENT))
}

/// Shared by self-registration and admin-created accounts: validate,
/// check email uniqueness, hash the password and persist.
async fn create_account(
    environment: &Environment,
    registration: Registration,
    role: UserRole,
) -> Result<User, BackendError> {
    registration.validate()?;

    let email = normalize_email(&registration.email);
    if environment.db.user_by_email(email).await?.is_some() {
        return Err(BackendError::validation(
            "A user with this email already exists",
        ));
    }

    let password_hash = hash_password(&registration.password)?;
    let user = User::create(registration, password_hash, role, OffsetDateTime::now_utc());
    environment.db.insert_user(user.clone()).await?;

    Ok(user)
}
