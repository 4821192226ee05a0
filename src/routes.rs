use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use slog::{error, Logger};
use warp::filters::BoxedFilter;
use warp::hyper::body::Bytes;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::auth::{bearer_token, AuthUser};
use crate::db::Scope;
use crate::environment::Environment;
use crate::errors::BackendError;

pub mod rejection;

mod groups;
mod recipes;
mod response;
mod users;

pub use groups::*;
pub use recipes::*;
pub use users::*;

use rejection::{Context, Rejection};

type Route = BoxedFilter<(Box<dyn Reply>,)>;
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

/// Every route, combined, with error recovery applied.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    make_register_route(environment.clone())
        .or(make_login_route(environment.clone()))
        .or(make_profile_route(environment.clone()))
        .or(make_update_profile_route(environment.clone()))
        .or(make_admin_register_route(environment.clone()))
        .or(make_list_users_route(environment.clone()))
        .or(make_get_user_route(environment.clone()))
        .or(make_update_user_route(environment.clone()))
        .or(make_delete_user_route(environment.clone()))
        .or(make_create_group_route(environment.clone()))
        .or(make_list_groups_route(environment.clone()))
        .or(make_my_groups_route(environment.clone()))
        .or(make_search_groups_route(environment.clone()))
        .or(make_invite_lookup_route(environment.clone()))
        .or(make_join_group_route(environment.clone()))
        .or(make_pending_groups_route(environment.clone()))
        .or(make_approve_group_route(environment.clone()))
        .or(make_reject_group_route(environment.clone()))
        .or(make_get_group_route(environment.clone()))
        .or(make_update_group_route(environment.clone()))
        .or(make_delete_group_route(environment.clone()))
        .or(make_approve_request_route(environment.clone()))
        .or(make_reject_request_route(environment.clone()))
        .or(make_change_role_route(environment.clone()))
        .or(make_remove_member_route(environment.clone()))
        .or(make_create_recipe_route(environment.clone()))
        .or(make_list_recipes_route(environment.clone()))
        .or(make_search_recipes_route(environment.clone()))
        .or(make_pending_recipes_route(environment.clone()))
        .or(make_approve_recipe_route(environment.clone()))
        .or(make_reject_recipe_route(environment.clone()))
        .or(make_get_recipe_route(environment.clone()))
        .or(make_update_recipe_route(environment.clone()))
        .or(make_delete_recipe_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    use warp::filters::body::BodyDeserializeError;

    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    if let Some(e) = rej.find::<BodyDeserializeError>() {
        let flattened = Rejection::new(
            Context::body(),
            BackendError::validation(format!("{}", e)),
        )
        .flatten();

        return Ok(with_status(json(&flattened), StatusCode::BAD_REQUEST));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Validation { .. } => StatusCode::BAD_REQUEST,
        Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        Forbidden { .. } => StatusCode::FORBIDDEN,
        NotFound { .. } => StatusCode::NOT_FOUND,
        Conflict { .. } => StatusCode::CONFLICT,
        Crypto { .. } | Sqlx { .. } | StoredDocument { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn with_env(
    environment: Environment,
) -> impl Filter<Extract = (Environment,), Error = Infallible> + Clone {
    warp::any().map(move || environment.clone())
}

/// A JSON body that may be omitted entirely, yielding the default.
/// Malformed JSON is still a client error.
fn optional_json<T>() -> impl Filter<Extract = (T,), Error = reject::Rejection> + Clone
where
    T: Default + DeserializeOwned + Send,
{
    warp::body::bytes().and_then(|body: Bytes| async move {
        if body.is_empty() {
            Ok(T::default())
        } else {
            serde_json::from_slice(&body).map_err(|e| {
                reject::custom(Rejection::new(
                    Context::body(),
                    BackendError::validation(format!("{}", e)),
                ))
            })
        }
    })
}

/// Resolves the bearer token into a full [`AuthUser`], rejecting with 401
/// when the header is missing, malformed, expired or references a
/// deleted account.
fn authenticated(
    environment: Environment,
) -> impl Filter<Extract = (AuthUser,), Error = reject::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_env(environment))
        .and_then(
            |header: Option<String>, environment: Environment| async move {
                authenticate(&environment, header)
                    .await
                    .map_err(|e| reject::custom(Rejection::new(Context::auth(), e)))
            },
        )
}

async fn authenticate(
    environment: &Environment,
    header: Option<String>,
) -> Result<AuthUser, BackendError> {
    let header =
        header.ok_or_else(|| BackendError::unauthenticated("Authentication required"))?;
    let token = bearer_token(&header)
        .ok_or_else(|| BackendError::unauthenticated("Authentication required"))?;

    let id = environment.auth.verify_token(token)?;
    let user = environment
        .db
        .user_by_id(id)
        .await?
        .ok_or_else(|| BackendError::unauthenticated("Invalid token"))?;

    Ok(AuthUser {
        id: user.id,
        role: user.role,
        groups: user.groups,
    })
}

/// Administrators see everything; everyone else gets the visibility
/// window built from their identity and memberships.
fn scope_for(user: &AuthUser) -> Scope {
    if user.is_admin() {
        Scope::All
    } else {
        Scope::User {
            id: user.id,
            groups: user.groups.clone(),
        }
    }
}

fn reply(reply: impl Reply + 'static) -> RouteResult {
    Ok(Box::new(reply) as Box<dyn Reply>)
}
