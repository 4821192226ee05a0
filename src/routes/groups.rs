use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{json, with_header, with_status};
use warp::Filter;

use super::rejection::{Context, Rejection};
use super::response::SuccessResponse;
use super::{authenticated, reply, scope_for, with_env, Route, RouteResult};
use crate::auth::AuthUser;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::group::{Group, GroupUpdate, JoinOutcome, NewGroup, RoleChange};
use crate::invite;
use crate::policy;

/// How many times a conditional group update is retried before giving up
/// with a conflict.
const UPDATE_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

pub fn make_create_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(create_group)
        .boxed()
}

pub fn make_list_groups_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(list_groups)
        .boxed()
}

pub fn make_my_groups_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("user"))
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(my_groups)
        .boxed()
}

pub fn make_search_groups_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(search_groups)
        .boxed()
}

pub fn make_invite_lookup_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("invite"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(invite_lookup)
        .boxed()
}

pub fn make_join_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("invite"))
        .and(warp::path::param::<String>())
        .and(warp::path("join"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(join_group)
        .boxed()
}

pub fn make_pending_groups_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("moderation"))
        .and(warp::path("pending"))
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(pending_groups)
        .boxed()
}

pub fn make_approve_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("moderation"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("approve"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(approve_group)
        .boxed()
}

pub fn make_reject_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path("moderation"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("reject"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(super::optional_json::<ReasonBody>())
        .and_then(reject_group)
        .boxed()
}

pub fn make_get_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(get_group)
        .boxed()
}

pub fn make_update_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::put())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(update_group)
        .boxed()
}

pub fn make_delete_group_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(delete_group)
        .boxed()
}

pub fn make_approve_request_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path("approve"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(approve_request)
        .boxed()
}

pub fn make_reject_request_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path("reject"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(reject_request)
        .boxed()
}

pub fn make_change_role_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path("members"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("role"))
        .and(warp::path::end())
        .and(warp::put())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(change_role)
        .boxed()
}

pub fn make_remove_member_route(environment: Environment) -> Route {
    warp::path("groups")
        .and(warp::path::param::<Uuid>())
        .and(warp::path("members"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(remove_member)
        .boxed()
}

async fn create_group(user: AuthUser, environment: Environment, details: NewGroup) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::groups(), e);

    details.validate().map_err(error_handler)?;

    let code = invite::unique_code(&*environment.db)
        .await
        .map_err(error_handler)?;
    let group = Group::create(
        details,
        user.id,
        user.role,
        code,
        OffsetDateTime::now_utc(),
    );
    environment
        .db
        .insert_group(group.clone())
        .await
        .map_err(error_handler)?;

    reply(with_header(
        with_status(json(&group), StatusCode::CREATED),
        "location",
        environment.urls.group(&group.id).as_str(),
    ))
}

async fn list_groups(user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::groups(), e);

    let groups = environment
        .db
        .list_groups(scope_for(&user))
        .await
        .map_err(error_handler)?;

    reply(json(&groups))
}

async fn my_groups(user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::groups(), e);

    let groups = environment
        .db
        .groups_for_user(user.id)
        .await
        .map_err(error_handler)?;

    reply(json(&groups))
}

async fn search_groups(
    query: SearchQuery,
    user: AuthUser,
    environment: Environment,
) -> RouteResult {
    let text = query.q.unwrap_or_default().trim().to_owned();
    let error_handler = |e: BackendError| Rejection::new(Context::group_search(text.clone()), e);

    if text.is_empty() {
        return Err(error_handler(BackendError::validation("A search query is required")).into());
    }

    let groups = environment
        .db
        .search_groups(scope_for(&user), text.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&groups))
}

async fn invite_lookup(code: String, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::invite(code.clone()), e);

    let group = environment
        .db
        .group_by_invite_code(code.clone())
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("Group"))
        .map_err(error_handler)?;

    let is_member = group.is_member(user.id);
    let has_pending_request = group.has_pending_request(user.id);

    reply(json(&SuccessResponse::InviteLookup {
        group,
        is_member,
        has_pending_request,
    }))
}

async fn join_group(code: String, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::invite(code.clone()), e);

    let group = environment
        .db
        .group_by_invite_code(code.clone())
        .await
        .map_err(error_handler)?
        .ok_or_else(|| BackendError::not_found("Group"))
        .map_err(error_handler)?;

    let now = OffsetDateTime::now_utc();
    let (_, outcome) = with_group_update(&environment, group.id, |group| {
        group.request_join(user.id, now).map_err(Into::into)
    })
    .await
    .map_err(error_handler)?;

    let message = match outcome {
        JoinOutcome::Joined => "You have joined the group",
        JoinOutcome::Requested => "Your request to join is pending approval",
    };

    reply(json(&SuccessResponse::Message {
        message: message.to_owned(),
    }))
}

async fn pending_groups(admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::groups(), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    let groups = environment
        .db
        .pending_groups()
        .await
        .map_err(error_handler)?;

    reply(json(&groups))
}

async fn approve_group(id: Uuid, admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::group_moderation(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;

    let now = OffsetDateTime::now_utc();
    let (group, _) = with_group_update(&environment, id, |group| {
        group.moderation.approve(admin.id, now);
        Ok(())
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn reject_group(
    id: Uuid,
    admin: AuthUser,
    environment: Environment,
    body: ReasonBody,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::group_moderation(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;

    let now = OffsetDateTime::now_utc();
    let (group, _) = with_group_update(&environment, id, |group| {
        group.moderation.reject(admin.id, body.reason.clone(), now);
        Ok(())
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn get_group(id: Uuid, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::group(id.to_string()), e);

    let group = fetch_group(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_view_group(&user, &group),
        "You do not have access to this group",
    )
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn update_group(
    id: Uuid,
    user: AuthUser,
    environment: Environment,
    update: GroupUpdate,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::group(id.to_string()), e);

    update.validate().map_err(error_handler)?;

    let group = fetch_group(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_update_group(&user, &group),
        "You cannot update this group",
    )
    .map_err(error_handler)?;

    let now = OffsetDateTime::now_utc();
    let is_admin = user.is_admin();
    let (group, _) = with_group_update(&environment, id, |group| {
        group.apply_update(update.clone(), is_admin, now);
        Ok(())
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn delete_group(id: Uuid, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::group(id.to_string()), e);

    let group = fetch_group(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_delete_group(&user, &group),
        "You cannot delete this group",
    )
    .map_err(error_handler)?;

    environment
        .db
        .delete_group(id)
        .await
        .map_err(error_handler)?;

    reply(with_status(warp::reply(), StatusCode::NO_CONTENT))
}

async fn approve_request(
    group_id: Uuid,
    target: Uuid,
    user: AuthUser,
    environment: Environment,
) -> RouteResult {
    let error_handler = |e: BackendError| {
        Rejection::new(
            Context::membership(group_id.to_string(), target.to_string()),
            e,
        )
    };

    let group = fetch_group(&environment, group_id)
        .await
        .map_err(error_handler)?;
    policy::ensure(
        policy::can_manage_members(&user, &group),
        "You cannot manage join requests for this group",
    )
    .map_err(error_handler)?;

    let now = OffsetDateTime::now_utc();
    let (group, _) = with_group_update(&environment, group_id, |group| {
        group.approve_request(target, now).map_err(Into::into)
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn reject_request(
    group_id: Uuid,
    target: Uuid,
    user: AuthUser,
    environment: Environment,
) -> RouteResult {
    let error_handler = |e: BackendError| {
        Rejection::new(
            Context::membership(group_id.to_string(), target.to_string()),
            e,
        )
    };

    let group = fetch_group(&environment, group_id)
        .await
        .map_err(error_handler)?;
    policy::ensure(
        policy::can_manage_members(&user, &group),
        "You cannot manage join requests for this group",
    )
    .map_err(error_handler)?;

    let (group, _) = with_group_update(&environment, group_id, |group| {
        group.reject_request(target).map_err(Into::into)
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn change_role(
    group_id: Uuid,
    target: Uuid,
    user: AuthUser,
    environment: Environment,
    change: RoleChange,
) -> RouteResult {
    let error_handler = |e: BackendError| {
        Rejection::new(
            Context::membership(group_id.to_string(), target.to_string()),
            e,
        )
    };

    let group = fetch_group(&environment, group_id)
        .await
        .map_err(error_handler)?;
    policy::ensure(
        policy::can_change_roles(&user, &group),
        "Only the owner can change member roles",
    )
    .map_err(error_handler)?;

    let (group, _) = with_group_update(&environment, group_id, |group| {
        group.change_role(target, change.role).map_err(Into::into)
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn remove_member(
    group_id: Uuid,
    target: Uuid,
    user: AuthUser,
    environment: Environment,
) -> RouteResult {
    let error_handler = |e: BackendError| {
        Rejection::new(
            Context::membership(group_id.to_string(), target.to_string()),
            e,
        )
    };

    let group = fetch_group(&environment, group_id)
        .await
        .map_err(error_handler)?;

    // Leaving is always allowed; removing someone else takes a
    // moderating role.
    let actor_role = if target == user.id {
        None
    } else {
        policy::ensure(
            policy::can_manage_members(&user, &group),
            "You cannot remove members from this group",
        )
        .map_err(error_handler)?;

        let role = policy::acting_role(&user, &group)
            .ok_or_else(|| BackendError::forbidden("You cannot remove members from this group"))
            .map_err(error_handler)?;
        Some(role)
    };

    let (group, _) = with_group_update(&environment, group_id, |group| {
        match actor_role {
            None => group.leave(target).map_err(Into::into),
            Some(role) => group.remove_member(role, target).map_err(Into::into),
        }
    })
    .await
    .map_err(error_handler)?;

    reply(json(&group))
}

async fn fetch_group(environment: &Environment, id: Uuid) -> Result<Group, BackendError> {
    environment
        .db
        .group_by_id(id)
        .await?
        .ok_or_else(|| BackendError::not_found("Group"))
}

/// Read-modify-write against the group's revision counter. The closure
/// is re-applied to a fresh copy on every attempt, so it must be free of
/// side effects outside the group.
async fn with_group_update<T>(
    environment: &Environment,
    id: Uuid,
    mut apply: impl FnMut(&mut Group) -> Result<T, BackendError>,
) -> Result<(Group, T), BackendError> {
    for _ in 0..UPDATE_ATTEMPTS {
        let mut group = environment
            .db
            .group_by_id(id)
            .await?
            .ok_or_else(|| BackendError::not_found("Group"))?;
        let expected = group.revision;

        let value = apply(&mut group)?;

        if environment.db.update_group(group.clone(), expected).await? {
            group.revision = expected + 1;
            return Ok((group, value));
        }
    }

    Err(BackendError::Conflict {
        what: "group".to_owned(),
    })
}
