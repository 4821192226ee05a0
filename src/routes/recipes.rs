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
use crate::db::SearchCriteria;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::pagination::{total_pages, ListQuery, PageParams};
use crate::policy;
use crate::recipe::{self, Recipe, RecipeDetails};

#[derive(Debug, Default, Deserialize)]
struct RecipeSearchQuery {
    q: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

pub fn make_create_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(create_recipe)
        .boxed()
}

pub fn make_list_recipes_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ListQuery>())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(list_recipes)
        .boxed()
}

pub fn make_search_recipes_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<RecipeSearchQuery>())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(search_recipes)
        .boxed()
}

pub fn make_pending_recipes_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path("moderation"))
        .and(warp::path("pending"))
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(pending_recipes)
        .boxed()
}

pub fn make_approve_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path("moderation"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("approve"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(approve_recipe)
        .boxed()
}

pub fn make_reject_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path("moderation"))
        .and(warp::path::param::<Uuid>())
        .and(warp::path("reject"))
        .and(warp::path::end())
        .and(warp::post())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(super::optional_json::<ReasonBody>())
        .and_then(reject_recipe)
        .boxed()
}

pub fn make_get_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::get())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(get_recipe)
        .boxed()
}

pub fn make_update_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::put())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and(warp::body::json())
        .and_then(update_recipe)
        .boxed()
}

pub fn make_delete_recipe_route(environment: Environment) -> Route {
    warp::path("recipes")
        .and(warp::path::param::<Uuid>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(authenticated(environment.clone()))
        .and(with_env(environment))
        .and_then(delete_recipe)
        .boxed()
}

async fn create_recipe(
    user: AuthUser,
    environment: Environment,
    details: RecipeDetails,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipes(), e);

    details.validate().map_err(error_handler)?;
    ensure_group_membership(&environment, &user, details.group)
        .await
        .map_err(error_handler)?;

    let recipe = Recipe::create(details, user.id, user.role, OffsetDateTime::now_utc());
    environment
        .db
        .insert_recipe(recipe.clone())
        .await
        .map_err(error_handler)?;

    reply(with_header(
        with_status(json(&recipe), StatusCode::CREATED),
        "location",
        environment.urls.recipe(&recipe.id).as_str(),
    ))
}

async fn list_recipes(query: ListQuery, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipes(), e);

    let params = PageParams::from_query(&query).map_err(error_handler)?;
    let (recipes, total) = environment
        .db
        .list_recipes(scope_for(&user), params)
        .await
        .map_err(error_handler)?;

    reply(json(&SuccessResponse::RecipePage {
        recipes,
        total_recipes: total,
        total_pages: total_pages(total, params.limit),
        current_page: params.page,
    }))
}

async fn search_recipes(
    query: RecipeSearchQuery,
    user: AuthUser,
    environment: Environment,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipe_search(), e);

    let criteria = parse_criteria(&query).map_err(error_handler)?;
    if criteria.is_empty() {
        return Err(error_handler(BackendError::validation(
            "At least one search criterion is required",
        ))
        .into());
    }

    let mut recipes = environment
        .db
        .search_recipes(scope_for(&user), criteria.clone())
        .await
        .map_err(error_handler)?;

    // Free-text matches come back ranked; filter-only searches stay in
    // recency order.
    if let Some(text) = &criteria.text {
        recipes.sort_by(|a, b| {
            recipe::relevance(b, text)
                .cmp(&recipe::relevance(a, text))
                .then_with(|| b.times.created_at.cmp(&a.times.created_at))
        });
    }

    reply(json(&recipes))
}

async fn pending_recipes(admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipes(), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;
    let recipes = environment
        .db
        .pending_recipes()
        .await
        .map_err(error_handler)?;

    reply(json(&recipes))
}

async fn approve_recipe(id: Uuid, admin: AuthUser, environment: Environment) -> RouteResult {
    let error_handler =
        |e: BackendError| Rejection::new(Context::recipe_moderation(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;

    let mut recipe = fetch_recipe(&environment, id).await.map_err(error_handler)?;
    recipe.moderation.approve(admin.id, OffsetDateTime::now_utc());
    environment
        .db
        .update_recipe(recipe.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&recipe))
}

async fn reject_recipe(
    id: Uuid,
    admin: AuthUser,
    environment: Environment,
    body: ReasonBody,
) -> RouteResult {
    let error_handler =
        |e: BackendError| Rejection::new(Context::recipe_moderation(id.to_string()), e);

    policy::ensure_admin(&admin).map_err(error_handler)?;

    let mut recipe = fetch_recipe(&environment, id).await.map_err(error_handler)?;
    recipe
        .moderation
        .reject(admin.id, body.reason, OffsetDateTime::now_utc());
    environment
        .db
        .update_recipe(recipe.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&recipe))
}

async fn get_recipe(id: Uuid, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipe(id.to_string()), e);

    let recipe = fetch_recipe(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_view_recipe(&user, &recipe),
        "You do not have access to this recipe",
    )
    .map_err(error_handler)?;

    reply(json(&recipe))
}

async fn update_recipe(
    id: Uuid,
    user: AuthUser,
    environment: Environment,
    details: RecipeDetails,
) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipe(id.to_string()), e);

    let mut recipe = fetch_recipe(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_modify_recipe(&user, &recipe),
        "You cannot modify this recipe",
    )
    .map_err(error_handler)?;

    details.validate().map_err(error_handler)?;
    if details.group != recipe.group {
        ensure_group_membership(&environment, &user, details.group)
            .await
            .map_err(error_handler)?;
    }

    recipe.apply_update(details, user.is_admin(), OffsetDateTime::now_utc());
    environment
        .db
        .update_recipe(recipe.clone())
        .await
        .map_err(error_handler)?;

    reply(json(&recipe))
}

async fn delete_recipe(id: Uuid, user: AuthUser, environment: Environment) -> RouteResult {
    let error_handler = |e: BackendError| Rejection::new(Context::recipe(id.to_string()), e);

    let recipe = fetch_recipe(&environment, id).await.map_err(error_handler)?;
    policy::ensure(
        policy::can_modify_recipe(&user, &recipe),
        "You cannot modify this recipe",
    )
    .map_err(error_handler)?;

    environment
        .db
        .delete_recipe(id)
        .await
        .map_err(error_handler)?;

    reply(with_status(warp::reply(), StatusCode::NO_CONTENT))
}

async fn fetch_recipe(environment: &Environment, id: Uuid) -> Result<Recipe, BackendError> {
    environment
        .db
        .recipe_by_id(id)
        .await?
        .ok_or_else(|| BackendError::not_found("Recipe"))
}

/// Sharing a recipe into a group requires being a member of it. System
/// admins may file recipes into any group.
async fn ensure_group_membership(
    environment: &Environment,
    user: &AuthUser,
    group: Option<Uuid>,
) -> Result<(), BackendError> {
    let group_id = match group {
        Some(id) => id,
        None => return Ok(()),
    };

    let group = environment
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Group"))?;

    policy::ensure(
        user.is_admin() || group.is_member(user.id),
        "You must be a member of the group to share recipes in it",
    )
}

fn parse_criteria(query: &RecipeSearchQuery) -> Result<SearchCriteria, BackendError> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_owned);
    let category = query
        .category
        .as_deref()
        .map(str::parse)
        .transpose()?;
    let difficulty = query
        .difficulty
        .as_deref()
        .map(str::parse)
        .transpose()?;

    Ok(SearchCriteria {
        text,
        category,
        difficulty,
    })
}
