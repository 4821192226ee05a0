use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::postgres::{PgPool, PgRow};
use uuid::Uuid;

use crate::errors::BackendError;
use crate::group::{Group, Membership, PendingRequest};
use crate::moderation::Moderation;
use crate::pagination::PageParams;
use crate::recipe::{Ingredient, Recipe, Step};
use crate::times::Times;
use crate::user::User;

use super::{Db, Scope, SearchCriteria};

const USERS_EMAIL_CONSTRAINT: &str = "users_email";
const GROUPS_INVITE_CODE_CONSTRAINT: &str = "groups_invite_code";

const GROUP_COLUMNS: &str = "id, name, description, image, creator, invite_code, members::text, \
     pending_requests::text, is_private, moderation_status, moderated_by, moderated_at, \
     rejection_reason, revision, created_at, updated_at";

const RECIPE_COLUMNS: &str = "id, title, description, ingredients::text, steps::text, prep_time, \
     cook_time, servings, difficulty, category, tags::text, image, author, group_id, is_private, \
     moderation_status, moderated_by, moderated_at, rejection_reason, rating, rating_count, \
     created_at, updated_at";

// Visibility window for non-administrators; `$1` is the viewer.
const GROUP_VISIBILITY: &str = "((NOT is_private AND moderation_status = 'approved') \
     OR creator = $1 \
     OR members @> jsonb_build_array(jsonb_build_object('user', $1::text)))";

const RECIPE_VISIBILITY: &str = "((moderation_status = 'approved' AND (NOT is_private \
     OR group_id IN (SELECT id FROM groups \
     WHERE members @> jsonb_build_array(jsonb_build_object('user', $1::text))))) \
     OR author = $1)";

pub struct PgDb {
    pool: PgPool,
}

impl PgDb {
    pub fn new(pool: PgPool) -> Self {
        PgDb { pool }
    }
}

// these can be simplified once async functions in traits are stabilized
impl Db for PgDb {
    fn insert_user(&self, user: User) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/create_user.sql"));

            query
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.profile_picture)
                .bind(&user.bio)
                .bind(user.role.as_str())
                .bind(user.times.created_at)
                .bind(user.times.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
        .boxed()
    }

    fn user_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<User>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/user_by_id.sql"));

            let user: Option<User> = query
                .bind(id)
                .try_map(|row: PgRow| user_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            match user {
                Some(user) => Ok(Some(with_group_ids(&self.pool, user).await?)),
                None => Ok(None),
            }
        }
        .boxed()
    }

    fn user_by_email(&self, email: String) -> BoxFuture<Result<Option<User>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/user_by_email.sql"));

            let user: Option<User> = query
                .bind(email)
                .try_map(|row: PgRow| user_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            match user {
                Some(user) => Ok(Some(with_group_ids(&self.pool, user).await?)),
                None => Ok(None),
            }
        }
        .boxed()
    }

    fn list_users(&self) -> BoxFuture<Result<Vec<User>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/list_users.sql"));

            let users: Vec<User> = query
                .try_map(|row: PgRow| user_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            let mut result = Vec::with_capacity(users.len());
            for user in users {
                result.push(with_group_ids(&self.pool, user).await?);
            }

            Ok(result)
        }
        .boxed()
    }

    fn update_user(&self, user: User) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/update_user.sql"));

            let count = query
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.profile_picture)
                .bind(&user.bio)
                .bind(user.role.as_str())
                .bind(user.times.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            if count == 0 {
                Err(BackendError::not_found("User"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn delete_user(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            sqlx::query(include_str!("queries/detach_recipes_of_creator.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?;
            sqlx::query(include_str!("queries/delete_groups_created_by.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?;
            sqlx::query(include_str!("queries/strip_user_memberships.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?;
            sqlx::query(include_str!("queries/delete_recipes_by_author.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?;

            let count = sqlx::query(include_str!("queries/delete_user.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            tx.commit().await.map_err(map_sqlx_error)?;

            if count == 0 {
                Err(BackendError::not_found("User"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn insert_group(&self, group: Group) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let members = encode_document(&group.members)?;
            let pending = encode_document(&group.pending_requests)?;

            let query = sqlx::query(include_str!("queries/create_group.sql"));

            query
                .bind(group.id)
                .bind(&group.name)
                .bind(&group.description)
                .bind(&group.image)
                .bind(group.creator)
                .bind(&group.invite_code)
                .bind(&members)
                .bind(&pending)
                .bind(group.is_private)
                .bind(group.moderation.status.as_str())
                .bind(group.moderation.moderated_by)
                .bind(group.moderation.moderated_at)
                .bind(&group.moderation.rejection_reason)
                .bind(group.revision)
                .bind(group.times.created_at)
                .bind(group.times.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
        .boxed()
    }

    fn group_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Group>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/group_by_id.sql"));

            let group = query
                .bind(id)
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(group)
        }
        .boxed()
    }

    fn group_by_invite_code(
        &self,
        code: String,
    ) -> BoxFuture<Result<Option<Group>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/group_by_invite_code.sql"));

            let group = query
                .bind(code)
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(group)
        }
        .boxed()
    }

    fn groups_for_user(&self, user: Uuid) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/groups_for_user.sql"));

            let groups = query
                .bind(user)
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(groups)
        }
        .boxed()
    }

    fn list_groups(&self, scope: Scope) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let (sql, viewer) = match scope {
                Scope::All => (
                    format!(
                        "SELECT {} FROM groups ORDER BY created_at DESC",
                        GROUP_COLUMNS
                    ),
                    None,
                ),
                Scope::User { id, .. } => (
                    format!(
                        "SELECT {} FROM groups WHERE {} ORDER BY created_at DESC",
                        GROUP_COLUMNS, GROUP_VISIBILITY
                    ),
                    Some(id),
                ),
            };

            let mut query = sqlx::query(&sql);
            if let Some(viewer) = viewer {
                query = query.bind(viewer);
            }

            let groups = query
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(groups)
        }
        .boxed()
    }

    fn search_groups(
        &self,
        scope: Scope,
        query: String,
    ) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let pattern = format!("%{}%", query);

            let (sql, viewer) = match scope {
                Scope::All => (
                    format!(
                        "SELECT {} FROM groups \
                         WHERE name ILIKE $1 OR description ILIKE $1 \
                         ORDER BY created_at DESC",
                        GROUP_COLUMNS
                    ),
                    None,
                ),
                Scope::User { id, .. } => (
                    format!(
                        "SELECT {} FROM groups \
                         WHERE {} AND (name ILIKE $2 OR description ILIKE $2) \
                         ORDER BY created_at DESC",
                        GROUP_COLUMNS, GROUP_VISIBILITY
                    ),
                    Some(id),
                ),
            };

            let mut query = sqlx::query(&sql);
            if let Some(viewer) = viewer {
                query = query.bind(viewer);
            }

            let groups = query
                .bind(&pattern)
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(groups)
        }
        .boxed()
    }

    fn update_group(
        &self,
        group: Group,
        expected_revision: i64,
    ) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let members = encode_document(&group.members)?;
            let pending = encode_document(&group.pending_requests)?;

            let query = sqlx::query(include_str!("queries/update_group.sql"));

            let count = query
                .bind(group.id)
                .bind(&group.name)
                .bind(&group.description)
                .bind(&group.image)
                .bind(group.is_private)
                .bind(&members)
                .bind(&pending)
                .bind(group.moderation.status.as_str())
                .bind(group.moderation.moderated_by)
                .bind(group.moderation.moderated_at)
                .bind(&group.moderation.rejection_reason)
                .bind(group.times.updated_at)
                .bind(expected_revision)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            Ok(count == 1)
        }
        .boxed()
    }

    fn delete_group(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            sqlx::query(include_str!("queries/detach_group_recipes.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?;

            let count = sqlx::query(include_str!("queries/delete_group.sql"))
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            tx.commit().await.map_err(map_sqlx_error)?;

            if count == 0 {
                Err(BackendError::not_found("Group"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn invite_code_exists(&self, code: String) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let query =
                sqlx::query_as::<_, (bool,)>(include_str!("queries/invite_code_exists.sql"));

            let (exists,) = query
                .bind(code)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(exists)
        }
        .boxed()
    }

    fn pending_groups(&self) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/pending_groups.sql"));

            let groups = query
                .try_map(|row: PgRow| group_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(groups)
        }
        .boxed()
    }

    fn insert_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let ingredients = encode_document(&recipe.ingredients)?;
            let steps = encode_document(&recipe.steps)?;
            let tags = encode_document(&recipe.tags)?;

            let query = sqlx::query(include_str!("queries/create_recipe.sql"));

            query
                .bind(recipe.id)
                .bind(&recipe.title)
                .bind(&recipe.description)
                .bind(&ingredients)
                .bind(&steps)
                .bind(recipe.prep_time)
                .bind(recipe.cook_time)
                .bind(recipe.servings)
                .bind(recipe.difficulty.as_str())
                .bind(recipe.category.as_str())
                .bind(&tags)
                .bind(&recipe.image)
                .bind(recipe.author)
                .bind(recipe.group)
                .bind(recipe.is_private)
                .bind(recipe.moderation.status.as_str())
                .bind(recipe.moderation.moderated_by)
                .bind(recipe.moderation.moderated_at)
                .bind(&recipe.moderation.rejection_reason)
                .bind(recipe.rating)
                .bind(recipe.rating_count)
                .bind(recipe.times.created_at)
                .bind(recipe.times.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
        .boxed()
    }

    fn recipe_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Recipe>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/recipe_by_id.sql"));

            let recipe = query
                .bind(id)
                .try_map(|row: PgRow| recipe_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(recipe)
        }
        .boxed()
    }

    fn update_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let ingredients = encode_document(&recipe.ingredients)?;
            let steps = encode_document(&recipe.steps)?;
            let tags = encode_document(&recipe.tags)?;

            let query = sqlx::query(include_str!("queries/update_recipe.sql"));

            let count = query
                .bind(recipe.id)
                .bind(&recipe.title)
                .bind(&recipe.description)
                .bind(&ingredients)
                .bind(&steps)
                .bind(recipe.prep_time)
                .bind(recipe.cook_time)
                .bind(recipe.servings)
                .bind(recipe.difficulty.as_str())
                .bind(recipe.category.as_str())
                .bind(&tags)
                .bind(&recipe.image)
                .bind(recipe.group)
                .bind(recipe.is_private)
                .bind(recipe.moderation.status.as_str())
                .bind(recipe.moderation.moderated_by)
                .bind(recipe.moderation.moderated_at)
                .bind(&recipe.moderation.rejection_reason)
                .bind(recipe.rating)
                .bind(recipe.rating_count)
                .bind(recipe.times.updated_at)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            if count == 0 {
                Err(BackendError::not_found("Recipe"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn delete_recipe(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let count = sqlx::query(include_str!("queries/delete_recipe.sql"))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            if count == 0 {
                Err(BackendError::not_found("Recipe"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn list_recipes(
        &self,
        scope: Scope,
        params: PageParams,
    ) -> BoxFuture<Result<(Vec<Recipe>, i64), BackendError>> {
        async move {
            let (where_clause, viewer) = match scope {
                Scope::All => ("TRUE", None),
                Scope::User { id, .. } => (RECIPE_VISIBILITY, Some(id)),
            };

            let count_sql = format!("SELECT COUNT(*) FROM recipes WHERE {}", where_clause);
            let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
            if let Some(viewer) = viewer {
                count_query = count_query.bind(viewer);
            }
            let (total,) = count_query
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            let direction = if params.sort.descending { "DESC" } else { "ASC" };
            let sql = format!(
                "SELECT {} FROM recipes WHERE {} ORDER BY {} {}, id LIMIT {} OFFSET {}",
                RECIPE_COLUMNS,
                where_clause,
                params.sort.field.order_expression(),
                direction,
                params.limit,
                params.offset()
            );

            let mut query = sqlx::query(&sql);
            if let Some(viewer) = viewer {
                query = query.bind(viewer);
            }

            let recipes = query
                .try_map(|row: PgRow| recipe_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok((recipes, total))
        }
        .boxed()
    }

    fn search_recipes(
        &self,
        scope: Scope,
        criteria: SearchCriteria,
    ) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
        async move {
            let (sql, viewer) = match scope {
                Scope::All => (
                    format!(
                        "SELECT {} FROM recipes WHERE {} ORDER BY created_at DESC",
                        RECIPE_COLUMNS,
                        criteria_clause(1)
                    ),
                    None,
                ),
                Scope::User { id, .. } => (
                    format!(
                        "SELECT {} FROM recipes WHERE {} AND {} ORDER BY created_at DESC",
                        RECIPE_COLUMNS,
                        RECIPE_VISIBILITY,
                        criteria_clause(2)
                    ),
                    Some(id),
                ),
            };

            let mut query = sqlx::query(&sql);
            if let Some(viewer) = viewer {
                query = query.bind(viewer);
            }

            let recipes = query
                .bind(criteria.text)
                .bind(criteria.category.map(|c| c.as_str()))
                .bind(criteria.difficulty.map(|d| d.as_str()))
                .try_map(|row: PgRow| recipe_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(recipes)
        }
        .boxed()
    }

    fn pending_recipes(&self) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("queries/pending_recipes.sql"));

            let recipes = query
                .try_map(|row: PgRow| recipe_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(recipes)
        }
        .boxed()
    }
}

/// The optional-filter fragment of the recipe search, with placeholders
/// starting at `$first`. A NULL bind disables the corresponding filter.
fn criteria_clause(first: usize) -> String {
    format!(
        "(${t}::text IS NULL OR title ILIKE '%' || ${t} || '%' \
         OR description ILIKE '%' || ${t} || '%' \
         OR tags::text ILIKE '%' || ${t} || '%') \
         AND (${c}::text IS NULL OR category = ${c}) \
         AND (${d}::text IS NULL OR difficulty = ${d})",
        t = first,
        c = first + 1,
        d = first + 2
    )
}

async fn with_group_ids(pool: &PgPool, mut user: User) -> Result<User, BackendError> {
    let query = sqlx::query(include_str!("queries/group_ids_for_user.sql"));

    user.groups = query
        .bind(user.id)
        .try_map(|row: PgRow| {
            let id: Uuid = try_get(&row, "id")?;

            Ok(id)
        })
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(user)
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = try_get(row, "role")?;

    Ok(User {
        id: try_get(row, "id")?,
        name: try_get(row, "name")?,
        email: try_get(row, "email")?,
        password_hash: try_get(row, "password_hash")?,
        profile_picture: try_get(row, "profile_picture")?,
        bio: try_get(row, "bio")?,
        role: role.parse().map_err(decode_error)?,
        groups: vec![],
        times: times_from_row(row)?,
    })
}

fn group_from_row(row: &PgRow) -> Result<Group, sqlx::Error> {
    let members: String = try_get(row, "members")?;
    let pending: String = try_get(row, "pending_requests")?;

    Ok(Group {
        id: try_get(row, "id")?,
        name: try_get(row, "name")?,
        description: try_get(row, "description")?,
        image: try_get(row, "image")?,
        creator: try_get(row, "creator")?,
        invite_code: try_get(row, "invite_code")?,
        members: parse_document::<Vec<Membership>>(&members)?,
        pending_requests: parse_document::<Vec<PendingRequest>>(&pending)?,
        is_private: try_get(row, "is_private")?,
        moderation: moderation_from_row(row)?,
        revision: try_get(row, "revision")?,
        times: times_from_row(row)?,
    })
}

fn recipe_from_row(row: &PgRow) -> Result<Recipe, sqlx::Error> {
    let ingredients: String = try_get(row, "ingredients")?;
    let steps: String = try_get(row, "steps")?;
    let tags: String = try_get(row, "tags")?;
    let difficulty: String = try_get(row, "difficulty")?;
    let category: String = try_get(row, "category")?;

    Ok(Recipe {
        id: try_get(row, "id")?,
        title: try_get(row, "title")?,
        description: try_get(row, "description")?,
        ingredients: parse_document::<Vec<Ingredient>>(&ingredients)?,
        steps: parse_document::<Vec<Step>>(&steps)?,
        prep_time: try_get(row, "prep_time")?,
        cook_time: try_get(row, "cook_time")?,
        servings: try_get(row, "servings")?,
        difficulty: difficulty.parse().map_err(decode_error)?,
        category: category.parse().map_err(decode_error)?,
        tags: parse_document::<Vec<String>>(&tags)?,
        image: try_get(row, "image")?,
        author: try_get(row, "author")?,
        group: try_get(row, "group_id")?,
        is_private: try_get(row, "is_private")?,
        moderation: moderation_from_row(row)?,
        rating: try_get(row, "rating")?,
        rating_count: try_get(row, "rating_count")?,
        times: times_from_row(row)?,
    })
}

fn moderation_from_row(row: &PgRow) -> Result<Moderation, sqlx::Error> {
    let status: String = try_get(row, "moderation_status")?;

    Ok(Moderation {
        status: status
            .parse()
            .map_err(|message: String| sqlx::Error::Decode(message.into()))?,
        moderated_by: try_get(row, "moderated_by")?,
        moderated_at: try_get(row, "moderated_at")?,
        rejection_reason: try_get(row, "rejection_reason")?,
    })
}

fn times_from_row(row: &PgRow) -> Result<Times, sqlx::Error> {
    Ok(Times {
        created_at: try_get(row, "created_at")?,
        updated_at: try_get(row, "updated_at")?,
    })
}

fn parse_document<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw)
        .map_err(|source| sqlx::Error::Decode(Box::new(BackendError::StoredDocument { source })))
}

fn encode_document<T: serde::Serialize>(value: &T) -> Result<String, BackendError> {
    serde_json::to_string(value).map_err(|source| BackendError::StoredDocument { source })
}

fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
    row: &'a PgRow,
    column: &str,
) -> Result<T, sqlx::Error> {
    use sqlx::prelude::*;

    row.try_get(column)
}

fn decode_error(e: BackendError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn map_sqlx_error(error: sqlx::Error) -> BackendError {
    use sqlx::Error;

    match error {
        Error::Database(ref e) if e.constraint() == Some(USERS_EMAIL_CONSTRAINT) => {
            BackendError::Conflict {
                what: "email".to_owned(),
            }
        }
        Error::Database(ref e) if e.constraint() == Some(GROUPS_INVITE_CODE_CONSTRAINT) => {
            BackendError::Conflict {
                what: "invite code".to_owned(),
            }
        }
        _ => BackendError::Sqlx { source: error },
    }
}
