use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::group::Group;
use crate::pagination::PageParams;
use crate::recipe::{Category, Difficulty, Recipe};
use crate::user::User;

/// The visibility window a listing or search runs under. Administrators
/// see everything; everyone else sees approved public content, content
/// of groups they belong to, and their own submissions.
#[derive(Clone, Debug)]
pub enum Scope {
    All,
    User { id: Uuid, groups: Vec<Uuid> },
}

/// Recipe search filters. At least one must be present; the handler
/// rejects empty searches before reaching the database.
#[derive(Clone, Debug, Default)]
pub struct SearchCriteria {
    pub text: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.category.is_none() && self.difficulty.is_none()
    }
}

pub trait Db {
    fn insert_user(&self, user: User) -> BoxFuture<Result<(), BackendError>>;

    fn user_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<User>, BackendError>>;

    fn user_by_email(&self, email: String) -> BoxFuture<Result<Option<User>, BackendError>>;

    fn list_users(&self) -> BoxFuture<Result<Vec<User>, BackendError>>;

    fn update_user(&self, user: User) -> BoxFuture<Result<(), BackendError>>;

    /// Deletes the user together with the groups they created and the
    /// recipes they authored, and withdraws their memberships and
    /// pending requests everywhere else.
    fn delete_user(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>>;

    fn insert_group(&self, group: Group) -> BoxFuture<Result<(), BackendError>>;

    fn group_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Group>, BackendError>>;

    fn group_by_invite_code(&self, code: String)
        -> BoxFuture<Result<Option<Group>, BackendError>>;

    fn groups_for_user(&self, user: Uuid) -> BoxFuture<Result<Vec<Group>, BackendError>>;

    fn list_groups(&self, scope: Scope) -> BoxFuture<Result<Vec<Group>, BackendError>>;

    fn search_groups(
        &self,
        scope: Scope,
        query: String,
    ) -> BoxFuture<Result<Vec<Group>, BackendError>>;

    /// Persists the group only if its stored revision still matches
    /// `expected_revision`. Returns `false` when another writer got
    /// there first; the caller reloads and retries.
    fn update_group(
        &self,
        group: Group,
        expected_revision: i64,
    ) -> BoxFuture<Result<bool, BackendError>>;

    /// Deletes the group and detaches the recipes that were shared into
    /// it.
    fn delete_group(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>>;

    fn invite_code_exists(&self, code: String) -> BoxFuture<Result<bool, BackendError>>;

    fn pending_groups(&self) -> BoxFuture<Result<Vec<Group>, BackendError>>;

    fn insert_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>>;

    fn recipe_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Recipe>, BackendError>>;

    fn update_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>>;

    fn delete_recipe(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// Returns one page of visible recipes along with the total count of
    /// visible recipes before paging.
    fn list_recipes(
        &self,
        scope: Scope,
        params: PageParams,
    ) -> BoxFuture<Result<(Vec<Recipe>, i64), BackendError>>;

    fn search_recipes(
        &self,
        scope: Scope,
        criteria: SearchCriteria,
    ) -> BoxFuture<Result<Vec<Recipe>, BackendError>>;

    fn pending_recipes(&self) -> BoxFuture<Result<Vec<Recipe>, BackendError>>;
}

pub mod mock;

mod postgres;

pub use self::postgres::*;
