//! An in-memory [`Db`] used by the HTTP tests. It reproduces the
//! semantics the SQL backend gets from the database: unique emails and
//! invite codes, revision-checked group updates, deletion cascades and
//! the visibility windows.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::FutureExt;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::group::Group;
use crate::moderation::ModerationStatus;
use crate::pagination::{PageParams, SortField};
use crate::recipe::{self, Recipe};
use crate::user::User;

use super::{Db, Scope, SearchCriteria};

#[derive(Default)]
pub struct MockDb {
    users: RwLock<HashMap<Uuid, User>>,
    groups: RwLock<HashMap<Uuid, Group>>,
    recipes: RwLock<HashMap<Uuid, Recipe>>,
}

impl MockDb {
    pub fn new() -> Self {
        Default::default()
    }

    fn member_groups(&self, user: Uuid) -> Vec<Uuid> {
        let groups = self.groups.read().unwrap();

        let mut ids: Vec<_> = groups
            .values()
            .filter(|g| g.is_member(user))
            .map(|g| (g.times.created_at, g.id))
            .collect();
        ids.sort();

        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn fill_groups(&self, mut user: User) -> User {
        user.groups = self.member_groups(user.id);
        user
    }

    fn group_visible(group: &Group, scope: &Scope) -> bool {
        match scope {
            Scope::All => true,
            Scope::User { id, .. } => {
                (!group.is_private && group.moderation.is_approved())
                    || group.creator == *id
                    || group.is_member(*id)
            }
        }
    }

    fn recipe_visible(&self, recipe: &Recipe, scope: &Scope) -> bool {
        match scope {
            Scope::All => true,
            Scope::User { id, .. } => {
                if recipe.author == *id {
                    return true;
                }
                if !recipe.moderation.is_approved() {
                    return false;
                }

                !recipe.is_private
                    || recipe
                        .group
                        .map(|group| self.member_groups(*id).contains(&group))
                        .unwrap_or(false)
            }
        }
    }
}

impl Db for MockDb {
    fn insert_user(&self, user: User) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut users = self.users.write().unwrap();

            if users.values().any(|u| u.email == user.email) {
                return Err(BackendError::Conflict {
                    what: "email".to_owned(),
                });
            }
            users.insert(user.id, user);

            Ok(())
        }
        .boxed()
    }

    fn user_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<User>, BackendError>> {
        async move {
            let user = self.users.read().unwrap().get(&id).cloned();

            Ok(user.map(|u| self.fill_groups(u)))
        }
        .boxed()
    }

    fn user_by_email(&self, email: String) -> BoxFuture<Result<Option<User>, BackendError>> {
        async move {
            let user = self
                .users
                .read()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned();

            Ok(user.map(|u| self.fill_groups(u)))
        }
        .boxed()
    }

    fn list_users(&self) -> BoxFuture<Result<Vec<User>, BackendError>> {
        async move {
            let mut users: Vec<_> = self.users.read().unwrap().values().cloned().collect();
            users.sort_by(|a, b| b.times.created_at.cmp(&a.times.created_at));

            Ok(users.into_iter().map(|u| self.fill_groups(u)).collect())
        }
        .boxed()
    }

    fn update_user(&self, user: User) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut users = self.users.write().unwrap();

            if !users.contains_key(&user.id) {
                return Err(BackendError::not_found("User"));
            }
            if users
                .values()
                .any(|u| u.id != user.id && u.email == user.email)
            {
                return Err(BackendError::Conflict {
                    what: "email".to_owned(),
                });
            }
            users.insert(user.id, user);

            Ok(())
        }
        .boxed()
    }

    fn delete_user(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            if self.users.write().unwrap().remove(&id).is_none() {
                return Err(BackendError::not_found("User"));
            }

            let mut groups = self.groups.write().unwrap();
            let deleted_groups: Vec<Uuid> = groups
                .values()
                .filter(|g| g.creator == id)
                .map(|g| g.id)
                .collect();
            for group_id in &deleted_groups {
                groups.remove(group_id);
            }
            for group in groups.values_mut() {
                let before = group.members.len() + group.pending_requests.len();
                group.members.retain(|m| m.user != id);
                group.pending_requests.retain(|r| r.user != id);
                if group.members.len() + group.pending_requests.len() != before {
                    group.revision += 1;
                }
            }

            let mut recipes = self.recipes.write().unwrap();
            recipes.retain(|_, r| r.author != id);
            for recipe in recipes.values_mut() {
                if let Some(group) = recipe.group {
                    if deleted_groups.contains(&group) {
                        recipe.group = None;
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }

    fn insert_group(&self, group: Group) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut groups = self.groups.write().unwrap();

            if groups.values().any(|g| g.invite_code == group.invite_code) {
                return Err(BackendError::Conflict {
                    what: "invite code".to_owned(),
                });
            }
            groups.insert(group.id, group);

            Ok(())
        }
        .boxed()
    }

    fn group_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Group>, BackendError>> {
        async move { Ok(self.groups.read().unwrap().get(&id).cloned()) }.boxed()
    }

    fn group_by_invite_code(
        &self,
        code: String,
    ) -> BoxFuture<Result<Option<Group>, BackendError>> {
        async move {
            Ok(self
                .groups
                .read()
                .unwrap()
                .values()
                .find(|g| g.invite_code == code)
                .cloned())
        }
        .boxed()
    }

    fn groups_for_user(&self, user: Uuid) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let mut groups: Vec<_> = self
                .groups
                .read()
                .unwrap()
                .values()
                .filter(|g| g.is_member(user))
                .cloned()
                .collect();
            groups.sort_by(|a, b| b.times.created_at.cmp(&a.times.created_at));

            Ok(groups)
        }
        .boxed()
    }

    fn list_groups(&self, scope: Scope) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let mut groups: Vec<_> = self
                .groups
                .read()
                .unwrap()
                .values()
                .filter(|g| Self::group_visible(g, &scope))
                .cloned()
                .collect();
            groups.sort_by(|a, b| b.times.created_at.cmp(&a.times.created_at));

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
            let needle = query.to_lowercase();

            let mut groups: Vec<_> = self
                .groups
                .read()
                .unwrap()
                .values()
                .filter(|g| Self::group_visible(g, &scope))
                .filter(|g| {
                    g.name.to_lowercase().contains(&needle)
                        || g.description.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect();
            groups.sort_by(|a, b| b.times.created_at.cmp(&a.times.created_at));

            Ok(groups)
        }
        .boxed()
    }

    fn update_group(
        &self,
        mut group: Group,
        expected_revision: i64,
    ) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let mut groups = self.groups.write().unwrap();

            match groups.get(&group.id) {
                Some(stored) if stored.revision == expected_revision => {
                    group.revision = expected_revision + 1;
                    groups.insert(group.id, group);

                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Ok(false),
            }
        }
        .boxed()
    }

    fn delete_group(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            if self.groups.write().unwrap().remove(&id).is_none() {
                return Err(BackendError::not_found("Group"));
            }

            for recipe in self.recipes.write().unwrap().values_mut() {
                if recipe.group == Some(id) {
                    recipe.group = None;
                }
            }

            Ok(())
        }
        .boxed()
    }

    fn invite_code_exists(&self, code: String) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            Ok(self
                .groups
                .read()
                .unwrap()
                .values()
                .any(|g| g.invite_code == code))
        }
        .boxed()
    }

    fn pending_groups(&self) -> BoxFuture<Result<Vec<Group>, BackendError>> {
        async move {
            let mut groups: Vec<_> = self
                .groups
                .read()
                .unwrap()
                .values()
                .filter(|g| g.moderation.status == ModerationStatus::Pending)
                .cloned()
                .collect();
            groups.sort_by(|a, b| a.times.created_at.cmp(&b.times.created_at));

            Ok(groups)
        }
        .boxed()
    }

    fn insert_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>> {
        async move {
            self.recipes.write().unwrap().insert(recipe.id, recipe);

            Ok(())
        }
        .boxed()
    }

    fn recipe_by_id(&self, id: Uuid) -> BoxFuture<Result<Option<Recipe>, BackendError>> {
        async move { Ok(self.recipes.read().unwrap().get(&id).cloned()) }.boxed()
    }

    fn update_recipe(&self, recipe: Recipe) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut recipes = self.recipes.write().unwrap();

            if !recipes.contains_key(&recipe.id) {
                return Err(BackendError::not_found("Recipe"));
            }
            recipes.insert(recipe.id, recipe);

            Ok(())
        }
        .boxed()
    }

    fn delete_recipe(&self, id: Uuid) -> BoxFuture<Result<(), BackendError>> {
        async move {
            if self.recipes.write().unwrap().remove(&id).is_none() {
                return Err(BackendError::not_found("Recipe"));
            }

            Ok(())
        }
        .boxed()
    }

    fn list_recipes(
        &self,
        scope: Scope,
        params: PageParams,
    ) -> BoxFuture<Result<(Vec<Recipe>, i64), BackendError>> {
        async move {
            let mut recipes: Vec<_> = self
                .recipes
                .read()
                .unwrap()
                .values()
                .cloned()
                .collect();
            recipes.retain(|r| self.recipe_visible(r, &scope));

            recipes.sort_by(|a, b| {
                let ordering = compare(a, b, params.sort.field);
                if params.sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });

            let total = recipes.len() as i64;
            let page = recipes
                .into_iter()
                .skip(params.offset() as usize)
                .take(params.limit as usize)
                .collect();

            Ok((page, total))
        }
        .boxed()
    }

    fn search_recipes(
        &self,
        scope: Scope,
        criteria: SearchCriteria,
    ) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
        async move {
            let mut recipes: Vec<_> = self
                .recipes
                .read()
                .unwrap()
                .values()
                .cloned()
                .collect();
            recipes.retain(|r| self.recipe_visible(r, &scope));
            recipes.retain(|r| {
                criteria
                    .text
                    .as_deref()
                    .map(|text| recipe::matches_text(r, text))
                    .unwrap_or(true)
                    && criteria.category.map(|c| r.category == c).unwrap_or(true)
                    && criteria
                        .difficulty
                        .map(|d| r.difficulty == d)
                        .unwrap_or(true)
            });
            recipes.sort_by(|a, b| b.times.created_at.cmp(&a.times.created_at));

            Ok(recipes)
        }
        .boxed()
    }

    fn pending_recipes(&self) -> BoxFuture<Result<Vec<Recipe>, BackendError>> {
        async move {
            let mut recipes: Vec<_> = self
                .recipes
                .read()
                .unwrap()
                .values()
                .filter(|r| r.moderation.status == ModerationStatus::Pending)
                .cloned()
                .collect();
            recipes.sort_by(|a, b| a.times.created_at.cmp(&b.times.created_at));

            Ok(recipes)
        }
        .boxed()
    }
}

fn compare(a: &Recipe, b: &Recipe, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.times.created_at.cmp(&b.times.created_at),
        SortField::Title => a.title.cmp(&b.title),
        SortField::PrepTime => a.prep_time.cmp(&b.prep_time),
        SortField::CookTime => a.cook_time.cmp(&b.cook_time),
        SortField::Servings => a.servings.cmp(&b.servings),
        SortField::Difficulty => a.difficulty.rank().cmp(&b.difficulty.rank()),
        SortField::Rating => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
    }
}
