//! The access-control policy consulted by every handler. All role,
//! ownership and membership checks live here so the group and recipe
//! rules cannot drift apart; handlers call the `ensure_*` functions
//! before performing any mutation.

use crate::auth::AuthUser;
use crate::errors::BackendError;
use crate::group::{Group, GroupRole};
use crate::recipe::Recipe;

/// Group read: member, creator, system admin, or anyone when the group
/// is public and approved.
pub fn can_view_group(user: &AuthUser, group: &Group) -> bool {
    user.is_admin()
        || group.creator == user.id
        || group.is_member(user.id)
        || (!group.is_private && group.moderation.is_approved())
}

/// Group metadata update: creator, group-level owner/admin, or system
/// admin.
pub fn can_update_group(user: &AuthUser, group: &Group) -> bool {
    user.is_admin()
        || group.creator == user.id
        || group
            .role_of(user.id)
            .map(GroupRole::can_moderate_members)
            .unwrap_or(false)
}

/// Group deletion is reserved for the creator and system admins.
pub fn can_delete_group(user: &AuthUser, group: &Group) -> bool {
    user.is_admin() || group.creator == user.id
}

/// Deciding on join requests and removing members requires a group-level
/// owner/admin role; system admins may moderate any group.
pub fn can_manage_members(user: &AuthUser, group: &Group) -> bool {
    user.is_admin()
        || group
            .role_of(user.id)
            .map(GroupRole::can_moderate_members)
            .unwrap_or(false)
}

/// Changing member roles is reserved for the owner, with no system-admin
/// bypass.
pub fn can_change_roles(user: &AuthUser, group: &Group) -> bool {
    group.role_of(user.id) == Some(GroupRole::Owner)
}

/// The group-level privilege a user acts with when removing members.
/// System admins act with owner privilege.
pub fn acting_role(user: &AuthUser, group: &Group) -> Option<GroupRole> {
    if user.is_admin() {
        Some(GroupRole::Owner)
    } else {
        group.role_of(user.id)
    }
}

/// Recipe read: pending/rejected recipes are visible only to their
/// author and system admins; approved recipes additionally to everyone
/// when public, and to members of the linked group when private.
pub fn can_view_recipe(user: &AuthUser, recipe: &Recipe) -> bool {
    if user.is_admin() || recipe.author == user.id {
        return true;
    }
    if !recipe.moderation.is_approved() {
        return false;
    }

    !recipe.is_private
        || recipe
            .group
            .map(|group| user.groups.contains(&group))
            .unwrap_or(false)
}

/// Recipe write/delete: author or system admin.
pub fn can_modify_recipe(user: &AuthUser, recipe: &Recipe) -> bool {
    user.is_admin() || recipe.author == user.id
}

pub fn ensure(allowed: bool, message: &str) -> Result<(), BackendError> {
    if allowed {
        Ok(())
    } else {
        Err(BackendError::forbidden(message))
    }
}

/// Moderation endpoints are reserved for system administrators.
pub fn ensure_admin(user: &AuthUser) -> Result<(), BackendError> {
    ensure(user.is_admin(), "Administrator access only")
}
