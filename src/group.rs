use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::moderation::Moderation;
use crate::normalization::normalize_name;
use crate::times::Times;
use crate::user::UserRole;

pub const DEFAULT_GROUP_IMAGE: &str = "/img/default-group.jpg";

/// The role of a member inside a group. Exactly one member holds `Owner`,
/// assigned at creation and immutable for the lifetime of the group.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Owner,
    Admin,
    Member,
}

impl GroupRole {
    /// Whether this role may decide on pending join requests and remove
    /// plain members.
    pub fn can_moderate_members(self) -> bool {
        matches!(self, GroupRole::Owner | GroupRole::Admin)
    }
}

/// A member entry embedded in the group document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user: Uuid,
    pub role: GroupRole,
    #[serde(with = "time::serde::timestamp")]
    pub joined_at: OffsetDateTime,
}

/// A recorded intent to join a private group, awaiting an owner/admin
/// decision.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub user: Uuid,
    #[serde(with = "time::serde::timestamp")]
    pub requested_at: OffsetDateTime,
}

/// Errors produced by membership transitions. Mapped onto the HTTP error
/// taxonomy via `From<MembershipError> for BackendError`.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum MembershipError {
    #[error("You are already a member of this group")]
    AlreadyMember,

    #[error("You already have a pending request for this group")]
    AlreadyRequested,

    #[error("Join request")]
    RequestNotFound,

    #[error("Member")]
    MemberNotFound,

    #[error("The owner's role cannot be changed")]
    OwnerRoleImmutable,

    #[error("The owner cannot be removed from the group")]
    OwnerNotRemovable,

    #[error("Only the owner can remove an administrator")]
    OnlyOwnerRemovesAdmins,

    #[error("Invalid role")]
    InvalidRole,
}

impl From<MembershipError> for BackendError {
    fn from(e: MembershipError) -> Self {
        use MembershipError::*;

        match e {
            RequestNotFound => BackendError::not_found("Join request"),
            MemberNotFound => BackendError::not_found("Member"),
            OnlyOwnerRemovesAdmins => BackendError::forbidden(format!("{}", e)),
            other => BackendError::validation(format!("{}", other)),
        }
    }
}

/// The outcome of a join request against a group's invite code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinOutcome {
    /// The group was public; the user became a member immediately.
    Joined,
    /// The group was private; a pending request was recorded.
    Requested,
}

/// A group document: metadata plus the embedded membership and
/// pending-request collections. The embedded lists are value types inside
/// the aggregate; the whole row updates atomically under a `revision`
/// check.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    pub creator: Uuid,
    pub invite_code: String,
    pub members: Vec<Membership>,
    pub pending_requests: Vec<PendingRequest>,
    pub is_private: bool,
    #[serde(flatten)]
    pub moderation: Moderation,
    #[serde(skip_serializing)]
    pub revision: i64,
    #[serde(flatten)]
    pub times: Times,
}

impl Group {
    /// Creates a group seeded with its creator as the sole owner.
    pub fn create(
        details: NewGroup,
        creator: Uuid,
        creator_role: UserRole,
        invite_code: String,
        now: OffsetDateTime,
    ) -> Self {
        Group {
            id: Uuid::new_v4(),
            name: normalize_name(&details.name),
            description: details.description.trim().to_owned(),
            image: details
                .image
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP_IMAGE.to_owned()),
            creator,
            invite_code,
            members: vec![Membership {
                user: creator,
                role: GroupRole::Owner,
                joined_at: now,
            }],
            pending_requests: vec![],
            is_private: details.is_private.unwrap_or(true),
            moderation: Moderation::for_creator(creator, creator_role, now),
            revision: 1,
            times: Times::created(now),
        }
    }

    pub fn member(&self, user: Uuid) -> Option<&Membership> {
        self.members.iter().find(|m| m.user == user)
    }

    pub fn role_of(&self, user: Uuid) -> Option<GroupRole> {
        self.member(user).map(|m| m.role)
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.member(user).is_some()
    }

    pub fn has_pending_request(&self, user: Uuid) -> bool {
        self.pending_requests.iter().any(|r| r.user == user)
    }

    /// `{non-member} → {member}` (public group) or `{non-member} →
    /// {pending}` (private group).
    pub fn request_join(
        &mut self,
        user: Uuid,
        now: OffsetDateTime,
    ) -> Result<JoinOutcome, MembershipError> {
        if self.is_member(user) {
            return Err(MembershipError::AlreadyMember);
        }
        if self.has_pending_request(user) {
            return Err(MembershipError::AlreadyRequested);
        }

        if self.is_private {
            self.pending_requests.push(PendingRequest {
                user,
                requested_at: now,
            });
            Ok(JoinOutcome::Requested)
        } else {
            self.members.push(Membership {
                user,
                role: GroupRole::Member,
                joined_at: now,
            });
            Ok(JoinOutcome::Joined)
        }
    }

    /// `{pending} → {member}`: removes the pending request and appends a
    /// membership with role `member` in one transition.
    pub fn approve_request(
        &mut self,
        target: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), MembershipError> {
        let index = self
            .pending_requests
            .iter()
            .position(|r| r.user == target)
            .ok_or(MembershipError::RequestNotFound)?;

        self.pending_requests.remove(index);
        self.members.push(Membership {
            user: target,
            role: GroupRole::Member,
            joined_at: now,
        });
        Ok(())
    }

    /// `{pending} → {non-member}`: drops the pending request, nothing
    /// else changes.
    pub fn reject_request(&mut self, target: Uuid) -> Result<(), MembershipError> {
        let index = self
            .pending_requests
            .iter()
            .position(|r| r.user == target)
            .ok_or(MembershipError::RequestNotFound)?;

        self.pending_requests.remove(index);
        Ok(())
    }

    /// `member ↔ admin` transition. The owner role can be neither the
    /// source nor the target of a change.
    pub fn change_role(&mut self, target: Uuid, role: GroupRole) -> Result<(), MembershipError> {
        if role == GroupRole::Owner {
            return Err(MembershipError::InvalidRole);
        }

        let member = self
            .members
            .iter_mut()
            .find(|m| m.user == target)
            .ok_or(MembershipError::MemberNotFound)?;

        if member.role == GroupRole::Owner {
            return Err(MembershipError::OwnerRoleImmutable);
        }

        member.role = role;
        Ok(())
    }

    /// Removes a member. The owner can never be removed; an admin may not
    /// remove another admin.
    pub fn remove_member(
        &mut self,
        actor_role: GroupRole,
        target: Uuid,
    ) -> Result<(), MembershipError> {
        let index = self
            .members
            .iter()
            .position(|m| m.user == target)
            .ok_or(MembershipError::MemberNotFound)?;

        match self.members[index].role {
            GroupRole::Owner => return Err(MembershipError::OwnerNotRemovable),
            GroupRole::Admin if actor_role != GroupRole::Owner => {
                return Err(MembershipError::OnlyOwnerRemovesAdmins)
            }
            _ => {}
        }

        self.members.remove(index);
        Ok(())
    }

    /// A member taking themselves out of the group, whatever their role.
    /// Owners cannot leave; they delete the group instead.
    pub fn leave(&mut self, user: Uuid) -> Result<(), MembershipError> {
        let index = self
            .members
            .iter()
            .position(|m| m.user == user)
            .ok_or(MembershipError::MemberNotFound)?;

        if self.members[index].role == GroupRole::Owner {
            return Err(MembershipError::OwnerNotRemovable);
        }

        self.members.remove(index);
        Ok(())
    }

    /// Metadata-only update. A non-administrator edit sends the group
    /// back through moderation.
    pub fn apply_update(&mut self, update: GroupUpdate, editor_is_admin: bool, now: OffsetDateTime) {
        if let Some(name) = update.name {
            self.name = normalize_name(name);
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_owned();
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(is_private) = update.is_private {
            self.is_private = is_private;
        }

        if !editor_is_admin {
            self.moderation.reset();
        }
        self.times.touch(now);
    }
}

/// The payload accepted when creating a group.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub is_private: Option<bool>,
}

impl NewGroup {
    pub fn validate(&self) -> Result<(), BackendError> {
        validate_name(&self.name)?;
        validate_description(&self.description)
    }
}

/// Metadata-only group update.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_private: Option<bool>,
}

impl GroupUpdate {
    pub fn validate(&self) -> Result<(), BackendError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), BackendError> {
    let length = normalize_name(name).chars().count();
    if length < 3 || length > 50 {
        return Err(BackendError::validation(
            "The name must be between 3 and 50 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), BackendError> {
    let length = description.trim().chars().count();
    if length < 10 || length > 300 {
        return Err(BackendError::validation(
            "The description must be between 10 and 300 characters",
        ));
    }
    Ok(())
}

/// The payload accepted when changing a member's role.
#[derive(Clone, Debug, Deserialize)]
pub struct RoleChange {
    pub role: GroupRole,
}
