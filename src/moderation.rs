use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::user::UserRole;

/// The reason recorded when an administrator rejects content without
/// giving one.
pub const DEFAULT_REJECTION_REASON: &str =
    "Does not comply with the platform's content policies";

/// The moderation lifecycle shared by groups and recipes. Gating of
/// public visibility happens in [`crate::policy`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            other => Err(format!("unknown moderation status: {}", other)),
        }
    }
}

/// Moderation state attached to a group or recipe. Serialized flattened
/// into the owning entity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Moderation {
    #[serde(rename = "moderationStatus")]
    pub status: ModerationStatus,
    #[serde(rename = "moderatedBy")]
    pub moderated_by: Option<Uuid>,
    #[serde(rename = "moderatedAt", with = "crate::times::timestamp_option")]
    pub moderated_at: Option<OffsetDateTime>,
    #[serde(rename = "rejectionReason")]
    pub rejection_reason: Option<String>,
}

impl Moderation {
    /// Initial state for newly created content: administrators are
    /// auto-approved, everyone else starts pending.
    pub fn for_creator(creator: Uuid, role: UserRole, now: OffsetDateTime) -> Self {
        match role {
            UserRole::Admin => Moderation {
                status: ModerationStatus::Approved,
                moderated_by: Some(creator),
                moderated_at: Some(now),
                rejection_reason: None,
            },
            UserRole::User => Moderation::pending(),
        }
    }

    pub fn pending() -> Self {
        Moderation {
            status: ModerationStatus::Pending,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ModerationStatus::Approved
    }

    pub fn approve(&mut self, moderator: Uuid, now: OffsetDateTime) {
        self.status = ModerationStatus::Approved;
        self.moderated_by = Some(moderator);
        self.moderated_at = Some(now);
        self.rejection_reason = None;
    }

    pub fn reject(&mut self, moderator: Uuid, reason: Option<String>, now: OffsetDateTime) {
        self.status = ModerationStatus::Rejected;
        self.moderated_by = Some(moderator);
        self.moderated_at = Some(now);
        self.rejection_reason = Some(
            reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned()),
        );
    }

    /// Applied when a non-administrator edits previously moderated
    /// content: back to pending, prior verdict discarded.
    pub fn reset(&mut self) {
        *self = Moderation::pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_are_auto_approved() {
        let admin = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let moderation = Moderation::for_creator(admin, UserRole::Admin, now);
        assert_eq!(moderation.status, ModerationStatus::Approved);
        assert_eq!(moderation.moderated_by, Some(admin));

        let moderation = Moderation::for_creator(admin, UserRole::User, now);
        assert_eq!(moderation.status, ModerationStatus::Pending);
        assert_eq!(moderation.moderated_by, None);
    }

    #[test]
    fn rejection_defaults_the_reason() {
        let moderator = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let mut moderation = Moderation::pending();

        moderation.reject(moderator, None, now);
        assert_eq!(
            moderation.rejection_reason.as_deref(),
            Some(DEFAULT_REJECTION_REASON)
        );

        moderation.reject(moderator, Some("  ".to_owned()), now);
        assert_eq!(
            moderation.rejection_reason.as_deref(),
            Some(DEFAULT_REJECTION_REASON)
        );

        moderation.reject(moderator, Some("Spam".to_owned()), now);
        assert_eq!(moderation.rejection_reason.as_deref(), Some("Spam"));
    }

    #[test]
    fn reset_clears_the_previous_verdict() {
        let moderator = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let mut moderation = Moderation::pending();

        moderation.approve(moderator, now);
        assert!(moderation.is_approved());

        moderation.reset();
        assert_eq!(moderation.status, ModerationStatus::Pending);
        assert_eq!(moderation.moderated_by, None);
        assert_eq!(moderation.moderated_at, None);
        assert_eq!(moderation.rejection_reason, None);
    }
}
