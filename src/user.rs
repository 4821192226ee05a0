use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::normalization::{normalize_email, normalize_name};
use crate::times::Times;

pub const DEFAULT_PROFILE_PICTURE: &str = "/img/default-profile.png";

/// The platform-wide role of a user. Fixed at creation unless changed by
/// an administrator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(BackendError::validation(format!(
                "unknown user role: {}",
                other
            ))),
        }
    }
}

/// A single account in the database. The password hash is never
/// serialized; the set of group references is derived from group
/// membership lists on load.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: String,
    pub bio: String,
    pub role: UserRole,
    pub groups: Vec<Uuid>,
    #[serde(flatten)]
    pub times: Times,
}

impl User {
    pub fn create(
        registration: Registration,
        password_hash: String,
        role: UserRole,
        now: OffsetDateTime,
    ) -> Self {
        User {
            id: Uuid::new_v4(),
            name: normalize_name(&registration.name),
            email: normalize_email(&registration.email),
            password_hash,
            profile_picture: registration
                .profile_picture
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_owned()),
            bio: registration.bio.unwrap_or_default(),
            role,
            groups: vec![],
            times: Times::created(now),
        }
    }

    pub fn apply_profile_update(&mut self, update: ProfileUpdate, now: OffsetDateTime) {
        if let Some(name) = update.name {
            self.name = normalize_name(name);
        }
        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        if let Some(picture) = update.profile_picture {
            self.profile_picture = picture;
        }
        self.times.touch(now);
    }

    pub fn apply_admin_update(&mut self, update: AdminUserUpdate, now: OffsetDateTime) {
        if let Some(role) = update.role {
            self.role = role;
        }
        self.apply_profile_update(update.profile, now);
    }
}

/// The payload accepted by the registration endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), BackendError> {
        let name = normalize_name(&self.name);
        if name.chars().count() < 2 || name.chars().count() > 50 {
            return Err(BackendError::validation(
                "The name must be between 2 and 50 characters",
            ));
        }
        if !valid_email(&normalize_email(&self.email)) {
            return Err(BackendError::validation("The email must be valid"));
        }
        if self.password.chars().count() < 6 {
            return Err(BackendError::validation(
                "The password must be at least 6 characters",
            ));
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > 200 {
                return Err(BackendError::validation(
                    "The bio cannot exceed 200 characters",
                ));
            }
        }
        Ok(())
    }
}

/// The payload accepted by the login endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Self-service profile update. Email and password cannot be changed
/// through this payload.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), BackendError> {
        if let Some(name) = &self.name {
            let name = normalize_name(name);
            if name.chars().count() < 2 || name.chars().count() > 50 {
                return Err(BackendError::validation(
                    "The name must be between 2 and 50 characters",
                ));
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > 200 {
                return Err(BackendError::validation(
                    "The bio cannot exceed 200 characters",
                ));
            }
        }
        Ok(())
    }
}

/// Administrator update of another account; additionally allows changing
/// the platform role.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    #[serde(flatten)]
    pub profile: ProfileUpdate,
    pub role: Option<UserRole>,
}

/// A deliberately small structural check; deliverability is not our
/// problem.
pub fn valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
