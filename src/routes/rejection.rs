use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

/// A [`BackendError`] together with the request context it arose in.
/// Recovered into a JSON error body by
/// [`format_rejection`](crate::routes::format_rejection).
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

/// All variants are struct-style so the flattened JSON body stays a map.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Auth {},
    Body {},
    Register { email: String },
    Login { email: String },
    Profile { user: String },
    Users {},
    User { id: String },
    Groups {},
    Group { id: String },
    GroupSearch { query: String },
    Invite { code: String },
    Membership { group: String, user: String },
    GroupModeration { id: String },
    Recipes {},
    Recipe { id: String },
    RecipeSearch {},
    RecipeModeration { id: String },
}

impl Context {
    pub fn auth() -> Context {
        Context::Auth {}
    }

    pub fn body() -> Context {
        Context::Body {}
    }

    pub fn register(email: String) -> Context {
        Context::Register { email }
    }

    pub fn login(email: String) -> Context {
        Context::Login { email }
    }

    pub fn profile(user: String) -> Context {
        Context::Profile { user }
    }

    pub fn users() -> Context {
        Context::Users {}
    }

    pub fn user(id: String) -> Context {
        Context::User { id }
    }

    pub fn groups() -> Context {
        Context::Groups {}
    }

    pub fn group(id: String) -> Context {
        Context::Group { id }
    }

    pub fn group_search(query: String) -> Context {
        Context::GroupSearch { query }
    }

    pub fn invite(code: String) -> Context {
        Context::Invite { code }
    }

    pub fn membership(group: String, user: String) -> Context {
        Context::Membership { group, user }
    }

    pub fn group_moderation(id: String) -> Context {
        Context::GroupModeration { id }
    }

    pub fn recipes() -> Context {
        Context::Recipes {}
    }

    pub fn recipe(id: String) -> Context {
        Context::Recipe { id }
    }

    pub fn recipe_search() -> Context {
        Context::RecipeSearch {}
    }

    pub fn recipe_moderation(id: String) -> Context {
        Context::RecipeModeration { id }
    }
}
