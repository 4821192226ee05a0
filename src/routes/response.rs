use serde::Serialize;

use crate::group::Group;
use crate::recipe::Recipe;
use crate::user::User;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse {
    Session {
        token: String,
        user: User,
    },
    #[serde(rename_all = "camelCase")]
    InviteLookup {
        #[serde(flatten)]
        group: Group,
        is_member: bool,
        has_pending_request: bool,
    },
    #[serde(rename_all = "camelCase")]
    RecipePage {
        recipes: Vec<Recipe>,
        total_recipes: i64,
        total_pages: i64,
        current_page: i64,
    },
    Message {
        message: String,
    },
}
