use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::moderation::Moderation;
use crate::normalization::normalize_name;
use crate::times::Times;
use crate::user::UserRole;

pub const DEFAULT_RECIPE_IMAGE: &str = "/img/default-recipe.jpg";

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Rank used for difficulty-based sorting.
    pub fn rank(self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            _ => Err(BackendError::validation(
                "The difficulty must be Easy, Medium or Hard",
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
    Drink,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Dessert => "Dessert",
            Category::Snack => "Snack",
            Category::Drink => "Drink",
            Category::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Breakfast" => Ok(Category::Breakfast),
            "Lunch" => Ok(Category::Lunch),
            "Dinner" => Ok(Category::Dinner),
            "Dessert" => Ok(Category::Dessert),
            "Snack" => Ok(Category::Snack),
            "Drink" => Ok(Category::Drink),
            "Other" => Ok(Category::Other),
            _ => Err(BackendError::validation("The category must be valid")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Step {
    pub number: u32,
    pub description: String,
}

/// A recipe document. The ingredient/step/tag collections are embedded
/// value types; `author` never changes after creation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub tags: Vec<String>,
    pub image: String,
    pub author: Uuid,
    pub group: Option<Uuid>,
    pub is_private: bool,
    #[serde(flatten)]
    pub moderation: Moderation,
    pub rating: f64,
    pub rating_count: i32,
    #[serde(flatten)]
    pub times: Times,
}

impl Recipe {
    pub fn create(
        details: RecipeDetails,
        author: Uuid,
        author_role: UserRole,
        now: OffsetDateTime,
    ) -> Self {
        Recipe {
            id: Uuid::new_v4(),
            title: normalize_name(&details.title),
            description: details.description.trim().to_owned(),
            ingredients: details.ingredients,
            steps: details.steps,
            prep_time: details.prep_time,
            cook_time: details.cook_time,
            servings: details.servings,
            difficulty: details.difficulty,
            category: details.category,
            tags: details.tags.unwrap_or_default(),
            image: details
                .image
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_RECIPE_IMAGE.to_owned()),
            author,
            group: details.group,
            is_private: details.is_private.unwrap_or(false),
            moderation: Moderation::for_creator(author, author_role, now),
            rating: 0.0,
            rating_count: 0,
            times: Times::created(now),
        }
    }

    /// Full replacement of the editable fields, as the update endpoint
    /// requires a complete payload. An edit by a non-administrator sends
    /// the recipe back through moderation.
    pub fn apply_update(
        &mut self,
        details: RecipeDetails,
        editor_is_admin: bool,
        now: OffsetDateTime,
    ) {
        self.title = normalize_name(&details.title);
        self.description = details.description.trim().to_owned();
        self.ingredients = details.ingredients;
        self.steps = details.steps;
        self.prep_time = details.prep_time;
        self.cook_time = details.cook_time;
        self.servings = details.servings;
        self.difficulty = details.difficulty;
        self.category = details.category;
        if let Some(tags) = details.tags {
            self.tags = tags;
        }
        if let Some(image) = details.image.filter(|i| !i.is_empty()) {
            self.image = image;
        }
        self.group = details.group;
        if let Some(is_private) = details.is_private {
            self.is_private = is_private;
        }

        if !editor_is_admin {
            self.moderation.reset();
        }
        self.times.touch(now);
    }
}

/// The full payload required to create or replace a recipe.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetails {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub difficulty: Difficulty,
    pub category: Category,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub group: Option<Uuid>,
    pub is_private: Option<bool>,
}

impl RecipeDetails {
    pub fn validate(&self) -> Result<(), BackendError> {
        let title = normalize_name(&self.title).chars().count();
        if title < 3 || title > 100 {
            return Err(BackendError::validation(
                "The title must be between 3 and 100 characters",
            ));
        }

        let description = self.description.trim().chars().count();
        if description < 10 || description > 500 {
            return Err(BackendError::validation(
                "The description must be between 10 and 500 characters",
            ));
        }

        if self.ingredients.is_empty() {
            return Err(BackendError::validation(
                "At least one ingredient is required",
            ));
        }
        if self
            .ingredients
            .iter()
            .any(|i| i.name.trim().is_empty() || i.quantity.trim().is_empty())
        {
            return Err(BackendError::validation(
                "Every ingredient needs a name and a quantity",
            ));
        }

        if self.steps.is_empty() {
            return Err(BackendError::validation("At least one step is required"));
        }
        if self.steps.iter().any(|s| s.description.trim().is_empty()) {
            return Err(BackendError::validation(
                "Every step needs a description",
            ));
        }

        if self.prep_time < 1 {
            return Err(BackendError::validation(
                "The preparation time must be at least 1 minute",
            ));
        }
        if self.cook_time < 0 {
            return Err(BackendError::validation(
                "The cooking time cannot be negative",
            ));
        }
        if self.servings < 1 {
            return Err(BackendError::validation("Servings must be at least 1"));
        }

        Ok(())
    }
}

/// Scores a recipe against a free-text query: the count of query tokens
/// that appear as case-insensitive substrings, weighted by where they
/// match (title 4, tags 2, description 1). Both storage backends share
/// this contract; ties fall back to recency.
pub fn relevance(recipe: &Recipe, query: &str) -> u32 {
    let title = recipe.title.to_lowercase();
    let description = recipe.description.to_lowercase();
    let tags: Vec<String> = recipe.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut score = 0;
    for token in query.to_lowercase().split_whitespace() {
        if title.contains(token) {
            score += 4;
        }
        if tags.iter().any(|t| t.contains(token)) {
            score += 2;
        }
        if description.contains(token) {
            score += 1;
        }
    }
    score
}

/// Whether the recipe matches the query at all, for pre-filtering.
pub fn matches_text(recipe: &Recipe, query: &str) -> bool {
    relevance(recipe, query) > 0
}
