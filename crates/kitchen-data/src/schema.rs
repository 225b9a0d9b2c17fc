//! Serde structs for the recipe book on disk.
//!
//! The same shape is used for every format. Ingredients are referenced by
//! name and resolved into typed ids by the loader.
//!
//! ```ron
//! (
//!     ingredients: ["bread", "cooked_patty"],
//!     recipes: [(name: "burger", ingredients: ["bread", "cooked_patty"])],
//! )
//! ```

use serde::Deserialize;

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    /// Ingredient names. Repeats are allowed and count toward the recipe's
    /// size.
    pub ingredients: Vec<String>,
}

/// Contents of `recipes.{ron,toml,json}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeBookData {
    pub ingredients: Vec<String>,
    pub recipes: Vec<RecipeData>,
}
