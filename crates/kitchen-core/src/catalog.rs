//! Static recipe catalog: ingredient types and the recipes built from them.
//!
//! Built once at load through [`CatalogBuilder`] and frozen into an
//! immutable [`RecipeCatalog`]. The catalog has no behaviour beyond lookup
//! and uniform random draws.

use crate::id::{IngredientId, RecipeId};
use crate::rng::SimRng;
use std::collections::HashMap;

/// An ingredient type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientDef {
    pub name: String,
}

/// A recipe: a multiset of ingredients whose order does not matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDef {
    pub name: String,
    pub ingredients: Vec<IngredientId>,
}

/// Builder for an immutable [`RecipeCatalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ingredient type. Returns its ID; registering the same name
    /// twice returns the existing ID.
    pub fn register_ingredient(&mut self, name: &str) -> IngredientId {
        if let Some(id) = self.ingredient_name_to_id.get(name) {
            return *id;
        }
        let id = IngredientId(self.ingredients.len() as u32);
        self.ingredients.push(IngredientDef {
            name: name.to_string(),
        });
        self.ingredient_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a recipe. Fails on a duplicate recipe name.
    pub fn register_recipe(
        &mut self,
        name: &str,
        ingredients: Vec<IngredientId>,
    ) -> Result<RecipeId, CatalogError> {
        if self.recipe_name_to_id.contains_key(name) {
            return Err(CatalogError::DuplicateRecipe(name.to_string()));
        }
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            ingredients,
        });
        self.recipe_name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    /// Validate references and freeze the catalog.
    pub fn build(self) -> Result<RecipeCatalog, CatalogError> {
        if self.recipes.is_empty() {
            return Err(CatalogError::NoRecipes);
        }
        for recipe in &self.recipes {
            if recipe.ingredients.is_empty() {
                return Err(CatalogError::EmptyRecipe(recipe.name.clone()));
            }
            for ingredient in &recipe.ingredients {
                if ingredient.0 as usize >= self.ingredients.len() {
                    return Err(CatalogError::InvalidIngredientRef(*ingredient));
                }
            }
        }

        Ok(RecipeCatalog {
            ingredients: self.ingredients,
            ingredient_name_to_id: self.ingredient_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
        })
    }
}

/// Immutable catalog. Frozen after [`CatalogBuilder::build`].
#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl RecipeCatalog {
    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get_ingredient(&self, id: IngredientId) -> Option<&IngredientDef> {
        self.ingredients.get(id.0 as usize)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn ingredient_count(&self) -> usize {
        self.ingredients.len()
    }

    /// Recipe name for logs; `"?"` for an unknown id.
    pub fn recipe_name(&self, id: RecipeId) -> &str {
        self.get_recipe(id).map(|r| r.name.as_str()).unwrap_or("?")
    }

    /// Draw one recipe uniformly at random.
    pub fn draw(&self, rng: &mut SimRng) -> Option<RecipeId> {
        rng.next_index(self.recipes.len())
            .map(|i| RecipeId(i as u32))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no recipes")]
    NoRecipes,
    #[error("recipe '{0}' has no ingredients")]
    EmptyRecipe(String),
    #[error("duplicate recipe name: {0}")]
    DuplicateRecipe(String),
    #[error("invalid ingredient reference: {0:?}")]
    InvalidIngredientRef(IngredientId),
}
