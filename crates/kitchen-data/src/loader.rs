//! Resolution pipeline: finds data files, deserializes them, resolves names,
//! and builds the recipe catalog.
//!
//! A data directory holds `recipes.{ron,toml,json}` (required) and
//! `kitchen.{ron,toml,json}` (optional tuning). Exactly one format per base
//! name is allowed.

use crate::schema::RecipeBookData;
use kitchen_core::catalog::{CatalogBuilder, CatalogError, RecipeCatalog};
use kitchen_core::config::KitchenConfig;
use kitchen_core::id::IngredientId;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved recipes do not form a usable catalog.
    #[error("invalid recipe book {file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = &found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing.clone(),
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name, returning `UnresolvedRef` if it is unknown.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Record `name` in `seen`, or `DuplicateName` if it was already there.
pub fn check_duplicate(
    seen: &mut HashSet<String>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything a session needs from a data directory.
#[derive(Debug)]
pub struct GameData {
    pub catalog: RecipeCatalog,
    pub config: KitchenConfig,
}

/// Load a data directory: the recipe book plus optional tuning.
pub fn load_kitchen(dir: &Path) -> Result<GameData, DataLoadError> {
    let recipes_path = require_data_file(dir, "recipes")?;
    let catalog = load_catalog(&recipes_path)?;

    let config = match find_data_file(dir, "kitchen")? {
        Some(path) => deserialize_file(&path)?,
        None => KitchenConfig::default(),
    };

    Ok(GameData { catalog, config })
}

/// Deserialize one recipe book file and resolve it into a catalog.
pub fn load_catalog(path: &Path) -> Result<RecipeCatalog, DataLoadError> {
    let book: RecipeBookData = deserialize_file(path)?;
    build_catalog(&book, path)
}

fn build_catalog(book: &RecipeBookData, file: &Path) -> Result<RecipeCatalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    let mut ingredient_names = HashSet::new();
    let mut ingredients: HashMap<String, IngredientId> = HashMap::new();

    for name in &book.ingredients {
        check_duplicate(&mut ingredient_names, name, file)?;
        ingredients.insert(name.clone(), builder.register_ingredient(name));
    }

    let mut recipes = HashSet::new();
    for recipe in &book.recipes {
        check_duplicate(&mut recipes, &recipe.name, file)?;

        let ids = recipe
            .ingredients
            .iter()
            .map(|name| resolve_name(&ingredients, name, file, "ingredient").copied())
            .collect::<Result<Vec<_>, _>>()?;
        builder
            .register_recipe(&recipe.name, ids)
            .map_err(|source| DataLoadError::Catalog {
                file: file.to_path_buf(),
                source,
            })?;
    }

    builder.build().map_err(|source| DataLoadError::Catalog {
        file: file.to_path_buf(),
        source,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kitchen_core::fixed::secs;
    use std::fs;

    const RECIPES_RON: &str = r#"(
        ingredients: ["bread", "cooked_patty", "tomato_slice", "cabbage_slice"],
        recipes: [
            (name: "burger", ingredients: ["bread", "cooked_patty"]),
            (name: "salad", ingredients: ["tomato_slice", "cabbage_slice"]),
        ],
    )"#;

    fn data_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    // -----------------------------------------------------------------------
    // detect_format / discovery
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("recipes")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_cases() {
        let dir = data_dir(&[("recipes.toml", "")]);
        assert_eq!(
            find_data_file(dir.path(), "recipes").unwrap(),
            Some(dir.path().join("recipes.toml"))
        );
        assert_eq!(find_data_file(dir.path(), "kitchen").unwrap(), None);
    }

    #[test]
    fn conflicting_formats_rejected() {
        let dir = data_dir(&[("recipes.ron", RECIPES_RON), ("recipes.json", "{}")]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
    }

    #[test]
    fn missing_recipes_is_required() {
        let dir = data_dir(&[]);
        match load_kitchen(dir.path()) {
            Err(DataLoadError::MissingRequired { file, .. }) => assert_eq!(file, "recipes"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    #[test]
    fn loads_ron_recipes_with_default_config() {
        let dir = data_dir(&[("recipes.ron", RECIPES_RON)]);
        let data = load_kitchen(dir.path()).unwrap();
        assert_eq!(data.catalog.recipe_count(), 2);
        assert_eq!(data.catalog.ingredient_count(), 4);
        let burger = data.catalog.recipe_id("burger").unwrap();
        assert_eq!(data.catalog.get_recipe(burger).unwrap().ingredients.len(), 2);
        assert_eq!(data.config, KitchenConfig::default());
    }

    #[test]
    fn loads_toml_tuning() {
        let dir = data_dir(&[
            ("recipes.ron", RECIPES_RON),
            (
                "kitchen.toml",
                r#"
seed = 7
results_path = "out/results.txt"

[order_book]
spawn_interval = 2.5

[transport.waypoints]
exit = { x = 0.0, y = 0.0 }
idle = { x = 4.0, y = 0.0 }
pickup = { x = 4.0, y = 3.0 }
"#,
            ),
        ]);
        let data = load_kitchen(dir.path()).unwrap();
        assert_eq!(data.config.seed, 7);
        assert_eq!(data.config.order_book.capacity, 4);
        assert_eq!(
            data.config.order_book.spawn_interval,
            kitchen_core::fixed::f64_to_fixed64(2.5)
        );
        assert_eq!(data.config.clock.countdown, secs(3));
        assert!(data.config.transport.is_some_and(|t| t.waypoints.is_some()));
        assert_eq!(
            data.config.results_path,
            Some(PathBuf::from("out/results.txt"))
        );
    }

    #[test]
    fn loads_json_recipes() {
        let dir = data_dir(&[(
            "recipes.json",
            r#"{"ingredients": ["bread"], "recipes": [{"name": "toast", "ingredients": ["bread", "bread"]}]}"#,
        )]);
        let data = load_kitchen(dir.path()).unwrap();
        let toast = data.catalog.recipe_id("toast").unwrap();
        assert_eq!(data.catalog.get_recipe(toast).unwrap().ingredients.len(), 2);
    }

    #[test]
    fn unresolved_ingredient_reported() {
        let dir = data_dir(&[(
            "recipes.ron",
            r#"(ingredients: ["bread"], recipes: [(name: "burger", ingredients: ["bread", "patty"])])"#,
        )]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "ingredient", .. }) if name == "patty"
        ));
    }

    #[test]
    fn duplicate_names_reported() {
        let dir = data_dir(&[(
            "recipes.ron",
            r#"(ingredients: ["bread", "bread"], recipes: [(name: "toast", ingredients: ["bread"])])"#,
        )]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "bread"
        ));

        let dir = data_dir(&[(
            "recipes.ron",
            r#"(ingredients: ["bread"], recipes: [
                (name: "toast", ingredients: ["bread"]),
                (name: "toast", ingredients: ["bread", "bread"]),
            ])"#,
        )]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "toast"
        ));
    }

    #[test]
    fn check_duplicate_records_first_sighting() {
        let file = Path::new("recipes.ron");
        let mut seen = HashSet::new();
        assert!(check_duplicate(&mut seen, "bread", file).is_ok());
        assert!(check_duplicate(&mut seen, "tomato", file).is_ok());
        assert!(matches!(
            check_duplicate(&mut seen, "bread", file),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "bread"
        ));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn empty_book_is_a_catalog_error() {
        let dir = data_dir(&[("recipes.json", r#"{"ingredients": [], "recipes": []}"#)]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::Catalog {
                source: CatalogError::NoRecipes,
                ..
            })
        ));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = data_dir(&[("recipes.ron", "this is not valid RON {{{")]);
        let err = load_kitchen(dir.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
        assert!(err.to_string().contains("recipes.ron"));
    }

    #[test]
    fn bad_tuning_is_a_parse_error() {
        let dir = data_dir(&[
            ("recipes.ron", RECIPES_RON),
            ("kitchen.json", r#"{"clock": {"countdown": -3}}"#),
        ]);
        assert!(matches!(
            load_kitchen(dir.path()),
            Err(DataLoadError::Parse { .. })
        ));
    }
}
