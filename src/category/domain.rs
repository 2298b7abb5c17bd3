//! Category types and the rules for valid category fields.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    EntryType,
    category::icons,
    database_id::DatabaseId,
    validation::{FieldError, Validate, ValidationErrors, bounded_text},
};

/// The database ID of a category.
pub type CategoryId = DatabaseId;

static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid"));

static PASCAL_CASE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("icon pattern is valid"));

/// Colors given to categories that are created without one, e.g. during import.
pub const DEFAULT_COLORS: [&str; 10] = [
    "#EF4444", "#F97316", "#F59E0B", "#84CC16", "#10B981", "#06B6D4", "#3B82F6", "#6366F1",
    "#A855F7", "#EC4899",
];

/// The name of a category, 2 to 50 characters once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create and validate a category name.
    ///
    /// # Errors
    /// Returns an error if the trimmed name is empty or has the wrong length.
    pub fn new(name: &str) -> Result<Self, FieldError> {
        bounded_text(name, "Name", 2, 50).map(Self)
    }

    /// Create a category name without validation.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The case-folded form of the name that uniqueness and look-ups use.
    pub fn key(&self) -> String {
        name_key(&self.0)
    }
}

/// Fold `name` so that names differing only in case, including non-ASCII
/// letters, compare equal.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(String);

impl Color {
    /// Create and validate a color.
    ///
    /// # Errors
    /// Returns an error if `color` is not a `#` followed by six hex digits.
    pub fn new(color: &str) -> Result<Self, FieldError> {
        if COLOR_PATTERN.is_match(color) {
            Ok(Self(color.to_owned()))
        } else {
            Err(FieldError::new("Color must be a hex color such as #3B82F6"))
        }
    }

    /// Create a color without validation.
    pub fn new_unchecked(color: &str) -> Self {
        Self(color.to_owned())
    }

    /// Pick a default color for a category named `name`.
    ///
    /// The same name (ignoring case) always gets the same color.
    pub fn default_for(name: &CategoryName) -> Self {
        let seed = name
            .key()
            .bytes()
            .fold(0usize, |hash, byte| {
                hash.wrapping_mul(31).wrapping_add(byte as usize)
            });

        Self(DEFAULT_COLORS[seed % DEFAULT_COLORS.len()].to_owned())
    }
}

impl AsRef<str> for Color {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The name of an icon from the allowed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconName(String);

impl IconName {
    /// Create and validate an icon name.
    ///
    /// # Errors
    /// Returns an error if `name` is not PascalCase, or if it is but is not
    /// one of the allowed icons.
    pub fn new(name: &str) -> Result<Self, FieldError> {
        if !PASCAL_CASE_PATTERN.is_match(name) {
            return Err(FieldError::new(
                "Icon must be a PascalCase icon name such as ShoppingCart",
            ));
        }

        if !icons::is_allowed(name) {
            return Err(FieldError::new(format!("Icon {name} is not available")));
        }

        Ok(Self(name.to_owned()))
    }

    /// Create an icon name without validation.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The icon given to categories of `category_type` created without one.
    pub fn default_for(category_type: EntryType) -> Self {
        match category_type {
            EntryType::Income => Self("Wallet".to_owned()),
            EntryType::Expense => Self("Tag".to_owned()),
        }
    }
}

impl AsRef<str> for IconName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user-defined grouping of transactions, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name, unique per user ignoring case.
    pub name: CategoryName,
    /// Whether the category is for income or expenses.
    #[serde(rename = "type")]
    pub category_type: EntryType,
    /// The color shown for the category.
    pub color: Color,
    /// The icon shown for the category.
    pub icon: IconName,
}

/// The data for a category that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The display name.
    pub name: CategoryName,
    /// Whether the category is for income or expenses.
    pub category_type: EntryType,
    /// The color shown for the category.
    pub color: Color,
    /// The icon shown for the category.
    pub icon: IconName,
}

impl NewCategory {
    /// A category named `name` with the default color and icon.
    pub fn with_defaults(name: CategoryName, category_type: EntryType) -> Self {
        Self {
            color: Color::default_for(&name),
            icon: IconName::default_for(category_type),
            name,
            category_type,
        }
    }
}

/// A partial update to a category. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    /// The new name.
    pub name: Option<CategoryName>,
    /// The new type.
    pub category_type: Option<EntryType>,
    /// The new color.
    pub color: Option<Color>,
    /// The new icon.
    pub icon: Option<IconName>,
}

/// The raw create-category request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateCategoryRequest {
    /// The display name.
    pub name: String,
    /// `INCOME` or `EXPENSE`.
    #[serde(rename = "type")]
    pub category_type: String,
    /// A `#RRGGBB` color.
    pub color: String,
    /// An icon name from the allowed set.
    pub icon: String,
}

impl Validate for CreateCategoryRequest {
    type Output = NewCategory;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.check("name", CategoryName::new(&self.name));
        let category_type = errors.check("type", self.category_type.parse::<EntryType>());
        let color = errors.check("color", Color::new(&self.color));
        let icon = errors.check("icon", IconName::new(&self.icon));

        match (name, category_type, color, icon) {
            (Some(name), Some(category_type), Some(color), Some(icon)) if errors.is_empty() => {
                Ok(NewCategory {
                    name,
                    category_type,
                    color,
                    icon,
                })
            }
            _ => Err(errors),
        }
    }
}

/// The raw update-category request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCategoryRequest {
    /// The new display name.
    pub name: Option<String>,
    /// The new type.
    #[serde(rename = "type")]
    pub category_type: Option<String>,
    /// The new color.
    pub color: Option<String>,
    /// The new icon.
    pub icon: Option<String>,
}

impl Validate for UpdateCategoryRequest {
    type Output = CategoryPatch;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.check_optional("name", self.name, |name| CategoryName::new(&name));
        let category_type = errors.check_optional("type", self.category_type, |category_type| {
            category_type.parse::<EntryType>()
        });
        let color = errors.check_optional("color", self.color, |color| Color::new(&color));
        let icon = errors.check_optional("icon", self.icon, |icon| IconName::new(&icon));

        match (name, category_type, color, icon) {
            (Some(name), Some(category_type), Some(color), Some(icon)) if errors.is_empty() => {
                Ok(CategoryPatch {
                    name,
                    category_type,
                    color,
                    icon,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod field_tests {
    use crate::{
        EntryType,
        category::{
            domain::{CategoryName, Color, IconName},
            icons,
        },
    };

    #[test]
    fn color_requires_six_hex_digits() {
        assert!(Color::new("#a1B2c3").is_ok());
        assert!(Color::new("a1b2c3").is_err());
        assert!(Color::new("#abc").is_err());
        assert!(Color::new("#GGGGGG").is_err());
        assert!(Color::new("#a1b2c3 ").is_err());
    }

    #[test]
    fn icon_pattern_is_checked_before_membership() {
        let malformed = IconName::new("shopping-cart").unwrap_err();
        let unknown = IconName::new("Smiley").unwrap_err();

        assert!(malformed.0.contains("PascalCase"));
        assert!(unknown.0.contains("not available"));
    }

    #[test]
    fn default_color_is_deterministic_and_valid() {
        let first = Color::default_for(&CategoryName::new_unchecked("Subscriptions"));
        let second = Color::default_for(&CategoryName::new_unchecked("SUBSCRIPTIONS"));

        assert_eq!(first, second);
        assert!(Color::new(first.as_ref()).is_ok());
    }

    #[test]
    fn default_icons_are_allowed() {
        for category_type in [EntryType::Income, EntryType::Expense] {
            assert!(icons::is_allowed(IconName::default_for(category_type).as_ref()));
        }
    }
}

#[cfg(test)]
mod request_tests {
    use crate::{
        category::domain::{CategoryPatch, CreateCategoryRequest, UpdateCategoryRequest},
        validation::Validate,
    };

    fn valid_request() -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: "Groceries".to_owned(),
            category_type: "EXPENSE".to_owned(),
            color: "#10B981".to_owned(),
            icon: "ShoppingBasket".to_owned(),
        }
    }

    #[test]
    fn valid_create_request_passes() {
        let category = valid_request().validate().unwrap();

        assert_eq!(category.name.as_ref(), "Groceries");
    }

    #[test]
    fn unknown_icon_is_reported_on_icon_field() {
        let request = CreateCategoryRequest {
            icon: "Smiley".to_owned(),
            ..valid_request()
        };

        let errors = request.validate().unwrap_err();

        assert!(errors.has_field("icon"));
        assert_eq!(errors.violations().len(), 1);
    }

    #[test]
    fn every_bad_field_is_reported() {
        let errors = CreateCategoryRequest::default().validate().unwrap_err();

        for field in ["name", "type", "color", "icon"] {
            assert!(errors.has_field(field), "want violation for {field}");
        }
    }

    #[test]
    fn empty_update_is_valid() {
        let patch = UpdateCategoryRequest::default().validate().unwrap();

        assert_eq!(patch, CategoryPatch::default());
    }

    #[test]
    fn update_checks_present_fields() {
        let request = UpdateCategoryRequest {
            color: Some("red".to_owned()),
            ..Default::default()
        };

        let errors = request.validate().unwrap_err();

        assert!(errors.has_field("color"));
        assert!(!errors.has_field("name"));
    }
}
