//! Categories group transactions and budgets, e.g. "Groceries" or "Salary".

mod db;
mod domain;
mod endpoints;
pub mod icons;

pub use db::{
    create_category, create_category_table, delete_category, ensure_category_owned,
    find_category_by_name, get_category, list_categories, update_category,
};
pub use domain::{
    Category, CategoryId, CategoryName, CategoryPatch, Color, CreateCategoryRequest, IconName,
    NewCategory, UpdateCategoryRequest, name_key,
};
pub use endpoints::{
    CategoryState, create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    get_icons_endpoint, list_categories_endpoint, update_category_endpoint,
};
