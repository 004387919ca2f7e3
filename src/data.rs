use serde::{Deserialize, Serialize};

use crate::price::Price;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Menu {
    pub id: String,
    pub title: String,
    pub description: String,
    pub submenus_count: i64,
    pub dishes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Submenu {
    pub id: String,
    pub menu_id: String,
    pub title: String,
    pub description: String,
    pub dishes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Dish {
    pub id: String,
    pub submenu_id: String,
    pub title: String,
    pub description: String,
    pub price: Price,
}

/// Submenu as listed under its menu in the menu overview
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SubmenuBrief {
    pub id: String,
    #[serde(skip)]
    pub menu_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuOverview {
    #[serde(flatten)]
    pub menu: Menu,
    pub submenus: Vec<SubmenuBrief>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuDetail {
    #[serde(flatten)]
    pub menu: Menu,
    pub submenus: Vec<SubmenuDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmenuDetail {
    #[serde(flatten)]
    pub submenu: Submenu,
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuCreate {
    pub title: String,
    pub description: String,
}

/// Partial update, `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmenuCreate {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmenuUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DishCreate {
    pub title: String,
    pub description: String,
    pub price: Price,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DishUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
}
