//! Repository over the SQLite store.
//!
//! Every function takes the pool and runs as one unit: mutations open a
//! transaction, reads borrow a pooled connection for the length of the call.
//! The derived counters on `menu` and `submenu` are only ever changed through
//! [`bump_counters`], inside the same transaction as the rows they count.

use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};

use crate::config::Settings;
use crate::data::{Menu, Submenu};
use crate::error::{Entity, RepoError, Result};

mod dish;
mod menu;
mod submenu;

pub use dish::{create_dish, delete_dish, get_dish, list_dishes, update_dish};
pub use menu::{create_menu, delete_menu, get_menu, list_menus, update_menu};
pub use submenu::{create_submenu, delete_submenu, get_submenu, list_submenus, update_submenu};

const SCHEMA: [&str; 5] = [
    r#"
CREATE TABLE IF NOT EXISTS menu (
    id             TEXT PRIMARY KEY NOT NULL,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    submenus_count INTEGER NOT NULL DEFAULT 0,
    dishes_count   INTEGER NOT NULL DEFAULT 0
)"#,
    r#"
CREATE TABLE IF NOT EXISTS submenu (
    id           TEXT PRIMARY KEY NOT NULL,
    menu_id      TEXT NOT NULL REFERENCES menu (id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    dishes_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE (menu_id, title)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS dish (
    id          TEXT PRIMARY KEY NOT NULL,
    submenu_id  TEXT NOT NULL REFERENCES submenu (id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    price       TEXT NOT NULL,
    UNIQUE (submenu_id, title)
)"#,
    "CREATE INDEX IF NOT EXISTS submenu_menu_id ON submenu (menu_id)",
    "CREATE INDEX IF NOT EXISTS dish_submenu_id ON dish (submenu_id)",
];

pub async fn connect(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.database_url)
        .with_context(|| format!("invalid database url {}", settings.database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    // each in-memory connection is its own database, keep exactly one alive
    if settings.database_url.contains(":memory:") {
        pool = pool
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool
        .connect_with(options)
        .await
        .with_context(|| format!("fail to open database {}", settings.database_url))?;
    Ok(pool)
}

pub async fn migrate(db_conn: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(db_conn)
            .await
            .context("fail to apply database schema")?;
    }
    Ok(())
}

/// Connect and make sure the schema exists.
pub async fn open(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let pool = connect(settings).await?;
    migrate(&pool).await?;
    tracing::info!(url = %settings.database_url, "database ready");
    Ok(pool)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The single place the derived counters change.
///
/// `submenus` and `dishes` are deltas for the menu, `dishes` is applied to
/// the submenu too when one is given.
pub(crate) async fn bump_counters(
    conn: &mut SqliteConnection,
    menu_id: &str,
    submenu_id: Option<&str>,
    submenus: i64,
    dishes: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE menu SET submenus_count = submenus_count + ?, dishes_count = dishes_count + ? WHERE id = ?",
    )
    .bind(submenus)
    .bind(dishes)
    .bind(menu_id)
    .execute(&mut *conn)
    .await?;

    if let Some(submenu_id) = submenu_id {
        sqlx::query("UPDATE submenu SET dishes_count = dishes_count + ? WHERE id = ?")
            .bind(dishes)
            .bind(submenu_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn fetch_menu(conn: &mut SqliteConnection, menu_id: &str) -> Result<Menu> {
    sqlx::query_as::<_, Menu>(
        "SELECT id, title, description, submenus_count, dishes_count FROM menu WHERE id = ?",
    )
    .bind(menu_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound(Entity::Menu))
}

/// Look a submenu up through its menu, failing on whichever level is missing.
pub(crate) async fn fetch_submenu(
    conn: &mut SqliteConnection,
    menu_id: &str,
    submenu_id: &str,
) -> Result<Submenu> {
    fetch_menu(conn, menu_id).await?;
    sqlx::query_as::<_, Submenu>(
        "SELECT id, menu_id, title, description, dishes_count FROM submenu WHERE id = ? AND menu_id = ?",
    )
    .bind(submenu_id)
    .bind(menu_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound(Entity::Submenu))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    open(&Settings::in_memory()).await.unwrap()
}
