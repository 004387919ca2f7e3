use std::collections::HashMap;

use sqlx::sqlite::{SqliteConnection, SqlitePool};

use super::{fetch_menu, new_id};
use crate::data::{
    Dish, Menu, MenuCreate, MenuDetail, MenuOverview, MenuUpdate, Submenu, SubmenuBrief,
    SubmenuDetail,
};
use crate::error::{Entity, RepoError, Result};

pub async fn create_menu(db_conn: &SqlitePool, new: &MenuCreate) -> Result<Menu> {
    let menu = Menu {
        id: new_id(),
        title: new.title.clone(),
        description: new.description.clone(),
        submenus_count: 0,
        dishes_count: 0,
    };

    sqlx::query("INSERT INTO menu (id, title, description) VALUES (?, ?, ?)")
        .bind(&menu.id)
        .bind(&menu.title)
        .bind(&menu.description)
        .execute(db_conn)
        .await?;

    tracing::info!(menu_id = %menu.id, title = %menu.title, "menu created");
    Ok(menu)
}

/// Every menu with the brief form of its direct submenus. Counters are read
/// as stored.
pub async fn list_menus(db_conn: &SqlitePool) -> Result<Vec<MenuOverview>> {
    let mut conn = db_conn.acquire().await?;

    let menus = sqlx::query_as::<_, Menu>(
        "SELECT id, title, description, submenus_count, dishes_count FROM menu ORDER BY rowid",
    )
    .fetch_all(&mut *conn)
    .await?;

    let submenus = sqlx::query_as::<_, SubmenuBrief>(
        "SELECT id, menu_id, title, description FROM submenu ORDER BY rowid",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut by_menu: HashMap<String, Vec<SubmenuBrief>> = HashMap::new();
    for submenu in submenus {
        by_menu
            .entry(submenu.menu_id.clone())
            .or_default()
            .push(submenu);
    }

    Ok(menus
        .into_iter()
        .map(|menu| MenuOverview {
            submenus: by_menu.remove(&menu.id).unwrap_or_default(),
            menu,
        })
        .collect())
}

/// The menu with every submenu and dish under it, in two queries.
pub async fn get_menu(db_conn: &SqlitePool, menu_id: &str) -> Result<MenuDetail> {
    let mut conn = db_conn.acquire().await?;
    let menu = fetch_menu(&mut conn, menu_id).await?;
    let submenus = load_submenu_details(&mut conn, menu_id, None).await?;
    Ok(MenuDetail { menu, submenus })
}

pub async fn update_menu(db_conn: &SqlitePool, menu_id: &str, patch: &MenuUpdate) -> Result<Menu> {
    let mut tx = db_conn.begin().await?;
    fetch_menu(&mut tx, menu_id).await?;

    sqlx::query(
        "UPDATE menu SET title = COALESCE(?, title), description = COALESCE(?, description) WHERE id = ?",
    )
    .bind(patch.title.as_deref())
    .bind(patch.description.as_deref())
    .bind(menu_id)
    .execute(&mut *tx)
    .await?;

    let menu = fetch_menu(&mut tx, menu_id).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, "menu updated");
    Ok(menu)
}

/// Delete the menu with all of its submenus and their dishes.
pub async fn delete_menu(db_conn: &SqlitePool, menu_id: &str) -> Result<()> {
    let mut tx = db_conn.begin().await?;
    fetch_menu(&mut tx, menu_id).await?;

    let dishes = sqlx::query(
        "DELETE FROM dish WHERE submenu_id IN (SELECT id FROM submenu WHERE menu_id = ?)",
    )
    .bind(menu_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    let submenus = sqlx::query("DELETE FROM submenu WHERE menu_id = ?")
        .bind(menu_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted = sqlx::query("DELETE FROM menu WHERE id = ?")
        .bind(menu_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(RepoError::NotFound(Entity::Menu));
    }
    tx.commit().await?;

    tracing::info!(%menu_id, submenus, dishes, "menu deleted");
    Ok(())
}

/// Submenus of a menu with their dishes, optionally narrowed to one submenu.
/// Dishes come from a single join query and are grouped here.
pub(super) async fn load_submenu_details(
    conn: &mut SqliteConnection,
    menu_id: &str,
    submenu_id: Option<&str>,
) -> Result<Vec<SubmenuDetail>> {
    let submenus = sqlx::query_as::<_, Submenu>(
        r#"
SELECT id, menu_id, title, description, dishes_count
FROM submenu
WHERE menu_id = ? AND (? IS NULL OR id = ?)
ORDER BY rowid"#,
    )
    .bind(menu_id)
    .bind(submenu_id)
    .bind(submenu_id)
    .fetch_all(&mut *conn)
    .await?;

    let dishes = sqlx::query_as::<_, Dish>(
        r#"
SELECT d.id, d.submenu_id, d.title, d.description, d.price
FROM dish d
JOIN submenu s ON s.id = d.submenu_id
WHERE s.menu_id = ? AND (? IS NULL OR s.id = ?)
ORDER BY d.rowid"#,
    )
    .bind(menu_id)
    .bind(submenu_id)
    .bind(submenu_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_submenu: HashMap<String, Vec<Dish>> = HashMap::new();
    for dish in dishes {
        by_submenu
            .entry(dish.submenu_id.clone())
            .or_default()
            .push(dish);
    }

    Ok(submenus
        .into_iter()
        .map(|submenu| SubmenuDetail {
            dishes: by_submenu.remove(&submenu.id).unwrap_or_default(),
            submenu,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_menu(title: &str) -> MenuCreate {
        MenuCreate {
            title: title.to_string(),
            description: format!("{title} description"),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_menu() {
        let db = test_pool().await;

        let created = create_menu(&db, &new_menu("Lunch")).await.unwrap();
        assert_eq!(created.submenus_count, 0);
        assert_eq!(created.dishes_count, 0);
        assert!(uuid::Uuid::parse_str(&created.id).is_ok());

        let detail = get_menu(&db, &created.id).await.unwrap();
        assert_eq!(detail.menu, created);
        assert!(detail.submenus.is_empty());
    }

    #[tokio::test]
    async fn test_update_menu_only_touches_given_fields() {
        let db = test_pool().await;
        let created = create_menu(&db, &new_menu("Lunch")).await.unwrap();

        let patch = MenuUpdate {
            title: Some("Dinner".to_string()),
            description: None,
        };
        let updated = update_menu(&db, &created.id, &patch).await.unwrap();
        assert_eq!(updated.title, "Dinner");
        assert_eq!(updated.description, "Lunch description");

        let err = update_menu(&db, "missing", &patch).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_menus_keeps_creation_order() {
        let db = test_pool().await;
        let first = create_menu(&db, &new_menu("Breakfast")).await.unwrap();
        let second = create_menu(&db, &new_menu("Supper")).await.unwrap();

        let all = list_menus(&db).await.unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.menu.id.as_str()).collect();
        assert_eq!(ids, [first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_delete_missing_menu_is_not_found() {
        let db = test_pool().await;
        let created = create_menu(&db, &new_menu("Lunch")).await.unwrap();

        delete_menu(&db, &created.id).await.unwrap();
        let err = delete_menu(&db, &created.id).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(Entity::Menu)));
        assert!(get_menu(&db, &created.id).await.unwrap_err().is_not_found());
    }
}
