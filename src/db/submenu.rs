use sqlx::sqlite::{SqliteConnection, SqlitePool};

use super::menu::load_submenu_details;
use super::{bump_counters, fetch_menu, fetch_submenu, new_id};
use crate::data::{Submenu, SubmenuCreate, SubmenuDetail, SubmenuUpdate};
use crate::error::{Entity, RepoError, Result};

/// Fail with `Conflict` when another submenu of the menu already uses `title`.
async fn ensure_unique_title(
    conn: &mut SqliteConnection,
    menu_id: &str,
    title: &str,
    except: Option<&str>,
) -> Result<()> {
    // `id IS NOT NULL` holds for every row, so no exclusion when `except` is None
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM submenu WHERE menu_id = ? AND title = ? AND id IS NOT ?",
    )
    .bind(menu_id)
    .bind(title)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(RepoError::Conflict {
            entity: Entity::Submenu,
            parent: Entity::Menu,
        });
    }
    Ok(())
}

pub async fn create_submenu(
    db_conn: &SqlitePool,
    menu_id: &str,
    new: &SubmenuCreate,
) -> Result<Submenu> {
    let mut tx = db_conn.begin().await?;
    fetch_menu(&mut tx, menu_id).await?;
    ensure_unique_title(&mut tx, menu_id, &new.title, None).await?;

    let submenu = Submenu {
        id: new_id(),
        menu_id: menu_id.to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        dishes_count: 0,
    };
    sqlx::query("INSERT INTO submenu (id, menu_id, title, description) VALUES (?, ?, ?, ?)")
        .bind(&submenu.id)
        .bind(&submenu.menu_id)
        .bind(&submenu.title)
        .bind(&submenu.description)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::from_write(e, Entity::Submenu, Entity::Menu))?;
    bump_counters(&mut tx, menu_id, None, 1, 0).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, submenu_id = %submenu.id, title = %submenu.title, "submenu created");
    Ok(submenu)
}

pub async fn list_submenus(db_conn: &SqlitePool, menu_id: &str) -> Result<Vec<SubmenuDetail>> {
    let mut conn = db_conn.acquire().await?;
    fetch_menu(&mut conn, menu_id).await?;
    load_submenu_details(&mut conn, menu_id, None).await
}

pub async fn get_submenu(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
) -> Result<SubmenuDetail> {
    let mut conn = db_conn.acquire().await?;
    fetch_submenu(&mut conn, menu_id, submenu_id).await?;
    load_submenu_details(&mut conn, menu_id, Some(submenu_id))
        .await?
        .pop()
        .ok_or(RepoError::NotFound(Entity::Submenu))
}

pub async fn update_submenu(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
    patch: &SubmenuUpdate,
) -> Result<Submenu> {
    let mut tx = db_conn.begin().await?;
    fetch_submenu(&mut tx, menu_id, submenu_id).await?;
    if let Some(title) = &patch.title {
        ensure_unique_title(&mut tx, menu_id, title, Some(submenu_id)).await?;
    }

    sqlx::query(
        "UPDATE submenu SET title = COALESCE(?, title), description = COALESCE(?, description) WHERE id = ?",
    )
    .bind(patch.title.as_deref())
    .bind(patch.description.as_deref())
    .bind(submenu_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| RepoError::from_write(e, Entity::Submenu, Entity::Menu))?;

    let submenu = fetch_submenu(&mut tx, menu_id, submenu_id).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, %submenu_id, "submenu updated");
    Ok(submenu)
}

/// Delete the submenu and its dishes, taking both off the menu's counters.
pub async fn delete_submenu(db_conn: &SqlitePool, menu_id: &str, submenu_id: &str) -> Result<()> {
    let mut tx = db_conn.begin().await?;
    fetch_submenu(&mut tx, menu_id, submenu_id).await?;

    let dishes = sqlx::query("DELETE FROM dish WHERE submenu_id = ?")
        .bind(submenu_id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;
    // the submenu row goes away next, only its menu keeps the adjustment
    bump_counters(&mut tx, menu_id, Some(submenu_id), 0, -dishes).await?;

    sqlx::query("DELETE FROM submenu WHERE id = ?")
        .bind(submenu_id)
        .execute(&mut *tx)
        .await?;
    bump_counters(&mut tx, menu_id, None, -1, 0).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, %submenu_id, dishes, "submenu deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MenuCreate;
    use crate::db::{create_menu, get_menu, test_pool};

    fn new_submenu(title: &str) -> SubmenuCreate {
        SubmenuCreate {
            title: title.to_string(),
            description: "some description".to_string(),
        }
    }

    async fn seed_menu(db: &SqlitePool) -> String {
        let menu = MenuCreate {
            title: "Menu".to_string(),
            description: "Menu description".to_string(),
        };
        create_menu(db, &menu).await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_submenu_counts_on_menu() {
        let db = test_pool().await;
        let menu_id = seed_menu(&db).await;

        create_submenu(&db, &menu_id, &new_submenu("Drinks")).await.unwrap();
        create_submenu(&db, &menu_id, &new_submenu("Soups")).await.unwrap();

        let menu = get_menu(&db, &menu_id).await.unwrap();
        assert_eq!(menu.menu.submenus_count, 2);
        assert_eq!(menu.submenus.len(), 2);
    }

    #[tokio::test]
    async fn test_create_submenu_rejects_duplicate_title() {
        let db = test_pool().await;
        let menu_id = seed_menu(&db).await;
        create_submenu(&db, &menu_id, &new_submenu("Drinks")).await.unwrap();

        let err = create_submenu(&db, &menu_id, &new_submenu("Drinks"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // same title is fine under another menu
        let other = seed_menu(&db).await;
        create_submenu(&db, &other, &new_submenu("Drinks")).await.unwrap();

        let menu = get_menu(&db, &menu_id).await.unwrap();
        assert_eq!(menu.menu.submenus_count, 1);
    }

    #[tokio::test]
    async fn test_create_submenu_under_missing_menu() {
        let db = test_pool().await;
        let err = create_submenu(&db, "missing", &new_submenu("Drinks"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(Entity::Menu)));
    }

    #[tokio::test]
    async fn test_update_submenu_title_uniqueness() {
        let db = test_pool().await;
        let menu_id = seed_menu(&db).await;
        let drinks = create_submenu(&db, &menu_id, &new_submenu("Drinks")).await.unwrap();
        create_submenu(&db, &menu_id, &new_submenu("Soups")).await.unwrap();

        let rename = |title: &str| SubmenuUpdate {
            title: Some(title.to_string()),
            description: None,
        };

        let err = update_submenu(&db, &menu_id, &drinks.id, &rename("Soups"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let same = update_submenu(&db, &menu_id, &drinks.id, &rename("Drinks"))
            .await
            .unwrap();
        assert_eq!(same.title, "Drinks");

        let renamed = update_submenu(&db, &menu_id, &drinks.id, &rename("Beverages"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "Beverages");
        assert_eq!(renamed.description, "some description");
    }

    #[tokio::test]
    async fn test_submenu_is_scoped_to_its_menu() {
        let db = test_pool().await;
        let menu_id = seed_menu(&db).await;
        let other = seed_menu(&db).await;
        let drinks = create_submenu(&db, &menu_id, &new_submenu("Drinks")).await.unwrap();

        let err = get_submenu(&db, &other, &drinks.id).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(Entity::Submenu)));
        let err = delete_submenu(&db, &other, &drinks.id).await.unwrap_err();
        assert!(err.is_not_found());

        let found = get_submenu(&db, &menu_id, &drinks.id).await.unwrap();
        assert_eq!(found.submenu, drinks);
        assert!(found.dishes.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_submenu() {
        let db = test_pool().await;
        let menu_id = seed_menu(&db).await;
        let patch = SubmenuUpdate {
            title: Some("Drinks".to_string()),
            description: None,
        };

        let err = update_submenu(&db, &menu_id, "missing", &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(Entity::Submenu)));

        let err = update_submenu(&db, "missing", "missing", &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(Entity::Menu)));
    }

    #[tokio::test]
    async fn test_list_submenus_of_missing_menu() {
        let db = test_pool().await;
        let err = list_submenus(&db, "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
