use sqlx::sqlite::{SqliteConnection, SqlitePool};

use super::{bump_counters, fetch_submenu, new_id};
use crate::data::{Dish, DishCreate, DishUpdate};
use crate::error::{Entity, RepoError, Result};

async fn ensure_unique_title(
    conn: &mut SqliteConnection,
    submenu_id: &str,
    title: &str,
    except: Option<&str>,
) -> Result<()> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM dish WHERE submenu_id = ? AND title = ? AND id IS NOT ?",
    )
    .bind(submenu_id)
    .bind(title)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(RepoError::Conflict {
            entity: Entity::Dish,
            parent: Entity::Submenu,
        });
    }
    Ok(())
}

async fn fetch_dish(conn: &mut SqliteConnection, submenu_id: &str, dish_id: &str) -> Result<Dish> {
    sqlx::query_as::<_, Dish>(
        "SELECT id, submenu_id, title, description, price FROM dish WHERE id = ? AND submenu_id = ?",
    )
    .bind(dish_id)
    .bind(submenu_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound(Entity::Dish))
}

pub async fn create_dish(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
    new: &DishCreate,
) -> Result<Dish> {
    let mut tx = db_conn.begin().await?;
    fetch_submenu(&mut tx, menu_id, submenu_id).await?;
    ensure_unique_title(&mut tx, submenu_id, &new.title, None).await?;

    let dish = Dish {
        id: new_id(),
        submenu_id: submenu_id.to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        price: new.price,
    };
    sqlx::query(
        "INSERT INTO dish (id, submenu_id, title, description, price) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&dish.id)
    .bind(&dish.submenu_id)
    .bind(&dish.title)
    .bind(&dish.description)
    .bind(dish.price)
    .execute(&mut *tx)
    .await
    .map_err(|e| RepoError::from_write(e, Entity::Dish, Entity::Submenu))?;
    bump_counters(&mut tx, menu_id, Some(submenu_id), 0, 1).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, %submenu_id, dish_id = %dish.id, price = %dish.price, "dish created");
    Ok(dish)
}

pub async fn list_dishes(db_conn: &SqlitePool, menu_id: &str, submenu_id: &str) -> Result<Vec<Dish>> {
    let mut conn = db_conn.acquire().await?;
    fetch_submenu(&mut conn, menu_id, submenu_id).await?;

    let dishes = sqlx::query_as::<_, Dish>(
        "SELECT id, submenu_id, title, description, price FROM dish WHERE submenu_id = ? ORDER BY rowid",
    )
    .bind(submenu_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(dishes)
}

pub async fn get_dish(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
    dish_id: &str,
) -> Result<Dish> {
    let mut conn = db_conn.acquire().await?;
    fetch_submenu(&mut conn, menu_id, submenu_id).await?;
    fetch_dish(&mut conn, submenu_id, dish_id).await
}

pub async fn update_dish(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
    dish_id: &str,
    patch: &DishUpdate,
) -> Result<Dish> {
    let mut tx = db_conn.begin().await?;
    fetch_submenu(&mut tx, menu_id, submenu_id).await?;
    fetch_dish(&mut tx, submenu_id, dish_id).await?;
    if let Some(title) = &patch.title {
        ensure_unique_title(&mut tx, submenu_id, title, Some(dish_id)).await?;
    }

    sqlx::query(
        r#"
UPDATE dish
SET title = COALESCE(?, title),
    description = COALESCE(?, description),
    price = COALESCE(?, price)
WHERE id = ?"#,
    )
    .bind(patch.title.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.price)
    .bind(dish_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| RepoError::from_write(e, Entity::Dish, Entity::Submenu))?;

    let dish = fetch_dish(&mut tx, submenu_id, dish_id).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, %submenu_id, %dish_id, "dish updated");
    Ok(dish)
}

pub async fn delete_dish(
    db_conn: &SqlitePool,
    menu_id: &str,
    submenu_id: &str,
    dish_id: &str,
) -> Result<()> {
    let mut tx = db_conn.begin().await?;
    fetch_submenu(&mut tx, menu_id, submenu_id).await?;
    fetch_dish(&mut tx, submenu_id, dish_id).await?;

    sqlx::query("DELETE FROM dish WHERE id = ?")
        .bind(dish_id)
        .execute(&mut *tx)
        .await?;
    bump_counters(&mut tx, menu_id, Some(submenu_id), 0, -1).await?;
    tx.commit().await?;

    tracing::info!(%menu_id, %submenu_id, %dish_id, "dish deleted");
    Ok(())
}
