use actix_web::{
    error::InternalError, http::StatusCode, web, HttpRequest, HttpResponse, ResponseError,
};
use restaurant_menu::{
    config::Settings,
    data::{DishCreate, DishUpdate, MenuCreate, MenuUpdate, SubmenuCreate, SubmenuUpdate},
    db as db_api, RepoError,
};
use uuid::Uuid;

pub(super) struct ApiState {
    db_pool: sqlx::SqlitePool,
}

impl ApiState {
    pub(super) async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = db_api::open(settings).await?;
        Ok(Self { db_pool })
    }
}

#[derive(serde::Serialize)]
struct ErrJsonResp {
    detail: String,
}

#[derive(serde::Serialize)]
struct DeletedJsonResp {
    status: bool,
    message: String,
}

fn deleted(what: &str) -> HttpResponse {
    HttpResponse::Ok().json(DeletedJsonResp {
        status: true,
        message: format!("The {what} has been deleted"),
    })
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub(super) struct ApiError(#[from] RepoError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            RepoError::NotFound(_) => StatusCode::NOT_FOUND,
            RepoError::Conflict { .. } => StatusCode::CONFLICT,
            RepoError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match &self.0 {
            RepoError::Database(err) => {
                tracing::error!("database failure: {err}");
                "internal server error".to_string()
            }
            err => err.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrJsonResp { detail })
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

/// Malformed bodies and ids are rejected here, before any repository call.
fn unprocessable<E>(err: E, _req: &HttpRequest) -> actix_web::Error
where
    E: std::fmt::Display + std::fmt::Debug + 'static,
{
    let resp = HttpResponse::UnprocessableEntity().json(ErrJsonResp {
        detail: err.to_string(),
    });
    InternalError::from_response(err, resp).into()
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(unprocessable))
        .app_data(web::PathConfig::default().error_handler(unprocessable))
        .service(
            web::scope("/api/v1")
                .service(create_menu)
                .service(list_menus)
                .service(get_menu)
                .service(update_menu)
                .service(delete_menu)
                .service(create_submenu)
                .service(list_submenus)
                .service(get_submenu)
                .service(update_submenu)
                .service(delete_submenu)
                .service(create_dish)
                .service(list_dishes)
                .service(get_dish)
                .service(update_dish)
                .service(delete_dish),
        );
}

#[derive(serde::Deserialize)]
pub(super) struct MenuPath {
    menu_id: Uuid,
}

#[derive(serde::Deserialize)]
pub(super) struct SubmenuPath {
    menu_id: Uuid,
    submenu_id: Uuid,
}

#[derive(serde::Deserialize)]
pub(super) struct DishPath {
    menu_id: Uuid,
    submenu_id: Uuid,
    dish_id: Uuid,
}

#[actix_web::post("/menus")]
pub(super) async fn create_menu(
    data: web::Data<ApiState>,
    body: web::Json<MenuCreate>,
) -> ApiResult {
    let menu = db_api::create_menu(&data.db_pool, &body).await?;
    Ok(HttpResponse::Created().json(menu))
}

#[actix_web::get("/menus")]
pub(super) async fn list_menus(data: web::Data<ApiState>) -> ApiResult {
    let menus = db_api::list_menus(&data.db_pool).await?;
    Ok(HttpResponse::Ok().json(menus))
}

#[actix_web::get("/menus/{menu_id}")]
pub(super) async fn get_menu(data: web::Data<ApiState>, path: web::Path<MenuPath>) -> ApiResult {
    let menu = db_api::get_menu(&data.db_pool, &path.menu_id.to_string()).await?;
    Ok(HttpResponse::Ok().json(menu))
}

#[actix_web::patch("/menus/{menu_id}")]
pub(super) async fn update_menu(
    data: web::Data<ApiState>,
    path: web::Path<MenuPath>,
    body: web::Json<MenuUpdate>,
) -> ApiResult {
    let menu = db_api::update_menu(&data.db_pool, &path.menu_id.to_string(), &body).await?;
    Ok(HttpResponse::Ok().json(menu))
}

#[actix_web::delete("/menus/{menu_id}")]
pub(super) async fn delete_menu(data: web::Data<ApiState>, path: web::Path<MenuPath>) -> ApiResult {
    db_api::delete_menu(&data.db_pool, &path.menu_id.to_string()).await?;
    Ok(deleted("menu"))
}

#[actix_web::post("/menus/{menu_id}/submenus")]
pub(super) async fn create_submenu(
    data: web::Data<ApiState>,
    path: web::Path<MenuPath>,
    body: web::Json<SubmenuCreate>,
) -> ApiResult {
    let submenu = db_api::create_submenu(&data.db_pool, &path.menu_id.to_string(), &body).await?;
    Ok(HttpResponse::Created().json(submenu))
}

#[actix_web::get("/menus/{menu_id}/submenus")]
pub(super) async fn list_submenus(
    data: web::Data<ApiState>,
    path: web::Path<MenuPath>,
) -> ApiResult {
    let submenus = db_api::list_submenus(&data.db_pool, &path.menu_id.to_string()).await?;
    Ok(HttpResponse::Ok().json(submenus))
}

#[actix_web::get("/menus/{menu_id}/submenus/{submenu_id}")]
pub(super) async fn get_submenu(
    data: web::Data<ApiState>,
    path: web::Path<SubmenuPath>,
) -> ApiResult {
    let submenu = db_api::get_submenu(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(submenu))
}

#[actix_web::patch("/menus/{menu_id}/submenus/{submenu_id}")]
pub(super) async fn update_submenu(
    data: web::Data<ApiState>,
    path: web::Path<SubmenuPath>,
    body: web::Json<SubmenuUpdate>,
) -> ApiResult {
    let submenu = db_api::update_submenu(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
        &body,
    )
    .await?;
    Ok(HttpResponse::Ok().json(submenu))
}

#[actix_web::delete("/menus/{menu_id}/submenus/{submenu_id}")]
pub(super) async fn delete_submenu(
    data: web::Data<ApiState>,
    path: web::Path<SubmenuPath>,
) -> ApiResult {
    db_api::delete_submenu(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
    )
    .await?;
    Ok(deleted("submenu"))
}

#[actix_web::post("/menus/{menu_id}/submenus/{submenu_id}/dishes")]
pub(super) async fn create_dish(
    data: web::Data<ApiState>,
    path: web::Path<SubmenuPath>,
    body: web::Json<DishCreate>,
) -> ApiResult {
    let dish = db_api::create_dish(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
        &body,
    )
    .await?;
    Ok(HttpResponse::Created().json(dish))
}

#[actix_web::get("/menus/{menu_id}/submenus/{submenu_id}/dishes")]
pub(super) async fn list_dishes(
    data: web::Data<ApiState>,
    path: web::Path<SubmenuPath>,
) -> ApiResult {
    let dishes = db_api::list_dishes(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(dishes))
}

#[actix_web::get("/menus/{menu_id}/submenus/{submenu_id}/dishes/{dish_id}")]
pub(super) async fn get_dish(data: web::Data<ApiState>, path: web::Path<DishPath>) -> ApiResult {
    let dish = db_api::get_dish(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
        &path.dish_id.to_string(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(dish))
}

#[actix_web::patch("/menus/{menu_id}/submenus/{submenu_id}/dishes/{dish_id}")]
pub(super) async fn update_dish(
    data: web::Data<ApiState>,
    path: web::Path<DishPath>,
    body: web::Json<DishUpdate>,
) -> ApiResult {
    let dish = db_api::update_dish(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
        &path.dish_id.to_string(),
        &body,
    )
    .await?;
    Ok(HttpResponse::Ok().json(dish))
}

#[actix_web::delete("/menus/{menu_id}/submenus/{submenu_id}/dishes/{dish_id}")]
pub(super) async fn delete_dish(data: web::Data<ApiState>, path: web::Path<DishPath>) -> ApiResult {
    db_api::delete_dish(
        &data.db_pool,
        &path.menu_id.to_string(),
        &path.submenu_id.to_string(),
        &path.dish_id.to_string(),
    )
    .await?;
    Ok(deleted("dish"))
}
