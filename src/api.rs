use std::collections::BTreeMap;

use rocket::data::{Data, ToByteUnit};
use rocket::http::{Header, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Responder, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::{
    AccountSummary, AdminView, AuthOutcome, LOGOUT_MESSAGE, Member, Role, SessionUser,
};
use crate::catalog::{EXPORT_FILENAME, Entity, EntityId, TableName, coerce_form};
use crate::error::AppError;
use crate::game_sessions::GameSession;
use crate::notify::{Notification, Notified};
use crate::query::{
    EntityDetail, QueryRequest, Scope, SearchResults, SortKey, TaggedEntity, search_title,
};
use crate::state::AppState;
use crate::validation::{
    AppErrorExt, JsonValidateExt, ToValidationResponse, ValidationError, ValidationResponse,
};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct CatalogResponse {
    pub title: String,
    pub items: Vec<TaggedEntity>,
}

#[derive(Serialize, Deserialize)]
pub struct SearchAccepted {
    pub generation: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: SessionUser,
    pub role: Role,
    pub is_admin: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ProtectedPageResponse {
    pub page: String,
    pub redirect: Option<String>,
    pub notification: Notification,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub active_sessions: usize,
    pub total_users: usize,
    pub total_items: usize,
    pub tables: BTreeMap<String, usize>,
}

#[derive(Responder)]
#[response(status = 200, content_type = "json")]
pub struct ExportFile {
    body: String,
    disposition: Header<'static>,
}

fn parse_table(raw: &str) -> Result<TableName, ValidationError> {
    raw.parse::<TableName>().map_err(|e| {
        Custom(
            Status::NotFound,
            Json(ValidationResponse::with_error("table", &e.to_string())),
        )
    })
}

fn parse_id(raw: &str) -> EntityId {
    let Ok(id) = raw.parse::<EntityId>();
    id
}

fn not_found(what: &str) -> ValidationError {
    AppError::NotFound(what.to_string()).to_validation_response()
}

/// Comma-separated table keys or slugs; empty means every browsable table.
fn parse_scope(tables: Option<&str>) -> Result<Scope, ValidationError> {
    let requested: Vec<&str> = tables
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    if requested.is_empty() {
        return Ok(Scope::All);
    }

    let tables = requested
        .into_iter()
        .map(parse_table)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Scope::Tables(tables))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/catalog?<tables>&<term>&<sort>")]
#[instrument(skip(state))]
pub async fn api_query_catalog(
    tables: Option<&str>,
    term: Option<&str>,
    sort: Option<&str>,
    state: &State<AppState>,
) -> Result<Json<CatalogResponse>, ValidationError> {
    let request = QueryRequest {
        scope: parse_scope(tables)?,
        term: term.unwrap_or_default().to_string(),
        sort: SortKey::parse_or_default(sort.unwrap_or_default()),
    };

    Ok(Json(CatalogResponse {
        title: search_title(&request),
        items: state.engine.query(&request),
    }))
}

#[get("/catalog/<table>/<id>")]
pub async fn api_entity_detail(
    table: &str,
    id: &str,
    state: &State<AppState>,
) -> Result<Json<EntityDetail>, ValidationError> {
    let table = parse_table(table)?;
    let id = parse_id(id);

    state
        .engine
        .detail(table, &id)
        .map(Json)
        .ok_or_else(|| not_found(&format!("{} {}", table.key(), id)))
}

#[post("/search", data = "<request>")]
pub fn api_submit_search(
    request: Json<QueryRequest>,
    state: &State<AppState>,
) -> Custom<Json<SearchAccepted>> {
    let generation = state.engine.submit(request.into_inner());
    Custom(Status::Accepted, Json(SearchAccepted { generation }))
}

#[get("/search/latest")]
pub fn api_latest_search(state: &State<AppState>) -> Result<Json<SearchResults>, Status> {
    state.engine.latest().map(Json).ok_or(Status::NoContent)
}

fn auth_notification(outcome: &AuthOutcome) -> Notification {
    if outcome.success {
        Notification::success(outcome.message.clone())
    } else {
        Notification::error(outcome.message.clone())
    }
}

#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegisterRequest>,
    state: &State<AppState>,
) -> Result<Json<Notified<AuthOutcome>>, ValidationError> {
    let validated = registration.validate_custom()?;

    let outcome = state
        .accounts
        .register(&validated.username, &validated.password)
        .await
        .validate_custom()?;

    let notification = auth_notification(&outcome);
    Ok(Json(Notified::new(outcome, notification)))
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    state: &State<AppState>,
) -> Result<Json<Notified<AuthOutcome>>, ValidationError> {
    let validated = login.validate_custom()?;

    let outcome = state
        .accounts
        .login(&validated.username, &validated.password)
        .await
        .validate_custom()?;

    let notification = auth_notification(&outcome);
    Ok(Json(Notified::new(outcome, notification)))
}

#[post("/logout")]
pub async fn api_logout(state: &State<AppState>) -> Result<Json<Notification>, ValidationError> {
    state.accounts.logout().await.validate_custom()?;
    Ok(Json(Notification::info(LOGOUT_MESSAGE)))
}

#[get("/me")]
pub async fn api_me(member: Member) -> Json<MeResponse> {
    let user = member.0;
    Json(MeResponse {
        role: user.role(),
        is_admin: crate::auth::is_admin(Some(&user)),
        user,
    })
}

#[get("/protected/<page>")]
pub fn api_protected_page(page: &str, member: Member) -> Json<ProtectedPageResponse> {
    let (message, redirect) = match page {
        "create-character" => ("Переход к созданию персонажа", None),
        "play" => ("Переход к игре", Some("/handbook.html")),
        "create-campaign" => ("Переход к созданию кампании", None),
        _ => ("Страница в разработке", None),
    };
    info!(user_id = member.0.id, page, "Protected page opened");

    Json(ProtectedPageResponse {
        page: page.to_string(),
        redirect: redirect.map(str::to_string),
        notification: Notification::info(message),
    })
}

#[get("/admin/stats")]
pub async fn api_admin_stats(
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<StatsResponse>, ValidationError> {
    let active_sessions = state.game_sessions.count().await.validate_custom()?;
    let total_users = state.accounts.accounts().await.validate_custom()?.len();
    let snapshot = state.catalog.snapshot();

    Ok(Json(StatsResponse {
        active_sessions,
        total_users,
        total_items: snapshot.total_items(),
        tables: snapshot.table_counts(),
    }))
}

#[get("/admin/users")]
pub async fn api_admin_users(
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Vec<AccountSummary>>, ValidationError> {
    let accounts = state.accounts.accounts().await.validate_custom()?;
    Ok(Json(accounts.iter().map(AccountSummary::from).collect()))
}

#[delete("/admin/users/<id>")]
pub async fn api_admin_delete_user(
    id: i64,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notification>, ValidationError> {
    if !state.accounts.delete_account(id).await.validate_custom()? {
        return Err(not_found(&format!("user {}", id)));
    }
    Ok(Json(Notification::success("Пользователь удален")))
}

#[post("/admin/users/clear-inactive")]
pub async fn api_admin_clear_inactive(
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notified<usize>>, ValidationError> {
    let removed = state.accounts.clear_inactive().await.validate_custom()?;
    let notification = Notification::success("Неактивные пользователи удалены");
    Ok(Json(Notified::new(removed, notification)))
}

#[get("/admin/sessions")]
pub async fn api_admin_sessions(
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Vec<GameSession>>, ValidationError> {
    Ok(Json(state.game_sessions.list().await.validate_custom()?))
}

#[delete("/admin/sessions/<id>")]
pub async fn api_admin_end_session(
    id: i64,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notification>, ValidationError> {
    if !state.game_sessions.end(id).await.validate_custom()? {
        return Err(not_found(&format!("game session {}", id)));
    }
    Ok(Json(Notification::success("Сессия завершена")))
}

#[get("/admin/tables/<table>")]
pub async fn api_admin_table(
    table: &str,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Vec<Entity>>, ValidationError> {
    let table = parse_table(table)?;
    Ok(Json(state.catalog.entities(table)))
}

#[post("/admin/tables/<table>", data = "<form>")]
pub async fn api_admin_add_entity(
    table: &str,
    form: Json<BTreeMap<String, String>>,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Custom<Json<Notified<Value>>>, ValidationError> {
    let table = parse_table(table)?;

    let id = state
        .catalog
        .add(table, coerce_form(form.into_inner()))
        .await
        .validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(Notified::new(
            id.to_value(),
            Notification::success("Элемент успешно добавлен"),
        )),
    ))
}

#[put("/admin/tables/<table>/<id>", data = "<form>")]
pub async fn api_admin_update_entity(
    table: &str,
    id: &str,
    form: Json<BTreeMap<String, String>>,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notification>, ValidationError> {
    let table = parse_table(table)?;
    let id = parse_id(id);

    let updated = state
        .catalog
        .update(table, &id, coerce_form(form.into_inner()))
        .await
        .validate_custom()?;

    if !updated {
        return Err(not_found(&format!("{} {}", table.key(), id)));
    }
    Ok(Json(Notification::success("Элемент успешно обновлен")))
}

#[delete("/admin/tables/<table>/<id>")]
pub async fn api_admin_delete_entity(
    table: &str,
    id: &str,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notification>, ValidationError> {
    let table = parse_table(table)?;
    let id = parse_id(id);

    if !state.catalog.delete(table, &id).await.validate_custom()? {
        return Err(not_found(&format!("{} {}", table.key(), id)));
    }
    Ok(Json(Notification::success("Элемент успешно удален")))
}

#[get("/admin/export")]
pub async fn api_admin_export(
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<ExportFile, ValidationError> {
    let body = state.catalog.export().validate_custom()?;

    Ok(ExportFile {
        body,
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
        ),
    })
}

#[post("/admin/import", data = "<data>")]
#[instrument(skip_all)]
pub async fn api_admin_import(
    data: Data<'_>,
    _admin: AdminView,
    state: &State<AppState>,
) -> Result<Json<Notified<usize>>, Custom<Json<Notification>>> {
    let reject = |error: AppError| {
        error.log_and_record("Catalog import");
        Custom(error.status_code(), Json(Notification::from(&error)))
    };

    let limit = state.config.import_limit_mib.mebibytes();
    let raw = data
        .open(limit)
        .into_string()
        .await
        .map_err(|e| reject(AppError::from(e)))?;

    if !raw.is_complete() {
        return Err(reject(AppError::Import(format!(
            "file exceeds {} MiB",
            state.config.import_limit_mib
        ))));
    }

    let items = state.catalog.import(&raw).await.map_err(reject)?;
    Ok(Json(Notified::new(
        items,
        Notification::success("База данных успешно импортирована"),
    )))
}
