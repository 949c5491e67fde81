use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::AppState;
use super::errors::AppError;
use crate::db::{CourseChanges, Database};
use crate::models::{
    ContentDetail, Course, CourseOutline, Item, ItemBody, ItemKind, Module, ModuleForm, Subject,
};

/// Header naming the instructor a request acts for.
pub const USER_HEADER: &str = "x-user";

/// The instructor making the request, taken from the `X-User` header.
pub struct Instructor(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Instructor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Instructor(v.to_string()))
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_HEADER} header")))
    }
}

/// `Json` body whose rejections come back as JSON `AppError`s.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Path` parameters whose rejections come back as JSON `AppError`s.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

/// `Query` string whose rejections come back as JSON `AppError`s.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

// -- Request bodies --

#[derive(Deserialize)]
pub struct NewSubject {
    pub title: String,
    pub slug: Option<String>,
}

#[derive(Deserialize)]
pub struct NewCourse {
    /// Subject slug.
    pub subject: String,
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub overview: String,
}

#[derive(Deserialize)]
pub struct CoursePatch {
    pub subject: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub overview: Option<String>,
}

#[derive(Deserialize)]
pub struct NewModule {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<i64>,
}

#[derive(Deserialize)]
pub struct ModulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct NewContent {
    pub title: String,
    /// Text body, file path, image path, or video URL depending on the kind.
    pub value: String,
    pub order: Option<i64>,
}

#[derive(Deserialize)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub value: Option<String>,
}

#[derive(Deserialize)]
pub struct CatalogQuery {
    pub subject: Option<String>,
}

/// `{ "<id>": <order>, ... }` as posted by drag-and-drop reordering.
pub type OrderMap = BTreeMap<i64, i64>;

// -- Helpers --

fn subject_id_for(db: &Database, slug: &str) -> Result<i64, AppError> {
    db.get_subject_by_slug(slug)?
        .map(|s| s.id)
        .ok_or_else(|| AppError::NotFound(format!("subject not found: {slug}")))
}

fn owned_course(db: &Database, id: i64, owner: &str) -> Result<Course, AppError> {
    db.get_course_owned(id, owner)?
        .ok_or_else(|| AppError::NotFound(format!("course not found: {id}")))
}

fn owned_module(db: &Database, id: i64, owner: &str) -> Result<Module, AppError> {
    db.get_module_owned(id, owner)?
        .ok_or_else(|| AppError::NotFound(format!("module not found: {id}")))
}

fn moves(map: OrderMap) -> Vec<(i64, i64)> {
    map.into_iter().collect()
}

// -- Subjects --

pub async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, AppError> {
    let db = state.lock()?;
    Ok(Json(db.list_subjects()?))
}

pub async fn create_subject(
    State(state): State<AppState>,
    Instructor(_user): Instructor,
    ApiJson(body): ApiJson<NewSubject>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    let db = state.lock()?;
    let subject = db.create_subject(&body.title, body.slug.as_deref())?;
    Ok((StatusCode::CREATED, Json(subject)))
}

// -- Courses --

/// Public catalog, optionally narrowed to one subject.
pub async fn catalog(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CatalogQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let db = state.lock()?;
    let subject_id = match q.subject.as_deref() {
        Some(slug) => Some(subject_id_for(&db, slug)?),
        None => None,
    };
    Ok(Json(db.list_courses(None, subject_id)?))
}

pub async fn my_courses(
    State(state): State<AppState>,
    Instructor(user): Instructor,
) -> Result<Json<Vec<Course>>, AppError> {
    let db = state.lock()?;
    Ok(Json(db.list_courses(Some(&user), None)?))
}

pub async fn create_course(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiJson(body): ApiJson<NewCourse>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let db = state.lock()?;
    let subject_id = subject_id_for(&db, &body.subject)?;
    let course = db.insert_course(
        &user,
        subject_id,
        &body.title,
        body.slug.as_deref(),
        &body.overview,
    )?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CourseOutline>, AppError> {
    let db = state.lock()?;
    let outline = db
        .course_outline(id)?
        .ok_or_else(|| AppError::NotFound(format!("course not found: {id}")))?;
    Ok(Json(outline))
}

pub async fn update_course(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CoursePatch>,
) -> Result<Json<Course>, AppError> {
    let db = state.lock()?;
    owned_course(&db, id, &user)?;
    let subject_id = match body.subject.as_deref() {
        Some(slug) => Some(subject_id_for(&db, slug)?),
        None => None,
    };
    let changes = CourseChanges {
        subject_id,
        title: body.title.as_deref(),
        slug: body.slug.as_deref(),
        overview: body.overview.as_deref(),
    };
    Ok(Json(db.update_course(id, &changes)?))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let db = state.lock()?;
    owned_course(&db, id, &user)?;
    db.delete_course(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Modules --

pub async fn list_modules(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<Module>>, AppError> {
    let db = state.lock()?;
    db.get_course(id)?
        .ok_or_else(|| AppError::NotFound(format!("course not found: {id}")))?;
    Ok(Json(db.list_modules(id)?))
}

pub async fn create_module(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<NewModule>,
) -> Result<(StatusCode, Json<Module>), AppError> {
    let db = state.lock()?;
    owned_course(&db, id, &user)?;
    let module = db.add_module(id, &body.title, &body.description, body.order)?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// Formset-style bulk edit of a course's modules.
pub async fn save_modules(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(forms): ApiJson<Vec<ModuleForm>>,
) -> Result<Json<Vec<Module>>, AppError> {
    let db = state.lock()?;
    owned_course(&db, id, &user)?;
    Ok(Json(db.save_module_set(id, &forms)?))
}

pub async fn order_modules(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(orders): ApiJson<OrderMap>,
) -> Result<Json<Vec<Module>>, AppError> {
    let db = state.lock()?;
    owned_course(&db, id, &user)?;
    db.set_module_order(id, &moves(orders))?;
    Ok(Json(db.list_modules(id)?))
}

pub async fn update_module(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ModulePatch>,
) -> Result<Json<Module>, AppError> {
    let db = state.lock()?;
    owned_module(&db, id, &user)?;
    let module = db.update_module(id, body.title.as_deref(), body.description.as_deref())?;
    Ok(Json(module))
}

pub async fn delete_module(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let db = state.lock()?;
    owned_module(&db, id, &user)?;
    db.delete_module(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Contents --

pub async fn list_contents(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ContentDetail>>, AppError> {
    let db = state.lock()?;
    owned_module(&db, id, &user)?;
    Ok(Json(db.list_content_details(id)?))
}

pub async fn create_content(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath((id, kind)): ApiPath<(i64, String)>,
    ApiJson(body): ApiJson<NewContent>,
) -> Result<(StatusCode, Json<ContentDetail>), AppError> {
    let kind = ItemKind::from_str(&kind).map_err(AppError::Validation)?;
    let db = state.lock()?;
    owned_module(&db, id, &user)?;
    let detail = db.add_content(
        id,
        &user,
        &body.title,
        &ItemBody::new(kind, body.value),
        body.order,
    )?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn order_contents(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(orders): ApiJson<OrderMap>,
) -> Result<Json<Vec<ContentDetail>>, AppError> {
    let db = state.lock()?;
    owned_module(&db, id, &user)?;
    db.set_content_order(id, &moves(orders))?;
    Ok(Json(db.list_content_details(id)?))
}

pub async fn get_content(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ContentDetail>, AppError> {
    let db = state.lock()?;
    let content = db
        .get_content_owned(id, &user)?
        .ok_or_else(|| AppError::NotFound(format!("content not found: {id}")))?;
    Ok(Json(db.detail(content)?))
}

pub async fn update_content(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ContentPatch>,
) -> Result<Json<Item>, AppError> {
    let db = state.lock()?;
    let content = db
        .get_content_owned(id, &user)?
        .ok_or_else(|| AppError::NotFound(format!("content not found: {id}")))?;
    let kind = content.content_type;
    let new_body = body.value.map(|v| ItemBody::new(kind, v));
    let item = db.update_item(
        kind,
        content.object_id,
        body.title.as_deref(),
        new_body.as_ref(),
    )?;
    Ok(Json(item))
}

pub async fn delete_content(
    State(state): State<AppState>,
    Instructor(user): Instructor,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let db = state.lock()?;
    db.get_content_owned(id, &user)?
        .ok_or_else(|| AppError::NotFound(format!("content not found: {id}")))?;
    db.delete_content(id)?;
    Ok(StatusCode::NO_CONTENT)
}
