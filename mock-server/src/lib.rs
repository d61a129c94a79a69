use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const LINK_DOMAINS: &[&str] = &["s.ee", "see.kim"];
pub const TEXT_DOMAINS: &[&str] = &["s.ee", "txt.s.ee"];
pub const FILE_DOMAINS: &[&str] = &["fs.to"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub domain: String,
    pub slug: String,
    pub target_url: String,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Text {
    pub domain: String,
    pub slug: String,
    pub content: String,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_id: u64,
    pub filename: String,
    pub hash: String,
    pub size: u64,
}

#[derive(Default)]
pub struct Store {
    pub links: HashMap<(String, String), Link>,
    pub texts: HashMap<(String, String), Text>,
    pub files: HashMap<String, StoredFile>,
    next_file_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    db: Db,
}

#[derive(Deserialize)]
pub struct CreateLink {
    pub domain: String,
    pub target_url: String,
    pub custom_slug: Option<String>,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLink {
    pub domain: String,
    pub slug: String,
    pub target_url: String,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub title: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct CreateText {
    pub content: String,
    pub title: Option<String>,
    pub domain: Option<String>,
    pub custom_slug: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateText {
    pub domain: String,
    pub slug: String,
    pub content: String,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub title: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct Target {
    pub domain: String,
    pub slug: String,
}

pub fn app(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        db: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route(
            "/v1/shorten",
            post(create_link).put(update_link).delete(delete_link),
        )
        .route("/v1/domains", get(link_domains))
        .route("/v1/tags", get(tags))
        .route("/v1/text", post(create_text).put(update_text).delete(delete_text))
        .route("/v1/text/domains", get(text_domains))
        .route("/v1/file/upload", post(upload_file))
        .route("/v1/file/delete/{hash}", get(delete_file))
        .route("/v1/file/domains", get(file_domains))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock s.ee API listening");
    }
    axum::serve(listener, app(api_key)).await
}

fn success(data: Value) -> Response {
    Json(json!({ "code": 200, "message": "success", "data": data })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = json!({ "code": status.as_u16(), "message": message });
    (status, Json(body)).into_response()
}

fn new_slug() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|key| key == &*state.api_key);
    if !authorized {
        debug!(path = %request.uri().path(), "rejected request without a valid API key");
        return failure(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    next.run(request).await
}

// --- short URLs ---

async fn create_link(State(state): State<AppState>, Json(input): Json<CreateLink>) -> Response {
    if !LINK_DOMAINS.contains(&input.domain.as_str()) {
        return failure(StatusCode::BAD_REQUEST, "Invalid domain");
    }
    if !(input.target_url.starts_with("http://") || input.target_url.starts_with("https://")) {
        return failure(StatusCode::BAD_REQUEST, "Invalid target_url");
    }

    let mut db = state.db.write().await;
    let slug = input.custom_slug.clone().unwrap_or_else(new_slug);
    let key = (input.domain.clone(), slug.clone());
    if db.links.contains_key(&key) {
        return failure(StatusCode::CONFLICT, "Slug already exists");
    }
    db.links.insert(
        key,
        Link {
            domain: input.domain.clone(),
            slug: slug.clone(),
            target_url: input.target_url,
            title: input.title,
        },
    );
    success(json!({
        "slug": slug,
        "short_url": format!("https://{}/{slug}", input.domain),
        "custom_slug": input.custom_slug,
    }))
}

async fn update_link(State(state): State<AppState>, Json(input): Json<UpdateLink>) -> Response {
    let mut db = state.db.write().await;
    let Some(link) = db.links.get_mut(&(input.domain, input.slug)) else {
        return failure(StatusCode::NOT_FOUND, "Short URL not found");
    };
    link.target_url = input.target_url;
    if let Some(title) = input.title {
        link.title = title;
    }
    success(json!({}))
}

async fn delete_link(State(state): State<AppState>, Json(input): Json<Target>) -> Response {
    let mut db = state.db.write().await;
    match db.links.remove(&(input.domain, input.slug)) {
        Some(_) => success(json!({})),
        None => failure(StatusCode::NOT_FOUND, "Short URL not found"),
    }
}

async fn link_domains() -> Response {
    success(json!({ "domains": LINK_DOMAINS }))
}

async fn tags() -> Response {
    success(json!({ "tags": [{ "id": 1, "name": "work" }, { "id": 2, "name": "personal" }] }))
}

// --- text sharing ---

async fn create_text(State(state): State<AppState>, Json(input): Json<CreateText>) -> Response {
    if input.content.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Content is required");
    }
    let domain = input.domain.unwrap_or_else(|| TEXT_DOMAINS[0].to_string());
    if !TEXT_DOMAINS.contains(&domain.as_str()) {
        return failure(StatusCode::BAD_REQUEST, "Invalid domain");
    }

    let mut db = state.db.write().await;
    let slug = input.custom_slug.clone().unwrap_or_else(new_slug);
    let key = (domain.clone(), slug.clone());
    if db.texts.contains_key(&key) {
        return failure(StatusCode::CONFLICT, "Slug already exists");
    }
    db.texts.insert(
        key,
        Text {
            domain: domain.clone(),
            slug: slug.clone(),
            content: input.content,
            title: input.title,
        },
    );
    success(json!({
        "slug": slug,
        "short_url": format!("https://{domain}/{slug}"),
        "custom_slug": input.custom_slug,
    }))
}

async fn update_text(State(state): State<AppState>, Json(input): Json<UpdateText>) -> Response {
    let mut db = state.db.write().await;
    let Some(text) = db.texts.get_mut(&(input.domain, input.slug)) else {
        return failure(StatusCode::NOT_FOUND, "Text not found");
    };
    text.content = input.content;
    if let Some(title) = input.title {
        text.title = title;
    }
    success(json!({}))
}

async fn delete_text(State(state): State<AppState>, Json(input): Json<Target>) -> Response {
    let mut db = state.db.write().await;
    match db.texts.remove(&(input.domain, input.slug)) {
        Some(_) => success(json!({})),
        None => failure(StatusCode::NOT_FOUND, "Text not found"),
    }
}

async fn text_domains() -> Response {
    success(json!({ "domains": TEXT_DOMAINS }))
}

// --- file sharing ---

async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes.len() as u64)),
                    Err(_) => return failure(StatusCode::BAD_REQUEST, "Malformed multipart body"),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(_) => return failure(StatusCode::BAD_REQUEST, "Malformed multipart body"),
        }
    }
    let Some((filename, size)) = upload else {
        return failure(StatusCode::BAD_REQUEST, "File is required");
    };

    let mut db = state.db.write().await;
    db.next_file_id += 1;
    let file = StoredFile {
        file_id: db.next_file_id,
        filename,
        hash: Uuid::new_v4().simple().to_string(),
        size,
    };
    db.files.insert(file.hash.clone(), file.clone());

    let host = FILE_DOMAINS[0];
    success(json!({
        "file_id": file.file_id,
        "filename": file.filename,
        "hash": file.hash,
        "url": format!("https://{host}/{}/{}", file.hash, file.filename),
        "delete": format!("https://{host}/api/v1/file/delete/{}", file.hash),
        "page": format!("https://{host}/{}", file.hash),
        "size": file.size,
    }))
}

async fn delete_file(State(state): State<AppState>, Path(hash): Path<String>) -> Response {
    let mut db = state.db.write().await;
    match db.files.remove(&hash) {
        Some(_) => success(json!({})),
        None => failure(StatusCode::NOT_FOUND, "File not found"),
    }
}

async fn file_domains() -> Response {
    success(json!({ "domains": FILE_DOMAINS }))
}
