pub mod error;

use crate::application::use_cases::auth::{LoginRequest, RegisterRequest};
use crate::application::{AuthUseCase, DatasetQueryUseCase, ReportUseCase, UploadUseCase};
use crate::domain::dataset::OwnerKey;
use crate::domain::error::AppError;
use crate::domain::user::User;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connection::health_check;
use crate::infrastructure::db::datasets::{DatasetRepository, DatasetStore};
use crate::infrastructure::db::users::UserRepository;
use crate::infrastructure::response::{is_csv_filename, sanitize_filename};
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{
    delete, dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer,
};
use error::ErrorBody;
use futures_util::StreamExt;
use serde_json::json;
use sqlx::SqlitePool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, warn};

type HandlerResult = std::result::Result<HttpResponse, AppError>;

pub struct HttpState {
    pub upload: UploadUseCase,
    pub datasets: DatasetQueryUseCase,
    pub reports: ReportUseCase,
    pub auth: AuthUseCase,
    pub pool: SqlitePool,
}

impl HttpState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        let store: Arc<dyn DatasetStore> = Arc::new(DatasetRepository::new(pool.clone()));
        let users = Arc::new(UserRepository::new(pool.clone()));

        Self {
            upload: UploadUseCase::new(store.clone(), config.retention.keep),
            datasets: DatasetQueryUseCase::new(store.clone()),
            reports: ReportUseCase::new(store, config.report.max_records),
            auth: AuthUseCase::new(users),
            pool,
        }
    }
}

/// Token key from an `Authorization: Token <key>` header.
///
/// `Ok(None)` when the header is absent or uses another scheme.
fn token_from_request(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid token header.".to_string()))?;

    let mut parts = value.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case("token") => {}
        _ => return Ok(None),
    }
    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key.to_string())),
        (None, _) => Err(AppError::Unauthorized(
            "Invalid token header. No credentials provided.".to_string(),
        )),
        (Some(_), Some(_)) => Err(AppError::Unauthorized(
            "Invalid token header. Token string should not contain spaces.".to_string(),
        )),
    }
}

/// The authenticated user, if the request carries a token
async fn current_user(state: &HttpState, req: &HttpRequest) -> Result<Option<User>, AppError> {
    match token_from_request(req)? {
        Some(token) => state.auth.authenticate(&token).await.map(Some),
        None => Ok(None),
    }
}

async fn current_owner(state: &HttpState, req: &HttpRequest) -> Result<OwnerKey, AppError> {
    let user = current_user(state, req).await?;
    Ok(OwnerKey::from_user_id(user.map(|u| u.id)))
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// First `file` field that carries a filename
async fn read_upload(mut payload: Multipart) -> Result<Option<UploadedFile>, AppError> {
    let mut found = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?;
        let disposition = field.content_disposition();
        let is_file = disposition.get_name() == Some("file");
        let filename = disposition.get_filename().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?;
            if is_file && found.is_none() {
                bytes.extend_from_slice(&chunk);
            }
        }

        if is_file && found.is_none() {
            if let Some(filename) = filename {
                found = Some(UploadedFile { filename, bytes });
            }
        }
    }

    Ok(found)
}

#[post("/upload/")]
async fn upload(data: web::Data<HttpState>, req: HttpRequest, payload: Multipart) -> HandlerResult {
    let owner = current_owner(&data, &req).await?;

    let Some(file) = read_upload(payload).await? else {
        return Ok(HttpResponse::BadRequest()
            .json(ErrorBody::new("No file provided. Please upload a CSV file.")));
    };

    if !is_csv_filename(&file.filename) {
        return Ok(HttpResponse::BadRequest()
            .json(ErrorBody::new("Invalid file type. Please upload a CSV file.")));
    }

    let filename = sanitize_filename(&file.filename);
    let detail = data.upload.execute(owner, &filename, &file.bytes).await?;
    Ok(HttpResponse::Created().json(detail))
}

#[get("/summary/{id}/")]
async fn summary(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let overview = data.datasets.overview(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(overview))
}

#[get("/data/{id}/")]
async fn dataset_data(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let detail = data.datasets.detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[get("/history/")]
async fn history(data: web::Data<HttpState>, req: HttpRequest) -> HandlerResult {
    let owner = current_owner(&data, &req).await?;
    let datasets = data.datasets.history(owner).await?;
    Ok(HttpResponse::Ok().json(datasets))
}

#[delete("/dataset/{id}/")]
async fn delete_dataset(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let removed = data.datasets.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Dataset \"{}\" deleted successfully", removed.filename)
    })))
}

#[get("/report/{id}/")]
async fn report(data: web::Data<HttpState>, path: web::Path<i64>) -> HandlerResult {
    let rendered = data.reports.execute(path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", rendered.filename),
        ))
        .body(rendered.bytes))
}

#[post("/auth/register/")]
async fn register(data: web::Data<HttpState>, body: web::Json<RegisterRequest>) -> HandlerResult {
    let session = data.auth.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(session))
}

#[post("/auth/login/")]
async fn login(data: web::Data<HttpState>, body: web::Json<LoginRequest>) -> HandlerResult {
    let session = data.auth.login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/auth/logout/")]
async fn logout(data: web::Data<HttpState>, req: HttpRequest) -> HandlerResult {
    let token = token_from_request(&req)?.ok_or_else(|| {
        AppError::Unauthorized("Authentication credentials were not provided.".to_string())
    })?;
    data.auth.authenticate(&token).await?;
    data.auth.logout(&token).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out" })))
}

#[get("/health/")]
async fn health(data: web::Data<HttpState>) -> HttpResponse {
    match health_check(&data.pool).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok" })),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable" }))
        }
    }
}

/// Malformed JSON bodies answer with the same `{"error": ...}` shape
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ErrorBody::new(message)),
        )
        .into()
    })
}

/// Register every API route under `/api`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .service(upload)
            .service(summary)
            .service(dataset_data)
            .service(history)
            .service(delete_dataset)
            .service(report)
            .service(register)
            .service(login)
            .service(logout)
            .service(health),
    );
}

pub fn start_server(state: web::Data<HttpState>, host: &str, port: u16) -> std::io::Result<Server> {
    let listener = TcpListener::bind((host, port))?;
    serve(state, listener)
}

/// Run the API on an already bound listener
pub fn serve(state: web::Data<HttpState>, listener: TcpListener) -> std::io::Result<Server> {
    let address = listener.local_addr()?;
    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .listen(listener)?
    .run();

    info!(%address, "HTTP server listening");
    Ok(server)
}
