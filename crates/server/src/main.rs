use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use server_api::{create_student, delete_student, list_students, update_student, ApiContext};
use shared::{
    domain::RollId,
    error::{ApiError, ErrorCode},
    protocol::{
        student_route, students_route, CreateStudentRequest, ListStudentsResponse,
        MutationResponse, UpdateStudentRequest,
    },
};
use storage::Storage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "student backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(students_route(), get(http_list_students))
        .route(student_route(), post(http_create_student))
        .route(
            "/student/:roll",
            put(http_update_student).delete(http_delete_student),
        )
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        warn!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_students(State(state): State<Arc<AppState>>) -> ApiResult<ListStudentsResponse> {
    let students = list_students(&state.api).await.map_err(api_error_response)?;
    Ok(Json(ListStudentsResponse {
        count: Some(students.len()),
        students,
    }))
}

async fn http_create_student(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), (StatusCode, Json<ApiError>)> {
    let created = create_student(&state.api, req)
        .await
        .map_err(api_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::ok("Student created", Some(created))),
    ))
}

async fn http_update_student(
    State(state): State<Arc<AppState>>,
    Path(roll): Path<String>,
    Json(req): Json<UpdateStudentRequest>,
) -> ApiResult<MutationResponse> {
    let updated = update_student(&state.api, &RollId(roll), req)
        .await
        .map_err(api_error_response)?;
    Ok(Json(MutationResponse::ok("Student updated", Some(updated))))
}

async fn http_delete_student(
    State(state): State<Arc<AppState>>,
    Path(roll): Path<String>,
) -> ApiResult<MutationResponse> {
    delete_student(&state.api, &RollId(roll))
        .await
        .map_err(api_error_response)?;
    Ok(Json(MutationResponse::ok("Student deleted", None)))
}

fn api_error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        Some(ErrorCode::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorCode::Conflict) => StatusCode::CONFLICT,
        Some(ErrorCode::Internal) | None => {
            error!(error = %err.error, "student backend internal error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
