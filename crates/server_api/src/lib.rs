use shared::{
    domain::{gpa_in_range, RollId, Student},
    error::ApiError,
    protocol::{CreateStudentRequest, UpdateStudentRequest},
};
use storage::{Storage, StudentFields};
use tracing::info;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_students(ctx: &ApiContext) -> Result<Vec<Student>, ApiError> {
    ctx.storage.list_students().await.map_err(internal)
}

pub async fn create_student(
    ctx: &ApiContext,
    request: CreateStudentRequest,
) -> Result<Student, ApiError> {
    let roll = RollId::new(request.roll.as_str().trim());
    if roll.as_str().is_empty() {
        return Err(ApiError::validation("Roll number is required"));
    }
    let fields = validated_fields(request.name, request.branch, request.gpa)?;

    let created = ctx
        .storage
        .insert_student(&roll, &fields)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::conflict(format!("Student with roll {roll} already exists")))?;
    info!(roll = %created.roll, "student created");
    Ok(created)
}

pub async fn update_student(
    ctx: &ApiContext,
    roll: &RollId,
    request: UpdateStudentRequest,
) -> Result<Student, ApiError> {
    let fields = validated_fields(request.name, request.branch, request.gpa)?;

    let updated = ctx
        .storage
        .update_student(roll, &fields)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(roll))?;
    info!(roll = %updated.roll, "student updated");
    Ok(updated)
}

pub async fn delete_student(ctx: &ApiContext, roll: &RollId) -> Result<(), ApiError> {
    let removed = ctx.storage.delete_student(roll).await.map_err(internal)?;
    if !removed {
        return Err(not_found(roll));
    }
    info!(%roll, "student deleted");
    Ok(())
}

fn validated_fields(
    name: String,
    branch: shared::domain::Branch,
    gpa: f64,
) -> Result<StudentFields, ApiError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if !gpa_in_range(gpa) {
        return Err(ApiError::validation("GPA must be between 0 and 10"));
    }
    Ok(StudentFields { name, branch, gpa })
}

fn not_found(roll: &RollId) -> ApiError {
    ApiError::not_found(format!("Student with roll {roll} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(err.to_string())
}
