//! Handlers for `/companies`: public signup plus read/update of the
//! caller's own company.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_core::validation::{non_blank, normalize_email};
use crm_db::models::company::{Company, CreateCompany, UpdateCompany};
use crm_db::repositories::CompanyRepo;
use serde::Serialize;
use validator::Validate;

use super::auth::{auth_response, AuthResponse};
use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::response::DataResponse;
use crate::state::AppState;

/// Signup response: the new company plus a session for its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub company: Company,
    #[serde(flatten)]
    pub auth: AuthResponse,
}

/// POST /api/v1/companies
///
/// Create a company and its owner account in one transaction.
pub async fn create_company(
    State(state): State<AppState>,
    Json(input): Json<CreateCompany>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_password_strength(&input.owner.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.owner.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let (company, owner) = CompanyRepo::create_with_owner(
        &state.pool,
        input.name.trim(),
        non_blank(input.domain.as_deref()),
        &normalize_email(&input.owner.email),
        &password_hash,
        input.owner.first_name.trim(),
        non_blank(input.owner.last_name.as_deref()),
    )
    .await?;

    tracing::info!(company_id = company.id, user_id = owner.id, "Company created");

    let auth = auth_response(&state, &owner)?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SignupResponse { company, auth },
        }),
    ))
}

/// GET /api/v1/companies/{id}
///
/// Other tenants' companies are reported as missing.
pub async fn get_company(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_own_company(&auth, id)?;

    let company = CompanyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id,
        }))?;

    Ok(Json(DataResponse { data: company }))
}

/// PUT /api/v1/companies/{id}
pub async fn update_company(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCompany>,
) -> AppResult<impl IntoResponse> {
    ensure_own_company(&owner, id)?;
    input.validate()?;

    let company = CompanyRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id,
        }))?;

    tracing::info!(company_id = id, user_id = owner.user_id, "Company updated");

    Ok(Json(DataResponse { data: company }))
}

fn ensure_own_company(auth: &AuthUser, id: DbId) -> AppResult<()> {
    if auth.company_id != id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id,
        }));
    }
    Ok(())
}
