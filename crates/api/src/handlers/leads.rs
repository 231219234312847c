//! Lead capture shared by the form-submission webhook and the third-party
//! `POST /leads` endpoint.

use crm_core::error::CoreError;
use crm_core::types::DbId;
use crm_core::validation::{is_valid_email, non_blank, normalize_email};
use crm_db::models::activity::CreateActivity;
use crm_db::models::deal::CreateDeal;
use crm_db::repositories::{ActivityRepo, DealRepo, PersonRepo, PipelineRepo};
use crm_db::DbPool;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

/// An inbound lead. `pipelineName` and `stageName` together place a new
/// deal for the lead; both or neither must be given.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadInput {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub pipeline_name: Option<String>,
    pub stage_name: Option<String>,
    pub deal_title: Option<String>,
    pub deal_value: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResult {
    pub person_id: DbId,
    /// `false` when the email matched an existing person.
    pub person_created: bool,
    pub deal_id: Option<DbId>,
    pub activity_id: DbId,
}

/// Create or reuse the person, optionally open a deal, and log an activity
/// of `activity_type`, all in one transaction.
pub(crate) async fn capture_lead(
    pool: &DbPool,
    company_id: DbId,
    input: &LeadInput,
    activity_type: &str,
    origin: &str,
) -> AppResult<LeadResult> {
    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid email address '{}'",
            input.email.trim()
        ))));
    }
    let placement = match (
        non_blank(input.pipeline_name.as_deref()),
        non_blank(input.stage_name.as_deref()),
    ) {
        (Some(pipeline), Some(stage)) => Some((pipeline, stage)),
        (None, None) => None,
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "pipelineName and stageName must be given together".into(),
            )))
        }
    };

    let mut tx = pool.begin().await?;

    let (person, person_created) = PersonRepo::find_or_create_by_email(
        &mut tx,
        company_id,
        &email,
        non_blank(input.first_name.as_deref()),
        non_blank(input.last_name.as_deref()),
        non_blank(input.phone.as_deref()),
    )
    .await?;

    let deal_id = match placement {
        Some((pipeline_name, stage_name)) => {
            let stage =
                PipelineRepo::find_stage_by_names(&mut tx, company_id, pipeline_name, stage_name)
                    .await?
                    .ok_or_else(|| {
                        AppError::Core(CoreError::Validation(format!(
                            "Stage '{stage_name}' not found in pipeline '{pipeline_name}'"
                        )))
                    })?;
            let title = non_blank(input.deal_title.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| default_deal_title(&person.first_name, input));
            let deal = CreateDeal {
                title,
                stage_id: stage.id,
                person_id: Some(person.id),
                value: input.deal_value,
                expected_close_date: None,
                probability: None,
                notes: input.message.clone(),
                assigned_to: None,
            };
            Some(DealRepo::insert(&mut tx, company_id, None, &deal).await?)
        }
        None => None,
    };

    let mut activity = CreateActivity::new(activity_type);
    activity.person_id = Some(person.id);
    activity.deal_id = deal_id;
    activity.subject = Some(format!("Lead from {origin}"));
    activity.body = input.message.clone();
    activity.metadata = Some(json!({
        "origin": origin,
        "source": non_blank(input.source.as_deref()),
        "companyName": non_blank(input.company_name.as_deref()),
        "personCreated": person_created,
    }));
    let activity = ActivityRepo::create(&mut tx, company_id, &activity).await?;

    tx.commit().await?;

    Ok(LeadResult {
        person_id: person.id,
        person_created,
        deal_id,
        activity_id: activity.id,
    })
}

fn default_deal_title(first_name: &str, input: &LeadInput) -> String {
    match non_blank(input.company_name.as_deref()) {
        Some(company) => format!("{first_name} ({company})"),
        None => format!("{first_name} lead"),
    }
}
