//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! the pool (or an executor, when the call also runs inside a transaction)
//! as the first argument. Every tenant-owned query is scoped by `company_id`.

pub mod activity_repo;
pub mod api_key_repo;
pub mod company_repo;
pub mod deal_repo;
pub mod import_repo;
pub mod person_repo;
pub mod pipeline_repo;
pub mod settings_repo;
pub mod tag_repo;
pub mod task_repo;
pub mod user_repo;

pub use activity_repo::ActivityRepo;
pub use api_key_repo::ApiKeyRepo;
pub use company_repo::CompanyRepo;
pub use deal_repo::DealRepo;
pub use import_repo::ImportRepo;
pub use person_repo::PersonRepo;
pub use pipeline_repo::{PipelineRepo, PipelineWriteError};
pub use settings_repo::SettingsRepo;
pub use tag_repo::TagRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
