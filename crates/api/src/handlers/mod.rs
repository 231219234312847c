pub mod activities;
pub mod api_keys;
pub mod auth;
pub mod companies;
pub mod deals;
pub mod external;
pub mod imports;
pub mod internal;
pub mod leads;
pub mod outreach;
pub mod people;
pub mod pipelines;
pub mod tags;
pub mod tasks;
pub mod tracking;
pub mod users;
pub mod webhooks;
