//! Activity type names written to `activities.activity_type`.
//!
//! The column is free text so user-created activities can use any label;
//! these are the types the system itself writes.

pub const NOTE: &str = "note";
pub const CALL: &str = "call";
pub const MEETING: &str = "meeting";
pub const EMAIL_SENT: &str = "email_sent";
pub const EMAIL_OPEN: &str = "email_open";
pub const LINK_CLICK: &str = "link_click";
pub const DEAL_CREATED: &str = "deal_created";
pub const STAGE_CHANGE: &str = "stage_change";
pub const FORM_SUBMISSION: &str = "form_submission";
pub const BCC_EMAIL: &str = "bcc_email";
pub const LEAD_CREATED: &str = "lead_created";
