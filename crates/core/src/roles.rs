//! User role names stored in `users.role`.

/// The user who created the company. Can manage API keys.
pub const ROLE_OWNER: &str = "owner";

/// Any other member of the company.
pub const ROLE_MEMBER: &str = "member";

/// Whether the role may manage company-wide settings such as API keys.
pub fn can_manage_company(role: &str) -> bool {
    role == ROLE_OWNER
}
