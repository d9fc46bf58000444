//! Site scoping and the reserved table-name policy.

/// Physical table names that belong to the engine (or the account system)
/// and can never be associated, listed as unassociated, or deleted.
pub const RESERVED_TABLES: [&str; 4] = ["sites", "site_tables", "site_users", "user_main"];

/// Check whether a physical table name is reserved (case-insensitive).
pub fn is_reserved_table(name: &str) -> bool {
    RESERVED_TABLES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// How a table reference is resolved for a given site.
///
/// The shared site resolves table references by physical identifier alone,
/// case-insensitively, across every site. Every other site only sees the
/// tables it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteScope {
    Shared,
    Site(i64),
}

impl SiteScope {
    /// Resolve the scope for `site_id` given the configured shared site.
    pub fn resolve(site_id: i64, shared_site_id: i64) -> Self {
        if site_id == shared_site_id {
            Self::Shared
        } else {
            Self::Site(site_id)
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared)
    }
}
