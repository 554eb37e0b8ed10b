//! SQL text for GRANT / REVOKE / SHOW GRANTS.
//!
//! Keyword casing is significant: the grant statement uses a lower-case `on`
//! while both revokes use `ON`.

use crate::spec::GrantSpec;

/// Comma-joined privilege list, lexicographic order.
pub fn format_privileges(spec: &GrantSpec) -> String {
    spec.privileges()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// `*` stays bare, anything else is wrapped in backticks.
pub fn format_database(spec: &GrantSpec) -> String {
    if spec.is_all_databases() {
        spec.database().to_string()
    } else {
        format!("`{}`", spec.database())
    }
}

fn principal(user: &str, host: &str) -> String {
    format!("'{}'@'{}'", user, host)
}

pub fn grant(spec: &GrantSpec) -> String {
    let mut sql = format!(
        "GRANT {} on {}.* TO {}",
        format_privileges(spec),
        format_database(spec),
        principal(spec.user(), spec.host())
    );
    if spec.grant_option() {
        sql.push_str(" WITH GRANT OPTION");
    }
    sql
}

pub fn revoke_grant_option(spec: &GrantSpec) -> String {
    format!(
        "REVOKE GRANT OPTION ON {}.* FROM {}",
        format_database(spec),
        principal(spec.user(), spec.host())
    )
}

pub fn revoke_privileges(spec: &GrantSpec) -> String {
    format!(
        "REVOKE {} ON {}.* FROM {}",
        format_privileges(spec),
        format_database(spec),
        principal(spec.user(), spec.host())
    )
}

pub fn show_grants(user: &str, host: &str) -> String {
    format!("SHOW GRANTS FOR {}", principal(user, host))
}
