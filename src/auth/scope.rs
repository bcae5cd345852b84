//! Scope matching with wildcard suffixes (spec §4.1).
//!
//! A granted scope `"mail.*"` covers any required scope whose dot-segments
//! start with `mail` (`"mail.send"`, `"mail.read.threads"`). An exact match
//! always covers itself. `"*"` alone covers everything (bootstrap path).

pub fn scope_satisfies(granted: &[String], required: &str) -> bool {
    granted.iter().any(|g| grant_covers(g, required))
}

/// The scope a tool dispatcher must check before invoking `tool_name` (spec
/// §6.2's scope mapping table). Read-only MCP surface methods
/// (`initialize`, `tools/list`, `resources/list`, `resources/read`) and
/// read-only tools fall back to `nerve:email.read`.
pub fn required_scope_for_tool(tool_name: &str) -> &'static str {
    match tool_name {
        "search_inbox" => "nerve:email.search",
        "send_email" | "send_reply" => "nerve:email.send",
        "draft_reply" | "draft_reply_with_policy" | "triage_inbox" | "extract_entities" => "nerve:email.draft",
        _ => "nerve:email.read",
    }
}

fn grant_covers(grant: &str, required: &str) -> bool {
    if grant == "*" || grant == required {
        return true;
    }
    match grant.strip_suffix(".*") {
        Some(prefix) => required == prefix || required.starts_with(&format!("{prefix}.")),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(scope_satisfies(&["mail.send".to_string()], "mail.send"));
    }

    #[test]
    fn wildcard_covers_subscopes() {
        let granted = vec!["mail.*".to_string()];
        assert!(scope_satisfies(&granted, "mail.send"));
        assert!(scope_satisfies(&granted, "mail.read.threads"));
        assert!(scope_satisfies(&granted, "mail"));
    }

    #[test]
    fn wildcard_does_not_cover_unrelated_prefix() {
        let granted = vec!["mail.*".to_string()];
        assert!(!scope_satisfies(&granted, "billing.read"));
    }

    #[test]
    fn star_covers_everything() {
        assert!(scope_satisfies(&["*".to_string()], "anything.at.all"));
    }

    #[test]
    fn no_grants_satisfies_nothing() {
        assert!(!scope_satisfies(&[], "mail.send"));
    }

    #[test]
    fn tool_scope_mapping_matches_spec_table() {
        assert_eq!(required_scope_for_tool("initialize"), "nerve:email.read");
        assert_eq!(required_scope_for_tool("tools/list"), "nerve:email.read");
        assert_eq!(required_scope_for_tool("resources/read"), "nerve:email.read");
        assert_eq!(required_scope_for_tool("search_inbox"), "nerve:email.search");
        assert_eq!(required_scope_for_tool("draft_reply_with_policy"), "nerve:email.draft");
        assert_eq!(required_scope_for_tool("send_email"), "nerve:email.send");
    }
}
