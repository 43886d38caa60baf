//! Keyword routing for hosts running without an LLM.

use gmi_agents::AgentRole;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// One keyword pattern per role, in hand-off order.
static ROLE_PATTERNS: Lazy<Vec<(AgentRole, Regex)>> = Lazy::new(|| {
    AgentRole::all()
        .into_iter()
        .filter_map(|role| {
            let alternatives = role
                .keywords()
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            RegexBuilder::new(&format!(r"\b(?:{})", alternatives))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|pattern| (role, pattern))
        })
        .collect()
});

/// Pick the available agent whose role keywords best match `text`.
///
/// Only agents in `available` are considered. Ties go to the earlier role in
/// hand-off order. Returns `None` when no keyword matches.
pub fn fallback_agent(text: &str, available: &[String]) -> Option<String> {
    let mut best: Option<(&'static str, usize)> = None;

    for (role, pattern) in ROLE_PATTERNS.iter() {
        let name = role.card_name();
        if !available.iter().any(|a| a == name) {
            continue;
        }

        let hits = pattern.find_iter(text).count();
        if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
            best = Some((name, hits));
        }
    }

    best.map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everyone() -> Vec<String> {
        AgentRole::all().iter().map(|r| r.card_name().to_string()).collect()
    }

    #[test]
    fn test_routes_by_keyword() {
        assert_eq!(
            fallback_agent("Plan our next two sprints", &everyone()).as_deref(),
            Some("Agile Project Manager Agent")
        );
        assert_eq!(
            fallback_agent("We need a product roadmap and feature priorities", &everyone()).as_deref(),
            Some("Product Manager Agent")
        );
    }

    #[test]
    fn test_only_available_agents() {
        let only_ba = vec!["Business Analyst Agent".to_string()];
        assert_eq!(fallback_agent("Plan the sprint", &only_ba), None);
        assert_eq!(
            fallback_agent("Write the BRD requirements", &only_ba).as_deref(),
            Some("Business Analyst Agent")
        );
    }

    #[test]
    fn test_every_role_has_a_pattern() {
        assert_eq!(ROLE_PATTERNS.len(), AgentRole::all().len());
    }

    #[test]
    fn test_no_match() {
        assert_eq!(fallback_agent("What's the weather?", &everyone()), None);
    }
}
