//! Route criteria to engine match objects.
//!
//! # Responsibilities
//! - Split regexp paths ("~name: pattern") from literal paths
//! - Emit one `path` object for all literals, one `path_regexp` object per
//!   distinct pattern
//! - Attach method/host/header/protocol constraints when supplied
//!
//! # Design Decisions
//! - Match objects in the returned list are OR'ed by the engine; route
//!   criteria within one object are AND'ed
//! - A route with no criteria at all yields an empty list (match anything)
//! - Duplicate regexp patterns keep the last name seen (overwrite-last)

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::model::schema::Matcher;

/// Marker for regular-expression paths: "~name: pattern", name optional.
static RE_REGEXP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~(\w+)?:\s*(.+)").expect("regexp path marker"));

/// Builds the engine match objects for one route.
pub fn build_route_matches(matcher: &Matcher) -> Vec<Value> {
    // Differentiate regexp paths from literal paths.
    let mut literal: Vec<&str> = Vec::new();
    let mut regexp: BTreeMap<&str, &str> = BTreeMap::new();
    for p in &matcher.paths {
        match RE_REGEXP_PATH.captures(p) {
            Some(caps) => {
                let name = caps.get(1).map_or("", |m| m.as_str());
                let pattern = caps.get(2).map_or("", |m| m.as_str());
                regexp.insert(pattern, name);
            }
            None => literal.push(p),
        }
    }

    let mut matches = Vec::new();

    if !literal.is_empty() {
        let mut m = Map::new();
        m.insert("path".to_string(), json!(literal));
        add_constraints(&mut m, matcher);
        matches.push(Value::Object(m));
    }

    for (pattern, name) in regexp {
        let mut m = Map::new();
        m.insert(
            "path_regexp".to_string(),
            json!({ "name": name, "pattern": pattern }),
        );
        add_constraints(&mut m, matcher);
        matches.push(Value::Object(m));
    }

    // No path constraint at all: match on the remaining criteria alone.
    if matches.is_empty() {
        let mut m = Map::new();
        add_constraints(&mut m, matcher);
        if !m.is_empty() {
            matches.push(Value::Object(m));
        }
    }

    matches
}

fn add_constraints(m: &mut Map<String, Value>, matcher: &Matcher) {
    if !matcher.methods.is_empty() {
        m.insert("method".to_string(), json!(matcher.methods));
    }
    if !matcher.hosts.is_empty() {
        m.insert("host".to_string(), json!(matcher.hosts));
    }
    if !matcher.headers.is_empty() {
        m.insert("header".to_string(), json!(matcher.headers));
    }
    if !matcher.protocol.is_empty() {
        m.insert("protocol".to_string(), json!(matcher.protocol));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(paths: &[&str]) -> Matcher {
        Matcher {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            ..Matcher::default()
        }
    }

    #[test]
    fn test_literal_paths_only() {
        let m = matcher(&["/users", "/orders"]);
        let matches = build_route_matches(&m);
        assert_eq!(matches, vec![json!({ "path": ["/users", "/orders"] })]);
    }

    #[test]
    fn test_literal_and_regexp_paths() {
        let mut m = matcher(&["/users", r"~ver: /v\d+/users"]);
        m.methods = vec!["GET".to_string()];

        let matches = build_route_matches(&m);
        assert_eq!(
            matches,
            vec![
                json!({ "path": ["/users"], "method": ["GET"] }),
                json!({
                    "path_regexp": { "name": "ver", "pattern": r"/v\d+/users" },
                    "method": ["GET"]
                }),
            ]
        );
    }

    #[test]
    fn test_unnamed_regexp_path() {
        let matches = build_route_matches(&matcher(&[r"~: /v\d+"]));
        assert_eq!(
            matches,
            vec![json!({ "path_regexp": { "name": "", "pattern": r"/v\d+" } })]
        );
    }

    #[test]
    fn test_duplicate_pattern_keeps_last_name() {
        let matches = build_route_matches(&matcher(&[r"~a: /v\d+", r"~b: /v\d+"]));
        assert_eq!(
            matches,
            vec![json!({ "path_regexp": { "name": "b", "pattern": r"/v\d+" } })]
        );
    }

    #[test]
    fn test_no_paths_falls_back_to_other_criteria() {
        let mut m = matcher(&[]);
        m.hosts = vec!["example.com".to_string()];
        m.protocol = "https".to_string();

        let matches = build_route_matches(&m);
        assert_eq!(
            matches,
            vec![json!({ "host": ["example.com"], "protocol": "https" })]
        );
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        assert!(build_route_matches(&Matcher::default()).is_empty());
    }

    #[test]
    fn test_header_constraint() {
        let mut m = matcher(&["/users"]);
        m.headers
            .insert("X-Env".to_string(), vec!["staging".to_string()]);

        let matches = build_route_matches(&m);
        assert_eq!(
            matches,
            vec![json!({ "path": ["/users"], "header": { "X-Env": ["staging"] } })]
        );
    }
}
