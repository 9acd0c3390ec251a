//! Layered TTL policy resolution
//!
//! The effective TTL table is rebuilt on every invocation from four layers of
//! increasing precedence: hardcoded defaults, scope-level configuration,
//! `wisp_ttl_<kind>:<duration>` labels on the scope identity record, and
//! role-record overrides. A missing or unreadable layer is skipped; resolution
//! never fails outright.

use std::collections::HashMap;

use chrono::Duration;

use crate::store::WispStore;

/// Label key prefix for per-kind TTL overrides on a scope identity record.
pub const TTL_LABEL_PREFIX: &str = "wisp_ttl_";

/// Effective TTL table keyed by record kind, with a "default" sentinel entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    ttls: HashMap<String, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TtlPolicy {
    /// Hardcoded base layer: heartbeat-class kinds expire in hours, error-class
    /// kinds persist for a week, everything unnamed gets a day.
    pub fn defaults() -> Self {
        let mut ttls = HashMap::new();
        ttls.insert("heartbeat".to_string(), Duration::hours(6));
        ttls.insert("ping".to_string(), Duration::hours(6));
        ttls.insert("patrol".to_string(), Duration::hours(24));
        ttls.insert("gc_report".to_string(), Duration::hours(24));
        ttls.insert("recovery".to_string(), Duration::days(7));
        ttls.insert("error".to_string(), Duration::days(7));
        ttls.insert("escalation".to_string(), Duration::days(7));
        ttls.insert("default".to_string(), Duration::hours(24));
        Self { ttls }
    }

    /// Overlay kind → duration-string overrides. Unparsable values are ignored.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) {
        for (kind, value) in overrides {
            if let Some(ttl) = parse_ttl(value) {
                self.ttls.insert(kind.clone(), ttl);
            }
        }
    }

    /// Overlay `wisp_ttl_<kind>:<duration>` labels from a scope identity
    /// record. Keys match case-insensitively; parse failures are ignored.
    pub fn apply_label_overrides(&mut self, labels: &[String]) {
        for label in labels {
            let Some((key, value)) = label.split_once(':') else {
                continue;
            };
            let key = key.to_lowercase();
            let Some(kind) = key.strip_prefix(TTL_LABEL_PREFIX) else {
                continue;
            };
            if kind.is_empty() {
                continue;
            }
            if let Some(ttl) = parse_ttl(value.trim()) {
                self.ttls.insert(kind.to_string(), ttl);
            }
        }
    }

    /// TTL for a kind, falling back to the "default" entry. An empty kind is
    /// treated as "default".
    pub fn effective(&self, kind: &str) -> Duration {
        let kind = if kind.is_empty() { "default" } else { kind };
        match self.ttls.get(kind) {
            Some(ttl) => *ttl,
            None => self.ttls["default"],
        }
    }

    /// All entries, sorted by kind, for display.
    pub fn entries(&self) -> Vec<(String, Duration)> {
        let mut entries: Vec<_> = self
            .ttls
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Identity record id for a named scope.
pub fn scope_identity_id(scope: &str) -> String {
    format!("scope-{scope}")
}

/// Identity record id for a named role.
pub fn role_identity_id(role: &str) -> String {
    format!("role-{role}")
}

/// Resolve the effective TTL table for an optional scope and role.
///
/// Layer failures (no scope config, unreadable identity record, missing role
/// record) fall back to the layers below; the worst case is the hardcoded
/// defaults.
pub async fn resolve_policy(
    store: &dyn WispStore,
    scope: Option<&str>,
    role: Option<&str>,
) -> TtlPolicy {
    let mut policy = TtlPolicy::defaults();

    if let Some(scope) = scope {
        match store.scope_config(scope).await {
            Ok(Some(overrides)) => policy.apply_overrides(&overrides),
            Ok(None) => {}
            Err(e) => tracing::debug!(scope, error = %e, "skipping scope config layer"),
        }

        match store.scope_labels(scope).await {
            Ok(labels) => policy.apply_label_overrides(&labels),
            Err(e) => tracing::debug!(scope, error = %e, "skipping scope label layer"),
        }
    }

    if let Some(role) = role {
        match store.role_ttls(role).await {
            Ok(Some(overrides)) => policy.apply_overrides(&overrides),
            Ok(None) => {}
            Err(e) => tracing::debug!(role, error = %e, "skipping role override layer"),
        }
    }

    policy
}

/// Parse a duration string like "6h", "90m", "7d", or "1h30m".
///
/// Units are seconds, minutes, hours, and days. Returns `None` on anything
/// malformed; callers treat that as "ignore this override".
pub fn parse_ttl(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut matched = false;

    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let value: i64 = digits.parse().ok()?;
        digits.clear();
        total = total
            + match c {
                's' => Duration::seconds(value),
                'm' => Duration::minutes(value),
                'h' => Duration::hours(value),
                'd' => Duration::days(value),
                _ => return None,
            };
        matched = true;
    }

    // Trailing digits without a unit make the whole string invalid.
    if !digits.is_empty() || !matched {
        return None;
    }
    Some(total)
}

/// Render a TTL compactly for logs and tables: "7d", "6h", "90m", "1h30m".
pub fn format_ttl(ttl: Duration) -> String {
    let mut secs = ttl.num_seconds().max(0);
    let units = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

    let mut out = String::new();
    for (suffix, unit_secs) in units {
        let n = secs / unit_secs;
        if n > 0 {
            out.push_str(&format!("{n}{suffix}"));
            secs -= n * unit_secs;
        }
    }
    if out.is_empty() { "0s".to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[test]
    fn test_default_table() {
        let policy = TtlPolicy::defaults();
        assert_eq!(policy.effective("heartbeat"), Duration::hours(6));
        assert_eq!(policy.effective("ping"), Duration::hours(6));
        assert_eq!(policy.effective("patrol"), Duration::hours(24));
        assert_eq!(policy.effective("gc_report"), Duration::hours(24));
        assert_eq!(policy.effective("recovery"), Duration::days(7));
        assert_eq!(policy.effective("error"), Duration::days(7));
        assert_eq!(policy.effective("escalation"), Duration::days(7));
        assert_eq!(policy.effective("default"), Duration::hours(24));
    }

    #[test]
    fn test_effective_falls_back_to_default() {
        let policy = TtlPolicy::defaults();
        assert_eq!(policy.effective("made_up_kind"), Duration::hours(24));
        assert_eq!(policy.effective(""), Duration::hours(24));
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("6h"), Some(Duration::hours(6)));
        assert_eq!(parse_ttl("90m"), Some(Duration::minutes(90)));
        assert_eq!(parse_ttl("7d"), Some(Duration::days(7)));
        assert_eq!(parse_ttl("45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_ttl("1h30m"), Some(Duration::minutes(90)));
        assert_eq!(parse_ttl(" 12h "), Some(Duration::hours(12)));
    }

    #[test]
    fn test_parse_ttl_rejects_malformed() {
        assert_eq!(parse_ttl(""), None);
        assert_eq!(parse_ttl("h"), None);
        assert_eq!(parse_ttl("12"), None);
        assert_eq!(parse_ttl("12w"), None);
        assert_eq!(parse_ttl("soon"), None);
        assert_eq!(parse_ttl("1h30"), None);
    }

    #[test]
    fn test_format_ttl() {
        assert_eq!(format_ttl(Duration::hours(6)), "6h");
        assert_eq!(format_ttl(Duration::days(7)), "7d");
        assert_eq!(format_ttl(Duration::minutes(90)), "1h30m");
        assert_eq!(format_ttl(Duration::zero()), "0s");
    }

    #[test]
    fn test_apply_overrides_ignores_bad_durations() {
        let mut policy = TtlPolicy::defaults();
        let overrides = HashMap::from([
            ("heartbeat".to_string(), "12h".to_string()),
            ("patrol".to_string(), "whenever".to_string()),
        ]);
        policy.apply_overrides(&overrides);

        assert_eq!(policy.effective("heartbeat"), Duration::hours(12));
        assert_eq!(policy.effective("patrol"), Duration::hours(24));
    }

    #[test]
    fn test_label_overrides_case_insensitive() {
        let mut policy = TtlPolicy::defaults();
        let labels = vec![
            "WISP_TTL_HEARTBEAT: 3h".to_string(),
            "wisp_ttl_error:2d".to_string(),
            "wisp_ttl_:1h".to_string(),
            "priority:high".to_string(),
            "no-colon-here".to_string(),
            "wisp_ttl_ping:next week".to_string(),
        ];
        policy.apply_label_overrides(&labels);

        assert_eq!(policy.effective("heartbeat"), Duration::hours(3));
        assert_eq!(policy.effective("error"), Duration::days(2));
        // Empty kind and unparsable duration are both ignored.
        assert_eq!(policy.effective("ping"), Duration::hours(6));
    }

    #[tokio::test]
    async fn test_resolve_layer_precedence() {
        let store = MemoryStore::new();
        store.set_scope_config(
            "forge",
            HashMap::from([
                ("heartbeat".to_string(), "2h".to_string()),
                ("patrol".to_string(), "12h".to_string()),
            ]),
        );
        store.add_scope_labels("forge", &["wisp_ttl_patrol:10h".to_string()]);
        store.set_role_ttls(
            "watchman",
            HashMap::from([("patrol".to_string(), "8h".to_string())]),
        );

        // Role overrides beat labels, labels beat scope config.
        let policy = resolve_policy(&store, Some("forge"), Some("watchman")).await;
        assert_eq!(policy.effective("heartbeat"), Duration::hours(2));
        assert_eq!(policy.effective("patrol"), Duration::hours(8));

        let policy = resolve_policy(&store, Some("forge"), None).await;
        assert_eq!(policy.effective("patrol"), Duration::hours(10));

        let policy = resolve_policy(&store, None, None).await;
        assert_eq!(policy.effective("patrol"), Duration::hours(24));
    }

    #[tokio::test]
    async fn test_resolve_unknown_scope_is_non_fatal() {
        let store = MemoryStore::new();
        let policy = resolve_policy(&store, Some("ghost"), Some("nobody")).await;
        assert_eq!(policy, TtlPolicy::defaults());
    }
}
