//! Gateway rewriting of content-addressed references.
//!
//! A pure string rewrite: the first rule whose prefix matches replaces that
//! prefix with the rule's base URL. `http://` and `https://` references pass
//! through unchanged.

use serde::{Deserialize, Serialize};

/// Default public IPFS gateway.
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// One prefix substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRule {
    pub prefix: String,
    pub base: String,
}

/// Ordered prefix substitution table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayRules {
    rules: Vec<GatewayRule>,
}

impl Default for GatewayRules {
    fn default() -> Self {
        Self::new().with_rule("ipfs://", DEFAULT_IPFS_GATEWAY)
    }
}

impl GatewayRules {
    /// An empty table. Only HTTP(S) references resolve.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Earlier rules win.
    pub fn with_rule(mut self, prefix: impl Into<String>, base: impl Into<String>) -> Self {
        self.rules.push(GatewayRule {
            prefix: prefix.into(),
            base: base.into(),
        });
        self
    }

    pub fn rules(&self) -> &[GatewayRule] {
        &self.rules
    }

    /// Rewrite a reference to a fetchable URL.
    pub fn resolve(&self, uri: &str) -> Option<String> {
        let uri = uri.trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Some(uri.to_string());
        }
        self.rules.iter().find_map(|rule| {
            uri.strip_prefix(rule.prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .map(|rest| format!("{}{}", rule.base, rest))
        })
    }
}
