//! Call-side-effect catalog.
//!
//! Pure/impure classification of callees is language-dependent and lives
//! outside the analyzer core, so it arrives as data: a YAML catalog mapping
//! callee names (exact or regex) to a purity class, optionally backed by an
//! embedded set of well-known pure builtins. A callee the catalog cannot
//! resolve is assumed side-effecting, the conservative choice: unknown
//! calls are never flagged.
//!
//! There is no process-wide catalog; callers pass one explicitly into the
//! analyzer.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Side-effect classification of a callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purity {
    Pure,
    Impure,
    Unknown,
}

/// Read-only pure builtins embedded in the binary. Covers the usual
/// formatting and collection helpers of dynamic scripting languages.
static PURE_BUILTINS: phf::Set<&'static str> = phf::phf_set! {
    "abs",
    "array_keys",
    "array_values",
    "count",
    "explode",
    "htmlspecialchars",
    "implode",
    "intval",
    "max",
    "min",
    "number_format",
    "round",
    "sprintf",
    "strlen",
    "strtolower",
    "strtoupper",
    "substr",
    "trim",
    "ucfirst",
};

/// YAML schema for a catalog file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct CatalogFile {
    #[serde(default)]
    version: String,
    /// Callees known to be free of side effects.
    #[serde(default)]
    pure: Vec<String>,
    /// Callees known to touch external state.
    #[serde(default)]
    impure: Vec<String>,
    /// Regex rules, consulted in order after the exact lists.
    #[serde(default)]
    patterns: Vec<PatternRule>,
    /// Whether the embedded pure-builtin set backs the catalog (default true).
    #[serde(default)]
    builtins: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct PatternRule {
    pattern: String,
    purity: Purity,
}

/// Resolves callee names to a purity class.
#[derive(Debug, Default)]
pub struct CallCatalog {
    pure: HashSet<String>,
    impure: HashSet<String>,
    patterns: Vec<(Regex, Purity)>,
    builtins: bool,
}

impl CallCatalog {
    /// A catalog that resolves nothing: every call is assumed impure.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A catalog backed only by the embedded pure builtins.
    pub fn with_builtins() -> Self {
        Self {
            builtins: true,
            ..Self::default()
        }
    }

    /// Parse a catalog from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_yaml(&content)
    }

    /// Parse a catalog from YAML text.
    pub fn parse_yaml(content: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        let mut patterns = Vec::with_capacity(file.patterns.len());
        for rule in file.patterns {
            let re = Regex::new(&rule.pattern)?;
            patterns.push((re, rule.purity));
        }
        Ok(Self {
            pure: file.pure.into_iter().collect(),
            impure: file.impure.into_iter().collect(),
            patterns,
            builtins: file.builtins.unwrap_or(true),
        })
    }

    /// Mark a callee as pure (builder style, mainly for tests and embedders).
    pub fn mark_pure(mut self, callee: &str) -> Self {
        self.pure.insert(callee.to_string());
        self
    }

    /// Mark a callee as impure.
    pub fn mark_impure(mut self, callee: &str) -> Self {
        self.impure.insert(callee.to_string());
        self
    }

    /// Classify a callee. Exact entries win over patterns, patterns over
    /// the builtin set; anything else is `Unknown`.
    pub fn resolve(&self, callee: &str) -> Purity {
        if self.pure.contains(callee) {
            return Purity::Pure;
        }
        if self.impure.contains(callee) {
            return Purity::Impure;
        }
        for (re, purity) in &self.patterns {
            if re.is_match(callee) {
                return *purity;
            }
        }
        if self.builtins && PURE_BUILTINS.contains(callee) {
            return Purity::Pure;
        }
        Purity::Unknown
    }

    /// True only for calls the catalog positively classifies as pure.
    pub fn is_pure(&self, callee: &str) -> bool {
        self.resolve(callee) == Purity::Pure
    }
}
