use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Longest prefix that still leaves room for the generated suffix in a 63 character label
pub const MAX_PREFIX_LEN: usize = 30;

static PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid unit name prefix `{0}`: expected at most {MAX_PREFIX_LEN} lowercase alphanumeric characters or '-', starting with a letter")]
pub struct InvalidPrefix(pub String);

/// Generates a unique execution unit name per request.
///
/// Names have the form `<prefix>-<uuid>` and are valid RFC 1123 labels, so concurrent
/// executions never collide in the orchestrator's namespace.
#[derive(Debug, Clone)]
pub struct UnitNamer {
    prefix: String,
}

impl UnitNamer {
    pub fn try_new(prefix: impl Into<String>) -> Result<Self, InvalidPrefix> {
        let prefix = prefix.into();
        let regex = PREFIX_REGEX
            .get_or_init(|| Regex::new("^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("invalid regex"));

        if prefix.len() > MAX_PREFIX_LEN || !regex.is_match(&prefix) {
            return Err(InvalidPrefix(prefix));
        }

        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_name(&self) -> String {
        format!("{}-{}", self.prefix, Uuid::new_v4().simple())
    }
}
