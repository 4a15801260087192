use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root segment of every module path.
pub const CRATE_ROOT: &str = "crate";

/// Fully-qualified location of a named item in the domain sources.
///
/// `module` always starts with [`CRATE_ROOT`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentity {
    /// Module path, e.g. `["crate", "greeter"]`
    pub module: Vec<String>,
    /// Item name
    pub name: String,
}

/// Errors raised when parsing a [`SourceIdentity`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceIdentityError {
    /// Nothing to parse
    #[error("empty source identity")]
    Empty,
    /// The path does not start at the crate root
    #[error("source identity `{0}` must start with `crate::`")]
    NotRooted(String),
}

impl SourceIdentity {
    /// Create an identity for `name` inside `module`.
    pub fn new(module: Vec<String>, name: impl Into<String>) -> Self {
        Self { module, name: name.into() }
    }

    /// Identity of an item defined at the crate root.
    pub fn root(name: impl Into<String>) -> Self {
        Self { module: vec![CRATE_ROOT.to_string()], name: name.into() }
    }

    /// Every segment including the item name.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.module.iter().map(String::as_str).chain(std::iter::once(self.name.as_str()))
    }

    /// Render the identity as a Rust path with the crate root replaced by
    /// `crate_path` (e.g. `::my_domain` or `crate`).
    pub fn rust_path(&self, crate_path: &str) -> String {
        let mut rendered = String::from(crate_path);
        for segment in self.module.iter().skip(1).chain(std::iter::once(&self.name)) {
            rendered.push_str("::");
            rendered.push_str(segment);
        }
        rendered
    }

    /// Whether the identity's segments end with `suffix`.
    pub fn ends_with(&self, suffix: &[String]) -> bool {
        let segments: Vec<&str> = self.segments().collect();
        suffix.len() <= segments.len()
            && segments[segments.len() - suffix.len()..]
                .iter()
                .zip(suffix)
                .all(|(a, b)| *a == b.as_str())
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rust_path(CRATE_ROOT))
    }
}

impl FromStr for SourceIdentity {
    type Err = SourceIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<String> =
            s.split("::").filter(|segment| !segment.is_empty()).map(str::to_string).collect();
        let name = segments.pop().ok_or(SourceIdentityError::Empty)?;
        if segments.first().map(String::as_str) != Some(CRATE_ROOT) {
            return Err(SourceIdentityError::NotRooted(s.to_string()));
        }
        Ok(Self { module: segments, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_custom_crate_path() {
        let id: SourceIdentity = "crate::greeter::model::UserInfo".parse().expect("parse");
        assert_eq!(id.module, vec!["crate", "greeter", "model"]);
        assert_eq!(id.rust_path("::demo"), "::demo::greeter::model::UserInfo");
        assert_eq!(id.to_string(), "crate::greeter::model::UserInfo");
    }

    #[test]
    fn rejects_unrooted_paths() {
        assert_eq!(
            "greeter::UserInfo".parse::<SourceIdentity>(),
            Err(SourceIdentityError::NotRooted("greeter::UserInfo".into()))
        );
        assert_eq!("".parse::<SourceIdentity>(), Err(SourceIdentityError::Empty));
    }

    #[test]
    fn suffix_matching() {
        let id = SourceIdentity::new(vec!["crate".into(), "model".into()], "UserInfo");
        assert!(id.ends_with(&["model".to_string(), "UserInfo".to_string()]));
        assert!(!id.ends_with(&["other".to_string(), "UserInfo".to_string()]));
    }
}
