//! Parameter projection: a registration builder for path/query parameters on the
//! initialization request, in place of the runtime field-tag reflection the original
//! protocol description assumes (Rust has no such reflection).

use url::Url;

/// Where a caller-declared parameter binding is substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

/// A caller-populated list of named parameter bindings, resolved once at
/// initialization-request construction time.
#[derive(Debug, Clone, Default)]
pub struct ParamBindings {
    bindings: Vec<(String, ParamLocation, String)>,
}

impl ParamBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.push((name.into(), ParamLocation::Path, value.into()));
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.push((name.into(), ParamLocation::Query, value.into()));
        self
    }

    /// Substitute `{name}` placeholders in `path_template` from path-location bindings.
    pub fn resolve_path(&self, path_template: &str) -> String {
        let mut resolved = path_template.to_string();
        for (name, location, value) in &self.bindings {
            if *location == ParamLocation::Path {
                resolved = resolved.replace(&format!("{{{}}}", name), value);
            }
        }
        resolved
    }

    /// Append query-location bindings to `url`, percent-encoded via the `url` crate.
    pub fn apply_query(&self, url: &mut Url) {
        for (name, location, value) in &self.bindings {
            if *location == ParamLocation::Query {
                url.query_pairs_mut().append_pair(name, value);
            }
        }
    }
}
