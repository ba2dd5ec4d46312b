//! Build command templates
//!
//! Commands carry `{name}` placeholders. Substitution is lenient: a
//! placeholder without a value stays in the command verbatim and is reported
//! back to the caller, since templates are shared across libraries that do
//! not all supply the same optional parameters.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder pattern"))
}

/// Parameter values for one library on one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap(BTreeMap<String, String>);

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set a path parameter
    pub fn insert_path(&mut self, key: impl Into<String>, path: &Path) {
        self.insert(key, path.display().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A template after substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Command text with known placeholders replaced
    pub command: String,
    /// Placeholder names left in the command, in order of appearance
    pub unresolved: Vec<String>,
}

/// Replace every `{name}` whose name has a value in `params`
pub fn render(template: &str, params: &ParamMap) -> Rendered {
    let mut unresolved = Vec::new();
    let command = placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if let Some(value) = params.get(name) {
                value.to_string()
            } else {
                if !unresolved.iter().any(|u| u == name) {
                    unresolved.push(name.to_string());
                }
                caps[0].to_string()
            }
        })
        .into_owned();

    Rendered {
        command,
        unresolved,
    }
}

/// Render a template, warning about placeholders without a value
pub fn substitute(template: &str, params: &ParamMap) -> String {
    let rendered = render(template, params);
    for name in &rendered.unresolved {
        tracing::warn!("Missing key '{name}' in command: {template}");
    }
    rendered.command
}
