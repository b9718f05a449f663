//! Environment variable interpolation for course scalars
//!
//! References take the form `$NAME` or `${NAME}`. A doubled `$$` is an
//! escaped literal dollar sign. Lookups go through [`Variables`], which layers
//! explicitly provided values (resolved secrets) over the process environment.

use std::collections::HashMap;

/// Variable source used during interpolation
#[derive(Debug, Clone, Default)]
pub struct Variables {
    overrides: HashMap<String, String>,
    process_env: bool,
}

impl Variables {
    /// Resolve names from the process environment
    pub fn from_env() -> Self {
        Self {
            overrides: HashMap::new(),
            process_env: true,
        }
    }

    /// Resolve names only from explicitly provided values
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Add a value that takes precedence over the process environment
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Add several values at once
    pub fn extend<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.overrides.extend(values);
    }

    /// Look up a single name
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }
        if self.process_env {
            return std::env::var(name).ok();
        }
        None
    }
}

/// Expand every variable reference in `input`.
///
/// Returns the names that could not be resolved, in order of first
/// appearance, if any reference is unset.
pub fn expand(input: &str, vars: &Variables) -> Result<String, Vec<String>> {
    let mut out = String::with_capacity(input.len());
    let mut missing: Vec<String> = Vec::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(escaped) = after.strip_prefix('$') {
            out.push('$');
            rest = escaped;
            continue;
        }

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_name(&braced[..end]) => {
                    resolve(&braced[..end], vars, &mut out, &mut missing);
                    rest = &braced[end + 1..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
            continue;
        }

        let len = after
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if len == 0 {
            out.push('$');
            rest = after;
            continue;
        }
        resolve(&after[..len], vars, &mut out, &mut missing);
        rest = &after[len..];
    }
    out.push_str(rest);

    if missing.is_empty() {
        Ok(out)
    } else {
        Err(missing)
    }
}

fn resolve(name: &str, vars: &Variables, out: &mut String, missing: &mut Vec<String>) {
    match vars.get(name) {
        Some(value) => out.push_str(&value),
        None => {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
    }
}

fn is_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
