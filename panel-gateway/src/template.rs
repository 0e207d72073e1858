//! Dashboard template-variable resolution.

use std::collections::HashMap;

/// Resolves `$variable` placeholders in tag values.
pub trait TemplateResolver: Send + Sync {
    /// Substitute every known variable in `input`.
    fn resolve(&self, input: &str) -> String;
    /// Names of the currently defined variables, `$`-prefixed.
    fn variables(&self) -> Vec<String>;
}

/// Resolver backed by a fixed name → value map.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    vars: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl TemplateResolver for StaticResolver {
    fn resolve(&self, input: &str) -> String {
        if !input.contains('$') {
            return input.to_string();
        }
        // Longest name first so `$hostname` is never clipped by `$host`.
        let mut names: Vec<&String> = self.vars.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let mut out = input.to_string();
        for name in names {
            out = out.replace(&format!("${name}"), &self.vars[name]);
        }
        out
    }

    fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().map(|n| format!("${n}")).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(pairs: &[(&str, &str)]) -> StaticResolver {
        StaticResolver::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn substitutes_known_variables() {
        let r = resolver(&[("host", "web-1")]);
        assert_eq!(r.resolve("$host"), "web-1");
        assert_eq!(r.resolve("prefix-$host-suffix"), "prefix-web-1-suffix");
    }

    #[test]
    fn leaves_unknown_variables_alone() {
        let r = resolver(&[("host", "web-1")]);
        assert_eq!(r.resolve("$dc"), "$dc");
    }

    #[test]
    fn plain_values_pass_through() {
        let r = resolver(&[("host", "web-1")]);
        assert_eq!(r.resolve("web-2"), "web-2");
    }

    #[test]
    fn longer_names_win() {
        let r = resolver(&[("host", "short"), ("hostname", "long")]);
        assert_eq!(r.resolve("$hostname"), "long");
        assert_eq!(r.resolve("$host"), "short");
    }

    #[test]
    fn variables_are_dollar_prefixed_and_sorted() {
        let r = resolver(&[("host", "a"), ("dc", "b")]);
        assert_eq!(r.variables(), vec!["$dc", "$host"]);
    }
}
