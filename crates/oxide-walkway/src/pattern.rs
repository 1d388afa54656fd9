//! Pattern preprocessing.
//!
//! Patterns are regular expressions, but route authors rarely want to spell
//! out named capture groups by hand. Before a pattern is matched, a
//! [`Preprocessor`] runs it through an ordered list of [`Substitution`] rules.
//! The built-in rule expands the placeholder syntax `<name:symbol>` into a
//! named group, looking `symbol` up in the symbol table:
//!
//! ```
//! use oxide_walkway::Preprocessor;
//!
//! let pre = Preprocessor::new();
//! assert_eq!(pre.prepare("user/<id:int>").unwrap(), r"user/(?P<id>\d+)");
//! assert_eq!(pre.prepare("tags/<tag:slug>").unwrap(), "tags/(?P<tag>[a-z0-9-]+)");
//! ```
//!
//! Symbols that are not in the table are used verbatim as a regex fragment,
//! so `<code:[A-Z]{3}>` becomes `(?P<code>[A-Z]{3})`.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use regex::{Captures, Regex};

use crate::error::RoutingError;

/// Map of symbol name to partial regular expression.
pub type Symbols = BTreeMap<String, String>;

/// Replacement callback of a substitution rule.
pub type ReplaceFn = dyn Fn(&Captures<'_>, &Symbols) -> String;

/// Regex of the built-in `<name:symbol>` rule.
///
/// The optional leading `(?` group lets the rule skip over an existing
/// `(?<name>...)` group instead of rewriting it.
pub const PLACEHOLDER_PATTERN: &str = r"(\(\?)?<(\w+):([^>]+)>";

/// A single regex-driven rewrite applied to every pattern.
#[derive(Clone)]
pub struct Substitution {
    pattern: String,
    regex: std::result::Result<Regex, regex::Error>,
    replace: Rc<ReplaceFn>,
}

impl Substitution {
    /// Creates a rule from a regex and a replacement callback.
    ///
    /// A malformed regex is not rejected here; it surfaces as
    /// [`RoutingError::InvalidSubstitution`] the first time a pattern is
    /// prepared.
    pub fn new<F>(pattern: &str, replace: F) -> Self
    where
        F: Fn(&Captures<'_>, &Symbols) -> String + 'static,
    {
        Self {
            pattern: pattern.to_string(),
            regex: Regex::new(pattern),
            replace: Rc::new(replace),
        }
    }

    /// The built-in placeholder rule.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_PATTERN, expand_placeholder)
    }

    /// Returns the rule's regex source.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn apply(&self, input: &str, symbols: &Symbols) -> Result<String, RoutingError> {
        let regex = self
            .regex
            .as_ref()
            .map_err(|source| RoutingError::InvalidSubstitution {
                pattern: self.pattern.clone(),
                source: source.clone(),
            })?;

        Ok(regex
            .replace_all(input, |caps: &Captures<'_>| (self.replace)(caps, symbols))
            .into_owned())
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substitution")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

fn expand_placeholder(caps: &Captures<'_>, symbols: &Symbols) -> String {
    if caps.get(1).is_some() {
        return caps[0].to_string();
    }

    let name = &caps[2];
    let symbol = &caps[3];
    let fragment = symbols.get(symbol).map_or(symbol, String::as_str);

    format!("(?P<{name}>{fragment})")
}

/// Returns the built-in symbol table.
pub fn default_symbols() -> Symbols {
    [("int", r"\d+"), ("slug", "[a-z0-9-]+")]
        .into_iter()
        .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
        .collect()
}

/// Rewrites raw patterns by applying substitution rules in order.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    substitutions: Vec<Substitution>,
    symbols: Symbols,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Creates a preprocessor with the placeholder rule and built-in symbols.
    pub fn new() -> Self {
        Self {
            substitutions: vec![Substitution::placeholder()],
            symbols: default_symbols(),
        }
    }

    /// Creates a preprocessor with no rules and no symbols.
    pub fn empty() -> Self {
        Self {
            substitutions: Vec::new(),
            symbols: Symbols::new(),
        }
    }

    /// Appends a substitution rule; rules run in registration order.
    pub fn add_substitution(&mut self, substitution: Substitution) {
        self.substitutions.push(substitution);
    }

    /// Returns the registered rules.
    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    /// Removes every rule, including the built-in one.
    pub fn clear_substitutions(&mut self) {
        self.substitutions.clear();
    }

    /// Defines or replaces a symbol.
    pub fn insert_symbol(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.symbols.insert(name.into(), pattern.into());
    }

    /// Returns the symbol table.
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Returns the symbol table for modification.
    pub fn symbols_mut(&mut self) -> &mut Symbols {
        &mut self.symbols
    }

    /// Applies every rule to `raw`, in order.
    pub fn prepare(&self, raw: &str) -> Result<String, RoutingError> {
        self.substitutions
            .iter()
            .try_fold(raw.to_string(), |pattern, substitution| {
                substitution.apply(&pattern, &self.symbols)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_known_symbols() {
        let pre = Preprocessor::new();
        assert_eq!(pre.prepare("<post_id:int>").unwrap(), r"(?P<post_id>\d+)");
        assert_eq!(
            pre.prepare("<year:int>-<month:int>").unwrap(),
            r"(?P<year>\d+)-(?P<month>\d+)"
        );
    }

    #[test]
    fn test_unknown_symbol_is_literal_fragment() {
        let pre = Preprocessor::new();
        assert_eq!(
            pre.prepare("page<page:[0-9]{1,3}>").unwrap(),
            "page(?P<page>[0-9]{1,3})"
        );
    }

    #[test]
    fn test_plain_patterns_untouched() {
        let pre = Preprocessor::new();
        assert_eq!(pre.prepare("blog").unwrap(), "blog");
        assert_eq!(pre.prepare(r"(?P<id>\d+)").unwrap(), r"(?P<id>\d+)");
        assert_eq!(
            pre.prepare(r"(?<year>\d+)-<month:int>").unwrap(),
            r"(?<year>\d+)-(?P<month>\d+)"
        );
    }

    #[test]
    fn test_custom_symbol() {
        let mut pre = Preprocessor::new();
        pre.insert_symbol("hex", "[0-9a-f]+");
        assert_eq!(pre.prepare("<sha:hex>").unwrap(), "(?P<sha>[0-9a-f]+)");
    }

    #[test]
    fn test_rules_apply_in_order() {
        let mut pre = Preprocessor::empty();
        pre.add_substitution(Substitution::new("@", |_, _| "<user:slug>".to_string()));
        pre.add_substitution(Substitution::placeholder());
        pre.insert_symbol("slug", "[a-z]+");
        assert_eq!(pre.prepare("@").unwrap(), "(?P<user>[a-z]+)");
    }

    #[test]
    fn test_invalid_substitution() {
        let mut pre = Preprocessor::new();
        pre.add_substitution(Substitution::new("(((", |_, _| String::new()));

        let err = pre.prepare("foo").unwrap_err();
        assert!(matches!(err, RoutingError::InvalidSubstitution { ref pattern, .. } if pattern == "((("));
    }
}
