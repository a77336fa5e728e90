//! Config variable resolution
//!
//! Strings in the config document may contain `${token}` placeholders. Each
//! token is dispatched to the first [`ResolverRule`] whose pattern matches it,
//! in declaration order. Tokens no rule claims are self-references: a
//! dot-separated path into the document, optionally written as `self:path`.
//!
//! A rule returns either a [`Resolution::Literal`], which is final, or a
//! [`Resolution::Template`] that is resolved again (the `context:` source
//! returns `${self:...}`). Resolution repeats until no placeholder is left,
//! or fails with [`Error::ResolutionCycle`] after [`MAX_PASSES`] passes.
//! Placeholder syntax inside a literal is never expanded.
//!
//! ## Syntax
//!
//! - `${build.publish}` / `${self:build.publish}`: value at a document path
//! - `${secrets:deploy-key}`, `${context:url}`, `${env:HOME}`, `${opt:stage}`:
//!   dispatched to rules (see [`crate::sources`])
//! - `${token, 'fallback'}`: literal used when `token` resolves to nothing
//! - `${token, other.path}`: reference resolved when `token` resolves to nothing
//! - `${self:deploy.${opt:target}}`: innermost placeholders resolve first
//!
//! A string that is exactly one placeholder takes the type of the resolved
//! value; placeholders inside longer strings are stringified.

use crate::dotpath;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use stagecraft_core::{Error, Result};
use std::ops::Range;
use std::sync::LazyLock;

/// Maximum number of resolution passes for a single template
pub const MAX_PASSES: usize = 50;

/// Context used by `${context:...}` when none is configured
pub const DEFAULT_CONTEXT: &str = "production";

/// Innermost placeholder: no nested `$`, `{` or `}` inside the braces
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^${}]+)\}").expect("PLACEHOLDER regex compilation should never fail")
});

/// A string consisting of exactly one innermost placeholder
static WHOLE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([^${}]+)\}$").expect("WHOLE_PLACEHOLDER regex compilation should never fail")
});

/// Options visible to resolver rules (CLI flags, active context)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    values: Map<String, JsonValue>,
}

impl ResolveOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active context used by `${context:...}`
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.values
            .insert("context".to_string(), JsonValue::String(context.into()));
        self
    }

    /// Set an option value
    pub fn set(&mut self, key: impl Into<String>, value: JsonValue) {
        self.values.insert(key.into(), value);
    }

    /// Get an option value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Active context, defaulting to [`DEFAULT_CONTEXT`]
    #[must_use]
    pub fn context(&self) -> &str {
        self.values
            .get("context")
            .and_then(JsonValue::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTEXT)
    }
}

/// Value produced by a [`Resolve`] implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Final text, substituted as is
    Literal(String),
    /// Text that may contain placeholders and is resolved again
    Template(String),
}

impl Resolution {
    /// The produced text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(text) | Self::Template(text) => text,
        }
    }
}

/// Resolution strategy for a family of tokens
///
/// Returns `Ok(None)` when the token has no value; the resolver then uses the
/// placeholder's fallback or its configured default.
pub trait Resolve: Send + Sync {
    /// Resolve `token` (the placeholder body without its fallback)
    fn resolve(
        &self,
        token: &str,
        options: &ResolveOptions,
        root: &JsonValue,
    ) -> Result<Option<Resolution>>;
}

/// Implement Resolve for closures
impl<F> Resolve for F
where
    F: Fn(&str, &ResolveOptions, &JsonValue) -> Result<Option<Resolution>> + Send + Sync,
{
    fn resolve(
        &self,
        token: &str,
        options: &ResolveOptions,
        root: &JsonValue,
    ) -> Result<Option<Resolution>> {
        self(token, options, root)
    }
}

/// Result of resolving one placeholder
enum Resolved {
    /// Final text that must not be scanned for placeholders
    Literal(String),
    /// Document value or template, resolved further
    Value(JsonValue),
}

/// A named pattern and the strategy handling tokens it matches
pub struct ResolverRule {
    name: String,
    pattern: Regex,
    resolver: Box<dyn Resolve>,
}

impl ResolverRule {
    /// Create a rule; `pattern` is tested against the whole token
    pub fn new(name: impl Into<String>, pattern: Regex, resolver: impl Resolve + 'static) -> Self {
        Self {
            name: name.into(),
            pattern,
            resolver: Box::new(resolver),
        }
    }

    /// Rule name (for logging)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this rule handles `token`
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        self.pattern.is_match(token)
    }
}

impl std::fmt::Debug for ResolverRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Resolves `${...}` placeholders in config documents
#[derive(Debug)]
pub struct VariableResolver {
    rules: Vec<ResolverRule>,
    options: ResolveOptions,
    default: JsonValue,
    max_passes: usize,
}

impl VariableResolver {
    /// Create a resolver with no rules (self-references only)
    #[must_use]
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            rules: Vec::new(),
            options,
            default: JsonValue::Null,
            max_passes: MAX_PASSES,
        }
    }

    /// Append a rule; rules are tried in the order they were added
    #[must_use]
    pub fn rule(mut self, rule: ResolverRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append several rules
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = ResolverRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Value substituted for tokens that resolve to nothing (default: null)
    #[must_use]
    pub fn default_value(mut self, default: JsonValue) -> Self {
        self.default = default;
        self
    }

    /// Override the pass bound
    #[must_use]
    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Options passed to rules
    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve every string in `document`, using it as the root for lookups
    pub fn resolve_document(&self, document: &JsonValue) -> Result<JsonValue> {
        self.resolve_value(document, document, 0)
    }

    /// Resolve a single template against `root`
    pub fn resolve_str(&self, template: &str, root: &JsonValue) -> Result<JsonValue> {
        self.resolve_template(template, root, 0)
    }

    fn resolve_value(
        &self,
        value: &JsonValue,
        root: &JsonValue,
        depth: usize,
    ) -> Result<JsonValue> {
        match value {
            JsonValue::String(s) => self.resolve_template(s, root, depth),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, root, depth))
                .collect::<Result<Vec<_>>>()
                .map(JsonValue::Array),
            JsonValue::Object(map) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.resolve_value(item, root, depth)?)))
                .collect::<Result<Map<_, _>>>()
                .map(JsonValue::Object),
            other => Ok(other.clone()),
        }
    }

    /// Expand placeholders pass by pass until none is left
    ///
    /// `depth` counts passes already spent on the chain that led here, so
    /// self-references through mappings stay within the same bound.
    fn resolve_template(
        &self,
        template: &str,
        root: &JsonValue,
        depth: usize,
    ) -> Result<JsonValue> {
        let mut current = Expansion::template(template);
        let mut passes = depth;

        while current.has_placeholders() {
            if passes >= self.max_passes {
                return Err(Error::ResolutionCycle {
                    template: template.to_string(),
                    passes,
                });
            }
            passes += 1;

            if let Some(token) = current.whole_placeholder() {
                match self.resolve_token(&token, root)? {
                    Resolved::Literal(text) => return Ok(JsonValue::String(text)),
                    Resolved::Value(JsonValue::String(next)) => {
                        current = Expansion::template(&next);
                    }
                    Resolved::Value(other) => return self.resolve_value(&other, root, passes),
                }
                continue;
            }

            current = self.expand_once(&current, root)?;
        }

        Ok(JsonValue::String(current.text))
    }

    /// Replace every innermost placeholder in `input` once
    fn expand_once(&self, input: &Expansion, root: &JsonValue) -> Result<Expansion> {
        let masked = input.masked();
        let mut output = Expansion::default();
        let mut last = 0;

        for whole in PLACEHOLDER.find_iter(&masked) {
            output.push_copied(input, last..whole.start());

            let token = &input.text[whole.start() + 2..whole.end() - 1];
            match self.resolve_token(token, root)? {
                Resolved::Literal(text) => output.push_literal(&text),
                Resolved::Value(value) => output.text.push_str(&to_template_string(&value)),
            }
            last = whole.end();
        }
        output.push_copied(input, last..input.text.len());

        Ok(output)
    }

    fn resolve_token(&self, raw: &str, root: &JsonValue) -> Result<Resolved> {
        let (reference, fallback) = match raw.split_once(',') {
            Some((reference, fallback)) => (reference.trim(), Some(fallback.trim())),
            None => (raw.trim(), None),
        };

        match self.lookup(reference, root)? {
            Some(resolved) => Ok(resolved),
            None => match fallback {
                Some(fallback) => Ok(parse_fallback(fallback)),
                None => Ok(Resolved::Value(self.default.clone())),
            },
        }
    }

    fn lookup(&self, token: &str, root: &JsonValue) -> Result<Option<Resolved>> {
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(token)) {
            tracing::trace!(rule = %rule.name, token = %token, "Resolving variable");
            return Ok(rule
                .resolver
                .resolve(token, &self.options, root)?
                .map(|resolution| match resolution {
                    Resolution::Literal(text) => Resolved::Literal(text),
                    Resolution::Template(text) => Resolved::Value(JsonValue::String(text)),
                }));
        }

        let path = token.strip_prefix("self:").unwrap_or(token).trim();
        Ok(dotpath::get(root, path).cloned().map(Resolved::Value))
    }
}

/// A partially resolved string and the byte ranges holding literal text
#[derive(Debug, Default)]
struct Expansion {
    text: String,
    literals: Vec<Range<usize>>,
}

impl Expansion {
    fn template(text: &str) -> Self {
        Self {
            text: text.to_string(),
            literals: Vec::new(),
        }
    }

    /// Copy of `text` with placeholder syntax inside literals blanked out
    ///
    /// Byte offsets are unchanged, so matches index into `text` directly.
    fn masked(&self) -> String {
        if self.literals.is_empty() {
            return self.text.clone();
        }

        let mut bytes = self.text.clone().into_bytes();
        for range in &self.literals {
            for byte in &mut bytes[range.clone()] {
                if matches!(byte, b'$' | b'{' | b'}') {
                    *byte = b'_';
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn has_placeholders(&self) -> bool {
        PLACEHOLDER.is_match(&self.masked())
    }

    /// Body of the placeholder when the text is exactly one placeholder
    fn whole_placeholder(&self) -> Option<String> {
        let masked = self.masked();
        WHOLE_PLACEHOLDER
            .is_match(&masked)
            .then(|| self.text[2..self.text.len() - 1].to_string())
    }

    /// Append `source.text[range]`, keeping the literal ranges inside it
    fn push_copied(&mut self, source: &Self, range: Range<usize>) {
        let offset = self.text.len();
        for literal in &source.literals {
            if literal.start >= range.start && literal.end <= range.end {
                self.literals.push(
                    offset + literal.start - range.start..offset + literal.end - range.start,
                );
            }
        }
        self.text.push_str(&source.text[range]);
    }

    fn push_literal(&mut self, text: &str) {
        let start = self.text.len();
        self.text.push_str(text);
        self.literals.push(start..self.text.len());
    }
}

/// Interpret the text after `,` in a placeholder
///
/// Quoted text is a literal, JSON scalars keep their type, anything else is
/// a reference resolved on the next pass.
fn parse_fallback(fallback: &str) -> Resolved {
    for quote in ['\'', '"'] {
        if let Some(inner) = fallback
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Resolved::Literal(inner.to_string());
        }
    }

    match serde_json::from_str::<JsonValue>(fallback) {
        Ok(value @ (JsonValue::Bool(_) | JsonValue::Number(_))) => Resolved::Value(value),
        _ => Resolved::Value(JsonValue::String(format!("${{{fallback}}}"))),
    }
}

/// Render a resolved value for embedding in a larger string
#[must_use]
pub fn to_template_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check whether `value` still contains a placeholder anywhere
#[must_use]
pub fn has_placeholders(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(s) => PLACEHOLDER.is_match(s),
        JsonValue::Array(items) => items.iter().any(has_placeholders),
        JsonValue::Object(map) => map.values().any(has_placeholders),
        _ => false,
    }
}
