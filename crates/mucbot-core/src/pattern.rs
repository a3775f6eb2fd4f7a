//! Pattern compiler.
//!
//! Turns a [`PatternSpec`] into a [`CompiledPattern`]: a regular expression
//! plus the ordered list of token names it captures.
//!
//! # Templates
//!
//! A template is plain text in which every whitespace-separated word of the
//! form `:identifier` is a token. The template is walked once and split into
//! [`Segment`]s, which are then rendered into a single expression:
//!
//! ```text
//! "time :city :country"
//!   -> [Literal("time "), Token("city"), Literal(" "), Token("country")]
//!   -> time (?P<__tok0>[^\s]+) (?P<__tok1>[^\s]+)
//! ```
//!
//! Literal segments are copied verbatim, so they keep any regex meaning they
//! happen to have (`.answer` matches `xanswer` too). Use
//! [`PatternSpec::literal`] when the text must be matched character for
//! character.
//!
//! Each token is rendered as a uniquely named group. Token values are read
//! back by group name, so groups inside a token override never shift the
//! position of later tokens.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use regex::{Captures, Regex};

use crate::error::{PatternError, PatternResult};
use crate::params::{NamedParams, Params};

/// Expression used for tokens without an override: one or more
/// non-whitespace characters.
pub const DEFAULT_TOKEN_PATTERN: &str = r"[^\s]+";

/// Prefix of the capture groups generated for tokens.
const TOKEN_GROUP_PREFIX: &str = "__tok";

/// Per-token expression overrides, keyed by token name.
pub type TokenOverrides = BTreeMap<String, String>;

// ============================================================================
// Pattern Specification
// ============================================================================

/// The source a pattern is built from.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches every event.
    Any,
    /// Text matched literally, without tokens.
    Literal(String),
    /// Text with `:name` tokens.
    Template(String),
    /// A caller-supplied regular expression with anonymous captures.
    Regex(Regex),
}

/// A pattern together with its anchoring mode.
///
/// Converting from `&str` treats the text as a template, and the empty
/// string as [`Pattern::Any`]:
///
/// ```rust,ignore
/// let spec: PatternSpec = "!tw :id".into();
/// let quit = PatternSpec::exact("!quit");
/// let url = PatternSpec::regex_str(r"(https?://\S+)")?;
/// ```
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pattern: Pattern,
    exact: bool,
}

impl PatternSpec {
    /// A pattern that matches everything.
    pub fn any() -> Self {
        Self {
            pattern: Pattern::Any,
            exact: false,
        }
    }

    /// Text matched literally (regex metacharacters are escaped).
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            pattern: if text.is_empty() {
                Pattern::Any
            } else {
                Pattern::Literal(text)
            },
            exact: false,
        }
    }

    /// A template with `:name` tokens.
    pub fn template(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            pattern: if text.is_empty() {
                Pattern::Any
            } else {
                Pattern::Template(text)
            },
            exact: false,
        }
    }

    /// A template that must match the whole message.
    pub fn exact(text: impl Into<String>) -> Self {
        Self::template(text).with_exact(true)
    }

    /// A compiled regular expression.
    pub fn regex(regex: Regex) -> Self {
        Self {
            pattern: Pattern::Regex(regex),
            exact: false,
        }
    }

    /// Parses a raw regular expression.
    pub fn regex_str(source: &str) -> PatternResult<Self> {
        let regex = Regex::new(source).map_err(|e| PatternError::compile(source, e))?;
        Ok(Self::regex(regex))
    }

    /// Sets whether the pattern must match the entire message.
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Returns the textual source of the pattern, for diagnostics.
    pub fn source(&self) -> &str {
        match &self.pattern {
            Pattern::Any => "",
            Pattern::Literal(text) | Pattern::Template(text) => text,
            Pattern::Regex(regex) => regex.as_str(),
        }
    }

    /// Compiles this specification.
    ///
    /// Returns `Ok(None)` for [`Pattern::Any`]. `overrides` supplies the
    /// expression used for individual template tokens.
    pub fn compile(&self, overrides: &TokenOverrides) -> PatternResult<Option<CompiledPattern>> {
        let (source, tokens, mode) = match &self.pattern {
            Pattern::Any => return Ok(None),
            // Kept as built so `RegexBuilder` options survive; exactness is
            // checked on the match span instead.
            Pattern::Regex(regex) => {
                return Ok(Some(
                    CompiledPattern::positional(regex.clone()).whole_input(self.exact),
                ));
            }
            Pattern::Literal(text) => (regex::escape(text), Vec::new(), CaptureMode::Named),
            Pattern::Template(text) => {
                let (source, tokens) = render(&tokenize(text), overrides);
                (source, tokens, CaptureMode::Named)
            }
        };

        let source = if self.exact {
            format!(r"\A(?:{source})\z")
        } else {
            source
        };

        let regex = Regex::new(&source).map_err(|e| PatternError::compile(self.source(), e))?;
        Ok(Some(CompiledPattern::new(regex, tokens, mode)))
    }
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self::any()
    }
}

impl From<&str> for PatternSpec {
    fn from(text: &str) -> Self {
        Self::template(text)
    }
}

impl From<String> for PatternSpec {
    fn from(text: String) -> Self {
        Self::template(text)
    }
}

impl From<Regex> for PatternSpec {
    fn from(regex: Regex) -> Self {
        Self::regex(regex)
    }
}

impl From<&Regex> for PatternSpec {
    fn from(regex: &Regex) -> Self {
        Self::regex(regex.clone())
    }
}

// ============================================================================
// Template Tokenizer
// ============================================================================

/// One node of a tokenized template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied into the expression as-is, whitespace included.
    Literal(&'a str),
    /// A `:name` token, without the colon.
    Token(&'a str),
}

/// Splits a template into literal and token segments.
///
/// Adjacent literal text (words and the whitespace between them) is kept in
/// one segment; empty literals are never emitted.
pub fn tokenize(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;

    for (start, end) in word_spans(template) {
        let Some(name) = token_name(&template[start..end]) else {
            continue;
        };

        if literal_start < start {
            segments.push(Segment::Literal(&template[literal_start..start]));
        }
        segments.push(Segment::Token(name));
        literal_start = end;
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }

    segments
}

/// Byte ranges of the whitespace-separated words of `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start = None;

    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                spans.push((start, i));
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }

    if let Some(start) = word_start {
        spans.push((start, text.len()));
    }

    spans
}

/// Returns the token name if `word` has the shape `:identifier`.
fn token_name(word: &str) -> Option<&str> {
    let name = word.strip_prefix(':')?;
    let mut chars = name.chars();
    let first = chars.next()?;

    if (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some(name)
    } else {
        None
    }
}

/// Renders segments into an expression and the ordered token list.
fn render(segments: &[Segment<'_>], overrides: &TokenOverrides) -> (String, Vec<String>) {
    let mut source = String::new();
    let mut tokens = Vec::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => source.push_str(text),
            Segment::Token(name) => {
                let body = overrides
                    .get(*name)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_TOKEN_PATTERN);
                let _ = write!(
                    source,
                    "(?P<{TOKEN_GROUP_PREFIX}{}>{body})",
                    tokens.len()
                );
                tokens.push((*name).to_string());
            }
        }
    }

    (source, tokens)
}

// ============================================================================
// Compiled Pattern
// ============================================================================

/// How captured values are exposed to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Template or literal: named tokens plus residual text.
    Named,
    /// Raw regex: anonymous groups in order.
    Positional,
}

/// A compiled matcher and the tokens it captures.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    tokens: Vec<String>,
    /// Capture group index of each token, parallel to `tokens`.
    groups: Vec<usize>,
    mode: CaptureMode,
    /// The leftmost match must span the entire input.
    whole_input: bool,
}

impl CompiledPattern {
    fn new(regex: Regex, tokens: Vec<String>, mode: CaptureMode) -> Self {
        let groups = (0..tokens.len())
            .map(|i| {
                let group = format!("{TOKEN_GROUP_PREFIX}{i}");
                regex
                    .capture_names()
                    .position(|name| name == Some(group.as_str()))
                    .unwrap_or(usize::MAX)
            })
            .collect();

        Self {
            regex,
            tokens,
            groups,
            mode,
            whole_input: false,
        }
    }

    fn positional(regex: Regex) -> Self {
        Self::new(regex, Vec::new(), CaptureMode::Positional)
    }

    fn whole_input(mut self, whole_input: bool) -> Self {
        self.whole_input = whole_input;
        self
    }

    /// Runs the regex, rejecting a partial match when the whole input is
    /// required.
    ///
    /// Only the leftmost-first match is considered, so for exact raw regexes
    /// `a|ab` does not match `ab`; order such alternations longest first.
    fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        let captures = self.regex.captures(text)?;
        if self.whole_input {
            let full = captures.get(0)?;
            if full.start() != 0 || full.end() != text.len() {
                return None;
            }
        }
        Some(captures)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Token names in capture order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Returns `true` if `text` matches.
    pub fn is_match(&self, text: &str) -> bool {
        if self.whole_input {
            self.captures(text).is_some()
        } else {
            self.regex.is_match(text)
        }
    }

    /// Matches `text` and builds the parameter set, or `None` on no match.
    pub fn extract(&self, text: &str) -> Option<Params> {
        let captures = self.captures(text)?;

        match self.mode {
            CaptureMode::Positional => Some(Params::Positional(
                captures
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect(),
            )),
            CaptureMode::Named => {
                let mut last_token_end = None;
                let mut values = Vec::with_capacity(self.tokens.len());

                for (token, &group) in self.tokens.iter().zip(&self.groups) {
                    let value = captures.get(group);
                    if let Some(m) = value {
                        last_token_end = Some(m.end());
                    }
                    values.push((token.clone(), value.map(|m| m.as_str().to_string())));
                }

                // Without a captured token the residual starts after the match.
                let residual_from = last_token_end
                    .unwrap_or_else(|| captures.get(0).map_or(0, |m| m.end()));
                let residual = text[residual_from..].trim();
                Some(Params::Named(NamedParams::new(values, residual)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn compile(spec: impl Into<PatternSpec>) -> CompiledPattern {
        let spec: PatternSpec = spec.into();
        spec.compile(&TokenOverrides::new())
            .unwrap()
            .expect("pattern")
    }

    fn named(params: Params) -> NamedParams {
        params.as_named().cloned().expect("named params")
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let overrides = TokenOverrides::new();
        assert!(PatternSpec::from("").compile(&overrides).unwrap().is_none());
        assert!(PatternSpec::any().compile(&overrides).unwrap().is_none());
        assert!(PatternSpec::literal("").compile(&overrides).unwrap().is_none());
    }

    #[test]
    fn test_tokenize_keeps_whitespace_in_literals() {
        let segments = tokenize(":command fixed_word  :subcommand");
        assert_eq!(
            segments,
            vec![
                Segment::Token("command"),
                Segment::Literal(" fixed_word  "),
                Segment::Token("subcommand"),
            ]
        );
    }

    #[test]
    fn test_tokenize_ignores_non_identifier_colons() {
        let segments = tokenize("see : or :42 or a:b");
        assert_eq!(segments, vec![Segment::Literal("see : or :42 or a:b")]);
    }

    #[test]
    fn test_plain_word_has_no_tokens() {
        let pattern = compile("command");
        assert!(pattern.tokens().is_empty());
        assert_eq!(pattern.regex().as_str(), "command");
        assert!(pattern.is_match("run command now"));
    }

    #[test]
    fn test_single_token() {
        let pattern = compile(":command");
        assert_eq!(pattern.tokens(), ["command"]);
        assert_eq!(pattern.regex().as_str(), r"(?P<__tok0>[^\s]+)");
    }

    #[test]
    fn test_several_tokens() {
        let pattern = compile(":command fixed_word :subcommand");
        assert_eq!(pattern.tokens(), ["command", "subcommand"]);
        assert_eq!(
            pattern.regex().as_str(),
            r"(?P<__tok0>[^\s]+) fixed_word (?P<__tok1>[^\s]+)"
        );
    }

    #[test]
    fn test_token_override() {
        let mut overrides = TokenOverrides::new();
        overrides.insert("hour".into(), r"\d\d".into());

        let pattern = PatternSpec::from(":time :hour")
            .compile(&overrides)
            .unwrap()
            .unwrap();

        assert_eq!(
            pattern.regex().as_str(),
            r"(?P<__tok0>[^\s]+) (?P<__tok1>\d\d)"
        );
        assert!(pattern.is_match("now 12"));
        assert!(!pattern.is_match("now noon"));
    }

    #[test]
    fn test_override_groups_do_not_shift_tokens() {
        let mut overrides = TokenOverrides::new();
        overrides.insert("first".into(), r"(a|b)+".into());

        let pattern = PatternSpec::from(":first :second")
            .compile(&overrides)
            .unwrap()
            .unwrap();

        let params = named(pattern.extract("abab tail").unwrap());
        assert_eq!(params.get("first"), Some("abab"));
        assert_eq!(params.get("second"), Some("tail"));
    }

    #[test]
    fn test_params_with_fixed_word() {
        let pattern = compile(":a fixed :b");

        let params = named(pattern.extract("x fixed y").unwrap());
        assert_eq!(params.get("a"), Some("x"));
        assert_eq!(params.get("b"), Some("y"));
        assert_eq!(params.text(), "");

        let params = named(pattern.extract("x fixed y trailing words").unwrap());
        assert_eq!(params.get("a"), Some("x"));
        assert_eq!(params.get("b"), Some("y"));
        assert_eq!(params.text(), "trailing words");
    }

    #[test]
    fn test_residual_without_tokens() {
        let pattern = compile("time");
        let params = named(pattern.extract("time oslo norway").unwrap());
        assert!(params.is_empty());
        assert_eq!(params.text(), "oslo norway");
    }

    #[test]
    fn test_non_participating_token_is_absent() {
        let mut overrides = TokenOverrides::new();
        overrides.insert("b".into(), r"\d+)?(?:".into());

        // `(?P<__tok1>\d+)?(?:)` leaves the second token optional.
        let pattern = PatternSpec::from(":a :b")
            .compile(&overrides)
            .unwrap()
            .unwrap();

        let params = named(pattern.extract("word ").unwrap());
        assert_eq!(params.get("a"), Some("word"));
        assert_eq!(params.get("b"), None);
        assert!(params.contains("b"));
    }

    #[test]
    fn test_exact_requires_whole_input() {
        let pattern = compile(PatternSpec::exact("!quit"));
        assert!(pattern.is_match("!quit"));
        assert!(!pattern.is_match("  !quit  "));
        assert!(!pattern.is_match("!quit now"));
        assert!(!pattern.is_match("!quit\n"));
    }

    #[test]
    fn test_exact_scopes_alternation() {
        let pattern = compile(PatternSpec::exact("yes|no"));
        assert!(pattern.is_match("no"));
        assert!(!pattern.is_match("yes please"));
    }

    #[test]
    fn test_literal_is_escaped() {
        let pattern = compile(PatternSpec::literal("1+1 :x"));
        assert!(pattern.tokens().is_empty());
        assert!(pattern.is_match("is 1+1 :x ?"));
        assert!(!pattern.is_match("11 :x"));

        let exact = compile(PatternSpec::literal("a.b").with_exact(true));
        assert!(exact.is_match("a.b"));
        assert!(!exact.is_match("axb"));
    }

    #[test]
    fn test_template_words_keep_regex_meaning() {
        let pattern = compile(".answer :me");
        assert!(pattern.is_match("xanswer 42"));
    }

    #[test]
    fn test_regex_positional() {
        let pattern = compile(Regex::new(r"time ([^\s]*) ([^\s]*)").unwrap());
        assert_eq!(pattern.mode(), CaptureMode::Positional);
        assert!(pattern.tokens().is_empty());

        let params = pattern.extract("time oslo norway").unwrap();
        assert_eq!(params.positional(0), Some("oslo"));
        assert_eq!(params.positional(1), Some("norway"));
    }

    #[test]
    fn test_regex_case_insensitive() {
        let pattern = compile(Regex::new(r"(?i)(?:what|where) is (.*)").unwrap());
        assert!(pattern.is_match("Where is this?"));
        assert!(!pattern.is_match("How is this?"));
    }

    #[test]
    fn test_exact_regex() {
        let spec = PatternSpec::regex_str(r"ping|pong").unwrap().with_exact(true);
        let pattern = compile(spec);
        assert!(pattern.is_match("pong"));
        assert!(!pattern.is_match("ping pong"));
    }

    #[test]
    fn test_exact_regex_keeps_builder_options() {
        let regex = RegexBuilder::new("qu(it)").case_insensitive(true).build().unwrap();

        let plain = compile(regex.clone());
        let exact = compile(PatternSpec::regex(regex).with_exact(true));

        assert!(plain.is_match("QUIT now"));
        assert!(exact.is_match("QUIT"));
        assert!(!exact.is_match("QUIT now"));
        assert!(!exact.is_match(" quit"));
        assert_eq!(exact.extract("Quit").unwrap().first(), Some("it"));
    }

    #[test]
    fn test_invalid_regex_names_pattern() {
        let err = PatternSpec::regex_str(r"(unclosed").unwrap_err();
        assert_eq!(err.pattern(), "(unclosed");
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_invalid_template_fails_at_compile() {
        let err = PatternSpec::from("oops :x (")
            .compile(&TokenOverrides::new())
            .unwrap_err();
        assert_eq!(err.pattern(), "oops :x (");
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let first = compile("time :city :country");
        let second = compile("time :city :country");

        assert_eq!(first.tokens(), second.tokens());
        assert_eq!(first.regex().as_str(), second.regex().as_str());
        for input in ["time oslo norway", "no match", "time a b c"] {
            assert_eq!(first.extract(input), second.extract(input));
        }
    }
}
