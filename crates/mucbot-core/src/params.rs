//! Parameter sets handed to handler callbacks.
//!
//! The shape of a [`Params`] value is fixed by the handler's pattern, never
//! by the event content:
//!
//! - templates and literals produce [`Params::Named`]
//! - raw regular expressions produce [`Params::Positional`]
//! - handlers without a pattern produce [`Params::Text`]

/// Values captured by a template pattern.
///
/// Tokens keep their declaration order. A token whose capture group did not
/// take part in the match is present with no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedParams {
    values: Vec<(String, Option<String>)>,
    text: String,
}

impl NamedParams {
    /// Creates a named parameter set from token values and residual text.
    pub fn new(values: Vec<(String, Option<String>)>, text: impl Into<String>) -> Self {
        Self {
            values,
            text: text.into(),
        }
    }

    /// Returns the value captured for `name`.
    ///
    /// When a template repeats a token name, the first occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(token, _)| token == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns `true` if the template declared a token called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|(token, _)| token == name)
    }

    /// Residual text following the last captured token, trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Iterates over `(token, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(token, value)| (token.as_str(), value.as_deref()))
    }

    /// Number of declared tokens.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The parameters passed to a callback alongside the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// Token values from a template pattern plus the residual text.
    Named(NamedParams),
    /// Anonymous capture groups of a raw regular expression, in group order.
    Positional(Vec<Option<String>>),
    /// The full message text, for handlers without a pattern.
    Text(String),
}

impl Params {
    /// Looks up a named token value.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Self::Named(named) => named.get(name),
            _ => None,
        }
    }

    /// Returns the `text` entry: the residual text for named parameters or
    /// the whole message for pattern-less handlers.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Named(named) => Some(named.text()),
            Self::Text(text) => Some(text),
            Self::Positional(_) => None,
        }
    }

    /// Returns the `index`-th anonymous capture (zero-based).
    pub fn positional(&self, index: usize) -> Option<&str> {
        match self {
            Self::Positional(values) => values.get(index).and_then(|v| v.as_deref()),
            _ => None,
        }
    }

    /// Returns the first anonymous capture.
    pub fn first(&self) -> Option<&str> {
        self.positional(0)
    }

    pub fn as_named(&self) -> Option<&NamedParams> {
        match self {
            Self::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn as_positional(&self) -> Option<&[Option<String>]> {
        match self {
            Self::Positional(values) => Some(values),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_lookup() {
        let params = Params::Named(NamedParams::new(
            vec![
                ("city".into(), Some("oslo".into())),
                ("country".into(), None),
            ],
            "",
        ));

        assert_eq!(params.get("city"), Some("oslo"));
        assert_eq!(params.get("country"), None);
        assert!(params.as_named().unwrap().contains("country"));
        assert_eq!(params.get("zip"), None);
        assert_eq!(params.text(), Some(""));
        assert_eq!(params.positional(0), None);
    }

    #[test]
    fn test_positional_lookup() {
        let params = Params::Positional(vec![Some("oslo".into()), None]);
        assert_eq!(params.first(), Some("oslo"));
        assert_eq!(params.positional(1), None);
        assert_eq!(params.text(), None);
        assert_eq!(params.get("oslo"), None);
    }

    #[test]
    fn test_text_only() {
        let params = Params::Text("hello there".into());
        assert_eq!(params.text(), Some("hello there"));
        assert!(params.as_named().is_none());
    }
}
