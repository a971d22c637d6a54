use super::error::ParseError;
use super::schema::Schema;
use super::value::RawValue;

/// Per-value parse state threaded through coercion and decomposition.
///
/// Contexts are immutable; nested values get a fresh child, so sibling
/// elements never see each other's path or status.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub value: Option<&'a RawValue>,
    pub path: String,
    pub status: u16,
}

impl<'a> ParseContext<'a> {
    pub fn new(value: Option<&'a RawValue>, path: impl Into<String>) -> Self {
        Self {
            value,
            path: path.into(),
            status: 400,
        }
    }

    pub fn child_key(&self, key: &str, value: Option<&'a RawValue>) -> ParseContext<'a> {
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        };
        ParseContext {
            value,
            path,
            status: self.status,
        }
    }

    pub fn child_index(&self, index: usize, value: Option<&'a RawValue>) -> ParseContext<'a> {
        ParseContext {
            value,
            path: format!("{}[{index}]", self.path),
            status: self.status,
        }
    }

    /// Label used in messages: the accumulated path, else the schema title.
    pub fn label<'s>(&'s self, schema: &'s Schema) -> &'s str {
        if !self.path.is_empty() {
            &self.path
        } else {
            schema.title.as_deref().unwrap_or("value")
        }
    }

    pub fn error(&self, schema: &Schema, value: &str, suffix: &str) -> ParseError {
        ParseError::invalid_value(self.status, self.label(schema), value, suffix)
    }
}

/// Outcome of default substitution for a single value.
pub(crate) enum Working<'a> {
    /// Nothing supplied and no default declared
    Absent,
    Supplied(&'a RawValue),
    /// The schema default, owned because it came from the document
    Default(RawValue),
}

/// Substitute `schema.default` when the value is missing, `""` or `null`.
///
/// Returns the status to use from here on: 500 once the default is in play,
/// so a default that fails to coerce is reported as a document bug.
pub(crate) fn resolve_default<'a>(schema: &Schema, ctx: &ParseContext<'a>) -> (Working<'a>, u16) {
    match ctx.value {
        Some(v) if !v.is_missing() => (Working::Supplied(v), ctx.status),
        _ => match &schema.default {
            Some(default) => (Working::Default(RawValue::Json(default.clone())), 500),
            None => (Working::Absent, ctx.status),
        },
    }
}
