//! Per-parameter orchestration: presence rules, style selection, error
//! wrapping and schema validation.

use super::context::ParseContext;
use super::error::ParseError;
use super::schema::Schema;
use super::style::{decompose, decomposer_for, JsonContent};
use super::value::{ParamValue, RawValue};
use crate::spec::{ParameterLocation, ParameterMeta};
use crate::validator_cache::{validation_schema, ValidatorCache};
use serde_json::Value;
use tracing::{debug, warn};

/// Parses declared parameters of one operation.
///
/// Validation against the parameter schema runs only when a
/// [`ValidatorCache`] is attached.
#[derive(Debug, Clone, Copy)]
pub struct ParameterParser<'a> {
    validators: Option<&'a ValidatorCache>,
    route_key: &'a str,
}

impl Default for ParameterParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ParameterParser<'a> {
    /// A parser that coerces but does not validate.
    pub fn new() -> Self {
        Self {
            validators: None,
            route_key: "",
        }
    }

    pub fn with_validation(validators: &'a ValidatorCache, route_key: &'a str) -> Self {
        Self {
            validators: Some(validators),
            route_key,
        }
    }

    /// Parse one parameter.
    ///
    /// `raw` is what the transport extracted for it (`None` when absent);
    /// `content_type` is the request's `Content-Type`, used to pick the body
    /// schema out of a `content` map. Other parameters declared with
    /// `content` always use its first entry.
    pub fn parse(
        &self,
        param: &ParameterMeta,
        raw: Option<&RawValue>,
        content_type: Option<&str>,
    ) -> Result<Option<ParamValue>, ParseError> {
        let is_content_length = param.location == ParameterLocation::Header
            && param.name.eq_ignore_ascii_case("content-length");
        if is_content_length && raw.is_some_and(RawValue::is_empty_string) {
            return Err(ParseError::length_required(format!(
                "Missing required header parameter \"{}\"",
                param.name
            )));
        }

        let content_type = if param.location == ParameterLocation::Body {
            content_type
        } else {
            None
        };
        let selected = validation_schema(param, content_type);
        let schema = selected
            .map(|(_, json)| Schema::from_json(json))
            .unwrap_or_else(Schema::untyped);

        let raw = if param.location == ParameterLocation::Body {
            match raw {
                // Some body readers default to `{}` when nothing was sent.
                Some(r) if r.is_empty_object() => {
                    if schema.is_string() {
                        return self.finish(param, selected, ParamValue::String(String::new()), false);
                    }
                    None
                }
                Some(r) if r.is_empty_string() && schema.is_string() => {
                    return self.finish(param, selected, ParamValue::String(String::new()), false);
                }
                other => other,
            }
        } else {
            raw
        };

        let missing = raw.map_or(true, RawValue::is_missing);
        if missing {
            if param.required {
                let message = format!(
                    "Missing required {} parameter \"{}\"",
                    param.location, param.name
                );
                return Err(if is_content_length {
                    ParseError::length_required(message)
                } else {
                    ParseError::bad_request(message)
                });
            }
            if schema.default.is_none() {
                debug!(param = %param.name, location = %param.location, "Optional parameter absent");
                return Ok(None);
            }
        }

        let ctx = ParseContext::new(raw, param.name.clone());
        let parsed = if param.location == ParameterLocation::Body || param.content.is_some() {
            decompose(&JsonContent, &schema, &ctx)
        } else {
            let style = decomposer_for(param.effective_style(), param.effective_explode());
            decompose(style.as_ref(), &schema, &ctx)
        };

        match parsed {
            Ok(Some(value)) => self.finish(param, selected, value, missing),
            Ok(None) => Ok(None),
            Err(e) => {
                debug!(param = %param.name, location = %param.location, status = e.status, error = %e.message, "Parameter rejected");
                Err(e.wrap_parameter(&param.name, param.location))
            }
        }
    }

    /// Validate a coerced value against the declared schema.
    fn finish(
        &self,
        param: &ParameterMeta,
        selected: Option<(Option<&str>, &Value)>,
        value: ParamValue,
        from_default: bool,
    ) -> Result<Option<ParamValue>, ParseError> {
        if let (Some(validators), Some((media_type, schema_json))) = (self.validators, selected) {
            if !matches!(value, ParamValue::File(_)) {
                let instance = value.to_json();
                if let Err(violations) =
                    validators.validate(self.route_key, param, media_type, schema_json, &instance)
                {
                    let status = if from_default { 500 } else { 400 };
                    warn!(param = %param.name, location = %param.location, status, "Schema validation failed");
                    return Err(ParseError::new(
                        status,
                        format!("Error in {}. {violations}", param.name),
                    )
                    .wrap_parameter(&param.name, param.location));
                }
            }
        }
        Ok(Some(value))
    }
}

/// Parse one parameter without schema validation.
pub fn parse_parameter(
    param: &ParameterMeta,
    raw: Option<&RawValue>,
    content_type: Option<&str>,
) -> Result<Option<ParamValue>, ParseError> {
    ParameterParser::new().parse(param, raw, content_type)
}
