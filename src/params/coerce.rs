//! Primitive coercion: one untyped value to one typed [`ParamValue`].

use super::context::{resolve_default, ParseContext, Working};
use super::error::ParseError;
use super::schema::{Schema, SchemaKind, StringFormat};
use super::style::{decompose, JsonContent};
use super::value::{ParamValue, RawValue};
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine as _};
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("valid date regex")
});

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^[0-9]{4}-[0-9]{2}-[0-9]{2}t[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(z|[+-][0-9]{2}:[0-9]{2})$")
        .expect("valid date-time regex")
});

/// Standard alphabet, padding optional on input.
const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Coerce the context's value to the type `schema` declares.
///
/// A missing or empty value is replaced by `schema.default` when there is one
/// (and any failure from then on carries status 500); otherwise `Ok(None)`.
pub fn coerce(schema: &Schema, ctx: &ParseContext<'_>) -> Result<Option<ParamValue>, ParseError> {
    let (working, status) = resolve_default(schema, ctx);
    let ctx = ParseContext {
        status,
        ..ctx.clone()
    };
    match working {
        Working::Absent => Ok(None),
        Working::Supplied(raw) => coerce_present(schema, &ctx, raw).map(Some),
        Working::Default(raw) => coerce_present(schema, &ctx, &raw).map(Some),
    }
}

fn coerce_present(
    schema: &Schema,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    // Repeated scalar keys: last occurrence wins.
    if let RawValue::Json(Value::Array(items)) = raw {
        if !schema.is_composite() {
            if let Some(last) = items.last() {
                return coerce_present(schema, ctx, &RawValue::Json(last.clone()));
            }
        }
    }

    match &schema.kind {
        SchemaKind::Integer => coerce_integer(schema, ctx, raw),
        SchemaKind::Number => coerce_number(schema, ctx, raw),
        SchemaKind::Boolean => coerce_boolean(schema, ctx, raw),
        SchemaKind::String(format) => coerce_string(schema, *format, ctx, raw),
        SchemaKind::File => match raw {
            RawValue::File(file) => Ok(ParamValue::File(file.clone())),
            other => Err(ctx.error(schema, &other.to_string(), "is not a valid file upload")),
        },
        SchemaKind::Any => match raw {
            RawValue::Json(v) => ParamValue::from_json(v)
                .ok_or_else(|| ctx.error(schema, &raw.to_string(), "is missing")),
            RawValue::Bytes(bytes) => Ok(ParamValue::Bytes(bytes.clone())),
            RawValue::File(file) => Ok(ParamValue::File(file.clone())),
        },
        SchemaKind::Array(_) | SchemaKind::Object(_) => {
            let child = ParseContext {
                value: Some(raw),
                ..ctx.clone()
            };
            decompose(&JsonContent, schema, &child)?
                .ok_or_else(|| ctx.error(schema, &raw.to_string(), "is missing"))
        }
    }
}

fn coerce_integer(
    schema: &Schema,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    const SUFFIX: &str = "is not a whole number";
    let text = raw.to_string();
    let number = match raw {
        RawValue::Json(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(ParamValue::Integer(i));
            }
            n.as_f64()
        }
        RawValue::Json(Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(ParamValue::Integer(i));
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };

    match number {
        Some(x) if x.is_finite() && x.floor() == x => {
            if x >= i64::MIN as f64 && x < i64::MAX as f64 {
                Ok(ParamValue::Integer(x as i64))
            } else {
                Err(ctx.error(schema, &text, "is outside the supported integer range"))
            }
        }
        _ => Err(ctx.error(schema, &text, SUFFIX)),
    }
}

fn coerce_number(
    schema: &Schema,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    let number = match raw {
        RawValue::Json(Value::Number(n)) => n.as_f64(),
        RawValue::Json(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(x) if x.is_finite() => Ok(ParamValue::Number(x)),
        _ => Err(ctx.error(schema, &raw.to_string(), "is not a valid numeric value")),
    }
}

fn coerce_boolean(
    schema: &Schema,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    match raw {
        RawValue::Json(Value::Bool(b)) => Ok(ParamValue::Boolean(*b)),
        RawValue::Json(Value::String(s)) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(ParamValue::Boolean(true))
            } else if s.eq_ignore_ascii_case("false") {
                Ok(ParamValue::Boolean(false))
            } else {
                Err(ctx.error(schema, s, "is not a valid boolean value"))
            }
        }
        other => Err(ctx.error(schema, &other.to_string(), "is not a valid boolean value")),
    }
}

fn coerce_string(
    schema: &Schema,
    format: StringFormat,
    ctx: &ParseContext<'_>,
    raw: &RawValue,
) -> Result<ParamValue, ParseError> {
    let text = match raw {
        RawValue::Json(Value::String(s)) => s.clone(),
        RawValue::Json(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        RawValue::Bytes(bytes) => match format {
            StringFormat::Binary | StringFormat::Byte => return Ok(ParamValue::Bytes(bytes.clone())),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        },
        other => {
            return Err(ctx.error(schema, &other.to_string(), "is not a valid string value"));
        }
    };

    match format {
        StringFormat::Plain => Ok(ParamValue::String(text)),
        StringFormat::Byte => BASE64_LENIENT
            .decode(text.trim())
            .map(ParamValue::Bytes)
            .map_err(|_| ctx.error(schema, &text, "is not a valid base64 value")),
        StringFormat::Binary => Ok(ParamValue::Bytes(
            text.chars().map(|c| (c as u32 & 0xff) as u8).collect(),
        )),
        StringFormat::Date => {
            let caps = DATE_RE
                .captures(&text)
                .ok_or_else(|| ctx.error(schema, &text, "is not a valid date format"))?;
            let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let date = match (part(1), part(2), part(3)) {
                (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y as i32, m, d),
                _ => None,
            };
            date.map(ParamValue::Date)
                .ok_or_else(|| ctx.error(schema, &text, "is not a valid date"))
        }
        StringFormat::DateTime => {
            if !DATE_TIME_RE.is_match(&text) {
                return Err(ctx.error(schema, &text, "is not a valid date & time format"));
            }
            DateTime::parse_from_rfc3339(&text)
                .map(ParamValue::DateTime)
                .map_err(|_| ctx.error(schema, &text, "is not a valid date & time"))
        }
    }
}
