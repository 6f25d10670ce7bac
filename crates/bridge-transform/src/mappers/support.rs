//! Helpers shared by the built-in mappers.

use crate::{MappingError, TransformationContext};
use bridge_canonical::{
    CanonicalCustomField, CanonicalUser, ExecutionStatus, Payload, PayloadExt, Priority,
    TestCaseStatus, value_to_string,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Canonical enums a provider label can resolve to. `Default` is the value a
/// mapper falls back to for labels it does not understand.
pub(crate) trait LenientLabel: Copy + PartialEq + Default {
    fn parse_token(raw: &str) -> Option<Self>;
    fn token(self) -> &'static str;
}

macro_rules! lenient_label {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl LenientLabel for $ty {
                fn parse_token(raw: &str) -> Option<Self> {
                    <$ty>::parse_lenient(raw)
                }

                fn token(self) -> &'static str {
                    self.as_str()
                }
            }
        )+
    };
}

lenient_label!(TestCaseStatus, Priority, ExecutionStatus);

/// Provider label to canonical value. The first entry for a value is its
/// preferred outbound label.
pub(crate) type LabelTable<T> = &'static [(&'static str, T)];

pub(crate) fn lookup_label<T: Copy>(table: LabelTable<T>, raw: &str) -> Option<T> {
    let needle = raw.trim();
    table
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(needle))
        .map(|(_, value)| *value)
}

pub(crate) fn label_for<T: Copy + PartialEq>(table: LabelTable<T>, value: T) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, candidate)| *candidate == value)
        .map(|(label, _)| *label)
}

/// Resolves a provider label: value mappings first, then the provider table,
/// then the canonical token itself, then the default.
pub(crate) fn resolve_label<T: LenientLabel>(
    table: LabelTable<T>,
    raw: Option<&str>,
    field: &str,
    context: &TransformationContext,
) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    let mapped = context.map_value(field, raw);
    lookup_label(table, mapped)
        .or_else(|| T::parse_token(mapped))
        .unwrap_or_default()
}

/// Reports a source label that, after `context`'s value mapping for
/// `field`, was not understood and therefore landed on the default.
pub(crate) fn fallback_message<T: LenientLabel>(
    table: LabelTable<T>,
    raw: Option<&str>,
    field: &str,
    kind: &str,
    context: &TransformationContext,
) -> Option<String> {
    let raw = raw?;
    let mapped = context.map_value(field, raw);
    if lookup_label(table, mapped).is_some() || T::parse_token(mapped).is_some() {
        return None;
    }
    let fallback = T::default().token();
    if mapped == raw {
        Some(format!("Unrecognized {kind} '{raw}' mapped to {fallback}"))
    } else {
        Some(format!(
            "Unrecognized {kind} '{mapped}' (value mapping of '{raw}') mapped to {fallback}"
        ))
    }
}

pub(crate) fn require_string(payload: &Payload, field: &str) -> Result<String, MappingError> {
    match payload.get_string(field) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MappingError::missing(field)),
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Reads a user reference given as an id, or as an object carrying one.
pub(crate) fn user_from_value(value: &Value) -> Option<CanonicalUser> {
    match value {
        Value::Object(object) => {
            let id = object
                .get_string("id")
                .or_else(|| object.get_string("accountId"))
                .or_else(|| object.get_string("username"))?;
            Some(CanonicalUser {
                id,
                username: object.get_string("username"),
                email: object.get_string("email"),
                display_name: object
                    .get_string("displayName")
                    .or_else(|| object.get_string("name")),
            })
        }
        other => non_empty(value_to_string(other)).map(CanonicalUser::with_id),
    }
}

pub(crate) fn user_field(payload: &Payload, field: &str) -> Option<CanonicalUser> {
    payload.get(field).and_then(user_from_value)
}

pub(crate) fn user_to_value(user: &CanonicalUser) -> Value {
    Value::String(user.id.clone())
}

/// Applies value mappings to string custom-field values.
pub(crate) fn inbound_custom_field(
    name: &str,
    value: &Value,
    context: &TransformationContext,
) -> CanonicalCustomField {
    let value = match value {
        Value::String(text) => Value::String(context.map_value(name, text).to_string()),
        other => other.clone(),
    };
    CanonicalCustomField::infer(name, value)
}

/// Custom fields as a name-keyed object, names passed through the field
/// mappings.
pub(crate) fn outbound_custom_fields(
    fields: &[CanonicalCustomField],
    context: &TransformationContext,
) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            (
                context.map_field_name(&field.name).to_string(),
                field.value.clone(),
            )
        })
        .collect()
}

pub(crate) fn objects<'a>(payload: &'a Payload, field: &str) -> Vec<&'a Payload> {
    payload
        .get_array(field)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

pub(crate) fn strings(payload: &Payload, field: &str) -> Vec<String> {
    payload
        .get_array(field)
        .map(|items| items.iter().filter_map(value_to_string).collect())
        .unwrap_or_default()
}
