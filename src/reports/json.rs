use super::ErrorCode;
use crate::Result;
use crate::resolve::Reading;
use core::fmt::Write;
use serde_json::{Value as Json, json};

/// Write `readings` as a JSON array.
///
/// Metric name and label tokens are replaced before output.
pub fn generate<W: Write>(readings: &[Reading], pretty: bool, writer: &mut W) -> Result<()> {
    let output = Json::Array(readings.iter().map(|r| reading_to_json(r.clone().with_tokens_replaced())).collect());
    write_json(&output, pretty, writer)
}

/// Write a single `{error, message}` object.
pub fn generate_error<W: Write>(code: ErrorCode, message: &str, writer: &mut W) -> Result<()> {
    let code: &str = code.into();
    write_json(&json!({ "error": code, "message": message }), false, writer)
}

fn reading_to_json(reading: Reading) -> Json {
    let value_kind = reading.kind().to_string();
    let value = reading.value.to_json();

    json!({
        "objectIdentity": reading.object_identity.name(),
        "attribute": reading.attribute,
        "attributeType": reading.attribute_type,
        "key": reading.key,
        "metricName": reading.metric_name,
        "metricLabels": reading.metric_labels,
        "valueKind": value_kind,
        "value": value,
    })
}

fn write_json<W: Write>(value: &Json, pretty: bool, writer: &mut W) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    writeln!(writer, "{text}")?;
    Ok(())
}
