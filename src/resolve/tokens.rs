use super::Reading;
use crate::registry::{ObjectName, unquote};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("token pattern is valid"));

/// Replace `{token}` placeholders in `template` with values taken from `reading`.
///
/// Recognized tokens are `{attribute}`, `{attributeKey}`, `{domain}` and the key properties of
/// the object name, such as `{type}`. A recognized token whose value is absent is replaced by an
/// empty string; unrecognized tokens are left as written.
#[must_use]
pub fn replace_tokens(template: &str, reading: &Reading) -> String {
    if !template.contains('{') {
        return template.to_owned();
    }

    let object_name = ObjectName::parse(reading.object_identity.name()).ok();

    TOKEN
        .replace_all(template, |caps: &Captures<'_>| {
            let token = &caps[1];
            let replacement = match token {
                "attribute" => Some(reading.attribute.clone()),
                "attributeKey" => Some(reading.key.clone().unwrap_or_default()),
                "domain" => object_name.as_ref().map(|n| n.domain().to_owned()),
                property => object_name.as_ref().and_then(|n| n.property(property)).map(unquote),
            };

            replacement.unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}
