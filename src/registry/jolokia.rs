//! Registry connection through a Jolokia agent
//!
//! Jolokia exposes the JMX registry of a JVM as JSON over HTTP. Every request is a single POST of
//! a JSON object whose `type` selects the operation; the response carries its own `status` and,
//! on failure, an `error` message and `error_type`.

use super::{AttributeDescriptor, ObjectHandle, ObjectName, RegistryConnection, RegistryError, Value};
use core::time::Duration;
use serde::Deserialize;
use serde_json::{Value as Json, json};
use url::Url;

const USER_AGENT: &str = "jmx-query";

/// Credentials for an agent protected by HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A live connection to a Jolokia agent.
#[derive(Debug, Clone)]
pub struct JolokiaConnection {
    client: reqwest::Client,
    url: Url,
    credentials: Option<Credentials>,
    agent_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    status: u16,

    #[serde(default)]
    value: Json,

    #[serde(default)]
    error: Option<String>,

    #[serde(default)]
    error_type: Option<String>,
}

impl AgentResponse {
    fn is_success(&self) -> bool {
        self.status == 200
    }

    fn failure_reason(&self) -> String {
        let message = self.error.as_deref().unwrap_or("request failed");
        match &self.error_type {
            Some(error_type) => format!("{message} ({error_type}, status {})", self.status),
            None => format!("{message} (status {})", self.status),
        }
    }
}

impl JolokiaConnection {
    /// Open a connection and verify that the agent answers.
    pub async fn connect(url: &str, credentials: Option<Credentials>, options: &ConnectOptions) -> Result<Self, RegistryError> {
        let url = Url::parse(url).map_err(|e| RegistryError::Connection(format!("invalid agent URL '{url}': {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| RegistryError::Connection(format!("unable to create HTTP client: {e}")))?;

        let mut connection = Self {
            client,
            url,
            credentials,
            agent_version: None,
        };

        let response = connection.execute(&json!({ "type": "version" })).await?;
        if !response.is_success() {
            return Err(RegistryError::Connection(format!(
                "agent at '{}' rejected the session: {}",
                connection.url,
                response.failure_reason()
            )));
        }

        connection.agent_version = response.value.get("agent").and_then(Json::as_str).map(str::to_owned);
        log::info!(
            "connected to Jolokia agent {} at '{}'",
            connection.agent_version.as_deref().unwrap_or("(unknown version)"),
            connection.url
        );

        Ok(connection)
    }

    /// The version string reported by the agent, if any.
    #[must_use]
    pub fn agent_version(&self) -> Option<&str> {
        self.agent_version.as_deref()
    }

    /// Send one request. Transport failures and authentication rejections are connection errors.
    async fn execute(&self, request: &Json) -> Result<AgentResponse, RegistryError> {
        let mut builder = self.client.post(self.url.clone()).json(request);
        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.username, credentials.password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RegistryError::Connection(format!("request to '{}' failed: {e}", self.url)))?;

        let status = response.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Err(RegistryError::Connection(format!(
                "agent at '{}' refused the credentials (HTTP {status})",
                self.url
            )));
        }

        if !status.is_success() {
            return Err(RegistryError::Connection(format!("agent at '{}' returned HTTP {status}", self.url)));
        }

        response
            .json::<AgentResponse>()
            .await
            .map_err(|e| RegistryError::Connection(format!("invalid response from '{}': {e}", self.url)))
    }
}

impl RegistryConnection for JolokiaConnection {
    async fn query_objects(&self, pattern: &str) -> Result<Vec<ObjectHandle>, RegistryError> {
        let response = self.execute(&json!({ "type": "search", "mbean": pattern })).await?;
        if !response.is_success() {
            return Err(RegistryError::BadPattern {
                pattern: pattern.to_owned(),
                reason: response.failure_reason(),
            });
        }

        let names = response.value.as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(names.iter().filter_map(Json::as_str).map(ObjectHandle::new).collect())
    }

    async fn attribute_schema(&self, object: &ObjectHandle) -> Result<Vec<AttributeDescriptor>, RegistryError> {
        let fault = |reason: String| RegistryError::ObjectFault {
            object: object.name().to_owned(),
            reason,
        };

        let name = ObjectName::parse(object.name()).map_err(|e| fault(e.to_string()))?;
        let path = list_path(&name);

        let response = self.execute(&json!({ "type": "list", "path": path })).await?;
        if !response.is_success() {
            return Err(fault(response.failure_reason()));
        }

        let Some(attributes) = response.value.get("attr").and_then(Json::as_object) else {
            return Ok(Vec::new());
        };

        Ok(attributes
            .iter()
            .map(|(name, info)| {
                let mut descriptor = AttributeDescriptor::new(name.as_str(), info.get("type").and_then(Json::as_str));
                descriptor.description = info.get("desc").and_then(Json::as_str).map(str::to_owned);
                descriptor
            })
            .collect())
    }

    async fn attribute_value(&self, object: &ObjectHandle, attribute: &AttributeDescriptor) -> Result<Value, RegistryError> {
        let request = json!({ "type": "read", "mbean": object.name(), "attribute": attribute.name });
        let response = self.execute(&request).await?;
        if !response.is_success() {
            return Err(RegistryError::AttributeUnavailable {
                object: object.name().to_owned(),
                attribute: attribute.name.clone(),
                reason: response.failure_reason(),
            });
        }

        Ok(Value::from_json(attribute.type_name.as_deref(), response.value))
    }

    async fn disconnect(&self) {
        log::debug!("closing connection to '{}'", self.url);
    }
}

/// The path of one object in a `list` request: `<domain>/<key properties>`.
fn list_path(name: &ObjectName) -> String {
    let properties = name.properties().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",");
    format!("{}/{}", escape_path_segment(name.domain()), escape_path_segment(&properties))
}

/// Escape one segment of a Jolokia path.
fn escape_path_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '!' | '/' | '"') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}
