//! The flat, all-strings wire message.
//!
//! One JSON object per connection (§6 of the wire format): requests,
//! responses, and inter-replica acks/broadcasts all share this single
//! shape, with unused fields simply absent. Every value on the wire is a
//! string, including numbers, matching the source system's convention of
//! rendering everything through `fmt.Sprintf`.

use kv_types::{Dependency, Key, Op, Value, Version};
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// The literal wire shape. Construct one with the `request_*`/`response_*`/
/// `ack` helpers below rather than building it field-by-field; the helpers
/// keep the string encodings (decimal timestamps, stringified dependency)
/// consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(
        rename = "totalOrderTimestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_order_timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,

    #[serde(rename = "minVersion", skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// The sentinel the coordinator sends back on an unrecognized `op`, matching
/// the source system's literal client-error string.
pub const CLIENT_ERROR: &str = "Client Error!";

impl WireMessage {
    pub fn request_get(key: &Key, min_version: Option<Version>) -> Self {
        Self {
            op: Some(Op::Get.as_str().to_owned()),
            key: Some(key.to_string()),
            min_version: min_version.map(|v| v.get().to_string()),
            ..Self::default()
        }
    }

    pub fn request_set(key: &Key, value: &Value, dependency: Option<&Dependency>) -> Self {
        Self {
            op: Some(Op::Set.as_str().to_owned()),
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            dependency: dependency.map(encode_dependency),
            ..Self::default()
        }
    }

    pub fn response_value(value: &Value, version: Option<Version>) -> Self {
        Self {
            value: Some(value.to_string()),
            version: version.map(|v| v.get().to_string()),
            ..Self::default()
        }
    }

    pub fn response_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn client_error() -> Self {
        Self::response_error(CLIENT_ERROR)
    }

    pub fn ack(id: &str) -> Self {
        Self {
            id: Some(id.to_owned()),
            ack: Some("ok".to_owned()),
            ..Self::default()
        }
    }

    pub fn is_ack(&self) -> bool {
        self.ack.as_deref() == Some("ok")
    }

    pub fn op(&self) -> Result<Op, WireError> {
        let raw = self.op.as_deref().ok_or(WireError::MissingField("op"))?;
        Op::parse(raw).ok_or_else(|| WireError::InvalidOp(raw.to_owned()))
    }

    pub fn key(&self) -> Result<Key, WireError> {
        self.key
            .as_deref()
            .map(Key::from)
            .ok_or(WireError::MissingField("key"))
    }

    pub fn value(&self) -> Result<Value, WireError> {
        self.value
            .as_deref()
            .map(Value::from)
            .ok_or(WireError::MissingField("value"))
    }

    pub fn version(&self) -> Result<Option<Version>, WireError> {
        parse_optional_u64(self.version.as_deref(), "version").map(|v| v.map(Version::new))
    }

    pub fn min_version(&self) -> Result<Version, WireError> {
        match &self.min_version {
            None => Ok(Version::ZERO),
            Some(raw) => raw
                .parse::<u64>()
                .map(Version::new)
                .map_err(|_| WireError::InvalidNumber {
                    field: "minVersion",
                    value: raw.clone(),
                }),
        }
    }

    pub fn dependency(&self) -> Result<Option<Dependency>, WireError> {
        self.dependency.as_deref().map(decode_dependency).transpose()
    }
}

fn parse_optional_u64(raw: Option<&str>, field: &'static str) -> Result<Option<u64>, WireError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| WireError::InvalidNumber {
                field,
                value: raw.to_owned(),
            }),
    }
}

#[derive(Serialize, Deserialize)]
struct DependencyWire {
    key: String,
    version: String,
}

fn encode_dependency(dep: &Dependency) -> String {
    let wire = DependencyWire {
        key: dep.key.to_string(),
        version: dep.version.get().to_string(),
    };
    serde_json::to_string(&wire).expect("dependency serialization is infallible")
}

fn decode_dependency(raw: &str) -> Result<Dependency, WireError> {
    let wire: DependencyWire = serde_json::from_str(raw)?;
    let version = wire
        .version
        .parse::<u64>()
        .map_err(|_| WireError::InvalidNumber {
            field: "dependency.version",
            value: wire.version,
        })?;
    Ok(Dependency::new(Key::from(wire.key), Version::new(version)))
}
