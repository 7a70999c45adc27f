//! Transport descriptors: how to reach an agent's runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a protocol runtime is reached.
///
/// Maps are `BTreeMap` so serialization is ordered and content hashes over a
/// descriptor are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportDescriptor {
    /// A local process speaking line-delimited JSON-RPC on stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    /// A remote endpoint reached over HTTP.
    Network {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl TransportDescriptor {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        TransportDescriptor::Stdio {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn network(url: impl Into<String>) -> Self {
        TransportDescriptor::Network {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    pub fn is_stdio(&self) -> bool {
        matches!(self, TransportDescriptor::Stdio { .. })
    }

    /// Timeout declared by the descriptor itself, if any.
    pub fn declared_timeout_ms(&self) -> Option<u64> {
        match self {
            TransportDescriptor::Stdio { .. } => None,
            TransportDescriptor::Network { timeout_ms, .. } => *timeout_ms,
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportDescriptor::Stdio { command, args, .. } if args.is_empty() => {
                write!(f, "stdio:{command}")
            }
            TransportDescriptor::Stdio { command, args, .. } => {
                write!(f, "stdio:{command} {}", args.join(" "))
            }
            TransportDescriptor::Network { url, .. } => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_serialization() {
        let stdio = TransportDescriptor::stdio("npx", vec!["-y".into(), "server".into()]);
        assert_eq!(
            serde_json::to_value(&stdio).unwrap(),
            json!({"type": "stdio", "command": "npx", "args": ["-y", "server"]})
        );

        let net: TransportDescriptor = serde_json::from_value(json!({
            "type": "network",
            "url": "https://agents.example.com/mcp",
            "headers": {"X-Team": "research"},
            "timeout_ms": 5000
        }))
        .unwrap();
        assert_eq!(net.declared_timeout_ms(), Some(5000));
        assert!(!net.is_stdio());
        assert_eq!(net.to_string(), "https://agents.example.com/mcp");
    }
}
