/// Payload focus for a mission.
/// The payload kind decides which component families the mission builder
/// offers; every catalog component is tagged with exactly one kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Commercial,
    Infrastructure,
}

impl PayloadKind {
    pub fn all() -> &'static [PayloadKind] {
        &[PayloadKind::Commercial, PayloadKind::Infrastructure]
    }

    /// Wire/storage id
    pub fn id(&self) -> &'static str {
        match self {
            PayloadKind::Commercial => "commercial",
            PayloadKind::Infrastructure => "infrastructure",
        }
    }

    pub fn payload_type(&self) -> &'static PayloadType {
        PAYLOAD_TYPES
            .iter()
            .find(|p| p.kind == *self)
            .expect("every payload kind has a table entry")
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PayloadKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commercial" => Ok(PayloadKind::Commercial),
            "infrastructure" => Ok(PayloadKind::Infrastructure),
            _ => Err(ValidationError::UnknownKey {
                kind: "payload type",
                key: s.to_string(),
            }),
        }
    }
}

/// Payload type reference data
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadType {
    pub kind: PayloadKind,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const PAYLOAD_TYPES: &[PayloadType] = &[
    PayloadType {
        kind: PayloadKind::Commercial,
        name: "Commercial Payload",
        icon: "💼",
        description: "Revenue-generating commercial space missions",
    },
    PayloadType {
        kind: PayloadKind::Infrastructure,
        name: "Infrastructure Payload",
        icon: "🏗️",
        description: "Long-term space infrastructure development",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_lookup() {
        assert_eq!(
            PayloadKind::Commercial.payload_type().name,
            "Commercial Payload"
        );
        assert_eq!(
            PayloadKind::Infrastructure.payload_type().name,
            "Infrastructure Payload"
        );
    }

    #[test]
    fn test_parse_payload_kind() {
        assert_eq!(
            "Infrastructure".parse::<PayloadKind>().unwrap(),
            PayloadKind::Infrastructure
        );
        assert!("military".parse::<PayloadKind>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_id() {
        let json = serde_json::to_string(&PayloadKind::Commercial).unwrap();
        assert_eq!(json, "\"commercial\"");
    }
}
