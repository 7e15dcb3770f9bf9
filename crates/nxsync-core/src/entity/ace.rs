// # Access Control Entries
//
// One ACE is one rule line in an ACL. The device only accepts the rule as a
// whole, so every ACE property is written through the `ace_set` combined
// call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CombinedCall, Entity};
use crate::error::{Error, Result};
use crate::model::{CallParams, Property, PropertySpec, ValueKind, WriteMode};

/// Address family of an ACL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Afi {
    Ipv4,
    Ipv6,
}

impl fmt::Display for Afi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Afi::Ipv4 => f.write_str("ipv4"),
            Afi::Ipv6 => f.write_str("ipv6"),
        }
    }
}

impl FromStr for Afi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ipv4" => Ok(Afi::Ipv4),
            "ipv6" => Ok(Afi::Ipv6),
            other => Err(Error::invalid_input(format!(
                "unknown address family '{other}', expected ipv4 or ipv6"
            ))),
        }
    }
}

/// Identity of one ACE: address family, ACL name and sequence number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AceKey {
    pub afi: Afi,
    pub acl_name: String,
    pub seqno: u32,
}

impl AceKey {
    pub fn new(afi: Afi, acl_name: impl Into<String>, seqno: u32) -> Self {
        Self {
            afi,
            acl_name: acl_name.into(),
            seqno,
        }
    }
}

impl fmt::Display for AceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.afi, self.acl_name, self.seqno)
    }
}

/// Parses the resource title form `"<afi> <acl_name> <seqno>"`
impl FromStr for AceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [afi, acl_name, seqno] = parts.as_slice() else {
            return Err(Error::invalid_input(format!(
                "ACE name '{s}' must be '<afi> <acl_name> <seqno>'"
            )));
        };
        let seqno = seqno
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid ACE sequence number '{seqno}'")))?;
        Ok(Self::new(afi.parse()?, *acl_name, seqno))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AceProperty {
    Action,
    Proto,
    SrcAddr,
    SrcPort,
    DstAddr,
    DstPort,
}

const fn rule_field(property: AceProperty, name: &'static str) -> PropertySpec<AceProperty> {
    PropertySpec {
        property,
        name,
        kind: ValueKind::String,
        write: WriteMode::CombinedOnly,
    }
}

const ACE_PROPERTIES: &[PropertySpec<AceProperty>] = &[
    rule_field(AceProperty::Action, "action"),
    rule_field(AceProperty::Proto, "proto"),
    rule_field(AceProperty::SrcAddr, "src_addr"),
    rule_field(AceProperty::SrcPort, "src_port"),
    rule_field(AceProperty::DstAddr, "dst_addr"),
    rule_field(AceProperty::DstPort, "dst_port"),
];

impl Property for AceProperty {
    const TABLE: &'static [PropertySpec<Self>] = ACE_PROPERTIES;

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AceProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceCall {
    /// Writes the whole rule line
    Rule,
}

impl fmt::Display for AceCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AceCall::Rule => f.write_str("ace_set"),
        }
    }
}

/// The `cisco_ace` entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ace;

impl Entity for Ace {
    type Key = AceKey;
    type Property = AceProperty;
    type Call = AceCall;

    const KIND: &'static str = "cisco_ace";

    const COMBINED_CALLS: &'static [CombinedCall<Self>] = &[CombinedCall {
        call: AceCall::Rule,
        required: &[
            AceProperty::Action,
            AceProperty::Proto,
            AceProperty::SrcAddr,
            AceProperty::DstAddr,
        ],
        optional: &[AceProperty::SrcPort, AceProperty::DstPort],
        validate: validate_rule,
    }];
}

fn validate_rule(params: &CallParams<AceProperty>) -> Result<()> {
    let action = params.string(AceProperty::Action)?;
    if !matches!(action, "permit" | "deny") {
        return Err(Error::validation(
            AceCall::Rule.to_string(),
            format!("action must be permit or deny, got '{action}'"),
        ));
    }
    Ok(())
}
