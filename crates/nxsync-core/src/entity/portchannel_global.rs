// # Port-Channel Global Settings
//
// Load-balancing globals. Only `hash_distribution`, `load_defer` and
// `resilient` have their own setters; everything else is written through one
// of three variants of the device's `port_channel_load_balance` call.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CombinedCall, Entity};
use crate::error::{Error, Result};
use crate::model::{CallParams, Property, PropertySpec, ValueKind, WriteMode};

/// The only bundle-select value for which symmetric hashing is allowed
pub const SYMMETRIC_BUNDLE_SELECT: &str = "src-dst";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortChannelGlobalProperty {
    BundleHash,
    BundleSelect,
    HashDistribution,
    HashPoly,
    LoadDefer,
    Rotate,
    Asymmetric,
    Concatenation,
    Resilient,
    Symmetry,
}

use PortChannelGlobalProperty as Pc;

const fn spec(
    property: Pc,
    name: &'static str,
    kind: ValueKind,
    write: WriteMode,
) -> PropertySpec<Pc> {
    PropertySpec {
        property,
        name,
        kind,
        write,
    }
}

const PC_GLOBAL_PROPERTIES: &[PropertySpec<Pc>] = &[
    spec(Pc::BundleHash, "bundle_hash", ValueKind::String, WriteMode::CombinedOnly),
    spec(Pc::BundleSelect, "bundle_select", ValueKind::String, WriteMode::CombinedOnly),
    spec(Pc::HashDistribution, "hash_distribution", ValueKind::String, WriteMode::Simple),
    spec(Pc::HashPoly, "hash_poly", ValueKind::String, WriteMode::CombinedOnly),
    spec(Pc::LoadDefer, "load_defer", ValueKind::Integer, WriteMode::Simple),
    spec(Pc::Rotate, "rotate", ValueKind::Integer, WriteMode::CombinedOnly),
    spec(Pc::Asymmetric, "asymmetric", ValueKind::Boolean, WriteMode::CombinedOnly),
    spec(Pc::Concatenation, "concatenation", ValueKind::Boolean, WriteMode::CombinedOnly),
    spec(Pc::Resilient, "resilient", ValueKind::Boolean, WriteMode::Simple),
    spec(Pc::Symmetry, "symmetry", ValueKind::Boolean, WriteMode::CombinedOnly),
];

impl Property for PortChannelGlobalProperty {
    const TABLE: &'static [PropertySpec<Self>] = PC_GLOBAL_PROPERTIES;

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PortChannelGlobalProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variants of `port_channel_load_balance`
///
/// They address disjoint parameter sets beyond the shared bundle hash and
/// select, so each may fire independently in the same apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadBalanceCall {
    SymmetryConcatenationRotate,
    HashPolynomial,
    AsymmetricRotate,
}

impl fmt::Display for LoadBalanceCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadBalanceCall::SymmetryConcatenationRotate => {
                "port_channel_load_balance(symmetry, concatenation, rotate)"
            }
            LoadBalanceCall::HashPolynomial => "port_channel_load_balance(hash_poly)",
            LoadBalanceCall::AsymmetricRotate => "port_channel_load_balance(asymmetric, rotate)",
        };
        f.write_str(name)
    }
}

/// The `cisco_portchannel_global` entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortChannelGlobal;

impl Entity for PortChannelGlobal {
    /// Globals are identified by name, normally `default`
    type Key = String;
    type Property = PortChannelGlobalProperty;
    type Call = LoadBalanceCall;

    const KIND: &'static str = "cisco_portchannel_global";

    const COMBINED_CALLS: &'static [CombinedCall<Self>] = &[
        CombinedCall {
            call: LoadBalanceCall::SymmetryConcatenationRotate,
            required: &[
                Pc::BundleHash,
                Pc::BundleSelect,
                Pc::Concatenation,
                Pc::Symmetry,
                Pc::Rotate,
            ],
            optional: &[],
            validate: validate_symmetry_concatenation_rotate,
        },
        CombinedCall {
            call: LoadBalanceCall::HashPolynomial,
            required: &[Pc::BundleHash, Pc::BundleSelect, Pc::HashPoly],
            optional: &[],
            validate: accept_any,
        },
        CombinedCall {
            call: LoadBalanceCall::AsymmetricRotate,
            required: &[Pc::BundleHash, Pc::BundleSelect, Pc::Asymmetric, Pc::Rotate],
            optional: &[],
            validate: accept_any,
        },
    ];
}

/// The firmware rejects rotation without concatenation, and symmetric
/// hashing with any selector other than src-dst.
fn validate_symmetry_concatenation_rotate(params: &CallParams<Pc>) -> Result<()> {
    let call = LoadBalanceCall::SymmetryConcatenationRotate;

    let rotate = params.integer(Pc::Rotate)?;
    if rotate != 0 && !params.flag(Pc::Concatenation)? {
        return Err(Error::validation(
            call.to_string(),
            format!("concatenation must be true when rotate is non-zero (rotate = {rotate})"),
        ));
    }

    let select = params.string(Pc::BundleSelect)?;
    if select != SYMMETRIC_BUNDLE_SELECT && params.flag(Pc::Symmetry)? {
        return Err(Error::validation(
            call.to_string(),
            format!(
                "symmetry can be true only for {SYMMETRIC_BUNDLE_SELECT} bundle-select, got '{select}'"
            ),
        ));
    }

    Ok(())
}

fn accept_any(_params: &CallParams<Pc>) -> Result<()> {
    Ok(())
}
