//! Enforced options: desired fragments and the type-3 options encoding.
//!
//! The chain stores one options blob per `(remote eid, message type)`. A
//! blob is a two-byte type header followed by worker options, each encoded
//! as `worker id (u8) | length (u16) | option type (u8) | payload`, where
//! `length` counts the option type byte plus the payload. Desired config
//! lists fragments; all fragments for one message type are concatenated
//! into a single blob.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::num::{Bytes, Bytes32, Uint};
use super::point::EndpointId;

pub const OPTIONS_TYPE_3: u16 = 3;
pub const EXECUTOR_WORKER_ID: u8 = 1;

const OPTION_LZ_RECEIVE: u8 = 1;
const OPTION_NATIVE_DROP: u8 = 2;
const OPTION_COMPOSE: u8 = 3;
const OPTION_ORDERED: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("encoded options must start with type 3, got type {0}")]
    UnsupportedType(u16),
    #[error("encoded options are too short ({0} bytes)")]
    Truncated(usize),
    #[error("native drop receiver '{receiver}' is invalid: {reason}")]
    Receiver { receiver: String, reason: String },
    #[error("option payload of {0} bytes does not fit a u16 length")]
    TooLarge(usize),
}

// ---------------------------------------------------------------------------
// Desired fragments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "option_type", rename_all = "snake_case")]
pub enum OptionFragment {
    LzReceive {
        gas: Uint,
        #[serde(default)]
        value: Uint,
    },
    NativeDrop {
        amount: Uint,
        receiver: String,
    },
    Compose {
        index: u16,
        gas: Uint,
        #[serde(default)]
        value: Uint,
    },
    #[serde(rename = "ordered")]
    OrderedExecution,
    /// A pre-encoded type-3 blob; its worker options are appended as-is.
    Encoded { options: Bytes },
}

/// What makes two fragments "the same option" for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentId {
    LzReceive,
    NativeDrop(String),
    Compose(u16),
    Ordered,
    Encoded,
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentId::LzReceive => write!(f, "lz_receive"),
            FragmentId::NativeDrop(r) => write!(f, "native_drop({})", r),
            FragmentId::Compose(i) => write!(f, "compose({})", i),
            FragmentId::Ordered => write!(f, "ordered"),
            FragmentId::Encoded => write!(f, "encoded"),
        }
    }
}

impl OptionFragment {
    pub fn id(&self) -> FragmentId {
        match self {
            OptionFragment::LzReceive { .. } => FragmentId::LzReceive,
            OptionFragment::NativeDrop { receiver, .. } => {
                FragmentId::NativeDrop(receiver.trim().to_ascii_lowercase())
            }
            OptionFragment::Compose { index, .. } => FragmentId::Compose(*index),
            OptionFragment::OrderedExecution => FragmentId::Ordered,
            OptionFragment::Encoded { .. } => FragmentId::Encoded,
        }
    }

    /// Appends this fragment's worker options to `builder`.
    ///
    /// `receiver` turns a native-drop receiver address into its 32-byte
    /// form on the remote chain.
    pub fn encode_into<F>(&self, builder: &mut OptionsBuilder, receiver: F) -> Result<(), OptionsError>
    where
        F: Fn(&str) -> Result<Bytes32, String>,
    {
        match self {
            OptionFragment::LzReceive { gas, value } => {
                let mut payload = gas.to_be_bytes().to_vec();
                if !value.is_zero() {
                    payload.extend_from_slice(&value.to_be_bytes());
                }
                builder.push_executor(OPTION_LZ_RECEIVE, &payload)
            }
            OptionFragment::NativeDrop { amount, receiver: to } => {
                let word = receiver(to).map_err(|reason| OptionsError::Receiver {
                    receiver: to.clone(),
                    reason,
                })?;
                let mut payload = amount.to_be_bytes().to_vec();
                payload.extend_from_slice(&word.0);
                builder.push_executor(OPTION_NATIVE_DROP, &payload)
            }
            OptionFragment::Compose { index, gas, value } => {
                let mut payload = index.to_be_bytes().to_vec();
                payload.extend_from_slice(&gas.to_be_bytes());
                if !value.is_zero() {
                    payload.extend_from_slice(&value.to_be_bytes());
                }
                builder.push_executor(OPTION_COMPOSE, &payload)
            }
            OptionFragment::OrderedExecution => builder.push_executor(OPTION_ORDERED, &[]),
            OptionFragment::Encoded { options } => builder.push_encoded(options.as_slice()),
        }
    }
}

/// One desired enforced-option entry.
///
/// `remote_eid` defaults to the `to` side of the pathway it is declared on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_eid: Option<EndpointId>,
    pub msg_type: u16,
    #[serde(flatten)]
    pub option: OptionFragment,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// A fragment that was replaced by a later entry with the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateOption {
    pub remote_eid: EndpointId,
    pub msg_type: u16,
    pub id: FragmentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedOptions {
    pub groups: BTreeMap<(EndpointId, u16), Vec<OptionFragment>>,
    pub duplicates: Vec<DuplicateOption>,
}

/// Groups desired entries by `(remote eid, msg type)`.
///
/// When two entries share remote eid, message type and fragment identity,
/// the former one is dropped and the later one kept; each drop is recorded
/// in `duplicates`.
pub fn group_options(entries: &[EnforcedOption], default_remote: EndpointId) -> GroupedOptions {
    let mut grouped = GroupedOptions::default();
    for entry in entries {
        let remote_eid = entry.remote_eid.unwrap_or(default_remote);
        let fragments = grouped.groups.entry((remote_eid, entry.msg_type)).or_default();
        let id = entry.option.id();
        let before = fragments.len();
        fragments.retain(|f| f.id() != id);
        if fragments.len() != before {
            grouped.duplicates.push(DuplicateOption {
                remote_eid,
                msg_type: entry.msg_type,
                id,
            });
        }
        fragments.push(entry.option.clone());
    }
    grouped
}

// ---------------------------------------------------------------------------
// OptionsBuilder
// ---------------------------------------------------------------------------

/// Accumulates worker options behind a type-3 header.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    body: Vec<u8>,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        OptionsBuilder { body: Vec::new() }
    }

    pub fn push_executor(&mut self, option_type: u8, payload: &[u8]) -> Result<(), OptionsError> {
        let len = u16::try_from(payload.len() + 1).map_err(|_| OptionsError::TooLarge(payload.len()))?;
        self.body.push(EXECUTOR_WORKER_ID);
        self.body.extend_from_slice(&len.to_be_bytes());
        self.body.push(option_type);
        self.body.extend_from_slice(payload);
        Ok(())
    }

    pub fn push_encoded(&mut self, encoded: &[u8]) -> Result<(), OptionsError> {
        if encoded.len() < 2 {
            return Err(OptionsError::Truncated(encoded.len()));
        }
        let kind = u16::from_be_bytes([encoded[0], encoded[1]]);
        if kind != OPTIONS_TYPE_3 {
            return Err(OptionsError::UnsupportedType(kind));
        }
        self.body.extend_from_slice(&encoded[2..]);
        Ok(())
    }

    pub fn build(self) -> Bytes {
        let mut out = OPTIONS_TYPE_3.to_be_bytes().to_vec();
        out.extend(self.body);
        Bytes(out)
    }
}
