//! Sparse measurement results and their dense histogram form.
//!
//! A QPU service reports counts as a sparse map keyed by bitstring text,
//! most-significant bit first:
//!
//! ```text
//!   {"00": 5, "11": 3}          (RemoteResult, 2 qubits)
//!          │
//!          ▼ decode(.., 2)
//!   [5, 0, 0, 3]                (CountHistogram, 2^2 slots)
//! ```
//!
//! Outcomes the service omits read as zero. Malformed keys, keys outside
//! `[0, 2^n)`, and two keys landing on the same slot are [`DecodeError`]s;
//! nothing is truncated or silently overwritten.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DecodeError, DecodeResult};

/// Widest register a dense histogram is built for (`2^30` slots, 8 GiB of counts).
pub const MAX_DENSE_QUBITS: u32 = 30;

/// Sparse `{bitstring: count}` distribution as returned by the service.
///
/// Entries keep the order they arrived in, and duplicate keys in the JSON
/// document are kept as separate entries so the decoder can reject them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteResult {
    entries: Vec<(String, u64)>,
}

impl RemoteResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one `(bitstring, count)` entry.
    pub fn push(&mut self, bitstring: impl Into<String>, count: u64) {
        self.entries.push((bitstring.into(), count));
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the service reported no outcomes at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(bitstring, count)` in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of all counts (saturating).
    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, (_, v)| acc.saturating_add(*v))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for RemoteResult {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for RemoteResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for RemoteResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RemoteResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of bitstrings to non-negative counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, count)) = map.next_entry::<String, u64>()? {
                    entries.push((key, count));
                }
                Ok(RemoteResult { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Dense histogram of `2^num_qubits` counts.
///
/// Slot `i` holds the count of the bitstring whose binary value is `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountHistogram {
    num_qubits: u32,
    counts: Vec<u64>,
}

impl CountHistogram {
    /// All-zero histogram for `num_qubits` qubits.
    pub fn zeroed(num_qubits: u32) -> DecodeResult<Self> {
        let len = dense_len(num_qubits)?;
        Ok(Self {
            num_qubits,
            counts: vec![0; len],
        })
    }

    /// Register width this histogram was built for.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Number of slots, always `2^num_qubits`.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Never true: even a zero-qubit histogram has one slot.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count stored at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<u64> {
        self.counts.get(index).copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.counts
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.counts
    }

    /// Sum of all slots (saturating).
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Non-zero slots as `(bitstring, count)`, ascending by index.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (String, u64)> + '_ {
        let width = self.num_qubits as usize;
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(move |(i, c)| (format_bitstring(i, width), *c))
    }
}

/// Reshape a sparse service result into a dense histogram.
///
/// Pure and deterministic: the same input always produces the same output.
pub fn decode(result: &RemoteResult, num_qubits: u32) -> DecodeResult<CountHistogram> {
    let mut histogram = CountHistogram::zeroed(num_qubits)?;
    let mut seen: FxHashMap<usize, &str> = FxHashMap::default();

    for (key, count) in result.iter() {
        let index = parse_bitstring(key, num_qubits)?;
        if let Some(first) = seen.insert(index, key) {
            return Err(DecodeError::DuplicateOutcome {
                first: first.to_string(),
                second: key.to_string(),
                index,
            });
        }
        histogram.counts[index] = count;
    }

    Ok(histogram)
}

/// Parse an MSB-first bitstring into a slot index below `2^num_qubits`.
///
/// Leading zeros beyond the register width are accepted as long as the
/// value itself is in range.
pub fn parse_bitstring(key: &str, num_qubits: u32) -> DecodeResult<usize> {
    if key.is_empty() {
        return Err(DecodeError::InvalidBitstring {
            key: key.to_string(),
        });
    }

    let out_of_range = || DecodeError::OutOfRange {
        key: key.to_string(),
        num_qubits,
    };

    let mut value: u64 = 0;
    for byte in key.bytes() {
        let bit = match byte {
            b'0' => 0,
            b'1' => 1,
            _ => {
                return Err(DecodeError::InvalidBitstring {
                    key: key.to_string(),
                });
            }
        };
        value = value
            .checked_mul(2)
            .and_then(|v| v.checked_add(bit))
            .ok_or_else(out_of_range)?;
    }

    // Registers of 64 qubits or more hold any value that fits in a u64.
    if let Some(slots) = 1u64.checked_shl(num_qubits) {
        if value >= slots {
            return Err(out_of_range());
        }
    }
    usize::try_from(value).map_err(|_| out_of_range())
}

fn dense_len(num_qubits: u32) -> DecodeResult<usize> {
    if num_qubits > MAX_DENSE_QUBITS {
        return Err(DecodeError::TooManyQubits(num_qubits));
    }
    1usize
        .checked_shl(num_qubits)
        .ok_or(DecodeError::TooManyQubits(num_qubits))
}

fn format_bitstring(index: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    format!("{index:0width$b}")
}
