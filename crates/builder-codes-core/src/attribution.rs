//! ERC-8021 builder code attribution.
//!
//! A data suffix is read from the end of call data:
//!
//! ```text
//! schema 0:                 codes | codes_len (1) | schema_id (1) | marker (16)
//! schema 1: registry (20) | codes | codes_len (1) | schema_id (1) | marker (16)
//! ```
//!
//! `codes` is the ASCII builder codes joined by `,`.

use alloy::primitives::{hex, Address, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trailing marker identifying an ERC-8021 suffix.
pub const ERC_8021_MARKER: [u8; 16] = [
    0x80, 0x21, 0x80, 0x21, 0x80, 0x21, 0x80, 0x21, 0x80, 0x21, 0x80, 0x21, 0x80, 0x21, 0x80, 0x21,
];

/// Marker plus schema id plus codes length.
pub const MIN_SUFFIX_LEN: usize = ERC_8021_MARKER.len() + 2;

const CODE_DELIMITER: u8 = b',';
const REGISTRY_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributionError {
    #[error("at least one builder code is required")]
    NoCodes,
    #[error("builder code {index} is empty")]
    EmptyCode { index: usize },
    #[error("builder code {code:?} contains an invalid character")]
    InvalidCode { code: String },
    #[error("encoded builder codes are {len} bytes, at most 255 fit in a suffix")]
    CodesTooLong { len: usize },
    #[error("invalid registry address {input:?}: {reason}")]
    InvalidRegistryAddress { input: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schema {
    /// Codes resolve against the canonical registry.
    Canonical,
    /// Codes resolve against a registry named in the suffix.
    Custom,
}

impl Schema {
    pub fn id(self) -> u8 {
        match self {
            Schema::Canonical => 0,
            Schema::Custom => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Schema::Canonical),
            1 => Some(Schema::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    codes: Vec<String>,
    registry: Option<Address>,
}

impl Attribution {
    pub fn canonical(codes: Vec<String>) -> Self {
        Self {
            codes,
            registry: None,
        }
    }

    pub fn custom(codes: Vec<String>, registry: Address) -> Self {
        Self {
            codes,
            registry: Some(registry),
        }
    }

    pub fn schema(&self) -> Schema {
        if self.registry.is_some() {
            Schema::Custom
        } else {
            Schema::Canonical
        }
    }

    pub fn schema_id(&self) -> u8 {
        self.schema().id()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn registry(&self) -> Option<Address> {
        self.registry
    }

    pub fn to_data_suffix(&self) -> Result<Bytes, AttributionError> {
        encode(self.codes.as_slice(), self.registry)
    }
}

/// Encodes builder codes into a data suffix; schema 1 when a registry is given.
pub fn encode<S: AsRef<str>>(
    codes: &[S],
    registry: Option<Address>,
) -> Result<Bytes, AttributionError> {
    if codes.is_empty() {
        return Err(AttributionError::NoCodes);
    }
    for (index, code) in codes.iter().enumerate() {
        validate_code(index, code.as_ref())?;
    }

    let joined = codes
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(",");
    let codes_len = u8::try_from(joined.len())
        .map_err(|_| AttributionError::CodesTooLong { len: joined.len() })?;

    let mut out = Vec::with_capacity(REGISTRY_LEN + joined.len() + MIN_SUFFIX_LEN);
    let schema = match registry {
        Some(registry) => {
            out.extend_from_slice(registry.as_slice());
            Schema::Custom
        }
        None => Schema::Canonical,
    };
    out.extend_from_slice(joined.as_bytes());
    out.push(codes_len);
    out.push(schema.id());
    out.extend_from_slice(&ERC_8021_MARKER);
    Ok(Bytes::from(out))
}

fn validate_code(index: usize, code: &str) -> Result<(), AttributionError> {
    if code.is_empty() {
        return Err(AttributionError::EmptyCode { index });
    }
    if !code.bytes().all(is_code_byte) {
        return Err(AttributionError::InvalidCode {
            code: code.to_owned(),
        });
    }
    Ok(())
}

/// Parses a registry address typed by the user, surfacing empty input as an error.
pub fn parse_registry(input: &str) -> Result<Address, AttributionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AttributionError::InvalidRegistryAddress {
            input: input.to_owned(),
            reason: "registry address is required for schema 1".to_owned(),
        });
    }
    trimmed
        .parse::<Address>()
        .map_err(|e| AttributionError::InvalidRegistryAddress {
            input: input.to_owned(),
            reason: e.to_string(),
        })
}

/// Reads an attribution from the end of `data`.
///
/// Returns `None` for anything that is not a structurally valid suffix.
pub fn decode(data: &[u8]) -> Option<Attribution> {
    split(data).map(|(_, attribution)| attribution)
}

/// Same as [`decode`], for hex text with or without a `0x` prefix.
pub fn decode_hex(input: &str) -> Option<Attribution> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).ok()?;
    decode(&bytes)
}

/// Splits call data into the original payload and its trailing attribution.
pub fn strip_suffix(data: &[u8]) -> (&[u8], Option<Attribution>) {
    match split(data) {
        Some((payload, attribution)) => (payload, Some(attribution)),
        None => (data, None),
    }
}

/// Call data as a wallet submits it once a `dataSuffix` capability is applied.
pub fn append_suffix(data: &[u8], suffix: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(data.len() + suffix.len());
    out.extend_from_slice(data);
    out.extend_from_slice(suffix);
    Bytes::from(out)
}

fn split(data: &[u8]) -> Option<(&[u8], Attribution)> {
    if data.len() < MIN_SUFFIX_LEN {
        return None;
    }
    let (rest, marker) = data.split_at(data.len() - ERC_8021_MARKER.len());
    if marker != ERC_8021_MARKER {
        return None;
    }
    let (schema_id, rest) = rest.split_last()?;
    let schema = Schema::from_id(*schema_id)?;
    let (codes_len, rest) = rest.split_last()?;
    let codes_len = usize::from(*codes_len);
    if rest.len() < codes_len {
        return None;
    }
    let (rest, codes_bytes) = rest.split_at(rest.len() - codes_len);
    let codes = parse_codes(codes_bytes)?;

    match schema {
        Schema::Canonical => Some((rest, Attribution::canonical(codes))),
        Schema::Custom => {
            if rest.len() < REGISTRY_LEN {
                return None;
            }
            let (payload, registry) = rest.split_at(rest.len() - REGISTRY_LEN);
            Some((payload, Attribution::custom(codes, Address::from_slice(registry))))
        }
    }
}

fn is_code_byte(b: u8) -> bool {
    b.is_ascii_graphic() && b != CODE_DELIMITER
}

// Accepts exactly the code lists `encode` can produce.
fn parse_codes(bytes: &[u8]) -> Option<Vec<String>> {
    let codes: Vec<String> = bytes
        .split(|b| *b == CODE_DELIMITER)
        .map(|code| {
            if code.is_empty() || !code.iter().copied().all(is_code_byte) {
                return None;
            }
            std::str::from_utf8(code).ok().map(str::to_owned)
        })
        .collect::<Option<_>>()?;
    Some(codes)
}
