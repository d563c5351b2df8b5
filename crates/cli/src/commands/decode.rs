//! `decode` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;

use contracts::{MtsFailureKind, MtsStatus};
use mts_engine::decode_status;

use crate::cli::DecodeArgs;

/// Decoded status for JSON output
#[derive(Debug, Serialize)]
struct DecodedStatus {
    raw: u32,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<MtsFailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
    flags: Vec<&'static str>,
    unknown_bits: u32,
}

impl From<MtsStatus> for DecodedStatus {
    fn from(status: MtsStatus) -> Self {
        let kind = decode_status(status).err();
        Self {
            raw: status.raw(),
            ok: status.is_ok(),
            kind,
            description: kind.map(|k| k.description()),
            flags: status.flag_names(),
            unknown_bits: status.unknown_bits(),
        }
    }
}

/// Execute the `decode` command
pub fn run_decode(args: &DecodeArgs) -> Result<()> {
    let status = MtsStatus::from_raw(args.status);
    let decoded = DecodedStatus::from(status);

    if args.json {
        let json =
            serde_json::to_string_pretty(&decoded).context("Failed to serialize decoded status")?;
        println!("{json}");
    } else {
        println!("Status: {status}");
        match decoded.kind {
            None => println!("Result: success"),
            Some(kind) => {
                println!("Result: {} ({})", kind.as_str(), kind.description());
                if decoded.flags.len() > 1 {
                    println!("Also set: {}", decoded.flags.join(", "));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_priority() {
        let decoded = DecodedStatus::from(MtsStatus::TIMEOUT | MtsStatus::BAD_REF_TILE);
        assert!(!decoded.ok);
        assert_eq!(decoded.kind, Some(MtsFailureKind::Timeout));
        assert_eq!(decoded.flags, vec!["TIMEOUT", "BAD_REF_TILE"]);
    }

    #[test]
    fn test_decode_ok() {
        let decoded = DecodedStatus::from(MtsStatus::OK);
        assert!(decoded.ok);
        assert_eq!(decoded.kind, None);
        assert!(decoded.flags.is_empty());
    }

    #[test]
    fn test_decode_unknown_bits() {
        let decoded = DecodedStatus::from(MtsStatus::from_raw(0x100));
        assert_eq!(decoded.kind, Some(MtsFailureKind::Unclassified));
        assert_eq!(decoded.unknown_bits, 0x100);
    }
}
