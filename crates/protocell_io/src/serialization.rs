//! JSON and hex helpers.
//!
//! JSON carries hardware snapshots and run reports; hex is the compact
//! one-line form of a genome, one byte per instruction.

use crate::error::{IoError, Result};
use protocell_data::{Instruction, Sequence};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Deserializes data from a JSON string. An empty string is a validation
/// error rather than a parse error.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {}", e)))
}

pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let content = std::fs::read_to_string(path)?;
    from_json(&content)
}

pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    std::fs::write(path, to_json_pretty(data)?)?;
    Ok(())
}

/// Encodes a genome as lowercase hex, two digits per instruction.
#[must_use]
pub fn sequence_to_hex(seq: &[Instruction]) -> String {
    let bytes: Vec<u8> = seq.iter().map(|inst| inst.0).collect();
    hex::encode(bytes)
}

/// Decodes a hex genome. Every byte must index an instruction in a set of
/// `set_len` entries.
pub fn sequence_from_hex(text: &str, set_len: usize) -> Result<Sequence> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| IoError::serialization(format!("Hex decoding failed: {}", e)))?;
    if let Some(pos) = bytes.iter().position(|&b| usize::from(b) >= set_len) {
        return Err(IoError::validation(format!(
            "site {pos} holds instruction {} outside a set of {set_len}",
            bytes[pos]
        )));
    }
    Ok(bytes.into_iter().map(Instruction).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocell_data::{HardwareState, StackState};

    #[test]
    fn test_state_json_roundtrip() {
        let state = HardwareState {
            thread_count: 0,
            cur_thread: 0,
            threads: Vec::new(),
            global_stacks: vec![StackState {
                values: vec![1, 2, 3],
                top: 2,
            }],
        };
        let json = to_json(&state).unwrap();
        let back: HardwareState = from_json(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_from_json_empty() {
        let result: Result<HardwareState> = from_json("  ");
        assert!(matches!(result, Err(IoError::Validation(_))));
    }

    #[test]
    fn test_from_json_malformed() {
        let result: Result<HardwareState> = from_json("{\"thread_count\": ");
        assert!(matches!(result, Err(IoError::Serialization(_))));
    }

    #[test]
    fn test_hex_genome() {
        let seq = vec![Instruction(0), Instruction(10), Instruction(25)];
        let hex = sequence_to_hex(&seq);
        assert_eq!(hex, "000a19");
        assert_eq!(sequence_from_hex(&hex, 26).unwrap(), seq);
    }

    #[test]
    fn test_hex_genome_rejects_out_of_set() {
        let err = sequence_from_hex("0001ff", 26).unwrap_err();
        assert!(err.to_string().contains("site 2"));
        assert!(sequence_from_hex("zz", 26).is_err());
    }
}
