//! Binary hardware-state snapshots.
//!
//! Snapshots are rkyv archives, validated on load before anything is
//! deserialized.

use crate::error::{IoError, Result};
use protocell_data::HardwareState;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Archives a state snapshot into bytes.
pub fn encode_state(state: &HardwareState) -> Result<Vec<u8>> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(state)
        .map_err(|e| IoError::rkyv(format!("serialization failed: {:?}", e)))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}

/// Validates and restores a snapshot archived by [`encode_state`].
pub fn decode_state(bytes: &[u8]) -> Result<HardwareState> {
    let archived = rkyv::check_archived_root::<HardwareState>(bytes)
        .map_err(|e| IoError::rkyv(format!("validation failed: {:?}", e)))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::rkyv(format!("deserialization failed: {:?}", e)))
}

pub fn save_state<P: AsRef<Path>>(state: &HardwareState, path: P) -> Result<()> {
    let bytes = encode_state(state)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

pub fn load_state<P: AsRef<Path>>(path: P) -> Result<HardwareState> {
    let bytes = std::fs::read(path)?;
    decode_state(&bytes)
}
