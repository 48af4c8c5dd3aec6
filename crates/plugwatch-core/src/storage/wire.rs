//! JSON wire format of the telemetry server
//!
//! A batch is an array of flat objects, one per sample:
//!
//! ```json
//! [{ "time": 1700000000000, "Desk": 41.2, "Fridge": 80.5 }]
//! ```
//!
//! The channel listing endpoint answers `{ "names": ["Desk", "Fridge"] }`.

use core::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror_no_std::Error;

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use super::{ChannelId, Sample};

/// Key carrying the sample timestamp
pub const TIME_KEY: &str = "time";

/// Error decoding a telemetry payload
#[derive(Debug, Error)]
pub enum WireError {
    /// Payload was not valid JSON for the expected shape
    #[error("Malformed telemetry payload: {0}")]
    Malformed(serde_json::Error),
}

/// Result type for wire decoding
pub type WireResult<T> = Result<T, WireError>;

/// Decode a batch of samples
pub fn decode_batch(bytes: &[u8]) -> WireResult<Vec<Sample>> {
    serde_json::from_slice(bytes).map_err(WireError::Malformed)
}

/// Encode a batch of samples
pub fn encode_batch(samples: &[Sample]) -> WireResult<Vec<u8>> {
    serde_json::to_vec(samples).map_err(WireError::Malformed)
}

#[derive(Serialize, Deserialize)]
struct ChannelListing {
    names: Vec<String>,
}

/// Decode the channel listing, preserving its order
pub fn decode_channel_names(bytes: &[u8]) -> WireResult<Vec<ChannelId>> {
    let listing: ChannelListing = serde_json::from_slice(bytes).map_err(WireError::Malformed)?;
    Ok(listing.names.into_iter().map(ChannelId::from).collect())
}

/// Encode a channel listing
pub fn encode_channel_names(channels: &[ChannelId]) -> WireResult<Vec<u8>> {
    let listing = ChannelListing {
        names: channels.iter().map(|id| String::from(id.as_str())).collect(),
    };
    serde_json::to_vec(&listing).map_err(WireError::Malformed)
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels().count() + 1))?;
        map.serialize_entry(TIME_KEY, &self.timestamp)?;
        for (id, watts) in self.channels() {
            map.serialize_entry(id.as_str(), &watts)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Sample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SampleVisitor)
    }
}

struct SampleVisitor;

impl<'de> Visitor<'de> for SampleVisitor {
    type Value = Sample;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a `time` key and numeric channel values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Sample, A::Error> {
        let mut timestamp: Option<i64> = None;
        let mut channels: Vec<(ChannelId, f32)> = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            if key == TIME_KEY {
                if timestamp.is_some() {
                    return Err(de::Error::duplicate_field(TIME_KEY));
                }
                timestamp = Some(map.next_value()?);
            } else {
                // Plugs that failed to report come through as null
                let watts: Option<f32> = map.next_value()?;
                channels.push((ChannelId::from(key), watts.unwrap_or(0.0)));
            }
        }

        let timestamp = timestamp.ok_or_else(|| de::Error::missing_field(TIME_KEY))?;
        let mut sample = Sample::new(timestamp);
        for (id, watts) in channels {
            sample.set(id, watts);
        }
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_decode_batch_preserves_channel_order() {
        let payload = br#"[
            {"time": 1000, "Plug 2": 4.5, "Plug 1": 10.0},
            {"time": 2000, "Plug 2": 5.0, "Plug 1": 11.25}
        ]"#;

        let batch = decode_batch(payload).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].timestamp, 2000);

        let names: Vec<&str> = batch[0].channel_ids().map(ChannelId::as_str).collect();
        assert_eq!(names, ["Plug 2", "Plug 1"]);
        assert_eq!(batch[1].value(&ChannelId::from("Plug 1")), Some(11.25));
    }

    #[test]
    fn test_decode_null_reading_as_zero() {
        let batch = decode_batch(br#"[{"time": 5, "Lamp": null}]"#).unwrap();
        assert_eq!(batch[0].value(&ChannelId::from("Lamp")), Some(0.0));
    }

    #[test]
    fn test_decode_rejects_missing_time() {
        let err = decode_batch(br#"[{"Lamp": 3.0}]"#).unwrap_err();
        assert!(matches!(err, WireError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_non_numeric_reading() {
        assert!(decode_batch(br#"[{"time": 1, "Lamp": "on"}]"#).is_err());
        assert!(decode_batch(b"not json").is_err());
    }

    #[test]
    fn test_empty_batch() {
        assert!(decode_batch(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_encoded_batch_uses_flat_objects() {
        let samples = vec![Sample::new(42).with_channel("Lamp", 1.5)];
        let bytes = encode_batch(&samples).unwrap();
        assert_eq!(bytes, br#"[{"time":42,"Lamp":1.5}]"#.to_vec());
        assert_eq!(decode_batch(&bytes).unwrap(), samples);
    }

    #[test]
    fn test_channel_names() {
        let names = decode_channel_names(br#"{"names": ["Desk", "Fridge"]}"#).unwrap();
        assert_eq!(names, vec![ChannelId::from("Desk"), ChannelId::from("Fridge")]);

        let bytes = encode_channel_names(&names).unwrap();
        assert_eq!(bytes, br#"{"names":["Desk","Fridge"]}"#.to_vec());
    }
}
