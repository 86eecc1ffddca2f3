use core::fmt;

use crate::Options;

/// A packed 64-bit Snowflake ID.
///
/// The value is opaque on its own: which bits hold the tick, the worker id
/// and the sequence depends on the [`Options`] it was generated under. Use
/// [`Options::decode`] to split it back into [`Components`].
///
/// The top bit is never set by a generator, so the value is always safe to
/// treat as a non-negative `i64` or render as a decimal string.
///
/// ```text
///  Bit Index:  63           63 62                  ws+ss ws+ss-1       ss ss-1           0
///              +--------------+------------------------+-----------------+---------------+
///  Field:      | reserved (1) | tick offset (ts bits)  | worker id (ws)  | sequence (ss) |
///              +--------------+------------------------+-----------------+---------------+
///              |<----------- MSB ------------- 64 bits -------------- LSB --------------->|
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Wraps a raw value, e.g. one read back from storage.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the raw packed value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the ID as a zero-padded 20-digit string.
    ///
    /// Padded strings sort lexicographically in the same order as the IDs.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.id
    }
}

impl From<u64> for SnowflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnowflakeId")
            .field(&format_args!("{:#066b}", self.id))
            .finish()
    }
}

/// The fields of a [`SnowflakeId`], as recovered by [`Options::decode`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Components {
    /// Ticks (milliseconds) elapsed since the configured epoch.
    pub tick_offset: u64,
    /// The worker id the ID was generated by.
    pub worker_id: u64,
    /// Position of the ID within its tick.
    pub sequence: u64,
}

impl Components {
    /// Returns the wall-clock time the ID was issued at, in milliseconds since
    /// the Unix epoch.
    pub fn unix_millis(&self, options: &Options) -> u64 {
        options.epoch_millis().saturating_add(self.tick_offset)
    }
}
