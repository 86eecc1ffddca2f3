use core::{fmt, str::FromStr, time::Duration};

use crate::{Components, Error, Result, SnowflakeId, time::CUSTOM_EPOCH};

/// Bits available for the fields; the top bit of every ID stays clear.
pub const MAX_LAYOUT_BITS: u32 = 63;

/// How a [`Generator`] reads the current tick.
///
/// Both strategies produce bit-identical layouts for the same [`Options`].
///
/// [`Generator`]: crate::Generator
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Read the system clock on every call, inside the lock.
    #[default]
    Classic,
    /// Read a tick published once per millisecond by a background thread.
    Fast,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("classic"),
            Self::Fast => f.write_str("fast"),
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("classic") {
            Ok(Self::Classic)
        } else if s.eq_ignore_ascii_case("fast") {
            Ok(Self::Fast)
        } else {
            Err(Error::invalid_config(format!(
                "unknown strategy `{s}`, expected `classic` or `fast`"
            )))
        }
    }
}

/// Bit widths of the three ID fields and every shift and bound derived from
/// them.
///
/// Computed once when [`Options`] are built; generators only read it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    timestamp_bits: u32,
    worker_id_bits: u32,
    sequence_bits: u32,
    timestamp_shift: u32,
    worker_id_shift: u32,
    max_timestamp: u64,
    max_worker_id: u64,
    max_sequence: u64,
}

impl Layout {
    /// Validates the widths against the 63-bit budget and derives the shifts
    /// and masks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the widths sum to more than
    /// [`MAX_LAYOUT_BITS`].
    pub fn new(timestamp_bits: u32, worker_id_bits: u32, sequence_bits: u32) -> Result<Self> {
        timestamp_bits
            .checked_add(worker_id_bits)
            .and_then(|bits| bits.checked_add(sequence_bits))
            .filter(|bits| *bits <= MAX_LAYOUT_BITS)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "timestamp ({timestamp_bits}) + worker id ({worker_id_bits}) + sequence \
                     ({sequence_bits}) bits exceed {MAX_LAYOUT_BITS}"
                ))
            })?;

        Ok(Self {
            timestamp_bits,
            worker_id_bits,
            sequence_bits,
            timestamp_shift: worker_id_bits + sequence_bits,
            worker_id_shift: sequence_bits,
            max_timestamp: mask(timestamp_bits),
            max_worker_id: mask(worker_id_bits),
            max_sequence: mask(sequence_bits),
        })
    }

    pub const fn timestamp_bits(&self) -> u32 {
        self.timestamp_bits
    }

    pub const fn worker_id_bits(&self) -> u32 {
        self.worker_id_bits
    }

    pub const fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    pub const fn timestamp_shift(&self) -> u32 {
        self.timestamp_shift
    }

    pub const fn worker_id_shift(&self) -> u32 {
        self.worker_id_shift
    }

    /// Largest tick offset the timestamp field can hold. Once the clock
    /// passes `epoch + max_timestamp` the layout has rolled over.
    pub const fn max_timestamp(&self) -> u64 {
        self.max_timestamp
    }

    pub const fn max_worker_id(&self) -> u64 {
        self.max_worker_id
    }

    pub const fn min_sequence(&self) -> u64 {
        0
    }

    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    /// Packs the fields into an ID. Values wider than their field are
    /// truncated; callers check bounds first.
    pub const fn compose(&self, tick_offset: u64, worker_id: u64, sequence: u64) -> SnowflakeId {
        let timestamp = (tick_offset & self.max_timestamp) << self.timestamp_shift;
        let worker_id = (worker_id & self.max_worker_id) << self.worker_id_shift;
        let sequence = sequence & self.max_sequence;
        SnowflakeId::from_raw(timestamp | worker_id | sequence)
    }

    /// Splits an ID back into its fields.
    pub const fn decompose(&self, id: SnowflakeId) -> Components {
        let raw = id.to_raw();
        Components {
            tick_offset: (raw >> self.timestamp_shift) & self.max_timestamp,
            worker_id: (raw >> self.worker_id_shift) & self.max_worker_id,
            sequence: raw & self.max_sequence,
        }
    }
}

const fn mask(bits: u32) -> u64 {
    (1_u64 << bits) - 1
}

/// Validated, immutable generator configuration.
///
/// Build with [`Options::builder`]. The default is the Twitter layout (41
/// bits of milliseconds, 10 bits of worker id, 12 bits of sequence) counted
/// from [`CUSTOM_EPOCH`], worker 0, [`Strategy::Classic`].
///
/// # Example
///
/// ```
/// use tickflake::{Options, Strategy, TWITTER_EPOCH};
///
/// let options = Options::builder()
///     .epoch(TWITTER_EPOCH)
///     .worker_id(5)
///     .strategy(Strategy::Fast)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.layout().timestamp_shift(), 22);
/// assert_eq!(options.layout().max_sequence(), 4095);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "OptionsBuilder", into = "OptionsBuilder")
)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Options {
    epoch_millis: u64,
    worker_id: u64,
    strategy: Strategy,
    layout: Layout,
}

impl Options {
    /// Starts from the default layout, epoch and strategy.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Shorthand for the default layout with the given epoch, worker id and
    /// strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `worker_id` does not fit in 10
    /// bits or `epoch` does not fit in a `u64` of milliseconds.
    pub fn new(epoch: Duration, worker_id: u64, strategy: Strategy) -> Result<Self> {
        Self::builder()
            .epoch(epoch)
            .worker_id(worker_id)
            .strategy(strategy)
            .build()
    }

    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_millis)
    }

    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Packs a tick offset and sequence with this worker's id.
    pub const fn compose(&self, tick_offset: u64, sequence: u64) -> SnowflakeId {
        self.layout.compose(tick_offset, self.worker_id, sequence)
    }

    /// Recovers the fields of an ID produced under these options.
    ///
    /// ```
    /// use tickflake::Options;
    ///
    /// let options = Options::builder().worker_id(7).build().unwrap();
    /// let id = options.compose(1_000, 3);
    /// let parts = options.decode(id);
    ///
    /// assert_eq!((parts.tick_offset, parts.worker_id, parts.sequence), (1_000, 7, 3));
    /// ```
    pub const fn decode(&self, id: SnowflakeId) -> Components {
        self.layout.decompose(id)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            epoch_millis: crate::time::epoch_millis(CUSTOM_EPOCH),
            worker_id: 0,
            strategy: Strategy::Classic,
            layout: Layout {
                timestamp_bits: 41,
                worker_id_bits: 10,
                sequence_bits: 12,
                timestamp_shift: 22,
                worker_id_shift: 12,
                max_timestamp: mask(41),
                max_worker_id: mask(10),
                max_sequence: mask(12),
            },
        }
    }
}

/// Unvalidated [`Options`]. Nothing is checked until [`build`].
///
/// With the `serde` feature this is also the wire shape of [`Options`];
/// missing fields fall back to the defaults.
///
/// ```json
/// { "epoch_millis": 1609459200000, "worker_id": 5, "strategy": "fast" }
/// ```
///
/// [`build`]: OptionsBuilder::build
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionsBuilder {
    #[cfg_attr(feature = "serde", serde(rename = "epoch_millis", with = "epoch_millis"))]
    epoch: Duration,
    timestamp_bits: u32,
    worker_id_bits: u32,
    sequence_bits: u32,
    worker_id: u64,
    strategy: Strategy,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Options::default().into()
    }
}

impl OptionsBuilder {
    /// Origin of the tick counter, as a duration since 1970-01-01 UTC.
    pub fn epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn epoch_millis(self, millis: u64) -> Self {
        self.epoch(Duration::from_millis(millis))
    }

    pub fn timestamp_bits(mut self, bits: u32) -> Self {
        self.timestamp_bits = bits;
        self
    }

    pub fn worker_id_bits(mut self, bits: u32) -> Self {
        self.worker_id_bits = bits;
        self
    }

    pub fn sequence_bits(mut self, bits: u32) -> Self {
        self.sequence_bits = bits;
        self
    }

    pub fn worker_id(mut self, worker_id: u64) -> Self {
        self.worker_id = worker_id;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validates everything and computes the [`Layout`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the widths exceed
    /// [`MAX_LAYOUT_BITS`], the worker id does not fit in `worker_id_bits`,
    /// or the epoch does not fit in a `u64` of milliseconds.
    pub fn build(self) -> Result<Options> {
        let layout = Layout::new(self.timestamp_bits, self.worker_id_bits, self.sequence_bits)?;

        if self.worker_id > layout.max_worker_id() {
            return Err(Error::invalid_config(format!(
                "worker id {} does not fit in {} bits (max {})",
                self.worker_id,
                layout.worker_id_bits(),
                layout.max_worker_id()
            )));
        }

        let epoch_millis = u64::try_from(self.epoch.as_millis()).map_err(|_| {
            Error::invalid_config(format!("epoch {:?} overflows u64 milliseconds", self.epoch))
        })?;

        Ok(Options {
            epoch_millis,
            worker_id: self.worker_id,
            strategy: self.strategy,
            layout,
        })
    }
}

impl From<Options> for OptionsBuilder {
    fn from(options: Options) -> Self {
        Self {
            epoch: options.epoch(),
            timestamp_bits: options.layout.timestamp_bits,
            worker_id_bits: options.layout.worker_id_bits,
            sequence_bits: options.layout.sequence_bits,
            worker_id: options.worker_id,
            strategy: options.strategy,
        }
    }
}

impl TryFrom<OptionsBuilder> for Options {
    type Error = Error;

    fn try_from(builder: OptionsBuilder) -> Result<Self> {
        builder.build()
    }
}

#[cfg(feature = "serde")]
mod epoch_millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

    pub(super) fn serialize<S: Serializer>(epoch: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(epoch.as_millis())
            .map_err(|_| S::Error::custom("epoch overflows u64 milliseconds"))?;
        s.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
