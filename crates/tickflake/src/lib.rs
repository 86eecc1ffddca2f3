//! Bit-packed, time-ordered 64-bit Snowflake IDs.
//!
//! A [`Generator`] combines a millisecond tick, a caller-assigned worker id
//! and a per-tick sequence number into one [`SnowflakeId`]. Field widths and
//! the epoch are set through [`Options`]; the [`Strategy`] decides whether
//! the clock is read directly ([`SystemClock`]) or from a value republished
//! every millisecond by a background thread ([`CachedClock`]).
//!
//! ```
//! use tickflake::{Generator, Options};
//!
//! let options = Options::builder()
//!     .epoch_millis(1_609_459_200_000)
//!     .worker_id(5)
//!     .build()
//!     .unwrap();
//! let generator = Generator::new(options).unwrap();
//!
//! let a = generator.next_id().unwrap();
//! let b = generator.next_id().unwrap();
//! assert!(a < b);
//! assert_eq!(options.decode(b).worker_id, 5);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod generator;
mod id;
mod options;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::options::*;
pub use crate::time::*;
