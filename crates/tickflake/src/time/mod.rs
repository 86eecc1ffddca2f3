mod cached;
mod interface;
mod system;

pub use cached::*;
pub use interface::*;
pub use system::*;
