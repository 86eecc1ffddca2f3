mod allocator;
mod facade;
mod mutex;
mod state;
#[cfg(test)]
mod tests;

pub use allocator::*;
pub use facade::*;
pub(crate) use mutex::*;
pub use state::*;
