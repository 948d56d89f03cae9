pub(crate) mod core;
pub mod multiprocess;
