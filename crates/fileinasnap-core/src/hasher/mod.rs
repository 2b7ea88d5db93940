pub mod digest;
pub mod key;

pub use key::{ContentKey, KeyStrategy};
