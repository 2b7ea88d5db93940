pub mod walk;

pub use walk::{collect_descriptors, describe_file, WalkOptions};
