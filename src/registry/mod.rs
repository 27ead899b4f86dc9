mod metadata;
mod registry;

pub use metadata::EntityMetadata;
pub use registry::Registry;
