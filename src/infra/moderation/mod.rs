pub mod in_memory_cache;
pub mod options_file;

pub use in_memory_cache::InMemoryMemberCache;
pub use options_file::load_options;
