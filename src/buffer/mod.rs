mod page_cache;

pub use page_cache::*;
