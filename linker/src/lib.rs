pub mod extractor;
pub mod reference;
pub mod schema;

pub use extractor::{Extractor, extract_graph};
pub use reference::extract;
pub use schema::{CompiledRule, CompiledSchema};
