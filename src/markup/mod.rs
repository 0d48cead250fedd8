pub mod path;
pub mod tree;

pub use path::Path;
pub use tree::{parse, Element};
