pub mod classifier;
pub mod explodes;
pub mod types;

pub use classifier::{classify_str, BodyShape, ClassifyError, Classifier};
pub use explodes::{explode, explode_clash_fragment, explode_entry};
pub use types::{ExplodeError, ExplodeResult};
