pub mod checkpoint;
pub mod machine;
pub mod validation;

pub use checkpoint::*;
pub use machine::*;
pub use validation::*;
