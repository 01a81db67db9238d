pub mod item;
pub mod region;
pub mod session;
pub mod step;

pub use item::*;
pub use region::*;
pub use session::*;
pub use step::*;
