pub mod interp;
pub mod stoch;

pub use interp::*;
pub use stoch::*;
