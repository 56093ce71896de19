mod consts;
mod counters;
mod readpair;
mod stage;
mod verdict;

pub use consts::*;
pub use counters::*;
pub use readpair::*;
pub use stage::*;
pub use verdict::*;
