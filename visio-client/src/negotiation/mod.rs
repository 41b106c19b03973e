mod negotiator;

pub use negotiator::*;
