pub mod booking;
pub mod identity;

pub use booking::*;
pub use identity::*;
