pub mod destinations;
pub mod remoting;

pub use destinations::*;
pub use remoting::*;
