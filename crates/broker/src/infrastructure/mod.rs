pub mod liveliness;
pub mod logging;
pub mod ports;
pub mod segment;
