pub mod messaging;
pub mod ports;
pub mod use_cases;
