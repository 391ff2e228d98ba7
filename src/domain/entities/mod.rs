pub mod classification;
pub mod content_unit;
pub mod filter_rule;
