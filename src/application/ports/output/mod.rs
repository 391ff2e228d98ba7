pub mod classifier_port;
pub mod rule_store_port;
pub mod suppression_port;
