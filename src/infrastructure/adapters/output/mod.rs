pub mod file_rule_store;
pub mod memory_rule_store;
pub mod openai_classifier_adapter;
pub mod overlay_board;
