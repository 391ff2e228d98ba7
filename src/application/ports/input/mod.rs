pub mod batch_classifier_port;
pub mod timeline_port;
