// src/domain/services/mod.rs
pub mod heuristic_classifier;
