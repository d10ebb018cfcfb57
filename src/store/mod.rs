pub mod questions;
pub mod scores;
