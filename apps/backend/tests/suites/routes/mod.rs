pub mod pose;
pub mod scores;
