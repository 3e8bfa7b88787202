pub mod catalog;
pub mod describe;
pub mod score;
pub mod scorers;
