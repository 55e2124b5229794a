pub mod circularity;
pub mod schedule;
