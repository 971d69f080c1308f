pub mod ai;
pub mod db;
pub mod media;
pub mod vector;
