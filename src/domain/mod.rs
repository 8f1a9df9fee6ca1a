pub mod chest;
pub mod direction;
pub mod entity;
pub mod tile;
