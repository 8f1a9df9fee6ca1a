pub mod block;
pub mod event;
pub mod level;
pub mod listener;
pub mod turn;
pub mod world;
pub mod zone;
