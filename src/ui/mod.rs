pub mod input;
pub mod logger;
pub mod renderer;
pub mod sound;
