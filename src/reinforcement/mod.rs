pub mod spawner;
pub mod queue;
pub mod waves;
pub mod tracker;
