pub mod grid_world;
pub mod tabular;
