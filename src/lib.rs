extern crate rand;
extern crate serde;
extern crate serde_json;

pub mod config;
pub mod envs;
pub mod error;
pub mod mdps;

pub use config::*;
pub use envs::{grid_world::*, tabular::*};
pub use error::{MdpError, Result};
pub use mdps::{mdp::*, mdp_simulator::*, solvers::*};

pub type Discrete = i32;
pub type Continous = f64;
