pub mod mdp;
pub mod mdp_simulator;
pub mod solvers;
