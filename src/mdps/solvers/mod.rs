pub mod bellman;
pub mod policy;
pub mod value_iteration;

pub use bellman::BellmanUpdate;
pub use policy::PolicyExtractor;
pub use value_iteration::ValueIteration;

use super::mdp::*;
use crate::{Continous, Result, SolverConfig};
use std::rc::Rc;

/// Wires the Bellman update, value iteration and policy extraction from a
/// single validated [`SolverConfig`].
pub struct MdpSolver<E> {
    bellman_update: BellmanUpdate<E>,
    value_iteration: ValueIteration<E>,
    config: SolverConfig,
}

impl<E: Mdp> MdpSolver<E> {
    pub fn new(mdp: Rc<E>, config: SolverConfig) -> Result<Self> {
        config.validate()?;

        let bellman_update = BellmanUpdate::new(mdp, config.gamma)?;
        let value_iteration = ValueIteration::new(bellman_update.clone(), config.theta)?
            .with_sweep(config.sweep)
            .with_max_iterations(config.max_iterations)?;

        Ok(Self {
            bellman_update,
            value_iteration,
            config,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn solve(&self) -> Result<SolvedMdp<E>> {
        self.solve_from(zero_values(self.bellman_update.mdp().states()))
    }

    pub fn solve_from(&self, initial: ValueTable<E::State>) -> Result<SolvedMdp<E>> {
        let (values, sweeps) = self.value_iteration.exec(initial)?;
        let extractor = PolicyExtractor::new(
            self.bellman_update.clone(),
            values,
            self.config.rounding_tolerance,
        )?;

        Ok(SolvedMdp { sweeps, extractor })
    }
}

pub struct SolvedMdp<E: Mdp> {
    pub sweeps: usize,
    extractor: PolicyExtractor<E>,
}

impl<E: Mdp> SolvedMdp<E> {
    pub fn values(&self) -> &ValueTable<E::State> {
        self.extractor.values()
    }

    pub fn v_star(&self, s: &E::State) -> Option<Continous> {
        self.values().get(s).copied()
    }

    pub fn q_star(&self, s: &E::State) -> Result<QValues<E::Action>> {
        self.extractor.q_values(s)
    }

    pub fn pi_star(&self, s: &E::State) -> Result<ActionDistribution<E::Action>> {
        self.extractor.policy_for(s)
    }

    pub fn extractor(&self) -> &PolicyExtractor<E> {
        &self.extractor
    }
}

impl<E: Mdp> Policy<E::State, E::Action> for SolvedMdp<E> {
    fn policy(&self, s: &E::State) -> Result<ActionDistribution<E::Action>> {
        self.pi_star(s)
    }
}
