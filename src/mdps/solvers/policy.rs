use super::bellman::BellmanUpdate;
use crate::config::validate_positive;
use crate::mdps::mdp::*;
use crate::{Continous, MdpError, Result};
use tracing::debug;

/// Greedy policy with respect to a converged value table.
///
/// Every action whose Q-value is strictly within `rounding_tolerance` of
/// the best one gets an equal share; an action exactly `rounding_tolerance`
/// away is left out.
pub struct PolicyExtractor<E: Mdp> {
    bellman_update: BellmanUpdate<E>,
    values: ValueTable<E::State>,
    rounding_tolerance: Continous,
}

impl<E: Mdp> PolicyExtractor<E> {
    pub fn new(
        bellman_update: BellmanUpdate<E>,
        values: ValueTable<E::State>,
        rounding_tolerance: Continous,
    ) -> Result<Self> {
        validate_positive("rounding_tolerance", rounding_tolerance)?;

        Ok(Self {
            bellman_update,
            values,
            rounding_tolerance,
        })
    }

    pub fn values(&self) -> &ValueTable<E::State> {
        &self.values
    }

    pub fn q_values(&self, s: &E::State) -> Result<QValues<E::Action>> {
        self.bellman_update.q_values(s, &self.values)
    }

    pub fn policy_for(&self, s: &E::State) -> Result<ActionDistribution<E::Action>> {
        let qs = self.q_values(s)?;
        let max_q = qs
            .iter()
            .map(|(_, q)| *q)
            .fold(Continous::NEG_INFINITY, Continous::max);

        let optimal = qs
            .into_iter()
            .filter(|(_, q)| (q - max_q).abs() < self.rounding_tolerance)
            .map(|(a, _)| a)
            .collect::<Vec<_>>();
        if optimal.is_empty() {
            return Err(MdpError::InvalidDistribution(format!(
                "No finite Q-value for state {s:?}"
            )));
        }

        let dist = ActionDistribution::uniform(optimal);
        debug!(s = ?s, policy = ?dist, "Extracted policy");
        Ok(dist)
    }

    /// First optimal action in action space order.
    pub fn greedy_action(&self, s: &E::State) -> Result<E::Action> {
        let dist = self.policy_for(s)?;
        let first = dist.actions().next().cloned();
        first.ok_or_else(|| MdpError::InvalidDistribution(format!("Empty policy for state {s:?}")))
    }
}

impl<E: Mdp> Policy<E::State, E::Action> for PolicyExtractor<E> {
    fn policy(&self, s: &E::State) -> Result<ActionDistribution<E::Action>> {
        self.policy_for(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TabularMdp, Transition, Transitions};
    use assertor::*;
    use float_eq::*;
    use rstest::*;
    use std::rc::Rc;

    fn to(next_state: i32, reward: Continous) -> Vec<Transition> {
        vec![Transition {
            next_state,
            probability: 1.,
            reward,
            done: false,
        }]
    }

    /// State 0 has three actions into the absorbing state 1, paying
    /// `rewards[a]`. With `V(1) = 0` the Q-values equal the rewards exactly.
    fn one_step(rewards: [Continous; 3]) -> PolicyExtractor<TabularMdp> {
        let mdp = Rc::new(
            TabularMdp::new(Transitions::from([
                ((0, 0), to(1, rewards[0])),
                ((0, 1), to(1, rewards[1])),
                ((0, 2), to(1, rewards[2])),
                ((1, 0), to(1, 0.)),
            ]))
            .unwrap(),
        );
        let bu = BellmanUpdate::new(Rc::clone(&mdp), 0.9).unwrap();
        PolicyExtractor::new(bu, zero_values(mdp.states()), 1e-4).unwrap()
    }

    #[test]
    fn dominant_action_gets_all_mass() {
        let pe = one_step([1., 3., 2.]);

        let dist = pe.policy_for(&0).unwrap();

        assert_that!(dist.len()).is_equal_to(1);
        assert_float_eq!(dist.probability(&1), 1., abs <= 1e-12);
        assert_that!(pe.greedy_action(&0).unwrap()).is_equal_to(1);
    }

    #[test]
    fn exact_tie_is_split_evenly() {
        let pe = one_step([2., 2., -5.]);

        let dist = pe.policy_for(&0).unwrap();

        assert_that!(dist.actions().copied().collect::<Vec<_>>()).is_equal_to(vec![0, 1]);
        assert_float_eq!(dist.probability(&0), 0.5, abs <= 1e-12);
        assert_float_eq!(dist.probability(&1), 0.5, abs <= 1e-12);
        assert_float_eq!(dist.probability(&2), 0., abs <= 1e-12);
    }

    #[test]
    fn absorbing_state_is_uniform_over_its_actions() {
        let pe = one_step([0., 0., 0.]);

        let dist = pe.policy_for(&0).unwrap();

        assert_that!(dist.len()).is_equal_to(3);
        assert_float_eq!(dist.total(), 1., abs <= 1e-12);
        assert_float_eq!(dist.probability(&2), 1. / 3., abs <= 1e-12);
    }

    #[rstest]
    #[case(0.5, vec![0])]
    #[case(0.5000001, vec![0, 1])]
    #[case(0.25, vec![0])]
    fn tolerance_band_is_strict(#[case] tolerance: Continous, #[case] expected: Vec<i32>) {
        let mdp = Rc::new(
            TabularMdp::new(Transitions::from([
                ((0, 0), to(1, 1.)),
                ((0, 1), to(1, 0.5)),
                ((1, 0), to(1, 0.)),
            ]))
            .unwrap(),
        );
        let bu = BellmanUpdate::new(Rc::clone(&mdp), 0.9).unwrap();
        let pe = PolicyExtractor::new(bu, zero_values(mdp.states()), tolerance).unwrap();

        let dist = pe.policy_for(&0).unwrap();

        assert_that!(dist.actions().copied().collect::<Vec<_>>()).is_equal_to(expected);
        assert_float_eq!(dist.total(), 1., abs <= 1e-12);
    }

    #[test]
    fn state_without_actions_is_invalid() {
        let pe = one_step([1., 2., 3.]);

        assert!(matches!(pe.policy_for(&9), Err(MdpError::InvalidState(_))));
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let mdp = Rc::new(TabularMdp::simple_golf());
        let bu = BellmanUpdate::new(Rc::clone(&mdp), 0.9).unwrap();

        assert!(matches!(
            PolicyExtractor::new(bu, zero_values(mdp.states()), 0.),
            Err(MdpError::Configuration(_))
        ));
    }
}
