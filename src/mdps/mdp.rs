use crate::{Continous, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Fully observable, finite Markov Decision Process - Sutton & Barto 2018.
///
/// The state enumeration is fixed for the lifetime of a solve and its order
/// is the sweep order used by value iteration.
pub trait StateSpace {
    type State: Clone + Eq + Hash + Debug;

    fn states(&self) -> &[Self::State];
}

pub trait ActionSpace: StateSpace {
    type Action: Clone + Eq + Hash + Debug;

    fn actions(&self, s: &Self::State) -> Vec<Self::Action>;
}

pub trait TransitionModel: ActionSpace {
    /// p(s' | s, a)
    fn transition(&self, s: &Self::State, a: &Self::Action, s_prime: &Self::State) -> Continous;
}

pub trait RewardModel: ActionSpace {
    /// r(s, a, s')
    fn reward(&self, s: &Self::State, a: &Self::Action, s_prime: &Self::State) -> Continous;
}

/// Anything that can be handed to the solver.
pub trait Mdp: TransitionModel + RewardModel {}

impl<T: TransitionModel + RewardModel> Mdp for T {}

pub type ValueTable<S> = HashMap<S, Continous>;

/// Expected return of every action of one state. Never persisted.
pub type QValues<A> = Vec<(A, Continous)>;

pub fn zero_values<S: Clone + Eq + Hash>(states: &[S]) -> ValueTable<S> {
    states.iter().map(|s| (s.clone(), 0.)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionProbability<A> {
    pub action: A,
    pub probability: Continous,
}

/// Probability of each action for a single state, in action space order.
/// Actions with zero probability are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDistribution<A> {
    entries: Vec<ActionProbability<A>>,
}

impl<A: PartialEq> ActionDistribution<A> {
    pub fn uniform(actions: Vec<A>) -> Self {
        let p = 1. / actions.len() as Continous;
        let entries = actions
            .into_iter()
            .map(|action| ActionProbability {
                action,
                probability: p,
            })
            .collect();

        Self { entries }
    }

    pub fn probability(&self, a: &A) -> Continous {
        self.entries
            .iter()
            .find(|e| e.action == *a)
            .map_or(0., |e| e.probability)
    }

    pub fn contains(&self, a: &A) -> bool {
        self.entries.iter().any(|e| e.action == *a)
    }

    pub fn actions(&self) -> impl Iterator<Item = &A> {
        self.entries.iter().map(|e| &e.action)
    }

    pub fn entries(&self) -> &[ActionProbability<A>] {
        &self.entries
    }

    pub fn total(&self) -> Continous {
        self.entries.iter().map(|e| e.probability).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub trait Policy<S, A> {
    fn policy(&self, s: &S) -> Result<ActionDistribution<A>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;

    #[test]
    fn uniform_distribution_splits_mass_evenly() {
        let dist = ActionDistribution::uniform(vec!['a', 'b', 'c', 'd']);

        assert_eq!(dist.len(), 4);
        assert_float_eq!(dist.probability(&'c'), 0.25, abs <= 1e-12);
        assert_float_eq!(dist.total(), 1., abs <= 1e-12);
    }

    #[test]
    fn missing_action_has_zero_probability() {
        let dist = ActionDistribution::uniform(vec![1, 2]);

        assert!(!dist.contains(&3));
        assert_eq!(dist.probability(&3), 0.);
        assert_eq!(dist.actions().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn zero_values_covers_every_state() {
        let v = zero_values(&[(0, 0), (0, 1), (1, 0)]);

        assert_eq!(v.len(), 3);
        assert!(v.values().all(|&x| x == 0.));
    }
}
