use crate::mdps::{mdp::*, mdp_simulator::*};
use crate::{Continous, Discrete, MdpError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub next_state: Discrete,
    pub probability: Continous,
    pub reward: Continous,
    pub done: bool,
}

impl Weighted<(Discrete, Continous)> for Transition {
    fn s(&self) -> (Discrete, Continous) {
        (self.next_state, self.reward)
    }

    fn p(&self) -> Continous {
        self.probability
    }
}

/// Keyed by `(state, action)`.
pub type Transitions = HashMap<(Discrete, Discrete), Vec<Transition>>;

/// An MDP given as an explicit transition table, the way gym exposes
/// `P[s][a]` for toy-text environments. States entered through a `done`
/// transition are terminal for episode playback.
#[derive(Debug, Clone)]
pub struct TabularMdp {
    states: Vec<Discrete>,
    actions: HashMap<Discrete, Vec<Discrete>>,
    transitions: Rc<Transitions>,
    terminal: HashSet<Discrete>,
}

impl TabularMdp {
    pub fn new(transitions: Transitions) -> Result<Self> {
        if transitions.is_empty() {
            return Err(MdpError::Configuration(
                "Transition table has no entries.".to_string(),
            ));
        }

        for ((s, a), ts) in &transitions {
            if ts.iter().any(|t| !(0. ..=1.).contains(&t.probability)) {
                return Err(MdpError::Configuration(format!(
                    "Probabilities in state {s}, action {a} must lie in [0, 1]."
                )));
            }
            if let Some(t) = ts.iter().find(|t| !t.reward.is_finite()) {
                return Err(MdpError::Configuration(format!(
                    "Reward in state {s}, action {a} must be finite, got {}.",
                    t.reward
                )));
            }
            let total: Continous = ts.iter().map(|t| t.probability).sum();
            if (total - 1.).abs() > 1e-8 {
                return Err(MdpError::Configuration(format!(
                    "Probabilities in state {s}, action {a} must sum to 1.0, but got {total}."
                )));
            }
        }

        Ok(Self::from_table(transitions))
    }

    fn from_table(transitions: Transitions) -> Self {
        let mut states = transitions
            .iter()
            .flat_map(|((s, _), ts)| std::iter::once(*s).chain(ts.iter().map(|t| t.next_state)))
            .collect::<Vec<_>>();
        states.sort_unstable();
        states.dedup();

        let mut actions: HashMap<Discrete, Vec<Discrete>> = HashMap::new();
        for (s, a) in transitions.keys() {
            actions.entry(*s).or_default().push(*a);
        }
        actions.values_mut().for_each(|acts| acts.sort_unstable());

        let terminal = transitions
            .values()
            .flatten()
            .filter(|t| t.done)
            .map(|t| t.next_state)
            .collect();

        Self {
            states,
            actions,
            transitions: Rc::new(transitions),
            terminal,
        }
    }

    /// https://towardsdatascience.com/reinforcement-learning-an-easy-introduction-to-value-iteration-e4cfe0731fd5
    pub fn simple_golf() -> Self {
        let transitions = Transitions::from([
            (
                (0, 0),
                vec![
                    Transition {
                        next_state: 1,
                        probability: 0.9,
                        reward: 0.,
                        done: false,
                    },
                    Transition {
                        next_state: 0,
                        probability: 0.1,
                        reward: 0.,
                        done: false,
                    },
                ],
            ),
            (
                (1, 1),
                vec![
                    Transition {
                        next_state: 0,
                        probability: 0.9,
                        reward: 0.,
                        done: false,
                    },
                    Transition {
                        next_state: 1,
                        probability: 0.1,
                        reward: 0.,
                        done: false,
                    },
                ],
            ),
            (
                (1, 2),
                vec![
                    Transition {
                        next_state: 2,
                        probability: 0.9,
                        reward: 10.,
                        done: true,
                    },
                    Transition {
                        next_state: 1,
                        probability: 0.1,
                        reward: 0.,
                        done: false,
                    },
                ],
            ),
            // In the hole: absorbing.
            (
                (2, 0),
                vec![Transition {
                    next_state: 2,
                    probability: 1.,
                    reward: 0.,
                    done: false,
                }],
            ),
        ]);

        Self::from_table(transitions)
    }

    pub fn transitions(&self) -> Rc<Transitions> {
        Rc::clone(&self.transitions)
    }

    fn matching(
        &self,
        s: &Discrete,
        a: &Discrete,
        s_prime: &Discrete,
    ) -> impl Iterator<Item = &Transition> {
        let s_prime = *s_prime;
        self.transitions
            .get(&(*s, *a))
            .into_iter()
            .flatten()
            .filter(move |t| t.next_state == s_prime)
    }
}

impl StateSpace for TabularMdp {
    type State = Discrete;

    fn states(&self) -> &[Discrete] {
        &self.states
    }
}

impl ActionSpace for TabularMdp {
    type Action = Discrete;

    fn actions(&self, s: &Discrete) -> Vec<Discrete> {
        self.actions.get(s).cloned().unwrap_or_default()
    }
}

impl TransitionModel for TabularMdp {
    fn transition(&self, s: &Discrete, a: &Discrete, s_prime: &Discrete) -> Continous {
        self.matching(s, a, s_prime).map(|t| t.probability).sum()
    }
}

impl RewardModel for TabularMdp {
    /// Probability weighted when several entries lead to the same `s'`.
    fn reward(&self, s: &Discrete, a: &Discrete, s_prime: &Discrete) -> Continous {
        let (p, pr) = self
            .matching(s, a, s_prime)
            .fold((0., 0.), |(p, pr), t| (p + t.probability, pr + t.probability * t.reward));

        if p > 0. {
            pr / p
        } else {
            0.
        }
    }
}

impl EpisodeEnvironment for TabularMdp {
    fn step(&self, rng: &mut StdRng, s: &Discrete, a: &Discrete) -> Result<StepInfo<Discrete>> {
        let ts = self
            .transitions
            .get(&(*s, *a))
            .ok_or_else(|| MdpError::InvalidState(format!("{s:?} (action {a:?})")))?;
        let (observation, reward) = pick_next(rng, ts)?;

        Ok(StepInfo {
            observation,
            reward,
        })
    }

    fn termination(&self, s: &Discrete) -> Option<Termination> {
        self.terminal.contains(s).then_some(Termination::Done)
    }
}
