use super::mdp::*;
use crate::{Continous, MdpError, Result};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use tracing::{debug, info};

pub trait Weighted<S> {
    fn s(&self) -> S;

    fn p(&self) -> Continous;
}

impl<A: Clone> Weighted<A> for ActionProbability<A> {
    fn s(&self) -> A {
        self.action.clone()
    }

    fn p(&self) -> Continous {
        self.probability
    }
}

pub fn pick_next<T, S>(rng: &mut StdRng, ts: &[T]) -> Result<S>
where
    T: Weighted<S>,
{
    let dist = WeightedIndex::new(ts.iter().map(|item| item.p()))
        .map_err(|e| MdpError::InvalidDistribution(e.to_string()))?;
    Ok(ts[dist.sample(rng)].s())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ReachedGoal,
    FellIntoTrap,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Terminated(Termination),
    Truncated,
}

#[derive(Debug, Clone)]
pub struct StepInfo<S> {
    pub observation: S,
    pub reward: Continous,
}

/// The state-transition rule and terminal conditions used during playback.
/// Owned by the environment, not by the solver.
pub trait EpisodeEnvironment: ActionSpace {
    fn step(
        &self,
        rng: &mut StdRng,
        s: &Self::State,
        a: &Self::Action,
    ) -> Result<StepInfo<Self::State>>;

    fn termination(&self, s: &Self::State) -> Option<Termination>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeEvent<S, A> {
    pub s: S,
    pub a: A,
    pub r: Continous,
    pub s_prime: S,
}

#[derive(Clone, Debug)]
pub struct Episode<S, A> {
    pub start: S,
    pub events: Vec<EpisodeEvent<S, A>>,
    pub outcome: EpisodeOutcome,
}

impl<S: Clone, A> Episode<S, A> {
    pub fn final_state(&self) -> S {
        self.events
            .last()
            .map_or_else(|| self.start.clone(), |e| e.s_prime.clone())
    }

    pub fn total_reward(&self) -> Continous {
        self.events.iter().map(|e| e.r).sum()
    }

    pub fn trajectory(&self) -> Vec<S> {
        std::iter::once(self.start.clone())
            .chain(self.events.iter().map(|e| e.s_prime.clone()))
            .collect()
    }
}

/// Walks an environment by sampling actions from a policy until a terminal
/// state. Runs unbounded unless `max_steps` is set.
pub struct EpisodeRunner<'a, E, P> {
    env: &'a E,
    policy: &'a P,
    rng: StdRng,
    max_steps: Option<usize>,
}

impl<'a, E, P> EpisodeRunner<'a, E, P>
where
    E: EpisodeEnvironment,
    P: Policy<E::State, E::Action>,
{
    pub fn new(env: &'a E, policy: &'a P, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Self {
            env,
            policy,
            rng,
            max_steps: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn run<F>(
        &mut self,
        start: E::State,
        mut on_event: F,
    ) -> Result<Episode<E::State, E::Action>>
    where
        F: FnMut(&EpisodeEvent<E::State, E::Action>),
    {
        let mut events = vec![];
        let mut s = start.clone();
        let outcome = loop {
            if let Some(t) = self.env.termination(&s) {
                break EpisodeOutcome::Terminated(t);
            }
            if self.max_steps.is_some_and(|max| events.len() >= max) {
                break EpisodeOutcome::Truncated;
            }

            let dist = self.policy.policy(&s)?;
            let a = pick_next(&mut self.rng, dist.entries())?;
            let step = self.env.step(&mut self.rng, &s, &a)?;
            debug!(s = ?s, a = ?a, s_prime = ?step.observation, r = step.reward, "Step");

            let event = EpisodeEvent {
                s,
                a,
                r: step.reward,
                s_prime: step.observation.clone(),
            };
            on_event(&event);
            events.push(event);
            s = step.observation;
        };

        info!(steps = events.len(), outcome = ?outcome, "Episode finished");
        Ok(Episode {
            start,
            events,
            outcome,
        })
    }
}
