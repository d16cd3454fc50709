use crate::config::validate_gamma;
use crate::mdps::mdp::*;
use crate::{Continous, MdpError, Result};
use std::rc::Rc;
use tracing::trace;

pub(crate) fn value_of<S: Eq + std::hash::Hash + std::fmt::Debug>(
    v: &ValueTable<S>,
    s: &S,
) -> Result<Continous> {
    v.get(s)
        .copied()
        .ok_or_else(|| MdpError::MissingValue(format!("{s:?}")))
}

pub(crate) fn finite<S: std::fmt::Debug>(s: &S, value: Continous) -> Result<Continous> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MdpError::NonFiniteValue {
            state: format!("{s:?}"),
            value,
        })
    }
}

/// Bellman optimality backup for a single state:
///
/// `V(s) = max_a sum_{s'} p(s' | s, a) [r(s, a, s') + gamma V(s')]`
pub struct BellmanUpdate<E> {
    mdp: Rc<E>,
    gamma: Continous,
}

impl<E> Clone for BellmanUpdate<E> {
    fn clone(&self) -> Self {
        Self {
            mdp: Rc::clone(&self.mdp),
            gamma: self.gamma,
        }
    }
}

impl<E: Mdp> BellmanUpdate<E> {
    pub fn new(mdp: Rc<E>, gamma: Continous) -> Result<Self> {
        validate_gamma(gamma)?;
        Ok(Self { mdp, gamma })
    }

    pub fn mdp(&self) -> &E {
        &self.mdp
    }

    pub fn gamma(&self) -> Continous {
        self.gamma
    }

    pub fn q_value(
        &self,
        s: &E::State,
        a: &E::Action,
        v: &ValueTable<E::State>,
    ) -> Result<Continous> {
        let mut q = 0.;
        for s_prime in self.mdp.states() {
            let p = self.mdp.transition(s, a, s_prime);
            q += p * (self.mdp.reward(s, a, s_prime) + self.gamma * value_of(v, s_prime)?);
        }

        Ok(q)
    }

    pub fn q_values(&self, s: &E::State, v: &ValueTable<E::State>) -> Result<QValues<E::Action>> {
        let actions = self.mdp.actions(s);
        if actions.is_empty() {
            return Err(MdpError::InvalidState(format!("{s:?}")));
        }

        actions
            .into_iter()
            .map(|a| {
                let q = self.q_value(s, &a, v)?;
                Ok((a, q))
            })
            .collect()
    }

    /// Leaves `v` untouched. Fails on a NaN or infinite Q-value instead of
    /// letting `max` skip it.
    pub fn evaluate(&self, s: &E::State, v: &ValueTable<E::State>) -> Result<Continous> {
        let mut vs = Continous::NEG_INFINITY;
        for (_, q) in self.q_values(s, v)? {
            vs = vs.max(finite(s, q)?);
        }
        trace!(s = ?s, v = vs, "Bellman update");

        Ok(vs)
    }
}
