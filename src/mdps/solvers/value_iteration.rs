use super::bellman::{finite, value_of, BellmanUpdate};
use crate::config::{validate_max_iterations, validate_positive, SweepMode};
use crate::mdps::mdp::*;
use crate::{Continous, MdpError, Result};
use tracing::{debug, info};

/// Value iteration - Sutton & Barto 2018, section 4.4.
///
/// Sweeps every state in the order given by the state space until the
/// largest per-state change in a sweep is at most `theta`. With no
/// iteration cap a non-contracting model (e.g. `gamma >= 1`) never returns.
pub struct ValueIteration<E> {
    bellman_update: BellmanUpdate<E>,
    theta: Continous,
    sweep: SweepMode,
    max_iterations: Option<usize>,
}

impl<E: Mdp> ValueIteration<E> {
    pub fn new(bellman_update: BellmanUpdate<E>, theta: Continous) -> Result<Self> {
        validate_positive("theta", theta)?;

        Ok(Self {
            bellman_update,
            theta,
            sweep: SweepMode::default(),
            max_iterations: None,
        })
    }

    pub fn with_sweep(mut self, sweep: SweepMode) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Result<Self> {
        validate_max_iterations(max_iterations)?;
        self.max_iterations = max_iterations;
        Ok(self)
    }

    pub fn theta(&self) -> Continous {
        self.theta
    }

    pub fn solve(&self, v: ValueTable<E::State>) -> Result<ValueTable<E::State>> {
        self.exec(v).map(|(v, _)| v)
    }

    /// Returns the converged table and the number of sweeps it took.
    pub fn exec(&self, mut v: ValueTable<E::State>) -> Result<(ValueTable<E::State>, usize)> {
        for s in self.bellman_update.mdp().states() {
            finite(s, value_of(&v, s)?)?;
        }

        let mut sweeps = 0;
        loop {
            let delta = self.sweep(&mut v)?;
            sweeps += 1;
            debug!(sweep = sweeps, delta, "Value iteration sweep");

            if delta.is_finite() && delta <= self.theta {
                info!(sweeps, delta, "Value iteration converged");
                return Ok((v, sweeps));
            }

            if self.max_iterations.is_some_and(|max| sweeps >= max) {
                return Err(MdpError::NonConvergence { sweeps, delta });
            }
        }
    }

    fn sweep(&self, v: &mut ValueTable<E::State>) -> Result<Continous> {
        match self.sweep {
            SweepMode::GaussSeidel => self.sweep_in_place(v),
            SweepMode::Synchronous => self.sweep_synchronous(v),
        }
    }

    fn sweep_in_place(&self, v: &mut ValueTable<E::State>) -> Result<Continous> {
        let mut delta: Continous = 0.;
        for s in self.bellman_update.mdp().states() {
            let old = value_of(v, s)?;
            let new = self.bellman_update.evaluate(s, v)?;
            delta = delta.max((old - new).abs());
            v.insert(s.clone(), new);
        }

        Ok(delta)
    }

    fn sweep_synchronous(&self, v: &mut ValueTable<E::State>) -> Result<Continous> {
        let frozen = v.clone();
        let mut delta: Continous = 0.;
        for s in self.bellman_update.mdp().states() {
            let old = value_of(&frozen, s)?;
            let new = self.bellman_update.evaluate(s, &frozen)?;
            delta = delta.max((old - new).abs());
            v.insert(s.clone(), new);
        }

        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridWorld, GridWorldConfig, TabularMdp, Transition, Transitions};
    use float_eq::*;
    use rstest::*;
    use std::rc::Rc;

    fn self_loop(reward: Continous) -> TabularMdp {
        TabularMdp::new(Transitions::from([
            (
                (0, 0),
                vec![Transition {
                    next_state: 0,
                    probability: 1.,
                    reward,
                    done: false,
                }],
            ),
            (
                (0, 1),
                vec![Transition {
                    next_state: 0,
                    probability: 1.,
                    reward,
                    done: false,
                }],
            ),
        ]))
        .unwrap()
    }

    fn value_iteration<E: Mdp>(
        mdp: Rc<E>,
        gamma: Continous,
        theta: Continous,
    ) -> ValueIteration<E> {
        ValueIteration::new(BellmanUpdate::new(mdp, gamma).unwrap(), theta).unwrap()
    }

    #[rstest]
    #[case(SweepMode::GaussSeidel)]
    #[case(SweepMode::Synchronous)]
    fn single_state_geometric_series(#[case] sweep: SweepMode) {
        let mdp = Rc::new(self_loop(-1.));
        let vi = value_iteration(Rc::clone(&mdp), 0.9, 1e-10).with_sweep(sweep);

        let v = vi.solve(zero_values(mdp.states())).unwrap();

        assert_float_eq!(v[&0], -10., abs <= 1e-8);
    }

    #[rstest]
    #[case(SweepMode::GaussSeidel)]
    #[case(SweepMode::Synchronous)]
    fn simple_golf_converges(#[case] sweep: SweepMode) {
        let mdp = Rc::new(TabularMdp::simple_golf());
        let vi = value_iteration(Rc::clone(&mdp), 0.9, 1e-8).with_sweep(sweep);

        let v = vi.solve(zero_values(mdp.states())).unwrap();

        let v1 = 9. / 0.91;
        let v0 = 0.81 * v1 / 0.91;
        assert_float_eq!(v[&0], v0, abs <= 1e-6);
        assert_float_eq!(v[&1], v1, abs <= 1e-6);
        assert_float_eq!(v[&2], 0., abs <= 1e-12);
    }

    /// From zeros, (1, 1) is swept after (0, 1). In place it already sees
    /// V(0, 1) = 100 and backs up -1 + 0.9 * 100; from a frozen copy it
    /// only sees the old 0.
    #[rstest]
    #[case(SweepMode::GaussSeidel, 89.)]
    #[case(SweepMode::Synchronous, -1.)]
    fn first_sweep_on_reference_grid(
        #[case] sweep: SweepMode,
        #[case] v_block: Continous,
    ) {
        let world = Rc::new(GridWorld::new(GridWorldConfig::default()).unwrap());
        let vi = value_iteration(Rc::clone(&world), 0.9, 1e-4).with_sweep(sweep);
        let mut v = zero_values(world.states());

        let delta = vi.sweep(&mut v).unwrap();

        assert_float_eq!(delta, 100., abs <= 1e-12);
        assert_float_eq!(v[&(0, 1)], 100., abs <= 1e-12);
        assert_float_eq!(v[&(1, 1)], v_block, abs <= 1e-12);
        assert_float_eq!(v[&(0, 0)], -1., abs <= 1e-12);
        assert_float_eq!(v[&(0, 2)], 0., abs <= 1e-12);
    }

    struct NanReward {
        states: Vec<i32>,
    }

    impl StateSpace for NanReward {
        type State = i32;

        fn states(&self) -> &[i32] {
            &self.states
        }
    }

    impl ActionSpace for NanReward {
        type Action = i32;

        fn actions(&self, _s: &i32) -> Vec<i32> {
            vec![0, 1]
        }
    }

    impl TransitionModel for NanReward {
        fn transition(&self, _s: &i32, _a: &i32, _s_prime: &i32) -> Continous {
            1.
        }
    }

    impl RewardModel for NanReward {
        fn reward(&self, _s: &i32, a: &i32, _s_prime: &i32) -> Continous {
            if *a == 0 {
                Continous::NAN
            } else {
                -1.
            }
        }
    }

    #[rstest]
    #[case(SweepMode::GaussSeidel)]
    #[case(SweepMode::Synchronous)]
    fn nan_reward_fails_the_solve(#[case] sweep: SweepMode) {
        let mdp = Rc::new(NanReward { states: vec![0] });
        let vi = value_iteration(Rc::clone(&mdp), 0.9, 1e-4).with_sweep(sweep);

        let ret = vi.solve(zero_values(mdp.states()));

        assert!(matches!(ret, Err(MdpError::NonFiniteValue { .. })));
    }

    #[rstest]
    #[case(Continous::NAN)]
    #[case(Continous::INFINITY)]
    fn non_finite_initial_guess_is_rejected(#[case] guess: Continous) {
        let mdp = Rc::new(TabularMdp::simple_golf());
        let vi = value_iteration(mdp, 0.9, 1e-4);

        assert!(matches!(
            vi.solve(ValueTable::from([(0, 0.), (1, guess), (2, 0.)])),
            Err(MdpError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn converged_table_is_a_fixed_point() {
        let mdp = Rc::new(TabularMdp::simple_golf());
        let theta = 1e-4;
        let bu = BellmanUpdate::new(Rc::clone(&mdp), 0.9).unwrap();
        let vi = ValueIteration::new(bu.clone(), theta).unwrap();

        let v = vi.solve(zero_values(mdp.states())).unwrap();

        for s in mdp.states() {
            assert!((bu.evaluate(s, &v).unwrap() - v[s]).abs() <= theta);
        }
    }

    #[test]
    fn re_solving_a_converged_table_is_idempotent() {
        let world = Rc::new(GridWorld::new(GridWorldConfig::default()).unwrap());
        let vi = value_iteration(Rc::clone(&world), 0.9, 1e-4);

        let (v, _) = vi.exec(zero_values(world.states())).unwrap();
        let (again, sweeps) = vi.exec(v.clone()).unwrap();

        assert_eq!(sweeps, 1);
        assert_eq!(again, v);
    }

    #[test]
    fn any_initial_guess_converges_to_the_same_values() {
        let world = Rc::new(GridWorld::new(GridWorldConfig::default()).unwrap());
        let vi = value_iteration(Rc::clone(&world), 0.9, 1e-6);
        let guess = world.states().iter().map(|s| (*s, 50.)).collect();

        let from_zero = vi.solve(zero_values(world.states())).unwrap();
        let from_guess = vi.solve(guess).unwrap();

        for s in world.states() {
            assert_float_eq!(from_zero[s], from_guess[s], abs <= 1e-4);
        }
    }

    #[test]
    fn iteration_cap_is_reported_as_non_convergence() {
        let mdp = Rc::new(self_loop(-1.));
        let vi = value_iteration(Rc::clone(&mdp), 0.9, 1e-10)
            .with_max_iterations(Some(5))
            .unwrap();

        let ret = vi.exec(zero_values(mdp.states()));

        match ret {
            Err(MdpError::NonConvergence { sweeps, delta }) => {
                assert_eq!(sweeps, 5);
                assert_float_eq!(delta, 0.9_f64.powi(4), abs <= 1e-12);
            }
            other => panic!("Expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_construction_arguments() {
        let mdp = Rc::new(self_loop(-1.));
        let bu = BellmanUpdate::new(mdp, 0.9).unwrap();

        assert!(matches!(
            ValueIteration::new(bu.clone(), 0.),
            Err(MdpError::Configuration(_))
        ));
        assert!(matches!(
            ValueIteration::new(bu, 1e-4).unwrap().with_max_iterations(Some(0)),
            Err(MdpError::Configuration(_))
        ));
    }

    #[test]
    fn incomplete_initial_table_is_rejected() {
        let mdp = Rc::new(TabularMdp::simple_golf());
        let vi = value_iteration(mdp, 0.9, 1e-4);

        assert!(matches!(
            vi.solve(ValueTable::from([(0, 0.)])),
            Err(MdpError::MissingValue(_))
        ));
    }
}
