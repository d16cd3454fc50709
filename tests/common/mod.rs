use gridworld_mdp::*;
use std::rc::Rc;

#[allow(dead_code)]
pub fn reference_world() -> Rc<GridWorld> {
    Rc::new(GridWorld::new(GridWorldConfig::default()).unwrap())
}

#[allow(dead_code)]
pub fn solve(world: &Rc<GridWorld>, config: SolverConfig) -> SolvedMdp<GridWorld> {
    MdpSolver::new(Rc::clone(world), config)
        .unwrap()
        .solve()
        .unwrap()
}

#[allow(dead_code)]
pub fn policy_actions(solved: &SolvedMdp<GridWorld>, s: Cell) -> Vec<Move> {
    solved.pi_star(&s).unwrap().actions().copied().collect()
}
