use crate::mdps::{mdp::*, mdp_simulator::*};
use crate::{Continous, Discrete, MdpError, Result};
use itertools::{iproduct, Itertools};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `(row, col)`, row 0 at the top.
pub type Cell = (Discrete, Discrete);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn delta(&self) -> Cell {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Move::Up => '^',
            Move::Down => 'v',
            Move::Left => '<',
            Move::Right => '>',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub goal: Continous,
    pub trap: Continous,
    /// Charged for every other move, including bumping into a wall or block.
    pub step: Continous,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            goal: 100.,
            trap: -100.,
            step: -1.,
        }
    }
}

/// Description of a grid world. Owned by the caller and handed to
/// [`GridWorld::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridWorldConfig {
    pub rows: Discrete,
    pub cols: Discrete,
    pub goal: Cell,
    pub trap: Cell,
    pub blocks: Vec<Cell>,
    pub start: Cell,
    pub rewards: Rewards,
}

impl Default for GridWorldConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            goal: (0, 2),
            trap: (1, 2),
            blocks: vec![(1, 1)],
            start: (0, 0),
            rewards: Rewards::default(),
        }
    }
}

impl GridWorldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows < 1 || self.cols < 1 {
            return Err(MdpError::Configuration(format!(
                "Grid must have at least one cell, got {}x{}.",
                self.rows, self.cols
            )));
        }

        let inside = |c: &Cell| (0..self.rows).contains(&c.0) && (0..self.cols).contains(&c.1);
        let mut cells = vec![("goal", self.goal), ("trap", self.trap), ("start", self.start)];
        cells.extend(self.blocks.iter().map(|b| ("block", *b)));
        for (name, cell) in &cells {
            if !inside(cell) {
                return Err(MdpError::Configuration(format!(
                    "The {name} {cell:?} lies outside the {}x{} grid.",
                    self.rows, self.cols
                )));
            }
        }

        if self.goal == self.trap {
            return Err(MdpError::Configuration(format!(
                "Goal and trap share the cell {:?}.",
                self.goal
            )));
        }

        for (name, cell) in [("goal", self.goal), ("trap", self.trap), ("start", self.start)] {
            if self.blocks.contains(&cell) {
                return Err(MdpError::Configuration(format!(
                    "The {name} {cell:?} is blocked."
                )));
            }
        }

        let rewards = [self.rewards.goal, self.rewards.trap, self.rewards.step];
        if rewards.iter().any(|r| !r.is_finite()) {
            return Err(MdpError::Configuration(format!(
                "Rewards must be finite, got {rewards:?}."
            )));
        }

        Ok(())
    }
}

/// Deterministic grid world. Goal and trap are absorbing: once there every
/// move keeps the agent in place for zero reward. Moves off the grid or into
/// a blocked cell leave the agent where it is.
#[derive(Debug, Clone)]
pub struct GridWorld {
    config: GridWorldConfig,
    states: Vec<Cell>,
    blocks: HashSet<Cell>,
}

impl GridWorld {
    pub fn new(config: GridWorldConfig) -> Result<Self> {
        config.validate()?;

        let states = iproduct!(0..config.rows, 0..config.cols).collect();
        let blocks = config.blocks.iter().copied().collect();

        Ok(Self {
            config,
            states,
            blocks,
        })
    }

    pub fn config(&self) -> &GridWorldConfig {
        &self.config
    }

    pub fn start(&self) -> Cell {
        self.config.start
    }

    pub fn goal(&self) -> Cell {
        self.config.goal
    }

    pub fn trap(&self) -> Cell {
        self.config.trap
    }

    pub fn contains(&self, c: &Cell) -> bool {
        (0..self.config.rows).contains(&c.0) && (0..self.config.cols).contains(&c.1)
    }

    pub fn is_blocked(&self, c: &Cell) -> bool {
        self.blocks.contains(c)
    }

    pub fn is_terminal(&self, c: &Cell) -> bool {
        *c == self.config.goal || *c == self.config.trap
    }

    pub fn next_state(&self, s: &Cell, a: &Move) -> Cell {
        if self.is_terminal(s) {
            return *s;
        }

        let (dr, dc) = a.delta();
        let next = (s.0 + dr, s.1 + dc);
        if !self.contains(&next) || self.is_blocked(&next) {
            *s
        } else {
            next
        }
    }

    pub fn render_values(&self, values: &ValueTable<Cell>) -> String {
        (0..self.config.rows)
            .map(|r| {
                (0..self.config.cols)
                    .map(|c| match values.get(&(r, c)) {
                        _ if self.is_blocked(&(r, c)) => format!("{:>8}", "#"),
                        Some(v) => format!("{v:>8.2}"),
                        None => format!("{:>8}", "?"),
                    })
                    .join(" ")
            })
            .join("\n")
    }

    /// One glyph per cell: `G` goal, `T` trap, `#` block, otherwise the
    /// arrows of every action the policy puts mass on.
    pub fn render_policy<P: Policy<Cell, Move>>(&self, policy: &P) -> Result<String> {
        let mut glyphs = vec![];
        for s in &self.states {
            let glyph = if *s == self.config.goal {
                "G".to_string()
            } else if *s == self.config.trap {
                "T".to_string()
            } else if self.is_blocked(s) {
                "#".to_string()
            } else {
                policy.policy(s)?.actions().map(Move::symbol).collect()
            };
            glyphs.push(glyph);
        }

        let width = glyphs.iter().map(|g| g.chars().count()).max().unwrap_or(1);
        let rendered = glyphs
            .chunks(self.config.cols as usize)
            .map(|row| {
                row.iter()
                    .map(|g| format!("{g:<width$}"))
                    .join(" ")
                    .trim_end()
                    .to_string()
            })
            .join("\n");
        Ok(rendered)
    }
}

impl StateSpace for GridWorld {
    type State = Cell;

    fn states(&self) -> &[Cell] {
        &self.states
    }
}

impl ActionSpace for GridWorld {
    type Action = Move;

    fn actions(&self, _s: &Cell) -> Vec<Move> {
        Move::ALL.to_vec()
    }
}

impl TransitionModel for GridWorld {
    fn transition(&self, s: &Cell, a: &Move, s_prime: &Cell) -> Continous {
        if self.next_state(s, a) == *s_prime {
            1.
        } else {
            0.
        }
    }
}

impl RewardModel for GridWorld {
    fn reward(&self, s: &Cell, _a: &Move, s_prime: &Cell) -> Continous {
        if self.is_terminal(s) {
            0.
        } else if *s_prime == self.config.goal {
            self.config.rewards.goal
        } else if *s_prime == self.config.trap {
            self.config.rewards.trap
        } else {
            self.config.rewards.step
        }
    }
}

impl EpisodeEnvironment for GridWorld {
    fn step(&self, _rng: &mut StdRng, s: &Cell, a: &Move) -> Result<StepInfo<Cell>> {
        let observation = self.next_state(s, a);

        Ok(StepInfo {
            observation,
            reward: self.reward(s, a, &observation),
        })
    }

    fn termination(&self, s: &Cell) -> Option<Termination> {
        if *s == self.config.goal {
            Some(Termination::ReachedGoal)
        } else if *s == self.config.trap {
            Some(Termination::FellIntoTrap)
        } else {
            None
        }
    }
}
