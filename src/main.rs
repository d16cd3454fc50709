use clap::Parser;
use gridworld_mdp::*;
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Solve a grid world with value iteration, then let the agent play it.
#[derive(Parser, Debug)]
#[command(name = "gridworld-mdp")]
struct Cli {
    /// TOML file with optional [solver], [grid_world] and [episode] tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for action sampling. Entropy seeded when absent.
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between narrated steps, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Stop the episode after this many steps.
    #[arg(long)]
    max_steps: Option<usize>,

    #[arg(long, value_enum)]
    sweep: Option<SweepMode>,

    /// Also print the converged value table as JSON.
    #[arg(long)]
    json: bool,

    /// Write the effective configuration (file plus flags) as TOML.
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

#[derive(Serialize)]
struct StateValue {
    state: Cell,
    value: Continous,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config {
            episode: EpisodeConfig {
                step_delay_ms: 1000,
                ..Default::default()
            },
            ..Default::default()
        },
    };

    if cli.seed.is_some() {
        config.episode.seed = cli.seed;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.episode.step_delay_ms = delay_ms;
    }
    if cli.max_steps.is_some() {
        config.episode.max_steps = cli.max_steps;
    }
    if let Some(sweep) = cli.sweep {
        config.solver.sweep = sweep;
    }

    config.validate()?;
    Ok(config)
}

fn play(world: &GridWorld, solved: &SolvedMdp<GridWorld>, episode: &EpisodeConfig) -> Result<()> {
    let delay = Duration::from_millis(episode.step_delay_ms);

    println!("Starting Grid-World MDP Game!");
    thread::sleep(delay);
    println!("\nAgent at: {:?}", world.start());

    let mut runner =
        EpisodeRunner::new(world, solved, episode.seed).with_max_steps(episode.max_steps);
    let ep = runner.run(world.start(), |e| {
        thread::sleep(delay);
        println!("\nAgent at: {:?}", e.s_prime);
    })?;

    match ep.outcome {
        EpisodeOutcome::Terminated(Termination::ReachedGoal) => {
            println!("\nAgent reached the GOAL! 🎉")
        }
        EpisodeOutcome::Terminated(Termination::FellIntoTrap) => {
            println!("\nAgent fell into a TRAP! 😭")
        }
        EpisodeOutcome::Terminated(Termination::Done) => println!("\nEpisode finished."),
        EpisodeOutcome::Truncated => {
            println!("\nAgent gave up after {} steps.", ep.events.len())
        }
    }
    println!("Total reward: {}", ep.total_reward());

    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    if let Some(path) = &cli.dump_config {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
    }

    let world = Rc::new(GridWorld::new(config.grid_world.clone())?);
    let solver = MdpSolver::new(Rc::clone(&world), config.solver.clone())?;
    let solved = solver.solve()?;

    println!(
        "Gamma: {}, Theta: {}, Sweeps: {}",
        config.solver.gamma, config.solver.theta, solved.sweeps
    );
    println!("\nValues:\n{}", world.render_values(solved.values()));
    println!("\nPolicy:\n{}\n", world.render_policy(&solved)?);

    if cli.json {
        let values = world
            .states()
            .iter()
            .filter_map(|s| solved.v_star(s).map(|value| StateValue { state: *s, value }))
            .collect::<Vec<_>>();
        println!("{}\n", serde_json::to_string_pretty(&values)?);
    }

    play(&world, &solved, &config.episode)
}
