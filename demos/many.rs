use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use recourse_match::{Bank, Engine, EngineConfig, Problem, Seeker};

const SEEKERS: u32 = 64;
const BANKS: u32 = 8;
const DIMENSION: usize = 4;
const N: usize = 100;

fn main() -> Result<(), recourse_match::MatchError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut rng = SmallRng::seed_from_u64(2024);
    let engine = Engine::new(EngineConfig::default())?;
    let mut total_objective = 0.;
    let mut total_bound = 0.;
    for _ in 0..N {
        let seekers = (0..SEEKERS)
            .map(|id| {
                let x: Vec<f64> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
                Seeker::from_slice(id, &x)
            })
            .collect();
        let banks = (0..BANKS)
            .map(|id| {
                let w: Vec<f64> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
                Bank::from_slice(id, &w, rng.gen_range(-0.5..0.5), rng.gen_range(2..10))
            })
            .collect();
        let outcome = engine.run(&Problem::new(seekers, banks)?)?;
        total_objective += outcome.objective;
        total_bound += outcome.global_bound;
    }

    println!("objective: {total_objective:.3}, bound: {total_bound:.3}");
    Ok(())
}
