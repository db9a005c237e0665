use recourse_match::{Bank, Engine, EngineConfig, Problem, Seeker};

fn main() -> Result<(), recourse_match::MatchError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let problem = Problem::new(
        vec![
            Seeker::from_slice(1, &[1., 1.]),
            Seeker::from_slice(2, &[2., 0.5]),
            Seeker::from_slice(3, &[4., 2.]),
        ],
        vec![
            Bank::from_slice(10, &[1., 1.], -5., 1),
            Bank::from_slice(20, &[2., -1.], -1., 1),
        ],
    )?;

    let outcome = Engine::new(EngineConfig::default().with_beta(0.5))?.run(&problem)?;
    for m in &outcome.matches {
        println!(
            "seeker {} -> bank {}: cost {:.4}, weight {:.4}, target {:?}",
            m.seeker,
            m.bank,
            m.cost,
            m.weight,
            m.target.as_slice()
        );
    }
    for seeker in outcome.unassigned() {
        println!("seeker {seeker} unassigned");
    }
    println!(
        "objective {:.4} of bound {:.4} ({:.1}%)",
        outcome.objective,
        outcome.global_bound,
        100. * outcome.efficiency()
    );
    Ok(())
}
