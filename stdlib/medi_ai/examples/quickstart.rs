use medi_ai::{decide, explain, heart_disease_policy};
use medi_model::ModelOutput;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Threshold decision on a model probability
    let decision = decide(&heart_disease_policy(), ModelOutput::Probability(0.73))?;
    println!(
        "{} ({:?}): {}",
        decision.outcome.label, decision.outcome.severity, decision.outcome.advisory
    );

    // Contributions of a linear model
    let explanation = explain(&[0.2, 0.5, -0.3], 0.1, &["age", "bmi", "a1c"], &[0.4, 0.2, 0.9])?;
    for c in explanation.top(2) {
        println!("{:>6} {:+.3}", c.feature, c.contribution);
    }
    Ok(())
}
