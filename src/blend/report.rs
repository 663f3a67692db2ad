//! Plain-text rendering of blend results.

use super::interpreter::{BlendOutcome, BlendSolution};
use std::fmt;

impl fmt::Display for BlendSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "status: {:?}  total |deviation|: {:.4} pp  ({} ms)",
            self.status, self.total_abs_deviation, self.solve_time_ms
        )?;
        writeln!(f, "{:<12} {:<20} {:>10}", "material", "name", "share %")?;
        for share in &self.shares {
            writeln!(f, "{:<12} {:<20} {:>10.4}", share.id, share.name, share.percent)?;
        }
        writeln!(
            f,
            "{:<6} {:>10} {:>10} {:>10}",
            "sieve", "target %", "blend %", "dev pp"
        )?;
        for (s, sieve) in self.sieves.iter().enumerate() {
            writeln!(
                f,
                "{:<6} {:>10.4} {:>10.4} {:>+10.4}",
                s, sieve.target_percent, sieve.achieved_percent, sieve.deviation_percent
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for BlendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlendOutcome::Solved(s) => write!(f, "{s}"),
            BlendOutcome::Infeasible(failure) => {
                writeln!(f, "infeasible: {}", failure.diagnostics)
            }
            BlendOutcome::Unknown(failure) => {
                writeln!(f, "unknown ({:?}): {}", failure.status, failure.diagnostics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::{MaterialShare, SieveResult, SolveFailure};
    use crate::cp::SolverStatus;

    fn solution() -> BlendSolution {
        BlendSolution {
            status: SolverStatus::Optimal,
            shares: vec![
                MaterialShare {
                    id: "M1".into(),
                    name: "Coarse".into(),
                    units: 5_555,
                    percent: 55.55,
                },
                MaterialShare {
                    id: "M2".into(),
                    name: "Fine".into(),
                    units: 4_445,
                    percent: 44.45,
                },
            ],
            sieves: vec![SieveResult {
                target_percent: 80.0,
                achieved_percent: 78.89,
                deviation_percent: -1.11,
            }],
            objective_units: 11_100,
            total_abs_deviation: 1.11,
            solve_time_ms: 3,
        }
    }

    #[test]
    fn test_solution_table() {
        let text = solution().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("status: Optimal"));
        assert!(lines[2].contains("M1") && lines[2].contains("55.5500"));
        assert!(lines[3].contains("Fine") && lines[3].contains("44.4500"));
        assert!(lines[5].contains("78.8900") && lines[5].contains("-1.1100"));
    }

    #[test]
    fn test_failure_text() {
        let outcome = BlendOutcome::Infeasible(SolveFailure {
            status: SolverStatus::Infeasible,
            diagnostics: "no blend satisfies all constraints".into(),
            solve_time_ms: 0,
        });
        assert_eq!(
            outcome.to_string(),
            "infeasible: no blend satisfies all constraints\n"
        );
    }
}
