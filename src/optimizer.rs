use std::collections::{BTreeSet, HashSet};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    microlp, variable,
};
use thiserror::Error;

use crate::entities::{Player, Position, RosterEntry, SquadComposition};

/// Solver backends report binaries as floats; anything at or below this
/// is treated as unselected so a 1e-9 truthy-zero can never pick a
/// player.
const BINARY_EPSILON: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum SolveError {
    /// The constraint families cannot be satisfied together. Distinct
    /// from an empty selection: callers must never mistake this for a
    /// valid zero-player roster.
    #[error("no feasible squad under the given constraints")]
    Infeasible,
    #[error("solver exceeded the {0:?} time limit")]
    Timeout(Duration),
    #[error("solver failure: {0}")]
    Solver(String),
}

#[derive(Debug, Clone)]
pub struct Squad {
    /// Selected players joined back to their full rows, in input order
    /// of first match.
    pub entries: Vec<RosterEntry>,
    pub objective: f64,
}

/// Pick the squad maximising `score_feature` subject to the budget, the
/// exact per-position counts, and the per-club cap. One binary decision
/// variable per unique player id; duplicate ids keep their first
/// occurrence. The solve runs on a worker thread and fails closed with
/// `Timeout` rather than hanging the caller on a pathological input.
pub fn solve<F>(
    pool: &[Player],
    composition: &SquadComposition,
    max_per_club: usize,
    budget: u32,
    timeout: Duration,
    score_feature: F,
) -> Result<Squad, SolveError>
where
    F: Fn(&Player) -> f64,
{
    let mut seen = HashSet::new();
    let mut candidates: Vec<(Player, f64)> = Vec::with_capacity(pool.len());
    for player in pool {
        if seen.insert(player.id) {
            let score = score_feature(player);
            candidates.push((player.clone(), score));
        }
    }

    // Cheap infeasibility check before handing the model to the solver.
    for position in Position::ALL {
        let available = candidates
            .iter()
            .filter(|(player, _)| player.position == position)
            .count();
        if available < composition.count(position) {
            return Err(SolveError::Infeasible);
        }
    }

    let composition = *composition;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(solve_model(candidates, composition, max_per_club, budget));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        // The worker is left to finish and its result dropped.
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SolveError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(SolveError::Solver("solver worker exited without a result".into()))
        }
    }
}

fn solve_model(
    candidates: Vec<(Player, f64)>,
    composition: SquadComposition,
    max_per_club: usize,
    budget: u32,
) -> Result<Squad, SolveError> {
    let mut problem = ProblemVariables::new();
    let selected: Vec<Variable> = candidates
        .iter()
        .map(|_| problem.add(variable().binary()))
        .collect();

    let objective: Expression = candidates
        .iter()
        .zip(&selected)
        .map(|((_, score), &var)| *score * var)
        .sum();

    let mut model = problem.maximise(objective).using(microlp);

    let total_cost: Expression = candidates
        .iter()
        .zip(&selected)
        .map(|((player, _), &var)| f64::from(player.cost) * var)
        .sum();
    model = model.with(constraint!(total_cost <= f64::from(budget)));

    // Exact counts: a squad has precisely the configured shape, not "up
    // to" it.
    for position in Position::ALL {
        let vars: Vec<Variable> = candidates
            .iter()
            .zip(&selected)
            .filter(|((player, _), _)| player.position == position)
            .map(|(_, &var)| var)
            .collect();
        // A position with no candidates and no requirement adds nothing;
        // the availability pre-check already rejected the under-supplied
        // case.
        if vars.is_empty() && composition.count(position) == 0 {
            continue;
        }
        let count: Expression = vars.into_iter().map(Expression::from).sum();
        model = model.with(constraint!(count == composition.count(position) as f64));
    }

    let clubs: BTreeSet<u32> = candidates.iter().map(|(player, _)| player.club).collect();
    for club in clubs {
        let count: Expression = candidates
            .iter()
            .zip(&selected)
            .filter(|((player, _), _)| player.club == club)
            .map(|(_, &var)| Expression::from(var))
            .sum();
        model = model.with(constraint!(count <= max_per_club as f64));
    }

    let solution = model.solve().map_err(|err| match err {
        ResolutionError::Infeasible => SolveError::Infeasible,
        other => SolveError::Solver(other.to_string()),
    })?;

    // Selection is read straight off the index->variable mapping; ids
    // are never recovered from solver-generated names.
    let mut entries = Vec::new();
    let mut objective = 0.0;
    for ((player, score), &var) in candidates.iter().zip(&selected) {
        if solution.value(var) > BINARY_EPSILON {
            objective += *score;
            entries.push(RosterEntry {
                player: player.clone(),
                score: *score,
            });
        }
    }
    Ok(Squad { entries, objective })
}
