//! Pairwise conflict detection and priority resolution on planned moves.
//!
//! Runs after routing and before movement commit. Each unordered pair of
//! contenders is checked once, in id order, with no second pass:
//!
//! - **Convergent**: both plan the same cell.
//! - **Swap**: each plans the other's current cell (head-on).
//!
//! The train farther from its destination keeps its move and the nearer one
//! is held in place for the tick. Equal distances crash both.
//!
//! A held train plans its own cell, so later pairs involving it see a
//! stationary train without re-evaluating earlier pairs. Conflicts among
//! three or more trains therefore resolve only as far as the pairwise
//! outcomes reach, in enumeration order.
//!
//! A crashed train is skipped as the later member of a pair and as the start
//! of a new row, but the row it crashed in keeps running: a train that ties
//! with one partner can still tie with another.

use crate::grid::{Direction, Position};
use crate::id::TrainId;
use crate::train::PlannedMove;

/// One train's view for collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender {
    pub train: TrainId,
    pub position: Position,
    pub direction: Direction,
    pub destination: Position,
    pub plan: PlannedMove,
    /// Set by the resolver on a tie.
    pub crashed: bool,
}

impl Contender {
    fn distance(&self) -> u32 {
        self.position.manhattan(self.destination)
    }

    fn hold(&mut self) {
        self.plan = PlannedMove::hold(self.position, self.direction);
    }
}

/// Shape of a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Convergent,
    Swap,
}

/// How a conflict was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// `held` waits this tick; `priority` keeps its move.
    Yield { priority: TrainId, held: TrainId },
    /// Equal distances; both trains crash.
    Tie { a: TrainId, b: TrainId },
}

/// A resolved conflict between two trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub kind: CollisionKind,
    pub outcome: CollisionOutcome,
}

/// Resolve conflicts in place. `contenders` must be in train-id order.
/// Returns every conflict found, in the order it was settled.
pub fn resolve_collisions(contenders: &mut [Contender]) -> Vec<Collision> {
    let mut collisions = Vec::new();

    for i in 0..contenders.len() {
        // Checked once per outer train: a train that ties with one partner
        // is still compared against the rest of the row.
        if contenders[i].crashed {
            continue;
        }
        for j in (i + 1)..contenders.len() {
            if contenders[j].crashed {
                continue;
            }

            if contenders[i].plan.target == contenders[j].plan.target {
                collisions.push(settle(contenders, i, j, CollisionKind::Convergent));
            }

            let (a, b) = (&contenders[i], &contenders[j]);
            if a.plan.target == b.position && b.plan.target == a.position {
                collisions.push(settle(contenders, i, j, CollisionKind::Swap));
            }
        }
    }

    collisions
}

fn settle(contenders: &mut [Contender], i: usize, j: usize, kind: CollisionKind) -> Collision {
    let dist_i = contenders[i].distance();
    let dist_j = contenders[j].distance();
    let (id_i, id_j) = (contenders[i].train, contenders[j].train);

    let outcome = if dist_i == dist_j {
        contenders[i].crashed = true;
        contenders[j].crashed = true;
        CollisionOutcome::Tie { a: id_i, b: id_j }
    } else if dist_i > dist_j {
        contenders[j].hold();
        CollisionOutcome::Yield {
            priority: id_i,
            held: id_j,
        }
    } else {
        contenders[i].hold();
        CollisionOutcome::Yield {
            priority: id_j,
            held: id_i,
        }
    };

    tracing::debug!(?kind, ?outcome, "collision resolved");
    Collision { kind, outcome }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn contender(
        id: u32,
        pos: (i32, i32),
        dir: Direction,
        dest: (i32, i32),
        target: (i32, i32),
    ) -> Contender {
        let position = Position::new(pos.0, pos.1);
        Contender {
            train: TrainId(id),
            position,
            direction: dir,
            destination: Position::new(dest.0, dest.1),
            plan: PlannedMove::advance(Position::new(target.0, target.1), dir),
            crashed: false,
        }
    }

    #[test]
    fn no_conflict_leaves_plans_untouched() {
        let mut cs = vec![
            contender(0, (0, 0), Direction::Right, (5, 0), (1, 0)),
            contender(1, (0, 2), Direction::Right, (5, 2), (1, 2)),
        ];
        let before = cs.clone();
        assert!(resolve_collisions(&mut cs).is_empty());
        assert_eq!(cs, before);
    }

    #[test]
    fn convergent_farther_train_has_priority() {
        // Train 0 is 8 from its destination, train 1 is 3.
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (10, 3), (3, 3)),
            contender(1, (3, 2), Direction::Down, (3, 5), (3, 3)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(
            result,
            vec![Collision {
                kind: CollisionKind::Convergent,
                outcome: CollisionOutcome::Yield {
                    priority: TrainId(0),
                    held: TrainId(1)
                },
            }]
        );
        assert_eq!(cs[0].plan.target, Position::new(3, 3));
        assert!(!cs[0].plan.held);
        assert_eq!(cs[1].plan, PlannedMove::hold(Position::new(3, 2), Direction::Down));
    }

    #[test]
    fn convergent_lower_id_can_be_held() {
        let mut cs = vec![
            contender(0, (3, 2), Direction::Down, (3, 5), (3, 3)),
            contender(1, (2, 3), Direction::Right, (10, 3), (3, 3)),
        ];
        resolve_collisions(&mut cs);
        assert!(cs[0].plan.held);
        assert!(!cs[1].plan.held);
    }

    #[test]
    fn convergent_tie_crashes_both() {
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (5, 3), (3, 3)),
            contender(1, (4, 3), Direction::Left, (1, 3), (3, 3)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].outcome,
            CollisionOutcome::Tie {
                a: TrainId(0),
                b: TrainId(1)
            }
        );
        assert!(cs[0].crashed && cs[1].crashed);
    }

    #[test]
    fn swap_tie_crashes_both() {
        let mut cs = vec![
            contender(0, (2, 0), Direction::Right, (4, 0), (3, 0)),
            contender(1, (3, 0), Direction::Left, (1, 0), (2, 0)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, CollisionKind::Swap);
        assert!(cs[0].crashed && cs[1].crashed);
    }

    #[test]
    fn swap_nearer_train_waits() {
        let mut cs = vec![
            contender(0, (2, 0), Direction::Right, (9, 0), (3, 0)),
            contender(1, (3, 0), Direction::Left, (1, 0), (2, 0)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(
            result[0].outcome,
            CollisionOutcome::Yield {
                priority: TrainId(0),
                held: TrainId(1)
            }
        );
        assert!(cs[1].plan.held);
        assert_eq!(cs[1].plan.target, Position::new(3, 0));
    }

    #[test]
    fn crashed_contender_skips_later_pairs() {
        // 0 and 1 tie on (3,3); 2 targets (3,3) too but is farther away.
        // 0 is still compared with 2 and yields to it; 1 crashed during
        // pair (0,1) so its own row is skipped.
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (5, 3), (3, 3)),
            contender(1, (4, 3), Direction::Left, (1, 3), (3, 3)),
            contender(2, (3, 2), Direction::Down, (3, 9), (3, 3)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(result.len(), 2);
        assert!(cs[0].crashed && cs[1].crashed);
        assert!(!cs[2].crashed);
        assert!(!cs[2].plan.held);
    }

    #[test]
    fn tied_train_keeps_colliding_along_its_row() {
        // All three target (3,3), each four cells from its destination.
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (6, 3), (3, 3)),
            contender(1, (4, 3), Direction::Left, (0, 3), (3, 3)),
            contender(2, (3, 2), Direction::Down, (3, 6), (3, 3)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(result.len(), 2);
        assert!(cs.iter().all(|c| c.crashed));
        assert_eq!(
            result[1].outcome,
            CollisionOutcome::Tie {
                a: TrainId(0),
                b: TrainId(2)
            }
        );
    }

    #[test]
    fn three_way_convergence_resolves_pairwise_in_order() {
        // All three target (3,3). Distances: 0 -> 10, 1 -> 5, 2 -> 7.
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (12, 3), (3, 3)),
            contender(1, (3, 2), Direction::Down, (3, 7), (3, 3)),
            contender(2, (4, 3), Direction::Left, (-3, 3), (3, 3)),
        ];
        let result = resolve_collisions(&mut cs);
        // (0,1): 1 held. (0,2): 2 held. (1,2): no longer convergent.
        assert_eq!(result.len(), 2);
        assert!(!cs[0].plan.held);
        assert!(cs[1].plan.held);
        assert!(cs[2].plan.held);
    }

    #[test]
    fn held_train_can_still_be_struck() {
        // 1 is held by 0, then 2 plans into 1's (now stationary) cell.
        let mut cs = vec![
            contender(0, (2, 3), Direction::Right, (12, 3), (3, 3)),
            contender(1, (3, 2), Direction::Down, (3, 5), (3, 3)),
            contender(2, (3, 1), Direction::Down, (3, 9), (3, 2)),
        ];
        let result = resolve_collisions(&mut cs);
        assert_eq!(result.len(), 2);
        // (1,2) convergent on (3,2): 1 at distance 3, 2 at distance 8.
        assert_eq!(
            result[1].outcome,
            CollisionOutcome::Yield {
                priority: TrainId(2),
                held: TrainId(1)
            }
        );
        // Train 2 keeps a move into the cell train 1 is holding: the
        // single-pass resolver does not revisit the hold.
        assert_eq!(cs[2].plan.target, Position::new(3, 2));
        assert!(cs[1].plan.held);
    }
}
