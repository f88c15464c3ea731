use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kit::{Kit, SubsetRef};
use crate::plan::{Cut, Instruction};
use crate::types::{CutPositions, Offset};

/// Height reported when the kit cannot be packed at the requested width.
pub const INFEASIBLE: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Vertical cut positions to try.
    pub cut_positions: CutPositions,
    /// Skip horizontal splits whose halves cannot beat the best height by area.
    pub horizontal_area_bound: bool,
    /// Abort with [`Error::Timeout`] once this many milliseconds have passed.
    pub time_limit_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Minimum strip length, or [`INFEASIBLE`].
    pub height: u64,
    pub plan: Option<Instruction>,
    /// Number of recursive calls the search made.
    pub explored: u64,
}

impl Solution {
    pub fn is_feasible(&self) -> bool {
        self.height != INFEASIBLE
    }
}

pub struct Solver<'k> {
    kit: &'k Kit,
    config: SolverConfig,
}

impl<'k> Solver<'k> {
    pub fn new(kit: &'k Kit, config: SolverConfig) -> Self {
        Self { kit, config }
    }

    /// Minimum length of a strip of `width` that holds the whole kit under guillotine cuts.
    pub fn solve(&self, width: u32) -> Result<Solution> {
        if width == 0 {
            return Err(Error::InvalidWidth);
        }
        tracing::debug!(width, details = self.kit.detail_count(), "solving strip");

        let mut search = Search {
            kit: self.kit,
            config: self.config,
            deadline: self
                .config
                .time_limit_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            explored: 0,
        };
        let packing = search.solve(width, self.kit.full(), Offset::default())?;

        let solution = match packing {
            Some(packing) => Solution {
                height: packing.height,
                plan: Some(packing.plan),
                explored: search.explored,
            },
            None => Solution {
                height: INFEASIBLE,
                plan: None,
                explored: search.explored,
            },
        };
        tracing::debug!(
            width,
            height = solution.height,
            explored = solution.explored,
            feasible = solution.is_feasible(),
            "strip solved"
        );
        Ok(solution)
    }
}

struct Packing {
    height: u64,
    plan: Instruction,
}

impl Packing {
    /// No packing of `area` in `width` can be shorter than one that leaves no waste.
    fn is_tight(&self, width: u32, area: u128) -> bool {
        self.budget(width) == area
    }

    /// Largest area a piece of `width` can hold without exceeding this height.
    fn budget(&self, width: u32) -> u128 {
        self.height as u128 * width as u128
    }

    fn improved_by(&self, height: u64) -> bool {
        height < self.height
    }
}

/// One run of the branch-and-bound recursion. `None` marks an infeasible piece.
struct Search<'k> {
    kit: &'k Kit,
    config: SolverConfig,
    deadline: Option<Instant>,
    explored: u64,
}

impl Search<'_> {
    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(Error::Timeout(self.config.time_limit_ms.unwrap_or_default()))
            }
            _ => Ok(()),
        }
    }

    fn solve(&mut self, width: u32, subset: SubsetRef, origin: Offset) -> Result<Option<Packing>> {
        self.explored += 1;
        let kit = self.kit;

        if !kit.narrowest_fit(subset, width) {
            return Ok(None);
        }
        if let Some(rect) = kit.single_item(subset) {
            let plan = Instruction::detail(rect, width, origin);
            let height = if rect.long() <= width {
                rect.short()
            } else {
                rect.long()
            };
            let height = height as u64;
            return Ok(Some(Packing { height, plan }));
        }

        let vertical = self.solve_vertical(width, subset, origin)?;
        if let Some(v) = &vertical
            && v.is_tight(width, kit.area(subset))
        {
            return Ok(vertical);
        }
        let horizontal = self.solve_horizontal(width, subset, origin)?;

        Ok(match (vertical, horizontal) {
            (Some(v), Some(h)) => {
                if v.improved_by(h.height) {
                    Some(h)
                } else {
                    Some(v)
                }
            }
            (v, h) => v.or(h),
        })
    }

    fn solve_vertical(
        &mut self,
        width: u32,
        subset: SubsetRef,
        origin: Offset,
    ) -> Result<Option<Packing>> {
        self.check_deadline()?;
        let kit = self.kit;
        let area = kit.area(subset);
        let positions = kit.cut_positions(subset, width, self.config.cut_positions);
        if positions.is_empty() {
            return Ok(None);
        }

        let mut best: Option<Packing> = None;
        for (a, b) in kit.splits(subset) {
            self.check_deadline()?;
            if let Some(best) = &best {
                let budget = best.budget(width);
                if kit.area(a) > budget || kit.area(b) > budget {
                    continue;
                }
            }

            // Either half may take the narrow side of the cut.
            let orders = [(a, b), (b, a)];
            let orders = if a == b { &orders[..1] } else { &orders[..] };
            for &(left_ref, right_ref) in orders {
                for &z in &positions {
                    let Some(left) = self.solve(z, left_ref, origin)? else {
                        continue;
                    };
                    if best.as_ref().is_some_and(|b| !b.improved_by(left.height)) {
                        continue;
                    }
                    let right_origin = origin + Offset::new(z, 0);
                    let Some(right) = self.solve(width - z, right_ref, right_origin)? else {
                        continue;
                    };
                    let height = left.height.max(right.height);
                    if best.as_ref().is_none_or(|b| b.improved_by(height)) {
                        best = Some(Packing {
                            height,
                            plan: Instruction::cut(Cut::Vertical(z), origin, left.plan, right.plan),
                        });
                    }
                }
            }

            if best.as_ref().is_some_and(|b| b.is_tight(width, area)) {
                break;
            }
        }
        Ok(best)
    }

    fn solve_horizontal(
        &mut self,
        width: u32,
        subset: SubsetRef,
        origin: Offset,
    ) -> Result<Option<Packing>> {
        self.check_deadline()?;
        let kit = self.kit;
        let area = kit.area(subset);

        let mut best: Option<Packing> = None;
        for (a, b) in kit.splits(subset) {
            self.check_deadline()?;
            if self.config.horizontal_area_bound
                && let Some(best) = &best
            {
                let budget = best.budget(width);
                if kit.area(a) > budget || kit.area(b) > budget {
                    continue;
                }
            }

            let Some(bottom) = self.solve(width, a, origin)? else {
                continue;
            };
            if best.as_ref().is_some_and(|b| !b.improved_by(bottom.height)) {
                continue;
            }
            let top_origin = origin + Offset::new(0, bottom.height);
            let Some(top) = self.solve(width, b, top_origin)? else {
                continue;
            };
            // At most 2^20 details of u32 sides, far below INFEASIBLE.
            let height = bottom.height + top.height;
            if best.as_ref().is_none_or(|b| b.improved_by(height)) {
                best = Some(Packing {
                    height,
                    plan: Instruction::cut(
                        Cut::Horizontal(bottom.height),
                        origin,
                        bottom.plan,
                        top.plan,
                    ),
                });
            }

            if best.as_ref().is_some_and(|b| b.is_tight(width, area)) {
                break;
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Placement, Rect};

    fn sample_items() -> Vec<Rect> {
        let mut items = Rect::new(3, 1).repeat(2);
        items.extend(Rect::new(2, 1).maybe(true));
        items.push(Rect::new(2, 2));
        items.push(Rect::new(3, 2));
        items
    }

    fn solve(items: &[Rect], width: u32, config: SolverConfig) -> Solution {
        let kit = Kit::new(items).unwrap();
        Solver::new(&kit, config).solve(width).unwrap()
    }

    fn sorted(mut rects: Vec<Rect>) -> Vec<(u32, u32)> {
        let mut dims: Vec<(u32, u32)> = rects.drain(..).map(|r| (r.long(), r.short())).collect();
        dims.sort();
        dims
    }

    /// Validates a feasible solution:
    /// 1. Every detail lies within the strip width and the reported height
    /// 2. No two details overlap
    /// 3. The details placed are exactly the input multiset
    fn assert_solution_valid(sol: &Solution, width: u32, items: &[Rect]) {
        assert!(sol.is_feasible());
        let plan = sol.plan.as_ref().expect("feasible solution has a plan");
        let placements = plan.placements();

        for (i, p) in placements.iter().enumerate() {
            assert!(
                p.x + p.width <= width,
                "detail {i} ({}) exceeds strip width: x={} + width={} > {}",
                p.rect, p.x, p.width, width
            );
            assert!(
                p.y + p.height as u64 <= sol.height,
                "detail {i} ({}) exceeds strip length: y={} + height={} > {}",
                p.rect, p.y, p.height, sol.height
            );
            assert_eq!(
                (p.width.max(p.height), p.width.min(p.height)),
                (p.rect.long(), p.rect.short())
            );
        }
        assert_no_overlaps(&placements);
        assert_eq!(sorted(plan.details()), sorted(items.to_vec()));
    }

    fn assert_no_overlaps(placements: &[Placement]) {
        for i in 0..placements.len() {
            for j in (i + 1)..placements.len() {
                let a = &placements[i];
                let b = &placements[j];
                assert!(
                    !a.overlaps(b),
                    "detail {i} ({} @ ({},{})) overlaps detail {j} ({} @ ({},{}))",
                    a.rect, a.x, a.y, b.rect, b.x, b.y
                );
            }
        }
    }

    #[test]
    fn test_worked_example() {
        let items = sample_items();
        let sol = solve(&items, 4, SolverConfig::default());
        // Total area is 18, so a 4-wide strip needs at least 5.
        assert_eq!(sol.height, 5);
        assert_solution_valid(&sol, 4, &items);
        assert!(sol.explored > 0);
    }

    #[test]
    fn test_single_item_exactness() {
        for (a, b) in [(3, 1), (4, 2), (2, 2), (5, 3)] {
            let rect = Rect::new(a, b);
            for width in b..=a + 2 {
                let sol = solve(&[rect], width, SolverConfig::default());
                let expected = if a <= width { b } else { a };
                assert_eq!(sol.height, expected as u64, "{rect} at width {width}");
                assert_solution_valid(&sol, width, &[rect]);
            }
        }
    }

    #[test]
    fn test_identical_items() {
        let items = Rect::new(2, 1).repeat(4);
        let sol = solve(&items, 2, SolverConfig::default());
        assert_eq!(sol.height, 4);
        assert_solution_valid(&sol, 2, &items);

        let sol = solve(&items, 4, SolverConfig::default());
        assert_eq!(sol.height, 2);
        assert_solution_valid(&sol, 4, &items);
    }

    #[test]
    fn test_wide_piece_on_the_right() {
        // 1x1 next to a 3x3: the narrow side of the cut holds the smaller part.
        let items = vec![Rect::new(3, 3), Rect::new(1, 1)];
        let sol = solve(&items, 4, SolverConfig::default());
        assert_eq!(sol.height, 3);
        assert_solution_valid(&sol, 4, &items);
        match sol.plan.unwrap() {
            Instruction::Cut { cut, .. } => assert_eq!(cut, Cut::Vertical(1)),
            other => panic!("expected a cut, got {other:?}"),
        }
    }

    #[test]
    fn test_area_monotonicity() {
        let kits = vec![
            sample_items(),
            vec![Rect::new(1, 1), Rect::new(2, 1), Rect::new(3, 1), Rect::new(4, 1)],
            vec![Rect::new(2, 2), Rect::new(2, 2), Rect::new(3, 1), Rect::new(1, 1)],
            Rect::new(3, 2).repeat(3),
        ];
        for items in kits {
            let kit = Kit::new(&items).unwrap();
            let area = kit.area(kit.full());
            for width in 3..=6 {
                let sol = Solver::new(&kit, SolverConfig::default()).solve(width).unwrap();
                assert!(sol.height as u128 * width as u128 >= area);
                assert_solution_valid(&sol, width, &items);
            }
        }
    }

    #[test]
    fn test_idempotence() {
        let items = sample_items();
        let kit = Kit::new(&items).unwrap();
        let solver = Solver::new(&kit, SolverConfig::default());
        let first = solver.solve(4).unwrap();
        let second = solver.solve(4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_infeasible_width() {
        let items = vec![Rect::new(5, 3), Rect::new(1, 1)];
        let sol = solve(&items, 2, SolverConfig::default());
        assert_eq!(sol.height, INFEASIBLE);
        assert!(!sol.is_feasible());
        assert!(sol.plan.is_none());
    }

    #[test]
    fn test_zero_width_rejected() {
        let kit = Kit::new(&[Rect::new(1, 1)]).unwrap();
        let err = Solver::new(&kit, SolverConfig::default()).solve(0).unwrap_err();
        assert_eq!(err, Error::InvalidWidth);
    }

    #[test]
    fn test_combinations_never_worse() {
        let kits = vec![
            sample_items(),
            vec![Rect::new(1, 1), Rect::new(1, 1), Rect::new(4, 2), Rect::new(2, 1)],
        ];
        let config = SolverConfig {
            cut_positions: CutPositions::Combinations,
            ..SolverConfig::default()
        };
        for items in kits {
            for width in 4..=6 {
                let sides = solve(&items, width, SolverConfig::default());
                let sums = solve(&items, width, config);
                assert!(sums.height <= sides.height);
                assert_solution_valid(&sums, width, &items);
            }
        }
    }

    #[test]
    fn test_horizontal_bound_keeps_height() {
        let config = SolverConfig {
            horizontal_area_bound: true,
            ..SolverConfig::default()
        };
        for items in [sample_items(), Rect::new(3, 2).repeat(3)] {
            for width in 3..=5 {
                let plain = solve(&items, width, SolverConfig::default());
                let bounded = solve(&items, width, config);
                assert_eq!(plain.height, bounded.height);
                assert_solution_valid(&bounded, width, &items);
            }
        }
    }

    #[test]
    fn test_time_limit() {
        let kit = Kit::new(&sample_items()).unwrap();
        let config = SolverConfig {
            time_limit_ms: Some(0),
            ..SolverConfig::default()
        };
        let err = Solver::new(&kit, config).solve(4).unwrap_err();
        assert_eq!(err, Error::Timeout(0));

        let single = Kit::new(&[Rect::new(2, 1)]).unwrap();
        let sol = Solver::new(&single, config).solve(4).unwrap();
        assert_eq!(sol.height, 1);
    }

    #[test]
    fn test_time_limit_fires_mid_search() {
        let items: Vec<Rect> = (1..=10).map(|k| Rect::new(k + 1, k)).collect();
        let kit = Kit::new(&items).unwrap();
        let config = SolverConfig {
            time_limit_ms: Some(1),
            ..SolverConfig::default()
        };
        let started = Instant::now();
        let err = Solver::new(&kit, config).solve(15).unwrap_err();
        assert_eq!(err, Error::Timeout(1));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_tall_details() {
        let items = Rect::new(4_000_000_000, 1).repeat(2);
        let sol = solve(&items, 1, SolverConfig::default());
        assert_eq!(sol.height, 8_000_000_000);
        assert!(sol.is_feasible());
        assert_solution_valid(&sol, 1, &items);
    }

    #[test]
    fn test_huge_squares() {
        let items = Rect::new(u32::MAX, u32::MAX).repeat(2);
        let sol = solve(&items, u32::MAX, SolverConfig::default());
        assert_eq!(sol.height, 2 * u32::MAX as u64);
        assert_solution_valid(&sol, u32::MAX, &items);
    }

    #[test]
    fn test_combinations_on_wide_strip() {
        let items = Rect::new(1, 1).repeat(3);
        let config = SolverConfig {
            cut_positions: CutPositions::Combinations,
            time_limit_ms: Some(10_000),
            ..SolverConfig::default()
        };
        let sol = solve(&items, 2_000_000_000, config);
        assert_eq!(sol.height, 1);
        assert_solution_valid(&sol, 2_000_000_000, &items);
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"cut_positions": "combinations"}"#).unwrap();
        assert_eq!(config.cut_positions, CutPositions::Combinations);
        assert!(!config.horizontal_area_bound);
        assert_eq!(config.time_limit_ms, None);
    }
}
