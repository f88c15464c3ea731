//! The multiset of details to pack and its split table.
//!
//! A sub-multiset is a count vector bounded by the kit's quantities. The split
//! table lists every such vector of size `1..n` once, in discovery order, and
//! ends with the full set. Recursive calls refer to rows of it through
//! [`SubsetRef`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{CutPositions, Rect};

/// Largest split table a kit may build.
pub const MAX_SPLIT_ROWS: u64 = 1 << 20;

/// Index of a sub-multiset in a kit's split table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetRef(usize);

impl SubsetRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Kit {
    types: Vec<Rect>,
    quantities: Vec<u32>,
    n: u32,
    table: Vec<Vec<u32>>,
    rows: HashMap<Vec<u32>, usize>,
}

impl Kit {
    pub fn new(items: &[Rect]) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptyKit);
        }

        let mut types: Vec<Rect> = Vec::new();
        let mut quantities: Vec<u32> = Vec::new();
        for &item in items {
            if item.short() == 0 {
                return Err(Error::InvalidDimensions {
                    width: item.long(),
                    height: item.short(),
                });
            }
            match types.iter().position(|&t| t == item) {
                Some(i) => quantities[i] += 1,
                None => {
                    types.push(item);
                    quantities.push(1);
                }
            }
        }

        let rows = split_table_size(&quantities);
        if rows > MAX_SPLIT_ROWS {
            return Err(Error::KitTooLarge {
                rows,
                limit: MAX_SPLIT_ROWS,
            });
        }

        let n = quantities.iter().sum();
        let table = build_split_table(&quantities, n);
        let rows = table
            .iter()
            .enumerate()
            .map(|(i, row)| (row.clone(), i))
            .collect();

        Ok(Self {
            types,
            quantities,
            n,
            table,
            rows,
        })
    }

    pub fn from_dimensions(dims: &[(u32, u32)]) -> Result<Self> {
        let items: Vec<Rect> = dims.iter().map(|&(w, h)| Rect::new(w, h)).collect();
        Self::new(&items)
    }

    pub fn types(&self) -> &[Rect] {
        &self.types
    }

    pub fn quantities(&self) -> &[u32] {
        &self.quantities
    }

    /// Total number of details, never zero.
    pub fn detail_count(&self) -> u32 {
        self.n
    }

    pub fn split_table(&self) -> &[Vec<u32>] {
        &self.table
    }

    /// The whole kit, the trailing row of the split table.
    pub fn full(&self) -> SubsetRef {
        SubsetRef(self.table.len() - 1)
    }

    pub fn counts(&self, subset: SubsetRef) -> &[u32] {
        &self.table[subset.0]
    }

    /// `quantities - counts`, or `None` if `counts` is not bounded by the kit.
    pub fn complement(&self, counts: &[u32]) -> Option<Vec<u32>> {
        if counts.len() != self.quantities.len() {
            return None;
        }
        self.quantities
            .iter()
            .zip(counts)
            .map(|(&q, &c)| q.checked_sub(c))
            .collect()
    }

    /// Canonical reference for a count vector.
    ///
    /// A non-zero vector stored in the table maps to its own row; anything else
    /// (the empty vector in particular) maps to the row of its complement.
    pub fn resolve(&self, counts: &[u32]) -> Option<SubsetRef> {
        if counts.iter().any(|&c| c != 0)
            && let Some(&row) = self.rows.get(counts)
        {
            return Some(SubsetRef(row));
        }
        let complement = self.complement(counts)?;
        self.rows.get(&complement).map(|&row| SubsetRef(row))
    }

    /// Every way to split `subset` into two non-empty parts, each unordered
    /// pair once, ordered by the table position of the first part.
    pub fn splits(&self, subset: SubsetRef) -> impl Iterator<Item = (SubsetRef, SubsetRef)> + '_ {
        let key = self.counts(subset);
        let candidates = &self.table[..self.table.len() - 1];
        candidates
            .iter()
            .enumerate()
            .filter_map(move |(i, row)| {
                if i == subset.0 || row.iter().zip(key).any(|(r, k)| r > k) {
                    return None;
                }
                let rest: Vec<u32> = key.iter().zip(row).map(|(k, r)| k - r).collect();
                let j = *self.rows.get(&rest)?;
                (i <= j).then_some((SubsetRef(i), SubsetRef(j)))
            })
    }

    /// Total detail area; wide enough that no kit of `u32` sides overflows it.
    pub fn area(&self, subset: SubsetRef) -> u128 {
        self.types
            .iter()
            .zip(self.counts(subset))
            .map(|(t, &c)| t.area() as u128 * c as u128)
            .sum()
    }

    /// Whether every detail of `subset` can be laid in a strip of `width`.
    pub fn narrowest_fit(&self, subset: SubsetRef, width: u32) -> bool {
        self.present(subset).all(|t| t.fits(width))
    }

    pub fn single_item(&self, subset: SubsetRef) -> Option<Rect> {
        let counts = self.counts(subset);
        if counts.iter().sum::<u32>() != 1 {
            return None;
        }
        let i = counts.iter().position(|&c| c == 1)?;
        Some(self.types[i])
    }

    /// Candidate positions of a vertical cut through `subset` laid in `width`,
    /// ascending, none past the middle of the strip.
    pub fn cut_positions(&self, subset: SubsetRef, width: u32, mode: CutPositions) -> Vec<u32> {
        let half = width / 2;
        match mode {
            CutPositions::ItemSides => {
                let sides: BTreeSet<u32> = self
                    .present(subset)
                    .flat_map(|t| [t.long(), t.short()])
                    .filter(|&side| side <= half)
                    .collect();
                sides.into_iter().collect()
            }
            CutPositions::Combinations => {
                let mut sums: BTreeSet<u32> = BTreeSet::from([0]);
                for (t, &c) in self.types.iter().zip(self.counts(subset)) {
                    for _ in 0..c {
                        let grown: Vec<u32> = sums
                            .iter()
                            .flat_map(|&s| [s.checked_add(t.long()), s.checked_add(t.short())])
                            .flatten()
                            .filter(|&s| s <= half)
                            .collect();
                        sums.extend(grown);
                    }
                }
                sums.remove(&0);
                sums.into_iter().collect()
            }
        }
    }

    fn present(&self, subset: SubsetRef) -> impl Iterator<Item = &Rect> + '_ {
        self.types
            .iter()
            .zip(self.counts(subset))
            .filter(|&(_, &c)| c > 0)
            .map(|(t, _)| t)
    }
}

impl fmt::Display for Kit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.types.iter().map(|t| t.to_string()).collect();
        writeln!(f, "Detail kit:")?;
        writeln!(f, "\tDetail types: [{}]", types.join(", "))?;
        write!(f, "\tQuantities:   {:?}", self.quantities)
    }
}

/// Rows of the split table for these quantities: every bounded vector but the empty one.
fn split_table_size(quantities: &[u32]) -> u64 {
    quantities
        .iter()
        .fold(1u64, |acc, &q| acc.saturating_mul(q as u64 + 1))
        - 1
}

/// Closure over unit picks: round `k` holds the new vectors of size `k`.
fn build_split_table(quantities: &[u32], n: u32) -> Vec<Vec<u32>> {
    let dims = quantities.len();
    let mut seen: HashSet<Vec<u32>> = HashSet::new();
    let mut table: Vec<Vec<u32>> = Vec::new();

    let mut frontier: Vec<Vec<u32>> = Vec::new();
    if n > 1 {
        for i in 0..dims {
            let mut unit = vec![0; dims];
            unit[i] = 1;
            seen.insert(unit.clone());
            frontier.push(unit);
        }
    }
    table.extend(frontier.iter().cloned());

    for _ in 2..n {
        let mut next = Vec::new();
        for i in 0..dims {
            for row in &frontier {
                if row[i] >= quantities[i] {
                    continue;
                }
                let mut grown = row.clone();
                grown[i] += 1;
                if seen.insert(grown.clone()) {
                    next.push(grown);
                }
            }
        }
        table.extend(next.iter().cloned());
        frontier = next;
    }

    table.push(quantities.to_vec());
    table
}
