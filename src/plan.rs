//! The cutting plan: a binary tree of guillotine cuts with one detail per leaf.

use std::fmt;

use serde::Serialize;

use crate::types::{Offset, Placement, Rect};

/// A guillotine cut, positioned relative to the piece it divides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "direction", content = "at", rename_all = "lowercase")]
pub enum Cut {
    /// Cut at this distance from the left edge.
    Vertical(u32),
    /// Cut at this distance from the bottom edge.
    Horizontal(u64),
}

impl Cut {
    pub fn position(self) -> u64 {
        match self {
            Cut::Vertical(at) => at as u64,
            Cut::Horizontal(at) => at,
        }
    }

    /// Signed encoding: negative for vertical cuts, positive for horizontal ones.
    pub fn signed(self) -> i64 {
        match self {
            Cut::Vertical(at) => -(at as i64),
            Cut::Horizontal(at) => at as i64,
        }
    }

    /// Inverse of [`Cut::signed`]; zero means no cut.
    pub fn from_signed(measure: i64) -> Option<Cut> {
        let at = measure.unsigned_abs();
        match measure.signum() {
            -1 => u32::try_from(at).ok().map(Cut::Vertical),
            1 => Some(Cut::Horizontal(at)),
            _ => None,
        }
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cut::Vertical(at) => write!(f, "Vertical cut at {at}"),
            Cut::Horizontal(at) => write!(f, "Horizontal cut at {at}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Instruction {
    /// Divide the piece at `origin`; `first` is the left or bottom part.
    Cut {
        cut: Cut,
        origin: Offset,
        first: Box<Instruction>,
        second: Box<Instruction>,
    },
    /// A single detail laid in a `width` x `height` footprint at `origin`.
    Detail {
        rect: Rect,
        origin: Offset,
        width: u32,
        height: u32,
    },
}

impl Instruction {
    pub fn cut(cut: Cut, origin: Offset, first: Instruction, second: Instruction) -> Self {
        Instruction::Cut {
            cut,
            origin,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Lays `rect` along the strip if its long side fits in `width`, across it otherwise.
    pub fn detail(rect: Rect, width: u32, origin: Offset) -> Self {
        let (width, height) = if rect.long() <= width {
            (rect.long(), rect.short())
        } else {
            (rect.short(), rect.long())
        };
        Instruction::Detail {
            rect,
            origin,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Offset {
        match self {
            Instruction::Cut { origin, .. } | Instruction::Detail { origin, .. } => *origin,
        }
    }

    /// The two trims that free a detail from its cell, `None` for cut nodes.
    pub fn layouts(&self) -> Option<[Cut; 2]> {
        match self {
            Instruction::Detail { width, height, .. } => {
                Some([Cut::Vertical(*width), Cut::Horizontal(*height as u64)])
            }
            Instruction::Cut { .. } => None,
        }
    }

    /// Depth-first, pre-order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.iter()
            .filter_map(|node| match *node {
                Instruction::Detail {
                    rect,
                    origin,
                    width,
                    height,
                } => Some(Placement {
                    rect,
                    x: origin.x,
                    y: origin.y,
                    width,
                    height,
                }),
                Instruction::Cut { .. } => None,
            })
            .collect()
    }

    pub fn details(&self) -> Vec<Rect> {
        self.placements().into_iter().map(|p| p.rect).collect()
    }

    pub fn cut_count(&self) -> usize {
        self.iter()
            .filter(|node| matches!(node, Instruction::Cut { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        match self {
            Instruction::Cut { first, second, .. } => 1 + first.depth().max(second.depth()),
            Instruction::Detail { .. } => 0,
        }
    }
}

impl<'a> IntoIterator for &'a Instruction {
    type Item = &'a Instruction;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a Instruction>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Instruction;

    fn next(&mut self) -> Option<&'a Instruction> {
        let node = self.stack.pop()?;
        if let Instruction::Cut { first, second, .. } = node {
            self.stack.push(second);
            self.stack.push(first);
        }
        Some(node)
    }
}
