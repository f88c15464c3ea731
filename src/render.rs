use crate::plan::{Cut, Instruction};
use crate::types::Placement;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;
const INDENT: &str = "      ";

/// Human-readable cutting map, one cut or detail per line, depth first.
pub fn report(plan: &Instruction) -> String {
    let mut out = String::from("Cutting map:\n");
    report_node(&mut out, plan, 1);
    out
}

fn report_node(out: &mut String, node: &Instruction, level: usize) {
    let pad = INDENT.repeat(level);
    match node {
        Instruction::Cut {
            cut, first, second, ..
        } => {
            let (first_name, second_name) = match cut {
                Cut::Vertical(_) => ("Left", "Right"),
                Cut::Horizontal(_) => ("Bottom", "Upper"),
            };
            let inner = INDENT.repeat(level + 1);
            out.push_str(&format!("{pad}{cut}\n"));
            out.push_str(&format!("{inner}{first_name} section:\n"));
            report_node(out, first, level + 2);
            out.push_str(&format!("{inner}{second_name} section:\n"));
            report_node(out, second, level + 2);
        }
        Instruction::Detail { rect, .. } => {
            out.push_str(&format!("{pad}Detail {rect}\n"));
            if let Some(trims) = node.layouts() {
                for trim in trims {
                    out.push_str(&format!("{pad}{trim}\n"));
                }
            }
        }
    }
}

/// ASCII drawing of a strip of `width` x `height`, bottom edge last.
pub fn render_strip(width: u32, height: u64, placements: &[Placement]) -> String {
    if width == 0 || height == 0 {
        return String::new();
    }
    let scale = f64::min(MAX_WIDTH / width as f64, MAX_HEIGHT / height as f64);
    let grid_w = (width as f64 * scale).round() as usize;
    let grid_h = (height as f64 * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut canvas = Canvas::new(grid_w + 1, grid_h + 1);
    canvas.outline(0, 0, grid_w, grid_h);

    for p in placements {
        let sx = (p.x as f64 * scale).round() as usize;
        let sw = (p.width as f64 * scale).round() as usize;
        let sh = (p.height as f64 * scale).round() as usize;
        // Grid rows grow downwards, strip coordinates upwards.
        let top = ((p.y + p.height as u64) as f64 * scale).round() as usize;
        let sy = grid_h.saturating_sub(top);

        if sw == 0 || sh == 0 {
            continue;
        }
        canvas.outline(sx, sy, sw, sh);
        if sw > 2 {
            canvas.label(sx, sy, sw, sh, &p.rect.to_string());
        }
    }

    canvas.to_string()
}

struct Canvas {
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cells: vec![vec![' '; cols]; rows],
        }
    }

    fn plot(&mut self, x: usize, y: usize, ch: char) {
        let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) else {
            return;
        };
        *cell = match (*cell, ch) {
            (_, '+') | ('+', _) => '+',
            ('|', '-') | ('-', '|') => '+',
            _ => ch,
        };
    }

    fn outline(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for i in x..=x + w {
            self.plot(i, y, '-');
            self.plot(i, y + h, '-');
        }
        for j in y..=y + h {
            self.plot(x, j, '|');
            self.plot(x + w, j, '|');
        }
        for (cx, cy) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
            self.plot(cx, cy, '+');
        }
    }

    /// Centres `text` inside the box, clipped to its interior.
    fn label(&mut self, x: usize, y: usize, w: usize, h: usize, text: &str) {
        let cy = y + h / 2;
        if cy <= y || cy >= y + h {
            return;
        }
        let start = (x + w / 2).saturating_sub(text.chars().count() / 2);
        for (i, ch) in text.chars().enumerate() {
            let cx = start + i;
            if cx > x && cx < x + w {
                if let Some(cell) = self.cells.get_mut(cy).and_then(|row| row.get_mut(cx)) {
                    *cell = ch;
                }
            }
        }
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            let line: String = row.iter().collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
