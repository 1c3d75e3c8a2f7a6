use crate::types::CuttingPlan;

const MAX_WIDTH: f64 = 80.0;

const PIECE: char = '=';
const KERF: char = '|';
const WASTE: char = '.';

/// Draws one plan as a framed ASCII bar: pieces as `=` labelled with their
/// length, kerfs as `|` and residual waste as `.`. The blade width is taken
/// from the plan's kerf loss.
pub fn render_plan(plan: &CuttingPlan) -> String {
    if plan.stock_length == 0 {
        return String::new();
    }
    let blade_width = match plan.cuts.len() {
        0 | 1 => 0,
        n => plan.kerf_loss / (n as u32 - 1),
    };
    let scale = MAX_WIDTH / plan.stock_length as f64;
    let col = |pos: u32| (pos as f64 * scale).round() as usize;
    let grid_w = col(plan.stock_length);
    if grid_w == 0 {
        return String::new();
    }

    let mut row = vec![WASTE; grid_w];
    let mut kerf_cols = Vec::new();
    let mut pos: u32 = 0;

    for (i, cut) in plan.cuts.iter().enumerate() {
        if i > 0 {
            let start = col(pos);
            kerf_cols.extend(start..col(pos + blade_width).max(start + 1));
            pos += blade_width;
        }
        let start = col(pos).min(grid_w);
        let end = col(pos + cut.length).clamp(start, grid_w);
        row[start..end].fill(PIECE);

        let label: Vec<char> = cut.length.to_string().chars().collect();
        let span = end - start;
        if span > label.len() + 1 {
            let label_start = start + (span - label.len()) / 2;
            row[label_start..label_start + label.len()].copy_from_slice(&label);
        }
        pos += cut.length;
    }

    // Drawn last so a blade narrower than one column still shows
    for c in kerf_cols {
        if let Some(cell) = row.get_mut(c) {
            *cell = KERF;
        }
    }

    let border: String = std::iter::once('+')
        .chain(std::iter::repeat_n('-', grid_w))
        .chain(std::iter::once('+'))
        .collect();
    let body: String = row.into_iter().collect();

    let mut result = String::new();
    result.push_str(&border);
    result.push('\n');
    result.push(KERF);
    result.push_str(&body);
    result.push(KERF);
    result.push('\n');
    result.push_str(&border);
    result.push('\n');
    result
}
