/// Parameter-list splitting.
///
/// A parameter list is split on commas at paren depth zero that are SQL
/// code.  Commas inside `numeric(10,2)`, `TABLE(a int, b int)`, string
/// defaults or comments stay part of their parameter.
use crate::scanner::{LexMode, Scanner};

/// Split a raw parameter list into trimmed parameters.
///
/// Empty (or all-whitespace) input yields no parameters.  Comments are kept
/// in the parameter text they appear in.
pub fn split_parameters(param_text: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth: u32 = 0;
    let mut current_start = 0;

    for (i, b, mode) in Scanner::new(param_text) {
        if mode != LexMode::Code {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                params.push(param_text[current_start..i].trim().to_string());
                current_start = i + 1;
            }
            _ => {}
        }
    }

    let last = param_text[current_start..].trim();
    if !last.is_empty() {
        params.push(last.to_string());
    }

    params
}
