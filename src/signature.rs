/// Signature help support.
///
/// When the cursor is inside the argument list of a call such as
/// `SELECT calc(1, |`, the innermost unclosed `(` before the cursor is
/// found, the routine name in front of it is looked up (current document
/// first, then the workspace) and its signature is returned with the
/// argument under the cursor highlighted.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::parser::{find_declaration, normalize_identifier, parse_declarations};
use crate::scanner::{LexMode, Scanner, count_top_level_commas};
use crate::types::Declaration;
use crate::util::LineIndex;
use crate::workspace::documents;

/// The call the cursor is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Callee name, normalised.
    pub name: String,
    /// Zero-based index of the argument under the cursor.
    pub active_parameter: u32,
}

/// Find the call enclosing `offset`, if any.
pub fn call_context(text: &str, offset: usize) -> Option<CallContext> {
    let offset = offset.min(text.len());
    let before = text.get(..offset)?;

    let mut open_parens = Vec::new();
    for (i, b, mode) in Scanner::new(before) {
        if mode != LexMode::Code {
            continue;
        }
        match b {
            b'(' => open_parens.push(i),
            b')' => {
                open_parens.pop();
            }
            _ => {}
        }
    }
    let open = *open_parens.last()?;

    let name = callee_name(&text[..open])?;
    let active_parameter = count_top_level_commas(&text[open + 1..offset]) as u32;
    Some(CallContext {
        name: normalize_identifier(name),
        active_parameter,
    })
}

/// The identifier ending right before a `(` (whitespace allowed), quoted
/// or bare.
fn callee_name(before_paren: &str) -> Option<&str> {
    let trimmed = before_paren.trim_end();
    if trimmed.ends_with('"') {
        let open = trimmed[..trimmed.len() - 1].rfind('"')?;
        return Some(&trimmed[open..]);
    }
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '$'))
        .last()
        .map(|(i, _)| i)?;
    Some(&trimmed[start..])
}

/// Build the LSP signature for `decl`.
pub fn signature_for(decl: &Declaration, active_parameter: u32) -> SignatureHelp {
    let parameters = decl.parameter_list();
    let label = format!("{}({})", decl.name, parameters.join(", "));
    let active = if parameters.is_empty() {
        0
    } else {
        active_parameter.min(parameters.len() as u32 - 1)
    };

    SignatureHelp {
        signatures: vec![SignatureInformation {
            label,
            documentation: None,
            parameters: Some(
                parameters
                    .into_iter()
                    .map(|p| ParameterInformation {
                        label: ParameterLabel::Simple(p),
                        documentation: None,
                    })
                    .collect(),
            ),
            active_parameter: Some(active),
        }],
        active_signature: Some(0),
        active_parameter: Some(active),
    }
}

impl Backend {
    /// Handle a signature help request.
    pub fn resolve_signature_help(&self, uri: &Url, content: &str, position: Position) -> Option<SignatureHelp> {
        let index = LineIndex::new(content);
        let offset = index.offset_of(content, position)?;
        let call = call_context(content, offset)?;

        let local = parse_declarations(content);
        if let Some(decl) = find_declaration(&local, &call.name) {
            return Some(signature_for(decl, call.active_parameter));
        }

        let workspace = self.workspace();
        documents(&workspace, Some(uri)).find_map(|(_, text)| {
            let declarations = parse_declarations(&text);
            find_declaration(&declarations, &call.name)
                .map(|decl| signature_for(decl, call.active_parameter))
        })
    }
}
