//! Conversions between the core query types and `lsp_types`
//!
//! Both sides use 0-based lines. The core counts columns in characters while
//! LSP clients count UTF-16 code units, so every position is converted against
//! the text of its document.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionTextEdit, Diagnostic, DiagnosticSeverity, Documentation, Hover,
    HoverContents, MarkupContent, MarkupKind, ParameterInformation, ParameterLabel, Position,
    Range, SignatureHelp, SignatureInformation, TextEdit,
};

use scl_core as scl;

fn line_text(text: &str, line: usize) -> &str {
    text.split('\n').nth(line).unwrap_or("")
}

pub fn position(text: &str, position: scl::LinePosition) -> Position {
    let line = line_text(text, position.line);
    let units: usize = line
        .chars()
        .take(position.character)
        .map(char::len_utf16)
        .sum();
    // Past the end of the line the character count stands for itself
    let overflow = position.character.saturating_sub(line.chars().count());
    Position {
        line: position.line as u32,
        character: (units + overflow) as u32,
    }
}

/// A UTF-16 offset inside a surrogate pair rounds up to the next character
pub fn line_position(text: &str, position: Position) -> scl::LinePosition {
    let target = position.character as usize;
    let mut units = 0;
    let mut character = 0;
    for ch in line_text(text, position.line as usize).chars() {
        if units >= target {
            break;
        }
        units += ch.len_utf16();
        character += 1;
    }
    let overflow = target.saturating_sub(units);
    scl::LinePosition::new(position.line as usize, character + overflow)
}

pub fn range(text: &str, range: scl::TextRange) -> Range {
    Range {
        start: position(text, range.start),
        end: position(text, range.end),
    }
}

pub fn text_edit(text: &str, edit: scl::TextEdit) -> TextEdit {
    TextEdit {
        range: range(text, edit.range),
        new_text: edit.new_text,
    }
}

fn markdown(value: String) -> MarkupContent {
    MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    }
}

fn severity(code: u8) -> DiagnosticSeverity {
    match code {
        2 => DiagnosticSeverity::WARNING,
        3 => DiagnosticSeverity::INFORMATION,
        4 => DiagnosticSeverity::HINT,
        _ => DiagnosticSeverity::ERROR,
    }
}

pub fn diagnostic(text: &str, diagnostic: scl::Diagnostic, source: &str) -> Diagnostic {
    Diagnostic {
        range: Range {
            start: position(text, diagnostic.start),
            end: position(text, diagnostic.end),
        },
        severity: Some(severity(diagnostic.severity_code)),
        code: None,
        code_description: None,
        source: Some(source.to_string()),
        message: diagnostic.message,
        related_information: None,
        tags: None,
        data: None,
    }
}

pub fn completion_item(text: &str, item: scl::CompletionItem) -> CompletionItem {
    let documentation = (!item.documentation.is_empty())
        .then(|| Documentation::MarkupContent(markdown(item.documentation)));
    CompletionItem {
        label: item.label,
        detail: (!item.detail.is_empty()).then_some(item.detail),
        documentation,
        preselect: item.preselect.then_some(true),
        text_edit: Some(CompletionTextEdit::Edit(text_edit(text, item.edit))),
        ..Default::default()
    }
}

/// Hover lines become paragraphs; nothing to show is `None`
pub fn hover(response: scl::QuickInfoResponse) -> Option<Hover> {
    if response.markdown_lines.is_empty() {
        return None;
    }
    Some(Hover {
        contents: HoverContents::Markup(markdown(response.markdown_lines.join("\n\n"))),
        range: None,
    })
}

pub fn signature_help(response: scl::SignatureHelpResponse) -> Option<SignatureHelp> {
    if response.signatures.is_empty() {
        return None;
    }
    let signatures = response
        .signatures
        .into_iter()
        .map(|signature| SignatureInformation {
            label: signature.label,
            documentation: Some(Documentation::MarkupContent(markdown(signature.documentation))),
            parameters: Some(
                signature
                    .parameters
                    .into_iter()
                    .map(|p| ParameterInformation {
                        label: ParameterLabel::Simple(p.label),
                        documentation: Some(Documentation::String(p.documentation)),
                    })
                    .collect(),
            ),
            active_parameter: None,
        })
        .collect();
    Some(SignatureHelp {
        signatures,
        active_signature: Some(response.active_signature as u32),
        active_parameter: Some(response.active_parameter as u32),
    })
}
