//! Local DOCX → plain text. Paragraphs become lines, table rows become `cell | cell`.

use docx_rs::{
    DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use crate::errors::AnalysisError;

/// Parses an OOXML document and returns its trimmed text.
pub fn extract_text(bytes: &[u8]) -> Result<String, AnalysisError> {
    let document = docx_rs::read_docx(bytes)
        .map_err(|e| AnalysisError::ExtractionFailure(format!("invalid DOCX: {e}")))?;

    let mut lines = Vec::new();
    for child in &document.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_line(&mut lines, paragraph_text(paragraph)),
            DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }

    Ok(lines.join("\n").trim().to_string())
}

fn push_line(lines: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        lines.push(line);
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut buffer = String::new();
    for child in &paragraph.children {
        paragraph_child_text(child, &mut buffer);
    }
    buffer
}

fn paragraph_child_text(child: &ParagraphChild, buffer: &mut String) {
    match child {
        ParagraphChild::Run(run) => run_text(run, buffer),
        ParagraphChild::Hyperlink(link) => {
            for link_child in &link.children {
                paragraph_child_text(link_child, buffer);
            }
        }
        // tracked insertions are part of the visible text
        ParagraphChild::Insert(insert) => {
            for insert_child in &insert.children {
                if let InsertChild::Run(run) = insert_child {
                    run_text(run, buffer);
                }
            }
        }
        _ => {}
    }
}

fn run_text(run: &Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => buffer.push_str(&text.text),
            RunChild::Tab(_) | RunChild::PTab(_) => buffer.push('\t'),
            RunChild::Break(_) => buffer.push('\n'),
            RunChild::Sym(sym) => buffer.push_str(&sym.char),
            _ => {}
        }
    }
}

fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| {
                let TableRowChild::TableCell(cell) = cell;
                let mut parts = Vec::new();
                for content in &cell.children {
                    match content {
                        TableCellContent::Paragraph(paragraph) => {
                            push_line(&mut parts, paragraph_text(paragraph))
                        }
                        TableCellContent::Table(nested) => {
                            let mut nested_lines = Vec::new();
                            table_lines(nested, &mut nested_lines);
                            push_line(&mut parts, nested_lines.join(" "));
                        }
                        _ => {}
                    }
                }
                parts.join(" ")
            })
            .filter(|text| !text.trim().is_empty())
            .collect();
        push_line(lines, cells.join(" | "));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::Bytes;
    use docx_rs::{Docx, TableCell, TableRow};
    use std::io::Cursor;

    fn pack(docx: Docx) -> Bytes {
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        Bytes::from(cursor.into_inner())
    }

    /// Builds an in-memory DOCX with one paragraph per line.
    pub fn build_docx(lines: &[&str]) -> Bytes {
        let docx = lines.iter().fold(Docx::new(), |docx, line| {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)))
        });
        pack(docx)
    }

    #[test]
    fn test_paragraphs_become_lines() {
        let bytes = build_docx(&["Jane Doe", "Senior Engineer"]);
        assert_eq!(extract_text(&bytes).unwrap(), "Jane Doe\nSenior Engineer");
    }

    #[test]
    fn test_empty_paragraphs_are_dropped_and_output_trimmed() {
        let bytes = build_docx(&["  ", "Summary", "", "Skills  "]);
        assert_eq!(extract_text(&bytes).unwrap(), "Summary\nSkills");
    }

    #[test]
    fn test_table_rows_are_pipe_joined() {
        let table = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Rust"))),
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("5 years"))),
        ])]);
        let bytes = pack(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Skills")))
                .add_table(table),
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Skills\nRust | 5 years");
    }

    #[test]
    fn test_non_ooxml_content_fails() {
        let err = extract_text(b"plain text, not a zip").unwrap_err();
        assert!(matches!(err, AnalysisError::ExtractionFailure(_)));
    }
}
