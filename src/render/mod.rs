//! Document Renderer
//!
//! Walks a validated [`LessonPack`] and emits an ordered plan of positional
//! edit instructions against the remote document's linear text stream. The
//! builder owns a single cursor that starts at offset 1 (offset 0 is the
//! document start marker in the target format) and advances by the exact
//! UTF-16 length of every tracked text insertion.
//!
//! Table insertion is a two-phase protocol: phase one inserts the empty table
//! shape, phase two (executed by the publisher) re-fetches the document
//! structure to discover the per-cell offsets and fills them. Cell offsets
//! are not predictable from the table's row/column counts alone, so after a
//! table the builder stops tracking offsets and anchors any remaining text at
//! the end of the body.

use serde::Serialize;

use crate::config::CaseNaming;
use crate::types::{Argument, Example, LessonPack, Source};

/// Placeholder rendered for an argument-case section with no arguments.
/// All other empty collections are skipped silently.
pub const EMPTY_CASE_PLACEHOLDER: &str = "(no content)";

// =============================================================================
// Instructions
// =============================================================================

/// Where an insertion lands in the document's text stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Location {
    /// Absolute character offset (UTF-16 code units)
    At(usize),
    /// End of the document body; used once offsets are no longer tracked
    End,
}

/// Named paragraph style applied over an inserted range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParagraphStyle {
    NormalText,
    Heading1,
    Heading2,
    Heading3,
}

impl ParagraphStyle {
    pub fn heading(level: u8) -> Self {
        match level {
            1 => Self::Heading1,
            2 => Self::Heading2,
            _ => Self::Heading3,
        }
    }
}

/// One positional edit against the remote document.
///
/// Owned exclusively by the builder during a render pass; consumed once by
/// the publish call and not reused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EditInstruction {
    InsertText {
        location: Location,
        text: String,
    },
    SetParagraphStyle {
        start: usize,
        end: usize,
        style: ParagraphStyle,
    },
    SetRunStyle {
        start: usize,
        end: usize,
        bold: bool,
    },
    CreateBulletedList {
        start: usize,
        end: usize,
    },
    InsertTable {
        location: Location,
        rows: usize,
        columns: usize,
    },
    InsertPageBreak {
        location: Location,
    },
}

impl EditInstruction {
    /// Length in code units this instruction adds to the text stream at a
    /// tracked offset. Table shapes and end-anchored inserts are untracked.
    pub fn tracked_len(&self) -> usize {
        match self {
            Self::InsertText {
                location: Location::At(_),
                text,
            } => utf16_len(text),
            Self::InsertPageBreak {
                location: Location::At(_),
            } => 1,
            _ => 0,
        }
    }
}

/// Count of UTF-16 code units; the remote document model indexes text this way
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

// =============================================================================
// Render Plan
// =============================================================================

/// One step of the publish protocol
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStep {
    /// Batch-apply these instructions
    Apply(Vec<EditInstruction>),
    /// Re-fetch the document structure, then fill the cells of the
    /// `table_ordinal`-th table (0-based, in document order)
    FillTable {
        table_ordinal: usize,
        rows: Vec<Vec<String>>,
    },
}

/// Ordered output of one render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub steps: Vec<RenderStep>,
    /// Cursor value when the pass finished
    pub final_cursor: usize,
}

impl RenderPlan {
    /// All instructions across apply steps, in order
    pub fn instructions(&self) -> impl Iterator<Item = &EditInstruction> {
        self.steps.iter().flat_map(|step| match step {
            RenderStep::Apply(edits) => edits.as_slice(),
            RenderStep::FillTable { .. } => &[],
        })
    }

    /// Sum of tracked insertion lengths; equals `final_cursor - 1` for every
    /// valid render pass
    pub fn tracked_len(&self) -> usize {
        self.instructions().map(|i| i.tracked_len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Instruction builder with an owned insertion cursor.
///
/// The cursor starts at 1 and never rewinds; a destructive clear-and-rewrite
/// on republish is modeled by the publisher, not here. Styled primitives
/// require offset tracking, so only plain paragraphs may follow a table.
#[derive(Debug)]
pub struct DocBuilder {
    cursor: usize,
    edits: Vec<EditInstruction>,
    steps: Vec<RenderStep>,
    tables_emitted: usize,
    tracking: bool,
}

impl Default for DocBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocBuilder {
    pub fn new() -> Self {
        Self {
            cursor: 1,
            edits: Vec::new(),
            steps: Vec::new(),
            tables_emitted: 0,
            tracking: true,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert `text + newline` styled as a heading over exactly that range
    pub fn add_heading(&mut self, level: u8, text: &str) {
        debug_assert!(self.tracking, "styled primitives require offset tracking");
        let start = self.cursor;
        let body = format!("{}\n", text);
        let len = utf16_len(&body);
        self.edits.push(EditInstruction::InsertText {
            location: Location::At(start),
            text: body,
        });
        self.edits.push(EditInstruction::SetParagraphStyle {
            start,
            end: start + len,
            style: ParagraphStyle::heading(level),
        });
        self.cursor += len;
    }

    /// Insert `text + newline`, or a bare newline when text is empty
    pub fn add_paragraph(&mut self, text: &str) {
        let body = if text.is_empty() {
            "\n".to_string()
        } else {
            format!("{}\n", text)
        };
        if self.tracking {
            let len = utf16_len(&body);
            self.edits.push(EditInstruction::InsertText {
                location: Location::At(self.cursor),
                text: body,
            });
            self.cursor += len;
        } else {
            self.edits.push(EditInstruction::InsertText {
                location: Location::End,
                text: body,
            });
        }
    }

    /// Insert all items newline-joined as one block and mark the whole block
    /// as a bulleted list. No-op on an empty list.
    pub fn add_bullet_list(&mut self, items: &[String]) {
        if items.is_empty() {
            return;
        }
        debug_assert!(self.tracking, "styled primitives require offset tracking");
        let start = self.cursor;
        let block = format!("{}\n", items.join("\n"));
        let len = utf16_len(&block);
        self.edits.push(EditInstruction::InsertText {
            location: Location::At(start),
            text: block,
        });
        self.edits.push(EditInstruction::CreateBulletedList {
            start,
            end: start + len,
        });
        self.cursor += len;
    }

    /// Insert `"label: text\n"` with bold covering only the `label:` prefix
    pub fn add_bold_label_line(&mut self, label: &str, text: &str) {
        debug_assert!(self.tracking, "styled primitives require offset tracking");
        let start = self.cursor;
        let line = format!("{}: {}\n", label, text);
        let len = utf16_len(&line);
        let prefix_len = utf16_len(label) + 1;
        self.edits.push(EditInstruction::InsertText {
            location: Location::At(start),
            text: line,
        });
        self.edits.push(EditInstruction::SetRunStyle {
            start,
            end: start + prefix_len,
            bold: true,
        });
        self.cursor += len;
    }

    /// Insert a page break (occupies one index in the text stream)
    pub fn add_page_break(&mut self) {
        debug_assert!(self.tracking, "page breaks require offset tracking");
        self.edits.push(EditInstruction::InsertPageBreak {
            location: Location::At(self.cursor),
        });
        self.cursor += 1;
    }

    /// Phase one of table insertion: emit the empty shape and schedule the
    /// cell fill. Offsets are untracked from here on.
    pub fn add_table(&mut self, rows: Vec<Vec<String>>) {
        if rows.is_empty() {
            return;
        }
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let location = if self.tracking {
            Location::At(self.cursor)
        } else {
            Location::End
        };
        self.edits.push(EditInstruction::InsertTable {
            location,
            rows: rows.len(),
            columns,
        });
        self.flush();
        self.steps.push(RenderStep::FillTable {
            table_ordinal: self.tables_emitted,
            rows,
        });
        self.tables_emitted += 1;
        self.tracking = false;
    }

    pub fn finish(mut self) -> RenderPlan {
        self.flush();
        RenderPlan {
            steps: self.steps,
            final_cursor: self.cursor,
        }
    }

    fn flush(&mut self) {
        if !self.edits.is_empty() {
            let edits = std::mem::take(&mut self.edits);
            self.steps.push(RenderStep::Apply(edits));
        }
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Render a validated record into an ordered edit plan.
///
/// Traversal order is fixed: title → motion/context → framework → the two
/// argument-case sections → counter-cases → extensions → rebuttal ladders →
/// weighing → drills → glossary → examples bank → sources → metadata line.
pub fn render(pack: &LessonPack, naming: CaseNaming) -> RenderPlan {
    let mut b = DocBuilder::new();
    let (first_label, second_label) = naming.labels();

    b.add_heading(1, &pack.title);
    b.add_bold_label_line("Motion", &pack.motion);
    if !pack.context.is_empty() {
        b.add_paragraph(&pack.context);
    }

    if !pack.framework.is_empty() {
        b.add_heading(2, "First Principles");
        b.add_bullet_list(&pack.framework);
    }

    b.add_heading(2, &format!("{} Case", first_label));
    render_case(&mut b, &pack.government_case);
    b.add_heading(2, &format!("{} Case", second_label));
    render_case(&mut b, &pack.opposition_case);

    if !pack.counter_cases.is_empty() {
        b.add_heading(2, "Counter-Cases");
        for counter in &pack.counter_cases {
            b.add_bold_label_line(&counter.targets, &counter.response);
        }
    }

    if !pack.extensions.is_empty() {
        b.add_heading(2, "Extensions");
        b.add_bullet_list(&pack.extensions);
    }

    if !pack.rebuttal_ladders.is_empty() {
        b.add_heading(2, "Rebuttal Ladders");
        for ladder in &pack.rebuttal_ladders {
            b.add_bold_label_line("Against", &ladder.against);
            b.add_bullet_list(&ladder.steps);
        }
    }

    if !pack.weighing.is_empty() {
        b.add_heading(2, "Weighing");
        b.add_bullet_list(&pack.weighing);
    }

    if !pack.drills.is_empty() {
        b.add_heading(2, "Drills");
        b.add_bullet_list(&pack.drills);
    }

    if !pack.glossary.is_empty() {
        b.add_heading(2, "Glossary");
        for entry in &pack.glossary {
            b.add_bold_label_line(&entry.term, &entry.definition);
        }
    }

    if !pack.examples_bank.is_empty() {
        b.add_page_break();
        b.add_heading(2, "Examples Bank");
        for example in &pack.examples_bank {
            render_bank_example(&mut b, example);
        }
    }

    if !pack.sources.is_empty() {
        b.add_heading(2, "Sources");
        b.add_table(sources_table(&pack.sources));
    }

    if let Some(metadata) = &pack.metadata {
        b.add_paragraph(&format!(
            "Generated from {} ({}) on {}",
            metadata.source_file,
            metadata.kind,
            chrono::Utc::now().format("%Y-%m-%d")
        ));
    }

    b.finish()
}

/// One argument-case section. Empty cases render an explicit placeholder;
/// they are the only collection not skipped silently.
fn render_case(b: &mut DocBuilder, case: &[Argument]) {
    if case.is_empty() {
        b.add_paragraph(EMPTY_CASE_PLACEHOLDER);
        return;
    }
    for argument in case {
        b.add_heading(3, &argument.label);
        b.add_paragraph(&argument.reasoning);
        if !argument.stakeholders.is_empty() {
            b.add_bold_label_line("Stakeholders", &argument.stakeholders.join(", "));
        }
        if let Some(comparative) = &argument.comparative {
            b.add_bold_label_line("Comparative", comparative);
        }
        if !argument.preempts.is_empty() {
            b.add_bullet_list(&argument.preempts);
        }
        // Terse in-argument rendering: no sources, no how-to-use
        for example in &argument.examples {
            b.add_bold_label_line(&example.label, &example.what_happened);
            b.add_paragraph(&example.why_it_matters);
        }
    }
}

/// Full example rendering for the top-level bank, including how-to-use and
/// the example's own sources
fn render_bank_example(b: &mut DocBuilder, example: &Example) {
    b.add_heading(3, &example.label);
    b.add_bold_label_line("What happened", &example.what_happened);
    b.add_bold_label_line("Why it matters", &example.why_it_matters);
    if !example.how_to_use.is_empty() {
        b.add_bullet_list(&example.how_to_use);
    }
    if !example.sources.is_empty() {
        let lines: Vec<String> = example.sources.iter().map(format_source).collect();
        b.add_bullet_list(&lines);
    }
}

fn format_source(source: &Source) -> String {
    match (&source.url, &source.note) {
        (Some(url), Some(note)) => format!("{} — {} ({})", source.title, url, note),
        (Some(url), None) => format!("{} — {}", source.title, url),
        (None, Some(note)) => format!("{} ({})", source.title, note),
        (None, None) => source.title.clone(),
    }
}

fn sources_table(sources: &[Source]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(sources.len() + 1);
    rows.push(vec![
        "Title".to_string(),
        "Link".to_string(),
        "Note".to_string(),
    ]);
    for source in sources {
        rows.push(vec![
            source.title.clone(),
            source.url.clone().unwrap_or_default(),
            source.note.clone().unwrap_or_default(),
        ]);
    }
    rows
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lesson::tests::sample_pack;
    use proptest::prelude::*;

    fn first_instruction(plan: &RenderPlan) -> &EditInstruction {
        plan.instructions().next().expect("plan is empty")
    }

    #[test]
    fn test_cursor_matches_tracked_length() {
        let plan = render(&sample_pack(), CaseNaming::Parliamentary);
        assert_eq!(plan.tracked_len(), plan.final_cursor - 1);
    }

    #[test]
    fn test_render_begins_with_title_heading() {
        let pack = sample_pack();
        let plan = render(&pack, CaseNaming::Parliamentary);
        assert!(!plan.is_empty());

        match first_instruction(&plan) {
            EditInstruction::InsertText { location, text } => {
                assert_eq!(*location, Location::At(1));
                assert_eq!(text, "Environment\n");
            }
            other => panic!("expected title insert, got {:?}", other),
        }
        // Styled as level-1 heading over exactly the inserted range
        let styles: Vec<_> = plan
            .instructions()
            .filter_map(|i| match i {
                EditInstruction::SetParagraphStyle { start, end, style } => {
                    Some((*start, *end, *style))
                }
                _ => None,
            })
            .collect();
        assert_eq!(styles[0], (1, 1 + "Environment\n".len(), ParagraphStyle::Heading1));
    }

    #[test]
    fn test_empty_case_renders_single_placeholder() {
        let mut pack = sample_pack();
        pack.opposition_case.clear();
        let plan = render(&pack, CaseNaming::Parliamentary);

        let placeholders = plan
            .instructions()
            .filter(|i| {
                matches!(i, EditInstruction::InsertText { text, .. }
                    if text.trim_end() == EMPTY_CASE_PLACEHOLDER)
            })
            .count();
        assert_eq!(placeholders, 1);

        // No per-argument heading blocks under the emptied section
        let h3_count = plan
            .instructions()
            .filter(|i| {
                matches!(
                    i,
                    EditInstruction::SetParagraphStyle {
                        style: ParagraphStyle::Heading3,
                        ..
                    }
                )
            })
            .count();
        // One government argument plus the examples bank
        assert_eq!(h3_count, 1 + pack.examples_bank.len());
    }

    #[test]
    fn test_case_naming_scheme_controls_labels() {
        let pack = sample_pack();
        let plan = render(&pack, CaseNaming::Policy);
        let texts: Vec<String> = plan
            .instructions()
            .filter_map(|i| match i {
                EditInstruction::InsertText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert!(texts.iter().any(|t| t == "Affirmative Case\n"));
        assert!(texts.iter().any(|t| t == "Negative Case\n"));
        assert!(!texts.iter().any(|t| t == "Government Case\n"));
    }

    #[test]
    fn test_bold_label_covers_prefix_only() {
        let mut b = DocBuilder::new();
        b.add_bold_label_line("Motion", "THW ban it");
        let plan = b.finish();

        let run = plan
            .instructions()
            .find_map(|i| match i {
                EditInstruction::SetRunStyle { start, end, bold } => Some((*start, *end, *bold)),
                _ => None,
            })
            .unwrap();
        // "Motion:" is 7 code units starting at offset 1
        assert_eq!(run, (1, 8, true));
    }

    #[test]
    fn test_bullet_list_spans_whole_block_and_skips_empty() {
        let mut b = DocBuilder::new();
        b.add_bullet_list(&[]);
        assert_eq!(b.cursor(), 1);

        b.add_bullet_list(&["one".to_string(), "two".to_string()]);
        let plan = b.finish();
        let (start, end) = plan
            .instructions()
            .find_map(|i| match i {
                EditInstruction::CreateBulletedList { start, end } => Some((*start, *end)),
                _ => None,
            })
            .unwrap();
        assert_eq!((start, end), (1, 1 + "one\ntwo\n".len()));
    }

    #[test]
    fn test_empty_paragraph_inserts_bare_newline() {
        let mut b = DocBuilder::new();
        b.add_paragraph("");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn test_table_switches_to_end_anchoring() {
        let pack = sample_pack();
        let plan = render(&pack, CaseNaming::Parliamentary);

        // Exactly one fill step, for the first table, sized header + sources
        let fills: Vec<_> = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                RenderStep::FillTable {
                    table_ordinal,
                    rows,
                } => Some((*table_ordinal, rows.len())),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![(0, pack.sources.len() + 1)]);

        // The trailing metadata line lands after the fill, end-anchored
        let last_step = plan.steps.last().unwrap();
        match last_step {
            RenderStep::Apply(edits) => {
                assert!(matches!(
                    edits.last().unwrap(),
                    EditInstruction::InsertText {
                        location: Location::End,
                        ..
                    }
                ));
            }
            other => panic!("expected trailing apply step, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_examples_render_terse() {
        let mut pack = sample_pack();
        pack.government_case[0].examples =
            vec![crate::types::lesson::tests::sample_example("inline")];
        let plan = render(&pack, CaseNaming::Parliamentary);

        let texts: Vec<String> = plan
            .instructions()
            .filter_map(|i| match i {
                EditInstruction::InsertText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        // The inline example's how-to-use list is bank-only
        let inline_count = texts
            .iter()
            .filter(|t| t.contains("Deploy in extension speeches"))
            .count();
        // 3 bank examples carry it; the inline argument example does not add one
        assert_eq!(inline_count, pack.examples_bank.len());
    }

    #[test]
    fn test_utf16_cursor_advance() {
        let mut b = DocBuilder::new();
        // '𝔘' is two UTF-16 code units
        b.add_paragraph("𝔘");
        assert_eq!(b.cursor(), 1 + 3); // 2 units + newline
    }

    proptest! {
        #[test]
        fn prop_cursor_equals_tracked_len_plus_one(
            paragraphs in proptest::collection::vec(".{0,40}", 0..12),
            headings in proptest::collection::vec("[a-zA-Z ]{1,20}", 0..4),
            bullets in proptest::collection::vec("[a-z]{1,10}", 0..6),
        ) {
            let mut b = DocBuilder::new();
            for h in &headings {
                b.add_heading(2, h);
            }
            for p in &paragraphs {
                b.add_paragraph(p);
            }
            b.add_bullet_list(&bullets);
            let plan = b.finish();
            prop_assert_eq!(plan.tracked_len(), plan.final_cursor - 1);
        }
    }
}
