//! Grouping table rows into assertion blocks.
//!
//! A block starts at a row with a non-empty assertion cell and collects every
//! following blank-assertion row as a further procedure, until the next
//! labeled row or the end of the table.

use crate::table::{AssertionRow, LocatedTable};
use crate::types::{AssertionBlock, ProcedureEntry};

/// Extract ordered assertion blocks from a located table.
pub fn extract_blocks(table: &LocatedTable) -> Vec<AssertionBlock> {
    group_rows(&table.assertion_rows())
}

/// Group typed rows into blocks, preserving row order.
///
/// Rows before the first assertion are ignored. A table without any
/// assertion yields no blocks.
pub fn group_rows(rows: &[AssertionRow]) -> Vec<AssertionBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    let mut details: Vec<ProcedureEntry> = Vec::new();

    for row in rows {
        let entry = ProcedureEntry::new(row.procedure.clone(), row.link.clone());

        match &row.assertion {
            Some(assertion) => {
                if let Some(previous) = current.take() {
                    blocks.push(AssertionBlock {
                        assertion: previous,
                        procedures: std::mem::take(&mut details),
                    });
                }
                current = Some(assertion.clone());
                details = vec![entry];
            }
            None if current.is_some() => details.push(entry),
            None => {}
        }
    }

    if let Some(last) = current {
        blocks.push(AssertionBlock {
            assertion: last,
            procedures: details,
        });
    }

    tracing::debug!(blocks = blocks.len(), rows = rows.len(), "Extracted assertion blocks");
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::table::{locate_table, ASSERTION_LABEL};
    use proptest::prelude::*;

    fn opt(s: &str) -> Option<&str> {
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    fn row(assertion: &str, procedure: &str, link: &str) -> AssertionRow {
        AssertionRow::new(opt(assertion), opt(procedure), opt(link))
    }

    #[test]
    fn test_groups_detail_rows_under_assertion() {
        let rows = vec![
            row("A1", "p1", ""),
            row("", "p2", "S1!A1"),
            row("A2", "p3", ""),
        ];
        let blocks = group_rows(&rows);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].assertion, "A1");
        assert_eq!(
            blocks[0].procedures,
            vec![
                ProcedureEntry::new(Some("p1".into()), None),
                ProcedureEntry::new(Some("p2".into()), Some("S1!A1".into())),
            ]
        );
        assert_eq!(blocks[1].assertion, "A2");
        assert_eq!(
            blocks[1].procedures,
            vec![ProcedureEntry::new(Some("p3".into()), None)]
        );
    }

    #[test]
    fn test_rows_before_first_assertion_ignored() {
        let rows = vec![row("", "orphan", "X"), row("A1", "p1", "")];
        let blocks = group_rows(&rows);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].procedures.len(), 1);
        assert_eq!(blocks[0].procedures[0].procedure.as_deref(), Some("p1"));
    }

    #[test]
    fn test_empty_table_yields_no_blocks() {
        assert!(group_rows(&[]).is_empty());
        assert!(group_rows(&[row("", "p", ""), row("", "", "")]).is_empty());
    }

    #[test]
    fn test_labeled_row_without_procedure_still_seeds_entry() {
        let blocks = group_rows(&[row("A1", "", "")]);
        assert_eq!(blocks[0].procedures, vec![ProcedureEntry::default()]);
    }

    #[test]
    fn test_extract_from_located_table() {
        let grid = Grid::from_text_rows([
            vec!["Client: Acme", "", ""],
            vec!["Assertion", "Testing procedures performed", "Link"],
            vec!["Cash exists", "Bank confirmation", "Bank!A1"],
            vec!["", "Reconciliation", "Recon'!A1"],
            vec!["Revenue complete", "Cut-off test", ""],
        ]);
        let table = locate_table(&grid, ASSERTION_LABEL).unwrap();
        let blocks = extract_blocks(&table);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].procedures.len(), 2);
        assert_eq!(blocks[0].procedures[1].link.as_deref(), Some("Recon'!A1"));
        assert_eq!(blocks[1].assertion, "Revenue complete");
    }

    fn arb_rows() -> impl Strategy<Value = Vec<(Option<String>, String)>> {
        proptest::collection::vec(
            (proptest::option::of("[A-Z][a-z]{0,6}"), "[a-z]{0,6}"),
            0..30,
        )
    }

    proptest! {
        #[test]
        fn prop_one_block_per_labeled_row(rows in arb_rows()) {
            let typed: Vec<AssertionRow> = rows
                .iter()
                .map(|(a, p)| AssertionRow::new(a.as_deref(), Some(p.as_str()), None))
                .collect();
            let labeled: Vec<&String> = rows.iter().filter_map(|(a, _)| a.as_ref()).collect();

            let blocks = group_rows(&typed);

            prop_assert_eq!(blocks.len(), labeled.len());
            for (block, label) in blocks.iter().zip(labeled) {
                prop_assert_eq!(&block.assertion, label);
                prop_assert!(!block.procedures.is_empty());
            }
        }

        #[test]
        fn prop_no_procedure_lost_after_first_label(rows in arb_rows()) {
            let typed: Vec<AssertionRow> = rows
                .iter()
                .map(|(a, p)| AssertionRow::new(a.as_deref(), Some(p.as_str()), None))
                .collect();
            let first = typed.iter().position(|r| r.assertion.is_some());

            let blocks = group_rows(&typed);
            let total: usize = blocks.iter().map(|b| b.procedures.len()).sum();

            prop_assert_eq!(total, first.map(|i| typed.len() - i).unwrap_or(0));
        }
    }
}
