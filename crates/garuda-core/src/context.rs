//! Assembling the evaluation context for one assertion block.
//!
//! Section order mirrors procedure order exactly. Linked grids are embedded
//! in full; nothing is truncated or summarized.

use crate::linked::resolve_link;
use crate::types::AssertionBlock;
use crate::workbook::Workbook;

/// Terminates every procedure section.
pub const SECTION_SEPARATOR: &str = "---\n\n";

/// Builds evaluation contexts, resolving links against a workbook.
pub struct ContextAssembler<'a, W: Workbook + ?Sized> {
    workbook: &'a mut W,
}

impl<'a, W: Workbook + ?Sized> ContextAssembler<'a, W> {
    pub fn new(workbook: &'a mut W) -> Self {
        Self { workbook }
    }

    /// Render one block and its linked data as evaluation context.
    ///
    /// Links are resolved fresh on every call; a failed resolution becomes
    /// an inline `Error:` line.
    pub fn assemble(&mut self, block: &AssertionBlock) -> String {
        let mut context = format!(
            "Evaluate: {}\n\nTesting Procedures and Related Data:\n\n",
            block.assertion
        );

        for (i, entry) in block.procedures.iter().enumerate() {
            context.push_str(&format!(
                "Procedure {}\nDescription: {}\n\n",
                i + 1,
                entry.procedure.as_deref().unwrap_or("(none)")
            ));

            match resolve_link(&mut *self.workbook, entry.link.as_deref()) {
                Some(Ok(sheet)) => {
                    context.push_str(&format!("Linked Sheet: {}\n", sheet.sheet_name));
                    context.push_str(&format!("Dimensions: {}\n", sheet.dimensions()));
                    context.push_str(&format!("Data:\n{}\n\n", sheet.raw_data.to_json_pretty()));
                }
                Some(Err(e)) => context.push_str(&format!("Error: {}\n\n", e)),
                None => {}
            }

            context.push_str(SECTION_SEPARATOR);
        }

        context
    }
}
