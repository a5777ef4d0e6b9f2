//! Reads and writes the citation-count block stored in-band at the top of an
//! item's free-text `extra` field:
//!
//! ```text
//! 42 (number of citation counts)
//! ~~~~
//! <whatever the user already had>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::{LibraryItem, StoreError};

/// A block previously written by this writer, anchored at a line start.
static COUNT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\d+)\s*\(number of citation counts\)\s*\n?~{4,}\s*\n?").unwrap()
});

/// Pre-0.2 format, removed wherever it appears.
static LEGACY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Semantic Scholar Citations:[^\n]*\n?").unwrap());

/// Merge `count` into existing extra-field text.
///
/// Strips the previous count block (first occurrence) and any legacy-format
/// lines, then prepends the fresh block. All other text is preserved below
/// it, so repeated writes leave exactly one block holding the latest count.
pub fn merge_citation_block(extra: &str, count: u64) -> String {
    let stripped = COUNT_BLOCK.replacen(extra, 1, "");
    let stripped = LEGACY_LINE.replace_all(&stripped, "");

    let block = format!("{count} (number of citation counts)\n~~~~");
    let rest = stripped.trim();
    if rest.is_empty() {
        block
    } else {
        format!("{block}\n{rest}")
    }
}

/// Read back the count from a previously written block, if any.
pub fn parse_citation_block(extra: &str) -> Option<u64> {
    let caps = COUNT_BLOCK.captures(extra)?;
    caps.get(1).unwrap().as_str().parse().ok()
}

/// Write `count` into the item's extra field and commit.
pub async fn store_citation_count(
    item: &mut dyn LibraryItem,
    count: u64,
) -> Result<(), StoreError> {
    let extra = item.get_field("extra").unwrap_or_default();
    let merged = merge_citation_block(&extra, count);
    item.set_field("extra", &merged);
    item.save_tx().await?;
    tracing::debug!(item = item.id(), count, "stored citation count");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryItem;

    #[test]
    fn fresh_block_on_empty_field() {
        assert_eq!(
            merge_citation_block("", 42),
            "42 (number of citation counts)\n~~~~"
        );
    }

    #[test]
    fn existing_text_preserved_below_block() {
        let merged = merge_citation_block("Publisher: ACM\nNote: read this", 7);
        assert_eq!(
            merged,
            "7 (number of citation counts)\n~~~~\nPublisher: ACM\nNote: read this"
        );
    }

    #[test]
    fn rewrite_replaces_block_idempotently() {
        let original = "arXiv: 1234.5678\nsome note";
        let once = merge_citation_block(original, 10);
        let twice = merge_citation_block(&once, 25);
        // c1-then-c2 must equal applying c2 directly to the original text
        assert_eq!(twice, merge_citation_block(original, 25));
        assert!(twice.starts_with("25 (number of citation counts)\n~~~~"));
        assert_eq!(twice.matches("number of citation counts").count(), 1);
    }

    #[test]
    fn legacy_lines_removed_anywhere() {
        let extra = "Semantic Scholar Citations: 12\nkeep me\nSemantic Scholar Citations: 9\n";
        assert_eq!(
            merge_citation_block(extra, 3),
            "3 (number of citation counts)\n~~~~\nkeep me"
        );
    }

    #[test]
    fn longer_tilde_runs_also_stripped() {
        let extra = "5 (number of citation counts)\n~~~~~~\nleftover";
        assert_eq!(
            merge_citation_block(extra, 6),
            "6 (number of citation counts)\n~~~~\nleftover"
        );
    }

    #[test]
    fn parse_reads_back_written_count() {
        let merged = merge_citation_block("notes", 1234);
        assert_eq!(parse_citation_block(&merged), Some(1234));
    }

    #[test]
    fn parse_none_without_block() {
        assert_eq!(parse_citation_block("just notes"), None);
        assert_eq!(parse_citation_block(""), None);
    }

    #[tokio::test]
    async fn store_commits_merged_field() {
        let mut item = MemoryItem::new(1).with_field("extra", "old note");
        store_citation_count(&mut item, 99).await.unwrap();

        assert_eq!(
            item.get_field("extra").unwrap(),
            "99 (number of citation counts)\n~~~~\nold note"
        );
        assert_eq!(item.save_count(), 1);
    }

    #[tokio::test]
    async fn store_propagates_persist_failure() {
        let mut item = MemoryItem::new(2).failing_save();
        assert!(store_citation_count(&mut item, 1).await.is_err());
    }
}
