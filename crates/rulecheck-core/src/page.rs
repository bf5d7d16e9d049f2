//! Page Store: the ordered, 1-indexed text of one document.
//!
//! Every downstream stage (prompt building, evidence search, keyword
//! fallback) reads pages from here. A store is built once per check
//! request and is read-only afterwards, so it can be shared across
//! concurrent per-rule verifications without synchronization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building a page store out of caller-supplied pages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageStoreError {
    #[error("Page numbers are 1-based, found page 0 at position {position}")]
    ZeroPageNumber { position: usize },

    #[error("Page numbers must strictly increase: page {page} follows page {previous}")]
    NotIncreasing { previous: u32, page: u32 },
}

/// A single extracted page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub page: u32,

    /// Normalized page text (empty when nothing could be extracted)
    pub text: String,
}

impl Page {
    /// Create a page, normalizing its text.
    pub fn new(page: u32, text: impl AsRef<str>) -> Self {
        Self {
            page,
            text: normalize_page_text(text.as_ref()),
        }
    }

    /// Whether the page has no extractable text.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Ordered sequence of pages for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PageStore {
    pages: Vec<Page>,
}

impl PageStore {
    /// Build a store from page texts in reading order.
    ///
    /// Pages are numbered 1..=N and their text is normalized.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, text))
            .collect();
        Self { pages }
    }

    /// Build a store from already numbered pages.
    ///
    /// Page numbers must be >= 1 and strictly increasing. Text is taken
    /// as-is; callers are expected to have normalized it.
    pub fn from_pages(pages: Vec<Page>) -> Result<Self, PageStoreError> {
        let mut previous: Option<u32> = None;
        for (position, page) in pages.iter().enumerate() {
            if page.page == 0 {
                return Err(PageStoreError::ZeroPageNumber { position });
            }
            if let Some(previous) = previous {
                if page.page <= previous {
                    return Err(PageStoreError::NotIncreasing {
                        previous,
                        page: page.page,
                    });
                }
            }
            previous = Some(page.page);
        }
        Ok(Self { pages })
    }

    /// All pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Look up a page by its 1-based number.
    pub fn get(&self, page: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page == page)
    }

    /// Page numbers that carry no text.
    pub fn blank_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.is_blank())
            .map(|p| p.page)
            .collect()
    }
}

impl<'a> IntoIterator for &'a PageStore {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

/// Normalize extracted text so sentence search is stable.
///
/// Trims every line and drops blank ones.
pub fn normalize_page_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_blank_lines_and_trims() {
        let raw = "  Title  \n\n\t\nFirst line.  \r\n   second line\n";
        assert_eq!(normalize_page_text(raw), "Title\nFirst line.\nsecond line");
    }

    #[test]
    fn test_normalize_whitespace_only_is_empty() {
        assert_eq!(normalize_page_text(" \n\t \n"), "");
        assert_eq!(normalize_page_text(""), "");
    }

    #[test]
    fn test_from_texts_numbers_from_one() {
        let store = PageStore::from_texts(["first", "", "third"]);
        let numbers: Vec<u32> = store.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(store.blank_pages(), vec![2]);
        assert_eq!(store.get(3).unwrap().text, "third");
    }

    #[test]
    fn test_from_pages_rejects_zero() {
        let result = PageStore::from_pages(vec![Page::new(0, "x")]);
        assert_eq!(result, Err(PageStoreError::ZeroPageNumber { position: 0 }));
    }

    #[test]
    fn test_from_pages_rejects_non_increasing() {
        let result = PageStore::from_pages(vec![Page::new(2, "a"), Page::new(2, "b")]);
        assert!(matches!(
            result,
            Err(PageStoreError::NotIncreasing { previous: 2, page: 2 })
        ));
    }

    #[test]
    fn test_from_pages_allows_gaps() {
        let store = PageStore::from_pages(vec![Page::new(1, "a"), Page::new(3, "c")]).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_serializes_as_array() {
        let store = PageStore::from_texts(["hello"]);
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json, serde_json::json!([{"page": 1, "text": "hello"}]));
    }
}
