//! Small query interface over a parsed markup tree.
//!
//! Receipt parsers only need "text of the first match", "text of every match"
//! and "fields of every row". [`HtmlDocument`] implements it with `scraper`.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

pub trait MarkupQuery {
    /// Whitespace-collapsed text of the first node matching `selector`
    fn first_text(&self, selector: &str) -> Option<String>;

    /// Whitespace-collapsed text of every node matching `selector`, in document order
    fn all_texts(&self, selector: &str) -> Vec<String>;

    /// One entry per node matching `row_selector`. Each entry holds, for every
    /// field selector, the text of the row's first matching descendant
    /// (empty string when nothing matches).
    fn rows(&self, row_selector: &str, fields: &[&str]) -> Vec<Vec<String>>;
}

/// HTML document parsed with `scraper` (html5ever)
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

fn selector(s: &str) -> Option<Selector> {
    match Selector::parse(s) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = s, error = %e, "invalid selector");
            None
        }
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    for piece in element.text() {
        raw.push_str(piece);
    }
    collapse_whitespace(&raw)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl MarkupQuery for HtmlDocument {
    fn first_text(&self, s: &str) -> Option<String> {
        let sel = selector(s)?;
        self.html.select(&sel).next().map(|el| element_text(&el))
    }

    fn all_texts(&self, s: &str) -> Vec<String> {
        let Some(sel) = selector(s) else {
            return Vec::new();
        };
        self.html.select(&sel).map(|el| element_text(&el)).collect()
    }

    fn rows(&self, row_selector: &str, fields: &[&str]) -> Vec<Vec<String>> {
        let Some(row_sel) = selector(row_selector) else {
            return Vec::new();
        };
        let field_sels: Vec<Option<Selector>> = fields.iter().map(|f| selector(f)).collect();

        self.html
            .select(&row_sel)
            .map(|row| {
                field_sels
                    .iter()
                    .map(|fs| {
                        fs.as_ref()
                            .and_then(|fs| row.select(fs).next())
                            .map(|el| element_text(&el))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <div class="txtCenter"><div id="u20">  MERCADO   TESTE </div></div>
  <div class="txtCenter">Emitida em 01/02/2025</div>
  <table id="tabResult">
    <tr><td><span class="txtTit">ARROZ</span></td><td><span class="valor">20,00</span></td></tr>
    <tr><td><span class="txtTit">FEIJAO</span></td></tr>
  </table>
</body></html>"#;

    #[test]
    fn test_first_and_all_texts() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.first_text(".txtCenter").as_deref(), Some("MERCADO TESTE"));
        assert_eq!(doc.all_texts(".txtCenter").len(), 2);
        assert_eq!(doc.first_text(".missing"), None);
    }

    #[test]
    fn test_rows_with_missing_fields() {
        let doc = HtmlDocument::parse(PAGE);
        let rows = doc.rows("#tabResult tr", &[".txtTit", ".valor"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["ARROZ".to_string(), "20,00".to_string()]);
        assert_eq!(rows[1], vec!["FEIJAO".to_string(), String::new()]);
    }

    #[test]
    fn test_invalid_selector_is_empty() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.first_text("[[["), None);
        assert!(doc.rows("#tabResult tr", &["[[["])[0][0].is_empty());
    }
}
