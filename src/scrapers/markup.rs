use scraper::{ElementRef, Selector};

/// Tree queries the extractors need from a parsed page.
///
/// Implemented for `scraper::ElementRef`, so any element of a parsed
/// `Html` document (or the document root) can be queried directly.
pub trait MarkupNode<'a>: Sized {
    /// First descendant matching `selector`
    fn find_first(&self, selector: &Selector) -> Option<Self>;

    /// All descendants matching `selector`, in document order
    fn find_all(&self, selector: &Selector) -> Vec<Self>;

    /// Text content with each piece trimmed and joined without separator
    fn text_content(&self) -> String;

    /// Text content with each non-empty trimmed piece joined by `separator`
    fn text_joined(&self, separator: &str) -> String;

    fn attr(&self, name: &str) -> Option<&'a str>;
}

impl<'a> MarkupNode<'a> for ElementRef<'a> {
    fn find_first(&self, selector: &Selector) -> Option<Self> {
        self.select(selector).next()
    }

    fn find_all(&self, selector: &Selector) -> Vec<Self> {
        self.select(selector).collect()
    }

    fn text_content(&self) -> String {
        ElementRef::text(self).map(str::trim).collect()
    }

    fn text_joined(&self, separator: &str) -> String {
        ElementRef::text(self)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }
}

/// Compile a selector literal. Only used for the static selectors below.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}
