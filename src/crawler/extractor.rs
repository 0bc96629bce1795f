//! HTML extraction for fetched documents
//!
//! This module handles:
//! - Parsing the response body into a DOM
//! - Running every HTML callback, in registration order, once per matching
//!   element in document order
//! - Resolving links against the document base (final URL, or `<base href>`)

use crate::crawler::callbacks::HtmlCallback;
use crate::crawler::request::{Request, Response};
use crate::url::resolve_link;
use crate::CollectorError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A matched element, scoped to the document it came from
pub struct HtmlElement<'a> {
    element: ElementRef<'a>,
    response: &'a Response,
    base: &'a Url,
    index: usize,
}

impl<'a> HtmlElement<'a> {
    fn new(element: ElementRef<'a>, response: &'a Response, base: &'a Url, index: usize) -> Self {
        Self {
            element,
            response,
            base,
            index,
        }
    }

    /// Tag name of the element
    pub fn name(&self) -> &str {
        self.element.value().name()
    }

    /// Attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Concatenated text content of the element and its descendants
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Inner HTML of the element
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Position of this match among the matches of its selector
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn response(&self) -> &'a Response {
        self.response
    }

    pub fn request(&self) -> &'a Request {
        self.response.request()
    }

    /// Base URL used for link resolution
    pub fn base_url(&self) -> &'a Url {
        self.base
    }

    /// Trimmed text of the first descendant matching `selector`
    ///
    /// Returns an empty string when nothing matches or the selector is
    /// invalid.
    pub fn child_text(&self, selector: &str) -> String {
        let Some(sel) = parse_selector(selector) else {
            return String::new();
        };
        let text = self
            .element
            .select(&sel)
            .next()
            .map(|child| child.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        text
    }

    /// Attribute of the first descendant matching `selector`
    pub fn child_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let sel = parse_selector(selector)?;
        let value = self
            .element
            .select(&sel)
            .find_map(|child| child.value().attr(attr))
            .map(str::to_string);
        value
    }

    /// Attribute of every descendant matching `selector`, in document order
    pub fn child_attrs(&self, selector: &str, attr: &str) -> Vec<String> {
        let Some(sel) = parse_selector(selector) else {
            return Vec::new();
        };
        let values = self
            .element
            .select(&sel)
            .filter_map(|child| child.value().attr(attr))
            .map(str::to_string)
            .collect();
        values
    }

    /// Calls `f` for each descendant matching `selector`
    pub fn for_each<F>(&self, selector: &str, mut f: F)
    where
        F: FnMut(&HtmlElement<'a>),
    {
        let Some(sel) = parse_selector(selector) else {
            return;
        };
        for (index, child) in self.element.select(&sel).enumerate() {
            f(&HtmlElement::new(child, self.response, self.base, index));
        }
    }

    /// Resolves a possibly relative link against the document base
    pub fn absolute_url(&self, href: &str) -> Option<Url> {
        resolve_link(href, self.base)
    }

    /// Enqueues a link found on this element's page
    pub fn visit(&self, href: &str) -> Result<bool, CollectorError> {
        self.request().visit_relative_to(href, self.base)
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!("Ignoring invalid selector '{}': {:?}", selector, e);
            None
        }
    }
}

/// Resolves the document base: `<base href>` if present, else the final URL
fn document_base(document: &Html, final_url: &Url) -> Url {
    let Ok(sel) = Selector::parse("base[href]") else {
        return final_url.clone();
    };
    let href = document
        .select(&sel)
        .next()
        .and_then(|base| base.value().attr("href"));

    href.and_then(|href| final_url.join(href.trim()).ok())
        .unwrap_or_else(|| final_url.clone())
}

/// Runs all HTML callbacks over a response body
///
/// Returns the total number of handler invocations. The parsed DOM lives
/// only for the duration of this call.
pub fn extract(response: &Response, callbacks: &[HtmlCallback]) -> usize {
    if callbacks.is_empty() {
        return 0;
    }

    let document = Html::parse_document(response.body());
    let base = document_base(&document, response.url());

    let mut invocations = 0;
    for callback in callbacks {
        for (index, element) in document.select(callback.selector()).enumerate() {
            callback.invoke(&HtmlElement::new(element, response, &base, index));
            invocations += 1;
        }
    }

    tracing::trace!(
        "Extracted {} with {} handler invocations",
        response.url(),
        invocations
    );

    invocations
}
