//! Ordered callback registry
//!
//! Handlers are stored per phase in registration order and invoked by
//! plain iteration. The registry is frozen behind an `Arc` when a run
//! starts, so workers read it without locking.

use crate::crawler::extractor::HtmlElement;
use crate::crawler::request::{Request, Response};
use crate::CollectorError;
use scraper::Selector;
use std::fmt;
use std::sync::Arc;

/// Lifecycle point at which a handler fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Request,
    Error,
    Response,
    Html,
    Scraped,
}

impl Phase {
    /// Only HTML handlers are bound to a selector
    pub fn requires_selector(&self) -> bool {
        matches!(self, Self::Html)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "on_request",
            Self::Error => "on_error",
            Self::Response => "on_response",
            Self::Html => "on_html",
            Self::Scraped => "on_scraped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type RequestHandler = Arc<dyn Fn(&mut Request) + Send + Sync>;
pub type ResponseHandler = Arc<dyn Fn(&Response) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&Request, &CollectorError) + Send + Sync>;
pub type HtmlHandler = Arc<dyn Fn(&HtmlElement<'_>) + Send + Sync>;
pub type RejectionHandler = Arc<dyn Fn(&CollectorError) + Send + Sync>;

/// A handler tagged with the phase it was written for
#[derive(Clone)]
pub enum Handler {
    Request(RequestHandler),
    Error(ErrorHandler),
    Response(ResponseHandler),
    Html(HtmlHandler),
    Scraped(ResponseHandler),
}

impl Handler {
    pub fn request(f: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        Self::Request(Arc::new(f))
    }

    pub fn error(f: impl Fn(&Request, &CollectorError) + Send + Sync + 'static) -> Self {
        Self::Error(Arc::new(f))
    }

    pub fn response(f: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        Self::Response(Arc::new(f))
    }

    pub fn html(f: impl Fn(&HtmlElement<'_>) + Send + Sync + 'static) -> Self {
        Self::Html(Arc::new(f))
    }

    pub fn scraped(f: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        Self::Scraped(Arc::new(f))
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Request(_) => Phase::Request,
            Self::Error(_) => Phase::Error,
            Self::Response(_) => Phase::Response,
            Self::Html(_) => Phase::Html,
            Self::Scraped(_) => Phase::Scraped,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.phase())
    }
}

/// An HTML handler bound to a parsed selector
pub struct HtmlCallback {
    source: String,
    selector: Selector,
    handler: HtmlHandler,
}

impl HtmlCallback {
    fn new(source: &str, handler: HtmlHandler) -> Result<Self, CollectorError> {
        let selector = Selector::parse(source).map_err(|e| CollectorError::InvalidSelector {
            selector: source.to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(Self {
            source: source.to_string(),
            selector,
            handler,
        })
    }

    /// The selector as registered
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub(crate) fn invoke(&self, element: &HtmlElement<'_>) {
        (self.handler)(element)
    }
}

/// Handlers for every phase, in registration order
#[derive(Default)]
pub struct Callbacks {
    request: Vec<RequestHandler>,
    error: Vec<ErrorHandler>,
    response: Vec<ResponseHandler>,
    html: Vec<HtmlCallback>,
    scraped: Vec<ResponseHandler>,
    rejected: Vec<RejectionHandler>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to its phase
    ///
    /// A selector must be given for HTML handlers and only for them, and
    /// the handler kind must agree with `phase`.
    pub fn register(
        &mut self,
        phase: Phase,
        selector: Option<&str>,
        handler: Handler,
    ) -> Result<(), CollectorError> {
        if handler.phase() != phase {
            return Err(CollectorError::InvalidPhaseSelector(format!(
                "{} handler registered for {}",
                handler.phase(),
                phase
            )));
        }

        match (phase.requires_selector(), selector) {
            (true, None) => {
                return Err(CollectorError::InvalidPhaseSelector(format!(
                    "{} requires a selector",
                    phase
                )))
            }
            (false, Some(selector)) => {
                return Err(CollectorError::InvalidPhaseSelector(format!(
                    "{} does not take a selector (got '{}')",
                    phase, selector
                )))
            }
            _ => {}
        }

        match handler {
            Handler::Request(h) => self.request.push(h),
            Handler::Error(h) => self.error.push(h),
            Handler::Response(h) => self.response.push(h),
            Handler::Scraped(h) => self.scraped.push(h),
            Handler::Html(h) => {
                let selector = selector.unwrap_or_default();
                self.html.push(HtmlCallback::new(selector, h)?);
            }
        }

        Ok(())
    }

    pub fn add_rejected(&mut self, handler: RejectionHandler) {
        self.rejected.push(handler);
    }

    /// Number of handlers registered for a phase
    pub fn count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Request => self.request.len(),
            Phase::Error => self.error.len(),
            Phase::Response => self.response.len(),
            Phase::Html => self.html.len(),
            Phase::Scraped => self.scraped.len(),
        }
    }

    pub fn html(&self) -> &[HtmlCallback] {
        &self.html
    }

    pub(crate) fn rejection_handlers(&self) -> Vec<RejectionHandler> {
        self.rejected.clone()
    }

    pub(crate) fn fire_request(&self, request: &mut Request) {
        for handler in &self.request {
            handler(request);
        }
    }

    pub(crate) fn fire_error(&self, request: &Request, error: &CollectorError) {
        for handler in &self.error {
            handler(request, error);
        }
    }

    pub(crate) fn fire_response(&self, response: &Response) {
        for handler in &self.response {
            handler(response);
        }
    }

    pub(crate) fn fire_scraped(&self, response: &Response) {
        for handler in &self.scraped {
            handler(response);
        }
    }
}
