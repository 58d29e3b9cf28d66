//! Parse settings.
//!
//! Settings are immutable once built; `with_*` methods return an
//! updated copy. One settings value may be shared across any number of
//! parses.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::cancellation::NoOpCancellationToken;
use crate::parser::EntryPoint;
use crate::parser::Parser;
use crate::state::DisambiguationBehavior;
use crate::trace::TraceManager;

/// Settings for parsing a document.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The locale hosts use to template error messages.
    locale: String,
    /// The cancellation token polled at safe points.
    cancellation_token: Arc<dyn CancellationToken>,
    /// The reader set used to parse.
    parser: Parser,
    /// An override of the document-then-section orchestration.
    parser_entry_point: Option<EntryPoint>,
    /// How ambiguous prefixes are resolved.
    disambiguation_behavior: DisambiguationBehavior,
    /// The trace manager of the parse.
    trace_manager: TraceManager,
}

impl Settings {
    /// Creates settings with default values: the `en-US` locale, no
    /// cancellation, the recursive descent reader set, the
    /// document-then-section orchestrator, thorough disambiguation,
    /// and no tracing.
    pub fn new() -> Self {
        Self {
            locale: "en-US".to_string(),
            cancellation_token: Arc::new(NoOpCancellationToken),
            parser: Parser::recursive_descent(),
            parser_entry_point: None,
            disambiguation_behavior: DisambiguationBehavior::default(),
            trace_manager: TraceManager::no_op(),
        }
    }

    /// Sets the locale hosts use to template error messages.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets the cancellation token polled at safe points.
    pub fn with_cancellation_token(mut self, token: Arc<dyn CancellationToken>) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Seeds the trace manager's correlation id source.
    pub fn with_initial_correlation_id(mut self, id: u64) -> Self {
        self.trace_manager = self.trace_manager.with_initial_correlation_id(id);
        self
    }

    /// Sets the reader set used to parse.
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Overrides the document-then-section orchestration with a single
    /// entry point.
    pub fn with_parser_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.parser_entry_point = Some(entry_point);
        self
    }

    /// Sets how ambiguous prefixes are resolved.
    pub fn with_disambiguation_behavior(mut self, behavior: DisambiguationBehavior) -> Self {
        self.disambiguation_behavior = behavior;
        self
    }

    /// Sets the trace manager of the parse.
    pub fn with_trace_manager(mut self, manager: TraceManager) -> Self {
        self.trace_manager = manager;
        self
    }

    /// Gets the locale hosts use to template error messages.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Gets the cancellation token polled at safe points.
    pub fn cancellation_token(&self) -> Arc<dyn CancellationToken> {
        self.cancellation_token.clone()
    }

    /// Gets the reader set used to parse.
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Gets the entry point override, if one was set.
    pub fn parser_entry_point(&self) -> Option<EntryPoint> {
        self.parser_entry_point
    }

    /// Gets how ambiguous prefixes are resolved.
    pub fn disambiguation_behavior(&self) -> DisambiguationBehavior {
        self.disambiguation_behavior
    }

    /// Gets the trace manager of the parse.
    pub fn trace_manager(&self) -> &TraceManager {
        &self.trace_manager
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
