//! Parser state.
//!
//! The state owns the node store for one parse and the cursor into the
//! token snapshot. Readers mutate the state exclusively through the
//! methods here, which keep the store's links and the context stack
//! consistent.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::error::Error;
use crate::error::ParseError;
use crate::error::TokenLocation;
use crate::lexer::LexSnapshot;
use crate::lexer::LexToken;
use crate::lexer::Token;
use crate::node::ConstantKind;
use crate::node::NodeId;
use crate::node::NodeKind;
use crate::node::NodePayload;
use crate::node::TokenRange;
use crate::settings::Settings;
use crate::span::Position;
use crate::store::NodeStore;
use crate::trace::TraceManager;

/// Controls how the parser resolves ambiguous prefixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisambiguationBehavior {
    /// Decide from a lookahead window; fail fast if undecidable.
    Strict,
    /// Speculate with a checkpoint; the deeper parse wins.
    #[default]
    Thorough,
}

/// A record of parser state sufficient to roll back to.
///
/// A checkpoint is only valid against the state it was taken from and
/// only going backward: restoring deletes every node allocated since
/// the checkpoint and rewinds the token cursor.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    /// The token cursor at the time of the checkpoint.
    token_index: usize,
    /// The id watermark at the time of the checkpoint.
    id_watermark: u32,
    /// The open context tip at the time of the checkpoint.
    current_context_id: Option<NodeId>,
}

/// The state of a single parse.
#[derive(Debug)]
pub struct ParserState<'a> {
    /// The token snapshot being parsed.
    snapshot: &'a LexSnapshot,
    /// The index of the next token to read.
    token_index: usize,
    /// The node store of the parse.
    store: NodeStore,
    /// The open context tip.
    current_context_id: Option<NodeId>,
    /// The cancellation token polled at safe points.
    cancellation_token: Arc<dyn CancellationToken>,
    /// How ambiguous prefixes are resolved.
    disambiguation_behavior: DisambiguationBehavior,
    /// The trace manager of the parse.
    trace_manager: TraceManager,
    /// The locale used for error message templating by hosts.
    locale: String,
}

impl<'a> ParserState<'a> {
    /// Creates a new state over the given snapshot.
    pub fn new(settings: &Settings, snapshot: &'a LexSnapshot) -> Self {
        Self {
            snapshot,
            token_index: 0,
            store: NodeStore::new(),
            current_context_id: None,
            cancellation_token: settings.cancellation_token(),
            disambiguation_behavior: settings.disambiguation_behavior(),
            trace_manager: settings.trace_manager().clone(),
            locale: settings.locale().to_string(),
        }
    }

    /// Gets the token snapshot being parsed.
    pub fn snapshot(&self) -> &'a LexSnapshot {
        self.snapshot
    }

    /// Gets the node store of the parse.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Gets mutable access to the node store of the parse.
    pub(crate) fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Consumes the state, returning the node store and the index of
    /// the next unread token.
    pub fn into_parts(self) -> (NodeStore, usize) {
        (self.store, self.token_index)
    }

    /// Gets the index of the next token to read.
    pub fn token_index(&self) -> usize {
        self.token_index
    }

    /// Gets the open context tip.
    pub fn current_context_id(&self) -> Option<NodeId> {
        self.current_context_id
    }

    /// Gets how ambiguous prefixes are resolved.
    pub fn disambiguation_behavior(&self) -> DisambiguationBehavior {
        self.disambiguation_behavior
    }

    /// Gets the trace manager of the parse.
    pub fn trace_manager(&self) -> &TraceManager {
        &self.trace_manager
    }

    /// Gets the locale used for error message templating by hosts.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Determines if the cursor is at the end of the snapshot.
    pub fn at_end(&self) -> bool {
        self.token_index >= self.snapshot.len()
    }

    /// Peeks at the next token without consuming it.
    pub fn peek(&self) -> Option<&'a LexToken> {
        self.snapshot.get(self.token_index)
    }

    /// Peeks at the kind of the next token.
    pub fn peek_kind(&self) -> Option<Token> {
        self.peek().map(|t| t.kind())
    }

    /// Peeks at the token `offset` tokens ahead of the cursor.
    pub fn peek_at(&self, offset: usize) -> Option<&'a LexToken> {
        self.snapshot.get(self.token_index + offset)
    }

    /// Determines if the next token has the given kind.
    pub fn is_on(&self, kind: Token) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Gets the text of the next token.
    pub fn peek_text(&self) -> &'a str {
        self.snapshot.text_at(self.token_index)
    }

    /// Raises a [Cancelled][crate::error::Cancelled] error if the
    /// parse has been cancelled.
    pub fn throw_if_cancelled(&self) -> Result<(), Error> {
        self.cancellation_token
            .throw_if_cancelled()
            .map_err(Error::from)
    }

    /// Describes the current cursor location for an error.
    pub fn location(&self) -> TokenLocation {
        match self.peek() {
            Some(token) => TokenLocation::new(
                token.kind(),
                self.snapshot.text(token),
                token.start(),
            ),
            None => TokenLocation::end_of_input(self.snapshot.end_position()),
        }
    }

    /// Describes the location of the token at the given index.
    pub fn location_at(&self, index: usize) -> TokenLocation {
        match self.snapshot.get(index) {
            Some(token) => TokenLocation::new(
                token.kind(),
                self.snapshot.text(token),
                token.start(),
            ),
            None => TokenLocation::end_of_input(self.snapshot.end_position()),
        }
    }

    /// Gets the position one past the last code unit of the source.
    pub fn end_position(&self) -> Position {
        self.snapshot.end_position()
    }

    /// Creates an error for an unexpected token when a single kind was
    /// expected.
    pub fn expected_token_error(&self, expected: Token) -> Error {
        Error::Parse(ParseError::ExpectedTokenKind {
            expected,
            found: self.location(),
        })
    }

    /// Creates an error for an unexpected token when one of several
    /// kinds was expected.
    pub fn expected_any_token_error(&self, expected: &'static [Token]) -> Error {
        Error::Parse(ParseError::ExpectedAnyTokenKind {
            expected,
            found: self.location(),
        })
    }

    /// Opens a context node for a production, making it the context
    /// tip.
    ///
    /// Cancellation is polled here, at the entry of every non-leaf
    /// production.
    pub fn start_context(&mut self, kind: NodeKind) -> Result<NodeId, Error> {
        let token_index = self.token_index as u32;
        self.start_context_at(kind, token_index)
    }

    /// Opens a context node whose token range begins at the given
    /// index, making it the context tip.
    ///
    /// Used by productions that wrap an already-read head node.
    pub fn start_context_at(
        &mut self,
        kind: NodeKind,
        token_index_start: u32,
    ) -> Result<NodeId, Error> {
        self.throw_if_cancelled()?;
        let id = self
            .store
            .open_context(kind, self.current_context_id, token_index_start)?;
        self.current_context_id = Some(id);
        Ok(id)
    }

    /// Promotes the context tip to a fully parsed node, making its
    /// parent the new tip.
    pub fn finish_context(&mut self, payload: NodePayload) -> Result<NodeId, Error> {
        let id = self
            .current_context_id
            .ok_or_else(|| crate::error::InvariantError::new("no context is open"))?;
        let context = self
            .store
            .context(id)
            .ok_or_else(|| crate::error::InvariantError::new("context tip is not in the store"))?;
        let parent = context.parent();
        let token_range = self.token_range_from(context.token_index_start() as usize);

        self.store.close_context(id);
        self.store.promote_context(id, token_range, payload)?;
        self.current_context_id = parent;
        Ok(id)
    }

    /// Deletes the context tip, making its parent the new tip.
    ///
    /// Used by readers that open a speculative production and discover
    /// it is not present.
    pub fn discard_context(&mut self) -> Result<(), Error> {
        let id = self
            .current_context_id
            .ok_or_else(|| crate::error::InvariantError::new("no context is open"))?;
        let parent = self
            .store
            .context(id)
            .ok_or_else(|| crate::error::InvariantError::new("context tip is not in the store"))?
            .parent();
        self.store.delete_context(id)?;
        self.current_context_id = parent;
        Ok(())
    }

    /// Builds the token range from the given start index up to the
    /// cursor.
    pub(crate) fn token_range_from(&self, start: usize) -> TokenRange {
        let end = self.token_index.max(start);
        let position_start = self
            .snapshot
            .get(start)
            .map(|t| t.start())
            .unwrap_or_else(|| self.snapshot.end_position());
        let position_end = if end > start {
            self.snapshot
                .get(end - 1)
                .map(|t| t.end())
                .unwrap_or_else(|| self.snapshot.end_position())
        } else {
            position_start
        };

        TokenRange::new(start as u32, end as u32, position_start, position_end)
    }

    /// Adds a terminal node spanning the next `token_count` tokens
    /// under the context tip, advancing the cursor.
    pub fn add_leaf_spanning(
        &mut self,
        kind: NodeKind,
        payload: NodePayload,
        token_count: usize,
    ) -> Result<NodeId, Error> {
        let start = self.token_index;
        self.token_index += token_count;
        let token_range = self.token_range_from(start);
        let id = self
            .store
            .add_leaf(kind, self.current_context_id, token_range, payload)?;
        Ok(id)
    }

    /// Reads the next token as a constant terminal of the given kind.
    pub fn read_token_as_constant(
        &mut self,
        token: Token,
        constant: ConstantKind,
    ) -> Result<NodeId, Error> {
        if !self.is_on(token) {
            return Err(self.expected_token_error(token));
        }

        self.add_leaf_spanning(NodeKind::Constant, NodePayload::Constant(constant), 1)
    }

    /// Reads the next token as a constant terminal if it has the given
    /// kind.
    pub fn maybe_read_token_as_constant(
        &mut self,
        token: Token,
        constant: ConstantKind,
    ) -> Result<Option<NodeId>, Error> {
        if self.is_on(token) {
            Ok(Some(self.read_token_as_constant(token, constant)?))
        } else {
            Ok(None)
        }
    }

    /// Takes a checkpoint of the current state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            token_index: self.token_index,
            id_watermark: self.store.id_watermark(),
            current_context_id: self.current_context_id,
        }
    }

    /// Restores the state to a previously taken checkpoint.
    ///
    /// Every node allocated since the checkpoint is deleted, children
    /// before parents, and the token cursor and context tip are
    /// rewound.
    pub fn restore(&mut self, checkpoint: &Checkpoint) {
        self.store.delete_ids_at_or_above(checkpoint.id_watermark);
        self.token_index = checkpoint.token_index;
        self.current_context_id = checkpoint.current_context_id;
    }
}
