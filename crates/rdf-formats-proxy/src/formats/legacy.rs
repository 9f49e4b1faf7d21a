//! Adapter for callback-style triple parsers
//!
//! Older parsers take the whole document as a string and invoke a callback
//! once per triple, describing each term with an `interface_name` tag. The
//! adapter buffers the input, runs the legacy routine on a blocking task and
//! forwards every translated statement through a bounded channel, so the
//! result is an ordinary [`QuadStream`].

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ByteStream, FormatError, ParseOptions, Parser, QuadStream, read_to_string};
use crate::rdf::{Literal, Quad, Term};

pub const NAMED_NODE: &str = "NamedNode";
pub const LITERAL: &str = "Literal";
pub const BLANK_NODE: &str = "BlankNode";

/// Statements buffered between the legacy routine and the consumer
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A term as described by the legacy interface
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTerm {
    /// `NamedNode`, `Literal` or `BlankNode`
    pub interface_name: String,
    pub nominal_value: String,
    pub language: Option<String>,
    pub datatype: Option<Box<LegacyTerm>>,
}

impl LegacyTerm {
    pub fn named_node(iri: impl Into<String>) -> Self {
        Self {
            interface_name: NAMED_NODE.to_string(),
            nominal_value: iri.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn blank_node(label: impl Into<String>) -> Self {
        Self {
            interface_name: BLANK_NODE.to_string(),
            nominal_value: label.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn literal(
        value: impl Into<String>,
        language: Option<String>,
        datatype: Option<String>,
    ) -> Self {
        Self {
            interface_name: LITERAL.to_string(),
            nominal_value: value.into(),
            language,
            datatype: datatype.map(|d| Box::new(LegacyTerm::named_node(d))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTriple {
    pub subject: LegacyTerm,
    pub predicate: LegacyTerm,
    pub object: LegacyTerm,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct LegacyError(pub String);

/// Synchronous whole-document parser reporting triples through `emit`.
/// Returning `Ok` is the completion signal.
pub trait LegacyParser: Send + Sync + 'static {
    fn process(
        &self,
        input: &str,
        base_iri: &str,
        emit: &mut dyn FnMut(LegacyTriple),
    ) -> Result<(), LegacyError>;
}

/// Exposes a [`LegacyParser`] through the [`Parser`] interface
pub struct LegacyParserAdapter<P> {
    parser: Arc<P>,
    capacity: usize,
}

impl<P: LegacyParser> LegacyParserAdapter<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser: Arc::new(parser),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl<P: LegacyParser> Parser for LegacyParserAdapter<P> {
    fn import(&self, input: ByteStream, options: ParseOptions) -> QuadStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        let parser = Arc::clone(&self.parser);
        let base_iri = options.base_iri.unwrap_or_default();

        tokio::spawn(async move {
            let text = match read_to_string(input).await {
                Ok(text) => text,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            tracing::debug!(length = text.len(), "Legacy parser input buffered");

            let panic_tx = tx.clone();
            let run = tokio::task::spawn_blocking(move || run_legacy(&*parser, &text, &base_iri, tx));
            if run.await.is_err() {
                let _ = panic_tx
                    .send(Err(FormatError::Parse("legacy parser panicked".to_string())))
                    .await;
            }
        });

        ReceiverStream::new(rx).boxed()
    }
}

/// Drive the legacy routine, pushing statements into `tx`. Dropping `tx`
/// on return ends the stream.
fn run_legacy<P: LegacyParser>(
    parser: &P,
    text: &str,
    base_iri: &str,
    tx: mpsc::Sender<Result<Quad, FormatError>>,
) {
    let mut failure: Option<FormatError> = None;
    let mut closed = false;

    let mut emit = |triple: LegacyTriple| {
        if failure.is_some() || closed {
            return;
        }
        match translate(triple) {
            Ok(quad) => {
                // Receiver gone: the consumer stopped reading.
                closed = tx.blocking_send(Ok(quad)).is_err();
            }
            Err(e) => failure = Some(e),
        }
    };

    let outcome = parser.process(text, base_iri, &mut emit);
    let failure = match outcome {
        Err(e) => Some(FormatError::Parse(e.0)),
        Ok(()) => failure,
    };
    if let Some(e) = failure {
        let _ = tx.blocking_send(Err(e));
    }
}

fn translate(triple: LegacyTriple) -> Result<Quad, FormatError> {
    Ok(Quad::triple(
        translate_term(triple.subject)?,
        translate_term(triple.predicate)?,
        translate_term(triple.object)?,
    ))
}

fn translate_term(term: LegacyTerm) -> Result<Term, FormatError> {
    match term.interface_name.as_str() {
        NAMED_NODE => Ok(Term::NamedNode(term.nominal_value)),
        BLANK_NODE => Ok(Term::BlankNode(term.nominal_value)),
        LITERAL => {
            let language = term.language.filter(|l| !l.is_empty());
            let literal = match (language, term.datatype) {
                (Some(language), _) => Literal::lang(term.nominal_value, language),
                (None, Some(datatype)) => Literal::typed(term.nominal_value, datatype.nominal_value),
                (None, None) => Literal::string(term.nominal_value),
            };
            Ok(Term::Literal(literal))
        }
        other => Err(FormatError::Parse(format!(
            "unsupported legacy term kind '{other}'"
        ))),
    }
}
