//! Parsers and serializers backed by `oxrdfio`
//!
//! Documents are parsed on a blocking thread and converted into the crate's
//! own statement model, so the rest of the proxy never sees `oxrdf` types.

use oxrdf::{BlankNode, GraphName, NamedNode};
use oxrdfio::{RdfFormat, RdfParser, RdfSerializer};

use super::{ByteStream, FormatError, ParseOptions, Parser, QuadStream, Serializer, buffered_parse};
use crate::rdf::{Literal, Quad, Term};

/// Parses any syntax `oxrdfio` supports
#[derive(Debug, Clone, Copy)]
pub struct RdfIoParser {
    format: RdfFormat,
}

impl RdfIoParser {
    pub fn new(format: RdfFormat) -> Self {
        Self { format }
    }
}

impl Parser for RdfIoParser {
    fn import(&self, input: ByteStream, options: ParseOptions) -> QuadStream {
        let format = self.format;
        buffered_parse(input, options, move |bytes, options| {
            parse_document(format, bytes, options.base_iri.as_deref())
        })
    }
}

/// Serializes into any syntax `oxrdfio` supports.
///
/// Graph names are dropped for formats that only carry a single graph.
/// `text/n3` output is written as Turtle, which every N3 reader accepts.
#[derive(Debug, Clone, Copy)]
pub struct RdfIoSerializer {
    format: RdfFormat,
}

impl RdfIoSerializer {
    pub fn new(format: RdfFormat) -> Self {
        let format = match format {
            RdfFormat::N3 => RdfFormat::Turtle,
            other => other,
        };
        Self { format }
    }
}

impl Serializer for RdfIoSerializer {
    fn serialize(&self, quads: &[Quad]) -> Result<String, FormatError> {
        let keep_graphs = self.format.supports_datasets();
        let mut writer = RdfSerializer::from_format(self.format).for_writer(Vec::new());
        for quad in quads {
            let quad = to_ox_quad(quad, keep_graphs)?;
            writer
                .serialize_quad(&quad)
                .map_err(|e| FormatError::Serialize(e.to_string()))?;
        }
        let bytes = writer
            .finish()
            .map_err(|e| FormatError::Serialize(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| FormatError::Serialize(format!("output is not UTF-8: {e}")))
    }
}

/// Parse a complete document held in memory
pub fn parse_document(
    format: RdfFormat,
    input: &[u8],
    base_iri: Option<&str>,
) -> Result<Vec<Quad>, FormatError> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base_iri {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| FormatError::Parse(format!("invalid base IRI <{base}>: {e}")))?;
    }

    parser
        .for_reader(input)
        .map(|quad| {
            quad.map_err(|e| FormatError::Parse(e.to_string()))
                .and_then(from_ox_quad)
        })
        .collect()
}

fn from_ox_quad(quad: oxrdf::Quad) -> Result<Quad, FormatError> {
    let graph = match quad.graph_name {
        GraphName::NamedNode(node) => Some(Term::NamedNode(node.into_string())),
        GraphName::BlankNode(node) => Some(Term::BlankNode(node.into_string())),
        GraphName::DefaultGraph => None,
    };
    Ok(Quad::triple(
        from_ox_term(quad.subject.into())?,
        Term::NamedNode(quad.predicate.into_string()),
        from_ox_term(quad.object)?,
    )
    .in_graph(graph))
}

fn from_ox_term(term: oxrdf::Term) -> Result<Term, FormatError> {
    match term {
        oxrdf::Term::NamedNode(node) => Ok(Term::NamedNode(node.into_string())),
        oxrdf::Term::BlankNode(node) => Ok(Term::BlankNode(node.into_string())),
        oxrdf::Term::Literal(literal) => Ok(Term::Literal(match literal.language() {
            Some(language) => Literal::lang(literal.value(), language),
            None => Literal::typed(literal.value(), literal.datatype().as_str()),
        })),
        #[allow(unreachable_patterns)]
        other => Err(FormatError::Parse(format!("unsupported quoted triple: {other}"))),
    }
}

fn to_ox_quad(quad: &Quad, keep_graph: bool) -> Result<oxrdf::Quad, FormatError> {
    let predicate = match &quad.predicate {
        Term::NamedNode(iri) => named_node(iri)?,
        other => {
            return Err(FormatError::Serialize(format!(
                "predicate must be an IRI, found {other}"
            )));
        }
    };
    let object = to_ox_term(&quad.object)?;
    let graph_name = match &quad.graph {
        Some(Term::NamedNode(iri)) if keep_graph => GraphName::from(named_node(iri)?),
        Some(Term::BlankNode(label)) if keep_graph => GraphName::from(blank_node(label)?),
        Some(Term::Literal(literal)) if keep_graph => {
            return Err(FormatError::Serialize(format!(
                "graph name must be an IRI or blank node, found \"{}\"",
                literal.value
            )));
        }
        _ => GraphName::DefaultGraph,
    };

    match &quad.subject {
        Term::NamedNode(iri) => Ok(oxrdf::Quad::new(named_node(iri)?, predicate, object, graph_name)),
        Term::BlankNode(label) => Ok(oxrdf::Quad::new(blank_node(label)?, predicate, object, graph_name)),
        Term::Literal(_) => Err(FormatError::Serialize(format!(
            "literal in subject position: {}",
            quad.subject
        ))),
    }
}

fn to_ox_term(term: &Term) -> Result<oxrdf::Term, FormatError> {
    Ok(match term {
        Term::NamedNode(iri) => named_node(iri)?.into(),
        Term::BlankNode(label) => blank_node(label)?.into(),
        Term::Literal(literal) => match &literal.language {
            Some(language) => oxrdf::Literal::new_language_tagged_literal(&literal.value, language)
                .map_err(|e| FormatError::Serialize(format!("invalid language tag '{language}': {e}")))?
                .into(),
            None => oxrdf::Literal::new_typed_literal(&literal.value, named_node(&literal.datatype)?).into(),
        },
    })
}

fn named_node(iri: &str) -> Result<NamedNode, FormatError> {
    NamedNode::new(iri).map_err(|e| FormatError::Serialize(format!("invalid IRI <{iri}>: {e}")))
}

fn blank_node(label: &str) -> Result<BlankNode, FormatError> {
    BlankNode::new(label)
        .map_err(|e| FormatError::Serialize(format!("invalid blank node label '{label}': {e}")))
}
