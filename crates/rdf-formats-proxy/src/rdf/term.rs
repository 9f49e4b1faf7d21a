use std::fmt;

use super::vocab;

/// A literal value with its datatype and optional language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub value: String,
    pub language: Option<String>,
    pub datatype: String,
}

impl Literal {
    /// A plain `xsd:string` literal
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: vocab::XSD_STRING.to_string(),
        }
    }

    /// A language-tagged literal (`rdf:langString`)
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: Some(language.into()),
            datatype: vocab::RDF_LANG_STRING.to_string(),
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: datatype.into(),
        }
    }
}

/// An RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// An absolute IRI
    NamedNode(String),
    /// A blank node label, without the `_:` prefix
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::NamedNode(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::Literal(Literal::string(value))
    }
}

/// N-Triples rendering, also valid inside Turtle and N-Quads documents
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(iri) => write!(f, "<{}>", escape_iri(iri)),
            Term::BlankNode(label) => write!(f, "_:{label}"),
            Term::Literal(literal) => {
                write!(f, "\"{}\"", escape_literal(&literal.value))?;
                if let Some(language) = &literal.language {
                    write!(f, "@{language}")
                } else if literal.datatype != vocab::XSD_STRING {
                    write!(f, "^^<{}>", escape_iri(&literal.datatype))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A statement: subject, predicate, object and an optional graph name.
/// `graph: None` is the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Quad {
    /// A statement in the default graph
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn in_graph(mut self, graph: Option<Term>) -> Self {
        self.graph = graph;
        self
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len());
    for ch in iri.chars() {
        match ch {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                out.push_str(&format!("\\u{:04X}", ch as u32))
            }
            c if (c as u32) <= 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
