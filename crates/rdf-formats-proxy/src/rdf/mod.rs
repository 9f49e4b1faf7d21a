//! RDF statement model shared by every parser and serializer
//!
//! IRIs are always stored expanded. Literals always carry a datatype:
//! plain strings use `xsd:string`, language-tagged strings `rdf:langString`.

mod term;

pub use term::{Literal, Quad, Term};

/// Vocabulary IRIs the statement model relies on
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
}
