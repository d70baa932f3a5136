//! Well-known vocabulary IRIs.
//!
//! These are plain constants. No prefix is implicitly bound to them: queries must
//! declare `rdf:`/`rdfs:` like any other prefix.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// `rdf:type`: entity to class membership.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdfs:subClassOf`: class to direct parent class.
pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

/// The suffix of an IRI after its last `#` or `/`.
///
/// Returns the input unchanged when it contains neither separator.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}
