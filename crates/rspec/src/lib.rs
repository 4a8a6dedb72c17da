//! Request document serialization.
//!
//! Turns a [`TopologyGraph`] into the XML request the testbed portal accepts:
//! one `node` element per addressed node and physical host, and one `link`
//! element for the LAN.

mod document;
pub mod error;

pub use error::{Result, RspecError};

use corelib::TopologyGraph;
use serde::Serialize;
use tracing::info;

use document::RequestRspec;

/// Counts of the top-level elements in a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSummary {
    /// `node` elements, physical hosts included.
    pub nodes: usize,
    pub links: usize,
    pub blockstores: usize,
}

/// Serialize `graph` to an indented request document with an XML declaration.
pub fn to_request_xml(graph: &TopologyGraph) -> Result<String> {
    render(graph).map(|(xml, _)| xml)
}

/// Like [`to_request_xml`], also returning what the document contains.
pub fn render(graph: &TopologyGraph) -> Result<(String, DocumentSummary)> {
    if graph.nodes().is_empty() {
        return Err(RspecError::EmptyTopology);
    }

    let doc = RequestRspec::from_graph(graph);
    let summary = DocumentSummary {
        nodes: doc.nodes.len(),
        links: doc.links.len(),
        blockstores: doc.nodes.iter().filter(|n| n.blockstore.is_some()).count(),
    };

    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::new(&mut body);
    ser.indent(' ', 2);
    doc.serialize(ser)
        .map_err(|e| RspecError::Serialize(e.to_string()))?;

    info!(
        nodes = summary.nodes,
        blockstores = summary.blockstores,
        interfaces = doc.links.iter().map(|l| l.interface_refs.len()).sum::<usize>(),
        "rendered request document"
    );
    Ok((
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"),
        summary,
    ))
}
