//! SVG markup helpers over `roxmltree`.
//!
//! Documents are parsed to find elements and attributes; edits are spliced back into the source
//! text by byte range, so everything that is not touched survives verbatim.

use std::ops::Range;

use roxmltree::{Document, Node, ParsingOptions};

use crate::foundation::error::{GlintError, GlintResult};

/// Escape text for use in XML character data or a quoted attribute value.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse `doc` as XML. DTDs are allowed since exported SVGs often carry one.
pub fn parse(doc: &str) -> GlintResult<Document<'_>> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(doc, opts)
        .map_err(|e| GlintError::layout(format!("malformed svg markup: {e}")))
}

/// The document element, if it is an `<svg>`.
pub fn svg_root<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    let root = doc.root_element();
    root.has_tag_name("svg").then_some(root)
}

/// Declared `(width, height)` of an element, if both parse as positive lengths.
pub fn declared_size(node: Node<'_, '_>) -> Option<(f64, f64)> {
    let w = parse_len(node.attribute("width"))?;
    let h = parse_len(node.attribute("height"))?;
    Some((f64::from(w), f64::from(h)))
}

/// Declared size of the root `<svg>` of `svg`.
pub fn root_size(svg: &str) -> Option<(f64, f64)> {
    let doc = parse(svg).ok()?;
    declared_size(svg_root(&doc)?)
}

/// Parse a plain or `px` length; rejects non-finite and non-positive values.
pub fn parse_len(v: Option<&str>) -> Option<f32> {
    v.map(|v| v.trim().trim_end_matches("px"))
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Byte-range edits against one source document, applied in one pass by [`Splice::finish`].
///
/// Edits must not overlap; an edit that starts inside an earlier one is dropped.
#[derive(Debug)]
pub struct Splice<'s> {
    source: &'s str,
    edits: Vec<(Range<usize>, String)>,
}

impl<'s> Splice<'s> {
    /// No edits yet.
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Set the un-namespaced attribute `name` on `node` to the raw text `value`.
    ///
    /// An existing value is replaced inside its original quotes; a missing attribute is appended
    /// after the element's last attribute.
    pub fn set_attr(&mut self, node: Node<'_, '_>, name: &str, value: &str) {
        let existing = node
            .attributes()
            .find(|a| a.name() == name && a.namespace().is_none());
        match existing {
            Some(attr) => self.set_value(attr.range_value(), value),
            None => {
                let at = attr_insert_pos(self.source, node);
                self.edits
                    .push((at..at, format!(" {name}=\"{}\"", escape_xml(value))));
            }
        }
    }

    /// Replace the attribute value at `range` (quotes excluded) with the raw text `value`.
    pub fn set_value(&mut self, range: Range<usize>, value: &str) {
        self.edits.push((range, escape_xml(value)));
    }

    /// Insert already-serialized markup as the last child of `node`.
    pub fn append_child(&mut self, node: Node<'_, '_>, fragment: &str) {
        let range = node.range();
        let element = &self.source[range.clone()];
        if node.first_child().is_none() && element.ends_with("/>") {
            let name = &self.source[range.start + 1..tag_name_end(self.source, node)];
            self.edits.push((
                range.end - 2..range.end,
                format!(">{fragment}</{name}>"),
            ));
        } else if let Some(close) = element.rfind("</") {
            let at = range.start + close;
            self.edits.push((at..at, fragment.to_string()));
        }
    }

    /// Whether any edit was recorded.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit and return the new document.
    pub fn finish(mut self) -> String {
        // Stable: insertions at one position keep their recording order.
        self.edits.sort_by_key(|(range, _)| range.start);
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, text) in self.edits {
            if range.start < cursor {
                tracing::debug!(?range, "dropping overlapping markup edit");
                continue;
            }
            out.push_str(&self.source[cursor..range.start]);
            out.push_str(&text);
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

// Byte offset just past the element's qualified name in its start tag.
fn tag_name_end(source: &str, node: Node<'_, '_>) -> usize {
    let start = node.range().start + 1;
    source[start..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map_or(source.len(), |i| start + i)
}

fn attr_insert_pos(source: &str, node: Node<'_, '_>) -> usize {
    node.attributes()
        .map(|a| a.range().end)
        .max()
        .unwrap_or_else(|| tag_name_end(source, node))
}

/// Rewrite the root `<svg>` element to a `width` x `height` box.
///
/// Existing `width`/`height` are replaced. A missing `viewBox` is synthesized from the original
/// width/height (or `default_view` when those are absent too) so content scales instead of being
/// cropped.
pub fn resize_root(
    svg: &str,
    width: u32,
    height: u32,
    default_view: (f32, f32),
) -> GlintResult<String> {
    let doc = parse(svg)?;
    let root = svg_root(&doc).ok_or_else(|| GlintError::layout("document root is not <svg>"))?;

    let mut splice = Splice::new(svg);
    splice.set_attr(root, "width", &width.to_string());
    splice.set_attr(root, "height", &height.to_string());
    if root.attribute("viewBox").is_none() {
        let w = parse_len(root.attribute("width")).unwrap_or(default_view.0);
        let h = parse_len(root.attribute("height")).unwrap_or(default_view.1);
        splice.set_attr(root, "viewBox", &format!("0 0 {w} {h}"));
    }
    Ok(splice.finish())
}

/// Append `fragment` as the last child of the root `<svg>`.
pub fn append_to_root(svg: &str, fragment: &str) -> GlintResult<String> {
    let doc = parse(svg)?;
    let root = svg_root(&doc).ok_or_else(|| GlintError::layout("document root is not <svg>"))?;
    let mut splice = Splice::new(svg);
    splice.append_child(root, fragment);
    Ok(splice.finish())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/markup.rs"]
mod tests;
