use super::*;

fn reparses(svg: &str) {
    usvg::Tree::from_str(svg, &usvg::Options::default())
        .unwrap_or_else(|e| panic!("output no longer parses ({e}): {svg}"));
}

#[test]
fn escapes_markup_characters() {
    assert_eq!(
        escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
    );
}

#[test]
fn root_size_ignores_commented_out_markup() {
    let svg = r#"<!-- legacy <svg width="1" height="1"> --><svg xmlns="http://www.w3.org/2000/svg" width="600" height="300"></svg>"#;
    assert_eq!(root_size(svg), Some((600.0, 300.0)));
}

#[test]
fn root_size_reads_px_lengths() {
    assert_eq!(
        root_size(r#"<svg width="800px" height="400"></svg>"#),
        Some((800.0, 400.0))
    );
    assert_eq!(root_size(r#"<svg width="100%" height="400"></svg>"#), None);
    assert_eq!(root_size(r#"<g width="8" height="4"/>"#), None);
    assert_eq!(root_size("<svg"), None);
}

#[test]
fn resize_root_synthesizes_view_box() {
    let out = resize_root(r#"<svg width="10" height="20"><g/></svg>"#, 30, 60, (36.0, 36.0)).unwrap();
    assert_eq!(
        out,
        r#"<svg width="30" height="60" viewBox="0 0 10 20"><g/></svg>"#
    );

    let out = resize_root(r#"<svg><g/></svg>"#, 8, 8, (36.0, 36.0)).unwrap();
    assert_eq!(
        out,
        r#"<svg width="8" height="8" viewBox="0 0 36 36"><g/></svg>"#
    );
}

#[test]
fn resize_root_edits_the_real_root_only() {
    let svg = r#"<!-- <svg width="1"> --><svg xmlns="http://www.w3.org/2000/svg" width="600" height="300"><svg width="5" height="5"/></svg>"#;
    let out = resize_root(svg, 60, 30, (1.0, 1.0)).unwrap();
    assert_eq!(
        out,
        r#"<!-- <svg width="1"> --><svg xmlns="http://www.w3.org/2000/svg" width="60" height="30" viewBox="0 0 600 300"><svg width="5" height="5"/></svg>"#
    );
    reparses(&out);
}

#[test]
fn resize_root_keeps_quotes_and_entities_intact() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" aria-label='say "hi"' data-x="a &amp; b" width='4' height="4"><rect width="4" height="4"/></svg>"#;
    reparses(svg);
    let out = resize_root(svg, 16, 16, (1.0, 1.0)).unwrap();
    assert!(out.contains(r#"aria-label='say "hi"'"#), "{out}");
    assert!(out.contains(r#"data-x="a &amp; b""#), "{out}");
    assert!(out.contains("width='16'"), "{out}");
    reparses(&out);
}

#[test]
fn values_with_both_quote_kinds_are_escaped() {
    let svg = r#"<svg width="1" height="1"/>"#;
    let doc = parse(svg).unwrap();
    let root = svg_root(&doc).unwrap();
    let mut splice = Splice::new(svg);
    splice.set_attr(root, "title", r#"it's "quoted" & <raw>"#);
    let out = splice.finish();
    assert_eq!(
        out,
        r#"<svg width="1" height="1" title="it&apos;s &quot;quoted&quot; &amp; &lt;raw&gt;"/>"#
    );
    let doc = parse(&out).unwrap();
    assert_eq!(
        doc.root_element().attribute("title"),
        Some(r#"it's "quoted" & <raw>"#)
    );
}

#[test]
fn malformed_markup_is_rejected_instead_of_truncated() {
    // Valueless attributes are not XML; nothing after them may be silently dropped.
    let err = resize_root(r#"<svg hidden width="4" height="4"></svg>"#, 8, 8, (1.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, GlintError::Layout(_)), "{err}");
    assert!(resize_root("<div/>", 8, 8, (1.0, 1.0)).is_err());
}

#[test]
fn doctype_is_accepted() {
    let svg = r#"<?xml version="1.0"?><!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd"><svg width="2" height="3"/>"#;
    assert_eq!(root_size(svg), Some((2.0, 3.0)));
}

#[test]
fn append_to_root_handles_self_closing_and_nested_roots() {
    assert_eq!(
        append_to_root(r#"<svg width="1" height="1"/>"#, "<g/>").unwrap(),
        r#"<svg width="1" height="1"><g/></svg>"#
    );
    assert_eq!(
        append_to_root(r#"<svg><svg></svg></svg><!-- </svg> -->"#, "<g/>").unwrap(),
        r#"<svg><svg></svg><g/></svg><!-- </svg> -->"#
    );
}

#[test]
fn overlapping_edits_keep_the_first() {
    let svg = r#"<svg width="1" height="1"/>"#;
    let doc = parse(svg).unwrap();
    let root = svg_root(&doc).unwrap();
    let mut splice = Splice::new(svg);
    assert!(splice.is_empty());
    splice.set_attr(root, "width", "2");
    splice.set_attr(root, "width", "3");
    assert_eq!(splice.finish(), r#"<svg width="2" height="1"/>"#);
}
