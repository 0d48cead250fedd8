use std::borrow::Cow;
use std::collections::BTreeMap;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::error::{Error, Result};

/// One element of a markup tree.
///
/// Text storage is a single slot: when an element holds several text nodes
/// (mixed with child elements) only the last one survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The element's own text, or the first descendant text in document order.
    pub fn text(&self) -> &str {
        if let Some(text) = &self.text {
            return text;
        }
        self.children
            .iter()
            .map(Element::text)
            .find(|t| !t.is_empty())
            .unwrap_or("")
    }
}

/// Parse a markup document into a single-rooted element tree.
///
/// Lenient by construction:
/// - a closing tag pops the open element whatever its name; a closing tag
///   with nothing open is ignored
/// - elements still open at the end of input are closed in stack order
/// - a top-level element opened after the root was closed becomes a child of
///   the root
/// - a syntax error once a root exists ends parsing with the tree built so far
pub fn parse(markup: &str) -> Result<Element> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => builder.open(element_from(&e)),
            Ok(Event::Empty(e)) => {
                builder.open(element_from(&e));
                builder.close();
            }
            Ok(Event::End(_)) => builder.close(),
            Ok(Event::Text(e)) => builder.text(&decode_text(&e)),
            Ok(Event::CData(e)) => builder.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            // comments, doctype, processing instructions
            Ok(_) => {}
            Err(e) if builder.has_root() => {
                warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "markup error, keeping partial tree"
                );
                break;
            }
            Err(e) => {
                return Err(Error::Parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    builder
        .finish()
        .ok_or_else(|| Error::Parse("no root element".into()))
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    // Children are attached when they close; siblings close in the order they
    // opened, so child order is document order.
    fn close(&mut self) {
        let Some(element) = self.stack.pop() else {
            return;
        };
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(element);
        } else if let Some(root) = self.root.as_mut() {
            root.children.push(element);
        } else {
            self.root = Some(element);
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Some(current) = self.stack.last_mut() {
            current.text = Some(text.to_string());
        }
    }

    fn has_root(&self) -> bool {
        self.root.is_some() || !self.stack.is_empty()
    }

    fn finish(mut self) -> Option<Element> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.root
    }
}

fn element_from(start: &BytesStart) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut element = Element::new(name);

    let mut attributes = start.html_attributes();
    attributes.with_checks(false);
    for attr in attributes.flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr
            .unescape_value_with(resolve_html5_entity)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned().into());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        element
            .attributes
            .entry(key)
            .or_insert_with(|| value.into_owned());
    }
    element
}

fn decode_text<'a>(text: &'a BytesText) -> Cow<'a, str> {
    text.unescape_with(resolve_html5_entity)
        .unwrap_or_else(|_| String::from_utf8_lossy(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn count(element: &Element) -> usize {
        1 + element.children.iter().map(count).sum::<usize>()
    }

    fn render(element: &Element, out: &mut String) {
        out.push('<');
        out.push_str(&element.name);
        for (key, value) in &element.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, value));
        }
        out.push('>');
        if let Some(text) = &element.text {
            out.push_str(text);
        }
        for child in &element.children {
            render(child, out);
        }
        out.push_str(&format!("</{}>", element.name));
    }

    fn element_strategy() -> impl Strategy<Value = Element> {
        let leaf = (
            "[a-z]{1,6}",
            prop::collection::btree_map("[a-z]{1,5}", "[a-z0-9]{1,5}", 0..3),
            prop::option::of("[a-z]{1,8}"),
        )
            .prop_map(|(name, attributes, text)| Element {
                name,
                attributes,
                text,
                children: Vec::new(),
            });
        leaf.prop_recursive(3, 24, 4, |inner| {
            (
                "[a-z]{1,6}",
                prop::collection::btree_map("[a-z]{1,5}", "[a-z0-9]{1,5}", 0..3),
                prop::option::of("[a-z]{1,8}"),
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(name, attributes, text, children)| Element {
                    name,
                    attributes,
                    text,
                    children,
                })
        })
    }

    proptest! {
        #[test]
        fn well_nested_markup_round_trips(tree in element_strategy()) {
            let mut markup = String::new();
            render(&tree, &mut markup);
            let parsed = parse(&markup).unwrap();
            prop_assert_eq!(count(&parsed), count(&tree));
            prop_assert_eq!(parsed, tree);
        }
    }

    #[test]
    fn builds_nested_tree() {
        let root = parse(r#"<html><body><p class="a">one</p><p>two</p></body></html>"#).unwrap();
        assert_eq!(root.name, "html");
        let body = &root.children[0];
        assert_eq!(body.children.len(), 2);
        assert_eq!(body.children[0].attr("class"), Some("a"));
        assert_eq!(body.children[0].text.as_deref(), Some("one"));
        assert_eq!(body.children[1].text.as_deref(), Some("two"));
    }

    #[test]
    fn mismatched_close_pops_unconditionally() {
        let root = parse("<a><b></c><d></d></a></x></y>").unwrap();
        assert_eq!(root.name, "a");
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "d"]);
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn unclosed_elements_are_closed_at_eof() {
        let root = parse("<form><input name=\"a\"><input name=\"b\">").unwrap();
        assert_eq!(root.name, "form");
        assert_eq!(count(&root), 3);
    }

    #[test]
    fn self_closing_tag_has_no_children() {
        let root = parse(r#"<form><input name="a"/><input name="b"/></form>"#).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].attr("name"), Some("b"));
    }

    #[test]
    fn last_text_wins() {
        let root = parse("<p>first<b>bold</b>second</p>").unwrap();
        assert_eq!(root.text.as_deref(), Some("second"));
        assert_eq!(root.children[0].text.as_deref(), Some("bold"));
    }

    #[test]
    fn text_is_trimmed() {
        let root = parse("<td>\n   12,50 &euro;\n </td>").unwrap();
        assert_eq!(root.text.as_deref(), Some("12,50 €"));
    }

    #[test]
    fn empty_and_duplicate_attributes_dropped() {
        let root = parse(r#"<input name="a" value="" name="b" checked>"#).unwrap();
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.attr("name"), Some("a"));
        assert_eq!(root.attr("value"), None);
        assert_eq!(root.attr("checked"), None);
    }

    #[test]
    fn names_are_lowercased() {
        let root = parse(r#"<TABLE><TR CLASS="x"></TR></TABLE>"#).unwrap();
        assert_eq!(root.name, "table");
        assert_eq!(root.children[0].attr("class"), Some("x"));
    }

    #[test]
    fn later_top_level_elements_join_the_root() {
        let root = parse("<!DOCTYPE html><head></head><body></body>").unwrap();
        assert_eq!(root.name, "head");
        assert_eq!(root.children[0].name, "body");
    }

    #[test]
    fn syntax_error_after_root_keeps_partial_tree() {
        let root = parse("<html><body><p>x</p><!-- unterminated").unwrap();
        assert_eq!(root.name, "html");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children[0].text.as_deref(), Some("x"));
    }

    #[test]
    fn syntax_error_before_root_is_an_error() {
        assert!(matches!(parse("<!-- unterminated <html>"), Err(Error::Parse(_))));
    }

    #[test]
    fn cdata_is_text() {
        let root = parse("<p><![CDATA[a<b]]></p>").unwrap();
        assert_eq!(root.text.as_deref(), Some("a<b"));
    }

    #[test]
    fn comments_are_ignored() {
        let root = parse("<p><!-- note --><b>x</b><!-- <i>not a tag</i> --></p>").unwrap();
        assert_eq!(root.text, None);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "b");
    }

    #[test]
    fn no_root_is_an_error() {
        assert!(matches!(parse(""), Err(Error::Parse(_))));
        assert!(matches!(parse("just some text"), Err(Error::Parse(_))));
    }

    #[test]
    fn text_falls_back_to_descendants() {
        let root = parse("<td><span><b>4111</b></span></td>").unwrap();
        assert_eq!(root.text, None);
        assert_eq!(root.text(), "4111");
        assert_eq!(Element::new("empty").text(), "");
    }
}
