use std::fmt;
use std::str::FromStr;

use super::Element;
use crate::error::{Error, Result};

/// A compiled path expression.
///
/// `/` selects direct children, `//` any descendant. A path that starts with a
/// slash is anchored at a virtual document holding the queried element, so
/// `//form` also matches when the queried element is itself the form.
/// Relative paths (`td[2]`) start from the queried element's children.
///
/// Each step is a tag name or `*` plus predicates applied left to right:
/// `[@name]`, `[@name='value']` and `[n]` (1-based, counted per parent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    source: String,
    anchored: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Has(String),
    Equals(String, String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    name: Option<String>,
    predicates: Vec<Predicate>,
}

impl Path {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matching elements in document order, without duplicates.
    pub fn select<'a>(&self, context: &'a Element) -> Vec<&'a Element> {
        let start: &'a [Element] = if self.anchored {
            std::slice::from_ref(context)
        } else {
            &context.children
        };

        // Matches are child-index positions from `start`; sorting them
        // lexicographically gives document order.
        let mut positions: Vec<Vec<usize>> = vec![Vec::new()];
        for step in &self.steps {
            let mut next = Vec::new();
            for position in &positions {
                let siblings = children_at(start, position);
                match step.axis {
                    Axis::Child => next.extend(step.matching(siblings).into_iter().map(|i| {
                        let mut child = position.clone();
                        child.push(i);
                        child
                    })),
                    Axis::Descendant => {
                        step.collect_deep(siblings, &mut position.clone(), &mut next)
                    }
                }
            }
            // nested contexts can reach the same element twice
            next.sort();
            next.dedup();
            positions = next;
            if positions.is_empty() {
                break;
            }
        }
        positions
            .iter()
            .filter_map(|position| element_at(start, position))
            .collect()
    }
}

fn element_at<'a>(start: &'a [Element], position: &[usize]) -> Option<&'a Element> {
    let (first, rest) = position.split_first()?;
    let mut element = start.get(*first)?;
    for i in rest {
        element = element.children.get(*i)?;
    }
    Some(element)
}

fn children_at<'a>(start: &'a [Element], position: &[usize]) -> &'a [Element] {
    match element_at(start, position) {
        Some(element) => &element.children,
        None => start,
    }
}

impl Step {
    /// Indices of the siblings this step selects.
    fn matching(&self, siblings: &[Element]) -> Vec<usize> {
        let mut candidates: Vec<usize> = siblings
            .iter()
            .enumerate()
            .filter(|(_, e)| self.name.as_deref().map_or(true, |name| e.name == name))
            .map(|(i, _)| i)
            .collect();
        for predicate in &self.predicates {
            candidates = match predicate {
                Predicate::Has(attr) => candidates
                    .into_iter()
                    .filter(|&i| siblings[i].attributes.contains_key(attr))
                    .collect(),
                Predicate::Equals(attr, value) => candidates
                    .into_iter()
                    .filter(|&i| siblings[i].attr(attr) == Some(value.as_str()))
                    .collect(),
                Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
            };
        }
        candidates
    }

    fn collect_deep(&self, siblings: &[Element], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        let hits = self.matching(siblings);
        for (i, element) in siblings.iter().enumerate() {
            prefix.push(i);
            if hits.contains(&i) {
                out.push(prefix.clone());
            }
            self.collect_deep(&element.children, prefix, out);
            prefix.pop();
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: source.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = source.trim();
        if rest.is_empty() {
            return Err(invalid("empty path"));
        }
        let anchored = rest.starts_with('/');
        let mut steps = Vec::new();

        loop {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                Axis::Child
            } else if steps.is_empty() {
                Axis::Child
            } else {
                return Err(invalid("expected '/' between steps"));
            };

            let (step, r) = parse_step(rest, axis).map_err(invalid)?;
            steps.push(step);
            rest = r;
            if rest.is_empty() {
                break;
            }
        }

        Ok(Path {
            source: source.to_string(),
            anchored,
            steps,
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_step(input: &str, axis: Axis) -> std::result::Result<(Step, &str), &'static str> {
    let name_end = input.find(['[', '/']).unwrap_or(input.len());
    let name = input[..name_end].trim();
    let name = match name {
        "" => return Err("missing tag name"),
        "*" => None,
        n if n
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')) =>
        {
            Some(n.to_ascii_lowercase())
        }
        _ => return Err("invalid tag name"),
    };

    let mut rest = &input[name_end..];
    let mut predicates = Vec::new();
    while let Some(body) = rest.strip_prefix('[') {
        let close = closing_bracket(body).ok_or("unterminated predicate")?;
        predicates.push(parse_predicate(&body[..close])?);
        rest = &body[close + 1..];
    }

    Ok((
        Step {
            axis,
            name,
            predicates,
        },
        rest,
    ))
}

fn closing_bracket(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(body: &str) -> std::result::Result<Predicate, &'static str> {
    let body = body.trim();
    if let Some(attr) = body.strip_prefix('@') {
        return match attr.split_once('=') {
            None if attr.trim().is_empty() => Err("missing attribute name"),
            None => Ok(Predicate::Has(attr.trim().to_ascii_lowercase())),
            Some((name, value)) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err("missing attribute name");
                }
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('\'')
                    .and_then(|v| v.strip_suffix('\''))
                    .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                    .ok_or("attribute value must be quoted")?;
                Ok(Predicate::Equals(
                    name.to_ascii_lowercase(),
                    unquoted.to_string(),
                ))
            }
        };
    }
    body.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .map(Predicate::Position)
        .ok_or("expected @attribute or a position starting at 1")
}

impl Element {
    pub fn select(&self, path: &Path) -> Vec<&Element> {
        path.select(self)
    }

    pub fn first(&self, path: &Path) -> Option<&Element> {
        path.select(self).into_iter().next()
    }

    /// Text of the first match; `NotFound` when nothing matches.
    pub fn require_text(&self, path: &Path) -> Result<&str> {
        self.first(path)
            .map(Element::text)
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    const DOC: &str = r#"
        <html>
          <body>
            <form id="login">
              <input name="token" type="hidden" value="abc123"/>
              <div><input name="user" type="text"/></div>
            </form>
            <table>
              <tr class="tablerowalt1"><td>a1</td><td>a2</td></tr>
              <tr><td>skip</td></tr>
              <tr class="tablerowalt2"><td>b1</td><td>b2</td></tr>
            </table>
          </body>
        </html>"#;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn names<'a>(elements: &[&'a Element], attr: &str) -> Vec<&'a str> {
        elements.iter().filter_map(|e| e.attr(attr)).collect()
    }

    #[test]
    fn descendant_inputs_in_document_order() {
        let root = parse(DOC).unwrap();
        let inputs = root.select(&path("//form//input"));
        assert_eq!(names(&inputs, "name"), ["token", "user"]);
    }

    #[test]
    fn child_axis_skips_grandchildren() {
        let root = parse(DOC).unwrap();
        let inputs = root.select(&path("//form/input"));
        assert_eq!(names(&inputs, "name"), ["token"]);
    }

    #[test]
    fn anchored_path_includes_the_root() {
        let root = parse(DOC).unwrap();
        assert_eq!(root.select(&path("/html/body/table")).len(), 1);
        assert_eq!(root.select(&path("//html")).len(), 1);
        assert!(root.select(&path("/body")).is_empty());
    }

    #[test]
    fn attribute_predicates() {
        let root = parse(DOC).unwrap();
        let rows = root.select(&path("//tr[@class]"));
        assert_eq!(names(&rows, "class"), ["tablerowalt1", "tablerowalt2"]);

        let rows = root.select(&path("//tr[@class='tablerowalt2']"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].require_text(&path("td[1]")).unwrap(), "b1");
    }

    #[test]
    fn positions_count_per_parent() {
        let root = parse(DOC).unwrap();
        let cells: Vec<&str> = root
            .select(&path("//tr[@class]/td[2]"))
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(cells, ["a2", "b2"]);
        // position applies after the attribute filter
        let second = root.select(&path("//table/tr[@class][2]"));
        assert_eq!(names(&second, "class"), ["tablerowalt2"]);
    }

    #[test]
    fn relative_paths_start_at_children() {
        let root = parse(DOC).unwrap();
        let row = root.first(&path("//tr[@class]")).unwrap();
        assert_eq!(row.require_text(&path("td[2]")).unwrap(), "a2");
        assert_eq!(row.select(&path("*")).len(), 2);
    }

    #[test]
    fn nested_contexts_do_not_duplicate() {
        let root = parse("<div><div><p>x</p></div><p>y</p></div>").unwrap();
        let found: Vec<&str> = root
            .select(&path("//div//p"))
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(found, ["x", "y"]);
    }

    #[test]
    fn child_step_from_nested_contexts_keeps_document_order() {
        let root = parse("<div><div><p>a</p></div><p>b</p><div><p>c</p></div></div>").unwrap();
        let found: Vec<&str> = root
            .select(&path("//div/p"))
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(found, ["a", "b", "c"]);
    }

    #[test]
    fn missing_path_is_empty_not_an_error() {
        let root = parse(DOC).unwrap();
        assert!(root.select(&path("//select/option")).is_empty());
        assert!(root.first(&path("//tr[9]")).is_none());
        assert!(matches!(
            root.require_text(&path("//span")),
            Err(Error::NotFound { path }) if path == "//span"
        ));
    }

    #[test]
    fn quoted_values_may_contain_slashes_and_brackets() {
        let root = parse(r#"<form><input name="a/b[1]" value="v"/></form>"#).unwrap();
        let found = root.select(&path("//input[@name='a/b[1]']"));
        assert_eq!(names(&found, "value"), ["v"]);
    }

    #[test]
    fn invalid_paths_are_rejected() {
        for bad in ["", "//", "a[", "a[0]", "a[@]", "a[@x=y]", "a b", "a[x]"] {
            assert!(
                matches!(bad.parse::<Path>(), Err(Error::InvalidPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
