//! Minimal selector engine
//!
//! Supports comma-separated selector lists made of compound selectors
//! (`tag`, `#id`, `.class`, `[attr]`, `[attr=value]`, `[attr="value"]`)
//! joined by the descendant combinator (whitespace). That covers the
//! lookups hosts use to find controls to enhance, e.g.
//! `select[data-dropdown]` or `form .country select`.

use crate::error::{DomError, Result};
use crate::tree::{Document, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrCondition {
    Present(String),
    Equals(String, String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

/// A parsed selector list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    /// Alternatives; each is a descendant chain, outermost first
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parse selector text
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| DomError::InvalidSelector {
            selector: text.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for alternative in text.split(',') {
            let mut chain = Vec::new();
            for part in alternative.split_whitespace() {
                chain.push(parse_compound(part).map_err(|reason| invalid(&reason))?);
            }
            if chain.is_empty() {
                return Err(invalid("empty selector"));
            }
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }

    /// Whether the node matches any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|chain| matches_chain(doc, node, chain))
    }
}

fn parse_compound(part: &str) -> std::result::Result<Compound, String> {
    let mut compound = Compound::default();
    let chars: Vec<char> = part.chars().collect();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '-' || chars[*i] == '_')
        {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else if i < chars.len() && chars[i].is_alphabetic() {
        compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err("expected id after `#`".into());
                }
                compound.id = Some(ident);
            }
            '.' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err("expected class after `.`".into());
                }
                compound.classes.push(ident);
            }
            '[' => {
                i += 1;
                let name = read_ident(&mut i);
                if name.is_empty() {
                    return Err("expected attribute name".into());
                }
                match chars.get(i) {
                    Some(']') => {
                        i += 1;
                        compound.attrs.push(AttrCondition::Present(name));
                    }
                    Some('=') => {
                        i += 1;
                        let quote = chars.get(i).copied().filter(|c| *c == '"' || *c == '\'');
                        let value = if let Some(q) = quote {
                            i += 1;
                            let start = i;
                            while i < chars.len() && chars[i] != q {
                                i += 1;
                            }
                            if i >= chars.len() {
                                return Err("unterminated attribute value".into());
                            }
                            let value: String = chars[start..i].iter().collect();
                            i += 1;
                            value
                        } else {
                            read_ident(&mut i)
                        };
                        if chars.get(i) != Some(&']') {
                            return Err("expected `]`".into());
                        }
                        i += 1;
                        compound.attrs.push(AttrCondition::Equals(name, value));
                    }
                    _ => return Err("expected `]` or `=`".into()),
                }
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(compound)
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if !element.is(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.id() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| element.has_class(c)) {
        return false;
    }
    compound.attrs.iter().all(|condition| match condition {
        AttrCondition::Present(name) => element.attrs.contains_key(name),
        AttrCondition::Equals(name, value) => element.attrs.get(name) == Some(value),
    })
}

fn matches_chain(doc: &Document, node: NodeId, chain: &[Compound]) -> bool {
    let Some((last, outer)) = chain.split_last() else {
        return false;
    };
    if !matches_compound(doc, node, last) {
        return false;
    }
    // Greedy right-to-left walk; each outer compound must match some ancestor
    let mut ancestors = doc.ancestors(node).into_iter();
    for compound in outer.iter().rev() {
        if !ancestors.any(|a| matches_compound(doc, a, compound)) {
            return false;
        }
    }
    true
}

impl Document {
    /// All connected elements matching the selector, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.query_selector_all_from(self.root(), selector)
    }

    /// Descendants of `root` matching the selector, in document order
    pub fn query_selector_all_from(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect())
    }

    /// First descendant of the document matching the selector
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{div, option, select};

    fn page() -> Document {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append_tree(
            body,
            div()
                .class("form")
                .child(select().id("a").data("dropdown", "").child(option("1", "One")))
                .child(select().id("b").child(option("2", "Two"))),
        )
        .unwrap();
        doc.append_tree(body, select().id("c").data("dropdown", "true"))
            .unwrap();
        doc
    }

    #[test]
    fn test_attribute_presence() {
        let doc = page();
        let found = doc.query_selector_all("select[data-dropdown]").unwrap();
        let ids: Vec<_> = found
            .iter()
            .filter_map(|n| doc.element(*n).and_then(|e| e.id()))
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_attribute_value_and_descendant() {
        let doc = page();
        assert_eq!(
            doc.query_selector_all("[data-dropdown=\"true\"]").unwrap().len(),
            1
        );
        assert_eq!(doc.query_selector_all(".form select").unwrap().len(), 2);
        assert_eq!(doc.query_selector_all("#b, #c").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_selector() {
        let doc = page();
        assert!(matches!(
            doc.query_selector_all("select[data-"),
            Err(DomError::InvalidSelector { .. })
        ));
        assert!(doc.query_selector_all("a,,b").is_err());
    }
}
