//! Fluent markup builders
//!
//! Host pages are described with builders instead of parsed HTML:
//!
//! ```rust
//! use dropkit_dom::prelude::*;
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let fruit = doc
//!     .append_tree(
//!         body,
//!         select()
//!             .id("fruit")
//!             .attr("name", "fruit")
//!             .child(option("", "Choose").data("placeholder", ""))
//!             .child(option("apple", "Apple"))
//!             .child(option("pear", "Pear").selected(true)),
//!     )
//!     .unwrap();
//!
//! assert_eq!(doc.value(fruit), "pear");
//! ```

use crate::error::Result;
use crate::tree::{Document, NodeId};

/// Declarative element description, materialised by [`Document::append_tree`]
#[derive(Clone, Debug, Default)]
pub struct ElementBuilder {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    text: Option<String>,
    children: Vec<ElementBuilder>,
    selected: bool,
}

impl ElementBuilder {
    /// Start an element with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set the `id` attribute
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
        self
    }

    /// Set a `data-{key}` attribute
    pub fn data(self, key: &str, value: impl Into<String>) -> Self {
        self.attr(format!("data-{key}"), value)
    }

    /// Add a class
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Leading text content
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child element
    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements
    pub fn children(mut self, children: impl IntoIterator<Item = ElementBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    /// Mark an `<option>` as selected (the `selected` attribute)
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        if selected {
            self.attr("selected", "")
        } else {
            self.attrs.retain(|(n, _)| n != "selected");
            self
        }
    }

    /// Toggle the `disabled` attribute
    pub fn disabled(mut self, disabled: bool) -> Self {
        if disabled {
            self.attr("disabled", "")
        } else {
            self.attrs.retain(|(n, _)| n != "disabled");
            self
        }
    }
}

/// Start an arbitrary element
pub fn element(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder::new(tag)
}

/// Start a `<div>`
pub fn div() -> ElementBuilder {
    ElementBuilder::new("div")
}

/// Start a `<span>`
pub fn span() -> ElementBuilder {
    ElementBuilder::new("span")
}

/// Start a `<select>`
pub fn select() -> ElementBuilder {
    ElementBuilder::new("select")
}

/// Start an `<option>` with value and label
pub fn option(value: impl Into<String>, label: impl Into<String>) -> ElementBuilder {
    ElementBuilder::new("option").attr("value", value).text(label)
}

/// Start an `<optgroup>` with a label
pub fn optgroup(label: impl Into<String>) -> ElementBuilder {
    ElementBuilder::new("optgroup").attr("label", label)
}

/// Start an `<input>` of the given type
pub fn input(kind: impl Into<String>) -> ElementBuilder {
    ElementBuilder::new("input").attr("type", kind)
}

impl Document {
    /// Build a detached subtree and return its root
    pub fn build(&mut self, tree: ElementBuilder) -> Result<NodeId> {
        let node = self.create_element(&tree.tag);
        for (name, value) in &tree.attrs {
            self.set_attr(node, name, value.clone())?;
        }
        for class in &tree.classes {
            self.add_class(node, class)?;
        }
        if let Some(element) = self.element_mut(node) {
            element.selected = tree.selected;
            if element.is("input") {
                if let Some(value) = element.attrs.get("value") {
                    element.value = value.clone();
                }
            }
        }
        if let Some(text) = tree.text.as_deref().filter(|t| !t.is_empty()) {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        let is_select = tree.tag.eq_ignore_ascii_case("select");
        for child in tree.children {
            let child_node = self.build(child)?;
            self.append_child(node, child_node)?;
        }
        if is_select {
            self.reset_selectedness(node)?;
        }
        Ok(node)
    }

    /// Build a subtree and append it under `parent`
    pub fn append_tree(&mut self, parent: NodeId, tree: ElementBuilder) -> Result<NodeId> {
        let node = self.build(tree)?;
        self.append_child(parent, node)?;
        Ok(node)
    }
}
