//! Retained element tree
//!
//! [`Document`] owns every node in a slot map keyed by [`NodeId`]. Nodes are
//! either the single document root, elements, or text. Ids of removed nodes
//! go stale and every accessor treats them as absent instead of panicking.
//!
//! Form controls carry live state next to their attributes: `value` for
//! inputs and `selected` for `<option>` elements, mirroring how a browser
//! separates the `value`/`selected` attributes from the current state.

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::error::{DomError, Result};
use crate::events::ListenerTable;

new_key_type! {
    /// Handle to a node owned by a [`Document`]
    pub struct NodeId;
}

/// What a node is
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// The document root
    Document,
    /// An element with tag, attributes, classes and style
    Element(Element),
    /// A text run
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Element payload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: IndexMap<String, String>,
    /// Class list in insertion order, without duplicates
    pub classes: SmallVec<[String; 4]>,
    /// Inline style properties
    pub style: IndexMap<String, String>,
    /// Live form value for `<input>` elements
    pub value: String,
    /// Live selectedness for `<option>` elements
    pub selected: bool,
}

impl Element {
    /// Create an element with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Check the tag name (case-insensitive)
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// The `id` attribute, if set
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }

    /// Check class membership
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// The element tree plus focus, scroll and listener bookkeeping
#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    body: NodeId,
    active_element: Option<NodeId>,
    last_scrolled: Option<NodeId>,
    pub(crate) listeners: ListenerTable,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding an empty `<body>`
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        });
        let body = nodes.insert(Node {
            parent: Some(root),
            children: Vec::new(),
            kind: NodeKind::Element(Element::new("body")),
        });
        nodes[root].children.push(body);

        Self {
            nodes,
            root,
            body,
            active_element: None,
            last_scrolled: None,
            listeners: ListenerTable::default(),
        }
    }

    /// The document root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Whether the id refers to a live node
    pub fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Number of live nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A document always holds at least its root and body
    pub fn is_empty(&self) -> bool {
        false
    }

    // =========================================================================
    // Node creation and access
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(Element::new(tag)),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Text(text.into()),
        })
    }

    /// Node kind, if the node is live
    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node).map(|n| &n.kind)
    }

    /// Element payload, if the node is a live element
    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable element payload, if the node is a live element
    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_or_err(&self, node: NodeId) -> Result<&Element> {
        match self.nodes.get(node).map(|n| &n.kind) {
            None => Err(DomError::StaleNode),
            Some(NodeKind::Element(element)) => Ok(element),
            Some(_) => Err(DomError::NotAnElement),
        }
    }

    fn element_mut_or_err(&mut self, node: NodeId) -> Result<&mut Element> {
        match self.nodes.get_mut(node).map(|n| &mut n.kind) {
            None => Err(DomError::StaleNode),
            Some(NodeKind::Element(element)) => Ok(element),
            Some(_) => Err(DomError::NotAnElement),
        }
    }

    /// Tag name of an element
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// Check an element's tag (case-insensitive)
    pub fn is_tag(&self, node: NodeId, tag: &str) -> bool {
        self.element(node).is_some_and(|e| e.is(tag))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Parent node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    /// Child nodes in order (empty for stale ids)
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors from the immediate parent up to the root
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent(current);
        }
        out
    }

    /// Inclusive containment: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.exists(ancestor) || !self.exists(node) {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Whether the node is attached under the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// The node followed by all its descendants, in document order
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.exists(node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// All descendants in document order, excluding the node itself
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = self.subtree(node);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|child| *child != node);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.exists(parent) || !self.exists(child) {
            return Err(DomError::StaleNode);
        }
        if child == self.root || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if matches!(self.nodes[parent].kind, NodeKind::Text(_)) {
            return Err(DomError::NotAnElement);
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Insert `child` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<()> {
        if !self.exists(reference) {
            return Err(DomError::StaleNode);
        }
        if child == reference {
            return Ok(());
        }
        let parent = self.parent(reference).ok_or(DomError::HierarchyRequest)?;
        self.check_insertion(parent, child)?;
        self.detach(child);

        let siblings = &mut self.nodes[parent].children;
        let index = siblings
            .iter()
            .position(|c| *c == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Remove a node and its whole subtree, dropping listeners bound to it
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        if !self.exists(node) {
            return Err(DomError::StaleNode);
        }
        if node == self.root {
            return Err(DomError::HierarchyRequest);
        }
        self.detach(node);

        for id in self.subtree(node) {
            self.nodes.remove(id);
            if self.active_element == Some(id) {
                self.active_element = None;
            }
            if self.last_scrolled == Some(id) {
                self.last_scrolled = None;
            }
        }

        let nodes = &self.nodes;
        self.listeners.retain(|entry| nodes.contains_key(entry.node));
        Ok(())
    }

    /// Remove every child of a node
    pub fn clear_children(&mut self, node: NodeId) -> Result<()> {
        if !self.exists(node) {
            return Err(DomError::StaleNode);
        }
        for child in self.children(node).to_vec() {
            self.remove(child)?;
        }
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First connected element with the given `id`, in document order
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.element(*node).and_then(Element::id) == Some(id))
    }

    /// All descendants of `root` carrying `class`
    pub fn all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.has_class(*node, class))
            .collect()
    }

    /// First descendant of `root` carrying `class`
    pub fn first_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|node| self.has_class(*node, class))
    }

    /// Nearest inclusive ancestor carrying `class`
    pub fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.has_class(current, class) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    // =========================================================================
    // Attributes, classes, style
    // =========================================================================

    /// Attribute value
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attrs.get(name).map(String::as_str)
    }

    /// Whether the attribute is present
    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.element(node)
            .is_some_and(|e| e.attrs.contains_key(name))
    }

    /// Set an attribute
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let element = self.element_mut_or_err(node)?;
        element.attrs.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Remove an attribute
    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node)?;
        element.attrs.shift_remove(name);
        Ok(())
    }

    /// `data-{key}` attribute value
    pub fn data(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attr(node, &format!("data-{key}"))
    }

    /// Set a `data-{key}` attribute
    pub fn set_data(&mut self, node: NodeId, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_attr(node, &format!("data-{key}"), value)
    }

    /// Check class membership
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class))
    }

    /// Add a class (no-op when already present)
    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        let element = self.element_mut_or_err(node)?;
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Remove a class (no-op when absent)
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        let element = self.element_mut_or_err(node)?;
        element.classes.retain(|c| c != class);
        Ok(())
    }

    /// Inline style property
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)?.style.get(property).map(String::as_str)
    }

    /// Set an inline style property; an empty value removes it
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node)?;
        if value.is_empty() {
            element.style.shift_remove(property);
        } else {
            element
                .style
                .insert(property.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Whether the element is hidden through `display: none`
    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.style(node, "display") == Some("none")
    }

    /// Whether the element, or an enclosing `<optgroup>`, is disabled
    pub fn is_disabled(&self, node: NodeId) -> bool {
        if self.has_attr(node, "disabled") {
            return true;
        }
        self.is_tag(node, "option")
            && self
                .parent(node)
                .is_some_and(|p| self.is_tag(p, "optgroup") && self.has_attr(p, "disabled"))
    }

    // =========================================================================
    // Text and values
    // =========================================================================

    /// Concatenated text of the subtree
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.subtree(node) {
            if let Some(NodeKind::Text(text)) = self.kind(id) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the element's children with a single text node
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.element_or_err(node)?;
        self.clear_children(node)?;
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }

    /// Current form value; a `<select>` reports its selected option's value
    pub fn value(&self, node: NodeId) -> String {
        if self.is_tag(node, "select") {
            return self.select_value(node);
        }
        self.element(node)
            .map(|e| e.value.clone())
            .unwrap_or_default()
    }

    /// Set the form value; on a `<select>` this selects the matching option
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        if self.is_tag(node, "select") {
            self.set_select_value(node, value)?;
            return Ok(());
        }
        self.element_mut_or_err(node)?.value = value.to_string();
        Ok(())
    }

    // =========================================================================
    // Native selection controls
    // =========================================================================

    /// Every `<option>` under the control, in document order
    pub fn select_options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|node| self.is_tag(*node, "option"))
            .collect()
    }

    /// Trimmed option label
    pub fn option_label(&self, option: NodeId) -> String {
        self.text_content(option).trim().to_string()
    }

    /// The option's `value` attribute, falling back to its label
    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(value) => value.to_string(),
            None => self.option_label(option),
        }
    }

    /// Live selectedness of an option
    pub fn is_selected(&self, option: NodeId) -> bool {
        self.element(option).is_some_and(|e| e.selected)
    }

    /// Set an option's selectedness; selecting one in a single-select
    /// control deselects its siblings
    pub fn set_selected(&mut self, option: NodeId, selected: bool) -> Result<()> {
        self.element_mut_or_err(option)?.selected = selected;
        if !selected {
            return Ok(());
        }
        let select = self
            .ancestors(option)
            .into_iter()
            .find(|node| self.is_tag(*node, "select"));
        if let Some(select) = select {
            if !self.has_attr(select, "multiple") {
                for other in self.select_options(select) {
                    if other != option {
                        self.element_mut_or_err(other)?.selected = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Index of the first selected option
    pub fn selected_index(&self, select: NodeId) -> Option<usize> {
        self.select_options(select)
            .iter()
            .position(|option| self.is_selected(*option))
    }

    /// Select the option at `index`; `None` deselects every option
    pub fn set_selected_index(&mut self, select: NodeId, index: Option<usize>) -> Result<()> {
        self.element_or_err(select)?;
        for (i, option) in self.select_options(select).into_iter().enumerate() {
            self.element_mut_or_err(option)?.selected = Some(i) == index;
        }
        Ok(())
    }

    /// Value of the selected option, or empty when nothing is selected
    pub fn select_value(&self, select: NodeId) -> String {
        self.select_options(select)
            .into_iter()
            .find(|option| self.is_selected(*option))
            .map(|option| self.option_value(option))
            .unwrap_or_default()
    }

    /// Select the first option whose value matches; returns whether one did
    pub fn set_select_value(&mut self, select: NodeId, value: &str) -> Result<bool> {
        self.element_or_err(select)?;
        let options = self.select_options(select);
        let matched = options
            .iter()
            .copied()
            .find(|option| self.option_value(*option) == value);
        for option in options {
            self.element_mut_or_err(option)?.selected = Some(option) == matched;
        }
        Ok(matched.is_some())
    }

    /// Apply single-select parsing rules: the last option marked selected
    /// wins, and with none marked the first enabled option is selected
    pub fn reset_selectedness(&mut self, select: NodeId) -> Result<()> {
        self.element_or_err(select)?;
        if self.has_attr(select, "multiple") {
            return Ok(());
        }
        let options = self.select_options(select);
        let chosen = options
            .iter()
            .rev()
            .copied()
            .find(|option| self.is_selected(*option))
            .or_else(|| {
                options
                    .iter()
                    .copied()
                    .find(|option| !self.is_disabled(*option))
            });
        for option in options {
            self.element_mut_or_err(option)?.selected = Some(option) == chosen;
        }
        Ok(())
    }

    // =========================================================================
    // Focus and scrolling
    // =========================================================================

    /// Move focus to a node
    pub fn focus(&mut self, node: NodeId) {
        if self.exists(node) {
            self.active_element = Some(node);
        }
    }

    /// Currently focused node
    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Record that a node was scrolled into view (nearest block alignment)
    pub fn scroll_into_view(&mut self, node: NodeId) {
        if self.exists(node) {
            tracing::trace!(?node, "scroll into view");
            self.last_scrolled = Some(node);
        }
    }

    /// Most recent scroll-into-view target
    pub fn last_scrolled_into_view(&self) -> Option<NodeId> {
        self.last_scrolled
    }
}
