//! Host detection and native option extraction

use dropkit_dom::{Document, NodeId};

use crate::config::HostDefaults;
use crate::data::{OptionData, OptionGroup, OptionItem};

/// What the widget attaches to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HostKind {
    /// A `<select>`; hidden and kept as the submitted form field
    NativeSelect,
    /// Any other element; the widget renders inside it
    Container,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Host {
    pub node: NodeId,
    pub kind: HostKind,
}

impl Host {
    pub fn detect(doc: &Document, node: NodeId) -> Self {
        let kind = if doc.is_tag(node, "select") {
            HostKind::NativeSelect
        } else {
            HostKind::Container
        };
        Self { node, kind }
    }

    pub fn is_native(&self) -> bool {
        self.kind == HostKind::NativeSelect
    }

    pub fn defaults(&self, doc: &Document) -> HostDefaults {
        if !self.is_native() {
            return HostDefaults::default();
        }
        HostDefaults {
            placeholder: select_placeholder(doc, self.node),
            name: doc.attr(self.node, "name").map(str::to_string),
        }
    }
}

/// Entries with neither value nor label never become options
fn is_placeholder_option(doc: &Document, option: NodeId) -> bool {
    doc.option_value(option).is_empty() && doc.option_label(option).is_empty()
}

fn extract_option(doc: &Document, option: NodeId) -> Option<OptionItem> {
    if is_placeholder_option(doc, option) {
        return None;
    }
    Some(OptionItem {
        value: doc.option_value(option),
        text: doc.option_label(option),
        selected: doc.is_selected(option),
        disabled: doc.is_disabled(option),
        group: None,
    })
}

/// Read the option set out of a native control's markup
///
/// With any `<optgroup>` present the result is grouped; options sitting
/// outside a group become unlabeled groups at their position.
pub(crate) fn extract_from_select(doc: &Document, select: NodeId) -> OptionData {
    let has_groups = doc
        .children(select)
        .iter()
        .any(|child| doc.is_tag(*child, "optgroup"));

    if !has_groups {
        let options = doc
            .select_options(select)
            .into_iter()
            .filter_map(|option| extract_option(doc, option))
            .collect();
        return OptionData::Flat(options).normalized();
    }

    let mut groups: Vec<OptionGroup> = Vec::new();
    let mut loose: Vec<OptionItem> = Vec::new();
    for child in doc.children(select) {
        if doc.is_tag(*child, "optgroup") {
            if !loose.is_empty() {
                groups.push(OptionGroup::new("", std::mem::take(&mut loose)));
            }
            let options: Vec<_> = doc
                .select_options(*child)
                .into_iter()
                .filter_map(|option| extract_option(doc, option))
                .collect();
            if !options.is_empty() {
                let label = doc.attr(*child, "label").unwrap_or_default();
                groups.push(OptionGroup::new(label, options));
            }
        } else if doc.is_tag(*child, "option") {
            loose.extend(extract_option(doc, *child));
        }
    }
    if !loose.is_empty() {
        groups.push(OptionGroup::new("", loose));
    }
    OptionData::Grouped(groups).normalized()
}

/// First option when it is an explicit placeholder, else the control's
/// `data-placeholder` attribute
pub(crate) fn select_placeholder(doc: &Document, select: NodeId) -> Option<String> {
    if let Some(first) = doc.select_options(select).first().copied() {
        if doc.option_value(first).is_empty() || doc.has_attr(first, "data-placeholder") {
            let label = doc.option_label(first);
            if !label.is_empty() {
                return Some(label);
            }
        }
    }
    doc.data(select, "placeholder")
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// The control's current selection, ignoring empty-valued placeholders
pub(crate) fn native_preselection(doc: &Document, select: NodeId) -> Option<(String, String)> {
    let index = doc.selected_index(select)?;
    let option = doc.select_options(select).get(index).copied()?;
    let value = doc.option_value(option);
    if value.is_empty() {
        return None;
    }
    Some((value, doc.option_label(option)))
}
