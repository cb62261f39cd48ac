//! Widget structure and option list rendering
//!
//! ```text
//! div.dropkit[data-name]
//! ├── input[type=hidden]#{name}Input
//! ├── div.dropkit-trigger[tabindex=0]
//! │   ├── span.dropkit-text.dropkit-placeholder
//! │   ├── span.dropkit-clear            (allowClear)
//! │   └── span.dropkit-arrow
//! └── div.dropkit-content
//!     ├── div.dropkit-search-container  (enableSearch)
//!     │   └── input.dropkit-search
//!     └── div.dropkit-options
//!         ├── div.dropkit-group-label
//!         ├── div.dropkit-option[data-value][data-text][data-group]
//!         └── div.dropkit-no-results
//! ```

use dropkit_dom::markup::{div, input, span};
use dropkit_dom::{Document, DomError, NodeId};

use crate::classes;
use crate::config::Settings;
use crate::data::{OptionData, OptionItem};
use crate::init::Host;
use crate::widget::Inner;

const ERROR_ICON: &str = "⚠";
const CLEAR_ICON: &str = "×";

/// Nodes of the rendered structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mount {
    pub root: NodeId,
    pub hidden_input: NodeId,
    pub trigger: NodeId,
    pub text: NodeId,
    pub clear: Option<NodeId>,
    pub arrow: NodeId,
    pub content: NodeId,
    pub search: Option<NodeId>,
    pub options: NodeId,
}

/// A rendered option row
#[derive(Clone, Debug)]
pub(crate) struct RenderedOption {
    pub node: NodeId,
    pub value: String,
    pub text: String,
    /// Lowercased `text`, matched against the search term
    pub needle: String,
    pub disabled: bool,
    /// Index into the data's groups
    pub group: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct GroupLabel {
    pub node: NodeId,
    pub group: usize,
}

#[derive(Default)]
pub(crate) struct RenderedList {
    pub options: Vec<RenderedOption>,
    pub group_labels: Vec<GroupLabel>,
    /// Last option marked selected in the data
    pub selected: Option<(String, String)>,
}

fn find_class(doc: &Document, root: NodeId, class: &str) -> dropkit_dom::Result<NodeId> {
    doc.first_by_class(root, class).ok_or(DomError::StaleNode)
}

/// Build the widget structure and attach it next to or inside the host
pub(crate) fn build_template(
    doc: &mut Document,
    host: &Host,
    settings: &Settings,
) -> dropkit_dom::Result<Mount> {
    let mut hidden = input("hidden")
        .id(format!("{}Input", settings.name))
        .attr("value", "");
    if !host.is_native() {
        hidden = hidden.attr("name", settings.name.as_str());
    }

    let mut trigger = div()
        .class(classes::TRIGGER)
        .attr("tabindex", "0")
        .child(
            span()
                .class(classes::TEXT)
                .class(classes::PLACEHOLDER)
                .text(settings.placeholder.as_str()),
        );
    if settings.allow_clear {
        trigger = trigger.child(span().class(classes::CLEAR).text(CLEAR_ICON));
    }
    trigger = trigger.child(span().class(classes::ARROW).text(settings.arrow_icon.as_str()));

    let mut content = div().class(classes::CONTENT);
    if settings.enable_search {
        content = content.child(
            div().class(classes::SEARCH_CONTAINER).child(
                input("text")
                    .class(classes::SEARCH)
                    .attr("placeholder", settings.search_placeholder.as_str()),
            ),
        );
    }
    content = content.child(div().class(classes::OPTIONS));

    let tree = div()
        .class(classes::ROOT)
        .data("name", settings.name.as_str())
        .child(hidden)
        .child(trigger)
        .child(content);

    let root = if host.is_native() {
        doc.set_style(host.node, "display", "none")?;
        let root = doc.build(tree)?;
        doc.insert_after(host.node, root)?;
        root
    } else {
        doc.clear_children(host.node)?;
        doc.append_tree(host.node, tree)?
    };

    let hidden_input = doc
        .children(root)
        .first()
        .copied()
        .ok_or(DomError::StaleNode)?;
    let clear = doc.first_by_class(root, classes::CLEAR);
    if let Some(clear) = clear {
        doc.set_style(clear, "display", "none")?;
    }

    Ok(Mount {
        root,
        hidden_input,
        trigger: find_class(doc, root, classes::TRIGGER)?,
        text: find_class(doc, root, classes::TEXT)?,
        clear,
        arrow: find_class(doc, root, classes::ARROW)?,
        content: find_class(doc, root, classes::CONTENT)?,
        search: doc.first_by_class(root, classes::SEARCH),
        options: find_class(doc, root, classes::OPTIONS)?,
    })
}

fn render_option(
    doc: &mut Document,
    container: NodeId,
    item: &OptionItem,
    group: Option<(usize, &str)>,
    disabled_suffix: &str,
) -> dropkit_dom::Result<RenderedOption> {
    let label = if item.disabled {
        format!("{} {}", item.text, disabled_suffix)
    } else {
        item.text.clone()
    };
    let mut row = div()
        .class(classes::OPTION)
        .data("value", item.value.as_str())
        .data("text", item.text.as_str())
        .data("group", group.map_or("", |(_, label)| label))
        .text(label);
    if item.disabled {
        row = row.class(classes::DISABLED);
    }
    let node = doc.append_tree(container, row)?;

    Ok(RenderedOption {
        node,
        value: item.value.clone(),
        text: item.text.clone(),
        needle: item.text.to_lowercase(),
        disabled: item.disabled,
        group: group.map(|(index, _)| index),
    })
}

fn push_option(
    doc: &mut Document,
    container: NodeId,
    list: &mut RenderedList,
    item: &OptionItem,
    group: Option<(usize, &str)>,
    disabled_suffix: &str,
) -> dropkit_dom::Result<()> {
    let rendered = render_option(doc, container, item, group, disabled_suffix)?;
    if item.selected {
        list.selected = Some((item.value.clone(), item.text.clone()));
    }
    list.options.push(rendered);
    Ok(())
}

/// Clear the option container and render `data` into it
pub(crate) fn render_options(
    doc: &mut Document,
    container: NodeId,
    data: &OptionData,
    disabled_suffix: &str,
) -> dropkit_dom::Result<RenderedList> {
    doc.clear_children(container)?;
    let mut list = RenderedList::default();

    match data {
        OptionData::Flat(options) => {
            for item in options {
                push_option(doc, container, &mut list, item, None, disabled_suffix)?;
            }
        }
        OptionData::Grouped(groups) => {
            for (index, group) in groups.iter().enumerate() {
                if !group.label.is_empty() {
                    let node = doc.append_tree(
                        container,
                        div().class(classes::GROUP_LABEL).text(group.label.as_str()),
                    )?;
                    list.group_labels.push(GroupLabel { node, group: index });
                }
                let owner = Some((index, group.label.as_str()));
                for item in &group.options {
                    push_option(doc, container, &mut list, item, owner, disabled_suffix)?;
                }
            }
        }
    }
    Ok(list)
}

impl Inner {
    /// Run a tree update, logging failures (e.g. the host was removed)
    pub(crate) fn mutate(&self, what: &str, f: impl FnOnce(&mut Document) -> dropkit_dom::Result<()>) {
        if let Err(err) = self.dom.write(f) {
            tracing::warn!(element_id = %self.element_id, %err, "dropdown {what} failed");
        }
    }

    /// Rebuild the option rows from the current data
    pub(crate) fn populate_options(&mut self) {
        let Some(mount) = self.mount else {
            return;
        };
        let empty = OptionData::default();
        let data = self.data.as_ref().unwrap_or(&empty);
        let suffix = self.settings.disabled_suffix.as_str();

        let rendered = self
            .dom
            .write(|doc| render_options(doc, mount.options, data, suffix));
        self.no_results = None;
        match rendered {
            Ok(list) => {
                tracing::debug!(
                    element_id = %self.element_id,
                    options = list.options.len(),
                    groups = list.group_labels.len(),
                    "options rendered"
                );
                self.options = list.options;
                self.group_labels = list.group_labels;
                if let Some((value, text)) = list.selected {
                    self.state.selected_value = Some(value);
                    self.state.selected_text = text;
                }
            }
            Err(err) => {
                tracing::warn!(element_id = %self.element_id, %err, "failed to render options");
                self.options.clear();
                self.group_labels.clear();
            }
        }
        self.sync_selected_class();
    }

    /// Remove every rendered row
    pub(crate) fn clear_options(&mut self) {
        let Some(mount) = self.mount else {
            return;
        };
        self.options.clear();
        self.group_labels.clear();
        self.no_results = None;
        self.mutate("option reset", |doc| doc.clear_children(mount.options));
    }

    /// Give the selected style to exactly the option matching the selection
    pub(crate) fn sync_selected_class(&self) {
        let selected = self.state.selected_value.as_deref();
        let mut marked = false;
        let rows: Vec<(NodeId, bool)> = self
            .options
            .iter()
            .map(|option| {
                let is_match = !marked && Some(option.value.as_str()) == selected;
                marked |= is_match;
                (option.node, is_match)
            })
            .collect();
        self.mutate("selection styling", |doc| {
            for (node, is_match) in rows {
                if is_match {
                    doc.add_class(node, classes::SELECTED)?;
                } else {
                    doc.remove_class(node, classes::SELECTED)?;
                }
            }
            Ok(())
        });
    }

    /// Show the selection, or the placeholder when nothing is selected
    pub(crate) fn render_display(&self) {
        let Some(mount) = self.mount else {
            return;
        };
        let (text, placeholder) = match &self.state.selected_value {
            Some(_) => (self.state.selected_text.as_str(), false),
            None => (self.settings.placeholder.as_str(), true),
        };
        self.mutate("trigger update", |doc| {
            doc.set_text(mount.text, text)?;
            if placeholder {
                doc.add_class(mount.text, classes::PLACEHOLDER)?;
            } else {
                doc.remove_class(mount.text, classes::PLACEHOLDER)?;
            }
            if let Some(clear) = mount.clear {
                doc.set_style(clear, "display", if placeholder { "none" } else { "" })?;
            }
            Ok(())
        });
    }

    /// Busy display while a load is outstanding
    pub(crate) fn render_loading(&self) {
        let Some(mount) = self.mount else {
            return;
        };
        let loading_text = self.settings.loading_text.as_str();
        self.mutate("loading display", |doc| {
            doc.set_text(mount.text, loading_text)?;
            for node in [mount.text, mount.trigger] {
                doc.remove_class(node, classes::ERROR)?;
                doc.add_class(node, classes::LOADING)?;
            }
            doc.set_style(mount.trigger, "pointer-events", "none")?;
            doc.clear_children(mount.arrow)?;
            doc.append_tree(mount.arrow, div().class(classes::SPINNER))?;
            Ok(())
        });
    }

    /// Failed-load display; stays until the next reload
    pub(crate) fn render_error(&self) {
        let Some(mount) = self.mount else {
            return;
        };
        let error_text = self.settings.error_text.as_str();
        self.mutate("error display", |doc| {
            doc.set_text(mount.text, error_text)?;
            for node in [mount.text, mount.trigger] {
                doc.remove_class(node, classes::LOADING)?;
                doc.add_class(node, classes::ERROR)?;
            }
            doc.set_style(mount.trigger, "pointer-events", "none")?;
            doc.set_text(mount.arrow, ERROR_ICON)
        });
    }

    /// Leave the loading/error display
    pub(crate) fn render_ready(&self) {
        let Some(mount) = self.mount else {
            return;
        };
        let arrow = self.settings.arrow_icon.as_str();
        let pointer_events = if self.state.user_disabled { "none" } else { "auto" };
        self.mutate("ready display", |doc| {
            for node in [mount.text, mount.trigger] {
                doc.remove_class(node, classes::LOADING)?;
                doc.remove_class(node, classes::ERROR)?;
            }
            doc.set_style(mount.trigger, "pointer-events", pointer_events)?;
            doc.set_text(mount.arrow, arrow)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DropdownOptions, HostDefaults};
    use crate::data::OptionGroup;
    use dropkit_dom::markup::{option, select};

    fn settings(options: DropdownOptions) -> Settings {
        Settings::resolve(options, "host", HostDefaults::default())
    }

    #[test]
    fn test_container_template() {
        let mut doc = Document::new();
        let body = doc.body();
        let host_node = doc.append_tree(body, div().id("host").text("old")).unwrap();
        let host = Host::detect(&doc, host_node);

        let mount = build_template(&mut doc, &host, &settings(DropdownOptions::new().allow_clear(true))).unwrap();
        assert_eq!(doc.children(host_node), &[mount.root]);
        assert_eq!(doc.attr(mount.hidden_input, "name"), Some("hostValue"));
        assert_eq!(doc.attr(mount.hidden_input, "id"), Some("hostValueInput"));
        assert_eq!(doc.text_content(mount.text), crate::config::DEFAULT_PLACEHOLDER);
        assert!(doc.has_class(mount.text, classes::PLACEHOLDER));
        assert!(mount.search.is_some());
        assert!(mount.clear.is_some_and(|c| doc.is_hidden(c)));
    }

    #[test]
    fn test_native_template_hides_host() {
        let mut doc = Document::new();
        let body = doc.body();
        let sel = doc
            .append_tree(body, select().attr("name", "fruit").child(option("a", "A")))
            .unwrap();
        let host = Host::detect(&doc, sel);
        let mount = build_template(&mut doc, &host, &settings(DropdownOptions::new().enable_search(false))).unwrap();

        assert!(doc.is_hidden(sel));
        assert_eq!(doc.children(body), &[sel, mount.root]);
        assert!(!doc.has_attr(mount.hidden_input, "name"));
        assert!(mount.search.is_none());
        assert!(mount.clear.is_none());
    }

    #[test]
    fn test_render_grouped_options() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let data = OptionData::Grouped(vec![
            OptionGroup::new("Fruits", vec![OptionItem::new("apple", "Apple").disabled(true)]),
            OptionGroup::new("", vec![OptionItem::new("x", "X").selected(true)]),
            OptionGroup::new("Veg", vec![OptionItem::new("leek", "Leek").selected(true)]),
        ]);
        let list = render_options(&mut doc, container, &data, "(disabled)").unwrap();

        assert_eq!(list.group_labels.len(), 2);
        assert_eq!(list.options.len(), 3);
        assert_eq!(list.selected, Some(("leek".into(), "Leek".into())));

        let apple = &list.options[0];
        assert_eq!(doc.text_content(apple.node), "Apple (disabled)");
        assert_eq!(doc.data(apple.node, "text"), Some("Apple"));
        assert_eq!(doc.data(apple.node, "group"), Some("Fruits"));
        assert!(doc.has_class(apple.node, classes::DISABLED));
        assert_eq!(list.options[1].group, Some(1));
        assert_eq!(doc.children(container).len(), 5);
    }
}
