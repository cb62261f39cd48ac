//! Selection controller
//!
//! Keeps four views of the selection in step: the widget state, the trigger
//! text, the hidden form field and (for native hosts) the `<select>` itself.

use dropkit_dom::{DomEvent, NodeId};
use serde_json::json;

use crate::classes;
use crate::init::native_preselection;
use crate::widget::{Effects, Inner};
use crate::CHANGE_EVENT;

impl Inner {
    /// Commit a selection, close the list and queue change notifications
    pub(crate) fn select_option(&mut self, value: &str, text: &str, fx: &mut Effects) {
        let (Some(mount), Some(host)) = (self.mount, self.host) else {
            return;
        };
        if self.state.phase.blocks_interaction() {
            tracing::trace!(element_id = %self.element_id, "selection ignored while loading or failed");
            return;
        }
        tracing::debug!(element_id = %self.element_id, value, "option selected");

        self.state.selected_value = Some(value.to_string());
        self.state.selected_text = text.to_string();
        self.sync_selected_class();
        self.render_display();

        self.mutate("selection sync", |doc| {
            doc.set_value(mount.hidden_input, value)?;
            if host.is_native() {
                doc.set_select_value(host.node, value)?;
            }
            Ok(())
        });
        if host.is_native() {
            fx.dispatch(DomEvent::change(host.node));
        }

        self.close();

        if let Some(callback) = self.on_change.clone() {
            fx.notify(callback, Some(value.to_string()), text.to_string());
        }
        fx.dispatch(DomEvent::custom(
            CHANGE_EVENT,
            mount.root,
            json!({ "value": value, "text": text }),
        ));
    }

    /// Select the enabled option with this value; anything else is ignored
    pub(crate) fn set_value(&mut self, value: &str, fx: &mut Effects) {
        let Some(option) = self
            .options
            .iter()
            .find(|option| option.value == value && !option.disabled)
        else {
            tracing::trace!(element_id = %self.element_id, value, "set_value: no enabled option");
            return;
        };
        let text = option.text.clone();
        self.select_option(value, &text, fx);
    }

    /// Reset to nothing selected and queue change notifications
    pub(crate) fn clear(&mut self, fx: &mut Effects) {
        let (Some(mount), Some(host)) = (self.mount, self.host) else {
            return;
        };
        if self.state.phase.blocks_interaction() {
            tracing::trace!(element_id = %self.element_id, "clear ignored while loading or failed");
            return;
        }
        tracing::debug!(element_id = %self.element_id, "selection cleared");

        self.state.selected_value = None;
        self.state.selected_text.clear();
        self.render_display();
        self.sync_selected_class();

        self.mutate("selection reset", |doc| {
            doc.set_value(mount.hidden_input, "")?;
            if host.is_native() {
                doc.set_selected_index(host.node, None)?;
            }
            Ok(())
        });
        if host.is_native() {
            fx.dispatch(DomEvent::change(host.node));
        }

        if let Some(callback) = self.on_change.clone() {
            fx.notify(callback, None, String::new());
        }
        fx.dispatch(DomEvent::custom(
            CHANGE_EVENT,
            mount.root,
            json!({ "value": null, "text": "" }),
        ));
    }

    /// Resolve the selection after options were (re)rendered
    ///
    /// A native host's own selected option wins over data flags.
    pub(crate) fn set_initial_selection(&mut self) {
        let (Some(mount), Some(host)) = (self.mount, self.host) else {
            return;
        };
        if host.is_native() {
            if let Some((value, text)) = self.dom.read(|doc| native_preselection(doc, host.node)) {
                self.state.selected_value = Some(value);
                self.state.selected_text = text;
            }
        }

        // An empty value counts as nothing selected
        let selection = self
            .state
            .selected_value
            .clone()
            .filter(|value| !value.is_empty() && !self.state.selected_text.is_empty());
        if selection.is_none() {
            self.state.selected_value = None;
            self.state.selected_text.clear();
        }

        self.render_display();
        self.sync_selected_class();
        if let Some(value) = selection {
            self.mutate("initial selection", |doc| {
                doc.set_value(mount.hidden_input, &value)?;
                if host.is_native() {
                    doc.set_select_value(host.node, &value)?;
                }
                Ok(())
            });
        }
    }

    /// Handle a click inside the option list
    pub(crate) fn click_option(&mut self, target: NodeId, fx: &mut Effects) {
        let Some(mount) = self.mount else {
            return;
        };
        let picked = self.dom.read(|doc| {
            let row = doc.closest_with_class(target, classes::OPTION)?;
            if !doc.contains(mount.options, row) || doc.has_class(row, classes::DISABLED) {
                return None;
            }
            let value = doc.data(row, "value")?.to_string();
            let text = doc.data(row, "text").unwrap_or_default().to_string();
            Some((value, text))
        });
        if let Some((value, text)) = picked {
            self.select_option(&value, &text, fx);
        }
    }
}
