//! Keyboard navigation over the visible, enabled options

use dropkit_dom::Key;

use crate::classes;
use crate::widget::{Effects, Inner};

impl Inner {
    /// Indices into `options` of rows that are visible and selectable
    pub(crate) fn navigable(&self) -> Vec<usize> {
        self.dom.read(|doc| {
            self.options
                .iter()
                .enumerate()
                .filter(|(_, option)| !option.disabled && !doc.has_class(option.node, classes::HIDDEN))
                .map(|(index, _)| index)
                .collect()
        })
    }

    /// Index into `options` of the highlighted row
    pub(crate) fn highlighted(&self) -> Option<usize> {
        self.dom.read(|doc| {
            self.options
                .iter()
                .position(|option| doc.has_class(option.node, classes::HIGHLIGHTED))
        })
    }

    /// Remove every highlight
    pub(crate) fn clear_highlight(&self) {
        let nodes: Vec<_> = self.options.iter().map(|o| o.node).collect();
        self.mutate("highlight reset", |doc| {
            for node in nodes {
                doc.remove_class(node, classes::HIGHLIGHTED)?;
            }
            Ok(())
        });
    }

    /// Highlight `navigable[index]`, wrapping out-of-range indices, and
    /// scroll it into view
    pub(crate) fn highlight_option(&self, navigable: &[usize], index: isize) {
        self.clear_highlight();
        if navigable.is_empty() {
            return;
        }
        let len = navigable.len() as isize;
        let index = if index < 0 {
            len - 1
        } else if index >= len {
            0
        } else {
            index
        };
        let node = self.options[navigable[index as usize]].node;
        self.mutate("highlight", |doc| {
            doc.add_class(node, classes::HIGHLIGHTED)?;
            doc.scroll_into_view(node);
            Ok(())
        });
    }

    /// Handle a key while the list is open; returns whether it was consumed
    pub(crate) fn handle_keyboard(&mut self, key: Key, fx: &mut Effects) -> bool {
        if key == Key::Escape {
            self.close();
            return true;
        }
        if !matches!(key, Key::Up | Key::Down | Key::Enter) {
            return false;
        }

        let navigable = self.navigable();
        if navigable.is_empty() {
            return false;
        }
        let current = self
            .highlighted()
            .and_then(|h| navigable.iter().position(|index| *index == h));
        tracing::trace!(element_id = %self.element_id, ?key, ?current, "dropdown key");

        match key {
            Key::Down => {
                let next = current.map_or(0, |c| c as isize + 1);
                self.highlight_option(&navigable, next);
            }
            Key::Up => {
                let previous = current.map_or(-1, |c| c as isize - 1);
                self.highlight_option(&navigable, previous);
            }
            Key::Enter => {
                if let Some(current) = current {
                    let option = &self.options[navigable[current]];
                    let (value, text) = (option.value.clone(), option.text.clone());
                    self.select_option(&value, &text, fx);
                }
            }
            _ => {}
        }
        true
    }
}
