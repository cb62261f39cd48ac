//! Live search over option labels

use dropkit_dom::markup::div;

use crate::classes;
use crate::widget::Inner;

impl Inner {
    /// Replace the search term and refilter
    pub(crate) fn set_search_term(&mut self, term: &str) {
        self.state.search_term = term.to_lowercase();
        self.filter_options();
    }

    /// Show options whose label contains the search term
    ///
    /// Group labels follow their members' visibility. Disabled matches stay
    /// visible but do not count as results, so the no-results row can show
    /// next to them.
    pub(crate) fn filter_options(&mut self) {
        let Some(mount) = self.mount else {
            return;
        };
        let term = self.state.search_term.as_str();

        let matches: Vec<bool> = self
            .options
            .iter()
            .map(|option| option.needle.contains(term))
            .collect();
        let has_results = self
            .options
            .iter()
            .zip(&matches)
            .any(|(option, visible)| *visible && !option.disabled);
        let label_visibility: Vec<bool> = self
            .group_labels
            .iter()
            .map(|label| {
                self.options
                    .iter()
                    .zip(&matches)
                    .any(|(option, visible)| *visible && option.group == Some(label.group))
            })
            .collect();
        let show_no_results = !has_results && !term.is_empty();

        let options = &self.options;
        let labels = &self.group_labels;
        let no_results_text = self.settings.no_results_text.as_str();
        let mut no_results = self.no_results;

        let result = self.dom.write(|doc| -> dropkit_dom::Result<()> {
            for (option, visible) in options.iter().zip(&matches) {
                if *visible {
                    doc.remove_class(option.node, classes::HIDDEN)?;
                } else {
                    doc.add_class(option.node, classes::HIDDEN)?;
                }
            }
            for (label, visible) in labels.iter().zip(&label_visibility) {
                doc.set_style(label.node, "display", if *visible { "block" } else { "none" })?;
            }

            match (show_no_results, no_results) {
                (true, None) => {
                    let row = doc.append_tree(
                        mount.options,
                        div().class(classes::NO_RESULTS).text(no_results_text),
                    )?;
                    no_results = Some(row);
                }
                (false, Some(row)) => {
                    if doc.exists(row) {
                        doc.remove(row)?;
                    }
                    no_results = None;
                }
                _ => {}
            }
            Ok(())
        });
        self.no_results = no_results;

        if let Err(err) = result {
            tracing::warn!(element_id = %self.element_id, %err, "filtering failed");
        }
        tracing::trace!(
            element_id = %self.element_id,
            term = %self.state.search_term,
            has_results,
            "options filtered"
        );
    }
}
