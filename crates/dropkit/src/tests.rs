use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dropkit_dom::prelude::*;
use serde_json::{json, Value};

use crate::config::{DEFAULT_NO_RESULTS_TEXT, DEFAULT_PLACEHOLDER};
use crate::prelude::*;
use crate::{classes, DropdownError};

fn page(host: ElementBuilder) -> Dom {
    let dom = Dom::new();
    dom.write(|doc| {
        let body = doc.body();
        doc.append_tree(body, host).unwrap();
    });
    dom
}

fn flat(values: &[(&str, &str)]) -> OptionData {
    OptionData::from(
        values
            .iter()
            .map(|(value, text)| OptionItem::new(*value, *text))
            .collect::<Vec<_>>(),
    )
}

fn text_of(dom: &Dom, node: Option<NodeId>) -> String {
    dom.read(|doc| doc.text_content(node.unwrap()))
}

fn no_results_row(dropdown: &Dropdown) -> Option<NodeId> {
    let root = dropdown.root().unwrap();
    dropdown
        .dom()
        .read(|doc| doc.first_by_class(root, classes::NO_RESULTS))
}

fn fruit_select() -> ElementBuilder {
    select()
        .id("fruit")
        .attr("name", "fruit")
        .child(option("", "Choose").attr("data-placeholder", ""))
        .child(option("a", "Apple"))
        .child(option("b", "Banana").selected(true))
}

#[test]
fn test_search_filters_container_options() {
    let dom = page(div().id("host"));
    let data = OptionData::from_json(json!({"options": [
        {"value": "a", "text": "Alpha"},
        {"value": "b", "text": "Beta", "disabled": true}
    ]}))
    .unwrap();
    let dropdown = Dropdown::create(&dom, "host", Some(data), DropdownOptions::default());
    dropdown.open();

    let search = dropdown.search_input().unwrap();
    dom.type_text(search, "alp");
    assert_eq!(dropdown.visible_values(), vec!["a"]);
    assert!(no_results_row(&dropdown).is_none());

    dom.type_text(search, "zzz");
    assert!(dropdown.visible_values().is_empty());
    let row = no_results_row(&dropdown).unwrap();
    assert_eq!(dom.read(|doc| doc.text_content(row)), DEFAULT_NO_RESULTS_TEXT);

    dom.type_text(search, "");
    assert_eq!(dropdown.visible_values(), vec!["a", "b"]);
    assert!(no_results_row(&dropdown).is_none());
}

#[test]
fn test_search_is_case_insensitive_and_idempotent() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(
        &dom,
        "host",
        Some(flat(&[("a", "Alpha"), ("b", "Beta")])),
        DropdownOptions::default(),
    );
    dropdown.search("BET");
    assert_eq!(dropdown.state().search_term, "bet");
    assert_eq!(dropdown.visible_values(), vec!["b"]);

    dropdown.search("nothing");
    dropdown.filter_options();
    dropdown.filter_options();
    let root = dropdown.root().unwrap();
    let rows = dom.read(|doc| doc.all_by_class(root, classes::NO_RESULTS).len());
    assert_eq!(rows, 1);
}

#[test]
fn test_native_select_preselection() {
    let dom = page(fruit_select());
    let dropdown = Dropdown::create(&dom, "fruit", None, DropdownOptions::default());

    assert_eq!(dropdown.value().as_deref(), Some("b"));
    assert_eq!(dropdown.text(), "Banana");
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "Banana");
    // Only rows with neither value nor label are skipped
    assert_eq!(dropdown.visible_values(), vec!["", "a", "b"]);

    let host = dom.read(|doc| doc.get_element_by_id("fruit")).unwrap();
    let hidden = dropdown.hidden_input().unwrap();
    dom.read(|doc| {
        assert!(doc.is_hidden(host));
        assert!(!doc.has_attr(hidden, "name"));
        assert_eq!(doc.select_value(host), "b");
    });

    dropdown.clear();
    assert_eq!(dropdown.value(), None);
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "Choose");
    assert_eq!(dom.read(|doc| doc.selected_index(host)), None);
}

#[test]
fn test_marked_placeholder_with_value_stays_selectable() {
    let dom = page(
        select()
            .id("fruit")
            .child(option("any", "Any").attr("data-placeholder", ""))
            .child(option("a", "Apple")),
    );
    let dropdown = Dropdown::create(&dom, "fruit", None, DropdownOptions::default());
    assert_eq!(dropdown.visible_values(), vec!["any", "a"]);
    // The control selects its first option when none is marked
    assert_eq!(dropdown.value().as_deref(), Some("any"));

    dropdown.set_value("a");
    dropdown.set_value("any");
    assert_eq!(dropdown.text(), "Any");
}

#[test]
fn test_empty_value_is_not_an_initial_selection() {
    let dom = page(div().id("host"));
    let data = OptionData::from(vec![
        OptionItem::new("", "None yet").selected(true),
        OptionItem::new("a", "A"),
    ]);
    let dropdown = Dropdown::create(&dom, "host", Some(data), DropdownOptions::default());

    assert_eq!(dropdown.value(), None);
    assert_eq!(text_of(&dom, dropdown.trigger_text()), DEFAULT_PLACEHOLDER);
    let row = dropdown.option_node("").unwrap();
    assert!(!dom.read(|doc| doc.has_class(row, classes::SELECTED)));
}

#[test]
fn test_container_defaults() {
    let dom = page(div().id("color"));
    let dropdown = Dropdown::create(
        &dom,
        "color",
        Some(flat(&[("r", "Red")])),
        DropdownOptions::default(),
    );
    let hidden = dropdown.hidden_input().unwrap();
    assert_eq!(dom.read(|doc| doc.attr(hidden, "name").map(str::to_string)), Some("colorValue".to_string()));
    assert_eq!(text_of(&dom, dropdown.trigger_text()), DEFAULT_PLACEHOLDER);

    dropdown.set_value("r");
    assert_eq!(dom.read(|doc| doc.value(hidden)), "r");
}

#[test]
fn test_missing_host_is_inert() {
    let dom = page(div().id("present"));
    let err = Dropdown::try_create(&dom, "absent", None, DropdownOptions::default()).unwrap_err();
    assert_eq!(err, DropdownError::ElementNotFound("absent".into()));

    let dropdown = Dropdown::create(&dom, "absent", Some(flat(&[("a", "A")])), DropdownOptions::default());
    assert!(!dropdown.is_mounted());
    dropdown.set_value("a");
    dropdown.open();
    assert_eq!(dropdown.value(), None);
    assert!(!dropdown.is_open());
    assert_eq!(dom.listener_count(), 0);
}

#[tokio::test]
async fn test_failed_load_blocks_until_reload() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let fetcher = {
        let attempts = attempts.clone();
        move |_: FetchRequest| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(LoadError::Status(500))
                } else {
                    Ok(json!([{"value": "x", "text": "Ex"}]))
                }
            }
        }
    };
    let dom = page(div().id("remote"));
    let options = DropdownOptions::new()
        .data_url("https://example.com/options")
        .error_text("Could not load")
        .fetcher(fetcher);
    let dropdown = Dropdown::create(&dom, "remote", None, options);
    assert!(dropdown.is_loading());

    dropdown.settled().await;
    assert_eq!(dropdown.phase(), Phase::Failed);
    assert!(dropdown.is_disabled());
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "Could not load");

    dropdown.set_value("x");
    dropdown.toggle();
    assert_eq!(dropdown.value(), None);
    assert!(!dropdown.is_open());

    dropdown.reload();
    dropdown.settled().await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(dropdown.phase(), Phase::Closed);
    assert!(!dropdown.is_disabled());

    dropdown.set_value("x");
    assert_eq!(dropdown.text(), "Ex");
    dropdown.toggle();
    assert!(dropdown.is_open());
}

#[tokio::test]
async fn test_reload_replaces_pending_load() {
    let slow = Arc::new(AtomicBool::new(true));
    let fetcher = {
        let slow = slow.clone();
        move |_: FetchRequest| {
            let slow = slow.load(Ordering::SeqCst);
            async move {
                if slow {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok::<_, LoadError>(json!([{"value": "stale", "text": "Stale"}]))
                } else {
                    Ok(json!([{"value": "fresh", "text": "Fresh"}]))
                }
            }
        }
    };
    let dom = page(div().id("remote"));
    let dropdown = Dropdown::create(
        &dom,
        "remote",
        None,
        DropdownOptions::new().data_url("https://example.com/o").fetcher(fetcher),
    );
    tokio::task::yield_now().await;

    slow.store(false, Ordering::SeqCst);
    dropdown.reload();
    dropdown.settled().await;
    assert_eq!(dropdown.phase(), Phase::Closed);
    assert_eq!(dropdown.visible_values(), vec!["fresh"]);
}

#[tokio::test]
async fn test_load_from_url_with_resolver() {
    let dom = page(div().id("remote"));
    let options = DropdownOptions::new()
        .data_url("https://example.com/wrapped")
        .fetcher(|_: FetchRequest| async {
            Ok::<_, LoadError>(json!({"items": {"groups": [
                {"label": "One", "options": [{"value": 1, "text": "First", "selected": true}]}
            ]}}))
        })
        .data_resolver(|payload: Value| payload["items"].clone());
    let dropdown = Dropdown::create(&dom, "remote", None, options);

    dropdown.load_from_url().await;
    assert_eq!(dropdown.phase(), Phase::Closed);
    assert_eq!(dropdown.value().as_deref(), Some("1"));
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "First");
}

#[test]
fn test_load_without_runtime_fails() {
    let dom = page(div().id("remote"));
    let options = DropdownOptions::new()
        .data_url("https://example.com/o")
        .fetcher(|_: FetchRequest| async { Ok::<_, LoadError>(json!([])) });
    let dropdown = Dropdown::create(&dom, "remote", None, options);
    assert_eq!(dropdown.phase(), Phase::Failed);
}

#[test]
fn test_failed_load_keeps_error_display() {
    let dom = page(div().id("remote"));
    let options = DropdownOptions::new()
        .data_url("https://example.com/o")
        .error_text("Could not load")
        .fetcher(|_: FetchRequest| async { Ok::<_, LoadError>(json!([])) });
    let dropdown = Dropdown::create(&dom, "remote", None, options);
    let changes = Arc::new(AtomicUsize::new(0));
    let c = changes.clone();
    dropdown.on_change(move |_, _| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(dropdown.phase(), Phase::Failed);

    dropdown.clear();
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "Could not load");

    dropdown.select_option("zz", "Zed");
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "Could not load");
    assert_eq!(dropdown.value(), None);
    assert_eq!(dropdown.phase(), Phase::Failed);
    assert_eq!(changes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reload_without_data_url_is_noop() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(
        &dom,
        "host",
        Some(flat(&[("a", "A"), ("b", "B")])),
        DropdownOptions::default(),
    );
    dropdown.set_value("b");

    dropdown.reload();
    assert_eq!(dropdown.phase(), Phase::Closed);
    assert!(!dropdown.is_loading());
    assert_eq!(dropdown.visible_values(), vec!["a", "b"]);
    assert_eq!(dropdown.value().as_deref(), Some("b"));
    assert_eq!(text_of(&dom, dropdown.trigger_text()), "B");
    let root = dropdown.root().unwrap();
    let arrow = dom.read(|doc| doc.first_by_class(root, classes::ARROW).map(|a| doc.text_content(a)));
    assert_eq!(arrow.as_deref(), Some(crate::config::DEFAULT_ARROW_ICON));
}

#[test]
fn test_grouped_search_with_disabled_match() {
    let dom = page(div().id("food"));
    let data = OptionData::Grouped(vec![
        OptionGroup::new("Fruits", vec![OptionItem::new("apple", "Apple").disabled(true)]),
        OptionGroup::new("Veg", vec![OptionItem::new("leek", "Leek")]),
    ]);
    let dropdown = Dropdown::create(&dom, "food", Some(data), DropdownOptions::default());
    dropdown.search("app");

    assert_eq!(dropdown.visible_values(), vec!["apple"]);
    let root = dropdown.root().unwrap();
    let labels = dom.read(|doc| {
        doc.all_by_class(root, classes::GROUP_LABEL)
            .into_iter()
            .map(|label| (doc.text_content(label), doc.style(label, "display").map(str::to_string)))
            .collect::<Vec<_>>()
    });
    assert_eq!(
        labels,
        vec![
            ("Fruits".to_string(), Some("block".to_string())),
            ("Veg".to_string(), Some("none".to_string())),
        ]
    );
    // Only enabled matches count as results
    assert!(no_results_row(&dropdown).is_some());
}

#[test]
fn test_arrow_keys_wrap() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(
        &dom,
        "host",
        Some(flat(&[("a", "A"), ("b", "B"), ("c", "C")])),
        DropdownOptions::default(),
    );
    let trigger = dropdown.trigger().unwrap();

    // The opening key only opens
    assert!(!dom.key_down(trigger, Key::Down));
    assert!(dropdown.is_open());
    assert_eq!(dropdown.highlighted_value().as_deref(), Some("a"));

    for expected in ["b", "c", "a"] {
        dom.key_down(trigger, Key::Down);
        assert_eq!(dropdown.highlighted_value().as_deref(), Some(expected));
    }
    dom.key_down(trigger, Key::Up);
    assert_eq!(dropdown.highlighted_value().as_deref(), Some("c"));

    assert!(!dom.key_down(trigger, Key::Enter));
    assert_eq!(dropdown.value().as_deref(), Some("c"));
    assert!(!dropdown.is_open());
    assert_eq!(dropdown.highlighted_value(), None);
}

#[test]
fn test_open_highlights_selection_and_escape_closes() {
    let dom = page(div().id("host"));
    let data = OptionData::from(vec![
        OptionItem::new("a", "A"),
        OptionItem::new("b", "B").disabled(true),
        OptionItem::new("c", "C").selected(true),
    ]);
    let dropdown = Dropdown::create(&dom, "host", Some(data), DropdownOptions::default());
    dropdown.open();
    assert_eq!(dropdown.highlighted_value().as_deref(), Some("c"));

    // Disabled rows are skipped
    assert!(dropdown.handle_key(Key::Up));
    assert_eq!(dropdown.highlighted_value().as_deref(), Some("a"));

    assert!(dropdown.handle_key(Key::Escape));
    assert!(!dropdown.is_open());
    assert!(!dropdown.handle_key(Key::Down));
}

#[test]
fn test_keys_ignored_without_navigable_options() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(&dom, "host", Some(flat(&[("a", "Alpha")])), DropdownOptions::default());
    dropdown.open();
    dropdown.search("zzz");
    assert!(!dropdown.handle_key(Key::Down));
    assert!(!dropdown.handle_key(Key::Enter));
    assert!(dropdown.is_open());
}

#[test]
fn test_single_selected_class() {
    let dom = page(div().id("host"));
    let data = OptionData::from(vec![
        OptionItem::new("a", "A").selected(true),
        OptionItem::new("b", "B").selected(true),
    ]);
    let dropdown = Dropdown::create(&dom, "host", Some(data), DropdownOptions::default());
    assert_eq!(dropdown.value().as_deref(), Some("b"));

    let selected = |value: &str| {
        let node = dropdown.option_node(value).unwrap();
        dom.read(|doc| doc.has_class(node, classes::SELECTED))
    };
    assert!(!selected("a") && selected("b"));

    dropdown.set_value("a");
    assert!(selected("a") && !selected("b"));
    dropdown.clear();
    assert!(!selected("a") && !selected("b"));
}

#[test]
fn test_change_notification_order() {
    let dom = page(fruit_select());
    let dropdown = Dropdown::create(&dom, "fruit", None, DropdownOptions::default());
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let host = dom.read(|doc| doc.get_element_by_id("fruit")).unwrap();
    let l = log.clone();
    dom.add_listener(host, EventType::Change, move |_| l.lock().unwrap().push("change".into()));

    let l = log.clone();
    dropdown.on_change(move |value, text| {
        l.lock().unwrap().push(format!("callback {value:?} {text}"));
    });

    let l = log.clone();
    dom.add_listener(
        dropdown.root().unwrap(),
        EventType::Custom(CHANGE_EVENT.into()),
        move |event| {
            let detail = &event.detail;
            l.lock().unwrap().push(format!("custom {} {}", detail["value"], detail["text"]));
        },
    );

    dropdown.set_value("a");
    dropdown.clear();
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "change".to_string(),
            r#"callback Some("a") Apple"#.to_string(),
            r#"custom "a" "Apple""#.to_string(),
            "change".to_string(),
            "callback None ".to_string(),
            r#"custom null """#.to_string(),
        ]
    );
}

#[test]
fn test_callback_may_reenter_widget() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(
        &dom,
        "host",
        Some(flat(&[("a", "A"), ("b", "B")])),
        DropdownOptions::default(),
    );
    let seen = Arc::new(Mutex::new(None));
    let (handle, s) = (dropdown.clone(), seen.clone());
    dropdown.on_change(move |_, _| {
        *s.lock().unwrap() = handle.value();
    });
    dropdown.set_value("b");
    assert_eq!(seen.lock().unwrap().as_deref(), Some("b"));
}

#[test]
fn test_clicks() {
    let dom = page(div().id("host"));
    let data = OptionData::from(vec![
        OptionItem::new("a", "A"),
        OptionItem::new("b", "B").disabled(true),
    ]);
    let dropdown = Dropdown::create(
        &dom,
        "host",
        Some(data),
        DropdownOptions::new().allow_clear(true),
    );
    let trigger = dropdown.trigger().unwrap();

    dom.click(trigger);
    assert!(dropdown.is_open());
    dom.click(dropdown.option_node("b").unwrap());
    assert!(dropdown.is_open());
    assert_eq!(dropdown.value(), None);

    let body = dom.read(|doc| doc.body());
    dom.click(body);
    assert!(!dropdown.is_open());

    dom.click(trigger);
    dom.click(dropdown.option_node("a").unwrap());
    assert_eq!(dropdown.value().as_deref(), Some("a"));
    assert!(!dropdown.is_open());

    let clear = dropdown.clear_button().unwrap();
    assert!(!dom.read(|doc| doc.is_hidden(clear)));
    dom.click(clear);
    assert_eq!(dropdown.value(), None);
    assert!(!dropdown.is_open());
    assert!(dom.read(|doc| doc.is_hidden(clear)));
}

#[test]
fn test_disable_and_enable() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(&dom, "host", Some(flat(&[("a", "A")])), DropdownOptions::default());
    dropdown.open();
    dropdown.disable();
    assert!(!dropdown.is_open());
    assert!(dropdown.is_disabled());

    let trigger = dropdown.trigger().unwrap();
    dom.click(trigger);
    assert!(!dropdown.is_open());
    assert_eq!(dom.read(|doc| doc.style(trigger, "opacity").map(str::to_string)), Some("0.6".into()));

    dropdown.enable();
    dom.click(trigger);
    assert!(dropdown.is_open());
    assert_eq!(dom.read(|doc| doc.style(trigger, "pointer-events").map(str::to_string)), Some("auto".into()));
}

#[test]
fn test_destroy_container_host() {
    let dom = page(div().id("host"));
    let dropdown = Dropdown::create(&dom, "host", Some(flat(&[("a", "A")])), DropdownOptions::default());
    let root = dropdown.root().unwrap();
    let host = dom.read(|doc| doc.get_element_by_id("host")).unwrap();
    assert!(dom.listener_count() > 0);

    dropdown.destroy();
    dom.read(|doc| {
        assert!(!doc.exists(root));
        assert!(doc.children(host).is_empty());
    });
    assert_eq!(dom.listener_count(), 0);
    assert!(dropdown.root().is_none());

    // Clicks anywhere no longer reach the widget
    let body = dom.read(|doc| doc.body());
    dom.click(body);
    dropdown.open();
    assert!(!dropdown.is_open());
}

#[test]
fn test_destroy_restores_native_host() {
    let dom = page(fruit_select());
    let dropdown = Dropdown::create(&dom, "fruit", None, DropdownOptions::default());
    let root = dropdown.root().unwrap();
    assert!(dom.listener_count() > 0);

    dropdown.destroy();
    let host = dom.read(|doc| doc.get_element_by_id("fruit")).unwrap();
    dom.read(|doc| {
        assert!(!doc.exists(root));
        assert!(!doc.is_hidden(host));
    });
    assert_eq!(dom.listener_count(), 0);
    assert!(!dropdown.is_mounted());

    dropdown.set_value("a");
    assert_eq!(dropdown.value().as_deref(), Some("b"));
}

#[test]
fn test_initialize_all() {
    let dom = Dom::new();
    dom.write(|doc| {
        let body = doc.body();
        doc.append_tree(body, select().id("first").attr("data-dropdown", "").child(option("a", "A")))
            .unwrap();
        doc.append_tree(body, select().attr("data-dropdown", "").child(option("b", "B")))
            .unwrap();
        doc.append_tree(body, select().id("plain").child(option("c", "C")))
            .unwrap();
    });

    let dropdowns = Dropdown::initialize_all(&dom, None, DropdownOptions::default());
    assert_eq!(dropdowns.len(), 2);
    assert_eq!(dropdowns[0].element_id(), "first");
    assert!(dropdowns[1].element_id().starts_with("dropkit-auto-"));
    assert_eq!(dropdowns[1].visible_values(), vec!["b"]);

    assert!(Dropdown::initialize_all(&dom, Some("[[["), DropdownOptions::default()).is_empty());
}
