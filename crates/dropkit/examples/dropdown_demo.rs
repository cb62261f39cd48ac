//! Dropdown Demo
//!
//! Builds a page with a native select and a remote-backed container, then
//! drives both with clicks, typing and keys while logging change events.
//!
//! Run with: RUST_LOG=dropkit=debug cargo run -p dropkit --example dropdown_demo

use anyhow::Result;
use dropkit::prelude::*;
use dropkit_dom::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let dom = Dom::new();
    dom.write(|doc| -> dropkit_dom::Result<()> {
        let body = doc.body();
        doc.append_tree(
            body,
            select()
                .id("fruit")
                .attr("name", "fruit")
                .attr("data-dropdown", "")
                .child(option("", "Pick a fruit").attr("data-placeholder", ""))
                .child(
                    optgroup("Citrus")
                        .child(option("lemon", "Lemon"))
                        .child(option("lime", "Lime")),
                )
                .child(
                    optgroup("Berries")
                        .child(option("straw", "Strawberry").selected(true))
                        .child(option("goose", "Gooseberry").disabled(true)),
                ),
        )?;
        doc.append_tree(body, div().id("city"))?;
        Ok(())
    })?;

    // Native selects carrying `data-dropdown`
    let fruit = Dropdown::initialize_all(&dom, None, DropdownOptions::new().allow_clear(true))
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no dropdown initialized"))?;
    fruit.on_change(|value, text| tracing::info!(?value, text, "fruit changed"));
    tracing::info!(value = ?fruit.value(), text = %fruit.text(), "fruit ready");

    let trigger = fruit.trigger().ok_or_else(|| anyhow::anyhow!("fruit not mounted"))?;
    let search = fruit.search_input().ok_or_else(|| anyhow::anyhow!("search disabled"))?;
    dom.click(trigger);
    dom.type_text(search, "li");
    tracing::info!(visible = ?fruit.visible_values(), "after typing \"li\"");
    dom.key_down(search, Key::Down);
    dom.key_down(search, Key::Enter);

    // Remote options through an in-process fetcher
    let options = DropdownOptions::new()
        .placeholder("Choose a city")
        .data_url("https://example.com/cities")
        .fetcher(|request: FetchRequest| async move {
            tracing::info!(url = %request.url, method = %request.method, "fetching");
            Ok::<_, LoadError>(json!({
                "groups": [
                    {"label": "Europe", "options": [
                        {"value": "ams", "text": "Amsterdam"},
                        {"value": "lis", "text": "Lisbon", "selected": true}
                    ]},
                    {"label": "Asia", "options": [{"value": "kyo", "text": "Kyoto"}]}
                ]
            }))
        });
    let city = Dropdown::try_create(&dom, "city", None, options)?;
    city.settled().await;
    tracing::info!(phase = ?city.phase(), value = ?city.value(), "city loaded");

    city.set_value("kyo");
    tracing::info!(text = %city.text(), "city changed");

    fruit.destroy();
    city.destroy();
    Ok(())
}
