use anyhow::Context;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

const LAYOUT: &str = include_str!("templates/layout.hbs");
const NODE_LIST: &str = include_str!("templates/node_list.hbs");
const NODE_DETAIL: &str = include_str!("templates/node_detail.hbs");
const PRODUCT_LIST: &str = include_str!("templates/product_list.hbs");

pub const NODE_LIST_PAGE: &str = "node_list";
pub const NODE_DETAIL_PAGE: &str = "node_detail";
pub const PRODUCT_LIST_PAGE: &str = "product_list";

/// Handlebars registry with the administrative pages and their helpers.
/// Output is HTML-escaped.
pub fn get_handlebars() -> anyhow::Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);

    handlebars_helper!(exists: |v: Value| {
        match v {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    });
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(is_empty: |v: Value| {
        match v {
            serde_json::Value::Array(arr) => arr.is_empty(),
            _ => false,
        }
    });
    handlebars.register_helper("is_empty", Box::new(is_empty));

    handlebars
        .register_partial("layout", LAYOUT)
        .context("Failed to register admin layout")?;

    for (name, source) in [
        (NODE_LIST_PAGE, NODE_LIST),
        (NODE_DETAIL_PAGE, NODE_DETAIL),
        (PRODUCT_LIST_PAGE, PRODUCT_LIST),
    ] {
        handlebars
            .register_template_string(name, source)
            .with_context(|| format!("Failed to register template {}", name))?;
    }

    Ok(handlebars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_list_links_supplier_and_escapes_names() {
        let handlebars = get_handlebars().unwrap();
        let html = handlebars
            .render(
                NODE_LIST_PAGE,
                &json!({
                    "title": "Trading network members",
                    "nodes": [
                        {"id": 1, "name": "Factory", "level": 0, "supplier": null, "supplier_id": null, "debt": "0"},
                        {"id": 2, "name": "<Shop>", "level": 1, "supplier": "Factory", "supplier_id": 1, "debt": "12.50"}
                    ]
                }),
            )
            .unwrap();

        assert!(html.contains(r#"<a href="/admin/nodes/1">Factory</a>"#));
        assert!(html.contains("&lt;Shop&gt;"));
        assert!(!html.contains("<Shop>"));
    }

    #[test]
    fn empty_product_list_says_so() {
        let handlebars = get_handlebars().unwrap();
        let html = handlebars
            .render(PRODUCT_LIST_PAGE, &json!({"title": "Products", "products": []}))
            .unwrap();
        assert!(html.contains("No products"));
    }
}
