use super::*;

fn heading_tag(page: &PageOutline, canvas_id: &str) -> Option<String> {
    page.heading_for(canvas_id)
        .map(|node| page.element(node).tag.clone())
}

#[test]
fn viewer_layout_exposes_every_panel_binding() {
    let page = PageOutline::viewer_layout();
    for panel in PanelId::ALL {
        let bound = binding(panel);
        assert!(page.find_by_id(bound.canvas_id).is_some());
        assert_eq!(page.is_hidden(bound.missing_id), Some(true));
        assert_eq!(
            page.text_of(&format!("{}-est", bound.summary_prefix)),
            Some(PLACEHOLDER)
        );
    }
}

#[test]
fn explicit_binding_takes_priority() {
    let mut page = PageOutline::new();
    let root = page.root();
    let card = page.append(root, Element::new("div").class("card"));
    page.append(card, Element::new("h2").text("structural"));
    page.append(card, Element::new("canvas").id("c1"));
    let label = page.append(
        root,
        Element::new("span").attr(TITLE_BINDING_ATTR, "c1"),
    );

    assert_eq!(page.heading_for("c1"), Some(label));
}

#[test]
fn structural_heading_inside_closest_container() {
    let page = PageOutline::viewer_layout();
    assert_eq!(heading_tag(&page, "esChartEvict").as_deref(), Some("h3"));
    assert_eq!(heading_tag(&page, "esChartFiling").as_deref(), Some("h3"));
    assert_ne!(
        page.heading_for("esChartEvict"),
        page.heading_for("esChartFiling")
    );
}

#[test]
fn class_based_heading_is_recognised() {
    let mut page = PageOutline::new();
    let root = page.root();
    let panel = page.append(root, Element::new("div").class("panel"));
    let title = page.append(panel, Element::new("div").class("panel-title"));
    page.append(panel, Element::new("canvas").id("c1"));

    assert_eq!(page.heading_for("c1"), Some(title));
}

#[test]
fn preceding_sibling_scan_finds_heading() {
    let page = PageOutline::viewer_layout();
    assert_eq!(heading_tag(&page, "esFemaFiling").as_deref(), Some("h4"));
}

#[test]
fn sibling_scan_is_bounded() {
    let mut page = PageOutline::new();
    let root = page.root();
    page.append(root, Element::new("h2").text("too far"));
    for _ in 0..SIBLING_SCAN_LIMIT {
        page.append(root, Element::new("div"));
    }
    let wrapper = page.append(root, Element::new("div"));
    page.append(wrapper, Element::new("canvas").id("c1"));

    assert_eq!(page.heading_for("c1"), None);
}

#[test]
fn missing_heading_is_silently_ignored() {
    let mut page = PageOutline::new();
    let root = page.root();
    let wrapper = page.append(root, Element::new("div"));
    page.append(wrapper, Element::new("canvas").id("c1"));

    assert!(!page.set_heading("c1", "Evictions"));
    assert!(!page.set_heading("unknown", "Evictions"));
    assert!(!page.set_text("unknown", "x"));
}

#[test]
fn sink_writes_are_visible_in_render() {
    let mut page = PageOutline::viewer_layout();
    assert!(page.set_heading("esFemaEvict", "FEMA — Evictions"));
    assert!(page.set_hidden("missing-filing", false));
    assert!(page.set_text("chart-caption-evict", "caption"));

    let text = page.render_text();
    assert!(text.contains("FEMA — Evictions"));
    assert!(text.contains("div#missing-filing: No published study"));
    assert!(text.contains("div#missing-evict [hidden]"));
    assert!(text.contains("p#chart-caption-evict: caption"));
}
