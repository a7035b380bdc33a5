//! Page model the engine writes labels into.

use shared::domain::PanelId;

use crate::labels::{binding, SummaryView, PLACEHOLDER};

const CONTAINER_CLASSES: &[&str] = &["card", "panel", "box", "chart-card"];
const CONTAINER_TAGS: &[&str] = &["section"];
const HEADING_CLASSES: &[&str] = &["card-title", "section-title", "panel-title"];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "strong"];
const TITLE_BINDING_ATTR: &str = "data-title-for";
const SIBLING_SCAN_LIMIT: usize = 4;

/// Destination for selection-derived text. Writes to unknown targets are
/// ignored and reported as `false`.
pub trait LabelSink: Send {
    fn set_text(&mut self, element_id: &str, text: &str) -> bool;
    fn set_hidden(&mut self, element_id: &str, hidden: bool) -> bool;
    /// Writes the heading that visually belongs to `canvas_id`.
    fn set_heading(&mut self, canvas_id: &str, text: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub hidden: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn is_container(&self) -> bool {
        CONTAINER_TAGS.contains(&self.tag.as_str())
            || CONTAINER_CLASSES.iter().any(|c| self.has_class(c))
    }

    fn is_heading(&self) -> bool {
        HEADING_TAGS.contains(&self.tag.as_str())
            || HEADING_CLASSES.iter().any(|c| self.has_class(c))
    }
}

#[derive(Debug, Clone)]
struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed element tree with the heading lookup used for panel titles.
#[derive(Debug, Clone)]
pub struct PageOutline {
    nodes: Vec<Node>,
}

impl Default for PageOutline {
    fn default() -> Self {
        Self::new()
    }
}

impl PageOutline {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                element: Element::new("body"),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            element,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.0].element
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.preorder(self.root())
            .into_iter()
            .find(|node| self.element(*node).id.as_deref() == Some(id))
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.find_by_id(id).map(|node| self.element(node).text.as_str())
    }

    pub fn is_hidden(&self, id: &str) -> Option<bool> {
        self.find_by_id(id).map(|node| self.element(node).hidden)
    }

    /// Locates the heading for a canvas: an element bound to it through
    /// `data-title-for`, else the first heading inside the closest container,
    /// else a heading in one of the few siblings preceding the canvas'
    /// ancestors.
    pub fn heading_for(&self, canvas_id: &str) -> Option<NodeId> {
        let canvas = self.find_by_id(canvas_id)?;

        let explicit = self.preorder(self.root()).into_iter().find(|node| {
            self.element(*node).attr_value(TITLE_BINDING_ATTR) == Some(canvas_id)
        });
        if explicit.is_some() {
            return explicit;
        }

        let parent = self.nodes[canvas.0].parent;
        let container = self.closest(canvas, Element::is_container).or(parent);
        if let Some(found) =
            container.and_then(|c| self.first_descendant(c, Element::is_heading))
        {
            return Some(found);
        }

        let mut cursor = parent?;
        for _ in 0..SIBLING_SCAN_LIMIT {
            let Some(prev) = self.previous_sibling(cursor) else {
                break;
            };
            if self.element(prev).is_heading() {
                return Some(prev);
            }
            if let Some(found) = self.first_descendant(prev, Element::is_heading) {
                return Some(found);
            }
            cursor = prev;
        }
        None
    }

    /// Indented text dump, one element per line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, node: NodeId, depth: usize, out: &mut String) {
        let element = self.element(node);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&element.tag);
        if let Some(id) = &element.id {
            out.push('#');
            out.push_str(id);
        }
        if element.hidden {
            out.push_str(" [hidden]");
        }
        if !element.text.is_empty() {
            out.push_str(": ");
            out.push_str(&element.text);
        }
        out.push('\n');
        for child in &self.nodes[node.0].children {
            self.render_node(*child, depth + 1, out);
        }
    }

    fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        order
    }

    fn closest(&self, start: NodeId, pred: fn(&Element) -> bool) -> Option<NodeId> {
        let mut cursor = Some(start);
        while let Some(node) = cursor {
            if pred(self.element(node)) {
                return Some(node);
            }
            cursor = self.nodes[node.0].parent;
        }
        None
    }

    fn first_descendant(&self, start: NodeId, pred: fn(&Element) -> bool) -> Option<NodeId> {
        self.preorder(start)
            .into_iter()
            .skip(1)
            .find(|node| pred(self.element(*node)))
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let position = siblings.iter().position(|child| *child == node)?;
        position.checked_sub(1).map(|prev| siblings[prev])
    }

    /// The four-panel viewer page. Each pair locates its headings a
    /// different way: primary cards carry a heading inside the card, the
    /// comparison-left heading is bound explicitly, and the comparison-right
    /// heading precedes the chart wrapper as a sibling.
    pub fn viewer_layout() -> Self {
        let mut page = Self::new();
        let root = page.root();

        let primary = page.append(root, Element::new("section").id("primary-pair"));
        for panel in [PanelId::PrimaryLeft, PanelId::PrimaryRight] {
            let card = page.append(primary, Element::new("div").class("card"));
            page.append(card, Element::new("h3"));
            page.add_panel_body(card, panel);
        }

        let comparison = page.append(root, Element::new("div").id("comparison-pair"));

        let left = page.append(comparison, Element::new("div").class("chart-card"));
        let bound = binding(PanelId::ComparisonLeft);
        page.append(
            left,
            Element::new("div")
                .class("label")
                .attr(TITLE_BINDING_ATTR, bound.canvas_id),
        );
        page.add_panel_body(left, PanelId::ComparisonLeft);

        let right = page.append(comparison, Element::new("div").class("column"));
        page.append(right, Element::new("h4"));
        let wrapper = page.append(right, Element::new("div").class("canvas-wrap"));
        page.add_panel_body(wrapper, PanelId::ComparisonRight);

        page
    }

    fn add_panel_body(&mut self, parent: NodeId, panel: PanelId) {
        let bound = binding(panel);
        self.append(parent, Element::new("canvas").id(bound.canvas_id));
        self.append(
            parent,
            Element::new("div")
                .id(bound.missing_id)
                .class("missing")
                .text("No published study for this selection.")
                .hidden(true),
        );
        self.append(parent, Element::new("p").id(bound.caption_id));

        let table = self.append(parent, Element::new("dl").class("did"));
        for (suffix, _) in SummaryView::placeholder().fields {
            self.append(
                table,
                Element::new("dd")
                    .id(&format!("{}-{suffix}", bound.summary_prefix))
                    .text(PLACEHOLDER),
            );
        }
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        let node = self.find_by_id(id)?;
        Some(&mut self.nodes[node.0].element)
    }
}

impl LabelSink for PageOutline {
    fn set_text(&mut self, element_id: &str, text: &str) -> bool {
        match self.element_mut(element_id) {
            Some(element) => {
                element.text = text.to_string();
                true
            }
            None => false,
        }
    }

    fn set_hidden(&mut self, element_id: &str, hidden: bool) -> bool {
        match self.element_mut(element_id) {
            Some(element) => {
                element.hidden = hidden;
                true
            }
            None => false,
        }
    }

    fn set_heading(&mut self, canvas_id: &str, text: &str) -> bool {
        match self.heading_for(canvas_id) {
            Some(node) => {
                self.nodes[node.0].element.text = text.to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
