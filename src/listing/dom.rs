//! Thin helpers over the `kuchiki` mutable DOM.

use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

use super::error::ListingError;

pub fn parse_document(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// All elements under (and including) `root` matching `selector`.
pub fn select_all(root: &NodeRef, selector: &str) -> Result<Vec<NodeRef>, ListingError> {
    let matches = root
        .select(selector)
        .map_err(|()| ListingError::InvalidSelector(selector.to_string()))?;
    Ok(matches.map(|m| m.as_node().clone()).collect())
}

/// First element matching `selector`; invalid selectors match nothing.
pub fn select_first(root: &NodeRef, selector: &str) -> Option<NodeRef> {
    root.select_first(selector).ok().map(|m| m.as_node().clone())
}

/// Walk a selector cascade and return the first element of the first
/// selector that matches anything.
pub fn first_match<'a>(root: &NodeRef, cascade: &'a [String]) -> Option<(NodeRef, &'a str)> {
    cascade.iter().find_map(|sel| {
        let node = select_first(root, sel)?;
        log::debug!("selector {sel:?} matched");
        Some((node, sel.as_str()))
    })
}

/// Like [`first_match`], but every element of the first matching selector.
pub fn all_of_first_match(root: &NodeRef, cascade: &[String]) -> Vec<NodeRef> {
    cascade
        .iter()
        .filter_map(|sel| select_all(root, sel).ok())
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

/// Text content with runs of whitespace collapsed to single spaces.
pub fn text(node: &NodeRef) -> String {
    collapse_whitespace(&node.text_contents())
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|c| c.to_string()).collect()
}

pub fn outer_html(node: &NodeRef) -> String {
    node.to_string()
}

pub fn clear_children(node: &NodeRef) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
}

pub fn set_text(node: &NodeRef, value: &str) {
    clear_children(node);
    node.append(NodeRef::new_text(value));
}

/// Replace the children of `node` with `html` parsed in its context.
pub fn set_inner_html(node: &NodeRef, html: &str) {
    let nodes = fragment(node, html);
    clear_children(node);
    for n in nodes {
        node.append(n);
    }
}

/// Parse `html` as a fragment, using `context` (an element) as the parent
/// the fragment will live in, so table rows and list items survive.
pub fn fragment(context: &NodeRef, html: &str) -> Vec<NodeRef> {
    let Some(ctx) = context.as_element() else {
        return parse_document(html)
            .select_first("body")
            .map(|b| b.as_node().children().collect())
            .unwrap_or_default();
    };
    let doc = kuchiki::parse_fragment(ctx.name.clone(), Vec::new()).one(html);
    // html5ever roots every fragment in a synthetic <html> element.
    let root = doc
        .first_child()
        .filter(|n| tag_name(n).as_deref() == Some("html"))
        .unwrap_or(doc);
    root.children().collect()
}

/// Recursive copy of a node and its subtree.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = match node.data() {
        NodeData::Element(el) => {
            NodeRef::new_element(el.name.clone(), el.attributes.borrow().map.clone())
        }
        NodeData::Text(t) => NodeRef::new_text(t.borrow().clone()),
        NodeData::Comment(c) => NodeRef::new_comment(c.borrow().clone()),
        _ => NodeRef::new_text(String::new()),
    };
    for child in node.children() {
        copy.append(deep_clone(&child));
    }
    copy
}

pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children().filter(|c| c.as_element().is_some()).collect()
}

pub fn next_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    node.following_siblings().find(|s| s.as_element().is_some())
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|el| el.name.local.to_string())
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.to_string());
    }
}

pub fn classes(node: &NodeRef) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// True if `ancestor` is `node` or one of its ancestors.
pub fn contains(ancestor: &NodeRef, node: &NodeRef) -> bool {
    node.inclusive_ancestors().any(|a| a == *ancestor)
}

/// Serialize a whole parsed document back to HTML.
pub fn serialize_document(doc: &NodeRef) -> Result<String, ListingError> {
    let mut out = Vec::new();
    doc.serialize(&mut out)?;
    String::from_utf8(out).map_err(|_| ListingError::NotUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_takes_first_matching_selector() {
        let doc = parse_document("<h1>Fallback</h1><p class=\"product-name\">Primary</p>");
        let cascade = vec![".product-title".to_string(), ".product-name".to_string(), "h1".to_string()];
        let (node, sel) = first_match(&doc, &cascade).unwrap();
        assert_eq!(sel, ".product-name");
        assert_eq!(text(&node), "Primary");
    }

    #[test]
    fn invalid_selector_is_reported() {
        let doc = parse_document("<p>x</p>");
        assert!(matches!(select_all(&doc, "p[["), Err(ListingError::InvalidSelector(_))));
        assert!(select_first(&doc, "p[[").is_none());
    }

    #[test]
    fn inner_html_in_table_context() {
        let doc = parse_document("<table><tbody id=\"b\"><tr><td>old</td></tr></tbody></table>");
        let body = select_first(&doc, "#b").unwrap();
        set_inner_html(&body, "<tr><td>new</td></tr>");
        assert_eq!(inner_html(&body), "<tr><td>new</td></tr>");
    }

    #[test]
    fn deep_clone_is_detached_copy() {
        let doc = parse_document("<ul><li class=\"a\"><b>x</b></li></ul>");
        let li = select_first(&doc, "li").unwrap();
        let copy = deep_clone(&li);
        set_text(&copy, "changed");
        assert_eq!(outer_html(&li), "<li class=\"a\"><b>x</b></li>");
        assert_eq!(outer_html(&copy), "<li class=\"a\">changed</li>");
        assert!(copy.parent().is_none());
    }

    #[test]
    fn text_collapses_whitespace() {
        let doc = parse_document("<p>  a \n\t b  </p>");
        assert_eq!(text(&select_first(&doc, "p").unwrap()), "a b");
    }
}
