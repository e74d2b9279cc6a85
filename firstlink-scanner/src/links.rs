// First-link heuristic.
//
// Walks the paragraphs and list items of an article body in document order
// and returns the first article link that is not inside parentheses or
// square brackets. Links inside brackets are usually pronunciations,
// etymologies or citations. When the top level of the container has no
// such link, unattributed child containers are searched the same way.

use crate::config::LinkRules;
use scraper::{ElementRef, Node};

/// Returns the href of the first qualifying link below `container`.
pub fn find_first_link(container: ElementRef<'_>, rules: &LinkRules) -> Option<String> {
    for unit in container.children().filter_map(ElementRef::wrap) {
        if matches!(unit.value().name(), "p" | "li") {
            let mut depth = 0;
            if let Some(href) = scan_unit(unit, rules, &mut depth) {
                return Some(href);
            }
        }
    }

    for child in container.children().filter_map(ElementRef::wrap) {
        let element = child.value();
        let descend = match element.name() {
            // Attributed divs are infoboxes, navboxes, hatnotes and the like.
            "div" => element.attrs().next().is_none(),
            "span" | "ul" | "ol" => true,
            _ => false,
        };
        if descend && let Some(href) = find_first_link(child, rules) {
            return Some(href);
        }
    }

    None
}

fn scan_unit(unit: ElementRef<'_>, rules: &LinkRules, depth: &mut i32) -> Option<String> {
    for node in unit.children() {
        match node.value() {
            Node::Text(text) => track_brackets(text, depth),
            Node::Element(element) => match element.name() {
                "a" => {
                    if *depth == 0
                        && let Some(href) = element.attr("href")
                        && rules.is_article_link(href)
                    {
                        return Some(href.to_string());
                    }
                }
                "b" | "i" | "em" | "strong" => {
                    if let Some(inline) = ElementRef::wrap(node)
                        && let Some(href) = scan_unit(inline, rules, depth)
                    {
                        return Some(href);
                    }
                }
                "span" if element.attrs().next().is_none() => {
                    if let Some(inline) = ElementRef::wrap(node)
                        && let Some(href) = scan_unit(inline, rules, depth)
                    {
                        return Some(href);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    None
}

/// A stray closer drives the depth negative, which keeps the rest of the
/// unit ineligible.
fn track_brackets(text: &str, depth: &mut i32) {
    for c in text.chars() {
        match c {
            '(' | '[' => *depth += 1,
            ')' | ']' => *depth -= 1,
            _ => {}
        }
    }
}
