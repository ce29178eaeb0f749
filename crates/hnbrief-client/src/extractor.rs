//! Main-content extraction from arbitrary HTML.
//!
//! Readability-style boilerplate removal on top of `scraper`'s DOM:
//!
//! 1. Subtrees that are never content (scripts, navigation, forms, hidden
//!    elements, containers whose class/id looks like comments, share bars,
//!    sidebars...) are ignored everywhere.
//! 2. Every paragraph-like block with enough text scores points for its
//!    parent (full) and grandparent (half): one point, plus one per comma,
//!    plus one per hundred characters (capped at three).
//! 3. Each container starts from a tag weight and a class/id weight, and its
//!    total is scaled by `1 - link_density`.
//! 4. The best container, plus siblings that score close enough or look
//!    like real prose, is the main content.
//!
//! A single walk over the document decides which subtrees are boilerplate
//! and measures the visible text and link text of every other element, so
//! extraction stays linear in the size of the page.
//!
//! Output is plain text, one paragraph per block, blank line between
//! paragraphs. The same selection can be rendered as Markdown through htmd.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use ego_tree::NodeId;
use ego_tree::iter::Edge;
use hnbrief_core::error::AppError;
use hnbrief_core::traits::Extractor;
use htmd::HtmlToMarkdown;
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Shorter extractions are treated as failures (paywall stubs, cookie
/// walls, error pages).
pub const DEFAULT_MIN_CHARS: usize = 200;

/// Input above this size is cut before parsing.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;

const MIN_PARAGRAPH_CHARS: usize = 25;

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
    "iframe", "svg", "canvas", "button", "select", "input", "textarea", "object", "embed",
    "dialog", "menu", "head", "title", "meta", "link",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "blockquote", "pre", "ul", "ol", "li", "dl", "dt",
    "dd", "table", "thead", "tbody", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "figure", "figcaption", "hr", "br", "address", "details", "summary",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "td", "blockquote"];

// Hints are compared against whole words of class names and ids, split on
// whitespace, `-` and `_`: `post-comments` has the words `post` and
// `comments`, `downloads` is one word.

/// Words marking containers that are never the article.
const UNLIKELY_HINTS: &[&str] = &[
    "comment", "comments", "disqus", "share", "sharing", "social", "sidebar", "related",
    "recommend", "recommended", "advert", "advertisement", "sponsor", "sponsored", "promo",
    "cookie", "cookies", "consent", "newsletter", "subscribe", "popup", "modal", "breadcrumb",
    "breadcrumbs", "pagination", "pager", "masthead", "footer", "banner", "menu", "navbar",
];

/// Words that rescue a container from `UNLIKELY_HINTS`, when they appear
/// in a class or id free of unlikely words.
const MAYBE_HINTS: &[&str] = &["article", "body", "main", "content", "column", "story", "post"];

const POSITIVE_HINTS: &[&str] = &[
    "article", "body", "content", "entry", "main", "page", "post", "text", "blog", "story",
    "prose",
];

const NEGATIVE_HINTS: &[&str] = &[
    "comment", "comments", "meta", "footer", "footnote", "sidebar", "widget", "share",
    "sharing", "social", "related", "ad", "ads", "advert", "promo", "tags", "byline", "author",
    "hidden",
];

/// Output format of the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

/// Content extractor based on paragraph-density scoring.
pub struct ReadabilityExtractor {
    min_chars: usize,
    max_input_bytes: usize,
    format: TextFormat,
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for ReadabilityExtractor {
    fn clone(&self) -> Self {
        Self {
            min_chars: self.min_chars,
            max_input_bytes: self.max_input_bytes,
            format: self.format,
            converter: Arc::clone(&self.converter),
        }
    }
}

impl ReadabilityExtractor {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder().skip_tags(SKIP_TAGS.to_vec()).build();

        Self {
            min_chars: DEFAULT_MIN_CHARS,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            format: TextFormat::Plain,
            converter: Arc::new(converter),
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    pub fn with_max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = max;
        self
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    fn render(&self, page: &Analysis, blocks: &[ElementRef<'_>]) -> Result<String, AppError> {
        match self.format {
            TextFormat::Plain => {
                let mut paragraphs = Vec::new();
                for block in blocks {
                    page.collect_paragraphs(*block, &mut paragraphs);
                }
                Ok(paragraphs.join("\n\n"))
            }
            TextFormat::Markdown => {
                // htmd sees only the visible part of the selection.
                let mut html = String::new();
                for block in blocks {
                    page.write_clean_html(*block, &mut html);
                }
                self.converter
                    .convert(&html)
                    .map(|md| md.trim().to_string())
                    .map_err(|e| AppError::ExtractionFailed(format!("markdown conversion: {e}")))
            }
        }
    }
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ReadabilityExtractor {
    fn extract(&self, html: &[u8], content_type: Option<&str>) -> Result<String, AppError> {
        if let Some(charset) = content_type.and_then(charset) {
            if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
                tracing::debug!(%charset, "Non UTF-8 charset, decoding lossily");
            }
        }

        let bytes = &html[..html.len().min(self.max_input_bytes)];
        let source = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&source);
        let root = body_of(&document);
        let page = Analysis::of(root);

        let blocks = match page.best_candidate(root) {
            Some(blocks) => blocks,
            None => vec![root],
        };

        let text = self.render(&page, &blocks)?;
        let chars = text.chars().count();
        if text.trim().is_empty() || chars < self.min_chars {
            return Err(AppError::ExtractionFailed(format!(
                "extracted {chars} characters, need at least {}",
                self.min_chars
            )));
        }

        Ok(text)
    }
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn body_of(document: &Html) -> ElementRef<'_> {
    let root = document.root_element();
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Visible text of one element, boilerplate subtrees left out. `chars`
/// counts every word plus one separator after it.
#[derive(Debug, Default, Clone, Copy)]
struct TextStats {
    chars: usize,
    link_chars: usize,
    commas: usize,
}

impl TextStats {
    fn measure(text: &str, in_link: bool) -> Self {
        let chars = text.split_whitespace().map(|w| w.chars().count() + 1).sum();
        Self {
            chars,
            link_chars: if in_link { chars } else { 0 },
            commas: text.matches(',').count(),
        }
    }

    fn add(&mut self, other: TextStats) {
        self.chars += other.chars;
        self.link_chars += other.link_chars;
        self.commas += other.commas;
    }

    /// Share of the text that sits inside links.
    fn link_density(&self) -> f64 {
        if self.chars == 0 {
            return 0.0;
        }
        (self.link_chars as f64 / self.chars as f64).min(1.0)
    }
}

/// Boilerplate subtrees and text measurements for a whole page, built in
/// one walk from the content root.
struct Analysis {
    /// Topmost element of every boilerplate subtree.
    excluded: HashSet<NodeId>,
    /// Every element outside those subtrees.
    stats: HashMap<NodeId, TextStats>,
}

struct OpenElement {
    id: NodeId,
    stats: TextStats,
    in_link: bool,
}

impl Analysis {
    fn of(root: ElementRef<'_>) -> Self {
        let mut excluded = HashSet::new();
        let mut stats = HashMap::new();
        let mut open: Vec<OpenElement> = Vec::new();
        let mut skipping: Option<NodeId> = None;

        for edge in root.traverse() {
            match edge {
                Edge::Open(node) => {
                    if skipping.is_some() {
                        continue;
                    }
                    match node.value() {
                        Node::Element(el) => {
                            let boilerplate = node.id() != root.id()
                                && ElementRef::wrap(node).is_some_and(is_boilerplate);
                            if boilerplate {
                                excluded.insert(node.id());
                                skipping = Some(node.id());
                                continue;
                            }
                            let in_link = el.name() == "a"
                                || open.last().is_some_and(|parent| parent.in_link);
                            open.push(OpenElement {
                                id: node.id(),
                                stats: TextStats::default(),
                                in_link,
                            });
                        }
                        Node::Text(text) => {
                            if let Some(current) = open.last_mut() {
                                let measured = TextStats::measure(text, current.in_link);
                                current.stats.add(measured);
                            }
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if let Some(id) = skipping {
                        if id == node.id() {
                            skipping = None;
                        }
                        continue;
                    }
                    if !node.value().is_element() {
                        continue;
                    }
                    if let Some(done) = open.pop() {
                        if let Some(parent) = open.last_mut() {
                            parent.stats.add(done.stats);
                        }
                        stats.insert(done.id, done.stats);
                    }
                }
            }
        }

        Self { excluded, stats }
    }

    fn stats(&self, element: ElementRef<'_>) -> Option<TextStats> {
        self.stats.get(&element.id()).copied()
    }

    /// Edges below `root`, boilerplate subtrees removed.
    fn visible_edges<'a>(
        &'a self,
        root: ElementRef<'a>,
    ) -> impl Iterator<Item = Edge<'a, Node>> + 'a {
        let mut skipping: Option<NodeId> = None;
        root.traverse().filter(move |edge| match (*edge, skipping) {
            (Edge::Close(node), Some(id)) => {
                if node.id() == id {
                    skipping = None;
                }
                false
            }
            (_, Some(_)) => false,
            (Edge::Open(node), None) if self.excluded.contains(&node.id()) => {
                skipping = Some(node.id());
                false
            }
            _ => true,
        })
    }

    /// Pick the main-content container and the siblings that belong with it.
    /// `None` when the page has no scorable paragraphs.
    fn best_candidate<'a>(&self, root: ElementRef<'a>) -> Option<Vec<ElementRef<'a>>> {
        let mut candidates: HashMap<NodeId, Candidate<'a>> = HashMap::new();
        // Discovery order, so ties resolve to the earliest container.
        let mut order = Vec::new();

        for paragraph in root.descendants().filter_map(ElementRef::wrap) {
            if !PARAGRAPH_TAGS.contains(&paragraph.value().name()) {
                continue;
            }
            let Some(text) = self.stats(paragraph) else {
                continue;
            };
            if text.chars < MIN_PARAGRAPH_CHARS {
                continue;
            }

            let points = 1.0 + text.commas as f64 + (text.chars / 100).min(3) as f64;

            let parent = paragraph.parent().and_then(ElementRef::wrap);
            let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);

            for (ancestor, share) in [(parent, 1.0), (grandparent, 0.5)] {
                let Some(ancestor) = ancestor else { continue };
                let entry = candidates.entry(ancestor.id()).or_insert_with(|| {
                    order.push(ancestor.id());
                    Candidate {
                        element: ancestor,
                        score: tag_weight(ancestor.value().name()) + class_weight(ancestor),
                    }
                });
                entry.score += points * share;
            }
        }

        for candidate in candidates.values_mut() {
            let density = self
                .stats(candidate.element)
                .map_or(0.0, |s| s.link_density());
            candidate.score *= 1.0 - density;
        }

        let mut best: Option<&Candidate<'a>> = None;
        for id in &order {
            let candidate = &candidates[id];
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        let best = best?;

        let Some(parent) = best.element.parent().and_then(ElementRef::wrap) else {
            return Some(vec![best.element]);
        };

        let threshold = (best.score * 0.2).max(10.0);
        let blocks = parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| {
                if sibling.id() == best.element.id() {
                    return true;
                }
                if self.stats(*sibling).is_none() {
                    return false;
                }
                if candidates
                    .get(&sibling.id())
                    .is_some_and(|c| c.score >= threshold)
                {
                    return true;
                }
                sibling.value().name() == "p" && self.looks_like_prose(*sibling)
            })
            .collect();

        Some(blocks)
    }

    fn looks_like_prose(&self, paragraph: ElementRef<'_>) -> bool {
        let Some(stats) = self.stats(paragraph) else {
            return false;
        };
        let density = stats.link_density();
        if stats.chars > 80 {
            density < 0.25
        } else {
            stats.chars > 0 && density == 0.0 && self.text(paragraph).ends_with('.')
        }
    }

    /// Visible text of an element with whitespace collapsed.
    fn text(&self, element: ElementRef<'_>) -> String {
        let mut raw = String::new();
        for edge in self.visible_edges(element) {
            if let Edge::Open(node) = edge {
                match node.value() {
                    Node::Text(text) => raw.push_str(text),
                    Node::Element(_) => raw.push(' '),
                    _ => {}
                }
            }
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Walk `block`, starting a new paragraph at every block boundary.
    fn collect_paragraphs(&self, block: ElementRef<'_>, paragraphs: &mut Vec<String>) {
        let mut current = String::new();
        for edge in self.visible_edges(block) {
            let (node, opening) = match edge {
                Edge::Open(node) => (node, true),
                Edge::Close(node) => (node, false),
            };
            match node.value() {
                Node::Text(text) if opening => current.push_str(text),
                Node::Element(el) if BLOCK_TAGS.contains(&el.name()) => {
                    flush(paragraphs, &mut current)
                }
                Node::Element(_) => current.push(' '),
                _ => {}
            }
        }
        flush(paragraphs, &mut current);
    }

    /// Serialize `block` back to HTML without its boilerplate subtrees.
    fn write_clean_html(&self, block: ElementRef<'_>, out: &mut String) {
        for edge in self.visible_edges(block) {
            match edge {
                Edge::Open(node) => match node.value() {
                    Node::Text(text) => push_escaped(out, text),
                    Node::Element(el) => {
                        out.push('<');
                        out.push_str(el.name());
                        for (name, value) in el.attrs() {
                            let _ = write!(out, " {name}=\"");
                            push_escaped(out, value);
                            out.push('"');
                        }
                        out.push('>');
                    }
                    _ => {}
                },
                Edge::Close(node) => {
                    if let Node::Element(el) = node.value() {
                        if !VOID_TAGS.contains(&el.name()) {
                            let _ = write!(out, "</{}>", el.name());
                        }
                    }
                }
            }
        }
    }
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

fn tag_weight(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "div" | "main" | "section" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// Class names and id, lowercased, one entry per name.
fn hint_names(element: ElementRef<'_>) -> Vec<String> {
    let el = element.value();
    el.classes()
        .chain(el.id())
        .map(str::to_lowercase)
        .collect()
}

fn has_word(name: &str, words: &[&str]) -> bool {
    name.split(['-', '_']).any(|word| words.contains(&word))
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let names = hint_names(element);
    let mut weight = 0.0;
    if names.iter().any(|n| has_word(n, POSITIVE_HINTS)) {
        weight += 25.0;
    }
    if names.iter().any(|n| has_word(n, NEGATIVE_HINTS)) {
        weight -= 25.0;
    }
    weight
}

// ---------------------------------------------------------------------------
// Exclusion
// ---------------------------------------------------------------------------

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    is_skipped(element) || is_unlikely(element)
}

fn is_skipped(element: ElementRef<'_>) -> bool {
    let el = element.value();
    SKIP_TAGS.contains(&el.name())
        || el.attr("hidden").is_some()
        || el.attr("aria-hidden") == Some("true")
        || el
            .attr("style")
            .is_some_and(|s| s.replace(' ', "").to_lowercase().contains("display:none"))
}

fn is_unlikely(element: ElementRef<'_>) -> bool {
    if matches!(element.value().name(), "body" | "article" | "main") {
        return false;
    }
    let names = hint_names(element);
    let unlikely = names.iter().any(|n| has_word(n, UNLIKELY_HINTS));
    let rescued = names
        .iter()
        .any(|n| has_word(n, MAYBE_HINTS) && !has_word(n, UNLIKELY_HINTS));
    unlikely && !rescued
}

// ---------------------------------------------------------------------------
// Text assembly
// ---------------------------------------------------------------------------

fn flush(paragraphs: &mut Vec<String>, current: &mut String) {
    let paragraph = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
    current.clear();
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
