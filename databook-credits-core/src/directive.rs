//! Documentation directives: contributor and version blocks for markdown pages.
//!
//! Pages embed directives as MyST-style fenced blocks:
//!
//! ````text
//! ```{committers}
//! :blacklist: Publishing Bot, github-actions[bot]
//! :additional_authors: Josh Siegle, Ahad Bawany
//! :aliases: colleenjg--Colleen J. Gillon
//! :role: Committers
//! ```
//! ````
//!
//! [`expand_directives`] replaces every recognised block with its rendered
//! output and leaves everything else, including unknown directives, as is.
//! Each directive produces a small [`Node`] tree which is rendered to markdown.

use indexmap::IndexMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::AttributionConfig;
use crate::contract::{History, RosterEntry, RosterSource};
use crate::error::{CreditsError, Result};
use crate::pipeline::attribute;
use crate::resolve::{parse_aliases, parse_name_set, Blacklist, ALIAS_DELIMITER};
use crate::roster::filter_by_role;

/// Inline and block output of a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Emphasis(String),
    Strong(String),
    Paragraph(Vec<Node>),
    Reference { text: String, uri: String },
    Section {
        id: String,
        title: String,
        children: Vec<Node>,
    },
    LineBlock(Vec<String>),
}

impl Node {
    pub fn to_markdown(&self) -> String {
        self.render(2)
    }

    fn render(&self, heading_level: usize) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Emphasis(text) if text.is_empty() => String::new(),
            Node::Emphasis(text) => format!("*{text}*"),
            Node::Strong(text) => format!("**{text}**"),
            Node::Paragraph(children) => children.iter().map(|c| c.render(heading_level)).collect(),
            Node::Reference { text, uri } => format!("[{text}]({uri})"),
            Node::Section { title, children, .. } => {
                let mut parts = Vec::with_capacity(children.len() + 1);
                if !title.is_empty() {
                    parts.push(format!("{} {}", "#".repeat(heading_level), title));
                }
                parts.extend(children.iter().map(|c| c.render(heading_level + 1)));
                parts.join("\n\n")
            }
            // Backslash line endings are hard breaks in CommonMark.
            Node::LineBlock(lines) => lines.join("\\\n"),
        }
    }
}

/// Renders block-level nodes separated by blank lines.
pub fn render_nodes(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(Node::to_markdown)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Inputs shared by every directive on a page.
pub struct DirectiveContext<'a> {
    pub history: &'a dyn History,
    pub roster: Option<&'a dyn RosterSource>,
    /// Base policy. Directive options override the fields they name.
    pub defaults: &'a AttributionConfig,
}

/// A parsed directive block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveBlock {
    pub name: String,
    pub argument: Option<String>,
    pub options: IndexMap<String, String>,
}

impl DirectiveBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: None,
            options: IndexMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_argument(mut self, argument: &str) -> Self {
        self.argument = Some(argument.to_string());
        self
    }

    fn reject_unknown_options(&self, accepted: &[&str]) -> Result<()> {
        match self.options.keys().find(|k| !accepted.contains(&k.as_str())) {
            Some(option) => Err(CreditsError::UnknownOption {
                directive: self.name.clone(),
                option: option.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Commit history merged with roster and extra names.
    Committers,
    /// Roster names for a role.
    Authors,
    /// Latest release tag, optionally linked.
    Version,
    /// The whole roster as a contributors section.
    AuthorsIndex,
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "committers" => Some(DirectiveKind::Committers),
            "authors" => Some(DirectiveKind::Authors),
            "version" => Some(DirectiveKind::Version),
            "authors_index" => Some(DirectiveKind::AuthorsIndex),
            _ => None,
        }
    }

    pub fn run(self, block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<Node>> {
        debug!(directive = %block.name, options = ?block.options, "Running directive");
        match self {
            DirectiveKind::Committers => committers(block, ctx),
            DirectiveKind::Authors => authors(block, ctx),
            DirectiveKind::Version => version(block, ctx),
            DirectiveKind::AuthorsIndex => authors_index(block, ctx),
        }
    }
}

fn committers(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<Node>> {
    block.reject_unknown_options(&["blacklist", "additional_authors", "aliases", "role"])?;
    let mut config = ctx.defaults.clone();
    if let Some(raw) = block.options.get("blacklist") {
        config.blacklist = parse_name_set(raw).into_iter().collect();
    }
    if let Some(raw) = block.options.get("additional_authors") {
        config.additional_authors = parse_name_set(raw);
    }
    if let Some(raw) = block.options.get("aliases") {
        config.aliases = parse_aliases(raw, ALIAS_DELIMITER)?;
    }
    if let Some(role) = block.options.get("role") {
        config.role = role.clone();
    }

    let report = attribute(ctx.history, ctx.roster, &config)?;
    Ok(vec![Node::Emphasis(report.joined())])
}

fn blacklist_for(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Blacklist {
    match block.options.get("blacklist") {
        Some(raw) => parse_name_set(raw).into_iter().collect(),
        None => ctx.defaults.blacklist.clone(),
    }
}

fn load_roster(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<RosterEntry>> {
    let roster = ctx
        .roster
        .ok_or_else(|| CreditsError::RosterUnavailable(block.name.clone()))?;
    let blacklist = blacklist_for(block, ctx);
    let mut entries = roster.load()?;
    entries.retain(|entry| !blacklist.contains(&entry.name));
    Ok(entries)
}

fn authors(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<Node>> {
    block.reject_unknown_options(&["role", "blacklist"])?;
    let role = block
        .options
        .get("role")
        .map(String::as_str)
        .unwrap_or(ctx.defaults.role.as_str());
    let entries = load_roster(block, ctx)?;
    let names: Vec<String> = filter_by_role(&entries, role).into_iter().collect();
    Ok(vec![Node::Emphasis(names.join(", "))])
}

fn version(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<Node>> {
    block.reject_unknown_options(&[])?;
    let tag = ctx.history.latest_tag()?;
    let inline = match &block.argument {
        Some(uri) => Node::Reference {
            text: tag,
            uri: uri.clone(),
        },
        None => Node::Text(tag),
    };
    Ok(vec![Node::Paragraph(vec![inline])])
}

fn authors_index(block: &DirectiveBlock, ctx: &DirectiveContext<'_>) -> Result<Vec<Node>> {
    block.reject_unknown_options(&["blacklist"])?;
    let entries = load_roster(block, ctx)?;
    let children = entries
        .into_iter()
        .map(|entry| {
            let details = entry
                .fields
                .values()
                .filter(|value| !value.is_empty())
                .cloned()
                .collect();
            Node::Section {
                id: "contributorentry".to_string(),
                title: String::new(),
                children: vec![Node::Strong(entry.name), Node::LineBlock(details)],
            }
        })
        .collect();
    Ok(vec![Node::Section {
        id: "contributorsblock".to_string(),
        title: "Contributors".to_string(),
        children,
    }])
}

fn opening_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"^(`{3,}|:{3,})(?:\{([A-Za-z_][\w-]*)\}[ \t]*(.*?)|.*?)\s*$")
            .expect("fence pattern is valid")
    })
}

fn option_line() -> &'static Regex {
    static OPTION: OnceLock<Regex> = OnceLock::new();
    OPTION.get_or_init(|| Regex::new(r"^:([\w-]+):\s*(.*?)\s*$").expect("option pattern is valid"))
}

/// An opening fence line. `directive` holds the name and argument when the
/// fence opens a `{name}` block; plain code fences have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence<'a> {
    marker: char,
    len: usize,
    directive: Option<(&'a str, &'a str)>,
}

impl<'a> Fence<'a> {
    fn open(line: &'a str) -> Option<Self> {
        let caps = opening_fence().captures(line.trim_start())?;
        let run = caps.get(1)?.as_str();
        let directive = caps
            .get(2)
            .map(|name| (name.as_str(), caps.get(3).map_or("", |arg| arg.as_str())));
        Some(Self {
            marker: run.chars().next()?,
            len: run.len(),
            directive,
        })
    }

    /// A closing fence is a run of the same marker at least as long as the opener.
    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.len && trimmed.chars().all(|c| c == self.marker)
    }

    fn closing_line(&self, lines: &[&str], from: usize) -> Option<usize> {
        lines[from..]
            .iter()
            .position(|line| self.closes(line))
            .map(|offset| from + offset)
    }

    fn block(&self, body: &[&str]) -> Option<DirectiveBlock> {
        let (name, argument) = self.directive?;
        let options = body
            .iter()
            .map_while(|line| option_line().captures(line.trim()))
            .map(|opt| (opt[1].to_string(), opt[2].to_string()))
            .collect();
        Some(DirectiveBlock {
            name: name.to_string(),
            argument: Some(argument.to_string()).filter(|arg| !arg.is_empty()),
            options,
        })
    }
}

/// Replaces every recognised directive block in `document` with its markdown.
///
/// Plain code fences are copied verbatim, so directives shown as examples
/// inside them stay literal. An unclosed fence runs to the end of the document.
pub fn expand_directives(document: &str, ctx: &DirectiveContext<'_>) -> Result<String> {
    let lines: Vec<&str> = document.split_inclusive('\n').collect();
    let mut out = String::with_capacity(document.len());
    let mut expanded = 0usize;
    let mut idx = 0;
    while idx < lines.len() {
        let Some(fence) = Fence::open(lines[idx]) else {
            out.push_str(lines[idx]);
            idx += 1;
            continue;
        };
        let Some(last) = fence.closing_line(&lines, idx + 1) else {
            out.extend(lines[idx..].iter().copied());
            break;
        };
        let first = idx;
        idx = last + 1;

        let Some(block) = fence.block(&lines[first + 1..last]) else {
            out.extend(lines[first..=last].iter().copied());
            continue;
        };
        let Some(kind) = DirectiveKind::from_name(&block.name) else {
            debug!(directive = %block.name, "Leaving unknown directive untouched");
            out.extend(lines[first..=last].iter().copied());
            continue;
        };

        let nodes = kind.run(&block, ctx).map_err(|e| {
            warn!(directive = %block.name, line = first + 1, error = %e, "Directive failed");
            e
        })?;
        out.push_str(&render_nodes(&nodes));
        let closing = lines[last];
        if closing.ends_with("\r\n") {
            out.push_str("\r\n");
        } else if closing.ends_with('\n') {
            out.push('\n');
        }
        expanded += 1;
    }
    info!(expanded, "Expanded documentation directives");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CommitRecord, MockHistory, MockRosterSource};

    fn history_with(records: Vec<CommitRecord>) -> MockHistory {
        let mut history = MockHistory::new();
        history.expect_shortlog().returning(move || records.clone());
        history
            .expect_latest_tag()
            .returning(|| Ok("v1.3.0".to_string()));
        history
    }

    fn roster() -> MockRosterSource {
        let mut roster = MockRosterSource::new();
        roster.expect_load().returning(|| {
            let mut amy = RosterEntry::new("Amy Baker", "Committers, Co-author");
            amy.fields.insert("Affiliation".into(), "Allen Institute".into());
            amy.fields.insert("Email".into(), String::new());
            Ok(vec![
                amy,
                RosterEntry::new("Bob Funder", "Funding"),
                RosterEntry::new("Cy Dee", "Advisor"),
            ])
        });
        roster
    }

    #[test]
    fn committers_block_is_expanded_in_place() {
        let history = history_with(vec![
            CommitRecord::new("colleenjg", 3),
            CommitRecord::new("Publishing Bot", 8),
        ]);
        let defaults = AttributionConfig {
            include_roster: false,
            ..AttributionConfig::default()
        };
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "# Intro\n\n```{committers}\n:blacklist: Publishing Bot\n:additional_authors: Ahad Bawany\n:aliases: colleenjg--Colleen J. Gillon\n```\n\nBody\n";
        let out = expand_directives(doc, &ctx).unwrap();
        assert_eq!(out, "# Intro\n\n*Ahad Bawany, Colleen J. Gillon (3)*\n\nBody\n");
    }

    #[test]
    fn malformed_alias_option_fails_the_render() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "```{committers}\n:aliases: alice-bob\n```\n";
        let err = expand_directives(doc, &ctx).unwrap_err();
        assert!(matches!(err, CreditsError::MalformedAliasSpec(_)));
    }

    #[test]
    fn authors_by_role_and_default_view() {
        let history = history_with(Vec::new());
        let roster = roster();
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: Some(&roster),
            defaults: &defaults,
        };

        let all = DirectiveKind::Authors
            .run(&DirectiveBlock::new("authors"), &ctx)
            .unwrap();
        assert_eq!(all, vec![Node::Emphasis("Amy Baker, Cy Dee".into())]);

        let coauthors = DirectiveKind::Authors
            .run(&DirectiveBlock::new("authors").with_option("role", "Co-author"), &ctx)
            .unwrap();
        assert_eq!(coauthors, vec![Node::Emphasis("Amy Baker".into())]);
    }

    #[test]
    fn authors_without_roster_is_an_error() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let err = DirectiveKind::Authors
            .run(&DirectiveBlock::new("authors"), &ctx)
            .unwrap_err();
        assert!(matches!(err, CreditsError::RosterUnavailable(_)));
    }

    #[test]
    fn version_with_and_without_link() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let plain = DirectiveKind::Version
            .run(&DirectiveBlock::new("version"), &ctx)
            .unwrap();
        assert_eq!(render_nodes(&plain), "v1.3.0");

        let linked = DirectiveKind::Version
            .run(
                &DirectiveBlock::new("version").with_argument("https://example.org/releases"),
                &ctx,
            )
            .unwrap();
        assert_eq!(render_nodes(&linked), "[v1.3.0](https://example.org/releases)");
    }

    #[test]
    fn version_without_tags_fails() {
        let mut history = MockHistory::new();
        history
            .expect_latest_tag()
            .returning(|| Err(CreditsError::UnresolvableVersionTag("no names found".into())));
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let err = expand_directives("```{version}\n```\n", &ctx).unwrap_err();
        assert!(matches!(err, CreditsError::UnresolvableVersionTag(_)));
    }

    #[test]
    fn authors_index_lists_every_row() {
        let history = history_with(Vec::new());
        let roster = roster();
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: Some(&roster),
            defaults: &defaults,
        };
        let nodes = DirectiveKind::AuthorsIndex
            .run(&DirectiveBlock::new("authors_index"), &ctx)
            .unwrap();
        let md = render_nodes(&nodes);
        assert!(md.starts_with("## Contributors\n\n**Amy Baker**\n\nCommitters, Co-author\\\nAllen Institute"));
        assert!(md.contains("**Bob Funder**\n\nFunding"));
    }

    #[test]
    fn unknown_options_are_rejected() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let err = DirectiveKind::Version
            .run(&DirectiveBlock::new("version").with_option("role", "x"), &ctx)
            .unwrap_err();
        assert!(matches!(err, CreditsError::UnknownOption { .. }));
    }

    #[test]
    fn unknown_and_unterminated_blocks_are_left_alone() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "```{note}\nhello\n```\n```{version}\n";
        assert_eq!(expand_directives(doc, &ctx).unwrap(), doc);
    }

    #[test]
    fn colon_fences_and_arguments_parse() {
        let fence = Fence::open(":::{version} https://x.org\n").unwrap();
        assert_eq!(fence.marker, ':');
        assert_eq!(fence.directive, Some(("version", "https://x.org")));
        let lines: Vec<&str> = ":::{version} https://x.org\n:::\n".split_inclusive('\n').collect();
        assert_eq!(fence.closing_line(&lines, 1), Some(1));
    }

    #[test]
    fn plain_fences_have_no_directive() {
        let fence = Fence::open("````markdown\n").unwrap();
        assert_eq!((fence.marker, fence.len, fence.directive), ('`', 4, None));
        assert!(Fence::open("``inline``\n").is_none());
    }

    #[test]
    fn directive_examples_inside_code_fences_stay_literal() {
        // No expectations: the history must not be consulted.
        let history = MockHistory::new();
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "Example usage:\n\n````markdown\n```{version}\n```\n````\n";
        assert_eq!(expand_directives(doc, &ctx).unwrap(), doc);
    }

    #[test]
    fn directive_after_a_code_fence_still_expands() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "```text\n{version}\n```\n\n```{version}\n```\n";
        assert_eq!(
            expand_directives(doc, &ctx).unwrap(),
            "```text\n{version}\n```\n\nv1.3.0\n"
        );
    }

    #[test]
    fn longer_closing_fence_closes_the_block() {
        let history = history_with(Vec::new());
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        assert_eq!(expand_directives("```{version}\n`````\n", &ctx).unwrap(), "v1.3.0\n");
        // A shorter run does not close a longer opener.
        let doc = "````{version}\n```\n";
        assert_eq!(expand_directives(doc, &ctx).unwrap(), doc);
    }

    #[test]
    fn unclosed_fence_swallows_later_openers() {
        let history = MockHistory::new();
        let defaults = AttributionConfig::default();
        let ctx = DirectiveContext {
            history: &history,
            roster: None,
            defaults: &defaults,
        };
        let doc = "```{note}\n".repeat(2_000) + "```{version}\n";
        assert_eq!(expand_directives(&doc, &ctx).unwrap(), doc);
    }
}
