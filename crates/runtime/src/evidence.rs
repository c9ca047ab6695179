use serde::Deserialize;
use tracing::debug;

use crate::{EventKind, InboundEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Link,
    /// Also used for any `type` other than `link`.
    #[default]
    #[serde(other)]
    Document,
}

/// A supporting reference shown next to the generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub id: usize,
    pub kind: EvidenceKind,
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    /// Markdown body for documents.
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvidencePayload {
    #[serde(rename = "type", default)]
    kind: EvidenceKind,
    title: String,
    source: Option<String>,
    url: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

/// Evidence list with a single selected item.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBoard {
    items: Vec<Evidence>,
    selected: Option<usize>,
}

impl EvidenceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board pre-filled with placeholder references, standing in for a real
    /// evidence feed.
    pub fn with_samples() -> Self {
        let mut board = Self::new();
        board.push(
            EvidenceKind::Document,
            "Research Report on AI Ethics",
            Some("Stanford University"),
            None,
            None,
            Some(
                "# AI Ethics Report\n\nThis document contains key findings regarding ethical \
                 considerations in AI development...\n\n## Key Principles\n\n- Transparency\n\
                 - Fairness\n- Privacy\n- Security\n\nAI systems should be designed with these \
                 principles in mind to ensure responsible deployment and usage.",
            ),
        );
        board.push(
            EvidenceKind::Link,
            "Latest Advances in LLMs",
            None,
            Some("https://example.com/llm-advances"),
            Some(
                "This academic paper discusses the most recent developments in Large Language \
                 Models and their implications for various domains.",
            ),
            None,
        );
        board.push(
            EvidenceKind::Document,
            "Multi-Agent Systems Overview",
            Some("MIT Research"),
            None,
            None,
            Some(
                "# Multi-Agent Systems\n\nThis document provides an overview of multi-agent \
                 systems and their applications in solving complex problems.\n\n## Applications\
                 \n\n- Distributed problem solving\n- Resource allocation\n- Autonomous systems\n\
                 - Collaborative intelligence\n\nThe coordination mechanisms between agents \
                 form the foundation of effective multi-agent systems.",
            ),
        );
        board
    }

    fn push(
        &mut self,
        kind: EvidenceKind,
        title: &str,
        source: Option<&str>,
        url: Option<&str>,
        description: Option<&str>,
        content: Option<&str>,
    ) {
        self.items.push(Evidence {
            id: self.items.len() + 1,
            kind,
            title: title.to_string(),
            source: source.map(str::to_string),
            url: url.map(str::to_string),
            description: description.map(str::to_string),
            content: content.map(str::to_string),
        });
    }

    /// Add the reference carried by an `evidence_found` event.  Events of
    /// other kinds, or without a `title`, are ignored.
    pub fn record(&mut self, event: &InboundEvent) -> bool {
        if event.kind != EventKind::EvidenceFound {
            return false;
        }
        let payload = match serde_json::from_value::<EvidencePayload>(event.raw.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(%err, "evidence payload left off the board");
                return false;
            }
        };
        self.items.push(Evidence {
            id: self.items.len() + 1,
            kind: payload.kind,
            title: payload.title,
            source: payload.source,
            url: payload.url,
            description: payload.description,
            content: payload.content,
        });
        true
    }

    pub fn items(&self) -> &[Evidence] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn show(&mut self, index: usize) -> Option<&Evidence> {
        if index < self.items.len() {
            self.selected = Some(index);
        }
        self.selected()
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Evidence> {
        self.selected.and_then(|idx| self.items.get(idx))
    }
}
