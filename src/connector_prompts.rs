//! Static starter-prompt catalogue.
//!
//! A small built-in set of reusable prompt templates indexed alongside
//! the live sources so retrieval can surface them next to documentation
//! and code. Bodies are inline, so no fetch step is needed.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SourceItem;
use crate::traits::Connector;

struct StarterPrompt {
    id: &'static str,
    title: &'static str,
    body: &'static str,
}

const STARTER_PROMPTS: &[StarterPrompt] = &[
    StarterPrompt {
        id: "prompt-explain-service",
        title: "Explain a service",
        body: "Explain what the {service} service does, which other services it \
depends on, and which teams own it. Cite the documents you base the answer on.",
    },
    StarterPrompt {
        id: "prompt-summarize-runbook",
        title: "Summarize a runbook",
        body: "Summarize the runbook for {scenario} as a numbered checklist an \
on-call engineer can follow under time pressure. Keep each step to one sentence.",
    },
    StarterPrompt {
        id: "prompt-find-owner",
        title: "Find the owner",
        body: "Who owns {component}? Answer with the owning team, the primary \
contact channel, and the document that states the ownership.",
    },
    StarterPrompt {
        id: "prompt-code-walkthrough",
        title: "Code walkthrough",
        body: "Walk through the code that implements {feature}. List the entry \
point, the main types involved, and the files a new contributor should read first.",
    },
    StarterPrompt {
        id: "prompt-impact-analysis",
        title: "Impact analysis",
        body: "If we change {interface}, which modules, configs, and documents \
are affected? Group the findings by how risky the change is for each of them.",
    },
    StarterPrompt {
        id: "prompt-draft-adr",
        title: "Draft an ADR",
        body: "Draft an architecture decision record for {decision}: context, \
options considered, decision, and consequences. Base the context section on the \
indexed documentation.",
    },
    StarterPrompt {
        id: "prompt-onboarding-plan",
        title: "Onboarding plan",
        body: "Create a one-week onboarding reading plan for a new engineer \
joining the {team} team, ordered from overview documents to the code they will \
touch first.",
    },
];

pub struct PromptsConnector;

impl PromptsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PromptsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for PromptsConnector {
    fn name(&self) -> &str {
        "starter"
    }

    fn description(&self) -> &str {
        "Built-in starter prompt templates"
    }

    fn connector_type(&self) -> &str {
        "prompts"
    }

    async fn scan(&self) -> Result<Vec<SourceItem>> {
        let source = self.source_label();
        Ok(STARTER_PROMPTS
            .iter()
            .map(|p| SourceItem {
                source: source.clone(),
                source_id: p.id.to_string(),
                path: format!("prompts/{}", p.id),
                area: p.title.to_string(),
                body: Some(p.body.to_string()),
            })
            .collect())
    }
}
