//! Domain vocabulary used to broaden queries.
//!
//! Keys are single lowercase tokens. A query token that equals a key pulls in every
//! related term listed for it.

use std::collections::{BTreeMap, HashMap};

type Group = (&'static str, &'static [&'static str]);

const DOMAIN: &[Group] = &[
    ("nabia", &["federation", "memchain", "orchestration", "agent", "coordination", "protocol", "cognitive", "intelligence"]),
    ("claude", &["assistant", "conversation", "chat", "ai", "llm", "dialogue", "anthropic", "subagent"]),
    ("linear", &["issue", "project", "task", "ticket", "workflow", "development", "tracking", "milestone"]),
    ("federation", &["agent", "coordination", "protocol", "handoff", "orchestration", "distributed", "network", "mesh"]),
    ("memory", &["storage", "retrieval", "context", "persistent", "ephemeral", "knowledge", "cache", "state"]),
    ("search", &["query", "find", "lookup", "discover", "filter", "match", "locate", "identify"]),
    ("integration", &["api", "webhook", "connection", "sync", "bridge", "interface", "mcp", "proxy"]),
    ("architecture", &["design", "pattern", "structure", "framework", "system", "blueprint", "topology"]),
    ("git", &["commit", "branch", "merge", "repository", "version", "control", "diff", "pull request"]),
    ("riff", &["search", "uuid", "jsonl", "conversation", "logs", "cli", "tool", "query"]),
    ("agent", &["subagent", "orchestrator", "delegation", "task", "autonomous", "cognitive", "intelligent"]),
    ("oauth", &["authentication", "authorization", "token", "proxy", "grok", "notion", "api"]),
];

/// Verbs expand to their three closest synonyms.
const ACTIONS: &[Group] = &[
    ("find", &["search", "locate", "discover"]),
    ("search", &["find", "query", "scan"]),
    ("discuss", &["talk", "conversation", "dialogue"]),
    ("implement", &["build", "create", "develop"]),
    ("configure", &["setup", "initialize", "customize"]),
    ("integrate", &["connect", "link", "bridge"]),
    ("debug", &["troubleshoot", "diagnose", "fix"]),
];

/// Several trigger words share one related group.
const CONTEXTUAL: &[(&[&str], &[&str])] = &[
    (&["conversation", "chat", "talk"], &["message", "dialogue", "transcript", "session", "interaction"]),
    (&["project", "build", "develop"], &["implementation", "feature", "module", "component", "service"]),
    (&["error", "issue", "problem"], &["bug", "fault", "exception", "failure", "crash"]),
    (&["config", "setup", "install"], &["configuration", "initialization", "deployment", "environment"]),
];

const SEMANTIC: &[Group] = &[
    ("agent", &["bot", "assistant", "worker", "service", "process"]),
    ("system", &["platform", "framework", "infrastructure", "architecture"]),
    ("data", &["information", "content", "payload", "dataset", "record"]),
    ("process", &["workflow", "pipeline", "procedure", "operation", "task"]),
    ("network", &["connection", "link", "channel", "communication", "protocol"]),
    ("interface", &["api", "endpoint", "contract", "specification", "definition"]),
    ("state", &["status", "condition", "mode", "phase", "situation"]),
    ("event", &["message", "signal", "notification", "trigger", "callback"]),
    ("cli", &["command", "terminal", "shell", "console", "interface"]),
    ("json", &["jsonl", "data", "format", "structure", "payload"]),
    ("uuid", &["identifier", "id", "key", "reference", "unique"]),
];

/// Token to related-terms table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// An empty table; expansion then only splits and tokenizes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in vocabulary for coding-assistant conversations.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (key, terms) in DOMAIN.iter().chain(ACTIONS).chain(SEMANTIC) {
            table.add(key, terms.iter().copied());
        }
        for (triggers, terms) in CONTEXTUAL {
            for trigger in *triggers {
                table.add(trigger, terms.iter().copied());
            }
        }
        table
    }

    pub fn from_entries<K, I, T>(entries: impl IntoIterator<Item = (K, I)>) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut table = Self::empty();
        for (key, terms) in entries {
            table.add(key.as_ref(), terms);
        }
        table
    }

    /// Built-in vocabulary plus user groups from configuration.
    pub fn with_overrides(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table = Self::builtin();
        for (key, terms) in extra {
            table.add(key, terms);
        }
        table
    }

    /// Append `terms` to `key`, skipping ones already present.
    pub fn add<I, T>(&mut self, key: &str, terms: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let slot = self.entries.entry(key.clone()).or_default();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && term != key && !slot.contains(&term) {
                slot.push(term);
            }
        }
    }

    pub fn lookup(&self, token: &str) -> &[String] {
        self.entries
            .get(&token.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
