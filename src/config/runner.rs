use crate::config::loader::ConfigError;
use crate::config::schema::{Mode, RuleSetConfig, ValidationError, ValidationIssue};
use crate::query::Rule;
use crate::tree::{frame_documents, NodeKind, NodeTree};
use crate::unique::unique;
use tracing::{debug, info};

/// A rule set whose rules have all been compiled.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    description: Option<String>,
    include_frames: bool,
    entries: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub rule: Rule,
    pub mode: Mode,
}

/// Nodes one named rule located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome<N> {
    pub name: String,
    pub mode: Mode,
    pub nodes: Vec<N>,
}

impl RuleSet {
    pub fn compile(config: &RuleSetConfig) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(config.rules.len());
        let mut issues = Vec::new();
        for definition in &config.rules {
            match definition.compile() {
                Ok(rule) => entries.push(CompiledRule {
                    name: definition.name.clone(),
                    rule,
                    mode: definition.mode,
                }),
                Err(message) => issues.push(ValidationIssue::InvalidRule {
                    rule_name: Some(definition.name.clone()),
                    message,
                }),
            }
        }
        if !issues.is_empty() {
            return Err(ConfigError::Validation {
                path: None,
                source: ValidationError { issues },
            });
        }
        Ok(Self {
            name: config.meta.name.clone(),
            description: config.meta.description.clone(),
            include_frames: config.meta.include_frames,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every rule against `root`, in declaration order.
    ///
    /// With `include_frames`, a document root also searches every frame
    /// document nested under it.
    pub fn run<T: NodeTree + ?Sized>(&self, tree: &T, root: T::Node) -> Vec<RuleOutcome<T::Node>> {
        let mut scopes = vec![root];
        if self.include_frames && tree.kind(root) == NodeKind::Document {
            scopes.extend(frame_documents(tree, root));
        }

        let outcomes: Vec<_> = self
            .entries
            .iter()
            .map(|entry| {
                let nodes = unique(scopes.iter().flat_map(|scope| {
                    let scope = Some(*scope);
                    match entry.mode.traversal() {
                        Some(traversal) => entry.rule.locate(tree, scope, traversal),
                        None => entry.rule.locate_roots(tree, scope),
                    }
                }));
                debug!(rule = %entry.name, matches = nodes.len(), "rule evaluated");
                RuleOutcome {
                    name: entry.name.clone(),
                    mode: entry.mode,
                    nodes,
                }
            })
            .collect();

        info!(
            rule_set = %self.name,
            rules = outcomes.len(),
            scopes = scopes.len(),
            "rule set evaluated"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;
    use crate::tree::MemoryTree;

    fn page() -> (MemoryTree, crate::tree::NodeId) {
        let mut tree = MemoryTree::new();
        let doc = tree.create_document(None);
        let html = tree.element(doc, "html", &[]);
        let body = tree.element(html, "body", &[]);
        let outer = tree.element(body, "div", &[("class", "ad")]);
        tree.element(outer, "div", &[("class", "ad")]);
        let frame = tree.element(body, "iframe", &[]);
        let inner = tree.create_document(None);
        let inner_html = tree.element(inner, "html", &[]);
        let inner_body = tree.element(inner_html, "body", &[]);
        tree.element(inner_body, "div", &[("class", "ad")]);
        tree.attach_frame(frame, inner).unwrap();
        (tree, doc)
    }

    const RULES: &str = r#"
[meta]
name = "ads"

[[rules]]
name = "first"
rule = "cl=ad"

[[rules]]
name = "all"
rule = "cl=ad"
mode = "all"

[[rules]]
name = "roots"
rule = "cl=ad"
mode = "roots"
"#;

    #[test]
    fn runs_in_declaration_order_with_modes() {
        let (tree, doc) = page();
        let set = RuleSet::compile(&load_from_str(RULES).unwrap()).unwrap();
        assert_eq!(set.name(), "ads");
        let outcomes = set.run(&tree, doc);
        let counts: Vec<_> = outcomes
            .iter()
            .map(|o| (o.name.as_str(), o.nodes.len()))
            .collect();
        assert_eq!(counts, vec![("first", 1), ("all", 2), ("roots", 1)]);
    }

    #[test]
    fn frames_are_searched_when_enabled() {
        let (tree, doc) = page();
        let text = RULES.replace("name = \"ads\"", "name = \"ads\"\ninclude_frames = true");
        let set = RuleSet::compile(&load_from_str(&text).unwrap()).unwrap();
        let outcomes = set.run(&tree, doc);
        assert_eq!(outcomes[0].nodes.len(), 2);
        assert_eq!(outcomes[1].nodes.len(), 3);
    }
}
