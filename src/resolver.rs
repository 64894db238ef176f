//! Reference Resolution
//!
//! Flattens every reference leaf of a [`Forest`] into the plain or templated
//! text at the end of its chain. Each path is walked at most once: results,
//! including failures, are memoized, and a path met again while its own
//! chain is still open is a cycle.
//!
//! The pass runs over the whole forest at once, so a reference may point
//! into any namespace regardless of load order. `common` is an ordinary
//! namespace here.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::{BTreeMap, HashMap};

use crate::catalog::Catalog;
use crate::config::ResolverConfig;
use crate::error::{
    BuildFailure, CycleError, SchemaError, SchemaErrorKind, UnresolvedReferenceError,
};
use crate::graph::ReferenceGraph;
use crate::loader::Forest;
use crate::model::{Group, LeafText, Node, QualifiedPath, ResolvedText};

/// Memoized outcome for a reference path
#[derive(Debug, Clone)]
enum Memo {
    Resolved(ResolvedText),
    /// The chain through this path failed; the cause is already reported
    Failed,
}

/// Resolve every reference in `forest`.
///
/// On failure every fatal error found in the pass is returned, one per root
/// cause.
pub fn resolve_forest(
    forest: &Forest,
    config: &ResolverConfig,
) -> Result<(Catalog, ReferenceGraph), Vec<BuildFailure>> {
    let mut resolver = Resolver {
        forest,
        config,
        memo: HashMap::new(),
        failures: Vec::new(),
        graph: ReferenceGraph::new(),
        leaf_paths: None,
    };

    let mut namespaces = BTreeMap::new();
    for namespace in forest.namespaces() {
        let root_path = QualifiedPath::root(namespace.id.clone());
        if let Some(resolved) = resolver.resolve_node(&namespace.root, &root_path) {
            tracing::debug!(namespace = %namespace.id, leaves = resolved.leaf_count(), "resolved namespace");
            namespaces.insert(namespace.id.clone(), resolved);
        }
    }

    if !resolver.failures.is_empty() {
        tracing::warn!(errors = resolver.failures.len(), "reference resolution failed");
        return Err(resolver.failures);
    }

    let catalog = Catalog::from_namespaces(namespaces);
    tracing::info!(
        namespaces = forest.len(),
        leaves = catalog.len(),
        references = resolver.graph.reference_count(),
        fingerprint = catalog.fingerprint().short(),
        "resolved catalog"
    );
    Ok((catalog, resolver.graph))
}

struct Resolver<'f> {
    forest: &'f Forest,
    config: &'f ResolverConfig,
    memo: HashMap<QualifiedPath, Memo>,
    failures: Vec<BuildFailure>,
    graph: ReferenceGraph,
    /// Every leaf path as a string, built on the first dangling reference
    leaf_paths: Option<Vec<String>>,
}

impl<'f> Resolver<'f> {
    /// Resolved copy of `node`, or `None` if anything below it failed
    fn resolve_node(
        &mut self,
        node: &'f Node<LeafText>,
        path: &QualifiedPath,
    ) -> Option<Node<ResolvedText>> {
        match node {
            Node::Leaf(LeafText::Plain(text)) => Some(Node::Leaf(ResolvedText::Plain(text.clone()))),
            Node::Leaf(LeafText::Templated(template)) => {
                Some(Node::Leaf(ResolvedText::Templated(template.clone())))
            }
            Node::Leaf(LeafText::Reference(_)) => self.resolve_path(path).map(Node::Leaf),
            Node::Group(children) => {
                let mut group = Group::new();
                let mut complete = true;
                for (key, child) in children {
                    match self.resolve_node(child, &path.child(key)) {
                        Some(resolved) => {
                            group.insert(key.clone(), resolved);
                        }
                        None => complete = false,
                    }
                }
                complete.then_some(Node::Group(group))
            }
        }
    }

    /// Follow the chain starting at `start` to its terminal text.
    ///
    /// Every path on the chain is memoized with the outcome, so a later walk
    /// through any of them stops immediately.
    fn resolve_path(&mut self, start: &QualifiedPath) -> Option<ResolvedText> {
        let mut chain: Vec<QualifiedPath> = Vec::new();
        let mut on_chain: HashMap<QualifiedPath, usize> = HashMap::new();
        let mut current = start.clone();
        let forest = self.forest;

        let outcome = loop {
            match self.memo.get(&current) {
                Some(Memo::Resolved(text)) => break Some(text.clone()),
                Some(Memo::Failed) => break None,
                None => {}
            }

            if let Some(&position) = on_chain.get(&current) {
                let cycle = chain[position..].to_vec();
                tracing::debug!(length = cycle.len(), start = %cycle[0], "reference cycle");
                self.failures.push(CycleError { cycle }.into());
                break None;
            }

            match forest.lookup(&current) {
                Some(Node::Leaf(LeafText::Plain(text))) => break Some(ResolvedText::Plain(text.clone())),
                Some(Node::Leaf(LeafText::Templated(template))) => {
                    break Some(ResolvedText::Templated(template.clone()))
                }
                Some(Node::Leaf(LeafText::Reference(target))) => {
                    let next = target.qualify(&current.namespace, &self.config.component_prefix, |path| {
                        forest.lookup(path).is_some()
                    });
                    self.graph.add_reference(&current, &next);
                    on_chain.insert(current.clone(), chain.len());
                    chain.push(current);
                    current = next;
                }
                Some(Node::Group(_)) => {
                    let from = chain.last().cloned().unwrap_or_else(|| start.clone());
                    self.failures.push(
                        SchemaError::new(from, SchemaErrorKind::ReferenceToGroup { target: current }).into(),
                    );
                    break None;
                }
                None => {
                    let from = chain.last().cloned().unwrap_or_else(|| start.clone());
                    let suggestion = self.suggest(&current);
                    self.failures.push(
                        UnresolvedReferenceError {
                            from,
                            target: current,
                            suggestion,
                        }
                        .into(),
                    );
                    break None;
                }
            }
        };

        let memo = match &outcome {
            Some(text) => Memo::Resolved(text.clone()),
            None => Memo::Failed,
        };
        for path in chain {
            self.memo.insert(path, memo.clone());
        }
        outcome
    }

    /// Closest existing leaf path to a dangling target
    fn suggest(&mut self, target: &QualifiedPath) -> Option<QualifiedPath> {
        if !self.config.suggest_targets {
            return None;
        }
        let forest = self.forest;
        let candidates = self.leaf_paths.get_or_insert_with(|| {
            forest.leaf_paths().iter().map(ToString::to_string).collect()
        });

        let matcher = SkimMatcherV2::default();
        let query = target.to_string();
        candidates
            .iter()
            .filter_map(|candidate| {
                matcher
                    .fuzzy_match(candidate, &query)
                    .map(|score| (score, candidate))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .and_then(|(_, candidate)| QualifiedPath::parse(candidate))
    }
}
