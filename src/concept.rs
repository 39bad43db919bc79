use tracing::trace;

use crate::atom::Atom;
use crate::body::Body;
use crate::fact::{Fact, Projection};
use crate::rule::Rule;

/// Probes currently being expanded on this resolution path.
///
/// Rule expansion re-enters concept resolution for every subgoal, and a
/// failing subgoal can reproduce its own probe verbatim further down the
/// path. A repeated in-flight probe can never contribute an answer its
/// first occurrence would not already produce, so it is pruned instead of
/// looped on. Probes whose constraints keep changing are not tracked;
/// genuinely divergent rules stay divergent.
#[derive(Debug, Default)]
pub(crate) struct ProbeStack {
    frames: Vec<ProbeFrame>,
}

#[derive(Debug)]
struct ProbeFrame {
    action: Atom,
    constraint: Vec<(Atom, Atom)>,
    targets: Vec<Atom>,
}

impl ProbeStack {
    fn holds(&self, action: Atom, constraint: &[(Atom, Atom)], targets: &[Atom]) -> bool {
        self.frames.iter().any(|frame| {
            frame.action == action
                && frame.constraint.len() == constraint.len()
                && constraint.iter().all(|pair| frame.constraint.contains(pair))
                && frame.targets.len() == targets.len()
                && targets.iter().all(|role| frame.targets.contains(role))
        })
    }

    fn push(&mut self, action: Atom, constraint: &[(Atom, Atom)], targets: &[Atom]) {
        self.frames.push(ProbeFrame {
            action,
            constraint: constraint.to_vec(),
            targets: targets.to_vec(),
        });
    }

    fn pop(&mut self) {
        self.frames.pop();
    }
}

/// All facts and rules sharing one action. Append-only: entries are never
/// removed or edited after insertion.
#[derive(Debug)]
pub struct Concept {
    action: Atom,
    facts: Vec<Fact>,
    rules: Vec<Rule>,
}

impl Concept {
    pub fn new(action: Atom) -> Self {
        Self {
            action,
            facts: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn action(&self) -> Atom {
        self.action
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Inserts a ground record unless an existing fact already matches the
    /// record's own role→value pairs. Duplicates are silently discarded,
    /// which makes fact loading idempotent.
    pub fn append_fact(&mut self, fact: Fact) {
        let pairs: Vec<(Atom, Atom)> = fact.roles().collect();
        if self.facts.iter().any(|existing| existing.matches(&pairs)) {
            trace!("duplicate fact discarded");
            return;
        }
        self.facts.push(fact);
    }

    pub fn append_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Answers a query: matching facts first, in insertion order; only when
    /// no fact matches are the rules expanded, each in insertion order.
    /// Rules act as fallback definitions, so a ground answer short-circuits
    /// them.
    pub fn resolve(
        &self,
        body: &Body,
        constraint: &[(Atom, Atom)],
        targets: &[Atom],
    ) -> Vec<Projection> {
        let mut active = ProbeStack::default();
        self.resolve_inner(body, constraint, targets, &mut active)
    }

    pub(crate) fn resolve_inner(
        &self,
        body: &Body,
        constraint: &[(Atom, Atom)],
        targets: &[Atom],
        active: &mut ProbeStack,
    ) -> Vec<Projection> {
        let mut results: Vec<Projection> = self
            .facts
            .iter()
            .filter(|fact| fact.matches(constraint))
            .map(|fact| fact.project(targets))
            .collect();
        if results.is_empty() && !self.rules.is_empty() {
            if active.holds(self.action, constraint, targets) {
                trace!("repeated in-flight probe pruned");
                return results;
            }
            active.push(self.action, constraint, targets);
            for rule in &self.rules {
                results.extend(rule.resolve_inner(body, constraint, targets, active));
            }
            active.pop();
        }
        trace!(answers = results.len(), "concept resolved");
        results
    }
}
