use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::atom::{Atom, AtomTable};
use crate::codec;
use crate::concept::Concept;
use crate::error::KbError;
use crate::fact::{Fact, Projection};
use crate::rule::{Clause, Rule};

/// The knowledge base: sole owner of the atom table and every concept.
///
/// Loading mutates through `&mut self`; queries run through `&self` and
/// are pure over the stored facts and rules, so the borrow checker
/// enforces the single-writer discipline directly.
#[derive(Debug, Default)]
pub struct Body {
    atoms: AtomTable,
    concepts: Vec<Concept>,
    index: HashMap<Atom, usize>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a word, registering it on first sight.
    pub fn intern(&mut self, word: &str) -> Atom {
        self.atoms.intern(word)
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    /// The concept behind an action atom, if any facts or rules were ever
    /// loaded under it.
    pub fn concept(&self, action: Atom) -> Option<&Concept> {
        self.index.get(&action).map(|&i| &self.concepts[i])
    }

    /// Concepts in insertion order, for persistence.
    pub(crate) fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    fn concept_mut(&mut self, action: Atom) -> &mut Concept {
        let idx = match self.index.get(&action) {
            Some(&i) => i,
            None => {
                let i = self.concepts.len();
                self.concepts.push(Concept::new(action));
                self.index.insert(action, i);
                i
            }
        };
        &mut self.concepts[idx]
    }

    pub(crate) fn ensure_concept(&mut self, action: Atom) {
        self.concept_mut(action);
    }

    pub(crate) fn insert_fact(&mut self, action: Atom, fact: Fact) {
        self.concept_mut(action).append_fact(fact);
    }

    pub(crate) fn insert_rule(&mut self, action: Atom, rule: Rule) {
        self.concept_mut(action).append_rule(rule);
    }

    /// Loads one ground fact. Arguments are `role:value` strings, split on
    /// the first colon; values must not be variables.
    pub fn add_fact(&mut self, action: &str, args: &[&str]) -> Result<(), KbError> {
        debug!(action, args = args.len(), "loading fact");
        let action = self.atoms.intern(action);
        let pairs = self.parse_args(args, false)?;
        self.concept_mut(action).append_fact(Fact::new(pairs));
        Ok(())
    }

    /// Loads one rule. The head names the owning concept; `$`-prefixed
    /// values denote variables in both the head and the subgoals.
    pub fn add_rule(
        &mut self,
        head: (&str, &[&str]),
        subgoals: &[(&str, &[&str])],
    ) -> Result<(), KbError> {
        let (action, head_args) = head;
        debug!(action, subgoals = subgoals.len(), "loading rule");
        let action = self.atoms.intern(action);
        let head = Fact::new(self.parse_args(head_args, true)?);
        let mut clauses = Vec::with_capacity(subgoals.len());
        for &(sub_action, sub_args) in subgoals {
            let sub_action = self.atoms.intern(sub_action);
            let pattern = Fact::new(self.parse_args(sub_args, true)?);
            clauses.push(Clause::new(sub_action, pattern));
        }
        self.concept_mut(action).append_rule(Rule::new(head, clauses));
        Ok(())
    }

    /// Runs a typed query. `None` means the action has no concept; an
    /// empty vector means the query ran and produced no answers.
    pub fn resolve(
        &self,
        action: Atom,
        constraint: &[(Atom, Atom)],
        targets: &[Atom],
    ) -> Option<Vec<Projection>> {
        let concept = self.concept(action)?;
        info!(action = self.atoms.resolve(action), "resolving");
        Some(concept.resolve(self, constraint, targets))
    }

    /// String-level convenience query: interns its inputs, runs
    /// [`Body::resolve`], and renders every answer back to words. Roles the
    /// matched tuple lacked render as `None`.
    pub fn resolve_strings(
        &mut self,
        action: &str,
        constraint: &[&str],
        targets: &[&str],
    ) -> Result<Option<Vec<HashMap<String, Option<String>>>>, KbError> {
        let action = self.atoms.intern(action);
        let constraint = self.parse_args(constraint, true)?;
        let targets: Vec<Atom> = targets.iter().map(|t| self.atoms.intern(t)).collect();
        let Some(rows) = self.resolve(action, &constraint, &targets) else {
            return Ok(None);
        };
        let rendered = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(role, value)| {
                        (
                            self.atoms.resolve(role).to_owned(),
                            value.map(|v| self.atoms.resolve(v).to_owned()),
                        )
                    })
                    .collect()
            })
            .collect();
        Ok(Some(rendered))
    }

    /// Writes the whole knowledge base to `path` in the binary record
    /// format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KbError> {
        codec::save(self, path.as_ref())
    }

    /// Restores a knowledge base written by [`Body::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KbError> {
        codec::load(path.as_ref())
    }

    fn parse_args(
        &mut self,
        args: &[&str],
        allow_variables: bool,
    ) -> Result<Vec<(Atom, Atom)>, KbError> {
        let mut pairs = Vec::with_capacity(args.len());
        for arg in args {
            let Some((role, value)) = arg.split_once(':') else {
                return Err(KbError::MalformedArgument {
                    arg: (*arg).to_owned(),
                });
            };
            if role.is_empty() || value.is_empty() {
                return Err(KbError::MalformedArgument {
                    arg: (*arg).to_owned(),
                });
            }
            if !allow_variables && value.starts_with('$') {
                return Err(KbError::VariableInFact {
                    word: value.to_owned(),
                });
            }
            pairs.push((self.atoms.intern(role), self.atoms.intern(value)));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The arithmetic-successor fixture: facts for 1+n and a rule that
    /// decomposes x+y into three successor steps.
    fn successor_body() -> Body {
        let mut body = Body::new();
        for (i, r) in [("1", "2"), ("2", "3"), ("3", "4"), ("4", "5")] {
            let iobj = format!("iobj:{i}");
            let result = format!("result:{r}");
            body.add_fact("plus", &["dobj:1", &iobj, &result]).unwrap();
        }
        body.add_rule(
            ("plus", &["dobj:$x", "iobj:$y", "result:$z"]),
            &[
                ("plus", &["dobj:1", "iobj:$a", "result:$x"]),
                ("plus", &["dobj:$a", "iobj:$y", "result:$b"]),
                ("plus", &["dobj:1", "iobj:$b", "result:$z"]),
            ],
        )
        .unwrap();
        body
    }

    fn answers(
        body: &mut Body,
        action: &str,
        constraint: &[&str],
        targets: &[&str],
    ) -> Option<Vec<HashMap<String, Option<String>>>> {
        body.resolve_strings(action, constraint, targets).unwrap()
    }

    fn row(pairs: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn test_fact_hit() {
        let mut body = successor_body();
        let got = answers(&mut body, "plus", &["dobj:1", "iobj:2"], &["result"]);
        assert_eq!(got, Some(vec![row(&[("result", Some("3"))])]));
    }

    #[test]
    fn test_fact_hit_via_non_head_roles() {
        let mut body = successor_body();
        let got = answers(&mut body, "plus", &["iobj:3", "result:4"], &["dobj"]);
        assert_eq!(got, Some(vec![row(&[("dobj", Some("1"))])]));
    }

    #[test]
    fn test_rule_chain_binds_intermediates() {
        let mut body = successor_body();
        // No ground fact for 2+3; the rule forces a=1, b=4, z=5.
        let got = answers(&mut body, "plus", &["dobj:2", "iobj:3"], &["result"]);
        assert_eq!(got, Some(vec![row(&[("result", Some("5"))])]));
    }

    #[test]
    fn test_rule_prunes_when_first_subgoal_fails() {
        let mut body = successor_body();
        let got = answers(&mut body, "plus", &["dobj:7", "iobj:7"], &["result"]);
        assert_eq!(got, Some(vec![]));
    }

    #[test]
    fn test_unknown_action_is_soft() {
        let mut body = successor_body();
        let got = answers(&mut body, "minus", &["dobj:1", "iobj:1"], &["result"]);
        assert_eq!(got, None);
    }

    #[test]
    fn test_facts_short_circuit_rules() {
        let mut body = successor_body();
        // 1+2 has both a ground fact and a rule derivation; only the fact
        // answer may surface.
        let got = answers(&mut body, "plus", &["dobj:1", "iobj:2"], &["result"]).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_duplicate_fact_is_discarded() {
        let mut body = Body::new();
        body.add_fact("plus", &["dobj:1", "iobj:1", "result:2"]).unwrap();
        body.add_fact("plus", &["dobj:1", "iobj:1", "result:2"]).unwrap();
        let action = body.intern("plus");
        assert_eq!(body.concept(action).unwrap().facts().len(), 1);
    }

    #[test]
    fn test_malformed_argument_is_rejected() {
        let mut body = Body::new();
        for bad in ["noseparator", ":value", "role:"] {
            let err = body.add_fact("plus", &[bad]).unwrap_err();
            assert!(matches!(err, KbError::MalformedArgument { .. }), "{bad}");
        }
    }

    #[test]
    fn test_variable_valued_fact_is_rejected() {
        let mut body = Body::new();
        let err = body.add_fact("plus", &["dobj:$x"]).unwrap_err();
        assert!(matches!(err, KbError::VariableInFact { .. }));
    }

    #[test]
    fn test_dangling_subgoal_action_prunes() {
        let mut body = Body::new();
        body.add_rule(
            ("goal", &["out:$x"]),
            &[("nowhere", &["out:$x"])],
        )
        .unwrap();
        let got = answers(&mut body, "goal", &[], &["out"]);
        assert_eq!(got, Some(vec![]));
    }

    #[test]
    fn test_absent_projection_rebinds_downstream() {
        let mut body = Body::new();
        // The first subgoal matches a fact without `b`, leaving $v unbound;
        // the second subgoal must capture $v afresh instead of constraining
        // on a phantom value.
        body.add_fact("p", &["a:1"]).unwrap();
        body.add_fact("r", &["k:9", "out:10"]).unwrap();
        body.add_rule(
            ("q", &["res:$w"]),
            &[
                ("p", &["a:1", "b:$v"]),
                ("r", &["k:$v", "out:$w"]),
            ],
        )
        .unwrap();
        let got = answers(&mut body, "q", &[], &["res"]);
        assert_eq!(got, Some(vec![row(&[("res", Some("10"))])]));
    }

    #[test]
    fn test_duplicate_head_variable_stays_consistent() {
        let mut body = Body::new();
        body.add_fact("id", &["k:5"]).unwrap();
        body.add_rule(
            ("same", &["a:$x", "b:$x"]),
            &[("id", &["k:$x"])],
        )
        .unwrap();
        let got = answers(&mut body, "same", &["a:5"], &["b"]);
        assert_eq!(got, Some(vec![row(&[("b", Some("5"))])]));
    }

    #[test]
    fn test_duplicate_head_roles_seed_from_first_role() {
        let mut body = Body::new();
        body.add_fact("id", &["k:5"]).unwrap();
        body.add_rule(
            ("same", &["a:$x", "b:$x"]),
            &[("id", &["k:$x"])],
        )
        .unwrap();
        // Both roles carry $x; the value supplied for `a`, the
        // first-declared role, is the one that binds.
        let got = answers(&mut body, "same", &["a:5", "b:6"], &["b"]);
        assert_eq!(got, Some(vec![row(&[("b", Some("5"))])]));
    }

    #[test]
    fn test_conflicting_binding_prunes_branch() {
        let mut body = Body::new();
        body.add_fact("left", &["v:1"]).unwrap();
        body.add_fact("right", &["v:2"]).unwrap();
        // $x binds to 1 in the first subgoal; the second then probes
        // right(v:1), which no fact satisfies.
        body.add_rule(
            ("both", &["out:$x"]),
            &[("left", &["v:$x"]), ("right", &["v:$x"])],
        )
        .unwrap();
        let got = answers(&mut body, "both", &[], &["out"]);
        assert_eq!(got, Some(vec![]));
    }

    #[test]
    fn test_rule_fans_out_over_multiple_matches() {
        let mut body = Body::new();
        body.add_fact("parent", &["of:ann", "is:bea"]).unwrap();
        body.add_fact("parent", &["of:ann", "is:cal"]).unwrap();
        body.add_rule(
            ("child", &["of:$p", "is:$c"]),
            &[("parent", &["of:$p", "is:$c"])],
        )
        .unwrap();
        let got = answers(&mut body, "child", &["of:ann"], &["is"]).unwrap();
        assert_eq!(
            got,
            vec![
                row(&[("is", Some("bea"))]),
                row(&[("is", Some("cal"))]),
            ]
        );
    }
}
