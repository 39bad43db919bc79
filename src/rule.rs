use std::collections::HashMap;

use tracing::{debug, trace};

use crate::atom::Atom;
use crate::body::Body;
use crate::concept::ProbeStack;
use crate::fact::{Fact, Projection};

/// One subgoal of a rule body: an action plus a role pattern whose values
/// may be constants or variables. The action is looked up in the enclosing
/// body by atom identity when the rule runs; a dangling action simply
/// yields no projections.
#[derive(Debug, Clone)]
pub struct Clause {
    action: Atom,
    pattern: Fact,
}

impl Clause {
    pub fn new(action: Atom, pattern: Fact) -> Self {
        Self { action, pattern }
    }

    pub fn action(&self) -> Atom {
        self.action
    }

    pub fn pattern(&self) -> &Fact {
        &self.pattern
    }
}

/// Bindings along one search path. Absence means unbound; once a variable
/// is bound it is never rewritten, so a later subgoal that disagrees sees
/// its value as a constant constraint and prunes the path instead.
type Env = HashMap<Atom, Atom>;

/// A Horn rule: a head tuple entailed by an ordered conjunction of subgoal
/// clauses.
///
/// Every variable is classified at construction. Head variables sit in a
/// variable-valued head role and are seeded from the caller's constraint;
/// inplace variables first appear in some subgoal and receive their
/// bindings during expansion. The same variable may occupy several head
/// roles; each occurrence is recorded, and constraint monotonicity keeps
/// their bindings consistent.
#[derive(Debug, Clone)]
pub struct Rule {
    head: Fact,
    head_vars: Vec<(Atom, Atom)>,
    inplace: Vec<Atom>,
    clauses: Vec<Clause>,
}

impl Rule {
    pub fn new(head: Fact, clauses: Vec<Clause>) -> Self {
        let head_vars: Vec<(Atom, Atom)> = head
            .roles()
            .filter(|(_, value)| value.is_variable())
            .collect();

        let mut inplace: Vec<Atom> = Vec::new();
        for clause in &clauses {
            for (_, value) in clause.pattern().roles() {
                if value.is_variable()
                    && !head_vars.iter().any(|&(_, v)| v == value)
                    && !inplace.contains(&value)
                {
                    inplace.push(value);
                }
            }
        }

        debug!(
            head_vars = head_vars.len(),
            inplace = inplace.len(),
            subgoals = clauses.len(),
            "rule created"
        );
        Self {
            head,
            head_vars,
            inplace,
            clauses,
        }
    }

    pub fn head(&self) -> &Fact {
        &self.head
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Variables introduced by subgoals, in first-seen order.
    pub fn inplace_vars(&self) -> &[Atom] {
        &self.inplace
    }

    /// Expands the rule against a query.
    ///
    /// Seeds a binding environment from the constraint, threads a frontier
    /// of environments through each subgoal left to right, and projects the
    /// survivors onto the target roles. Depth-first via the recursive
    /// concept resolution inside each step; a rule that re-enters its own
    /// concept terminates only if its probes keep tightening against the
    /// finite fact base, except that a probe repeated verbatim on the
    /// current path is pruned.
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
        let mut seed = Env::new();
        for &(role, var) in &self.head_vars {
            if let Some(&(_, value)) = constraint.iter().find(|&&(r, _)| r == role) {
                // A variable occupying several head roles keeps the value
                // seeded by its first-declared role.
                seed.entry(var).or_insert(value);
            }
        }
        trace!(bound = seed.len(), "rule expansion seeded");

        let mut frontier = vec![seed];
        for clause in &self.clauses {
            let Some(concept) = body.concept(clause.action()) else {
                // Dangling subgoal action prunes every environment.
                frontier.clear();
                break;
            };
            let mut next = Vec::new();
            for env in &frontier {
                let (probe, captures) = make_probe(clause.pattern(), env);
                let capture_roles: Vec<Atom> =
                    captures.iter().map(|&(role, _)| role).collect();
                trace!(
                    constrained = probe.len(),
                    captured = capture_roles.len(),
                    "subgoal probe"
                );
                for row in concept.resolve_inner(body, &probe, &capture_roles, active) {
                    let mut derived = env.clone();
                    for (&(_, var), &(_, value)) in captures.iter().zip(row.iter()) {
                        // An absent projected role leaves the variable
                        // unbound; a later subgoal captures it afresh.
                        if let Some(value) = value {
                            derived.insert(var, value);
                        }
                    }
                    next.push(derived);
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        frontier
            .into_iter()
            .map(|env| {
                targets
                    .iter()
                    .map(|&role| {
                        let value = self
                            .head_vars
                            .iter()
                            .find(|&&(r, _)| r == role)
                            .and_then(|&(_, var)| env.get(&var).copied());
                        (role, value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Builds the probe for one subgoal under an environment: constants and
/// already-bound variables become constraints, unbound variables become
/// capture targets.
fn make_probe(pattern: &Fact, env: &Env) -> (Vec<(Atom, Atom)>, Vec<(Atom, Atom)>) {
    let mut constraint = Vec::new();
    let mut captures = Vec::new();
    for (role, value) in pattern.roles() {
        if value.is_variable() {
            match env.get(&value) {
                Some(&bound) => constraint.push((role, bound)),
                None => captures.push((role, value)),
            }
        } else {
            constraint.push((role, value));
        }
    }
    (constraint, captures)
}
