use crate::atom::Atom;

/// One row of a query answer: each requested role with its value, or
/// `None` where the matched tuple had no such role.
pub type Projection = Vec<(Atom, Option<Atom>)>;

/// An unordered role→value tuple.
///
/// Ground facts carry no variable values; rule heads and subgoal patterns
/// reuse the same representation with `$` atoms in value position. Tuples
/// are small, so lookups are linear scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    args: Vec<(Atom, Atom)>,
}

impl Fact {
    /// Builds a tuple from role/value pairs. Roles are unique within a
    /// tuple; a repeated role keeps the last value written.
    pub fn new(pairs: impl IntoIterator<Item = (Atom, Atom)>) -> Self {
        let mut args: Vec<(Atom, Atom)> = Vec::new();
        for (role, value) in pairs {
            match args.iter_mut().find(|(r, _)| *r == role) {
                Some(slot) => slot.1 = value,
                None => args.push((role, value)),
            }
        }
        Self { args }
    }

    pub fn get(&self, role: Atom) -> Option<Atom> {
        self.args.iter().find(|(r, _)| *r == role).map(|&(_, v)| v)
    }

    pub fn roles(&self) -> impl Iterator<Item = (Atom, Atom)> + '_ {
        self.args.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// True iff every constrained role is present with an equal value.
    ///
    /// Comparison is atom identity. A variable-valued field matches any
    /// probe value (rule patterns are stored as tuples too); roles the
    /// constraint does not mention are ignored.
    pub fn matches(&self, constraint: &[(Atom, Atom)]) -> bool {
        constraint.iter().all(|&(role, value)| match self.get(role) {
            Some(stored) => stored.is_variable() || stored == value,
            None => false,
        })
    }

    /// Projects the requested roles, `None` marking the absent ones.
    pub fn project(&self, targets: &[Atom]) -> Projection {
        targets.iter().map(|&role| (role, self.get(role))).collect()
    }
}
