use lasso::{Rodeo, Spur};
use tracing::debug;

/// Handle to an interned word.
///
/// Equality and hashing go through the interner key, so two handles from
/// the same [`AtomTable`] compare equal exactly when their words do. The
/// `$` prefix that marks a variable is inspected once, at interning; the
/// handle carries the answer so resolution never re-reads the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    key: Spur,
    variable: bool,
}

impl Atom {
    pub fn is_variable(self) -> bool {
        self.variable
    }
}

/// Append-only intern table for symbolic words.
#[derive(Debug, Default)]
pub struct AtomTable {
    rodeo: Rodeo,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing handle if the word was seen before, else
    /// records a new one. Total; never fails.
    pub fn intern(&mut self, word: &str) -> Atom {
        let fresh = self.rodeo.get(word).is_none();
        let key = self.rodeo.get_or_intern(word);
        if fresh {
            debug!(word, "atom registered");
        }
        Atom {
            key,
            variable: word.starts_with('$'),
        }
    }

    /// The word behind a handle.
    pub fn resolve(&self, atom: Atom) -> &str {
        self.rodeo.resolve(&atom.key)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Atoms in insertion order. Persistence numbers them off this.
    pub fn iter(&self) -> impl Iterator<Item = (Atom, &str)> + '_ {
        self.rodeo.iter().map(|(key, word)| {
            (
                Atom {
                    key,
                    variable: word.starts_with('$'),
                },
                word,
            )
        })
    }
}
