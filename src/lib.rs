//! A deductive knowledge base over role-labelled tuples.
//!
//! Facts and Horn-style rules are grouped into concepts keyed by a
//! symbolic action. A query names an action, constrains some roles to
//! values, and asks for target roles; answers come from ground facts
//! first, and from rule expansion with consistent variable unification
//! only when no fact matches. Words prefixed with `$` are variables.
//!
//! ```
//! use framekb::Body;
//!
//! let mut body = Body::new();
//! body.add_fact("plus", &["dobj:1", "iobj:2", "result:3"])?;
//! let answers = body
//!     .resolve_strings("plus", &["dobj:1", "iobj:2"], &["result"])?
//!     .unwrap();
//! assert_eq!(answers[0]["result"].as_deref(), Some("3"));
//! # Ok::<(), framekb::KbError>(())
//! ```

pub mod atom;
pub mod body;
mod codec;
pub mod concept;
pub mod error;
pub mod fact;
pub mod rule;

pub use atom::{Atom, AtomTable};
pub use body::Body;
pub use concept::Concept;
pub use error::KbError;
pub use fact::{Fact, Projection};
pub use rule::{Clause, Rule};
