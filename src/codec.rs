//! Binary persistence for whole bodies.
//!
//! Atom handles are local to one process; the file format numbers atoms
//! densely in table order and every other record refers to them by id. On
//! load the ids are remapped into the fresh body's table, so restored
//! handles behave identically to the originals under that mapping. The
//! format carries no version field; schema changes are breaking.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atom::Atom;
use crate::body::Body;
use crate::error::KbError;
use crate::fact::Fact;
use crate::rule::{Clause, Rule};

#[derive(Debug, Serialize, Deserialize)]
struct AtomRecord {
    id: u32,
    word: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArgumentRecord {
    role: u32,
    value: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct TupleRecord {
    args: Vec<ArgumentRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClauseRecord {
    action: u32,
    args: TupleRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleRecord {
    definition: TupleRecord,
    expressions: Vec<ClauseRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConceptRecord {
    action: u32,
    facts: Vec<TupleRecord>,
    rules: Vec<RuleRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BodyRecord {
    atoms: Vec<AtomRecord>,
    concepts: Vec<ConceptRecord>,
}

pub(crate) fn save(body: &Body, path: &Path) -> Result<(), KbError> {
    let record = snapshot(body);
    debug!(
        atoms = record.atoms.len(),
        concepts = record.concepts.len(),
        path = %path.display(),
        "saving body"
    );
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serde::encode_into_std_write(&record, &mut writer, bincode::config::standard())?;
    Ok(())
}

pub(crate) fn load(path: &Path) -> Result<Body, KbError> {
    let mut reader = BufReader::new(File::open(path)?);
    let record: BodyRecord =
        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
    debug!(
        atoms = record.atoms.len(),
        concepts = record.concepts.len(),
        path = %path.display(),
        "loading body"
    );
    restore(&record)
}

fn snapshot(body: &Body) -> BodyRecord {
    let mut ids: HashMap<Atom, u32> = HashMap::new();
    let mut atoms = Vec::new();
    for (i, (atom, word)) in body.atoms().iter().enumerate() {
        let id = i as u32;
        ids.insert(atom, id);
        atoms.push(AtomRecord {
            id,
            word: word.to_owned(),
        });
    }

    let concepts = body
        .concepts()
        .iter()
        .map(|concept| ConceptRecord {
            action: ids[&concept.action()],
            facts: concept
                .facts()
                .iter()
                .map(|fact| tuple_record(fact, &ids))
                .collect(),
            rules: concept
                .rules()
                .iter()
                .map(|rule| RuleRecord {
                    definition: tuple_record(rule.head(), &ids),
                    expressions: rule
                        .clauses()
                        .iter()
                        .map(|clause| ClauseRecord {
                            action: ids[&clause.action()],
                            args: tuple_record(clause.pattern(), &ids),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    BodyRecord { atoms, concepts }
}

fn tuple_record(fact: &Fact, ids: &HashMap<Atom, u32>) -> TupleRecord {
    TupleRecord {
        args: fact
            .roles()
            .map(|(role, value)| ArgumentRecord {
                role: ids[&role],
                value: ids[&value],
            })
            .collect(),
    }
}

fn restore(record: &BodyRecord) -> Result<Body, KbError> {
    let mut body = Body::new();
    let mut handles: HashMap<u32, Atom> = HashMap::with_capacity(record.atoms.len());
    for atom in &record.atoms {
        handles.insert(atom.id, body.intern(&atom.word));
    }

    // Concept shells first, so every clause action already has a concept to
    // bind to when it is next resolved.
    for concept in &record.concepts {
        body.ensure_concept(lookup(&handles, concept.action)?);
    }
    for concept in &record.concepts {
        let action = lookup(&handles, concept.action)?;
        for fact in &concept.facts {
            body.insert_fact(action, restore_tuple(fact, &handles)?);
        }
        for rule in &concept.rules {
            let head = restore_tuple(&rule.definition, &handles)?;
            let mut clauses = Vec::with_capacity(rule.expressions.len());
            for clause in &rule.expressions {
                clauses.push(Clause::new(
                    lookup(&handles, clause.action)?,
                    restore_tuple(&clause.args, &handles)?,
                ));
            }
            // Variable classification is recomputed here; it is a pure
            // function of the head and subgoal tuples.
            body.insert_rule(action, Rule::new(head, clauses));
        }
    }
    Ok(body)
}

fn lookup(handles: &HashMap<u32, Atom>, id: u32) -> Result<Atom, KbError> {
    handles
        .get(&id)
        .copied()
        .ok_or(KbError::CorruptAtomId { id })
}

fn restore_tuple(record: &TupleRecord, handles: &HashMap<u32, Atom>) -> Result<Fact, KbError> {
    let mut pairs = Vec::with_capacity(record.args.len());
    for arg in &record.args {
        pairs.push((lookup(handles, arg.role)?, lookup(handles, arg.value)?));
    }
    Ok(Fact::new(pairs))
}
