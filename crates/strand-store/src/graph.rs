//! Set-level graph algorithms over objects.
//!
//! Parent links point backward (child → parent). A set is complete when
//! every parent it references is also a member.

use std::collections::{HashMap, HashSet, VecDeque};

use strand_object::{Object, ObjectResult};
use strand_types::Hash;

/// The root of the stream an object belongs to.
///
/// Objects that name a stream belong to it; everything else anchors its own.
pub fn stream_root(object: &Object) -> ObjectResult<Hash> {
    match &object.metadata.stream {
        Some(stream) => Ok(stream.clone()),
        None => object.hash(),
    }
}

fn hashed(objects: Vec<Object>) -> ObjectResult<Vec<(Hash, Object)>> {
    objects
        .into_iter()
        .map(|object| Ok((object.hash()?, object)))
        .collect()
}

/// Order objects so that every object follows all of its parents.
///
/// Kahn's algorithm; ties are broken by the order objects were supplied in.
/// Parents that are not members are ignored.
pub fn topological_sort(objects: Vec<Object>) -> ObjectResult<Vec<Object>> {
    Ok(sort_hashed(hashed(objects)?))
}

pub(crate) fn sort_hashed(entries: Vec<(Hash, Object)>) -> Vec<Object> {
    let index: HashMap<Hash, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, (hash, _))| (hash.clone(), i))
        .collect();

    // In-degree = number of distinct member parents.
    let mut in_degree = vec![0usize; entries.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    for (i, (_, object)) in entries.iter().enumerate() {
        let parents: HashSet<&Hash> = object.metadata.parents.iter().collect();
        for parent in parents {
            if let Some(&p) = index.get(parent) {
                children[p].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..entries.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(entries.len());
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in &children[current] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    let mut slots: Vec<Option<Object>> = entries.into_iter().map(|(_, o)| Some(o)).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Parent hashes referenced by members but not present in the set.
///
/// Each missing hash is reported once, in first-reference order.
pub fn missing_parents(objects: &[Object]) -> ObjectResult<Vec<Hash>> {
    let members: HashSet<Hash> = objects.iter().map(Object::hash).collect::<ObjectResult<_>>()?;
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    for parent in objects.iter().flat_map(|o| o.metadata.parents.iter()) {
        if !members.contains(parent) && seen.insert(parent.clone()) {
            missing.push(parent.clone());
        }
    }
    Ok(missing)
}

/// True iff every referenced parent is a member of the set.
pub fn is_complete(objects: &[Object]) -> ObjectResult<bool> {
    Ok(missing_parents(objects)?.is_empty())
}

/// Members that no other member lists as a parent.
pub fn tails_of(objects: &[Object]) -> ObjectResult<Vec<Object>> {
    let referenced: HashSet<&Hash> = objects
        .iter()
        .flat_map(|o| o.metadata.parents.iter())
        .collect();
    let mut tails = Vec::new();
    for object in objects {
        if !referenced.contains(&object.hash()?) {
            tails.push(object.clone());
        }
    }
    Ok(tails)
}
