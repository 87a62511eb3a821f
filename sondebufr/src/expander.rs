use crate::errors::{Error, Result};
use crate::tables::Tables;
use genlib::FXY;

/// Table D nesting deeper than this is treated as a cyclic table.
pub const MAX_SEQUENCE_DEPTH: usize = 64;

/// A replicator whose body end is still being located.
struct Span {
    replicator: usize,
    body_start: usize,
    end: usize,
}

/// Replace every sequence descriptor by its Table D chain, in place, and
/// rewrite each replicator's `X` to the length of its fully expanded body.
///
/// A replicator with `X = 0` spans the rest of the chain it came from, or the
/// rest of the list at top level.
pub fn expand(descriptors: &[FXY], tables: &Tables) -> Result<Vec<FXY>> {
    let mut list = descriptors.to_vec();
    // Exclusive ends of the Table D chains currently being scanned, innermost last.
    let mut scopes: Vec<usize> = Vec::new();
    let mut pending: Option<Span> = None;
    let mut i = 0;

    loop {
        while scopes.last().is_some_and(|&end| end <= i) {
            scopes.pop();
        }
        if let Some(span) = pending.take_if(|span| span.end <= i) {
            close_span(&mut list, &span);
        }
        if i >= list.len() {
            break;
        }

        let desc = list[i];
        match desc.f {
            3 => {
                if scopes.len() >= MAX_SEQUENCE_DEPTH {
                    return Err(Error::ParseError(format!(
                        "Sequence {} nested more than {} deep; Table D is cyclic",
                        desc, MAX_SEQUENCE_DEPTH
                    )));
                }
                let chain = tables
                    .lookup_d(&desc)
                    .ok_or(Error::UnknownSequenceDescriptor(desc))?
                    .fxy_chain();
                let len = chain.len();
                list.splice(i..i + 1, chain.iter().copied());

                // Everything ending after the splice point moves with it
                for end in scopes.iter_mut().filter(|end| **end > i) {
                    *end = *end - 1 + len;
                }
                if let Some(span) = pending.as_mut().filter(|span| span.end > i) {
                    span.end = span.end - 1 + len;
                }
                scopes.push(i + len);
                // The chain is scanned from its first member
                continue;
            }
            1 => {
                if pending.is_some() {
                    return Err(Error::UnsupportedNestedReplication(desc));
                }
                let delayed = desc.is_delayed_replication();
                let body_start = if delayed {
                    match list.get(i + 1) {
                        Some(next) if next.is_delayed_replication_factor() => i + 2,
                        _ => {
                            return Err(Error::ParseError(format!(
                                "Delayed replicator {} is not followed by a replication factor",
                                desc
                            )));
                        }
                    }
                } else {
                    i + 1
                };

                let end = if desc.x == 0 {
                    scopes.last().copied().unwrap_or(list.len())
                } else {
                    body_start + desc.x as usize
                };
                if end > list.len() {
                    return Err(Error::ParseError(format!(
                        "Not enough descriptors to replicate: {} requested {}, available {}",
                        desc,
                        desc.x,
                        list.len() - body_start
                    )));
                }

                pending = Some(Span {
                    replicator: i,
                    body_start,
                    end,
                });
                i = body_start;
            }
            _ => i += 1,
        }
    }

    tracing::debug!(
        "Expanded {} descriptors into {}",
        descriptors.len(),
        list.len()
    );
    Ok(list)
}

fn close_span(list: &mut [FXY], span: &Span) {
    let count = span.end.saturating_sub(span.body_start);
    list[span.replicator].x = count as i32;
}
