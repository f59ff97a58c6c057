//! Splits one parsed program into per-node segments at `__node` directive
//! boundaries (spec.md §6): "items appearing before any `node` are treated
//! as shared definitions prepended to every node's input."

use cube_syntax::ast::Conjunction;
use cube_syntax::{Application, ItemKind};

pub fn split_nodes(top: &Conjunction) -> Vec<Conjunction> {
    let boundaries: Vec<usize> = top
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match &item.kind {
            ItemKind::Application(app) if app.functor == Application::NODE_DIRECTIVE => Some(i),
            _ => None,
        })
        .collect();

    if boundaries.is_empty() {
        return vec![top.clone()];
    }

    let prelude = &top[..boundaries[0]];
    boundaries
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = boundaries.get(idx + 1).copied().unwrap_or(top.len());
            let mut segment = prelude.to_vec();
            segment.extend_from_slice(&top[start..end]);
            segment
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_syntax::{parse, tokenize};

    fn parse_top(src: &str) -> Conjunction {
        let (tokens, _) = tokenize(src);
        parse(tokens).expect("parse should succeed").top
    }

    #[test]
    fn a_program_with_no_node_directive_is_a_single_segment() {
        let top = parse_top("x = 1");
        assert_eq!(split_nodes(&top).len(), 1);
    }

    #[test]
    fn shared_prelude_is_prepended_to_every_segment() {
        let top = parse_top("shared = 1 /\\ node 100 /\\ f18a.dup /\\ node 200 /\\ f18a.drop");
        let segments = split_nodes(&top);
        assert_eq!(segments.len(), 2);
        // Each segment keeps the prelude item plus its own node directive.
        assert_eq!(segments[0].len(), 3);
        assert_eq!(segments[1].len(), 3);
    }
}
