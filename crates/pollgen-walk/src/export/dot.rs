use pollgen_graph::WalkGraph;

/// Render the graph as DOT text.
///
/// One line per node in registration order, labelled with its name plus
/// `chance=`/`continue=` notes when those differ from 1. The start node is a
/// box and nodes without outgoing edges are triangles (triangle wins). Edge
/// lines follow in registration order, labelled `<weight>x` when the weight
/// is not 1.
pub fn export_dot(graph: &WalkGraph) -> String {
    let mut lines = vec!["digraph G {".to_string()];

    for (id, node) in graph.nodes().iter().enumerate() {
        let id = id as u32;
        let mut notes = vec![escape_label(node.name())];
        if node.chance() != 1.0 {
            notes.push(format!("chance={:.2}", node.chance()));
        }
        if node.continue_chance() != 1.0 {
            notes.push(format!("continue={:.2}", node.continue_chance()));
        }

        let shape = if graph.is_terminal(id) {
            ", shape=triangle"
        } else if graph.start() == Some(id) {
            ", shape=box"
        } else {
            ""
        };

        lines.push(format!(
            "    {} [label=\"{}\"{}];",
            dot_id(node.name()),
            notes.join("\\n"),
            shape
        ));
    }

    for edge in graph.edges() {
        let (Some(from), Some(to)) = (graph.node(edge.source()), graph.node(edge.target())) else {
            continue;
        };
        let label = if edge.weight() != 1.0 {
            format!(" [label=\"{}x\"]", edge.weight())
        } else {
            String::new()
        };
        lines.push(format!(
            "    {} -> {}{};",
            dot_id(from.name()),
            dot_id(to.name()),
            label
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Bare identifiers pass through; anything else is quoted.
fn dot_id(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", escape_label(name))
    }
}

fn escape_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
