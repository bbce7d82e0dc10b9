//! Renderings of a clade tree and its call matrix.

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

use super::clade_tree::CladeTree;
use crate::core::types::CladeId;
use crate::core::variant::VariantCatalog;
use crate::matrix::CallMatrix;

/// Human-readable label: the clade name, else its first variants
#[must_use]
pub fn clade_label(tree: &CladeTree, catalog: &VariantCatalog, id: CladeId) -> String {
    let Some(clade) = tree.get(id) else {
        return id.to_string();
    };
    if let Some(name) = &clade.name {
        return name.clone();
    }

    let mut labels: Vec<String> = clade
        .variants
        .iter()
        .take(3)
        .map(|&v| catalog.get(v).map_or_else(|| v.to_string(), |var| var.label()))
        .collect();
    if clade.variants.len() > labels.len() {
        labels.push(format!("+{}", clade.variants.len() - labels.len()));
    }
    if labels.is_empty() {
        id.to_string()
    } else {
        labels.join(",")
    }
}

/// Graphviz DOT rendering, one box per clade
///
/// # Errors
///
/// Returns `fmt::Error` if formatting fails.
pub fn to_dot(tree: &CladeTree, catalog: &VariantCatalog) -> Result<String, fmt::Error> {
    let mut s = String::new();
    write_dot(&mut s, tree, catalog)?;
    Ok(s)
}

fn write_dot(out: &mut impl fmt::Write, tree: &CladeTree, catalog: &VariantCatalog) -> fmt::Result {
    writeln!(out, "digraph Clades {{")?;
    writeln!(out, "    node [shape=box];")?;

    for id in pre_order(tree) {
        let Some(clade) = tree.get(id) else {
            continue;
        };
        let label = clade_label(tree, catalog, id).replace('"', "\\\"");
        writeln!(
            out,
            "    {} [label=\"{}\\n{} variants, {} kits\"];",
            id,
            label,
            clade.variants.len(),
            clade.kits.len()
        )?;
        for child in tree.children(id) {
            writeln!(out, "    {id} -> {child};")?;
        }
    }

    writeln!(out, "}}")
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: CladeId,
    pub label: String,
    pub depth: u32,
    pub variants: Vec<String>,
    pub kits: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub parent: CladeId,
    pub child: CladeId,
}

/// Node/edge graph for JSON consumers
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[must_use]
pub fn to_graph(tree: &CladeTree, catalog: &VariantCatalog) -> GraphExport {
    let order = pre_order(tree);
    let nodes = order
        .iter()
        .filter_map(|&id| tree.get(id))
        .map(|clade| GraphNode {
            id: clade.id,
            label: clade_label(tree, catalog, clade.id),
            depth: tree.depth(clade.id),
            variants: clade
                .variants
                .iter()
                .map(|&v| catalog.get(v).map_or_else(|| v.to_string(), |var| var.label()))
                .collect(),
            kits: clade.kits.iter().map(ToString::to_string).collect(),
        })
        .collect();
    let edges = order
        .iter()
        .flat_map(|&parent| {
            tree.children(parent)
                .into_iter()
                .map(move |child| GraphEdge { parent, child })
        })
        .collect();
    GraphExport { nodes, edges }
}

/// Closure table dump.
///
/// ```text
/// #record  clade  target  depth
/// path     c0     c1      1
/// kit      c1     KIT42
/// variant  c1     M269
/// ```
///
/// # Errors
///
/// Propagates write failures.
pub fn write_closure_tsv<W: Write>(w: &mut W, tree: &CladeTree, catalog: &VariantCatalog) -> io::Result<()> {
    writeln!(w, "#record\tclade\ttarget\tdepth")?;
    for path in tree.paths() {
        writeln!(w, "path\t{}\t{}\t{}", path.ancestor, path.descendant, path.depth)?;
    }
    for clade in tree.iter() {
        for kit in &clade.kits {
            writeln!(w, "kit\t{}\t{}", clade.id, kit)?;
        }
        for &variant in &clade.variants {
            let label = catalog.get(variant).map_or_else(|| variant.to_string(), |v| v.label());
            writeln!(w, "variant\t{}\t{}", clade.id, label)?;
        }
    }
    Ok(())
}

/// Indented outline, one clade per line
///
/// # Errors
///
/// Propagates write failures.
pub fn write_outline<W: Write>(w: &mut W, tree: &CladeTree, catalog: &VariantCatalog) -> io::Result<()> {
    for id in pre_order(tree) {
        let Some(clade) = tree.get(id) else {
            continue;
        };
        let indent = "  ".repeat(tree.depth(id) as usize);
        write!(w, "{indent}{} [{}]", clade_label(tree, catalog, id), id)?;
        if !clade.kits.is_empty() {
            let kits: Vec<&str> = clade.kits.iter().map(|k| k.as_str()).collect();
            write!(w, " kits: {}", kits.join(", "))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Tabular call matrix: one row per variant, one column per kit.
///
/// Cells hold the call symbol (`+`, `-`, `?`, `*`); cells decided by coverage
/// rather than a recorded call carry the coverage code as a suffix (`-4`).
///
/// # Errors
///
/// Propagates write failures.
pub fn write_matrix_tsv<W: Write>(
    w: &mut W,
    matrix: &CallMatrix,
    catalog: &VariantCatalog,
    tree: Option<&CladeTree>,
) -> io::Result<()> {
    write!(w, "name\tbuild\tposition\tancestral\tderived\tclade")?;
    for kit in matrix.kits() {
        write!(w, "\t{kit}")?;
    }
    writeln!(w)?;

    for (row, &id) in matrix.variants().iter().enumerate() {
        let Some(variant) = catalog.get(id) else {
            continue;
        };
        let clade = tree
            .and_then(|t| t.variant_owner(id))
            .map_or_else(|| ".".to_string(), |c| c.to_string());
        write!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            variant.label(),
            variant.build,
            variant.position,
            variant.ancestral,
            variant.derived,
            clade
        )?;
        for col in 0..matrix.n_cols() {
            let symbol = matrix.get(row, col).symbol();
            if matrix.is_inferred(row, col) {
                write!(w, "\t{}{}", symbol, matrix.coverage_class(row, col).code())?;
            } else {
                write!(w, "\t{symbol}")?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Root first, children in id order
fn pre_order(tree: &CladeTree) -> Vec<CladeId> {
    let mut order = Vec::with_capacity(tree.len());
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(tree.children(id).into_iter().rev());
    }
    order
}
