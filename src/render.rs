use crate::tree::Node;

use std::io::{self, Write};

/// Writes a record tree as indented text, one node per line:
///
/// ```text
/// Box [0, 32) type="moov" size=32 parent="root" children=1
///   Box [8, 32) type="trak" size=24 parent="moov" children=0
/// ```
pub struct TextRenderer<W> {
    out: W,
    indent: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, indent: 2 }
    }

    pub fn render(&mut self, node: &Node) -> io::Result<()> {
        self.render_at(node, 0)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_at(&mut self, node: &Node, depth: usize) -> io::Result<()> {
        write!(
            self.out,
            "{:width$}{} {}",
            "",
            node.kind,
            node.span,
            width = depth * self.indent
        )?;
        for field in &node.fields {
            write!(self.out, " {}={}", field.name, field.value)?;
        }
        writeln!(self.out)?;

        for child in &node.children {
            self.render_at(child, depth + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Span;

    #[test]
    fn nested_nodes_are_indented() {
        let tree = Node::new("Box", Span::new(0, 16))
            .field("type", "moov")
            .child(Node::new("Box", Span::new(8, 16)).field("size", 8u32));

        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&tree).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert_eq!(text, "Box [0, 16) type=\"moov\"\n  Box [8, 16) size=8\n");
    }
}
