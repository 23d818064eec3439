use super::sub_block::{inspect_chain, payload};
use super::{DisposalMethod, LoopCount, SubBlock, Version};
use crate::bitfield::color_table_len;
use crate::error::{DecodeWarning, Span};
use crate::tree::{Inspect, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub span: Span,
    pub signature: [u8; 3],
    pub version: [u8; 3],
}

impl Header {
    pub fn version(&self) -> Option<Version> {
        Version::try_from(self.version.as_slice()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub span: Span,
    pub screen_width: u16,
    pub screen_height: u16,
    pub packed_fields: u8,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    /// Raw 3-bit exponent; the table holds `2^(n+1)` entries.
    pub color_table_size: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    pub fn global_color_table_len(&self) -> Option<usize> {
        self.global_color_table_flag
            .then(|| color_table_len(self.color_table_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    pub span: Span,
    pub colors: Vec<Rgb>,
}

impl ColorTable {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// <Logical Screen> ::= Logical Screen Descriptor [Global Color Table]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScreen {
    pub descriptor: LogicalScreenDescriptor,
    pub global_color_table: Option<ColorTable>,
}

impl LogicalScreen {
    pub fn span(&self) -> Span {
        let end = self
            .global_color_table
            .as_ref()
            .map_or(self.descriptor.span.end, |table| table.span.end);
        Span::new(self.descriptor.span.begin, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicControlExtension {
    pub span: Span,
    pub block_size: u8,
    pub packed_fields: u8,
    pub reserved: u8,
    pub disposal_method: u8,
    pub user_input_flag: bool,
    pub transparent_color_flag: bool,
    /// Hundredths of a second.
    pub delay_time: u16,
    pub transparent_color_index: u8,
}

impl GraphicControlExtension {
    pub fn disposal(&self) -> Option<DisposalMethod> {
        DisposalMethod::from_u8(self.disposal_method)
    }
}

/// Presence-only: the text grid header and its data are kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextExtension {
    pub span: Span,
    pub block_size: u8,
    pub header: Vec<u8>,
    pub data: Vec<SubBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub span: Span,
    pub left_position: u16,
    pub top_position: u16,
    pub width: u16,
    pub height: u16,
    pub packed_fields: u8,
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub reserved: u8,
    pub color_table_size: u8,
}

impl ImageDescriptor {
    pub fn local_color_table_len(&self) -> Option<usize> {
        self.local_color_table_flag
            .then(|| color_table_len(self.color_table_size))
    }
}

/// <Table-Based Image> ::= Image Descriptor [Local Color Table] Image Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBasedImage {
    pub span: Span,
    pub descriptor: ImageDescriptor,
    pub local_color_table: Option<ColorTable>,
    pub lzw_minimum_code_size: u8,
    /// Compressed LZW stream, left undecoded.
    pub image_data: Vec<SubBlock>,
}

/// <Graphic-Rendering Block> ::= <Table-Based Image> | Plain Text Extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicRenderingBlock {
    PlainText(PlainTextExtension),
    Image(TableBasedImage),
}

impl GraphicRenderingBlock {
    pub fn span(&self) -> Span {
        match self {
            GraphicRenderingBlock::PlainText(text) => text.span,
            GraphicRenderingBlock::Image(image) => image.span,
        }
    }
}

/// <Graphic Block> ::= [Graphic Control Extension] <Graphic-Rendering Block>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicBlock {
    pub span: Span,
    pub control: Option<GraphicControlExtension>,
    pub rendering: GraphicRenderingBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationExtension {
    pub span: Span,
    pub block_size: u8,
    /// The `block_size` bytes after the size: identifier then authentication code.
    pub fixed: Vec<u8>,
    pub data: Vec<SubBlock>,
}

impl ApplicationExtension {
    pub fn identifier(&self) -> &[u8] {
        &self.fixed[..self.fixed.len().min(8)]
    }

    pub fn authentication_code(&self) -> &[u8] {
        self.fixed.get(8..self.fixed.len().min(11)).unwrap_or_default()
    }

    /// Animation loop count from a NETSCAPE2.0 (or ANIMEXTS1.0) looping sub-block.
    pub fn loop_count(&self) -> Option<LoopCount> {
        let looping = matches!(
            (self.identifier(), self.authentication_code()),
            (b"NETSCAPE", b"2.0") | (b"ANIMEXTS", b"1.0")
        );
        if !looping {
            return None;
        }

        match self.data.first().map(|block| block.data.as_slice()) {
            Some(&[0x01, low, high]) => Some(match u16::from_le_bytes([low, high]) {
                0 => LoopCount::Infinite,
                count => LoopCount::Count(count),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentExtension {
    pub span: Span,
    pub data: Vec<SubBlock>,
}

impl CommentExtension {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&payload(&self.data)).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub span: Span,
}

/// <Data> ::= <Graphic Block> | <Special-Purpose Block>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Graphic(GraphicBlock),
    Application(ApplicationExtension),
    Comment(CommentExtension),
}

/// <GIF Data Stream> ::= Header <Logical Screen> <Data>* Trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifStream {
    pub header: Header,
    pub screen: LogicalScreen,
    pub blocks: Vec<Block>,
    pub trailer: Option<Trailer>,
    pub warnings: Vec<DecodeWarning>,
}

impl GifStream {
    pub fn graphic_blocks(&self) -> impl Iterator<Item = &GraphicBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Graphic(graphic) => Some(graphic),
            _ => None,
        })
    }

    pub fn applications(&self) -> impl Iterator<Item = &ApplicationExtension> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Application(application) => Some(application),
            _ => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &CommentExtension> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Comment(comment) => Some(comment),
            _ => None,
        })
    }

    pub fn span(&self) -> Span {
        let end = self
            .trailer
            .as_ref()
            .map(|trailer| trailer.span.end)
            .or_else(|| self.blocks.last().map(|block| block.span().end))
            .unwrap_or(self.screen.span().end);
        Span::new(self.header.span.begin, end)
    }
}

impl Block {
    pub fn span(&self) -> Span {
        match self {
            Block::Graphic(graphic) => graphic.span,
            Block::Application(application) => application.span,
            Block::Comment(comment) => comment.span,
        }
    }
}

impl Inspect for Header {
    fn inspect(&self) -> Node {
        Node::new("Header", self.span)
            .field("signature", String::from_utf8_lossy(&self.signature).into_owned())
            .field("version", String::from_utf8_lossy(&self.version).into_owned())
    }
}

impl Inspect for LogicalScreenDescriptor {
    fn inspect(&self) -> Node {
        Node::new("LogicalScreenDescriptor", self.span)
            .field("width", self.screen_width)
            .field("height", self.screen_height)
            .hex("packed_fields", self.packed_fields)
            .field("global_color_table", self.global_color_table_flag)
            .field("color_resolution", self.color_resolution)
            .field("sort", self.sort_flag)
            .field("color_table_size", self.color_table_size)
            .field("background_color_index", self.background_color_index)
            .field("pixel_aspect_ratio", self.pixel_aspect_ratio)
    }
}

impl Inspect for ColorTable {
    fn inspect(&self) -> Node {
        let first: Vec<u8> = self
            .colors
            .iter()
            .take(4)
            .flat_map(|color| [color.red, color.green, color.blue])
            .collect();

        Node::new("ColorTable", self.span)
            .field("entries", self.len())
            .bytes("first", &first)
    }
}

impl Inspect for LogicalScreen {
    fn inspect(&self) -> Node {
        Node::new("LogicalScreen", self.span())
            .child(self.descriptor.inspect())
            .children(self.global_color_table.as_ref().map(Inspect::inspect))
    }
}

impl Inspect for GraphicControlExtension {
    fn inspect(&self) -> Node {
        Node::new("GraphicControlExtension", self.span)
            .field("block_size", self.block_size)
            .hex("packed_fields", self.packed_fields)
            .field("reserved", self.reserved)
            .field("disposal_method", self.disposal_method)
            .field("user_input", self.user_input_flag)
            .field("transparent_color", self.transparent_color_flag)
            .field("delay_time", self.delay_time)
            .field("transparent_color_index", self.transparent_color_index)
    }
}

impl Inspect for PlainTextExtension {
    fn inspect(&self) -> Node {
        Node::new("PlainTextExtension", self.span)
            .field("block_size", self.block_size)
            .bytes("header", &self.header)
            .child(inspect_chain("PlainTextData", &self.data))
    }
}

impl Inspect for ImageDescriptor {
    fn inspect(&self) -> Node {
        Node::new("ImageDescriptor", self.span)
            .field("left", self.left_position)
            .field("top", self.top_position)
            .field("width", self.width)
            .field("height", self.height)
            .hex("packed_fields", self.packed_fields)
            .field("local_color_table", self.local_color_table_flag)
            .field("interlace", self.interlace_flag)
            .field("sort", self.sort_flag)
            .field("reserved", self.reserved)
            .field("color_table_size", self.color_table_size)
    }
}

impl Inspect for TableBasedImage {
    fn inspect(&self) -> Node {
        Node::new("TableBasedImage", self.span)
            .field("lzw_minimum_code_size", self.lzw_minimum_code_size)
            .child(self.descriptor.inspect())
            .children(self.local_color_table.as_ref().map(Inspect::inspect))
            .child(inspect_chain("ImageData", &self.image_data))
    }
}

impl Inspect for GraphicBlock {
    fn inspect(&self) -> Node {
        let rendering = match &self.rendering {
            GraphicRenderingBlock::PlainText(text) => text.inspect(),
            GraphicRenderingBlock::Image(image) => image.inspect(),
        };

        Node::new("GraphicBlock", self.span)
            .children(self.control.as_ref().map(Inspect::inspect))
            .child(rendering)
    }
}

impl Inspect for ApplicationExtension {
    fn inspect(&self) -> Node {
        let node = Node::new("ApplicationExtension", self.span)
            .field("block_size", self.block_size)
            .field("identifier", String::from_utf8_lossy(self.identifier()).into_owned())
            .bytes("authentication_code", self.authentication_code());

        let node = match self.loop_count() {
            Some(LoopCount::Infinite) => node.field("loop_count", "infinite"),
            Some(LoopCount::Count(count)) => node.field("loop_count", count),
            None => node,
        };

        node.child(inspect_chain("ApplicationData", &self.data))
    }
}

impl Inspect for CommentExtension {
    fn inspect(&self) -> Node {
        Node::new("CommentExtension", self.span)
            .field("text", self.text())
            .child(inspect_chain("CommentData", &self.data))
    }
}

impl Inspect for Trailer {
    fn inspect(&self) -> Node {
        Node::new("Trailer", self.span)
    }
}

impl Inspect for Block {
    fn inspect(&self) -> Node {
        match self {
            Block::Graphic(graphic) => graphic.inspect(),
            Block::Application(application) => application.inspect(),
            Block::Comment(comment) => comment.inspect(),
        }
    }
}

impl Inspect for GifStream {
    fn inspect(&self) -> Node {
        Node::new("GifStream", self.span())
            .field("graphic_blocks", self.graphic_blocks().count())
            .child(self.header.inspect())
            .child(self.screen.inspect())
            .children(self.blocks.iter().map(Inspect::inspect))
            .children(self.trailer.as_ref().map(Inspect::inspect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_block(data: &[u8]) -> SubBlock {
        SubBlock {
            span: Span::default(),
            data: data.to_vec(),
        }
    }

    fn application(fixed: &[u8], first: &[u8]) -> ApplicationExtension {
        ApplicationExtension {
            span: Span::default(),
            block_size: fixed.len() as u8,
            fixed: fixed.to_vec(),
            data: vec![sub_block(first), sub_block(&[])],
        }
    }

    #[test]
    fn netscape_loop_count() {
        let infinite = application(b"NETSCAPE2.0", &[0x01, 0x00, 0x00]);
        assert_eq!(infinite.identifier(), b"NETSCAPE");
        assert_eq!(infinite.authentication_code(), b"2.0");
        assert_eq!(infinite.loop_count(), Some(LoopCount::Infinite));

        let five = application(b"NETSCAPE2.0", &[0x01, 0x05, 0x00]);
        assert_eq!(five.loop_count(), Some(LoopCount::Count(5)));

        let other = application(b"XMP DataXMP", &[0x01, 0x05, 0x00]);
        assert_eq!(other.loop_count(), None);
    }

    #[test]
    fn short_application_block_does_not_panic() {
        let short = application(b"NETS", &[]);
        assert_eq!(short.identifier(), b"NETS");
        assert!(short.authentication_code().is_empty());
        assert_eq!(short.loop_count(), None);
    }

    #[test]
    fn comment_text_joins_blocks() {
        let comment = CommentExtension {
            span: Span::default(),
            data: vec![sub_block(b"hello "), sub_block(b"world"), sub_block(&[])],
        };
        assert_eq!(comment.text(), "hello world");
    }

    #[test]
    fn header_version() {
        let header = Header {
            span: Span::new(0, 6),
            signature: *b"GIF",
            version: *b"87a",
        };
        assert_eq!(header.version(), Some(Version::V87a));

        let odd = Header {
            version: *b"90z",
            ..header
        };
        assert_eq!(odd.version(), None);
    }
}
