use super::records::*;
use super::sub_block::read_chain;
use super::*;
use crate::bitfield::{self, color_table_len};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeWarning, Outcome, Result, Span};

use log::{debug, trace, warn};

use std::io::{Read, Seek};

#[derive(Debug)]
enum ParserState {
    ProcessHeader,
    ProcessLogicalScreen,
    DetermineNextBlock,
    ProcessApplication,
    ProcessComment,
    ProcessGraphicControl,
    ProcessRenderingBlock(Option<GraphicControlExtension>),
    ProcessTrailer,
    Done,
}

/// Recursive-descent decoder for one GIF data stream.
///
/// Decoding stops at the trailer, at an extension label outside the grammar,
/// or at the first error. Once the header and logical screen are in, an error
/// does not discard the blocks read before it: it comes back in
/// [`Outcome::error`] next to the partial [`GifStream`].
#[derive(Debug)]
pub struct Decoder<'a, R> {
    cursor: &'a mut Cursor<R>,
    header: Option<Header>,
    screen: Option<LogicalScreen>,
    blocks: Vec<Block>,
    trailer: Option<Trailer>,
    warnings: Vec<DecodeWarning>,
}

impl<'a, R: Read + Seek> Decoder<'a, R> {
    pub fn new(cursor: &'a mut Cursor<R>) -> Self {
        Self {
            cursor,
            header: None,
            screen: None,
            blocks: Vec::new(),
            trailer: None,
            warnings: Vec::new(),
        }
    }

    /// Fails outright only when the header or logical screen cannot be read.
    pub fn decode(mut self) -> Result<Outcome<GifStream>> {
        let mut state = ParserState::ProcessHeader;

        loop {
            trace!("begin parsing state {:?}", state);

            match self.process_next_state(state) {
                Ok(ParserState::Done) => break self.finish(None),
                Ok(next_state) => state = next_state,
                Err(error) => break self.finish(Some(error)),
            }
        }
    }

    fn finish(self, error: Option<DecodeError>) -> Result<Outcome<GifStream>> {
        let (header, screen) = match (self.header, self.screen) {
            (Some(header), Some(screen)) => (header, screen),
            _ => {
                return Err(error.unwrap_or_else(|| {
                    DecodeError::structural(self.cursor.position(), "stream ended before the logical screen")
                }))
            }
        };

        if let Some(error) = &error {
            warn!("gif decoding stopped after {} blocks: {error}", self.blocks.len());
        }

        Ok(Outcome {
            tree: GifStream {
                header,
                screen,
                blocks: self.blocks,
                trailer: self.trailer,
                warnings: self.warnings,
            },
            error,
        })
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState> {
        use ParserState::*;

        match next_state {
            ProcessHeader => {
                let header = self.read_header()?;
                debug!("processed header {} at {}", String::from_utf8_lossy(&header.version), header.span);
                self.header = Some(header);

                Ok(ProcessLogicalScreen)
            }
            ProcessLogicalScreen => {
                let screen = self.read_logical_screen()?;
                debug!("processed logical screen, got: {:?}", screen.descriptor);
                self.screen = Some(screen);

                Ok(DetermineNextBlock)
            }
            DetermineNextBlock => self.determine_next_block(),
            ProcessApplication => {
                let application = self.read_application_extension()?;
                debug!(
                    "processed application extension {:?} at {}",
                    String::from_utf8_lossy(application.identifier()),
                    application.span
                );
                self.blocks.push(Block::Application(application));

                Ok(DetermineNextBlock)
            }
            ProcessComment => {
                let comment = self.read_comment_extension()?;
                debug!("processed comment block at {}, got: {:?}", comment.span, comment.text());
                self.blocks.push(Block::Comment(comment));

                Ok(DetermineNextBlock)
            }
            ProcessGraphicControl => {
                let control = self.read_graphic_control_extension()?;
                debug!("processed graphic control extension: {:?}", control);

                Ok(ProcessRenderingBlock(Some(control)))
            }
            ProcessRenderingBlock(control) => {
                let rendering = match self.read_rendering_block() {
                    Ok(rendering) => rendering,
                    Err(error) => {
                        if let Some(control) = &control {
                            let warning = DecodeWarning::DroppedGraphicControl { span: control.span };
                            warn!("{warning}");
                            self.warnings.push(warning);
                        }
                        return Err(error);
                    }
                };
                let begin = control
                    .as_ref()
                    .map_or(rendering.span().begin, |control| control.span.begin);
                let graphic_block = GraphicBlock {
                    span: Span::new(begin, rendering.span().end),
                    control,
                    rendering,
                };
                debug!("processed graphic block at {}", graphic_block.span);
                self.blocks.push(Block::Graphic(graphic_block));

                Ok(DetermineNextBlock)
            }
            ProcessTrailer => {
                self.read_trailer()?;
                Ok(Done)
            }
            Done => Ok(Done),
        }
    }

    fn determine_next_block(&mut self) -> Result<ParserState> {
        use ParserState::*;

        if self.cursor.at_end() {
            return Ok(ProcessTrailer);
        }

        match self.cursor.peek_byte()? {
            EXTENSION_INTRODUCER => {
                let label = self.cursor.peek(2)?[1];
                trace!("extension label 0x{label:02x} at offset {}", self.cursor.position());

                match label {
                    APPLICATION_EXTENSION => Ok(ProcessApplication),
                    COMMENT_EXTENSION => Ok(ProcessComment),
                    GRAPHIC_CONTROL_EXTENSION => Ok(ProcessGraphicControl),
                    PLAIN_TEXT_EXTENSION => Ok(ProcessRenderingBlock(None)),
                    label => {
                        let offset = self.cursor.position();
                        warn!("unknown extension label 0x{label:02x} at offset {offset}, stopping");
                        self.warnings
                            .push(DecodeWarning::UnknownExtension { offset, label });
                        Ok(ProcessTrailer)
                    }
                }
            }
            IMAGE_SEPARATOR => Ok(ProcessRenderingBlock(None)),
            _ => Ok(ProcessTrailer),
        }
    }

    fn read_header(&mut self) -> Result<Header> {
        let begin = self.cursor.position();
        let signature = self.cursor.read_array::<3>()?;
        if &signature != SIGNATURE {
            return Err(DecodeError::BadSignature { found: signature });
        }
        let version = self.cursor.read_array::<3>()?;

        Ok(Header {
            span: Span::new(begin, self.cursor.position()),
            signature,
            version,
        })
    }

    fn read_logical_screen(&mut self) -> Result<LogicalScreen> {
        let begin = self.cursor.position();
        let screen_width = self.cursor.read_u16_le()?;
        let screen_height = self.cursor.read_u16_le()?;
        let packed_fields = self.cursor.read_u8()?;
        let background_color_index = self.cursor.read_u8()?;
        let pixel_aspect_ratio = self.cursor.read_u8()?;

        let fields = bitfield::decode(packed_fields, bitfield::SCREEN_LAYOUT)?;
        let descriptor = LogicalScreenDescriptor {
            span: Span::new(begin, self.cursor.position()),
            screen_width,
            screen_height,
            packed_fields,
            global_color_table_flag: fields.flag("global_color_table"),
            color_resolution: fields.value("color_resolution"),
            sort_flag: fields.flag("sort"),
            color_table_size: fields.value("color_table_size"),
            background_color_index,
            pixel_aspect_ratio,
        };

        let global_color_table = match descriptor.global_color_table_len() {
            Some(len) => Some(self.read_color_table(len)?),
            None => None,
        };

        Ok(LogicalScreen {
            descriptor,
            global_color_table,
        })
    }

    fn read_color_table(&mut self, len: usize) -> Result<ColorTable> {
        let begin = self.cursor.position();
        let bytes = self.cursor.read_exact(3 * len)?;
        let colors = bytes
            .chunks_exact(3)
            .map(|rgb| Rgb {
                red: rgb[0],
                green: rgb[1],
                blue: rgb[2],
            })
            .collect();

        Ok(ColorTable {
            span: Span::new(begin, self.cursor.position()),
            colors,
        })
    }

    fn read_graphic_control_extension(&mut self) -> Result<GraphicControlExtension> {
        let begin = self.cursor.position();
        self.cursor.skip(2)?; // introducer + label
        let block_size = self.cursor.read_u8()?;
        let packed_fields = self.cursor.read_u8()?;
        let delay_time = self.cursor.read_u16_le()?;
        let transparent_color_index = self.cursor.read_u8()?;
        let block_terminator = self.cursor.read_u8()?;

        if block_size != 4 || block_terminator != 0 {
            warn!(
                "graphic control extension at offset {begin} has block size {block_size} and terminator 0x{block_terminator:02x}"
            );
        }

        let fields = bitfield::decode(packed_fields, bitfield::GRAPHIC_CONTROL_LAYOUT)?;

        Ok(GraphicControlExtension {
            span: Span::new(begin, self.cursor.position()),
            block_size,
            packed_fields,
            reserved: fields.value("reserved"),
            disposal_method: fields.value("disposal_method"),
            user_input_flag: fields.flag("user_input"),
            transparent_color_flag: fields.flag("transparent_color"),
            delay_time,
            transparent_color_index,
        })
    }

    fn read_rendering_block(&mut self) -> Result<GraphicRenderingBlock> {
        let lookahead = self.cursor.peek(2)?;

        if lookahead == [EXTENSION_INTRODUCER, PLAIN_TEXT_EXTENSION] {
            Ok(GraphicRenderingBlock::PlainText(self.read_plain_text_extension()?))
        } else {
            Ok(GraphicRenderingBlock::Image(self.read_table_based_image()?))
        }
    }

    fn read_plain_text_extension(&mut self) -> Result<PlainTextExtension> {
        let begin = self.cursor.position();
        self.cursor.skip(2)?;
        let block_size = self.cursor.read_u8()?;
        let header = self.cursor.read_exact(block_size.into())?;
        let data = read_chain(self.cursor)?;

        Ok(PlainTextExtension {
            span: Span::new(begin, self.cursor.position()),
            block_size,
            header,
            data,
        })
    }

    fn read_table_based_image(&mut self) -> Result<TableBasedImage> {
        let begin = self.cursor.position();
        let descriptor = self.read_image_descriptor()?;

        let local_color_table = match descriptor.local_color_table_len() {
            Some(len) => Some(self.read_color_table(len)?),
            None => None,
        };

        let lzw_minimum_code_size = self.cursor.read_u8()?;
        let image_data = read_chain(self.cursor)?;

        Ok(TableBasedImage {
            span: Span::new(begin, self.cursor.position()),
            descriptor,
            local_color_table,
            lzw_minimum_code_size,
            image_data,
        })
    }

    fn read_image_descriptor(&mut self) -> Result<ImageDescriptor> {
        let begin = self.cursor.position();
        let separator = self.cursor.read_u8()?;
        if separator != IMAGE_SEPARATOR {
            return Err(DecodeError::structural(
                begin,
                format!("expected image separator 0x2c, found 0x{separator:02x}"),
            ));
        }

        let left_position = self.cursor.read_u16_le()?;
        let top_position = self.cursor.read_u16_le()?;
        let width = self.cursor.read_u16_le()?;
        let height = self.cursor.read_u16_le()?;
        let packed_fields = self.cursor.read_u8()?;

        let fields = bitfield::decode(packed_fields, bitfield::IMAGE_LAYOUT)?;
        let color_table_size = fields.value("color_table_size");
        debug_assert!(color_table_len(color_table_size) <= 256);

        Ok(ImageDescriptor {
            span: Span::new(begin, self.cursor.position()),
            left_position,
            top_position,
            width,
            height,
            packed_fields,
            local_color_table_flag: fields.flag("local_color_table"),
            interlace_flag: fields.flag("interlace"),
            sort_flag: fields.flag("sort"),
            reserved: fields.value("reserved"),
            color_table_size,
        })
    }

    fn read_application_extension(&mut self) -> Result<ApplicationExtension> {
        let begin = self.cursor.position();
        self.cursor.skip(2)?;
        let block_size = self.cursor.read_u8()?;
        let fixed = self.cursor.read_exact(block_size.into())?;
        let data = read_chain(self.cursor)?;

        Ok(ApplicationExtension {
            span: Span::new(begin, self.cursor.position()),
            block_size,
            fixed,
            data,
        })
    }

    fn read_comment_extension(&mut self) -> Result<CommentExtension> {
        let begin = self.cursor.position();
        self.cursor.skip(2)?;
        let data = read_chain(self.cursor)?;

        Ok(CommentExtension {
            span: Span::new(begin, self.cursor.position()),
            data,
        })
    }

    fn read_trailer(&mut self) -> Result<()> {
        let offset = self.cursor.position();
        let found = if self.cursor.at_end() {
            None
        } else {
            Some(self.cursor.peek_byte()?)
        };

        if found == Some(TRAILER) {
            self.cursor.skip(1)?;
            self.trailer = Some(Trailer {
                span: Span::new(offset, self.cursor.position()),
            });
            debug!("processed trailer at offset {offset}");
        } else {
            let warning = DecodeWarning::MissingTrailer { offset, found };
            warn!("{warning}");
            self.warnings.push(warning);
        }

        Ok(())
    }
}
