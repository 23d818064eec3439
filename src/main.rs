use std::env;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, BufWriter};

use anyhow::{Context, Result};
use log::{debug, error};

use binspect::cursor::Cursor;
use binspect::gif::Decoder;
use binspect::mp4::BoxDecoder;
use binspect::render::TextRenderer;
use binspect::tree::Inspect;
use binspect::DecodeError;

const USAGE: &str = "usage: binspect <file.gif|file.mp4>";

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args_os().nth(1) else {
        println!("{USAGE}");
        return Ok(());
    };

    let file = File::open(&path)
        .with_context(|| format!("cannot open {}", path.to_string_lossy()))?;
    let mut cursor = Cursor::new(BufReader::new(file))?;

    let stdout = io::stdout().lock();
    let mut renderer = TextRenderer::new(BufWriter::new(stdout));

    if cursor.peek(3).is_ok_and(|magic| magic == b"GIF") {
        debug!("decoding {} as gif", path.to_string_lossy());

        let outcome = Decoder::new(&mut cursor)
            .decode()
            .context("not a decodable GIF stream")?;
        let gif = &outcome.tree;

        renderer.render(&gif.inspect())?;
        for warning in &gif.warnings {
            eprintln!("warning: {warning}");
        }
        report(
            renderer,
            format!("graphic blocks: {}", gif.graphic_blocks().count()),
            outcome.error.as_ref(),
        )?;
    } else {
        debug!("decoding {} as a box tree", path.to_string_lossy());

        let outcome = BoxDecoder::new().decode(&mut cursor);
        for b in &outcome.tree.boxes {
            renderer.render(&b.inspect())?;
        }
        report(
            renderer,
            format!("boxes: {}", outcome.tree.count()),
            outcome.error.as_ref(),
        )?;
    }

    Ok(())
}

/// Finishes a dump. A decode error only ever follows the partial tree already printed.
fn report<W: Write>(renderer: TextRenderer<W>, summary: String, error: Option<&DecodeError>) -> Result<()> {
    let mut out = renderer.into_inner();
    writeln!(out, "{summary}")?;
    out.flush()?;

    if let Some(decode_error) = error {
        error!("decoding stopped early: {decode_error}");
        eprintln!("error: {decode_error}");
    }
    Ok(())
}
