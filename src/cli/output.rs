//! Output formatting for decrypted records.

use std::io::Write;

use clap::ValueEnum;
use tlsdecrypt_core::Plaintext;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Offset, hex bytes and printable ASCII (default)
    Hex,
    /// Plaintext as UTF-8, invalid sequences replaced
    Text,
}

/// Formats decrypted records for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Write one decrypted record, preceded by a summary line.
    pub fn write<W: Write>(
        &self,
        index: usize,
        plaintext: &Plaintext,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writeln!(
            writer,
            "record {index}: type={} len={}{}",
            plaintext.content_type,
            plaintext.data.len(),
            if plaintext.authenticated {
                ""
            } else {
                " (not authenticated)"
            }
        )?;
        match self.format {
            OutputFormat::Hex => write_hex_dump(&plaintext.data, writer),
            OutputFormat::Text => {
                writeln!(writer, "{}", String::from_utf8_lossy(&plaintext.data))
            }
        }
    }
}

fn write_hex_dump<W: Write>(data: &[u8], writer: &mut W) -> std::io::Result<()> {
    for (line, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        writeln!(writer, "{:08x}  {:<47}  |{}|", line * 16, hex.join(" "), ascii)?;
    }
    Ok(())
}
