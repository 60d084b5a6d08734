//! Subcommand implementations.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tlsdecrypt_core::session::{ClientHello, ServerHello};
use tlsdecrypt_core::{
    export_key, suites, DecryptConfig, Direction, KeyLog, ProtocolVersion, SecretCacheSet,
    SecretMaterial, Tls13Revision, TlsSession,
};
use tracing::warn;

use super::{DecryptArgs, OutputFormatter};

/// Print entry counts for a key log file.
pub fn summarize_keylog<W: Write>(path: &Path, strict: bool, out: &mut W) -> Result<()> {
    let keylog = if strict {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read key log: {}", path.display()))?;
        KeyLog::parse_strict(&content)
    } else {
        KeyLog::from_file(path)
    }
    .with_context(|| format!("Failed to parse key log: {}", path.display()))?;

    writeln!(out, "Key log: {}", path.display())?;
    writeln!(out, "{:-<50}", "")?;
    writeln!(out, "  Sessions:        {}", keylog.session_count())?;
    writeln!(out, "  Entries:         {}", keylog.entry_count())?;
    writeln!(out, "  Ignored labels:  {}", keylog.ignored_lines())?;
    writeln!(out, "  Malformed lines: {}", keylog.skipped_lines())?;
    Ok(())
}

/// Print the cipher suite registry.
pub fn list_suites<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{:<8} {:<48} {:<10} {:<10} {:<8}", "ID", "Name", "Kx", "Cipher", "Mode")?;
    writeln!(out, "{:-<88}", "")?;
    for suite in suites::all() {
        writeln!(
            out,
            "0x{:04x}   {:<48} {:<10} {:<10} {:<8}",
            suite.id,
            suite.name,
            format!("{:?}", suite.kex),
            format!("{:?}", suite.enc),
            format!("{:?}", suite.mode)
        )?;
    }
    Ok(())
}

/// Set up one session from the arguments and decrypt its records in order.
pub fn decrypt_records<W: Write>(args: &DecryptArgs, out: &mut W) -> Result<()> {
    let caches = SecretCacheSet::new();
    if let Some(path) = &args.keylog {
        let keylog = KeyLog::from_file(path)
            .with_context(|| format!("Failed to load key log: {}", path.display()))?;
        keylog.load_into(&caches);
    }

    let mut config = DecryptConfig {
        ignore_auth_failures: args.ignore_auth_failures,
        decompress: !args.no_decompress,
        ..Default::default()
    };
    if args.tls13_draft {
        config = config.with_tls13_revision(Tls13Revision::Draft);
    }
    if let Some(psk) = &args.psk {
        config = config.with_psk(hex::decode(psk).context("Invalid PSK hex")?);
    }

    let mut session = TlsSession::new(Arc::new(caches), config);
    session.process_client_hello(&ClientHello {
        random: args.client_random,
        encrypt_then_mac: args.encrypt_then_mac,
        ..Default::default()
    });
    session
        .process_server_hello(&ServerHello {
            random: args.server_random,
            cipher_suite: args.cipher_suite,
            version: args.protocol_version,
            compression: args.compression,
            encrypt_then_mac: args.encrypt_then_mac,
            ..Default::default()
        })
        .context("Unusable session parameters")?;
    if let Some(premaster) = &args.premaster {
        let premaster = hex::decode(premaster).context("Invalid pre-master hex")?;
        session.set_pre_master_secret(SecretMaterial::new(premaster))?;
    }

    let direction = Direction::from(args.direction);
    let version = ProtocolVersion::from_wire(args.protocol_version)
        .context("Unsupported protocol version")?;
    if version.is_tls13() {
        if args.application {
            session.mark_finished(direction)?;
        }
    } else {
        session.change_cipher_spec(direction);
    }

    if session.decoder(direction).is_none() {
        bail!("No key material for the {direction} side of this session");
    }

    let formatter = OutputFormatter::new(args.format);
    let record_version = version.record_version();
    for (index, record) in args.records.iter().enumerate() {
        let result = match record.dtls {
            Some((epoch, seq)) => session.decrypt_dtls_record(
                direction,
                record.content_type,
                record_version,
                epoch,
                seq,
                &record.fragment,
            ),
            None => session.decrypt_record(
                direction,
                record.content_type,
                record_version,
                &record.fragment,
            ),
        };
        match result {
            Ok(plaintext) => formatter.write(index, &plaintext, out)?,
            Err(e) if e.is_recoverable() => {
                warn!(index, "record skipped: {e}");
                writeln!(out, "record {index}: {e}")?;
            }
            Err(e) => return Err(e).with_context(|| format!("Record {index}")),
        }
    }

    if args.export_keys {
        match export_key(&session) {
            Some(key) => writeln!(out, "{key}")?,
            None => writeln!(out, "# no master secret to export")?,
        }
    }
    Ok(())
}
