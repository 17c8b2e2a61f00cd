use std::io;

use anyhow::Result;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::mbim::InfoReport;

/// Writes a status report to `out`.
#[instrument(
    skip(out, report),
    level = "debug",
    fields(interface = report.interface(), ?output_format)
)]
pub(crate) fn write<W>(
    out: &mut W,
    report: &InfoReport,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    match output_format {
        OutputFormat::Pretty => {
            writeln!(out, "{report}")?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
