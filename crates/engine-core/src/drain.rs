use crate::{counters::ReturnValues, error::ReaderError, reader::ResultReader};
use connectors::bulk::runtime::BulkRuntime;
use model::records::outcome::Outcome;
use tracing::error;

/// Runs a reader to exhaustion, handing every outcome to `sink`.
///
/// The reader is closed on every path. A read or sink failure stops the
/// loop and is returned after closing; a close failure is only reported
/// when nothing failed before it.
pub async fn drain<R, F, E>(reader: &mut ResultReader<R>, mut sink: F) -> Result<ReturnValues, E>
where
    R: BulkRuntime,
    F: FnMut(&Outcome) -> Result<(), E>,
    E: From<ReaderError>,
{
    let result = pump(reader, &mut sink).await;

    let closed = reader.close().await;
    if let Err(err) = &closed
        && result.is_err()
    {
        error!("Failed to close reader after an earlier error: {}", err);
    }

    result?;
    closed?;
    Ok(reader.return_values())
}

async fn pump<R, F, E>(reader: &mut ResultReader<R>, sink: &mut F) -> Result<(), E>
where
    R: BulkRuntime,
    F: FnMut(&Outcome) -> Result<(), E>,
    E: From<ReaderError>,
{
    let mut has_row = reader.start().await?;
    while has_row {
        if let Some(outcome) = reader.current() {
            sink(outcome)?;
        }
        has_row = reader.advance().await?;
    }
    Ok(())
}
