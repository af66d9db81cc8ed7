use crate::error::CliError;
use model::records::outcome::Outcome;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// JSON-lines sinks for the two outcome channels. A channel without a
/// file is discarded.
pub struct OutcomeWriter {
    accepted: Option<BufWriter<File>>,
    rejected: Option<BufWriter<File>>,
}

impl OutcomeWriter {
    pub fn create(accepted: Option<&str>, rejected: Option<&str>) -> Result<Self, CliError> {
        Ok(OutcomeWriter {
            accepted: accepted.map(open).transpose()?,
            rejected: rejected.map(open).transpose()?,
        })
    }

    pub fn write(&mut self, outcome: &Outcome) -> Result<(), CliError> {
        match outcome {
            Outcome::Accepted(record) => {
                if let Some(out) = self.accepted.as_mut() {
                    write_line(out, &record.to_json())?;
                }
            }
            Outcome::Rejected(rejected) => {
                if let Some(out) = self.rejected.as_mut() {
                    let json: serde_json::Map<_, _> = rejected
                        .to_storage_map()
                        .into_iter()
                        .map(|(key, value)| (key, value.to_json()))
                        .collect();
                    write_line(out, &serde_json::Value::Object(json))?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), CliError> {
        for out in [self.accepted.as_mut(), self.rejected.as_mut()]
            .into_iter()
            .flatten()
        {
            out.flush()?;
        }
        Ok(())
    }
}

fn open(path: &str) -> Result<BufWriter<File>, CliError> {
    Ok(BufWriter::new(File::create(Path::new(path))?))
}

fn write_line(out: &mut BufWriter<File>, json: &serde_json::Value) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, json)?;
    out.write_all(b"\n")?;
    Ok(())
}
