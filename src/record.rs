//! Persisted alignment record.
//!
//! Text format, one header line then one line per projection:
//!
//! ```text
//! rotation axis, 63.5
//! scan_0000.h5, 2, -1
//! scan_0001.h5, 0, 4
//! ```
//!
//! Re-loading a record restores the same `dx`/`dy` per filename, so a
//! saved alignment can be re-applied to a freshly loaded dataset.

use std::fs;
use std::path::Path;
use tracing::warn;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub filename: String,
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub center_x: f64,
    pub entries: Vec<RecordEntry>,
}

impl AlignmentRecord {
    pub fn new(center_x: f64, filenames: &[String], dx: &[i32], dy: &[i32]) -> Self {
        let entries = filenames
            .iter()
            .zip(dx.iter().zip(dy))
            .map(|(filename, (&dx, &dy))| RecordEntry {
                filename: filename.clone(),
                dx,
                dy,
            })
            .collect();
        Self { center_x, entries }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let mut out = format!("rotation axis, {}\n", self.center_x);
        for entry in &self.entries {
            out.push_str(&format!("{}, {}, {}\n", entry.filename, entry.dx, entry.dy));
        }
        fs::write(path.as_ref(), out)
            .with_context(|| format!("writing alignment record {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Parse a record file. Any malformed line fails the whole load so a
    /// partial record can never be applied.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading alignment record {:?}", path.as_ref()))?;
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty alignment record"))?;
        let center_x = header
            .strip_prefix("rotation axis,")
            .ok_or_else(|| anyhow::anyhow!("missing 'rotation axis' header: {:?}", header))?
            .trim()
            .parse::<f64>()
            .with_context(|| format!("bad rotation axis value in {:?}", header))?;

        let mut entries = Vec::new();
        for line in lines {
            let mut parts = line.rsplitn(3, ',');
            let dy = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("malformed record line: {:?}", line))?;
            let dx = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("malformed record line: {:?}", line))?;
            let filename = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("malformed record line: {:?}", line))?;
            entries.push(RecordEntry {
                filename: filename.trim().to_string(),
                dx: dx
                    .trim()
                    .parse()
                    .with_context(|| format!("bad dx in {:?}", line))?,
                dy: dy
                    .trim()
                    .parse()
                    .with_context(|| format!("bad dy in {:?}", line))?,
            });
        }

        Ok(Self { center_x, entries })
    }

    /// Shift values for `filenames`, matched by name. Files absent from the
    /// record keep `(0, 0)` and are reported with a warning; extra record
    /// entries are warned about and ignored.
    pub fn shifts_for(&self, filenames: &[String]) -> (Vec<i32>, Vec<i32>) {
        let mut dx = vec![0; filenames.len()];
        let mut dy = vec![0; filenames.len()];
        for entry in &self.entries {
            match filenames.iter().position(|f| *f == entry.filename) {
                Some(i) => {
                    dx[i] = entry.dx;
                    dy[i] = entry.dy;
                }
                None => warn!(filename = %entry.filename, "record entry matches no projection"),
            }
        }
        for (i, filename) in filenames.iter().enumerate() {
            if !self.entries.iter().any(|e| e.filename == *filename) {
                warn!(index = i, filename = %filename, "projection missing from record");
            }
        }
        (dx, dy)
    }
}
