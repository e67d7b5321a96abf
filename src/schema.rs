//! Variable schema resolution.
//!
//! Aligners never look columns up by name while reshaping. A schema maps the
//! caller's ordered variable names onto column indices once per query, so an
//! unknown name fails here with `MissingVariable` before any grouping work.

use crate::model::{AlignError, RawRecord, Result};

/// Caller-ordered variable names resolved to column positions of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSchema {
    names: Vec<String>,
    indices: Vec<usize>,
}

impl VariableSchema {
    /// Resolves `requested` against `columns`. Names are compared after
    /// trimming surrounding whitespace on both sides.
    pub fn resolve<S: AsRef<str>>(columns: &[String], requested: &[S]) -> Result<Self> {
        let mut names = Vec::with_capacity(requested.len());
        let mut indices = Vec::with_capacity(requested.len());

        for name in requested {
            let name = name.as_ref().trim();
            let idx = columns
                .iter()
                .position(|c| c.trim() == name)
                .ok_or_else(|| AlignError::MissingVariable {
                    variable: name.to_string(),
                })?;
            names.push(name.to_string());
            indices.push(idx);
        }

        Ok(VariableSchema { names, indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Projects one record onto the schema, in schema order.
    pub fn project(&self, record: &RawRecord) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.len());
        self.project_into(record, &mut out)?;
        Ok(out)
    }

    /// Projects one record at full cell precision.
    pub fn project_raw(&self, record: &RawRecord) -> Result<Vec<f64>> {
        self.names
            .iter()
            .zip(&self.indices)
            .map(|(name, &idx)| {
                record.values.get(idx).copied().flatten().ok_or_else(|| AlignError::MissingVariable {
                    variable: name.clone(),
                })
            })
            .collect()
    }

    /// Appends the projection of `record` to `out`. An empty cell is a
    /// `MissingVariable` error; nothing is appended on failure.
    pub fn project_into(&self, record: &RawRecord, out: &mut Vec<f32>) -> Result<()> {
        let start = out.len();
        for (name, &idx) in self.names.iter().zip(&self.indices) {
            match record.values.get(idx).copied().flatten() {
                Some(v) => out.push(v as f32),
                None => {
                    out.truncate(start);
                    return Err(AlignError::MissingVariable {
                        variable: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
