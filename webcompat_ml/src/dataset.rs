use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::errors::{Result, WebcompatError};
use crate::tokenizer::Analyzer;

/// Free-text column of an issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextField {
    Body,
    Title,
    Labels,
}

impl TextField {
    /// Name of the CSV column.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Title => "title",
            Self::Labels => "labels",
        }
    }

    /// Tokenizer used when vectorizing this field.
    pub const fn analyzer(self) -> Analyzer {
        match self {
            Self::Body | Self::Title => Analyzer::English,
            Self::Labels => Analyzer::Labels,
        }
    }
}

/// Columns every input dataset must provide.
pub const REQUIRED_COLUMNS: [TextField; 3] = [TextField::Title, TextField::Body, TextField::Labels];

/// The two fixed classification pipelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Predicts whether an issue will be closed as invalid.
    Invalid,

    /// Predicts whether an issue needs diagnosis.
    NeedsDiagnosis,
}

impl PipelineKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NeedsDiagnosis => "needsdiagnosis",
        }
    }

    /// Name of the target column.
    pub const fn target_column(self) -> &'static str {
        self.name()
    }

    /// Feature fields in the order their sub-vectors are concatenated.
    pub const fn text_fields(self) -> &'static [TextField] {
        match self {
            Self::Invalid => &[TextField::Body, TextField::Title, TextField::Labels],
            Self::NeedsDiagnosis => &[TextField::Body, TextField::Title],
        }
    }
}

impl FromStr for PipelineKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid" => Ok(Self::Invalid),
            "needsdiagnosis" => Ok(Self::NeedsDiagnosis),
            _ => Err("Could not parse a pipeline name. {invalid, needsdiagnosis}"),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One bug report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub body: String,
    pub labels: String,

    /// Value of the target column, absent when predicting.
    pub target: Option<String>,
}

impl Record {
    pub fn new<S>(title: S, body: S, labels: S, target: Option<S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            title: title.into(),
            body: body.into(),
            labels: labels.into(),
            target: target.map(Into::into),
        }
    }

    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Body => &self.body,
            TextField::Title => &self.title,
            TextField::Labels => &self.labels,
        }
    }
}

fn column_position(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Reads records from delimited text with a header row.
///
/// Empty cells are read as empty strings. Extra columns are ignored.
///
/// # Arguments
///
/// * `rdr` - A data source.
/// * `kind` - Pipeline whose target column is read.
/// * `require_target` - Whether every target cell must be non-empty. The
///   target column itself is always required; unlabelled rows leave it blank.
///
/// # Errors
///
/// [`WebcompatError::SchemaMismatch`] is returned when a required column is
/// missing or a required target cell is empty.
pub fn read_records<R>(rdr: R, kind: PipelineKind, require_target: bool) -> Result<Vec<Record>>
where
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = rdr.headers()?.clone();

    let mut missing = vec![];
    let mut text_positions = [0; 3];
    for (pos, field) in text_positions.iter_mut().zip(REQUIRED_COLUMNS) {
        match column_position(&headers, field.column()) {
            Some(i) => *pos = i,
            None => missing.push(field.column()),
        }
    }
    let target_position = column_position(&headers, kind.target_column());
    if target_position.is_none() {
        missing.push(kind.target_column());
    }
    if !missing.is_empty() {
        return Err(WebcompatError::schema_mismatch(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }
    let [title_pos, body_pos, labels_pos] = text_positions;

    let mut records = vec![];
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let cell = |pos: usize| row.get(pos).unwrap_or("").to_string();
        let target = match target_position {
            Some(pos) => {
                let value = cell(pos);
                if value.is_empty() {
                    if require_target {
                        return Err(WebcompatError::schema_mismatch(format!(
                            "row {}: empty {} cell",
                            i + 1,
                            kind.target_column()
                        )));
                    }
                    None
                } else {
                    Some(value)
                }
            }
            None => None,
        };
        records.push(Record {
            title: cell(title_pos),
            body: cell(body_pos),
            labels: cell(labels_pos),
            target,
        });
    }
    Ok(records)
}

/// Reads records from a CSV file.
pub fn read_records_from_path<P>(
    path: P,
    kind: PipelineKind,
    require_target: bool,
) -> Result<Vec<Record>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| WebcompatError::file_io(path, e))?;
    let records = read_records(f, kind, require_target)?;
    info!(path = %path.display(), n_records = records.len(), "loaded dataset");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_records() {
        let data = "\
title,body,labels,invalid
Video freezes,It stops after 3s,browser-firefox,yes
\"Menu, broken\",Cannot click,,no
";
        let records = read_records(data.as_bytes(), PipelineKind::Invalid, true).unwrap();
        assert_eq!(
            vec![
                Record::new("Video freezes", "It stops after 3s", "browser-firefox", Some("yes")),
                Record::new("Menu, broken", "Cannot click", "", Some("no")),
            ],
            records
        );
    }

    #[test]
    fn test_read_records_column_order_and_extra_columns() {
        let data = "id,labels,needsdiagnosis,body,title\n7,os-linux,1,b,t\n";
        let records = read_records(data.as_bytes(), PipelineKind::NeedsDiagnosis, true).unwrap();
        assert_eq!(vec![Record::new("t", "b", "os-linux", Some("1"))], records);
    }

    #[test]
    fn test_read_records_missing_column() {
        let data = "title,labels,invalid\nt,l,yes\n";
        let err = read_records(data.as_bytes(), PipelineKind::Invalid, true).unwrap_err();
        assert_eq!(
            "SchemaMismatchError: missing required column(s): body",
            err.to_string()
        );
    }

    #[test]
    fn test_read_records_missing_target() {
        let data = "title,body,labels\nt,b,l\n";
        assert!(matches!(
            read_records(data.as_bytes(), PipelineKind::Invalid, true),
            Err(WebcompatError::SchemaMismatch { .. })
        ));
        let err = read_records(data.as_bytes(), PipelineKind::Invalid, false).unwrap_err();
        assert_eq!(
            "SchemaMismatchError: missing required column(s): invalid",
            err.to_string()
        );
    }

    #[test]
    fn test_read_records_unlabelled() {
        let data = "title,body,labels,invalid\nt,b,l,\nu,c,m,no\n";
        let records = read_records(data.as_bytes(), PipelineKind::Invalid, false).unwrap();
        assert_eq!(
            vec![
                Record::new("t", "b", "l", None),
                Record::new("u", "c", "m", Some("no")),
            ],
            records
        );
    }

    #[test]
    fn test_read_records_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.csv");
        let err = read_records_from_path(&path, PipelineKind::Invalid, false).unwrap_err();
        assert!(matches!(
            &err,
            WebcompatError::FileIOError { path: p, .. } if p == &path
        ));
        assert!(err.to_string().contains("issues.csv"));
    }

    #[test]
    fn test_read_records_empty_target() {
        let data = "title,body,labels,invalid\nt,b,l,\n";
        assert!(matches!(
            read_records(data.as_bytes(), PipelineKind::Invalid, true),
            Err(WebcompatError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_pipeline_kind_from_str() {
        assert_eq!(Ok(PipelineKind::Invalid), "invalid".parse());
        assert_eq!(Ok(PipelineKind::NeedsDiagnosis), "needsdiagnosis".parse());
        assert!("other".parse::<PipelineKind>().is_err());
    }

    #[test]
    fn test_text_fields_order() {
        assert_eq!(
            &[TextField::Body, TextField::Title],
            PipelineKind::NeedsDiagnosis.text_fields()
        );
        assert_eq!(TextField::Labels, PipelineKind::Invalid.text_fields()[2]);
    }
}
