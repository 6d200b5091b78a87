use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::Result;
use crate::predictor::Prediction;

/// Serialization of written predictions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Delimited table with a header row.
    #[default]
    Csv,

    /// Array of `{"label": ..., "probability": ...}` records.
    Json,
}

impl OutputFormat {
    /// Name of the predictions file.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "predictions.csv",
            Self::Json => "predictions.json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err("Could not parse an output format. {csv, json}"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Writes predictions in input order.
pub fn write_predictions<W>(predictions: &[Prediction], format: OutputFormat, wtr: W) -> Result<()>
where
    W: Write,
{
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(wtr);
            wtr.write_record(["label", "probability"])?;
            for p in predictions {
                let probability = p.probability.to_string();
                wtr.write_record([p.label.as_str(), probability.as_str()])?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let mut wtr = wtr;
            serde_json::to_writer(&mut wtr, predictions)?;
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Writes predictions into `dir` and returns the path of the written file.
pub fn save_predictions<P>(
    predictions: &[Prediction],
    format: OutputFormat,
    dir: P,
) -> Result<PathBuf>
where
    P: AsRef<Path>,
{
    let path = dir.as_ref().join(format.file_name());
    write_predictions(predictions, format, BufWriter::new(File::create(&path)?))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictions() -> Vec<Prediction> {
        vec![
            Prediction {
                label: "yes".to_string(),
                probability: 0.75,
            },
            Prediction {
                label: "no".to_string(),
                probability: 0.5,
            },
        ]
    }

    #[test]
    fn test_write_csv() {
        let mut buf = vec![];
        write_predictions(&predictions(), OutputFormat::Csv, &mut buf).unwrap();
        assert_eq!(
            "label,probability\nyes,0.75\nno,0.5\n",
            String::from_utf8(buf).unwrap()
        );
    }

    #[test]
    fn test_write_json() {
        let mut buf = vec![];
        write_predictions(&predictions(), OutputFormat::Json, &mut buf).unwrap();
        assert_eq!(
            r#"[{"label":"yes","probability":0.75},{"label":"no","probability":0.5}]"#,
            String::from_utf8(buf).unwrap()
        );
    }

    #[test]
    fn test_write_empty_csv() {
        let mut buf = vec![];
        write_predictions(&[], OutputFormat::Csv, &mut buf).unwrap();
        assert_eq!("label,probability\n", String::from_utf8(buf).unwrap());
    }

    #[test]
    fn test_save_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_predictions(&predictions(), OutputFormat::Json, dir.path()).unwrap();
        assert_eq!(dir.path().join("predictions.json"), path);
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with('['));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(Ok(OutputFormat::Json), "json".parse());
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
