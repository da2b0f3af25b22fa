//! The sktime/aeon `.ts` time-series text format.
//!
//! A `.ts` file is a block of `@tag` header lines followed by `@data` and one
//! line per sample. Each sample line holds colon-separated channel blocks,
//! each block a comma-separated numeric sequence, with a trailing label token
//! when the header declares class labels:
//!
//! ```text
//! @problemName SensorData
//! @dimensions 6
//! @seriesLength 100
//! @classLabel true walking jogging
//! @data
//! 0.1,0.2,...:0.3,0.4,...:...:walking
//! ```

use serde::{Deserialize, Serialize};

/// Parsed `.ts` header tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TsHeader {
    /// `@problemName`
    pub problem_name: String,
    /// `@timeStamps`
    pub timestamps: bool,
    /// `@missing`
    pub missing: bool,
    /// `@univariate`
    pub univariate: bool,
    /// `@dimensions`, when declared
    pub dimensions: Option<usize>,
    /// `@equalLength`
    pub equal_length: bool,
    /// `@seriesLength`, when declared
    pub series_length: Option<usize>,
    /// Labels enumerated on the `@classLabel` line; empty when the dataset
    /// is unlabeled (`@classLabel false`)
    pub class_labels: Vec<String>,
}

impl TsHeader {
    /// Whether sample lines carry a trailing label token.
    pub fn has_class_labels(&self) -> bool {
        !self.class_labels.is_empty()
    }

    /// Render the header back to `.ts` tag lines, ending with `@data`.
    pub fn to_ts_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("@problemName {}\n", self.problem_name));
        out.push_str(&format!("@timeStamps {}\n", self.timestamps));
        out.push_str(&format!("@missing {}\n", self.missing));
        out.push_str(&format!("@univariate {}\n", self.univariate));
        if let Some(d) = self.dimensions {
            out.push_str(&format!("@dimensions {d}\n"));
        }
        out.push_str(&format!("@equalLength {}\n", self.equal_length));
        if let Some(l) = self.series_length {
            out.push_str(&format!("@seriesLength {l}\n"));
        }
        if self.class_labels.is_empty() {
            out.push_str("@classLabel false\n");
        } else {
            out.push_str(&format!("@classLabel true {}\n", self.class_labels.join(" ")));
        }
        out.push_str("@data\n");
        out
    }
}

/// One multi-channel sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsSample {
    /// One numeric sequence per channel
    pub channels: Vec<Vec<f64>>,
    /// Trailing label token, when present
    pub label: Option<String>,
}

impl TsSample {
    /// Check the sample shape against the expected channel count and series
    /// length. The first `num_channels` channels must each hold exactly
    /// `series_length` values.
    pub fn validate_shape(
        &self,
        num_channels: usize,
        series_length: usize,
    ) -> Result<(), FormatError> {
        if self.channels.len() < num_channels {
            return Err(FormatError::BadShape {
                expected: num_channels,
                got: self.channels.len(),
            });
        }
        for (i, channel) in self.channels.iter().take(num_channels).enumerate() {
            if channel.len() != series_length {
                return Err(FormatError::BadSeriesLength {
                    channel: i,
                    expected: series_length,
                    got: channel.len(),
                });
            }
        }
        Ok(())
    }

    /// Render the sample back to a `.ts` data line.
    pub fn to_ts_line(&self) -> String {
        let mut blocks: Vec<String> = self
            .channels
            .iter()
            .map(|ch| {
                ch.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        if let Some(ref label) = self.label {
            blocks.push(label.clone());
        }
        blocks.join(":")
    }
}

/// A fully parsed `.ts` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsDocument {
    pub header: TsHeader,
    pub samples: Vec<TsSample>,
}

impl TsDocument {
    /// Render the document back to `.ts` text. Round-trips [`parse`].
    pub fn to_ts_string(&self) -> String {
        let mut out = self.header.to_ts_string();
        for sample in &self.samples {
            out.push_str(&sample.to_ts_line());
            out.push('\n');
        }
        out
    }
}

/// `.ts` parse and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The `@data` tag never appeared
    MissingDataTag,
    /// A header tag line could not be interpreted
    BadHeader { line: usize, message: String },
    /// A value in a data line failed to parse as a float
    BadValue { line: usize, value: String },
    /// A sample had fewer channels than expected
    BadShape { expected: usize, got: usize },
    /// A channel held the wrong number of values
    BadSeriesLength {
        channel: usize,
        expected: usize,
        got: usize,
    },
    /// The body contained no samples
    EmptyBody,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::MissingDataTag => write!(f, "missing @data tag"),
            FormatError::BadHeader { line, message } => {
                write!(f, "bad header at line {line}: {message}")
            }
            FormatError::BadValue { line, value } => {
                write!(f, "bad numeric value {value:?} at line {line}")
            }
            FormatError::BadShape { expected, got } => {
                write!(f, "expected {expected} channels, got {got}")
            }
            FormatError::BadSeriesLength {
                channel,
                expected,
                got,
            } => write!(
                f,
                "channel {channel} holds {got} values, expected {expected}"
            ),
            FormatError::EmptyBody => write!(f, "no samples after @data"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Parse `.ts` text into a document.
pub fn parse(text: &str) -> Result<TsDocument, FormatError> {
    let mut header = TsHeader {
        equal_length: true,
        ..TsHeader::default()
    };
    let mut samples = Vec::new();
    let mut in_body = false;
    let mut saw_data_tag = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !in_body {
            if let Some(rest) = line.strip_prefix('@') {
                let (tag, value) = match rest.split_once(char::is_whitespace) {
                    Some((t, v)) => (t, v.trim()),
                    None => (rest, ""),
                };
                match tag.to_ascii_lowercase().as_str() {
                    "data" => {
                        saw_data_tag = true;
                        in_body = true;
                    }
                    "problemname" => header.problem_name = value.to_string(),
                    "timestamps" => header.timestamps = parse_bool(value, line_no)?,
                    "missing" => header.missing = parse_bool(value, line_no)?,
                    "univariate" => header.univariate = parse_bool(value, line_no)?,
                    "equallength" => header.equal_length = parse_bool(value, line_no)?,
                    "dimensions" => {
                        header.dimensions =
                            Some(value.parse().map_err(|_| FormatError::BadHeader {
                                line: line_no,
                                message: format!("invalid @dimensions value {value:?}"),
                            })?)
                    }
                    "serieslength" => {
                        header.series_length =
                            Some(value.parse().map_err(|_| FormatError::BadHeader {
                                line: line_no,
                                message: format!("invalid @seriesLength value {value:?}"),
                            })?)
                    }
                    "classlabel" => {
                        let mut parts = value.split_whitespace();
                        let flag = parse_bool(parts.next().unwrap_or(""), line_no)?;
                        header.class_labels = if flag {
                            parts.map(|s| s.to_string()).collect()
                        } else {
                            Vec::new()
                        };
                    }
                    // Unknown tags are tolerated, matching the loader the
                    // mobile client was written against.
                    _ => {}
                }
            } else {
                return Err(FormatError::BadHeader {
                    line: line_no,
                    message: format!("unexpected line before @data: {line:?}"),
                });
            }
        } else {
            samples.push(parse_data_line(line, line_no, header.has_class_labels())?);
        }
    }

    if !saw_data_tag {
        return Err(FormatError::MissingDataTag);
    }
    if samples.is_empty() {
        return Err(FormatError::EmptyBody);
    }

    Ok(TsDocument { header, samples })
}

/// Parse one `.ts` data line into a sample.
pub fn parse_data_line(
    line: &str,
    line_no: usize,
    has_label: bool,
) -> Result<TsSample, FormatError> {
    let mut blocks: Vec<&str> = line.split(':').collect();

    let label = if has_label {
        let token = blocks.pop().ok_or(FormatError::EmptyBody)?;
        Some(token.trim().to_string())
    } else {
        None
    };

    if blocks.is_empty() {
        return Err(FormatError::BadShape {
            expected: 1,
            got: 0,
        });
    }

    let mut channels = Vec::with_capacity(blocks.len());
    for block in blocks {
        let mut values = Vec::new();
        for raw in block.split(',') {
            let v = raw.trim();
            values.push(v.parse::<f64>().map_err(|_| FormatError::BadValue {
                line: line_no,
                value: v.to_string(),
            })?);
        }
        channels.push(values);
    }

    Ok(TsSample { channels, label })
}

/// Split the trailing `:<label>` token off a bare data line.
///
/// Returns `None` when the line has no colon at all.
pub fn split_trailing_label(line: &str) -> Option<(&str, &str)> {
    let (data, label) = line.trim_end().rsplit_once(':')?;
    Some((data, label.trim()))
}

/// Check that the first `num_channels` colon-separated blocks of raw sample
/// text each hold exactly `expected` comma-separated values.
pub fn validate_series_length(
    data: &str,
    num_channels: usize,
    expected: usize,
) -> Result<(), FormatError> {
    let blocks: Vec<&str> = data.split(':').collect();
    if blocks.len() < num_channels {
        return Err(FormatError::BadShape {
            expected: num_channels,
            got: blocks.len(),
        });
    }
    for (i, block) in blocks.iter().take(num_channels).enumerate() {
        let got = block.split(',').count();
        if got != expected {
            return Err(FormatError::BadSeriesLength {
                channel: i,
                expected,
                got,
            });
        }
    }
    Ok(())
}

fn parse_bool(value: &str, line: usize) -> Result<bool, FormatError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(FormatError::BadHeader {
            line,
            message: format!("expected true/false, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        "@problemName SensorData\n\
         @timeStamps false\n\
         @missing false\n\
         @univariate false\n\
         @dimensions 2\n\
         @equalLength true\n\
         @seriesLength 3\n\
         @classLabel true walking jogging\n\
         @data\n\
         1.0,2.0,3.0:4.0,5.0,6.0:walking\n\
         0.5,0.5,0.5:1.5,1.5,1.5:jogging\n"
            .to_string()
    }

    #[test]
    fn test_parse_header() {
        let doc = parse(&sample_text()).unwrap();
        assert_eq!(doc.header.problem_name, "SensorData");
        assert_eq!(doc.header.dimensions, Some(2));
        assert_eq!(doc.header.series_length, Some(3));
        assert_eq!(doc.header.class_labels, vec!["walking", "jogging"]);
        assert!(doc.header.equal_length);
    }

    #[test]
    fn test_parse_samples() {
        let doc = parse(&sample_text()).unwrap();
        assert_eq!(doc.samples.len(), 2);
        assert_eq!(doc.samples[0].channels[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(doc.samples[0].label.as_deref(), Some("walking"));
        assert_eq!(doc.samples[1].label.as_deref(), Some("jogging"));
    }

    #[test]
    fn test_roundtrip() {
        let doc = parse(&sample_text()).unwrap();
        let rendered = doc.to_ts_string();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.samples.len(), doc.samples.len());
        assert_eq!(reparsed.header.class_labels, doc.header.class_labels);
        assert_eq!(reparsed.samples[1].channels, doc.samples[1].channels);
    }

    #[test]
    fn test_missing_data_tag() {
        let err = parse("@problemName X\n").unwrap_err();
        assert_eq!(err, FormatError::MissingDataTag);
    }

    #[test]
    fn test_bad_value_reports_line() {
        let text = sample_text().replace("0.5,0.5,0.5", "0.5,oops,0.5");
        match parse(&text).unwrap_err() {
            FormatError::BadValue { line, value } => {
                assert_eq!(line, 11);
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_split_trailing_label() {
        let (data, label) = split_trailing_label("1,2:3,4:walking").unwrap();
        assert_eq!(data, "1,2:3,4");
        assert_eq!(label, "walking");
        assert!(split_trailing_label("no colons here").is_none());
    }

    #[test]
    fn test_validate_series_length() {
        assert!(validate_series_length("1,2,3:4,5,6", 2, 3).is_ok());

        match validate_series_length("1,2:4,5,6", 2, 3).unwrap_err() {
            FormatError::BadSeriesLength {
                channel,
                expected,
                got,
            } => {
                assert_eq!(channel, 0);
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match validate_series_length("1,2,3", 2, 3).unwrap_err() {
            FormatError::BadShape { expected, got } => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_shape_on_parsed_sample() {
        let doc = parse(&sample_text()).unwrap();
        assert!(doc.samples[0].validate_shape(2, 3).is_ok());
        assert!(doc.samples[0].validate_shape(2, 4).is_err());
        assert!(doc.samples[0].validate_shape(3, 3).is_err());
    }
}
