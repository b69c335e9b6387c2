//! Line-oriented parsers for the dimension and weight spec sheets.
//!
//! Both parsers are fed one line at a time through [`LineParser`] and write
//! their facts straight into the caller's [`Accumulator`]. [`parse_source`]
//! drives a parser over a whole input in a single pass.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::extract::{ExtractError, extract_dimension, extract_weight};
use crate::record::{Accumulator, Fact, Fixed2};
use crate::source::open_source;

/// Joins model aliases in a dimension header, e.g. `"5S & SE:"`.
pub const DIMENSION_ALIAS_SEPARATOR: &str = " & ";
/// Joins model aliases in a weight label, e.g. `"6 and 6S:150 g"`.
pub const WEIGHT_ALIAS_SEPARATOR: &str = " and ";

/// Measurement lines expected after each dimension header.
const MEASUREMENTS: [&str; 3] = ["height", "width", "depth"];

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown parse kind '{0}' (expected 'dims' or 'weight')")]
    UnknownKind(String),
    #[error("line {line}: {text:?} appears before any model header")]
    OrphanLine { line: usize, text: String },
    #[error("line {line}: model '{model}' is missing its {measurement} line")]
    MissingMeasurement {
        line: usize,
        model: String,
        measurement: &'static str,
    },
    #[error("line {line}: {text:?} has no ':' between label and weight")]
    MissingSeparator { line: usize, text: String },
    #[error("line {line}: cannot read measurement for model '{model}'")]
    Extract {
        line: usize,
        model: String,
        #[source]
        source: ExtractError,
    },
    #[error("line {line}: volume of model '{model}' is out of range")]
    VolumeOutOfRange { line: usize, model: String },
}

/// Which spec sheet a source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseKind {
    Dims,
    Weight,
}

impl FromStr for ParseKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dims" => Ok(ParseKind::Dims),
            "weight" => Ok(ParseKind::Weight),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ParseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseKind::Dims => f.write_str("dims"),
            ParseKind::Weight => f.write_str("weight"),
        }
    }
}

/// One record as it appeared in a source, before alias splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub label: String,
    pub fact: Fact,
}

impl fmt::Display for SourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fact {
            Fact::Volume(v) => write!(f, "\"{}\",{}", self.label, v),
            Fact::Weight(w) => write!(f, "\"{}\",{}", self.label, w),
        }
    }
}

/// Receives a source line by line, then an end-of-stream signal.
///
/// `line_no` is 1-based and used in error reports.
pub trait LineParser {
    fn on_line(
        &mut self,
        line_no: usize,
        line: &str,
        acc: &mut Accumulator,
    ) -> Result<(), ParseError>;

    fn finish(&mut self, acc: &mut Accumulator) -> Result<(), ParseError>;

    /// Entries seen so far, in source order.
    fn into_entries(self) -> Vec<SourceEntry>;
}

fn split_aliases<'a>(label: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    label
        .split(separator)
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
}

/// A numbered source line.
#[derive(Debug, Clone, PartialEq)]
struct Numbered {
    line_no: usize,
    text: String,
}

impl Numbered {
    fn new(line_no: usize, text: &str) -> Self {
        Self {
            line_no,
            text: text.to_string(),
        }
    }
}

/// A header line plus the lines buffered after it.
#[derive(Debug, PartialEq)]
struct Block {
    header: Numbered,
    lines: Vec<Numbered>,
}

#[derive(Debug)]
enum BlockEvent<'a> {
    Line { line_no: usize, text: &'a str },
    EndOfStream,
}

#[derive(Debug, Default, PartialEq)]
enum BlockState {
    #[default]
    Idle,
    Buffering(Block),
}

impl BlockState {
    /// Advances the machine, returning a block once it is closed by the next
    /// header or by end of stream.
    fn next(self, event: BlockEvent<'_>) -> Result<(BlockState, Option<Block>), ParseError> {
        match (self, event) {
            (state, BlockEvent::Line { line_no, text }) if text.contains(':') => {
                let closed = match state {
                    BlockState::Buffering(block) => Some(block),
                    BlockState::Idle => None,
                };
                let opened = Block {
                    header: Numbered::new(line_no, text),
                    lines: Vec::new(),
                };
                Ok((BlockState::Buffering(opened), closed))
            }
            (BlockState::Idle, BlockEvent::Line { text, .. }) if text.trim().is_empty() => {
                Ok((BlockState::Idle, None))
            }
            (BlockState::Idle, BlockEvent::Line { line_no, text }) => Err(ParseError::OrphanLine {
                line: line_no,
                text: text.to_string(),
            }),
            (BlockState::Buffering(mut block), BlockEvent::Line { line_no, text }) => {
                block.lines.push(Numbered::new(line_no, text));
                Ok((BlockState::Buffering(block), None))
            }
            (BlockState::Idle, BlockEvent::EndOfStream) => Ok((BlockState::Idle, None)),
            (BlockState::Buffering(block), BlockEvent::EndOfStream) => {
                Ok((BlockState::Idle, Some(block)))
            }
        }
    }
}

/// Parses blocks of `<model>:` followed by height, width and depth lines.
#[derive(Debug, Default)]
pub struct DimensionParser {
    state: BlockState,
    entries: Vec<SourceEntry>,
}

impl DimensionParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self, event: BlockEvent<'_>, acc: &mut Accumulator) -> Result<(), ParseError> {
        let (state, closed) = std::mem::take(&mut self.state).next(event)?;
        self.state = state;

        if let Some(block) = closed {
            self.finalize(block, acc)?;
        }
        Ok(())
    }

    fn finalize(&mut self, block: Block, acc: &mut Accumulator) -> Result<(), ParseError> {
        let label = block.header.text.replacen(':', "", 1).trim().to_string();

        let mut product = BigDecimal::from(1);
        for (i, &measurement) in MEASUREMENTS.iter().enumerate() {
            let line = block
                .lines
                .get(i)
                .ok_or_else(|| ParseError::MissingMeasurement {
                    line: block.header.line_no,
                    model: label.clone(),
                    measurement,
                })?;
            product *= extract_dimension(&line.text).map_err(|source| ParseError::Extract {
                line: line.line_no,
                model: label.clone(),
                source,
            })?;
        }
        let volume =
            Fixed2::from_decimal(&product).ok_or_else(|| ParseError::VolumeOutOfRange {
                line: block.header.line_no,
                model: label.clone(),
            })?;

        for model in split_aliases(&label, DIMENSION_ALIAS_SEPARATOR) {
            acc.record_fact(model, Fact::Volume(volume));
        }
        debug!(model = %label, %volume, "Dimension block parsed");

        self.entries.push(SourceEntry {
            label,
            fact: Fact::Volume(volume),
        });
        Ok(())
    }
}

impl LineParser for DimensionParser {
    fn on_line(
        &mut self,
        line_no: usize,
        line: &str,
        acc: &mut Accumulator,
    ) -> Result<(), ParseError> {
        self.advance(BlockEvent::Line { line_no, text: line }, acc)
    }

    fn finish(&mut self, acc: &mut Accumulator) -> Result<(), ParseError> {
        self.advance(BlockEvent::EndOfStream, acc)
    }

    fn into_entries(self) -> Vec<SourceEntry> {
        self.entries
    }
}

/// Parses `<label>:<weight> g` lines, each on its own.
#[derive(Debug, Default)]
pub struct WeightParser {
    entries: Vec<SourceEntry>,
}

impl WeightParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineParser for WeightParser {
    fn on_line(
        &mut self,
        line_no: usize,
        line: &str,
        acc: &mut Accumulator,
    ) -> Result<(), ParseError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let (label, rest) = line
            .split_once(':')
            .ok_or_else(|| ParseError::MissingSeparator {
                line: line_no,
                text: line.to_string(),
            })?;
        // Anything after a second ':' is not part of the weight.
        let weight_text = rest.split(':').next().unwrap_or(rest);
        let label = label.trim();

        let weight = extract_weight(weight_text).map_err(|source| ParseError::Extract {
            line: line_no,
            model: label.to_string(),
            source,
        })?;

        for model in split_aliases(label, WEIGHT_ALIAS_SEPARATOR) {
            acc.record_fact(model, Fact::Weight(weight));
        }
        debug!(model = %label, weight, "Weight line parsed");

        self.entries.push(SourceEntry {
            label: label.to_string(),
            fact: Fact::Weight(weight),
        });
        Ok(())
    }

    fn finish(&mut self, _acc: &mut Accumulator) -> Result<(), ParseError> {
        Ok(())
    }

    fn into_entries(self) -> Vec<SourceEntry> {
        self.entries
    }
}

/// Feeds every line of `reader` to `parser` in order, then signals end of stream.
pub async fn parse_lines<R, P>(
    reader: R,
    mut parser: P,
    acc: &mut Accumulator,
) -> Result<Vec<SourceEntry>>
where
    R: AsyncBufRead + Unpin,
    P: LineParser,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        parser.on_line(line_no, &line, acc)?;
    }
    parser.finish(acc)?;

    Ok(parser.into_entries())
}

/// Opens `location` and parses it as `kind` into `acc`.
#[tracing::instrument(skip(acc, kind), fields(kind = %kind))]
pub async fn parse_source(
    location: &str,
    kind: ParseKind,
    acc: &mut Accumulator,
) -> Result<Vec<SourceEntry>> {
    let reader = open_source(location).await?;

    let entries = match kind {
        ParseKind::Dims => parse_lines(reader, DimensionParser::new(), acc).await,
        ParseKind::Weight => parse_lines(reader, WeightParser::new(), acc).await,
    }
    .with_context(|| format!("failed to parse {kind} source '{location}'"))?;

    info!(entries = entries.len(), records = acc.len(), "Source parsed");
    Ok(entries)
}
