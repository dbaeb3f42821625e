//! Turns a chat message into a [`Signal`].
//!
//! The expected shape is
//!
//! ```text
//! 📉EURUSD
//! (anything)
//! Direction: SELL
//! Entry: 1.2345
//! TP: 1.2300
//! TP: 1.2250
//! ❌SL: 1.2400
//! ```
//!
//! Every line after the header is tagged by its marker or label first. The
//! direction and entry are taken from lines 2 and 3 when those lines carry
//! them, so a labelled line 1 cannot override them. Otherwise the labelled
//! lines anywhere in the body are used and must agree with each other, and an
//! unlabelled `key: value` on line 2 or 3 is the last resort.
//!
//! A field's value is the text between the first and the second ':', so
//! `Direction: SELL: now` reads as `SELL`.

use thiserror::Error;

use crate::models::{Direction, Signal};

const SYMBOL_GLYPHS: &[char] = &['📉', '📈'];
const TAKE_PROFIT_MARKER: &str = "TP";
const STOP_LOSS_MARKER: &str = "❌SL";

const DIRECTION_LABELS: &[&str] = &["direction", "side", "order", "action"];
const ENTRY_LABELS: &[&str] = &["entry", "entry price", "price", "open"];

const DIRECTION_LINE: usize = 2;
const ENTRY_LINE: usize = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedSignal {
    #[error("message is empty")]
    Empty,
    #[error("no symbol on the first line")]
    MissingSymbol,
    #[error("no direction line")]
    MissingDirection,
    #[error("direction must be BUY or SELL, got {0:?}")]
    InvalidDirection(String),
    #[error("direction lines disagree")]
    DuplicateDirection,
    #[error("no entry line")]
    MissingEntry,
    #[error("entry lines disagree")]
    DuplicateEntry,
    #[error("line {line} has no value after ':'")]
    MissingValue { line: usize },
    #[error("{field} is not a positive number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("no take-profit line")]
    MissingTakeProfit,
    #[error("no stop-loss line")]
    MissingStopLoss,
    #[error("more than one stop-loss line")]
    DuplicateStopLoss,
}

#[derive(Debug)]
enum Tag<'a> {
    Direction(&'a str),
    Entry(&'a str),
    TakeProfit(Option<&'a str>),
    StopLoss(Option<&'a str>),
    /// Unrecognised line, with its value after ':' if it has one.
    Other(Option<&'a str>),
}

struct TaggedLine<'a> {
    index: usize,
    tag: Tag<'a>,
}

pub fn parse_signal(text: &str) -> Result<Signal, MalformedSignal> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, header) = lines.next().ok_or(MalformedSignal::Empty)?;
    let symbol = header.trim_matches(SYMBOL_GLYPHS).trim();
    if symbol.is_empty() {
        return Err(MalformedSignal::MissingSymbol);
    }

    let body: Vec<TaggedLine> = lines
        .map(|(index, line)| TaggedLine {
            index,
            tag: classify(line),
        })
        .collect();

    let direction = resolve_field(
        &body,
        DIRECTION_LINE,
        |tag| match *tag {
            Tag::Direction(value) => Some(value),
            _ => None,
        },
        |raw| {
            Direction::parse(raw)
                .ok_or_else(|| MalformedSignal::InvalidDirection(raw.to_string()))
        },
        MalformedSignal::DuplicateDirection,
    )?
    .ok_or(MalformedSignal::MissingDirection)?;

    let entry = resolve_field(
        &body,
        ENTRY_LINE,
        |tag| match *tag {
            Tag::Entry(value) => Some(value),
            _ => None,
        },
        |raw| parse_price("entry", raw),
        MalformedSignal::DuplicateEntry,
    )?
    .ok_or(MalformedSignal::MissingEntry)?;

    let mut take_profits = Vec::new();
    let mut stop_losses = Vec::new();
    for line in &body {
        match line.tag {
            Tag::TakeProfit(value) => {
                let value = value.ok_or(MalformedSignal::MissingValue { line: line.index })?;
                take_profits.push(parse_price("take-profit", value)?);
            }
            Tag::StopLoss(value) => {
                let value = value.ok_or(MalformedSignal::MissingValue { line: line.index })?;
                stop_losses.push(parse_price("stop-loss", value)?);
            }
            _ => {}
        }
    }

    let stop_loss = match stop_losses.as_slice() {
        [] => return Err(MalformedSignal::MissingStopLoss),
        [single] => *single,
        _ => return Err(MalformedSignal::DuplicateStopLoss),
    };

    let mut take_profits = take_profits.into_iter();
    let first_take_profit = take_profits
        .next()
        .ok_or(MalformedSignal::MissingTakeProfit)?;

    Ok(Signal::new(
        symbol.to_string(),
        direction,
        entry,
        first_take_profit,
        take_profits,
        stop_loss,
    ))
}

fn classify(line: &str) -> Tag<'_> {
    let value = line.split(':').nth(1).map(str::trim);

    if line.starts_with(STOP_LOSS_MARKER) {
        return Tag::StopLoss(value);
    }
    if line.starts_with(TAKE_PROFIT_MARKER) {
        return Tag::TakeProfit(value);
    }

    if let (Some((label, _)), Some(value)) = (line.split_once(':'), value) {
        let label = label.trim().to_lowercase();
        if DIRECTION_LABELS.contains(&label.as_str()) {
            return Tag::Direction(value);
        }
        if ENTRY_LABELS.contains(&label.as_str()) {
            return Tag::Entry(value);
        }
    }

    Tag::Other(value)
}

/// Finds a field by label, preferring the line at `position`.
///
/// Labelled lines elsewhere must all convert to the same value, otherwise
/// `duplicate` is returned. `Ok(None)` means the field is absent.
fn resolve_field<'a, T: PartialEq>(
    body: &[TaggedLine<'a>],
    position: usize,
    labelled: impl Fn(&Tag<'a>) -> Option<&'a str>,
    convert: impl Fn(&'a str) -> Result<T, MalformedSignal>,
    duplicate: MalformedSignal,
) -> Result<Option<T>, MalformedSignal> {
    let at_position = body
        .iter()
        .find(|line| line.index == position)
        .and_then(|line| labelled(&line.tag));
    if let Some(raw) = at_position {
        return convert(raw).map(Some);
    }

    let mut found: Option<T> = None;
    for raw in body.iter().filter_map(|line| labelled(&line.tag)) {
        let value = convert(raw)?;
        if let Some(existing) = &found {
            if *existing != value {
                return Err(duplicate);
            }
        }
        found = Some(value);
    }
    if found.is_some() {
        return Ok(found);
    }

    positional_value(body, position).map(convert).transpose()
}

fn positional_value<'a>(body: &[TaggedLine<'a>], index: usize) -> Option<&'a str> {
    body.iter()
        .find(|line| line.index == index)
        .and_then(|line| match line.tag {
            Tag::Other(value) => value,
            _ => None,
        })
}

fn parse_price(field: &'static str, raw: &str) -> Result<f64, MalformedSignal> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(MalformedSignal::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}
