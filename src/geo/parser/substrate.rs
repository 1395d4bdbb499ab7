// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! BOX record and dielectric layer parser

use nom::{
    bytes::complete::{tag, take_until},
    character::complete::{char, i64 as integer, space0, space1},
    combinator::all_consuming,
    multi::many0,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};

use super::common::{indent_of, is_indented, starts_with_keyword};
use super::GeoRecordParser;
use crate::error::{Result, SonError};
use crate::geo::{BoxRecord, DielectricLayer, Substrate};

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_until("\""), char('"')).parse(input)
}

fn spaced_int(input: &str) -> IResult<&str, i64> {
    preceded(space1, integer).parse(input)
}

fn spaced_double(input: &str) -> IResult<&str, f64> {
    preceded(space1, double).parse(input)
}

fn box_line(input: &str) -> IResult<&str, BoxRecord> {
    let (input, _) = space0(input)?;
    let (input, _) = tag("BOX")(input)?;
    let (input, levels) = spaced_int(input)?;
    let (input, x_width) = spaced_int(input)?;
    let (input, y_width) = spaced_int(input)?;
    let (input, x_cells2) = spaced_int(input)?;
    let (input, y_cells2) = spaced_int(input)?;
    let (input, reserved) = spaced_int(input)?;
    let (input, eeff) = spaced_double(input)?;
    let (input, _) = space0(input)?;

    Ok((
        input,
        BoxRecord {
            levels,
            x_width,
            y_width,
            x_cells2,
            y_cells2,
            reserved,
            eeff,
        },
    ))
}

fn layer_line(input: &str) -> IResult<&str, DielectricLayer> {
    let (input, _) = space0(input)?;
    let (input, thickness) = double(input)?;
    let (input, erel) = spaced_double(input)?;
    let (input, mrel) = spaced_double(input)?;
    let (input, eloss) = spaced_double(input)?;
    let (input, mloss) = spaced_double(input)?;
    let (input, esigma) = spaced_double(input)?;
    let (input, nzpart) = spaced_int(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = quoted(input)?;
    let (input, extra) = many0(spaced_double).parse(input)?;
    let (input, _) = space0(input)?;

    Ok((
        input,
        DielectricLayer {
            thickness,
            erel,
            mrel,
            eloss,
            mloss,
            esigma,
            nzpart,
            name: name.to_string(),
            extra,
        },
    ))
}

/// Parse a `BOX` line on its own
pub fn parse_box_record(line: &str, index: usize) -> Result<BoxRecord> {
    all_consuming(box_line)
        .parse(line)
        .map(|(_, record)| record)
        .map_err(|e| SonError::at_line(index, format!("invalid BOX line: {e}")))
}

/// Parse one indented dielectric layer line
pub fn parse_layer(line: &str, index: usize) -> Result<DielectricLayer> {
    all_consuming(layer_line)
        .parse(line)
        .map(|(_, layer)| layer)
        .map_err(|e| SonError::at_line(index, format!("invalid dielectric layer: {e}")))
}

pub struct SubstrateParser;

impl GeoRecordParser for SubstrateParser {
    type Item = Substrate;

    fn matches(&self, line: &str) -> bool {
        starts_with_keyword(line, "BOX")
    }

    fn parse(&self, lines: &[&str], start: usize) -> Result<(Substrate, usize)> {
        let record = parse_box_record(lines[start], start)?;

        let mut layers = Vec::new();
        let mut indent = String::from("      ");
        let mut i = start + 1;
        while i < lines.len() && is_indented(lines[i]) && !lines[i].trim().is_empty() {
            if layers.is_empty() {
                indent = indent_of(lines[i]).to_string();
            }
            layers.push(parse_layer(lines[i], i)?);
            i += 1;
        }

        if layers.is_empty() {
            return Err(SonError::at_line(start, "BOX without dielectric layers"));
        }
        if record.levels != layers.len() as i64 - 1 {
            log::warn!(
                "[WARN] BOX declares {} levels but {} layers follow",
                record.levels,
                layers.len()
            );
        }

        Ok((
            Substrate {
                record,
                layers,
                indent,
            },
            i,
        ))
    }

    fn item_name() -> &'static str {
        "BOX"
    }
}
