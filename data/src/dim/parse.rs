//! Textual shape literals.
//!
//! Two dialects are accepted:
//!
//! * the bracketed form: `[?,?,1..3,224]`, `[...]` for an unknown rank,
//!   `[]` for a scalar;
//! * the bare form: `1, 4` — plain integers separated by commas and/or
//!   whitespace, fully static by construction.

use crate::dim::Dim;
use crate::error::{WeftError, WeftResult};
use crate::shape::PartialShape;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{digit1, multispace0, multispace1};
use nom::combinator::{all_consuming, map, map_res};
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::delimited;
use nom::{IResult, Parser};
use nom_language::error::VerboseError;

type R<'i, O> = IResult<&'i str, O, VerboseError<&'i str>>;

pub fn parse_dim(input: &str) -> WeftResult<Dim> {
    match all_consuming(delimited(multispace0, dim, multispace0)).parse(input) {
        Ok((_, d)) => Ok(d),
        Err(e) => Err(WeftError::Parse(format!("invalid dimension {input:?}: {e:?}"))),
    }
}

pub fn parse_shape(input: &str) -> WeftResult<PartialShape> {
    match all_consuming(delimited(multispace0, shape, multispace0)).parse(input) {
        Ok((_, s)) => Ok(s),
        Err(e) => Err(WeftError::Parse(format!("invalid shape {input:?}: {e:?}"))),
    }
}

fn shape(i: &str) -> R<'_, PartialShape> {
    alt((bracketed, bare)).parse(i)
}

fn bracketed(i: &str) -> R<'_, PartialShape> {
    delimited(
        stag("["),
        alt((
            map(tag("..."), |_| PartialShape::Rankless),
            map(separated_list0(stag(","), dim), |dims| {
                PartialShape::Ranked(dims.into_iter().collect())
            }),
        )),
        stag("]"),
    )
    .parse(i)
}

fn bare(i: &str) -> R<'_, PartialShape> {
    map(separated_list1(bare_separator, integer), |dims| {
        PartialShape::Ranked(dims.into_iter().map(Dim::Fixed).collect())
    })
    .parse(i)
}

fn bare_separator(i: &str) -> R<'_, ()> {
    alt((map(stag(","), |_| ()), map(multispace1, |_| ()))).parse(i)
}

fn dim(i: &str) -> R<'_, Dim> {
    alt((
        map(tag("?"), |_| Dim::Any),
        map_res((integer, tag(".."), integer), |(lo, _, hi)| Dim::range(lo, hi)),
        map(integer, Dim::Fixed),
    ))
    .parse(i)
}

fn integer(i: &str) -> R<'_, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>()).parse(i)
}

fn stag<'i>(
    t: &'static str,
) -> impl Parser<&'i str, Output = &'i str, Error = VerboseError<&'i str>> {
    delimited(multispace0, tag(t), multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(s: &str) -> PartialShape {
        parse_shape(s).unwrap()
    }

    #[test]
    fn bracketed_forms() {
        assert_eq!(shape("[...]").to_string(), "[...]");
        assert_eq!(shape("[]").to_string(), "[]");
        assert_eq!(shape("[1,4]").to_string(), "[1,4]");
        assert_eq!(shape("[ 1 , 4 ]").to_string(), "[1,4]");
        assert_eq!(shape("[?,?,1..3,224]").to_string(), "[?,?,1..3,224]");
    }

    #[test]
    fn bare_forms() {
        assert_eq!(shape("1, 4").to_string(), "[1,4]");
        assert_eq!(shape("1,4").to_string(), "[1,4]");
        assert_eq!(shape("1 4").to_string(), "[1,4]");
        assert_eq!(shape("46, 1").to_string(), "[46,1]");
        assert_eq!(shape("224").to_string(), "[224]");
    }

    #[test]
    fn canonicalization() {
        assert_eq!(shape("[3..3]").to_string(), "[3]");
        assert_eq!(shape("[0..5,?]").to_string(), "[0..5,?]");
    }

    #[test]
    fn round_trips() {
        for s in ["[...]", "[]", "[1,4]", "[?,?,1..3,224]", "[0..5,?,12]"] {
            assert_eq!(shape(s).to_string(), s);
        }
    }

    #[test]
    fn rejects_malformed() {
        for s in ["", "[", "[1,", "[1,]", "1..", "[..3]", "[3..1]", "[a]", "?, 4", "1,,4", "[1 4]"]
        {
            assert!(parse_shape(s).is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn dims() {
        assert_eq!(parse_dim("?").unwrap(), Dim::Any);
        assert_eq!(parse_dim("224").unwrap(), Dim::Fixed(224));
        assert_eq!(parse_dim("1..3").unwrap(), Dim::Range(1, 3));
        assert_eq!(parse_dim("3..3").unwrap(), Dim::Fixed(3));
        assert!(parse_dim("3..1").is_err());
        assert!(parse_dim("-1").is_err());
    }
}
