//! A `nom`-based parser for the node query language.

use crate::ast::*;
use crate::error::QueryError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped, tag, take_until, take_while1},
    character::complete::{anychar, char, multispace0, multispace1, none_of},
    combinator::{map, map_res, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated},
};

// --- Main Public Parser ---

pub fn parse(input: &str) -> Result<ExpressionList, QueryError> {
    match expression_list(input.trim()) {
        Ok(("", list)) => Ok(list),
        Ok((remainder, _)) => Err(QueryError::Syntax(format!(
            "unexpected token near '{}'",
            near(remainder)
        ))),
        Err(e) => Err(QueryError::Syntax(e.to_string())),
    }
}

/// Keeps error messages short when the query spans many lines.
fn near(remainder: &str) -> String {
    remainder.lines().take(3).collect::<Vec<_>>().join("\n")
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// `*` is only meaningful as a whole segment and `$` would swallow the
// start of `$=`, so segments are limited to word characters plus `-`
// for negative indices.
fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-')
}

fn is_bare_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-')
}

// --- Grammar ---

fn expression_list(input: &str) -> IResult<&str, ExpressionList> {
    map(
        separated_list1(ws(char(',')), expression),
        |expressions| ExpressionList { expressions },
    )
    .parse(input)
}

fn expression(input: &str) -> IResult<&str, Expression> {
    map(
        (selector, opt(preceded(multispace1, expression))),
        |(selector, rest)| Expression {
            selector,
            rest: rest.map(Box::new),
        },
    )
    .parse(input)
}

fn selector(input: &str) -> IResult<&str, Selector> {
    alt((relationship_selector, goto_scope_selector, simple_selector)).parse(input)
}

fn relationship_selector(input: &str) -> IResult<&str, Selector> {
    map(
        (relationship, multispace0, selector),
        |(relationship, _, rest)| Selector {
            relationship: Some(relationship),
            rest: Some(Box::new(rest)),
            ..Default::default()
        },
    )
    .parse(input)
}

fn relationship(input: &str) -> IResult<&str, Relationship> {
    alt((
        map(char('>'), |_| Relationship::Child),
        map(char('+'), |_| Relationship::NextSibling),
        map(char('~'), |_| Relationship::SubsequentSibling),
    ))
    .parse(input)
}

fn goto_scope_selector(input: &str) -> IResult<&str, Selector> {
    map(
        (attribute_key, multispace1, selector),
        |(scope, _, rest)| Selector {
            goto_scope: Some(scope.to_string()),
            rest: Some(Box::new(rest)),
            ..Default::default()
        },
    )
    .parse(input)
}

/// A basic selector, pseudo-class and position filter, any of which may be
/// absent but not all three.
fn simple_selector(input: &str) -> IResult<&str, Selector> {
    let (input, basic_selector) = opt(basic_selector).parse(input)?;
    let (input, pseudo) = opt(pseudo).parse(input)?;
    let (input, position) = opt(position).parse(input)?;
    if basic_selector.is_none() && pseudo.is_none() && position.is_none() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alt,
        )));
    }
    Ok((
        input,
        Selector {
            basic_selector,
            pseudo,
            position,
            ..Default::default()
        },
    ))
}

fn basic_selector(input: &str) -> IResult<&str, BasicSelector> {
    map(
        preceded(char('.'), (node_type, many0(attribute))),
        |(node_type, attributes)| BasicSelector {
            node_type: node_type.to_string(),
            attributes,
        },
    )
    .parse(input)
}

fn node_type(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)
}

fn pseudo(input: &str) -> IResult<&str, Pseudo> {
    map(
        (
            char(':'),
            alt((
                map(tag("not_has"), |_| PseudoKind::NotHas),
                map(tag("has"), |_| PseudoKind::Has),
            )),
            delimited(char('('), ws(selector), char(')')),
        ),
        |(_, kind, selector)| Pseudo {
            kind,
            selector: Box::new(selector),
        },
    )
    .parse(input)
}

fn position(input: &str) -> IResult<&str, Position> {
    alt((
        map(tag(":first-child"), |_| Position::FirstChild),
        map(tag(":last-child"), |_| Position::LastChild),
    ))
    .parse(input)
}

// --- Attributes ---

fn attribute(input: &str) -> IResult<&str, Attribute> {
    map(
        delimited(
            char('['),
            (
                preceded(multispace0, attribute_key),
                operator,
                terminated(attribute_value, multispace0),
            ),
            char(']'),
        ),
        |(key, operator, value)| Attribute {
            key: key.to_string(),
            operator,
            value,
        },
    )
    .parse(input)
}

fn attribute_key(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(
        char('.'),
        alt((tag("*"), take_while1(is_key_char))),
    ))
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        delimited(multispace1, word_operator, multispace1),
        ws(symbolic_operator),
    ))
    .parse(input)
}

/// The word operators must be surrounded by whitespace so that they cannot
/// be confused with identifier values.
fn word_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map((tag("NOT"), multispace1, tag("INCLUDES")), |_| {
            Operator::NotIncludes
        }),
        map((tag("NOT"), multispace1, tag("IN")), |_| Operator::NotIn),
        map(tag("INCLUDES"), |_| Operator::Includes),
        map(tag("IN"), |_| Operator::In),
    ))
    .parse(input)
}

fn symbolic_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map(tag("!="), |_| Operator::NotEqual),
        map(tag("!~"), |_| Operator::NotMatch),
        map(tag(">="), |_| Operator::GreaterThanOrEqual),
        map(tag("<="), |_| Operator::LessThanOrEqual),
        map(tag("=~"), |_| Operator::Match),
        map(tag("^="), |_| Operator::StartsWith),
        map(tag("$="), |_| Operator::EndsWith),
        map(tag("*="), |_| Operator::Contains),
        map(char('>'), |_| Operator::GreaterThan),
        map(char('<'), |_| Operator::LessThan),
        map(char('='), |_| Operator::Equal),
    ))
    .parse(input)
}

// --- Values ---

fn attribute_value(input: &str) -> IResult<&str, AttributeValue> {
    alt((
        array_value,
        map(simple_selector, |selector| {
            AttributeValue::Selector(Box::new(selector))
        }),
        map(value_atom, AttributeValue::Literal),
    ))
    .parse(input)
}

fn array_value(input: &str) -> IResult<&str, AttributeValue> {
    map(
        delimited(
            (char('('), multispace0),
            separated_list0(multispace1, value_atom),
            (multispace0, char(')')),
        ),
        AttributeValue::Array,
    )
    .parse(input)
}

fn value_atom(input: &str) -> IResult<&str, Value> {
    alt((string_value, regexp_value, evaluated_value, bare_value)).parse(input)
}

fn string_value(input: &str) -> IResult<&str, Value> {
    alt((quoted_value('"'), quoted_value('\''))).parse(input)
}

fn quoted_value<'a>(quote: char) -> impl Parser<&'a str, Output = Value, Error = nom::error::Error<&'a str>> {
    let forbidden: &'static str = if quote == '"' { "\\\"" } else { "\\'" };
    map(
        delimited(
            char(quote),
            opt(escaped(none_of(forbidden), '\\', anychar)),
            char(quote),
        ),
        |body: Option<&str>| Value::String(unescape(body.unwrap_or(""))),
    )
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn regexp_value(input: &str) -> IResult<&str, Value> {
    map_res(
        delimited(
            char('/'),
            opt(escaped(none_of("\\/"), '\\', anychar)),
            char('/'),
        ),
        |pattern: Option<&str>| Value::regexp(pattern.unwrap_or("")),
    )
    .parse(input)
}

fn evaluated_value(input: &str) -> IResult<&str, Value> {
    map(
        delimited(tag("{{"), take_until("}}"), tag("}}")),
        |path: &str| Value::Evaluated(path.trim().to_string()),
    )
    .parse(input)
}

/// A bare token is classified by its spelling: keyword, number, then
/// identifier as the fallback.
fn bare_value(input: &str) -> IResult<&str, Value> {
    map(take_while1(is_bare_value_char), classify_token).parse(input)
}

fn classify_token(token: &str) -> Value {
    match token {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "null" => Value::Null,
        "undefined" => Value::Undefined,
        _ => match parse_number(token) {
            Some(number) => Value::Number(number),
            None => Value::Identifier(token.to_string()),
        },
    }
}

/// The leading-character check keeps `f64::from_str` from treating words
/// like `inf` or `NaN` as numbers.
fn parse_number(token: &str) -> Option<f64> {
    let first = token.chars().next()?;
    if first.is_ascii_digit() || first == '-' || first == '.' {
        token.parse().ok()
    } else {
        None
    }
}
