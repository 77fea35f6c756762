//! Sandboxed evaluator for `.py` source-definition configuration files
//!
//! A source-definition file binds configuration values to top-level names:
//!
//! ```text
//! lr = 0.01
//! batch_size = 32
//! input_size = (256, 256)
//! weights = list(range(100))
//! ```
//!
//! Only a side-effect-free subset of Python is understood: literals,
//! containers, arithmetic, references to earlier names and a handful of pure
//! builtins. `import` lines are ignored, `class` bodies are transparent (their
//! attributes become top-level names) and `def` / `if __name__ == ...` blocks
//! are skipped. Nothing outside the file is ever executed.

use crate::config::value::{ConfigMap, ConfigValue};
use crate::core::error::{Result, RunxError};
use nom::{
    branch::alt,
    bytes::complete::{escaped, is_not, tag, take_till, take_until, take_while1},
    character::complete::{
        alpha1, alphanumeric1, anychar, char, digit1, multispace0, multispace1, one_of,
    },
    combinator::{all_consuming, eof, map, map_res, not, opt, recognize, rest, value},
    error::{VerboseError, VerboseErrorKind},
    multi::{many0, many0_count, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    Finish, IResult,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace};

/// Upper bound on the size of any single value, counted in leaf values and
/// string bytes (so `range` yields at most this many integers)
pub const MAX_ELEMENTS: usize = 1_000_000;

/// Upper bound on the combined size of every name bound by one file
pub const MAX_TOTAL_ELEMENTS: usize = 2 * MAX_ELEMENTS;

/// Deepest bracket, sign or power nesting accepted in one expression
pub const MAX_NESTING: usize = 64;

/// Deepest container nesting a bound value may reach
pub const MAX_VALUE_DEPTH: usize = 100;

const NESTING_CONTEXT: &str = "nesting limit";

/// Names with this prefix are evaluated but never exported
pub const RESERVED_PREFIX: &str = "__";

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Read and evaluate a source-definition file
pub fn load_file(path: &Path) -> Result<ConfigMap> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        RunxError::evaluation_error(path, line, format!("file is not valid UTF-8: {}", e))
    })?;
    evaluate(&source, path)
}

/// Evaluate source-definition text; `origin` is only used in error messages
pub fn evaluate(source: &str, origin: &Path) -> Result<ConfigMap> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let lines = split_lines(source)
        .map_err(|(line, reason)| RunxError::evaluation_error(origin, line, reason))?;

    let mut interpreter = Interpreter::new(origin);
    interpreter.run(&lines)?;

    let exported: ConfigMap = interpreter
        .names
        .into_iter()
        .filter(|(name, _)| !name.starts_with(RESERVED_PREFIX))
        .collect();
    debug!(
        origin = %origin.display(),
        keys = exported.len(),
        "evaluated source-definition file"
    );
    Ok(exported)
}

/// Evaluate a single expression such as `[1, 2] * 2` or `1e-3`
pub fn eval_expression(text: &str) -> Result<ConfigValue> {
    let parsed =
        all_consuming(delimited(multispace0, |i| expression_list(i, 0), multispace0))(text)
            .finish();
    let expr = match parsed {
        Ok((_, expr)) => expr,
        Err(error) => {
            return Err(RunxError::evaluation_error(
                "<expression>",
                1,
                syntax_error(error),
            ))
        },
    };

    Interpreter::new(Path::new("<expression>"))
        .eval(&expr)
    .map_err(|reason| RunxError::evaluation_error("<expression>", 1, reason))
}

/// A statement spanning one or more physical lines
#[derive(Debug, Clone, PartialEq)]
struct LogicalLine {
    /// 1-based physical line the statement starts on
    number: usize,
    indent: usize,
    text: String,
}

/// Join physical lines into logical ones: strips comments, follows brackets
/// and backslash continuations, keeps string literals intact.
fn split_lines(source: &str) -> std::result::Result<Vec<LogicalLine>, (usize, String)> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut line_no = 1;
    let mut depth = 0usize;
    // (quote character, triple-quoted)
    let mut quote: Option<(char, bool)> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some((q, triple)) = quote {
            if c == '\\' && i + 1 < chars.len() {
                current.push(c);
                current.push(chars[i + 1]);
                if chars[i + 1] == '\n' {
                    line_no += 1;
                }
                i += 2;
                continue;
            }
            if c == '\n' {
                if !triple {
                    return Err((line_no, "unterminated string literal".to_string()));
                }
                line_no += 1;
            }
            if triple && is_triple_quote(&chars, i, q) {
                current.extend([q, q, q]);
                quote = None;
                i += 3;
                continue;
            }
            current.push(c);
            if !triple && c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                let triple = is_triple_quote(&chars, i, c);
                if triple {
                    current.extend([c, c, c]);
                    i += 3;
                } else {
                    current.push(c);
                    i += 1;
                }
                quote = Some((c, triple));
                continue;
            },
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            },
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                current.push(' ');
                line_no += 1;
                i += 2;
                continue;
            },
            '\n' => {
                line_no += 1;
                i += 1;
                if depth > 0 {
                    current.push('\n');
                } else {
                    push_line(&mut lines, &current, start_line);
                    current.clear();
                    start_line = line_no;
                }
                continue;
            },
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {},
        }

        current.push(c);
        i += 1;
    }

    if quote.is_some() {
        return Err((start_line, "unterminated string literal".to_string()));
    }
    push_line(&mut lines, &current, start_line);
    Ok(lines)
}

fn is_triple_quote(chars: &[char], at: usize, quote: char) -> bool {
    chars.len() >= at + 3 && chars[at..at + 3].iter().all(|&c| c == quote)
}

fn push_line(lines: &mut Vec<LogicalLine>, raw: &str, number: usize) {
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let indent = raw.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    lines.push(LogicalLine {
        number,
        indent,
        text: text.to_string(),
    });
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Assign {
        name: String,
        op: AssignOp,
        value: Expr,
    },
    Class {
        name: String,
    },
    Def {
        name: String,
    },
    MainGuard,
    Import,
    Pass,
    Docstring,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(ConfigValue),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Left-associative run such as `a + b - c`, folded while evaluating
    Chain(Box<Expr>, Vec<(BinaryOp, Expr)>),
    Call {
        function: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

enum Argument {
    Positional(Expr),
    Keyword(String, Expr),
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn parse_statement(text: &str) -> std::result::Result<Statement, String> {
    all_consuming(delimited(multispace0, statement, multispace0))(text)
        .finish()
        .map(|(_, statement)| statement)
        .map_err(syntax_error)
}

fn syntax_error(error: VerboseError<&str>) -> String {
    let too_deep = error
        .errors
        .iter()
        .any(|(_, kind)| matches!(kind, VerboseErrorKind::Context(NESTING_CONTEXT)));
    if too_deep {
        return format!("expression nested more than {} levels deep", MAX_NESTING);
    }

    let near = error
        .errors
        .first()
        .map(|(remaining, _)| remaining.trim())
        .filter(|remaining| !remaining.is_empty());

    match near {
        Some(remaining) => {
            let snippet: String = remaining.chars().take(24).collect();
            format!("invalid syntax near `{}`", snippet)
        },
        None => "invalid syntax: unexpected end of statement".to_string(),
    }
}

fn statement(input: &str) -> PResult<'_, Statement> {
    alt((
        class_header,
        def_header,
        main_guard,
        import,
        value(Statement::Pass, pair(tag("pass"), eof)),
        assignment,
        map(string_literal, |_| Statement::Docstring),
    ))(input)
}

fn class_header(input: &str) -> PResult<'_, Statement> {
    map(
        tuple((
            tag("class"),
            multispace1,
            identifier,
            multispace0,
            opt(delimited(char('('), take_till(|c: char| c == ')'), char(')'))),
            multispace0,
            char(':'),
        )),
        |(_, _, name, ..)| Statement::Class {
            name: name.to_string(),
        },
    )(input)
}

fn def_header(input: &str) -> PResult<'_, Statement> {
    map(
        tuple((
            tag("def"),
            multispace1,
            identifier,
            multispace0,
            char('('),
            take_till(|c: char| c == ')'),
            char(')'),
            take_till(|c: char| c == ':'),
            char(':'),
        )),
        |(_, _, name, ..)| Statement::Def {
            name: name.to_string(),
        },
    )(input)
}

fn main_guard(input: &str) -> PResult<'_, Statement> {
    value(
        Statement::MainGuard,
        tuple((
            tag("if"),
            multispace1,
            tag("__name__"),
            sym("=="),
            string_literal,
            sym(":"),
        )),
    )(input)
}

fn import(input: &str) -> PResult<'_, Statement> {
    value(
        Statement::Import,
        pair(alt((tag("import"), tag("from"))), preceded(multispace1, rest)),
    )(input)
}

fn assignment(input: &str) -> PResult<'_, Statement> {
    map(
        tuple((
            identifier,
            // optional annotation: `lr: float = 0.1`
            opt(preceded(sym(":"), is_not("="))),
            assign_op,
            |i| expression_list(i, 0),
        )),
        |(name, _, op, value)| Statement::Assign {
            name: name.to_string(),
            op,
            value,
        },
    )(input)
}

fn assign_op(input: &str) -> PResult<'_, AssignOp> {
    delimited(
        multispace0,
        alt((
            value(AssignOp::Add, tag("+=")),
            value(AssignOp::Sub, tag("-=")),
            value(AssignOp::Mul, tag("*=")),
            value(AssignOp::Div, tag("/=")),
            value(AssignOp::Set, terminated(char('='), not(char('=')))),
        )),
        multispace0,
    )(input)
}

fn sym<'a>(token: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    delimited(multispace0, tag(token), multispace0)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn too_deep(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(NESTING_CONTEXT))],
    })
}

/// Comma-separated expressions; more than one (or a trailing comma) is a tuple
fn expression_list(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, (mut items, trailing)) = pair(
        separated_list1(sym(","), |i| expression(i, depth)),
        opt(sym(",")),
    )(input)?;

    if items.len() == 1 && trailing.is_none() {
        if let Some(only) = items.pop() {
            return Ok((input, only));
        }
    }
    Ok((input, Expr::Tuple(items)))
}

fn expression(input: &str, depth: usize) -> PResult<'_, Expr> {
    let additive_op = delimited(
        multispace0,
        alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        )),
        multispace0,
    );
    let (input, first) = term(input, depth)?;
    let (input, rest) = many0(pair(additive_op, |i| term(i, depth)))(input)?;
    Ok((input, chain(first, rest)))
}

fn term(input: &str, depth: usize) -> PResult<'_, Expr> {
    let multiplicative_op = delimited(
        multispace0,
        alt((
            value(BinaryOp::FloorDiv, tag("//")),
            value(BinaryOp::Div, tag("/")),
            value(BinaryOp::Mod, tag("%")),
            value(BinaryOp::Mul, terminated(tag("*"), not(char('*')))),
        )),
        multispace0,
    );
    let (input, first) = unary(input, depth)?;
    let (input, rest) = many0(pair(multiplicative_op, |i| unary(i, depth)))(input)?;
    Ok((input, chain(first, rest)))
}

fn chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain(Box::new(first), rest)
    }
}

fn unary(input: &str, depth: usize) -> PResult<'_, Expr> {
    if depth > MAX_NESTING {
        return Err(too_deep(input));
    }
    alt((
        map(preceded(sym("-"), |i| unary(i, depth + 1)), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        map(preceded(sym("+"), |i| unary(i, depth + 1)), |e| {
            Expr::Unary(UnaryOp::Pos, Box::new(e))
        }),
        |i| power(i, depth),
    ))(input)
}

fn power(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, base) = atom(input, depth)?;
    let (input, exponent) = opt(preceded(sym("**"), |i| unary(i, depth + 1)))(input)?;
    let expr = match exponent {
        Some(exponent) => Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        None => base,
    };
    Ok((input, expr))
}

fn atom(input: &str, depth: usize) -> PResult<'_, Expr> {
    delimited(
        multispace0,
        alt((
            |i| parenthesized(i, depth + 1),
            |i| list_display(i, depth + 1),
            |i| dict_display(i, depth + 1),
            map(string_literal, |s| Expr::Literal(ConfigValue::String(s))),
            map(number, Expr::Literal),
            |i| call(i, depth + 1),
            name_or_keyword,
        )),
        multispace0,
    )(input)
}

fn parenthesized(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, (mut items, trailing)) = delimited(
        sym("("),
        pair(
            separated_list0(sym(","), |i| expression(i, depth)),
            opt(sym(",")),
        ),
        sym(")"),
    )(input)?;

    if items.len() == 1 && trailing.is_none() {
        if let Some(inner) = items.pop() {
            return Ok((input, inner));
        }
    }
    Ok((input, Expr::Tuple(items)))
}

fn list_display(input: &str, depth: usize) -> PResult<'_, Expr> {
    map(
        delimited(
            sym("["),
            terminated(
                separated_list0(sym(","), |i| expression(i, depth)),
                opt(sym(",")),
            ),
            sym("]"),
        ),
        Expr::List,
    )(input)
}

fn dict_display(input: &str, depth: usize) -> PResult<'_, Expr> {
    map(
        delimited(
            sym("{"),
            terminated(
                separated_list0(
                    sym(","),
                    separated_pair(|i| expression(i, depth), sym(":"), |i| expression(i, depth)),
                ),
                opt(sym(",")),
            ),
            sym("}"),
        ),
        Expr::Dict,
    )(input)
}

fn call(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (input, function) = identifier(input)?;
    let (input, arguments) = delimited(
        sym("("),
        terminated(
            separated_list0(sym(","), |i| argument(i, depth)),
            opt(sym(",")),
        ),
        sym(")"),
    )(input)?;

    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Positional(expr) => args.push(expr),
            Argument::Keyword(name, expr) => kwargs.push((name, expr)),
        }
    }

    Ok((
        input,
        Expr::Call {
            function: function.to_string(),
            args,
            kwargs,
        },
    ))
}

fn argument(input: &str, depth: usize) -> PResult<'_, Argument> {
    alt((
        map(
            separated_pair(
                delimited(multispace0, identifier, multispace0),
                terminated(char('='), not(char('='))),
                |i| expression(i, depth),
            ),
            |(name, expr)| Argument::Keyword(name.to_string(), expr),
        ),
        map(|i| expression(i, depth), Argument::Positional),
    ))(input)
}

fn name_or_keyword(input: &str) -> PResult<'_, Expr> {
    map(identifier, |name| match name {
        "True" => Expr::Literal(ConfigValue::Bool(true)),
        "False" => Expr::Literal(ConfigValue::Bool(false)),
        "None" => Expr::Literal(ConfigValue::Null),
        other => Expr::Name(other.to_string()),
    })(input)
}

fn number(input: &str) -> PResult<'_, ConfigValue> {
    alt((
        map(radix_integer("0x", "0X", 16), ConfigValue::Integer),
        map(radix_integer("0o", "0O", 8), ConfigValue::Integer),
        map(radix_integer("0b", "0B", 2), ConfigValue::Integer),
        map(float_literal, ConfigValue::Float),
        map(
            map_res(decimal_digits, |text: &str| text.replace('_', "").parse::<i64>()),
            ConfigValue::Integer,
        ),
    ))(input)
}

fn decimal_digits(input: &str) -> PResult<'_, &str> {
    recognize(pair(digit1, many0_count(preceded(char('_'), digit1))))(input)
}

fn exponent(input: &str) -> PResult<'_, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), decimal_digits)))(input)
}

fn float_literal(input: &str) -> PResult<'_, f64> {
    map_res(
        alt((
            recognize(tuple((
                decimal_digits,
                char('.'),
                opt(decimal_digits),
                opt(exponent),
            ))),
            recognize(tuple((char('.'), decimal_digits, opt(exponent)))),
            recognize(pair(decimal_digits, exponent)),
        )),
        |text: &str| {
            text.replace('_', "")
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .ok_or("float literal out of range")
        },
    )(input)
}

fn radix_integer<'a>(
    lower: &'static str,
    upper: &'static str,
    radix: u32,
) -> impl FnMut(&'a str) -> PResult<'a, i64> {
    map_res(
        preceded(
            alt((tag(lower), tag(upper))),
            take_while1(move |c: char| c == '_' || c.is_digit(radix)),
        ),
        move |digits: &str| i64::from_str_radix(&digits.replace('_', ""), radix),
    )
}

/// String literal with an optional `r`/`R` raw prefix
fn string_literal(input: &str) -> PResult<'_, String> {
    let (input, raw) = opt(one_of("rR"))(input)?;
    let (input, body) = alt((
        delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")),
        delimited(tag("'''"), take_until("'''"), tag("'''")),
        quoted('"'),
        quoted('\''),
    ))(input)?;

    let text = if raw.is_some() {
        body.to_string()
    } else {
        unescape(body)
    };
    Ok((input, text))
}

/// Body of a single-quoted literal, escapes left in place
fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    let plain = if quote == '"' { "\\\"\n" } else { "\\'\n" };
    move |input: &'a str| {
        delimited(
            char(quote),
            map(opt(escaped(is_not(plain), '\\', anychar)), |body| {
                body.unwrap_or_default()
            }),
            char(quote),
        )(input)
    }
}

/// Resolve backslash escapes; unknown escapes such as `\d` stay as written
fn unescape(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            text.push('\\');
            break;
        };
        match escape {
            '\n' => {},
            '\\' | '\'' | '"' => text.push(escape),
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            'a' => text.push('\u{07}'),
            'b' => text.push('\u{08}'),
            'f' => text.push('\u{0c}'),
            'v' => text.push('\u{0b}'),
            'x' | 'u' => {
                let width = if escape == 'x' { 2 } else { 4 };
                let digits: String = chars.clone().take(width).collect();
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        text.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    },
                    None => {
                        text.push('\\');
                        text.push(escape);
                    },
                }
            },
            other => {
                text.push('\\');
                text.push(other);
            },
        }
    }

    text
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

type EvalResult<T> = std::result::Result<T, String>;

struct Interpreter<'p> {
    origin: &'p Path,
    /// Every bound name, including reserved ones
    names: ConfigMap,
    /// Size of each bound value, see [`size_of`]
    sizes: HashMap<String, usize>,
    total_size: usize,
}

impl<'p> Interpreter<'p> {
    fn new(origin: &'p Path) -> Self {
        Self {
            origin,
            names: ConfigMap::new(),
            sizes: HashMap::new(),
            total_size: 0,
        }
    }

    fn run(&mut self, lines: &[LogicalLine]) -> Result<()> {
        let mut indents = vec![0usize];
        let mut index = 0;

        while index < lines.len() {
            let line = &lines[index];
            index += 1;

            while indents.len() > 1 && line.indent < indents[indents.len() - 1] {
                indents.pop();
            }
            if indents.last() != Some(&line.indent) {
                return Err(self.error(line.number, "unexpected indent"));
            }

            let statement =
                parse_statement(&line.text).map_err(|reason| self.error(line.number, reason))?;
            trace!(line = line.number, ?statement, "statement");

            match statement {
                Statement::Class { name } => {
                    let body = self.block_indent(lines, index, line)?;
                    debug!(class = %name, "flattening class attributes");
                    indents.push(body);
                },
                Statement::Def { name } => {
                    self.block_indent(lines, index, line)?;
                    index = block_end(lines, index, line.indent);
                    self.bind(name.clone(), ConfigValue::String(name))
                        .map_err(|reason| self.error(line.number, reason))?;
                },
                Statement::MainGuard => {
                    self.block_indent(lines, index, line)?;
                    index = block_end(lines, index, line.indent);
                },
                Statement::Import | Statement::Pass | Statement::Docstring => {},
                Statement::Assign { name, op, value } => {
                    self.eval(&value)
                        .and_then(|value| self.apply_assign(&name, op, value))
                        .and_then(|value| self.bind(name, value))
                        .map_err(|reason| self.error(line.number, reason))?;
                },
            }
        }

        Ok(())
    }

    /// Indentation of the block following a header, which must exist
    fn block_indent(&self, lines: &[LogicalLine], index: usize, header: &LogicalLine) -> Result<usize> {
        match lines.get(index) {
            Some(next) if next.indent > header.indent => Ok(next.indent),
            _ => Err(self.error(header.number, "expected an indented block")),
        }
    }

    fn apply_assign(&self, name: &str, op: AssignOp, value: ConfigValue) -> EvalResult<ConfigValue> {
        match op.binary_op() {
            None => Ok(value),
            Some(binary) => {
                let current = self.lookup(name)?;
                binary_op(binary, current, value)
            },
        }
    }

    /// Bind `name`, keeping every value and the namespace as a whole bounded
    fn bind(&mut self, name: String, value: ConfigValue) -> EvalResult<()> {
        if depth_of(&value) > MAX_VALUE_DEPTH {
            return Err(format!(
                "value nested more than {} levels deep",
                MAX_VALUE_DEPTH
            ));
        }
        let size = check_size(size_of(&value))?;
        let previous = self.sizes.get(&name).copied().unwrap_or(0);
        let total = self.total_size - previous + size;
        if total > MAX_TOTAL_ELEMENTS {
            return Err(format!(
                "configuration exceeds {} elements in total",
                MAX_TOTAL_ELEMENTS
            ));
        }

        self.total_size = total;
        self.sizes.insert(name.clone(), size);
        self.names.insert(name, value);
        Ok(())
    }

    fn lookup(&self, name: &str) -> EvalResult<ConfigValue> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| format!("name '{}' is not defined", name))
    }

    fn error(&self, line: usize, reason: impl Into<String>) -> RunxError {
        RunxError::evaluation_error(self.origin, line, reason)
    }

    fn eval(&self, expr: &Expr) -> EvalResult<ConfigValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) | Expr::Tuple(items) => self.eval_all(items).map(ConfigValue::Sequence),
            Expr::Dict(entries) => {
                let mut map = ConfigMap::new();
                let mut size = 0;
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        ConfigValue::String(key) => key,
                        other => {
                            return Err(format!(
                                "dict keys must be strings, got '{}'",
                                other.type_name()
                            ))
                        },
                    };
                    let value = self.eval(value)?;
                    size = check_size(size + key.len() + size_of(&value))?;
                    map.insert(key, value);
                }
                Ok(ConfigValue::Mapping(map))
            },
            Expr::Unary(op, operand) => unary_op(*op, self.eval(operand)?),
            Expr::Binary(op, lhs, rhs) => binary_op(*op, self.eval(lhs)?, self.eval(rhs)?),
            Expr::Chain(first, rest) => {
                let mut acc = self.eval(first)?;
                for (op, rhs) in rest {
                    acc = binary_op(*op, acc, self.eval(rhs)?)?;
                }
                Ok(acc)
            },
            Expr::Call {
                function,
                args,
                kwargs,
            } => {
                let args = self.eval_all(args)?;
                let mut size = args.iter().map(size_of).sum::<usize>();
                let mut evaluated = Vec::with_capacity(kwargs.len());
                for (name, arg) in kwargs {
                    let value = self.eval(arg)?;
                    size = check_size(size + size_of(&value))?;
                    evaluated.push((name.clone(), value));
                }
                call_builtin(function, args, evaluated)
            },
        }
    }

    /// Evaluate `exprs` in order, failing as soon as their combined size is too large
    fn eval_all(&self, exprs: &[Expr]) -> EvalResult<Vec<ConfigValue>> {
        let mut values = Vec::with_capacity(exprs.len());
        let mut size = 0;
        for expr in exprs {
            let value = self.eval(expr)?;
            size = check_size(size + size_of(&value))?;
            values.push(value);
        }
        Ok(values)
    }
}

/// First index at or after `start` that is no longer inside the block
fn block_end(lines: &[LogicalLine], start: usize, header_indent: usize) -> usize {
    lines[start..]
        .iter()
        .position(|line| line.indent <= header_indent)
        .map(|offset| start + offset)
        .unwrap_or(lines.len())
}

/// Leaf values plus string and key bytes; an empty container counts as one
fn size_of(value: &ConfigValue) -> usize {
    match value {
        ConfigValue::String(s) => s.len().max(1),
        ConfigValue::Sequence(items) => items.iter().map(size_of).sum::<usize>().max(1),
        ConfigValue::Mapping(map) => map
            .iter()
            .map(|(key, value)| key.len() + size_of(value))
            .sum::<usize>()
            .max(1),
        _ => 1,
    }
}

fn depth_of(value: &ConfigValue) -> usize {
    match value {
        ConfigValue::Sequence(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
        ConfigValue::Mapping(map) => 1 + map.values().map(depth_of).max().unwrap_or(0),
        _ => 0,
    }
}

fn check_size(size: usize) -> EvalResult<usize> {
    if size > MAX_ELEMENTS {
        Err(format!("value exceeds {} elements", MAX_ELEMENTS))
    } else {
        Ok(size)
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Integer(n) => Some(Number::Int(*n)),
            ConfigValue::Float(x) => Some(Number::Float(*x)),
            ConfigValue::Bool(b) => Some(Number::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

fn unary_op(op: UnaryOp, operand: ConfigValue) -> EvalResult<ConfigValue> {
    let symbol = match op {
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
    };
    let number = Number::from_value(&operand)
        .ok_or_else(|| format!("bad operand type for unary {}: '{}'", symbol, operand.type_name()))?;

    match (op, number) {
        (UnaryOp::Neg, Number::Int(n)) => n
            .checked_neg()
            .map(ConfigValue::Integer)
            .ok_or_else(|| "integer overflow".to_string()),
        (UnaryOp::Neg, Number::Float(x)) => Ok(ConfigValue::Float(-x)),
        (UnaryOp::Pos, Number::Int(n)) => Ok(ConfigValue::Integer(n)),
        (UnaryOp::Pos, Number::Float(x)) => Ok(ConfigValue::Float(x)),
    }
}

fn binary_op(op: BinaryOp, lhs: ConfigValue, rhs: ConfigValue) -> EvalResult<ConfigValue> {
    use ConfigValue::{Integer, Sequence, String as Str};

    match (op, lhs, rhs) {
        (BinaryOp::Add, Str(a), Str(b)) => {
            check_size(a.len() + b.len())?;
            Ok(Str(a + &b))
        },
        (BinaryOp::Add, Sequence(mut a), Sequence(b)) => {
            check_size(items_size(&a) + items_size(&b))?;
            a.extend(b);
            Ok(Sequence(a))
        },
        (BinaryOp::Mul, Str(s), Integer(n)) | (BinaryOp::Mul, Integer(n), Str(s)) => {
            let count = repeat_count(s.len(), n)?;
            Ok(Str(s.repeat(count)))
        },
        (BinaryOp::Mul, Sequence(items), Integer(n)) | (BinaryOp::Mul, Integer(n), Sequence(items)) => {
            let count = repeat_count(items_size(&items), n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Sequence(repeated))
        },
        (op, lhs, rhs) => match (Number::from_value(&lhs), Number::from_value(&rhs)) {
            (Some(a), Some(b)) => arithmetic(op, a, b),
            _ => Err(format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            )),
        },
    }
}

fn items_size(items: &[ConfigValue]) -> usize {
    items.iter().map(size_of).sum()
}

/// Number of copies to make; an empty operand or a non-positive count gives none
fn repeat_count(unit: usize, times: i64) -> EvalResult<usize> {
    let times = usize::try_from(times).unwrap_or(0);
    if unit == 0 {
        return Ok(0);
    }
    match unit.checked_mul(times) {
        Some(total) if total <= MAX_ELEMENTS => Ok(times),
        _ => Err(format!("repetition exceeds {} elements", MAX_ELEMENTS)),
    }
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> EvalResult<ConfigValue> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_arithmetic(op, x, y),
        _ => float_arithmetic(op, a.to_f64(), b.to_f64()),
    }
}

fn int_arithmetic(op: BinaryOp, x: i64, y: i64) -> EvalResult<ConfigValue> {
    let overflow = || "integer overflow".to_string();
    let result = match op {
        BinaryOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        BinaryOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        BinaryOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        BinaryOp::Div => return float_arithmetic(op, x as f64, y as f64),
        BinaryOp::FloorDiv => {
            if y == 0 {
                return Err("integer division by zero".to_string());
            }
            let quotient = x.checked_div(y).ok_or_else(overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                quotient - 1
            } else {
                quotient
            }
        },
        BinaryOp::Mod => {
            if y == 0 {
                return Err("integer modulo by zero".to_string());
            }
            let remainder = x.checked_rem(y).ok_or_else(overflow)?;
            if remainder != 0 && ((remainder < 0) != (y < 0)) {
                remainder + y
            } else {
                remainder
            }
        },
        BinaryOp::Pow => {
            if y < 0 {
                return float_arithmetic(op, x as f64, y as f64);
            }
            let exponent = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exponent).ok_or_else(overflow)?
        },
    };
    Ok(ConfigValue::Integer(result))
}

fn float_arithmetic(op: BinaryOp, x: f64, y: f64) -> EvalResult<ConfigValue> {
    let nonzero = |y: f64| {
        if y == 0.0 {
            Err("float division by zero".to_string())
        } else {
            Ok(y)
        }
    };
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / nonzero(y)?,
        BinaryOp::FloorDiv => (x / nonzero(y)?).floor(),
        BinaryOp::Mod => {
            let remainder = x % nonzero(y)?;
            if remainder != 0.0 && ((remainder < 0.0) != (y < 0.0)) {
                remainder + y
            } else {
                remainder
            }
        },
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err("zero cannot be raised to a negative power".to_string());
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err("negative number cannot be raised to a fractional power".to_string());
            }
            x.powf(y)
        },
    };
    finite(result)
}

/// Reject results that cannot be stored or written back as JSON
fn finite(x: f64) -> EvalResult<ConfigValue> {
    if x.is_finite() {
        Ok(ConfigValue::Float(x))
    } else if x.is_nan() {
        Err("float result is not a number".to_string())
    } else {
        Err("float overflow".to_string())
    }
}

// ---------------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------------

fn call_builtin(
    function: &str,
    args: Vec<ConfigValue>,
    kwargs: Vec<(String, ConfigValue)>,
) -> EvalResult<ConfigValue> {
    if function != "dict" && !kwargs.is_empty() {
        return Err(format!("{}() takes no keyword arguments", function));
    }

    match function {
        "range" => range(&args),
        "list" | "tuple" => match args.as_slice() {
            [] => Ok(ConfigValue::Sequence(Vec::new())),
            [single] => iterate(single).map(ConfigValue::Sequence),
            _ => Err(arity(function, "at most 1", args.len())),
        },
        "dict" => {
            let mut map = match args.as_slice() {
                [] => ConfigMap::new(),
                [ConfigValue::Mapping(map)] => map.clone(),
                [other] => {
                    return Err(format!(
                        "cannot convert '{}' to a dict",
                        other.type_name()
                    ))
                },
                _ => return Err(arity(function, "at most 1", args.len())),
            };
            map.extend(kwargs);
            Ok(ConfigValue::Mapping(map))
        },
        "len" => match args.as_slice() {
            [ConfigValue::String(s)] => Ok(ConfigValue::Integer(s.chars().count() as i64)),
            [ConfigValue::Sequence(items)] => Ok(ConfigValue::Integer(items.len() as i64)),
            [ConfigValue::Mapping(map)] => Ok(ConfigValue::Integer(map.len() as i64)),
            [other] => Err(format!("object of type '{}' has no len()", other.type_name())),
            _ => Err(arity(function, "exactly 1", args.len())),
        },
        "abs" => match args.as_slice() {
            [value] => match Number::from_value(value) {
                Some(Number::Int(n)) => n
                    .checked_abs()
                    .map(ConfigValue::Integer)
                    .ok_or_else(|| "integer overflow".to_string()),
                Some(Number::Float(x)) => Ok(ConfigValue::Float(x.abs())),
                None => Err(format!("bad operand type for abs(): '{}'", value.type_name())),
            },
            _ => Err(arity(function, "exactly 1", args.len())),
        },
        "min" | "max" => extremum(function, args),
        "sum" => match args.as_slice() {
            [ConfigValue::Sequence(items)] => items
                .iter()
                .cloned()
                .try_fold(ConfigValue::Integer(0), |acc, item| {
                    binary_op(BinaryOp::Add, acc, item)
                }),
            [ConfigValue::Sequence(items), start] => items
                .iter()
                .cloned()
                .try_fold(start.clone(), |acc, item| binary_op(BinaryOp::Add, acc, item)),
            _ => Err("sum() expects a list and an optional start value".to_string()),
        },
        "int" => match args.as_slice() {
            [] => Ok(ConfigValue::Integer(0)),
            [ConfigValue::String(s)] => s
                .trim()
                .replace('_', "")
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|_| format!("invalid literal for int(): '{}'", s)),
            [value] => match Number::from_value(value) {
                Some(Number::Int(n)) => Ok(ConfigValue::Integer(n)),
                Some(Number::Float(x)) if x.is_finite() && x.abs() < 9.2e18 => {
                    Ok(ConfigValue::Integer(x.trunc() as i64))
                },
                Some(Number::Float(x)) => Err(format!("cannot convert float {} to integer", x)),
                None => Err(format!("int() argument must be a number or string, not '{}'", value.type_name())),
            },
            _ => Err(arity(function, "at most 1", args.len())),
        },
        "float" => match args.as_slice() {
            [] => Ok(ConfigValue::Float(0.0)),
            [ConfigValue::String(s)] => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("could not convert string to float: '{}'", s))
                .and_then(finite),
            [value] => Number::from_value(value)
                .map(|n| ConfigValue::Float(n.to_f64()))
                .ok_or_else(|| format!("float() argument must be a number or string, not '{}'", value.type_name())),
            _ => Err(arity(function, "at most 1", args.len())),
        },
        "str" => match args.as_slice() {
            [] => Ok(ConfigValue::String(String::new())),
            [value] => Ok(ConfigValue::String(python_str(value))),
            _ => Err(arity(function, "at most 1", args.len())),
        },
        "bool" => match args.as_slice() {
            [] => Ok(ConfigValue::Bool(false)),
            [value] => Ok(ConfigValue::Bool(truthy(value))),
            _ => Err(arity(function, "at most 1", args.len())),
        },
        "round" => round(&args),
        other => Err(format!("call to unsupported function '{}'", other)),
    }
}

fn arity(function: &str, expected: &str, got: usize) -> String {
    format!("{}() takes {} argument(s) ({} given)", function, expected, got)
}

fn iterate(value: &ConfigValue) -> EvalResult<Vec<ConfigValue>> {
    match value {
        ConfigValue::Sequence(items) => Ok(items.clone()),
        ConfigValue::String(s) => Ok(s
            .chars()
            .map(|c| ConfigValue::String(c.to_string()))
            .collect()),
        ConfigValue::Mapping(map) => Ok(map
            .keys()
            .map(|key| ConfigValue::String(key.clone()))
            .collect()),
        other => Err(format!("'{}' object is not iterable", other.type_name())),
    }
}

fn range(args: &[ConfigValue]) -> EvalResult<ConfigValue> {
    let bounds = args
        .iter()
        .map(|arg| match Number::from_value(arg) {
            Some(Number::Int(n)) => Ok(n),
            _ => Err(format!(
                "'{}' object cannot be interpreted as an integer",
                arg.type_name()
            )),
        })
        .collect::<EvalResult<Vec<i64>>>()?;

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(format!("range expected 1 to 3 arguments, got {}", bounds.len())),
    };
    if step == 0 {
        return Err("range() arg 3 must not be zero".to_string());
    }

    let (span, stride) = if step > 0 {
        (stop as i128 - start as i128, step as i128)
    } else {
        (start as i128 - stop as i128, -(step as i128))
    };
    let len = ((span + stride - 1) / stride).max(0);
    if len > MAX_ELEMENTS as i128 {
        return Err(format!("range() exceeds {} elements", MAX_ELEMENTS));
    }

    Ok(ConfigValue::Sequence(
        (0..len as i64)
            .map(|i| ConfigValue::Integer(start + i * step))
            .collect(),
    ))
}

fn extremum(function: &str, args: Vec<ConfigValue>) -> EvalResult<ConfigValue> {
    let candidates = match <[ConfigValue; 1]>::try_from(args) {
        Ok([ConfigValue::Sequence(items)]) => items,
        Ok([single]) => {
            return Err(format!("'{}' object is not iterable", single.type_name()))
        },
        Err(args) => args,
    };

    let mut best: Option<(f64, ConfigValue)> = None;
    for candidate in candidates {
        let key = Number::from_value(&candidate)
            .ok_or_else(|| format!("{}() only supports numbers, got '{}'", function, candidate.type_name()))?
            .to_f64();
        let replace = match &best {
            None => true,
            Some((current, _)) if function == "min" => key < *current,
            Some((current, _)) => key > *current,
        };
        if replace {
            best = Some((key, candidate));
        }
    }

    best.map(|(_, value)| value)
        .ok_or_else(|| format!("{}() arg is an empty sequence", function))
}

fn round(args: &[ConfigValue]) -> EvalResult<ConfigValue> {
    let (number, digits) = match args {
        [value] => (value, None),
        [value, ConfigValue::Integer(digits)] => (value, Some(*digits)),
        _ => return Err("round() expects a number and optional integer digits".to_string()),
    };
    let x = match Number::from_value(number) {
        Some(Number::Int(n)) => return round_int(n, digits.unwrap_or(0)).map(ConfigValue::Integer),
        Some(Number::Float(x)) => x,
        None => return Err(format!("type '{}' doesn't define __round__", number.type_name())),
    };

    match digits {
        None => {
            let rounded = round_half_even(x);
            if rounded.is_finite() && rounded.abs() < 9.2e18 {
                Ok(ConfigValue::Integer(rounded as i64))
            } else {
                Err(format!("cannot convert float {} to integer", x))
            }
        },
        Some(digits) => {
            let scale = 10f64.powi(digits.clamp(-308, 308) as i32);
            let scaled = x * scale;
            if !scaled.is_finite() {
                return Ok(ConfigValue::Float(x));
            }
            finite(round_half_even(scaled) / scale)
        },
    }
}

/// Integer rounding to `digits` decimal places, ties to even, as `round(1250, -2)`
fn round_int(n: i64, digits: i64) -> EvalResult<i64> {
    if digits >= 0 {
        return Ok(n);
    }
    // every i64 is below half of 10^20
    let places = digits.unsigned_abs();
    if places > 19 {
        return Ok(0);
    }
    let unit = 10i128.pow(places as u32);

    let n = n as i128;
    let quotient = n.div_euclid(unit);
    let remainder = n.rem_euclid(unit);
    let rounded_up = match (2 * remainder).cmp(&unit) {
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => quotient % 2 != 0,
    };
    let quotient = if rounded_up { quotient + 1 } else { quotient };
    i64::try_from(quotient * unit).map_err(|_| "integer overflow".to_string())
}

fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

fn truthy(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Null => false,
        ConfigValue::Bool(b) => *b,
        ConfigValue::Integer(n) => *n != 0,
        ConfigValue::Float(x) => *x != 0.0,
        ConfigValue::String(s) => !s.is_empty(),
        ConfigValue::Sequence(items) => !items.is_empty(),
        ConfigValue::Mapping(map) => !map.is_empty(),
    }
}

/// `str(value)`: strings unchanged, everything else as its repr
fn python_str(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(s) => s.clone(),
        other => python_repr(other),
    }
}

fn python_repr(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Null => "None".to_string(),
        ConfigValue::Bool(true) => "True".to_string(),
        ConfigValue::Bool(false) => "False".to_string(),
        ConfigValue::Integer(n) => n.to_string(),
        ConfigValue::Float(x) => python_float(*x),
        ConfigValue::String(s) => quote_repr(s),
        ConfigValue::Sequence(items) => format!(
            "[{}]",
            items.iter().map(python_repr).collect::<Vec<_>>().join(", ")
        ),
        ConfigValue::Mapping(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(key, value)| format!("{}: {}", quote_repr(key), python_repr(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Shortest round-tripping form, scientific outside `[1e-4, 1e16)` like `1e+20`
fn python_float(x: f64) -> String {
    if !x.is_finite() {
        return if x.is_nan() {
            "nan".to_string()
        } else if x > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let magnitude = x.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let text = x.to_string();
        return if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        };
    }

    let text = format!("{:e}", x);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        },
        None => text,
    }
}

fn quote_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut text = String::with_capacity(s.len() + 2);
    text.push(quote);
    for c in s.chars() {
        match c {
            '\\' => text.push_str("\\\\"),
            '\n' => text.push_str("\\n"),
            '\t' => text.push_str("\\t"),
            '\r' => text.push_str("\\r"),
            c if c == quote => {
                text.push('\\');
                text.push(c);
            },
            c => text.push(c),
        }
    }
    text.push(quote);
    text
}
