//! Recursive descent parser for path expressions.
//!
//! Precedence, lowest first:
//!
//! 1. `or`
//! 2. `and`
//! 3. `=`, `!=`
//! 4. `<`, `<=`, `>`, `>=`
//! 5. `|`
//! 6. location paths and filter expressions
//!
//! Function names, arities and node-set argument requirements are checked
//! here, so every error a path can produce is reported with a position
//! before the document is touched.

use super::ast::{Axis, BinaryOp, Expr, Function, LocationPath, NodeTest, Step};
use super::lexer::{Lexer, Spanned, Token};
use super::PathError;

/// Maximum nesting of parentheses, predicates and function arguments.
const MAX_NESTING: usize = 64;

/// Maximum number of binary and union operators in one expression.
const MAX_OPERATORS: usize = 256;

/// Parses an expression string into an [`Expr`].
///
/// # Errors
///
/// Returns [`PathError::Syntax`] for empty or malformed expressions,
/// unknown axes or functions, and wrong argument counts.
///
/// # Examples
///
/// ```
/// use xmlsplice::xpath::parser::parse;
///
/// assert!(parse("//item[@id='2']").is_ok());
/// assert!(parse("//item[").is_err());
/// ```
pub fn parse(input: &str) -> Result<Expr, PathError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.is_empty() {
        return Err(PathError::syntax("empty path expression", 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error(&format!("unexpected {}", extra.describe())));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), PathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            let found = self.describe_current();
            Err(self.error(&format!("expected {}, found {found}", expected.describe())))
        }
    }

    fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_string(), Token::describe)
    }

    fn error(&self, message: &str) -> PathError {
        PathError::syntax(message, self.offset())
    }

    fn count_operator(&mut self) -> Result<(), PathError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression has too many operators"));
        }
        Ok(())
    }

    // --- Expressions ---

    fn parse_expr(&mut self) -> Result<Expr, PathError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, PathError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            self.count_operator()?;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, PathError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            self.count_operator()?;
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, PathError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Neq) => BinaryOp::Neq,
                _ => return Ok(left),
            };
            self.pos += 1;
            self.count_operator()?;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, PathError> {
        let mut left = self.parse_union()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Lte) => BinaryOp::Lte,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Gte) => BinaryOp::Gte,
                _ => return Ok(left),
            };
            self.pos += 1;
            self.count_operator()?;
            let right = self.parse_union()?;
            left = binary(op, left, right);
        }
    }

    fn parse_union(&mut self) -> Result<Expr, PathError> {
        let start = self.offset();
        let mut left = self.parse_path_expr()?;
        while self.peek() == Some(&Token::Pipe) {
            if !left.is_node_set() {
                return Err(PathError::syntax("'|' operands must be node-sets", start));
            }
            self.pos += 1;
            self.count_operator()?;
            let operand_start = self.offset();
            let right = self.parse_path_expr()?;
            if !right.is_node_set() {
                return Err(PathError::syntax(
                    "'|' operands must be node-sets",
                    operand_start,
                ));
            }
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, PathError> {
        match self.peek() {
            Some(Token::Slash | Token::DoubleSlash) => {
                Ok(Expr::Path(self.parse_location_path()?))
            }
            Some(token) if is_step_start(token) => Ok(Expr::Path(self.parse_location_path()?)),
            _ => self.parse_filter_expr(),
        }
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, PathError> {
        let start = self.offset();
        let primary = self.parse_primary()?;
        if self.peek() != Some(&Token::LeftBracket) {
            return Ok(primary);
        }
        if !primary.is_node_set() {
            return Err(PathError::syntax(
                format!("predicates cannot filter a {}", primary.kind()),
                start,
            ));
        }
        let predicates = self.parse_predicates()?;
        Ok(Expr::Filter {
            expr: Box::new(primary),
            predicates,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, PathError> {
        match self.peek() {
            Some(Token::LeftParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::Literal(_)) => match self.advance() {
                Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
                _ => Err(self.error("expected literal")),
            },
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Some(Token::FunctionName(_)) => self.parse_function_call(),
            Some(_) => {
                let found = self.describe_current();
                Err(self.error(&format!("unexpected {found}")))
            }
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_function_call(&mut self) -> Result<Expr, PathError> {
        let start = self.offset();
        let name = match self.advance() {
            Some(Token::FunctionName(name)) => name,
            _ => return Err(PathError::syntax("expected function name", start)),
        };
        let function = Function::from_name(&name)
            .ok_or_else(|| PathError::syntax(format!("unknown function '{name}'"), start))?;
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                let arg_start = self.offset();
                let arg = self.parse_expr()?;
                if function.takes_node_set() && !arg.is_node_set() {
                    return Err(PathError::syntax(
                        format!("{function}() requires a node-set argument"),
                        arg_start,
                    ));
                }
                args.push(arg);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RightParen)?;
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} or {max}")
            };
            return Err(PathError::syntax(
                format!(
                    "{function}() expects {expected} argument(s), got {}",
                    args.len()
                ),
                start,
            ));
        }
        Ok(Expr::Call { function, args })
    }

    // --- Location paths ---

    fn parse_location_path(&mut self) -> Result<LocationPath, PathError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.peek().is_some_and(is_step_start) {
                    // A lone `/` selects the document node.
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ => break,
            }
            steps.push(self.parse_step()?);
        }
        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self) -> Result<Step, PathError> {
        if self.eat(&Token::Dot) {
            return Ok(abbreviated(Axis::SelfAxis));
        }
        if self.eat(&Token::DotDot) {
            return Ok(abbreviated(Axis::Parent));
        }

        let axis = self.parse_axis()?;
        let node_test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_axis(&mut self) -> Result<Axis, PathError> {
        if self.eat(&Token::At) {
            return Ok(Axis::Attribute);
        }
        if let Some(Token::AxisName(name)) = self.peek() {
            let axis = match Axis::from_name(name) {
                Some(axis) => axis,
                None if name == "namespace" => {
                    return Err(self.error("the namespace axis is not supported"));
                }
                None => return Err(self.error(&format!("unknown axis '{name}'"))),
            };
            self.pos += 1;
            self.expect(&Token::ColonColon)?;
            return Ok(axis);
        }
        Ok(Axis::Child)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, PathError> {
        match self.peek() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(NodeTest::Wildcard)
            }
            Some(Token::Name(name)) => {
                let test = NodeTest::Name(name.clone());
                self.pos += 1;
                Ok(test)
            }
            Some(Token::NodeType(kind)) => {
                let kind = kind.clone();
                self.pos += 1;
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match self.peek() {
                            Some(Token::Literal(target)) => {
                                let target = target.clone();
                                self.pos += 1;
                                Some(target)
                            }
                            _ => None,
                        };
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            _ => {
                let found = self.describe_current();
                Err(self.error(&format!("expected a node test, found {found}")))
            }
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, PathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn abbreviated(axis: Axis) -> Step {
    Step {
        axis,
        node_test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

fn is_step_start(token: &Token) -> bool {
    matches!(
        token,
        Token::Dot
            | Token::DotDot
            | Token::At
            | Token::AxisName(_)
            | Token::Star
            | Token::Name(_)
            | Token::NodeType(_)
    )
}
