//! Lexer and recursive-descent parser for guard/parameter expressions.
//!
//! The grammar is the arithmetic/comparison/boolean subset the legacy
//! catalogues actually use, plus dotted field paths and predicate calls
//! (`mascot.environment.floor.isOn(...)`). Paths are resolved to typed
//! `Field`/`Func` variants at parse time, so evaluation never touches
//! strings and unknown vocabulary is rejected up front.

use super::{BinOp, Expr, Field, Func, ScriptError, UnOp};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f32),
    Ident(String),
    True,
    False,
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
}

fn lex(src: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '0'..='9' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        // A dot followed by a letter is a path separator
                        // (e.g. `2.abs` never occurs, but be strict anyway).
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f32 = text
                    .parse()
                    .map_err(|_| ScriptError::Syntax(format!("bad number `{text}`")))?;
                tokens.push(Token::Num(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ident.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '?' => {
                chars.next();
                tokens.push(Token::Question);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(ScriptError::Syntax("lone `=`".into()));
                }
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(ScriptError::Syntax("lone `&`".into()));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    return Err(ScriptError::Syntax("lone `|`".into()));
                }
            }
            other => {
                return Err(ScriptError::Syntax(format!("unexpected `{other}`")));
            }
        }
    }

    Ok(tokens)
}

pub(super) fn parse_expr(src: &str) -> Result<Expr, ScriptError> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ScriptError::Syntax("trailing tokens".into()));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ScriptError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(ScriptError::Syntax(format!("expected {token:?}")))
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.or()?;
        if self.eat(&Token::Question) {
            let then = self.expression()?;
            self.expect(Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and()?;
        while self.eat(&Token::OrOr) {
            let right = self.and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?)))
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(first)) => self.path(first),
            other => Err(ScriptError::Syntax(format!("unexpected {other:?}"))),
        }
    }

    /// A dotted path, optionally followed by a call argument list.
    fn path(&mut self, first: String) -> Result<Expr, ScriptError> {
        let mut path = first;
        while self.eat(&Token::Dot) {
            match self.advance() {
                Some(Token::Ident(segment)) => {
                    path.push('.');
                    path.push_str(&segment);
                }
                _ => return Err(ScriptError::Syntax("expected identifier after `.`".into())),
            }
        }

        if self.eat(&Token::LParen) {
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    args.push(self.expression()?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(Token::Comma)?;
                }
            }
            let func = Func::resolve(&path)
                .ok_or_else(|| ScriptError::UnknownFunction(path.clone()))?;
            Ok(Expr::Call(func, args))
        } else {
            let field =
                Field::resolve(&path).ok_or_else(|| ScriptError::UnknownField(path.clone()))?;
            Ok(Expr::Field(field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence() {
        // 1 + 2 * 3 == 7 must group the multiplication first.
        let expr = parse_expr("1 + 2 * 3 == 7").unwrap();
        match expr {
            Expr::Binary(BinOp::Eq, _, _) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_paths_and_calls() {
        assert!(parse_expr("mascot.anchor.x > 50").is_ok());
        assert!(parse_expr("mascot.environment.floor.isOn(mascot.anchor)").is_ok());
        assert!(parse_expr("Math.abs(-3) + Math.min(1, 2)").is_ok());
    }

    #[test]
    fn rejects_unknown_vocabulary() {
        assert!(matches!(
            parse_expr("mascot.unknownField"),
            Err(ScriptError::UnknownField(_))
        ));
        assert!(matches!(
            parse_expr("mascot.explode()"),
            Err(ScriptError::UnknownFunction(_))
        ));
        assert!(parse_expr("invalid...").is_err());
    }
}
