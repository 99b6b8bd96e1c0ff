use bson::Bson;

use super::SqlError;
use super::ast::{
    BinaryOp, Expr, FromClause, JoinClause, PathSegment, Projection, SelectItem, SelectStmt,
    Source, UnaryOp,
};
use super::lexer::{Token, is_reserved, tokenize};

/// Parse one `SELECT` statement of the store dialect.
pub(crate) fn parse(input: &str) -> Result<SelectStmt, SqlError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let stmt = parser.select()?;
    if parser.peek() != &Token::Eof {
        return Err(SqlError::Syntax(format!(
            "unexpected trailing token {:?}",
            parser.peek()
        )));
    }
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), SqlError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(SqlError::Syntax(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek().is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), SqlError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(SqlError::Syntax(format!(
                "expected {kw}, found {:?}",
                self.peek()
            )))
        }
    }

    fn ident(&mut self) -> Result<String, SqlError> {
        match self.advance() {
            Token::Ident(name) if !is_reserved(&name) => Ok(name),
            other => Err(SqlError::Syntax(format!(
                "expected identifier, found {other:?}"
            ))),
        }
    }

    fn peek_alias(&self) -> bool {
        matches!(self.peek(), Token::Ident(name) if !is_reserved(name))
    }

    // ── Statement ───────────────────────────────────────────────

    fn select(&mut self) -> Result<SelectStmt, SqlError> {
        self.expect_keyword("SELECT")?;
        let distinct = self.eat_keyword("DISTINCT");

        let projection = if self.eat(&Token::Star) {
            Projection::Star
        } else {
            let mut items = Vec::new();
            loop {
                let expr = self.expr()?;
                let alias = if self.eat_keyword("AS") {
                    Some(self.ident()?)
                } else if self.peek_alias() {
                    Some(self.ident()?)
                } else {
                    None
                };
                items.push(SelectItem { expr, alias });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            Projection::Items(items)
        };

        self.expect_keyword("FROM")?;
        let from = self.from_clause()?;

        let mut joins = Vec::new();
        loop {
            if self.eat_keyword("JOIN") {
                // `JOIN source [alias] IN path`: the alias, when present, is the binding.
                let mut binding = self.ident()?;
                if self.peek_alias() {
                    binding = self.ident()?;
                }
                self.expect_keyword("IN")?;
                let path = self.postfix()?;
                joins.push(JoinClause::In { binding, path });
            } else if self.peek() == &Token::LParen {
                self.advance();
                let filter = self.expr()?;
                self.expect(Token::RParen)?;
                joins.push(JoinClause::Filter(filter));
            } else if !joins.is_empty() && self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let filter = if self.eat_keyword("WHERE") {
            Some(self.expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat_keyword("GROUP") {
            self.expect_keyword("BY")?;
            loop {
                group_by.push(self.expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let mut order_by = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let expr = self.expr()?;
                let descending = if self.eat_keyword("DESC") {
                    true
                } else {
                    self.eat_keyword("ASC");
                    false
                };
                order_by.push((expr, descending));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let offset_limit = if self.eat_keyword("OFFSET") {
            let offset = self.unary()?;
            self.expect_keyword("LIMIT")?;
            let limit = self.unary()?;
            Some((offset, limit))
        } else {
            None
        };

        Ok(SelectStmt {
            distinct,
            projection,
            from,
            joins,
            filter,
            group_by,
            order_by,
            offset_limit,
        })
    }

    fn from_clause(&mut self) -> Result<FromClause, SqlError> {
        if self.eat(&Token::LParen) {
            let inner = self.select()?;
            self.expect(Token::RParen)?;
            self.eat_keyword("AS");
            let alias = self.ident()?;
            return Ok(FromClause {
                source: Source::Subquery(Box::new(inner)),
                alias,
            });
        }

        let name = self.ident()?;
        let alias = if self.eat_keyword("AS") || self.peek_alias() {
            self.ident()?
        } else {
            name.clone()
        };
        Ok(FromClause {
            source: Source::Container(name),
            alias,
        })
    }

    // ── Expressions ─────────────────────────────────────────────

    fn expr(&mut self) -> Result<Expr, SqlError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.and()?;
        while self.eat_keyword("OR") {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.not()?;
        while self.eat_keyword("AND") {
            let rhs = self.not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, SqlError> {
        if self.eat_keyword("NOT") {
            let inner = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.concat()?;
        loop {
            if self.eat_keyword("IN") {
                lhs = self.in_list(lhs, false)?;
                continue;
            }
            if self.peek().is_keyword("NOT") && self.peek_at(1).is_keyword("IN") {
                self.advance();
                self.advance();
                lhs = self.in_list(lhs, true)?;
                continue;
            }
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                Token::Lt => BinaryOp::Lt,
                Token::Lte => BinaryOp::Lte,
                Token::Gt => BinaryOp::Gt,
                Token::Gte => BinaryOp::Gte,
                _ => break,
            };
            self.advance();
            let rhs = self.concat()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn in_list(&mut self, expr: Expr, negated: bool) -> Result<Expr, SqlError> {
        self.expect(Token::LParen)?;
        let mut list = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                list.push(self.expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expr::In {
            expr: Box::new(expr),
            list,
            negated,
        })
    }

    fn concat(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.additive()?;
        while self.eat(&Token::Concat) {
            let rhs = self.additive()?;
            lhs = Expr::Binary(BinaryOp::Concat, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, SqlError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, SqlError> {
        if self.eat(&Token::Minus) {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SqlError> {
        let primary = self.primary()?;
        let Expr::Path { root, mut segments } = primary else {
            return Ok(primary);
        };
        loop {
            if self.eat(&Token::Dot) {
                segments.push(PathSegment::Field(self.ident()?));
            } else if self.eat(&Token::LBracket) {
                let segment = match self.advance() {
                    Token::Str(s) => PathSegment::Field(s),
                    Token::Int(n) => PathSegment::Index(n),
                    other => {
                        return Err(SqlError::Syntax(format!(
                            "invalid property accessor {other:?}"
                        )));
                    }
                };
                self.expect(Token::RBracket)?;
                segments.push(segment);
            } else {
                break;
            }
        }
        Ok(Expr::Path { root, segments })
    }

    fn primary(&mut self) -> Result<Expr, SqlError> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Bson::Int64(n))),
            Token::Float(f) => Ok(Expr::Literal(Bson::Double(f))),
            Token::Str(s) => Ok(Expr::Literal(Bson::String(s))),
            Token::Param(name) => Ok(Expr::Param(name)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("TRUE") => {
                Ok(Expr::Literal(Bson::Boolean(true)))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("FALSE") => {
                Ok(Expr::Literal(Bson::Boolean(false)))
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("NULL") => Ok(Expr::Literal(Bson::Null)),
            Token::Ident(word) if word.eq_ignore_ascii_case("UNDEFINED") => Ok(Expr::Undefined),
            Token::Ident(word) if self.peek() == &Token::LParen => self.call(word),
            Token::Ident(word) if !is_reserved(&word) => Ok(Expr::Path {
                root: word,
                segments: Vec::new(),
            }),
            other => Err(SqlError::Syntax(format!("unexpected token {other:?}"))),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, SqlError> {
        self.expect(Token::LParen)?;
        let distinct = self.eat_keyword("DISTINCT");
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expr::Call {
            name: name.to_ascii_uppercase(),
            args,
            distinct,
        })
    }
}
