use super::SqlError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Param(String),
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Concat,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Eof,
}

impl Token {
    /// True when the token is the (case-insensitive) keyword `kw`.
    pub(crate) fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }
}

const KEYWORDS: &[&str] = &[
    "SELECT", "DISTINCT", "FROM", "WHERE", "JOIN", "IN", "AS", "AND", "OR", "NOT", "ORDER",
    "GROUP", "BY", "ASC", "DESC", "OFFSET", "LIMIT", "TRUE", "FALSE", "NULL", "UNDEFINED",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, SqlError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                is_float = true;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                is_float = true;
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let token = if is_float {
                Token::Float(
                    text.parse()
                        .map_err(|_| SqlError::Syntax(format!("invalid number: {text}")))?,
                )
            } else {
                match text.parse::<i64>() {
                    Ok(n) => Token::Int(n),
                    Err(_) => Token::Float(
                        text.parse()
                            .map_err(|_| SqlError::Syntax(format!("invalid number: {text}")))?,
                    ),
                }
            };
            tokens.push(token);
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let mut s = String::new();
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(SqlError::Syntax("unterminated string literal".into()));
                };
                i += 1;
                match ch {
                    '\\' => {
                        let Some(&esc) = chars.get(i) else {
                            return Err(SqlError::Syntax("unterminated escape".into()));
                        };
                        i += 1;
                        s.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                    }
                    ch if ch == quote => break,
                    ch => s.push(ch),
                }
            }
            tokens.push(Token::Str(s));
            continue;
        }

        if c == '@' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i == start + 1 {
                return Err(SqlError::Syntax("empty parameter name".into()));
            }
            tokens.push(Token::Param(chars[start..i].iter().collect()));
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('|', Some('|')) => (Token::Concat, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('>')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('=', _) => (Token::Eq, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('*', _) => (Token::Star, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            (other, _) => {
                return Err(SqlError::Syntax(format!("unexpected character '{other}'")));
            }
        };
        tokens.push(token);
        i += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_params_paths_and_operators() {
        let tokens = tokenize("SELECT c.a FROM c WHERE c.a >= @arg0 || 'x'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("SELECT".into()),
                Token::Ident("c".into()),
                Token::Dot,
                Token::Ident("a".into()),
                Token::Ident("FROM".into()),
                Token::Ident("c".into()),
                Token::Ident("WHERE".into()),
                Token::Ident("c".into()),
                Token::Dot,
                Token::Ident("a".into()),
                Token::Gte,
                Token::Param("@arg0".into()),
                Token::Concat,
                Token::Str("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        let tokens = tokenize("1 2.5 3e2").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Int(1), Token::Float(2.5), Token::Float(300.0), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(matches!(tokenize("'abc"), Err(SqlError::Syntax(_))));
    }
}
