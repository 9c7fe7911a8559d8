use crate::types::JsString;
use std::fmt;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Literals
    NumericLiteral(f64),
    LegacyOctalLiteral(f64),
    StringLiteral(JsString),
    BooleanLiteral(bool),
    NullLiteral,
    RegExpLiteral { pattern: String, flags: String },

    // Punctuators
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Semicolon,                // ;
    Comma,                    // ,
    LessThan,                 // <
    GreaterThan,              // >
    LessThanEqual,            // <=
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    StrictEqual,              // ===
    StrictNotEqual,           // !==
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Percent,                  // %
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    Question,                 // ?
    Colon,                    // :
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    PercentAssign,            // %=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=
    Slash,                    // /
    SlashAssign,              // /=

    // Special
    LineTerminator,
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        match s {
            "break" => Some(Keyword::Break),
            "case" => Some(Keyword::Case),
            "catch" => Some(Keyword::Catch),
            "class" => Some(Keyword::Class),
            "const" => Some(Keyword::Const),
            "continue" => Some(Keyword::Continue),
            "debugger" => Some(Keyword::Debugger),
            "default" => Some(Keyword::Default),
            "delete" => Some(Keyword::Delete),
            "do" => Some(Keyword::Do),
            "else" => Some(Keyword::Else),
            "enum" => Some(Keyword::Enum),
            "export" => Some(Keyword::Export),
            "extends" => Some(Keyword::Extends),
            "finally" => Some(Keyword::Finally),
            "for" => Some(Keyword::For),
            "function" => Some(Keyword::Function),
            "if" => Some(Keyword::If),
            "import" => Some(Keyword::Import),
            "in" => Some(Keyword::In),
            "instanceof" => Some(Keyword::Instanceof),
            "new" => Some(Keyword::New),
            "return" => Some(Keyword::Return),
            "super" => Some(Keyword::Super),
            "switch" => Some(Keyword::Switch),
            "this" => Some(Keyword::This),
            "throw" => Some(Keyword::Throw),
            "try" => Some(Keyword::Try),
            "typeof" => Some(Keyword::Typeof),
            "var" => Some(Keyword::Var),
            "void" => Some(Keyword::Void),
            "while" => Some(Keyword::While),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }

    /// Words reserved for future editions; never valid as statements.
    pub fn is_future_reserved(self) -> bool {
        matches!(
            self,
            Keyword::Class
                | Keyword::Const
                | Keyword::Enum
                | Keyword::Export
                | Keyword::Extends
                | Keyword::Import
                | Keyword::Super
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    token_start: usize,
    line: u32,
    column: u32,
    pub strict: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            offset: 0,
            token_start: 0,
            line: 1,
            column: 0,
            strict: false,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            location: self.location(),
        }
    }

    pub fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    pub fn is_whitespace(ch: char) -> bool {
        matches!(
            ch,
            '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}'
        ) || (!ch.is_ascii() && ch.is_whitespace() && !Self::is_line_terminator(ch))
    }

    pub fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphabetic() || unicode_id_start(ch)
    }

    pub fn is_identifier_continue(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphanumeric()
            || ch == '\u{200C}'
            || ch == '\u{200D}'
            || unicode_id_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_whitespace(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') => {
                    if self.peek() == Some('/') {
                        self.advance();
                        return Ok(has_line_terminator);
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated block comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn read_string(&mut self, quote: char) -> Result<JsString, LexError> {
        let mut units: Vec<u16> = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some(ch) if ch == quote => return Ok(JsString::from_units(units)),
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated string literal"));
                }
                Some('\\') => self.read_escape_sequence(&mut units)?,
                Some(ch) => {
                    let mut buf = [0u16; 2];
                    units.extend_from_slice(ch.encode_utf16(&mut buf));
                }
            }
        }
    }

    fn read_escape_sequence(&mut self, out: &mut Vec<u16>) -> Result<(), LexError> {
        match self.advance() {
            None => return Err(self.error("Unterminated escape sequence")),
            Some('n') => out.push(0x0A),
            Some('r') => out.push(0x0D),
            Some('t') => out.push(0x09),
            Some('b') => out.push(0x08),
            Some('f') => out.push(0x0C),
            Some('v') => out.push(0x0B),
            Some(ch @ '0'..='7') => {
                if ch == '0' && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    out.push(0);
                    return Ok(());
                }
                if self.strict {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode"));
                }
                let mut val = (ch as u32) - ('0' as u32);
                if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                    self.advance();
                    val = val * 8 + d;
                    if ch <= '3'
                        && let Some(d) = self.peek().and_then(|c| c.to_digit(8))
                    {
                        self.advance();
                        val = val * 8 + d;
                    }
                }
                out.push(val as u16);
            }
            Some('x') => {
                let h1 = self.advance().and_then(hex_val);
                let h2 = self.advance().and_then(hex_val);
                match (h1, h2) {
                    (Some(a), Some(b)) => out.push((a * 16 + b) as u16),
                    _ => return Err(self.error("Invalid hexadecimal escape sequence")),
                }
            }
            Some('u') => out.push(self.read_unicode_escape()?),
            Some(ch) if Self::is_line_terminator(ch) => {
                self.handle_newline(ch);
            }
            Some(ch) => {
                let mut buf = [0u16; 2];
                out.extend_from_slice(ch.encode_utf16(&mut buf));
            }
        }
        Ok(())
    }

    /// Four hex digits after `\u`; yields a single code unit (possibly a lone surrogate).
    fn read_unicode_escape(&mut self) -> Result<u16, LexError> {
        let mut val: u32 = 0;
        for _ in 0..4 {
            let d = self
                .advance()
                .and_then(hex_val)
                .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
            val = val * 16 + d;
        }
        Ok(val as u16)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        let mut s = String::new();
        s.push(first);

        let tok = if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.read_hex_literal()?
        } else if first == '0' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.read_legacy_octal_or_decimal(s)?
        } else {
            if first != '.' {
                self.read_decimal_digits(&mut s);
                if self.peek() == Some('.') {
                    s.push('.');
                    self.advance();
                }
            }
            self.read_decimal_digits(&mut s);
            self.read_exponent(&mut s)?;
            let val: f64 = s
                .parse()
                .map_err(|_| self.error("Invalid numeric literal"))?;
            Token::NumericLiteral(val)
        };

        if self
            .peek()
            .is_some_and(|c| Self::is_identifier_start(c) || c.is_ascii_digit() || c == '\\')
        {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        Ok(tok)
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_exponent(&mut self, s: &mut String) -> Result<(), LexError> {
        if let Some(e @ ('e' | 'E')) = self.peek() {
            s.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error("Invalid numeric literal: missing exponent"));
            }
            self.read_decimal_digits(s);
        }
        Ok(())
    }

    fn read_hex_literal(&mut self) -> Result<Token, LexError> {
        self.advance(); // x/X
        let mut val = 0f64;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(hex_val) {
            val = val * 16.0 + d as f64;
            digits += 1;
            self.advance();
        }
        if digits == 0 {
            return Err(self.error("Invalid hexadecimal literal"));
        }
        Ok(Token::NumericLiteral(val))
    }

    fn read_legacy_octal_or_decimal(&mut self, mut s: String) -> Result<Token, LexError> {
        let mut is_octal = true;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                if ch >= '8' {
                    is_octal = false;
                }
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if self.strict {
            return Err(self.error("Octal literals are not allowed in strict mode"));
        }
        if is_octal {
            let val = s[1..]
                .chars()
                .filter_map(|c| c.to_digit(8))
                .fold(0f64, |acc, d| acc * 8.0 + d as f64);
            Ok(Token::LegacyOctalLiteral(val))
        } else {
            if self.peek() == Some('.') {
                s.push('.');
                self.advance();
                self.read_decimal_digits(&mut s);
            }
            self.read_exponent(&mut s)?;
            let val: f64 = s.parse().map_err(|_| self.error("Invalid numeric literal"))?;
            Ok(Token::NumericLiteral(val))
        }
    }

    fn read_identifier(&mut self, first: char) -> Result<Token, LexError> {
        let mut name = String::new();
        let mut escaped = false;
        if first == '\\' {
            escaped = true;
            let c = self.read_identifier_escape()?;
            if !Self::is_identifier_start(c) {
                return Err(self.error("Invalid identifier escape"));
            }
            name.push(c);
        } else {
            name.push(first);
        }
        while let Some(ch) = self.peek() {
            if Self::is_identifier_continue(ch) {
                name.push(ch);
                self.advance();
            } else if ch == '\\' {
                self.advance();
                escaped = true;
                let c = self.read_identifier_escape()?;
                if !Self::is_identifier_continue(c) {
                    return Err(self.error("Invalid identifier escape"));
                }
                name.push(c);
            } else {
                break;
            }
        }

        // Escaped names never turn into keywords; the parser rejects reserved ones.
        if escaped {
            return Ok(Token::Identifier(name));
        }
        Ok(match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        })
    }

    fn read_identifier_escape(&mut self) -> Result<char, LexError> {
        if self.advance() != Some('u') {
            return Err(self.error("Invalid identifier escape"));
        }
        let unit = self.read_unicode_escape()?;
        char::from_u32(unit as u32).ok_or_else(|| self.error("Invalid identifier escape"))
    }

    /// Called by the parser after it has consumed the opening `/` (or `/=`).
    pub fn lex_regex(&mut self, prefix: &str) -> Result<Token, LexError> {
        let mut pattern = String::from(prefix);
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated regular expression")),
                Some(c) if Self::is_line_terminator(c) => {
                    return Err(self.error("Unterminated regular expression"));
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(c @ '[') => {
                    in_class = true;
                    pattern.push(c);
                    self.advance();
                }
                Some(c @ ']') => {
                    in_class = false;
                    pattern.push(c);
                    self.advance();
                }
                Some('\\') => {
                    pattern.push('\\');
                    self.advance();
                    match self.peek() {
                        Some(c) if !Self::is_line_terminator(c) => {
                            pattern.push(c);
                            self.advance();
                        }
                        _ => return Err(self.error("Unterminated regular expression")),
                    }
                }
                Some(c) => {
                    pattern.push(c);
                    self.advance();
                }
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if Self::is_identifier_continue(c) {
                flags.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token::RegExpLiteral { pattern, flags })
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            self.token_start = self.offset;

            let ch = match self.peek() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                if self.peek_next() == Some('/') {
                    self.advance();
                    self.advance();
                    self.skip_line_comment();
                    continue;
                }
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    if self.skip_block_comment()? {
                        return Ok(Token::LineTerminator);
                    }
                    continue;
                }
            }

            self.advance();

            if ch == '\'' || ch == '"' {
                let s = self.read_string(ch)?;
                return Ok(Token::StringLiteral(s));
            }

            if ch.is_ascii_digit() {
                return self.read_numeric_literal(ch);
            }
            if ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_numeric_literal(ch);
            }

            if Self::is_identifier_start(ch) || ch == '\\' {
                return self.read_identifier(ch);
            }

            return self.read_punctuator(ch);
        }
    }

    fn eat_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        let tok = match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '?' => Token::Question,
            '.' => Token::Dot,
            '<' => {
                if self.eat_if('<') {
                    if self.eat_if('=') {
                        Token::LeftShiftAssign
                    } else {
                        Token::LeftShift
                    }
                } else if self.eat_if('=') {
                    Token::LessThanEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if self.eat_if('>') {
                    if self.eat_if('>') {
                        if self.eat_if('=') {
                            Token::UnsignedRightShiftAssign
                        } else {
                            Token::UnsignedRightShift
                        }
                    } else if self.eat_if('=') {
                        Token::RightShiftAssign
                    } else {
                        Token::RightShift
                    }
                } else if self.eat_if('=') {
                    Token::GreaterThanEqual
                } else {
                    Token::GreaterThan
                }
            }
            '=' => {
                if self.eat_if('=') {
                    if self.eat_if('=') {
                        Token::StrictEqual
                    } else {
                        Token::Equal
                    }
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat_if('=') {
                    if self.eat_if('=') {
                        Token::StrictNotEqual
                    } else {
                        Token::NotEqual
                    }
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.eat_if('+') {
                    Token::Increment
                } else if self.eat_if('=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.eat_if('-') {
                    Token::Decrement
                } else if self.eat_if('=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.eat_if('=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat_if('=') {
                    Token::SlashAssign
                } else {
                    Token::Slash
                }
            }
            '%' => {
                if self.eat_if('=') {
                    Token::PercentAssign
                } else {
                    Token::Percent
                }
            }
            '&' => {
                if self.eat_if('&') {
                    Token::LogicalAnd
                } else if self.eat_if('=') {
                    Token::AmpersandAssign
                } else {
                    Token::Ampersand
                }
            }
            '|' => {
                if self.eat_if('|') {
                    Token::LogicalOr
                } else if self.eat_if('=') {
                    Token::PipeAssign
                } else {
                    Token::Pipe
                }
            }
            '^' => {
                if self.eat_if('=') {
                    Token::CaretAssign
                } else {
                    Token::Caret
                }
            }
            _ => return Err(self.error(format!("Unexpected character: {ch}"))),
        };
        Ok(tok)
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

pub(crate) fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

fn unicode_id_start(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_start(ch)
}

fn unicode_id_continue(ch: char) -> bool {
    !ch.is_ascii() && unicode_ident::is_xid_continue(ch)
}
