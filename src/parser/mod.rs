use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, SourceLocation, Token};
use std::fmt;
use std::rc::Rc;

mod declarations;
mod expressions;
mod statements;

pub use declarations::parse_function_constructor;

#[derive(Clone, Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            location: e.location,
        }
    }
}

/// Hoisting information gathered while parsing one function body or script.
#[derive(Default)]
struct Scope {
    var_names: Vec<String>,
    functions: Vec<Rc<FunctionDef>>,
}

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    current_token_start: usize,
    current_token_end: usize,
    prev_token_end: usize,
    prev_line_terminator: bool,
    pushback: Option<(Token, bool, usize, usize)>, // (token, had_line_terminator_before, token_start, token_end)
    strict: bool,
    no_in: bool,
    in_function: u32,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>, // (name, is_iteration)
    label_chain: Option<usize>,
    scopes: Vec<Scope>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let mut had_lt = false;
        let current = loop {
            let tok = lexer.next_token()?;
            if tok == Token::LineTerminator {
                had_lt = true;
                continue;
            }
            break tok;
        };
        let token_start = lexer.token_start();
        let token_end = lexer.offset();
        Ok(Self {
            source,
            lexer,
            current,
            current_token_start: token_start,
            current_token_end: token_end,
            prev_token_end: 0,
            prev_line_terminator: had_lt,
            pushback: None,
            strict: false,
            no_in: false,
            in_function: 0,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            label_chain: None,
            scopes: Vec::new(),
        })
    }

    /// Parser for code that inherits strictness from its caller (direct eval).
    pub fn new_strict(source: &'a str, strict: bool) -> Result<Self, ParseError> {
        let mut parser = Self::new(source)?;
        parser.set_strict(strict);
        Ok(parser)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_token_end = self.current_token_end;
        let old = std::mem::replace(&mut self.current, Token::Eof);
        if let Some((tok, lt, ts, te)) = self.pushback.take() {
            self.current = tok;
            self.prev_line_terminator = lt;
            self.current_token_start = ts;
            self.current_token_end = te;
        } else {
            self.prev_line_terminator = false;
            loop {
                let tok = self.lexer.next_token()?;
                if tok == Token::LineTerminator {
                    self.prev_line_terminator = true;
                    continue;
                }
                self.current_token_start = self.lexer.token_start();
                self.current_token_end = self.lexer.offset();
                self.current = tok;
                break;
            }
        }
        Ok(old)
    }

    fn push_back(&mut self, token: Token, had_lt: bool, start: usize, end: usize) {
        let old_current = std::mem::replace(&mut self.current, token);
        let old_lt = std::mem::replace(&mut self.prev_line_terminator, had_lt);
        let old_ts = std::mem::replace(&mut self.current_token_start, start);
        let old_te = std::mem::replace(&mut self.current_token_end, end);
        self.pushback = Some((old_current, old_lt, old_ts, old_te));
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        // ASI
        if self.prev_line_terminator
            || self.current == Token::RightBrace
            || self.current == Token::Eof
        {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError {
            message: msg.into(),
            location: self.lexer.location(),
        }
    }

    fn unexpected(&self) -> ParseError {
        match &self.current {
            Token::Eof => self.error("Unexpected end of input"),
            _ => self.error(format!(
                "Unexpected token {}",
                &self.source[self.current_token_start..self.current_token_end]
            )),
        }
    }

    fn source_since(&self, start: usize) -> String {
        self.source[start..self.prev_token_end].to_string()
    }

    fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
        self.lexer.strict = strict;
    }

    fn parse_optional_label(&mut self) -> Result<Option<String>, ParseError> {
        if !self.prev_line_terminator
            && let Some(name) = self.current_identifier_name()
        {
            self.advance()?;
            return Ok(Some(name));
        }
        Ok(None)
    }

    fn is_reserved_identifier(name: &str, strict: bool) -> bool {
        Keyword::from_str(name).is_some()
            || matches!(name, "true" | "false" | "null")
            || (strict && Self::is_strict_reserved_word(name))
    }

    fn is_strict_reserved_word(name: &str) -> bool {
        matches!(
            name,
            "implements"
                | "interface"
                | "let"
                | "package"
                | "private"
                | "protected"
                | "public"
                | "static"
                | "yield"
        )
    }

    fn current_identifier_name(&self) -> Option<String> {
        match &self.current {
            Token::Identifier(name) if !Self::is_reserved_identifier(name, self.strict) => {
                Some(name.clone())
            }
            _ => None,
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current_identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok(name)
            }
            None => match &self.current {
                Token::Identifier(name) if self.strict && Self::is_strict_reserved_word(name) => {
                    Err(self.error(format!("Unexpected strict mode reserved word '{name}'")))
                }
                _ => Err(self.unexpected()),
            },
        }
    }

    fn check_strict_binding_identifier(&self, name: &str) -> Result<(), ParseError> {
        if self.strict && (name == "eval" || name == "arguments") {
            return Err(self.error(format!(
                "'{name}' can't be used as a binding identifier in strict mode"
            )));
        }
        if self.strict && Self::is_strict_reserved_word(name) {
            return Err(self.error(format!("Unexpected strict mode reserved word '{name}'")));
        }
        Ok(())
    }

    fn check_duplicate_params_strict(&self, params: &[String]) -> Result<(), ParseError> {
        let mut seen = std::collections::HashSet::new();
        for name in params {
            if !seen.insert(name.as_str()) {
                return Err(self.error("Duplicate parameter name not allowed in this context"));
            }
        }
        Ok(())
    }

    fn declare_var(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut()
            && !scope.var_names.iter().any(|n| n == name)
        {
            scope.var_names.push(name.to_string());
        }
    }

    fn declare_function(&mut self, def: Rc<FunctionDef>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.functions.push(def);
        }
    }

    /// A string-literal statement whose raw text is exactly `"use strict"`.
    fn is_use_strict_directive(&self, stmt: &Statement, raw: &str) -> bool {
        matches!(stmt, Statement::Expression(Expression::Literal(Literal::String(_))))
            && (raw == "\"use strict\"" || raw == "'use strict'")
    }

    /// Statements up to `terminator`, handling the directive prologue. Returns the
    /// body and whether a "use strict" directive was seen.
    fn parse_source_elements(
        &mut self,
        terminator: &Token,
    ) -> Result<(Vec<Statement>, bool), ParseError> {
        let mut body = Vec::new();
        let mut in_directive_prologue = true;
        let mut saw_use_strict = false;

        while &self.current != terminator {
            if self.current == Token::Eof {
                return Err(self.unexpected());
            }
            let directive = if in_directive_prologue
                && matches!(self.current, Token::StringLiteral(_))
            {
                Some((self.current_token_start, self.current_token_end))
            } else {
                None
            };
            let stmt = self.parse_statement()?;

            if in_directive_prologue {
                match directive {
                    Some((start, end))
                        if matches!(
                            &stmt,
                            Statement::Expression(Expression::Literal(Literal::String(_)))
                        ) =>
                    {
                        if self.is_use_strict_directive(&stmt, &self.source[start..end]) {
                            saw_use_strict = true;
                            self.set_strict(true);
                            self.reject_octal_after_directive()?;
                        }
                    }
                    _ => in_directive_prologue = false,
                }
            }

            body.push(stmt);
        }
        Ok((body, saw_use_strict))
    }

    // The lookahead token was lexed before strictness took effect.
    fn reject_octal_after_directive(&self) -> Result<(), ParseError> {
        if matches!(self.current, Token::LegacyOctalLiteral(_)) {
            return Err(self.error("Octal literals are not allowed in strict mode."));
        }
        Ok(())
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.scopes.push(Scope::default());
        let (body, _) = self.parse_source_elements(&Token::Eof)?;
        let scope = self.scopes.pop().unwrap_or_default();
        Ok(Program {
            code: Rc::new(Code {
                body,
                var_names: scope.var_names,
                functions: scope.functions,
                strict: self.strict,
            }),
        })
    }
}

/// Parses a complete script.
pub fn parse_script(source: &str) -> Result<Program, ParseError> {
    stacker::maybe_grow(128 * 1024, 4 * 1024 * 1024, || {
        Parser::new(source)?.parse_program()
    })
}

/// Parses eval code; `strict` is inherited from the calling context for direct eval.
pub fn parse_eval(source: &str, strict: bool) -> Result<Program, ParseError> {
    stacker::maybe_grow(128 * 1024, 4 * 1024 * 1024, || {
        Parser::new_strict(source, strict)?.parse_program()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program().unwrap()
    }

    fn parse_err(src: &str) -> ParseError {
        match Parser::new(src).and_then(|mut p| p.parse_program()) {
            Ok(_) => panic!("expected a syntax error for {src:?}"),
            Err(e) => e,
        }
    }

    #[test]
    fn parse_empty() {
        let prog = parse("");
        assert!(prog.code.body.is_empty());
        assert!(!prog.code.strict);
    }

    #[test]
    fn parse_var_declaration() {
        let prog = parse("var x = 42;");
        assert_eq!(prog.code.body.len(), 1);
        assert!(matches!(&prog.code.body[0], Statement::Variable(_)));
        assert_eq!(prog.code.var_names, vec!["x".to_string()]);
    }

    #[test]
    fn var_names_are_hoisted_from_nested_statements() {
        let prog = parse("if (a) { var x; } for (var i in o) {} try {} catch (e) { var y, x; }");
        assert_eq!(prog.code.var_names, vec!["x", "i", "y"]);
    }

    #[test]
    fn function_declarations_are_collected_per_scope() {
        let prog = parse("function f(a) { var inner; function g() {} } function h() {}");
        assert_eq!(prog.code.functions.len(), 2);
        assert!(prog.code.var_names.is_empty());
        let f = &prog.code.functions[0];
        assert_eq!(f.name.as_deref(), Some("f"));
        assert_eq!(f.params, vec!["a"]);
        assert_eq!(f.code.var_names, vec!["inner"]);
        assert_eq!(f.code.functions.len(), 1);
        assert_eq!(f.source_text, "function f(a) { var inner; function g() {} }");
    }

    #[test]
    fn use_strict_directive() {
        assert!(parse("'use strict'; x = 1;").code.strict);
        assert!(parse("\"foo\"; \"use strict\";").code.strict);
        assert!(!parse("x; 'use strict';").code.strict);
        // escapes disqualify the directive
        let src = format!("'use{}u0020strict';", '\\');
        assert!(!parse(&src).code.strict);
        let prog = parse("function f() { 'use strict'; } ");
        assert!(!prog.code.strict);
        assert!(prog.code.functions[0].code.strict);
    }

    #[test]
    fn strict_mode_early_errors() {
        parse_err("'use strict'; with (a) {}");
        parse_err("'use strict'; var eval;");
        parse_err("'use strict'; arguments = 1;");
        parse_err("'use strict'; delete x;");
        parse_err("'use strict'; 010");
        parse_err("function f(a, a) { 'use strict'; }");
        parse_err("function eval() { 'use strict'; }");
        parse_err("'use strict'; var public;");
        parse_err("'use strict'; if (a) function f() {}");
    }

    #[test]
    fn sloppy_mode_allows_what_strict_forbids() {
        parse("with (a) {} var eval; delete x; function f(a, a) {} var let = 1;");
    }

    #[test]
    fn early_errors() {
        parse_err("return;");
        parse_err("break;");
        parse_err("while (1) { continue foo; }");
        parse_err("a: a: ;");
        parse_err("1 = 2;");
        parse_err("var class;");
        parse_err("throw\nx;");
        parse_err("{ ");
    }

    #[test]
    fn error_display_prefix() {
        let e = parse_err("var = ;");
        assert!(e.to_string().starts_with("SyntaxError: "));
    }

    #[test]
    fn parse_if_statement() {
        let prog = parse("if (true) { x; } else { y; }");
        assert!(matches!(&prog.code.body[0], Statement::If(_)));
    }

    #[test]
    fn parse_expression_statement() {
        let prog = parse("1 + 2 * 3;");
        match &prog.code.body[0] {
            Statement::Expression(Expression::Binary(BinaryOp::Add, _, right)) => {
                assert!(matches!(**right, Expression::Binary(BinaryOp::Mul, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_for_loops() {
        let prog = parse("for (var i = 0; i < 10; i++) { x; } for (k in o) ; for (;;) break;");
        assert!(matches!(&prog.code.body[0], Statement::For(_)));
        assert!(matches!(&prog.code.body[1], Statement::ForIn(_)));
        assert!(matches!(&prog.code.body[2], Statement::For(_)));
    }

    #[test]
    fn for_init_disallows_in() {
        let prog = parse("for (var i = 'a' in o) ;");
        assert!(matches!(&prog.code.body[0], Statement::ForIn(_)));
        let prog = parse("for (var i = ('a' in o); i; ) ;");
        assert!(matches!(&prog.code.body[0], Statement::For(_)));
    }

    #[test]
    fn parse_try_catch() {
        let prog = parse("try { x; } catch (e) { y; } finally { z; }");
        assert!(matches!(&prog.code.body[0], Statement::Try(_)));
        parse_err("try {}");
    }

    #[test]
    fn asi_restricted_productions() {
        let prog = parse("return_ = 1\nx\n++y");
        assert_eq!(prog.code.body.len(), 3);
        let prog = parse("function f() { return\n1 }");
        match &prog.code.functions[0].code.body[0] {
            Statement::Return(None) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn regexp_literal_in_expression_position() {
        let prog = parse("var r = /ab+c/gi; x = a / b / c;");
        match &prog.code.body[0] {
            Statement::Variable(decls) => match &decls[0].init {
                Some(Expression::Literal(Literal::RegExp(p, f))) => {
                    assert_eq!(p, "ab+c");
                    assert_eq!(f, "gi");
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
        let prog = parse("x = /=/;");
        match &prog.code.body[0] {
            Statement::Expression(Expression::Assign(_, _, rhs)) => {
                assert!(matches!(**rhs, Expression::Literal(Literal::RegExp(ref p, _)) if p == "="));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn object_literal_accessors_and_keys() {
        let prog = parse("x = { a: 1, 'b': 2, 3: 3, get c() { return 1; }, set c(v) {}, if: 4 };");
        match &prog.code.body[0] {
            Statement::Expression(Expression::Assign(_, _, rhs)) => match &**rhs {
                Expression::Object(props) => {
                    let keys: Vec<_> = props.iter().map(|p| p.key.as_str()).collect();
                    assert_eq!(keys, vec!["a", "b", "3", "c", "c", "if"]);
                    assert_eq!(props[3].kind, PropertyKind::Get);
                    assert_eq!(props[4].kind, PropertyKind::Set);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
        parse_err("'use strict'; x = { a: 1, a: 2 };");
        parse_err("x = { get a() {}, a: 1 };");
        parse("x = { a: 1, a: 2 };");
    }

    #[test]
    fn labels_and_label_sets() {
        parse("outer: for (;;) { inner: while (1) { continue outer; } }");
        parse("a: { break a; }");
        parse_err("a: { continue a; }");
    }

    #[test]
    fn member_and_call_chains() {
        let prog = parse("new a.b.C(1).d(2)[e];");
        assert!(matches!(
            &prog.code.body[0],
            Statement::Expression(Expression::Member(_, MemberProperty::Computed(_)))
        ));
        let prog = parse("new new X()();");
        assert!(matches!(
            &prog.code.body[0],
            Statement::Expression(Expression::New(_, _))
        ));
    }

    #[test]
    fn keyword_property_names() {
        parse("a.if; a.class; a.true; a.null; ({ default: 1, new: 2 });");
    }

    #[test]
    fn function_expression_source_text() {
        let prog = parse("var f = function named(a, b) { return a + b; };");
        match &prog.code.body[0] {
            Statement::Variable(decls) => match &decls[0].init {
                Some(Expression::Function(def)) => {
                    assert_eq!(def.name.as_deref(), Some("named"));
                    assert_eq!(def.source_text, "function named(a, b) { return a + b; }");
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
        // function expressions are not hoisted
        assert!(prog.code.functions.is_empty());
    }

    #[test]
    fn eval_code_inherits_strictness() {
        assert!(parse_eval("x", true).unwrap().code.strict);
        assert!(parse_eval("var eval;", true).is_err());
        assert!(parse_eval("var eval;", false).is_ok());
    }

    #[test]
    fn deeply_nested_expression_parses() {
        let src = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        assert!(parse_script(&src).is_ok());
    }
}
