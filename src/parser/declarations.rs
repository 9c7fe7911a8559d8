use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_variable_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?; // var
        let decls = self.parse_variable_declaration_list()?;
        self.eat_semicolon()?;
        Ok(Statement::Variable(decls))
    }

    pub(super) fn parse_variable_declaration_list(
        &mut self,
    ) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut decls = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            self.check_strict_binding_identifier(&name)?;
            self.declare_var(&name);
            let init = if self.current == Token::Assign {
                self.advance()?;
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            decls.push(VariableDeclarator { name, init });
            if self.current == Token::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(decls)
    }

    pub(super) fn parse_function_declaration(&mut self) -> Result<Statement, ParseError> {
        let source_start = self.current_token_start;
        self.eat(&Token::Keyword(Keyword::Function))?;
        let name = self.expect_identifier()?;
        let def = self.parse_function_rest(source_start, Some(name))?;
        self.declare_function(def.clone());
        Ok(Statement::FunctionDeclaration(def))
    }

    pub(super) fn parse_function_expression(&mut self) -> Result<Expression, ParseError> {
        let source_start = self.current_token_start;
        self.eat(&Token::Keyword(Keyword::Function))?;
        let name = if self.current == Token::LeftParen {
            None
        } else {
            Some(self.expect_identifier()?)
        };
        let def = self.parse_function_rest(source_start, name)?;
        Ok(Expression::Function(def))
    }

    pub(super) fn parse_formal_parameters(&mut self) -> Result<Vec<String>, ParseError> {
        self.eat(&Token::LeftParen)?;
        let mut params = Vec::new();
        while self.current != Token::RightParen {
            params.push(self.expect_identifier()?);
            if self.current != Token::RightParen {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightParen)?;
        Ok(params)
    }

    /// Parameters and body of a function whose `function` keyword (and name) have
    /// been consumed; `source_start` is where its source text begins.
    pub(super) fn parse_function_rest(
        &mut self,
        source_start: usize,
        name: Option<String>,
    ) -> Result<Rc<FunctionDef>, ParseError> {
        let params = self.parse_formal_parameters()?;
        self.eat(&Token::LeftBrace)?;
        let prev_strict = self.strict;
        let (body, scope) = self.parse_function_body(&Token::RightBrace)?;
        let body_strict = self.strict;
        self.check_function_names(name.as_deref(), &params, body_strict)?;
        // the token after `}` must be lexed with the enclosing strictness
        self.set_strict(prev_strict);
        self.eat(&Token::RightBrace)?;
        Ok(Rc::new(FunctionDef {
            name,
            params,
            code: Rc::new(Code {
                body,
                var_names: scope.var_names,
                functions: scope.functions,
                strict: body_strict,
            }),
            source_text: self.source_since(source_start),
        }))
    }

    /// Parses source elements up to `terminator` in a fresh function scope. The
    /// terminator is left unconsumed and `self.strict` reflects the body.
    fn parse_function_body(
        &mut self,
        terminator: &Token,
    ) -> Result<(Vec<Statement>, Scope), ParseError> {
        let prev_iteration = self.in_iteration;
        let prev_switch = self.in_switch;
        let prev_no_in = self.no_in;
        let prev_labels = std::mem::take(&mut self.labels);
        let prev_chain = self.label_chain.take();
        self.in_iteration = 0;
        self.in_switch = 0;
        self.no_in = false;
        self.in_function += 1;
        self.scopes.push(Scope::default());

        let result = self.parse_source_elements(terminator);

        let scope = self.scopes.pop().unwrap_or_default();
        self.in_function -= 1;
        self.in_iteration = prev_iteration;
        self.in_switch = prev_switch;
        self.no_in = prev_no_in;
        self.labels = prev_labels;
        self.label_chain = prev_chain;
        let (body, _) = result?;
        Ok((body, scope))
    }

    /// Early errors that depend on the strictness of the finished body.
    fn check_function_names(
        &self,
        name: Option<&str>,
        params: &[String],
        strict: bool,
    ) -> Result<(), ParseError> {
        if !strict {
            return Ok(());
        }
        for n in name.into_iter().chain(params.iter().map(String::as_str)) {
            if n == "eval" || n == "arguments" {
                return Err(self.error(format!(
                    "'{n}' can't be used as a binding identifier in strict mode"
                )));
            }
            if Self::is_strict_reserved_word(n) {
                return Err(self.error(format!("Unexpected strict mode reserved word '{n}'")));
            }
        }
        self.check_duplicate_params_strict(params)
    }
}

/// Builds the function for `new Function(params, body)`. Parameters and body are
/// parsed separately so neither can close the other early.
pub fn parse_function_constructor(
    params_text: &str,
    body_text: &str,
) -> Result<Rc<FunctionDef>, ParseError> {
    stacker::maybe_grow(128 * 1024, 4 * 1024 * 1024, || {
        let mut p = Parser::new(params_text)?;
        let mut params = Vec::new();
        while p.current != Token::Eof {
            params.push(p.expect_identifier()?);
            if p.current != Token::Eof {
                p.eat(&Token::Comma)?;
            }
        }

        let mut b = Parser::new(body_text)?;
        let (body, scope) = b.parse_function_body(&Token::Eof)?;
        let strict = b.strict;
        b.check_function_names(None, &params, strict)?;

        Ok(Rc::new(FunctionDef {
            name: None,
            params,
            code: Rc::new(Code {
                body,
                var_names: scope.var_names,
                functions: scope.functions,
                strict,
            }),
            source_text: format!("function anonymous({params_text}\n) {{\n{body_text}\n}}"),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_constructor_parts() {
        let def = parse_function_constructor("a, b", "return a + b;").unwrap();
        assert_eq!(def.params, vec!["a", "b"]);
        assert_eq!(def.code.body.len(), 1);
        assert!(def.source_text.starts_with("function anonymous(a, b"));
    }

    #[test]
    fn function_constructor_rejects_injection() {
        assert!(parse_function_constructor("a) { return 1; } (function (", "").is_err());
        assert!(parse_function_constructor("", "} foo({").is_err());
    }

    #[test]
    fn function_constructor_strict_body() {
        assert!(parse_function_constructor("a, a", "'use strict';").is_err());
        assert!(parse_function_constructor("a, a", "").is_ok());
        assert!(parse_function_constructor("", "'use strict'; return 1").unwrap().code.strict);
    }

    #[test]
    fn setter_arity_is_checked() {
        assert!(parse_script("x = { set a() {} };").is_err());
        assert!(parse_script("x = { get a(v) {} };").is_err());
        assert!(parse_script("x = { get a() {}, set a(v) {} };").is_ok());
    }

    #[test]
    fn nested_function_restores_outer_state() {
        // a strict inner function does not make the outer code strict
        let prog = parse_script("function f() { 'use strict'; } with (o) {}").unwrap();
        assert!(!prog.code.strict);
        // loop context does not leak into nested functions
        assert!(parse_script("while (1) { (function () { break; }); }").is_err());
    }
}
